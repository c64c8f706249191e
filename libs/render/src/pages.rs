use markdown::escape_html;

/// Shell wrapped around server responses that are not already complete
/// HTML documents.
const SERVER_SHELL: &str = r#"<!DOCTYPE HTML>
<html>
	<head>
		<title>{title}</title>
		<meta charset="{encoding}" />
	</head>
	<body>
		{body}
	</body>
</html>"#;

pub fn merge_server_template(title: &str, body: &str, encoding: &str) -> String {
    SERVER_SHELL
        .replacen("{title}", &escape_html(title), 1)
        .replacen("{encoding}", encoding, 1)
        .replacen("{body}", body, 1)
}

pub fn not_found_page(path: &str, encoding: &str) -> String {
    merge_server_template(
        "Error 404",
        &format!(
            "<p>The requested URL “{}” was not found.</p>",
            escape_html(path)
        ),
        encoding,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Directory listing page. Subdirectories get a trailing slash so relative
/// links keep working.
pub fn index_page(path: &str, entries: &[IndexEntry], encoding: &str) -> String {
    let title = format!("Index of {}", path);
    let mut body = format!("<h1>{}</h1><ul>", escape_html(&title));
    for entry in entries {
        let name = if entry.is_dir {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        let name = escape_html(&name);
        body.push_str(&format!("<li><a href=\"{}\">{}</a></li>", name, name));
    }
    body.push_str("</ul>");
    merge_server_template(&title, &body, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_page_names_the_path() {
        let page = not_found_page("/missing.md", "utf-8");
        assert!(page.contains("Error 404"));
        assert!(page.contains("/missing.md"));
        assert!(page.contains("charset=\"utf-8\""));
    }

    #[test]
    fn index_page_lists_entries_with_dir_slash() {
        let entries = vec![
            IndexEntry { name: "notes.md".into(), is_dir: false },
            IndexEntry { name: "sub".into(), is_dir: true },
        ];
        let page = index_page("/docs", &entries, "utf-8");
        assert!(page.contains("<a href=\"notes.md\">notes.md</a>"));
        assert!(page.contains("<a href=\"sub/\">sub/</a>"));
        assert!(page.contains("Index of /docs"));
    }
}
