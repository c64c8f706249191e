use super::HEADING_RE;

/// A heading whose text starts with this marker keeps its original text and
/// is skipped by the numbering pass. The marker itself is removed.
pub const AUTONUMBER_OPT_OUT: &str = r"\!";

/// Walks heading elements in document order and prefixes each with a dotted
/// outline label derived from its nesting level: `h1,h2,h2,h1` becomes
/// `1, 1.1, 1.2, 2`. Levels skipped at the top of the document do not leave
/// leading zeros in the label.
pub fn autonumber_headings(html: &str) -> String {
    let mut counters: Vec<u32> = Vec::new();
    let mut previous_level = 0usize;
    HEADING_RE
        .replace_all(html, |caps: &regex::Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            let attrs = &caps[2];
            let inner = &caps[3];
            if inner.trim_start().starts_with(AUTONUMBER_OPT_OUT) {
                let cleaned = inner.replacen(AUTONUMBER_OPT_OUT, "", 1);
                return format!("<h{}{}>{}</h{}>", level, attrs, cleaned, level);
            }
            if level == previous_level {
                if let Some(last) = counters.last_mut() {
                    *last += 1;
                }
            } else if level < previous_level {
                counters.truncate(level);
                if let Some(last) = counters.last_mut() {
                    *last += 1;
                } else {
                    counters.push(1);
                }
            } else {
                counters.resize(level, 0);
                if let Some(last) = counters.last_mut() {
                    *last = 1;
                }
            }
            previous_level = level;
            let label = counters
                .iter()
                .skip_while(|&&c| c == 0)
                .map(u32::to_string)
                .collect::<Vec<String>>()
                .join(".");
            format!("<h{}{}>{}. {}</h{}>", level, attrs, label, inner, level)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_nested_heading_sequence() {
        let html = "<h1>A</h1><h2>B</h2><h2>C</h2><h1>D</h1>";
        assert_eq!(
            autonumber_headings(html),
            "<h1>1. A</h1><h2>1.1. B</h2><h2>1.2. C</h2><h1>2. D</h1>"
        );
    }

    #[test]
    fn opt_out_marker_skips_a_heading() {
        let html = r"<h1>A</h1><h1>\!Unnumbered</h1><h1>B</h1>";
        assert_eq!(
            autonumber_headings(html),
            "<h1>1. A</h1><h1>Unnumbered</h1><h1>2. B</h1>"
        );
    }

    #[test]
    fn document_starting_below_h1_drops_leading_zeros() {
        let html = "<h2>A</h2><h3>B</h3><h2>C</h2>";
        assert_eq!(
            autonumber_headings(html),
            "<h2>1. A</h2><h3>1.1. B</h3><h2>2. C</h2>"
        );
    }

    #[test]
    fn heading_attributes_are_preserved(){
        let html = r#"<h1 id="intro">A</h1>"#;
        assert_eq!(autonumber_headings(html), r#"<h1 id="intro">1. A</h1>"#);
    }
}
