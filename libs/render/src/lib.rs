pub mod pages;
pub mod templates;

pub use self::pages::*;
pub use self::templates::*;

use chrono::Local;
use markdown::parsers::{extract_metadata, to_html, ConversionConfig, DocumentMeta};
use markdown::processors::{
    autonumber_headings, ensure_heading_ids, process_extra_tags, replace_toc_token,
    splice_contents, toc_list, TagSubstitution, TocBackSpec,
};

/// Output of the conversion pipeline: the final HTML, the metadata that
/// drove it, and the extra-tag side table (empty unless the document asked
/// for reversible substitutions).
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub meta: DocumentMeta,
    pub substitutions: Vec<TagSubstitution>,
}

/// Runs the whole pipeline over a raw document: metadata extraction,
/// Markdown conversion, heading numbering, contents splicing, template
/// fill, extra-tag substitution. The substitution pass runs last so the
/// side-table spans index the returned document. Every failure along the
/// way degrades to visible text in the output; this function does not
/// fail.
pub fn render_document(
    text: &str,
    config: &ConversionConfig,
    store: &TemplateStore,
) -> RenderedDocument {
    let (meta, body) = extract_metadata(text, config);
    let mut content = to_html(&body, config.engine, &config.extras);

    let mut toc_html = None;
    if meta.toc {
        let (with_ids, entries) = ensure_heading_ids(&content);
        content = with_ids;
        if entries.len() > 1 {
            toc_html = Some(toc_list(&entries, meta.autonumber_headings));
        }
    }
    if meta.autonumber_headings {
        content = autonumber_headings(&content);
    }
    if meta.extratags {
        content = replace_toc_token(&content);
    }
    content = splice_contents(
        content,
        toc_html.as_deref(),
        &TocBackSpec::parse(&meta.toc_back),
    );

    let mut html = if content.to_lowercase().contains("</html>") {
        // already a complete document, leave the template out of it
        content
    } else {
        let template = store.get_or_default(&meta.template);
        template.fill(&meta.lang, &meta.html_head, &meta.html_header, &content)
    };
    let mut substitutions = Vec::new();
    if meta.extratags {
        let (substituted, subs) =
            process_extra_tags(&html, &Local::now().naive_local(), env!("CARGO_PKG_VERSION"));
        html = substituted;
        if meta.extratags_back {
            substitutions = subs;
        }
    }
    RenderedDocument {
        html,
        meta,
        substitutions,
    }
}

#[cfg(test)]
mod tests {
    use markdown::processors::revert_extra_tags;

    use super::*;

    fn store() -> TemplateStore {
        TemplateStore::new(std::env::temp_dir().join("mdserve-missing-templates"))
    }

    #[test]
    fn renders_through_the_default_template() {
        let doc = "---\ntitle: Greeting\n---\n\n# Hello\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert!(out.html.contains("<title>Greeting</title>"));
        assert!(out.html.contains("<h1>Hello</h1>"));
        assert!(out.html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn minimal_template_is_just_the_body() {
        let doc = "---\ntemplate: minimal\n---\n\nplain *text*\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert_eq!(out.html.trim(), "<p>plain <em>text</em></p>");
    }

    #[test]
    fn complete_documents_skip_the_template() {
        let doc = "<html><body><p>done</p></body></html>\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert!(!out.html.contains("<!DOCTYPE html>"));
        assert!(out.html.contains("<p>done</p>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let doc = "---\ntitle: Stable\ntoc: true\nautonumber-headings: true\n---\n\n# One\n\n## Two\n";
        let config = ConversionConfig::default();
        let store = store();
        assert_eq!(
            render_document(doc, &config, &store).html,
            render_document(doc, &config, &store).html
        );
    }

    #[test]
    fn contents_are_injected_for_multiple_headings() {
        let doc = "---\ntoc: true\n---\n\n# One\n\n## Two\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert!(out.html.contains("<nav role=\"doc-toc\" id=\"doc-toc\">"));
        assert!(out.html.contains("<a href=\"#one\">One</a>"));
    }

    #[test]
    fn single_heading_gets_no_contents_block() {
        let doc = "---\ntoc: true\n---\n\n# Only\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert!(!out.html.contains("doc-toc"));
    }

    #[test]
    fn autonumbering_labels_headings_in_outline_order() {
        let doc = "---\nautonumber-headings: true\ntemplate: minimal\n---\n\n# A\n\n## B\n\n## C\n\n# D\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert!(out.html.contains(">1. A<"));
        assert!(out.html.contains(">1.1. B<"));
        assert!(out.html.contains(">1.2. C<"));
        assert!(out.html.contains(">2. D<"));
    }

    #[test]
    fn extratag_side_table_reverts() {
        let doc = "---\nextratags: true\nextratags-back: true\ntemplate: minimal\n---\n\ncopyright %Year%\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert_eq!(out.substitutions.len(), 1);
        let reverted = revert_extra_tags(&out.html, &out.substitutions);
        assert!(reverted.contains("copyright %Year%"));
    }

    #[test]
    fn side_table_spans_index_the_assembled_document() {
        let doc = "---\ntitle: Notes\ntoc: true\nextratags: true\nextratags-back: true\n---\n\ncopyright %Year%, built %date%\n\n# One\n\n## Two\n";
        let out = render_document(doc, &ConversionConfig::default(), &store());
        assert_eq!(out.substitutions.len(), 2);
        for sub in &out.substitutions {
            let end = sub.start + sub.len;
            assert!(end <= out.html.len());
            // a span pointing at substituted text never holds a raw token
            assert!(!out.html[sub.start..end].contains('%'));
        }
        let reverted = revert_extra_tags(&out.html, &out.substitutions);
        assert!(reverted.starts_with("<!DOCTYPE html>"));
        assert!(reverted.contains("copyright %Year%, built %date%"));
        assert!(reverted.contains("<nav role=\"doc-toc\" id=\"doc-toc\">"));
    }
}
