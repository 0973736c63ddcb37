use regex::{Captures, Regex};
use tracing::debug;

use crate::wire::ElementEdit;

/// Merges stored edits into page markup before it is rendered.
pub trait EditApplicator: Send + Sync {
    /// Never fails: an edit that cannot be placed leaves the markup as is.
    fn apply_edits(&self, markup: &str, edits: &[ElementEdit]) -> String;
}

/// Pattern-based applicator. Finds `<tag ... data-edit-id="ID" ...>text</tag>`
/// and swaps the text span, for every occurrence of the id.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexApplicator;

impl EditApplicator for RegexApplicator {
    fn apply_edits(&self, markup: &str, edits: &[ElementEdit]) -> String {
        let mut out = markup.to_string();
        for edit in edits {
            let Some(text) = edit.content.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            let Some(re) = element_pattern(&edit.element_id) else {
                continue;
            };
            if !re.is_match(&out) {
                debug!(element = %edit.element_id, "edit target not found in markup");
                continue;
            }
            let text = escape_text(text);
            out = re
                .replace_all(&out, |caps: &Captures| format!("{}{}{}", &caps[1], text, &caps[3]))
                .into_owned();
        }
        out
    }
}

fn element_pattern(element_id: &str) -> Option<Regex> {
    if element_id.is_empty() {
        return None;
    }
    let pattern = format!(
        r#"(<[^<>]*data-edit-id=["']{}["'][^<>]*>)([^<]*)(</[^>]*>)"#,
        regex::escape(element_id)
    );
    Regex::new(&pattern).ok()
}

/// Edits are text; keep them from opening or closing tags.
fn escape_text(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn edit(element: &str, content: Option<&str>) -> ElementEdit {
        ElementEdit {
            site_id: Uuid::nil(),
            element_id: element.into(),
            content: content.map(Into::into),
            styles: None,
        }
    }

    fn apply(markup: &str, edits: &[ElementEdit]) -> String {
        RegexApplicator.apply_edits(markup, edits)
    }

    #[test]
    fn replaces_inner_text() {
        assert_eq!(
            apply(r#"<h1 data-edit-id="t">Old</h1>"#, &[edit("t", Some("New"))]),
            r#"<h1 data-edit-id="t">New</h1>"#
        );
    }

    #[test]
    fn absent_id_leaves_markup_unchanged() {
        let markup = r#"<h1 data-edit-id="t">Old</h1>"#;
        assert_eq!(apply(markup, &[edit("missing", Some("New"))]), markup);
    }

    #[test]
    fn similar_ids_are_not_confused() {
        let markup = r#"<p data-edit-id="t2">A</p><p data-edit-id="t">B</p>"#;
        assert_eq!(
            apply(markup, &[edit("t", Some("C"))]),
            r#"<p data-edit-id="t2">A</p><p data-edit-id="t">C</p>"#
        );
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let markup = r#"<span data-edit-id="brand">Acme</span> | <span className="x" data-edit-id="brand" >Acme</span>"#;
        assert_eq!(
            apply(markup, &[edit("brand", Some("Zeta"))]),
            r#"<span data-edit-id="brand">Zeta</span> | <span className="x" data-edit-id="brand" >Zeta</span>"#
        );
    }

    #[test]
    fn single_quoted_attribute_and_surrounding_attrs() {
        assert_eq!(
            apply(
                "<button className='btn' data-edit-id='cta' type='button'>Go</button>",
                &[edit("cta", Some("Start"))]
            ),
            "<button className='btn' data-edit-id='cta' type='button'>Start</button>"
        );
    }

    #[test]
    fn edit_without_content_is_skipped() {
        let markup = r#"<h1 data-edit-id="t">Old</h1>"#;
        assert_eq!(apply(markup, &[edit("t", None), edit("t", Some(""))]), markup);
    }

    #[test]
    fn ids_and_text_are_taken_literally() {
        let markup = r#"<h2 data-edit-id="price.$1">Old</h2>"#;
        assert_eq!(
            apply(markup, &[edit("price.$1", Some("$5 <b>off</b>"))]),
            r#"<h2 data-edit-id="price.$1">$5 &lt;b&gt;off&lt;/b&gt;</h2>"#
        );
    }

    #[test]
    fn nested_markup_is_left_alone() {
        let markup = r#"<div data-edit-id="box"><p>inner</p></div>"#;
        assert_eq!(apply(markup, &[edit("box", Some("x"))]), markup);
    }

    #[test]
    fn later_edits_see_earlier_results() {
        let markup = r#"<h1 data-edit-id="a">1</h1><p data-edit-id="b">2</p>"#;
        assert_eq!(
            apply(markup, &[edit("a", Some("x")), edit("b", Some("y"))]),
            r#"<h1 data-edit-id="a">x</h1><p data-edit-id="b">y</p>"#
        );
    }
}
