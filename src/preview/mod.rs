//! Server-side preview of a stored page.
//!
//! Stored fragments are JSX-like text. They are never executed: the static
//! markup is lifted out of the fragment and decorated for editing.

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

use crate::apply::EditApplicator;
use crate::wire::{ElementEdit, GeneratedSite};

pub const EDITABLE_CLASS: &str = "editable-element";

const AFFORDANCE_CSS: &str = r#"
.editable-element { position: relative; }
.editable-element:hover { outline: 2px solid #3b82f6; outline-offset: 2px; cursor: pointer; }
.editable-element:hover::after {
  content: 'Click to edit'; position: absolute; top: -30px; right: 0;
  background: #3b82f6; color: white; padding: 4px 8px; border-radius: 4px;
  font-size: 12px; white-space: nowrap; z-index: 10;
}
[data-nav-page] { cursor: pointer; }
"#;

const PREVIEW_JS: &str = r#"
(function () {
  var root = document.getElementById('preview');
  var site = root.getAttribute('data-site');
  root.addEventListener('click', function (e) {
    var nav = e.target.closest('[data-nav]');
    if (nav) {
      e.preventDefault();
      var page = nav.getAttribute('data-nav-page');
      if (page) { window.location.href = '/api/website/' + site + '/preview/' + encodeURIComponent(page); }
      return;
    }
    var el = e.target.closest('[data-edit-id]');
    if (!el) { return; }
    e.preventDefault();
    var next = window.prompt('Edit text', el.textContent);
    if (next === null) { return; }
    fetch('/api/website/' + site + '/edit', {
      method: 'PUT',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ elementId: el.getAttribute('data-edit-id'), content: next })
    }).then(function (r) { if (r.ok) { el.textContent = next; } });
  });
})();
"#;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn editable_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"<[A-Za-z][^<>]*\sdata-edit-id=["'][^"']*["'][^<>]*>"#)
}

fn class_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"\sclass=(?:"([^"]*)"|'([^']*)')"#)
}

fn nav_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"data-nav=(?:"([^"]*)"|'([^']*)')"#)
}

fn jsx_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)\{\s*/\*.*?\*/\s*\}")
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<script\b[^>]*>.*?</script\s*>|<script\b[^>]*>")
}

/// An opening tag; attribute values may hold one level of nested braces.
fn open_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"<[A-Za-z](?:[^<>{}]|\{(?:[^{}]|\{[^{}]*\})*\})*>")
}

fn event_handler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|\{(?:[^{}]|\{[^{}]*\})*\}|[^\s"'>]+)"#,
    )
}

fn script_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"(?i)\s+(?:href|src|action|formaction)\s*=\s*(?:"\s*javascript:[^"]*"|'\s*javascript:[^']*')"#,
    )
}

fn style_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"\sstyle=(?:"([^"]*)"|'([^']*)')"#)
}

/// Adds the editable class to every tag carrying `data-edit-id`, whichever
/// quote style the id uses. The id itself is left alone.
pub fn mark_editable(markup: &str) -> String {
    editable_tag_re()
        .replace_all(markup, |caps: &Captures| add_class(&caps[0], EDITABLE_CLASS))
        .into_owned()
}

fn add_class(tag: &str, class: &str) -> String {
    if let Some(caps) = class_attr_re().captures(tag) {
        let Some(value) = caps.get(1).or_else(|| caps.get(2)) else {
            return tag.to_string();
        };
        if value.as_str().split_whitespace().any(|c| c == class) {
            return tag.to_string();
        }
        let sep = if value.as_str().trim().is_empty() { "" } else { " " };
        return format!("{}{sep}{class}{}", &tag[..value.end()], &tag[value.end()..]);
    }
    let (body, tail) = match tag.strip_suffix("/>") {
        Some(body) => (body.trim_end(), " />"),
        None => (&tag[..tag.len() - 1], ">"),
    };
    format!("{body} class=\"{class}\"{tail}")
}

/// Maps a navigation target to a stored page key. `home` and the empty key
/// mean `index`; matching ignores case. `None` means there is no such page.
pub fn resolve_page_key(raw: &str, pages: &IndexMap<String, String>) -> Option<String> {
    let key = raw.trim().trim_start_matches('/').to_lowercase();
    let key = if key.is_empty() || key == "home" { "index".to_string() } else { key };
    pages.keys().find(|k| k.to_lowercase() == key).cloned()
}

/// Annotates every `data-nav` element whose target exists with the resolved
/// page key; targets that do not resolve are left inert.
pub fn mark_navigation(markup: &str, pages: &IndexMap<String, String>) -> String {
    nav_attr_re()
        .replace_all(markup, |caps: &Captures| {
            let target = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match resolve_page_key(target, pages) {
                Some(page) => format!("{} data-nav-page=\"{}\"", &caps[0], escape_attr(&page)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Puts each edit's `styles` on its element as inline declarations. They are
/// appended to an existing `style` attribute so they take precedence.
pub fn apply_inline_styles(markup: &str, edits: &[ElementEdit]) -> String {
    let mut out = markup.to_string();
    for edit in edits {
        let Some(css) = edit.styles.as_ref().map(css_declarations).filter(|c| !c.is_empty()) else {
            continue;
        };
        let pattern = format!(
            r#"<[A-Za-z][^<>]*\sdata-edit-id=["']{}["'][^<>]*>"#,
            regex::escape(&edit.element_id)
        );
        let Ok(re) = Regex::new(&pattern) else { continue };
        out = re.replace_all(&out, |caps: &Captures| merge_style(&caps[0], &css)).into_owned();
    }
    out
}

fn merge_style(tag: &str, css: &str) -> String {
    if let Some(caps) = style_attr_re().captures(tag) {
        let (Some(whole), Some(value)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            return tag.to_string();
        };
        let existing = value.as_str().trim().trim_end_matches(';').trim_end();
        let existing = existing.replace('"', "&quot;");
        let merged = if existing.is_empty() {
            escape_attr(css)
        } else {
            format!("{existing}; {}", escape_attr(css))
        };
        return format!("{} style=\"{merged}\"{}", &tag[..whole.start()], &tag[whole.end()..]);
    }
    let name_end = tag[1..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .map_or(tag.len() - 1, |i| i + 1);
    format!("{} style=\"{}\"{}", &tag[..name_end], escape_attr(css), &tag[name_end..])
}

fn css_declarations(styles: &IndexMap<String, Value>) -> String {
    styles
        .iter()
        .filter_map(|(prop, value)| {
            let value = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!value.is_empty()).then(|| format!("{}: {}", kebab_case(prop), value))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn kebab_case(prop: &str) -> String {
    let mut out = String::with_capacity(prop.len() + 4);
    for c in prop.trim().chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Lifts the static markup out of a function-like JSX fragment and maps the
/// JSX-only attribute names to their HTML spelling. Scripts, event handlers
/// and `javascript:` URLs are dropped, so nothing the model wrote can run.
pub fn extract_markup(fragment: &str) -> Option<String> {
    let from = fragment.find("return").map_or(0, |i| i + "return".len());
    let start = fragment[from..].find('<')? + from;
    let end = fragment.rfind('>')?;
    if end < start {
        return None;
    }
    let body = jsx_comment_re().replace_all(&fragment[start..=end], "");
    let body = script_re().replace_all(&body, "");
    let body = open_tag_re().replace_all(&body, |caps: &Captures| inert_tag(&caps[0]));
    Some(body.replace("className=", "class=").replace("htmlFor=", "for="))
}

fn inert_tag(tag: &str) -> String {
    let tag = event_handler_re().replace_all(tag, "");
    script_url_re().replace_all(&tag, "").into_owned()
}

pub fn page_title(key: &str) -> String {
    if key == "index" {
        return "Home".into();
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

/// Full HTML document for one page with edits applied. `None` when the page
/// does not exist.
pub fn render_document(
    site: &GeneratedSite,
    page_key: &str,
    edits: &[ElementEdit],
    applicator: &dyn EditApplicator,
) -> Option<String> {
    let fragment = site.pages.get(page_key)?;
    let edited = applicator.apply_edits(fragment, edits);
    let markup = extract_markup(&edited).unwrap_or_else(|| escape_html(&edited));
    let markup = apply_inline_styles(&markup, edits);
    let markup = mark_navigation(&markup, &site.pages);
    let markup = mark_editable(&markup);

    Some(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} Page</title>
<script src="https://cdn.tailwindcss.com"></script>
<style>
{styles}
{affordance}
</style>
</head>
<body>
<div id="preview" data-site="{id}" data-page="{page}">
{markup}
</div>
<script>{script}</script>
</body>
</html>
"#,
        title = escape_html(&page_title(page_key)),
        styles = site.styles.replace("</", "<\\/"),
        affordance = AFFORDANCE_CSS,
        id = site.id,
        page = escape_attr(page_key),
        markup = markup,
        script = PREVIEW_JS,
    ))
}
