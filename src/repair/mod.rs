//! Turns a free-form completion into a [`GeneratedContent`].
//!
//! Stages run in order and the first one that yields a typed payload wins:
//! strict parse, strict parse of the outermost `{...}` span, textual fixups
//! on that span, then the lenient repair routine on that same span.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::errors::SiteError;
use crate::wire::GeneratedContent;

pub mod lenient;

/// Why a single stage gave up. Only the last one matters to callers.
#[derive(Debug)]
pub enum StageFailure {
    NoObject,
    Parse(serde_json::Error),
}

pub type RepairStage = fn(&str) -> Result<GeneratedContent, StageFailure>;

const STAGES: [(&str, RepairStage); 4] = [
    ("strict", strict),
    ("sliced", sliced),
    ("fixups", fixups),
    ("lenient", lenient_stage),
];

pub fn parse_generated(raw: &str) -> Result<GeneratedContent, SiteError> {
    let mut last = None;
    for (name, stage) in STAGES {
        match stage(raw) {
            Ok(content) => {
                debug!(stage = name, pages = content.pages.len(), "model response parsed");
                return Ok(content);
            }
            Err(StageFailure::NoObject) => return Err(SiteError::NoJsonObjectFound),
            Err(e) => {
                debug!(stage = name, error = ?e, "repair stage failed");
                last = Some(e);
            }
        }
    }
    debug!(failure = ?last, "all repair stages exhausted");
    let shown = outer_object(raw).unwrap_or(raw);
    Err(SiteError::unparsable(shown))
}

fn strict(raw: &str) -> Result<GeneratedContent, StageFailure> {
    serde_json::from_str(raw).map_err(StageFailure::Parse)
}

/// The outer span as written. Prose around a valid object is dropped and
/// nothing inside it is touched.
fn sliced(raw: &str) -> Result<GeneratedContent, StageFailure> {
    let sliced = outer_object(raw).ok_or(StageFailure::NoObject)?;
    serde_json::from_str(sliced).map_err(StageFailure::Parse)
}

fn fixups(raw: &str) -> Result<GeneratedContent, StageFailure> {
    let sliced = outer_object(raw).ok_or(StageFailure::NoObject)?;
    let text = collapse_newlines(sliced);
    let text = collapse_whitespace(&text);
    let text = escape_stray_backslashes(&text);
    let text = escape_interior_quotes(&text);
    serde_json::from_str(&text).map_err(StageFailure::Parse)
}

fn lenient_stage(raw: &str) -> Result<GeneratedContent, StageFailure> {
    let sliced = outer_object(raw).ok_or(StageFailure::NoObject)?;
    serde_json::from_str(&lenient::repair_json(sliced)).map_err(StageFailure::Parse)
}

/// The span from the first `{` to the last `}`, inclusive.
pub fn outer_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

fn collapse_newlines(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("static regex"))
        .replace_all(s, " ")
        .into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("static regex"))
        .replace_all(s, " ")
        .into_owned()
}

pub(crate) fn is_json_escape(c: char) -> bool {
    matches!(c, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')
}

/// Doubles every backslash that does not start a JSON escape sequence.
fn escape_stray_backslashes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match chars.get(i + 1) {
                Some(&n) if is_json_escape(n) => {
                    out.push(c);
                    out.push(n);
                    i += 2;
                    continue;
                }
                _ => out.push_str("\\\\"),
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

/// Escapes quotes inside string values that cannot be the closing quote.
fn escape_interior_quotes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 16);
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if c == '\\' {
                out.push(c);
                if let Some(&n) = chars.get(i + 1) {
                    out.push(n);
                }
                i += 2;
                continue;
            }
            if c == '"' {
                if closes_string(&chars, i) {
                    in_string = false;
                    out.push(c);
                } else {
                    out.push_str("\\\"");
                }
            } else {
                out.push(c);
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
        i += 1;
    }
    out
}

fn skip_whitespace(chars: &[char], mut at: usize) -> usize {
    while at < chars.len() && chars[at].is_whitespace() {
        at += 1;
    }
    at
}

/// Whether the quote at `at` plausibly ends the current JSON string, judged by
/// what follows it: a colon, a run of closers that ends the document or meets
/// a comma, or a comma leading into another value or key.
pub(crate) fn closes_string(chars: &[char], at: usize) -> bool {
    let j = skip_whitespace(chars, at + 1);
    match chars.get(j) {
        None | Some(':') => true,
        Some('}') | Some(']') => {
            // `"red"}}>` inside a JSX style object is not the end of the value.
            let mut k = j;
            while k < chars.len() && (matches!(chars[k], '}' | ']') || chars[k].is_whitespace()) {
                k += 1;
            }
            matches!(chars.get(k), None | Some(','))
        }
        Some(',') => {
            let k = skip_whitespace(chars, j + 1);
            let Some(&next) = chars.get(k) else { return true };
            matches!(next, '"' | '\'' | '{' | '[' | '}' | ']' | '-')
                || next.is_ascii_digit()
                || starts_with_literal(&chars[k..])
        }
        _ => false,
    }
}

fn starts_with_literal(rest: &[char]) -> bool {
    ["true", "false", "null"].iter().any(|lit| {
        let lit: Vec<char> = lit.chars().collect();
        rest.len() >= lit.len()
            && rest[..lit.len()] == lit[..]
            && rest.get(lit.len()).map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"pages":{"index":"() => { return (<h1 data-edit-id=\"t\">Hi</h1>); }"},"styles":"body { margin: 0; }"}"#;

    fn pages_have_no_raw_newlines(c: &GeneratedContent) -> bool {
        c.pages.values().all(|v| !v.contains('\n') && !v.contains('\r'))
    }

    #[test]
    fn strict_json_is_returned_unchanged() {
        let parsed = parse_generated(VALID).unwrap();
        let expected: GeneratedContent = serde_json::from_str(VALID).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.pages["index"], r#"() => { return (<h1 data-edit-id="t">Hi</h1>); }"#);
    }

    #[test]
    fn strict_keeps_escaped_newlines_in_valid_content() {
        let raw = r#"{"pages":{"index":"<p>a\nb</p>"},"styles":""}"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], "<p>a\nb</p>");
    }

    #[test]
    fn prose_around_the_object_is_ignored() {
        let raw = format!("Sure! Here is your website:\n```json\n{VALID}\n```\nEnjoy!");
        let parsed = parse_generated(&raw).unwrap();
        assert_eq!(parsed.styles, "body { margin: 0; }");
        assert!(parsed.pages.contains_key("index"));
    }

    #[test]
    fn prose_wrapped_valid_object_keeps_its_whitespace() {
        let raw = "Here you go:\n{\"pages\":{\"index\":\"<pre>a    b</pre>\"},\"styles\":\"body {  margin: 0; }\"}\nThanks";
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], "<pre>a    b</pre>");
        assert_eq!(parsed.styles, "body {  margin: 0; }");
    }

    #[test]
    fn jsx_style_objects_keep_their_quotes() {
        let raw = r#"{"pages": {"index": "<h1 data-edit-id="t" style={{color: "red"}}>Hi</h1>"}, "styles": ""}"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], r#"<h1 data-edit-id="t" style={{color: "red"}}>Hi</h1>"#);
    }

    #[test]
    fn literal_newlines_inside_strings_are_collapsed() {
        let raw = "{\"pages\": {\"index\": \"() => {\n  return (\n    <h1>Hello</h1>\n  );\n}\"}, \"styles\": \"h1 {\r\n color: red; }\"}";
        let parsed = parse_generated(raw).unwrap();
        assert!(pages_have_no_raw_newlines(&parsed));
        assert_eq!(parsed.pages["index"], "() => { return ( <h1>Hello</h1> ); }");
        assert!(!parsed.styles.contains('\n'));
    }

    #[test]
    fn unescaped_attribute_quotes_are_escaped() {
        let raw = r#"{"pages": {"index": "<h1 data-edit-id="hero" className="text-xl">Hi</h1>", "about": "<p data-edit-id="a">About</p>"}, "styles": ""}"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], r#"<h1 data-edit-id="hero" className="text-xl">Hi</h1>"#);
        assert_eq!(parsed.pages["about"], r#"<p data-edit-id="a">About</p>"#);
    }

    #[test]
    fn stray_backslashes_are_doubled() {
        let raw = r#"{"pages": {"index": "<p>C:\path\dir</p>"}, "styles": "a::before { content: \"\2014\"; }"}"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], r"<p>C:\path\dir</p>");
        assert!(parsed.styles.contains(r"\2014"));
    }

    #[test]
    fn trailing_commas_fall_through_to_lenient() {
        let raw = r#"Here you go: {"pages": {"index": "<h1 data-edit-id='t'>Hi</h1>",}, "styles": "body{}", } trailing"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], "<h1 data-edit-id='t'>Hi</h1>");
        assert_eq!(parsed.styles, "body{}");
    }

    #[test]
    fn cut_off_response_is_closed() {
        let raw = r#"{"pages": {"index": "<h1>Hi</h1>"}, "styles": "body { color: red"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.pages["index"], "<h1>Hi</h1>");
        assert_eq!(parsed.styles, "");
    }

    #[test]
    fn missing_braces_is_no_object() {
        let refusal = parse_generated("I cannot help with that.");
        assert!(matches!(refusal, Err(SiteError::NoJsonObjectFound)));
        assert!(matches!(parse_generated("} backwards {"), Err(SiteError::NoJsonObjectFound)));
    }

    #[test]
    fn wrong_shape_is_unparsable_with_preview() {
        let raw = format!("{{\"site\": \"{}\"}}", "y".repeat(900));
        match parse_generated(&raw) {
            Err(SiteError::UnparsableResponse { preview }) => {
                assert_eq!(preview.chars().count(), crate::errors::PREVIEW_CHARS);
                assert!(preview.starts_with("{\"site\""));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn outer_object_spans_first_to_last_brace() {
        assert_eq!(outer_object("a {x} b {y} c"), Some("{x} b {y}"));
        assert_eq!(outer_object("nothing"), None);
    }

    #[test]
    fn closing_quote_detection() {
        let s: Vec<char> = r#""a", "b""#.chars().collect();
        assert!(closes_string(&s, 2));
        let s: Vec<char> = r#""x", b: 1"#.chars().collect();
        assert!(!closes_string(&s, 2));
        let s: Vec<char> = r#"="t">"#.chars().collect();
        assert!(!closes_string(&s, 1));
        let s: Vec<char> = r#""red"}}>Hi"#.chars().collect();
        assert!(!closes_string(&s, 4));
        let s: Vec<char> = r#""x"} }, "y""#.chars().collect();
        assert!(closes_string(&s, 2));
        let s: Vec<char> = r#""x"}]}"#.chars().collect();
        assert!(closes_string(&s, 2));
    }
}
