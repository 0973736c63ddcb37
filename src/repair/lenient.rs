//! Best-effort repair of almost-JSON text.
//!
//! Single pass over the input with a stack of open containers. The output is
//! not guaranteed to be valid JSON; the caller still has to parse it.

use super::{closes_string, is_json_escape};

pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut stack: Vec<char> = Vec::new();
    let mut delim: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = delim {
            match c {
                '\\' => match chars.get(i + 1) {
                    Some('\'') if q == '\'' => {
                        out.push('\'');
                        i += 1;
                    }
                    Some(&n) if is_json_escape(n) => {
                        out.push('\\');
                        out.push(n);
                        i += 1;
                    }
                    _ => out.push_str("\\\\"),
                },
                c if c == q => {
                    if closes_string(&chars, i) {
                        out.push('"');
                        delim = None;
                    } else if q == '"' {
                        out.push_str("\\\"");
                    } else {
                        out.push(c);
                    }
                }
                '"' => out.push_str("\\\""),
                c if (c as u32) < 0x20 => out.push(' '),
                c => out.push(c),
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                delim = Some(c);
                out.push('"');
            }
            '{' => {
                stack.push('}');
                out.push(c);
            }
            '[' => {
                stack.push(']');
                out.push(c);
            }
            '}' | ']' => {
                if stack.contains(&c) {
                    drop_trailing_comma(&mut out);
                    while let Some(open) = stack.pop() {
                        if open == c {
                            out.push(c);
                            break;
                        }
                        close_container(&mut out, open);
                    }
                }
            }
            ',' => {
                if !matches!(last_significant(&out), Some(',') | Some('{') | Some('[') | None) {
                    out.push(c);
                }
            }
            ':' => out.push(c),
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            c if c.is_ascii_digit() || c == '-' => {
                while i < chars.len() && is_number_char(chars[i]) {
                    out.push(chars[i]);
                    i += 1;
                }
                continue;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(&bare_word(&word));
                continue;
            }
            c if c.is_whitespace() => out.push(c),
            _ => {}
        }
        i += 1;
    }

    if delim.is_some() {
        out.push('"');
    }
    while let Some(open) = stack.pop() {
        close_container(&mut out, open);
    }
    out
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
}

fn bare_word(word: &str) -> String {
    match word {
        "true" | "false" | "null" => word.to_string(),
        "True" => "true".into(),
        "False" => "false".into(),
        "None" | "undefined" => "null".into(),
        _ => format!("\"{word}\""),
    }
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end().len();
    if out[..trimmed].ends_with(',') {
        out.truncate(trimmed - 1);
    }
}

fn close_container(out: &mut String, closer: char) {
    drop_trailing_comma(out);
    if last_significant(out) == Some(':') {
        out.push_str("null");
    }
    out.push(closer);
}
