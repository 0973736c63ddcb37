use crate::wire::{GenerateRequest, Instruction, StyleHint};

/// Attribute marking a node as editable in the preview.
pub const EDIT_ATTR: &str = "data-edit-id";
/// Attribute naming the page key an internal link switches to.
pub const NAV_ATTR: &str = "data-nav";

/// What the user asked for, as far as the prompt is concerned.
#[derive(Debug, Clone, Default)]
pub struct GenerationBrief {
    pub description: String,
    pub pages: Vec<String>,
    pub style: Option<StyleHint>,
}

impl From<&GenerateRequest> for GenerationBrief {
    fn from(req: &GenerateRequest) -> Self {
        Self {
            description: req.description.trim().to_string(),
            pages: req.pages.clone().unwrap_or_default(),
            style: req.style,
        }
    }
}

fn output_contract() -> &'static str {
    r#"Return ONLY a valid JSON object (no markdown, no prose, no code fences) with this exact structure:
{
  "pages": {
    "index": "() => { return (<main>...</main>); }",
    "about": "() => { return (<main>...</main>); }"
  },
  "components": {
    "Header": "() => { return (<header>...</header>); }"
  },
  "styles": "/* global CSS */"
}
- "pages" is required and MUST contain the key "index" (the home page).
- "components" is optional: shared fragments such as a header or footer.
- "styles" is required: one global stylesheet as a single string."#
}

fn markup_rules() -> &'static str {
    r#"Markup Rules (MANDATORY):
- Each page is a function-like JSX expression written as a string: "() => { return (...); }".
- Do NOT include imports, exports, hooks or state. Pure markup only.
- Add data-edit-id="unique-id" to EVERY editable text element (headings, paragraphs, list items, buttons, labels). Ids must be unique across the whole site and stable (e.g. "hero-title", "about-intro").
- Editable elements must contain plain text only, no nested tags.
- Internal navigation MUST use data-nav="<page-key>" (e.g. <button data-nav="about">About</button>). Never use href for internal pages. Use data-nav="index" for the home page.
- Use Tailwind CSS utility classes via className for layout and styling.
- Make the design responsive, accessible and visually polished.

JSON Safety (MANDATORY):
- Every markup string must be written on a single line: no raw newlines or tabs inside strings.
- Escape every double quote inside a string as \", or prefer single quotes for JSX attributes.
- Do not use backslashes except for valid JSON escapes."#
}

fn style_line(style: StyleHint) -> &'static str {
    match style {
        StyleHint::Modern => {
            "Visual style: modern (bold typography, gradients, generous spacing, rounded cards)."
        }
        StyleHint::Classic => {
            "Visual style: classic (serif headings, restrained palette, traditional layout)."
        }
        StyleHint::Minimal => {
            "Visual style: minimal (lots of whitespace, monochrome palette, simple typography)."
        }
    }
}

pub fn system_prompt() -> String {
    "You are an expert web developer who generates clean, modern websites as JSON. \
     You always answer with exactly one JSON object and nothing else."
        .to_string()
}

pub fn user_prompt(brief: &GenerationBrief) -> String {
    let mut out = format!(
        "Generate a complete multi-page website based on this description: \"{}\"\n\n{}\n\n{}",
        brief.description,
        output_contract(),
        markup_rules()
    );

    let mut pages: Vec<String> = vec!["index".into()];
    for p in &brief.pages {
        let key = p.trim().to_lowercase();
        if !key.is_empty() && key != "home" && !pages.contains(&key) {
            pages.push(key);
        }
    }
    if pages.len() > 1 {
        out.push_str(&format!("\n\nGenerate exactly these pages (keys): {}.", pages.join(", ")));
    }
    if let Some(style) = brief.style {
        out.push('\n');
        out.push_str(style_line(style));
    }
    out
}

pub fn instruction(brief: &GenerationBrief) -> Instruction {
    Instruction { system: system_prompt(), user: user_prompt(brief) }
}
