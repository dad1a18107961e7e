use scraper::{ElementRef, Html, Node};

/// Non-content elements replaced by a single space before text extraction.
pub const TAGS_TO_REMOVE: &[&str] = &[
    "script", "style", "header", "footer", "aside", "nav", "form", "button", "iframe", "input",
    "textarea", "select", "option", "label", "fieldset", "legend", "img", "audio", "video",
    "source", "track", "canvas", "svg", "object", "param", "embed", "link",
];

pub fn clean_text(doc: &Html) -> String {
    let mut raw = String::new();
    collect_text(doc.root_element(), &mut raw);
    normalize(&raw)
}

fn collect_text(el: ElementRef<'_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(element) => {
                if TAGS_TO_REMOVE.contains(&element.name()) {
                    buf.push(' ');
                } else if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, buf);
                }
            }
            _ => {}
        }
    }
}

/// Splits on line breaks and double spaces, drops blank chunks, joins the rest
/// with `". "` and collapses the dot runs that joining creates.
pub fn normalize(text: &str) -> String {
    let joined = text
        .split(is_line_break)
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(". ");
    collapse_dots(&joined)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn collapse_dots(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_dot = false;
    for c in text.chars() {
        if c == '.' {
            if !prev_dot {
                out.push(c);
            }
            prev_dot = true;
        } else {
            out.push(c);
            prev_dot = false;
        }
    }
    out
}
