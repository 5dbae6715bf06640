//! Markdown styling for card titles and slate descriptions.

use crate::trace::{Card, SlateBlock, SlateText};

/// Wrap a non-empty title in bold markup.
///
/// # Examples
///
/// ```
/// use flowbridge_core::markup::style_title;
/// assert_eq!(style_title("Hi"), "*Hi*");
/// assert_eq!(style_title(""), "");
/// ```
#[must_use]
pub fn style_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    format!("*{title}*")
}

/// Apply the style flags of one text node.
///
/// Wrappers are applied innermost first: underline, bold, strikethrough,
/// italic.
#[must_use]
pub fn style_text(node: &SlateText) -> String {
    let mut text = node.text.clone();
    if node.underline {
        text = format!("__{text}__");
    }
    if node.is_bold() {
        text = format!("*{text}*");
    }
    if node.strike_through {
        text = format!("~{text}~");
    }
    if node.italic {
        text = format!("_{text}_");
    }
    text
}

/// Render a slate description as one Markdown string.
///
/// Nested inline elements (links) contribute their leaf text nodes.
#[must_use]
pub fn style_description(slate: &[SlateBlock]) -> String {
    let mut out = String::new();
    for block in slate {
        for node in &block.children {
            push_node(&mut out, node);
        }
    }
    out
}

fn push_node(out: &mut String, node: &SlateText) {
    if node.children.is_empty() {
        out.push_str(&style_text(node));
        return;
    }
    for child in &node.children {
        push_node(out, child);
    }
}

/// Compose the photo caption of a card.
///
/// `None` when both title and description are empty, otherwise
/// `{title}\n{description}`.
#[must_use]
pub fn card_caption(card: &Card) -> Option<String> {
    let title = style_title(&card.title);
    let description = style_description(&card.description.slate);
    if title.is_empty() && description.is_empty() {
        return None;
    }
    Some(format!("{title}\n{description}"))
}
