//! Axis label wrapping.
//!
//! Category names like "Cedar Creek Below Outfall" collide when drawn
//! side by side under a plot; wrapping them onto short lines keeps the
//! axis readable without rotating the text.

/// Greedy word wrap: break `text` at whitespace so no line exceeds
/// `width` characters, except that a single word longer than `width`
/// stays unbroken on its own line.  Whitespace runs collapse to one
/// space; lines are joined with `'\n'`.
pub fn wrap_text(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
