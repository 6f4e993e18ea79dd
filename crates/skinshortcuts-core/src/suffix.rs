//! Suffix transforms for parameterized template reuse.
//!
//! A suffix (e.g. `.2`) lets one template definition serve several slots by
//! rewriting the property names its conditions and from-source references
//! read. The rewrite is purely textual: only left-hand name tokens directly
//! before a `=` or `~` operator are touched, reserved built-in names never
//! are, and `{NOSUFFIX:...}` spans (introduced by nosuffix expression
//! expansion) pass through unchanged until final evaluation strips them.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Built-in context names that never receive a suffix.
pub const RESERVED_NAMES: [&str; 6] = ["index", "name", "menu", "id", "idprefix", "suffix"];

lazy_static! {
    static ref NOSUFFIX_MARKER: Regex = Regex::new(r"\{NOSUFFIX:([^}]+)\}").unwrap();
}

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Single-character tokens the condition scanner treats as delimiters.
fn is_delimiter(ch: char) -> bool {
    matches!(ch, '=' | '~' | '|' | '+' | '[' | ']' | '!')
}

/// Split into alternating text/delimiter tokens, keeping the delimiters.
///
/// Adjacent delimiters produce an empty text token between them, and the
/// leading/trailing text tokens are kept even when empty, so a text token's
/// following delimiter is always at the next index.
fn split_on_delimiters(condition: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in condition.chars() {
        if is_delimiter(ch) {
            parts.push(std::mem::take(&mut current));
            parts.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}

/// Apply `suffix` to property-name tokens in a condition.
///
/// A name token is suffixed when the next token is `=` or `~`, it is not a
/// reserved built-in, and it is not a protected nosuffix span. Tokens are
/// trimmed and re-joined without separators, so surrounding whitespace in
/// the input collapses (`widgetArt = Poster` → `widgetArt.2=Poster`).
pub fn apply_suffix_to_condition(condition: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return condition.to_string();
    }

    // Pull {NOSUFFIX:...} spans out before scanning so their content is
    // never rewritten, then restore them verbatim afterwards.
    let mut preserved: Vec<String> = Vec::new();
    let condition = NOSUFFIX_MARKER.replace_all(condition, |caps: &Captures| {
        preserved.push(caps[1].to_string());
        format!("__NOSUFFIX_{}__", preserved.len() - 1)
    });

    let parts = split_on_delimiters(&condition);
    let mut result = String::new();
    for (i, part) in parts.iter().enumerate() {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let next_is_operator = parts
            .get(i + 1)
            .map(|next| next == "=" || next == "~")
            .unwrap_or(false);
        result.push_str(part);
        if next_is_operator && !is_reserved(part) && !part.starts_with("__NOSUFFIX_") {
            result.push_str(suffix);
        }
    }

    for (i, content) in preserved.iter().enumerate() {
        result = result.replace(&format!("__NOSUFFIX_{}__", i), content);
    }
    result
}

/// Apply `suffix` to a from-source reference, leaving built-ins alone.
pub fn apply_suffix_to_from(source: &str, suffix: &str) -> String {
    if suffix.is_empty() || is_reserved(source) {
        source.to_string()
    } else {
        format!("{}{}", source, suffix)
    }
}

/// Strip `{NOSUFFIX:...}` markers, keeping only the content.
pub fn strip_nosuffix_markers(condition: &str) -> String {
    NOSUFFIX_MARKER
        .replace_all(condition, |caps: &Captures| caps[1].to_string())
        .into_owned()
}
