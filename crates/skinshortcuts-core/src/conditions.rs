//! Condition-expression evaluation.
//!
//! Conditions are evaluated against a flat property map using a small
//! expression language:
//!
//! - equality: `name=value` or `name EQUALS value`
//! - contains: `name~value` or `name CONTAINS value`
//! - empty check: `name EMPTY`
//! - list membership: `name IN value1,value2,value3`
//! - AND: `a + b` or `a AND b`
//! - OR: `a | b` or `a OR b`
//! - NOT: `!a` or `NOT a`
//! - grouping: `[a | b]`
//! - compact OR: `name=value1 | value2 | value3`
//!
//! In a compact OR chain the property name and operator cascade from the
//! most recent full `name OP value` segment, so
//! `prop=a | other=b | c` reads as `prop=a | other=b | other=c`.
//!
//! Negation binds to the adjacent condition only: `!prop=a | b` is
//! `(!prop=a) | (prop=b)`. Bracket a group to negate it whole: `![prop=a | b]`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::PropertyMap;

lazy_static! {
    static ref OR_SPLIT: Regex = Regex::new(r"\s*\|\s*").unwrap();
    static ref CONDITION_MATCH: Regex =
        Regex::new(r"^(!?)([a-zA-Z_][a-zA-Z0-9_\.]*)(=|~)(.*)$").unwrap();
    // Keyword to symbol mappings, applied with word boundaries so values
    // containing these words are left alone.
    static ref KEYWORD_REPLACEMENTS: [(Regex, &'static str); 5] = [
        (Regex::new(r"\bAND\b").unwrap(), "+"),
        (Regex::new(r"\bOR\b").unwrap(), "|"),
        (Regex::new(r"\bNOT\b").unwrap(), "!"),
        (Regex::new(r"\bEQUALS\b").unwrap(), "="),
        (Regex::new(r"\bCONTAINS\b").unwrap(), "~"),
    ];
}

/// Convert keyword operators to their symbol equivalents.
fn normalize_keywords(condition: &str) -> String {
    let mut condition = condition.to_string();
    for (pattern, replacement) in KEYWORD_REPLACEMENTS.iter() {
        condition = pattern.replace_all(&condition, *replacement).into_owned();
    }
    condition
}

/// Evaluate a condition against property values.
///
/// Empty or blank conditions are vacuously true.
pub fn evaluate_condition(condition: &str, properties: &PropertyMap) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }

    let condition = normalize_keywords(condition);
    let condition = if condition.contains('|') {
        expand_compact_or(&condition)
    } else {
        condition
    };
    evaluate_expanded(&condition, properties)
}

/// Expand compact OR syntax to full form.
///
/// `widgetType=movies | episodes | tvshows` becomes
/// `widgetType=movies | widgetType=episodes | widgetType=tvshows`.
pub fn expand_compact_or(condition: &str) -> String {
    if condition.is_empty() {
        return String::new();
    }

    let mut result_parts: Vec<String> = Vec::new();
    for and_part in split_preserving_brackets(condition, '+') {
        let mut and_part = and_part.trim();
        if and_part.is_empty() {
            continue;
        }

        let is_negated = and_part.starts_with('!');
        if is_negated {
            and_part = and_part[1..].trim();
        }

        if and_part.starts_with('[') && and_part.ends_with(']') {
            let inner = and_part[1..and_part.len() - 1].trim();
            let expanded_inner = expand_or_segment(inner);
            if is_negated {
                result_parts.push(format!("![{}]", expanded_inner));
            } else {
                result_parts.push(format!("[{}]", expanded_inner));
            }
        } else {
            let expanded = expand_or_segment(and_part);
            if is_negated {
                result_parts.push(format!("!{}", expanded));
            } else {
                result_parts.push(expanded);
            }
        }
    }

    result_parts.join(" + ")
}

/// Split on `delimiter`, preserving content inside brackets.
fn split_preserving_brackets(text: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for ch in text.chars() {
        if ch == '[' {
            depth += 1;
            current.push(ch);
        } else if ch == ']' {
            depth -= 1;
            current.push(ch);
        } else if ch == delimiter && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Expand one OR segment, cascading the most recent property and operator.
fn expand_or_segment(segment: &str) -> String {
    let parts: Vec<&str> = OR_SPLIT.split(segment).collect();
    if parts.len() <= 1 {
        return segment.to_string();
    }

    let mut result_parts: Vec<String> = Vec::new();
    let mut current_property = String::new();
    let mut current_operator = String::new();

    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some(captures) = CONDITION_MATCH.captures(part) {
            let negation = &captures[1];
            current_property = captures[2].to_string();
            current_operator = captures[3].to_string();
            let value = &captures[4];
            result_parts.push(format!(
                "{}{}{}{}",
                negation, current_property, current_operator, value
            ));
        } else if !current_property.is_empty() {
            result_parts.push(format!("{}{}{}", current_property, current_operator, part));
        } else {
            result_parts.push(part.to_string());
        }
    }

    result_parts.join(" | ")
}

/// True when the whole of `text` is one bracketed group, not merely a string
/// that happens to start and end with brackets.
fn is_wrapped_in_brackets(text: &str) -> bool {
    if !text.starts_with('[') || !text.ends_with(']') {
        return false;
    }
    let mut depth: i32 = 0;
    for (i, ch) in text.char_indices() {
        if ch == '[' {
            depth += 1;
        } else if ch == ']' {
            depth -= 1;
            if depth == 0 && i + ch.len_utf8() < text.len() {
                return false;
            }
        }
    }
    depth == 0
}

fn evaluate_expanded(condition: &str, properties: &PropertyMap) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }

    if is_wrapped_in_brackets(condition) {
        return evaluate_expanded(&condition[1..condition.len() - 1], properties);
    }

    // Split AND/OR before negation: !a + b is (!a) + b, not !(a + b).
    let and_parts = split_preserving_brackets(condition, '+');
    if and_parts.len() > 1 {
        return and_parts
            .iter()
            .all(|part| evaluate_expanded(part.trim(), properties));
    }

    let or_parts = split_preserving_brackets(condition, '|');
    if or_parts.len() > 1 {
        return or_parts
            .iter()
            .any(|part| evaluate_expanded(part.trim(), properties));
    }

    if let Some(rest) = condition.strip_prefix('!') {
        let inner = rest.trim();
        if is_wrapped_in_brackets(inner) {
            return !evaluate_expanded(&inner[1..inner.len() - 1], properties);
        }
        return !evaluate_single(inner, properties);
    }

    evaluate_single(condition, properties)
}

/// Evaluate a single predicate against the property map.
fn evaluate_single(condition: &str, properties: &PropertyMap) -> bool {
    let mut condition = condition.trim();

    let mut negated = false;
    if let Some(rest) = condition.strip_prefix('!') {
        negated = true;
        condition = rest.trim();
    }
    let apply = |result: bool| if negated { !result } else { result };

    if is_wrapped_in_brackets(condition) {
        return apply(evaluate_expanded(
            &condition[1..condition.len() - 1],
            properties,
        ));
    }

    // EMPTY operator: propertyName EMPTY
    if let Some(prop_name) = condition.strip_suffix(" EMPTY") {
        let actual = lookup(properties, prop_name.trim());
        return apply(actual.is_empty());
    }

    // IN operator: propertyName IN value1,value2,value3
    if let Some((prop_name, values_str)) = condition.split_once(" IN ") {
        let actual = lookup(properties, prop_name.trim());
        let result = values_str
            .trim()
            .split(',')
            .any(|value| value.trim() == actual);
        return apply(result);
    }

    if let Some((prop_name, value)) = condition.split_once('=') {
        let prop_name = prop_name.trim();
        let value = value.trim();
        // Left side may be a property name or, after $PROPERTY substitution,
        // a literal boolean to compare directly.
        let actual = if let Some(actual) = properties.get(prop_name) {
            actual.as_str()
        } else if prop_name.eq_ignore_ascii_case("true") || prop_name.eq_ignore_ascii_case("false")
        {
            prop_name
        } else {
            ""
        };
        return apply(actual == value);
    }

    if let Some((prop_name, value)) = condition.split_once('~') {
        let actual = lookup(properties, prop_name.trim());
        return apply(actual.contains(value.trim()));
    }

    // Literal boolean value (e.g. from $PROPERTY substitution)
    if condition.eq_ignore_ascii_case("true") || condition.eq_ignore_ascii_case("false") {
        return apply(condition.eq_ignore_ascii_case("true"));
    }

    // Property name only: truthy if non-empty, but "false" reads as false
    let value = lookup(properties, condition);
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return apply(value.eq_ignore_ascii_case("true"));
    }
    apply(!value.is_empty())
}

fn lookup<'a>(properties: &'a PropertyMap, name: &str) -> &'a str {
    properties.get(name).map(String::as_str).unwrap_or("")
}
