//! Placeholder substitution in conditions and markup text.
//!
//! Substitution order in text is fixed: `$EXP` first (so expansions can
//! contribute further placeholders), `$PARENT` inside items expansion,
//! `$PROPERTY`, then `$MATH` and `$IF` over the fully resolved text.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::expressions::{process_if_expressions, process_math_expressions};
use crate::model::menu::MenuItem;
use crate::model::PropertyMap;

use super::TemplateBuilder;

lazy_static! {
    static ref PROPERTY_PATTERN: Regex = Regex::new(r"\$PROPERTY\[([^\]]+)\]").unwrap();
    static ref PARENT_PATTERN: Regex = Regex::new(r"\$PARENT\[([^\]]+)\]").unwrap();
    pub(super) static ref EXP_PATTERN: Regex = Regex::new(r"\$EXP\[([^\]]+)\]").unwrap();
    pub(super) static ref INCLUDE_PATTERN: Regex = Regex::new(r"\$INCLUDE\[([^\]]+)\]").unwrap();
}

/// Replace `$PROPERTY[name]` with the context value, falling back to raw
/// item properties, then to empty.
pub(super) fn substitute_property_refs(
    text: &str,
    item: &MenuItem,
    context: &PropertyMap,
) -> String {
    PROPERTY_PATTERN
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            if let Some(value) = context.get(name) {
                return value.clone();
            }
            if let Some(value) = item.properties.get(name) {
                return value.clone();
            }
            String::new()
        })
        .into_owned()
}

impl<'a> TemplateBuilder<'a> {
    /// Expand `$EXP[name]` references recursively.
    ///
    /// Expressions declared nosuffix come back wrapped in
    /// `{NOSUFFIX:...}` markers, which the suffix transform passes over
    /// and condition evaluation strips. Unknown names stay as written.
    pub(super) fn expand_expressions(&self, condition: &str) -> String {
        EXP_PATTERN
            .replace_all(condition, |caps: &Captures| {
                let name = &caps[1];
                match self.schema.expression(name) {
                    Some(expr) => {
                        let expanded = self.expand_expressions(&expr.value);
                        if expr.nosuffix {
                            format!("{{NOSUFFIX:{expanded}}}")
                        } else {
                            expanded
                        }
                    }
                    None => {
                        tracing::debug!("Expression '{}' not defined", name);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Full placeholder substitution for markup text, tails and attribute
    /// values.
    ///
    /// `parent` carries the parent item's context during items expansion;
    /// it resolves `$PARENT[...]` and backs up the property map handed to
    /// `$MATH`/`$IF` evaluation. Lookup precedence there is context, then
    /// item properties, then parent context, then parent item properties.
    pub(super) fn substitute_text(
        &self,
        text: &str,
        context: &PropertyMap,
        item: &MenuItem,
        parent: Option<(&PropertyMap, &MenuItem)>,
    ) -> String {
        let mut text = if text.contains("$EXP[") {
            self.expand_expressions(text)
        } else {
            text.to_string()
        };

        if let Some((parent_context, parent_item)) = parent {
            text = PARENT_PATTERN
                .replace_all(&text, |caps: &Captures| {
                    let name = &caps[1];
                    if let Some(value) = parent_context.get(name) {
                        return value.clone();
                    }
                    if name == "label" {
                        return parent_item.label.clone();
                    }
                    if name == "name" {
                        return parent_item.name.clone();
                    }
                    parent_item.properties.get(name).cloned().unwrap_or_default()
                })
                .into_owned();
        }

        text = substitute_property_refs(&text, item, context);

        let mut properties = PropertyMap::new();
        if let Some((_, parent_item)) = parent {
            for (name, value) in &parent_item.properties {
                properties.insert(name.clone(), value.clone());
            }
        }
        if let Some((parent_context, _)) = parent {
            for (name, value) in parent_context {
                properties.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in &item.properties {
            properties.insert(name.clone(), value.clone());
        }
        for (name, value) in context {
            properties.insert(name.clone(), value.clone());
        }

        if text.contains("$MATH[") {
            text = process_math_expressions(&text, &properties);
        }
        if text.contains("$IF[") {
            text = process_if_expressions(&text, &properties);
        }

        text
    }
}
