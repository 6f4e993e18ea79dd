//! Property context construction.
//!
//! A context is the ordered name→value map a template instantiation
//! resolves against: menu defaults, item properties, built-ins, fallback
//! values, then template-level properties, vars, presets and property
//! groups layered on top in authored order.

use std::collections::HashSet;

use crate::conditions::evaluate_condition;
use crate::model::menu::{Menu, MenuItem};
use crate::model::template::{
    Preset, PresetGroupChild, PropertyGroup, Reference, Template, TemplateOutput,
    TemplateProperty, TemplateVar,
};
use crate::model::PropertyMap;
use crate::suffix::{apply_suffix_to_condition, apply_suffix_to_from, strip_nosuffix_markers};

use super::expand::substitute_property_refs;
use super::TemplateBuilder;

/// An explicit reference suffix overrides the output suffix.
pub(super) fn combine_suffixes<'s>(base: &'s str, reference: &'s str) -> &'s str {
    if reference.is_empty() {
        base
    } else {
        reference
    }
}

/// Value lookup for `from="source"` properties: built-ins first, then the
/// context, then raw item properties.
fn from_source_value(source: &str, item: &MenuItem, context: &PropertyMap) -> String {
    if matches!(source, "index" | "name" | "menu" | "id" | "idprefix") {
        return context.get(source).cloned().unwrap_or_default();
    }
    if let Some(value) = context.get(source) {
        return value.clone();
    }
    item.properties.get(source).cloned().unwrap_or_default()
}

impl<'a> TemplateBuilder<'a> {
    /// Build the property context for one menu item.
    ///
    /// The output's suffix is applied to every condition and reference so
    /// a single template can serve several widget slots.
    pub(super) fn build_context(
        &self,
        template: &Template,
        output: &TemplateOutput,
        item: &MenuItem,
        idx: usize,
        menu: &Menu,
    ) -> PropertyMap {
        let mut context: PropertyMap = menu.defaults.properties.clone();
        for (name, value) in &item.properties {
            context.insert(name.clone(), value.clone());
        }

        context.insert("index".to_string(), idx.to_string());
        context.insert("name".to_string(), item.name.clone());
        context.insert("menu".to_string(), menu.name.clone());
        context.insert("idprefix".to_string(), output.id_prefix.clone());
        let id = if output.id_prefix.is_empty() {
            idx.to_string()
        } else {
            format!("{}{}", output.id_prefix, idx)
        };
        context.insert("id".to_string(), id);
        context.insert("suffix".to_string(), output.suffix.clone());

        self.apply_fallbacks(item, &mut context);

        // First match wins for same-named template properties
        let mut resolved: HashSet<&str> = HashSet::new();
        for prop in &template.properties {
            if resolved.contains(prop.name.as_str()) {
                continue;
            }
            if let Some(value) = self.resolve_property(prop, item, &context, &output.suffix) {
                context.insert(prop.name.clone(), value);
                resolved.insert(&prop.name);
            }
        }

        for var in &template.vars {
            if let Some(value) = self.resolve_var(var, item, &context, &output.suffix) {
                context.insert(var.name.clone(), value);
            }
        }

        for preset_ref in &template.preset_refs {
            let effective = combine_suffixes(&output.suffix, &preset_ref.suffix);
            if !self.reference_applies(preset_ref, effective, item, &context) {
                continue;
            }
            self.apply_preset(preset_ref, item, &mut context, effective);
        }

        for group_ref in &template.preset_group_refs {
            let effective = combine_suffixes(&output.suffix, &group_ref.suffix);
            if !self.reference_applies(group_ref, effective, item, &context) {
                continue;
            }
            self.apply_preset_group(group_ref, item, &mut context, effective);
        }

        for group_ref in &template.property_groups {
            let effective = combine_suffixes(&output.suffix, &group_ref.suffix);
            if !self.reference_applies(group_ref, effective, item, &context) {
                continue;
            }
            match self.schema.property_group(&group_ref.name) {
                Some(group) => self.apply_property_group(group, item, &mut context, effective),
                None => tracing::debug!("Property group '{}' not found", group_ref.name),
            }
        }

        context
    }

    /// Gate for suffixed references: expand `$EXP`, suffix the condition,
    /// then evaluate it. A reference without a condition always applies.
    fn reference_applies(
        &self,
        reference: &Reference,
        suffix: &str,
        item: &MenuItem,
        context: &PropertyMap,
    ) -> bool {
        if reference.condition.is_empty() {
            return true;
        }
        let mut condition = self.expand_expressions(&reference.condition);
        if !suffix.is_empty() {
            condition = apply_suffix_to_condition(&condition, suffix);
        }
        self.eval_condition(&condition, item, context)
    }

    /// Resolve one template property, honoring its condition, `from`
    /// source and `$PROPERTY` references in the literal value.
    pub(super) fn resolve_property(
        &self,
        prop: &TemplateProperty,
        item: &MenuItem,
        context: &PropertyMap,
        suffix: &str,
    ) -> Option<String> {
        if !prop.condition.is_empty() {
            let mut condition = self.expand_expressions(&prop.condition);
            if !suffix.is_empty() {
                condition = apply_suffix_to_condition(&condition, suffix);
            }
            if !self.eval_condition(&condition, item, context) {
                return None;
            }
        }

        if !prop.from_source.is_empty() {
            let mut source = prop.from_source.clone();
            if !suffix.is_empty() {
                source = apply_suffix_to_from(&source, suffix);
            }
            return Some(from_source_value(&source, item, context));
        }

        let mut value = prop.value.clone();
        if value.contains("$PROPERTY[") {
            value = substitute_property_refs(&value, item, context);
        }
        Some(value)
    }

    /// Resolve a var: the first branch whose condition holds wins; a
    /// branch without a condition is an unconditional default.
    pub(super) fn resolve_var(
        &self,
        var: &TemplateVar,
        item: &MenuItem,
        context: &PropertyMap,
        suffix: &str,
    ) -> Option<String> {
        for branch in &var.values {
            if branch.condition.is_empty() {
                return Some(branch.value.clone());
            }
            let mut condition = self.expand_expressions(&branch.condition);
            if !suffix.is_empty() {
                condition = apply_suffix_to_condition(&condition, suffix);
            }
            if self.eval_condition(&condition, item, context) {
                return Some(branch.value.clone());
            }
        }
        None
    }

    /// Apply a property group. Properties never overwrite existing context
    /// entries; vars do.
    pub(super) fn apply_property_group(
        &self,
        group: &PropertyGroup,
        item: &MenuItem,
        context: &mut PropertyMap,
        suffix: &str,
    ) {
        for prop in &group.properties {
            let mut from_source = prop.from_source.clone();
            let mut condition = prop.condition.clone();
            if !suffix.is_empty() {
                if !from_source.is_empty() {
                    from_source = apply_suffix_to_from(&from_source, suffix);
                }
                if !condition.is_empty() {
                    condition = self.expand_expressions(&condition);
                    condition = apply_suffix_to_condition(&condition, suffix);
                }
            }
            let suffixed = TemplateProperty {
                name: prop.name.clone(),
                value: prop.value.clone(),
                from_source,
                condition,
            };
            if let Some(value) = self.resolve_property(&suffixed, item, context, "") {
                if !context.contains_key(&prop.name) {
                    context.insert(prop.name.clone(), value);
                }
            }
        }

        for var in &group.vars {
            if let Some(value) = self.resolve_var(var, item, context, suffix) {
                context.insert(var.name.clone(), value);
            }
        }
    }

    /// Apply a preset: the first row whose condition holds contributes all
    /// its values, without overwriting existing context entries.
    pub(super) fn apply_preset(
        &self,
        reference: &Reference,
        item: &MenuItem,
        context: &mut PropertyMap,
        override_suffix: &str,
    ) {
        let Some(preset) = self.schema.preset(&reference.name) else {
            tracing::debug!("Preset '{}' not found", reference.name);
            return;
        };
        let suffix = if override_suffix.is_empty() {
            reference.suffix.as_str()
        } else {
            override_suffix
        };

        for row in &preset.rows {
            if !row.condition.is_empty() {
                let mut condition = self.expand_expressions(&row.condition);
                if !suffix.is_empty() {
                    condition = apply_suffix_to_condition(&condition, suffix);
                }
                if self.eval_condition(&condition, item, context) {
                    for (name, value) in &row.values {
                        if !context.contains_key(name) {
                            context.insert(name.clone(), value.clone());
                        }
                    }
                    return;
                }
            } else {
                for (name, value) in &row.values {
                    if !context.contains_key(name) {
                        context.insert(name.clone(), value.clone());
                    }
                }
                return;
            }
        }
    }

    /// Apply a preset group: children evaluate in document order and the
    /// first one that yields values wins.
    fn apply_preset_group(
        &self,
        reference: &Reference,
        item: &MenuItem,
        context: &mut PropertyMap,
        override_suffix: &str,
    ) {
        let Some(group) = self.schema.preset_group(&reference.name) else {
            tracing::debug!("Preset group '{}' not found", reference.name);
            return;
        };
        let suffix = if override_suffix.is_empty() {
            reference.suffix.as_str()
        } else {
            override_suffix
        };

        for child in &group.children {
            if !child.condition().is_empty() {
                let mut condition = self.expand_expressions(child.condition());
                if !suffix.is_empty() {
                    condition = apply_suffix_to_condition(&condition, suffix);
                }
                if !self.eval_condition(&condition, item, context) {
                    continue;
                }
            }

            match child {
                PresetGroupChild::PresetRef { name, .. } => {
                    let Some(preset) = self.schema.preset(name) else {
                        tracing::debug!("Preset '{}' not found", name);
                        continue;
                    };
                    if let Some(values) = self.preset_values(preset, item, context, suffix) {
                        if !values.is_empty() {
                            for (name, value) in values {
                                if !context.contains_key(name) {
                                    context.insert(name.clone(), value.clone());
                                }
                            }
                            return;
                        }
                    }
                }
                PresetGroupChild::Inline { values, .. } => {
                    if !values.is_empty() {
                        for (name, value) in values {
                            if !context.contains_key(name) {
                                context.insert(name.clone(), value.clone());
                            }
                        }
                        return;
                    }
                }
            }
        }
    }

    /// Values of the first preset row whose condition holds.
    fn preset_values<'p>(
        &self,
        preset: &'p Preset,
        item: &MenuItem,
        context: &PropertyMap,
        suffix: &str,
    ) -> Option<&'p PropertyMap> {
        for row in &preset.rows {
            if row.condition.is_empty() {
                return Some(&row.values);
            }
            let mut condition = self.expand_expressions(&row.condition);
            if !suffix.is_empty() {
                condition = apply_suffix_to_condition(&condition, suffix);
            }
            if self.eval_condition(&condition, item, context) {
                return Some(&row.values);
            }
        }
        None
    }

    /// Fill in fallback values for properties the item does not set.
    ///
    /// Suffixed variants (`widgetArt.2`) are covered too: every numeric
    /// suffix present in the item's property names gets its own fallback
    /// pass with suffixed conditions.
    fn apply_fallbacks(&self, item: &MenuItem, context: &mut PropertyMap) {
        let Some(schema) = self.property_schema else {
            return;
        };

        // Bare properties first, then suffixes in first-observed order
        let mut suffixes: Vec<String> = vec![String::new()];
        for prop_name in item.properties.keys() {
            if let Some((_, digits)) = prop_name.rsplit_once('.') {
                if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                    let suffix = format!(".{digits}");
                    if !suffixes.contains(&suffix) {
                        suffixes.push(suffix);
                    }
                }
            }
        }

        for (prop_name, fallback) in &schema.fallbacks {
            for suffix in &suffixes {
                let suffixed_prop = format!("{prop_name}{suffix}");
                if context.contains_key(&suffixed_prop)
                    || item.properties.contains_key(&suffixed_prop)
                {
                    continue;
                }
                for rule in &fallback.rules {
                    if rule.condition.is_empty() {
                        context.insert(suffixed_prop.clone(), rule.value.clone());
                        break;
                    }
                    let mut condition = rule.condition.clone();
                    if !suffix.is_empty() {
                        condition = apply_suffix_to_condition(&condition, suffix);
                    }
                    if self.eval_condition(&condition, item, context) {
                        context.insert(suffixed_prop.clone(), rule.value.clone());
                        break;
                    }
                }
            }
        }
    }

    /// All template conditions must hold for the item. Evaluated with an
    /// empty context, so only raw item properties are visible.
    pub(super) fn check_conditions(
        &self,
        conditions: &[String],
        item: &MenuItem,
        suffix: &str,
    ) -> bool {
        for condition in conditions {
            let mut expanded = self.expand_expressions(condition);
            if !suffix.is_empty() {
                expanded = apply_suffix_to_condition(&expanded, suffix);
            }
            if !self.eval_condition(&expanded, item, &PropertyMap::new()) {
                return false;
            }
        }
        true
    }

    /// Evaluate a condition against item properties overlaid with the
    /// context. `$EXP` references expand first; leftover nosuffix markers
    /// are stripped.
    pub(super) fn eval_condition(
        &self,
        condition: &str,
        item: &MenuItem,
        context: &PropertyMap,
    ) -> bool {
        let condition = self.expand_expressions(condition);
        let condition = strip_nosuffix_markers(&condition);

        let mut properties = item.properties.clone();
        for (name, value) in context {
            properties.insert(name.clone(), value.clone());
        }

        evaluate_condition(&condition, &properties)
    }

    /// Context for one submenu item inside an `insert` expansion: submenu
    /// defaults and item properties plus `index`, `name`, `menu`, `label`.
    pub(super) fn build_items_context(
        &self,
        sub_item: &MenuItem,
        sub_idx: usize,
        submenu: &Menu,
    ) -> PropertyMap {
        let mut context: PropertyMap = submenu.defaults.properties.clone();
        for (name, value) in &sub_item.properties {
            context.insert(name.clone(), value.clone());
        }
        context.insert("index".to_string(), sub_idx.to_string());
        context.insert("name".to_string(), sub_item.name.clone());
        context.insert("menu".to_string(), submenu.name.clone());
        context.insert("label".to_string(), sub_item.label.clone());

        self.apply_fallbacks(sub_item, &mut context);

        context
    }
}
