//! Kodi `<variable>` generation.
//!
//! Variable definitions instantiate once per matching menu item; the
//! output name itself goes through `$PROPERTY` substitution, so one
//! definition can fan out to per-item variables. Same-named results
//! merge by appending value children, which lets several templates
//! contribute branches to one variable.

use indexmap::IndexMap;

use crate::markup::{MarkupTree, NodeId};
use crate::model::menu::MenuItem;
use crate::model::template::{Reference, VariableDefinition};
use crate::model::PropertyMap;
use crate::suffix::apply_suffix_to_condition;

use super::expand::substitute_property_refs;
use super::TemplateBuilder;

impl<'a> TemplateBuilder<'a> {
    /// Instantiate a variable definition for one menu item.
    ///
    /// The definition's condition gates the whole variable. Content is
    /// copied with `$PROPERTY` substituted throughout; the name attribute
    /// is overwritten with the substituted output name.
    pub(super) fn build_variable(
        &self,
        out: &mut MarkupTree,
        var_def: &VariableDefinition,
        context: &PropertyMap,
        item: &MenuItem,
    ) -> Option<NodeId> {
        if !var_def.condition.is_empty() {
            let condition = self.expand_expressions(&var_def.condition);
            if !self.eval_condition(&condition, item, context) {
                return None;
            }
        }

        let var_elem = out.copy_subtree(&self.schema.markup, var_def.content);

        let output_name = if !var_def.output.is_empty() {
            substitute_property_refs(&var_def.output, item, context)
        } else {
            let original = match out.node(var_elem).attr("name") {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => var_def.name.clone(),
            };
            substitute_property_refs(&original, item, context)
        };
        out.node_mut(var_elem).set_attr("name", output_name);

        substitute_variable_content(out, var_elem, context, item);

        Some(var_elem)
    }

    /// Build all variables a variable-group reference selects.
    ///
    /// Nested group references recurse first, inheriting the effective
    /// suffix; then each variable reference's condition is suffixed,
    /// expanded and evaluated. `override_suffix` takes precedence over
    /// the reference's own suffix.
    pub(super) fn build_variable_group(
        &self,
        out: &mut MarkupTree,
        group_ref: &Reference,
        context: &PropertyMap,
        item: &MenuItem,
        variable_map: &mut IndexMap<String, NodeId>,
        override_suffix: &str,
    ) {
        if !group_ref.condition.is_empty() {
            let condition = self.expand_expressions(&group_ref.condition);
            if !self.eval_condition(&condition, item, context) {
                return;
            }
        }

        let Some(var_group) = self.schema.variable_group(&group_ref.name) else {
            tracing::debug!("Variable group '{}' not found", group_ref.name);
            return;
        };

        let suffix = if override_suffix.is_empty() {
            group_ref.suffix.as_str()
        } else {
            override_suffix
        };

        for nested in &var_group.group_refs {
            let nested_ref = Reference {
                name: nested.name.clone(),
                suffix: suffix.to_string(),
                condition: String::new(),
            };
            self.build_variable_group(out, &nested_ref, context, item, variable_map, "");
        }

        for var_ref in &var_group.references {
            let mut condition = var_ref.condition.clone();
            if !suffix.is_empty() && !condition.is_empty() {
                condition = apply_suffix_to_condition(&condition, suffix);
            }
            if !condition.is_empty() {
                condition = self.expand_expressions(&condition);
                if !self.eval_condition(&condition, item, context) {
                    continue;
                }
            }

            let Some(var_def) = self.schema.variable_definition(&var_ref.name) else {
                tracing::debug!("Variable '{}' not found", var_ref.name);
                continue;
            };
            if let Some(var_id) = self.build_variable(out, var_def, context, item) {
                add_variable(out, var_id, variable_map);
            }
        }
    }
}

/// Merge a built variable into the map: same-named variables append
/// their children to the existing element; unnamed ones are dropped.
pub(super) fn add_variable(
    out: &mut MarkupTree,
    var_id: NodeId,
    variable_map: &mut IndexMap<String, NodeId>,
) {
    let var_name = out.node(var_id).attr("name").unwrap_or("").to_string();
    if var_name.is_empty() {
        return;
    }

    if let Some(&existing) = variable_map.get(&var_name) {
        let children: Vec<NodeId> = out.node(var_id).children().to_vec();
        for child in children {
            out.append_child(existing, child);
        }
    } else {
        variable_map.insert(var_name, var_id);
    }
}

/// `$PROPERTY` substitution over a variable's copied content tree.
fn substitute_variable_content(
    out: &mut MarkupTree,
    elem: NodeId,
    context: &PropertyMap,
    item: &MenuItem,
) {
    if let Some(text) = out.node(elem).text.clone() {
        out.node_mut(elem).text = Some(substitute_property_refs(&text, item, context));
    }
    if let Some(tail) = out.node(elem).tail.clone() {
        out.node_mut(elem).tail = Some(substitute_property_refs(&tail, item, context));
    }
    let attrs: Vec<(String, String)> = out
        .node(elem)
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    for (name, value) in attrs {
        let substituted = substitute_property_refs(&value, item, context);
        out.node_mut(elem).set_attr(&name, substituted);
    }

    let children: Vec<NodeId> = out.node(elem).children().to_vec();
    for child in children {
        substitute_variable_content(out, child, context, item);
    }
}
