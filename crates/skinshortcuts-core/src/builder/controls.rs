//! Controls processing: structural markers and text substitution.
//!
//! Template controls are copied into the output arena and rewritten in
//! place. `<skinshortcuts>` markers are resolved in two stages: each
//! element first rewrites itself into an internal marker attribute, then
//! its parent replaces marked children with the expanded content. The
//! two-stage shape keeps sibling order and tail text intact while
//! children are spliced in and out.

use std::collections::HashSet;

use crate::markup::{MarkupNode, MarkupTree, NodeId};
use crate::model::menu::MenuItem;
use crate::model::template::ItemsDefinition;
use crate::model::PropertyMap;

use super::expand::INCLUDE_PATTERN;
use super::TemplateBuilder;

const MARK_INCLUDE: &str = "_skinshortcuts_include";
const MARK_WRAP: &str = "_skinshortcuts_wrap";
const MARK_INSERT: &str = "_skinshortcuts_insert";
const MARK_REMOVE: &str = "_skinshortcuts_remove";

/// Flag an element for removal by its parent, clearing the authored
/// marker attributes.
fn mark_removed(node: &mut MarkupNode) {
    node.set_attr(MARK_REMOVE, "true");
    node.remove_attr("include");
    node.remove_attr("condition");
    node.remove_attr("wrap");
}

impl<'a> TemplateBuilder<'a> {
    /// Copy template controls into the output arena and process them for
    /// one menu item. Returns the copied root; its children are the
    /// generated fragment.
    pub(super) fn process_controls(
        &self,
        out: &mut MarkupTree,
        controls: NodeId,
        context: &PropertyMap,
        item: &MenuItem,
    ) -> NodeId {
        let copied = out.copy_subtree(&self.schema.markup, controls);
        self.process_element(out, copied, context, item);
        copied
    }

    fn process_element(
        &self,
        out: &mut MarkupTree,
        elem: NodeId,
        context: &PropertyMap,
        item: &MenuItem,
    ) {
        if out.node(elem).tag == "skinshortcuts" {
            if out.node(elem).text.as_deref().map(str::trim) == Some("visibility") {
                let visible = format!(
                    "String.IsEqual(Container({}).ListItem.Property(name),{})",
                    self.container, item.name
                );
                let node = out.node_mut(elem);
                node.tag = "visible".to_string();
                node.text = Some(visible);
            }

            let include_attr = out
                .node(elem)
                .attr("include")
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            if let Some(include_name) = include_attr {
                let condition = out
                    .node(elem)
                    .attr("condition")
                    .map(str::to_string)
                    .unwrap_or_default();
                if !condition.is_empty() && !self.eval_condition(&condition, item, context) {
                    mark_removed(out.node_mut(elem));
                    return;
                }

                let defined = self
                    .schema
                    .include(&include_name)
                    .is_some_and(|def| def.controls.is_some());
                if defined {
                    let wrap = out
                        .node(elem)
                        .attr("wrap")
                        .unwrap_or("")
                        .eq_ignore_ascii_case("true");
                    let node = out.node_mut(elem);
                    node.set_attr(MARK_INCLUDE, include_name.as_str());
                    if wrap {
                        node.set_attr(MARK_WRAP, "true");
                    }
                    node.remove_attr("include");
                    node.remove_attr("condition");
                    node.remove_attr("wrap");
                } else {
                    tracing::debug!("Include '{}' not defined; dropping reference", include_name);
                    mark_removed(out.node_mut(elem));
                    return;
                }
            }

            let insert_attr = out
                .node(elem)
                .attr("insert")
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            if let Some(insert_name) = insert_attr {
                let node = out.node_mut(elem);
                node.set_attr(MARK_INSERT, insert_name.as_str());
                node.remove_attr("insert");
                return;
            }
        }

        if let Some(text) = out.node(elem).text.clone() {
            let substituted = self.substitute_text(&text, context, item, None);
            out.node_mut(elem).text = Some(substituted);
        }
        if let Some(tail) = out.node(elem).tail.clone() {
            let substituted = self.substitute_text(&tail, context, item, None);
            out.node_mut(elem).tail = Some(substituted);
        }
        let attrs: Vec<(String, String)> = out
            .node(elem)
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        for (name, value) in attrs {
            let substituted = self.substitute_text(&value, context, item, None);
            out.node_mut(elem).set_attr(&name, substituted);
        }

        handle_include_substitution(out, elem);

        let children: Vec<NodeId> = out.node(elem).children().to_vec();
        let mut removed: Vec<NodeId> = Vec::new();
        for child in children {
            self.process_element(out, child, context, item);
            if out.node(child).attr(MARK_REMOVE).is_some() {
                removed.push(child);
            }
        }

        self.handle_include_markers(out, elem, context, item);
        self.handle_items_markers(out, elem, context, item);

        for child in removed {
            out.remove_child(elem, child);
        }
    }

    /// Replace include-marked children with the referenced include's
    /// expanded controls.
    ///
    /// Wrapped markers become a Kodi `<include name="...">` element that
    /// takes the marker's tail; unwrapped markers splice the fragment in
    /// place, with the tail appended to the last spliced node. A fragment
    /// that expands to nothing drops the tail.
    fn handle_include_markers(
        &self,
        out: &mut MarkupTree,
        elem: NodeId,
        context: &PropertyMap,
        item: &MenuItem,
    ) {
        let mut marked: Vec<(usize, NodeId, String, bool)> = Vec::new();
        for (index, &child) in out.node(elem).children().iter().enumerate() {
            if let Some(name) = out.node(child).attr(MARK_INCLUDE) {
                let wrap = out.node(child).attr(MARK_WRAP) == Some("true");
                marked.push((index, child, name.to_string(), wrap));
            }
        }

        // Back to front so recorded indices stay valid
        for (index, child, include_name, wrap) in marked.into_iter().rev() {
            let controls = self.schema.include(&include_name).and_then(|def| def.controls);
            let Some(controls) = controls else {
                out.remove_child(elem, child);
                continue;
            };

            let expanded = self.process_controls(out, controls, context, item);
            let fragment: Vec<NodeId> = out.node(expanded).children().to_vec();
            let tail = out.node(child).tail.clone();
            out.remove_child(elem, child);

            if wrap {
                let wrapper = out.alloc("include");
                out.node_mut(wrapper).set_attr("name", include_name.as_str());
                for &piece in &fragment {
                    out.append_child(wrapper, piece);
                }
                out.node_mut(wrapper).tail = tail;
                out.insert_child(elem, index, wrapper);
            } else {
                for (offset, &piece) in fragment.iter().enumerate() {
                    out.insert_child(elem, index + offset, piece);
                }
                if let Some(tail) = tail {
                    if !tail.is_empty() {
                        if let Some(&last) = fragment.last() {
                            out.node_mut(last).push_tail(&tail);
                        }
                    }
                }
            }
        }
    }

    /// Replace insert-marked children by iterating an items definition
    /// over the submenu named `{item name}.{source}`.
    fn handle_items_markers(
        &self,
        out: &mut MarkupTree,
        elem: NodeId,
        context: &PropertyMap,
        item: &MenuItem,
    ) {
        let mut marked: Vec<(usize, NodeId, String)> = Vec::new();
        for (index, &child) in out.node(elem).children().iter().enumerate() {
            if let Some(name) = out.node(child).attr(MARK_INSERT) {
                marked.push((index, child, name.to_string()));
            }
        }

        for (index, child, insert_name) in marked.into_iter().rev() {
            let Some(items_def) = self.schema.items_definition(&insert_name) else {
                tracing::debug!("Items definition '{}' not found", insert_name);
                out.remove_child(elem, child);
                continue;
            };

            if !items_def.condition.is_empty()
                && !self.eval_condition(&items_def.condition, item, context)
            {
                out.remove_child(elem, child);
                continue;
            }

            let submenu_id = format!("{}.{}", item.name, items_def.effective_source());
            let Some(submenu) = self.menu_map.get(submenu_id.as_str()).copied() else {
                tracing::debug!("Submenu '{}' not found for items iteration", submenu_id);
                out.remove_child(elem, child);
                continue;
            };
            if submenu.items.is_empty() {
                tracing::debug!("Submenu '{}' has no items", submenu_id);
                out.remove_child(elem, child);
                continue;
            }
            let Some(items_controls) = items_def.controls else {
                out.remove_child(elem, child);
                continue;
            };

            let output_elems: Vec<NodeId> =
                self.schema.markup.node(items_controls).children().to_vec();

            let mut expanded: Vec<NodeId> = Vec::new();
            for (sub_idx, sub_item) in submenu.items.iter().enumerate() {
                let sub_idx = sub_idx + 1;
                if sub_item.disabled {
                    continue;
                }
                if !items_def.filter.is_empty()
                    && !self.eval_condition(&items_def.filter, sub_item, &PropertyMap::new())
                {
                    continue;
                }

                let mut sub_context = self.build_items_context(sub_item, sub_idx, submenu);
                self.apply_items_transformations(&mut sub_context, sub_item, items_def);

                for &source_elem in &output_elems {
                    let cloned = out.copy_subtree(&self.schema.markup, source_elem);
                    self.process_items_element(out, cloned, &sub_context, context, sub_item, item);
                    expanded.push(cloned);
                }
            }

            let tail = out.node(child).tail.clone();
            out.remove_child(elem, child);
            for (offset, &piece) in expanded.iter().enumerate() {
                out.insert_child(elem, index + offset, piece);
            }
            if let Some(tail) = tail {
                if !tail.is_empty() {
                    if let Some(&last) = expanded.last() {
                        out.node_mut(last).push_tail(&tail);
                    }
                }
            }
        }
    }

    /// Property transformations an items definition declares for each
    /// submenu item: properties (first match wins), vars, presets and
    /// property groups, all without an output suffix.
    fn apply_items_transformations(
        &self,
        sub_context: &mut PropertyMap,
        sub_item: &MenuItem,
        items_def: &ItemsDefinition,
    ) {
        let mut resolved: HashSet<&str> = HashSet::new();
        for prop in &items_def.properties {
            if resolved.contains(prop.name.as_str()) {
                continue;
            }
            if let Some(value) = self.resolve_property(prop, sub_item, sub_context, "") {
                sub_context.insert(prop.name.clone(), value);
                resolved.insert(&prop.name);
            }
        }

        for var in &items_def.vars {
            if let Some(value) = self.resolve_var(var, sub_item, sub_context, "") {
                sub_context.insert(var.name.clone(), value);
            }
        }

        for preset_ref in &items_def.preset_refs {
            if !preset_ref.condition.is_empty()
                && !self.eval_condition(&preset_ref.condition, sub_item, sub_context)
            {
                continue;
            }
            self.apply_preset(preset_ref, sub_item, sub_context, "");
        }

        for group_ref in &items_def.property_groups {
            if !group_ref.condition.is_empty()
                && !self.eval_condition(&group_ref.condition, sub_item, sub_context)
            {
                continue;
            }
            if let Some(group) = self.schema.property_group(&group_ref.name) {
                self.apply_property_group(group, sub_item, sub_context, "");
            }
        }
    }

    /// Substitution inside items expansion. `$PROPERTY` resolves against
    /// the submenu item, `$PARENT` against the parent item. No nested
    /// marker handling here.
    fn process_items_element(
        &self,
        out: &mut MarkupTree,
        elem: NodeId,
        sub_context: &PropertyMap,
        parent_context: &PropertyMap,
        sub_item: &MenuItem,
        parent_item: &MenuItem,
    ) {
        let parent = Some((parent_context, parent_item));
        if let Some(text) = out.node(elem).text.clone() {
            let substituted = self.substitute_text(&text, sub_context, sub_item, parent);
            out.node_mut(elem).text = Some(substituted);
        }
        if let Some(tail) = out.node(elem).tail.clone() {
            let substituted = self.substitute_text(&tail, sub_context, sub_item, parent);
            out.node_mut(elem).tail = Some(substituted);
        }
        let attrs: Vec<(String, String)> = out
            .node(elem)
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        for (name, value) in attrs {
            let substituted = self.substitute_text(&value, sub_context, sub_item, parent);
            out.node_mut(elem).set_attr(&name, substituted);
        }

        let children: Vec<NodeId> = out.node(elem).children().to_vec();
        for child in children {
            self.process_items_element(out, child, sub_context, parent_context, sub_item, parent_item);
        }
    }
}

/// Convert the first `$INCLUDE[name]` in an element's text into a
/// structural `<include>name</include>` child at position zero. Text
/// after the placeholder becomes the child's tail; later occurrences in
/// the same text stay literal.
fn handle_include_substitution(out: &mut MarkupTree, elem: NodeId) {
    let Some(text) = out.node(elem).text.clone() else {
        return;
    };
    if text.is_empty() {
        return;
    }
    let Some(caps) = INCLUDE_PATTERN.captures(&text) else {
        return;
    };
    let Some(matched) = caps.get(0) else {
        return;
    };
    let include_name = caps[1].to_string();

    let child = out.alloc("include");
    out.node_mut(child).text = Some(include_name);
    out.node_mut(child).tail = Some(text[matched.end()..].to_string());
    out.node_mut(elem).text = Some(text[..matched.start()].to_string());
    out.insert_child(elem, 0, child);
}
