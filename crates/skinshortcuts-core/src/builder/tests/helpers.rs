//! Shared test helpers for template builder tests

use crate::builder::{BuildOutput, TemplateBuilder};
use crate::markup::{MarkupTree, NodeId};
use crate::model::menu::{Menu, MenuDefaults, MenuItem};
use crate::model::template::{Template, TemplateOutput, TemplateSchema};
use crate::model::PropertyMap;

pub(super) fn props(pairs: &[(&str, &str)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(super) fn menu_item(name: &str, properties: &[(&str, &str)]) -> MenuItem {
    MenuItem {
        name: name.to_string(),
        label: String::new(),
        properties: props(properties),
        disabled: false,
    }
}

pub(super) fn labeled_item(name: &str, label: &str, properties: &[(&str, &str)]) -> MenuItem {
    MenuItem {
        label: label.to_string(),
        ..menu_item(name, properties)
    }
}

pub(super) fn disabled_item(name: &str) -> MenuItem {
    MenuItem {
        disabled: true,
        ..menu_item(name, &[])
    }
}

pub(super) fn menu(name: &str, items: Vec<MenuItem>) -> Menu {
    Menu {
        name: name.to_string(),
        items,
        defaults: MenuDefaults::default(),
    }
}

pub(super) fn output(include: &str, id_prefix: &str, suffix: &str) -> TemplateOutput {
    TemplateOutput {
        include: include.to_string(),
        id_prefix: id_prefix.to_string(),
        suffix: suffix.to_string(),
    }
}

/// Template with a single unsuffixed output.
pub(super) fn template_for(include: &str, controls: Option<NodeId>) -> Template {
    Template {
        outputs: vec![output(include, "", "")],
        controls,
        ..Template::default()
    }
}

/// Allocate an element, optionally with text content.
pub(super) fn elem(tree: &mut MarkupTree, tag: &str, text: Option<&str>) -> NodeId {
    let id = tree.alloc(tag);
    if let Some(text) = text {
        tree.node_mut(id).text = Some(text.to_string());
    }
    id
}

/// Allocate an element as a child of `parent`.
pub(super) fn child_elem(
    tree: &mut MarkupTree,
    parent: NodeId,
    tag: &str,
    text: Option<&str>,
) -> NodeId {
    let id = elem(tree, tag, text);
    tree.append_child(parent, id);
    id
}

/// `<controls><label>{text}</label></controls>`
pub(super) fn label_controls(tree: &mut MarkupTree, text: &str) -> NodeId {
    let controls = tree.alloc("controls");
    child_elem(tree, controls, "label", Some(text));
    controls
}

/// Schema with one template writing `label_text` through a single label
/// into the `Probe` include.
pub(super) fn probe_schema(label_text: &str) -> TemplateSchema {
    let mut schema = TemplateSchema::new();
    let controls = label_controls(&mut schema.markup, label_text);
    schema.templates.push(template_for("Probe", Some(controls)));
    schema
}

pub(super) fn build(schema: &TemplateSchema, menus: &[Menu]) -> BuildOutput {
    TemplateBuilder::new(schema, menus).build().unwrap()
}

/// Text of the first child of the last include under the root. For probe
/// schemas this is the generated label text, or the placeholder
/// description when nothing was generated.
pub(super) fn probe_text(built: &BuildOutput) -> String {
    let include = *built.tree.node(built.root).children().last().unwrap();
    let first = built.tree.node(include).children()[0];
    built.tree.node(first).text.clone().unwrap_or_default()
}

/// All probe label texts, one per instantiated item.
pub(super) fn probe_texts(built: &BuildOutput) -> Vec<String> {
    let include = *built.tree.node(built.root).children().last().unwrap();
    built
        .tree
        .node(include)
        .children()
        .iter()
        .map(|&child| built.tree.node(child).text.clone().unwrap_or_default())
        .collect()
}

/// Render a subtree as compact XML-like text for assertions. Attributes
/// keep document order; tail text follows the closing tag. No escaping.
pub(super) fn render(tree: &MarkupTree, id: NodeId) -> String {
    let mut out = String::new();
    render_into(tree, id, &mut out);
    out
}

fn render_into(tree: &MarkupTree, id: NodeId, out: &mut String) {
    let node = tree.node(id);
    out.push('<');
    out.push_str(&node.tag);
    for (name, value) in node.attrs() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(value);
        out.push('"');
    }
    let text = node.text.as_deref().unwrap_or("");
    if text.is_empty() && node.children().is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        out.push_str(text);
        for &child in node.children() {
            render_into(tree, child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
    if let Some(tail) = &node.tail {
        out.push_str(tail);
    }
}
