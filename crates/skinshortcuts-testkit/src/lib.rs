//! Shared test helpers for the skinshortcuts workspace.
//!
//! Integration tests assemble menu fixtures and inspect built markup
//! trees. The helpers here keep those tests declarative: menus load
//! from inline JSON and trees render to compact strings, so a test can
//! compare a whole document in a single assertion.

use skinshortcuts_core::markup::{MarkupTree, NodeId};
use skinshortcuts_core::model::menu::{Menu, MenuDefaults, MenuItem};
use skinshortcuts_core::model::PropertyMap;

/// Renders the subtree rooted at `id` as a compact markup string.
///
/// Attributes appear in document order, elements without text or
/// children self-close, and tail text follows the closing tag. No
/// escaping is applied; fixtures are expected to avoid markup
/// metacharacters in text.
///
/// # Arguments
///
/// * `tree` - The tree holding the nodes.
/// * `id` - Root of the subtree to render.
///
/// # Returns
///
/// The rendered markup, e.g. `<include name="x"><label>a</label></include>`.
///
/// # Examples
///
/// ```rust
/// use skinshortcuts_core::markup::MarkupTree;
/// use skinshortcuts_testkit::render_tree;
///
/// let mut tree = MarkupTree::new();
/// let root = tree.alloc("includes");
/// assert_eq!(render_tree(&tree, root), "<includes/>");
/// ```
pub fn render_tree(tree: &MarkupTree, id: NodeId) -> String {
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

/// Deserializes a list of menus from an inline JSON value.
///
/// Accepts the same shape as the serde model: an array of objects with
/// `name`, optional `defaults`, and an `items` array whose entries
/// carry `name` plus optional `label`, `disabled`, and `properties`.
/// Submenus are separate entries in the array, named
/// `{parentItemName}.{suffix}`.
///
/// # Panics
///
/// Panics if the value does not deserialize into `Vec<Menu>`; fixtures
/// are authored inline, so a mismatch is a bug in the test.
///
/// # Examples
///
/// ```rust
/// use skinshortcuts_testkit::menus_from_json;
///
/// let menus = menus_from_json(serde_json::json!([
///     {
///         "name": "mainmenu",
///         "items": [
///             {"name": "movies", "properties": {"widget": "poster"}}
///         ]
///     }
/// ]));
/// assert_eq!(menus[0].items[0].name, "movies");
/// ```
pub fn menus_from_json(value: serde_json::Value) -> Vec<Menu> {
    serde_json::from_value(value).expect("menu fixture should deserialize")
}

/// Deserializes a single menu from an inline JSON value.
///
/// # Panics
///
/// Panics if the value does not deserialize into a `Menu`.
pub fn menu_from_json(value: serde_json::Value) -> Menu {
    serde_json::from_value(value).expect("menu fixture should deserialize")
}

/// Builds a property map from name/value pairs, preserving order.
pub fn props(pairs: &[(&str, &str)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Builds an enabled menu item with the given name and properties and
/// an empty label.
pub fn menu_item(name: &str, properties: PropertyMap) -> MenuItem {
    MenuItem {
        name: name.to_string(),
        label: String::new(),
        properties,
        disabled: false,
    }
}

/// Builds a menu with the given name and items, using default menu
/// properties.
pub fn menu(name: &str, items: Vec<MenuItem>) -> Menu {
    Menu {
        name: name.to_string(),
        items,
        defaults: MenuDefaults::default(),
    }
}

/// Allocates a root element with optional text.
pub fn element(tree: &mut MarkupTree, tag: &str, text: Option<&str>) -> NodeId {
    let id = tree.alloc(tag);
    if let Some(text) = text {
        tree.node_mut(id).text = Some(text.to_string());
    }
    id
}

/// Allocates an element with optional text and appends it to `parent`.
pub fn child(tree: &mut MarkupTree, parent: NodeId, tag: &str, text: Option<&str>) -> NodeId {
    let id = element(tree, tag, text);
    tree.append_child(parent, id);
    id
}
