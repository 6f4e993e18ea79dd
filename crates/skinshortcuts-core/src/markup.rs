//! Arena-backed markup tree.
//!
//! Generated skin markup is held as a flat arena of nodes addressed by
//! [`NodeId`] instead of a pointer-linked tree. Schema fragments live in one
//! arena owned by the schema; each build writes into a fresh output arena,
//! copying source subtrees node by node while placeholders are substituted.
//! Nothing in a source arena is ever mutated by a build.
//!
//! A node mirrors the shape of an XML element: a tag, an ordered attribute
//! list, optional `text` (before the first child) and optional `tail` (text
//! following the element's close tag, kept on the element itself so splicing
//! a node in or out carries its trailing text along).

/// Index of a node within a [`MarkupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single markup element.
#[derive(Debug, Clone, Default)]
pub struct MarkupNode {
    pub tag: String,
    pub text: Option<String>,
    pub tail: Option<String>,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
}

impl MarkupNode {
    fn new(tag: &str) -> Self {
        MarkupNode {
            tag: tag.to_string(),
            ..MarkupNode::default()
        }
    }

    /// Attribute value by name, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, overwriting in place; new names append in order.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Remove an attribute, returning its value if it was present.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(index).1)
    }

    /// Attributes in document order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Child node ids in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Append `more` to the tail text.
    pub fn push_tail(&mut self, more: &str) {
        match &mut self.tail {
            Some(tail) => tail.push_str(more),
            None => self.tail = Some(more.to_string()),
        }
    }
}

/// Arena of markup nodes.
#[derive(Debug, Clone, Default)]
pub struct MarkupTree {
    nodes: Vec<MarkupNode>,
}

impl MarkupTree {
    pub fn new() -> Self {
        MarkupTree::default()
    }

    /// Allocate a new childless node with the given tag.
    pub fn alloc(&mut self, tag: &str) -> NodeId {
        self.nodes.push(MarkupNode::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &MarkupNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MarkupNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append `child` to `parent`'s child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` into `parent`'s child list at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[parent.0].children.insert(index, child);
    }

    /// Detach `child` from `parent`'s child list.
    ///
    /// The node stays allocated; detached nodes are simply unreachable from
    /// the rendered tree.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        if let Some(pos) = children.iter().position(|&c| c == child) {
            children.remove(pos);
        }
    }

    /// Deep-copy a subtree rooted at `root` in `source` into this arena.
    ///
    /// Returns the id of the copied root. The copy keeps tag, attributes,
    /// text and tail of every node.
    pub fn copy_subtree(&mut self, source: &MarkupTree, root: NodeId) -> NodeId {
        let src = source.node(root);
        let copied = self.alloc(&src.tag);
        self.nodes[copied.0].text = src.text.clone();
        self.nodes[copied.0].tail = src.tail.clone();
        self.nodes[copied.0].attrs = src.attrs.clone();
        for &child in source.node(root).children() {
            let copied_child = self.copy_subtree(source, child);
            self.append_child(copied, copied_child);
        }
        copied
    }

    /// Structural equality of two subtrees, independent of arena identity
    /// and node numbering.
    pub fn subtree_eq(&self, id: NodeId, other: &MarkupTree, other_id: NodeId) -> bool {
        let a = self.node(id);
        let b = other.node(other_id);
        if a.tag != b.tag || a.text != b.text || a.tail != b.tail || a.attrs != b.attrs {
            return false;
        }
        if a.children.len() != b.children.len() {
            return false;
        }
        a.children
            .iter()
            .zip(b.children.iter())
            .all(|(&ca, &cb)| self.subtree_eq(ca, other, cb))
    }
}
