//! The concrete tree a binding run produces.
//!
//! Nodes live in an arena owned by the [`OutputTree`] and are addressed by
//! [`NodeId`]. Every node the engine emits carries an [`Origin`] pointing back
//! at the definition that produced it.

use indexmap::IndexMap;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};

use crate::domain::{DefinitionRef, FormDefinition, OtherAttributes};

/// Index of a node within its [`OutputTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// What an output node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// The bound root form.
    Form,
    /// One instance of an element.
    Element,
    /// The instance of an attribute.
    Attribute,
    /// The wrapper around the winning alternative of a choice group.
    Choice,
    /// The wrapper around an inlined form reference.
    Reference,
    /// A decoration added by an extension builder.
    Comment,
    /// Any other node added by an extension builder.
    Other,
}

/// The definition (and enclosing form) that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin<'d> {
    /// The form whose definitions were being bound.
    pub form: &'d FormDefinition,
    /// The producing definition.
    pub definition: DefinitionRef<'d>,
}

/// A node of an [`OutputTree`].
#[derive(Debug, Clone)]
pub struct OutputNode<'d> {
    kind: NodeKind,
    name: String,
    value: Option<String>,
    attributes: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    origin: Option<Origin<'d>>,
}

impl<'d> OutputNode<'d> {
    fn new(kind: NodeKind, name: String, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            name,
            value: None,
            attributes: IndexMap::new(),
            parent,
            children: Vec::new(),
            origin: None,
        }
    }

    /// The node kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scalar value, if one was set.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Iterates over the attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The parent node; `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The children, in emission order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The definition that produced the node.
    #[must_use]
    pub const fn origin(&self) -> Option<&Origin<'d>> {
        self.origin.as_ref()
    }
}

/// An arena of output nodes with a single root.
///
/// # Panics
///
/// Methods taking a [`NodeId`] panic when given an id from another tree.
#[derive(Debug, Clone)]
pub struct OutputTree<'d> {
    nodes: Vec<OutputNode<'d>>,
}

impl<'d> OutputTree<'d> {
    /// Creates a tree holding only its root node.
    #[must_use]
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            nodes: vec![OutputNode::new(kind, name.into(), None)],
        }
    }

    /// The root node id.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a new child to `parent` and returns its id.
    pub fn attach_child(&mut self, parent: NodeId, kind: NodeKind, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(OutputNode::new(kind, name.into(), Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Sets (or replaces) an attribute on a node.
    pub fn set_attribute(&mut self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.nodes[node.0].attributes.insert(name.into(), value.into());
    }

    /// Copies a definition's other attributes onto a node, verbatim and in
    /// order.
    pub fn copy_attributes(&mut self, node: NodeId, attributes: &OtherAttributes) {
        for (name, value) in attributes.iter() {
            self.set_attribute(node, name, value);
        }
    }

    /// Sets the scalar value of a node.
    pub fn set_value(&mut self, node: NodeId, value: impl Into<String>) {
        self.nodes[node.0].value = Some(value.into());
    }

    /// Attaches the producing definition to a node.
    pub fn set_origin(&mut self, node: NodeId, origin: Origin<'d>) {
        self.nodes[node.0].origin = Some(origin);
    }

    /// Borrows a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &OutputNode<'d> {
        &self.nodes[id.0]
    }

    /// The children of a node, borrowed.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &OutputNode<'d>> {
        self.nodes[id.0].children.iter().map(|child| &self.nodes[child.0])
    }

    /// The ids of the children of `id` named `name`.
    #[must_use]
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|child| self.nodes[child.0].name == name)
            .collect()
    }

    /// Every node below `id`, depth first, in emission order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            found.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        found
    }

    /// The total number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Serializes the tree as nested maps, starting from the root.
impl Serialize for OutputTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeView {
            tree: self,
            id: self.root(),
        }
        .serialize(serializer)
    }
}

struct NodeView<'t, 'd> {
    tree: &'t OutputTree<'d>,
    id: NodeId,
}

impl Serialize for NodeView<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.tree.node(self.id);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", &node.kind)?;
        map.serialize_entry("name", &node.name)?;
        if let Some(value) = &node.value {
            map.serialize_entry("value", value)?;
        }
        if !node.attributes.is_empty() {
            map.serialize_entry("attributes", &node.attributes)?;
        }
        if let Some(origin) = &node.origin {
            map.serialize_entry("definition", &origin.definition.label())?;
        }
        if !node.children.is_empty() {
            map.serialize_entry(
                "children",
                &ChildrenView {
                    tree: self.tree,
                    ids: &node.children,
                },
            )?;
        }
        map.end()
    }
}

struct ChildrenView<'t, 'd> {
    tree: &'t OutputTree<'d>,
    ids: &'t [NodeId],
}

impl Serialize for ChildrenView<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.ids.len()))?;
        for &id in self.ids {
            seq.serialize_element(&NodeView {
                tree: self.tree,
                id,
            })?;
        }
        seq.end()
    }
}
