//! Node tree for the Sparrow browser.
//!
//! [DOM Living Standard § 4 Nodes](https://dom.spec.whatwg.org/#nodes)
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. A child
//! knows its parent only by index, so there are no owning cycles and the
//! tree can be shared across threads once built.
//!
//! The tree only grows: [`DomTree::append`] creates a node already attached
//! to its parent, which makes "every node except the Document has exactly
//! one parent" hold by construction. Nothing is ever detached or moved.

mod attributes;
mod query;

pub use attributes::Attributes;
pub use query::{Descendants, MatchingElements};

/// Index of a node in its [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The Document node, present in every tree.
    pub const ROOT: Self = Self(0);
}

/// What a node is.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    /// The tree root.
    Document,
    /// An element with its tag and attributes.
    Element(ElementData),
    /// Character data, references already decoded.
    Text(String),
    /// `<!-- ... -->`
    Comment(String),
}

/// Tag name and attributes of an element.
///
/// Namespaces are not tracked; every element is an HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Local name, ASCII-lowercase.
    pub tag_name: String,
    /// Attributes in source order.
    pub attrs: Attributes,
}

impl ElementData {
    /// Element data for `tag_name`, lowercased.
    #[must_use]
    pub fn new(tag_name: &str, attrs: Attributes) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
        }
    }

    /// Value of attribute `name`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    /// Returns true if attribute `name` is present, whatever its value.
    /// Boolean attributes such as `disabled` and `checked` work this way.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains(name)
    }

    /// The `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id")
    }

    /// Returns true if the tag is `tag`, ignoring ASCII case.
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }
}

/// One node: its kind and its place in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// What the node is.
    #[must_use]
    pub const fn kind(&self) -> &NodeType {
        &self.kind
    }

    /// The parent; `None` only for the Document.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in tree order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An append-only node arena rooted at a Document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// A tree holding only the Document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeType::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Number of nodes, the Document included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the Document node cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at `id`.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// [§ 4.2.3 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// Create a node of `kind` as the last child of `parent`. An unknown
    /// `parent` means the Document.
    pub fn append(&mut self, parent: NodeId, kind: NodeType) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            NodeId::ROOT
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append character data to `parent`, extending its last child when that
    /// is already a text node.
    ///
    /// [§ 13.2.6.1 Insert a character](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-character)
    /// "If there is a Text node immediately before the adjusted insertion
    /// location, then append data to that Text node's data."
    pub fn append_text(&mut self, parent: NodeId, data: &str) -> NodeId {
        if let Some(&last) = self.children(parent).last()
            && let NodeType::Text(text) = &mut self.nodes[last.0].kind
        {
            text.push_str(data);
            return last;
        }
        self.append(parent, NodeType::Text(data.to_string()))
    }

    /// Mutable element data, for merging attributes during parsing.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children of `id`; empty for an unknown node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[][..], Node::children)
    }

    /// Ancestors of `id`, nearest first, ending at the Document.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&node| self.parent(node))
    }

    /// [§ 4.2 Node tree](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// Returns true if `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// The nearest strict ancestor that is a `tag` element.
    #[must_use]
    pub fn closest_ancestor(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| self.element(a).is_some_and(|e| e.is(tag)))
    }

    /// Element data, if `id` is an element.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.get(id)?.kind() {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Character data, if `id` is a text node.
    #[must_use]
    pub fn text_node(&self, id: NodeId) -> Option<&str> {
        match self.get(id)?.kind() {
            NodeType::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Tag name, if `id` is an element.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    /// Attribute `name` of element `id`.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// [§ 3.1.1](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is
    /// that document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str) -> NodeType {
        NodeType::Element(ElementData::new(tag, Attributes::new()))
    }

    #[test]
    fn test_append_sets_parent_and_order() {
        let mut tree = DomTree::new();
        let div = tree.append(NodeId::ROOT, element("DIV"));
        let a = tree.append(div, element("a"));
        let b = tree.append(div, element("b"));

        assert_eq!(tree.tag_name(div), Some("div"));
        assert_eq!(tree.children(div), &[a, b]);
        assert_eq!(tree.parent(b), Some(div));
        assert_eq!(tree.parent(NodeId::ROOT), None);
    }

    #[test]
    fn test_append_to_unknown_parent_uses_document() {
        let mut tree = DomTree::new();
        let orphan = tree.append(NodeId(42), element("p"));
        assert_eq!(tree.parent(orphan), Some(NodeId::ROOT));
    }

    #[test]
    fn test_append_text_merges_adjacent_text() {
        let mut tree = DomTree::new();
        let p = tree.append(NodeId::ROOT, element("p"));
        let first = tree.append_text(p, "a");
        let same = tree.append_text(p, "b");
        let _ = tree.append(p, element("br"));
        let other = tree.append_text(p, "c");

        assert_eq!(first, same);
        assert_ne!(first, other);
        assert_eq!(tree.text_node(first), Some("ab"));
        assert_eq!(tree.children(p).len(), 3);
    }

    #[test]
    fn test_closest_ancestor() {
        let mut tree = DomTree::new();
        let form = tree.append(NodeId::ROOT, element("form"));
        let p = tree.append(form, element("p"));
        let input = tree.append(p, element("input"));

        assert_eq!(tree.closest_ancestor(input, "FORM"), Some(form));
        assert_eq!(tree.closest_ancestor(form, "form"), None);
        assert!(tree.is_descendant_of(input, form));
        assert!(!tree.is_descendant_of(form, input));
        assert_eq!(tree.ancestors(input).collect::<Vec<_>>(), [p, form, NodeId::ROOT]);
    }
}
