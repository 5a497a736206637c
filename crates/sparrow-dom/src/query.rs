//! Read-only structural queries over a [`DomTree`].
//!
//! [§ 4.2.6 Mixin ParentNode](https://dom.spec.whatwg.org/#interface-parentnode)
//!
//! Only the primitives needed for form and link discovery are provided:
//! tag-name and attribute matching in tree order. Iterators are lazy and
//! `Clone`, so a query can be restarted from any point.

use crate::{DomTree, NodeId, NodeType};

/// Pre-order ("tree order") iterator over the descendants of a node.
///
/// [§ 4.2 Node tree](https://dom.spec.whatwg.org/#concept-tree-order)
/// "Tree order is preorder, depth-first traversal of a tree."
#[derive(Clone)]
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Elements matching a tag name and, optionally, an attribute value.
#[derive(Clone)]
pub struct MatchingElements<'a> {
    inner: Descendants<'a>,
    tag: String,
    attribute: Option<(String, String)>,
}

impl Iterator for MatchingElements<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.inner.tree;
        self.inner.find(|&id| {
            tree.element(id).is_some_and(|e| {
                (self.tag == "*" || e.tag_name == self.tag)
                    && self
                        .attribute
                        .as_ref()
                        .is_none_or(|(name, value)| e.attr(name) == Some(value.as_str()))
            })
        })
    }
}

impl DomTree {
    /// All descendants of `id` in tree order, excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Every node of the tree in tree order, starting with the Document.
    #[must_use]
    pub fn iter_all(&self) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![NodeId::ROOT],
        }
    }

    /// Elements named `tag` in document order (ASCII case-insensitive).
    /// `"*"` matches every element.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> MatchingElements<'_> {
        self.find_all_in(NodeId::ROOT, tag)
    }

    /// Elements named `tag` among the descendants of `scope`.
    #[must_use]
    pub fn find_all_in(&self, scope: NodeId, tag: &str) -> MatchingElements<'_> {
        MatchingElements {
            inner: self.descendants(scope),
            tag: tag.to_ascii_lowercase(),
            attribute: None,
        }
    }

    /// Elements named `tag` whose attribute `attr` equals `value` exactly.
    #[must_use]
    pub fn find_by_attribute(&self, tag: &str, attr: &str, value: &str) -> MatchingElements<'_> {
        MatchingElements {
            inner: self.descendants(NodeId::ROOT),
            tag: tag.to_ascii_lowercase(),
            attribute: Some((attr.to_string(), value.to_string())),
        }
    }

    /// [§ 4.4 textContent](https://dom.spec.whatwg.org/#dom-node-textcontent)
    ///
    /// "The descendant text content of a node node is the concatenation of the
    /// data of all the Text node descendants of node, in tree order."
    ///
    /// Whitespace is returned exactly as parsed.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        if let Some(text) = self.text_node(id) {
            result.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text_node(node) {
                result.push_str(text);
            }
        }
        result
    }

    /// Number of element nodes in the tree.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.iter_all()
            .filter(|&id| {
                self.get(id)
                    .is_some_and(|n| matches!(n.kind(), NodeType::Element(_)))
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use crate::{DomTree, ElementData, NodeId, NodeType};

    fn build() -> (DomTree, Vec<NodeId>) {
        // <html><form><input name=a><p><input name=b></p></form>tail</html>
        let element = |tag: &str, attrs: &[(&str, &str)]| {
            NodeType::Element(ElementData::new(tag, attrs.iter().copied().collect()))
        };
        let mut tree = DomTree::new();
        let html = tree.append(NodeId::ROOT, element("html", &[]));
        let form = tree.append(html, element("form", &[]));
        let a = tree.append(form, element("INPUT", &[("name", "a")]));
        let p = tree.append(form, element("p", &[]));
        let b = tree.append(p, element("input", &[("name", "b")]));
        let tail = tree.append_text(html, "tail");
        (tree, vec![html, form, a, p, b, tail])
    }

    #[test]
    fn test_find_all_document_order() {
        let (tree, ids) = build();
        let inputs: Vec<NodeId> = tree.find_all("Input").collect();
        assert_eq!(inputs, vec![ids[2], ids[4]]);
    }

    #[test]
    fn test_find_all_is_restartable() {
        let (tree, _) = build();
        let mut query = tree.find_all("input");
        let _ = query.next();
        let restarted = query.clone();
        assert_eq!(query.count(), 1);
        assert_eq!(restarted.count(), 1);
        assert_eq!(tree.find_all("input").count(), 2);
    }

    #[test]
    fn test_find_by_attribute() {
        let (tree, ids) = build();
        let found: Vec<NodeId> = tree.find_by_attribute("input", "name", "b").collect();
        assert_eq!(found, vec![ids[4]]);
        assert_eq!(tree.find_by_attribute("input", "name", "c").count(), 0);
    }

    #[test]
    fn test_star_matches_all_elements() {
        let (tree, _) = build();
        assert_eq!(tree.find_all("*").count(), 5);
        assert_eq!(tree.element_count(), 5);
    }

    #[test]
    fn test_text_content() {
        let (tree, ids) = build();
        assert_eq!(tree.text_content(ids[0]), "tail");
        assert_eq!(tree.text_content(ids[5]), "tail");
        assert_eq!(tree.text_content(ids[1]), "");
    }
}
