//! Mutable markup tree
//!
//! Nodes are reference-counted handles; cloning a [`Node`] clones the handle,
//! not the subtree (use [`Node::deep_clone`] for that). Parents are held
//! weakly so a detached subtree is freed once nothing refers to it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ParseError;
use crate::markup::ast::{Attribute, Item};

static NODE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a markup node, assigned at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NODE_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Container for top-level nodes; serializes as its children
    Document,
    Element {
        tag: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

struct NodeData {
    id: NodeId,
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<Node>,
}

/// Handle to a node of the markup tree
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Node(Rc::new(RefCell::new(NodeData {
            id: NodeId::next(),
            kind,
            parent: Weak::new(),
            children: Vec::new(),
        })))
    }

    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document)
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Element {
            tag: tag.into(),
            attributes: Vec::new(),
        })
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text(content.into()))
    }

    /// Build a tree from parsed items under a fresh document node
    pub(crate) fn from_items(items: Vec<Item>) -> Self {
        let doc = Self::document();
        for item in items {
            doc.append_child(&Self::from_item(item));
        }
        doc
    }

    fn from_item(item: Item) -> Self {
        match item {
            Item::Text(t) => Self::text(t),
            Item::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                let node = Self::with_kind(NodeKind::Element { tag, attributes });
                for child in children {
                    node.append_child(&Self::from_item(child));
                }
                node
            }
        }
    }

    pub fn id(&self) -> NodeId {
        self.0.borrow().id
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element { .. })
    }

    /// Tag name for elements
    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    /// DOM-style node name: the tag, `#text` or `#document`
    pub fn node_name(&self) -> String {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => tag.clone(),
            NodeKind::Text(_) => "#text".to_string(),
            NodeKind::Document => "#document".to_string(),
        }
    }

    /// Text content of a text node
    pub fn text_content(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn set_text(&self, content: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.0.borrow_mut().kind {
            *t = content.into();
        }
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes.clone(),
            _ => Vec::new(),
        }
    }

    pub fn has_attributes(&self) -> bool {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => !attributes.is_empty(),
            _ => false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone()),
            _ => None,
        }
    }

    /// Set an attribute, keeping its position when it already exists
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            let value = value.into();
            match attributes.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value,
                None => attributes.push(Attribute::new(name, value)),
            }
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            let pos = attributes.iter().position(|a| a.name == name)?;
            return Some(attributes.remove(pos).value);
        }
        None
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    /// Position of `child` among this node's children
    pub fn child_index(&self, child: &Node) -> Option<usize> {
        self.0.borrow().children.iter().position(|c| c.ptr_eq(child))
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent
                .0
                .borrow_mut()
                .children
                .retain(|c| !c.ptr_eq(self));
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    fn adopt(&self, child: &Node) {
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
    }

    pub fn append_child(&self, child: &Node) {
        self.adopt(child);
        self.0.borrow_mut().children.push(child.clone());
    }

    /// Replace `remove` children starting at `index` with `nodes`
    pub fn splice_children(&self, index: usize, remove: usize, nodes: &[Node]) {
        for node in nodes {
            let ours = node.parent().is_some_and(|p| p.ptr_eq(self));
            if !ours {
                node.detach();
            }
        }
        let removed: Vec<Node> = {
            let mut data = self.0.borrow_mut();
            let start = index.min(data.children.len());
            let end = (start + remove).min(data.children.len());
            data.children
                .splice(start..end, nodes.iter().cloned())
                .collect()
        };
        for node in removed {
            if !nodes.iter().any(|n| n.ptr_eq(&node)) {
                node.0.borrow_mut().parent = Weak::new();
            }
        }
        for node in nodes {
            node.0.borrow_mut().parent = Rc::downgrade(&self.0);
        }
    }

    /// Replace `old` with the given nodes; returns false if `old` is not a child
    pub fn replace_child(&self, nodes: &[Node], old: &Node) -> bool {
        match self.child_index(old) {
            Some(index) => {
                self.splice_children(index, 1, nodes);
                true
            }
            None => false,
        }
    }

    /// Replace all children
    pub fn set_children(&self, nodes: &[Node]) {
        let len = self.0.borrow().children.len();
        self.splice_children(0, len, nodes);
    }

    /// Replace the children with freshly parsed markup
    pub fn set_inner_markup(&self, source: &str) -> Result<(), Vec<ParseError>> {
        let doc = crate::markup::parse(source)?;
        self.set_children(&doc.children());
        Ok(())
    }

    /// Copy of this node without children; elements keep their tag but not
    /// their attributes
    pub fn shallow_copy(&self) -> Node {
        let kind = match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => NodeKind::Element {
                tag: tag.clone(),
                attributes: Vec::new(),
            },
            other => other.clone(),
        };
        Self::with_kind(kind)
    }

    /// Independent copy of the whole subtree with fresh node ids
    pub fn deep_clone(&self) -> Node {
        let copy = Self::with_kind(self.kind());
        for child in self.children() {
            copy.append_child(&child.deep_clone());
        }
        copy
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Serialize the subtree as HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Document => {
                for child in &data.children {
                    child.write_html(out);
                }
            }
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for attr in attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&attr.value));
                    out.push('"');
                }
                out.push('>');
                for child in &data.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:?}, {})", self.id(), self.node_name())
    }
}

/// Serialize a list of sibling nodes
pub fn fragment_html(nodes: &[Node]) -> String {
    nodes.iter().map(Node::to_html).collect()
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    #[test]
    fn test_round_trip_serialization() {
        let doc = parse(r#"<div class="box"><p>a &amp; b</p></div>"#).expect("Should parse");
        assert_eq!(doc.to_html(), r#"<div class="box"><p>a &amp; b</p></div>"#);
    }

    #[test]
    fn test_remove_attribute() {
        let el = Node::element("a");
        el.set_attribute("href", "x");
        el.set_attribute("title", "y");
        assert_eq!(el.remove_attribute("href"), Some("x".to_string()));
        assert_eq!(el.remove_attribute("href"), None);
        assert_eq!(el.attributes(), vec![Attribute::new("title", "y")]);
    }

    #[test]
    fn test_replace_child_with_fragment() {
        let parent = Node::element("ul");
        let placeholder = Node::element("li");
        parent.append_child(&placeholder);
        parent.append_child(&Node::text("tail"));

        let a = Node::text("a");
        let b = Node::text("b");
        assert!(parent.replace_child(&[a.clone(), b], &placeholder));
        assert_eq!(parent.to_html(), "<ul>abtail</ul>");
        assert!(placeholder.parent().is_none());
        assert!(a.parent().expect("attached").ptr_eq(&parent));
    }

    #[test]
    fn test_append_moves_node() {
        let first = Node::element("div");
        let second = Node::element("div");
        let child = Node::text("x");
        first.append_child(&child);
        second.append_child(&child);
        assert!(first.children().is_empty());
        assert_eq!(second.children().len(), 1);
    }

    #[test]
    fn test_set_inner_markup() {
        let el = Node::element("div");
        el.append_child(&Node::text("old"));
        el.set_inner_markup("<b>new</b>").expect("Should parse");
        assert_eq!(el.to_html(), "<div><b>new</b></div>");
    }

    #[test]
    fn test_deep_clone_has_fresh_ids() {
        let doc = parse("<p><i>x</i></p>").expect("Should parse");
        let p = doc.children()[0].clone();
        let copy = p.deep_clone();
        assert_ne!(p.id(), copy.id());
        assert_eq!(p.to_html(), copy.to_html());
    }
}
