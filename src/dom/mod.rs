//! Owned HTML document tree.
//!
//! The live page and every server fragment are held as a `Document`: an
//! arena of nodes addressed by `NodeId`. Markup is parsed with `tl` (which is
//! read-only) and converted into this tree so it can be patched in place.
//!
//! # Module Structure
//!
//! - `parse` - `tl` to arena conversion
//! - `select` - minimal selector matching (`.class`, `#id`, `tag[attr=v]`)
//! - `serialize` - arena back to markup
//!
//! Nodes that are removed or replaced stay in the arena but become detached
//! (no parent), so they are invisible to lookups that start at the root.

mod parse;
mod select;
mod serialize;

pub use select::Selector;

use thiserror::Error;

/// Errors raised while building a document.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("markup could not be parsed: {0}")]
    Parse(String),
}

/// Handle to a node inside one `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Synthetic document root.
    Root,
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_ascii_lowercase(), value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// True when the node is reachable from the root.
    #[cfg(test)]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // ========================================================================
    // node creation
    // ========================================================================

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub(crate) fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    /// Deep-copy `id` from another document into this one (detached).
    pub fn import(&mut self, other: &Document, id: NodeId) -> NodeId {
        let kind = match other.kind(id) {
            NodeKind::Root => NodeKind::Element(Element::new("div")),
            kind => kind.clone(),
        };
        let copy = self.push(kind);
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // ========================================================================
    // tree mutation
    // ========================================================================

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `node` as the next sibling of `anchor`.
    ///
    /// A detached anchor has no siblings; the node is appended to the root.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        self.detach(node);
        let Some(parent) = self.parent(anchor) else {
            let root = self.root();
            self.append_child(root, node);
            return;
        };
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|&c| c == anchor)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, node);
        self.nodes[node.0].parent = Some(parent);
    }

    /// Put `new` where `old` is; `old` becomes detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.detach(new);
        let Some(parent) = self.nodes[old.0].parent.take() else {
            return;
        };
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(slot) = siblings.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        self.nodes[new.0].parent = Some(parent);
    }

    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    // ========================================================================
    // traversal
    // ========================================================================

    /// `id` and all its descendants, in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// First attached element matching `selector`, in document order.
    pub fn find(&self, selector: &Selector) -> Option<NodeId> {
        self.find_in(self.root(), selector)
    }

    /// First element matching `selector` within the subtree of `scope`.
    pub fn find_in(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.subtree(scope)
            .into_iter()
            .find(|&id| self.element(id).is_some_and(|el| selector.matches(el)))
    }

    /// All attached elements matching `selector`.
    pub fn find_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.subtree(self.root())
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(|el| selector.matches(el)))
            .collect()
    }

    fn first_tag(&self, tag: &str) -> Option<NodeId> {
        self.subtree(self.root())
            .into_iter()
            .find(|&id| self.element(id).is_some_and(|el| el.tag == tag))
    }

    /// `<head>`, or the root for head-less fragments.
    pub fn head(&self) -> NodeId {
        self.first_tag("head").unwrap_or(self.root())
    }

    /// `<body>`, or the root for body-less fragments.
    pub fn body(&self) -> NodeId {
        self.first_tag("body").unwrap_or(self.root())
    }

    /// Concatenated text of a subtree (script/style content excluded).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    /// Direct text children joined verbatim (script and style source).
    pub fn raw_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&child| match self.kind(child) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(el) if crate::utils::html::is_raw_text_element(&el.tag) => {}
            _ => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Anti-forgery token from `<input name="{field}" value="...">`.
    pub fn csrf_token(&self, field: &str) -> Option<String> {
        self.subtree(self.root()).into_iter().find_map(|id| {
            let el = self.element(id)?;
            (el.tag == "input" && el.attr("name") == Some(field))
                .then(|| el.attr("value").unwrap_or_default().to_string())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn test_replace_keeps_siblings() {
        let mut doc =
            Document::parse(r#"<main><p id="a">A</p><div class="result">old</div><p id="b">B</p></main>"#)
                .unwrap();
        let old = doc.find(&sel(".result")).unwrap();
        let mut new_el = Element::new("div");
        new_el.set_attr("class", "result");
        let new = doc.create_element(new_el);
        let text = doc.create_text("new");
        doc.append_child(new, text);

        doc.replace(old, new);

        assert!(!doc.is_attached(old));
        assert_eq!(doc.text_content(doc.find(&sel(".result")).unwrap()), "new");
        assert_eq!(
            doc.to_html(),
            r#"<main><p id="a">A</p><div class="result">new</div><p id="b">B</p></main>"#
        );
    }

    #[test]
    fn test_insert_after_anchor() {
        let mut doc = Document::parse(r#"<form id="f"></form><footer>x</footer>"#).unwrap();
        let anchor = doc.find(&sel("#f")).unwrap();
        let node = doc.create_element(Element::new("section"));
        doc.insert_after(anchor, node);
        assert_eq!(doc.to_html(), r#"<form id="f"></form><section></section><footer>x</footer>"#);
    }

    #[test]
    fn test_import_deep_copies() {
        let src = Document::parse(r#"<div class="result"><b>EDIBLE</b></div>"#).unwrap();
        let mut dst = Document::new();
        let node = src.find(&sel(".result")).unwrap();
        let copy = dst.import(&src, node);
        assert!(!dst.is_attached(copy));
        let root = dst.root();
        dst.append_child(root, copy);
        assert_eq!(dst.to_html(), r#"<div class="result"><b>EDIBLE</b></div>"#);
    }

    #[test]
    fn test_detached_nodes_are_not_found() {
        let mut doc = Document::parse(r#"<div class="result">x</div>"#).unwrap();
        let node = doc.find(&sel(".result")).unwrap();
        doc.remove(node);
        assert!(doc.find(&sel(".result")).is_none());
    }

    #[test]
    fn test_csrf_token() {
        let doc = Document::parse(
            r#"<form><input type="hidden" name="csrfmiddlewaretoken" value="tok123"></form>"#,
        )
        .unwrap();
        assert_eq!(doc.csrf_token("csrfmiddlewaretoken").as_deref(), Some("tok123"));
        assert_eq!(doc.csrf_token("other"), None);
    }

    #[test]
    fn test_head_and_body_fallback() {
        let doc = Document::parse("<p>loose</p>").unwrap();
        assert_eq!(doc.head(), doc.root());
        assert_eq!(doc.body(), doc.root());

        let page = Document::parse("<html><head></head><body><p>x</p></body></html>").unwrap();
        assert_eq!(page.element(page.head()).unwrap().tag, "head");
        assert_eq!(page.element(page.body()).unwrap().tag, "body");
    }

    #[test]
    fn test_text_content_skips_scripts() {
        let doc = Document::parse("<div>a<script>var x = 1;</script>b</div>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "ab");
    }
}
