//! Arena-backed XML document.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{QName, XmlError, namespace};

// ============================================================================
// IDs
// ============================================================================

/// Process-unique identity of a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index of a node inside its owning [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(super) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// NODES
// ============================================================================

/// Tag, attributes and namespace declarations of an element node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: QName,
    /// Attributes in document order.
    pub attributes: IndexMap<QName, String>,
    /// Namespace declarations made on this element (alias → URI).
    ///
    /// The empty alias is the default namespace.
    pub namespaces: IndexMap<SmolStr, SmolStr>,
}

impl Element {
    pub fn new(tag: QName) -> Self {
        Self {
            tag,
            attributes: IndexMap::new(),
            namespaces: IndexMap::new(),
        }
    }

    /// Value of an attribute without namespace.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.ns.is_none() && k.local == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a namespaced (or plain) attribute.
    pub fn get_qualified(&self, name: &QName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The raw `xsi:type` value, if any.
    pub fn xsi_type(&self) -> Option<&str> {
        self.get_qualified(&QName::new(namespace::XSI, "type"))
    }
}

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

/// A node in the arena.
#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// An XML document owning all of its nodes.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    nodes: Vec<Node>,
    top_level: Vec<NodeId>,
    root: NodeId,
}

impl Clone for Document {
    /// Clones get a fresh [`DocumentId`]; node ids stay valid in the copy.
    fn clone(&self) -> Self {
        Self {
            id: DocumentId::next(),
            nodes: self.nodes.clone(),
            top_level: self.top_level.clone(),
            root: self.root,
        }
    }
}

impl Document {
    /// Create a document consisting of a single root element.
    pub fn new(root_tag: QName) -> Self {
        let mut doc = Self {
            id: DocumentId::next(),
            nodes: Vec::new(),
            top_level: Vec::new(),
            root: NodeId(0),
        };
        let root = doc.alloc(NodeData::Element(Element::new(root_tag)));
        doc.top_level.push(root);
        doc.root = root;
        doc
    }

    /// Assemble a document from parsed parts.
    ///
    /// `nodes[i]` is `(parent, children, data)` for the node with index `i`.
    pub(super) fn from_parts(
        nodes: Vec<(Option<NodeId>, Vec<NodeId>, NodeData)>,
        top_level: Vec<NodeId>,
        root: NodeId,
    ) -> Self {
        Self {
            id: DocumentId::next(),
            nodes: nodes
                .into_iter()
                .map(|(parent, children, data)| Node {
                    parent,
                    children,
                    data,
                })
                .collect(),
            top_level,
            root,
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    // ── Access ───────────────────────────────────────────────────────

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root element and its sibling comments/PIs, in document order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.index()).map(|n| &mut n.data) {
            Some(NodeData::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or_default()
    }

    /// Direct element children, skipping text, comments and PIs.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.nodes[c.index()].is_element())
    }

    /// The first text child of an element.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.children(id)
            .iter()
            .find_map(|c| match &self.nodes[c.index()].data {
                NodeData::Text(t) => Some(t.as_str()),
                _ => None,
            })
    }

    /// Ancestors of a node, nearest first, up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Element descendants of a node in pre-order, excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self.children(id).iter().rev().copied().collect();
        Descendants { doc: self, stack }
    }

    /// Whether the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        self.get(id).is_some() && self.ancestors(id).last() == Some(self.root)
    }

    /// Nesting depth below the root (the root has depth 0).
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Namespace declarations in scope at `id` (alias → URI).
    pub fn nsmap(&self, id: NodeId) -> IndexMap<SmolStr, SmolStr> {
        let mut chain: Vec<NodeId> = self.ancestors(id).collect();
        chain.reverse();
        chain.push(id);

        let mut map = IndexMap::new();
        for node in chain {
            if let Some(elem) = self.element(node) {
                for (alias, uri) in &elem.namespaces {
                    map.insert(alias.clone(), uri.clone());
                }
            }
        }
        map
    }

    /// Resolve an alias in the scope of `id`.
    pub fn resolve_alias(&self, id: NodeId, alias: &str) -> Option<SmolStr> {
        if alias == "xml" {
            return Some(SmolStr::new_static(namespace::XML));
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.element(n)?.namespaces.get(alias).cloned())
    }

    /// The alias bound to `uri` in the scope of `id`.
    ///
    /// With `allow_default` unset, the default namespace is never returned
    /// (attributes cannot use it).
    pub fn prefix_for(&self, id: NodeId, uri: &str, allow_default: bool) -> Option<SmolStr> {
        if uri == namespace::XML {
            return Some(SmolStr::new_static("xml"));
        }
        self.nsmap(id)
            .into_iter()
            .find(|(alias, bound)| bound == uri && (allow_default || !alias.is_empty()))
            .map(|(alias, _)| alias)
    }

    /// Resolve a prefixed value such as an `xsi:type` (`alias:Name`).
    pub fn resolve_prefixed(&self, id: NodeId, value: &str) -> Option<QName> {
        let (alias, local) = value.split_once(':').unwrap_or(("", value));
        let ns = self.resolve_alias(id, alias)?;
        Some(QName::new(ns, local))
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, tag: QName) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    /// Create a detached comment.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(text.into()))
    }

    /// Append `child` as the last child of `parent`, moving it if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), XmlError> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` among the children of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), XmlError> {
        if self.element(parent).is_none() {
            return Err(XmlError::NotAnElement(parent.index()));
        }
        if child == self.root {
            return Err(XmlError::RootNode);
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(XmlError::Cycle {
                parent: parent.index(),
                child: child.index(),
            });
        }
        self.unlink(child)?;
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Detach a node (and its subtree) from its parent.
    ///
    /// The subtree stays in the arena and can be re-inserted later.
    pub fn detach(&mut self, id: NodeId) -> Result<(), XmlError> {
        if id == self.root {
            return Err(XmlError::RootNode);
        }
        self.unlink(id)
    }

    fn unlink(&mut self, id: NodeId) -> Result<(), XmlError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(XmlError::NotAnElement(id.index()))?;
        if let Some(old) = node.parent.take() {
            self.nodes[old.index()].children.retain(|c| *c != id);
        }
        self.top_level.retain(|c| *c != id);
        Ok(())
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<QName>,
        value: impl Into<String>,
    ) -> Result<Option<String>, XmlError> {
        let elem = self
            .element_mut(id)
            .ok_or(XmlError::NotAnElement(id.index()))?;
        Ok(elem.attributes.insert(name.into(), value.into()))
    }

    /// Remove an attribute, keeping the order of the remaining ones.
    pub fn remove_attribute(&mut self, id: NodeId, name: &QName) -> Result<Option<String>, XmlError> {
        let elem = self
            .element_mut(id)
            .ok_or(XmlError::NotAnElement(id.index()))?;
        Ok(elem.attributes.shift_remove(name))
    }

    /// Replace the text content of an element that has no element children.
    pub fn set_text(&mut self, id: NodeId, text: Option<&str>) -> Result<(), XmlError> {
        if self.element(id).is_none() {
            return Err(XmlError::NotAnElement(id.index()));
        }
        let nodes = &self.nodes;
        let texts: Vec<NodeId> = nodes[id.index()]
            .children
            .iter()
            .copied()
            .filter(|c| matches!(nodes[c.index()].data, NodeData::Text(_)))
            .collect();
        for t in texts {
            self.unlink(t)?;
        }
        if let Some(text) = text {
            let node = self.alloc(NodeData::Text(text.to_owned()));
            self.nodes[id.index()].children.insert(0, node);
            self.nodes[node.index()].parent = Some(id);
        }
        Ok(())
    }

    /// Declare `alias` for `uri` on an element.
    pub fn declare_namespace(&mut self, id: NodeId, alias: &str, uri: &str) -> Result<(), XmlError> {
        let elem = self
            .element_mut(id)
            .ok_or(XmlError::NotAnElement(id.index()))?;
        elem.namespaces.insert(SmolStr::new(alias), SmolStr::new(uri));
        Ok(())
    }

    /// Remove the declaration of `alias` from an element.
    pub fn undeclare_namespace(&mut self, id: NodeId, alias: &str) -> Result<Option<SmolStr>, XmlError> {
        let elem = self
            .element_mut(id)
            .ok_or(XmlError::NotAnElement(id.index()))?;
        Ok(elem.namespaces.shift_remove(alias))
    }
}

// ============================================================================
// ITERATORS
// ============================================================================

/// Iterator over the ancestors of a node. See [`Document::ancestors`].
#[derive(Clone)]
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over element descendants. See [`Document::descendants`].
#[derive(Clone)]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let node = &self.doc.nodes[id.index()];
            self.stack.extend(node.children.iter().rev().copied());
            if node.is_element() {
                return Some(id);
            }
        }
        None
    }
}
