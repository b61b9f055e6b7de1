//! A single loaded fragment and its indices.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::FragmentTree;
use super::error::LoaderError;
use super::types::{ElementRef, FragmentPath, FragmentType};
use crate::exs::{self, SerializeError, SerializeOptions};
use crate::xml::{self, Document, NodeId, QName, namespace};

/// Attributes that carry an element's identifier, in lookup order.
pub const ID_ATTRIBUTES: &[(Option<&str>, &str)] = &[
    (None, "id"),
    (None, "uid"),
    (Some(namespace::XMI), "id"),
];

/// One fragment of a model.
///
/// The identifier and type indices are maintained explicitly: after inserting
/// or detaching a subtree, call [`idcache_index`](Self::idcache_index) or
/// [`idcache_remove`](Self::idcache_remove) respectively.
#[derive(Debug)]
pub struct ModelFile {
    path: FragmentPath,
    fragment_type: FragmentType,
    doc: Document,
    idcache: FxHashMap<SmolStr, NodeId>,
    qtypes: IndexMap<QName, IndexSet<NodeId>>,
}

impl ModelFile {
    /// Wrap an already parsed document and index it.
    ///
    /// Returns the identifiers that occurred more than once; the first
    /// occurrence is indexed.
    pub fn new(path: FragmentPath, doc: Document) -> (Self, Vec<SmolStr>) {
        let mut file = Self {
            fragment_type: path.fragment_type(),
            path,
            doc,
            idcache: FxHashMap::default(),
            qtypes: IndexMap::new(),
        };
        let duplicates = file.idcache_rebuild();
        (file, duplicates)
    }

    /// Parse and index a fragment.
    pub fn parse(path: FragmentPath, bytes: &[u8]) -> Result<(Self, Vec<SmolStr>), LoaderError> {
        let doc = xml::parse(bytes).map_err(|source| LoaderError::ParseError {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::new(path, doc))
    }

    pub fn path(&self) -> &FragmentPath {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the tree. Indices are not updated automatically.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn element_ref(&self, node: NodeId) -> ElementRef {
        ElementRef::new(self.doc.id(), node)
    }

    /// The identifier of an element, if it has one.
    pub fn identifier(&self, node: NodeId) -> Option<&str> {
        let elem = self.doc.element(node)?;
        ID_ATTRIBUTES.iter().find_map(|(ns, local)| match ns {
            Some(ns) => elem.get_qualified(&QName::new(*ns, *local)),
            None => elem.get(local),
        })
    }

    /// Qualified type of an element: its resolved `xsi:type`, or its tag when
    /// that is namespaced.
    pub fn qtype_of(&self, node: NodeId) -> Option<QName> {
        let elem = self.doc.element(node)?;
        match elem.xsi_type() {
            Some(value) => self.doc.resolve_prefixed(node, value),
            None => elem.tag.ns.is_some().then(|| elem.tag.clone()),
        }
    }

    /// Look up an indexed identifier.
    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.idcache.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.idcache.contains_key(id)
    }

    /// All indexed identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.idcache.keys().map(SmolStr::as_str)
    }

    /// Identifiers carried by `node` and its descendants.
    pub fn subtree_ids(&self, node: NodeId) -> Vec<(SmolStr, NodeId)> {
        std::iter::once(node)
            .chain(self.doc.descendants(node))
            .filter_map(|n| Some((SmolStr::new(self.identifier(n)?), n)))
            .collect()
    }

    /// Index `node` and its descendants.
    ///
    /// Fails without touching the index if any identifier in the subtree is
    /// already indexed for a different element.
    pub fn idcache_index(&mut self, node: NodeId) -> Result<(), LoaderError> {
        let ids = self.subtree_ids(node);
        let mut seen = FxHashMap::default();
        for (id, n) in &ids {
            let taken = match self.idcache.get(id) {
                Some(existing) => existing != n,
                None => seen.insert(id.clone(), *n).is_some_and(|prev| prev != *n),
            };
            if taken {
                return Err(LoaderError::DuplicateIdentifier(id.to_string()));
            }
        }
        for (id, n) in ids {
            self.idcache.insert(id, n);
        }
        self.index_qtypes(node);
        Ok(())
    }

    /// Remove `node` and its descendants from the indices.
    pub fn idcache_remove(&mut self, node: NodeId) {
        for (id, n) in self.subtree_ids(node) {
            if self.idcache.get(&id) == Some(&n) {
                self.idcache.remove(&id);
            }
        }
        let nodes: Vec<NodeId> = std::iter::once(node).chain(self.doc.descendants(node)).collect();
        for n in nodes {
            if let Some(qtype) = self.qtype_of(n) {
                if let Some(set) = self.qtypes.get_mut(&qtype) {
                    set.shift_remove(&n);
                    if set.is_empty() {
                        self.qtypes.shift_remove(&qtype);
                    }
                }
            }
        }
    }

    /// Rebuild both indices from the current tree.
    ///
    /// Returns identifiers that occur more than once; the first one in document
    /// order wins.
    pub fn idcache_rebuild(&mut self) -> Vec<SmolStr> {
        self.idcache.clear();
        self.qtypes.clear();
        let mut duplicates = Vec::new();
        let root = self.doc.root();
        for (id, n) in self.subtree_ids(root) {
            if self.idcache.contains_key(&id) {
                duplicates.push(id);
            } else {
                self.idcache.insert(id, n);
            }
        }
        self.index_qtypes(root);
        duplicates
    }

    fn index_qtypes(&mut self, node: NodeId) {
        let typed: Vec<(QName, NodeId)> = std::iter::once(node)
            .chain(self.doc.descendants(node))
            .filter_map(|n| Some((self.qtype_of(n)?, n)))
            .collect();
        for (qtype, n) in typed {
            self.qtypes.entry(qtype).or_default().insert(n);
        }
    }

    /// Serialize the whole fragment as it is written to disk.
    pub fn serialize(&self, line_length: usize) -> Result<Vec<u8>, SerializeError> {
        exs::serialize(&self.doc, self.doc.root(), &SerializeOptions::document(line_length))
    }
}

impl FragmentTree for ModelFile {
    fn root(&self) -> NodeId {
        self.doc.root()
    }

    fn fragment_type(&self) -> FragmentType {
        self.fragment_type
    }

    fn iterall(&self) -> impl Iterator<Item = NodeId> + '_ {
        let root = self.doc.root();
        std::iter::once(root).chain(self.doc.descendants(root))
    }

    fn iter_qtypes(&self) -> impl Iterator<Item = &QName> + '_ {
        self.qtypes.keys()
    }

    fn iter_qtype(&self, qtype: &QName) -> impl Iterator<Item = NodeId> + '_ {
        self.qtypes.get(qtype).into_iter().flatten().copied()
    }

    fn add_namespace(&mut self, uri: &str, alias: &str) -> Result<SmolStr, LoaderError> {
        let root = self.doc.root();
        let declared = self
            .doc
            .element(root)
            .map(|e| e.namespaces.clone())
            .unwrap_or_default();
        if let Some((existing, _)) = declared.iter().find(|(_, u)| *u == uri) {
            return Ok(existing.clone());
        }

        let mut candidate = SmolStr::new(alias);
        let mut suffix = 1;
        while declared.contains_key(&candidate) {
            candidate = SmolStr::new(format!("{alias}{suffix}"));
            suffix += 1;
        }
        self.doc.declare_namespace(root, &candidate, uri)?;
        Ok(candidate)
    }
}
