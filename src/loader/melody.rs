//! The model repository.

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use uuid::Uuid;

use super::error::LoaderError;
use super::links::{self, Link};
use super::modelfile::{ID_ATTRIBUTES, ModelFile};
use super::options::{LoaderBuilder, LoaderOptions, SaveOptions};
use super::reservation::{Reservations, UuidReservation, is_valid_identifier};
use super::tmpdir::TempProjectDir;
use super::types::{ElementRef, FragmentPath, FragmentType, MAIN_RESOURCE, ModelInfo};
use super::{FragmentTree, ModelLoader};
use crate::filehandler::FileHandler;
use crate::xml::{Document, DocumentId, Element, NodeId, QName, namespace};

/// Viewpoint whose version is reported as the tool version.
pub const CAPELLA_VIEWPOINT: &str = "org.polarsys.capella.core.viewpoint";

const UNKNOWN_VERSION: &str = "UNKNOWN";
const METADATA_TAG: &str = "Metadata";
const VIEWPOINT_REFERENCES: &str = "viewpointReferences";
const SEMANTIC_RESOURCES: &str = "semanticResources";

/// Lifecycle of a [`MelodyLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Loading,
    Ready,
    Saving,
}

/// A model split over several fragment files.
pub struct MelodyLoader {
    resources: IndexMap<SmolStr, Box<dyn FileHandler>>,
    entrypoint: FragmentPath,
    trees: IndexMap<FragmentPath, ModelFile>,
    by_doc: FxHashMap<DocumentId, FragmentPath>,
    reservations: Reservations,
    /// Viewpoints activated on a model without metadata fragment.
    memory_viewpoints: IndexMap<String, String>,
    corrupt: bool,
    state: LoaderState,
    options: LoaderOptions,
}

impl fmt::Debug for MelodyLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MelodyLoader")
            .field("entrypoint", &self.entrypoint)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("fragments", &self.trees.keys().collect::<Vec<_>>())
            .field("corrupt", &self.corrupt)
            .field("state", &self.state)
            .finish()
    }
}

impl MelodyLoader {
    /// Load a model from a single resource with default options.
    pub fn new(handler: impl FileHandler + 'static, entrypoint: &str) -> Result<Self, LoaderError> {
        LoaderBuilder::new(handler).load(entrypoint)
    }

    pub(crate) fn load_with(
        resources: IndexMap<SmolStr, Box<dyn FileHandler>>,
        entrypoint: &str,
        options: LoaderOptions,
    ) -> Result<Self, LoaderError> {
        let path = links::join("", entrypoint)
            .ok_or_else(|| LoaderError::InvalidEntrypoint(entrypoint.to_owned()))?;
        let entrypoint = FragmentPath::main(path);
        if entrypoint.fragment_type() != FragmentType::Visual {
            return Err(LoaderError::InvalidEntrypoint(entrypoint.to_string()));
        }

        let mut loader = Self {
            resources,
            entrypoint,
            trees: IndexMap::new(),
            by_doc: FxHashMap::default(),
            reservations: Reservations::default(),
            memory_viewpoints: IndexMap::new(),
            corrupt: false,
            state: LoaderState::Loading,
            options,
        };
        loader.load_fragments()?;

        let required = loader.options.required_viewpoints.clone();
        for (name, version) in &required {
            loader.activate_viewpoint(name, version)?;
        }

        loader.state = LoaderState::Ready;
        tracing::debug!(
            entrypoint = %loader.entrypoint,
            fragments = loader.trees.len(),
            corrupt = loader.corrupt,
            "model loaded"
        );
        Ok(loader)
    }

    fn load_fragments(&mut self) -> Result<(), LoaderError> {
        let mut queue = VecDeque::from([self.entrypoint.clone()]);
        while let Some(path) = queue.pop_front() {
            if self.trees.contains_key(&path) {
                continue;
            }
            let Some(handler) = self.resources.get(&path.resource) else {
                if path == self.entrypoint {
                    return Err(LoaderError::MissingResource(path.resource.to_string()));
                }
                tracing::warn!(fragment = %path, "skipping fragment in unknown resource");
                continue;
            };

            let bytes = handler
                .read_all(&path.path)
                .map_err(|e| LoaderError::io(&path, e))?;
            tracing::debug!(fragment = %path, bytes = bytes.len(), "loading fragment");

            let (file, duplicates) = ModelFile::parse(path.clone(), &bytes)?;
            for id in &duplicates {
                tracing::warn!(fragment = %path, id = %id, "duplicate identifier");
                self.corrupt = true;
            }
            for id in file.ids() {
                if let Some(other) = self.owner_of_id(id) {
                    tracing::warn!(fragment = %path, id, first = %other, "identifier already used in another fragment");
                    self.corrupt = true;
                }
            }

            for candidates in fragment_references(&file) {
                queue.push_back(self.locate(candidates));
            }
            self.by_doc.insert(file.document().id(), path.clone());
            self.trees.insert(path, file);
        }
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn entrypoint(&self) -> &FragmentPath {
        &self.entrypoint
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Whether duplicate identifiers were found.
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    /// Names of the registered resources.
    pub fn resources(&self) -> impl Iterator<Item = &str> + '_ {
        self.resources.keys().map(SmolStr::as_str)
    }

    pub fn tree(&self, path: &FragmentPath) -> Option<&ModelFile> {
        self.trees.get(path)
    }

    /// Mutable access to a fragment. Index maintenance stays with the caller.
    pub fn tree_mut(&mut self, path: &FragmentPath) -> Option<&mut ModelFile> {
        self.trees.get_mut(path)
    }

    pub fn root_of(&self, path: &FragmentPath) -> Option<ElementRef> {
        let tree = self.trees.get(path)?;
        Some(tree.element_ref(tree.root()))
    }

    pub fn element(&self, elem: ElementRef) -> Option<&Element> {
        self.tree_of(elem).ok()?.document().element(elem.node)
    }

    /// The document containing `elem`.
    pub fn document_of(&self, elem: ElementRef) -> Result<&Document, LoaderError> {
        Ok(self.tree_of(elem)?.document())
    }

    /// The identifier of an element, if it has one.
    pub fn identifier(&self, elem: ElementRef) -> Option<&str> {
        self.tree_of(elem).ok()?.identifier(elem.node)
    }

    /// Active viewpoints (name → version).
    pub fn viewpoints(&self) -> IndexMap<String, String> {
        let Some(tree) = self.metadata_path().and_then(|p| self.trees.get(p)) else {
            return self.memory_viewpoints.clone();
        };
        let doc = tree.document();
        doc.element_children(tree.root())
            .filter_map(|child| {
                let elem = doc.element(child)?;
                if elem.tag.local != VIEWPOINT_REFERENCES {
                    return None;
                }
                Some((elem.get("vpId")?.to_owned(), elem.get("version")?.to_owned()))
            })
            .collect()
    }

    fn tree_of(&self, elem: ElementRef) -> Result<&ModelFile, LoaderError> {
        self.by_doc
            .get(&elem.doc)
            .and_then(|path| self.trees.get(path))
            .filter(|tree| tree.document().get(elem.node).is_some())
            .ok_or_else(|| LoaderError::UnknownFragment(format!("{elem:?}")))
    }

    fn tree_of_mut(&mut self, elem: ElementRef) -> Result<&mut ModelFile, LoaderError> {
        let path = self
            .by_doc
            .get(&elem.doc)
            .ok_or_else(|| LoaderError::UnknownFragment(format!("{elem:?}")))?;
        self.trees
            .get_mut(path)
            .filter(|tree| tree.document().get(elem.node).is_some())
            .ok_or_else(|| LoaderError::UnknownFragment(format!("{elem:?}")))
    }

    fn describe(&self, elem: ElementRef) -> String {
        match self.tree_of(elem) {
            Ok(tree) => match tree.document().element(elem.node) {
                Some(e) => format!("<{}> in {}", e.tag, tree.path()),
                None => format!("node {} in {}", elem.node, tree.path()),
            },
            Err(_) => format!("{elem:?}"),
        }
    }

    fn owner_of_id(&self, id: &str) -> Option<&FragmentPath> {
        self.trees
            .iter()
            .find(|(_, tree)| tree.contains_id(id))
            .map(|(path, _)| path)
    }

    fn metadata_path(&self) -> Option<&FragmentPath> {
        self.trees
            .iter()
            .find(|(_, tree)| {
                tree.fragment_type() == FragmentType::Other
                    && tree
                        .document()
                        .element(tree.root())
                        .is_some_and(|e| e.tag.local == METADATA_TAG)
            })
            .map(|(path, _)| path)
    }

    // ── Links ────────────────────────────────────────────────────────

    /// First candidate that is loaded or exists in its resource, else the first.
    fn locate(&self, mut candidates: Vec<FragmentPath>) -> FragmentPath {
        let found = candidates.iter().position(|path| {
            self.trees.contains_key(path)
                || self
                    .resources
                    .get(&path.resource)
                    .is_some_and(|handler| handler.exists(&path.path))
        });
        candidates.swap_remove(found.unwrap_or(0))
    }

    fn resolve(&self, source: Option<ElementRef>, link: &Link<'_>, raw: &str) -> Result<ElementRef, LoaderError> {
        let source_path = match source {
            Some(source) => self.find_fragment(source)?,
            None => &self.entrypoint,
        };

        let target = match link.file {
            Some(file) => links::file_candidates(source_path, file)
                .iter()
                .find_map(|path| self.trees.get(path))
                .and_then(|tree| Some(tree.element_ref(tree.lookup(link.id)?))),
            None => self
                .trees
                .get(source_path)
                .into_iter()
                .chain(self.trees.values())
                .find_map(|tree| Some(tree.element_ref(tree.lookup(link.id)?))),
        }
        .ok_or_else(|| LoaderError::broken_link(raw))?;

        if let Some(hint) = link.type_hint {
            if !self.hint_matches(target, hint) {
                tracing::trace!(link = raw, hint, "type hint does not match target");
                return Err(LoaderError::broken_link(raw));
            }
        }
        tracing::trace!(link = raw, target = %self.describe(target), "resolved link");
        Ok(target)
    }

    fn hint_matches(&self, target: ElementRef, hint: &str) -> bool {
        let Ok(tree) = self.tree_of(target) else {
            return false;
        };
        let doc = tree.document();
        let hint_local = hint.rsplit_once(':').map_or(hint, |(_, local)| local);
        let Some(actual) = tree.qtype_of(target.node) else {
            return doc
                .element(target.node)
                .is_some_and(|e| e.tag.local == hint_local);
        };
        match doc.resolve_prefixed(doc.root(), hint) {
            Some(expected) => expected == actual,
            None => actual.local == hint_local,
        }
    }

    /// Type hint for links pointing at `target`.
    fn type_hint(&self, target: ElementRef) -> Option<String> {
        let tree = self.tree_of(target).ok()?;
        let doc = tree.document();
        let elem = doc.element(target.node)?;
        if let Some(xsi_type) = elem.xsi_type() {
            return Some(xsi_type.to_owned());
        }
        let ns = elem.tag.ns.as_deref()?;
        let alias = doc.prefix_for(target.node, ns, false)?;
        Some(format!("{alias}:{}", elem.tag.local))
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.reservations.contains(id) || self.owner_of_id(id).is_some()
    }

    // ── Saving ───────────────────────────────────────────────────────

    fn save_fragments(&mut self, options: &SaveOptions) -> Result<(), LoaderError> {
        self.prune_orphans();
        if options.update_namespaces {
            self.update_namespaces()?;
        }

        let line_length = options.line_length.unwrap_or(self.options.line_length);
        let rendered = self.render_all(line_length)?;
        for (path, bytes) in &rendered {
            let handler = self
                .resources
                .get(&path.resource)
                .ok_or_else(|| LoaderError::MissingResource(path.resource.to_string()))?;
            tracing::debug!(fragment = %path, bytes = bytes.len(), "writing fragment");
            let mut out = handler
                .write(&path.path)
                .map_err(|e| LoaderError::io(path, e))?;
            out.write_all(bytes)
                .and_then(|()| out.flush())
                .map_err(|e| LoaderError::io(path, e))?;
        }
        tracing::info!(fragments = rendered.len(), "model saved");
        Ok(())
    }

    /// Serialize every fragment. Nothing is written if any of them fails.
    fn render_all(&self, line_length: usize) -> Result<Vec<(&FragmentPath, Vec<u8>)>, LoaderError> {
        let trees: Vec<(&FragmentPath, &ModelFile)> = self.trees.iter().collect();
        trees
            .par_iter()
            .map(|(path, tree)| {
                tree.serialize(line_length)
                    .map(|bytes| (*path, bytes))
                    .map_err(|source| LoaderError::Serialize {
                        path: path.to_string(),
                        source,
                    })
            })
            .collect()
    }

    /// Drop fragments that are no longer reachable from the entry point.
    fn prune_orphans(&mut self) {
        let mut reachable = FxHashSet::default();
        let mut queue = VecDeque::from([self.entrypoint.clone()]);
        while let Some(path) = queue.pop_front() {
            if !reachable.insert(path.clone()) {
                continue;
            }
            if let Some(tree) = self.trees.get(&path) {
                for candidates in fragment_references(tree) {
                    queue.push_back(self.locate(candidates));
                }
            }
        }

        let orphans: Vec<FragmentPath> = self
            .trees
            .keys()
            .filter(|path| !reachable.contains(*path))
            .cloned()
            .collect();
        for path in orphans {
            if let Some(tree) = self.trees.shift_remove(&path) {
                self.by_doc.remove(&tree.document().id());
                tracing::debug!(fragment = %path, "dropping unreferenced fragment");
            }
        }
    }
}

impl ModelLoader for MelodyLoader {
    type Tree = ModelFile;

    fn trees(&self) -> impl Iterator<Item = (&FragmentPath, &ModelFile)> + '_ {
        self.trees.iter()
    }

    fn get_model_info(&self) -> ModelInfo {
        let viewpoints = self.viewpoints();
        ModelInfo {
            url: self.resources.get(MAIN_RESOURCE).map(|h| h.info().url),
            title: Some(self.entrypoint.file_stem().to_owned()),
            entrypoint: self.entrypoint.path.clone(),
            resources: self
                .resources
                .iter()
                .map(|(name, handler)| (name.to_string(), handler.info()))
                .collect(),
            capella_version: viewpoints
                .get(CAPELLA_VIEWPOINT)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_VERSION.to_owned()),
            viewpoints,
        }
    }

    fn find_fragment(&self, elem: ElementRef) -> Result<&FragmentPath, LoaderError> {
        let tree = self.tree_of(elem)?;
        if !tree.document().is_attached(elem.node) {
            return Err(LoaderError::UnknownFragment(self.describe(elem)));
        }
        Ok(tree.path())
    }

    fn iterancestors(&self, elem: ElementRef) -> Result<impl Iterator<Item = ElementRef> + '_, LoaderError> {
        let doc = self.tree_of(elem)?.document();
        Ok(doc.ancestors(elem.node).map(move |n| ElementRef::new(elem.doc, n)))
    }

    fn iterdescendants(&self, elem: ElementRef) -> Result<impl Iterator<Item = ElementRef> + '_, LoaderError> {
        let doc = self.tree_of(elem)?.document();
        Ok(doc.descendants(elem.node).map(move |n| ElementRef::new(elem.doc, n)))
    }

    fn iterchildren<'a>(
        &'a self,
        elem: ElementRef,
        tag: Option<&'a str>,
    ) -> Result<impl Iterator<Item = ElementRef> + 'a, LoaderError> {
        let doc = self.tree_of(elem)?.document();
        Ok(doc
            .element_children(elem.node)
            .filter(move |&n| match tag {
                Some(tag) => doc.element(n).is_some_and(|e| e.tag.matches(tag)),
                None => true,
            })
            .map(move |n| ElementRef::new(elem.doc, n)))
    }

    fn find_references<'a>(&'a self, target_id: &'a str) -> impl Iterator<Item = ElementRef> + 'a {
        self.trees.values().flat_map(move |tree| {
            let doc = tree.document();
            tree.iterall()
                .filter(move |&n| references_id(doc, n, target_id))
                .map(move |n| tree.element_ref(n))
        })
    }

    fn create_link(
        &self,
        source: ElementRef,
        target: ElementRef,
        include_target_type: Option<bool>,
    ) -> Result<String, LoaderError> {
        let source_path = self.find_fragment(source)?;
        let target_path = self.find_fragment(target)?;
        let id = self
            .identifier(target)
            .ok_or_else(|| LoaderError::MissingIdentifier(self.describe(target)))?;

        let crosses = source_path != target_path;
        let link = if crosses {
            format!("{}#{id}", links::file_reference(source_path, target_path))
        } else {
            format!("#{id}")
        };

        if include_target_type.unwrap_or(crosses) {
            if let Some(hint) = self.type_hint(target) {
                return Ok(format!("{hint} {link}"));
            }
        }
        Ok(link)
    }

    fn follow_link(&self, source: Option<ElementRef>, link: &str) -> Result<ElementRef, LoaderError> {
        let parsed = Link::parse(link).ok_or_else(|| LoaderError::broken_link(link))?;
        self.resolve(source, &parsed, link)
    }

    fn follow_links(
        &self,
        source: Option<ElementRef>,
        id_list: &str,
        ignore_broken: bool,
    ) -> Result<Vec<ElementRef>, LoaderError> {
        let mut targets = Vec::new();
        let mut hint = None;
        for token in id_list.split_whitespace() {
            if !token.contains('#') && token.contains(':') {
                hint = Some(token);
                continue;
            }
            let resolved = match Link::parse(token) {
                Some(link) => {
                    let link = Link {
                        type_hint: hint.take(),
                        ..link
                    };
                    self.resolve(source, &link, token)
                }
                None => Err(LoaderError::broken_link(token)),
            };
            match resolved {
                Ok(target) => targets.push(target),
                Err(LoaderError::BrokenLink(link)) if ignore_broken => {
                    tracing::debug!(link = %link, "ignoring broken link");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(targets)
    }

    fn new_uuid(&self, parent: ElementRef, want: Option<&str>) -> Result<UuidReservation, LoaderError> {
        self.find_fragment(parent)?;
        if let Some(want) = want {
            if !is_valid_identifier(want) {
                return Err(LoaderError::InvalidIdentifier(want.to_owned()));
            }
            if self.owner_of_id(want).is_some() {
                return Err(LoaderError::DuplicateIdentifier(want.to_owned()));
            }
            return self
                .reservations
                .reserve(SmolStr::new(want))
                .ok_or_else(|| LoaderError::DuplicateIdentifier(want.to_owned()));
        }

        loop {
            let candidate = SmolStr::new(Uuid::new_v4().to_string());
            if self.id_in_use(&candidate) {
                continue;
            }
            if let Some(reservation) = self.reservations.reserve(candidate) {
                return Ok(reservation);
            }
        }
    }

    fn idcache_index(&mut self, subtree: ElementRef) -> Result<(), LoaderError> {
        let path = self.find_fragment(subtree)?.clone();
        let tree = self.tree_of(subtree)?;
        for (id, _) in tree.subtree_ids(subtree.node) {
            let clash = self
                .trees
                .iter()
                .any(|(other, t)| *other != path && t.contains_id(&id));
            if clash {
                return Err(LoaderError::DuplicateIdentifier(id.to_string()));
            }
        }
        self.tree_of_mut(subtree)?.idcache_index(subtree.node)
    }

    fn idcache_remove(&mut self, subtree: ElementRef) -> Result<(), LoaderError> {
        self.tree_of_mut(subtree)?.idcache_remove(subtree.node);
        Ok(())
    }

    fn idcache_rebuild(&mut self) {
        let mut seen: FxHashMap<SmolStr, FragmentPath> = FxHashMap::default();
        for (path, tree) in self.trees.iter_mut() {
            for id in tree.idcache_rebuild() {
                tracing::warn!(fragment = %path, id = %id, "duplicate identifier");
                self.corrupt = true;
            }
            for id in tree.ids() {
                if let Some(first) = seen.get(id) {
                    tracing::warn!(fragment = %path, id, first = %first, "identifier already used in another fragment");
                    self.corrupt = true;
                } else {
                    seen.insert(SmolStr::new(id), path.clone());
                }
            }
        }
    }

    fn activate_viewpoint(&mut self, name: &str, version: &str) -> Result<(), LoaderError> {
        if let Some(active) = self.viewpoints().get(name) {
            if active == version {
                return Ok(());
            }
            return Err(LoaderError::ViewpointConflict {
                name: name.to_owned(),
                active: active.clone(),
                requested: version.to_owned(),
            });
        }

        let Some(path) = self.metadata_path().cloned() else {
            tracing::debug!(name, version, "no metadata fragment, keeping viewpoint in memory");
            self.memory_viewpoints.insert(name.to_owned(), version.to_owned());
            return Ok(());
        };

        let root = self
            .root_of(&path)
            .ok_or_else(|| LoaderError::UnknownFragment(path.to_string()))?;
        let reservation = self.new_uuid(root, None)?;
        let tree = self.tree_of_mut(root)?;
        let xmi = tree.add_namespace(namespace::XMI, "xmi")?;
        tracing::trace!(alias = %xmi, "xmi namespace");

        let doc = tree.document_mut();
        let node = doc.create_element(QName::local(VIEWPOINT_REFERENCES));
        doc.set_attribute(node, QName::new(namespace::XMI, "id"), reservation.as_str())?;
        doc.set_attribute(node, "vpId", name)?;
        doc.set_attribute(node, "version", version)?;
        doc.append_child(root.node, node)?;

        self.idcache_index(ElementRef::new(root.doc, node))?;
        tracing::info!(name, version, "activated viewpoint");
        Ok(())
    }

    fn update_namespaces(&mut self) -> Result<(), LoaderError> {
        let mut known: FxHashMap<SmolStr, SmolStr> = FxHashMap::default();
        for tree in self.trees.values() {
            if let Some(root) = tree.document().element(tree.root()) {
                for (alias, uri) in &root.namespaces {
                    if !alias.is_empty() {
                        known.entry(uri.clone()).or_insert_with(|| alias.clone());
                    }
                }
            }
        }
        for tree in self.trees.values_mut() {
            update_tree_namespaces(tree, &known)?;
        }
        Ok(())
    }

    fn save(&mut self, options: &SaveOptions) -> Result<(), LoaderError> {
        if self.corrupt && !options.force {
            return Err(LoaderError::Corrupt);
        }
        self.state = LoaderState::Saving;
        let result = self.save_fragments(options);
        self.state = LoaderState::Ready;
        result
    }

    fn write_tmp_project_dir(&self) -> Result<TempProjectDir, LoaderError> {
        let dir = TempProjectDir::new().map_err(|e| LoaderError::io("temporary directory", e))?;
        for (path, bytes) in self.render_all(self.options.line_length)? {
            let mut target = dir.path().to_path_buf();
            if !path.is_main() {
                target.push(path.resource.as_str());
            }
            target.extend(path.path.split('/'));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LoaderError::io(parent.display(), e))?;
            }
            std::fs::write(&target, bytes).map_err(|e| LoaderError::io(target.display(), e))?;
        }
        tracing::debug!(dir = %dir.path().display(), "wrote temporary project");
        Ok(dir)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Fragments referenced from `file`, as candidate lists for each file part.
fn fragment_references(file: &ModelFile) -> Vec<Vec<FragmentPath>> {
    let doc = file.document();
    let mut files: IndexSet<&str> = IndexSet::new();

    for node in file.iterall() {
        let Some(elem) = doc.element(node) else {
            continue;
        };
        if elem.tag.local == SEMANTIC_RESOURCES {
            if let Some(text) = doc.text(node) {
                files.insert(text.trim());
            }
        }
        for (key, value) in &elem.attributes {
            if key.ns.is_none() && key.local == "href" {
                files.insert(value.split_once('#').map_or(value.as_str(), |(file, _)| file));
                continue;
            }
            for token in value.split_whitespace() {
                if let Some((file, _)) = token.split_once('#') {
                    files.insert(file);
                }
            }
        }
    }

    files
        .into_iter()
        .filter(|f| !f.is_empty())
        .map(|f| links::file_candidates(file.path(), f))
        .filter(|candidates| candidates.first().is_some_and(|path| path != file.path()))
        .collect()
}

fn is_id_attribute(name: &QName) -> bool {
    ID_ATTRIBUTES
        .iter()
        .any(|(ns, local)| name.ns.as_deref() == *ns && name.local == *local)
}

/// Whether an attribute value or the text of `node` links to `target_id`.
fn references_id(doc: &Document, node: NodeId, target_id: &str) -> bool {
    let Some(elem) = doc.element(node) else {
        return false;
    };
    let links_to = |value: &str| {
        value
            .split_whitespace()
            .any(|token| token.split_once('#').is_some_and(|(_, id)| id == target_id))
    };
    elem.attributes
        .iter()
        .any(|(key, value)| !is_id_attribute(key) && links_to(value))
        || doc.text(node).is_some_and(links_to)
}

/// Drop unused root namespace declarations and declare missing ones.
///
/// A namespace counts as declared only where a declaration is in scope, so a
/// nested declaration does not cover uses outside its subtree.
fn update_tree_namespaces(tree: &mut ModelFile, known: &FxHashMap<SmolStr, SmolStr>) -> Result<(), LoaderError> {
    let doc = tree.document();
    let root = doc.root();

    let mut used: IndexSet<SmolStr> = IndexSet::new();
    let mut out_of_scope: IndexSet<SmolStr> = IndexSet::new();
    for node in tree.iterall() {
        let Some(elem) = doc.element(node) else {
            continue;
        };
        // (uri, whether the default namespace can express it)
        let mut here: Vec<(SmolStr, bool)> = Vec::new();
        here.extend(elem.tag.ns.iter().map(|ns| (ns.clone(), true)));
        here.extend(elem.attributes.keys().filter_map(|k| Some((k.ns.clone()?, false))));
        if let Some(qtype) = elem.xsi_type().and_then(|v| doc.resolve_prefixed(node, v)) {
            here.extend(qtype.ns.map(|ns| (ns, true)));
        }
        for (uri, allow_default) in here {
            if uri == namespace::XML {
                continue;
            }
            if doc.prefix_for(node, &uri, allow_default).is_none() {
                out_of_scope.insert(uri.clone());
            }
            used.insert(uri);
        }
    }

    let unused: Vec<SmolStr> = doc
        .element(root)
        .map(|e| {
            e.namespaces
                .iter()
                .filter(|(_, uri)| !used.contains(*uri))
                .map(|(alias, _)| alias.clone())
                .collect()
        })
        .unwrap_or_default();
    for alias in unused {
        tracing::debug!(fragment = %tree.path(), alias = %alias, "removing unused namespace");
        tree.document_mut().undeclare_namespace(root, &alias)?;
    }
    for uri in out_of_scope {
        let alias = known.get(&uri).cloned().unwrap_or_else(|| derive_alias(&uri));
        let alias = tree.add_namespace(&uri, &alias)?;
        tracing::debug!(fragment = %tree.path(), alias = %alias, uri = %uri, "declared missing namespace");
    }
    Ok(())
}

/// Alias for a namespace nobody declared, e.g. `la` for
/// `http://www.polarsys.org/capella/core/la/7.0.0`.
fn derive_alias(uri: &str) -> SmolStr {
    uri.rsplit(['/', ':', '#'])
        .find(|segment| {
            segment
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        })
        .map(SmolStr::new)
        .unwrap_or_else(|| SmolStr::new_static("ns"))
}
