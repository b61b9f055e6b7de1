//! Multi-fragment model repository.
//!
//! A model is a set of XML fragments that reference each other by identifier.
//! The loader starts at an entry point, follows fragment references, and keeps
//! every fragment in a [`ModelFile`] with its own identifier index.
//!
//! ```text
//! MelodyLoader
//! ├── resources: name → FileHandler        ("\0" = main resource)
//! ├── trees: FragmentPath → ModelFile      (load order)
//! │     ├── Document                       (arena XML tree)
//! │     ├── idcache: id → NodeId
//! │     └── qtypes: QName → [NodeId]
//! └── reservations                         (identifiers handed out by new_uuid)
//! ```
//!
//! Elements are addressed by [`ElementRef`] (document id + node id). Index
//! maintenance is explicit: after inserting a subtree call
//! [`ModelLoader::idcache_index`], after detaching one call
//! [`ModelLoader::idcache_remove`].

mod error;
pub mod links;
mod melody;
mod modelfile;
mod options;
mod reservation;
mod tmpdir;
mod types;

pub use error::LoaderError;
pub use melody::{CAPELLA_VIEWPOINT, LoaderState, MelodyLoader};
pub use modelfile::{ID_ATTRIBUTES, ModelFile};
pub use options::{LoaderBuilder, LoaderOptions, SaveOptions};
pub use reservation::UuidReservation;
pub use tmpdir::TempProjectDir;
pub use types::{
    ElementRef, FragmentPath, FragmentType, MAIN_RESOURCE, ModelInfo, OTHER_EXTENSIONS,
    SEMANTIC_EXTENSIONS, VISUAL_EXTENSIONS,
};

use smol_str::SmolStr;

use crate::xml::{NodeId, QName};

/// Read access to one fragment plus namespace registration.
pub trait FragmentTree {
    /// The root element.
    fn root(&self) -> NodeId;

    /// Classification fixed when the fragment was loaded.
    fn fragment_type(&self) -> FragmentType;

    /// Every element in pre-order, starting with the root.
    fn iterall(&self) -> impl Iterator<Item = NodeId> + '_;

    /// Distinct qualified types present in the fragment.
    fn iter_qtypes(&self) -> impl Iterator<Item = &QName> + '_;

    /// Elements of the given qualified type.
    fn iter_qtype(&self, qtype: &QName) -> impl Iterator<Item = NodeId> + '_;

    /// Declare `uri` on the root element.
    ///
    /// Returns the alias actually used: an existing alias if the URI is already
    /// declared, otherwise `alias`, suffixed with a number if it is taken.
    fn add_namespace(&mut self, uri: &str, alias: &str) -> Result<SmolStr, LoaderError>;
}

/// Operations of a model repository.
pub trait ModelLoader {
    type Tree: FragmentTree;

    /// All fragments in load order.
    fn trees(&self) -> impl Iterator<Item = (&FragmentPath, &Self::Tree)> + '_;

    /// Snapshot of the model's metadata.
    fn get_model_info(&self) -> ModelInfo;

    /// Path of the fragment owning `elem`.
    fn find_fragment(&self, elem: ElementRef) -> Result<&FragmentPath, LoaderError>;

    /// Ancestors of `elem`, nearest first, ending at its fragment's root.
    fn iterancestors(&self, elem: ElementRef) -> Result<impl Iterator<Item = ElementRef> + '_, LoaderError>;

    /// Element descendants of `elem` in pre-order.
    fn iterdescendants(&self, elem: ElementRef) -> Result<impl Iterator<Item = ElementRef> + '_, LoaderError>;

    /// Element children of `elem`, optionally filtered by tag (Clark notation).
    fn iterchildren<'a>(
        &'a self,
        elem: ElementRef,
        tag: Option<&'a str>,
    ) -> Result<impl Iterator<Item = ElementRef> + 'a, LoaderError>;

    /// Elements in any fragment that link to `target_id`.
    fn find_references<'a>(&'a self, target_id: &'a str) -> impl Iterator<Item = ElementRef> + 'a;

    /// Encode a link from `source` to `target`.
    ///
    /// `include_target_type` defaults to including a type hint when the link
    /// crosses fragments.
    fn create_link(
        &self,
        source: ElementRef,
        target: ElementRef,
        include_target_type: Option<bool>,
    ) -> Result<String, LoaderError>;

    /// Resolve a single link, relative to `source`'s fragment or the entry
    /// point.
    fn follow_link(&self, source: Option<ElementRef>, link: &str) -> Result<ElementRef, LoaderError>;

    /// Resolve a whitespace separated list of links.
    fn follow_links(
        &self,
        source: Option<ElementRef>,
        id_list: &str,
        ignore_broken: bool,
    ) -> Result<Vec<ElementRef>, LoaderError>;

    /// Reserve an identifier for a new element below `parent`.
    fn new_uuid(&self, parent: ElementRef, want: Option<&str>) -> Result<UuidReservation, LoaderError>;

    fn idcache_index(&mut self, subtree: ElementRef) -> Result<(), LoaderError>;

    fn idcache_remove(&mut self, subtree: ElementRef) -> Result<(), LoaderError>;

    fn idcache_rebuild(&mut self);

    fn activate_viewpoint(&mut self, name: &str, version: &str) -> Result<(), LoaderError>;

    fn update_namespaces(&mut self) -> Result<(), LoaderError>;

    fn save(&mut self, options: &SaveOptions) -> Result<(), LoaderError>;

    /// Materialize every fragment into a temporary directory.
    fn write_tmp_project_dir(&self) -> Result<TempProjectDir, LoaderError>;
}
