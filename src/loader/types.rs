//! Shared loader types: fragment paths, classification and model info.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::filehandler::HandlerInfo;
use crate::xml::{DocumentId, NodeId};

/// Name of the resource holding the entry point.
pub const MAIN_RESOURCE: &str = "\0";

/// Extensions of fragments holding semantic model content.
pub const SEMANTIC_EXTENSIONS: &[&str] = &["capella", "capellafragment", "melodymodeller", "melodyfragment"];

/// Extensions of fragments holding diagrams.
pub const VISUAL_EXTENSIONS: &[&str] = &["aird", "airdfragment"];

/// Extensions of auxiliary files that are loaded along with the model.
pub const OTHER_EXTENSIONS: &[&str] = &["afm"];

/// The kind of content a fragment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FragmentType {
    Semantic,
    Visual,
    Other,
}

impl FragmentType {
    /// Classify a file by its extension.
    pub fn from_path(path: &str) -> Self {
        let ext = extension(path);
        if SEMANTIC_EXTENSIONS.contains(&ext) {
            Self::Semantic
        } else if VISUAL_EXTENSIONS.contains(&ext) {
            Self::Visual
        } else {
            Self::Other
        }
    }

    /// Whether files with this path's extension take part in loading.
    pub fn is_model_file(path: &str) -> bool {
        let ext = extension(path);
        [SEMANTIC_EXTENSIONS, VISUAL_EXTENSIONS, OTHER_EXTENSIONS]
            .iter()
            .any(|set| set.contains(&ext))
    }
}

fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Location of a fragment: a resource name and a `/`-separated path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentPath {
    pub resource: SmolStr,
    pub path: String,
}

impl FragmentPath {
    pub fn new(resource: impl Into<SmolStr>, path: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
        }
    }

    /// A path inside the main resource.
    pub fn main(path: impl Into<String>) -> Self {
        Self::new(MAIN_RESOURCE, path)
    }

    pub fn is_main(&self) -> bool {
        self.resource == MAIN_RESOURCE
    }

    pub fn fragment_type(&self) -> FragmentType {
        FragmentType::from_path(&self.path)
    }

    /// Directory part of the path, without trailing slash.
    pub fn dir(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// File name without extension.
    pub fn file_stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
    }
}

impl fmt::Display for FragmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            f.write_str(&self.path)
        } else {
            write!(f, "platform:/resource/{}/{}", self.resource, self.path)
        }
    }
}

/// Handle to an element inside one of the loader's fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub doc: DocumentId,
    pub node: NodeId,
}

impl ElementRef {
    pub fn new(doc: DocumentId, node: NodeId) -> Self {
        Self { doc, node }
    }
}

/// Snapshot describing a loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub url: Option<String>,
    pub title: Option<String>,
    pub entrypoint: String,
    /// Resource name to handler provenance. The main resource is `"\0"`.
    pub resources: IndexMap<String, HandlerInfo>,
    pub capella_version: String,
    /// Active viewpoints (name → version).
    pub viewpoints: IndexMap<String, String>,
}

impl ModelInfo {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
