//! # melody-model
//!
//! Load, navigate, edit and save models that are split over several XML
//! fragment files, writing them back exactly the way the modeling tool does.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! loader       → MelodyLoader: fragments, links, identifiers, viewpoints, save
//!   ↓
//! filehandler  → Resources: local directory, memory, zip archive
//! exs          → Byte-exact serializer
//!   ↓
//! xml          → Arena XML tree, qualified names, parser
//! ```

// ============================================================================
// MODULES (dependency order: xml → exs → filehandler → loader)
// ============================================================================

/// Owned XML tree: Document, Element, QName, parsing
pub mod xml;

/// Eclipse-compatible XML serializer
pub mod exs;

/// Resource handlers used to read and write fragment files
pub mod filehandler;

/// Multi-fragment model repository
pub mod loader;

// Re-export commonly needed items
pub use exs::{SerializeError, SerializeOptions};
pub use filehandler::{FileHandler, HandlerInfo, LocalFileHandler, MemoryFileHandler};
pub use loader::{
    ElementRef, FragmentPath, FragmentTree, FragmentType, LoaderBuilder, LoaderError, MelodyLoader,
    ModelInfo, ModelLoader, SaveOptions,
};
pub use xml::{Document, NodeId, QName, XmlError};
