//! Owned XML element graph.
//!
//! Fragments are parsed into an arena-backed [`Document`]. Nodes are addressed
//! by [`NodeId`]; the document owns every node, so an element's identity is its
//! position in exactly one document.
//!
//! ```text
//! Document
//! ├── nodes: Vec<Node>          (arena, never shrinks)
//! ├── top_level: Vec<NodeId>    (root element + sibling comments/PIs)
//! └── root: NodeId
//! ```

mod document;
mod error;
mod parse;

pub use document::{
    Ancestors, Descendants, Document, DocumentId, Element, Node, NodeData, NodeId,
};
pub use error::XmlError;
pub use parse::parse;

use smol_str::SmolStr;

/// Well-known namespace URIs.
pub mod namespace {
    /// XMI namespace.
    pub const XMI: &str = "http://www.omg.org/XMI";
    /// XSI namespace for `xsi:type`.
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    /// The implicitly bound `xml:` namespace.
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
}

/// A namespace-qualified name.
///
/// Displayed in Clark notation: `{uri}local`, or just `local` when the name has
/// no namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub ns: Option<SmolStr>,
    pub local: SmolStr,
}

impl QName {
    /// A name without namespace.
    pub fn local(local: impl Into<SmolStr>) -> Self {
        Self {
            ns: None,
            local: local.into(),
        }
    }

    /// A name in the namespace `ns`.
    pub fn new(ns: impl Into<SmolStr>, local: impl Into<SmolStr>) -> Self {
        Self {
            ns: Some(ns.into()),
            local: local.into(),
        }
    }

    /// Parse Clark notation (`{uri}local` or `local`).
    pub fn parse(s: &str) -> Result<Self, XmlError> {
        match s.strip_prefix('{') {
            Some(rest) => {
                let (ns, local) = rest
                    .split_once('}')
                    .ok_or_else(|| XmlError::invalid_name(s))?;
                if local.is_empty() {
                    return Err(XmlError::invalid_name(s));
                }
                Ok(Self::new(ns, local))
            }
            None if s.is_empty() || s.contains('}') => Err(XmlError::invalid_name(s)),
            None => Ok(Self::local(s)),
        }
    }

    /// Whether this name matches a tag filter given in Clark notation.
    ///
    /// A filter without `{uri}` matches only names without namespace.
    pub fn matches(&self, filter: &str) -> bool {
        match filter.strip_prefix('{').and_then(|r| r.split_once('}')) {
            Some((ns, local)) => self.ns.as_deref() == Some(ns) && self.local == local,
            None => self.ns.is_none() && self.local == filter,
        }
    }

    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.ns.as_deref() == Some(ns) && self.local == local
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for QName {
    /// Converts a plain local name. Use [`QName::parse`] for Clark notation.
    fn from(local: &str) -> Self {
        Self::local(local)
    }
}
