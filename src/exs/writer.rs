//! Streaming writer producing Eclipse-style XML.

use std::io::Write;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::escape::{Position, escape};
use super::{ALWAYS_EXPANDED_TAGS, INDENT, LINESEP, SerializeError, SerializeOptions};
use crate::xml::{Document, NodeData, NodeId, QName, namespace};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

type NsMap = IndexMap<SmolStr, SmolStr>;

/// Namespace declarations in scope while walking the tree.
struct Scopes<'a> {
    /// Declarations inherited from ancestors of the start node.
    inherited: NsMap,
    frames: Vec<&'a NsMap>,
}

impl<'a> Scopes<'a> {
    fn new(inherited: NsMap) -> Self {
        Self {
            inherited,
            frames: Vec::new(),
        }
    }

    fn frames(&self) -> impl Iterator<Item = &NsMap> {
        self.frames
            .iter()
            .rev()
            .copied()
            .chain(std::iter::once(&self.inherited))
    }

    fn resolve(&self, alias: &str) -> Option<&str> {
        self.frames()
            .find_map(|frame| frame.get(alias))
            .map(SmolStr::as_str)
    }

    /// The nearest alias bound to `uri` that is not shadowed.
    fn prefix(&self, uri: &str, allow_default: bool) -> Option<&str> {
        if uri == namespace::XML {
            return Some("xml");
        }
        self.frames()
            .flat_map(|frame| frame.iter())
            .filter(|(alias, bound)| *bound == uri && (allow_default || !alias.is_empty()))
            .map(|(alias, _)| alias.as_str())
            .find(|alias| self.resolve(alias) == Some(uri))
    }

    fn qualified(&self, name: &QName, allow_default: bool) -> Result<String, SerializeError> {
        let Some(uri) = name.ns.as_deref() else {
            return Ok(name.local.to_string());
        };
        match self.prefix(uri, allow_default) {
            Some("") => Ok(name.local.to_string()),
            Some(alias) => Ok(format!("{alias}:{}", name.local)),
            None => Err(SerializeError::unknown_namespace(uri, name.to_string())),
        }
    }
}

/// A validated serialization job.
pub(super) struct Job<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    start: NodeId,
    /// Top-level items in output order (the start node and, with siblings,
    /// its neighbouring comments and processing instructions).
    items: Vec<NodeId>,
}

impl<'a> Job<'a> {
    /// Check the tree below `start` before anything is written.
    pub(super) fn prepare(
        doc: &'a Document,
        start: NodeId,
        options: &'a SerializeOptions,
    ) -> Result<Self, SerializeError> {
        if doc.element(start).is_none() {
            return Err(SerializeError::NotAnElement(start.index()));
        }
        let siblings = options.siblings.unwrap_or(start == doc.root());
        let items = if !siblings {
            vec![start]
        } else {
            let level = if start == doc.root() {
                doc.top_level()
            } else if let Some(parent) = doc.parent(start) {
                doc.children(parent)
            } else {
                std::slice::from_ref(&start)
            };
            level
                .iter()
                .copied()
                .filter(|&n| {
                    n == start
                        || matches!(
                            doc.get(n).map(|node| node.data()),
                            Some(NodeData::Comment(_) | NodeData::ProcessingInstruction { .. })
                        )
                })
                .collect()
        };

        let job = Self {
            doc,
            options,
            start,
            items,
        };
        let mut scopes = Scopes::new(job.inherited());
        let mut visited = FxHashSet::default();
        job.check(start, &mut scopes, &mut visited)?;
        Ok(job)
    }

    fn inherited(&self) -> NsMap {
        match self.doc.parent(self.start) {
            Some(parent) => self.doc.nsmap(parent),
            None => NsMap::new(),
        }
    }

    fn check(
        &self,
        id: NodeId,
        scopes: &mut Scopes<'a>,
        visited: &mut FxHashSet<NodeId>,
    ) -> Result<(), SerializeError> {
        if !visited.insert(id) {
            return Err(SerializeError::Cycle(id.index()));
        }
        let Some(elem) = self.doc.element(id) else {
            return Ok(());
        };
        scopes.frames.push(&elem.namespaces);
        scopes.qualified(&elem.tag, true)?;
        for name in elem.attributes.keys() {
            scopes.qualified(name, false)?;
        }
        for &child in self.doc.children(id) {
            self.check(child, scopes, visited)?;
        }
        scopes.frames.pop();
        Ok(())
    }

    /// Write the whole job to `out`.
    pub(super) fn emit<W: Write>(&self, out: &mut W) -> Result<(), SerializeError> {
        let mut scopes = Scopes::new(self.inherited());
        let mut wrote_any = false;
        if self.options.declare_encoding {
            out.write_all(DECLARATION.as_bytes())?;
            wrote_any = true;
        }

        for &item in &self.items {
            match self.doc.get(item).map(|n| n.data()) {
                Some(NodeData::Element(_)) => {
                    if wrote_any {
                        out.write_all(LINESEP.as_bytes())?;
                    }
                    self.write_element(out, item, 0, &mut scopes)?;
                }
                Some(_) => {
                    out.write_all(LINESEP.as_bytes())?;
                    self.write_leaf(out, item)?;
                }
                None => continue,
            }
            wrote_any = true;
        }
        out.write_all(LINESEP.as_bytes())?;
        Ok(())
    }

    fn write_element<W: Write>(
        &self,
        out: &mut W,
        id: NodeId,
        depth: usize,
        scopes: &mut Scopes<'a>,
    ) -> Result<(), SerializeError> {
        let Some(elem) = self.doc.element(id) else {
            return Err(SerializeError::NotAnElement(id.index()));
        };
        scopes.frames.push(&elem.namespaces);

        let name = scopes.qualified(&elem.tag, true)?;
        let mut attrs: Vec<String> = Vec::with_capacity(elem.namespaces.len() + elem.attributes.len());
        for (alias, uri) in &elem.namespaces {
            attrs.push(xmlns(alias, uri));
        }
        if id == self.start {
            for (alias, uri) in &scopes.inherited {
                if !elem.namespaces.contains_key(alias) {
                    attrs.push(xmlns(alias, uri));
                }
            }
        }
        for (key, value) in &elem.attributes {
            let key = scopes.qualified(key, false)?;
            attrs.push(format!("{key}=\"{}\"", escape(value, Position::Attribute)));
        }

        out.write_all(b"<")?;
        out.write_all(name.as_bytes())?;
        let mut column = INDENT.len() * depth + 1 + name.chars().count();
        let mut wrapping = false;
        for (i, attr) in attrs.iter().enumerate() {
            let width = attr.chars().count();
            if i > 0 && (wrapping || column + 1 + width > self.options.line_length) {
                wrapping = true;
                out.write_all(LINESEP.as_bytes())?;
                write_indent(out, depth + 2)?;
                column = INDENT.len() * (depth + 2) + width;
            } else {
                out.write_all(b" ")?;
                column += 1 + width;
            }
            out.write_all(attr.as_bytes())?;
        }

        let children = self.doc.children(id);
        let text_only = children.iter().all(|&c| self.is_text(c));

        if children.is_empty() {
            if ALWAYS_EXPANDED_TAGS.contains(&elem.tag.local.as_str()) {
                out.write_all(b">")?;
                out.write_all(LINESEP.as_bytes())?;
                write_indent(out, depth)?;
                write!(out, "</{name}>")?;
            } else {
                out.write_all(b"/>")?;
            }
        } else if text_only {
            out.write_all(b">")?;
            for &child in children {
                self.write_leaf(out, child)?;
            }
            write!(out, "</{name}>")?;
        } else {
            // Layout whitespace next to text would become part of it.
            let mixed = children.iter().any(|&c| self.is_text(c));
            out.write_all(b">")?;
            for &child in children {
                if !mixed {
                    out.write_all(LINESEP.as_bytes())?;
                    write_indent(out, depth + 1)?;
                }
                if self.doc.element(child).is_some() {
                    self.write_element(out, child, depth + 1, scopes)?;
                } else {
                    self.write_leaf(out, child)?;
                }
            }
            if !mixed {
                out.write_all(LINESEP.as_bytes())?;
                write_indent(out, depth)?;
            }
            write!(out, "</{name}>")?;
        }

        scopes.frames.pop();
        Ok(())
    }

    fn is_text(&self, id: NodeId) -> bool {
        matches!(self.doc.get(id).map(|n| n.data()), Some(NodeData::Text(_)))
    }

    /// Write a text, comment or processing instruction node.
    fn write_leaf<W: Write>(&self, out: &mut W, id: NodeId) -> Result<(), SerializeError> {
        match self.doc.get(id).map(|n| n.data()) {
            Some(NodeData::Text(text)) => {
                out.write_all(escape(text, Position::Text).as_bytes())?;
            }
            Some(NodeData::Comment(text)) => {
                write!(out, "<!--{}-->", escape(text, Position::Comment))?;
            }
            Some(NodeData::ProcessingInstruction { target, data }) if data.is_empty() => {
                write!(out, "<?{target}?>")?;
            }
            Some(NodeData::ProcessingInstruction { target, data }) => {
                write!(out, "<?{target} {data}?>")?;
            }
            Some(NodeData::Element(_)) | None => {}
        }
        Ok(())
    }
}

fn xmlns(alias: &str, uri: &str) -> String {
    let uri = escape(uri, Position::Attribute);
    if alias.is_empty() {
        format!("xmlns=\"{uri}\"")
    } else {
        format!("xmlns:{alias}=\"{uri}\"")
    }
}

fn write_indent<W: Write>(out: &mut W, depth: usize) -> std::io::Result<()> {
    for _ in 0..depth {
        out.write_all(INDENT.as_bytes())?;
    }
    Ok(())
}
