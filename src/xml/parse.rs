//! quick-xml based parser producing a [`Document`].

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{Document, Element, NodeData, NodeId, QName, XmlError, namespace};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse a complete XML document.
///
/// Namespace prefixes are resolved while reading; text and attribute values are
/// unescaped, comments are kept verbatim. Indentation whitespace is dropped,
/// since it is regenerated on output.
pub fn parse(input: &[u8]) -> Result<Document, XmlError> {
    let input = input.strip_prefix(BOM).unwrap_or(input);
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut builder = Builder::default();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let elem = builder.start_element(e, position)?;
                let id = builder.push(NodeData::Element(elem), position)?;
                builder.open.push(id);
            }
            Ok(Event::Empty(ref e)) => {
                let elem = builder.start_element(e, position)?;
                builder.push(NodeData::Element(elem), position)?;
                builder.scopes.pop();
            }
            Ok(Event::End(_)) => builder.end_element(position)?,
            Ok(Event::Text(ref e)) => {
                let spacing = raw_spacing(e);
                let text = e
                    .unescape()
                    .map_err(|err| XmlError::syntax(position, err.to_string()))?;
                builder.push_text(&text, spacing, position)?;
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8(e.into_inner().into_owned())
                    .map_err(|err| XmlError::syntax(position, err.to_string()))?;
                builder.push_text(&text, None, position)?;
            }
            Ok(Event::Comment(ref e)) => {
                let text = utf8(e, position)?;
                builder.push(NodeData::Comment(text.to_owned()), position)?;
            }
            Ok(Event::PI(ref e)) => {
                let target = utf8(e.target(), position)?.to_owned();
                let data = utf8(e.content(), position)?.trim_start().to_owned();
                builder.push(NodeData::ProcessingInstruction { target, data }, position)?;
            }
            Ok(Event::Decl(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XmlError::syntax(reader.error_position(), e.to_string()));
            }
        }
        buf.clear();
    }

    builder.finish(reader.buffer_position())
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|e| XmlError::syntax(position, e.to_string()))
}

/// For source text made only of literal whitespace, whether it holds a line
/// break. Character references such as `&#xA;` count as content.
fn raw_spacing(raw: &[u8]) -> Option<bool> {
    raw.iter()
        .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .then(|| raw.iter().any(|b| matches!(b, b'\n' | b'\r')))
}

type RawNode = (Option<NodeId>, Vec<NodeId>, NodeData);

#[derive(Default)]
struct Builder {
    nodes: Vec<RawNode>,
    /// Currently open elements, innermost last.
    open: Vec<NodeId>,
    /// Namespace declarations per open element (plus one for an empty element
    /// being processed).
    scopes: Vec<Vec<(SmolStr, SmolStr)>>,
    top_level: Vec<NodeId>,
    root: Option<NodeId>,
    /// Text nodes written as literal whitespace, see [`raw_spacing`].
    spacing: FxHashMap<NodeId, bool>,
}

impl Builder {
    fn lookup(&self, alias: &str) -> Option<SmolStr> {
        if alias == "xml" {
            return Some(SmolStr::new_static(namespace::XML));
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(a, _)| a == alias)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    /// Read tag, namespace declarations and attributes, pushing a new scope.
    fn start_element(&mut self, e: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
        let mut declared = Vec::new();
        let mut raw_attrs = Vec::new();

        for attr in e.attributes() {
            let attr = attr.map_err(|err| XmlError::syntax(position, format!("Attribute error: {err}")))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|err| XmlError::syntax(position, err.to_string()))?
                .to_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| XmlError::syntax(position, format!("Attribute value error: {err}")))?
                .into_owned();

            if key == "xmlns" {
                declared.push((SmolStr::default(), SmolStr::new(value)));
            } else if let Some(alias) = key.strip_prefix("xmlns:") {
                declared.push((SmolStr::new(alias), SmolStr::new(value)));
            } else {
                raw_attrs.push((key, value));
            }
        }
        self.scopes.push(declared.clone());

        let tag_name = std::str::from_utf8(e.name().as_ref())
            .map_err(|err| XmlError::syntax(position, err.to_string()))?
            .to_owned();
        let tag = self.resolve(&tag_name, true)?;

        let mut elem = Element::new(tag);
        elem.namespaces.extend(declared);
        for (key, value) in raw_attrs {
            let name = self.resolve(&key, false)?;
            elem.attributes.insert(name, value);
        }
        Ok(elem)
    }

    fn resolve(&self, name: &str, use_default: bool) -> Result<QName, XmlError> {
        match name.split_once(':') {
            Some((alias, local)) => {
                let uri = self
                    .lookup(alias)
                    .ok_or_else(|| XmlError::UndeclaredPrefix(alias.to_owned()))?;
                Ok(QName::new(uri, local))
            }
            None if use_default => Ok(match self.lookup("") {
                Some(uri) => QName::new(uri, name),
                None => QName::local(name),
            }),
            None => Ok(QName::local(name)),
        }
    }

    fn push(&mut self, data: NodeData, position: u64) -> Result<NodeId, XmlError> {
        let id = NodeId::from_index(self.nodes.len());
        let is_element = matches!(data, NodeData::Element(_));
        match self.open.last().copied() {
            Some(parent) => {
                self.nodes[parent.index()].1.push(id);
                self.nodes.push((Some(parent), Vec::new(), data));
            }
            None => {
                if is_element {
                    if self.root.is_some() {
                        return Err(XmlError::syntax(position, "multiple root elements"));
                    }
                    self.root = Some(id);
                }
                self.top_level.push(id);
                self.nodes.push((None, Vec::new(), data));
            }
        }
        Ok(id)
    }

    fn push_text(&mut self, text: &str, spacing: Option<bool>, position: u64) -> Result<(), XmlError> {
        let Some(parent) = self.open.last().copied() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(XmlError::syntax(position, "text outside of the root element"));
        };

        // Merge with a preceding text node (text split around CDATA).
        if let Some(last) = self.nodes[parent.index()].1.last().copied() {
            if let NodeData::Text(existing) = &mut self.nodes[last.index()].2 {
                existing.push_str(text);
                match spacing {
                    Some(line_break) => {
                        if let Some(seen) = self.spacing.get_mut(&last) {
                            *seen |= line_break;
                        }
                    }
                    None => {
                        self.spacing.remove(&last);
                    }
                }
                return Ok(());
            }
        }
        let id = self.push(NodeData::Text(text.to_owned()), position)?;
        if let Some(line_break) = spacing {
            self.spacing.insert(id, line_break);
        }
        Ok(())
    }

    /// Whitespace that only exists for indentation.
    ///
    /// The serializer escapes line breaks inside text, so a literal one in a
    /// whitespace-only run always comes from layout.
    fn is_layout(&self, text: NodeId, has_markup: bool) -> bool {
        self.spacing
            .get(&text)
            .is_some_and(|&line_break| has_markup || line_break)
    }

    fn end_element(&mut self, position: u64) -> Result<(), XmlError> {
        let elem = self
            .open
            .pop()
            .ok_or_else(|| XmlError::syntax(position, "unexpected closing tag"))?;
        self.scopes.pop();

        let nodes = &self.nodes;
        let children = &nodes[elem.index()].1;
        let has_markup = children
            .iter()
            .any(|c| !matches!(nodes[c.index()].2, NodeData::Text(_)));
        let kept: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|&c| match &nodes[c.index()].2 {
                NodeData::Text(_) => !self.is_layout(c, has_markup),
                _ => true,
            })
            .collect();
        self.nodes[elem.index()].1 = kept;
        Ok(())
    }

    fn finish(self, position: u64) -> Result<Document, XmlError> {
        if let Some(open) = self.open.last() {
            let name = match &self.nodes[open.index()].2 {
                NodeData::Element(e) => e.tag.to_string(),
                _ => String::new(),
            };
            return Err(XmlError::syntax(position, format!("unclosed element {name}")));
        }
        let root = self
            .root
            .ok_or_else(|| XmlError::syntax(position, "no root element"))?;
        Ok(Document::from_parts(self.nodes, self.top_level, root))
    }
}
