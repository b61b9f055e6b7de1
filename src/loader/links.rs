//! Link syntax and fragment-relative path handling.
//!
//! ```text
//! link      := [type-hint SP] [file] "#" id
//!            | id
//! type-hint := alias ":" TypeName
//! file      := relative/path.capellafragment
//!            | platform:/resource/<resource>/<path>
//! ```

use super::types::{FragmentPath, FragmentType, MAIN_RESOURCE};

const PLATFORM_RESOURCE: &str = "platform:/resource/";
const PLATFORM_PLUGIN: &str = "platform:/plugin/";

/// A parsed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<'a> {
    pub type_hint: Option<&'a str>,
    /// File part; `None` for bare identifiers and `#id` links.
    pub file: Option<&'a str>,
    pub id: &'a str,
}

impl<'a> Link<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        let (type_hint, rest) = match text.split_once(char::is_whitespace) {
            Some((hint, rest)) => (Some(hint), rest.trim_start()),
            None => (None, text),
        };
        let (file, id) = match rest.split_once('#') {
            Some((file, id)) => ((!file.is_empty()).then_some(file), id),
            None => (None, rest),
        };
        if id.is_empty() || id.contains(char::is_whitespace) {
            return None;
        }
        Some(Self { type_hint, file, id })
    }
}

pub fn decode(path: &str) -> String {
    path.replace("%20", " ")
}

pub fn encode(path: &str) -> String {
    path.replace(' ', "%20")
}

/// Join `rel` onto `dir`, resolving `.` and `..`.
///
/// Returns `None` if the result would leave the resource.
pub fn join(dir: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Relative path from directory `from_dir` to file `to`.
pub fn relpath(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|p| !p.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = std::iter::repeat_n("..", from.len() - common).collect();
    out.extend(&to_parts[common..]);
    out.join("/")
}

/// Resolve the file part of a reference found in `source`.
///
/// Plugin references and files that are not part of a model yield `None`.
pub fn resolve_file(source: &FragmentPath, file: &str) -> Option<FragmentPath> {
    let file = decode(file);
    if file.starts_with(PLATFORM_PLUGIN) {
        return None;
    }
    let target = match file.strip_prefix(PLATFORM_RESOURCE) {
        Some(rest) => {
            let (resource, path) = rest.split_once('/')?;
            FragmentPath::new(resource, join("", path)?)
        }
        None => FragmentPath::new(source.resource.clone(), join(source.dir(), &file)?),
    };
    FragmentType::is_model_file(&target.path).then_some(target)
}

/// Fragments the file part of a link may denote, in lookup order.
///
/// The main resource has no name to spell out, so a relative file written in
/// another resource falls back to the same path in the main resource.
pub fn file_candidates(source: &FragmentPath, file: &str) -> Vec<FragmentPath> {
    let Some(primary) = resolve_file(source, file) else {
        return Vec::new();
    };
    let relative = !decode(file).starts_with(PLATFORM_RESOURCE);
    if relative && source.resource != MAIN_RESOURCE {
        let fallback = FragmentPath::main(primary.path.clone());
        vec![primary, fallback]
    } else {
        vec![primary]
    }
}

/// Encode the file part of a link from `source` to `target`.
pub fn file_reference(source: &FragmentPath, target: &FragmentPath) -> String {
    if source.resource != target.resource && target.resource != MAIN_RESOURCE {
        encode(&format!("{PLATFORM_RESOURCE}{}/{}", target.resource, target.path))
    } else {
        encode(&relpath(source.dir(), &target.path))
    }
}
