//! Loader and save configuration.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::MelodyLoader;
use super::error::LoaderError;
use super::types::MAIN_RESOURCE;
use crate::exs::LINE_LENGTH;
use crate::filehandler::FileHandler;

/// Options applied while loading a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Line length used when serializing fragments.
    pub line_length: usize,
    /// Viewpoints (name → version) that must be active after loading.
    pub required_viewpoints: IndexMap<String, String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            line_length: LINE_LENGTH,
            required_viewpoints: IndexMap::new(),
        }
    }
}

/// Options for [`MelodyLoader::save`](super::ModelLoader::save).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Overrides the loader's line length.
    pub line_length: Option<usize>,
    /// Recompute namespace declarations before writing.
    pub update_namespaces: bool,
    /// Save even if the model was found to be corrupt.
    pub force: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            line_length: None,
            update_namespaces: true,
            force: false,
        }
    }
}

/// Builder for a [`MelodyLoader`] with additional resources.
///
/// ```ignore
/// let loader = LoaderBuilder::new(LocalFileHandler::new("project"))
///     .resource("library", ZipFileHandler::open_file("library.zip")?)
///     .load("project.aird")?;
/// ```
pub struct LoaderBuilder {
    resources: IndexMap<SmolStr, Box<dyn FileHandler>>,
    options: LoaderOptions,
}

impl LoaderBuilder {
    /// Start with the handler of the main resource.
    pub fn new(main: impl FileHandler + 'static) -> Self {
        let mut resources: IndexMap<SmolStr, Box<dyn FileHandler>> = IndexMap::new();
        resources.insert(SmolStr::new_static(MAIN_RESOURCE), Box::new(main));
        Self {
            resources,
            options: LoaderOptions::default(),
        }
    }

    /// Register another resource, referenced as `platform:/resource/<name>/…`.
    pub fn resource(mut self, name: &str, handler: impl FileHandler + 'static) -> Self {
        self.resources.insert(SmolStr::new(name), Box::new(handler));
        self
    }

    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn line_length(mut self, line_length: usize) -> Self {
        self.options.line_length = line_length;
        self
    }

    pub fn require_viewpoint(mut self, name: &str, version: &str) -> Self {
        self.options
            .required_viewpoints
            .insert(name.to_owned(), version.to_owned());
        self
    }

    /// Load the model starting at `entrypoint` inside the main resource.
    pub fn load(self, entrypoint: &str) -> Result<MelodyLoader, LoaderError> {
        MelodyLoader::load_with(self.resources, entrypoint, self.options)
    }
}
