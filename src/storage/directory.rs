//! A filesystem backed store of form definitions
//!
//! The [`Directory`] loads every form file below a root directory into a
//! [`FormRegistry`].

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::{
    domain::{Config, FormRegistry},
    storage::form_file::{LoadError, load_form},
};

/// The name of the configuration file looked for in the root directory.
pub const CONFIG_FILE: &str = "formbind.toml";

/// State of a directory whose forms have been loaded.
#[derive(Debug, Clone)]
pub struct Loaded {
    registry: FormRegistry,
    config: Config,
}

/// State of a directory that has not been read yet.
#[derive(Debug, PartialEq, Eq)]
pub struct Unloaded;

/// A filesystem backed store of form definitions.
#[derive(Debug)]
pub struct Directory<S> {
    /// The root of the directory forms are stored in.
    root: PathBuf,
    state: S,
}

impl<S> Directory<S> {
    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Directory<Unloaded> {
    /// Opens a directory at the given path.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Unloaded,
        }
    }

    /// Load all forms from disk, using the configuration file in the root
    /// directory if there is one.
    ///
    /// # Errors
    ///
    /// See [`load_registry`].
    pub fn load_all(self) -> Result<Directory<Loaded>, LoadError> {
        let config = load_config(&self.root);
        self.load_with_config(config)
    }

    /// Load all forms from disk with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`load_registry`].
    pub fn load_with_config(self, config: Config) -> Result<Directory<Loaded>, LoadError> {
        let registry = load_registry(&self.root, &config)?;
        Ok(Directory {
            root: self.root,
            state: Loaded { registry, config },
        })
    }
}

impl Directory<Loaded> {
    /// The loaded forms.
    #[must_use]
    pub const fn registry(&self) -> &FormRegistry {
        &self.state.registry
    }

    /// The configuration the forms were loaded with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.state.config
    }
}

/// Loads every form file below `root`.
///
/// Files are parsed in parallel but registered in path order, so which of
/// two clashing files is reported as the duplicate does not depend on
/// scheduling. Source labels are paths relative to `root`.
///
/// # Errors
///
/// Fails on the first file (in path order) that cannot be read or parsed, or
/// on the first duplicate form key.
pub fn load_registry(root: &Path, config: &Config) -> Result<FormRegistry, LoadError> {
    let paths = collect_form_paths(root, config);
    tracing::debug!("found {} form files in {}", paths.len(), root.display());

    let forms: Vec<_> = paths
        .par_iter()
        .map(|path| load_form(path, &source_label(root, path), config))
        .collect();

    let mut registry = FormRegistry::new();
    for form in forms {
        registry.insert(form?)?;
    }
    Ok(registry)
}

/// Reads the configuration file in `root`, falling back to the defaults.
#[must_use]
pub fn load_config(root: &Path) -> Config {
    let path = root.join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn collect_form_paths(root: &Path, config: &Config) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|extension| config.is_form_extension(extension))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn source_label(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
