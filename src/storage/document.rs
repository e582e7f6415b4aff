//! A binder over JSON-shaped documents.
//!
//! Element and attribute lookup keys name object members. A member holding
//! an array binds once per item; a missing or `null` member does not bind at
//! all. Instances are addressed by JSON pointer.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
    binding::{Binder, BindingSource, Scope},
    domain::{AttributeDefinition, ElementDefinition, FormDefinition},
};

/// A parsed document to bind forms against.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    value: Value,
    label: String,
}

/// Errors raised while reading a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file is not valid JSON.
    #[error("failed to parse {} as JSON", path.display())]
    Json {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// The file is not valid YAML.
    #[error("failed to parse {} as YAML", path.display())]
    Yaml {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },
}

impl Document {
    /// Wraps an already parsed value.
    #[must_use]
    pub fn new(value: Value, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }

    /// Reads a document, choosing JSON for `.json` files and YAML otherwise.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        let value = if is_json {
            serde_json::from_str(&text).map_err(|source| DocumentError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_yaml::from_str(&text).map_err(|source| DocumentError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        Ok(Self::new(value, path.display().to_string()))
    }

    /// The document content.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Where the document came from.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl BindingSource for Document {
    fn representation(&self) -> Option<String> {
        (!self.value.is_null()).then(|| self.label.clone())
    }
}

/// One bound location in a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pointer: String,
    scalar: Option<String>,
}

impl Located {
    fn at(pointer: String, value: &Value) -> Self {
        Self {
            pointer,
            scalar: scalar(value),
        }
    }

    /// The JSON pointer of the location; `""` is the document root.
    #[must_use]
    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

/// Binds definitions to members of a [`Document`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBinder;

impl DocumentBinder {
    /// The binder kind reported to extension builders.
    pub const KIND: &'static str = "document";

    fn members(document: &Document, within: &Located, key: Option<&str>) -> Vec<Located> {
        let Some(key) = key else {
            return vec![within.clone()];
        };

        let pointer = format!("{}/{}", within.pointer, escape(key));
        match document.value.pointer(&pointer) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(i, item)| Located::at(format!("{pointer}/{i}"), item))
                .collect(),
            Some(value) => vec![Located::at(pointer, value)],
        }
    }
}

impl Binder for DocumentBinder {
    type Source = Document;
    type Context = Located;

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn bind_form(
        &mut self,
        source: &Document,
        enclosing: Option<&Scope<'_, '_, Located>>,
        _form: &FormDefinition,
    ) -> Option<Located> {
        enclosing
            .is_none()
            .then(|| Located::at(String::new(), &source.value))
    }

    fn bind_element(
        &mut self,
        source: &Document,
        scope: &Scope<'_, '_, Located>,
        element: &ElementDefinition,
    ) -> Vec<Located> {
        Self::members(source, scope.context(), element.lookup_key())
    }

    fn bind_attribute(
        &mut self,
        source: &Document,
        scope: &Scope<'_, '_, Located>,
        attribute: &AttributeDefinition,
    ) -> Option<Located> {
        let Some(key) = attribute.lookup_key() else {
            return Some(scope.context().clone());
        };
        let pointer = format!("{}/{}", scope.context().pointer, escape(key));
        match source.value.pointer(&pointer) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Located::at(pointer, value)),
        }
    }

    fn describe(&self, context: &Located) -> Option<String> {
        Some(format!("#{}", context.pointer))
    }

    fn value(&self, context: &Located) -> Option<String> {
        context.scalar.clone()
    }
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
