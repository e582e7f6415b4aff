use std::fmt;

use crate::domain::{FormKey, NodePath};

/// A cardinality, mutual-exclusion or presence violation.
///
/// The path is that of the node whose children were being evaluated when the
/// violation was found. The failing definition's own label is kept
/// separately, since that definition never produced output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct BindingError {
    message: String,
    path: NodePath,
    definition: Option<String>,
}

impl BindingError {
    /// Creates an error with a message and the path it is attributed to.
    #[must_use]
    pub fn new(message: impl Into<String>, path: NodePath) -> Self {
        Self {
            message: message.into(),
            path,
            definition: None,
        }
    }

    /// Records the label of the definition that failed.
    #[must_use]
    pub fn with_definition(mut self, label: impl Into<String>) -> Self {
        self.definition = Some(label.into());
        self
    }

    /// The human readable message, e.g. `"required element is not present"`.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The path the error is attributed to.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// The label of the failing definition, if known.
    #[must_use]
    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{},", self.message)
        } else {
            write!(f, "{}, {}", self.message, self.path)
        }
    }
}

/// Errors that abort a binding run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The definition and the binding source disagree.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// A root form or reference target is not registered.
    #[error("form definition {key} not found, {path}")]
    DefinitionNotFound {
        /// The requested key.
        key: FormKey,
        /// The path of the referencing node; empty for a root lookup.
        path: NodePath,
    },

    /// Form references are nested deeper than the configured limit.
    #[error("form reference depth limit of {limit} exceeded by {key}, {path}")]
    ReferenceDepthExceeded {
        /// The reference that would have exceeded the limit.
        key: FormKey,
        /// The configured limit.
        limit: usize,
        /// The path of the referencing node.
        path: NodePath,
    },
}

impl Error {
    /// The path the error is attributed to.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        match self {
            Self::Binding(e) => e.path(),
            Self::DefinitionNotFound { path, .. } | Self::ReferenceDepthExceeded { path, .. } => {
                path
            }
        }
    }
}
