//! Schema-driven form binding
//!
//! A form definition describes the shape some external data is expected to
//! have: elements, attributes, mutually exclusive choices and references to
//! other forms, each with a cardinality. The [`Engine`] walks a definition,
//! asks a [`Binder`] how many concrete instances exist for every node,
//! validates the counts and produces an [`OutputTree`], or fails with an
//! error that names the exact position of the problem.

pub mod domain;
pub use domain::{
    Cardinality, Config, FormDefinition, FormKey, FormRegistry, NodePath, RegistryError,
};

/// The binding engine and its extension points.
pub mod binding;
pub use binding::{Binder, BindingError, BindingSource, Engine, Error, OutputTree};

/// Form files on disk and the document binder.
pub mod storage;
pub use storage::{Directory, Document, DocumentBinder};
