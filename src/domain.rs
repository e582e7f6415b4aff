//! Domain models for form binding.
//!
//! This module contains the core schema types: cardinalities, the form
//! definition tree, the registry of root forms, diagnostic node paths and
//! configuration.

/// Quantifier constraints and their validation.
pub mod cardinality;
pub use cardinality::{Cardinality, UnknownCardinality, Violation};

mod config;
pub use config::{Config, ConfigError};

/// The form definition tree.
pub mod definition;
pub use definition::{
    AttributeDefinition, ChoiceDefinition, Children, Definition, DefinitionKind, DefinitionRef,
    ElementDefinition, ExtensionDefinition, FormDefinition, FormKey, FormReferenceDefinition,
    ModelError, OtherAttributes,
};

pub mod node_path;
pub use node_path::NodePath;

mod registry;
pub use registry::{DanglingReference, FormRegistry, RegistryError};
