//! The binding engine.
//!
//! An [`Engine`] walks a root form from a [`FormRegistry`](crate::domain::FormRegistry),
//! asks a [`Binder`] how many instances exist for every definition it meets,
//! validates those counts against the declared cardinalities and records the
//! result in an [`OutputTree`].

mod binder;
pub use binder::{Binder, BindingSource, Scope};

mod engine;
pub use engine::{Engine, Session};

mod error;
pub use error::{BindingError, Error};

/// Extension point dispatch.
pub mod extension;
pub use extension::{CommentBuilder, ExtensionBuilder, ExtensionRegistry, InlineBuilder};

mod output;
pub use output::{NodeId, NodeKind, Origin, OutputNode, OutputTree};

#[cfg(test)]
pub(crate) mod testing;
