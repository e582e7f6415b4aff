//! Loading form definitions from disk and binding them to documents.

pub mod directory;
/// A binder over JSON-shaped documents.
pub mod document;
/// YAML serialization of form definitions.
pub mod form_file;

pub use directory::{Directory, load_config, load_registry};
pub use document::{Document, DocumentBinder, DocumentError, Located};
pub use form_file::{ConvertError, LoadError, ParseError, load_form, parse_form};
