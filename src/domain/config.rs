use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Cardinality;

/// Configuration for loading and binding forms.
///
/// This struct holds settings that control how form files are discovered and
/// parsed, and how deep a binding run may follow form references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// How many form references may be nested inside one another during a
    /// single binding run.
    ///
    /// Reference cycles are legal in a registry; this limit is what turns a
    /// runaway cycle into an error.
    max_reference_depth: usize,

    /// The cardinality given to definitions that do not declare one.
    default_cardinality: Cardinality,

    /// File extensions recognised as form files when loading a directory.
    form_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_reference_depth: default_max_reference_depth(),
            default_cardinality: Cardinality::Required,
            form_extensions: default_form_extensions(),
        }
    }
}

/// Errors raised while reading or writing a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid configuration.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the maximum nesting of form references.
    #[must_use]
    pub const fn max_reference_depth(&self) -> usize {
        self.max_reference_depth
    }

    /// Sets the maximum nesting of form references.
    pub const fn set_max_reference_depth(&mut self, depth: usize) {
        self.max_reference_depth = depth;
    }

    /// Returns the cardinality assumed when a definition declares none.
    #[must_use]
    pub const fn default_cardinality(&self) -> Cardinality {
        self.default_cardinality
    }

    /// Returns the recognised form file extensions.
    #[must_use]
    pub fn form_extensions(&self) -> &[String] {
        &self.form_extensions
    }

    /// Checks whether a file extension marks a form file.
    ///
    /// Extensions are compared case-insensitively.
    #[must_use]
    pub fn is_form_extension(&self, extension: &str) -> bool {
        self.form_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

const fn default_max_reference_depth() -> usize {
    32
}

const fn default_cardinality() -> Cardinality {
    Cardinality::Required
}

fn default_form_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string()]
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_max_reference_depth")]
        max_reference_depth: usize,

        #[serde(default = "default_cardinality")]
        default_cardinality: Cardinality,

        #[serde(default = "default_form_extensions")]
        form_extensions: Vec<String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                max_reference_depth,
                default_cardinality,
                form_extensions,
            } => Self {
                max_reference_depth,
                default_cardinality,
                form_extensions,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            max_reference_depth: config.max_reference_depth,
            default_cardinality: config.default_cardinality,
            form_extensions: config.form_extensions,
        }
    }
}
