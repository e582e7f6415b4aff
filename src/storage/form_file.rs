//! YAML serialization of form definitions.
//!
//! A form file holds exactly one root form:
//!
//! ```yaml
//! _version: "1"
//! id: order
//! group: shop
//! title: Order form
//! children:
//!   - element:
//!       id: customer
//!       cardinality: required
//!       children:
//!         - attribute:
//!             id: currency
//!             cardinality: optional
//!   - choice:
//!       id: payment
//!       children:
//!         - element: { id: card }
//!         - element: { id: invoice }
//!   - form-ref:
//!       id: address
//!       group: shop
//! ```
//!
//! Keys the schema does not know about become other attributes of the
//! definition they appear on.

use std::{
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use crate::domain::{
    AttributeDefinition, Cardinality, ChoiceDefinition, Config, Definition, ElementDefinition,
    ExtensionDefinition, FormDefinition, FormKey, FormReferenceDefinition, ModelError,
    RegistryError, UnknownCardinality,
};

/// A form file parsed but not yet assembled.
#[derive(Debug, Deserialize)]
#[serde(tag = "_version")]
enum FormFile {
    #[serde(rename = "1")]
    V1(RawForm),
}

#[derive(Debug, Deserialize)]
struct RawForm {
    id: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    children: Vec<RawDefinition>,
    #[serde(flatten)]
    other: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawDefinition {
    Attribute(RawNode),
    Element(RawNode),
    Choice(RawNode),
    FormRef(RawReference),
    Other(RawExtension),
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    lookup: Option<String>,
    #[serde(default)]
    cardinality: Option<String>,
    #[serde(default)]
    children: Vec<RawDefinition>,
    #[serde(flatten)]
    other: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    id: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    children: Vec<RawDefinition>,
    #[serde(flatten)]
    other: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawExtension {
    representation: String,
    #[serde(default)]
    children: Vec<RawDefinition>,
    #[serde(flatten)]
    other: IndexMap<String, Value>,
}

/// The definitions in a form file are not a valid form.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The definition tree breaks a structural rule.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A cardinality token is not recognised.
    #[error(transparent)]
    Cardinality(#[from] UnknownCardinality),

    /// An other attribute holds a sequence, mapping or null.
    #[error("attribute '{0}' must be a string, number or boolean")]
    NonScalar(String),
}

/// A form file could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text is not YAML of the expected shape.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// The YAML describes an invalid form.
    #[error(transparent)]
    Invalid(#[from] ConvertError),
}

/// Errors raised while loading forms from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A file could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A file could not be parsed.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: ParseError,
    },

    /// Two files define the same form.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Parses a form from YAML text.
///
/// `source` becomes the form's source label. Definitions that declare no
/// cardinality get the configured default.
///
/// # Errors
///
/// Fails when the text is not a version 1 form file or when the definitions
/// it holds do not form a valid tree.
pub fn parse_form(text: &str, source: &str, config: &Config) -> Result<FormDefinition, ParseError> {
    let FormFile::V1(raw) = serde_yaml::from_str(text)?;
    Ok(raw.assemble(source, config)?)
}

/// Reads and parses a form file.
///
/// # Errors
///
/// See [`parse_form`]; failures are tagged with the path.
pub fn load_form(path: &Path, source: &str, config: &Config) -> Result<FormDefinition, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_form(&text, source, config).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl RawForm {
    fn assemble(self, source: &str, config: &Config) -> Result<FormDefinition, ConvertError> {
        let key = FormKey::with_group(self.group.as_deref(), self.id);
        let mut form = FormDefinition::new(key, source);
        for (name, value) in self.other {
            let value = scalar(&name, value)?;
            form = form.with_other_attribute(name, value)?;
        }
        for child in self.children {
            form = form.with_child(child.assemble(config)?)?;
        }
        Ok(form)
    }
}

impl RawDefinition {
    fn assemble(self, config: &Config) -> Result<Definition, ConvertError> {
        Ok(match self {
            Self::Attribute(node) => attribute(node, config)?.into(),
            Self::Element(node) => element(node, config)?.into(),
            Self::Choice(node) => choice(node, config)?.into(),
            Self::FormRef(reference) => form_reference(reference, config)?.into(),
            Self::Other(extension) => other(extension, config)?.into(),
        })
    }
}

impl RawNode {
    fn cardinality(&self, config: &Config) -> Result<Cardinality, UnknownCardinality> {
        match &self.cardinality {
            None => Ok(config.default_cardinality()),
            Some(token) => token.parse(),
        }
    }
}

fn attribute(node: RawNode, config: &Config) -> Result<AttributeDefinition, ConvertError> {
    let cardinality = node.cardinality(config)?;
    let mut attribute = match node.id {
        Some(id) => AttributeDefinition::new(id, cardinality),
        None => AttributeDefinition::anonymous(cardinality),
    };
    if let Some(lookup) = node.lookup {
        attribute = attribute.with_lookup(lookup);
    }
    for (name, value) in node.other {
        let value = scalar(&name, value)?;
        attribute = attribute.with_other_attribute(name, value)?;
    }
    for child in node.children {
        attribute = attribute.with_child(child.assemble(config)?)?;
    }
    Ok(attribute)
}

fn element(node: RawNode, config: &Config) -> Result<ElementDefinition, ConvertError> {
    let cardinality = node.cardinality(config)?;
    let mut element = match node.id {
        Some(id) => ElementDefinition::new(id, cardinality),
        None => ElementDefinition::anonymous(cardinality),
    };
    if let Some(lookup) = node.lookup {
        element = element.with_lookup(lookup);
    }
    for (name, value) in node.other {
        let value = scalar(&name, value)?;
        element = element.with_other_attribute(name, value)?;
    }
    for child in node.children {
        element = element.with_child(child.assemble(config)?)?;
    }
    Ok(element)
}

fn choice(node: RawNode, config: &Config) -> Result<ChoiceDefinition, ConvertError> {
    let cardinality = node.cardinality(config)?;
    let mut choice = match node.id {
        Some(id) => ChoiceDefinition::new(id, cardinality),
        None => ChoiceDefinition::anonymous(cardinality),
    };
    // choices are never looked up
    if node.lookup.is_some() {
        return Err(ModelError::ReservedAttribute("lookup".to_string()).into());
    }
    for (name, value) in node.other {
        let value = scalar(&name, value)?;
        choice = choice.with_other_attribute(name, value)?;
    }
    for child in node.children {
        choice = choice.with_child(child.assemble(config)?)?;
    }
    Ok(choice)
}

fn form_reference(
    raw: RawReference,
    config: &Config,
) -> Result<FormReferenceDefinition, ConvertError> {
    let mut reference =
        FormReferenceDefinition::new(FormKey::with_group(raw.group.as_deref(), raw.id));
    for (name, value) in raw.other {
        let value = scalar(&name, value)?;
        reference = reference.with_other_attribute(name, value)?;
    }
    for child in raw.children {
        reference = reference.with_child(child.assemble(config)?)?;
    }
    Ok(reference)
}

fn other(raw: RawExtension, config: &Config) -> Result<ExtensionDefinition, ConvertError> {
    let mut extension = ExtensionDefinition::new(raw.representation);
    for (name, value) in raw.other {
        let value = scalar(&name, value)?;
        extension = extension.with_other_attribute(name, value)?;
    }
    for child in raw.children {
        extension = extension.with_child(child.assemble(config)?)?;
    }
    Ok(extension)
}

fn scalar(name: &str, value: Value) -> Result<String, ConvertError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
            Err(ConvertError::NonScalar(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_case::test_case;

    use super::*;
    use crate::domain::{DefinitionKind, DefinitionRef};

    const ORDER: &str = r#"
_version: "1"
id: order
group: shop
title: Order form
children:
  - element:
      id: customer
      lookup: buyer
      children:
        - attribute:
            id: currency
            cardinality: optional
            unit: ISO 4217
  - choice:
      id: payment
      cardinality: optional
      children:
        - element: { id: card }
        - element: { id: invoice, cardinality: required+ }
        - other: { representation: comment }
  - form-ref:
      id: address
      group: shop
      role: delivery
"#;

    #[test]
    fn parses_a_complete_form() {
        let form = parse_form(ORDER, "order.yaml", &Config::default()).unwrap();

        assert_eq!(form.key(), &FormKey::with_group(Some("shop"), "order"));
        assert_eq!(form.label(), "{order.yaml}form[@shop:order]");
        assert_eq!(form.other_attributes().get("title"), Some("Order form"));

        let kinds: Vec<_> = form.children().iter().map(Definition::kind).collect();
        assert_eq!(
            kinds,
            vec![
                DefinitionKind::Element,
                DefinitionKind::Choice,
                DefinitionKind::FormReference
            ]
        );

        let customer = form.children().elements().next().unwrap();
        assert_eq!(customer.lookup_key(), Some("buyer"));
        assert_eq!(customer.cardinality(), Cardinality::Required);
        let currency = customer.children().attributes().next().unwrap();
        assert_eq!(currency.cardinality(), Cardinality::Optional);
        assert_eq!(currency.other_attributes().get("unit"), Some("ISO 4217"));

        let payment = form.children().choices().next().unwrap();
        let cardinalities: Vec<_> = payment
            .children()
            .elements()
            .map(ElementDefinition::cardinality)
            .collect();
        assert_eq!(
            cardinalities,
            vec![Cardinality::Required, Cardinality::RequiredMultiple]
        );
        assert_eq!(payment.children().extensions().count(), 1);

        let reference = form.children().references().next().unwrap();
        assert_eq!(reference.label(), "form-ref[@shop:address]");
        assert_eq!(reference.other_attributes().get("role"), Some("delivery"));
        assert_eq!(
            DefinitionRef::FormReference(reference).label(),
            "form-ref[@shop:address]"
        );
    }

    #[test]
    fn missing_cardinality_uses_configured_default() {
        let config: Config =
            toml::from_str("_version = \"1\"\ndefault_cardinality = \"optional+\"").unwrap();
        let form = parse_form(
            "_version: \"1\"\nid: f\nchildren:\n  - element: { id: e }\n",
            "f.yaml",
            &config,
        )
        .unwrap();

        let element = form.children().elements().next().unwrap();
        assert_eq!(element.cardinality(), Cardinality::OptionalMultiple);
    }

    #[test_case("  - element: { id: e, cardinality: sometimes }\n"; "unknown cardinality")]
    #[test_case("  - element: { id: e, type: text }\n"; "reserved attribute")]
    #[test_case("  - element: { id: e, tags: [a, b] }\n"; "non scalar attribute")]
    #[test_case("  - attribute: { id: a }\n"; "attribute directly under a form")]
    #[test_case("  - choice: { id: c, lookup: x }\n"; "choice with a lookup")]
    fn rejects_invalid_definitions(children: &str) {
        let text = format!("_version: \"1\"\nid: f\nchildren:\n{children}");
        let error = parse_form(&text, "f.yaml", &Config::default()).unwrap_err();
        assert!(matches!(error, ParseError::Invalid(_)), "{error:?}");
    }

    #[test]
    fn rejects_unknown_versions() {
        let error = parse_form("_version: \"2\"\nid: f\n", "f.yaml", &Config::default()).unwrap_err();
        assert!(matches!(error, ParseError::Yaml(_)));
    }

    #[test]
    fn load_tags_errors_with_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version: \"1\"\nid: [not, a, string]\n").unwrap();

        let error = load_form(file.path(), "broken.yaml", &Config::default()).unwrap_err();
        let LoadError::Parse { path, .. } = error else {
            panic!("expected a parse error, got {error:?}");
        };
        assert_eq!(path, file.path());
    }
}
