//! The in-memory form definition model.
//!
//! A form is a tree of definitions. Each node kind has its own payload struct
//! and the closed [`Definition`] enum ties them together. Children are kept
//! in a single ordered list per node; the typed accessors on [`Children`] are
//! read-only projections over it.

use std::fmt;

use indexmap::IndexMap;

use crate::domain::Cardinality;

/// Attribute names that belong to the schema itself and can never appear as
/// other attributes.
pub const RESERVED_ATTRIBUTES: [&str; 4] = ["id", "lookup", "type", "group"];

/// Errors raised while assembling a definition tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An other attribute used a name reserved by the schema.
    #[error("attribute name '{0}' is reserved")]
    ReservedAttribute(String),

    /// An other attribute was declared twice on the same definition.
    #[error("attribute '{0}' is declared more than once")]
    DuplicateAttribute(String),

    /// A child of the given kind cannot appear under the parent.
    #[error("{child} definitions are not permitted inside {parent}")]
    ChildNotPermitted {
        /// Diagnostic label of the parent.
        parent: String,
        /// Kind of the rejected child.
        child: DefinitionKind,
    },

    /// An extension point already wraps a child of this kind.
    #[error("{parent} already wraps a {child} definition")]
    SlotTaken {
        /// Diagnostic label of the extension point.
        parent: String,
        /// Kind of the rejected child.
        child: DefinitionKind,
    },
}

/// Identity of a root form: a group (empty when absent) and an id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormKey {
    group: String,
    id: String,
}

impl FormKey {
    /// Creates a key with no group.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            group: String::new(),
            id: id.into(),
        }
    }

    /// Creates a key, normalizing an absent group to `""`.
    #[must_use]
    pub fn with_group(group: Option<&str>, id: impl Into<String>) -> Self {
        Self {
            group: group.unwrap_or_default().to_string(),
            id: id.into(),
        }
    }

    /// The group, `""` when none was given.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The form id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for FormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.id)
    }
}

/// Free-form attributes carried by a definition, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtherAttributes(IndexMap<String, String>);

impl OtherAttributes {
    /// Adds an attribute.
    ///
    /// # Errors
    ///
    /// Fails when the name is reserved or already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if RESERVED_ATTRIBUTES.contains(&name.as_str()) {
            return Err(ModelError::ReservedAttribute(name));
        }
        if self.0.contains_key(&name) {
            return Err(ModelError::DuplicateAttribute(name));
        }
        self.0.insert(name, value.into());
        Ok(())
    }

    /// Looks up an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The kind of a definition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// An attribute definition.
    Attribute,
    /// An element definition.
    Element,
    /// A choice group of mutually exclusive alternatives.
    Choice,
    /// A reference to another root form.
    FormReference,
    /// An extension point handled by pluggable builders.
    Extension,
}

impl DefinitionKind {
    /// The noun used in cardinality messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Element => "element",
            Self::Choice => "single element",
            Self::FormReference => "form reference",
            Self::Extension => "other node",
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Element => "element",
            Self::Choice => "choice",
            Self::FormReference => "form-ref",
            Self::Extension => "other",
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A node of a form definition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// See [`AttributeDefinition`].
    Attribute(AttributeDefinition),
    /// See [`ElementDefinition`].
    Element(ElementDefinition),
    /// See [`ChoiceDefinition`].
    Choice(ChoiceDefinition),
    /// See [`FormReferenceDefinition`].
    FormReference(FormReferenceDefinition),
    /// See [`ExtensionDefinition`].
    Extension(ExtensionDefinition),
}

impl Definition {
    /// The kind of this node.
    #[must_use]
    pub const fn kind(&self) -> DefinitionKind {
        match self {
            Self::Attribute(_) => DefinitionKind::Attribute,
            Self::Element(_) => DefinitionKind::Element,
            Self::Choice(_) => DefinitionKind::Choice,
            Self::FormReference(_) => DefinitionKind::FormReference,
            Self::Extension(_) => DefinitionKind::Extension,
        }
    }

    /// The diagnostic label, e.g. `element[@customer]`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Attribute(d) => d.label(),
            Self::Element(d) => d.label(),
            Self::Choice(d) => d.label(),
            Self::FormReference(d) => d.label(),
            Self::Extension(d) => d.label(),
        }
    }

    /// The other attributes of this node.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        match self {
            Self::Attribute(d) => &d.other_attributes,
            Self::Element(d) => &d.other_attributes,
            Self::Choice(d) => &d.other_attributes,
            Self::FormReference(d) => &d.other_attributes,
            Self::Extension(d) => &d.other_attributes,
        }
    }
}

impl From<AttributeDefinition> for Definition {
    fn from(d: AttributeDefinition) -> Self {
        Self::Attribute(d)
    }
}

impl From<ElementDefinition> for Definition {
    fn from(d: ElementDefinition) -> Self {
        Self::Element(d)
    }
}

impl From<ChoiceDefinition> for Definition {
    fn from(d: ChoiceDefinition) -> Self {
        Self::Choice(d)
    }
}

impl From<FormReferenceDefinition> for Definition {
    fn from(d: FormReferenceDefinition) -> Self {
        Self::FormReference(d)
    }
}

impl From<ExtensionDefinition> for Definition {
    fn from(d: ExtensionDefinition) -> Self {
        Self::Extension(d)
    }
}

/// The ordered children of a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(Vec<Definition>);

impl Children {
    /// Iterates over every child in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Definition> {
        self.0.iter()
    }

    /// The number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The attribute children.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.0.iter().filter_map(|d| match d {
            Definition::Attribute(a) => Some(a),
            _ => None,
        })
    }

    /// The element children.
    pub fn elements(&self) -> impl Iterator<Item = &ElementDefinition> {
        self.0.iter().filter_map(|d| match d {
            Definition::Element(e) => Some(e),
            _ => None,
        })
    }

    /// The choice group children.
    pub fn choices(&self) -> impl Iterator<Item = &ChoiceDefinition> {
        self.0.iter().filter_map(|d| match d {
            Definition::Choice(c) => Some(c),
            _ => None,
        })
    }

    /// The form reference children.
    pub fn references(&self) -> impl Iterator<Item = &FormReferenceDefinition> {
        self.0.iter().filter_map(|d| match d {
            Definition::FormReference(r) => Some(r),
            _ => None,
        })
    }

    /// The extension point children.
    pub fn extensions(&self) -> impl Iterator<Item = &ExtensionDefinition> {
        self.0.iter().filter_map(|d| match d {
            Definition::Extension(x) => Some(x),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a Children {
    type Item = &'a Definition;
    type IntoIter = std::slice::Iter<'a, Definition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn admit(
    permitted: &[DefinitionKind],
    child: &Definition,
    parent: impl FnOnce() -> String,
) -> Result<(), ModelError> {
    if permitted.contains(&child.kind()) {
        Ok(())
    } else {
        Err(ModelError::ChildNotPermitted {
            parent: parent(),
            child: child.kind(),
        })
    }
}

fn bracketed(tag: &str, id: Option<&str>) -> String {
    format!("{tag}[@{}]", id.unwrap_or_default())
}

/// An attribute of an element. Only extension points may appear beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    id: Option<String>,
    lookup: Option<String>,
    cardinality: Cardinality,
    children: Children,
    other_attributes: OtherAttributes,
}

impl AttributeDefinition {
    const PERMITTED: &'static [DefinitionKind] = &[DefinitionKind::Extension];

    /// Creates an attribute definition with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::anonymous(cardinality)
        }
    }

    /// Creates an attribute definition without an id.
    #[must_use]
    pub fn anonymous(cardinality: Cardinality) -> Self {
        Self {
            id: None,
            lookup: None,
            cardinality,
            children: Children::default(),
            other_attributes: OtherAttributes::default(),
        }
    }

    /// Sets the key the binder uses to look the attribute up.
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl Into<String>) -> Self {
        self.lookup = Some(lookup.into());
        self
    }

    /// Adds an other attribute.
    ///
    /// # Errors
    ///
    /// See [`OtherAttributes::insert`].
    pub fn with_other_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.other_attributes.insert(name, value)?;
        Ok(self)
    }

    /// Appends a child definition.
    ///
    /// # Errors
    ///
    /// Fails unless the child is an extension point.
    pub fn with_child(mut self, child: impl Into<Definition>) -> Result<Self, ModelError> {
        let child = child.into();
        admit(Self::PERMITTED, &child, || self.label())?;
        self.children.0.push(child);
        Ok(self)
    }

    /// The id, verbatim.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The explicit lookup key, if any.
    #[must_use]
    pub fn lookup(&self) -> Option<&str> {
        self.lookup.as_deref()
    }

    /// The lookup key, falling back to the id.
    #[must_use]
    pub fn lookup_key(&self) -> Option<&str> {
        self.lookup().or_else(|| self.id())
    }

    /// The declared cardinality.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The children.
    #[must_use]
    pub const fn children(&self) -> &Children {
        &self.children
    }

    /// The other attributes.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        &self.other_attributes
    }

    /// The diagnostic label, e.g. `attribute[@currency]`.
    #[must_use]
    pub fn label(&self) -> String {
        bracketed("attribute", self.id())
    }
}

/// An element. Elements may contain every kind of definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDefinition {
    id: Option<String>,
    lookup: Option<String>,
    cardinality: Cardinality,
    children: Children,
    other_attributes: OtherAttributes,
}

impl ElementDefinition {
    const PERMITTED: &'static [DefinitionKind] = &[
        DefinitionKind::Attribute,
        DefinitionKind::Element,
        DefinitionKind::Choice,
        DefinitionKind::FormReference,
        DefinitionKind::Extension,
    ];

    /// Creates an element definition with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::anonymous(cardinality)
        }
    }

    /// Creates an element definition without an id.
    #[must_use]
    pub fn anonymous(cardinality: Cardinality) -> Self {
        Self {
            id: None,
            lookup: None,
            cardinality,
            children: Children::default(),
            other_attributes: OtherAttributes::default(),
        }
    }

    /// Sets the key the binder uses to look the element up.
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl Into<String>) -> Self {
        self.lookup = Some(lookup.into());
        self
    }

    /// Adds an other attribute.
    ///
    /// # Errors
    ///
    /// See [`OtherAttributes::insert`].
    pub fn with_other_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.other_attributes.insert(name, value)?;
        Ok(self)
    }

    /// Appends a child definition.
    ///
    /// # Errors
    ///
    /// Never fails for the kinds the model defines; the signature matches the
    /// other definitions.
    pub fn with_child(mut self, child: impl Into<Definition>) -> Result<Self, ModelError> {
        let child = child.into();
        admit(Self::PERMITTED, &child, || self.label())?;
        self.children.0.push(child);
        Ok(self)
    }

    /// The id, verbatim.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The explicit lookup key, if any.
    #[must_use]
    pub fn lookup(&self) -> Option<&str> {
        self.lookup.as_deref()
    }

    /// The lookup key, falling back to the id.
    #[must_use]
    pub fn lookup_key(&self) -> Option<&str> {
        self.lookup().or_else(|| self.id())
    }

    /// The declared cardinality.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The children.
    #[must_use]
    pub const fn children(&self) -> &Children {
        &self.children
    }

    /// The other attributes.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        &self.other_attributes
    }

    /// The diagnostic label, e.g. `element[@customer]`.
    #[must_use]
    pub fn label(&self) -> String {
        bracketed("element", self.id())
    }
}

/// A group of mutually exclusive alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceDefinition {
    id: Option<String>,
    cardinality: Cardinality,
    children: Children,
    other_attributes: OtherAttributes,
}

impl ChoiceDefinition {
    const PERMITTED: &'static [DefinitionKind] = &[
        DefinitionKind::Element,
        DefinitionKind::Choice,
        DefinitionKind::Extension,
    ];

    /// Creates a choice group with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::anonymous(cardinality)
        }
    }

    /// Creates a choice group without an id.
    #[must_use]
    pub fn anonymous(cardinality: Cardinality) -> Self {
        Self {
            id: None,
            cardinality,
            children: Children::default(),
            other_attributes: OtherAttributes::default(),
        }
    }

    /// Adds an other attribute.
    ///
    /// # Errors
    ///
    /// See [`OtherAttributes::insert`].
    pub fn with_other_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.other_attributes.insert(name, value)?;
        Ok(self)
    }

    /// Appends an alternative or extension point.
    ///
    /// # Errors
    ///
    /// Fails for attributes and form references.
    pub fn with_child(mut self, child: impl Into<Definition>) -> Result<Self, ModelError> {
        let child = child.into();
        admit(Self::PERMITTED, &child, || self.label())?;
        self.children.0.push(child);
        Ok(self)
    }

    /// The id, verbatim.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The declared cardinality.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The children.
    #[must_use]
    pub const fn children(&self) -> &Children {
        &self.children
    }

    /// The other attributes.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        &self.other_attributes
    }

    /// The diagnostic label, e.g. `choice[@payment]`.
    #[must_use]
    pub fn label(&self) -> String {
        bracketed("choice", self.id())
    }
}

/// A pointer to another root form, inlined at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormReferenceDefinition {
    target: FormKey,
    children: Children,
    other_attributes: OtherAttributes,
}

impl FormReferenceDefinition {
    const PERMITTED: &'static [DefinitionKind] = &[DefinitionKind::Extension];

    /// Creates a reference to the form with the given key.
    #[must_use]
    pub fn new(target: FormKey) -> Self {
        Self {
            target,
            children: Children::default(),
            other_attributes: OtherAttributes::default(),
        }
    }

    /// Adds an other attribute.
    ///
    /// # Errors
    ///
    /// See [`OtherAttributes::insert`].
    pub fn with_other_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.other_attributes.insert(name, value)?;
        Ok(self)
    }

    /// Appends a child definition.
    ///
    /// # Errors
    ///
    /// Fails unless the child is an extension point.
    pub fn with_child(mut self, child: impl Into<Definition>) -> Result<Self, ModelError> {
        let child = child.into();
        admit(Self::PERMITTED, &child, || self.label())?;
        self.children.0.push(child);
        Ok(self)
    }

    /// The referenced form.
    #[must_use]
    pub const fn target(&self) -> &FormKey {
        &self.target
    }

    /// The children.
    #[must_use]
    pub const fn children(&self) -> &Children {
        &self.children
    }

    /// The other attributes.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        &self.other_attributes
    }

    /// The diagnostic label, e.g. `form-ref[@billing:address]`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("form-ref[@{}]", self.target)
    }
}

/// A foreign node dispatched to extension builders.
///
/// It wraps at most one child of each kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDefinition {
    representation: String,
    attribute: Option<Box<AttributeDefinition>>,
    element: Option<Box<ElementDefinition>>,
    choice: Option<Box<ChoiceDefinition>>,
    reference: Option<Box<FormReferenceDefinition>>,
    extension: Option<Box<ExtensionDefinition>>,
    other_attributes: OtherAttributes,
}

impl ExtensionDefinition {
    /// Creates an extension point with the given representation token.
    #[must_use]
    pub fn new(representation: impl Into<String>) -> Self {
        Self {
            representation: representation.into(),
            attribute: None,
            element: None,
            choice: None,
            reference: None,
            extension: None,
            other_attributes: OtherAttributes::default(),
        }
    }

    /// Adds an other attribute.
    ///
    /// # Errors
    ///
    /// See [`OtherAttributes::insert`].
    pub fn with_other_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.other_attributes.insert(name, value)?;
        Ok(self)
    }

    /// Wraps a child definition.
    ///
    /// # Errors
    ///
    /// Fails when a child of the same kind is already wrapped.
    pub fn with_child(mut self, child: impl Into<Definition>) -> Result<Self, ModelError> {
        let child = child.into();
        let kind = child.kind();
        let taken = match child {
            Definition::Attribute(d) => self.attribute.replace(Box::new(d)).is_some(),
            Definition::Element(d) => self.element.replace(Box::new(d)).is_some(),
            Definition::Choice(d) => self.choice.replace(Box::new(d)).is_some(),
            Definition::FormReference(d) => self.reference.replace(Box::new(d)).is_some(),
            Definition::Extension(d) => self.extension.replace(Box::new(d)).is_some(),
        };
        if taken {
            return Err(ModelError::SlotTaken {
                parent: self.label(),
                child: kind,
            });
        }
        Ok(self)
    }

    /// The opaque token interpreted by extension builders.
    #[must_use]
    pub fn representation(&self) -> &str {
        &self.representation
    }

    /// The wrapped attribute, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<&AttributeDefinition> {
        self.attribute.as_deref()
    }

    /// The wrapped element, if any.
    #[must_use]
    pub fn element(&self) -> Option<&ElementDefinition> {
        self.element.as_deref()
    }

    /// The wrapped choice group, if any.
    #[must_use]
    pub fn choice(&self) -> Option<&ChoiceDefinition> {
        self.choice.as_deref()
    }

    /// The wrapped form reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&FormReferenceDefinition> {
        self.reference.as_deref()
    }

    /// The wrapped extension point, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&Self> {
        self.extension.as_deref()
    }

    /// The other attributes.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        &self.other_attributes
    }

    /// The diagnostic label, e.g. `other[comment]`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("other[{}]", self.representation)
    }
}

/// A root form: the unit the registry stores and the engine binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDefinition {
    key: FormKey,
    source: String,
    children: Children,
    other_attributes: OtherAttributes,
}

impl FormDefinition {
    const PERMITTED: &'static [DefinitionKind] = &[
        DefinitionKind::Element,
        DefinitionKind::Choice,
        DefinitionKind::FormReference,
    ];

    /// Creates an empty form. `source` labels where the definition came from.
    #[must_use]
    pub fn new(key: FormKey, source: impl Into<String>) -> Self {
        Self {
            key,
            source: source.into(),
            children: Children::default(),
            other_attributes: OtherAttributes::default(),
        }
    }

    /// Adds an other attribute.
    ///
    /// # Errors
    ///
    /// See [`OtherAttributes::insert`].
    pub fn with_other_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.other_attributes.insert(name, value)?;
        Ok(self)
    }

    /// Appends a child definition.
    ///
    /// # Errors
    ///
    /// Fails for attributes and extension points.
    pub fn with_child(mut self, child: impl Into<Definition>) -> Result<Self, ModelError> {
        let child = child.into();
        admit(Self::PERMITTED, &child, || self.label())?;
        self.children.0.push(child);
        Ok(self)
    }

    /// The registry key.
    #[must_use]
    pub const fn key(&self) -> &FormKey {
        &self.key
    }

    /// Where the definition came from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The children.
    #[must_use]
    pub const fn children(&self) -> &Children {
        &self.children
    }

    /// The other attributes.
    #[must_use]
    pub const fn other_attributes(&self) -> &OtherAttributes {
        &self.other_attributes
    }

    /// The diagnostic label, e.g. `{orders.yaml}form[@shop:order]`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{{{}}}form[@{}]", self.source, self.key)
    }

    /// Every form reference reachable without crossing into another form.
    pub fn references(&self) -> Vec<&FormReferenceDefinition> {
        let mut found = Vec::new();
        collect_all(&self.children, &mut found);
        found
    }
}

fn collect_references<'a>(definition: &'a Definition, found: &mut Vec<&'a FormReferenceDefinition>) {
    match definition {
        Definition::FormReference(r) => {
            found.push(r);
            collect_all(r.children(), found);
        }
        Definition::Attribute(a) => collect_all(a.children(), found),
        Definition::Element(e) => collect_all(e.children(), found),
        Definition::Choice(c) => collect_all(c.children(), found),
        Definition::Extension(x) => collect_wrapped(x, found),
    }
}

fn collect_all<'a>(children: &'a Children, found: &mut Vec<&'a FormReferenceDefinition>) {
    for child in children {
        collect_references(child, found);
    }
}

fn collect_wrapped<'a>(
    extension: &'a ExtensionDefinition,
    found: &mut Vec<&'a FormReferenceDefinition>,
) {
    if let Some(a) = extension.attribute() {
        collect_all(a.children(), found);
    }
    if let Some(e) = extension.element() {
        collect_all(e.children(), found);
    }
    if let Some(c) = extension.choice() {
        collect_all(c.children(), found);
    }
    if let Some(r) = extension.reference() {
        found.push(r);
        collect_all(r.children(), found);
    }
    if let Some(nested) = extension.extension() {
        collect_wrapped(nested, found);
    }
}

/// A borrowed reference to any node of a form, including the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionRef<'a> {
    /// A root form.
    Form(&'a FormDefinition),
    /// An attribute.
    Attribute(&'a AttributeDefinition),
    /// An element.
    Element(&'a ElementDefinition),
    /// A choice group.
    Choice(&'a ChoiceDefinition),
    /// A form reference.
    FormReference(&'a FormReferenceDefinition),
    /// An extension point.
    Extension(&'a ExtensionDefinition),
}

impl DefinitionRef<'_> {
    /// The diagnostic label of the referenced node.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Form(d) => d.label(),
            Self::Attribute(d) => d.label(),
            Self::Element(d) => d.label(),
            Self::Choice(d) => d.label(),
            Self::FormReference(d) => d.label(),
            Self::Extension(d) => d.label(),
        }
    }
}

impl<'a> From<&'a Definition> for DefinitionRef<'a> {
    fn from(definition: &'a Definition) -> Self {
        match definition {
            Definition::Attribute(d) => Self::Attribute(d),
            Definition::Element(d) => Self::Element(d),
            Definition::Choice(d) => Self::Choice(d),
            Definition::FormReference(d) => Self::FormReference(d),
            Definition::Extension(d) => Self::Extension(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_use_ids_verbatim() {
        let element = ElementDefinition::new(" spaced id ", Cardinality::Required);
        assert_eq!(element.label(), "element[@ spaced id ]");

        let anonymous = ChoiceDefinition::anonymous(Cardinality::Optional);
        assert_eq!(anonymous.label(), "choice[@]");

        let form = FormDefinition::new(FormKey::new("id"), "source");
        assert_eq!(form.label(), "{source}form[@:id]");

        let reference = FormReferenceDefinition::new(FormKey::with_group(Some("g"), "x"));
        assert_eq!(reference.label(), "form-ref[@g:x]");
    }

    #[test]
    fn absent_group_normalizes_to_empty() {
        assert_eq!(FormKey::with_group(None, "a"), FormKey::new("a"));
        assert_eq!(FormKey::new("a").group(), "");
    }

    #[test]
    fn child_views_preserve_declaration_order() {
        let element = ElementDefinition::new("root", Cardinality::Required)
            .with_child(ElementDefinition::new("a", Cardinality::Optional))
            .unwrap()
            .with_child(AttributeDefinition::new("x", Cardinality::Optional))
            .unwrap()
            .with_child(ElementDefinition::new("b", Cardinality::Optional))
            .unwrap()
            .with_child(ChoiceDefinition::new("c", Cardinality::Optional))
            .unwrap();

        let elements: Vec<_> = element.children().elements().filter_map(ElementDefinition::id).collect();
        assert_eq!(elements, vec!["a", "b"]);
        assert_eq!(element.children().attributes().count(), 1);
        assert_eq!(element.children().choices().count(), 1);
        assert_eq!(element.children().len(), 4);

        let kinds: Vec<_> = element.children().iter().map(Definition::kind).collect();
        assert_eq!(
            kinds,
            vec![
                DefinitionKind::Element,
                DefinitionKind::Attribute,
                DefinitionKind::Element,
                DefinitionKind::Choice
            ]
        );
    }

    #[test]
    fn rejects_children_not_permitted() {
        let err = ChoiceDefinition::new("c", Cardinality::Required)
            .with_child(AttributeDefinition::new("a", Cardinality::Optional))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::ChildNotPermitted {
                parent: "choice[@c]".to_string(),
                child: DefinitionKind::Attribute,
            }
        );

        assert!(
            AttributeDefinition::new("a", Cardinality::Optional)
                .with_child(ElementDefinition::new("e", Cardinality::Optional))
                .is_err()
        );
        assert!(
            FormDefinition::new(FormKey::new("f"), "src")
                .with_child(ExtensionDefinition::new("x"))
                .is_err()
        );
        assert!(
            FormReferenceDefinition::new(FormKey::new("f"))
                .with_child(ExtensionDefinition::new("x"))
                .is_ok()
        );
    }

    #[test]
    fn other_attributes_are_ordered_and_unique() {
        let mut attributes = OtherAttributes::default();
        attributes.insert("zeta", "1").unwrap();
        attributes.insert("alpha", "2").unwrap();

        assert_eq!(
            attributes.iter().collect::<Vec<_>>(),
            vec![("zeta", "1"), ("alpha", "2")]
        );
        assert_eq!(
            attributes.insert("zeta", "3"),
            Err(ModelError::DuplicateAttribute("zeta".to_string()))
        );
        for reserved in RESERVED_ATTRIBUTES {
            assert_eq!(
                attributes.insert(reserved, "x"),
                Err(ModelError::ReservedAttribute(reserved.to_string()))
            );
        }
    }

    #[test]
    fn extension_wraps_one_child_per_kind() {
        let extension = ExtensionDefinition::new("hint")
            .with_child(ElementDefinition::new("a", Cardinality::Optional))
            .unwrap()
            .with_child(AttributeDefinition::new("b", Cardinality::Optional))
            .unwrap();
        assert_eq!(extension.element().and_then(ElementDefinition::id), Some("a"));
        assert_eq!(extension.attribute().and_then(AttributeDefinition::id), Some("b"));

        let err = extension
            .with_child(ElementDefinition::new("c", Cardinality::Optional))
            .unwrap_err();
        assert!(matches!(err, ModelError::SlotTaken { child: DefinitionKind::Element, .. }));
    }

    #[test]
    fn lookup_key_falls_back_to_id() {
        let plain = ElementDefinition::new("name", Cardinality::Required);
        assert_eq!(plain.lookup_key(), Some("name"));
        let keyed = plain.with_lookup("customer-name");
        assert_eq!(keyed.lookup_key(), Some("customer-name"));
        assert_eq!(ElementDefinition::anonymous(Cardinality::Required).lookup_key(), None);
    }

    #[test]
    fn collects_nested_references() {
        let form = FormDefinition::new(FormKey::new("outer"), "src")
            .with_child(
                ElementDefinition::new("e", Cardinality::Required)
                    .with_child(FormReferenceDefinition::new(FormKey::new("a")))
                    .unwrap(),
            )
            .unwrap()
            .with_child(FormReferenceDefinition::new(FormKey::new("b")))
            .unwrap();

        let targets: Vec<_> = form.references().iter().map(|r| r.target().id()).collect();
        assert_eq!(targets, vec!["a", "b"]);
    }
}
