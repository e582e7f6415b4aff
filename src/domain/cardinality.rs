use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A quantifier constraint on the number of concrete instances a definition
/// may bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cardinality {
    /// Exactly one instance.
    Required,
    /// One or more instances.
    RequiredMultiple,
    /// Zero or one instance.
    Optional,
    /// Any number of instances.
    OptionalMultiple,
    /// No instances at all.
    Prohibited,
}

impl Cardinality {
    /// Every cardinality, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Required,
        Self::RequiredMultiple,
        Self::Optional,
        Self::OptionalMultiple,
        Self::Prohibited,
    ];

    /// The canonical token used in serialized definitions.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::RequiredMultiple => "required+",
            Self::Optional => "optional",
            Self::OptionalMultiple => "optional+",
            Self::Prohibited => "prohibited",
        }
    }

    /// Parses a canonical token.
    ///
    /// Unknown or blank tokens yield `None` ("no cardinality") rather than an
    /// error, so callers decide how to treat an absent quantifier.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }

    /// Whether more than one instance is allowed.
    #[must_use]
    pub const fn is_multiple(self) -> bool {
        matches!(self, Self::RequiredMultiple | Self::OptionalMultiple)
    }

    /// Checks an observed instance count against this cardinality.
    ///
    /// # Errors
    ///
    /// Returns the [`Violation`] the count represents, if any.
    pub const fn check(self, count: usize) -> Result<(), Violation> {
        match (self, count) {
            (Self::Required | Self::RequiredMultiple, 0) => Err(Violation::Missing(self)),
            (Self::Required | Self::Optional, 2..) => Err(Violation::Repeated(self)),
            (Self::Prohibited, 1..) => Err(Violation::Present),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Cardinality {
    type Err = UnknownCardinality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownCardinality(s.to_string()))
    }
}

impl TryFrom<String> for Cardinality {
    type Error = UnknownCardinality;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cardinality> for String {
    fn from(cardinality: Cardinality) -> Self {
        cardinality.token().to_string()
    }
}

/// Error returned when a token names no known cardinality.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cardinality '{0}': expected one of required, required+, optional, optional+, prohibited")]
pub struct UnknownCardinality(pub String);

/// The way an instance count breaks a [`Cardinality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A required definition has no instance.
    Missing(Cardinality),
    /// A singular definition has more than one instance.
    Repeated(Cardinality),
    /// A prohibited definition has at least one instance.
    Present,
}

impl Violation {
    /// Renders the violation for a definition of the given kind, e.g.
    /// `"required element is not present"`.
    #[must_use]
    pub fn describe(self, noun: &str) -> String {
        match self {
            Self::Missing(cardinality) => {
                format!("{} {noun} is not present", qualifier(cardinality))
            }
            Self::Repeated(cardinality) => {
                format!("{} {noun} is present more than once", qualifier(cardinality))
            }
            Self::Present => format!("prohibited {noun} is present"),
        }
    }
}

const fn qualifier(cardinality: Cardinality) -> &'static str {
    match cardinality {
        Cardinality::Required | Cardinality::RequiredMultiple => "required",
        Cardinality::Optional | Cardinality::OptionalMultiple => "optional",
        Cardinality::Prohibited => "prohibited",
    }
}
