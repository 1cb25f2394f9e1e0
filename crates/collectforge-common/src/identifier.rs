//! Typed item identifiers used to query metadata providers.
//!
//! Identifier types are serialized as uppercase strings (`"ISBN"`, `"UPC"`,
//! ...). Anything that is not a well-known type is kept as a custom code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IdentifierType {
    /// International Standard Book Number (10 or 13 digits).
    Isbn,
    /// Universal Product Code.
    Upc,
    /// European Article Number.
    Ean,
    /// Amazon Standard Identification Number.
    Asin,
    /// Any other catalog code, stored uppercase (e.g. `KM` for coin catalogs).
    Custom(String),
}

impl IdentifierType {
    /// Canonical uppercase name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Isbn => "ISBN",
            Self::Upc => "UPC",
            Self::Ean => "EAN",
            Self::Asin => "ASIN",
            Self::Custom(name) => name,
        }
    }

    /// Numeric barcode-style codes where spaces and hyphens are formatting only.
    fn strips_separators(&self) -> bool {
        matches!(self, Self::Isbn | Self::Upc | Self::Ean)
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(Error::invalid_argument("identifier type must not be empty"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::invalid_argument(format!(
                "identifier type contains invalid characters: {s}"
            )));
        }
        Ok(match name.as_str() {
            "ISBN" => Self::Isbn,
            "UPC" => Self::Upc,
            "EAN" => Self::Ean,
            "ASIN" => Self::Asin,
            _ => Self::Custom(name),
        })
    }
}

impl TryFrom<String> for IdentifierType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<IdentifierType> for String {
    fn from(value: IdentifierType) -> Self {
        value.as_str().to_string()
    }
}

/// A typed identifier value, e.g. `ISBN:9780134685991`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdentifier")]
pub struct Identifier {
    id_type: IdentifierType,
    value: String,
}

/// Wire form of [`Identifier`]; deserialization goes through
/// [`Identifier::new`].
#[derive(Deserialize)]
struct RawIdentifier {
    id_type: IdentifierType,
    value: String,
}

impl TryFrom<RawIdentifier> for Identifier {
    type Error = Error;

    fn try_from(raw: RawIdentifier) -> Result<Self> {
        Identifier::new(raw.id_type, &raw.value)
    }
}

impl Identifier {
    /// Create an identifier, normalizing the value.
    ///
    /// Values are trimmed; ISBN, UPC and EAN values additionally lose spaces
    /// and hyphens. Empty values are rejected.
    pub fn new(id_type: IdentifierType, value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let value: String = if id_type.strips_separators() {
            trimmed
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '-')
                .collect()
        } else {
            trimmed.to_string()
        };

        if value.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{id_type} identifier value must not be empty"
            )));
        }

        Ok(Self { id_type, value })
    }

    /// The identifier type.
    pub fn id_type(&self) -> &IdentifierType {
        &self.id_type
    }

    /// The normalized identifier value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id_type, self.value)
    }
}

/// Parses the `TYPE:VALUE` form used on the command line.
impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (id_type, value) = s.split_once(':').ok_or_else(|| {
            Error::invalid_argument(format!("expected TYPE:VALUE identifier, got '{s}'"))
        })?;
        Identifier::new(id_type.parse()?, value)
    }
}
