//! Compiled, immutable module contracts.
//!
//! A [`ModuleContract`] is only ever produced by
//! [`compile_module`](super::compiler::compile_module); once built it is
//! shared behind an `Arc` and never mutated. Optional collections are always
//! present (empty rather than absent).

use std::fmt;

use collectforge_common::IdentifierType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// The compiled schema of one collectible item type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ModuleContract {
    /// Registry-wide unique key, e.g. `books`.
    pub key: String,
    /// Semantic version string.
    pub version: String,
    /// Display name.
    pub name: String,
    pub description: Option<String>,
    pub meta: ModuleMeta,
    /// Item lifecycle states, sorted by `order`.
    pub states: Vec<StateContract>,
    /// Lookup providers, sorted by ascending `priority`.
    pub providers: Vec<ProviderContract>,
    /// Item attributes, sorted by `order`.
    pub fields: Vec<FieldContract>,
    pub workflows: Vec<WorkflowContract>,
    /// Opaque extension payload, preserved as-is.
    pub extensions: Map<String, Value>,
}

impl ModuleContract {
    /// Look up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldContract> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Look up a state by key.
    pub fn state(&self, key: &str) -> Option<&StateContract> {
        self.states.iter().find(|s| s.key == key)
    }

    /// Look up a provider declaration by key.
    pub fn provider(&self, key: &str) -> Option<&ProviderContract> {
        self.providers.iter().find(|p| p.key == key)
    }

    /// Enabled providers in ascending priority order.
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderContract> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Fields that have at least one provider mapping.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldContract> {
        self.fields.iter().filter(|f| !f.providers.is_empty())
    }
}

/// Descriptive metadata about a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleMeta {
    pub authors: Vec<String>,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub homepage: Option<String>,
}

// ---------------------------------------------------------------------------
// States, providers and workflows
// ---------------------------------------------------------------------------

/// A lifecycle state an item can be in (wishlist, owned, sold, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateContract {
    pub key: String,
    pub label: String,
    pub order: u32,
    pub active: bool,
    pub deprecated: bool,
}

/// A module's declaration of an external lookup provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderContract {
    pub key: String,
    pub enabled: bool,
    /// Lower values are consulted first.
    pub priority: i32,
    /// Identifier types this module sends to the provider. Empty means
    /// whatever the provider itself supports.
    pub identifier_types: Vec<IdentifierType>,
    pub extensions: Map<String, Value>,
}

impl ProviderContract {
    /// Whether the module allows sending identifiers of `id_type` to this provider.
    pub fn accepts(&self, id_type: &IdentifierType) -> bool {
        self.identifier_types.is_empty() || self.identifier_types.contains(id_type)
    }
}

/// A named path through the module's states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowContract {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    /// State keys in the order the workflow walks them.
    pub states: Vec<String>,
    pub extensions: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    LongText,
    Number,
    Date,
    Enum,
    Boolean,
    Identifier,
    Url,
}

impl FieldType {
    /// Parse a type name as written in a definition file (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TEXT" => Some(Self::Text),
            "LONG_TEXT" => Some(Self::LongText),
            "NUMBER" => Some(Self::Number),
            "DATE" => Some(Self::Date),
            "ENUM" => Some(Self::Enum),
            "BOOLEAN" => Some(Self::Boolean),
            "IDENTIFIER" => Some(Self::Identifier),
            "URL" => Some(Self::Url),
            _ => None,
        }
    }

    /// Whether values of this type are strings.
    pub fn is_textual(self) -> bool {
        !matches!(self, Self::Number | Self::Boolean)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "TEXT",
            Self::LongText => "LONG_TEXT",
            Self::Number => "NUMBER",
            Self::Date => "DATE",
            Self::Enum => "ENUM",
            Self::Boolean => "BOOLEAN",
            Self::Identifier => "IDENTIFIER",
            Self::Url => "URL",
        };
        f.write_str(name)
    }
}

/// One attribute of an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldContract {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
    pub order: u32,
    pub active: bool,
    pub deprecated: bool,
    pub default_value: Option<Value>,
    /// Accepted identifier types; only meaningful for IDENTIFIER fields.
    pub identifier_types: Vec<IdentifierType>,
    pub enum_values: Vec<String>,
    pub constraints: Constraints,
    pub ui: UiHints,
    /// Where each provider carries this field, in declaration order.
    pub providers: Vec<ProviderMapping>,
    pub extensions: Map<String, Value>,
}

impl FieldContract {
    /// Mappings that apply to `provider_key`, in declaration order.
    pub fn mappings_for<'a>(
        &'a self,
        provider_key: &'a str,
    ) -> impl Iterator<Item = &'a ProviderMapping> + 'a {
        self.providers.iter().filter(move |m| m.provider == provider_key)
    }
}

/// Value constraints for a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub multi_valued: bool,
    /// Unique within a collection.
    pub unique: bool,
}

/// Presentation hints passed through to user interfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiHints {
    pub widget: Option<String>,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub group: Option<String>,
}

/// Maps a field to a location inside one provider's raw result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMapping {
    pub provider: String,
    /// Remote path such as `authors[0].name`.
    pub path: String,
}
