//! Raw module definition documents as written in `.toml` files.
//!
//! Everything is optional at this layer so that a definition with several
//! problems deserializes far enough for the compiler to report all of them.
//! Only malformed TOML or unknown keys fail here.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawModule {
    pub key: String,
    pub version: String,
    pub name: String,
    pub description: Option<String>,
    pub meta: RawMeta,
    pub states: Vec<RawState>,
    pub providers: Vec<RawProvider>,
    pub fields: Vec<RawField>,
    pub workflows: Vec<RawWorkflow>,
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawMeta {
    pub authors: Vec<String>,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawState {
    pub key: String,
    pub label: Option<String>,
    pub order: i64,
    pub active: bool,
    pub deprecated: bool,
}

impl Default for RawState {
    fn default() -> Self {
        Self {
            key: String::new(),
            label: None,
            order: 0,
            active: true,
            deprecated: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawProvider {
    pub key: String,
    pub enabled: bool,
    pub priority: i32,
    pub identifier_types: Vec<String>,
    pub extensions: Map<String, Value>,
}

impl Default for RawProvider {
    fn default() -> Self {
        Self {
            key: String::new(),
            enabled: true,
            priority: 100,
            identifier_types: Vec::new(),
            extensions: Map::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawField {
    pub key: String,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub required: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
    pub order: i64,
    pub active: bool,
    pub deprecated: bool,
    #[serde(rename = "default")]
    pub default_value: Option<Value>,
    pub identifier_types: Vec<String>,
    pub enum_values: Vec<String>,
    pub constraints: RawConstraints,
    pub ui: RawUiHints,
    pub providers: Vec<RawMapping>,
    pub extensions: Map<String, Value>,
}

impl Default for RawField {
    fn default() -> Self {
        Self {
            key: String::new(),
            label: None,
            field_type: None,
            required: false,
            searchable: false,
            filterable: false,
            sortable: false,
            order: 0,
            active: true,
            deprecated: false,
            default_value: None,
            identifier_types: Vec::new(),
            enum_values: Vec::new(),
            constraints: RawConstraints::default(),
            ui: RawUiHints::default(),
            providers: Vec::new(),
            extensions: Map::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    pub pattern: Option<String>,
    pub multi_valued: bool,
    pub unique: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawUiHints {
    pub widget: Option<String>,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawMapping {
    pub provider: String,
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawWorkflow {
    pub key: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub states: Vec<String>,
    pub extensions: Map<String, Value>,
}

/// Parse a definition document. Syntax errors are returned as the TOML
/// parser's message.
pub(crate) fn parse(source: &str) -> Result<RawModule, String> {
    toml::from_str(source).map_err(|e| e.message().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_default_to_empty() {
        let raw = parse("key = \"stamps\"\nversion = \"1.0.0\"\nname = \"Stamps\"").unwrap();
        assert_eq!(raw.key, "stamps");
        assert!(raw.fields.is_empty());
        assert!(raw.providers.is_empty());
        assert!(raw.extensions.is_empty());
    }

    #[test]
    fn field_defaults_are_active_and_optional() {
        let raw = parse(
            r#"
            key = "k"
            [[fields]]
            key = "title"
            type = "text"
            "#,
        )
        .unwrap();
        let field = &raw.fields[0];
        assert!(field.active);
        assert!(!field.required);
        assert_eq!(field.field_type.as_deref(), Some("text"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("key = \"k\"\ncolour = \"blue\"").unwrap_err();
        assert!(err.contains("colour"));
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(parse("key = ").is_err());
    }

    #[test]
    fn extensions_keep_nested_values() {
        let raw = parse(
            r#"
            key = "k"
            [extensions.display]
            columns = ["title", "author"]
            dense = true
            "#,
        )
        .unwrap();
        assert_eq!(
            raw.extensions["display"]["columns"],
            serde_json::json!(["title", "author"])
        );
    }
}
