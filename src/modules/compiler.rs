//! Module contract compiler.
//!
//! Turns one raw definition document into a validated [`ModuleContract`] and
//! its checksum. Every problem in the document is collected before failing,
//! and nothing is returned unless the whole document is valid.
//!
//! Compilation is a pure function of the input text: the same text always
//! produces the same contract and checksum.

use std::collections::HashSet;

use chrono::NaiveDate;
use collectforge_common::{Error, IdentifierType, Result, ValidationIssue};
use serde_json::{Number, Value};

use super::checksum;
use super::contract::{
    Constraints, FieldContract, FieldType, ModuleContract, ModuleMeta, ProviderContract,
    ProviderMapping, StateContract, UiHints, WorkflowContract,
};
use super::definition::{
    self, RawConstraints, RawField, RawMapping, RawModule, RawProvider, RawState, RawWorkflow,
};
use super::path::RemotePath;

/// A successfully compiled definition.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub contract: ModuleContract,
    /// Hex SHA-256 over the contract's canonical form.
    pub checksum: String,
}

/// Compile raw definition bytes. Non-UTF-8 input is a validation failure.
pub fn compile_bytes(bytes: &[u8]) -> Result<CompiledModule> {
    let source = std::str::from_utf8(bytes)
        .map_err(|e| Error::validation("$", format!("definition is not valid UTF-8: {e}")))?;
    compile_module(source)
}

/// Compile a definition document.
///
/// # Errors
///
/// Returns [`Error::Validation`] listing every problem found.
pub fn compile_module(source: &str) -> Result<CompiledModule> {
    let raw = definition::parse(source).map_err(|reason| Error::validation("$", reason))?;

    let mut issues = Issues::default();
    let contract = build_contract(raw, &mut issues);
    if !issues.0.is_empty() {
        return Err(Error::Validation(issues.0));
    }

    let checksum = checksum::checksum(&contract)?;
    Ok(CompiledModule { contract, checksum })
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.0.push(ValidationIssue::new(path, reason));
    }

    /// Checks a collection key: non-empty and not seen before.
    fn check_key(&mut self, path: &str, key: &str, seen: &mut HashSet<String>) {
        if key.trim().is_empty() {
            self.push(format!("{path}.key"), "must not be empty");
        } else if !seen.insert(key.to_string()) {
            self.push(format!("{path}.key"), format!("duplicate key '{key}'"));
        }
    }

    fn check_order(&mut self, path: &str, order: i64) -> u32 {
        match u32::try_from(order) {
            Ok(order) => order,
            Err(_) if order < 0 => {
                self.push(format!("{path}.order"), "must not be negative");
                0
            }
            Err(_) => {
                self.push(format!("{path}.order"), "is too large");
                u32::MAX
            }
        }
    }

    fn identifier_types(&mut self, path: &str, names: &[String]) -> Vec<IdentifierType> {
        let mut types = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            match name.parse::<IdentifierType>() {
                Ok(id_type) if types.contains(&id_type) => {
                    self.push(
                        format!("{path}.identifier_types[{i}]"),
                        format!("duplicate identifier type '{id_type}'"),
                    );
                }
                Ok(id_type) => types.push(id_type),
                Err(e) => self.push(format!("{path}.identifier_types[{i}]"), e.to_string()),
            }
        }
        types
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn build_contract(raw: RawModule, issues: &mut Issues) -> ModuleContract {
    if raw.key.is_empty() {
        issues.push("key", "must not be empty");
    } else if !raw
        .key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        issues.push(
            "key",
            "may only contain lowercase letters, digits, '_' and '-'",
        );
    }

    if let Err(e) = semver::Version::parse(&raw.version) {
        issues.push(
            "version",
            format!("'{}' is not a valid semantic version: {e}", raw.version),
        );
    }

    if raw.name.trim().is_empty() {
        issues.push("name", "must not be empty");
    }

    let mut states = build_states(raw.states, issues);
    states.sort_by_key(|s| s.order);

    let mut providers = build_providers(raw.providers, issues);
    providers.sort_by_key(|p| p.priority);

    let declared_providers: HashSet<&str> = providers.iter().map(|p| p.key.as_str()).collect();
    let mut fields = build_fields(raw.fields, &declared_providers, issues);
    fields.sort_by_key(|f| f.order);

    let declared_states: HashSet<&str> = states.iter().map(|s| s.key.as_str()).collect();
    let workflows = build_workflows(raw.workflows, &declared_states, issues);

    ModuleContract {
        key: raw.key,
        version: raw.version,
        name: raw.name.trim().to_string(),
        description: non_empty(raw.description),
        meta: ModuleMeta {
            authors: raw.meta.authors,
            license: non_empty(raw.meta.license),
            tags: raw.meta.tags,
            homepage: non_empty(raw.meta.homepage),
        },
        states,
        providers,
        fields,
        workflows,
        extensions: raw.extensions,
    }
}

fn build_states(raw: Vec<RawState>, issues: &mut Issues) -> Vec<StateContract> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, state)| {
            let path = format!("states[{i}]");
            issues.check_key(&path, &state.key, &mut seen);
            let order = issues.check_order(&path, state.order);
            StateContract {
                label: non_empty(state.label).unwrap_or_else(|| state.key.clone()),
                key: state.key,
                order,
                active: state.active,
                deprecated: state.deprecated,
            }
        })
        .collect()
}

fn build_providers(raw: Vec<RawProvider>, issues: &mut Issues) -> Vec<ProviderContract> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, provider)| {
            let path = format!("providers[{i}]");
            issues.check_key(&path, &provider.key, &mut seen);
            ProviderContract {
                identifier_types: issues.identifier_types(&path, &provider.identifier_types),
                key: provider.key,
                enabled: provider.enabled,
                priority: provider.priority,
                extensions: provider.extensions,
            }
        })
        .collect()
}

fn build_fields(
    raw: Vec<RawField>,
    declared_providers: &HashSet<&str>,
    issues: &mut Issues,
) -> Vec<FieldContract> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, field)| build_field(i, field, &mut seen, declared_providers, issues))
        .collect()
}

fn build_field(
    index: usize,
    field: RawField,
    seen: &mut HashSet<String>,
    declared_providers: &HashSet<&str>,
    issues: &mut Issues,
) -> FieldContract {
    let path = format!("fields[{index}]");
    issues.check_key(&path, &field.key, seen);
    let order = issues.check_order(&path, field.order);

    let field_type = match field.field_type.as_deref() {
        None => {
            issues.push(format!("{path}.type"), "is required");
            FieldType::Text
        }
        Some(name) => FieldType::parse(name).unwrap_or_else(|| {
            issues.push(format!("{path}.type"), format!("unknown field type '{name}'"));
            FieldType::Text
        }),
    };

    let identifier_types = issues.identifier_types(&path, &field.identifier_types);
    if field_type == FieldType::Identifier && identifier_types.is_empty() {
        issues.push(
            format!("{path}.identifier_types"),
            "IDENTIFIER fields must declare at least one identifier type",
        );
    }

    let mut enum_seen = HashSet::new();
    for (j, value) in field.enum_values.iter().enumerate() {
        if value.is_empty() {
            issues.push(format!("{path}.enum_values[{j}]"), "must not be empty");
        } else if !enum_seen.insert(value.as_str()) {
            issues.push(
                format!("{path}.enum_values[{j}]"),
                format!("duplicate enum value '{value}'"),
            );
        }
    }
    if field_type == FieldType::Enum && field.enum_values.is_empty() {
        issues.push(
            format!("{path}.enum_values"),
            "ENUM fields must declare at least one value",
        );
    }

    let constraints = build_constraints(&path, field.constraints, issues);

    let default_value = match field.default_value {
        None | Some(Value::Null) => None,
        Some(value) => match check_default(field_type, &value, &field.enum_values, &constraints)
        {
            Ok(normalized) => Some(normalized),
            Err(reason) => {
                issues.push(format!("{path}.default"), reason);
                None
            }
        },
    };

    let providers = build_mappings(&path, field.providers, declared_providers, issues);

    FieldContract {
        label: non_empty(field.label).unwrap_or_else(|| field.key.clone()),
        key: field.key,
        field_type,
        required: field.required,
        searchable: field.searchable,
        filterable: field.filterable,
        sortable: field.sortable,
        order,
        active: field.active,
        deprecated: field.deprecated,
        default_value,
        identifier_types,
        enum_values: field.enum_values,
        constraints,
        ui: UiHints {
            widget: non_empty(field.ui.widget),
            placeholder: non_empty(field.ui.placeholder),
            help_text: non_empty(field.ui.help_text),
            group: non_empty(field.ui.group),
        },
        providers,
        extensions: field.extensions,
    }
}

fn build_constraints(path: &str, raw: RawConstraints, issues: &mut Issues) -> Constraints {
    let path = format!("{path}.constraints");

    if let (Some(min), Some(max)) = (raw.min, raw.max) {
        if min > max {
            issues.push(format!("{path}.min"), format!("min ({min}) exceeds max ({max})"));
        }
    }

    let mut length = |name: &str, value: Option<i64>| -> Option<u64> {
        let value = value?;
        match u64::try_from(value) {
            Ok(v) => Some(v),
            Err(_) => {
                issues.push(format!("{path}.{name}"), "must not be negative");
                None
            }
        }
    };
    let min_length = length("min_length", raw.min_length);
    let max_length = length("max_length", raw.max_length);

    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            issues.push(
                format!("{path}.min_length"),
                format!("min_length ({min}) exceeds max_length ({max})"),
            );
        }
    }

    if let Some(pattern) = &raw.pattern {
        if let Err(e) = regex::Regex::new(pattern) {
            issues.push(format!("{path}.pattern"), format!("invalid pattern: {e}"));
        }
    }

    Constraints {
        min: raw.min,
        max: raw.max,
        min_length,
        max_length,
        pattern: raw.pattern,
        multi_valued: raw.multi_valued,
        unique: raw.unique,
    }
}

/// Checks a default value against the field type and returns its normalized
/// form. Multi-valued fields take an array of element defaults.
fn check_default(
    field_type: FieldType,
    value: &Value,
    enum_values: &[String],
    constraints: &Constraints,
) -> std::result::Result<Value, String> {
    if constraints.multi_valued {
        if let Value::Array(items) = value {
            return items
                .iter()
                .map(|item| check_scalar_default(field_type, item, enum_values, constraints))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array);
        }
    }
    check_scalar_default(field_type, value, enum_values, constraints)
}

fn check_scalar_default(
    field_type: FieldType,
    value: &Value,
    enum_values: &[String],
    constraints: &Constraints,
) -> std::result::Result<Value, String> {
    match field_type {
        FieldType::Number => {
            let n = value
                .as_f64()
                .ok_or_else(|| format!("expected a number for a NUMBER field, got {value}"))?;
            if constraints.min.is_some_and(|min| n < min)
                || constraints.max.is_some_and(|max| n > max)
            {
                return Err(format!("default {n} is outside the min/max bounds"));
            }
            // Integer and float spellings of the same number compile identically.
            Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| format!("default {n} is not a finite number"))
        }
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(format!("expected true or false for a BOOLEAN field, got {other}")),
        },
        FieldType::Enum => match value.as_str() {
            Some(s) if enum_values.iter().any(|v| v == s) => Ok(value.clone()),
            Some(s) => Err(format!("'{s}' is not one of the declared enum values")),
            None => Err(format!("expected a string for an ENUM field, got {value}")),
        },
        FieldType::Date => match value.as_str() {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|_| value.clone())
                .map_err(|_| format!("'{s}' is not a YYYY-MM-DD date")),
            None => Err("DATE defaults must be quoted YYYY-MM-DD strings".to_string()),
        },
        FieldType::Text | FieldType::LongText | FieldType::Identifier | FieldType::Url => {
            match value {
                Value::String(_) => Ok(value.clone()),
                other => Err(format!("expected a string for a {field_type} field, got {other}")),
            }
        }
    }
}

fn build_mappings(
    path: &str,
    raw: Vec<RawMapping>,
    declared_providers: &HashSet<&str>,
    issues: &mut Issues,
) -> Vec<ProviderMapping> {
    raw.into_iter()
        .enumerate()
        .map(|(j, mapping)| {
            let mapping_path = format!("{path}.providers[{j}]");
            if mapping.provider.is_empty() {
                issues.push(format!("{mapping_path}.provider"), "must not be empty");
            } else if !declared_providers.contains(mapping.provider.as_str()) {
                issues.push(
                    format!("{mapping_path}.provider"),
                    format!(
                        "references provider '{}' which the module does not declare",
                        mapping.provider
                    ),
                );
            }
            if let Err(reason) = RemotePath::parse(&mapping.path) {
                issues.push(format!("{mapping_path}.path"), reason);
            }
            ProviderMapping {
                provider: mapping.provider,
                path: mapping.path,
            }
        })
        .collect()
}

fn build_workflows(
    raw: Vec<RawWorkflow>,
    declared_states: &HashSet<&str>,
    issues: &mut Issues,
) -> Vec<WorkflowContract> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, workflow)| {
            let path = format!("workflows[{i}]");
            issues.check_key(&path, &workflow.key, &mut seen);
            for (j, state) in workflow.states.iter().enumerate() {
                if !declared_states.contains(state.as_str()) {
                    issues.push(
                        format!("{path}.states[{j}]"),
                        format!("references undeclared state '{state}'"),
                    );
                }
            }
            WorkflowContract {
                label: non_empty(workflow.label).unwrap_or_else(|| workflow.key.clone()),
                key: workflow.key,
                description: non_empty(workflow.description),
                states: workflow.states,
                extensions: workflow.extensions,
            }
        })
        .collect()
}
