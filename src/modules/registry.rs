//! Registry of compiled module definitions.
//!
//! The [`ModuleRegistry`] owns the mapping from module key to the current
//! [`ModuleDefinition`]. It is populated by compiling the builtin definitions
//! followed by every file in the import directory. Each file is compiled and
//! published independently: one broken file never aborts a scan, and readers
//! only ever see fully compiled, immutable entries.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use collectforge_common::{Error, ModuleId, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::builtin::BUILTIN_DEFINITIONS;
use super::compiler::{compile_bytes, CompiledModule};
use super::contract::ModuleContract;
use super::storage::ImportStorage;

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleSource {
    Builtin,
    Imported,
}

impl std::fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::Imported => write!(f, "imported"),
        }
    }
}

/// A published registry entry. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDefinition {
    pub id: ModuleId,
    pub module_key: String,
    pub name: String,
    pub version: String,
    pub source: ModuleSource,
    /// File name the definition was scanned from.
    pub source_file: String,
    pub checksum: String,
    pub contract: ModuleContract,
    /// The definition text exactly as scanned.
    pub raw_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModuleDefinition {
    /// Short listing form of this definition.
    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            id: self.id,
            module_key: self.module_key.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            source: self.source,
            updated_at: self.updated_at,
        }
    }
}

/// Listing entry for a registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub id: ModuleId,
    pub module_key: String,
    pub name: String,
    pub version: String,
    pub source: ModuleSource,
    pub updated_at: DateTime<Utc>,
}

/// A definition file that could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub source: String,
    pub reason: String,
}

/// Result of registering a single definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Compiled and published (new key or changed content).
    Imported(ModuleSummary),
    /// Identical checksum to the current entry for its key; nothing changed.
    Skipped(String),
    /// Parse or validation failure.
    Failed(ScanFailure),
}

/// Per-file outcomes of a scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub imported: Vec<ModuleSummary>,
    /// Source files whose content was already registered.
    pub skipped: Vec<String>,
    pub failed: Vec<ScanFailure>,
}

impl ScanReport {
    fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Imported(summary) => self.imported.push(summary),
            ScanOutcome::Skipped(source) => self.skipped.push(source),
            ScanOutcome::Failed(failure) => self.failed.push(failure),
        }
    }

    fn merge(&mut self, other: ScanReport) {
        self.imported.extend(other.imported);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Authoritative set of compiled modules.
///
/// Lookups never block on a running scan for longer than a single shard
/// lock: entries are swapped per key as `Arc`s, so a reader gets either the
/// previous or the new definition for a key.
pub struct ModuleRegistry {
    storage: ImportStorage,
    by_key: DashMap<String, Arc<ModuleDefinition>>,
    key_by_id: DashMap<ModuleId, String>,
}

impl ModuleRegistry {
    /// Create an empty registry scanning `storage` for imports.
    pub fn new(storage: ImportStorage) -> Self {
        Self {
            storage,
            by_key: DashMap::new(),
            key_by_id: DashMap::new(),
        }
    }

    /// The import directory backing this registry.
    pub fn storage(&self) -> &ImportStorage {
        &self.storage
    }

    /// Register the builtin definitions, then scan the import directory.
    ///
    /// # Errors
    ///
    /// Fails only when the import directory cannot be listed; individual
    /// file problems are reported in the returned [`ScanReport`].
    pub fn load(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        for builtin in BUILTIN_DEFINITIONS {
            report.record(self.publish(
                ModuleSource::Builtin,
                builtin.file_name,
                builtin.source.as_bytes(),
            ));
        }
        report.merge(self.scan_import_directory()?);

        info!(
            modules = self.by_key.len(),
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Module registry loaded"
        );
        Ok(report)
    }

    /// Compile every file in the import directory, in file name order.
    pub fn scan_import_directory(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        for path in self.storage.list()? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let outcome = match self.storage.read(&path) {
                Ok(bytes) => self.publish(ModuleSource::Imported, &file_name, &bytes),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Failed to read module definition");
                    ScanOutcome::Failed(ScanFailure {
                        source: file_name,
                        reason: e.to_string(),
                    })
                }
            };
            report.record(outcome);
        }
        Ok(report)
    }

    /// Validate, store and register a user-supplied definition.
    ///
    /// Invalid definitions are rejected with [`Error::Validation`] before
    /// anything is written to the import directory.
    ///
    /// Other imported files carrying the same module key are deleted, so the
    /// next [`load`](Self::load) of the directory rebuilds the same state.
    pub fn import_file(&self, file_name: &str, bytes: &[u8]) -> Result<ScanOutcome> {
        let compiled = compile_bytes(bytes)?;
        let key = compiled.contract.key;
        let path = self.storage.save(file_name, bytes)?;
        let stored_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for stale in self.imported_files_for(&key)? {
            if stale != path {
                self.storage.delete(&stale)?;
                info!(module_key = %key, file = %stale.display(), "Removed superseded definition file");
            }
        }

        let outcome = self.publish(ModuleSource::Imported, &stored_name, bytes);
        if let ScanOutcome::Skipped(_) = outcome {
            self.retarget_source_file(&key, &stored_name);
        }
        Ok(outcome)
    }

    /// Delete every imported file carrying `key` and unregister it. A builtin
    /// of the same key takes its place again. Returns the deleted file names.
    ///
    /// # Errors
    ///
    /// Unknown keys fail with [`Error::NotFound`]; a key currently served by
    /// a builtin fails with [`Error::InvalidArgument`].
    pub fn remove(&self, key: &str) -> Result<Vec<String>> {
        let current = self.get_by_key(key)?;
        if current.source == ModuleSource::Builtin {
            return Err(Error::invalid_argument(format!(
                "module '{key}' is built in and cannot be removed"
            )));
        }

        let mut removed = Vec::new();
        for path in self.imported_files_for(key)? {
            if self.storage.delete(&path)? {
                removed.push(
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                );
            }
        }

        let builtin = BUILTIN_DEFINITIONS.iter().find(|builtin| {
            compile_bytes(builtin.source.as_bytes())
                .map(|compiled| compiled.contract.key == key)
                .unwrap_or(false)
        });
        match builtin {
            Some(builtin) => {
                self.publish(
                    ModuleSource::Builtin,
                    builtin.file_name,
                    builtin.source.as_bytes(),
                );
            }
            None => {
                if let Some((_, definition)) = self.by_key.remove(key) {
                    self.key_by_id.remove(&definition.id);
                }
            }
        }

        info!(module_key = %key, files = removed.len(), "Removed module");
        Ok(removed)
    }

    /// Current definition for `key`.
    pub fn get_by_key(&self, key: &str) -> Result<Arc<ModuleDefinition>> {
        self.by_key
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found("module", key))
    }

    /// Current definition with registry id `id`.
    pub fn get_by_id(&self, id: &ModuleId) -> Result<Arc<ModuleDefinition>> {
        let key = self
            .key_by_id
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found("module", id.to_string()))?;
        self.get_by_key(&key)
            .map_err(|_| Error::not_found("module", id.to_string()))
    }

    /// Raw definition text for `key`.
    pub fn get_raw_source(&self, key: &str) -> Result<String> {
        self.get_by_key(key).map(|def| def.raw_source.clone())
    }

    /// Summaries of every registered module, sorted by key.
    pub fn list_all(&self) -> Vec<ModuleSummary> {
        let mut summaries: Vec<ModuleSummary> =
            self.by_key.iter().map(|entry| entry.value().summary()).collect();
        summaries.sort_by(|a, b| a.module_key.cmp(&b.module_key));
        summaries
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` when no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Imported files whose definition compiles to module `key`.
    fn imported_files_for(&self, key: &str) -> Result<Vec<PathBuf>> {
        let mut matches = Vec::new();
        for path in self.storage.list()? {
            let Ok(bytes) = self.storage.read(&path) else {
                continue;
            };
            if compile_bytes(&bytes).is_ok_and(|compiled| compiled.contract.key == key) {
                matches.push(path);
            }
        }
        Ok(matches)
    }

    /// Point an unchanged imported entry at the file that now holds it.
    fn retarget_source_file(&self, key: &str, source_file: &str) {
        if let Some(mut entry) = self.by_key.get_mut(key) {
            if entry.source == ModuleSource::Imported && entry.source_file != source_file {
                let mut definition = ModuleDefinition::clone(entry.value());
                definition.source_file = source_file.to_string();
                *entry = Arc::new(definition);
            }
        }
    }

    /// Compile one definition and publish it under its key.
    fn publish(&self, source: ModuleSource, source_file: &str, bytes: &[u8]) -> ScanOutcome {
        let CompiledModule { contract, checksum } = match compile_bytes(bytes) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(file = %source_file, error = %e, "Module definition rejected");
                return ScanOutcome::Failed(ScanFailure {
                    source: source_file.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let key = contract.key.clone();
        let now = Utc::now();
        let build = |id: ModuleId, created_at: DateTime<Utc>| ModuleDefinition {
            id,
            module_key: key.clone(),
            name: contract.name.clone(),
            version: contract.version.clone(),
            source,
            source_file: source_file.to_string(),
            checksum: checksum.clone(),
            contract: contract.clone(),
            raw_source: String::from_utf8_lossy(bytes).into_owned(),
            created_at,
            updated_at: now,
        };

        let summary = match self.by_key.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().checksum == checksum {
                    debug!(
                        module_key = %key,
                        file = %source_file,
                        "Module definition unchanged; skipping"
                    );
                    return ScanOutcome::Skipped(source_file.to_string());
                }
                let previous = entry.get();
                let definition = build(previous.id, previous.created_at);
                info!(
                    module_key = %key,
                    file = %source_file,
                    replaced_source = %previous.source,
                    version = %definition.version,
                    "Replaced module definition"
                );
                let summary = definition.summary();
                entry.insert(Arc::new(definition));
                summary
            }
            Entry::Vacant(entry) => {
                let definition = build(ModuleId::new(), now);
                info!(
                    module_key = %key,
                    file = %source_file,
                    version = %definition.version,
                    "Registered module definition"
                );
                let summary = definition.summary();
                // Index the id first so any id read from `by_key` resolves.
                self.key_by_id.insert(definition.id, key.clone());
                entry.insert(Arc::new(definition));
                summary
            }
        };

        ScanOutcome::Imported(summary)
    }
}
