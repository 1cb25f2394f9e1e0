//! Import directory for user-supplied module definitions.
//!
//! All files live directly inside one jail directory. Writes go to a
//! temporary file in the same directory and are renamed over the destination,
//! so a concurrent [`ImportStorage::list`] never sees a partially written
//! definition.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use collectforge_common::{Error, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extension forced onto every stored definition.
pub const DEFINITION_EXTENSION: &str = "toml";

/// Filesystem jail holding imported module definition files.
#[derive(Debug, Clone)]
pub struct ImportStorage {
    root: PathBuf,
}

impl ImportStorage {
    /// Open (creating if needed) the import directory at `root`.
    ///
    /// The root is canonicalized so containment checks compare resolved paths.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            Error::storage(format!(
                "failed to create import directory {}: {e}",
                root.display()
            ))
        })?;
        let root = root.canonicalize().map_err(|e| {
            Error::storage(format!(
                "failed to resolve import directory {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    /// The canonical jail directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reduce an arbitrary user-supplied name to a safe definition file name.
    ///
    /// Directory components are dropped, characters outside `[A-Za-z0-9._-]`
    /// become `_`, leading dots are removed and the `.toml` extension is
    /// forced.
    pub fn sanitize_file_name(name: &str) -> Result<String> {
        let base = name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_default();
        let cleaned: String = base
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let suffix = format!(".{DEFINITION_EXTENSION}");
        let stem = if cleaned.to_ascii_lowercase().ends_with(&suffix) {
            &cleaned[..cleaned.len() - suffix.len()]
        } else {
            cleaned.as_str()
        };
        let stem = stem.trim_start_matches('.').trim_end_matches('.');

        if stem.is_empty() || stem.chars().all(|c| c == '_') {
            return Err(Error::invalid_argument(format!(
                "file name '{name}' has no usable characters"
            )));
        }

        Ok(format!("{stem}{suffix}"))
    }

    /// Atomically write `bytes` under the sanitized form of `file_name`,
    /// replacing any existing file of that name. Returns the stored path.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Self::sanitize_file_name(file_name)?;
        let destination = self.root.join(&name);

        let mut temp = NamedTempFile::new_in(&self.root)
            .map_err(|e| Error::storage(format!("failed to create temporary file: {e}")))?;
        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| Error::storage(format!("failed to write {name}: {e}")))?;
        temp.persist(&destination)
            .map_err(|e| Error::storage(format!("failed to move {name} into place: {}", e.error)))?;

        info!(file = %name, bytes = bytes.len(), "Saved module definition");
        Ok(destination)
    }

    /// Definition files directly inside the jail, sorted by file name.
    ///
    /// A missing directory lists as empty; hidden files (including in-flight
    /// temporary files) are ignored.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                Error::storage(format!("failed to list import directory: {e}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_definition = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DEFINITION_EXTENSION));
            if !hidden && is_definition {
                files.push(path.to_path_buf());
            }
        }
        Ok(files)
    }

    /// Read a file inside the jail.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        std::fs::read(&resolved)
            .map_err(|e| Error::storage(format!("failed to read {}: {e}", resolved.display())))
    }

    /// Delete a file inside the jail. Relative paths are resolved against the
    /// jail. Returns `false` when the file did not exist.
    ///
    /// # Errors
    ///
    /// Paths resolving outside the jail fail with [`Error::InvalidArgument`]
    /// before any file is touched.
    pub fn delete(&self, path: &Path) -> Result<bool> {
        let resolved = self.resolve(path)?;
        match std::fs::remove_file(&resolved) {
            Ok(()) => {
                info!(path = %resolved.display(), "Deleted module definition");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %resolved.display(), "Definition already absent");
                Ok(false)
            }
            Err(e) => Err(Error::storage(format!(
                "failed to delete {}: {e}",
                resolved.display()
            ))),
        }
    }

    /// Resolve `path` to a location inside the jail, following symlinked
    /// parent directories.
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let outside = || {
            Error::invalid_argument(format!(
                "path {} is outside the import directory",
                path.display()
            ))
        };

        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let candidate = normalize_lexically(&joined).ok_or_else(outside)?;
        let file_name = candidate.file_name().ok_or_else(outside)?;
        let parent = candidate.parent().ok_or_else(outside)?;

        let resolved_parent = match parent.canonicalize() {
            Ok(p) => p,
            // Nothing on disk to follow; fall back to the lexical answer.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => parent.to_path_buf(),
            Err(e) => {
                return Err(Error::storage(format!(
                    "failed to resolve {}: {e}",
                    parent.display()
                )))
            }
        };

        if !resolved_parent.starts_with(&self.root) {
            return Err(outside());
        }
        let resolved = resolved_parent.join(file_name);

        // A symlinked final component must still point inside the jail.
        let is_symlink = std::fs::symlink_metadata(&resolved)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            let target = resolved.canonicalize().map_err(|_| outside())?;
            if !target.starts_with(&self.root) {
                return Err(outside());
            }
        }
        Ok(resolved)
    }
}

/// Resolve `.` and `..` without touching the filesystem. Returns `None` when
/// `..` would climb above the path's root.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Some(normalized)
}
