//! Pluggable item modules.
//!
//! A module is a declarative TOML document describing one collectible item
//! type: its lifecycle states, its fields, and which external providers can
//! fill those fields in.
//!
//! # Module layout
//!
//! - `definition` -- Raw document structure as written on disk.
//! - [`compiler`] -- Validation and compilation into a [`ModuleContract`].
//! - [`contract`] -- The immutable compiled contract types.
//! - [`checksum`] -- Canonical serialization and content hashing.
//! - [`path`] -- Remote field paths used by provider mappings.
//! - [`storage`] -- The jailed import directory.
//! - [`registry`] -- The registry of compiled modules.
//! - [`builtin`] -- Definitions embedded in the binary.

pub mod builtin;
pub mod checksum;
pub mod compiler;
pub mod contract;
pub(crate) mod definition;
pub mod path;
pub mod registry;
pub mod storage;

pub use compiler::{compile_bytes, compile_module, CompiledModule};
pub use contract::{
    Constraints, FieldContract, FieldType, ModuleContract, ModuleMeta, ProviderContract,
    ProviderMapping, StateContract, UiHints, WorkflowContract,
};
pub use path::RemotePath;
pub use registry::{
    ModuleDefinition, ModuleRegistry, ModuleSource, ModuleSummary, ScanFailure, ScanOutcome,
    ScanReport,
};
pub use storage::ImportStorage;
