//! Collectforge-Common: Shared types, IDs, and error handling.
//!
//! This crate provides common functionality used across collectforge:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for module definitions
//! - **Identifiers**: Typed item codes (ISBN, UPC, EAN, ASIN, custom) used to
//!   query metadata providers
//! - **Error Handling**: The shared error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use collectforge_common::{Error, Identifier, IdentifierType, ModuleId, Result};
//!
//! let id = ModuleId::new();
//! assert!(!id.to_string().is_empty());
//!
//! let isbn = Identifier::new(IdentifierType::Isbn, "978-0-13-468599-1").unwrap();
//! assert_eq!(isbn.value(), "9780134685991");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("module", "books"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod identifier;

pub use error::{Error, ProviderErrorKind, Result, ValidationIssue};
pub use identifier::{Identifier, IdentifierType};
pub use ids::*;
