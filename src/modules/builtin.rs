//! Module definitions compiled into the binary.

/// A definition shipped with collectforge.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinDefinition {
    /// Name reported as the scan source.
    pub file_name: &'static str,
    pub source: &'static str,
}

/// Builtin definitions, in the order they are registered.
pub const BUILTIN_DEFINITIONS: &[BuiltinDefinition] = &[
    BuiltinDefinition {
        file_name: "books.toml",
        source: include_str!("builtin/books.toml"),
    },
    BuiltinDefinition {
        file_name: "coins.toml",
        source: include_str!("builtin/coins.toml"),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::compiler::compile_module;

    #[test]
    fn every_builtin_compiles() {
        for builtin in BUILTIN_DEFINITIONS {
            let compiled = compile_module(builtin.source)
                .unwrap_or_else(|e| panic!("{} failed to compile: {e}", builtin.file_name));
            assert_eq!(
                format!("{}.toml", compiled.contract.key),
                builtin.file_name
            );
        }
    }
}
