//! Proptest strategies for identifiers and type hierarchies.

use proptest::prelude::*;

/// Identifier components that never contain the sub-job separator
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_.-]{0,24}"
}

/// Identifier components that contain at least one ':'
pub fn identifier_with_separator_strategy() -> impl Strategy<Value = String> {
    ("[A-Za-z0-9_]{0,8}", "[A-Za-z0-9_]{0,8}").prop_map(|(head, tail)| format!("{head}:{tail}"))
}

/// Names of a linear type chain, root first: `T0 <- T1 <- ... <- Tn`
pub fn type_chain_strategy() -> impl Strategy<Value = Vec<String>> {
    (1usize..12).prop_map(|depth| (0..=depth).map(|level| format!("T{level}")).collect())
}
