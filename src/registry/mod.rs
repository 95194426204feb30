//! # Registry Infrastructure
//!
//! The kernel's index of live work units.
//!
//! ```text
//! WorkUnitRegistry
//! ├── jobs       (top-level execution id -> job unit)
//! └── sub_units  (composite key -> partition / split-flow unit)
//! ```

pub mod work_unit_registry;

// Re-export main types for easy access
pub use work_unit_registry::{RegistryStats, WorkUnitRegistry};
