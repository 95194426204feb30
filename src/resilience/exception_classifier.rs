//! # Exception Classification
//!
//! Decides whether a chunk error belongs to an include set net of an exclude set, using
//! nearest-ancestor tie-breaking.
//!
//! Error "types" are names in a [`TypeHierarchy`]: each registered name has an optional
//! parent. A candidate's ancestor chain is the candidate followed by each successive
//! parent up to a root; the distance of a configured name is its index in that chain
//! (0 = exact match). The closer of the include and exclude matches wins, and a tie
//! resolves to "no match".
//!
//! ```rust
//! use batch_kernel::resilience::{ExceptionClassifier, TypeHierarchy};
//! use std::sync::Arc;
//!
//! let hierarchy = Arc::new(
//!     TypeHierarchy::standard()
//!         .with_type("ConnectionResetError", Some("IoError")),
//! );
//! let classifier = ExceptionClassifier::new(
//!     hierarchy,
//!     vec!["IoError".to_string()],
//!     vec!["ConnectionResetError".to_string()],
//! );
//!
//! assert!(classifier.matches("IoError"));
//! assert!(!classifier.matches("ConnectionResetError"));
//! ```

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{trace, warn};

/// Registry of error type names and their parents
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    parents: DashMap<String, Option<String>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hierarchy preloaded with common root types:
    ///
    /// ```text
    /// Error
    /// ├── RuntimeError
    /// │   ├── IllegalArgumentError
    /// │   ├── IllegalStateError
    /// │   └── ParseError
    /// ├── IoError
    /// │   └── TimeoutError
    /// └── DataError
    ///     └── ValidationError
    /// ```
    pub fn standard() -> Self {
        Self::new()
            .with_type("Error", None)
            .with_type("RuntimeError", Some("Error"))
            .with_type("IllegalArgumentError", Some("RuntimeError"))
            .with_type("IllegalStateError", Some("RuntimeError"))
            .with_type("ParseError", Some("RuntimeError"))
            .with_type("IoError", Some("Error"))
            .with_type("TimeoutError", Some("IoError"))
            .with_type("DataError", Some("Error"))
            .with_type("ValidationError", Some("DataError"))
    }

    pub fn with_type(self, name: impl Into<String>, parent: Option<&str>) -> Self {
        self.register(name, parent);
        self
    }

    /// Register (or re-parent) a type name
    pub fn register(&self, name: impl Into<String>, parent: Option<&str>) {
        self.parents.insert(name.into(), parent.map(str::to_string));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// The candidate itself followed by each successive parent.
    ///
    /// Built iteratively; a cycle or a dangling parent ends the chain.
    pub fn ancestor_chain(&self, type_name: &str) -> Vec<String> {
        let mut chain = vec![type_name.to_string()];
        let mut seen: HashSet<String> = HashSet::from([type_name.to_string()]);
        let mut current = type_name.to_string();

        loop {
            let parent = match self.parents.get(&current) {
                Some(entry) => entry.value().clone(),
                None => break,
            };
            let Some(parent) = parent else { break };

            if !seen.insert(parent.clone()) {
                warn!(
                    type_name = type_name,
                    repeated = %parent,
                    "Cycle detected in error type hierarchy - truncating ancestor chain"
                );
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }

        chain
    }

    /// Whether `type_name` is `ancestor` or one of its descendants
    pub fn is_a(&self, type_name: &str, ancestor: &str) -> bool {
        self.ancestor_chain(type_name).iter().any(|t| t == ancestor)
    }
}

/// Include/exclude classifier over one [`TypeHierarchy`]
#[derive(Debug, Clone)]
pub struct ExceptionClassifier {
    hierarchy: Arc<TypeHierarchy>,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ExceptionClassifier {
    pub fn new(hierarchy: Arc<TypeHierarchy>, include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            hierarchy,
            include,
            exclude,
        }
    }

    /// Classifier that never matches
    pub fn empty(hierarchy: Arc<TypeHierarchy>) -> Self {
        Self::new(hierarchy, Vec::new(), Vec::new())
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn matches(&self, candidate_type: &str) -> bool {
        matches(&self.hierarchy, candidate_type, &self.include, &self.exclude)
    }
}

/// Classify `candidate_type` against an include and an exclude set.
///
/// | include | exclude | result |
/// |---|---|---|
/// | no | no | false |
/// | yes | no | true |
/// | no | yes | false |
/// | yes | yes | include distance strictly smaller than exclude distance |
pub fn matches(
    hierarchy: &TypeHierarchy,
    candidate_type: &str,
    include: &[String],
    exclude: &[String],
) -> bool {
    if include.is_empty() {
        return false;
    }

    let chain = hierarchy.ancestor_chain(candidate_type);
    let include_distance = closest_distance(hierarchy, &chain, include);
    let exclude_distance = closest_distance(hierarchy, &chain, exclude);

    let result = match (include_distance, exclude_distance) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(inc), Some(exc)) => inc < exc,
    };

    trace!(
        candidate_type = candidate_type,
        include_distance = include_distance,
        exclude_distance = exclude_distance,
        matched = result,
        "Exception classification"
    );

    result
}

/// Smallest chain index of any configured name, skipping names the hierarchy cannot resolve
fn closest_distance(hierarchy: &TypeHierarchy, chain: &[String], names: &[String]) -> Option<usize> {
    names
        .iter()
        .filter(|name| {
            // the candidate itself resolves even when unregistered
            let resolvable = hierarchy.contains(name) || chain.first() == Some(*name);
            if !resolvable {
                warn!(
                    type_name = %name,
                    "Configured exception type cannot be resolved - ignoring entry"
                );
            }
            resolvable
        })
        .filter_map(|name| chain.iter().position(|ancestor| ancestor == name))
        .min()
}
