//! # Job Model
//!
//! In-memory job definition tree: jobs contain steps, flows, splits and decisions;
//! steps carry a batchlet or chunk, optional partitioning, properties and listeners.
//!
//! Definitions are plain owned data. Cloning a subtree yields a fully independent copy,
//! which is what the sub-job builder relies on when it carves partition-level jobs out
//! of a step. Numeric chunk attributes are kept as strings because they may contain
//! unresolved substitution expressions until the job is started.

use crate::constants::{MIN_UNLIMITED, MIN_UNLIMITED_I32};
use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};

/// A single named property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered property list, optionally targeted at one partition index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JslProperties {
    pub partition: Option<String>,
    pub property: Vec<Property>,
}

impl JslProperties {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            partition: None,
            property: pairs
                .into_iter()
                .map(|(name, value)| Property::new(name, value))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.property
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Insert or replace a property, keeping insertion order for new names
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.property.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.property.push(Property { name, value }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.property.is_empty()
    }
}

/// Reference to a user artifact plus its injected properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub ref_name: String,
    pub properties: Option<JslProperties>,
}

impl ArtifactRef {
    pub fn new(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            properties: None,
        }
    }
}

pub type Batchlet = ArtifactRef;
pub type Listener = ArtifactRef;
pub type ItemReader = ArtifactRef;
pub type ItemProcessor = ArtifactRef;
pub type ItemWriter = ArtifactRef;
pub type CheckpointAlgorithm = ArtifactRef;
pub type PartitionMapper = ArtifactRef;
pub type PartitionReducer = ArtifactRef;
pub type PartitionCollector = ArtifactRef;
pub type PartitionAnalyzer = ArtifactRef;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listeners {
    pub listener: Vec<Listener>,
}

/// Include/exclude lists of error type names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionClassFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ExceptionClassFilter {
    pub fn including<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: types.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(types.into_iter().map(Into::into));
        self
    }
}

/// Chunk-oriented processing definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub reader: Option<ItemReader>,
    pub processor: Option<ItemProcessor>,
    pub writer: Option<ItemWriter>,
    pub checkpoint_algorithm: Option<CheckpointAlgorithm>,
    pub checkpoint_policy: Option<String>,
    pub item_count: Option<String>,
    pub time_limit: Option<String>,
    pub skip_limit: Option<String>,
    pub retry_limit: Option<String>,
    pub skippable_exception_classes: Option<ExceptionClassFilter>,
    pub retryable_exception_classes: Option<ExceptionClassFilter>,
    pub no_rollback_exception_classes: Option<ExceptionClassFilter>,
}

impl Chunk {
    pub fn checkpoint_policy(&self) -> Option<&str> {
        self.checkpoint_policy.as_deref()
    }

    pub fn set_checkpoint_policy(&mut self, value: impl Into<String>) {
        self.checkpoint_policy = Some(value.into());
    }

    pub fn item_count(&self) -> Option<&str> {
        self.item_count.as_deref()
    }

    pub fn set_item_count(&mut self, value: impl Into<String>) {
        self.item_count = Some(value.into());
    }

    pub fn time_limit(&self) -> Option<&str> {
        self.time_limit.as_deref()
    }

    pub fn set_time_limit(&mut self, value: impl Into<String>) {
        self.time_limit = Some(value.into());
    }

    pub fn skip_limit(&self) -> Option<&str> {
        self.skip_limit.as_deref()
    }

    pub fn set_skip_limit(&mut self, value: impl Into<String>) {
        self.skip_limit = Some(value.into());
    }

    pub fn retry_limit(&self) -> Option<&str> {
        self.retry_limit.as_deref()
    }

    pub fn set_retry_limit(&mut self, value: impl Into<String>) {
        self.retry_limit = Some(value.into());
    }
}

/// Parse an optional limit attribute. Absent values and either unlimited
/// sentinel (`MIN_UNLIMITED` or `MIN_UNLIMITED_I32`) mean unbounded (`None`).
pub fn parse_limit(attribute: &str, raw: Option<&str>) -> KernelResult<Option<u64>> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    let value: i64 = raw.parse().map_err(|e| {
        KernelError::Configuration(format!("{attribute} '{raw}' is not an integer: {e}"))
    })?;

    if value == MIN_UNLIMITED || value == MIN_UNLIMITED_I32 {
        return Ok(None);
    }

    u64::try_from(value).map(Some).map_err(|_| {
        KernelError::Configuration(format!("{attribute} must not be negative, got {value}"))
    })
}

/// Partition plan: how many partition instances and threads, plus per-partition properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlan {
    pub partitions: Option<String>,
    pub threads: Option<String>,
    pub properties: Vec<JslProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub mapper: Option<PartitionMapper>,
    pub plan: Option<PartitionPlan>,
    pub collector: Option<PartitionCollector>,
    pub analyzer: Option<PartitionAnalyzer>,
    pub reducer: Option<PartitionReducer>,
}

/// Transition control elements evaluated after a step/flow/split finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionElement {
    Next {
        on: String,
        to: String,
    },
    Fail {
        on: String,
        exit_status: Option<String>,
    },
    End {
        on: String,
        exit_status: Option<String>,
    },
    Stop {
        on: String,
        exit_status: Option<String>,
        restart: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub next: Option<String>,
    pub start_limit: Option<String>,
    pub allow_start_if_complete: Option<String>,
    pub properties: Option<JslProperties>,
    pub listeners: Option<Listeners>,
    pub batchlet: Option<Batchlet>,
    pub chunk: Option<Chunk>,
    pub partition: Option<Partition>,
    pub transition_elements: Vec<TransitionElement>,
}

impl Step {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_partitioned(&self) -> bool {
        self.partition.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub ref_name: String,
    pub properties: Option<JslProperties>,
    pub transition_elements: Vec<TransitionElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub next: Option<String>,
    pub execution_elements: Vec<ExecutionElement>,
    pub transition_elements: Vec<TransitionElement>,
}

impl Flow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, element: ExecutionElement) -> Self {
        self.execution_elements.push(element);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: String,
    pub next: Option<String>,
    pub flows: Vec<Flow>,
}

impl Split {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionElement {
    Step(Step),
    Flow(Flow),
    Split(Split),
    Decision(Decision),
}

impl ExecutionElement {
    pub fn id(&self) -> &str {
        match self {
            Self::Step(step) => &step.id,
            Self::Flow(flow) => &flow.id,
            Self::Split(split) => &split.id,
            Self::Decision(decision) => &decision.id,
        }
    }
}

/// Root of a job definition. Also used for generated partition and split-flow sub-jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub restartable: Option<String>,
    pub properties: Option<JslProperties>,
    pub listeners: Option<Listeners>,
    pub execution_elements: Vec<ExecutionElement>,
}

impl JobDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, element: ExecutionElement) -> Self {
        self.execution_elements.push(element);
        self
    }

    /// Restartable unless explicitly set to "false"
    pub fn is_restartable(&self) -> bool {
        !matches!(self.restartable.as_deref().map(str::trim), Some(v) if v.eq_ignore_ascii_case("false"))
    }

    /// Find a top-level step by id
    pub fn find_step(&self, step_id: &str) -> Option<&Step> {
        self.execution_elements.iter().find_map(|element| match element {
            ExecutionElement::Step(step) if step.id == step_id => Some(step),
            _ => None,
        })
    }
}
