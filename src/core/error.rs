use thiserror::Error;

use crate::access::permission::Scope;
use crate::core::types::*;
use crate::core::value::ValueType;

/// Broad failure classes.
///
/// Everything except `Internal` is surfaced to the calling component and
/// leaves no partial state behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad identifiers, incompatible values, malformed filters or weights
    Input,
    /// The active component may not perform the operation
    Authorization,
    /// The request is well formed but conflicts with current state
    StateConflict,
    /// A kernel defect; never returned, always fatal
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // === caller input ===
    #[error("unknown person {0}")]
    UnknownPerson(PersonId),
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),
    #[error("unknown compartment {0}")]
    UnknownCompartment(CompartmentId),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
    #[error("unknown material {0}")]
    UnknownMaterial(MaterialId),
    #[error("unknown materials producer {0}")]
    UnknownMaterialsProducer(MaterialsProducerId),
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),
    #[error("unknown group type {0}")]
    UnknownGroupType(GroupTypeId),
    #[error("unknown batch {0}")]
    UnknownBatch(BatchId),
    #[error("unknown stage {0}")]
    UnknownStage(StageId),
    #[error("unknown global component '{0}'")]
    UnknownComponent(ComponentId),
    #[error("global component '{0}' is already registered")]
    DuplicateComponent(ComponentId),
    #[error("unknown {kind} property '{property}'")]
    UnknownProperty { kind: EntityKind, property: PropertyId },
    #[error("{kind} property '{property}' is defined twice")]
    DuplicateProperty { kind: EntityKind, property: PropertyId },
    #[error("property '{property}' holds {expected:?} values, got {found:?}")]
    IncompatibleValue {
        property: PropertyId,
        expected: ValueType,
        found: ValueType,
    },
    #[error("non-finite value for property '{0}'")]
    NonFiniteValue(PropertyId),
    #[error("amount {0} must be finite and non-negative")]
    InvalidAmount(f64),
    #[error("unknown population index or partition '{0}'")]
    UnknownIndex(IndexKey),
    #[error("population index or partition '{0}' already exists")]
    DuplicateIndex(IndexKey),
    #[error("malformed filter: {0}")]
    MalformedFilter(String),
    #[error("label query has {found} entries but the partition has {expected} dimensions")]
    MalformedLabelQuery { expected: usize, found: usize },
    #[error("weighting function returned {0}; weights must be finite and non-negative")]
    MalformedWeight(f64),
    #[error("plan time {requested} is before the current time {current}")]
    PastPlanTime { requested: Time, current: Time },
    #[error("plan key '{0}' is already in use")]
    DuplicatePlanKey(PlanKey),

    // === authorization ===
    #[error("not authorized; acceptable scopes are {acceptable:?}")]
    Unauthorized { acceptable: Vec<Scope> },
    #[error("'{key}' is owned by {owner}")]
    NotOwner { key: IndexKey, owner: Focus },

    // === state conflicts ===
    #[error("property '{0}' can only be written once")]
    WriteOnceProperty(PropertyId),
    #[error("person {person} is already in region {region}")]
    SameRegion { person: PersonId, region: RegionId },
    #[error("person {person} is already in compartment {compartment}")]
    SameCompartment {
        person: PersonId,
        compartment: CompartmentId,
    },
    #[error("insufficient {resource}: {available} available, {requested} requested")]
    InsufficientResource {
        resource: ResourceId,
        available: u64,
        requested: u64,
    },
    #[error("resource {0} level would overflow")]
    ResourceOverflow(ResourceId),
    #[error("same region {0} on both sides of the transfer")]
    SelfTransfer(RegionId),
    #[error("person {person} is already a member of group {group}")]
    AlreadyGroupMember { person: PersonId, group: GroupId },
    #[error("person {person} is not a member of group {group}")]
    NotGroupMember { person: PersonId, group: GroupId },
    #[error("batch {batch} holds {available}, {requested} requested")]
    InsufficientBatchAmount {
        batch: BatchId,
        available: f64,
        requested: f64,
    },
    #[error("batches {0} and {1} hold different materials")]
    MaterialMismatch(BatchId, BatchId),
    #[error("batch {0} is on a stage")]
    BatchOnStage(BatchId),
    #[error("batch {0} is not on a stage")]
    BatchNotOnStage(BatchId),
    #[error("batch {0} is the same on both sides")]
    SameBatch(BatchId),
    #[error("stage {0} is offered and locked")]
    StageOffered(StageId),
    #[error("stage {0} is not offered")]
    StageNotOffered(StageId),
    #[error("batch {batch} and stage {stage} belong to different producers")]
    ProducerMismatch { batch: BatchId, stage: StageId },
    #[error("batches {0} and {1} belong to different producers")]
    BatchProducerMismatch(BatchId, BatchId),
    #[error("stage {stage} already belongs to {producer}")]
    SameProducer {
        stage: StageId,
        producer: MaterialsProducerId,
    },
    #[error("counter overflow")]
    CounterOverflow,

    // === internal defects ===
    #[error("access violation: {0}")]
    AccessViolation(String),
    #[error("inconsistent kernel state: {0}")]
    Inconsistent(String),
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            Unauthorized { .. } | NotOwner { .. } => ErrorCategory::Authorization,
            WriteOnceProperty(_)
            | SameRegion { .. }
            | SameCompartment { .. }
            | InsufficientResource { .. }
            | ResourceOverflow(_)
            | SelfTransfer(_)
            | AlreadyGroupMember { .. }
            | NotGroupMember { .. }
            | InsufficientBatchAmount { .. }
            | MaterialMismatch(..)
            | BatchOnStage(_)
            | BatchNotOnStage(_)
            | SameBatch(_)
            | StageOffered(_)
            | StageNotOffered(_)
            | ProducerMismatch { .. }
            | BatchProducerMismatch(..)
            | SameProducer { .. }
            | CounterOverflow => ErrorCategory::StateConflict,
            AccessViolation(_) | Inconsistent(_) => ErrorCategory::Internal,
            _ => ErrorCategory::Input,
        }
    }
}

/// A failed kernel operation, with the context needed to diagnose it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{operation} failed (active: {focus}): {kind}")]
pub struct KernelError {
    pub operation: &'static str,
    pub focus: Focus,
    pub kind: ErrorKind,
}

impl KernelError {
    pub fn new(operation: &'static str, focus: Focus, kind: ErrorKind) -> Self {
        Self { operation, focus, kind }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Terminates the run on a kernel defect
#[cold]
#[track_caller]
pub(crate) fn fatal(operation: &str, kind: ErrorKind) -> ! {
    tracing::error!(operation, error = %kind, "kernel defect");
    panic!("kernel defect in {}: {}", operation, kind)
}
