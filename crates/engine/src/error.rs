//! Error types for network construction and simulation runs.

use millrace_types::ModuleId;
use thiserror::Error;

/// Errors detected while validating a network configuration.
///
/// All of these surface from [`crate::NetworkBuilder::build`] before any
/// event is scheduled; a network that fails validation never runs.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A reserved module slot was never defined.
    #[error("module {0} was reserved but never defined")]
    UndefinedModule(String),

    /// Two modules share a name.
    #[error("duplicate module name: {0}")]
    DuplicateModule(String),

    /// Two resources share a name.
    #[error("duplicate resource name: {0}")]
    DuplicateResource(String),

    /// A process module references a resource id outside the network.
    #[error("module {module} references unknown resource {resource}")]
    UnknownResource { module: String, resource: String },

    /// A downstream edge points outside the module arena.
    #[error("module {module} references unknown module {target}")]
    UnknownModule { module: String, target: ModuleId },

    /// Resource capacity must be a positive integer.
    #[error("resource {resource} has non-positive capacity")]
    NonPositiveCapacity { resource: String },

    /// Batch size must be at least one.
    #[error("batch module {module} has zero batch size")]
    ZeroBatchSize { module: String },

    /// Arrivals must create at least one entity per firing.
    #[error("arrival module {module} creates zero entities per arrival")]
    ZeroEntitiesPerArrival { module: String },

    /// A decide module needs at least one branch.
    #[error("decide module {module} has no branches")]
    NoBranches { module: String },

    /// Branch weights must be finite, non-negative, and sum to a positive total.
    #[error("decide module {module} has invalid branch weights: {reason}")]
    InvalidBranchWeights { module: String, reason: String },

    /// A sampling distribution has malformed parameters.
    #[error("module {module} has an invalid distribution: {reason}")]
    InvalidDistribution { module: String, reason: String },

    /// A network must contain at least one arrival module.
    #[error("network has no arrival module")]
    NoArrivals,

    /// Arrival modules are chain roots; nothing may route into them.
    #[error("arrival module {module} cannot be the target of another module")]
    ArrivalHasUpstream { module: String },

    /// Every module must be reachable from some arrival.
    #[error("module {module} is unreachable from every arrival")]
    UnreachableModule { module: String },

    /// Every reachable module must have a path to a dispose module.
    #[error("module {module} has no path to a dispose module")]
    NoDisposeReachable { module: String },
}

/// Runtime faults that abort a replication.
///
/// A valid configuration never produces these. When one is detected the
/// in-progress replication is abandoned rather than returning statistics
/// computed from a corrupted state.
#[derive(Debug, Error)]
pub enum SimError {
    /// A variate source produced a negative or non-finite delay.
    #[error("module {module} sampled an invalid delay ({seconds})")]
    InvalidDelay { module: String, seconds: f64 },

    /// A resource was seized beyond its capacity.
    #[error("resource {resource} seized beyond capacity ({seized}/{capacity})")]
    SeizeOverflow {
        resource: String,
        seized: u32,
        capacity: u32,
    },

    /// A resource was released while no unit was seized.
    #[error("resource {resource} released while idle")]
    ReleaseUnderflow { resource: String },

    /// The event queue yielded an event earlier than the clock.
    #[error("event at {event_secs}s popped behind the clock at {now_secs}s")]
    ClockWentBackwards { now_secs: f64, event_secs: f64 },

    /// An entity was delivered to an arrival module.
    #[error("entity delivered to arrival module {module}")]
    RoutedToArrival { module: String },

    /// A service-completion event named a module that is not a process.
    #[error("service completion for non-process module {module}")]
    StrayServiceCompletion { module: String },

    /// An arrival event named a module that is not an arrival.
    #[error("arrival event bound to non-arrival module {module}")]
    StrayArrival { module: String },
}
