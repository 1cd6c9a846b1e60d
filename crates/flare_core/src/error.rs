//! # Engine Error Types
//!
//! Configuration-time errors only. The per-frame path never returns these;
//! it degrades to "not played / skipped / not delivered" instead.

use thiserror::Error;

/// Errors raised while registering or constructing engine components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlareError {
    /// Attempted to shrink a pool below the number of objects currently out.
    #[error("pool resize rejected: requested ceiling {requested} is below live count {live}")]
    PoolBelowLive {
        /// Requested ceiling.
        requested: usize,
        /// Objects currently acquired.
        live: usize,
    },

    /// Effect names must be non-empty.
    #[error("effect name must not be empty")]
    EmptyEffectName,

    /// Two emitters with the same name were attached to one effect.
    #[error("effect '{effect}' already owns an emitter named '{emitter}'")]
    DuplicateEmitter {
        /// Effect being assembled.
        effect: String,
        /// Conflicting emitter name.
        emitter: String,
    },

    /// No factory is registered under this name.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    /// A required collaborator was not supplied.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(String),
}

/// Result type for engine configuration operations.
pub type FlareResult<T> = Result<T, FlareError>;
