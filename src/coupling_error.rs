//! CouplingError: unified error type for the coupling loop and its components
//!
//! Every fallible public API in this crate returns `Result<_, CouplingError>`.
//! Variants are grouped into an [`ErrorKind`] so callers can tell a bad
//! configuration (detected before the loop starts) from an in-loop
//! synchronization fault (which aborts the run).

use std::fmt;
use thiserror::Error;

use crate::capability::BackendError;
use crate::coupling_loop::LoopState;

/// Coarse classification of a [`CouplingError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Detected before mesh registration completes.
    Configuration,
    /// Local solver driver could not be constructed.
    Initialization,
    /// Exchange or window advance failed inside the loop.
    Synchronization,
    /// An operation was invoked in the wrong loop state.
    State,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Initialization => "initialization error",
            ErrorKind::Synchronization => "synchronization fault",
            ErrorKind::State => "invalid state",
        };
        f.write_str(s)
    }
}

/// Unified error type for coupling operations.
#[derive(Debug, Error)]
pub enum CouplingError {
    /// Solver-side dimension differs from the middleware's configured dimension.
    #[error("spatial dimension mismatch: solver uses {solver}D, coupling interface expects {interface}D")]
    DimensionMismatch { solver: usize, interface: usize },
    /// A boundary vertex reported coordinates of the wrong length.
    #[error("vertex {vertex} has {found} coordinates, expected {expected}")]
    CoordinateDimension {
        vertex: usize,
        expected: usize,
        found: usize,
    },
    /// The middleware does not know the named coupling mesh.
    #[error("unknown coupling mesh `{name}`: {source}")]
    UnknownMesh {
        name: String,
        #[source]
        source: BackendError,
    },
    /// The middleware does not know the named field on the coupling mesh.
    #[error("unknown field `{name}` on coupling mesh: {source}")]
    UnknownField {
        name: String,
        #[source]
        source: BackendError,
    },
    /// A configured field name maps to neither temperature nor heat flux.
    #[error("field name `{0}` is neither a temperature nor a heat-flux field")]
    UnrecognizedFieldName(String),
    /// Read and write fields carry the same physical quantity.
    #[error("read field `{read}` and write field `{write}` describe the same quantity")]
    RoleConflict { read: String, write: String },
    /// Any other rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parallel execution requested, but the crate was built without MPI.
    #[error(
        "parallel execution requested on a non-parallel build; drop the parallel option or rebuild with `mpi-support`"
    )]
    ParallelOnSerialBuild,
    /// Parallel build launched without asking for parallel initialization.
    #[error(
        "parallel build run without requesting parallel initialization; enable the parallel option so MPI is initialized"
    )]
    SerialOnParallelBuild,
    /// The solver driver constructor itself failed.
    #[error("solver driver construction failed: {0}")]
    DriverConstruction(#[source] BackendError),

    /// A field array and the handle list disagree in length.
    #[error("`{call}` at iteration {iteration}: field `{field}` has {found} values for {expected} handles")]
    LengthMismatch {
        call: &'static str,
        iteration: usize,
        field: String,
        expected: usize,
        found: usize,
    },
    /// A flux-typed write carried a non-zero value on a halo vertex.
    #[error("`write` at iteration {iteration}: halo vertex {vertex} of flux field `{field}` carries {value}, expected 0")]
    HaloWriteNonZero {
        iteration: usize,
        field: String,
        vertex: usize,
        value: f64,
    },
    /// The middleware or solver reported a failure during a loop call.
    #[error("`{call}` failed at iteration {iteration}: {source}")]
    Transport {
        call: &'static str,
        iteration: usize,
        #[source]
        source: BackendError,
    },

    /// Registration was attempted a second time.
    #[error("coupling mesh `{0}` is already registered; re-registration is not allowed")]
    AlreadyRegistered(String),
    /// Internal coupling state no longer holds its invariants.
    #[error("corrupt coupling state: {0}")]
    InvariantViolation(String),
    /// The loop was driven out of order.
    #[error("cannot {action} in state {from:?}")]
    InvalidTransition { from: LoopState, action: &'static str },
    /// Writing a boundary-field snapshot failed.
    #[error("failed to write snapshot `{path}`: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CouplingError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use CouplingError::*;
        match self {
            DimensionMismatch { .. }
            | CoordinateDimension { .. }
            | UnknownMesh { .. }
            | UnknownField { .. }
            | UnrecognizedFieldName(_)
            | RoleConflict { .. }
            | InvalidConfig(_) => ErrorKind::Configuration,
            ParallelOnSerialBuild | SerialOnParallelBuild | DriverConstruction(_) => {
                ErrorKind::Initialization
            }
            LengthMismatch { .. } | HaloWriteNonZero { .. } | Transport { .. } | Snapshot { .. } => {
                ErrorKind::Synchronization
            }
            AlreadyRegistered(_) | InvariantViolation(_) | InvalidTransition { .. } => ErrorKind::State,
        }
    }

    pub(crate) fn transport(call: &'static str, iteration: usize, source: BackendError) -> Self {
        CouplingError::Transport {
            call,
            iteration,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let e = CouplingError::DimensionMismatch {
            solver: 2,
            interface: 3,
        };
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert_eq!(CouplingError::ParallelOnSerialBuild.kind(), ErrorKind::Initialization);
        let e = CouplingError::transport("advance", 4, BackendError::new("socket closed"));
        assert_eq!(e.kind(), ErrorKind::Synchronization);
        let e = CouplingError::InvariantViolation("iteration 5 beyond maximum 4".into());
        assert_eq!(e.kind(), ErrorKind::State);
    }

    #[test]
    fn transport_message_names_call_and_iteration() {
        let e = CouplingError::transport("read", 7, BackendError::new("peer gone"));
        let msg = e.to_string();
        assert!(msg.contains("`read`"));
        assert!(msg.contains("iteration 7"));
        assert!(msg.contains("peer gone"));
    }

    #[test]
    fn mode_messages_are_distinct() {
        let a = CouplingError::ParallelOnSerialBuild.to_string();
        let b = CouplingError::SerialOnParallelBuild.to_string();
        assert_ne!(a, b);
        assert!(a.contains("non-parallel build"));
        assert!(b.contains("without requesting parallel"));
    }
}
