//! Capability sets consumed by the coupling loop.
//!
//! The flow solver and the coupling middleware are external collaborators.
//! The loop only ever talks to them through [`FlowSolver`] and
//! [`CouplingInterface`]; a concrete adapter is chosen once at startup.

pub mod coupling_interface;
pub mod flow_solver;

pub use coupling_interface::{CouplingInterface, DataId, MeshId};
pub use flow_solver::FlowSolver;

use thiserror::Error;

/// Failure reported by a solver or middleware adapter.
///
/// The core never inspects the message; it wraps the error with the failing
/// call name and iteration index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(String);

impl BackendError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}
