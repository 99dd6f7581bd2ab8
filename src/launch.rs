//! Execution-mode check performed before the solver driver is built.

use crate::coupling_error::CouplingError;

/// Serial or MPI-parallel execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Serial,
    Parallel,
}

impl ExecutionMode {
    /// Mode this crate was compiled for.
    pub const fn compiled() -> Self {
        if cfg!(feature = "mpi-support") {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Serial
        }
    }

    /// Mode from the `parallel` flag of the configuration.
    pub const fn from_flag(parallel: bool) -> Self {
        if parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Serial
        }
    }
}

/// Reject a requested mode the build cannot honour.
///
/// The two failure directions get distinct diagnostics.
pub fn check_execution_mode(
    requested: ExecutionMode,
    built: ExecutionMode,
) -> Result<(), CouplingError> {
    match (requested, built) {
        (ExecutionMode::Parallel, ExecutionMode::Serial) => Err(CouplingError::ParallelOnSerialBuild),
        (ExecutionMode::Serial, ExecutionMode::Parallel) => Err(CouplingError::SerialOnParallelBuild),
        _ => Ok(()),
    }
}
