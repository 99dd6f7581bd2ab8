#![cfg_attr(docsrs, feature(doc_cfg))]
//! # cht-coupling
//!
//! Partitioned conjugate-heat-transfer coupling for a flow participant.
//! The crate drives a flow solver through a coupling middleware, one
//! coupling window per solver iteration, exchanging wall temperature and
//! wall heat flux on a shared interface mesh.
//!
//! ## Layout
//! - [`capability`]: the two external collaborators, [`FlowSolver`] and
//!   [`CouplingInterface`], as traits.
//! - [`algs`]: interface extraction, mesh registration, field exchange,
//!   time-step reconciliation and the partition communicator.
//! - [`data`]: coupling fields and the coupling window.
//! - [`coupling_loop`]: the lifecycle driver.
//! - [`backend`]: in-process solver and middleware used by the test suite
//!   and by dry runs.
//!
//! ## Usage
//!
//! ```
//! use cht_coupling::prelude::*;
//! use cht_coupling::backend::{LoopbackSession, MemorySolver, MemoryVertex};
//!
//! let solver = MemorySolver::builder()
//!     .marker("interface", vec![MemoryVertex::new(vec![0.0, 0.0]).temperature(310.0)])
//!     .cht_tag("interface")
//!     .max_iterations(3)
//!     .build();
//! let session = LoopbackSession::builder().counterpart("Temperature", 305.0).build();
//!
//! let mut coupling =
//!     CouplingLoop::new(CouplingConfig::default(), solver, session.participant(0), NoComm)?;
//! let summary = coupling.execute()?;
//! assert_eq!(summary.iterations, 3);
//! assert_eq!(coupling.state(), LoopState::Finalized);
//! # Ok::<(), CouplingError>(())
//! ```
//!
//! ## Features
//! - `mpi-support`: parallel builds with an MPI world communicator.
//! - `check-invariants` / `strict-invariants`: run structural checks in
//!   release builds too.

pub mod algs;
pub mod backend;
pub mod capability;
pub mod config;
pub mod coupling_error;
pub mod coupling_loop;
pub mod data;
pub mod debug_invariants;
pub mod io;
pub mod launch;
pub mod topology;

pub use capability::{BackendError, CouplingInterface, FlowSolver};
pub use coupling_error::{CouplingError, ErrorKind};
pub use debug_invariants::DebugInvariants;

/// The types needed to configure and drive a coupling run.
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    pub use crate::capability::{BackendError, CouplingInterface, FlowSolver};
    pub use crate::config::CouplingConfig;
    pub use crate::coupling_error::{CouplingError, ErrorKind};
    pub use crate::coupling_loop::{CouplingLoop, LoopState, LoopSummary, StopReason};
    pub use crate::data::field::{FieldKind, ParticipantRole, WriteSign};
    pub use crate::data::window::CouplingWindow;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::launch::ExecutionMode;
    pub use crate::topology::vertex::{BoundaryVertex, InterfacePartition, MarkerId, VertexHandle};
}
