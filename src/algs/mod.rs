//! Coupling algorithms: extraction, registration, exchange, time stepping.

pub mod communicator;
pub mod exchange;
pub mod extract;
pub mod register;
pub mod timestep;

pub use communicator::{Communicator, LocalComm, NoComm};
pub use exchange::DataExchangeChannel;
pub use extract::extract_interface;
pub use register::{CouplingMeshRegistrar, InterfaceMesh};
pub use timestep::{TimeStepSynchronizer, reconcile};
