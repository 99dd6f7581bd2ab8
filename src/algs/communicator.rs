//! Thin façade over the partition group of one participant.
//!
//! The coupling loop needs only rank identity and a barrier: every partition
//! must finish its write before any partition advances the shared window.
//! Backends: [`NoComm`] (single rank), [`LocalComm`] (threads in one process,
//! for tests) and `MpiComm` (feature `mpi-support`).

use std::sync::{Arc, Barrier};

/// Collective operations over the participant's partitions.
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    /// Block until every rank of the group has called `barrier`.
    fn barrier(&self);

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Compile-time no-op comm for a serial run.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}
}

// --- LocalComm: intra-process / one thread per rank ---

/// One rank of a thread group sharing a [`Barrier`].
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
}

impl LocalComm {
    /// Create `size` connected ranks; move each into its own thread.
    pub fn group(size: usize) -> Vec<LocalComm> {
        let barrier = Arc::new(Barrier::new(size.max(1)));
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::Communicator;
    use crate::capability::BackendError;
    use crate::coupling_error::CouplingError;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::Communicator as _;

    /// World communicator of an MPI job.
    pub struct MpiComm {
        world: SimpleCommunicator,
        _universe: Universe,
    }

    impl MpiComm {
        /// Initialize MPI; fails if it was already initialized elsewhere.
        pub fn new() -> Result<Self, CouplingError> {
            let universe = mpi::initialize().ok_or_else(|| {
                CouplingError::DriverConstruction(BackendError::new("MPI is already initialized"))
            })?;
            let world = universe.world();
            Ok(Self {
                world,
                _universe: universe,
            })
        }

        pub fn world(&self) -> &SimpleCommunicator {
            &self.world
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.world.rank() as usize
        }

        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn barrier(&self) {
            self.world.barrier();
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
