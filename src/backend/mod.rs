//! In-process adapters for the two capability sets.
//!
//! Neither talks to a real solver or middleware. They are deterministic,
//! journal every call, and can inject failures at a chosen call.

pub mod loopback;
pub mod memory_solver;

pub use loopback::{Event, LoopbackInterface, LoopbackSession, LoopbackSessionBuilder, WriteRecord};
pub use memory_solver::{MemorySolver, MemorySolverBuilder, MemoryVertex, SolverCall};
