//! Boundary-field output.

pub mod snapshot;

pub use snapshot::SnapshotWriter;
