//! Interface topology: markers, vertices, partitions.

pub mod vertex;

pub use vertex::{BoundaryVertex, InterfacePartition, MarkerId, VertexHandle};
