//! Coupling-middleware capability set.

use crate::capability::BackendError;
use crate::topology::vertex::VertexHandle;

/// Middleware identifier of a coupling mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub i32);

/// Middleware identifier of a field on a coupling mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub i32);

/// Operations the coupling loop needs from the coupling middleware.
///
/// `read_block_scalar_data`, `advance` and `finalize` may block until the
/// other participant reaches the matching point.
pub trait CouplingInterface {
    /// Configured spatial dimension of the coupling.
    fn dimensions(&self) -> usize;
    fn mesh_id(&self, name: &str) -> Result<MeshId, BackendError>;
    fn data_id(&self, name: &str, mesh: MeshId) -> Result<DataId, BackendError>;
    /// Register vertex coordinates (row-major, `dimensions()` per vertex).
    /// The returned handles are in the same order as the coordinates.
    fn set_mesh_vertices(
        &mut self,
        mesh: MeshId,
        coords: &[f64],
    ) -> Result<Vec<VertexHandle>, BackendError>;

    /// Start the session; returns the first window's maximum step.
    fn initialize(&mut self) -> Result<f64, BackendError>;
    fn is_initial_data_required(&self) -> bool;
    fn mark_initial_data_fulfilled(&mut self);
    fn initialize_data(&mut self) -> Result<(), BackendError>;
    fn is_write_data_required(&self, dt: f64) -> bool;

    fn read_block_scalar_data(
        &mut self,
        data: DataId,
        handles: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), BackendError>;
    fn write_block_scalar_data(
        &mut self,
        data: DataId,
        handles: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), BackendError>;

    /// Advance the window by `dt`; returns the next window's maximum step.
    fn advance(&mut self, dt: f64) -> Result<f64, BackendError>;
    fn is_coupling_ongoing(&self) -> bool;
    fn finalize(&mut self) -> Result<(), BackendError>;
}
