//! Flow-solver capability set.

use std::collections::BTreeMap;

use crate::capability::BackendError;
use crate::topology::vertex::MarkerId;

/// Operations the coupling loop needs from the local flow solver.
///
/// Vertex indices are local to the partition and to the marker, and stay
/// stable for the lifetime of the solver.
pub trait FlowSolver {
    /// Tags of all markers configured for conjugate heat transfer.
    fn cht_marker_tags(&self) -> Vec<String>;
    /// Markers physically present on this partition, by name.
    fn boundary_markers(&self) -> BTreeMap<String, MarkerId>;
    /// Number of vertices (owned + halo) on `marker`.
    fn vertex_count(&self, marker: MarkerId) -> usize;
    /// Initial (undeformed) coordinates of a marker vertex.
    fn initial_coordinates(&self, marker: MarkerId, vertex: usize) -> Vec<f64>;
    /// Whether the vertex is a halo copy owned by another partition.
    fn is_halo(&self, marker: MarkerId, vertex: usize) -> bool;
    /// Owning rank of the vertex, when the solver knows it.
    fn vertex_owner(&self, _marker: MarkerId, _vertex: usize) -> Option<usize> {
        None
    }

    fn vertex_temperature(&self, marker: MarkerId, vertex: usize) -> f64;
    fn vertex_normal_heat_flux(&self, marker: MarkerId, vertex: usize) -> f64;
    fn set_vertex_temperature(&mut self, marker: MarkerId, vertex: usize, value: f64);
    fn set_vertex_normal_heat_flux(&mut self, marker: MarkerId, vertex: usize, value: f64);
    /// Push boundary values set above into the solver's boundary conditions.
    fn boundary_conditions_update(&mut self);

    /// Preferred (configured) unsteady time step.
    ///
    /// Read once per iteration. A value equal to the last `set_time_step`
    /// is not a new preference: the loop keeps the earlier one. Report a
    /// different value to change the preferred step.
    fn time_step(&self) -> f64;
    fn set_time_step(&mut self, dt: f64);
    /// Current time iteration index.
    fn time_iteration(&self) -> usize;
    /// Total number of time iterations requested by the solver configuration.
    fn max_time_iterations(&self) -> usize;

    fn preprocess(&mut self, iteration: usize) -> Result<(), BackendError>;
    fn run(&mut self) -> Result<(), BackendError>;
    fn postprocess(&mut self) -> Result<(), BackendError>;
    fn update(&mut self) -> Result<(), BackendError>;
    /// Returns `true` when the solver wants to stop after this iteration.
    fn monitor(&mut self, iteration: usize) -> bool;
    fn output(&mut self, iteration: usize) -> Result<(), BackendError>;
}
