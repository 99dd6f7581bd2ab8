//! In-memory flow solver with a lumped wall model.
//!
//! [`MemorySolver`] implements [`FlowSolver`] over scripted markers. Each
//! interface vertex exchanges heat with a fluid at `ambient` temperature
//! through a film `conductance`:
//!
//! * a vertex with an imposed wall temperature reports
//!   `q = conductance * (T - ambient)`;
//! * a vertex with an imposed flux integrates `T += dt * q / capacity`.
//!
//! Boundary values set through the trait only take effect after
//! `boundary_conditions_update`, as in a real solver. Every driver call is
//! journaled so tests can check ordering.

use std::collections::BTreeMap;

use crate::capability::{BackendError, FlowSolver};
use crate::topology::vertex::MarkerId;

/// Driver calls recorded by [`MemorySolver`].
#[derive(Clone, Debug, PartialEq)]
pub enum SolverCall {
    SetTimeStep(f64),
    BoundaryUpdate,
    Preprocess(usize),
    Run,
    Postprocess,
    Update,
    Monitor(usize),
    Output(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Imposed {
    Temperature,
    HeatFlux,
}

/// Scripted interface vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryVertex {
    coords: Vec<f64>,
    halo: bool,
    owner: Option<usize>,
    temperature: f64,
    heat_flux: f64,
}

impl MemoryVertex {
    pub fn new(coords: Vec<f64>) -> Self {
        Self {
            coords,
            halo: false,
            owner: None,
            temperature: 0.0,
            heat_flux: 0.0,
        }
    }

    pub fn halo(mut self, halo: bool) -> Self {
        self.halo = halo;
        self
    }

    pub fn owner(mut self, rank: usize) -> Self {
        self.owner = Some(rank);
        self
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }

    pub fn heat_flux(mut self, q: f64) -> Self {
        self.heat_flux = q;
        self
    }
}

#[derive(Clone, Debug)]
struct Marker {
    name: String,
    vertices: Vec<MemoryVertex>,
    pending: BTreeMap<usize, (Imposed, f64)>,
    imposed: Vec<Option<Imposed>>,
}

/// Builder for [`MemorySolver`].
#[derive(Clone, Debug)]
pub struct MemorySolverBuilder {
    markers: Vec<Marker>,
    cht_tags: Vec<String>,
    time_step: f64,
    start_iteration: usize,
    max_iterations: usize,
    stop_at: Option<usize>,
    ambient: f64,
    conductance: f64,
    capacity: f64,
    failure: Option<(&'static str, usize)>,
}

impl Default for MemorySolverBuilder {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            cht_tags: Vec::new(),
            time_step: 0.01,
            start_iteration: 0,
            max_iterations: 10,
            stop_at: None,
            ambient: 300.0,
            conductance: 1.0,
            capacity: 1.0,
            failure: None,
        }
    }
}

impl MemorySolverBuilder {
    /// Add a marker present on this partition; ids follow insertion order.
    pub fn marker(mut self, name: impl Into<String>, vertices: Vec<MemoryVertex>) -> Self {
        let n = vertices.len();
        self.markers.push(Marker {
            name: name.into(),
            vertices,
            pending: BTreeMap::new(),
            imposed: vec![None; n],
        });
        self
    }

    /// Declare `name` as a CHT-capable marker tag.
    pub fn cht_tag(mut self, name: impl Into<String>) -> Self {
        self.cht_tags.push(name.into());
        self
    }

    pub fn time_step(mut self, dt: f64) -> Self {
        self.time_step = dt;
        self
    }

    pub fn start_iteration(mut self, iteration: usize) -> Self {
        self.start_iteration = iteration;
        self
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// `monitor` requests a stop at this iteration.
    pub fn stop_at(mut self, iteration: usize) -> Self {
        self.stop_at = Some(iteration);
        self
    }

    pub fn ambient(mut self, t: f64) -> Self {
        self.ambient = t;
        self
    }

    pub fn conductance(mut self, h: f64) -> Self {
        self.conductance = h;
        self
    }

    pub fn capacity(mut self, c: f64) -> Self {
        self.capacity = c;
        self
    }

    /// Make the driver step `call` fail at `iteration`.
    pub fn fail_on(mut self, call: &'static str, iteration: usize) -> Self {
        self.failure = Some((call, iteration));
        self
    }

    pub fn build(self) -> MemorySolver {
        MemorySolver {
            markers: self.markers,
            cht_tags: self.cht_tags,
            time_step: self.time_step,
            iteration: self.start_iteration,
            max_iterations: self.max_iterations,
            stop_at: self.stop_at,
            ambient: self.ambient,
            conductance: self.conductance,
            capacity: self.capacity,
            failure: self.failure,
            calls: Vec::new(),
        }
    }
}

/// Lumped in-memory flow solver.
#[derive(Clone, Debug)]
pub struct MemorySolver {
    markers: Vec<Marker>,
    cht_tags: Vec<String>,
    time_step: f64,
    iteration: usize,
    max_iterations: usize,
    stop_at: Option<usize>,
    ambient: f64,
    conductance: f64,
    capacity: f64,
    failure: Option<(&'static str, usize)>,
    calls: Vec<SolverCall>,
}

impl MemorySolver {
    pub fn builder() -> MemorySolverBuilder {
        MemorySolverBuilder::default()
    }

    /// Journal of driver calls since construction.
    pub fn calls(&self) -> &[SolverCall] {
        &self.calls
    }

    /// Current wall temperatures on the named marker.
    pub fn temperatures(&self, marker: &str) -> Vec<f64> {
        self.marker_by_name(marker)
            .map(|m| m.vertices.iter().map(|v| v.temperature).collect())
            .unwrap_or_default()
    }

    /// Current wall heat fluxes on the named marker.
    pub fn heat_fluxes(&self, marker: &str) -> Vec<f64> {
        self.marker_by_name(marker)
            .map(|m| m.vertices.iter().map(|v| v.heat_flux).collect())
            .unwrap_or_default()
    }

    fn marker_by_name(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    fn vertex(&self, marker: MarkerId, vertex: usize) -> Option<&MemoryVertex> {
        self.markers.get(marker.0)?.vertices.get(vertex)
    }

    fn set_pending(&mut self, marker: MarkerId, vertex: usize, imposed: Imposed, value: f64) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            if vertex < m.vertices.len() {
                m.pending.insert(vertex, (imposed, value));
            }
        }
    }

    fn check_failure(&self, call: &'static str) -> Result<(), BackendError> {
        match self.failure {
            Some((c, i)) if c == call && i == self.iteration => Err(BackendError::new(format!(
                "solver `{call}` failed at iteration {i}"
            ))),
            _ => Ok(()),
        }
    }
}

impl FlowSolver for MemorySolver {
    fn cht_marker_tags(&self) -> Vec<String> {
        self.cht_tags.clone()
    }

    fn boundary_markers(&self) -> BTreeMap<String, MarkerId> {
        self.markers
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), MarkerId(i)))
            .collect()
    }

    fn vertex_count(&self, marker: MarkerId) -> usize {
        self.markers.get(marker.0).map_or(0, |m| m.vertices.len())
    }

    fn initial_coordinates(&self, marker: MarkerId, vertex: usize) -> Vec<f64> {
        self.vertex(marker, vertex)
            .map(|v| v.coords.clone())
            .unwrap_or_default()
    }

    fn is_halo(&self, marker: MarkerId, vertex: usize) -> bool {
        self.vertex(marker, vertex).is_some_and(|v| v.halo)
    }

    fn vertex_owner(&self, marker: MarkerId, vertex: usize) -> Option<usize> {
        self.vertex(marker, vertex).and_then(|v| v.owner)
    }

    fn vertex_temperature(&self, marker: MarkerId, vertex: usize) -> f64 {
        self.vertex(marker, vertex).map_or(0.0, |v| v.temperature)
    }

    fn vertex_normal_heat_flux(&self, marker: MarkerId, vertex: usize) -> f64 {
        self.vertex(marker, vertex).map_or(0.0, |v| v.heat_flux)
    }

    fn set_vertex_temperature(&mut self, marker: MarkerId, vertex: usize, value: f64) {
        self.set_pending(marker, vertex, Imposed::Temperature, value);
    }

    fn set_vertex_normal_heat_flux(&mut self, marker: MarkerId, vertex: usize, value: f64) {
        self.set_pending(marker, vertex, Imposed::HeatFlux, value);
    }

    fn boundary_conditions_update(&mut self) {
        for m in &mut self.markers {
            for (i, (imposed, value)) in std::mem::take(&mut m.pending) {
                let v = &mut m.vertices[i];
                match imposed {
                    Imposed::Temperature => v.temperature = value,
                    Imposed::HeatFlux => v.heat_flux = value,
                }
                m.imposed[i] = Some(imposed);
            }
        }
        self.calls.push(SolverCall::BoundaryUpdate);
    }

    fn time_step(&self) -> f64 {
        self.time_step
    }

    fn set_time_step(&mut self, dt: f64) {
        self.time_step = dt;
        self.calls.push(SolverCall::SetTimeStep(dt));
    }

    fn time_iteration(&self) -> usize {
        self.iteration
    }

    fn max_time_iterations(&self) -> usize {
        self.max_iterations
    }

    fn preprocess(&mut self, iteration: usize) -> Result<(), BackendError> {
        self.calls.push(SolverCall::Preprocess(iteration));
        self.check_failure("preprocess")
    }

    fn run(&mut self) -> Result<(), BackendError> {
        self.calls.push(SolverCall::Run);
        self.check_failure("run")?;
        let (dt, h, c, ambient) = (self.time_step, self.conductance, self.capacity, self.ambient);
        for m in &mut self.markers {
            for (v, imposed) in m.vertices.iter_mut().zip(&m.imposed) {
                match imposed {
                    Some(Imposed::HeatFlux) => v.temperature += dt * v.heat_flux / c,
                    _ => v.heat_flux = h * (v.temperature - ambient),
                }
            }
        }
        Ok(())
    }

    fn postprocess(&mut self) -> Result<(), BackendError> {
        self.calls.push(SolverCall::Postprocess);
        self.check_failure("postprocess")
    }

    fn update(&mut self) -> Result<(), BackendError> {
        self.calls.push(SolverCall::Update);
        self.check_failure("update")
    }

    fn monitor(&mut self, iteration: usize) -> bool {
        self.calls.push(SolverCall::Monitor(iteration));
        self.stop_at == Some(iteration)
    }

    fn output(&mut self, iteration: usize) -> Result<(), BackendError> {
        self.calls.push(SolverCall::Output(iteration));
        self.check_failure("output")?;
        self.iteration = iteration + 1;
        Ok(())
    }
}
