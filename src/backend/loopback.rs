//! In-process coupling middleware.
//!
//! A [`LoopbackSession`] stands in for the middleware and the solid-domain
//! participant behind it. Each rank of the flow participant gets its own
//! [`LoopbackInterface`] handle; all handles share one session so tests can
//! inspect what every rank registered, read, wrote and advanced.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capability::{BackendError, CouplingInterface, DataId, MeshId};
use crate::topology::vertex::VertexHandle;

/// One call observed by the session, in order, per rank.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    SetMeshVertices(usize),
    Initialize,
    InitialDataFulfilled,
    InitializeData,
    Read { data: String, len: usize },
    Write { data: String, len: usize },
    Advance(f64),
    Finalize,
}

/// A block write as received by the session.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteRecord {
    pub data: String,
    /// Number of windows completed by this rank when the write arrived.
    pub window: usize,
    /// Written before `initialize_data`, i.e. as bootstrap data.
    pub bootstrap: bool,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug)]
struct SessionConfig {
    dimensions: usize,
    meshes: Vec<String>,
    data: Vec<String>,
    window_steps: Vec<f64>,
    max_windows: usize,
    initial_data_required: bool,
    write_interval: usize,
    counterpart: BTreeMap<String, Vec<f64>>,
    failure: Option<(&'static str, usize)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dimensions: 2,
            meshes: vec!["Fluid-Mesh".to_string()],
            data: vec!["Temperature".to_string(), "Heat-Flux".to_string()],
            window_steps: vec![0.01],
            max_windows: 100,
            initial_data_required: false,
            write_interval: 1,
            counterpart: BTreeMap::new(),
            failure: None,
        }
    }
}

impl SessionConfig {
    fn window_step(&self, window: usize) -> f64 {
        scheduled(&self.window_steps, window)
    }

    fn counterpart_value(&self, data: &str, window: usize) -> f64 {
        self.counterpart
            .get(data)
            .map_or(0.0, |values| scheduled(values, window))
    }
}

/// Entry for `window`; the last entry repeats, an empty schedule gives 0.
fn scheduled(values: &[f64], window: usize) -> f64 {
    values
        .get(window)
        .or_else(|| values.last())
        .copied()
        .unwrap_or(0.0)
}

#[derive(Debug, Default)]
struct RankState {
    coords: Vec<Vec<f64>>,
    initialized: bool,
    initial_data_fulfilled: bool,
    data_initialized: bool,
    windows: usize,
    writes: Vec<WriteRecord>,
    events: Vec<Event>,
}

#[derive(Debug, Default)]
struct SessionState {
    config: SessionConfig,
    ranks: BTreeMap<usize, RankState>,
}

/// Builder for [`LoopbackSession`].
#[derive(Debug, Default)]
pub struct LoopbackSessionBuilder {
    config: SessionConfig,
}

impl LoopbackSessionBuilder {
    pub fn dimensions(mut self, dim: usize) -> Self {
        self.config.dimensions = dim;
        self
    }

    /// Add a mesh name the session accepts.
    pub fn mesh(mut self, name: impl Into<String>) -> Self {
        self.config.meshes.push(name.into());
        self
    }

    /// Add a field name the session accepts.
    pub fn data(mut self, name: impl Into<String>) -> Self {
        self.config.data.push(name.into());
        self
    }

    /// Admissible step per window; the last entry repeats.
    pub fn window_steps(mut self, steps: Vec<f64>) -> Self {
        self.config.window_steps = steps;
        self
    }

    pub fn max_windows(mut self, n: usize) -> Self {
        self.config.max_windows = n;
        self
    }

    pub fn initial_data_required(mut self, required: bool) -> Self {
        self.config.initial_data_required = required;
        self
    }

    /// Output data is only required every `n`-th window.
    pub fn write_interval(mut self, n: usize) -> Self {
        self.config.write_interval = n.max(1);
        self
    }

    /// Value the counterpart participant provides for `data` on every vertex.
    pub fn counterpart(self, data: impl Into<String>, value: f64) -> Self {
        self.counterpart_schedule(data, vec![value])
    }

    /// Per-window counterpart values for `data`; the last entry repeats.
    pub fn counterpart_schedule(mut self, data: impl Into<String>, values: Vec<f64>) -> Self {
        self.config.counterpart.insert(data.into(), values);
        self
    }

    /// Make `call` fail once a rank has completed `window` windows.
    pub fn fail_on(mut self, call: &'static str, window: usize) -> Self {
        self.config.failure = Some((call, window));
        self
    }

    pub fn build(self) -> LoopbackSession {
        LoopbackSession {
            state: Arc::new(Mutex::new(SessionState {
                config: self.config,
                ranks: BTreeMap::new(),
            })),
        }
    }
}

/// Shared in-process coupling session.
#[derive(Clone, Debug)]
pub struct LoopbackSession {
    state: Arc<Mutex<SessionState>>,
}

impl LoopbackSession {
    pub fn builder() -> LoopbackSessionBuilder {
        LoopbackSessionBuilder::default()
    }

    /// Middleware handle for `rank` of the flow participant.
    pub fn participant(&self, rank: usize) -> LoopbackInterface {
        self.state.lock().ranks.entry(rank).or_default();
        LoopbackInterface {
            rank,
            session: self.clone(),
        }
    }

    /// Coordinates registered by `rank`, indexed by handle.
    pub fn registered_coords(&self, rank: usize) -> Vec<Vec<f64>> {
        self.with_rank(rank, |r| r.coords.clone())
    }

    pub fn writes(&self, rank: usize) -> Vec<WriteRecord> {
        self.with_rank(rank, |r| r.writes.clone())
    }

    pub fn events(&self, rank: usize) -> Vec<Event> {
        self.with_rank(rank, |r| r.events.clone())
    }

    /// Steps passed to `advance` by `rank`, in order.
    pub fn advances(&self, rank: usize) -> Vec<f64> {
        self.with_rank(rank, |r| {
            r.events
                .iter()
                .filter_map(|e| match e {
                    Event::Advance(dt) => Some(*dt),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn finalize_count(&self, rank: usize) -> usize {
        self.with_rank(rank, |r| {
            r.events.iter().filter(|e| **e == Event::Finalize).count()
        })
    }

    fn with_rank<T: Default>(&self, rank: usize, f: impl FnOnce(&RankState) -> T) -> T {
        self.state.lock().ranks.get(&rank).map(f).unwrap_or_default()
    }
}

/// Per-rank handle implementing [`CouplingInterface`].
#[derive(Clone, Debug)]
pub struct LoopbackInterface {
    rank: usize,
    session: LoopbackSession,
}

impl LoopbackInterface {
    pub fn rank(&self) -> usize {
        self.rank
    }

    fn with_state<T>(&self, f: impl FnOnce(&SessionConfig, &mut RankState) -> T) -> T {
        let mut guard = self.session.state.lock();
        let SessionState { config, ranks } = &mut *guard;
        f(config, ranks.entry(self.rank).or_default())
    }

    fn data_name(config: &SessionConfig, data: DataId) -> Result<String, BackendError> {
        usize::try_from(data.0)
            .ok()
            .and_then(|i| config.data.get(i))
            .cloned()
            .ok_or_else(|| BackendError::new(format!("unknown data id {}", data.0)))
    }

    fn check_block(
        state: &RankState,
        handles: &[VertexHandle],
        len: usize,
    ) -> Result<(), BackendError> {
        if !state.initialized {
            return Err(BackendError::new("data access before initialize"));
        }
        if handles.len() != len {
            return Err(BackendError::new(format!(
                "{} handles but {len} values",
                handles.len()
            )));
        }
        if let Some(h) = handles
            .iter()
            .find(|h| usize::try_from(h.get()).map_or(true, |i| i >= state.coords.len()))
        {
            return Err(BackendError::new(format!("unregistered vertex handle {h}")));
        }
        Ok(())
    }

    fn check_failure(
        config: &SessionConfig,
        state: &RankState,
        call: &'static str,
    ) -> Result<(), BackendError> {
        match config.failure {
            Some((c, w)) if c == call && w == state.windows => {
                Err(BackendError::new(format!("injected `{call}` failure")))
            }
            _ => Ok(()),
        }
    }
}

impl CouplingInterface for LoopbackInterface {
    fn dimensions(&self) -> usize {
        self.with_state(|c, _| c.dimensions)
    }

    fn mesh_id(&self, name: &str) -> Result<MeshId, BackendError> {
        self.with_state(|c, _| {
            c.meshes
                .iter()
                .position(|m| m == name)
                .map(|i| MeshId(i as i32))
                .ok_or_else(|| BackendError::new(format!("no mesh named `{name}`")))
        })
    }

    fn data_id(&self, name: &str, mesh: MeshId) -> Result<DataId, BackendError> {
        self.with_state(|c, _| {
            if usize::try_from(mesh.0).map_or(true, |i| i >= c.meshes.len()) {
                return Err(BackendError::new(format!("unknown mesh id {}", mesh.0)));
            }
            c.data
                .iter()
                .position(|d| d == name)
                .map(|i| DataId(i as i32))
                .ok_or_else(|| BackendError::new(format!("no data named `{name}`")))
        })
    }

    fn set_mesh_vertices(
        &mut self,
        _mesh: MeshId,
        coords: &[f64],
    ) -> Result<Vec<VertexHandle>, BackendError> {
        self.with_state(|c, s| {
            if c.dimensions == 0 || coords.len() % c.dimensions != 0 {
                return Err(BackendError::new(format!(
                    "{} coordinates are not a multiple of dimension {}",
                    coords.len(),
                    c.dimensions
                )));
            }
            let first = s.coords.len();
            s.coords
                .extend(coords.chunks(c.dimensions).map(<[f64]>::to_vec));
            let n = s.coords.len() - first;
            s.events.push(Event::SetMeshVertices(n));
            Ok((first..s.coords.len())
                .map(|i| VertexHandle::new(i as i32))
                .collect())
        })
    }

    fn initialize(&mut self) -> Result<f64, BackendError> {
        self.with_state(|c, s| {
            if s.initialized {
                return Err(BackendError::new("session already initialized"));
            }
            s.initialized = true;
            s.events.push(Event::Initialize);
            Ok(c.window_step(0))
        })
    }

    fn is_initial_data_required(&self) -> bool {
        self.with_state(|c, s| c.initial_data_required && !s.initial_data_fulfilled)
    }

    fn mark_initial_data_fulfilled(&mut self) {
        self.with_state(|_, s| {
            s.initial_data_fulfilled = true;
            s.events.push(Event::InitialDataFulfilled);
        })
    }

    fn initialize_data(&mut self) -> Result<(), BackendError> {
        self.with_state(|c, s| {
            if c.initial_data_required && !s.initial_data_fulfilled {
                return Err(BackendError::new("initial data required but not provided"));
            }
            s.data_initialized = true;
            s.events.push(Event::InitializeData);
            Ok(())
        })
    }

    fn is_write_data_required(&self, _dt: f64) -> bool {
        self.with_state(|c, s| (s.windows + 1) % c.write_interval == 0)
    }

    fn read_block_scalar_data(
        &mut self,
        data: DataId,
        handles: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), BackendError> {
        self.with_state(|c, s| {
            Self::check_failure(c, s, "read")?;
            Self::check_block(s, handles, values.len())?;
            let name = Self::data_name(c, data)?;
            let value = c.counterpart_value(&name, s.windows);
            values.fill(value);
            s.events.push(Event::Read {
                data: name,
                len: values.len(),
            });
            Ok(())
        })
    }

    fn write_block_scalar_data(
        &mut self,
        data: DataId,
        handles: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), BackendError> {
        self.with_state(|c, s| {
            Self::check_failure(c, s, "write")?;
            Self::check_block(s, handles, values.len())?;
            let name = Self::data_name(c, data)?;
            s.events.push(Event::Write {
                data: name.clone(),
                len: values.len(),
            });
            s.writes.push(WriteRecord {
                data: name,
                window: s.windows,
                bootstrap: !s.data_initialized,
                values: values.to_vec(),
            });
            Ok(())
        })
    }

    fn advance(&mut self, dt: f64) -> Result<f64, BackendError> {
        self.with_state(|c, s| {
            Self::check_failure(c, s, "advance")?;
            if !s.initialized {
                return Err(BackendError::new("advance before initialize"));
            }
            if s.windows >= c.max_windows {
                return Err(BackendError::new("advance after coupling has ended"));
            }
            s.windows += 1;
            s.events.push(Event::Advance(dt));
            Ok(if s.windows < c.max_windows {
                c.window_step(s.windows)
            } else {
                0.0
            })
        })
    }

    fn is_coupling_ongoing(&self) -> bool {
        self.with_state(|c, s| s.windows < c.max_windows)
    }

    fn finalize(&mut self) -> Result<(), BackendError> {
        self.with_state(|_, s| {
            s.events.push(Event::Finalize);
            Ok(())
        })
    }
}
