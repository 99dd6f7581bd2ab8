//! The coupling loop: mesh setup → bootstrap → iterate → finalize.
//!
//! [`CouplingLoop`] owns the solver adapter, the middleware adapter, the
//! partition communicator and the per-iteration field buffers. Every partition
//! of the participant runs the same sequence of collective calls, including
//! partitions that own no coupling vertex.
//!
//! # Iteration
//!
//! 1. read the role's input field;
//! 2. apply it to the solver boundary and update boundary conditions;
//! 3. reconcile the time step and set it on the solver;
//! 4. preprocess, run, postprocess, update;
//! 5. monitor (local stop request);
//! 6. write the role's output field (halo flux zeroed);
//! 7. barrier across partitions;
//! 8. advance the coupling window;
//! 9. solver output (and optional snapshot);
//! 10. stop if the solver asked to or the middleware ended the coupling.
//!
//! Any error in 1–9 aborts the run. The loop never retries a partially
//! exchanged iteration and never finalizes on an error path.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::DataExchangeChannel;
use crate::algs::extract::extract_interface;
use crate::algs::register::{CouplingMeshRegistrar, InterfaceMesh};
use crate::algs::timestep::TimeStepSynchronizer;
use crate::capability::{BackendError, CouplingInterface, FlowSolver};
use crate::config::CouplingConfig;
use crate::coupling_error::CouplingError;
use crate::data::field::{CouplingField, FieldKind, WriteSign};
use crate::data::window::CouplingWindow;
use crate::debug_invariants::DebugInvariants;
use crate::io::snapshot::SnapshotWriter;
use crate::launch::{ExecutionMode, check_execution_mode};

/// Lifecycle of a [`CouplingLoop`]. Transitions only move forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoopState {
    Uninitialized,
    MeshRegistered,
    DataBootstrapped,
    Iterating,
    Finalized,
}

/// Why the loop left `Iterating`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The solver's iteration budget is used up.
    MaxIterations,
    /// The solver's monitor requested a stop.
    SolverRequested,
    /// The middleware has no further coupling window.
    CouplingEnded,
}

/// Outcome of [`CouplingLoop::run`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoopSummary {
    /// Iterations completed by this call.
    pub iterations: usize,
    /// Simulation time after the last completed iteration.
    pub time: f64,
    pub stop: StopReason,
}

/// Mesh, channel and buffers, created at registration.
#[derive(Debug)]
struct Exchange {
    mesh: InterfaceMesh,
    channel: DataExchangeChannel,
    read: CouplingField,
    write: CouplingField,
}

/// Coupling loop for one partition of the flow participant.
pub struct CouplingLoop<S, I, C> {
    config: CouplingConfig,
    solver: S,
    interface: I,
    comm: C,
    state: LoopState,
    registrar: CouplingMeshRegistrar,
    exchange: Option<Exchange>,
    sync: Option<TimeStepSynchronizer>,
    window: Option<CouplingWindow>,
    snapshots: Option<SnapshotWriter>,
    stop: Option<StopReason>,
}

impl<S, I, C> CouplingLoop<S, I, C>
where
    S: FlowSolver,
    I: CouplingInterface,
    C: Communicator,
{
    /// Wrap already constructed adapters. The configuration is validated here.
    pub fn new(config: CouplingConfig, solver: S, interface: I, comm: C) -> Result<Self, CouplingError> {
        config.validate()?;
        let snapshots = config
            .snapshot_dir
            .as_ref()
            .map(|dir| SnapshotWriter::new(dir, &config.mesh, &config.participant));
        Ok(Self {
            config,
            solver,
            interface,
            comm,
            state: LoopState::Uninitialized,
            registrar: CouplingMeshRegistrar::new(),
            exchange: None,
            sync: None,
            window: None,
            snapshots,
            stop: None,
        })
    }

    /// Check the execution mode, build the solver driver, then [`Self::new`].
    pub fn launch<F>(config: CouplingConfig, build_solver: F, interface: I, comm: C) -> Result<Self, CouplingError>
    where
        F: FnOnce(&CouplingConfig) -> Result<S, BackendError>,
    {
        check_execution_mode(ExecutionMode::from_flag(config.parallel), ExecutionMode::compiled())?;
        let solver = build_solver(&config).map_err(CouplingError::DriverConstruction)?;
        Self::new(config, solver, interface, comm)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &CouplingConfig {
        &self.config
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn interface(&self) -> &I {
        &self.interface
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Registered interface mesh, once past `Uninitialized`.
    pub fn mesh(&self) -> Option<&InterfaceMesh> {
        self.exchange.as_ref().map(|e| &e.mesh)
    }

    pub fn channel(&self) -> Option<&DataExchangeChannel> {
        self.exchange.as_ref().map(|e| &e.channel)
    }

    pub fn window(&self) -> Option<&CouplingWindow> {
        self.window.as_ref()
    }

    /// Why the loop stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Give back the adapters.
    pub fn into_parts(self) -> (S, I, C) {
        (self.solver, self.interface, self.comm)
    }

    /// `Uninitialized → MeshRegistered`: extract the interface and register it.
    pub fn setup_mesh(&mut self) -> Result<(), CouplingError> {
        self.expect_state(LoopState::Uninitialized, "register the coupling mesh")?;
        let rank = self.comm.rank();
        let partition = extract_interface(&self.solver, &self.config.marker, rank);
        let mesh = self.registrar.register(
            &mut self.interface,
            &self.config.mesh,
            self.config.dimension,
            partition,
        )?;
        mesh.debug_assert_invariants();
        let channel = DataExchangeChannel::resolve(
            &self.interface,
            &mesh,
            &self.config.read_field,
            &self.config.write_field,
        )?;
        let read = channel.read_buffer(&mesh);
        let write = channel.write_buffer(&mesh);
        log::info!(
            "rank {rank}: participant `{}` registered {} vertices on `{}` as {:?}",
            self.config.participant,
            mesh.len(),
            mesh.name(),
            channel.role()
        );
        self.exchange = Some(Exchange {
            mesh,
            channel,
            read,
            write,
        });
        self.state = LoopState::MeshRegistered;
        Ok(())
    }

    /// `MeshRegistered → DataBootstrapped`: start the session and provide
    /// initial data when the middleware asks for it.
    pub fn bootstrap(&mut self) -> Result<(), CouplingError> {
        self.expect_state(LoopState::MeshRegistered, "bootstrap coupling data")?;
        let iteration = self.solver.time_iteration();
        let first_max_dt = self
            .interface
            .initialize()
            .map_err(|e| CouplingError::transport("initialize", iteration, e))?;

        if self.interface.is_initial_data_required() {
            let ex = self.exchange.as_mut().ok_or(CouplingError::InvalidTransition {
                from: self.state,
                action: "bootstrap coupling data",
            })?;
            if !ex.mesh.is_degenerate() {
                fill_write_field(&self.solver, ex, self.config.write_sign);
                ex.channel
                    .write(&mut self.interface, &ex.mesh, iteration, &ex.write)?;
                log::info!(
                    "rank {}: wrote initial `{}` for {} vertices",
                    self.comm.rank(),
                    ex.write.name(),
                    ex.write.len()
                );
            }
            self.interface.mark_initial_data_fulfilled();
        }
        self.interface
            .initialize_data()
            .map_err(|e| CouplingError::transport("initialize_data", iteration, e))?;

        let preferred = self.solver.time_step();
        let ongoing = self.interface.is_coupling_ongoing();
        if !ongoing {
            log::warn!("middleware offers no coupling window after initialization");
        }
        self.sync = Some(TimeStepSynchronizer::new(preferred, first_max_dt));
        self.window = Some(CouplingWindow::new(
            iteration,
            self.solver.max_time_iterations(),
            preferred,
            first_max_dt,
            ongoing,
        ));
        self.comm.barrier();
        if self.comm.is_root() {
            log::info!(
                "coupling session started: iterations {iteration}..{}, first window step {first_max_dt}",
                self.solver.max_time_iterations()
            );
        }
        self.state = LoopState::DataBootstrapped;
        Ok(())
    }

    /// Run one coupling iteration. Returns `false` once the loop must stop.
    ///
    /// A window that may not continue (budget used up, coupling ended) runs
    /// nothing: the stop reason is recorded and `false` returned.
    pub fn step(&mut self) -> Result<bool, CouplingError> {
        if !matches!(self.state, LoopState::DataBootstrapped | LoopState::Iterating) {
            return Err(CouplingError::InvalidTransition {
                from: self.state,
                action: "run a coupling iteration",
            });
        }
        if let Some(reason) = self.stop {
            log::debug!("step requested after stop ({reason:?}); ignoring");
            return Ok(false);
        }
        if let Some(w) = self.window.filter(|w| !w.should_continue()) {
            let reason = if w.ongoing {
                StopReason::MaxIterations
            } else {
                StopReason::CouplingEnded
            };
            log::info!(
                "rank {}: no coupling iteration left at {} ({reason:?})",
                self.comm.rank(),
                w.iteration
            );
            self.stop = Some(reason);
            return Ok(false);
        }
        if self.state == LoopState::DataBootstrapped {
            log::info!("rank {}: entering coupling iterations", self.comm.rank());
            self.state = LoopState::Iterating;
        }

        let (Some(ex), Some(sync), Some(window)) =
            (self.exchange.as_mut(), self.sync.as_mut(), self.window.as_mut())
        else {
            return Err(CouplingError::InvalidTransition {
                from: self.state,
                action: "run a coupling iteration",
            });
        };
        let iteration = window.iteration;
        let active = !ex.mesh.is_degenerate();

        // 1-2: consume this window's input before touching the solver
        if active {
            ex.channel
                .read(&mut self.interface, &ex.mesh, iteration, &mut ex.read)?;
            apply_read_field(&mut self.solver, ex);
            self.solver.boundary_conditions_update();
        }

        // 3
        let dt = sync.apply(&mut self.solver);
        window.dt = dt;

        // 4
        let solver = &mut self.solver;
        let wrap = |call: &'static str| move |e: BackendError| CouplingError::transport(call, iteration, e);
        solver.preprocess(iteration).map_err(wrap("preprocess"))?;
        solver.run().map_err(wrap("run"))?;
        solver.postprocess().map_err(wrap("postprocess"))?;
        solver.update().map_err(wrap("update"))?;

        // 5
        let solver_stop = solver.monitor(iteration);

        // 6
        if active && self.interface.is_write_data_required(dt) {
            fill_write_field(&self.solver, ex, self.config.write_sign);
            ex.channel
                .write(&mut self.interface, &ex.mesh, iteration, &ex.write)?;
        }

        // 7
        self.comm.barrier();

        // 8
        let advance = sync.advance(&mut self.interface, dt, iteration)?;
        window.complete_iteration(advance.next_max_dt, advance.ongoing);
        window.debug_assert_invariants();

        // 9
        self.solver.output(iteration).map_err(wrap("output"))?;
        if let Some(writer) = &self.snapshots {
            writer.write(&ex.mesh, iteration, &[&ex.read, &ex.write])?;
        }

        log::debug!(
            "rank {}: iteration {iteration} done, dt {dt}, t {}, next window max {}",
            self.comm.rank(),
            window.time,
            advance.next_max_dt
        );

        // 10
        self.stop = if solver_stop {
            Some(StopReason::SolverRequested)
        } else if !window.ongoing {
            Some(StopReason::CouplingEnded)
        } else if window.iteration >= window.max_iterations {
            Some(StopReason::MaxIterations)
        } else {
            None
        };
        Ok(self.stop.is_none())
    }

    /// Iterate until a stop condition, then finalize.
    pub fn run(&mut self) -> Result<LoopSummary, CouplingError> {
        let start = self.window.map(|w| w.iteration).unwrap_or_default();
        while self.step()? {}
        let (end, time) = self
            .window
            .map(|w| (w.iteration, w.time))
            .unwrap_or_default();
        let summary = LoopSummary {
            iterations: end - start,
            time,
            stop: self.stop.unwrap_or(StopReason::MaxIterations),
        };
        if self.comm.is_root() {
            log::info!(
                "coupling loop stopped after {} iterations at t = {} ({:?})",
                summary.iterations,
                summary.time,
                summary.stop
            );
        }
        self.finalize()?;
        Ok(summary)
    }

    /// Full lifecycle: register, bootstrap, iterate, finalize.
    pub fn execute(&mut self) -> Result<LoopSummary, CouplingError> {
        self.setup_mesh()?;
        self.bootstrap()?;
        self.run()
    }

    /// Release the coupling session. Calling it again is a no-op.
    pub fn finalize(&mut self) -> Result<(), CouplingError> {
        if self.state == LoopState::Finalized {
            return Ok(());
        }
        let iteration = self.window.map(|w| w.iteration).unwrap_or_default();
        self.interface
            .finalize()
            .map_err(|e| CouplingError::transport("finalize", iteration, e))?;
        self.state = LoopState::Finalized;
        log::info!("rank {}: coupling session finalized", self.comm.rank());
        Ok(())
    }

    fn expect_state(&self, expected: LoopState, action: &'static str) -> Result<(), CouplingError> {
        if self.state != expected {
            return Err(CouplingError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        Ok(())
    }
}

/// Push the read values into the solver boundary.
fn apply_read_field<S: FlowSolver + ?Sized>(solver: &mut S, ex: &Exchange) {
    let Some(marker) = ex.mesh.marker() else {
        return;
    };
    let kind = ex.read.kind();
    for (v, &value) in ex.mesh.vertices().iter().zip(ex.read.values()) {
        match kind {
            FieldKind::Temperature => solver.set_vertex_temperature(marker, v.index(), value),
            FieldKind::HeatFlux => solver.set_vertex_normal_heat_flux(marker, v.index(), value),
        }
    }
}

/// Overwrite the write buffer from the solver's current boundary state.
fn fill_write_field<S: FlowSolver + ?Sized>(
    solver: &S,
    ex: &mut Exchange,
    sign: WriteSign,
) {
    let Some(marker) = ex.mesh.marker() else {
        return;
    };
    let kind = ex.write.kind();
    ex.write
        .overwrite_from(ex.mesh.vertices(), sign, |v| match kind {
            FieldKind::Temperature => solver.vertex_temperature(marker, v.index()),
            FieldKind::HeatFlux => solver.vertex_normal_heat_flux(marker, v.index()),
        });
}
