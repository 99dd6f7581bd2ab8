//! Time-step reconciliation between the local solver and the coupling window.
//!
//! Each iteration the solver runs with `min(preferred, window max)`. After the
//! solve, the window is advanced by that same step and the middleware returns
//! the admissible step for the next window.

use crate::capability::{CouplingInterface, FlowSolver};
use crate::coupling_error::CouplingError;

/// Effective step: never larger than either input.
#[inline]
pub fn reconcile(preferred: f64, max_dt: f64) -> f64 {
    preferred.min(max_dt)
}

/// Outcome of advancing the coupling window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowAdvance {
    /// Admissible step for the next window.
    pub next_max_dt: f64,
    /// False once the middleware has no further window to offer.
    pub ongoing: bool,
}

/// Tracks the solver's preferred step and the window's admissible step.
#[derive(Clone, Debug)]
pub struct TimeStepSynchronizer {
    preferred: f64,
    max_dt: f64,
    applied: Option<f64>,
}

impl TimeStepSynchronizer {
    /// Start from the solver's preferred step and the first window's maximum.
    pub fn new(preferred: f64, first_max_dt: f64) -> Self {
        Self {
            preferred,
            max_dt: first_max_dt,
            applied: None,
        }
    }

    pub fn preferred(&self) -> f64 {
        self.preferred
    }

    pub fn max_dt(&self) -> f64 {
        self.max_dt
    }

    /// Reconcile and write the effective step into the solver.
    ///
    /// Must run before the solver's preprocessing for the iteration. The
    /// solver's reported step is taken as its new preference only when it
    /// differs from the step applied last time, so a short window does not
    /// permanently shrink later steps.
    pub fn apply<S>(&mut self, solver: &mut S) -> f64
    where
        S: FlowSolver + ?Sized,
    {
        let reported = solver.time_step();
        if self.applied != Some(reported) {
            self.preferred = reported;
        }
        let dt = reconcile(self.preferred, self.max_dt);
        solver.set_time_step(dt);
        self.applied = Some(dt);
        log::trace!(
            "time step: preferred {} window max {} -> {dt}",
            self.preferred,
            self.max_dt
        );
        dt
    }

    /// Advance the coupling window by `dt`, the step just taken.
    pub fn advance<I>(
        &mut self,
        interface: &mut I,
        dt: f64,
        iteration: usize,
    ) -> Result<WindowAdvance, CouplingError>
    where
        I: CouplingInterface + ?Sized,
    {
        let next_max_dt = interface
            .advance(dt)
            .map_err(|e| CouplingError::transport("advance", iteration, e))?;
        let mut ongoing = interface.is_coupling_ongoing();
        if ongoing && next_max_dt <= 0.0 {
            log::warn!(
                "iteration {iteration}: middleware offers non-positive step {next_max_dt} while coupling is ongoing; stopping"
            );
            ongoing = false;
        }
        self.max_dt = next_max_dt;
        Ok(WindowAdvance {
            next_max_dt,
            ongoing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::loopback::LoopbackSession;
    use crate::backend::memory_solver::{MemorySolver, SolverCall};
    use proptest::prelude::*;

    #[test]
    fn window_limits_solver_step() {
        let mut solver = MemorySolver::builder().time_step(0.01).build();
        let mut sync = TimeStepSynchronizer::new(0.01, 0.004);
        assert_eq!(sync.apply(&mut solver), 0.004);
        assert_eq!(solver.time_step(), 0.004);
        assert_eq!(solver.calls(), &[SolverCall::SetTimeStep(0.004)]);
    }

    #[test]
    fn step_recovers_after_short_window() {
        let mut solver = MemorySolver::builder().time_step(0.01).build();
        let mut sync = TimeStepSynchronizer::new(0.01, 0.004);
        assert_eq!(sync.apply(&mut solver), 0.004);
        sync.max_dt = 0.02;
        assert_eq!(sync.apply(&mut solver), 0.01);
    }

    #[test]
    fn solver_side_change_becomes_new_preference() {
        let mut solver = MemorySolver::builder().time_step(0.01).build();
        let mut sync = TimeStepSynchronizer::new(0.01, 1.0);
        sync.apply(&mut solver);
        solver.set_time_step(0.002);
        assert_eq!(sync.apply(&mut solver), 0.002);
        assert_eq!(sync.preferred(), 0.002);
    }

    #[test]
    fn advance_reports_end_of_coupling() {
        let session = LoopbackSession::builder()
            .window_steps(vec![0.1])
            .max_windows(1)
            .build();
        let mut iface = session.participant(0);
        let first = iface.initialize().unwrap();
        let mut sync = TimeStepSynchronizer::new(0.1, first);
        let adv = sync.advance(&mut iface, 0.1, 0).unwrap();
        assert!(!adv.ongoing);
    }

    proptest! {
        #[test]
        fn effective_step_is_bounded(preferred in 1e-9f64..10.0, max_dt in 1e-9f64..10.0) {
            let dt = reconcile(preferred, max_dt);
            prop_assert!(dt <= preferred);
            prop_assert!(dt <= max_dt);
            prop_assert!(dt == preferred || dt == max_dt);
        }
    }
}
