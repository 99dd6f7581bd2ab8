//! State of the shared coupling window as seen by this participant.

use crate::coupling_error::CouplingError;
use crate::debug_invariants::DebugInvariants;

/// Time, step and iteration bookkeeping for the current coupling window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CouplingWindow {
    /// Simulation time at the start of the current iteration.
    pub time: f64,
    /// Effective step applied in the current iteration.
    pub dt: f64,
    /// Maximum step the middleware admits for the current window.
    pub max_dt: f64,
    pub iteration: usize,
    pub max_iterations: usize,
    /// Cleared when the middleware ends the coupling.
    pub ongoing: bool,
}

impl CouplingWindow {
    /// Window starting at `iteration` with the solver's step `dt`.
    ///
    /// Simulation time starts at `iteration * dt`. `ongoing` is the
    /// middleware's answer right after initialization.
    pub fn new(iteration: usize, max_iterations: usize, dt: f64, max_dt: f64, ongoing: bool) -> Self {
        Self {
            time: iteration as f64 * dt,
            dt,
            max_dt,
            iteration,
            max_iterations,
            ongoing,
        }
    }

    /// True while iterations remain and the middleware keeps coupling.
    #[inline]
    pub fn should_continue(&self) -> bool {
        self.ongoing && self.iteration < self.max_iterations
    }

    /// Close the current iteration and open the next window.
    pub fn complete_iteration(&mut self, next_max_dt: f64, ongoing: bool) {
        self.time += self.dt;
        self.iteration += 1;
        self.max_dt = next_max_dt;
        self.ongoing = ongoing;
    }
}

impl DebugInvariants for CouplingWindow {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CouplingWindow");
    }

    fn validate_invariants(&self) -> Result<(), CouplingError> {
        if !self.time.is_finite() {
            return Err(CouplingError::InvariantViolation(format!(
                "simulation time is not finite ({})",
                self.time
            )));
        }
        if self.dt < 0.0 || self.dt.is_nan() {
            return Err(CouplingError::InvariantViolation(format!(
                "negative time step {}",
                self.dt
            )));
        }
        if self.iteration > self.max_iterations {
            return Err(CouplingError::InvariantViolation(format!(
                "iteration {} beyond maximum {}",
                self.iteration, self.max_iterations
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_until_max_iterations() {
        let mut w = CouplingWindow::new(0, 2, 0.5, 1.0, true);
        assert!(w.should_continue());
        w.complete_iteration(1.0, true);
        w.complete_iteration(1.0, true);
        assert_eq!(w.iteration, 2);
        assert_eq!(w.time, 1.0);
        assert!(!w.should_continue());
        w.validate_invariants().unwrap();
    }

    #[test]
    fn middleware_can_end_early() {
        let mut w = CouplingWindow::new(3, 10, 0.1, 0.1, true);
        assert!((w.time - 0.3).abs() < 1e-12);
        w.complete_iteration(0.0, false);
        assert!(!w.should_continue());
    }

    #[test]
    fn overrun_violates_invariants() {
        let mut w = CouplingWindow::new(0, 0, 0.1, 0.1, true);
        w.complete_iteration(0.1, true);
        let err = w.validate_invariants().unwrap_err();
        assert!(matches!(err, CouplingError::InvariantViolation(_)));
        assert_eq!(err.kind(), crate::coupling_error::ErrorKind::State);
    }

    #[test]
    fn no_window_offered_means_no_iteration() {
        let w = CouplingWindow::new(0, 10, 0.1, 0.0, false);
        assert!(!w.should_continue());
    }
}
