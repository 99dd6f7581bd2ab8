//! Opt-in structural checks for coupling state.
//!
//! Checks run in debug builds, or in release builds with the
//! `check-invariants` / `strict-invariants` features.

use crate::coupling_error::CouplingError;

/// Types that can verify their own structural invariants.
pub trait DebugInvariants {
    /// Panic on a violated invariant when checking is enabled.
    fn debug_assert_invariants(&self);
    /// Return the first violated invariant.
    fn validate_invariants(&self) -> Result<(), CouplingError>;
}

/// Whether invariant checking is compiled in.
pub const fn enabled() -> bool {
    cfg!(any(
        debug_assertions,
        feature = "strict-invariants",
        feature = "check-invariants"
    ))
}

/// Run a fallible check and panic with context if it fails, when enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        if $crate::debug_invariants::enabled() {
            if let Err(e) = $expr {
                log::error!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
                panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl DebugInvariants for Broken {
        fn debug_assert_invariants(&self) {
            crate::debug_invariants!(self.validate_invariants(), "Broken");
        }

        fn validate_invariants(&self) -> Result<(), CouplingError> {
            Err(CouplingError::InvariantViolation("always broken".into()))
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "[invariants] Broken")]
    fn violation_panics_in_debug() {
        Broken.debug_assert_invariants();
    }
}
