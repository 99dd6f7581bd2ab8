//! Data module: coupling fields and window state

pub mod field;
pub mod window;

pub use field::{CouplingField, FieldKind, FieldRole, ParticipantRole, WriteSign};
pub use window::CouplingWindow;
