//! High-level operations tying the engine components together.

pub mod configure;
pub mod doctor;

pub use configure::{configure, ConfigureOutcome, ConfigureRequest};
pub use doctor::{run_doctor, CheckResult, DoctorReport};
