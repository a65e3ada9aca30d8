//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod interning;
pub mod process;

pub use diagnostic::{Diagnostic, Reporter, StderrReporter};
pub use interning::InternedString;
