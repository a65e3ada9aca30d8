//! Drydock - a feature-probing build configurator for C projects
//!
//! Drydock inspects the host environment (OS, compiler, available
//! libraries and symbols), resolves a requested set of feature modules
//! and their transitive dependencies, and emits a dependency-ordered
//! build plan plus a generated capability header.

pub mod catalog;
pub mod emit;
pub mod ops;
pub mod platform;
pub mod probe;
pub mod resolver;
pub mod toolchain;
pub mod util;

/// Test utilities and mocks for drydock unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a table-driven fake prober so resolution
/// and emission can be exercised without a real compiler.
#[cfg(test)]
pub mod test_support;

pub use catalog::{Catalog, FeatureDef, LibraryDef, ModuleSpec};
pub use emit::{BuildPlan, BuildStep, CapabilityHeader, Layout};
pub use ops::{configure, ConfigureOutcome, ConfigureRequest};
pub use platform::{OsFamily, Overrides, PlatformFacts, WordSize};
pub use probe::{CompilerProber, ProbeProgram, ProbeReport, Prober};
pub use resolver::{resolve, ResolveError, ResolveRequest, ResolvedGraph};
pub use toolchain::{detect_toolchain, CompilerFamily, EnvironmentError, Toolchain};
pub use util::InternedString;
