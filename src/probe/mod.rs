//! Compile/link/run probes.
//!
//! A probe is a small C program compiled (and optionally linked or run)
//! solely to test whether a capability exists. A probe that fails to
//! compile is a normal negative result; only inability to invoke the
//! compiler at all is an error. Probes mutate nothing beyond their own
//! scratch directory, so any number of them may run concurrently.

use crate::toolchain::EnvironmentError;
use crate::util::InternedString;

mod cache;
mod runner;

pub use cache::ProbeCache;
pub use runner::CompilerProber;

/// How far a probe must get to count as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ProbeKind {
    /// Source must compile to an object file.
    Compile,
    /// Source must compile and link into an executable.
    #[default]
    Link,
    /// The linked executable must also run and exit zero.
    Run,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Compile => "compile",
            ProbeKind::Link => "link",
            ProbeKind::Run => "run",
        }
    }
}

/// A fully-specified probe program, ready to hand to a `Prober`.
#[derive(Debug, Clone)]
pub struct ProbeProgram {
    /// What is being probed; used for diagnostics and logging only.
    pub label: InternedString,
    /// Success criterion.
    pub kind: ProbeKind,
    /// C source text.
    pub source: String,
    /// Preprocessor defines passed on the compiler command line.
    pub defines: Vec<(String, Option<String>)>,
    /// Libraries appended to the link line.
    pub libraries: Vec<String>,
}

impl ProbeProgram {
    /// A minimal program that any working toolchain must handle.
    ///
    /// Used as the end-to-end sanity check before any feature probing.
    pub fn sanity_check() -> Self {
        ProbeProgram {
            label: InternedString::new("toolchain_sanity"),
            kind: ProbeKind::Link,
            source: "int main(void) { return 0; }\n".to_string(),
            defines: Vec::new(),
            libraries: Vec::new(),
        }
    }

    /// An implicit link check for a named library: trivial program,
    /// `-l<name>` on the link line.
    pub fn link_check(library: &str) -> Self {
        ProbeProgram {
            label: InternedString::new(format!("lib_{}", library)),
            kind: ProbeKind::Link,
            source: "int main(void) { return 0; }\n".to_string(),
            defines: Vec::new(),
            libraries: vec![library.to_string()],
        }
    }
}

/// Result of running one probe. Transient: lives only long enough to be
/// merged into `PlatformFacts` or checked by the resolver.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Label of the probed program.
    pub label: InternedString,
    /// Whether the probe met its success criterion.
    pub succeeded: bool,
    /// Captured compiler/runtime output, for diagnostics.
    pub diagnostic: String,
}

/// Something that can run probes.
///
/// The production implementation is `CompilerProber`; tests substitute a
/// table-driven fake. `Sync` because feature and library probes fan out
/// across a rayon pool.
pub trait Prober: Sync {
    /// Run one probe. A negative outcome is `Ok` with `succeeded: false`;
    /// `Err` is reserved for an unusable environment.
    fn probe(&self, program: &ProbeProgram) -> Result<ProbeReport, EnvironmentError>;
}
