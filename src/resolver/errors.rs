//! Resolution error types and diagnostics.

use std::fmt;

use thiserror::Error;

use crate::toolchain::EnvironmentError;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::InternedString;

/// A requirement a module could not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Feature(InternedString),
    Library(InternedString),
    Module(InternedString),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Feature(id) => write!(f, "feature `{}`", id),
            Requirement::Library(name) => write!(f, "library `{}`", name),
            Requirement::Module(name) => write!(f, "module `{}`", name),
        }
    }
}

/// An unmet requirement, attributed to the module that declared it.
///
/// Doubles as the record of why an optional module was dropped and as
/// the payload of a hard resolution error.
#[derive(Debug, Clone)]
pub struct UnmetRequirement {
    /// The module whose requirement failed.
    pub module: InternedString,
    /// What was missing.
    pub missing: Requirement,
    /// Probe diagnostics gathered while trying to satisfy it.
    pub tried: Vec<String>,
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module `{}` requires {}", self.module, self.missing)
    }
}

/// Error during module resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// An explicitly requested module (or something it pulls in) cannot
    /// be satisfied.
    #[error("{unmet} which is not available")]
    UnsatisfiedDependency { unmet: UnmetRequirement },

    /// A requested module does not exist in the catalog at all.
    #[error("unknown module `{module}`")]
    UnknownModule { module: InternedString },

    /// The catalog contains a dependency cycle. Always a catalog defect.
    #[error("cycle detected in module dependency graph")]
    Cycle { path: Vec<InternedString> },

    /// The toolchain broke mid-resolution (library probes run here).
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnsatisfiedDependency { unmet } => {
                let mut diag = Diagnostic::error(format!(
                    "cannot satisfy module `{}`: missing {}",
                    unmet.module, unmet.missing
                ));

                for attempt in &unmet.tried {
                    diag = diag.with_context(attempt.clone());
                }

                diag = diag.with_suggestion(suggestions::MODULE_UNSATISFIED);
                if let Requirement::Feature(id) = &unmet.missing {
                    diag = diag.with_suggestion(format!(
                        "Force the feature on with `--enable {}` if you know it works",
                        id
                    ));
                }

                diag
            }

            ResolveError::UnknownModule { module } => {
                Diagnostic::error(format!("could not find module `{}` in the catalog", module))
                    .with_suggestion("Check the module name for typos")
                    .with_suggestion("Add the module to your catalog file")
            }

            ResolveError::Cycle { path } => {
                let rendered: Vec<&str> = path.iter().map(|m| m.as_str()).collect();
                Diagnostic::error("cycle detected in module dependency graph")
                    .with_context(format!("cycle: {}", rendered.join(" -> ")))
                    .with_suggestion(
                        "Break the cycle by removing or restructuring module requirements",
                    )
            }

            ResolveError::Environment(e) => e.to_diagnostic(),
        }
    }
}
