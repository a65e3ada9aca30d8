//! Environment and toolchain health checks.
//!
//! The `doctor` command performs fast environment checks to verify that
//! the toolchain is usable before a real configure run.
//!
//! ## Checks Performed
//!
//! - C compiler availability and identity
//! - Archiver availability
//! - End-to-end sanity probe (compile and link a minimal program)

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::platform::{host_architecture, host_os_family, host_word_size};
use crate::probe::{CompilerProber, ProbeProgram, Prober};
use crate::toolchain::detect_toolchain;
use crate::util::process::find_ar;

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool (if applicable)
    pub path: Option<PathBuf>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: false,
            message: message.into(),
            path: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the tool path.
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,

    /// Host identity line
    pub host: String,

    /// Total time taken
    pub total_duration: Duration,
}

impl DoctorReport {
    /// Add a check result.
    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }
}

/// Run every health check.
pub fn run_doctor() -> DoctorReport {
    let start = Instant::now();
    let mut report = DoctorReport {
        host: format!(
            "{} {} ({}-bit)",
            host_os_family(),
            host_architecture(),
            host_word_size()
        ),
        ..Default::default()
    };

    let compiler_start = Instant::now();
    let toolchain = match detect_toolchain() {
        Ok(tc) => {
            let message = format!(
                "{}{}",
                tc.family,
                tc.version
                    .as_ref()
                    .map(|v| format!(" {}", v))
                    .unwrap_or_default()
            );
            report.add(
                CheckResult::pass("c-compiler", message)
                    .with_path(tc.cc.clone())
                    .with_duration(compiler_start.elapsed()),
            );
            Some(tc)
        }
        Err(e) => {
            report.add(
                CheckResult::fail("c-compiler", e.to_string())
                    .with_duration(compiler_start.elapsed()),
            );
            None
        }
    };

    let ar_start = Instant::now();
    let ar = toolchain
        .as_ref()
        .and_then(|tc| tc.ar.clone())
        .or_else(find_ar);
    match ar {
        Some(path) => report.add(
            CheckResult::pass("archiver", path.display().to_string())
                .with_path(path)
                .with_duration(ar_start.elapsed())
                .optional(),
        ),
        None => report.add(
            CheckResult::fail("archiver", "no ar/llvm-ar/lib found on PATH")
                .with_duration(ar_start.elapsed())
                .optional(),
        ),
    }

    if let Some(toolchain) = toolchain {
        let sanity_start = Instant::now();
        let prober = CompilerProber::new(toolchain);
        match prober.probe(&ProbeProgram::sanity_check()) {
            Ok(sanity) if sanity.succeeded => report.add(
                CheckResult::pass("sanity-probe", "minimal program compiles and links")
                    .with_duration(sanity_start.elapsed()),
            ),
            Ok(sanity) => report.add(
                CheckResult::fail("sanity-probe", sanity.diagnostic)
                    .with_duration(sanity_start.elapsed()),
            ),
            Err(e) => report.add(
                CheckResult::fail("sanity-probe", e.to_string())
                    .with_duration(sanity_start.elapsed()),
            ),
        }
    }

    report.total_duration = start.elapsed();
    report
}
