//! Compiler-backed probe execution.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use crate::toolchain::{CommandSpec, EnvironmentError, Toolchain};
use crate::util::process::{ProcessBuilder, TimedOutput};

use super::{ProbeCache, ProbeKind, ProbeProgram, ProbeReport, Prober};

/// Default per-probe deadline. Probe programs are tiny; a compiler that
/// takes longer than this on one is wedged.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs probes against a real toolchain in throwaway scratch directories.
pub struct CompilerProber {
    toolchain: Toolchain,
    timeout: Duration,
    cache: ProbeCache,
}

impl CompilerProber {
    pub fn new(toolchain: Toolchain) -> Self {
        CompilerProber {
            toolchain,
            timeout: DEFAULT_PROBE_TIMEOUT,
            cache: ProbeCache::new(),
        }
    }

    /// Override the per-probe deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The toolchain this prober drives.
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Number of distinct probes run so far.
    pub fn probes_run(&self) -> usize {
        self.cache.len()
    }

    /// Run a command under the probe deadline. A timeout gets one retry;
    /// deterministic failures don't (they fail identically on retry).
    fn run_bounded(
        &self,
        cmd: &CommandSpec,
        label: &str,
    ) -> Result<Option<std::process::Output>, EnvironmentError> {
        let builder = ProcessBuilder::new(&cmd.program).args(cmd.args.iter());

        for attempt in 0..2 {
            match builder.exec_with_timeout(self.timeout) {
                Ok(TimedOutput::Completed(output)) => return Ok(Some(output)),
                Ok(TimedOutput::TimedOut) => {
                    tracing::warn!(
                        "probe `{}` timed out after {:?} (attempt {})",
                        label,
                        self.timeout,
                        attempt + 1
                    );
                }
                Err(e) => {
                    // Could not spawn the compiler at all
                    return Err(EnvironmentError::CompilerUnusable {
                        compiler: cmd.program.clone(),
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(None)
    }

    /// Execute the probe binary itself (run-kind probes). Failure to
    /// launch or a nonzero exit is a negative, never fatal.
    fn run_probe_binary(&self, exe: &Path, label: &str) -> (bool, String) {
        match ProcessBuilder::new(exe).exec_with_timeout(self.timeout) {
            Ok(TimedOutput::Completed(output)) => {
                let diag = collect_output(&output);
                (output.status.success(), diag)
            }
            Ok(TimedOutput::TimedOut) => {
                (false, format!("probe binary `{}` timed out", label))
            }
            Err(e) => (false, format!("failed to run probe binary: {:#}", e)),
        }
    }
}

impl Prober for CompilerProber {
    fn probe(&self, program: &ProbeProgram) -> Result<ProbeReport, EnvironmentError> {
        if let Some(cached) = self.cache.get(program) {
            tracing::trace!("probe `{}` served from cache", program.label);
            return Ok(cached);
        }

        // Scratch directory is removed on every exit path, including
        // early returns, when `scratch` drops.
        let scratch = TempDir::new().map_err(|e| EnvironmentError::CompilerUnusable {
            compiler: self.toolchain.cc.clone(),
            message: format!("cannot create scratch directory: {}", e),
        })?;

        let source_path = scratch.path().join("probe.c");
        std::fs::write(&source_path, &program.source).map_err(|e| {
            EnvironmentError::CompilerUnusable {
                compiler: self.toolchain.cc.clone(),
                message: format!("cannot write probe source: {}", e),
            }
        })?;

        let exe_ext = self.toolchain.family.exe_extension();
        let exe_name = if exe_ext.is_empty() {
            "probe".to_string()
        } else {
            format!("probe.{}", exe_ext)
        };

        let cmd = match program.kind {
            ProbeKind::Compile => {
                let obj = scratch
                    .path()
                    .join(format!("probe.{}", self.toolchain.family.object_extension()));
                self.toolchain
                    .compile_object_command(&source_path, &obj, &program.defines)
            }
            ProbeKind::Link | ProbeKind::Run => self.toolchain.compile_exe_command(
                &source_path,
                &scratch.path().join(&exe_name),
                &program.defines,
                &program.libraries,
            ),
        };

        tracing::debug!("probing `{}`: {} {}", program.label, cmd.program.display(), cmd.args.join(" "));

        let report = match self.run_bounded(&cmd, &program.label)? {
            None => ProbeReport {
                label: program.label,
                succeeded: false,
                diagnostic: format!("probe timed out after {:?}", self.timeout),
            },
            Some(output) if !output.status.success() => ProbeReport {
                label: program.label,
                succeeded: false,
                diagnostic: collect_output(&output),
            },
            Some(output) => {
                if program.kind == ProbeKind::Run {
                    let (ok, diag) =
                        self.run_probe_binary(&scratch.path().join(&exe_name), &program.label);
                    ProbeReport {
                        label: program.label,
                        succeeded: ok,
                        diagnostic: diag,
                    }
                } else {
                    ProbeReport {
                        label: program.label,
                        succeeded: true,
                        diagnostic: collect_output(&output),
                    }
                }
            }
        };

        tracing::debug!(
            "probe `{}`: {}",
            program.label,
            if report.succeeded { "yes" } else { "no" }
        );

        self.cache.insert(program, &report);
        Ok(report)
    }
}

fn collect_output(output: &std::process::Output) -> String {
    let mut text = String::new();
    text.push_str(String::from_utf8_lossy(&output.stdout).trim_end());
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim_end());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::CompilerFamily;
    use crate::util::process::find_c_compiler;

    fn host_prober() -> Option<CompilerProber> {
        let cc = find_c_compiler()?;
        Some(CompilerProber::new(Toolchain {
            cc,
            ar: None,
            family: CompilerFamily::Gcc,
            version: None,
            extra_cflags: vec![],
            extra_ldflags: vec![],
        }))
    }

    #[test]
    fn test_sanity_probe_succeeds_on_host() {
        let Some(prober) = host_prober() else {
            return;
        };

        let report = prober.probe(&ProbeProgram::sanity_check()).unwrap();
        assert!(report.succeeded, "diagnostic: {}", report.diagnostic);
    }

    #[test]
    fn test_broken_source_is_negative_not_error() {
        let Some(prober) = host_prober() else {
            return;
        };

        let program = ProbeProgram {
            label: crate::util::InternedString::new("broken"),
            kind: ProbeKind::Compile,
            source: "this is not C\n".to_string(),
            defines: vec![],
            libraries: vec![],
        };

        let report = prober.probe(&program).unwrap();
        assert!(!report.succeeded);
        assert!(!report.diagnostic.is_empty());
    }

    #[test]
    fn test_probe_is_repeatable() {
        let Some(prober) = host_prober() else {
            return;
        };

        let first = prober.probe(&ProbeProgram::sanity_check()).unwrap();
        let second = prober.probe(&ProbeProgram::sanity_check()).unwrap();
        assert_eq!(first.succeeded, second.succeeded);
        // Second call must come from the memo, not a fresh compile
        assert_eq!(prober.probes_run(), 1);
    }

    #[test]
    fn test_missing_compiler_is_environment_error() {
        let prober = CompilerProber::new(Toolchain {
            cc: std::path::PathBuf::from("drydock-no-such-cc"),
            ar: None,
            family: CompilerFamily::Gcc,
            version: None,
            extra_cflags: vec![],
            extra_ldflags: vec![],
        });

        let err = prober.probe(&ProbeProgram::sanity_check());
        assert!(matches!(
            err,
            Err(EnvironmentError::CompilerUnusable { .. })
        ));
    }
}
