//! Platform detection.
//!
//! Detection runs once per configure: read the host identity, prove the
//! toolchain works end-to-end with one minimal probe, then fan feature
//! probes out across a worker pool and merge the successes into a single
//! immutable `PlatformFacts`.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::probe::{ProbeProgram, Prober};
use crate::toolchain::{EnvironmentError, Toolchain};
use crate::util::InternedString;

use super::{OsFamily, PlatformFacts, WordSize};

/// User-supplied feature overrides, applied after probing.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Features recorded as present regardless of their probe outcome.
    pub enable: Vec<InternedString>,
    /// Features recorded as absent regardless of their probe outcome.
    pub disable: Vec<InternedString>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.enable.is_empty() && self.disable.is_empty()
    }
}

/// OS family of the host.
pub fn host_os_family() -> OsFamily {
    match std::env::consts::OS {
        "macos" => OsFamily::Darwin,
        "windows" => OsFamily::Windows,
        _ => OsFamily::Unix,
    }
}

/// Architecture name of the host (e.g. `x86_64`, `aarch64`).
pub fn host_architecture() -> &'static str {
    std::env::consts::ARCH
}

/// Pointer width of the host.
pub fn host_word_size() -> WordSize {
    if usize::BITS >= 64 {
        WordSize::Bits64
    } else {
        WordSize::Bits32
    }
}

/// Detect the platform: host identity, toolchain sanity, then every
/// applicable catalog feature.
///
/// Fails with an `EnvironmentError` when the toolchain cannot compile a
/// minimal program; a broken compiler must abort the run rather than
/// report every feature as absent.
pub fn detect_platform(
    catalog: &Catalog,
    toolchain: &Toolchain,
    prober: &dyn Prober,
    overrides: &Overrides,
) -> Result<PlatformFacts, EnvironmentError> {
    let os = host_os_family();

    // Sanity check before any feature probing.
    let sanity = prober.probe(&ProbeProgram::sanity_check())?;
    if !sanity.succeeded {
        return Err(EnvironmentError::SanityCheckFailed {
            compiler: toolchain.cc.clone(),
            diagnostic: sanity.diagnostic,
        });
    }

    // Probe order is irrelevant: probes are independent and the results
    // are collected first, merged once.
    let applicable: Vec<_> = catalog
        .features()
        .iter()
        .filter(|f| f.applies_to.matches(os))
        .collect();

    tracing::info!(
        "probing {} of {} catalog feature(s) on {}",
        applicable.len(),
        catalog.features().len(),
        os
    );

    let reports = applicable
        .par_iter()
        .map(|feature| prober.probe(&feature.probe_program(os)))
        .collect::<Result<Vec<_>, EnvironmentError>>()?;

    let mut detected: BTreeSet<InternedString> = reports
        .iter()
        .filter(|r| r.succeeded)
        .map(|r| r.label)
        .collect();

    for report in reports.iter().filter(|r| !r.succeeded) {
        tracing::debug!("feature `{}` absent: {}", report.label, report.diagnostic);
    }

    for id in &overrides.enable {
        if detected.insert(*id) {
            tracing::info!("feature `{}` force-enabled", id);
        }
    }
    for id in &overrides.disable {
        if detected.remove(id) {
            tracing::info!("feature `{}` force-disabled", id);
        }
    }

    Ok(PlatformFacts::new(
        os,
        host_architecture(),
        host_word_size(),
        toolchain.family,
        toolchain.version.clone(),
        detected,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin;
    use crate::test_support::FakeProber;
    use crate::toolchain::CompilerFamily;
    use std::path::PathBuf;

    fn fake_toolchain() -> Toolchain {
        Toolchain {
            cc: PathBuf::from("cc"),
            ar: None,
            family: CompilerFamily::Gcc,
            version: None,
            extra_cflags: vec![],
            extra_ldflags: vec![],
        }
    }

    #[test]
    fn test_detect_merges_successes() {
        let catalog = builtin();
        let prober = FakeProber::new()
            .with_success("toolchain_sanity")
            .with_success("posix_mmap")
            .with_success("clock_monotonic");

        let facts = detect_platform(&catalog, &fake_toolchain(), &prober, &Overrides::default())
            .unwrap();

        // Only meaningful on posix hosts: the applicable set depends on
        // the host OS family.
        if host_os_family().is_posixish() {
            assert!(facts.has_feature("posix_mmap"));
            assert!(!facts.has_feature("large_file_support"));
        }
    }

    #[test]
    fn test_sanity_failure_aborts() {
        let catalog = builtin();
        let prober = FakeProber::new().with_success("posix_mmap"); // sanity missing -> fails

        let err = detect_platform(&catalog, &fake_toolchain(), &prober, &Overrides::default());
        assert!(matches!(
            err,
            Err(EnvironmentError::SanityCheckFailed { .. })
        ));
        // No feature probes may run after a failed sanity check
        assert_eq!(prober.probed_labels(), vec!["toolchain_sanity".to_string()]);
    }

    #[test]
    fn test_overrides_win_over_probes() {
        let catalog = builtin();
        let prober = FakeProber::new()
            .with_success("toolchain_sanity")
            .with_success("posix_mmap");

        let overrides = Overrides {
            enable: vec![InternedString::new("symbol_fseeko")],
            disable: vec![InternedString::new("posix_mmap")],
        };

        let facts =
            detect_platform(&catalog, &fake_toolchain(), &prober, &overrides).unwrap();

        assert!(facts.has_feature("symbol_fseeko"));
        assert!(!facts.has_feature("posix_mmap"));
    }
}
