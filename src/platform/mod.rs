//! Platform identity and detected facts.
//!
//! `PlatformFacts` is the single immutable record of everything the
//! detector learned about the host: OS family, architecture, word size,
//! compiler identity, and the set of detected features. It is created
//! once per run and handed by reference to the resolver and the emitter.

use std::collections::BTreeSet;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::toolchain::CompilerFamily;
use crate::util::InternedString;

mod detect;

pub use detect::{detect_platform, host_architecture, host_os_family, host_word_size, Overrides};

/// Broad operating-system family, the granularity at which probe
/// applicability is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Linux and the BSDs
    Unix,
    /// macOS
    Darwin,
    /// Windows
    Windows,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Unix => "unix",
            OsFamily::Darwin => "darwin",
            OsFamily::Windows => "windows",
        }
    }

    /// Whether this family is POSIX-shaped.
    pub fn is_posixish(&self) -> bool {
        matches!(self, OsFamily::Unix | OsFamily::Darwin)
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unix" => Ok(OsFamily::Unix),
            "darwin" => Ok(OsFamily::Darwin),
            "windows" => Ok(OsFamily::Windows),
            other => Err(format!("unknown OS family: `{}`", other)),
        }
    }
}

/// Pointer width of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordSize {
    Bits32,
    Bits64,
}

impl WordSize {
    pub fn bits(&self) -> u32 {
        match self {
            WordSize::Bits32 => 32,
            WordSize::Bits64 => 64,
        }
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Everything detected about the host platform. Immutable after
/// construction; only the detector builds one.
#[derive(Debug, Clone)]
pub struct PlatformFacts {
    os_family: OsFamily,
    architecture: InternedString,
    word_size: WordSize,
    compiler: CompilerFamily,
    compiler_version: Option<Version>,
    detected_features: BTreeSet<InternedString>,
}

impl PlatformFacts {
    /// Assemble facts. Library callers normally get these from
    /// `detect_platform`; constructing them directly is how tests
    /// simulate a platform.
    pub fn new(
        os_family: OsFamily,
        architecture: impl Into<InternedString>,
        word_size: WordSize,
        compiler: CompilerFamily,
        compiler_version: Option<Version>,
        detected_features: BTreeSet<InternedString>,
    ) -> Self {
        PlatformFacts {
            os_family,
            architecture: architecture.into(),
            word_size,
            compiler,
            compiler_version,
            detected_features,
        }
    }

    pub fn os_family(&self) -> OsFamily {
        self.os_family
    }

    pub fn architecture(&self) -> InternedString {
        self.architecture
    }

    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    pub fn compiler(&self) -> CompilerFamily {
        self.compiler
    }

    pub fn compiler_version(&self) -> Option<&Version> {
        self.compiler_version.as_ref()
    }

    /// Whether a feature was detected (or force-enabled).
    pub fn has_feature(&self, id: impl AsRef<str>) -> bool {
        self.detected_features.contains(id.as_ref())
    }

    /// Detected features in stable (lexicographic) order.
    pub fn features(&self) -> impl Iterator<Item = InternedString> + '_ {
        self.detected_features.iter().copied()
    }

    /// Number of detected features.
    pub fn feature_count(&self) -> usize {
        self.detected_features.len()
    }

    /// One-line human summary, for logs and the doctor report.
    pub fn summary(&self) -> String {
        format!(
            "{} {} ({}-bit), {}{}, {} feature(s) detected",
            self.os_family,
            self.architecture,
            self.word_size,
            self.compiler,
            self.compiler_version
                .as_ref()
                .map(|v| format!(" {}", v))
                .unwrap_or_default(),
            self.detected_features.len()
        )
    }
}
