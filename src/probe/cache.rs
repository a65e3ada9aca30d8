//! In-run probe result cache.
//!
//! The resolver re-checks libraries that platform detection may already
//! have probed, and several modules can require the same library. Results
//! are memoized by a fingerprint of everything that affects the outcome,
//! so each distinct probe hits the compiler exactly once per run.
//!
//! Deterministic probes fail identically on retry; caching a negative is
//! as valid as caching a success.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use super::{ProbeProgram, ProbeReport};

/// Fingerprint-keyed memo of probe outcomes for a single run.
#[derive(Debug, Default)]
pub struct ProbeCache {
    inner: Mutex<HashMap<String, ProbeReport>>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a memoized report for this program.
    pub fn get(&self, program: &ProbeProgram) -> Option<ProbeReport> {
        let key = fingerprint(program);
        self.inner.lock().unwrap().get(&key).cloned()
    }

    /// Memoize a report.
    pub fn insert(&self, program: &ProbeProgram, report: &ProbeReport) {
        let key = fingerprint(program);
        self.inner.lock().unwrap().insert(key, report.clone());
    }

    /// Number of memoized probes.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Hash everything that affects a probe's outcome: success criterion,
/// source text, defines, and link requirements. The label is display-only
/// and deliberately excluded.
fn fingerprint(program: &ProbeProgram) -> String {
    let mut hasher = Sha256::new();
    hasher.update(program.kind.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(program.source.as_bytes());
    for (name, value) in &program.defines {
        hasher.update([0]);
        hasher.update(name.as_bytes());
        if let Some(v) = value {
            hasher.update(b"=");
            hasher.update(v.as_bytes());
        }
    }
    for lib in &program.libraries {
        hasher.update([1]);
        hasher.update(lib.as_bytes());
    }
    hex::encode(hasher.finalize())
}
