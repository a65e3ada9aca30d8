//! Test utilities and mocks for drydock unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::probe::{ProbeProgram, ProbeReport, Prober};
use crate::toolchain::EnvironmentError;

/// Table-driven prober: every label not registered as a success probes
/// negative. Records the labels it was asked about, in order.
#[derive(Debug, Default)]
pub struct FakeProber {
    outcomes: HashMap<String, bool>,
    probed: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label that probes positive.
    pub fn with_success(mut self, label: &str) -> Self {
        self.outcomes.insert(label.to_string(), true);
        self
    }

    /// Register a label that probes negative (the default for unknown
    /// labels; useful to be explicit in tests).
    pub fn with_failure(mut self, label: &str) -> Self {
        self.outcomes.insert(label.to_string(), false);
        self
    }

    /// Labels probed so far, in order of first arrival.
    pub fn probed_labels(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl Prober for FakeProber {
    fn probe(&self, program: &ProbeProgram) -> Result<ProbeReport, EnvironmentError> {
        self.probed
            .lock()
            .unwrap()
            .push(program.label.to_string());

        let succeeded = self
            .outcomes
            .get(program.label.as_str())
            .copied()
            .unwrap_or(false);

        Ok(ProbeReport {
            label: program.label,
            succeeded,
            diagnostic: if succeeded {
                String::new()
            } else {
                format!("simulated failure for `{}`", program.label)
            },
        })
    }
}
