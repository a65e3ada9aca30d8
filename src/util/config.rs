//! Configuration file support for Drydock.
//!
//! Toolchain overrides are read from two locations:
//! - Global: `~/.drydock/toolchain.toml`
//! - Project: `.drydock/toolchain.toml`
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Toolchain configuration for compiler overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Toolchain settings
    pub toolchain: ToolchainSettings,
}

/// Toolchain settings for C compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C compiler (e.g., /usr/bin/clang)
    pub cc: Option<PathBuf>,

    /// Path to the archiver (e.g., /usr/bin/llvm-ar)
    pub ar: Option<PathBuf>,

    /// Additional C compiler flags applied to every compile step
    #[serde(default)]
    pub cflags: Vec<String>,

    /// Additional linker flags applied to the link step
    #[serde(default)]
    pub ldflags: Vec<String>,
}

impl ToolchainConfig {
    /// Load toolchain configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))
    }

    /// Load toolchain configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to load toolchain config from {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Check if any toolchain settings are configured.
    pub fn has_overrides(&self) -> bool {
        self.toolchain.cc.is_some()
            || self.toolchain.ar.is_some()
            || !self.toolchain.cflags.is_empty()
            || !self.toolchain.ldflags.is_empty()
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainConfig) {
        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }
        if other.toolchain.ar.is_some() {
            self.toolchain.ar = other.toolchain.ar;
        }
        if !other.toolchain.cflags.is_empty() {
            self.toolchain.cflags = other.toolchain.cflags;
        }
        if !other.toolchain.ldflags.is_empty() {
            self.toolchain.ldflags = other.toolchain.ldflags;
        }
    }
}

/// Path to the project-local toolchain config, relative to `cwd`.
pub fn project_toolchain_config_path(cwd: &Path) -> PathBuf {
    cwd.join(".drydock").join("toolchain.toml")
}

/// Path to the global toolchain config (`~/.drydock/toolchain.toml`).
pub fn global_toolchain_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".drydock").join("toolchain.toml"))
}

/// Load toolchain config, merging global then project (project wins).
pub fn load_toolchain_config(global: &Path, project: &Path) -> ToolchainConfig {
    let mut config = ToolchainConfig::load_or_default(global);
    if project.exists() {
        config.merge(ToolchainConfig::load_or_default(project));
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_is_default() {
        let config = ToolchainConfig::load_or_default(Path::new("/nonexistent/toolchain.toml"));
        assert!(!config.has_overrides());
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");

        std::fs::write(
            &global,
            "[toolchain]\ncc = \"/usr/bin/gcc\"\ncflags = [\"-O2\"]\n",
        )
        .unwrap();
        std::fs::write(&project, "[toolchain]\ncc = \"/usr/bin/clang\"\n").unwrap();

        let merged = load_toolchain_config(&global, &project);
        assert_eq!(merged.toolchain.cc, Some(PathBuf::from("/usr/bin/clang")));
        // cflags not set in project, so global survives
        assert_eq!(merged.toolchain.cflags, vec!["-O2".to_string()]);
    }

    #[test]
    fn test_parse_ldflags() {
        let config: ToolchainConfig =
            toml::from_str("[toolchain]\nldflags = [\"-L/opt/lib\"]\n").unwrap();
        assert!(config.has_overrides());
        assert_eq!(config.toolchain.ldflags, vec!["-L/opt/lib".to_string()]);
    }
}
