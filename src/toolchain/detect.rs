//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use semver::Version;

use crate::util::config::{
    global_toolchain_config_path, load_toolchain_config, project_toolchain_config_path,
    ToolchainConfig,
};

use super::{CompilerFamily, EnvironmentError, Toolchain};

/// Load toolchain configuration from config files.
///
/// Searches for config in this order:
/// 1. Project config (`.drydock/toolchain.toml` in current dir)
/// 2. Global config (`~/.drydock/toolchain.toml`)
fn load_toolchain_config_from_files() -> ToolchainConfig {
    let cwd = std::env::current_dir().unwrap_or_default();
    let project_path = project_toolchain_config_path(&cwd);
    let global_path = global_toolchain_config_path();

    if let Some(ref global) = global_path {
        load_toolchain_config(global, &project_path)
    } else {
        load_toolchain_config(&PathBuf::new(), &project_path)
    }
}

/// Detect the available toolchain.
///
/// Tries to find a C compiler with the following priority:
/// 1. Toolchain config file (`.drydock/toolchain.toml` or `~/.drydock/toolchain.toml`)
/// 2. Environment variables (CC, AR)
/// 3. Common compiler names on PATH (cc, gcc, clang, cl)
pub fn detect_toolchain() -> Result<Toolchain, EnvironmentError> {
    let config = load_toolchain_config_from_files();

    let cc = find_cc(&config)?;

    let ar = config
        .toolchain
        .ar
        .clone()
        .filter(|p| p.exists())
        .or_else(|| std::env::var("AR").ok().map(PathBuf::from))
        .or_else(|| which::which("ar").ok())
        .or_else(|| which::which("llvm-ar").ok())
        .or_else(|| which::which("lib").ok());

    let (family, version) = identify_compiler(&cc)?;

    tracing::info!(
        "using toolchain: cc={} ({}{})",
        cc.display(),
        family,
        version
            .as_ref()
            .map(|v| format!(" {}", v))
            .unwrap_or_default()
    );

    Ok(Toolchain {
        cc,
        ar,
        family,
        version,
        extra_cflags: config.toolchain.cflags,
        extra_ldflags: config.toolchain.ldflags,
    })
}

/// Find the C compiler from config, environment, or PATH.
fn find_cc(config: &ToolchainConfig) -> Result<PathBuf, EnvironmentError> {
    if let Some(ref cc) = config.toolchain.cc {
        if cc.exists() {
            return Ok(cc.clone());
        }
        tracing::warn!("configured C compiler not found: {}", cc.display());
    }

    if let Ok(cc_env) = std::env::var("CC") {
        // CC may be a bare name ("clang") or a full path
        let path = PathBuf::from(&cc_env);
        if path.is_absolute() && path.exists() {
            return Ok(path);
        }
        if let Ok(found) = which::which(&cc_env) {
            return Ok(found);
        }
        tracing::warn!("compiler from CC not found: {}", cc_env);
    }

    let candidates = ["cc", "gcc", "clang", "cl"];
    for name in candidates {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(EnvironmentError::CompilerNotFound {
        searched: candidates.iter().map(|s| s.to_string()).collect(),
    })
}

/// Identify compiler family and version from `--version` output.
///
/// A compiler that cannot even report its version is unusable; that is
/// an environment failure, not a probe negative.
fn identify_compiler(cc: &Path) -> Result<(CompilerFamily, Option<Version>), EnvironmentError> {
    // MSVC's cl.exe rejects --version but prints its banner to stderr on
    // any invocation, so a plain spawn is enough to read it.
    let name = cc
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    let output = if name == "cl" {
        std::process::Command::new(cc).output()
    } else {
        std::process::Command::new(cc).arg("--version").output()
    };

    let output = output.map_err(|e| EnvironmentError::CompilerUnusable {
        compiler: cc.to_path_buf(),
        message: e.to_string(),
    })?;

    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let lower = text.to_lowercase();

    let family = if lower.contains("microsoft") {
        CompilerFamily::Msvc
    } else if lower.contains("apple") && lower.contains("clang") {
        CompilerFamily::AppleClang
    } else if lower.contains("clang") {
        CompilerFamily::Clang
    } else if lower.contains("gcc") || lower.contains("free software foundation") {
        CompilerFamily::Gcc
    } else if name.contains("clang") {
        CompilerFamily::Clang
    } else {
        // Unrecognized banner; GCC dialect is the safest assumption
        CompilerFamily::Gcc
    };

    Ok((family, parse_version(&text)))
}

/// Pull the first version-looking token out of compiler banner text.
///
/// Handles "gcc (Debian 12.2.0-14) 12.2.0", "Apple clang version 15.0.0",
/// and MSVC's "Version 19.38.33130" (two- and four-part forms are padded
/// or truncated to semver's three parts).
fn parse_version(text: &str) -> Option<Version> {
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.');
        if token.is_empty() || !token.contains('.') {
            continue;
        }

        let parts: Vec<&str> = token.split('.').collect();
        if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
            continue;
        }

        let normalized = match parts.len() {
            2 => format!("{}.{}.0", parts[0], parts[1]),
            3 => token.to_string(),
            n if n > 3 => parts[..3].join("."),
            _ => continue,
        };

        if let Ok(v) = Version::parse(&normalized) {
            return Some(v);
        }
    }
    None
}
