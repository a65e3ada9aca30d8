//! Toolchain abstraction for C compilers.
//!
//! This module provides a unified interface for generating compiler/linker
//! arguments across different toolchains (GCC, Clang, MSVC).
//!
//! Toolchain detection priority:
//! 1. Toolchain config file (`.drydock/toolchain.toml` or `~/.drydock/toolchain.toml`)
//! 2. Environment variables (CC, AR)
//! 3. Auto-detection (searching PATH for common compilers)

use std::path::{Path, PathBuf};

use semver::Version;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

mod detect;

pub use detect::detect_toolchain;

/// The environment is unusable: no compiler, or a compiler that cannot
/// be invoked at all. Always fatal; a run never degrades this into
/// "every feature is absent".
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("no C compiler found")]
    CompilerNotFound { searched: Vec<String> },

    #[error("compiler `{compiler}` cannot be invoked: {message}")]
    CompilerUnusable { compiler: PathBuf, message: String },

    #[error("compiler `{compiler}` failed its sanity check")]
    SanityCheckFailed {
        compiler: PathBuf,
        diagnostic: String,
    },
}

impl EnvironmentError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EnvironmentError::CompilerNotFound { searched } => {
                Diagnostic::error("no C compiler found")
                    .with_context(format!("searched for: {}", searched.join(", ")))
                    .with_suggestion(suggestions::NO_COMPILER)
                    .with_suggestion("Configure one with `.drydock/toolchain.toml`")
            }
            EnvironmentError::CompilerUnusable { compiler, message } => {
                Diagnostic::error(format!("cannot invoke `{}`", compiler.display()))
                    .with_context(message.clone())
                    .with_suggestion("Check that the configured compiler path is executable")
            }
            EnvironmentError::SanityCheckFailed {
                compiler,
                diagnostic,
            } => Diagnostic::error(format!(
                "`{}` cannot compile a minimal program",
                compiler.display()
            ))
            .with_context(diagnostic.clone())
            .with_suggestion("Verify the compiler installation (missing headers or runtime?)"),
        }
    }
}

/// The family of a compiler, which decides the argument dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompilerFamily {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
}

impl CompilerFamily {
    /// Stable identifier used in facts and artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
        }
    }

    /// Whether this family speaks the MSVC argument dialect.
    pub fn is_msvc_dialect(&self) -> bool {
        matches!(self, CompilerFamily::Msvc)
    }

    /// Object file extension (without dot).
    pub fn object_extension(&self) -> &'static str {
        if self.is_msvc_dialect() {
            "obj"
        } else {
            "o"
        }
    }

    /// Executable file extension (without dot), empty on Unix.
    pub fn exe_extension(&self) -> &'static str {
        if self.is_msvc_dialect() {
            "exe"
        } else {
            ""
        }
    }

    /// Flag for a preprocessor define.
    pub fn define_flag(&self, name: &str, value: Option<&str>) -> String {
        let prefix = if self.is_msvc_dialect() { "/D" } else { "-D" };
        match value {
            Some(v) => format!("{}{}={}", prefix, name, v),
            None => format!("{}{}", prefix, name),
        }
    }

    /// Flag for an include directory.
    pub fn include_flag(&self, dir: &Path) -> String {
        if self.is_msvc_dialect() {
            format!("/I{}", dir.display())
        } else {
            format!("-I{}", dir.display())
        }
    }

    /// Flag requesting compile-only (no link).
    pub fn compile_only_flag(&self) -> &'static str {
        if self.is_msvc_dialect() {
            "/c"
        } else {
            "-c"
        }
    }

    /// Flags naming the object file output.
    pub fn object_output_flags(&self, output: &Path) -> Vec<String> {
        if self.is_msvc_dialect() {
            vec![format!("/Fo{}", output.display())]
        } else {
            vec!["-o".to_string(), output.display().to_string()]
        }
    }

    /// Flags naming the executable output.
    pub fn exe_output_flags(&self, output: &Path) -> Vec<String> {
        if self.is_msvc_dialect() {
            vec![format!("/Fe{}", output.display())]
        } else {
            vec!["-o".to_string(), output.display().to_string()]
        }
    }

    /// Flag linking a named system library.
    pub fn lib_flag(&self, name: &str) -> String {
        if self.is_msvc_dialect() {
            format!("{}.lib", name)
        } else {
            format!("-l{}", name)
        }
    }

    /// Baseline compile flags for generated build plans.
    pub fn base_cflags(&self) -> Vec<String> {
        if self.is_msvc_dialect() {
            vec!["/nologo".to_string(), "/O2".to_string(), "/W3".to_string()]
        } else {
            vec!["-O2".to_string(), "-Wall".to_string()]
        }
    }
}

impl std::fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command to execute: program plus arguments.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }
}

/// A detected C toolchain.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Path to the C compiler
    pub cc: PathBuf,
    /// Path to the archiver, when one was found
    pub ar: Option<PathBuf>,
    /// Compiler family (decides the argument dialect)
    pub family: CompilerFamily,
    /// Compiler version, when it could be parsed
    pub version: Option<Version>,
    /// Extra compile flags from the toolchain config
    pub extra_cflags: Vec<String>,
    /// Extra link flags from the toolchain config
    pub extra_ldflags: Vec<String>,
}

impl Toolchain {
    /// Command that compiles `source` to `output` without linking.
    pub fn compile_object_command(
        &self,
        source: &Path,
        output: &Path,
        defines: &[(String, Option<String>)],
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cc);
        cmd = cmd.arg(self.family.compile_only_flag());
        for (name, value) in defines {
            cmd = cmd.arg(self.family.define_flag(name, value.as_deref()));
        }
        cmd = cmd.args(self.extra_cflags.iter().cloned());
        cmd = cmd.arg(source.display().to_string());
        cmd = cmd.args(self.family.object_output_flags(output));
        cmd
    }

    /// Command that compiles and links `source` into the executable `output`.
    pub fn compile_exe_command(
        &self,
        source: &Path,
        output: &Path,
        defines: &[(String, Option<String>)],
        libraries: &[String],
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cc);
        for (name, value) in defines {
            cmd = cmd.arg(self.family.define_flag(name, value.as_deref()));
        }
        cmd = cmd.args(self.extra_cflags.iter().cloned());
        cmd = cmd.arg(source.display().to_string());
        cmd = cmd.args(self.family.exe_output_flags(output));
        // Libraries go after the source file so undefined references resolve
        for lib in libraries {
            cmd = cmd.arg(self.family.lib_flag(lib));
        }
        cmd = cmd.args(self.extra_ldflags.iter().cloned());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcc() -> Toolchain {
        Toolchain {
            cc: PathBuf::from("gcc"),
            ar: Some(PathBuf::from("ar")),
            family: CompilerFamily::Gcc,
            version: None,
            extra_cflags: vec![],
            extra_ldflags: vec![],
        }
    }

    #[test]
    fn test_gcc_compile_object_command() {
        let cmd = gcc().compile_object_command(
            Path::new("probe.c"),
            Path::new("probe.o"),
            &[
                ("_FILE_OFFSET_BITS".to_string(), Some("64".to_string())),
                ("NDEBUG".to_string(), None),
            ],
        );

        assert_eq!(cmd.program, PathBuf::from("gcc"));
        assert!(cmd.args.contains(&"-c".to_string()));
        assert!(cmd.args.contains(&"-D_FILE_OFFSET_BITS=64".to_string()));
        assert!(cmd.args.contains(&"-DNDEBUG".to_string()));
        assert!(cmd.args.contains(&"-o".to_string()));
    }

    #[test]
    fn test_gcc_link_command_orders_libs_last() {
        let cmd = gcc().compile_exe_command(
            Path::new("probe.c"),
            Path::new("probe"),
            &[],
            &["z".to_string(), "m".to_string()],
        );

        let src_pos = cmd.args.iter().position(|a| a == "probe.c").unwrap();
        let lib_pos = cmd.args.iter().position(|a| a == "-lz").unwrap();
        assert!(src_pos < lib_pos);
        assert!(cmd.args.contains(&"-lm".to_string()));
    }

    #[test]
    fn test_msvc_dialect() {
        let family = CompilerFamily::Msvc;
        assert_eq!(family.object_extension(), "obj");
        assert_eq!(family.define_flag("VERSION", Some("1")), "/DVERSION=1");
        assert_eq!(family.include_flag(Path::new("C:/include")), "/IC:/include");
        assert_eq!(family.lib_flag("z"), "z.lib");
        assert_eq!(
            family.object_output_flags(Path::new("a.obj")),
            vec!["/Foa.obj".to_string()]
        );
    }

    #[test]
    fn test_family_identifiers() {
        assert_eq!(CompilerFamily::Gcc.as_str(), "gcc");
        assert_eq!(CompilerFamily::AppleClang.as_str(), "apple-clang");
        assert!(!CompilerFamily::Clang.is_msvc_dialect());
    }
}
