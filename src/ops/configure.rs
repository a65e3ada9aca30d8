//! The configure operation: detect, resolve, emit.
//!
//! This is the engine's top-level entry point. It wires the components
//! together in their required order (platform detection runs to
//! completion before resolution starts; emission is purely
//! deterministic) and reports progress through the caller's `Reporter`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::{builtin, load_catalog_file};
use crate::emit::{emit, write_artifacts, Layout};
use crate::platform::{detect_platform, Overrides, PlatformFacts};
use crate::probe::CompilerProber;
use crate::resolver::{resolve, DroppedModule, ResolveRequest};
use crate::toolchain::detect_toolchain;
use crate::util::diagnostic::{Diagnostic, Reporter};
use crate::util::InternedString;

/// Everything the caller decides about a configure run. Built by the
/// CLI layer; plain data as far as the engine is concerned.
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    /// Explicitly requested modules.
    pub modules: Vec<String>,
    /// Features to record as present regardless of probing.
    pub enable_features: Vec<String>,
    /// Features to record as absent regardless of probing.
    pub disable_features: Vec<String>,
    /// Project root.
    pub source_root: PathBuf,
    /// Build directory for artifacts and objects.
    pub build_dir: PathBuf,
    /// Basename of the linked executable.
    pub output_name: String,
    /// Optional project catalog file, appended to the built-in catalog.
    pub catalog_file: Option<PathBuf>,
}

impl ConfigureRequest {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        let source_root = source_root.into();
        let build_dir = source_root.join("build");
        ConfigureRequest {
            modules: Vec::new(),
            enable_features: Vec::new(),
            disable_features: Vec::new(),
            source_root,
            build_dir,
            output_name: "app".to_string(),
            catalog_file: None,
        }
    }
}

/// Summary of a successful configure run.
#[derive(Debug)]
pub struct ConfigureOutcome {
    /// The detected platform facts.
    pub facts: PlatformFacts,
    /// Modules included in the build plan, in dependency order.
    pub included: Vec<InternedString>,
    /// Optional modules dropped, with causes.
    pub dropped: Vec<DroppedModule>,
    /// Where the build plan was written.
    pub plan_path: PathBuf,
    /// Where the capability header was written.
    pub header_path: PathBuf,
    /// Number of distinct probes the run compiled.
    pub probes_run: usize,
}

/// Run a full configure: load the catalog, detect the platform, resolve
/// the module graph, emit and write both artifacts.
///
/// The run produces both artifacts or neither. Dropped optional modules
/// are reported as warnings but leave the run successful; a failed
/// explicit module or an unusable toolchain aborts it.
pub fn configure(request: &ConfigureRequest, reporter: &dyn Reporter) -> Result<ConfigureOutcome> {
    let mut catalog = builtin();
    if let Some(ref path) = request.catalog_file {
        load_catalog_file(&mut catalog, path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
    }

    let toolchain = detect_toolchain().map_err(|e| {
        reporter.report(&e.to_diagnostic());
        anyhow::Error::from(e)
    })?;

    let prober = CompilerProber::new(toolchain.clone());

    let overrides = Overrides {
        enable: request.enable_features.iter().map(InternedString::new).collect(),
        disable: request
            .disable_features
            .iter()
            .map(InternedString::new)
            .collect(),
    };

    let facts = detect_platform(&catalog, &toolchain, &prober, &overrides).map_err(|e| {
        reporter.report(&e.to_diagnostic());
        anyhow::Error::from(e)
    })?;

    tracing::info!("platform: {}", facts.summary());

    let resolve_request = ResolveRequest::new(request.modules.iter().map(String::as_str));
    let graph = resolve(&resolve_request, &catalog, &facts, &prober).map_err(|e| {
        reporter.report(&e.to_diagnostic());
        anyhow::Error::from(e)
    })?;

    for drop in graph.dropped() {
        reporter.report(
            &Diagnostic::warning(format!("skipping optional module `{}`", drop.name))
                .with_context(drop.cause.to_string()),
        );
    }

    let layout = Layout::new(&request.source_root, &request.build_dir)
        .with_output_name(&request.output_name);

    let (plan, header) = emit(&graph, &facts, &catalog, &layout)?;
    let (plan_path, header_path) = write_artifacts(&plan, &header, &facts, &layout)?;

    reporter.report(&Diagnostic::note(format!(
        "configured {} module(s), {} compile step(s), {} symbol(s)",
        graph.len(),
        plan.compile_count(),
        header.len()
    )));

    Ok(ConfigureOutcome {
        facts,
        included: graph.modules().to_vec(),
        dropped: graph.dropped().to_vec(),
        plan_path,
        header_path,
        probes_run: prober.probes_run(),
    })
}
