//! Build plan and capability header emission.
//!
//! The emitter is the last, purely deterministic stage: given the
//! resolved graph and the detected facts, it produces the two coupled
//! artifacts of a run. Identical inputs yield byte-identical artifacts:
//! no timestamps, no absolute paths, no unordered iteration.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::catalog::Catalog;
use crate::platform::PlatformFacts;
use crate::resolver::ResolvedGraph;
use crate::util::fs::{glob_files, relative_path};
use crate::util::InternedString;

mod header;
mod plan;

pub use header::{CapabilityHeader, SymbolValue};
pub use plan::{BuildPlan, BuildStep, StepKind};

/// Where the emitted artifacts and intermediate objects live, relative
/// to the project root.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Project root; source globs resolve against this.
    pub source_root: PathBuf,
    /// Build directory, inside the project root (e.g. `build`).
    pub build_dir: PathBuf,
    /// Basename of the linked executable.
    pub output_name: String,
}

impl Layout {
    pub fn new(source_root: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Layout {
            source_root: source_root.into(),
            build_dir: build_dir.into(),
            output_name: "app".to_string(),
        }
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Build directory relative to the project root, as used in
    /// emitted paths.
    fn build_rel(&self) -> PathBuf {
        relative_path(&self.source_root, &self.build_dir)
    }

    /// Absolute path of the emitted plan file.
    pub fn plan_path(&self) -> PathBuf {
        self.build_dir.join("build.plan")
    }

    /// Absolute path of the emitted capability header.
    pub fn header_path(&self) -> PathBuf {
        self.build_dir.join("drydock_config.h")
    }
}

/// Emit the build plan and the capability header for a resolved graph.
///
/// Modules are processed in the graph's topological order: one compile
/// step per source file, then a single link step over every object in
/// the same order.
pub fn emit(
    graph: &ResolvedGraph,
    facts: &PlatformFacts,
    catalog: &Catalog,
    layout: &Layout,
) -> Result<(BuildPlan, CapabilityHeader)> {
    let family = facts.compiler();
    let build_rel = layout.build_rel();
    let obj_ext = family.object_extension();

    let base_flags: Vec<String> = {
        let mut flags = family.base_cflags();
        flags.push(family.include_flag(&build_rel));
        flags
    };

    let mut steps: Vec<BuildStep> = Vec::new();
    let mut objects: Vec<PathBuf> = Vec::new();
    let mut link_libs: Vec<InternedString> = Vec::new();

    for &name in graph.modules() {
        let spec = catalog
            .module(name)
            .expect("resolved module exists in catalog");

        let sources = glob_files(&layout.source_root, &spec.sources)?;
        if sources.is_empty() && !spec.sources.is_empty() {
            tracing::warn!("module `{}` matched no source files", name);
        }

        for source in sources {
            let rel_source = relative_path(&layout.source_root, &source);
            let object = object_path_for(&build_rel, name.as_str(), &rel_source, obj_ext);

            steps.push(BuildStep {
                kind: StepKind::Compile,
                inputs: vec![rel_source],
                output: object.clone(),
                flags: base_flags.clone(),
                module: name,
            });
            objects.push(object);
        }

        for lib in &spec.required_libraries {
            if !link_libs.contains(lib) {
                link_libs.push(*lib);
            }
        }
    }

    if !objects.is_empty() {
        let exe_ext = family.exe_extension();
        let output_file = if exe_ext.is_empty() {
            layout.output_name.clone()
        } else {
            format!("{}.{}", layout.output_name, exe_ext)
        };

        steps.push(BuildStep {
            kind: StepKind::Link,
            inputs: objects,
            output: build_rel.join("bin").join(output_file),
            flags: link_libs
                .iter()
                .map(|lib| family.lib_flag(lib))
                .collect(),
            module: InternedString::default(),
        });
    }

    let plan = BuildPlan {
        steps,
        module_order: graph.modules().to_vec(),
    };

    let header = build_header(graph, facts, catalog);

    Ok((plan, header))
}

/// Map detected features and included modules to header symbols.
///
/// Features appear in catalog declaration order, modules in topological
/// order; duplicate symbol names keep the first definition.
fn build_header(
    graph: &ResolvedGraph,
    facts: &PlatformFacts,
    catalog: &Catalog,
) -> CapabilityHeader {
    let mut header = CapabilityHeader::new();

    header.push(
        format!("DRYDOCK_OS_{}", facts.os_family().as_str().to_uppercase()),
        SymbolValue::Int(1),
    );
    header.push(
        "DRYDOCK_WORD_SIZE",
        SymbolValue::Int(i64::from(facts.word_size().bits())),
    );

    for feature in catalog.features() {
        if facts.has_feature(feature.id) {
            header.push(feature.symbol(), SymbolValue::Int(1));
        }
    }

    for &name in graph.modules() {
        if let Some(spec) = catalog.module(name) {
            header.push(spec.symbol(), SymbolValue::Int(1));
        }
    }

    header
}

/// Write both artifacts, or neither.
///
/// Both renderings are staged to temp files in the build directory
/// first; persisting happens only after both stages succeeded, so a
/// failure cannot leave the plan and header inconsistent with each
/// other.
pub fn write_artifacts(
    plan: &BuildPlan,
    header: &CapabilityHeader,
    facts: &PlatformFacts,
    layout: &Layout,
) -> Result<(PathBuf, PathBuf)> {
    use std::io::Write;

    let plan_text = plan.render(facts.compiler());
    let header_text = header.render();

    let plan_path = layout.plan_path();
    let header_path = layout.header_path();

    crate::util::fs::ensure_dir(&layout.build_dir)?;

    let mut plan_tmp = tempfile::NamedTempFile::new_in(&layout.build_dir)?;
    plan_tmp.write_all(plan_text.as_bytes())?;
    let mut header_tmp = tempfile::NamedTempFile::new_in(&layout.build_dir)?;
    header_tmp.write_all(header_text.as_bytes())?;

    plan_tmp
        .persist(&plan_path)
        .map_err(|e| anyhow::anyhow!("failed to persist {}: {}", plan_path.display(), e))?;
    header_tmp
        .persist(&header_path)
        .map_err(|e| anyhow::anyhow!("failed to persist {}: {}", header_path.display(), e))?;

    Ok((plan_path, header_path))
}

/// Object path for one source file: `<build>/obj/<module>/<source>.<ext>`.
fn object_path_for(build_rel: &Path, module: &str, rel_source: &Path, obj_ext: &str) -> PathBuf {
    build_rel
        .join("obj")
        .join(module)
        .join(rel_source.with_extension(obj_ext))
}
