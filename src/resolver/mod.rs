//! Module graph resolution.
//!
//! Starting from the requested module set (plus optional default-on
//! modules), resolution expands module requirements into a closed,
//! acyclic, dependency-ordered graph. Every module in the result has all
//! of its required modules in the graph and all of its required features
//! and libraries satisfied by the detected platform facts.
//!
//! Optional modules that were not explicitly requested are silently
//! dropped when unsatisfiable (the drop is recorded); explicitly
//! requested modules are a hard error.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;

use crate::catalog::{Catalog, LibraryProbe, ModuleSpec};
use crate::platform::PlatformFacts;
use crate::probe::{ProbeProgram, Prober};
use crate::util::InternedString;

mod errors;

pub use errors::{Requirement, ResolveError, UnmetRequirement};

/// The module set the caller asked for, in request order.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub modules: Vec<InternedString>,
}

impl ResolveRequest {
    pub fn new(modules: impl IntoIterator<Item = impl Into<InternedString>>) -> Self {
        ResolveRequest {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }
}

/// An optional module excluded from the graph, and why.
#[derive(Debug, Clone)]
pub struct DroppedModule {
    pub name: InternedString,
    pub cause: UnmetRequirement,
}

/// The resolved module graph. Immutable once built; the emitter only
/// reads it.
#[derive(Debug)]
pub struct ResolvedGraph {
    graph: DiGraph<InternedString, ()>,
    node_index: HashMap<InternedString, NodeIndex>,
    topo: Vec<InternedString>,
    dropped: Vec<DroppedModule>,
}

impl ResolvedGraph {
    /// Included modules in dependency order (dependencies first). Ties
    /// are broken by catalog declaration order, so the order is stable
    /// across runs on identical inputs.
    pub fn modules(&self) -> &[InternedString] {
        &self.topo
    }

    /// Whether a module made it into the graph.
    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.node_index.contains_key(name.as_ref())
    }

    /// Direct dependencies of a module.
    pub fn deps(&self, name: impl AsRef<str>) -> Vec<InternedString> {
        match self.node_index.get(name.as_ref()) {
            Some(&node) => {
                let mut deps: Vec<_> = self
                    .graph
                    .neighbors_directed(node, petgraph::Direction::Outgoing)
                    .map(|n| self.graph[n])
                    .collect();
                deps.sort();
                deps
            }
            None => Vec::new(),
        }
    }

    /// Optional modules that were dropped, with their causes.
    pub fn dropped(&self) -> &[DroppedModule] {
        &self.dropped
    }

    pub fn len(&self) -> usize {
        self.topo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topo.is_empty()
    }
}

/// Resolve the requested modules against the catalog and detected facts.
///
/// Library requirements not already covered by platform detection are
/// probed here, in parallel, through the same prober.
pub fn resolve(
    request: &ResolveRequest,
    catalog: &Catalog,
    facts: &PlatformFacts,
    prober: &dyn Prober,
) -> Result<ResolvedGraph, ResolveError> {
    // Requesting a module that does not exist is an input error, not a
    // requirement failure of some other module.
    for name in &request.modules {
        if catalog.module(name).is_none() {
            return Err(ResolveError::UnknownModule { module: *name });
        }
    }

    let explicit: HashSet<InternedString> = request.modules.iter().copied().collect();

    // Roots: explicit modules in request order, then default-on optional
    // modules in catalog declaration order.
    let mut roots: Vec<InternedString> = request.modules.clone();
    for module in catalog.default_modules() {
        if !explicit.contains(&module.name) {
            roots.push(module.name);
        }
    }

    let mut walker = Walker {
        catalog,
        facts,
        prober,
        libraries: HashMap::new(),
        marks: HashMap::new(),
        stack: Vec::new(),
    };

    let mut accepted: Vec<InternedString> = Vec::new();
    let mut dropped: Vec<DroppedModule> = Vec::new();

    for root in roots {
        match walker.visit(root)? {
            None => accepted.push(root),
            Some(unmet) => {
                if explicit.contains(&root) {
                    return Err(ResolveError::UnsatisfiedDependency { unmet });
                }
                tracing::info!("dropping optional module `{}`: {}", root, unmet);
                dropped.push(DroppedModule {
                    name: root,
                    cause: unmet,
                });
            }
        }
    }

    Ok(build_graph(catalog, &accepted, dropped))
}

/// Three-color satisfiability walk over the module requirement graph.
struct Walker<'a> {
    catalog: &'a Catalog,
    facts: &'a PlatformFacts,
    prober: &'a dyn Prober,
    /// Memoized library availability: name -> (available, probe diagnostics).
    libraries: HashMap<InternedString, (bool, Vec<String>)>,
    marks: HashMap<InternedString, Mark>,
    stack: Vec<InternedString>,
}

#[derive(Debug, Clone)]
enum Mark {
    InProgress,
    Satisfied,
    Unsatisfied(UnmetRequirement),
}

impl<'a> Walker<'a> {
    /// Returns `None` when the module and its whole requirement subtree
    /// are satisfiable, or the deepest unmet requirement otherwise.
    fn visit(&mut self, name: InternedString) -> Result<Option<UnmetRequirement>, ResolveError> {
        match self.marks.get(&name) {
            Some(Mark::Satisfied) => return Ok(None),
            Some(Mark::Unsatisfied(unmet)) => return Ok(Some(unmet.clone())),
            Some(Mark::InProgress) => {
                // Back-edge to an in-progress module: a cycle. Report
                // the path from the repeated module back to itself.
                let start = self
                    .stack
                    .iter()
                    .position(|m| *m == name)
                    .unwrap_or_default();
                let mut path: Vec<InternedString> = self.stack[start..].to_vec();
                path.push(name);
                return Err(ResolveError::Cycle { path });
            }
            None => {}
        }

        self.marks.insert(name, Mark::InProgress);
        self.stack.push(name);
        let outcome = self.visit_requirements(name);
        self.stack.pop();

        match outcome {
            Ok(None) => {
                self.marks.insert(name, Mark::Satisfied);
                Ok(None)
            }
            Ok(Some(unmet)) => {
                self.marks.insert(name, Mark::Unsatisfied(unmet.clone()));
                Ok(Some(unmet))
            }
            Err(e) => Err(e),
        }
    }

    fn visit_requirements(
        &mut self,
        name: InternedString,
    ) -> Result<Option<UnmetRequirement>, ResolveError> {
        let spec = self
            .catalog
            .module(name)
            .expect("visited module exists in catalog")
            .clone();

        for feature in &spec.required_features {
            if !self.facts.has_feature(feature) {
                return Ok(Some(UnmetRequirement {
                    module: name,
                    missing: Requirement::Feature(*feature),
                    tried: vec![format!(
                        "feature `{}` was not detected on this platform",
                        feature
                    )],
                }));
            }
        }

        if let Some(unmet) = self.check_libraries(name, &spec)? {
            return Ok(Some(unmet));
        }

        for dep in &spec.required_modules {
            if self.catalog.module(dep).is_none() {
                return Ok(Some(UnmetRequirement {
                    module: name,
                    missing: Requirement::Module(*dep),
                    tried: vec![format!("module `{}` is not in the catalog", dep)],
                }));
            }
            if let Some(unmet) = self.visit(*dep)? {
                return Ok(Some(unmet));
            }
        }

        Ok(None)
    }

    /// Check a module's library requirements, running any needed fresh
    /// probes in parallel and merging the results into the memo before
    /// judging availability.
    fn check_libraries(
        &mut self,
        module: InternedString,
        spec: &ModuleSpec,
    ) -> Result<Option<UnmetRequirement>, ResolveError> {
        // Plan first: which libraries need a fresh probe?
        let mut pending: Vec<(InternedString, ProbeProgram)> = Vec::new();
        for lib in &spec.required_libraries {
            if self.libraries.contains_key(lib) {
                continue;
            }

            match self.catalog.library(lib).map(|def| def.probe.clone()) {
                Some(LibraryProbe::Feature(feature_id)) => {
                    if self.facts.has_feature(feature_id) {
                        self.libraries.insert(*lib, (true, Vec::new()));
                    } else if let Some(feature) = self.catalog.feature(feature_id) {
                        // Not covered by platform detection; probe fresh.
                        pending.push((*lib, feature.probe_program(self.facts.os_family())));
                    } else {
                        self.libraries.insert(
                            *lib,
                            (
                                false,
                                vec![format!(
                                    "library `{}` is gated on unknown feature `{}`",
                                    lib, feature_id
                                )],
                            ),
                        );
                    }
                }
                Some(LibraryProbe::LinkCheck) | None => {
                    pending.push((*lib, ProbeProgram::link_check(lib)));
                }
            }
        }

        if !pending.is_empty() {
            let reports = pending
                .par_iter()
                .map(|(lib, program)| self.prober.probe(program).map(|r| (*lib, r)))
                .collect::<Result<Vec<_>, _>>()?;

            for (lib, report) in reports {
                let tried = if report.succeeded {
                    Vec::new()
                } else {
                    vec![format!(
                        "probe for library `{}` failed: {}",
                        lib,
                        report.diagnostic.trim()
                    )]
                };
                self.libraries.insert(lib, (report.succeeded, tried));
            }
        }

        for lib in &spec.required_libraries {
            let (available, tried) = self
                .libraries
                .get(lib)
                .expect("library availability memoized above");
            if !available {
                return Ok(Some(UnmetRequirement {
                    module,
                    missing: Requirement::Library(*lib),
                    tried: tried.clone(),
                }));
            }
        }

        Ok(None)
    }
}

/// Assemble the graph over the accepted closure and compute the stable
/// topological order.
fn build_graph(
    catalog: &Catalog,
    accepted_roots: &[InternedString],
    dropped: Vec<DroppedModule>,
) -> ResolvedGraph {
    let mut graph: DiGraph<InternedString, ()> = DiGraph::new();
    let mut node_index: HashMap<InternedString, NodeIndex> = HashMap::new();

    // Collect the closure over required_modules.
    let mut queue: Vec<InternedString> = accepted_roots.to_vec();
    while let Some(name) = queue.pop() {
        if node_index.contains_key(&name) {
            continue;
        }
        let node = graph.add_node(name);
        node_index.insert(name, node);

        let spec = catalog.module(name).expect("accepted module in catalog");
        queue.extend(spec.required_modules.iter().copied());
    }

    // Edges: dependent -> dependency.
    for (&name, &node) in &node_index {
        let spec = catalog.module(name).expect("accepted module in catalog");
        for dep in &spec.required_modules {
            let dep_node = node_index[dep];
            if !graph.contains_edge(node, dep_node) {
                graph.add_edge(node, dep_node, ());
            }
        }
    }

    // Kahn's algorithm, dependencies first. The ready set is keyed by
    // catalog declaration index so ties always break the same way.
    let mut remaining: HashMap<InternedString, usize> = HashMap::new();
    let mut ready: BTreeSet<(usize, InternedString)> = BTreeSet::new();

    for (&name, &node) in &node_index {
        let deps = graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
            .count();
        remaining.insert(name, deps);
        if deps == 0 {
            let decl = catalog.module_decl_index(name).unwrap_or(usize::MAX);
            ready.insert((decl, name));
        }
    }

    let mut topo: Vec<InternedString> = Vec::with_capacity(node_index.len());
    while let Some(&(decl, name)) = ready.iter().next() {
        ready.remove(&(decl, name));
        topo.push(name);

        let node = node_index[&name];
        for dependent in graph.neighbors_directed(node, petgraph::Direction::Incoming) {
            let dep_name = graph[dependent];
            let count = remaining
                .get_mut(&dep_name)
                .expect("dependent tracked in remaining");
            *count -= 1;
            if *count == 0 {
                let decl = catalog.module_decl_index(dep_name).unwrap_or(usize::MAX);
                ready.insert((decl, dep_name));
            }
        }
    }

    debug_assert_eq!(topo.len(), node_index.len(), "closure is acyclic");

    ResolvedGraph {
        graph,
        node_index,
        topo,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Applicability, FeatureDef, LibraryDef};
    use crate::platform::{OsFamily, WordSize};
    use crate::probe::ProbeKind;
    use crate::test_support::FakeProber;
    use crate::toolchain::CompilerFamily;

    fn feature(id: &str) -> FeatureDef {
        FeatureDef {
            id: InternedString::new(id),
            applies_to: Applicability::Any,
            kind: ProbeKind::Link,
            source: "int main(void){return 0;}\n".to_string(),
            defines: vec![],
            os_defines: vec![],
            libraries: vec![],
            symbol: None,
        }
    }

    fn module(name: &str) -> ModuleSpec {
        ModuleSpec {
            name: InternedString::new(name),
            sources: vec![format!("src/{}/*.c", name)],
            ..Default::default()
        }
    }

    fn facts_with(features: &[&str]) -> PlatformFacts {
        PlatformFacts::new(
            OsFamily::Unix,
            "x86_64",
            WordSize::Bits64,
            CompilerFamily::Gcc,
            None,
            features.iter().map(InternedString::new).collect(),
        )
    }

    #[test]
    fn test_simple_request_resolves() {
        let mut catalog = Catalog::new();
        catalog.add_feature(feature("f1")).unwrap();
        let mut m1 = module("m1");
        m1.required_features = vec![InternedString::new("f1")];
        catalog.add_module(m1).unwrap();

        let graph = resolve(
            &ResolveRequest::new(["m1"]),
            &catalog,
            &facts_with(&["f1"]),
            &FakeProber::new(),
        )
        .unwrap();

        assert!(graph.contains("m1"));
        assert_eq!(graph.len(), 1);
        assert!(graph.dropped().is_empty());
    }

    #[test]
    fn test_missing_dep_module_is_hard_error() {
        // Scenario: m2 requires m3, which is not in the catalog.
        let mut catalog = Catalog::new();
        let mut m2 = module("m2");
        m2.required_modules = vec![InternedString::new("m3")];
        catalog.add_module(m2).unwrap();

        let err = resolve(
            &ResolveRequest::new(["m2"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap_err();

        match err {
            ResolveError::UnsatisfiedDependency { unmet } => {
                assert_eq!(unmet.module.as_str(), "m2");
                assert_eq!(
                    unmet.missing,
                    Requirement::Module(InternedString::new("m3"))
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_cycle_reports_path() {
        let mut catalog = Catalog::new();
        let mut a = module("a");
        a.required_modules = vec![InternedString::new("b")];
        let mut b = module("b");
        b.required_modules = vec![InternedString::new("a")];
        catalog.add_module(a).unwrap();
        catalog.add_module(b).unwrap();

        let err = resolve(
            &ResolveRequest::new(["a"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap_err();

        match err {
            ResolveError::Cycle { path } => {
                let names: Vec<&str> = path.iter().map(|m| m.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_optional_default_module_dropped_silently() {
        // Scenario: optional m4 requires feature f2 which probes false.
        let mut catalog = Catalog::new();
        catalog.add_feature(feature("f2")).unwrap();
        let mut m4 = module("m4");
        m4.required_features = vec![InternedString::new("f2")];
        m4.optional = true;
        m4.default_on = true;
        catalog.add_module(m4).unwrap();

        let graph = resolve(
            &ResolveRequest::default(),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap();

        assert!(!graph.contains("m4"));
        assert_eq!(graph.dropped().len(), 1);
        assert_eq!(graph.dropped()[0].name.as_str(), "m4");
    }

    #[test]
    fn test_optional_module_explicitly_requested_is_hard_error() {
        let mut catalog = Catalog::new();
        catalog.add_feature(feature("f2")).unwrap();
        let mut m4 = module("m4");
        m4.required_features = vec![InternedString::new("f2")];
        m4.optional = true;
        catalog.add_module(m4).unwrap();

        let err = resolve(
            &ResolveRequest::new(["m4"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap_err();

        match err {
            ResolveError::UnsatisfiedDependency { unmet } => {
                assert_eq!(unmet.module.as_str(), "m4");
                assert_eq!(
                    unmet.missing,
                    Requirement::Feature(InternedString::new("f2"))
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_requested_module() {
        let catalog = Catalog::new();
        let err = resolve(
            &ResolveRequest::new(["ghost"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap_err();

        assert!(matches!(err, ResolveError::UnknownModule { .. }));
    }

    #[test]
    fn test_library_link_check_runs_fresh_probe() {
        let mut catalog = Catalog::new();
        catalog
            .add_library(LibraryDef {
                name: InternedString::new("z"),
                probe: LibraryProbe::LinkCheck,
            })
            .unwrap();
        let mut m = module("lz_stream");
        m.required_libraries = vec![InternedString::new("z")];
        catalog.add_module(m).unwrap();

        let prober = FakeProber::new().with_success("lib_z");
        let graph = resolve(
            &ResolveRequest::new(["lz_stream"]),
            &catalog,
            &facts_with(&[]),
            &prober,
        )
        .unwrap();

        assert!(graph.contains("lz_stream"));
        assert!(prober.probed_labels().contains(&"lib_z".to_string()));
    }

    #[test]
    fn test_library_unavailable_blocks_module() {
        let mut catalog = Catalog::new();
        let mut m = module("lz_stream");
        m.required_libraries = vec![InternedString::new("z")];
        catalog.add_module(m).unwrap();

        // Fake prober fails all probes by default
        let err = resolve(
            &ResolveRequest::new(["lz_stream"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap_err();

        match err {
            ResolveError::UnsatisfiedDependency { unmet } => {
                assert_eq!(unmet.missing, Requirement::Library(InternedString::new("z")));
                assert!(!unmet.tried.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_closure_soundness_and_topo_order() {
        // app -> (net, core), net -> core
        let mut catalog = Catalog::new();
        catalog.add_module(module("core")).unwrap();
        let mut net = module("net");
        net.required_modules = vec![InternedString::new("core")];
        catalog.add_module(net).unwrap();
        let mut app = module("app");
        app.required_modules =
            vec![InternedString::new("net"), InternedString::new("core")];
        catalog.add_module(app).unwrap();

        let graph = resolve(
            &ResolveRequest::new(["app"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap();

        // Closure soundness
        for name in graph.modules() {
            for dep in graph.deps(name) {
                assert!(graph.contains(dep));
            }
        }

        // Topological validity: dependencies strictly before dependents
        let position = |n: &str| {
            graph
                .modules()
                .iter()
                .position(|m| m.as_str() == n)
                .unwrap()
        };
        assert!(position("core") < position("net"));
        assert!(position("net") < position("app"));
    }

    #[test]
    fn test_topo_ties_break_by_declaration_order() {
        // Three independent modules; order must follow the catalog.
        let mut catalog = Catalog::new();
        catalog.add_module(module("zeta")).unwrap();
        catalog.add_module(module("alpha")).unwrap();
        catalog.add_module(module("mid")).unwrap();

        let graph = resolve(
            &ResolveRequest::new(["alpha", "zeta", "mid"]),
            &catalog,
            &facts_with(&[]),
            &FakeProber::new(),
        )
        .unwrap();

        let names: Vec<&str> = graph.modules().iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut catalog = Catalog::new();
        catalog.add_module(module("core")).unwrap();
        let mut net = module("net");
        net.required_modules = vec![InternedString::new("core")];
        catalog.add_module(net).unwrap();

        let request = ResolveRequest::new(["net"]);
        let facts = facts_with(&[]);

        let first = resolve(&request, &catalog, &facts, &FakeProber::new()).unwrap();
        let second = resolve(&request, &catalog, &facts, &FakeProber::new()).unwrap();

        assert_eq!(first.modules(), second.modules());
    }
}
