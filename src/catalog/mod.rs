//! The feature and module catalog.
//!
//! The catalog is the closed registry of everything drydock knows how to
//! detect and build: probeable features, linkable libraries, and source
//! modules with their requirements. A platform quirk is a new catalog
//! entry, not new control flow.
//!
//! Declaration order matters: it breaks topological-sort ties and decides
//! which definition wins when two entries emit the same header symbol.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::platform::OsFamily;
use crate::probe::{ProbeKind, ProbeProgram};
use crate::util::InternedString;

mod builtin;
mod file;

pub use builtin::builtin;
pub use file::load_catalog_file;

/// Which OS families a feature probe is meaningful on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    /// Probe on every platform.
    Any,
    /// Probe only on the listed families.
    Only(Vec<OsFamily>),
}

impl Applicability {
    pub fn matches(&self, os: OsFamily) -> bool {
        match self {
            Applicability::Any => true,
            Applicability::Only(families) => families.contains(&os),
        }
    }
}

/// A probeable capability: fixed probe text plus the criteria for
/// running it.
#[derive(Debug, Clone)]
pub struct FeatureDef {
    /// Stable identifier (e.g. `large_file_support`).
    pub id: InternedString,
    /// Which OS families the probe applies to.
    pub applies_to: Applicability,
    /// Success criterion for the probe.
    pub kind: ProbeKind,
    /// C source of the probe program.
    pub source: String,
    /// Defines passed on every probe of this feature.
    pub defines: Vec<(String, Option<String>)>,
    /// Extra defines keyed by OS family; the probe text stays fixed and
    /// per-platform variation lives here.
    pub os_defines: Vec<(OsFamily, Vec<(String, Option<String>)>)>,
    /// Libraries the probe must link against.
    pub libraries: Vec<String>,
    /// Header symbol override; `HAVE_<ID>` when absent.
    pub symbol: Option<String>,
}

impl FeatureDef {
    /// The probe program for this feature on the given OS family.
    pub fn probe_program(&self, os: OsFamily) -> ProbeProgram {
        let mut defines = self.defines.clone();
        for (family, extra) in &self.os_defines {
            if *family == os {
                defines.extend(extra.iter().cloned());
            }
        }

        ProbeProgram {
            label: self.id,
            kind: self.kind,
            source: self.source.clone(),
            defines,
            libraries: self.libraries.clone(),
        }
    }

    /// The capability-header symbol this feature defines when detected.
    pub fn symbol(&self) -> String {
        self.symbol
            .clone()
            .unwrap_or_else(|| format!("HAVE_{}", sanitize_symbol(&self.id)))
    }
}

/// How a library's availability is established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryProbe {
    /// Available iff the named catalog feature was detected.
    Feature(InternedString),
    /// Available iff a trivial program links with `-l<name>`.
    LinkCheck,
}

/// A linkable system library.
#[derive(Debug, Clone)]
pub struct LibraryDef {
    pub name: InternedString,
    pub probe: LibraryProbe,
}

/// An optional, named unit of source files plus its requirements.
#[derive(Debug, Clone, Default)]
pub struct ModuleSpec {
    /// Module name.
    pub name: InternedString,
    /// Features that must be present in the detected facts.
    pub required_features: Vec<InternedString>,
    /// Libraries that must be available.
    pub required_libraries: Vec<InternedString>,
    /// Modules that must also be included.
    pub required_modules: Vec<InternedString>,
    /// Glob patterns for the module's sources, relative to the project root.
    pub sources: Vec<String>,
    /// Whether the module may be silently dropped when unsatisfiable.
    pub optional: bool,
    /// Whether an optional module is included without being requested.
    pub default_on: bool,
}

impl ModuleSpec {
    /// The capability-header symbol this module defines when included.
    pub fn symbol(&self) -> String {
        format!("WITH_{}", sanitize_symbol(&self.name))
    }
}

/// The full registry: features, libraries, and modules in declaration
/// order, with name indexes. Read-only during resolution.
#[derive(Debug, Default)]
pub struct Catalog {
    features: Vec<FeatureDef>,
    libraries: Vec<LibraryDef>,
    modules: Vec<ModuleSpec>,
    feature_index: HashMap<InternedString, usize>,
    library_index: HashMap<InternedString, usize>,
    module_index: HashMap<InternedString, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature. Duplicate ids are a catalog defect.
    pub fn add_feature(&mut self, feature: FeatureDef) -> Result<()> {
        if self.feature_index.contains_key(&feature.id) {
            bail!("duplicate feature in catalog: `{}`", feature.id);
        }
        self.feature_index.insert(feature.id, self.features.len());
        self.features.push(feature);
        Ok(())
    }

    /// Register a library. Duplicate names are a catalog defect.
    pub fn add_library(&mut self, library: LibraryDef) -> Result<()> {
        if self.library_index.contains_key(&library.name) {
            bail!("duplicate library in catalog: `{}`", library.name);
        }
        self.library_index.insert(library.name, self.libraries.len());
        self.libraries.push(library);
        Ok(())
    }

    /// Register a module. Duplicate names are a catalog defect.
    pub fn add_module(&mut self, module: ModuleSpec) -> Result<()> {
        if self.module_index.contains_key(&module.name) {
            bail!("duplicate module in catalog: `{}`", module.name);
        }
        self.module_index.insert(module.name, self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    /// Look up a feature by id.
    pub fn feature(&self, id: impl AsRef<str>) -> Option<&FeatureDef> {
        self.feature_index
            .get(id.as_ref())
            .map(|&i| &self.features[i])
    }

    /// Look up a library by name.
    pub fn library(&self, name: impl AsRef<str>) -> Option<&LibraryDef> {
        self.library_index
            .get(name.as_ref())
            .map(|&i| &self.libraries[i])
    }

    /// Look up a module by name.
    pub fn module(&self, name: impl AsRef<str>) -> Option<&ModuleSpec> {
        self.module_index
            .get(name.as_ref())
            .map(|&i| &self.modules[i])
    }

    /// All features, in declaration order.
    pub fn features(&self) -> &[FeatureDef] {
        &self.features
    }

    /// All modules, in declaration order.
    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    /// Declaration index of a module, for stable tie-breaking.
    pub fn module_decl_index(&self, name: impl AsRef<str>) -> Option<usize> {
        self.module_index.get(name.as_ref()).copied()
    }

    /// Optional modules included without being requested.
    pub fn default_modules(&self) -> impl Iterator<Item = &ModuleSpec> {
        self.modules.iter().filter(|m| m.default_on)
    }
}

/// Uppercase a name into a C preprocessor symbol fragment.
fn sanitize_symbol(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse `NAME` or `NAME=VALUE` into a define pair.
pub fn parse_define(text: &str) -> (String, Option<String>) {
    match text.split_once('=') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (text.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_duplicate_feature_rejected() {
        let mut catalog = Catalog::new();
        catalog.add_feature(feature("f1")).unwrap();
        assert!(catalog.add_feature(feature("f1")).is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let mut catalog = Catalog::new();
        catalog.add_feature(feature("posix_mmap")).unwrap();
        catalog
            .add_module(ModuleSpec {
                name: InternedString::new("core"),
                sources: vec!["src/core/*.c".to_string()],
                ..Default::default()
            })
            .unwrap();

        assert!(catalog.feature("posix_mmap").is_some());
        assert!(catalog.feature("nope").is_none());
        assert_eq!(catalog.module_decl_index("core"), Some(0));
    }

    #[test]
    fn test_applicability() {
        let only_unix = Applicability::Only(vec![OsFamily::Unix]);
        assert!(only_unix.matches(OsFamily::Unix));
        assert!(!only_unix.matches(OsFamily::Windows));
        assert!(Applicability::Any.matches(OsFamily::Darwin));
    }

    #[test]
    fn test_os_defines_selected_by_family() {
        let mut f = feature("large_file_support");
        f.os_defines = vec![(
            OsFamily::Unix,
            vec![("_FILE_OFFSET_BITS".to_string(), Some("64".to_string()))],
        )];

        let unix_probe = f.probe_program(OsFamily::Unix);
        assert!(unix_probe
            .defines
            .iter()
            .any(|(n, _)| n == "_FILE_OFFSET_BITS"));

        let win_probe = f.probe_program(OsFamily::Windows);
        assert!(win_probe.defines.is_empty());
    }

    #[test]
    fn test_symbol_derivation() {
        let f = feature("large-file.support");
        assert_eq!(f.symbol(), "HAVE_LARGE_FILE_SUPPORT");

        let m = ModuleSpec {
            name: InternedString::new("lz_stream"),
            ..Default::default()
        };
        assert_eq!(m.symbol(), "WITH_LZ_STREAM");
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(parse_define("NDEBUG"), ("NDEBUG".to_string(), None));
        assert_eq!(
            parse_define("_FILE_OFFSET_BITS=64"),
            ("_FILE_OFFSET_BITS".to_string(), Some("64".to_string()))
        );
    }
}
