//! Catalog file parsing.
//!
//! A project extends the built-in catalog with a TOML file:
//!
//! ```toml
//! [[features]]
//! id = "symbol_epoll_create1"
//! os = ["unix"]
//! check = "link"
//! source = """
//! #include <sys/epoll.h>
//! int main(void) { return epoll_create1(0) < 0; }
//! """
//!
//! [[libraries]]
//! name = "rt"
//!
//! [[modules]]
//! name = "event_loop"
//! features = ["symbol_epoll_create1"]
//! sources = ["src/event/*.c"]
//! optional = true
//! default = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::platform::OsFamily;
use crate::probe::ProbeKind;
use crate::util::diagnostic::CatalogError;
use crate::util::fs::read_to_string;
use crate::util::InternedString;

use super::{
    parse_define, Applicability, Catalog, FeatureDef, LibraryDef, LibraryProbe, ModuleSpec,
};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    features: Vec<FeatureEntry>,
    #[serde(default)]
    libraries: Vec<LibraryEntry>,
    #[serde(default)]
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureEntry {
    id: String,
    /// OS families the probe applies to; absent means all.
    #[serde(default)]
    os: Option<Vec<String>>,
    /// "compile", "link" (default), or "run".
    #[serde(default)]
    check: Option<String>,
    source: String,
    /// `NAME` or `NAME=VALUE` strings.
    #[serde(default)]
    defines: Vec<String>,
    /// Per-OS defines: `os_defines.unix = ["_FILE_OFFSET_BITS=64"]`.
    #[serde(default)]
    os_defines: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    libraries: Vec<String>,
    /// Header symbol override.
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LibraryEntry {
    name: String,
    /// Catalog feature establishing availability; absent means an
    /// implicit link check.
    #[serde(default)]
    feature: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleEntry {
    name: String,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    libraries: Vec<String>,
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default, rename = "default")]
    default_on: bool,
}

/// Load a catalog file and append its entries to `catalog`.
///
/// Entries keep the file's declaration order, after everything already
/// in the catalog.
pub fn load_catalog_file(catalog: &mut Catalog, path: &Path) -> Result<()> {
    let contents = read_to_string(path)?;
    let file: CatalogFile = toml::from_str(&contents).map_err(|e| CatalogError {
        message: format!("{}: {}", path.display(), e),
    })?;

    for entry in file.features {
        let feature = convert_feature(entry)
            .with_context(|| format!("invalid feature in {}", path.display()))?;
        catalog
            .add_feature(feature)
            .with_context(|| format!("in catalog file {}", path.display()))?;
    }

    for entry in file.libraries {
        catalog
            .add_library(LibraryDef {
                name: InternedString::new(&entry.name),
                probe: match entry.feature {
                    Some(f) => LibraryProbe::Feature(InternedString::new(f)),
                    None => LibraryProbe::LinkCheck,
                },
            })
            .with_context(|| format!("in catalog file {}", path.display()))?;
    }

    for entry in file.modules {
        catalog
            .add_module(ModuleSpec {
                name: InternedString::new(&entry.name),
                required_features: entry.features.iter().map(InternedString::new).collect(),
                required_libraries: entry.libraries.iter().map(InternedString::new).collect(),
                required_modules: entry.modules.iter().map(InternedString::new).collect(),
                sources: entry.sources,
                optional: entry.optional,
                default_on: entry.default_on,
            })
            .with_context(|| format!("in catalog file {}", path.display()))?;
    }

    Ok(())
}

fn convert_feature(entry: FeatureEntry) -> Result<FeatureDef> {
    let applies_to = match entry.os {
        None => Applicability::Any,
        Some(names) => {
            let mut families = Vec::with_capacity(names.len());
            for name in &names {
                families.push(
                    OsFamily::from_str(name)
                        .map_err(|e| anyhow::anyhow!("feature `{}`: {}", entry.id, e))?,
                );
            }
            Applicability::Only(families)
        }
    };

    let kind = match entry.check.as_deref() {
        None | Some("link") => ProbeKind::Link,
        Some("compile") => ProbeKind::Compile,
        Some("run") => ProbeKind::Run,
        Some(other) => bail!("feature `{}`: unknown check kind `{}`", entry.id, other),
    };

    let mut os_defines = Vec::new();
    for (os_name, defines) in entry.os_defines {
        let family = OsFamily::from_str(&os_name)
            .map_err(|e| anyhow::anyhow!("feature `{}`: {}", entry.id, e))?;
        os_defines.push((family, defines.iter().map(|d| parse_define(d)).collect()));
    }

    Ok(FeatureDef {
        id: InternedString::new(&entry.id),
        applies_to,
        kind,
        source: entry.source,
        defines: entry.defines.iter().map(|d| parse_define(d)).collect(),
        os_defines,
        libraries: entry.libraries,
        symbol: entry.symbol,
    })
}
