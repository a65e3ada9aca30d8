//! Built-in feature and library definitions.
//!
//! These cover the capabilities most C projects condition on. Project
//! catalogs loaded from a file are appended after these, so project
//! entries never shadow a built-in symbol (first declaration wins).

use crate::platform::OsFamily;
use crate::probe::ProbeKind;
use crate::util::InternedString;

use super::{Applicability, Catalog, FeatureDef, LibraryDef, LibraryProbe};

fn posix_only() -> Applicability {
    Applicability::Only(vec![OsFamily::Unix, OsFamily::Darwin])
}

/// The default catalog: features and libraries only. Modules are
/// project-specific and come from the catalog file.
pub fn builtin() -> Catalog {
    let mut catalog = Catalog::new();

    // Catalog construction cannot fail here: ids are distinct literals.
    let add = |catalog: &mut Catalog, f: FeatureDef| {
        catalog.add_feature(f).expect("builtin feature ids are unique");
    };

    add(
        &mut catalog,
        FeatureDef {
            id: InternedString::new("large_file_support"),
            applies_to: posix_only(),
            kind: ProbeKind::Compile,
            source: "\
#include <stdio.h>
#include <sys/types.h>

/* off_t must be at least 64 bits wide */
int main(void) {
    static int off_t_is_wide[sizeof(off_t) >= 8 ? 1 : -1];
    (void)off_t_is_wide;
    return 0;
}
"
            .to_string(),
            defines: vec![],
            os_defines: vec![(
                OsFamily::Unix,
                vec![("_FILE_OFFSET_BITS".to_string(), Some("64".to_string()))],
            )],
            libraries: vec![],
            symbol: None,
        },
    );

    add(
        &mut catalog,
        FeatureDef {
            id: InternedString::new("symbol_fseeko"),
            applies_to: posix_only(),
            kind: ProbeKind::Link,
            source: "\
#include <stdio.h>

int main(void) {
    FILE *f = fopen(\"conftest.tmp\", \"w+\");
    if (f) {
        fseeko(f, (off_t)0, SEEK_SET);
        fclose(f);
    }
    return 0;
}
"
            .to_string(),
            defines: vec![("_LARGEFILE_SOURCE".to_string(), None)],
            os_defines: vec![],
            libraries: vec![],
            symbol: None,
        },
    );

    add(
        &mut catalog,
        FeatureDef {
            id: InternedString::new("posix_mmap"),
            applies_to: posix_only(),
            kind: ProbeKind::Link,
            source: "\
#include <sys/mman.h>

int main(void) {
    void *p = mmap(0, 4096, PROT_READ, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0);
    if (p != MAP_FAILED)
        munmap(p, 4096);
    return 0;
}
"
            .to_string(),
            defines: vec![],
            os_defines: vec![],
            libraries: vec![],
            symbol: None,
        },
    );

    add(
        &mut catalog,
        FeatureDef {
            id: InternedString::new("clock_monotonic"),
            applies_to: posix_only(),
            kind: ProbeKind::Link,
            source: "\
#include <time.h>

int main(void) {
    struct timespec ts;
    return clock_gettime(CLOCK_MONOTONIC, &ts);
}
"
            .to_string(),
            defines: vec![],
            os_defines: vec![],
            libraries: vec![],
            symbol: None,
        },
    );

    add(
        &mut catalog,
        FeatureDef {
            id: InternedString::new("symbol_pthread_create"),
            applies_to: posix_only(),
            kind: ProbeKind::Link,
            source: "\
#include <pthread.h>

static void *worker(void *arg) { return arg; }

int main(void) {
    pthread_t t;
    return pthread_create(&t, 0, worker, 0);
}
"
            .to_string(),
            defines: vec![],
            os_defines: vec![],
            libraries: vec!["pthread".to_string()],
            symbol: None,
        },
    );

    add(
        &mut catalog,
        FeatureDef {
            id: InternedString::new("win32_file_mapping"),
            applies_to: Applicability::Only(vec![OsFamily::Windows]),
            kind: ProbeKind::Link,
            source: "\
#include <windows.h>

int main(void) {
    HANDLE h = CreateFileMappingW(INVALID_HANDLE_VALUE, 0, PAGE_READWRITE, 0, 16, 0);
    if (h)
        CloseHandle(h);
    return 0;
}
"
            .to_string(),
            defines: vec![],
            os_defines: vec![],
            libraries: vec![],
            symbol: None,
        },
    );

    for (name, probe) in [
        ("m", LibraryProbe::LinkCheck),
        ("z", LibraryProbe::LinkCheck),
        (
            "pthread",
            LibraryProbe::Feature(InternedString::new("symbol_pthread_create")),
        ),
    ] {
        catalog
            .add_library(LibraryDef {
                name: InternedString::new(name),
                probe,
            })
            .expect("builtin library names are unique");
    }

    catalog
}
