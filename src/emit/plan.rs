//! Build plan types and rendering.
//!
//! A BuildPlan is the ordered list of compile and link steps a generic
//! build executor will carry out. Steps appear in topological order:
//! every input of a step is either a source file or the output of an
//! earlier step.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::toolchain::CompilerFamily;
use crate::util::InternedString;

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Compile,
    Link,
}

/// One build step: inputs, one output, and the flags for the invocation.
///
/// All paths are relative to the project root; emitted artifacts must
/// not embed absolute paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStep {
    pub kind: StepKind,
    /// Ordered inputs (source files or earlier outputs).
    pub inputs: Vec<PathBuf>,
    /// The artifact this step produces.
    pub output: PathBuf,
    /// Invocation flags, in order.
    pub flags: Vec<String>,
    /// Module the step belongs to (empty for the final link).
    pub module: InternedString,
}

/// A complete build plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildPlan {
    /// All steps in execution order.
    pub steps: Vec<BuildStep>,
    /// Modules in the order their steps appear.
    pub module_order: Vec<InternedString>,
}

impl BuildPlan {
    /// Number of compile steps.
    pub fn compile_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.kind == StepKind::Compile)
            .count()
    }

    /// Number of link steps.
    pub fn link_count(&self) -> usize {
        self.steps.iter().filter(|s| s.kind == StepKind::Link).count()
    }

    /// Render the plan as a line-oriented rule file: one rule per
    /// output, dependencies listed before the rule that produces them.
    ///
    /// The compiler is referenced as `$(CC)` so the plan stays portable
    /// across machines with the same facts.
    pub fn render(&self, family: CompilerFamily) -> String {
        let mut out = String::new();
        out.push_str("# generated by drydock; do not edit\n");

        for step in &self.steps {
            let inputs: Vec<String> = step
                .inputs
                .iter()
                .map(|p| path_text(p))
                .collect();

            out.push('\n');
            out.push_str(&format!("{}: {}\n", path_text(&step.output), inputs.join(" ")));

            let mut cmd: Vec<String> = vec!["$(CC)".to_string()];
            match step.kind {
                StepKind::Compile => {
                    cmd.push(family.compile_only_flag().to_string());
                    cmd.extend(step.flags.iter().cloned());
                    cmd.extend(inputs);
                    cmd.extend(
                        family
                            .object_output_flags(&step.output)
                            .iter()
                            .map(|f| f.replace('\\', "/")),
                    );
                }
                StepKind::Link => {
                    cmd.extend(inputs);
                    cmd.extend(
                        family
                            .exe_output_flags(&step.output)
                            .iter()
                            .map(|f| f.replace('\\', "/")),
                    );
                    cmd.extend(step.flags.iter().cloned());
                }
            }

            out.push('\t');
            out.push_str(&cmd.join(" "));
            out.push('\n');
        }

        out
    }
}

/// Forward-slash path text, so plans render identically on every host.
fn path_text(path: &std::path::Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_step(src: &str, obj: &str) -> BuildStep {
        BuildStep {
            kind: StepKind::Compile,
            inputs: vec![PathBuf::from(src)],
            output: PathBuf::from(obj),
            flags: vec!["-O2".to_string(), "-Wall".to_string()],
            module: InternedString::new("core"),
        }
    }

    #[test]
    fn test_render_compile_rule() {
        let plan = BuildPlan {
            steps: vec![compile_step("src/core/a.c", "build/obj/core/src/core/a.o")],
            module_order: vec![InternedString::new("core")],
        };

        let text = plan.render(CompilerFamily::Gcc);
        assert!(text.contains("build/obj/core/src/core/a.o: src/core/a.c\n"));
        assert!(text.contains("\t$(CC) -c -O2 -Wall src/core/a.c -o build/obj/core/src/core/a.o"));
    }

    #[test]
    fn test_render_link_rule_lists_deps_first() {
        let plan = BuildPlan {
            steps: vec![
                compile_step("src/core/a.c", "build/obj/core/src/core/a.o"),
                BuildStep {
                    kind: StepKind::Link,
                    inputs: vec![PathBuf::from("build/obj/core/src/core/a.o")],
                    output: PathBuf::from("build/bin/app"),
                    flags: vec!["-lm".to_string()],
                    module: InternedString::default(),
                },
            ],
            module_order: vec![InternedString::new("core")],
        };

        let text = plan.render(CompilerFamily::Gcc);
        let compile_pos = text.find("build/obj/core/src/core/a.o: src").unwrap();
        let link_pos = text.find("build/bin/app: build/obj").unwrap();
        assert!(compile_pos < link_pos);
        assert!(text.contains("-lm"));
    }

    #[test]
    fn test_counts() {
        let plan = BuildPlan {
            steps: vec![
                compile_step("a.c", "a.o"),
                compile_step("b.c", "b.o"),
                BuildStep {
                    kind: StepKind::Link,
                    inputs: vec![PathBuf::from("a.o"), PathBuf::from("b.o")],
                    output: PathBuf::from("app"),
                    flags: vec![],
                    module: InternedString::default(),
                },
            ],
            module_order: vec![InternedString::new("core")],
        };

        assert_eq!(plan.compile_count(), 2);
        assert_eq!(plan.link_count(), 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let plan = BuildPlan {
            steps: vec![compile_step("src/a.c", "build/a.o")],
            module_order: vec![InternedString::new("core")],
        };

        assert_eq!(
            plan.render(CompilerFamily::Gcc),
            plan.render(CompilerFamily::Gcc)
        );
    }
}
