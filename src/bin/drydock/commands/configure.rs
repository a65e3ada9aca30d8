//! `drydock configure` command.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use drydock::ops::{configure, ConfigureRequest};
use drydock::util::StderrReporter;

use crate::cli::ConfigureArgs;

pub fn execute(args: ConfigureArgs) -> Result<()> {
    let source_root = match args.source_root {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let catalog_file = args.catalog.or_else(|| {
        let default = source_root.join("drydock.toml");
        default.exists().then_some(default)
    });

    let request = ConfigureRequest {
        modules: args.modules,
        enable_features: args.enable_features,
        disable_features: args.disable_features,
        build_dir: args
            .build_dir
            .unwrap_or_else(|| source_root.join("build")),
        source_root,
        output_name: args.output_name,
        catalog_file,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("probing platform...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let reporter = StderrReporter { color: true };
    let outcome = configure(&request, &reporter);

    spinner.finish_and_clear();

    let outcome = outcome?;

    eprintln!("    Detected {}", outcome.facts.summary());
    eprintln!(
        "  Configured {} module(s) ({} probe(s) run)",
        outcome.included.len(),
        outcome.probes_run
    );
    for dropped in &outcome.dropped {
        eprintln!("     Skipped {} ({})", dropped.name, dropped.cause);
    }
    eprintln!("       Wrote {}", outcome.plan_path.display());
    eprintln!("       Wrote {}", outcome.header_path.display());

    Ok(())
}
