//! `drydock doctor` command.

use anyhow::Result;

use drydock::ops::run_doctor;

use crate::cli::DoctorArgs;

pub fn execute(_args: DoctorArgs) -> Result<()> {
    let report = run_doctor();

    println!("host: {}", report.host);
    println!();

    for check in &report.checks {
        let status = if check.passed { "ok" } else { "FAIL" };
        let required = if check.required { "" } else { " (optional)" };
        println!("  [{:>4}] {}{}: {}", status, check.name, required, check.message);
        if let Some(ref path) = check.path {
            println!("         {}", path.display());
        }
    }

    println!();
    println!("checked in {:.2}s", report.total_duration.as_secs_f64());

    if !report.all_required_passed() {
        anyhow::bail!("environment is not usable; fix the failing checks above");
    }

    Ok(())
}
