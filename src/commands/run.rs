//! Run command implementation
//!
//! Loads and validates the configuration, then either prints the plan
//! (`--dry-run`) or drives the pipeline against the real system.

use std::path::{Path, PathBuf};

use console::Style;

use crate::cli::RunArgs;
use crate::config::{ConfigOverrides, ProvisionConfig};
use crate::error::{Result, fs as fs_error};
use crate::pipeline::{Pipeline, PipelineRun, PlannedStep};
use crate::process::SystemRunner;
use crate::report::RunReport;
use crate::toolchain::{HttpsSource, INSTALLER_FILE_NAME};
use crate::ui::{InteractiveStepReporter, SilentStepReporter, StepReporter};

/// Run the provisioning pipeline
pub fn run(args: RunArgs, quiet: bool) -> Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| fs_error::io_error(format!("Failed to get current directory: {e}")))?;
    let config = load_config(&args, &cwd)?;
    let source = HttpsSource::new()?;

    if args.dry_run {
        let plan = Pipeline::new(&SystemRunner, &source, &config).plan()?;
        print!("{}", render_plan(&plan, &config));
        return Ok(());
    }

    let mut reporter: Box<dyn StepReporter> = if quiet {
        Box::new(SilentStepReporter)
    } else {
        Box::new(InteractiveStepReporter::new())
    };
    let run = Pipeline::new(&SystemRunner, &source, &config).run(reporter.as_mut());

    if let Some(ref path) = args.report {
        let path = absolutize(path, &cwd);
        let written = RunReport::new(&config, &run).write(&path);
        // A failed run reports its own error; a report failure must not mask it
        match written {
            Err(e) if run.outcome.is_err() => {
                tracing::error!(error = %e, "failed to write run report");
            }
            other => other?,
        }
    }

    print_summary(&run, quiet);
    run.outcome.map(|_| ())
}

/// Discover the config file, apply command-line overrides and validate
pub fn load_config(args: &RunArgs, cwd: &Path) -> Result<ProvisionConfig> {
    let explicit = args.config.as_deref().map(|p| absolutize(p, cwd));
    let mut config = ProvisionConfig::discover(explicit.as_deref(), cwd)?;
    config.apply(ConfigOverrides::from(args).relative_to(cwd));
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dunce::simplified(&cwd.join(path)).to_path_buf()
    }
}

/// Human-readable listing of every planned step and command
pub fn render_plan(plan: &[PlannedStep], config: &ProvisionConfig) -> String {
    let header = Style::new().bold().green();
    let step_style = Style::new().bold();
    let mut out = format!("{}\n", header.apply_to("Plan (dry run):"));

    for (index, planned) in plan.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}/{}] {}\n",
            index + 1,
            plan.len(),
            step_style.apply_to(planned.step.description())
        ));
        if let Some(ref url) = planned.download {
            let verification = match config.toolchain.installer_sha256 {
                Some(ref sha) => format!("sha256 {sha}"),
                None if config.toolchain.allow_unverified_installer => "unverified".to_string(),
                None => "no checksum configured, will refuse to run".to_string(),
            };
            out.push_str(&format!(
                "  download {url} -> {} ({verification})\n",
                config
                    .work_dir
                    .join("toolchain")
                    .join(INSTALLER_FILE_NAME)
                    .display()
            ));
        }
        if planned.commands.is_empty() && planned.download.is_none() {
            out.push_str("  (nothing to do)\n");
        }
        for command in &planned.commands {
            out.push_str(&format!("  {}\n", command.display_line()));
        }
    }
    out
}

fn print_summary(run: &PipelineRun, quiet: bool) {
    match run.outcome {
        Ok(_) if quiet => {}
        Ok(_) => {
            let package = run
                .package
                .as_ref()
                .map(|p| match (&p.name, &p.version) {
                    (Some(name), Some(version)) => format!(" ({name} {version})"),
                    _ => format!(" ({})", p.binary),
                })
                .unwrap_or_default();
            println!(
                "{} Bundle setup complete{}",
                Style::new().green().bold().apply_to("✓"),
                package
            );
        }
        // Printed in quiet mode too: the error alone does not always name its step
        Err(_) => {
            if let Some(step) = run.failed_step() {
                eprintln!(
                    "{} Pipeline failed at the {} step",
                    Style::new().red().bold().apply_to("✗"),
                    step
                );
            }
        }
    }
}
