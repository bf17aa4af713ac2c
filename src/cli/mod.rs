//! CLI command handling
//!
//! Resolves configuration, runs scenarios, and formats reports.

use std::time::Duration;

use colored::Colorize;

use crate::commands::{Commands, RunOpts};
use crate::common::{Config, Error, Extractor, Result};
use crate::http::HttpExecutor;
use crate::scenario::runner::{Runner, ScenarioReport, StepState, Verdict};
use crate::scenario::{catalog, Scenario};

/// Effective settings after merging config file and CLI flags
struct Settings {
    base_url: String,
    user_id: u64,
    connect_timeout: Duration,
    extractor: Extractor,
    verbose: bool,
}

impl Settings {
    fn resolve(opts: &RunOpts) -> Result<Self> {
        let config = Config::load(opts.config.as_deref())?;
        Ok(Self {
            base_url: opts.base_url.clone().unwrap_or(config.base_url),
            user_id: opts.user.unwrap_or(config.user_id),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            extractor: if opts.structured {
                Extractor::Structured
            } else {
                config.extractor
            },
            verbose: opts.verbose,
        })
    }
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let config = Config::load(None)?;
            println!("Built-in scenarios:");
            for scenario in catalog::all(config.user_id) {
                match &scenario.description {
                    Some(description) => {
                        println!("  {:24} {}", scenario.name, description.dimmed())
                    }
                    None => println!("  {}", scenario.name),
                }
            }
            Ok(())
        }

        Commands::Run { names, opts } => {
            let settings = Settings::resolve(&opts)?;
            let mut scenarios = Vec::with_capacity(names.len());
            for name in &names {
                let scenario = catalog::find(name, settings.user_id).ok_or_else(|| {
                    Error::scenario_not_found(name, &catalog::names(settings.user_id))
                })?;
                scenarios.push(scenario);
            }
            run_scenarios(&scenarios, &settings).await
        }

        Commands::All { opts } => {
            let settings = Settings::resolve(&opts)?;
            let scenarios = catalog::all(settings.user_id);
            run_scenarios(&scenarios, &settings).await
        }

        Commands::File { path, opts } => {
            let settings = Settings::resolve(&opts)?;
            let scenario = Scenario::load(&path)?;
            run_scenarios(&[scenario], &settings).await
        }
    }
}

async fn run_scenarios(scenarios: &[Scenario], settings: &Settings) -> Result<()> {
    let executor = HttpExecutor::new(&settings.base_url, settings.connect_timeout)?;
    let runner = Runner::new(executor, settings.extractor);

    let total = scenarios.len();
    let mut failed = 0;

    for scenario in scenarios {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(description) = &scenario.description {
            println!("  {}", description.dimmed());
        }

        let report = runner.run(scenario).await;
        print_report(&report, settings.verbose);

        if !report.passed() {
            failed += 1;
        }
    }

    if total > 1 {
        let passed = total - failed;
        println!("\n{passed}/{total} scenarios passed");
    }

    if failed > 0 {
        Err(Error::ScenariosFailed { failed, total })
    } else {
        Ok(())
    }
}

fn print_report(report: &ScenarioReport, verbose: bool) {
    println!("\n{}", "Steps:".cyan());
    for (i, step) in report.steps.iter().enumerate() {
        let number = i + 1;
        match step.state {
            StepState::Ok => {
                let status = step.status.map(|s| s.to_string()).unwrap_or_default();
                println!(
                    "  {} Step {}: {} ({})",
                    "✓".green(),
                    number,
                    step.key.dimmed(),
                    status
                );
                if verbose {
                    if let Some(body) = &step.body {
                        println!("    {}", body.dimmed());
                    }
                }
                if let Some(note) = &step.note {
                    println!("    {}", note.yellow());
                }
            }
            StepState::Failed => {
                println!("  {} Step {}: {}", "✗".red(), number, step.key);
                if let Some(note) = &step.note {
                    println!("    {}", note.red());
                }
            }
            StepState::Skipped => {
                println!(
                    "  {} Step {}: {} (skipped)",
                    "-".yellow(),
                    number,
                    step.key.dimmed()
                );
                if let Some(note) = &step.note {
                    println!("    {}", note.yellow());
                }
            }
            StepState::NotStarted => {
                println!("  {} Step {}: {}", "?".yellow(), number, step.key.dimmed());
            }
        }
    }

    if !report.assertions.is_empty() {
        println!("\n{}", "Assertions:".cyan());
        for assertion in &report.assertions {
            let line = format!("{}: {}", assertion.subject, assertion.what);
            match assertion.verdict {
                Verdict::Pass => println!("  {} {}", "✓".green(), line.dimmed()),
                Verdict::Fail => {
                    println!("  {} {}", "✗".red(), line);
                    if let Some(detail) = &assertion.detail {
                        println!("    {}", detail.red());
                    }
                }
                Verdict::Skipped => {
                    println!("  {} {} {}", "-".yellow(), line.dimmed(), "(skipped)".yellow())
                }
            }
        }
    }

    if report.passed() {
        println!("\n{} {}", "✓".green().bold(), "Scenario Passed".green().bold());
    } else {
        println!("\n{} {}", "✗".red().bold(), "Scenario Failed".red().bold());
    }
}
