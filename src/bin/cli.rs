use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use scenario_dsl::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenario-dsl")]
#[command(about = "Run DSL scenarios against an in-memory application", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario file
    Run {
        /// Path to the scenario YAML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// HTML file to load as the starting document (overrides the scenario's)
        #[arg(short, long)]
        page: Option<PathBuf>,

        /// Path to a scenario.yaml config file (default: next to FILE)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate scenario files without running them
    Validate {
        /// Path to a scenario file or directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// List scenarios in a directory
    List {
        /// Path to the scenarios directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "scenario_dsl=debug"
    } else {
        "scenario_dsl=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            file,
            page,
            config,
            json,
        } => run_scenario(file, page, config, json).await,
        Commands::Validate { path } => validate(path),
        Commands::List { dir } => list_scenarios(dir),
    }
}

#[tracing::instrument(skip_all, fields(file = %file.display()))]
async fn run_scenario(
    file: PathBuf,
    page: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<bool> {
    if !file.exists() {
        anyhow::bail!("Scenario file not found: {}", file.display());
    }

    let mut scenario = ScenarioLoader::load_file(&file)?;
    if let Some(page) = page {
        let html = std::fs::read_to_string(&page)
            .map_err(|e| anyhow::anyhow!("Cannot read page {}: {}", page.display(), e))?;
        scenario.html = Some(html);
    }

    let config = match config {
        Some(path) => ScenarioConfig::load(&path)?,
        None => ScenarioConfig::discover(parent_dir(&file))?,
    };

    let app = Arc::new(config.application(&scenario)?);
    let ctx = ExecutionContext::builder(app)
        .timer(config.clock.timer())
        .build();
    let dsl = Dsl::new(ctx.clone()).with_conventions(config.conventions.clone());
    compile(&scenario, &dsl)?;

    if !json {
        println!("Running scenario: {}\n", scenario.name);
    }

    let listener = resume_on_enter(ctx.clone());
    let summary = ctx.run().await;
    listener.abort();
    let summary = summary?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(summary.success)
}

/// Resume a paused run once a line (or EOF) arrives on stdin
fn resume_on_enter(ctx: ExecutionContext) -> tokio::task::JoinHandle<()> {
    let mut events = ctx.subscribe();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match events.recv().await {
                Ok(ControlEvent::InteractivePause { future }) => {
                    eprintln!("⏸ {} (press Enter to resume)", future);
                    if let Err(e) = lines.next_line().await {
                        tracing::warn!(error = %e, "Failed to read stdin");
                    }
                    // the pause parks right after announcing itself
                    while !ctx.resume() {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
                Ok(ControlEvent::RunCompleted { .. }) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    })
}

fn validate(path: PathBuf) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    if path.is_dir() {
        let scenarios = ScenarioLoader::load_directory(&path)?;
        if scenarios.is_empty() {
            println!("No scenarios found in: {}", path.display());
            return Ok(true);
        }

        let mut futures = 0;
        for scenario in &scenarios {
            futures += check(scenario)?;
        }
        println!(
            "✓ {} scenarios validated, {} futures",
            scenarios.len(),
            futures
        );
    } else {
        let scenario = ScenarioLoader::load_file(&path)?;
        let futures = check(&scenario)?;
        println!("✓ {} is valid ({} futures)", path.display(), futures);
    }

    Ok(true)
}

/// Compile `scenario` against a throwaway context
fn check(scenario: &Scenario) -> anyhow::Result<usize> {
    let ctx = ExecutionContext::new(Arc::new(MemoryApplication::from_html("")));
    let futures = compile(scenario, &Dsl::new(ctx))
        .map_err(|e| anyhow::anyhow!("{}: {}", scenario.name, e))?;
    Ok(futures.len())
}

fn list_scenarios(dir: PathBuf) -> anyhow::Result<bool> {
    if !dir.exists() {
        anyhow::bail!("Directory not found: {}", dir.display());
    }

    let scenarios = ScenarioLoader::load_directory(&dir)?;
    if scenarios.is_empty() {
        println!("No scenarios found in: {}", dir.display());
        return Ok(true);
    }

    println!("Scenarios in {}:\n", dir.display());
    for scenario in &scenarios {
        let steps = scenario.steps.len();
        match &scenario.description {
            Some(description) => println!("  {} ({} steps) - {}", scenario.name, steps, description),
            None => println!("  {} ({} steps)", scenario.name, steps),
        }
    }

    Ok(true)
}

fn print_summary(summary: &RunSummary) {
    for record in &summary.records {
        match (&record.status, &record.result, &record.error) {
            (FutureStatus::Resolved, Some(result), _) if !result.is_null() => {
                println!("✓ {} → {}", record.name, result)
            }
            (FutureStatus::Resolved, _, _) => println!("✓ {}", record.name),
            (_, _, Some(error)) => println!("✗ {}: {}", record.name, error),
            (_, _, None) => println!("✗ {}", record.name),
        }
    }

    let failed = summary.failed().count();
    println!("\n=== Scenario Result ===\n");
    println!("Success: {}", if summary.success { "YES" } else { "NO" });
    println!("Run ID: {}", summary.run_id);
    println!(
        "Futures: {} total, {} failed",
        summary.records.len(),
        failed
    );
}

fn parent_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
