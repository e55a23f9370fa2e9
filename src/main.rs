use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod settings;

use cli::Cli;
use cli::commands::{Commands, GoalFile};
use settings::Settings;

use weavr::catalog::ToolCatalog;
use weavr::config::EnvConfig;
use weavr::domain::event::LogEventSink;
use weavr::domain::job::{Job, JobState};
use weavr::domain::run::Artifact;
use weavr::engine::sim::simulated_registry;
use weavr::storage::{JobStore, JsonlHistoryStore, JsonlJobStore};
use weavr::supervisor::{Supervisor, SupervisorConfig};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weavr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("weavr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_supervisor(settings: &Settings, catalog_override: Option<&PathBuf>) -> Result<Supervisor> {
    let catalog_path = catalog_override.unwrap_or(&settings.catalog);
    let catalog = ToolCatalog::from_file(catalog_path)
        .context(format!("Failed to load catalog {}", catalog_path.display()))?;
    let registry = simulated_registry(&catalog);
    let jobs = JsonlJobStore::new(&settings.storage.data_dir)?;
    let history = JsonlHistoryStore::new(&settings.storage.data_dir)?;

    Ok(Supervisor::new(
        Arc::new(catalog),
        Arc::new(EnvConfig::with_prefix(settings.config_prefix.clone())),
        Arc::new(registry),
        Arc::new(jobs),
        Arc::new(history),
        Arc::new(LogEventSink),
        SupervisorConfig {
            attempt_budget: settings.budgets.attempts,
            compiler_repair_budget: settings.budgets.compiler_repairs,
            engine_repair_budget: settings.budgets.engine_repairs,
        },
    ))
}

async fn run_application(cli: &Cli, settings: &Settings) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Submit { goal, catalog, json } => {
            handle_submit(goal, catalog.as_ref(), *json, settings).await
        }
        Commands::Status { id, detailed, json } => {
            handle_status(id, *detailed, *json, settings)
        }
        Commands::List { state } => handle_list(state.as_deref(), settings),
        Commands::Clarify { id, goal, catalog } => {
            handle_clarify(id, goal, catalog.as_ref(), settings).await
        }
        Commands::Catalog { capability, catalog } => {
            handle_catalog(capability.as_deref(), catalog.as_ref(), settings)
        }
    }
}

async fn handle_submit(
    goal_path: &PathBuf,
    catalog: Option<&PathBuf>,
    json: bool,
    settings: &Settings,
) -> Result<()> {
    let goal = GoalFile::load(goal_path)?.into_goal();
    info!("Submitting goal {} from {}", goal.goal_id, goal_path.display());

    let supervisor = build_supervisor(settings, catalog)?;
    let job_id = supervisor.submit(goal).await?;
    let job = supervisor
        .job(&job_id)?
        .ok_or_else(|| eyre!("job {} vanished after submit", job_id))?;

    print_outcome(&job, json)
}

fn handle_status(id: &str, detailed: bool, json: bool, settings: &Settings) -> Result<()> {
    let store = JsonlJobStore::new(&settings.storage.data_dir)?;
    let job = store
        .get(id)?
        .ok_or_else(|| eyre!("no job with id {}", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!("{} {}", "Job:".green(), job.job_id);
    println!("  State: {}", state_colored(job.state));
    println!("  Attempt: {}", job.attempt);
    println!("  Goal: {} ({} versions)", job.goal.goal_id, job.goal_history.len() + 1);
    if let Some(plan) = &job.plan {
        println!("  Plan: {} [{}]", plan.plan_id, plan.tool_names().join(" -> "));
    }
    if let Some(directive) = &job.last_directive {
        println!("  Last directive: {:?} ({})", directive.target, directive.reason);
    }
    if detailed {
        for run in &job.runs {
            println!("  Run {} ({:?})", run.run_id, run.classification);
            for step in &run.steps {
                match &step.error {
                    Some(err) => println!("    {} {:?}: {}", step.tool, step.status, err.code),
                    None => println!("    {} {:?}", step.tool, step.status),
                }
            }
        }
    }
    Ok(())
}

fn handle_list(state: Option<&str>, settings: &Settings) -> Result<()> {
    let store = JsonlJobStore::new(&settings.storage.data_dir)?;
    let jobs = store.list()?;

    let filtered: Vec<&Job> = jobs
        .iter()
        .filter(|j| state.map(|s| j.state.to_string() == s).unwrap_or(true))
        .collect();

    if filtered.is_empty() {
        println!("{}", "No jobs found".yellow());
        return Ok(());
    }

    for job in filtered {
        println!(
            "{}  {}  attempt {}  {}",
            job.job_id,
            state_colored(job.state),
            job.attempt,
            job.goal.query
        );
    }
    Ok(())
}

async fn handle_clarify(
    id: &str,
    goal_path: &PathBuf,
    catalog: Option<&PathBuf>,
    settings: &Settings,
) -> Result<()> {
    let supervisor = build_supervisor(settings, catalog)?;
    let parked = supervisor
        .job(id)?
        .ok_or_else(|| eyre!("no job with id {}", id))?;

    let revised = GoalFile::load(goal_path)?.revise(&parked.goal);
    info!("Resuming job {} with revised goal {}", id, revised.goal_id);

    supervisor.clarify(id, revised).await?;
    let job = supervisor
        .job(id)?
        .ok_or_else(|| eyre!("job {} vanished after clarify", id))?;

    print_outcome(&job, false)
}

fn handle_catalog(
    capability: Option<&str>,
    catalog_path: Option<&PathBuf>,
    settings: &Settings,
) -> Result<()> {
    let path = catalog_path.unwrap_or(&settings.catalog);
    let catalog = ToolCatalog::from_file(path)
        .context(format!("Failed to load catalog {}", path.display()))?;

    let tools = match capability {
        Some(tag) => catalog.by_capability(tag),
        None => catalog.all(),
    };

    if tools.is_empty() {
        println!("{}", "No matching tools".yellow());
        return Ok(());
    }

    for tool in tools {
        println!(
            "{}  {}  priority {}",
            tool.name.cyan(),
            tool.category,
            tool.priority
        );
        if !tool.capabilities.is_empty() {
            println!("  capabilities: {}", tool.capabilities.join(", "));
        }
        if !tool.required_config.is_empty() {
            println!("  requires config: {}", tool.required_config.join(", "));
        }
    }
    Ok(())
}

fn state_colored(state: JobState) -> ColoredString {
    let text = state.to_string();
    match state {
        JobState::Succeeded => text.green(),
        JobState::Failed => text.red(),
        JobState::AwaitingClarification => text.yellow(),
        _ => text.cyan(),
    }
}

fn print_outcome(job: &Job, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(job)?);
        return Ok(());
    }

    match job.state {
        JobState::Succeeded => {
            println!(
                "{} {} (attempt {})",
                "Succeeded:".green(),
                job.job_id,
                job.attempt
            );
            if let Some(Artifact::Records(records)) =
                job.last_run().and_then(|r| r.artifact.as_ref())
            {
                println!("{}", serde_json::to_string_pretty(records)?);
            }
        }
        JobState::AwaitingClarification => {
            let reason = job
                .last_directive
                .as_ref()
                .map(|d| d.reason.as_str())
                .unwrap_or("unknown");
            println!(
                "{} {} ({})",
                "Awaiting clarification:".yellow(),
                job.job_id,
                reason
            );
            println!(
                "  Resume with: weavr clarify {} --goal revised.json",
                job.job_id
            );
        }
        JobState::Failed => {
            let reason = job
                .last_directive
                .as_ref()
                .map(|d| d.reason.as_str())
                .unwrap_or("budget exhausted");
            println!(
                "{} {} after {} attempts ({})",
                "Failed:".red(),
                job.job_id,
                job.attempt,
                reason
            );
        }
        other => {
            println!("{} {} in state {}", "Job:".cyan(), job.job_id, other);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &settings)
        .await
        .context("Application failed")?;

    Ok(())
}
