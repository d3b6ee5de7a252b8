mod job;
mod logs;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use jobloop_config::Settings;
use jobloop_scheduler::{DirBackend, JobRegistry};
use jobloop_store::LogStore;
use jobloop_watch::{LogWatcher, watcher::start_log_watcher};

#[derive(Parser)]
#[command(name = "jobloop", about = "Scheduled AI agent job runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single job run (invoked by the scheduler action)
    RunJob {
        /// Name of the job being run
        job_name: String,

        /// Scheduler-supplied arguments, flag form or base64 positional form
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        rest: Vec<String>,
    },
    /// Manage scheduled job definitions
    Job {
        #[command(subcommand)]
        command: job::JobCommands,
    },
    /// Inspect and prune recorded runs
    Logs {
        #[command(subcommand)]
        command: logs::LogCommands,
    },
    /// Watch the run store and print notifications as runs complete
    Watch,
    /// Smoke-test the configured agent command
    Validate,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunJob { job_name, rest } => {
            let rt = tokio::runtime::Runtime::new()?;
            let code = rt.block_on(run_job_command(job_name, rest))?;
            std::process::exit(code);
        }
        Commands::Job { command } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(job::run(command))?;
        }
        Commands::Logs { command } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(logs::run(command))?;
        }
        Commands::Watch => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(watch_command())?;
        }
        Commands::Validate => {
            let rt = tokio::runtime::Runtime::new()?;
            let ok = rt.block_on(validate_command())?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_job_command(job_name: String, rest: Vec<String>) -> anyhow::Result<i32> {
    let req = jobloop_runner::parse_run_args(job_name, &rest)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let entry = jobloop_runner::run_job(&req, cancel).await?;
    Ok(entry.exit_code)
}

fn load_settings() -> Settings {
    jobloop_config::load_settings().unwrap_or_default()
}

fn make_registry(settings: &Settings) -> anyhow::Result<JobRegistry> {
    let backend = Arc::new(DirBackend::open(settings.tasks_dir.clone())?);
    Ok(JobRegistry::new(
        backend,
        settings.agent_command.clone(),
        settings.logs_dir.clone(),
    ))
}

async fn watch_command() -> anyhow::Result<()> {
    let settings = load_settings();
    let store = LogStore::open(&settings.logs_dir)?;
    let registry = Arc::new(make_registry(&settings)?);

    let (notif_tx, mut notif_rx) = tokio::sync::mpsc::unbounded_channel();
    let (refresh_tx, mut refresh_rx) = tokio::sync::mpsc::unbounded_channel();

    let logs_dir = settings.logs_dir.clone();
    let watcher = Arc::new(
        LogWatcher::new(store, registry, settings, notif_tx, refresh_tx).await?,
    );

    watcher.run_startup_maintenance().await;
    // Catch anything that landed before the file watcher attaches
    watcher.request_scan().await;
    let handle = start_log_watcher(watcher, logs_dir);

    info!("Watching for completed runs, Ctrl-C to stop");
    loop {
        tokio::select! {
            event = notif_rx.recv() => match event {
                Some(event) => {
                    let mark = if event.success { "ok" } else { "FAILED" };
                    println!("[{mark}] {}: {}", event.job_name, event.message);
                    if !event.output_preview.is_empty() {
                        println!("      {}", event.output_preview);
                    }
                }
                None => break,
            },
            _ = refresh_rx.recv() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(handle) = handle {
        handle.abort();
    }
    Ok(())
}

async fn validate_command() -> anyhow::Result<bool> {
    let settings = load_settings();
    if settings.agent_command.trim().is_empty() {
        anyhow::bail!("no agent command configured; set agent_command in the config file");
    }

    println!("Testing agent command: {}", settings.agent_command);
    let (ok, stdout, stderr) = jobloop_runner::validate_command(&settings.agent_command).await;
    if ok {
        println!("Agent command works.");
    } else {
        println!("Agent command failed.");
        if !stdout.is_empty() {
            println!("stdout:\n{stdout}");
        }
        if !stderr.is_empty() {
            println!("stderr:\n{stderr}");
        }
    }
    Ok(ok)
}
