use clap::Subcommand;

use jobloop_store::{LogStore, format_entry};
use jobloop_types::RunEntry;

#[derive(Subcommand)]
pub enum LogCommands {
    /// Show the most recent runs
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Print the full stored output for each run
        #[arg(long)]
        full: bool,
    },
    /// Search runs by job name, prompt, or output
    Search {
        text: String,

        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Delete runs older than the retention window
    Purge {
        /// Override the configured retention in days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete all recorded runs, or a single job's runs
    Clear {
        #[arg(long)]
        job: Option<String>,
    },
}

pub async fn run(command: LogCommands) -> anyhow::Result<()> {
    let settings = crate::load_settings();
    let store = LogStore::open(&settings.logs_dir)?;

    match command {
        LogCommands::Recent {
            limit,
            offset,
            full,
        } => {
            let entries = store.recent(limit, offset).await?;
            if entries.is_empty() {
                println!("No runs recorded.");
                return Ok(());
            }
            for entry in &entries {
                if full {
                    println!("{}", format_entry(entry));
                } else {
                    print_line(entry);
                }
            }
        }
        LogCommands::Search { text, limit } => {
            let entries = store.search(&text, limit).await?;
            if entries.is_empty() {
                println!("No runs matching '{text}'.");
                return Ok(());
            }
            for entry in &entries {
                print_line(entry);
            }
        }
        LogCommands::Purge { days } => {
            let days = days.unwrap_or(settings.log_retention_days);
            let purged = store.purge_older_than(days).await?;
            println!("Purged {purged} run(s) older than {days} day(s).");
        }
        LogCommands::Clear { job } => match job {
            Some(name) => {
                store.clear_job(&name).await?;
                println!("Cleared runs for job '{name}'.");
            }
            None => {
                store.clear_all().await?;
                println!("Cleared all runs.");
            }
        },
    }

    Ok(())
}

fn print_line(entry: &RunEntry) {
    println!(
        "{:>6}  {}  {:<9}  {:>7.1}s  {}",
        entry.id,
        entry.start_time.format("%Y-%m-%d %H:%M:%S"),
        entry.status.to_string(),
        entry.duration_seconds,
        entry.job_name
    );
}
