use clap::Subcommand;

use jobloop_types::{Job, Schedule};

#[derive(Subcommand)]
pub enum JobCommands {
    /// Register a new job
    Add {
        /// Job name, unique case-insensitively
        name: String,

        /// Prompt sent to the agent; {date}, {time} and {datetime} are
        /// substituted at run time
        #[arg(long)]
        prompt: String,

        /// Schedule as JSON, e.g. '{"type":"daily","time":"09:00:00"}'.
        /// Defaults to daily at 09:00.
        #[arg(long)]
        schedule: Option<String>,

        /// Run without notifications
        #[arg(long)]
        silent: bool,

        /// Per-job agent command override
        #[arg(long)]
        agent: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        /// Register the job disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List registered jobs
    List,
    /// Delete a job
    Remove { name: String },
    /// Enable a job
    Enable { name: String },
    /// Disable a job without deleting it
    Disable { name: String },
    /// Disable every registered job
    PauseAll,
    /// Re-enable every registered job
    ResumeAll,
}

pub async fn run(command: JobCommands) -> anyhow::Result<()> {
    let settings = crate::load_settings();
    let registry = crate::make_registry(&settings)?;

    match command {
        JobCommands::Add {
            name,
            prompt,
            schedule,
            silent,
            agent,
            color,
            icon,
            disabled,
        } => {
            let schedule = match schedule {
                Some(json) => serde_json::from_str::<Schedule>(&json)?,
                None => Schedule::default(),
            };
            let mut job = Job::new(name, prompt);
            job.schedule = schedule;
            job.silent = silent;
            job.agent_override = agent;
            job.color = color;
            job.icon = icon;
            job.enabled = !disabled;

            registry.create_job(&job)?;
            println!("Created job '{}': {}", job.name, job.schedule.describe());
        }
        JobCommands::List => {
            let jobs = registry.list_jobs()?;
            if jobs.is_empty() {
                println!("No jobs registered.");
                return Ok(());
            }
            for job in jobs {
                let state = if job.enabled { "enabled " } else { "disabled" };
                let next = match job.next_run {
                    Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
                    None => "-".to_string(),
                };
                println!(
                    "{:<24} {} next: {:<17} {}",
                    job.name,
                    state,
                    next,
                    job.schedule.describe()
                );
            }
        }
        JobCommands::Remove { name } => {
            registry.delete_job(&name)?;
            println!("Removed job '{name}'.");
        }
        JobCommands::Enable { name } => {
            registry.set_enabled(&name, true)?;
            println!("Enabled job '{name}'.");
        }
        JobCommands::Disable { name } => {
            registry.set_enabled(&name, false)?;
            println!("Disabled job '{name}'.");
        }
        JobCommands::PauseAll => {
            registry.pause_all()?;
            println!("All jobs paused.");
        }
        JobCommands::ResumeAll => {
            registry.resume_all()?;
            println!("All jobs resumed.");
        }
    }

    Ok(())
}
