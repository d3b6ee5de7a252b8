//! Job registry: CRUD over scheduled jobs.
//!
//! Composes the trigger translator and the metadata envelope over a
//! [`TaskBackend`]. The registry is the sole owner of job identity; the run
//! store references jobs by name only.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Local};

use jobloop_types::Job;

use crate::backend::{TaskBackend, TaskDefinition};
use crate::{Result, SchedulerError, envelope, translate};

pub struct JobRegistry {
    backend: Arc<dyn TaskBackend>,
    agent_command: String,
    logs_dir: PathBuf,
    /// Executable the scheduler invokes; normally our own binary.
    runner_exe: PathBuf,
}

impl JobRegistry {
    pub fn new(
        backend: Arc<dyn TaskBackend>,
        agent_command: impl Into<String>,
        logs_dir: impl Into<PathBuf>,
    ) -> Self {
        let runner_exe =
            std::env::current_exe().unwrap_or_else(|_| PathBuf::from("jobloop"));
        Self {
            backend,
            agent_command: agent_command.into(),
            logs_dir: logs_dir.into(),
            runner_exe,
        }
    }

    /// Override the executable registered as the task action (for tests).
    pub fn with_runner_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.runner_exe = exe.into();
        self
    }

    /// Swap the global agent command; existing tasks keep their action until
    /// the next [`Self::refresh_all_jobs`].
    pub fn update_agent_command(&mut self, command: impl Into<String>) {
        self.agent_command = command.into();
    }

    /// Register a new job with the host scheduler.
    pub fn create_job(&self, job: &Job) -> Result<()> {
        if job.name.trim().is_empty() {
            return Err(SchedulerError::EmptyJobName);
        }
        job.schedule.validate()?;

        let task = self.build_task(job);
        if task.triggers.is_empty() {
            tracing::warn!(job = %job.name, "Schedule yields no triggers; job will never run");
        }
        self.backend.register(&task)?;
        tracing::info!(job = %job.name, schedule = %job.schedule.describe(), "Job created");
        Ok(())
    }

    /// Update a job, possibly under a new name. Rename is register-new then
    /// delete-old, matching host schedulers that key tasks by name.
    pub fn update_job(&self, original_name: &str, job: &Job) -> Result<()> {
        if job.name.trim().is_empty() {
            return Err(SchedulerError::EmptyJobName);
        }
        job.schedule.validate()?;

        if self.backend.get(original_name)?.is_none() {
            return Err(SchedulerError::TaskNotFound(original_name.to_string()));
        }

        let task = self.build_task(job);
        self.backend.register(&task)?;

        if !original_name.eq_ignore_ascii_case(&job.name) {
            self.backend.delete(original_name)?;
        }
        Ok(())
    }

    /// Delete a job. Missing jobs are ignored.
    pub fn delete_job(&self, name: &str) -> Result<()> {
        self.backend.delete(name)?;
        Ok(())
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool> {
        self.backend.set_enabled(name, enabled)
    }

    pub fn pause_all(&self) -> Result<()> {
        for task in self.backend.list()? {
            self.backend.set_enabled(&task.name, false)?;
        }
        Ok(())
    }

    pub fn resume_all(&self) -> Result<()> {
        for task in self.backend.list()? {
            self.backend.set_enabled(&task.name, true)?;
        }
        Ok(())
    }

    /// All jobs we own. Tasks whose description is not a valid envelope are
    /// foreign and silently skipped.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for task in self.backend.list()? {
            if let Some(job) = job_from_task(&task) {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    pub fn get_job(&self, name: &str) -> Result<Option<Job>> {
        Ok(self
            .backend
            .get(name)?
            .as_ref()
            .and_then(job_from_task))
    }

    pub fn next_run_time(&self, name: &str) -> Result<Option<DateTime<Local>>> {
        Ok(self.backend.get(name)?.and_then(|t| t.next_run))
    }

    pub fn last_run_time(&self, name: &str) -> Result<Option<DateTime<Local>>> {
        Ok(self.backend.get(name)?.and_then(|t| t.last_run))
    }

    /// Re-register every job, rebuilding actions from the current agent
    /// command. Used after the global command changes.
    pub fn refresh_all_jobs(&self) -> Result<()> {
        for job in self.list_jobs()? {
            self.update_job(&job.name, &job)?;
        }
        Ok(())
    }

    fn build_task(&self, job: &Job) -> TaskDefinition {
        TaskDefinition {
            name: job.name.clone(),
            description: envelope::encode(job),
            enabled: job.enabled,
            triggers: translate::to_triggers(&job.schedule),
            action: self.build_action(job),
            last_run: None,
            next_run: None,
            running: false,
        }
    }

    /// The command line the scheduler fires. Command and prompt travel
    /// base64-encoded so multi-line prompts and quotes survive the host's
    /// argument quoting.
    fn build_action(&self, job: &Job) -> String {
        let command = job
            .agent_override
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.agent_command);
        let command_b64 = B64.encode(command.as_bytes());
        let prompt_b64 = B64.encode(job.prompt.as_bytes());
        format!(
            "\"{}\" run-job \"{}\" {command_b64} {prompt_b64} \"{}\"",
            self.runner_exe.display(),
            job.name,
            self.logs_dir.display(),
        )
    }
}

fn job_from_task(task: &TaskDefinition) -> Option<Job> {
    let envelope = envelope::decode(&task.description)?;
    Some(Job {
        name: task.name.clone(),
        prompt: envelope.prompt,
        schedule: translate::from_triggers(&task.triggers),
        silent: envelope.silent,
        enabled: task.enabled,
        agent_override: envelope.agent_override,
        color: envelope.color,
        icon: envelope.icon,
        last_run: task.last_run,
        next_run: task.next_run,
        is_running: task.running,
    })
}
