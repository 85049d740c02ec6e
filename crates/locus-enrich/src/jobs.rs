//! In-process registry of named jobs.
//!
//! At most one instance of a job name runs at a time; a second start is
//! rejected, never queued. Each job keeps a bounded tail of log lines.

use std::{
  collections::{HashMap, VecDeque},
  fmt,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Error, Result};

pub const ENRICHMENT_JOB: &str = "enrichment";
pub const METRICS_JOB: &str = "metrics";

/// Log lines retained per job.
pub const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
  #[default]
  Idle,
  Running,
  Ok,
  Error,
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Idle => "idle",
      Self::Running => "running",
      Self::Ok => "ok",
      Self::Error => "error",
    })
  }
}

/// Point-in-time view of one job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobState {
  pub status:      JobStatus,
  pub started_at:  Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
  pub log:         VecDeque<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
  jobs: Arc<Mutex<HashMap<String, JobState>>>,
}

impl JobRegistry {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, JobState>> {
    // A panic while holding the lock leaves plain data behind; keep going.
    self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Mark `name` as running, or fail if it already is.
  pub fn start(&self, name: &str) -> Result<JobGuard> {
    let mut jobs = self.lock();
    let state = jobs.entry(name.to_owned()).or_default();
    if state.status == JobStatus::Running {
      return Err(Error::JobAlreadyRunning(name.to_owned()));
    }
    *state = JobState {
      status: JobStatus::Running,
      started_at: Some(Utc::now()),
      ..JobState::default()
    };
    Ok(JobGuard { registry: self.clone(), name: name.to_owned(), finished: false })
  }

  /// Current state of `name`; never-started jobs are idle.
  pub fn state(&self, name: &str) -> JobState {
    self.lock().get(name).cloned().unwrap_or_default()
  }

  fn update(&self, name: &str, f: impl FnOnce(&mut JobState)) {
    let mut jobs = self.lock();
    f(jobs.entry(name.to_owned()).or_default());
  }
}

/// Held for the duration of a job. Dropping it without [`JobGuard::finish`]
/// marks the job as failed.
#[derive(Debug)]
pub struct JobGuard {
  registry: JobRegistry,
  name:     String,
  finished: bool,
}

impl JobGuard {
  /// Append a line to the job's log tail.
  pub fn log(&self, line: impl Into<String>) {
    let line = line.into();
    self.registry.update(&self.name, |state| {
      state.log.push_back(line);
      while state.log.len() > MAX_LOG_LINES {
        state.log.pop_front();
      }
    });
  }

  /// Record the outcome and release the job.
  pub fn finish<T, E: fmt::Display>(mut self, outcome: &std::result::Result<T, E>) {
    let status = match outcome {
      Ok(_) => JobStatus::Ok,
      Err(e) => {
        self.log(format!("[error] {e}"));
        JobStatus::Error
      }
    };
    self.close(status);
  }

  fn close(&mut self, status: JobStatus) {
    self.finished = true;
    self.registry.update(&self.name, |state| {
      state.status = status;
      state.finished_at = Some(Utc::now());
    });
  }
}

impl Drop for JobGuard {
  fn drop(&mut self) {
    if !self.finished {
      self.log("[error] job ended without reporting an outcome");
      self.close(JobStatus::Error);
    }
  }
}
