//! Job queue abstraction
//!
//! Admission only needs an `enqueue` capability; the processing half is a
//! function over a descriptor invoked by the worker runtime. The two sides
//! are decoupled by the [`JobQueue`] trait so the in-process Tokio
//! implementation can be swapped for an external broker without touching
//! either side. The persisted job row remains the source of truth: a
//! descriptor lost with the process is recovered from the store, never from
//! the queue.

pub mod worker;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::AnalysisOptions;

/// Queue placement priority; pro-plan jobs go to the front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Normal,
    High,
}

/// Everything a worker needs to process one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub user_id: String,
    pub url: String,
    pub options: AnalysisOptions,
    pub priority: JobPriority,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,
}

/// Asynchronous work distribution from job creation to the worker pool
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: JobDescriptor) -> Result<(), QueueError>;
}

/// In-process queue over Tokio channels, one lane per priority
pub struct TokioJobQueue {
    high_tx: mpsc::UnboundedSender<JobDescriptor>,
    normal_tx: mpsc::UnboundedSender<JobDescriptor>,
}

/// Consumer half held by the worker runtime
pub struct JobReceiver {
    high_rx: mpsc::UnboundedReceiver<JobDescriptor>,
    normal_rx: mpsc::UnboundedReceiver<JobDescriptor>,
}

impl TokioJobQueue {
    pub fn new() -> (Self, JobReceiver) {
        let (high_tx, high_rx) = mpsc::unbounded_channel();
        let (normal_tx, normal_rx) = mpsc::unbounded_channel();
        (
            Self { high_tx, normal_tx },
            JobReceiver { high_rx, normal_rx },
        )
    }
}

impl JobQueue for TokioJobQueue {
    fn enqueue(&self, job: JobDescriptor) -> Result<(), QueueError> {
        let lane = match job.priority {
            JobPriority::High => &self.high_tx,
            JobPriority::Normal => &self.normal_tx,
        };
        lane.send(job).map_err(|_| QueueError::Closed)
    }
}

impl JobReceiver {
    /// Receive the next descriptor, draining the high-priority lane first.
    ///
    /// Returns `None` once both senders are gone and the lanes are empty.
    pub async fn recv(&mut self) -> Option<JobDescriptor> {
        if let Ok(job) = self.high_rx.try_recv() {
            return Some(job);
        }

        tokio::select! {
            biased;
            job = self.high_rx.recv() => match job {
                Some(job) => Some(job),
                None => self.normal_rx.recv().await,
            },
            job = self.normal_rx.recv() => job,
        }
    }
}
