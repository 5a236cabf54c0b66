//! Job admission and execution.
//!
//! The [`Dispatcher`] owns a bounded admission gate. Jobs wait for a slot in
//! arrival order, then run the pipeline to completion and have their
//! outputs verified. Every dispatched job ends in exactly one terminal
//! [`JobResult`]; a slot is always released when its job ends, whatever the
//! outcome.

mod output;

pub use output::{expected_outputs, locate_outputs, output_file_name, ExpectedOutput};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::BridgeError;
use crate::models::{DispatcherStatus, JobResult, JobState, JobSuccess, TranslationJob};
use crate::pipeline::Pipeline;

/// Bounded-concurrency job runner
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pipeline: Arc<dyn Pipeline>,
    gate: Arc<Semaphore>,
    max_concurrent: usize,
    default_admission_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher admitting at most `max_concurrent` jobs at once (minimum 1)
    pub fn new(
        pipeline: Arc<dyn Pipeline>,
        max_concurrent: usize,
        default_admission_timeout: Option<Duration>,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            pipeline,
            gate: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            default_admission_timeout,
        }
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Jobs currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.gate.available_permits())
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            max_concurrent_jobs: self.max_concurrent,
            in_flight: self.in_flight(),
        }
    }

    /// Run a validated job to a terminal result
    pub async fn dispatch(&self, job: TranslationJob) -> JobResult {
        let result = self.run_job(&job).await;
        match &result {
            Ok(success) => tracing::info!(
                state = %JobState::Succeeded,
                input = %job.input_file.display(),
                outputs = success.outputs.len(),
                elapsed_ms = success.elapsed_ms,
                "Translation finished"
            ),
            Err(e) => tracing::warn!(
                state = %JobState::Failed,
                input = %job.input_file.display(),
                kind = e.kind(),
                "Translation failed: {}",
                e
            ),
        }
        result.into()
    }

    async fn run_job(&self, job: &TranslationJob) -> Result<JobSuccess, BridgeError> {
        tracing::debug!(
            state = %JobState::Queued,
            input = %job.input_file.display(),
            in_flight = self.in_flight(),
            "Waiting for a dispatch slot"
        );
        let _permit = self.admit(job).await?;

        prepare_output_dir(job).await?;

        let started_at = Utc::now();
        tracing::info!(
            state = %JobState::Running,
            pipeline = self.pipeline.name(),
            input = %job.input_file.display(),
            provider = %job.provider.kind,
            model = %job.provider.model,
            pages = %job.pages,
            "Running translation pipeline"
        );

        let run = self
            .pipeline
            .run(job)
            .await
            .map_err(|e| e.into_bridge_error())?;

        let outputs = locate_outputs(job, &run.diagnostics)?;
        Ok(JobSuccess::new(job, outputs, started_at))
    }

    /// Wait for a slot, honouring the job's admission timeout
    async fn admit(&self, job: &TranslationJob) -> Result<OwnedSemaphorePermit, BridgeError> {
        let acquire = self.gate.clone().acquire_owned();
        let permit = match job.admission_timeout.or(self.default_admission_timeout) {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                BridgeError::Timeout {
                    stage: "waiting for admission".to_string(),
                    seconds: limit.as_secs(),
                    diagnostics: String::new(),
                }
            })?,
            None => acquire.await,
        };
        permit.map_err(|e| BridgeError::DispatchError {
            reason: format!("admission gate closed: {}", e),
        })
    }
}

async fn prepare_output_dir(job: &TranslationJob) -> Result<(), BridgeError> {
    tokio::fs::create_dir_all(&job.output_dir)
        .await
        .map_err(|e| BridgeError::OutputDirUnwritable {
            path: job.output_dir.clone(),
            reason: e.to_string(),
        })
}
