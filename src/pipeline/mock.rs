//! Mock pipeline for testing purposes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Pipeline, PipelineError, PipelineRun};
use crate::dispatch::expected_outputs;
use crate::models::{OutputKind, PageSelector, TranslationJob};
use crate::providers::ProviderKind;

/// How the mock behaves when a job is run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Write every expected output and exit cleanly
    Succeed,
    /// Exit cleanly but leave out one output kind
    SucceedWithout(OutputKind),
    /// Exit with a failure status
    Fail { diagnostics: String },
    /// Fail to start
    LaunchError(String),
    /// Exceed the execution time limit
    TimeOut(Duration),
}

/// A job as the mock saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRun {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub lang_in: String,
    pub lang_out: String,
    pub pages: PageSelector,
    pub provider: ProviderKind,
    pub model: String,
    pub qps: u32,
    pub outputs: Vec<OutputKind>,
}

/// A mock pipeline that records jobs and produces configurable outcomes.
#[derive(Debug)]
pub struct MockPipeline {
    page_count: Option<u32>,
    outcome: Mutex<MockOutcome>,
    delay: Duration,
    runs: Mutex<Vec<RecordedRun>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockPipeline {
    /// Create a mock that reports `page_count` pages for every input
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count: Some(page_count),
            outcome: Mutex::new(MockOutcome::Succeed),
            delay: Duration::ZERO,
            runs: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Create a mock whose probe rejects every input
    pub fn unreadable() -> Self {
        Self {
            page_count: None,
            ..Self::new(0)
        }
    }

    /// Hold each run for `delay` before completing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_outcome(self, outcome: MockOutcome) -> Self {
        self.set_outcome(outcome);
        self
    }

    /// Change the outcome of subsequent runs
    pub fn set_outcome(&self, outcome: MockOutcome) {
        let mut guard = self.outcome.lock().unwrap();
        *guard = outcome;
    }

    /// Jobs run so far, in start order
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Highest number of simultaneously running jobs observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record(&self, job: &TranslationJob) {
        let run = RecordedRun {
            input_file: job.input_file.clone(),
            output_dir: job.output_dir.clone(),
            lang_in: job.lang_in.clone(),
            lang_out: job.lang_out.clone(),
            pages: job.pages.clone(),
            provider: job.provider.kind,
            model: job.provider.model.clone(),
            qps: job.qps,
            outputs: job.outputs.kinds(),
        };
        self.runs.lock().unwrap().push(run);
    }
}

/// Decrements the running counter when a run ends
struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Pipeline for MockPipeline {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_page_count(&self, input: &Path) -> Result<u32, PipelineError> {
        self.page_count
            .ok_or_else(|| PipelineError::Probe(format!("{} is not a PDF", input.display())))
    }

    async fn run(&self, job: &TranslationJob) -> Result<PipelineRun, PipelineError> {
        let outcome = self.outcome.lock().unwrap().clone();
        if let MockOutcome::LaunchError(reason) = &outcome {
            return Err(PipelineError::Launch(reason.clone()));
        }

        self.record(job);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let skipped = match outcome {
            MockOutcome::Succeed => None,
            MockOutcome::SucceedWithout(kind) => Some(kind),
            MockOutcome::Fail { diagnostics } => {
                return Err(PipelineError::Failed {
                    status: "exit status: 1".to_string(),
                    diagnostics,
                })
            }
            MockOutcome::TimeOut(after) => {
                return Err(PipelineError::TimedOut {
                    after,
                    diagnostics: "still translating".to_string(),
                })
            }
            MockOutcome::LaunchError(reason) => return Err(PipelineError::Launch(reason)),
        };

        for output in expected_outputs(job) {
            if Some(output.kind) == skipped {
                continue;
            }
            tokio::fs::write(&output.path, b"%PDF-1.7\n%mock\n")
                .await
                .map_err(|e| PipelineError::Failed {
                    status: "exit status: 1".to_string(),
                    diagnostics: e.to_string(),
                })?;
        }

        Ok(PipelineRun {
            diagnostics: "translation finished".to_string(),
        })
    }

    async fn check(&self) -> Result<String, PipelineError> {
        Ok(format!("mock {}", env!("CARGO_PKG_VERSION")))
    }
}
