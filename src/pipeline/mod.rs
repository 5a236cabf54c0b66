//! The external translation pipeline.
//!
//! The bridge never inspects or reimplements PDF processing. It talks to the
//! pipeline through the [`Pipeline`] trait, which exposes exactly three
//! capabilities: probe a document's page count, run a job, and report
//! whether the pipeline is installed.

mod babeldoc;
pub mod mock;

pub use babeldoc::BabeldocCli;
pub use mock::{MockOutcome, MockPipeline, RecordedRun};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::error::BridgeError;
use crate::models::TranslationJob;

/// Errors reported by a pipeline implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The pipeline could not be started at all
    #[error("could not launch pipeline: {0}")]
    Launch(String),

    /// The pipeline ran and exited unsuccessfully
    #[error("pipeline exited with {status}")]
    Failed { status: String, diagnostics: String },

    /// The pipeline exceeded its execution time limit and was terminated
    #[error("pipeline exceeded {}s and was terminated", .after.as_secs())]
    TimedOut { after: Duration, diagnostics: String },

    /// The input could not be introspected
    #[error("could not read document: {0}")]
    Probe(String),
}

impl PipelineError {
    /// Classify for the caller
    pub fn into_bridge_error(self) -> BridgeError {
        match self {
            Self::Launch(reason) => BridgeError::DispatchError { reason },
            Self::Failed {
                status,
                diagnostics,
            } => BridgeError::PipelineFailed {
                reason: format!("pipeline exited with {}", status),
                diagnostics,
            },
            Self::TimedOut { after, diagnostics } => BridgeError::Timeout {
                stage: "running the translation pipeline".to_string(),
                seconds: after.as_secs(),
                diagnostics,
            },
            Self::Probe(reason) => BridgeError::DispatchError { reason },
        }
    }
}

/// A pipeline run that exited successfully
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Tail of the pipeline's output
    pub diagnostics: String,
}

/// Collaborator interface to the translation pipeline
#[async_trait]
pub trait Pipeline: Send + Sync + std::fmt::Debug {
    /// Short name for logs and status output
    fn name(&self) -> &str;

    /// Number of pages in the input document
    async fn probe_page_count(&self, input: &Path) -> Result<u32, PipelineError>;

    /// Run a validated job to completion
    async fn run(&self, job: &TranslationJob) -> Result<PipelineRun, PipelineError>;

    /// Verify the pipeline is installed, returning its version string
    async fn check(&self) -> Result<String, PipelineError>;
}

/// Keep at most `max_bytes` from the end of `text`, on a character boundary
pub(crate) fn tail(text: &str, max_bytes: usize) -> String {
    let text = text.trim();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_short_text_untouched() {
        assert_eq!(tail("  hello \n", 100), "hello");
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdefghij", 4), "...ghij");
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        let text = "翻訳翻訳翻訳";
        let out = tail(text, 4);
        assert!(out.starts_with("..."));
        assert!(out.ends_with('訳'));
    }

    #[test]
    fn test_mock_probe_and_check() {
        let mock = MockPipeline::new(7);
        let pages = tokio_test::block_on(mock.probe_page_count(Path::new("a.pdf"))).unwrap();
        assert_eq!(pages, 7);
        assert!(tokio_test::block_on(mock.check()).unwrap().starts_with("mock"));

        let unreadable = MockPipeline::unreadable();
        let err = tokio_test::block_on(unreadable.probe_page_count(Path::new("a.pdf")));
        assert!(matches!(err, Err(PipelineError::Probe(_))));
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            PipelineError::Launch("no such file".into())
                .into_bridge_error()
                .kind(),
            "DispatchError"
        );
        let err = PipelineError::Failed {
            status: "exit status: 2".into(),
            diagnostics: "boom".into(),
        }
        .into_bridge_error();
        assert_eq!(err.kind(), "PipelineFailed");
        assert_eq!(err.diagnostics(), Some("boom"));

        let err = PipelineError::TimedOut {
            after: Duration::from_secs(5),
            diagnostics: String::new(),
        }
        .into_bridge_error();
        assert_eq!(err.kind(), "Timeout");
    }
}
