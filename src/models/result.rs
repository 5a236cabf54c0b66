//! Job lifecycle and result models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::pages::PageSelector;
use super::request::TranslationJob;
use crate::error::BridgeError;
use crate::providers::ProviderKind;

/// Language codes advertised by `translation_status`
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh", "Chinese"),
    ("vi", "Vietnamese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("th", "Thai"),
    ("id", "Indonesian"),
];

/// Lifecycle of a single translation request.
///
/// `Received -> Validated -> Queued -> Running -> Succeeded | Failed`.
/// A request can fail from any non-terminal state; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Received,
    Validated,
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A completed translation
#[derive(Debug, Clone, Serialize)]
pub struct JobSuccess {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub lang_in: String,
    pub lang_out: String,
    pub service: ProviderKind,
    pub model: String,
    pub pages: PageSelector,
    pub qps: u32,
    pub watermark: bool,

    /// Absolute paths of the produced files, monolingual first
    pub outputs: Vec<PathBuf>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl JobSuccess {
    pub fn new(job: &TranslationJob, outputs: Vec<PathBuf>, started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        let elapsed_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            input_file: job.input_file.clone(),
            output_dir: job.output_dir.clone(),
            lang_in: job.lang_in.clone(),
            lang_out: job.lang_out.clone(),
            service: job.provider.kind,
            model: job.provider.model.clone(),
            pages: job.pages.clone(),
            qps: job.qps,
            watermark: job.watermark,
            outputs,
            started_at,
            finished_at,
            elapsed_ms,
        }
    }
}

/// Terminal outcome of a translation request
#[derive(Debug, Clone)]
pub enum JobResult {
    Succeeded(JobSuccess),
    Failed(BridgeError),
}

impl JobResult {
    pub fn state(&self) -> JobState {
        match self {
            Self::Succeeded(_) => JobState::Succeeded,
            Self::Failed(_) => JobState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn into_result(self) -> Result<JobSuccess, BridgeError> {
        match self {
            Self::Succeeded(success) => Ok(success),
            Self::Failed(err) => Err(err),
        }
    }
}

impl From<Result<JobSuccess, BridgeError>> for JobResult {
    fn from(result: Result<JobSuccess, BridgeError>) -> Self {
        match result {
            Ok(success) => Self::Succeeded(success),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Read-only view of one provider's defaults
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub id: ProviderKind,
    pub name: String,
    pub configured: bool,
    pub env_var: String,
    pub model: String,
    pub base_url: String,
    pub qps: u32,
}

/// Admission gate occupancy
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatcherStatus {
    pub max_concurrent_jobs: usize,
    pub in_flight: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

/// Payload of `translation_status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub service: String,
    pub version: String,
    pub default_service: ProviderKind,
    pub providers: Vec<ProviderStatus>,
    pub languages: Vec<LanguageInfo>,
    pub dispatcher: DispatcherStatus,
}

impl StatusSnapshot {
    pub fn supported_languages() -> Vec<LanguageInfo> {
        SUPPORTED_LANGUAGES
            .iter()
            .map(|(code, name)| LanguageInfo { code, name })
            .collect()
    }
}
