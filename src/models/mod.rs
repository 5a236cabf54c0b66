//! Core data models for translation requests, jobs and results.

mod pages;
mod request;
mod result;

pub use pages::{PageSelector, PageSelectorError};
pub use request::{
    OutputKind, OutputModes, ToolRequest, TranslationJob, DEFAULT_LANG_IN, DEFAULT_LANG_OUT,
};
pub use result::{
    DispatcherStatus, JobResult, JobState, JobSuccess, LanguageInfo, ProviderStatus,
    StatusSnapshot, SUPPORTED_LANGUAGES,
};
