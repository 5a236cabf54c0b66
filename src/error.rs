//! Error taxonomy shared by every stage of a translation request.
//!
//! Validation-stage errors are raised before any external process is
//! launched; dispatch-stage errors (`Timeout`, `DispatchError`,
//! `PipelineFailed`) can only occur once a job has been handed to the
//! dispatcher. Each error names the offending field and value where one
//! exists so the caller can correct the request instead of retrying blindly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can terminate a translation request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument {
        field: String,
        reason: String,
        value: Option<String>,
    },

    #[error("Input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("Invalid input file {}: {reason}", .path.display())]
    InvalidInputType { path: PathBuf, reason: String },

    #[error("Output directory {} is not writable: {reason}", .path.display())]
    OutputDirUnwritable { path: PathBuf, reason: String },

    #[error("Invalid language code for '{field}': {value:?}")]
    InvalidLanguageCode { field: String, value: String },

    #[error("Invalid page selector {value:?}: {reason}")]
    InvalidPageSelector { value: String, reason: String },

    #[error("No output requested: no_dual and no_mono are both true")]
    NoOutputRequested,

    #[error("Unknown service: {name}. Supported services: {supported}")]
    UnknownProvider { name: String, supported: String },

    #[error("Service '{provider}' is not configured: {env_var} is not set")]
    ProviderNotConfigured { provider: String, env_var: String },

    #[error("Timed out while {stage} after {seconds}s")]
    Timeout {
        stage: String,
        seconds: u64,
        diagnostics: String,
    },

    #[error("Failed to launch translation pipeline: {reason}")]
    DispatchError { reason: String },

    #[error("Translation pipeline failed: {reason}")]
    PipelineFailed { reason: String, diagnostics: String },
}

impl BridgeError {
    /// Stable kind name reported across the tool boundary
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::InputNotFound { .. } => "InputNotFound",
            Self::InvalidInputType { .. } => "InvalidInputType",
            Self::OutputDirUnwritable { .. } => "OutputDirUnwritable",
            Self::InvalidLanguageCode { .. } => "InvalidLanguageCode",
            Self::InvalidPageSelector { .. } => "InvalidPageSelector",
            Self::NoOutputRequested => "NoOutputRequested",
            Self::UnknownProvider { .. } => "UnknownProvider",
            Self::ProviderNotConfigured { .. } => "ProviderNotConfigured",
            Self::Timeout { .. } => "Timeout",
            Self::DispatchError { .. } => "DispatchError",
            Self::PipelineFailed { .. } => "PipelineFailed",
        }
    }

    /// Whether the error was raised before any external process was launched
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Timeout { .. } | Self::DispatchError { .. } | Self::PipelineFailed { .. }
        )
    }

    /// The request field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { field, .. } | Self::InvalidLanguageCode { field, .. } => {
                Some(field.as_str())
            }
            Self::InputNotFound { .. } | Self::InvalidInputType { .. } => Some("input_file"),
            Self::OutputDirUnwritable { .. } => Some("output_dir"),
            Self::InvalidPageSelector { .. } => Some("pages"),
            Self::NoOutputRequested => Some("no_dual"),
            Self::UnknownProvider { .. } | Self::ProviderNotConfigured { .. } => Some("service"),
            Self::Timeout { .. } | Self::DispatchError { .. } | Self::PipelineFailed { .. } => None,
        }
    }

    /// The offending value, if any
    pub fn value(&self) -> Option<String> {
        match self {
            Self::InputNotFound { path }
            | Self::InvalidInputType { path, .. }
            | Self::OutputDirUnwritable { path, .. } => Some(path.display().to_string()),
            Self::InvalidLanguageCode { value, .. } | Self::InvalidPageSelector { value, .. } => {
                Some(value.clone())
            }
            Self::InvalidArgument { value, .. } => value.clone(),
            Self::UnknownProvider { name, .. } => Some(name.clone()),
            Self::ProviderNotConfigured { provider, .. } => Some(provider.clone()),
            _ => None,
        }
    }

    /// Diagnostic text captured from the pipeline, if any
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Timeout { diagnostics, .. } | Self::PipelineFailed { diagnostics, .. }
                if !diagnostics.is_empty() =>
            {
                Some(diagnostics.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn invalid_argument(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
            value: None,
        }
    }

    pub(crate) fn invalid_value(
        field: &str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
            value: Some(value.into()),
        }
    }
}

/// Structured error returned to the calling agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error kind (e.g. "ProviderNotConfigured")
    pub kind: String,

    /// Human-readable message
    pub message: String,

    /// Request field at fault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Offending value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Output captured from the translation pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,

    /// Whether the request was rejected before dispatch
    pub validation: bool,
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

impl ToolError {
    /// An error raised by the bridge itself rather than by a request
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: "InternalError".to_string(),
            message: message.into(),
            field: None,
            value: None,
            diagnostics: None,
            validation: false,
        }
    }

    /// Encode as the JSON text carried in a protocol error message
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl From<&BridgeError> for ToolError {
    fn from(err: &BridgeError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
            value: err.value(),
            diagnostics: err.diagnostics().map(str::to_string),
            validation: err.is_validation(),
        }
    }
}

impl From<BridgeError> for ToolError {
    fn from(err: BridgeError) -> Self {
        Self::from(&err)
    }
}
