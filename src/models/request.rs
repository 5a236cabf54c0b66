//! Translation request models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::pages::PageSelector;
use crate::error::BridgeError;
use crate::providers::ProviderConfig;

/// Default source language
pub const DEFAULT_LANG_IN: &str = "en";

/// Default target language
pub const DEFAULT_LANG_OUT: &str = "zh";

/// Raw `translate_pdf` arguments as received from the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolRequest {
    /// Path to the input PDF
    pub input_file: Option<String>,

    /// Directory for the translated PDFs (defaults to the input's directory)
    pub output_dir: Option<String>,

    /// Source language code
    pub lang_in: Option<String>,

    /// Target language code
    pub lang_out: Option<String>,

    /// Page selector (e.g. "1,3-5,7")
    pub pages: Option<String>,

    /// Skip the bilingual output
    pub no_dual: bool,

    /// Skip the monolingual output
    pub no_mono: bool,

    /// Translation service name
    pub service: Option<String>,

    /// Model override
    pub model: Option<String>,

    /// Queries-per-second override for the translation backend
    pub qps: Option<u32>,

    /// Whether to watermark the output
    pub watermark: Option<bool>,

    /// How long to wait for a free dispatch slot before giving up
    pub admission_timeout_secs: Option<u64>,
}

impl ToolRequest {
    /// Create a request for the given input file with every other field defaulted
    pub fn new(input_file: impl Into<String>) -> Self {
        Self {
            input_file: Some(input_file.into()),
            ..Default::default()
        }
    }

    /// Decode tool-call arguments.
    ///
    /// A field holding JSON `null` counts as absent. A field of the wrong type
    /// is reported by name together with the value that was sent.
    pub fn from_args(args: Value) -> Result<Self, BridgeError> {
        let args: Map<String, Value> = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            other => {
                return Err(BridgeError::invalid_value(
                    "arguments",
                    other.to_string(),
                    "expected an object",
                ))
            }
        };

        for (field, value) in &args {
            let single = Map::from_iter([(field.clone(), value.clone())]);
            if let Err(e) = serde_json::from_value::<Self>(Value::Object(single)) {
                let shown = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                return Err(BridgeError::invalid_value(field, shown, e.to_string()));
            }
        }

        serde_json::from_value(Value::Object(args))
            .map_err(|e| BridgeError::invalid_argument("arguments", e.to_string()))
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the language pair
    pub fn langs(mut self, lang_in: impl Into<String>, lang_out: impl Into<String>) -> Self {
        self.lang_in = Some(lang_in.into());
        self.lang_out = Some(lang_out.into());
        self
    }

    /// Set the page selector
    pub fn pages(mut self, pages: impl Into<String>) -> Self {
        self.pages = Some(pages.into());
        self
    }

    /// Set which outputs to skip
    pub fn skip(mut self, no_dual: bool, no_mono: bool) -> Self {
        self.no_dual = no_dual;
        self.no_mono = no_mono;
        self
    }

    /// Set the translation service
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the model override
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the qps override
    pub fn qps(mut self, qps: u32) -> Self {
        self.qps = Some(qps);
        self
    }

    /// Enable or disable the watermark
    pub fn watermark(mut self, watermark: bool) -> Self {
        self.watermark = Some(watermark);
        self
    }

    /// Set the admission timeout
    pub fn admission_timeout_secs(mut self, secs: u64) -> Self {
        self.admission_timeout_secs = Some(secs);
        self
    }
}

bitflags::bitflags! {
    /// Output documents a job must produce
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OutputModes: u8 {
        const MONO = 1 << 0;
        const DUAL = 1 << 1;
    }
}

impl OutputModes {
    /// Build from the request's skip flags
    pub fn from_skip_flags(no_dual: bool, no_mono: bool) -> Self {
        let mut modes = Self::empty();
        if !no_mono {
            modes |= Self::MONO;
        }
        if !no_dual {
            modes |= Self::DUAL;
        }
        modes
    }

    /// Requested output kinds, monolingual first
    pub fn kinds(&self) -> Vec<OutputKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.contains(Self::MONO) {
            kinds.push(OutputKind::Mono);
        }
        if self.contains(Self::DUAL) {
            kinds.push(OutputKind::Dual);
        }
        kinds
    }
}

/// One kind of translated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Translated text only
    Mono,
    /// Original and translation side by side
    Dual,
}

impl OutputKind {
    /// File-name suffix for this kind
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Mono => "mono",
            Self::Dual => "dual",
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A validated, ready-to-run translation job
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// Absolute path of the input PDF
    pub input_file: PathBuf,

    /// Output directory (created by the dispatcher if absent)
    pub output_dir: PathBuf,

    pub lang_in: String,
    pub lang_out: String,

    /// Pages to translate
    pub pages: PageSelector,

    /// Page count reported by the probe
    pub page_count: u32,

    /// Resolved translation backend
    pub provider: ProviderConfig,

    /// Requested outputs (never empty)
    pub outputs: OutputModes,

    pub watermark: bool,

    /// Effective queries-per-second handed to the pipeline
    pub qps: u32,

    /// Caller's admission timeout, if any
    pub admission_timeout: Option<Duration>,
}

impl TranslationJob {
    /// File stem of the input (e.g. "paper" for "paper.pdf")
    pub fn stem(&self) -> String {
        self.input_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension of the input, as written (e.g. "pdf")
    pub fn extension(&self) -> String {
        self.input_file
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pdf".to_string())
    }

    /// Input file as a path reference
    pub fn input(&self) -> &Path {
        &self.input_file
    }
}
