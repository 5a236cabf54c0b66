//! Utility modules supporting request validation.
//!
//! - [`validate_request`]: Turn a raw tool request into a validated translation job
//! - [`resolve_unicode_path`]: Find an input file whose name differs only in Unicode normalization
//!
//! # Validation
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use babeldoc_mcp::config::ProvidersConfig;
//! use babeldoc_mcp::models::ToolRequest;
//! use babeldoc_mcp::pipeline::MockPipeline;
//! use babeldoc_mcp::providers::{ProviderDefaults, ProviderResolver};
//! use babeldoc_mcp::utils::validate_request;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let defaults = ProviderDefaults::from_env(&ProvidersConfig::default())?;
//! let resolver = ProviderResolver::new(Arc::new(defaults));
//! let request = ToolRequest::new("paper.pdf").langs("en", "ja").pages("1-3");
//!
//! let job = validate_request(&request, &resolver, &MockPipeline::new(12)).await?;
//! println!("translating pages {} of {}", job.pages, job.input_file.display());
//! # Ok(())
//! # }
//! ```

mod path;
mod validate;

pub use path::resolve_unicode_path;
pub use validate::{
    check_extension, check_writable, language_code, non_blank, validate_request, INPUT_EXTENSION,
};
