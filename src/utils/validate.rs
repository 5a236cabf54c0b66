//! Tool request validation.
//!
//! Turns a raw [`ToolRequest`] into a [`TranslationJob`] or the first error
//! found. Checks run in a fixed order: input file, output directory,
//! language codes, output modes, qps, provider, page selector. The page
//! selector is last because it needs the document's page count, which is
//! the only step that calls the pipeline. Nothing here launches a
//! translation or writes to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::path::resolve_unicode_path;
use crate::error::BridgeError;
use crate::models::{
    OutputModes, PageSelector, ToolRequest, TranslationJob, DEFAULT_LANG_IN, DEFAULT_LANG_OUT,
};
use crate::pipeline::Pipeline;
use crate::providers::ProviderResolver;

/// Extension accepted for input documents (compared case-insensitively)
pub const INPUT_EXTENSION: &str = "pdf";

/// Treat empty and whitespace-only strings as absent
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate a request into a ready-to-run job
pub async fn validate_request(
    request: &ToolRequest,
    resolver: &ProviderResolver,
    pipeline: &dyn Pipeline,
) -> Result<TranslationJob, BridgeError> {
    let input_file = validate_input_file(request.input_file.as_deref()).await?;
    let output_dir = validate_output_dir(request.output_dir.as_deref(), &input_file)?;

    let lang_in = language_code("lang_in", request.lang_in.as_deref(), DEFAULT_LANG_IN)?;
    let lang_out = language_code("lang_out", request.lang_out.as_deref(), DEFAULT_LANG_OUT)?;

    let outputs = OutputModes::from_skip_flags(request.no_dual, request.no_mono);
    if outputs.is_empty() {
        return Err(BridgeError::NoOutputRequested);
    }

    if request.qps == Some(0) {
        return Err(BridgeError::invalid_value(
            "qps",
            "0",
            "must be a positive integer",
        ));
    }

    let provider = resolver.resolve(request.service.as_deref(), request.model.as_deref())?;

    let page_count = pipeline
        .probe_page_count(&input_file)
        .await
        .map_err(|e| BridgeError::InvalidInputType {
            path: input_file.clone(),
            reason: e.to_string(),
        })?;

    let raw_pages = request.pages.as_deref().unwrap_or_default();
    let pages = PageSelector::parse(raw_pages, page_count)
        .map_err(|e| e.into_bridge_error(raw_pages))?;

    let qps = request.qps.unwrap_or(provider.qps);

    Ok(TranslationJob {
        input_file,
        output_dir,
        lang_in,
        lang_out,
        pages,
        page_count,
        provider,
        outputs,
        watermark: request.watermark.unwrap_or(true),
        qps,
        admission_timeout: request.admission_timeout_secs.map(Duration::from_secs),
    })
}

/// Resolve the input to an absolute, readable PDF path
async fn validate_input_file(raw: Option<&str>) -> Result<PathBuf, BridgeError> {
    let raw = non_blank(raw)
        .ok_or_else(|| BridgeError::invalid_argument("input_file", "is required"))?;

    let path = resolve_unicode_path(raw).ok_or_else(|| BridgeError::InputNotFound {
        path: PathBuf::from(raw),
    })?;

    let invalid = |reason: String| BridgeError::InvalidInputType {
        path: path.clone(),
        reason,
    };

    if path.is_dir() {
        return Err(invalid("is a directory".to_string()));
    }
    check_extension(&path).map_err(invalid)?;

    tokio::fs::File::open(&path)
        .await
        .map_err(|e| invalid(format!("not readable: {}", e)))?;

    tokio::fs::canonicalize(&path)
        .await
        .map_err(|e| invalid(format!("cannot resolve path: {}", e)))
}

/// Check that `path` carries the expected document extension
pub fn check_extension(path: &Path) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(INPUT_EXTENSION) => Ok(()),
        Some(ext) => Err(format!("expected a .{} file, got .{}", INPUT_EXTENSION, ext)),
        None => Err(format!("expected a .{} file", INPUT_EXTENSION)),
    }
}

/// Pick the output directory and make sure it can be created
fn validate_output_dir(raw: Option<&str>, input_file: &Path) -> Result<PathBuf, BridgeError> {
    let dir = match non_blank(raw) {
        Some(dir) => absolutize(Path::new(dir))?,
        None => input_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    check_writable(&dir)?;
    Ok(dir)
}

fn absolutize(path: &Path) -> Result<PathBuf, BridgeError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| BridgeError::OutputDirUnwritable {
            path: path.to_path_buf(),
            reason: format!("cannot resolve relative path: {}", e),
        })
}

/// The directory, or its nearest existing ancestor, must be a writable directory
pub fn check_writable(dir: &Path) -> Result<(), BridgeError> {
    let unwritable = |reason: &str| BridgeError::OutputDirUnwritable {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    };

    let existing = dir
        .ancestors()
        .find(|ancestor| ancestor.exists())
        .ok_or_else(|| unwritable("no existing ancestor directory"))?;

    let metadata = std::fs::metadata(existing).map_err(|e| unwritable(&e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unwritable(&format!(
            "{} is not a directory",
            existing.display()
        )));
    }
    // Permission bits do not account for ownership, ACLs or read-only mounts
    tempfile::tempfile_in(existing).map_err(|e| {
        unwritable(&format!("cannot create files in {}: {}", existing.display(), e))
    })?;
    Ok(())
}

/// Resolve a language code, falling back to `default` when absent
pub fn language_code(
    field: &str,
    value: Option<&str>,
    default: &str,
) -> Result<String, BridgeError> {
    match value {
        None => Ok(default.to_string()),
        Some(code) if code.trim().is_empty() => Err(BridgeError::InvalidLanguageCode {
            field: field.to_string(),
            value: code.to_string(),
        }),
        Some(code) => Ok(code.trim().to_string()),
    }
}
