//! Status reporting and result rendering.
//!
//! Everything the tools return to the agent is shaped here: the provider
//! and capacity snapshot for `get_translation_status`, and the success
//! payload or structured error for `translate_pdf`.

use serde_json::{json, Value};

use crate::dispatch::Dispatcher;
use crate::error::ToolError;
use crate::models::{JobResult, JobSuccess, ProviderStatus, StatusSnapshot};
use crate::providers::ProviderDefaults;

/// Service name reported in status payloads
pub const SERVICE_NAME: &str = "babeldoc-mcp";

/// Point-in-time view of providers, languages and dispatcher capacity.
///
/// Pure read: neither the provider table nor the admission gate is modified.
pub fn snapshot(defaults: &ProviderDefaults, dispatcher: &Dispatcher) -> StatusSnapshot {
    let providers = defaults
        .all()
        .map(|settings| ProviderStatus {
            id: settings.kind,
            name: settings.kind.name().to_string(),
            configured: settings.is_configured(),
            env_var: settings.kind.api_key_var(),
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
            qps: settings.qps,
        })
        .collect();

    StatusSnapshot {
        service: SERVICE_NAME.to_string(),
        version: crate::VERSION.to_string(),
        default_service: defaults.default_kind(),
        providers,
        languages: StatusSnapshot::supported_languages(),
        dispatcher: dispatcher.status(),
    }
}

/// Status snapshot as a tool payload
pub fn render_snapshot(snapshot: &StatusSnapshot) -> Result<Value, ToolError> {
    serde_json::to_value(snapshot).map_err(|e| ToolError::internal(e.to_string()))
}

/// Success payload of `translate_pdf`
pub fn render_success(success: &JobSuccess) -> Value {
    json!({
        "status": "success",
        "input_file": success.input_file,
        "output_dir": success.output_dir,
        "lang_in": success.lang_in,
        "lang_out": success.lang_out,
        "service": success.service.id(),
        "model": success.model,
        "pages": success.pages,
        "qps": success.qps,
        "watermark": success.watermark,
        "outputs": success.outputs,
        "started_at": success.started_at.to_rfc3339(),
        "finished_at": success.finished_at.to_rfc3339(),
        "elapsed_ms": success.elapsed_ms,
    })
}

/// Render a terminal job result for the caller
pub fn render_result(result: JobResult) -> Result<Value, ToolError> {
    match result {
        JobResult::Succeeded(success) => Ok(render_success(&success)),
        JobResult::Failed(err) => Err(ToolError::from(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvidersConfig;
    use crate::error::BridgeError;
    use crate::models::PageSelector;
    use crate::pipeline::MockPipeline;
    use crate::providers::ProviderKind;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn defaults() -> ProviderDefaults {
        ProviderDefaults::from_lookup(&ProvidersConfig::default(), |var| {
            (var == "OPENROUTER_API_KEY").then(|| "sk-or-test".to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_snapshot() {
        let dispatcher = Dispatcher::new(Arc::new(MockPipeline::new(1)), 3, None);
        let snapshot = snapshot(&defaults(), &dispatcher);

        assert_eq!(snapshot.service, "babeldoc-mcp");
        assert_eq!(snapshot.default_service, ProviderKind::OpenRouter);
        assert_eq!(snapshot.providers.len(), 2);
        assert!(snapshot.providers[0].configured);
        assert!(!snapshot.providers[1].configured);
        assert_eq!(snapshot.providers[1].model, "gpt-4o-mini");
        assert_eq!(snapshot.languages.len(), 13);
        assert_eq!(snapshot.dispatcher.max_concurrent_jobs, 3);
        assert_eq!(snapshot.dispatcher.in_flight, 0);

        let value = render_snapshot(&snapshot).unwrap();
        assert_eq!(value["providers"][1]["id"], "openai");
        assert_eq!(value["providers"][1]["configured"], false);
        assert_eq!(value["default_service"], "openrouter");
        assert_eq!(value["languages"][0]["code"], "en");
    }

    #[test]
    fn test_render_success() {
        let now = Utc::now();
        let success = JobSuccess {
            input_file: PathBuf::from("/docs/paper.pdf"),
            output_dir: PathBuf::from("/docs"),
            lang_in: "en".to_string(),
            lang_out: "zh".to_string(),
            service: ProviderKind::OpenRouter,
            model: "google/gemini-2.5-flash".to_string(),
            pages: PageSelector::Pages(vec![1, 2, 3, 5]),
            qps: 4,
            watermark: true,
            outputs: vec![PathBuf::from("/docs/paper.zh.dual.pdf")],
            started_at: now,
            finished_at: now,
            elapsed_ms: 0,
        };

        let value = render_result(JobResult::Succeeded(success)).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["service"], "openrouter");
        assert_eq!(value["pages"], "1-3,5");
        assert_eq!(value["outputs"][0], "/docs/paper.zh.dual.pdf");
    }

    #[test]
    fn test_render_failure() {
        let err = render_result(JobResult::Failed(BridgeError::ProviderNotConfigured {
            provider: "openai".to_string(),
            env_var: "OPENAI_API_KEY".to_string(),
        }))
        .unwrap_err();

        assert_eq!(err.kind, "ProviderNotConfigured");
        assert!(err.message.contains("openai"));
        assert!(err.validation);

        let decoded: ToolError = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(decoded, err);
    }
}
