//! Tool handlers for translation and status.

use std::sync::Arc;

use serde_json::Value;

use super::tools::ToolHandler;
use crate::bridge::TranslationBridge;
use crate::error::ToolError;
use crate::status::{render_result, render_snapshot};

/// Handler for translate_pdf
#[derive(Debug)]
pub struct TranslatePdfHandler {
    pub bridge: Arc<TranslationBridge>,
}

#[async_trait::async_trait]
impl ToolHandler for TranslatePdfHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let result = self.bridge.translate_args(args).await;
        render_result(result)
    }
}

/// Handler for get_translation_status
#[derive(Debug)]
pub struct GetTranslationStatusHandler {
    pub bridge: Arc<TranslationBridge>,
}

#[async_trait::async_trait]
impl ToolHandler for GetTranslationStatusHandler {
    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        render_snapshot(&self.bridge.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ProvidersConfig};
    use crate::pipeline::MockPipeline;
    use crate::providers::ProviderDefaults;
    use serde_json::json;

    fn bridge(mock: Arc<MockPipeline>) -> Arc<TranslationBridge> {
        let defaults = ProviderDefaults::from_lookup(&ProvidersConfig::default(), |var| {
            (var == "OPENROUTER_API_KEY").then(|| "sk-or-test".to_string())
        })
        .unwrap();
        Arc::new(TranslationBridge::from_parts(
            &Config::default(),
            defaults,
            mock,
        ))
    }

    #[tokio::test]
    async fn test_translate_handler_success() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("paper.pdf");
        std::fs::write(&input, b"%PDF-1.7").unwrap();

        let handler = TranslatePdfHandler {
            bridge: bridge(Arc::new(MockPipeline::new(2))),
        };
        let value = handler
            .execute(json!({ "input_file": input, "no_dual": true }))
            .await
            .unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["outputs"].as_array().unwrap().len(), 1);
        assert!(value["outputs"][0]
            .as_str()
            .unwrap()
            .ends_with("paper.zh.mono.pdf"));
    }

    #[tokio::test]
    async fn test_translate_handler_rejects_bad_arguments() {
        let handler = TranslatePdfHandler {
            bridge: bridge(Arc::new(MockPipeline::new(2))),
        };

        let err = handler
            .execute(json!({ "input_file": "x.pdf", "qps": "fast" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, "InvalidArgument");
        assert_eq!(err.field.as_deref(), Some("qps"));
        assert_eq!(err.value.as_deref(), Some("fast"));
        assert!(err.validation);

        let err = handler.execute(Value::Null).await.unwrap_err();
        assert_eq!(err.field.as_deref(), Some("input_file"));
    }

    #[tokio::test]
    async fn test_status_handler() {
        let handler = GetTranslationStatusHandler {
            bridge: bridge(Arc::new(MockPipeline::new(2))),
        };
        let value = handler.execute(json!({})).await.unwrap();

        assert_eq!(value["service"], "babeldoc-mcp");
        assert_eq!(value["providers"][0]["configured"], true);
        assert_eq!(value["dispatcher"]["max_concurrent_jobs"], 2);
    }
}
