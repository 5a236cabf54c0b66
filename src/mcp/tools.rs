//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::handlers::{GetTranslationStatusHandler, TranslatePdfHandler};
use crate::bridge::TranslationBridge;
use crate::error::ToolError;
use crate::models::{DEFAULT_LANG_IN, DEFAULT_LANG_OUT};
use crate::providers::ProviderKind;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "translate_pdf")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry exposing the translation tools backed by `bridge`
    pub fn from_bridge(bridge: Arc<TranslationBridge>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register_translation_tools(bridge);
        registry
    }

    fn register_translation_tools(&mut self, bridge: Arc<TranslationBridge>) {
        let services: Vec<&str> = ProviderKind::ALL.iter().map(|kind| kind.id()).collect();
        let default_service = bridge.providers().default_kind();

        // 1. translate_pdf - Translate a PDF through the pipeline
        self.register(Tool {
            name: "translate_pdf".to_string(),
            description: "Translate a PDF document while preserving its layout. Produces a \
                monolingual ({stem}.{lang_out}.mono.pdf) and/or bilingual \
                ({stem}.{lang_out}.dual.pdf) file and returns their paths."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "input_file": {
                        "type": "string",
                        "description": "Path to the input PDF file"
                    },
                    "output_dir": {
                        "type": "string",
                        "description": "Output directory. Defaults to the input file's directory."
                    },
                    "lang_in": {
                        "type": "string",
                        "description": "Source language code (e.g., 'en', 'ja')",
                        "default": DEFAULT_LANG_IN
                    },
                    "lang_out": {
                        "type": "string",
                        "description": "Target language code (e.g., 'zh', 'vi')",
                        "default": DEFAULT_LANG_OUT
                    },
                    "pages": {
                        "type": "string",
                        "description": "Pages to translate (e.g., '1-5', '1,3,5', '3-'). Empty means all pages."
                    },
                    "no_dual": {
                        "type": "boolean",
                        "description": "Skip the bilingual (side-by-side) output",
                        "default": false
                    },
                    "no_mono": {
                        "type": "boolean",
                        "description": "Skip the monolingual (translation only) output",
                        "default": false
                    },
                    "service": {
                        "type": "string",
                        "description": "Translation service",
                        "enum": services,
                        "default": default_service.id()
                    },
                    "model": {
                        "type": "string",
                        "description": "Model override. Defaults to the service's configured model."
                    },
                    "qps": {
                        "type": "integer",
                        "description": "Queries per second allowed against the translation service",
                        "minimum": 1,
                        "default": default_service.default_qps()
                    },
                    "watermark": {
                        "type": "boolean",
                        "description": "Add a watermark to the output",
                        "default": true
                    },
                    "admission_timeout_secs": {
                        "type": "integer",
                        "description": "Seconds to wait for a free translation slot before failing. Defaults to the server setting.",
                        "minimum": 0
                    }
                },
                "required": ["input_file"]
            }),
            handler: Arc::new(TranslatePdfHandler {
                bridge: bridge.clone(),
            }),
        });

        // 2. get_translation_status - Providers, languages and capacity
        self.register(Tool {
            name: "get_translation_status".to_string(),
            description: "Report which translation services are configured, their default \
                models and endpoints, the supported languages, and current translation capacity."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(GetTranslationStatusHandler { bridge }),
        });
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::internal(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }
}
