//! The translation bridge.
//!
//! [`TranslationBridge`] is the single entry point used by the MCP tools and
//! the CLI: it validates a request, hands the job to the dispatcher and
//! returns exactly one terminal result per call.

use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::models::{JobResult, JobState, StatusSnapshot, ToolRequest};
use crate::pipeline::{BabeldocCli, Pipeline};
use crate::providers::{ProviderConfigError, ProviderDefaults, ProviderResolver};
use crate::status;
use crate::utils::validate_request;

/// Validates and dispatches translation requests
#[derive(Debug, Clone)]
pub struct TranslationBridge {
    resolver: ProviderResolver,
    dispatcher: Dispatcher,
}

impl TranslationBridge {
    /// Assemble a bridge from already-built parts
    pub fn new(resolver: ProviderResolver, dispatcher: Dispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    /// Build a bridge from configuration, the process environment and a pipeline
    pub fn with_pipeline(
        config: &Config,
        pipeline: Arc<dyn Pipeline>,
    ) -> Result<Self, ProviderConfigError> {
        let defaults = ProviderDefaults::from_env(&config.providers)?;
        Ok(Self::from_parts(config, defaults, pipeline))
    }

    /// Build a bridge driving the BabelDOC command line
    pub fn from_config(config: &Config) -> Result<Self, ProviderConfigError> {
        let pipeline: Arc<dyn Pipeline> = Arc::new(BabeldocCli::new(&config.pipeline));
        Self::with_pipeline(config, pipeline)
    }

    /// Build a bridge from an explicit provider table
    pub fn from_parts(
        config: &Config,
        defaults: ProviderDefaults,
        pipeline: Arc<dyn Pipeline>,
    ) -> Self {
        let resolver = ProviderResolver::new(Arc::new(defaults));
        let dispatcher = Dispatcher::new(
            pipeline,
            config.dispatch.max_concurrent_jobs,
            config.dispatch.admission_timeout(),
        );
        Self::new(resolver, dispatcher)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        self.dispatcher.pipeline()
    }

    pub fn providers(&self) -> &ProviderDefaults {
        self.resolver.defaults()
    }

    /// Validate and run one translation request
    pub async fn translate(&self, request: ToolRequest) -> JobResult {
        tracing::debug!(
            state = %JobState::Received,
            input = request.input_file.as_deref().unwrap_or_default(),
            "Translation request received"
        );

        let job = match validate_request(&request, &self.resolver, self.pipeline().as_ref()).await
        {
            Ok(job) => job,
            Err(e) => {
                tracing::info!(
                    state = %JobState::Failed,
                    kind = e.kind(),
                    "Translation request rejected: {}",
                    e
                );
                return JobResult::Failed(e);
            }
        };

        tracing::debug!(
            state = %JobState::Validated,
            input = %job.input_file.display(),
            pages = job.pages.count(job.page_count),
            "Translation request validated"
        );

        self.dispatcher.dispatch(job).await
    }

    /// Run a request given as raw tool arguments
    pub async fn translate_args(&self, args: Value) -> JobResult {
        match ToolRequest::from_args(args) {
            Ok(request) => self.translate(request).await,
            Err(e) => JobResult::Failed(e),
        }
    }

    /// Current provider, language and capacity snapshot
    pub fn status(&self) -> StatusSnapshot {
        status::snapshot(self.resolver.defaults(), &self.dispatcher)
    }
}
