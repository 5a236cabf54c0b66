//! Translation providers and credential resolution.
//!
//! The set of providers is closed: each [`ProviderKind`] carries its own
//! default endpoint, model and request rate. At startup a [`ProviderDefaults`]
//! table is built once from the configuration file and the process
//! environment; [`ProviderResolver`] then layers call-time overrides on top.
//!
//! Precedence for each value, highest first:
//!
//! 1. call-time override (`model`, `qps`)
//! 2. `<PREFIX>_API_KEY` / `<PREFIX>_BASE_URL` / `<PREFIX>_MODEL` environment variables
//! 3. `[providers.<id>]` section of the configuration file
//! 4. built-in defaults

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ProviderSection, ProvidersConfig};
use crate::error::BridgeError;

/// Supported translation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    OpenRouter,
    OpenAi,
}

impl ProviderKind {
    /// Every supported provider, in display order
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenRouter, ProviderKind::OpenAi];

    /// Identifier used in tool calls and configuration
    pub fn id(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OpenRouter",
            Self::OpenAi => "OpenAI",
        }
    }

    /// Prefix of the provider's environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OPENROUTER",
            Self::OpenAi => "OPENAI",
        }
    }

    pub fn api_key_var(&self) -> String {
        format!("{}_API_KEY", self.env_prefix())
    }

    pub fn base_url_var(&self) -> String {
        format!("{}_BASE_URL", self.env_prefix())
    }

    pub fn model_var(&self) -> String {
        format!("{}_MODEL", self.env_prefix())
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenRouter => "google/gemini-2.5-flash",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_qps(&self) -> u32 {
        4
    }

    /// Comma-separated list of supported ids, for error messages
    pub fn supported_ids() -> String {
        Self::ALL
            .iter()
            .map(|k| k.id())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.id() == wanted)
            .ok_or_else(|| BridgeError::UnknownProvider {
                name: s.trim().to_string(),
                supported: Self::supported_ids(),
            })
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// An API credential that never appears in logs
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a credential, rejecting empty or whitespace-only values
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The secret value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Fully resolved backend identity for one job
#[derive(Clone, Serialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(skip)]
    api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    pub qps: u32,
}

impl ProviderConfig {
    /// Build a provider configuration.
    ///
    /// Fails with `ProviderNotConfigured` when the credential is empty.
    pub fn new(
        kind: ProviderKind,
        api_key: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        qps: u32,
    ) -> Result<Self, BridgeError> {
        let api_key = ApiKey::new(api_key).ok_or_else(|| not_configured(kind))?;
        Ok(Self {
            kind,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            qps,
        })
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("qps", &self.qps)
            .finish()
    }
}

fn not_configured(kind: ProviderKind) -> BridgeError {
    BridgeError::ProviderNotConfigured {
        provider: kind.id().to_string(),
        env_var: kind.api_key_var(),
    }
}

/// Errors building the provider table at startup
#[derive(Debug, Error)]
pub enum ProviderConfigError {
    #[error("Invalid base URL for {provider}: {url} ({reason})")]
    InvalidBaseUrl {
        provider: String,
        url: String,
        reason: String,
    },

    #[error("Invalid default service: {0}")]
    InvalidDefault(#[from] BridgeError),

    #[error("qps for {0} must be at least 1")]
    ZeroQps(String),
}

/// Process-wide settings for one provider kind
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    api_key: Option<ApiKey>,
    pub base_url: String,
    pub model: String,
    pub qps: u32,
}

impl ProviderSettings {
    /// Whether a credential is available
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Produce a job configuration, applying the optional model override
    pub fn resolve(&self, model: Option<&str>) -> Result<ProviderConfig, BridgeError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| not_configured(self.kind))?;
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.model.as_str());

        ProviderConfig::new(
            self.kind,
            api_key.expose(),
            self.base_url.clone(),
            model,
            self.qps,
        )
    }

    fn load(
        kind: ProviderKind,
        section: &ProviderSection,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderConfigError> {
        let env = |var: String| lookup(&var).filter(|v| !v.trim().is_empty());

        let api_key = env(kind.api_key_var())
            .or_else(|| section.api_key.clone())
            .and_then(ApiKey::new);
        let base_url = env(kind.base_url_var())
            .or_else(|| section.base_url.clone())
            .unwrap_or_else(|| kind.default_base_url().to_string());
        let model = env(kind.model_var())
            .or_else(|| section.model.clone())
            .unwrap_or_else(|| kind.default_model().to_string());
        let qps = section.qps.unwrap_or_else(|| kind.default_qps());

        validate_base_url(kind, &base_url)?;
        if qps == 0 {
            return Err(ProviderConfigError::ZeroQps(kind.id().to_string()));
        }

        Ok(Self {
            kind,
            api_key,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            model: model.trim().to_string(),
            qps,
        })
    }
}

fn validate_base_url(kind: ProviderKind, raw: &str) -> Result<(), ProviderConfigError> {
    let invalid = |reason: String| ProviderConfigError::InvalidBaseUrl {
        provider: kind.id().to_string(),
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// Immutable provider table, built once at process start
#[derive(Debug, Clone)]
pub struct ProviderDefaults {
    default_kind: ProviderKind,
    providers: BTreeMap<ProviderKind, ProviderSettings>,
}

impl ProviderDefaults {
    /// Build from configuration and the process environment
    pub fn from_env(config: &ProvidersConfig) -> Result<Self, ProviderConfigError> {
        Self::from_lookup(config, |var| std::env::var(var).ok())
    }

    /// Build from configuration and an arbitrary variable lookup
    pub fn from_lookup<F>(config: &ProvidersConfig, lookup: F) -> Result<Self, ProviderConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_kind = ProviderKind::from_str(&config.default_service)?;
        let mut providers = BTreeMap::new();
        for kind in ProviderKind::ALL {
            let section = config.section(kind);
            providers.insert(kind, ProviderSettings::load(kind, section, &lookup)?);
        }
        Ok(Self {
            default_kind,
            providers,
        })
    }

    /// Provider used when a request names none
    pub fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }

    /// Settings for one provider
    pub fn get(&self, kind: ProviderKind) -> &ProviderSettings {
        // Every kind is inserted by the constructor.
        &self.providers[&kind]
    }

    /// Settings for every provider, in display order
    pub fn all(&self) -> impl Iterator<Item = &ProviderSettings> {
        self.providers.values()
    }
}

/// Resolves per-call provider configuration against the process defaults
#[derive(Debug, Clone)]
pub struct ProviderResolver {
    defaults: Arc<ProviderDefaults>,
}

impl ProviderResolver {
    pub fn new(defaults: Arc<ProviderDefaults>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ProviderDefaults {
        &self.defaults
    }

    /// Resolve the provider named by `service` (or the default), applying a model override.
    ///
    /// Never falls back to a different provider when the selected one has no credential.
    pub fn resolve(
        &self,
        service: Option<&str>,
        model: Option<&str>,
    ) -> Result<ProviderConfig, BridgeError> {
        let kind = match service.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => ProviderKind::from_str(name)?,
            None => self.defaults.default_kind,
        };

        let config = self.defaults.get(kind).resolve(model)?;
        tracing::debug!(
            provider = %config.kind,
            model = %config.model,
            base_url = %config.base_url,
            "Resolved translation provider"
        );
        Ok(config)
    }
}
