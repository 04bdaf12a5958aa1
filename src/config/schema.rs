use crate::agent::classifier::DEFAULT_WRITE_KEYWORDS;
use crate::agent::fallback::FallbackPolicy;
use crate::agent::keywords::MatchMode;
use crate::agent::router::READ_ACKNOWLEDGEMENT;
use crate::agent::PipelineKind;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level planchat configuration, loaded from `config.toml`.
///
/// Resolution order: `--config` flag → `PLANCHAT_CONFIG` env → `~/.planchat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path the config was loaded from; not serialized.
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Whether `config_path` existed when loading.
    #[serde(skip)]
    pub loaded_from_file: bool,
    /// Environment overrides that were set but unusable; logged by [`Config::log_loaded`].
    #[serde(skip)]
    pub rejected_overrides: Vec<RejectedOverride>,
    /// Hosted-model API key. Overridden by `PLANCHAT_API_KEY` or `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Base URL override for the hosted-model API.
    pub api_url: Option<String>,
    /// Provider ID: `"openai"` or `"custom:<url>"`. Default: `"openai"`.
    pub default_provider: Option<String>,
    /// Model name sent to the provider. Default: `"gpt-4-turbo-preview"`.
    pub default_model: Option<String>,
    /// Sampling temperature (0.0–2.0). Default: `0.7`.
    pub default_temperature: f64,

    /// Pipeline selection and loop settings (`[agent]`).
    pub agent: AgentConfig,

    /// Remote query endpoint (`[endpoint]`).
    pub endpoint: EndpointConfig,

    /// Read/write routing (`[routing]`, `[routing.fallback]`).
    pub routing: RoutingConfig,

    /// HTTP gateway bind and limits (`[gateway]`).
    pub gateway: GatewayConfig,

    /// Logging (`[observability]`).
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            loaded_from_file: false,
            rejected_overrides: Vec::new(),
            api_key: None,
            api_url: None,
            default_provider: Some("openai".into()),
            default_model: Some("gpt-4-turbo-preview".into()),
            default_temperature: 0.7,
            agent: AgentConfig::default(),
            endpoint: EndpointConfig::default(),
            routing: RoutingConfig::default(),
            gateway: GatewayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

// ── Agent ─────────────────────────────────────────────────────────

/// Agent configuration (`[agent]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Which pipeline handles messages. Default: `router`.
    pub pipeline: PipelineKind,
    /// System prompt for the agent loops. `None` uses the built-in planning prompt.
    pub system_prompt: Option<String>,
    /// Maximum tool-caller visits per message. Default: `10`.
    /// Setting to `0` falls back to the default of `10`.
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineKind::default(),
            system_prompt: None,
            max_tool_iterations: 10,
        }
    }
}

// ── Remote endpoint ───────────────────────────────────────────────

/// Remote query endpoint (`[endpoint]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint URL. Overridden by `SQL_ENDPOINT_URL`.
    pub url: Option<String>,
    /// Bearer token. Overridden by `SQL_ENDPOINT_API_KEY`.
    pub api_key: Option<String>,
    /// Request timeout in seconds. Default: `30`.
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// ── Routing ───────────────────────────────────────────────────────

/// Read/write routing (`[routing]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Keywords that classify a message as a write.
    pub write_keywords: Vec<String>,
    /// `substring` (default) or `word`.
    pub match_mode: MatchMode,
    /// Reply for read-classified messages.
    pub read_response: String,
    /// Which endpoint failures fall back to the hosted model (`[routing.fallback]`).
    pub fallback: FallbackPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            write_keywords: DEFAULT_WRITE_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            match_mode: MatchMode::default(),
            read_response: READ_ACKNOWLEDGEMENT.to_string(),
            fallback: FallbackPolicy::default(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────

/// HTTP gateway (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind host. Default: `127.0.0.1`.
    pub host: String,
    /// Bind port. Default: `8787`.
    pub port: u16,
    /// Per-request timeout in seconds. Default: `120`.
    pub request_timeout_secs: u64,
    /// Maximum request body size. Default: 64 KiB.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            request_timeout_secs: 120,
            max_body_bytes: 65_536,
        }
    }
}

// ── Observability ─────────────────────────────────────────────────

/// Logging (`[observability]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset. Default: `info`.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────

/// An environment override that was set but could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOverride {
    pub variable: &'static str,
    pub value: String,
    pub reason: String,
}

impl RejectedOverride {
    fn new(variable: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            variable,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw.trim()).into_owned())
}

/// Resolve which config file to read.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_path(&path.to_string_lossy()));
    }
    if let Ok(raw) = std::env::var("PLANCHAT_CONFIG") {
        if !raw.trim().is_empty() {
            return Ok(expand_path(&raw));
        }
    }
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".planchat").join("config.toml"))
}

impl Config {
    /// Parse TOML text without touching the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    /// Load the resolved config file (defaults when absent), then apply env
    /// overrides and validate.
    ///
    /// Runs before logging is installed, so nothing is logged here; call
    /// [`Config::log_loaded`] once the subscriber exists.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = resolve_config_path(explicit)?;

        let exists = fs::try_exists(&config_path)
            .await
            .with_context(|| format!("Failed to check config file {}", config_path.display()))?;
        let mut config = if exists {
            let contents = fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };
        config.config_path = config_path;
        config.loaded_from_file = exists;

        config.rejected_overrides = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Report where the config came from and every ignored env override.
    pub fn log_loaded(&self) {
        tracing::info!(
            path = %self.config_path.display(),
            from_file = self.loaded_from_file,
            pipeline = %self.agent.pipeline,
            "Config loaded"
        );
        for rejected in &self.rejected_overrides {
            tracing::warn!(
                value = %rejected.value,
                "Ignoring {}: {}",
                rejected.variable,
                rejected.reason
            );
        }
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            anyhow::bail!(
                "default_temperature must be between 0.0 and 2.0 (got {})",
                self.default_temperature
            );
        }

        // Gateway
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.gateway.request_timeout_secs == 0 {
            anyhow::bail!("gateway.request_timeout_secs must be greater than 0");
        }
        if self.gateway.max_body_bytes == 0 {
            anyhow::bail!("gateway.max_body_bytes must be greater than 0");
        }

        // Endpoint
        if self.endpoint.timeout_secs == 0 {
            anyhow::bail!("endpoint.timeout_secs must be greater than 0");
        }
        if let Some(url) = self.endpoint.url.as_deref().filter(|u| !u.trim().is_empty()) {
            reqwest::Url::parse(url.trim())
                .with_context(|| format!("endpoint.url is not a valid URL ({url})"))?;
        }

        // Routing
        if self.routing.write_keywords.is_empty() {
            anyhow::bail!("routing.write_keywords must not be empty");
        }
        for (i, keyword) in self.routing.write_keywords.iter().enumerate() {
            if keyword.trim().is_empty() {
                anyhow::bail!("routing.write_keywords[{i}] must not be blank");
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides to config, returning the ones
    /// that were set but unusable.
    pub fn apply_env_overrides(&mut self) -> Vec<RejectedOverride> {
        let mut rejected = Vec::new();

        // API Key: PLANCHAT_API_KEY or OPENAI_API_KEY
        if let Ok(key) =
            std::env::var("PLANCHAT_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }

        if let Ok(provider) = std::env::var("PLANCHAT_PROVIDER") {
            if !provider.is_empty() {
                self.default_provider = Some(provider);
            }
        }

        // Model: PLANCHAT_MODEL or OPENAI_MODEL
        if let Ok(model) =
            std::env::var("PLANCHAT_MODEL").or_else(|_| std::env::var("OPENAI_MODEL"))
        {
            if !model.is_empty() {
                self.default_model = Some(model);
            }
        }

        if let Ok(raw) = std::env::var("PLANCHAT_PIPELINE") {
            match raw.parse::<PipelineKind>() {
                Ok(pipeline) => self.agent.pipeline = pipeline,
                Err(e) => {
                    rejected.push(RejectedOverride::new("PLANCHAT_PIPELINE", &raw, e.to_string()));
                }
            }
        }

        if let Ok(temp_str) = std::env::var("PLANCHAT_TEMPERATURE") {
            match temp_str.parse::<f64>() {
                Ok(temp) if (0.0..=2.0).contains(&temp) => self.default_temperature = temp,
                Ok(_) => rejected.push(RejectedOverride::new(
                    "PLANCHAT_TEMPERATURE",
                    &temp_str,
                    "temperature must be between 0.0 and 2.0",
                )),
                Err(e) => rejected.push(RejectedOverride::new(
                    "PLANCHAT_TEMPERATURE",
                    &temp_str,
                    e.to_string(),
                )),
            }
        }

        // Remote endpoint
        if let Ok(url) = std::env::var("SQL_ENDPOINT_URL") {
            if !url.is_empty() {
                self.endpoint.url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("SQL_ENDPOINT_API_KEY") {
            if !key.is_empty() {
                self.endpoint.api_key = Some(key);
            }
        }

        // Gateway
        if let Ok(port_str) = std::env::var("PLANCHAT_GATEWAY_PORT") {
            match port_str.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(e) => rejected.push(RejectedOverride::new(
                    "PLANCHAT_GATEWAY_PORT",
                    &port_str,
                    e.to_string(),
                )),
            }
        }
        if let Ok(host) = std::env::var("PLANCHAT_GATEWAY_HOST") {
            if !host.is_empty() {
                self.gateway.host = host;
            }
        }

        rejected
    }
}
