//! Configuration management for SpanScope
//!
//! Loads configuration with priority:
//! 1. config.toml (or specified config file)
//! 2. Environment variables (fallback, `.env` is honored)
//! 3. Defaults

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LANGFUSE_HOST: &str = "https://cloud.langfuse.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// SpanScope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanScopeConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub tracing: TracingConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub inspector: InspectorConfig,

    /// Run scenarios against the scripted model and the in-memory trace store
    #[serde(default)]
    pub use_mock: bool,
}

/// Model/LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model provider (openai or mock)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key (can reference env var with ${VAR_NAME})
    pub api_key: Option<String>,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Base URL for OpenAI-compatible endpoints
    pub base_url: Option<String>,
}

/// Trace store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Trace store backend (langfuse or memory)
    #[serde(default = "default_store")]
    pub store: String,

    pub public_key: Option<String>,

    pub secret_key: Option<String>,

    #[serde(default = "default_langfuse_host")]
    pub host: String,

    /// Used to build project-scoped trace URLs
    pub project_id: Option<String>,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
}

/// Trace inspector polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Consecutive polls that must agree on the observation count
    #[serde(default = "default_stable_polls")]
    pub stable_polls: usize,

    /// Pause between harness scenarios
    #[serde(default = "default_scenario_pause_ms")]
    pub scenario_pause_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model_name: default_model_name(),
            base_url: None,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            public_key: None,
            secret_key: None,
            host: default_langfuse_host(),
            project_id: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_instruction: default_system_instruction(),
        }
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            stable_polls: default_stable_polls(),
            scenario_pause_ms: default_scenario_pause_ms(),
        }
    }
}

impl InspectorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn scenario_pause(&self) -> Duration {
        Duration::from_millis(self.scenario_pause_ms)
    }
}

impl SpanScopeConfig {
    /// Load configuration with the following priority:
    /// 1. config.toml in current directory or a parent
    /// 2. Environment variables (fallback)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config.toml found, reading configuration from environment");
                Ok(Self::from_env())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: SpanScopeConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.resolve_env_vars();

        Ok(config)
    }

    /// Build configuration purely from environment variables
    pub fn from_env() -> Self {
        let mut config = Self {
            model: ModelConfig::default(),
            tracing: TracingConfig::default(),
            agent: AgentConfig::default(),
            inspector: InspectorConfig::default(),
            use_mock: false,
        };
        config.resolve_env_vars();
        config
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references and fill unset values from the environment
    fn resolve_env_vars(&mut self) {
        self.model.api_key = Self::resolve_or_env(self.model.api_key.take(), "OPENAI_API_KEY");
        self.model.base_url = Self::resolve_or_env(self.model.base_url.take(), "OPENAI_BASE_URL");
        self.tracing.public_key =
            Self::resolve_or_env(self.tracing.public_key.take(), "LANGFUSE_PUBLIC_KEY");
        self.tracing.secret_key =
            Self::resolve_or_env(self.tracing.secret_key.take(), "LANGFUSE_SECRET_KEY");
        self.tracing.project_id =
            Self::resolve_or_env(self.tracing.project_id.take(), "LANGFUSE_PROJECT_ID");

        // An unresolved ${VAR} or the default host both defer to LANGFUSE_HOST
        self.tracing.host = Self::resolve_env_var(&self.tracing.host)
            .filter(|host| !host.is_empty() && host != DEFAULT_LANGFUSE_HOST)
            .or_else(|| env::var("LANGFUSE_HOST").ok().filter(|host| !host.is_empty()))
            .unwrap_or_else(|| DEFAULT_LANGFUSE_HOST.to_string());

        if let Ok(flag) = env::var("USE_MOCK") {
            self.use_mock = flag.eq_ignore_ascii_case("true") || flag == "1";
        }
    }

    fn resolve_or_env(value: Option<String>, var: &str) -> Option<String> {
        match value {
            Some(v) if !v.is_empty() => Self::resolve_env_var(&v),
            _ => env::var(var).ok().filter(|v| !v.is_empty()),
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Get the OpenAI API key with a clear error message
    pub fn openai_api_key(&self) -> Result<String> {
        self.model.api_key.clone().ok_or_else(|| {
            anyhow!(
                "OpenAI API key not found. Configure it in config.toml:\n\
                [model]\n\
                api_key = \"${{OPENAI_API_KEY}}\"\n\
                \n\
                Or set environment variable:\n\
                export OPENAI_API_KEY=\"your-key\""
            )
        })
    }

    /// Get the Langfuse key pair with a clear error message
    pub fn langfuse_credentials(&self) -> Result<(String, String)> {
        match (&self.tracing.public_key, &self.tracing.secret_key) {
            (Some(public), Some(secret)) => Ok((public.clone(), secret.clone())),
            _ => Err(anyhow!(
                "Langfuse credentials not found. Set LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY \
                 or configure [tracing] public_key/secret_key in config.toml"
            )),
        }
    }

    /// Whether runs should use the scripted model and in-memory store
    pub fn is_mocked(&self) -> bool {
        self.use_mock || self.model.provider == "mock"
    }

    /// Create test-friendly defaults (no credentials required)
    pub fn test_defaults() -> Self {
        Self {
            model: ModelConfig {
                provider: "mock".to_string(),
                api_key: Some("test-openai-key".to_string()),
                model_name: "test-model".to_string(),
                base_url: None,
            },
            tracing: TracingConfig {
                store: "memory".to_string(),
                ..TracingConfig::default()
            },
            agent: AgentConfig::default(),
            inspector: InspectorConfig {
                poll_interval_ms: 10,
                max_wait_secs: 2,
                stable_polls: 2,
                scenario_pause_ms: 0,
            },
            use_mock: true,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_store() -> String {
    "langfuse".to_string()
}

fn default_langfuse_host() -> String {
    DEFAULT_LANGFUSE_HOST.to_string()
}

fn default_max_iterations() -> usize {
    10
}

fn default_system_instruction() -> String {
    "You are a helpful AI assistant with access to tools. \
     Use the available tools when needed to answer user questions accurately. \
     When you have enough information to answer the user's question, always be accurate. \
     If you don't know the answer, say so."
        .to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_wait_secs() -> u64 {
    30
}

fn default_stable_polls() -> usize {
    2
}

fn default_scenario_pause_ms() -> u64 {
    1000
}
