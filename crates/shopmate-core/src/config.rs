use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShopmateError};

/// Top-level configuration for the Shopmate service.
///
/// Loaded from `~/.shopmate/config.toml` by default. Each section corresponds
/// to one collaborator or subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopmateConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default = "BackendConfig::default_primary")]
    pub primary: BackendConfig,
    #[serde(default = "BackendConfig::default_secondary")]
    pub secondary: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for ShopmateConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            primary: BackendConfig::default_primary(),
            secondary: BackendConfig::default_secondary(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            enrichment: EnrichmentConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ShopmateConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShopmateConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ShopmateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Interface the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// One OpenAI-compatible generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Label used to tag hybrid-mode recommendations.
    pub label: String,
    /// Base URL up to (not including) `/chat/completions`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl BackendConfig {
    pub fn default_primary() -> Self {
        Self {
            label: "OpenAI".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-2024-11-20".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }

    pub fn default_secondary() -> Self {
        Self {
            label: "Perplexity".to_string(),
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar-pro".to_string(),
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
        }
    }
}

/// Commerce and web search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL exposing `/shopping` and `/search`.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Number of organic results requested per review search.
    pub organic_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://google.serper.dev".to_string(),
            api_key_env: "SERPER_API_KEY".to_string(),
            organic_results: 3,
        }
    }
}

/// Review page fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User-Agent header sent with every page request.
    pub user_agent: String,
    /// Network timeout for a single request.
    pub request_timeout_secs: u64,
    /// Timeout for the whole fetch-and-extract operation.
    pub overall_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            request_timeout_secs: 10,
            overall_timeout_secs: 15,
        }
    }
}

/// Background detail enrichment limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Maximum purchase links kept per product.
    pub max_buy_links: usize,
    /// Maximum review pages fetched per product.
    pub max_review_sources: usize,
    /// Number of summaries requested concurrently.
    pub summary_batch_width: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_buy_links: 3,
            max_review_sources: 2,
            summary_batch_width: 5,
        }
    }
}

/// Session lifecycle and clarification policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes after which a session is evicted.
    pub ttl_minutes: u64,
    /// How often the sweeper evicts idle sessions.
    pub sweep_interval_secs: u64,
    /// Clarification rounds after which recommendations are forced.
    pub max_clarification_rounds: u32,
    /// Preference categories after which recommendations are forced.
    pub min_preference_categories: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            sweep_interval_secs: 60,
            max_clarification_rounds: 3,
            min_preference_categories: 2,
        }
    }
}
