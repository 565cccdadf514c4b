use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Fleet size requested from the metric source each cycle.
    #[serde(default = "default_terminal_count")]
    pub terminal_count: usize,
    /// Seconds between metric refresh cycles.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Simulated feed latency in milliseconds.
    #[serde(default = "default_fetch_latency_ms")]
    pub fetch_latency_ms: u64,
    /// Grace period after ticket subscription comes up before a starter
    /// ticket is seeded into an empty collection.
    #[serde(default = "default_seed_grace_secs")]
    pub seed_grace_secs: u64,

    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub drafting: DraftingConfig,
}

/// Tenant/user pair the server's stores are keyed by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DraftingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Falls back to the GEMINI_API_KEY environment variable when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl DraftingConfig {
    /// Resolved API key: config value first, then environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            user_id: default_user_id(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            terminal_count: default_terminal_count(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_latency_ms: default_fetch_latency_ms(),
            seed_grace_secs: default_seed_grace_secs(),
            scope: ScopeConfig::default(),
            drafting: DraftingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

fn default_terminal_count() -> usize {
    10
}

fn default_refresh_interval_secs() -> u64 {
    15
}

fn default_fetch_latency_ms() -> u64 {
    1000
}

fn default_seed_grace_secs() -> u64 {
    2
}

fn default_tenant_id() -> String {
    "default".to_string()
}

fn default_user_id() -> String {
    "local".to_string()
}
