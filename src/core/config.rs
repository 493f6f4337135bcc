

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{QueryMindError, Result};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Helix,
    Memory,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryMindConfig {

    pub helix_host: String,
    pub helix_port: u16,
    pub store_backend: StoreBackend,
    pub store_timeout_secs: u64,
    pub store_max_retries: u32,


    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,
    pub llm_timeout_secs: u64,


    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    /// Expected vector length; 0 disables the check.
    pub embedding_dimension: usize,
    pub embedding_cache_size: usize,
    pub embedding_cache_ttl_secs: u64,


    pub embedding_fallback_enabled: bool,
    pub embedding_fallback_url: String,
    pub embedding_fallback_model: String,


    pub zero_shot_url: String,
    pub zero_shot_model: String,
    pub zero_shot_api_key: Option<String>,
    pub zero_shot_multi_label: bool,
    pub zero_shot_timeout_secs: u64,


    pub similarity_top_k: usize,
    pub create_threshold: f64,
    pub connect_threshold: f64,
    pub early_exit_threshold: f64,
}

impl QueryMindConfig {

    pub fn new(host: &str, port: u16) -> Self {
        Self {
            helix_host: host.to_string(),
            helix_port: port,
            store_backend: StoreBackend::Helix,
            store_timeout_secs: 10,
            store_max_retries: 3,

            llm_provider: "openai".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.0,
            llm_timeout_secs: 60,

            llm_fallback_enabled: true,
            llm_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: "llama3.2".to_string(),

            embedding_provider: "ollama".to_string(),
            embedding_model: "all-minilm".to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_dimension: 384,
            embedding_cache_size: crate::DEFAULT_CACHE_SIZE,
            embedding_cache_ttl_secs: crate::DEFAULT_CACHE_TTL,

            embedding_fallback_enabled: true,
            embedding_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_fallback_model: "all-minilm".to_string(),

            zero_shot_url: "https://api-inference.huggingface.co/models".to_string(),
            zero_shot_model: "MoritzLaurer/deberta-v3-large-zeroshot-v2.0".to_string(),
            zero_shot_api_key: None,
            zero_shot_multi_label: false,
            zero_shot_timeout_secs: 60,

            similarity_top_k: crate::DEFAULT_TOP_K,
            create_threshold: 0.35,
            connect_threshold: 0.40,
            early_exit_threshold: 0.85,
        }
    }


    pub fn helix_url(&self) -> String {
        format!("http://{}:{}", self.helix_host, self.helix_port)
    }

    /// Defaults, then the optional config file, then `QUERYMIND_*` variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var("QUERYMIND_CONFIG").unwrap_or_else(|_| "querymind".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        debug!("Loading configuration (file={})", path);
        let defaults = Config::try_from(&Self::default())?;

        let config: Self = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("QUERYMIND")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("create_threshold", self.create_threshold),
            ("connect_threshold", self.connect_threshold),
            ("early_exit_threshold", self.early_exit_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(QueryMindError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.create_threshold > self.connect_threshold {
            return Err(QueryMindError::Config(format!(
                "create_threshold ({}) must not exceed connect_threshold ({})",
                self.create_threshold, self.connect_threshold
            )));
        }
        if self.similarity_top_k == 0 {
            return Err(QueryMindError::Config("similarity_top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for QueryMindConfig {
    fn default() -> Self {
        Self::new("localhost", crate::DEFAULT_HELIX_PORT)
    }
}
