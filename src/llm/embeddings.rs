

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::cache::EmbeddingCache;
use crate::core::config::QueryMindConfig;


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Both primary and fallback failed: primary={0}, fallback={1}")]
    BothFailed(String, String),
}


/// Text to fixed-length vector. Identical input yields identical output for
/// the lifetime of the process.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Expected dimensionality, when known up front.
    fn dimension(&self) -> Option<usize>;
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}


pub struct EmbeddingGenerator {
    provider: String,
    url: String,
    model: String,
    api_key: Option<String>,
    dimension: Option<usize>,
    client: Client,
    cache: EmbeddingCache,


    /// Same model served from another host; never a different model.
    fallback: Option<String>,
    fallback_count: AtomicUsize,
    /// Length of the first vector seen when no dimension is configured.
    observed_dimension: AtomicUsize,
}

impl EmbeddingGenerator {

    pub fn from_config(config: &QueryMindConfig) -> Result<Self, EmbeddingError> {
        let provider = config.embedding_provider.to_lowercase();
        let wants_fallback = config.embedding_fallback_enabled && provider != "ollama";
        let same_model = config.embedding_fallback_model == config.embedding_model;
        if wants_fallback && !same_model {
            warn!(
                "Embedding fallback disabled: fallback model {} differs from {} and would mix vector spaces",
                config.embedding_fallback_model, config.embedding_model
            );
        }
        let fallback = (wants_fallback && same_model)
            .then(|| config.embedding_fallback_url.trim_end_matches('/').to_string());

        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, dimension={}, cache={}",
            provider, config.embedding_model, config.embedding_dimension, config.embedding_cache_size
        );

        Ok(Self {
            provider,
            url: config.embedding_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            api_key: config.embedding_api_key.clone(),
            dimension: (config.embedding_dimension > 0).then_some(config.embedding_dimension),
            client: Client::builder()
                .timeout(Duration::from_secs(config.llm_timeout_secs))
                .build()?,
            cache: EmbeddingCache::new(
                config.embedding_cache_size,
                config.embedding_cache_ttl_secs,
            ),
            fallback,
            fallback_count: AtomicUsize::new(0),
            observed_dimension: AtomicUsize::new(0),
        })
    }


    pub async fn generate(&self, text: &str, use_cache: bool) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        if use_cache {
            if let Some(cached) = self.cache.get(text) {
                debug!("Cache HIT for: {}...", crate::safe_truncate(text, 50));
                return Ok(cached);
            }
        }

        let result = match self.provider.as_str() {
            "ollama" => self.generate_ollama(&self.url, &self.model, text).await,
            "openai" => self.generate_openai(text).await,
            other => Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        let embedding = match (result, &self.fallback) {
            (Ok(embedding), _) => embedding,
            (Err(e), Some(url)) => {
                warn!("Primary embedding provider unavailable, trying fallback: {}", e);
                let embedding = self
                    .generate_ollama(url, &self.model, text)
                    .await
                    .map_err(|fallback_err| {
                        EmbeddingError::BothFailed(e.to_string(), fallback_err.to_string())
                    })?;
                self.fallback_count.fetch_add(1, Ordering::SeqCst);
                embedding
            }
            (Err(e), None) => return Err(e),
        };

        self.check_dimension(&embedding)?;

        if use_cache {
            self.cache.set(text, embedding.clone());
        }
        Ok(embedding)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), EmbeddingError> {
        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }

        let expected = match self.dimension {
            Some(expected) => expected,
            None => match self.observed_dimension.compare_exchange(
                0,
                embedding.len(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(pinned) => pinned,
            },
        };

        if expected != embedding.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    async fn generate_ollama(
        &self,
        url: &str,
        model: &str,
        text: &str,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", url))
            .json(&OllamaEmbeddingRequest { model, prompt: text })
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let response = self
            .client
            .post(format!("{}/embeddings", self.url))
            .bearer_auth(api_key)
            .json(&OpenAIEmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }


    pub fn model(&self) -> &str {
        &self.model
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate(text, true).await
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
