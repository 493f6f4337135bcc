

use thiserror::Error;

use crate::db::StoreError;
use crate::llm::embeddings::EmbeddingError;
use crate::llm::providers::LlmProviderError;
use crate::llm::zero_shot::ScorerError;
use crate::toolkit::concepts::SimilarityError;


#[derive(Error, Debug)]
pub enum QueryMindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("Embedding generation error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Zero-shot scorer error: {0}")]
    Scorer(#[from] ScorerError),

    #[error("Malformed evidence: {0}")]
    MalformedEvidence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Both intent sources failed: memory={memory}, zero_shot={zero_shot}")]
    IntentSourcesFailed { memory: String, zero_shot: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SimilarityError> for QueryMindError {
    fn from(err: SimilarityError) -> Self {
        Self::MalformedEvidence(err.to_string())
    }
}

impl From<config::ConfigError> for QueryMindError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl QueryMindError {
    /// Whether re-running the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::LlmProvider(LlmProviderError::Timeout(_)) => true,
            Self::Embedding(EmbeddingError::Http(e)) => e.is_timeout() || e.is_connect(),
            Self::Scorer(e) => e.is_retryable(),
            _ => false,
        }
    }
}


pub type Result<T> = std::result::Result<T, QueryMindError>;
