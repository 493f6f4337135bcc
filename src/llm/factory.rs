

use std::sync::Arc;

use super::concept::LlmConceptExtractor;
use super::embeddings::EmbeddingGenerator;
use super::providers::base::{LlmProvider, LlmProviderError};
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiCompatibleProvider;
use super::zero_shot::HuggingFaceZeroShotScorer;
use crate::core::config::QueryMindConfig;
use crate::{DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<String>,
        base_url: Option<&str>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Result<Arc<dyn LlmProvider>, LlmProviderError> {
        match provider.to_lowercase().as_str() {
            "openai" => Ok(Arc::new(OpenAiCompatibleProvider::new(
                api_key,
                base_url.unwrap_or(DEFAULT_OPENAI_URL),
                model,
                temperature,
                timeout_secs,
            )?)),
            "ollama" => Ok(Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout_secs,
            )?)),
            other => Err(LlmProviderError::UnknownProvider(format!(
                "{other}. Supported: openai, ollama"
            ))),
        }
    }

    /// Configured provider, wrapped with the local Ollama fallback when enabled.
    pub fn from_config(config: &QueryMindConfig) -> Result<Arc<dyn LlmProvider>, LlmProviderError> {
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.clone(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            config.llm_timeout_secs,
        )?;

        let fallback = if config.llm_fallback_enabled && primary.provider_name() != "ollama" {
            Some(Self::create(
                "ollama",
                &config.llm_fallback_model,
                None,
                Some(&config.llm_fallback_url),
                config.llm_temperature,
                config.llm_timeout_secs,
            )?)
        } else {
            None
        };

        Ok(Arc::new(LlmProviderWithFallback::new(primary, fallback)))
    }
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    pub fn from_config(config: &QueryMindConfig) -> crate::Result<EmbeddingGenerator> {
        Ok(EmbeddingGenerator::from_config(config)?)
    }
}


/// Wires the external collaborators the core consumes.
pub struct CollaboratorFactory;

impl CollaboratorFactory {

    pub fn concept_extractor(llm: Arc<dyn LlmProvider>) -> LlmConceptExtractor {
        LlmConceptExtractor::new(llm)
    }

    pub fn zero_shot_scorer(config: &QueryMindConfig) -> crate::Result<HuggingFaceZeroShotScorer> {
        Ok(HuggingFaceZeroShotScorer::from_config(config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_provider() {
        let provider =
            LlmProviderFactory::create("ollama", "llama3.2", None, None, 0.0, 30).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "llama3.2");
    }

    #[test]
    fn test_create_openai_provider_is_case_insensitive() {
        let provider = LlmProviderFactory::create(
            "OpenAI",
            "gpt-4o-mini",
            Some("test-key".to_string()),
            None,
            0.0,
            30,
        )
        .unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let result = LlmProviderFactory::create("unknown", "model", None, None, 0.5, 30);
        assert!(matches!(result, Err(LlmProviderError::UnknownProvider(_))));
    }

    #[test]
    fn test_from_config_builds_every_collaborator() {
        let config = QueryMindConfig::default();
        let llm = LlmProviderFactory::from_config(&config).unwrap();
        assert_eq!(llm.model_name(), "gpt-4o-mini");
        assert!(EmbeddingProviderFactory::from_config(&config).is_ok());
        assert!(CollaboratorFactory::zero_shot_scorer(&config).is_ok());
    }
}
