

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};


/// Primary provider that hands over to a secondary one when a call fails.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: Option<Arc<dyn LlmProvider>>,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {

    pub fn new(primary: Arc<dyn LlmProvider>, fallback: Option<Arc<dyn LlmProvider>>) -> Self {
        info!(
            "LlmProviderWithFallback initialized: primary={}, fallback={}",
            primary.provider_name(),
            fallback
                .as_ref()
                .map(|f| format!("{}/{}", f.provider_name(), f.model_name()))
                .unwrap_or_else(|| "disabled".to_string())
        );

        Self {
            primary,
            fallback,
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            primary_failures: AtomicUsize::new(0),
        }
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn primary_failures(&self) -> usize {
        self.primary_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let error = match self.primary.generate(system_prompt, user_prompt, response_format).await {
            Ok(result) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                return Ok(result);
            }
            Err(e) => e,
        };

        let failures = self.primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
        warn!("Primary LLM provider failed ({}x): {}", failures, error);

        let Some(fallback) = &self.fallback else {
            return Err(error);
        };

        warn!(
            "Falling back to {}/{}",
            fallback.provider_name(),
            fallback.model_name()
        );
        let (content, mut metadata) = fallback
            .generate(system_prompt, user_prompt, response_format)
            .await?;

        metadata.fallback_used = true;
        metadata.original_error = Some(error.to_string());

        self.using_fallback.store(true, Ordering::SeqCst);
        let total = self.fallback_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Fallback successful! total_fallbacks={}", total);

        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        match (&self.fallback, self.is_using_fallback()) {
            (Some(fallback), true) => fallback.provider_name(),
            _ => self.primary.provider_name(),
        }
    }

    fn model_name(&self) -> &str {
        match (&self.fallback, self.is_using_fallback()) {
            (Some(fallback), true) => fallback.model_name(),
            _ => self.primary.model_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let fallback = Arc::new(ScriptedLlm::always("from fallback"));
        let provider = LlmProviderWithFallback::new(
            Arc::new(ScriptedLlm::always("from primary")),
            Some(fallback.clone() as Arc<dyn LlmProvider>),
        );

        let (content, metadata) = provider.generate("sys", "user", None).await.unwrap();
        assert_eq!(content, "from primary");
        assert!(!metadata.fallback_used);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let provider = LlmProviderWithFallback::new(
            Arc::new(ScriptedLlm::failing()),
            Some(Arc::new(ScriptedLlm::always("from fallback"))),
        );

        let (content, metadata) = provider.generate("sys", "user", None).await.unwrap();
        assert_eq!(content, "from fallback");
        assert!(metadata.fallback_used);
        assert!(metadata.original_error.is_some());
        assert!(provider.is_using_fallback());
        assert_eq!(provider.fallback_count(), 1);
        assert_eq!(provider.primary_failures(), 1);
    }

    #[tokio::test]
    async fn test_no_fallback_propagates_error() {
        let provider = LlmProviderWithFallback::new(Arc::new(ScriptedLlm::failing()), None);
        tokio_test::assert_err!(provider.generate("sys", "user", None).await);
    }
}
