

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::providers::base::{LlmProvider, LlmProviderError};


/// Free text to a short canonical topic label.
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    async fn extract_concept(&self, text: &str) -> Result<String, LlmProviderError>;
}


const SYSTEM_PROMPT: &str = "You are an expert in topic classification. \
Given a sentence, return a high-level concept that categorizes its meaning. \
Respond with ONLY the concept, no explanation.";

/// Longest label kept, in characters.
const MAX_LABEL_CHARS: usize = 80;


pub struct LlmConceptExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmConceptExtractor {

    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        info!("LlmConceptExtractor initialized: provider={}", llm.provider_name());
        Self { llm }
    }
}

/// First non-empty line with list markers, labels and quotes stripped.
pub fn clean_label(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .strip_prefix("Concept:")
        .or_else(|| line.strip_prefix("concept:"))
        .unwrap_or(line);
    let label = line
        .trim()
        .trim_start_matches(['-', '*', '•'])
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
        .trim();

    if label.is_empty() {
        None
    } else {
        Some(crate::safe_truncate(label, MAX_LABEL_CHARS))
    }
}

#[async_trait]
impl ConceptExtractor for LlmConceptExtractor {
    async fn extract_concept(&self, text: &str) -> Result<String, LlmProviderError> {
        let user_prompt = format!("Sentence: \"{}\"\nConcept:", text);
        let (response, _metadata) = self.llm.generate(SYSTEM_PROMPT, &user_prompt, None).await?;

        let label = clean_label(&response).ok_or_else(|| {
            LlmProviderError::Provider("LLM returned an empty concept label".to_string())
        })?;
        debug!(
            "Concept for '{}': {}",
            crate::safe_truncate(text, 50),
            label
        );
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    #[test]
    fn test_clean_label() {
        assert_eq!(clean_label("  Semiconductor trade policy \n"), Some("Semiconductor trade policy".to_string()));
        assert_eq!(clean_label("Concept: \"Sourdough baking\"."), Some("Sourdough baking".to_string()));
        assert_eq!(clean_label("\n- Machine learning evaluation\nextra"), Some("Machine learning evaluation".to_string()));
        assert_eq!(clean_label("   \n  "), None);
    }

    #[tokio::test]
    async fn test_extract_concept_uses_llm_reply() {
        let llm = Arc::new(ScriptedLlm::always("AI chip export policy"));
        let extractor = LlmConceptExtractor::new(llm.clone());
        let concept = extractor
            .extract_concept("Latest developments in AI chip export controls")
            .await
            .unwrap();
        assert_eq!(concept, "AI chip export policy");
        assert_eq!(llm.calls(), 1);
        assert!(llm.last_user_prompt().unwrap().contains("AI chip export controls"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let extractor = LlmConceptExtractor::new(Arc::new(ScriptedLlm::always("  ")));
        assert!(extractor.extract_concept("anything").await.is_err());
    }
}
