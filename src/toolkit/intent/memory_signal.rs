

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::fusion::IntentSignal;
use super::prompt::{build_intent_prompt, parse_label_scores, SYSTEM_PROMPT};
use crate::core::error::Result;
use crate::core::intent::{IntentScores, IntentSource};
use crate::core::models::ConceptMatch;
use crate::llm::embeddings::Embedder;
use crate::llm::providers::LlmProvider;
use crate::safe_truncate;
use crate::toolkit::concepts::SimilaritySearch;


/// Source A: asks the LLM for per-label scores, giving it the nearest stored
/// concepts and their intents as evidence.
pub struct MemoryIntentClassifier {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    search: Arc<SimilaritySearch>,
}

impl MemoryIntentClassifier {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        search: Arc<SimilaritySearch>,
    ) -> Self {
        Self {
            llm,
            embedder,
            search,
        }
    }

    pub async fn related_concepts(&self, query: &str) -> Result<Vec<ConceptMatch>> {
        let embedding = self.embedder.embed(query).await?;
        self.search.search(&embedding).await
    }

    /// Label scores for a query whose related concepts are already ranked.
    pub async fn scores_for(&self, query: &str, related: &[ConceptMatch]) -> Result<IntentScores> {
        let prompt = build_intent_prompt(query, related);

        let (reply, metadata) = self
            .llm
            .generate(SYSTEM_PROMPT, &prompt, Some("json_object"))
            .await?;

        let scores = parse_label_scores(&reply)?;
        debug!(
            "Memory signal for '{}' from {} related concept(s) via {}: {:?}",
            safe_truncate(query, 50),
            related.len(),
            metadata.model,
            scores.as_array()
        );
        Ok(scores)
    }
}

#[async_trait]
impl IntentSignal for MemoryIntentClassifier {
    async fn label_scores(&self, query: &str) -> Result<IntentScores> {
        let related = self.related_concepts(query).await?;
        self.scores_for(query, &related).await
    }

    fn source(&self) -> IntentSource {
        IntentSource::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::QueryMindError;
    use crate::core::intent::IntentLabel;
    use crate::db::InMemoryGraphStore;
    use crate::testing::{FixedEmbedder, ScriptedLlm};

    fn classifier(store: InMemoryGraphStore, embedder: FixedEmbedder, llm: Arc<ScriptedLlm>) -> MemoryIntentClassifier {
        MemoryIntentClassifier::new(
            llm,
            Arc::new(embedder),
            Arc::new(SimilaritySearch::new(Arc::new(store), 5)),
        )
    }

    #[tokio::test]
    async fn test_empty_graph_still_yields_vector() {
        let llm = Arc::new(ScriptedLlm::always(r#"{"News": 0.6, "Research": 0.3}"#));
        let signal = classifier(InMemoryGraphStore::new(), FixedEmbedder::new(2), llm.clone());

        let scores = signal.label_scores("chip export controls").await.unwrap();
        assert_eq!(scores.get(IntentLabel::News), 0.6);
        assert!(llm.last_user_prompt().unwrap().contains("(none)"));
    }

    #[tokio::test]
    async fn test_related_concepts_reach_the_prompt() {
        let store = InMemoryGraphStore::new();
        store.seed_concept("AI export policy", Some(IntentLabel::News), vec![1.0, 0.0]);
        let embedder = FixedEmbedder::new(2).with("nvidia export ban", vec![1.0, 0.0]);
        let llm = Arc::new(ScriptedLlm::always("News"));
        let signal = classifier(store, embedder, llm.clone());

        let scores = signal.label_scores("nvidia export ban").await.unwrap();
        assert_eq!(scores, IntentScores::one_hot(IntentLabel::News));
        assert!(llm
            .last_user_prompt()
            .unwrap()
            .contains("1. Concept: AI export policy, Intent: News, Similarity Score: 1"));
    }

    #[tokio::test]
    async fn test_unreadable_reply_is_malformed_evidence() {
        let llm = Arc::new(ScriptedLlm::always("no idea"));
        let signal = classifier(InMemoryGraphStore::new(), FixedEmbedder::new(2), llm);
        assert!(matches!(
            signal.label_scores("something").await,
            Err(QueryMindError::MalformedEvidence(_))
        ));
    }
}
