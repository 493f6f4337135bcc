

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use super::phrases::{average_scores, candidate_phrases, HYPOTHESIS_TEMPLATES};
use crate::core::error::Result;
use crate::core::intent::IntentScores;
use crate::core::models::EnsembleResult;
use crate::llm::zero_shot::ZeroShotScorer;
use crate::safe_truncate;

/// Decimal places kept in reported ensemble scores.
pub const SCORE_PRECISION: u32 = 4;


/// Scores a query against the phrase bank under every hypothesis template and
/// averages the results per label.
pub struct ZeroShotEnsemble {
    scorer: Arc<dyn ZeroShotScorer>,
}

impl ZeroShotEnsemble {
    pub fn new(scorer: Arc<dyn ZeroShotScorer>) -> Self {
        Self { scorer }
    }

    /// Builds the ensemble and warms the model so the first query does not
    /// pay for loading it.
    pub async fn initialize(scorer: Arc<dyn ZeroShotScorer>) -> Result<Self> {
        info!("Initializing zero-shot ensemble ({})", scorer.name());
        scorer.warm_up().await?;
        Ok(Self::new(scorer))
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub async fn classify(&self, query: &str) -> Result<EnsembleResult> {
        if query.trim().is_empty() {
            return Ok(EnsembleResult {
                query: query.to_string(),
                predicted_intent: None,
                confidence: 0.0,
                all_scores: IntentScores::zeros(),
            });
        }

        let phrases = candidate_phrases();
        let rows = try_join_all(
            HYPOTHESIS_TEMPLATES
                .iter()
                .map(|template| self.scorer.score_batch(query, &phrases, template)),
        )
        .await?;

        let scores = average_scores(&rows)?.rounded(SCORE_PRECISION);
        let (label, confidence) = scores.best();

        debug!(
            "Ensemble for '{}': {} ({:.4})",
            safe_truncate(query, 50),
            label,
            confidence
        );

        Ok(EnsembleResult {
            query: query.to_string(),
            predicted_intent: Some(label),
            confidence,
            all_scores: scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::QueryMindError;
    use crate::core::intent::IntentLabel;
    use crate::testing::ScriptedScorer;

    #[tokio::test]
    async fn test_empty_query_is_neutral_and_skips_scorer() {
        let scorer = Arc::new(ScriptedScorer::uniform(0.5));
        let ensemble = ZeroShotEnsemble::new(scorer.clone());

        let result = ensemble.classify("   ").await.unwrap();
        assert_eq!(result.predicted_intent, None);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.all_scores, IntentScores::zeros());
        assert_eq!(scorer.calls(), 0);
    }

    #[tokio::test]
    async fn test_one_call_per_template() {
        let scorer = Arc::new(ScriptedScorer::favouring(IntentLabel::Transactional, 0.7, 0.05));
        let ensemble = ZeroShotEnsemble::new(scorer.clone());

        let result = ensemble.classify("buy a used road bike").await.unwrap();
        assert_eq!(scorer.calls(), HYPOTHESIS_TEMPLATES.len());
        assert_eq!(result.predicted_intent, Some(IntentLabel::Transactional));
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.all_scores.get(IntentLabel::News), 0.05);
        assert_eq!(result.query, "buy a used road bike");
    }

    #[tokio::test]
    async fn test_scores_are_rounded() {
        let scorer = Arc::new(ScriptedScorer::uniform(0.123456));
        let result = ZeroShotEnsemble::new(scorer).classify("anything").await.unwrap();
        assert_eq!(result.all_scores.get(IntentLabel::Answer), 0.1235);
        assert_eq!(result.predicted_intent, Some(IntentLabel::Research));
    }

    #[tokio::test]
    async fn test_scorer_failure_propagates() {
        let ensemble = ZeroShotEnsemble::new(Arc::new(ScriptedScorer::failing()));
        assert!(matches!(
            ensemble.classify("fed rate decision").await,
            Err(QueryMindError::Scorer(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_warms_up() {
        let scorer = Arc::new(ScriptedScorer::uniform(0.2));
        ZeroShotEnsemble::initialize(scorer.clone()).await.unwrap();
        assert_eq!(scorer.warm_ups(), 1);
    }
}
