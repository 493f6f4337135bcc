

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::error::{QueryMindError, Result};
use crate::core::intent::{IntentLabel, IntentScores, IntentSource};
use crate::core::models::IntentDecision;
use crate::safe_truncate;


/// A source of per-label confidence for a query.
#[async_trait]
pub trait IntentSignal: Send + Sync {
    async fn label_scores(&self, query: &str) -> Result<IntentScores>;

    fn source(&self) -> IntentSource;
}


/// Largest cell of the stacked (memory, zero-shot) matrix. Row-major scan,
/// first occurrence wins.
pub fn fuse_scores(memory: &IntentScores, zero_shot: &IntentScores) -> (IntentSource, IntentLabel, f64) {
    let (mut source, (mut label, mut score)) = (IntentSource::Memory, memory.best());
    let (zs_label, zs_score) = zero_shot.best();
    if zs_score > score {
        source = IntentSource::ZeroShot;
        label = zs_label;
        score = zs_score;
    }
    (source, label, score)
}


/// Two-stage intent decision: memory signal first, zero-shot ensemble only
/// when memory is not decisive.
pub struct IntentFusionEngine {
    memory: Arc<dyn IntentSignal>,
    zero_shot: Arc<dyn IntentSignal>,
    early_exit_threshold: f64,
}

impl IntentFusionEngine {
    pub fn new(
        memory: Arc<dyn IntentSignal>,
        zero_shot: Arc<dyn IntentSignal>,
        early_exit_threshold: f64,
    ) -> Self {
        Self {
            memory,
            zero_shot,
            early_exit_threshold,
        }
    }

    pub async fn decide(&self, query: &str) -> Result<IntentDecision> {
        let memory = self.memory.label_scores(query).await;
        self.decide_with_memory(query, memory).await
    }

    /// Same as `decide`, with the memory signal already evaluated by the caller.
    pub async fn decide_with_memory(
        &self,
        query: &str,
        memory: Result<IntentScores>,
    ) -> Result<IntentDecision> {
        let memory = match memory {
            Ok(scores) => {
                if let Some(decision) = self.early_exit(&scores, IntentSource::Memory) {
                    return Ok(decision);
                }
                Ok(scores)
            }
            Err(e) => {
                warn!(
                    "Memory intent signal failed for '{}': {}",
                    safe_truncate(query, 50),
                    e
                );
                Err(e)
            }
        };

        let zero_shot = match self.zero_shot.label_scores(query).await {
            Ok(scores) => {
                if let Some(decision) = self.early_exit(&scores, IntentSource::ZeroShot) {
                    return Ok(decision);
                }
                Ok(scores)
            }
            Err(e) => {
                warn!(
                    "Zero-shot intent signal failed for '{}': {}",
                    safe_truncate(query, 50),
                    e
                );
                Err(e)
            }
        };

        let (source, label, confidence) = match (memory, zero_shot) {
            (Ok(a), Ok(b)) => fuse_scores(&a, &b),
            (Ok(a), Err(_)) => {
                let (label, score) = a.best();
                (IntentSource::Memory, label, score)
            }
            (Err(_), Ok(b)) => {
                let (label, score) = b.best();
                (IntentSource::ZeroShot, label, score)
            }
            (Err(a), Err(b)) => {
                return Err(QueryMindError::IntentSourcesFailed {
                    memory: a.to_string(),
                    zero_shot: b.to_string(),
                })
            }
        };

        debug!("Fused intent: {} ({:.4}) from {}", label, confidence, source);
        Ok(IntentDecision {
            label,
            confidence,
            source,
            early_exit: false,
        })
    }

    fn early_exit(&self, scores: &IntentScores, source: IntentSource) -> Option<IntentDecision> {
        let (label, confidence) = scores.first_above(self.early_exit_threshold)?;
        debug!("Early exit on {}: {} ({:.4})", source, label, confidence);
        Some(IntentDecision {
            label,
            confidence,
            source,
            early_exit: true,
        })
    }
}
