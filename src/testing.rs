

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::core::error::{QueryMindError, Result};
use crate::core::intent::{IntentLabel, IntentScores, IntentSource, INTENT_COUNT};
use crate::llm::concept::ConceptExtractor;
use crate::llm::embeddings::{Embedder, EmbeddingError};
use crate::llm::providers::{LlmMetadata, LlmProvider, LlmProviderError};
use crate::llm::zero_shot::{ScorerError, ZeroShotScorer};
use crate::toolkit::intent::phrases::phrase_label;
use crate::toolkit::intent::IntentSignal;


pub struct ScriptedLlm {
    reply: Option<String>,
    calls: AtomicUsize,
    last_user_prompt: Mutex<Option<String>>,
}

impl ScriptedLlm {
    pub fn always(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _response_format: Option<&str>,
    ) -> std::result::Result<(String, LlmMetadata), LlmProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_prompt.lock() = Some(user_prompt.to_string());

        match &self.reply {
            Some(reply) => Ok((
                reply.clone(),
                LlmMetadata {
                    provider: "scripted".to_string(),
                    model: "scripted-model".to_string(),
                    ..Default::default()
                },
            )),
            None => Err(LlmProviderError::Provider("scripted failure".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}


/// Stable pseudo-random unit-range vector for any text.
pub fn hash_vector(text: &str, dimension: usize) -> Vec<f32> {
    (0..dimension)
        .map(|i| {
            let digest = Sha256::digest(format!("{}:{}", text, i / 32).as_bytes());
            f32::from(digest[i % 32]) / 127.5 - 1.0
        })
        .collect()
}


/// Returns registered vectors for known texts and hash vectors otherwise.
pub struct FixedEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| hash_vector(text, self.dimension)))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}


pub struct ScriptedExtractor {
    label: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn always(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            label: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConceptExtractor for ScriptedExtractor {
    async fn extract_concept(&self, _text: &str) -> std::result::Result<String, LlmProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.label
            .clone()
            .ok_or_else(|| LlmProviderError::Provider("scripted failure".to_string()))
    }
}


/// Scores phrases by the label they belong to.
pub struct ScriptedScorer {
    scores: Option<[f64; INTENT_COUNT]>,
    calls: AtomicUsize,
    warm_ups: AtomicUsize,
}

impl ScriptedScorer {
    pub fn uniform(score: f64) -> Self {
        Self::with_scores(Some([score; INTENT_COUNT]))
    }

    pub fn favouring(label: IntentLabel, high: f64, low: f64) -> Self {
        let mut scores = [low; INTENT_COUNT];
        scores[label.index()] = high;
        Self::with_scores(Some(scores))
    }

    pub fn failing() -> Self {
        Self::with_scores(None)
    }

    fn with_scores(scores: Option<[f64; INTENT_COUNT]>) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
            warm_ups: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn warm_ups(&self) -> usize {
        self.warm_ups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ZeroShotScorer for ScriptedScorer {
    async fn score_batch(
        &self,
        _text: &str,
        phrases: &[&str],
        _template: &str,
    ) -> std::result::Result<Vec<f64>, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scores = self
            .scores
            .ok_or_else(|| ScorerError::InvalidResponse("scripted failure".to_string()))?;
        Ok(phrases
            .iter()
            .map(|phrase| phrase_label(phrase).map_or(0.0, |label| scores[label.index()]))
            .collect())
    }

    async fn warm_up(&self) -> std::result::Result<(), ScorerError> {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
        match self.scores {
            Some(_) => Ok(()),
            None => Err(ScorerError::InvalidResponse("scripted failure".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted-scorer"
    }
}


pub struct CountingSignal {
    source: IntentSource,
    scores: Option<IntentScores>,
    calls: AtomicUsize,
}

impl CountingSignal {
    pub fn scores(source: IntentSource, scores: [f64; INTENT_COUNT]) -> Self {
        Self {
            source,
            scores: Some(IntentScores::new(scores)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(source: IntentSource) -> Self {
        Self {
            source,
            scores: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentSignal for CountingSignal {
    async fn label_scores(&self, _query: &str) -> Result<IntentScores> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores
            .ok_or_else(|| QueryMindError::Internal(format!("{} signal unavailable", self.source)))
    }

    fn source(&self) -> IntentSource {
        self.source
    }
}
