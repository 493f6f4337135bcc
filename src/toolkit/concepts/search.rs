

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::similarity::{cosine_similarity, SimilarityError};
use crate::core::error::Result;
use crate::core::models::{ConceptMatch, StoredConcept};
use crate::db::GraphStore;


/// Scores candidates against `query` and keeps the best `k`.
///
/// Ordering is similarity descending, then name ascending, so equal scores
/// always come back in the same order. A repeated name keeps its best row.
pub fn rank_concepts(
    query: &[f32],
    candidates: Vec<StoredConcept>,
    k: usize,
) -> std::result::Result<Vec<ConceptMatch>, SimilarityError> {
    let mut ranked = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let similarity = cosine_similarity(query, &candidate.embedding)?;
        ranked.push(ConceptMatch {
            name: candidate.name,
            intent: candidate.intent,
            similarity,
        });
    }

    ranked.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut seen = HashSet::new();
    ranked.retain(|m| seen.insert(m.name.clone()));
    ranked.truncate(k);
    Ok(ranked)
}


/// Ranks stored concepts by cosine similarity to a query embedding.
pub struct SimilaritySearch {
    store: Arc<dyn GraphStore>,
    top_k: usize,
}

impl SimilaritySearch {
    pub fn new(store: Arc<dyn GraphStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn search(&self, embedding: &[f32]) -> Result<Vec<ConceptMatch>> {
        self.search_k(embedding, self.top_k).await
    }

    pub async fn search_k(&self, embedding: &[f32], k: usize) -> Result<Vec<ConceptMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.store.concept_candidates(embedding, k).await?;
        let total = candidates.len();
        let ranked = rank_concepts(embedding, candidates, k)?;

        debug!(
            "Similarity search: {} candidates, top={:?}",
            total,
            ranked.first().map(|m| (&m.name, m.similarity))
        );
        Ok(ranked)
    }
}
