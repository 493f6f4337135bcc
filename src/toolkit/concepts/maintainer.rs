

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::search::SimilaritySearch;
use crate::core::error::{QueryMindError, Result};
use crate::core::models::{ConceptMatch, ConceptOutcome, ConceptRecord, GraphExport, QueryRecord};
use crate::db::GraphStore;
use crate::llm::concept::ConceptExtractor;
use crate::llm::embeddings::Embedder;
use crate::safe_truncate;


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConceptThresholds {
    /// Create a concept when the best match is strictly below this.
    pub create: f64,
    /// Connect to every match strictly above this.
    pub connect: f64,
}

impl Default for ConceptThresholds {
    fn default() -> Self {
        Self {
            create: 0.35,
            connect: 0.40,
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub enum ConceptAction {
    Create,
    Connect(Vec<String>),
    /// Best match falls between the two thresholds.
    Ambiguous { nearest: String, similarity: f64 },
}


/// Create-or-connect decision over a ranked match list.
pub fn decide(ranked: &[ConceptMatch], thresholds: ConceptThresholds) -> ConceptAction {
    let Some(top) = ranked.first() else {
        return ConceptAction::Create;
    };

    if top.similarity < thresholds.create {
        return ConceptAction::Create;
    }

    let connect: Vec<String> = ranked
        .iter()
        .filter(|m| m.similarity > thresholds.connect)
        .map(|m| m.name.clone())
        .collect();

    if connect.is_empty() {
        ConceptAction::Ambiguous {
            nearest: top.name.clone(),
            similarity: top.similarity,
        }
    } else {
        ConceptAction::Connect(connect)
    }
}


/// Keeps the Concept/Query/Link graph in step with submitted queries.
pub struct ConceptGraphMaintainer {
    store: Arc<dyn GraphStore>,
    search: Arc<SimilaritySearch>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn ConceptExtractor>,
    thresholds: ConceptThresholds,
}

impl ConceptGraphMaintainer {
    pub fn new(
        store: Arc<dyn GraphStore>,
        search: Arc<SimilaritySearch>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn ConceptExtractor>,
        thresholds: ConceptThresholds,
    ) -> Self {
        Self {
            store,
            search,
            embedder,
            extractor,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> ConceptThresholds {
        self.thresholds
    }

    /// Embeds the query, ranks stored concepts and applies the decision.
    pub async fn upsert_query_concept(&self, query: &QueryRecord) -> Result<ConceptOutcome> {
        validate_query(&query.content)?;

        let embedding = self.embedder.embed(&query.content).await?;
        let ranked = self.search.search(&embedding).await?;
        self.apply(query, &ranked).await
    }

    /// Applies the create-or-connect decision for an already ranked list.
    pub async fn apply(&self, query: &QueryRecord, ranked: &[ConceptMatch]) -> Result<ConceptOutcome> {
        match decide(ranked, self.thresholds) {
            ConceptAction::Create => self.create_concept(query).await,
            ConceptAction::Connect(names) => {
                for name in &names {
                    self.store.connect_concept_to_query(name, query).await?;
                }
                debug!(
                    "Connected '{}' to {} concept(s)",
                    safe_truncate(&query.content, 50),
                    names.len()
                );
                Ok(ConceptOutcome::Connected { concepts: names })
            }
            ConceptAction::Ambiguous { nearest, similarity } => {
                warn!(
                    "Query '{}' is ambiguous: nearest concept '{}' at {:.3}, recording query only",
                    safe_truncate(&query.content, 50),
                    nearest,
                    similarity
                );
                self.store.upsert_query(query).await?;
                Ok(ConceptOutcome::Ambiguous { nearest, similarity })
            }
        }
    }

    async fn create_concept(&self, query: &QueryRecord) -> Result<ConceptOutcome> {
        let name = self.extractor.extract_concept(&query.content).await?;
        let embedding = self.embedder.embed(&name).await?;

        if let Some(expected) = self.embedder.dimension() {
            if embedding.len() != expected {
                return Err(QueryMindError::MalformedEvidence(format!(
                    "concept embedding has {} dimensions, expected {}",
                    embedding.len(),
                    expected
                )));
            }
        }

        let concept = ConceptRecord {
            name,
            intent: query.intent,
            embedding,
        };
        self.store.create_concept_for_query(&concept, query).await?;

        info!(
            "Created concept '{}' for query '{}'",
            concept.name,
            safe_truncate(&query.content, 50)
        );
        Ok(ConceptOutcome::Created { concept: concept.name })
    }

    /// One CLICKED merge per address. Every address is validated before the
    /// first write.
    pub async fn record_clicks(&self, query: &QueryRecord, links: &[String]) -> Result<usize> {
        validate_query(&query.content)?;
        for link in links {
            validate_link(link)?;
        }

        for link in links {
            self.store.record_click(query, link).await?;
        }

        debug!(
            "Recorded {} click(s) for '{}'",
            links.len(),
            safe_truncate(&query.content, 50)
        );
        Ok(links.len())
    }

    pub async fn links_for_concept(&self, concept_name: &str) -> Result<Vec<String>> {
        if concept_name.trim().is_empty() {
            return Err(QueryMindError::Validation("concept name must not be empty".to_string()));
        }
        Ok(self.store.links_for_concept(concept_name).await?)
    }

    /// Canonical concept of free text, then its links.
    pub async fn links_for_topic(&self, text: &str) -> Result<(String, Vec<String>)> {
        validate_query(text)?;
        let concept = self.extractor.extract_concept(text).await?;
        let links = self.links_for_concept(&concept).await?;
        Ok((concept, links))
    }

    pub async fn export_graph(&self) -> Result<GraphExport> {
        let export = self.store.export_graph().await?;
        if export.nodes.len() > 10_000 {
            warn!("Exporting a large graph: {} nodes", export.nodes.len());
        }
        Ok(export)
    }
}


fn validate_query(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(QueryMindError::Validation("query must not be empty".to_string()));
    }
    Ok(())
}

fn validate_link(address: &str) -> Result<()> {
    let url = Url::parse(address)
        .map_err(|e| QueryMindError::Validation(format!("invalid link '{}': {}", address, e)))?;
    if url.host_str().is_none() {
        return Err(QueryMindError::Validation(format!("link has no host: {}", address)));
    }
    Ok(())
}
