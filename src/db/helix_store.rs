

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::HelixClient;
use super::store::{GraphStore, StoreError};
use crate::core::intent::IntentLabel;
use crate::core::models::{
    ConceptRecord, EdgeKind, GraphEdge, GraphExport, GraphNode, NodeKind, QueryRecord,
    StoredConcept,
};

/// Extra candidates requested from the HNSW index before exact re-ranking.
const CANDIDATE_OVERSAMPLE: usize = 4;

const MIN_CANDIDATES: usize = 20;


fn intent_param(intent: Option<IntentLabel>) -> String {
    intent.map(|i| i.to_string()).unwrap_or_default()
}

fn parse_intent(raw: &str) -> Option<IntentLabel> {
    if raw.is_empty() {
        None
    } else {
        IntentLabel::from_str(raw).ok()
    }
}


#[derive(Serialize)]
struct CandidateInput {
    query_vector: Vec<f64>,
    limit: i64,
}

#[derive(Deserialize, Default)]
struct CandidateOutput {
    #[serde(default)]
    candidates: Vec<CandidateRow>,
}

#[derive(Deserialize)]
struct CandidateRow {
    name: String,
    #[serde(default)]
    intent: String,
    #[serde(default)]
    embedding: Vec<f64>,
}

#[derive(Serialize)]
struct CreateConceptInput<'a> {
    name: &'a str,
    intent: String,
    vector: Vec<f64>,
    query_content: &'a str,
}

#[derive(Serialize)]
struct QueryInput<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct QueryIntentInput<'a> {
    content: &'a str,
    intent: String,
}

#[derive(Serialize)]
struct ConnectInput<'a> {
    concept_name: &'a str,
    query_content: &'a str,
}

#[derive(Serialize)]
struct ClickInput<'a> {
    query_content: &'a str,
    address: &'a str,
}

#[derive(Deserialize, Default)]
struct EmbeddingCountOutput {
    #[serde(default)]
    embeddings: i64,
}

#[derive(Serialize)]
struct ConceptNameInput<'a> {
    concept_name: &'a str,
}

#[derive(Deserialize, Default)]
struct LinksOutput {
    #[serde(default)]
    links: Vec<AddressRow>,
}

#[derive(Deserialize)]
struct AddressRow {
    address: String,
}

#[derive(Deserialize)]
struct NamedRow {
    name: String,
    #[serde(default)]
    intent: String,
}

#[derive(Deserialize)]
struct ContentRow {
    content: String,
    #[serde(default)]
    intent: String,
}

#[derive(Deserialize)]
struct EdgeRow {
    from: String,
    to: String,
}

#[derive(Deserialize, Default)]
struct ExportOutput {
    #[serde(default)]
    concepts: Vec<NamedRow>,
    #[serde(default)]
    queries: Vec<ContentRow>,
    #[serde(default)]
    links: Vec<AddressRow>,
    #[serde(default)]
    searched_by: Vec<EdgeRow>,
    #[serde(default)]
    clicked: Vec<EdgeRow>,
}


/// Queries that add nodes or vectors outright. A retry after a commit the
/// client never saw would write them twice, so they run exactly once.
const NON_IDEMPOTENT_QUERIES: &[&str] = &["createConceptForQuery"];

fn is_retry_safe(query_name: &str) -> bool {
    !NON_IDEMPOTENT_QUERIES.contains(&query_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConceptWrite {
    /// First sighting: concept, vector, query and edge in one query.
    Create,
    /// The concept already carries its vector; only the edge is added.
    LinkExisting,
}

fn concept_write(existing_embeddings: i64) -> ConceptWrite {
    if existing_embeddings > 0 {
        ConceptWrite::LinkExisting
    } else {
        ConceptWrite::Create
    }
}


/// `GraphStore` over the named HelixQL queries in `schema/queries.hx`.
pub struct HelixGraphStore {
    client: Arc<HelixClient>,
}

impl HelixGraphStore {
    pub fn new(client: Arc<HelixClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HelixClient {
        &self.client
    }

    async fn run<T, P>(&self, query_name: &str, params: &P) -> Result<T, StoreError>
    where
        T: serde::de::DeserializeOwned,
        P: Serialize + Sync,
    {
        if is_retry_safe(query_name) {
            self.client.execute_query(query_name, params).await
        } else {
            self.client.execute_query_no_retry(query_name, params).await
        }
    }

    /// Sets the query's intent only while it is still unset.
    async fn fill_query_intent(&self, query: &QueryRecord) -> Result<(), StoreError> {
        if let Some(intent) = query.intent {
            let input = QueryIntentInput {
                content: &query.content,
                intent: intent.to_string(),
            };
            self.run::<serde_json::Value, _>("fillQueryIntent", &input)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for HelixGraphStore {
    async fn concept_candidates(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<StoredConcept>, StoreError> {
        let input = CandidateInput {
            query_vector: embedding.iter().map(|v| f64::from(*v)).collect(),
            limit: (limit * CANDIDATE_OVERSAMPLE).max(MIN_CANDIDATES) as i64,
        };

        let output: CandidateOutput = self
            .run("searchConceptCandidates", &input)
            .await?;

        debug!("HelixDB returned {} concept candidates", output.candidates.len());

        Ok(output
            .candidates
            .into_iter()
            .map(|row| StoredConcept {
                intent: parse_intent(&row.intent),
                name: row.name,
                embedding: row.embedding.into_iter().map(|v| v as f32).collect(),
            })
            .collect())
    }

    async fn create_concept_for_query(
        &self,
        concept: &ConceptRecord,
        query: &QueryRecord,
    ) -> Result<(), StoreError> {
        let existing: EmbeddingCountOutput = self
            .run(
                "conceptEmbeddingCount",
                &ConceptNameInput {
                    concept_name: &concept.name,
                },
            )
            .await?;

        match concept_write(existing.embeddings) {
            ConceptWrite::Create => {
                let input = CreateConceptInput {
                    name: &concept.name,
                    intent: intent_param(concept.intent),
                    vector: concept.embedding.iter().map(|v| f64::from(*v)).collect(),
                    query_content: &query.content,
                };
                self.run::<serde_json::Value, _>("createConceptForQuery", &input)
                    .await?;
            }
            ConceptWrite::LinkExisting => {
                debug!("Concept '{}' already embedded, linking only", concept.name);
                let input = ConnectInput {
                    concept_name: &concept.name,
                    query_content: &query.content,
                };
                self.run::<serde_json::Value, _>("connectConceptToQuery", &input)
                    .await?;
            }
        }
        self.fill_query_intent(query).await
    }

    async fn upsert_query(&self, query: &QueryRecord) -> Result<(), StoreError> {
        self.run::<serde_json::Value, _>(
            "upsertQuery",
            &QueryInput {
                content: &query.content,
            },
        )
        .await?;
        self.fill_query_intent(query).await
    }

    async fn connect_concept_to_query(
        &self,
        concept_name: &str,
        query: &QueryRecord,
    ) -> Result<(), StoreError> {
        let input = ConnectInput {
            concept_name,
            query_content: &query.content,
        };
        self.run::<serde_json::Value, _>("connectConceptToQuery", &input)
            .await?;
        self.fill_query_intent(query).await
    }

    async fn record_click(&self, query: &QueryRecord, address: &str) -> Result<(), StoreError> {
        let input = ClickInput {
            query_content: &query.content,
            address,
        };
        self.run::<serde_json::Value, _>("recordClick", &input)
            .await?;
        self.fill_query_intent(query).await
    }

    async fn links_for_concept(&self, concept_name: &str) -> Result<Vec<String>, StoreError> {
        let output: LinksOutput = self
            .run("getLinksForConcept", &ConceptNameInput { concept_name })
            .await?;

        let mut links: Vec<String> = Vec::with_capacity(output.links.len());
        for row in output.links {
            if !links.contains(&row.address) {
                links.push(row.address);
            }
        }
        Ok(links)
    }

    async fn export_graph(&self) -> Result<GraphExport, StoreError> {
        let output: ExportOutput = self
            .run("exportGraph", &serde_json::json!({}))
            .await?;

        let mut export = GraphExport::default();
        export.nodes.extend(output.concepts.into_iter().map(|c| GraphNode {
            kind: NodeKind::Concept,
            intent: parse_intent(&c.intent),
            key: c.name,
        }));
        export.nodes.extend(output.queries.into_iter().map(|q| GraphNode {
            kind: NodeKind::Query,
            intent: parse_intent(&q.intent),
            key: q.content,
        }));
        export.nodes.extend(output.links.into_iter().map(|l| GraphNode {
            kind: NodeKind::Link,
            key: l.address,
            intent: None,
        }));
        export.edges.extend(output.searched_by.into_iter().map(|e| GraphEdge {
            kind: EdgeKind::SearchedBy,
            from: e.from,
            to: e.to,
        }));
        export.edges.extend(output.clicked.into_iter().map(|e| GraphEdge {
            kind: EdgeKind::Clicked,
            from: e.from,
            to: e.to,
        }));
        Ok(export)
    }

    fn backend_name(&self) -> &str {
        "helixdb"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_round_trip_through_params() {
        assert_eq!(intent_param(None), "");
        assert_eq!(intent_param(Some(IntentLabel::News)), "News");
        assert_eq!(parse_intent("News"), Some(IntentLabel::News));
        assert_eq!(parse_intent(""), None);
        assert_eq!(parse_intent("Unknown"), None);
    }

    #[test]
    fn test_concept_creation_is_never_retried() {
        assert!(!is_retry_safe("createConceptForQuery"));
        for name in [
            "searchConceptCandidates",
            "conceptEmbeddingCount",
            "upsertQuery",
            "fillQueryIntent",
            "connectConceptToQuery",
            "recordClick",
            "getLinksForConcept",
            "exportGraph",
        ] {
            assert!(is_retry_safe(name), "{} merges and may be retried", name);
        }
    }

    #[test]
    fn test_existing_embedding_links_instead_of_adding_vector() {
        assert_eq!(concept_write(0), ConceptWrite::Create);
        assert_eq!(concept_write(1), ConceptWrite::LinkExisting);
        assert_eq!(concept_write(2), ConceptWrite::LinkExisting);
    }

    #[test]
    fn test_embedding_count_defaults_to_zero() {
        let output: EmbeddingCountOutput = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(concept_write(output.embeddings), ConceptWrite::Create);
    }

    #[test]
    fn test_export_rows_deserialize_with_missing_sections() {
        let output: ExportOutput = serde_json::from_value(serde_json::json!({
            "concepts": [{"name": "AI export policy", "intent": "News"}],
            "searched_by": [{"from": "AI export policy", "to": "chip export rules"}]
        }))
        .unwrap();
        assert_eq!(output.concepts.len(), 1);
        assert!(output.queries.is_empty());
        assert_eq!(output.searched_by[0].to, "chip export rules");
    }

    #[test]
    fn test_candidate_rows_tolerate_missing_intent() {
        let output: CandidateOutput = serde_json::from_value(serde_json::json!({
            "candidates": [{"name": "Sourdough baking", "embedding": [0.1, 0.2]}]
        }))
        .unwrap();
        assert_eq!(output.candidates[0].intent, "");
        assert_eq!(output.candidates[0].embedding.len(), 2);
    }
}
