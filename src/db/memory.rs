

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::store::{GraphStore, StoreError};
use crate::core::intent::IntentLabel;
use crate::core::models::{
    ConceptRecord, EdgeKind, GraphEdge, GraphExport, GraphNode, NodeKind, QueryRecord,
    StoredConcept,
};


#[derive(Default)]
struct Graph {
    concepts: BTreeMap<String, StoredConcept>,
    queries: BTreeMap<String, Option<IntentLabel>>,
    links: BTreeSet<String>,
    searched_by: BTreeSet<(String, String)>,
    clicked: BTreeSet<(String, String)>,
}

impl Graph {
    /// An unset intent is filled by a later write; a set one is kept.
    fn merge_query(&mut self, query: &QueryRecord) {
        let intent = self.queries.entry(query.content.clone()).or_insert(None);
        if intent.is_none() {
            *intent = query.intent;
        }
    }
}


/// Process-local graph with the same merge rules as the HelixDB schema.
#[derive(Default)]
pub struct InMemoryGraphStore {
    graph: RwLock<Graph>,
    writes: AtomicUsize,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write operations received so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn concept_count(&self) -> usize {
        self.graph.read().concepts.len()
    }

    pub fn query_count(&self) -> usize {
        self.graph.read().queries.len()
    }

    pub fn searched_by_count(&self) -> usize {
        self.graph.read().searched_by.len()
    }

    pub fn clicked_count(&self) -> usize {
        self.graph.read().clicked.len()
    }

    /// Inserts a concept directly; used to seed graphs.
    pub fn seed_concept(&self, name: &str, intent: Option<IntentLabel>, embedding: Vec<f32>) {
        self.graph
            .write()
            .concepts
            .entry(name.to_string())
            .or_insert_with(|| StoredConcept {
                name: name.to_string(),
                intent,
                embedding,
            });
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn concept_candidates(
        &self,
        _embedding: &[f32],
        _limit: usize,
    ) -> Result<Vec<StoredConcept>, StoreError> {
        Ok(self.graph.read().concepts.values().cloned().collect())
    }

    async fn create_concept_for_query(
        &self,
        concept: &ConceptRecord,
        query: &QueryRecord,
    ) -> Result<(), StoreError> {
        self.count_write();
        let mut graph = self.graph.write();
        graph
            .concepts
            .entry(concept.name.clone())
            .or_insert_with(|| StoredConcept {
                name: concept.name.clone(),
                intent: concept.intent,
                embedding: concept.embedding.clone(),
            });
        graph.merge_query(query);
        graph
            .searched_by
            .insert((concept.name.clone(), query.content.clone()));
        debug!("Merged concept '{}' for query", concept.name);
        Ok(())
    }

    async fn upsert_query(&self, query: &QueryRecord) -> Result<(), StoreError> {
        self.count_write();
        self.graph.write().merge_query(query);
        Ok(())
    }

    async fn connect_concept_to_query(
        &self,
        concept_name: &str,
        query: &QueryRecord,
    ) -> Result<(), StoreError> {
        self.count_write();
        let mut graph = self.graph.write();
        if !graph.concepts.contains_key(concept_name) {
            return Err(StoreError::query(
                "connectConceptToQuery",
                format!("concept not found: {}", concept_name),
            ));
        }
        graph.merge_query(query);
        graph
            .searched_by
            .insert((concept_name.to_string(), query.content.clone()));
        Ok(())
    }

    async fn record_click(&self, query: &QueryRecord, address: &str) -> Result<(), StoreError> {
        self.count_write();
        let mut graph = self.graph.write();
        graph.merge_query(query);
        graph.links.insert(address.to_string());
        graph
            .clicked
            .insert((query.content.clone(), address.to_string()));
        Ok(())
    }

    async fn links_for_concept(&self, concept_name: &str) -> Result<Vec<String>, StoreError> {
        let graph = self.graph.read();
        let mut links = Vec::new();
        for (_, query) in graph.searched_by.iter().filter(|(c, _)| c == concept_name) {
            for (_, address) in graph.clicked.iter().filter(|(q, _)| q == query) {
                if !links.contains(address) {
                    links.push(address.clone());
                }
            }
        }
        Ok(links)
    }

    async fn export_graph(&self) -> Result<GraphExport, StoreError> {
        let graph = self.graph.read();
        let mut export = GraphExport::default();

        export.nodes.extend(graph.concepts.values().map(|c| GraphNode {
            kind: NodeKind::Concept,
            key: c.name.clone(),
            intent: c.intent,
        }));
        export.nodes.extend(graph.queries.iter().map(|(content, intent)| GraphNode {
            kind: NodeKind::Query,
            key: content.clone(),
            intent: *intent,
        }));
        export.nodes.extend(graph.links.iter().map(|address| GraphNode {
            kind: NodeKind::Link,
            key: address.clone(),
            intent: None,
        }));
        export.edges.extend(graph.searched_by.iter().map(|(from, to)| GraphEdge {
            kind: EdgeKind::SearchedBy,
            from: from.clone(),
            to: to.clone(),
        }));
        export.edges.extend(graph.clicked.iter().map(|(from, to)| GraphEdge {
            kind: EdgeKind::Clicked,
            from: from.clone(),
            to: to.clone(),
        }));
        Ok(export)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(name: &str) -> ConceptRecord {
        ConceptRecord {
            name: name.to_string(),
            intent: Some(IntentLabel::Research),
            embedding: vec![1.0, 0.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_concept_creation_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let query = QueryRecord::with_intent("how to bake sourdough", IntentLabel::Answer);

        store.create_concept_for_query(&concept("Sourdough baking"), &query).await.unwrap();
        store.create_concept_for_query(&concept("Sourdough baking"), &query).await.unwrap();

        assert_eq!(store.concept_count(), 1);
        assert_eq!(store.query_count(), 1);
        assert_eq!(store.searched_by_count(), 1);
    }

    #[tokio::test]
    async fn test_set_intent_is_kept() {
        let store = InMemoryGraphStore::new();
        let first = QueryRecord::with_intent("tesla stock", IntentLabel::News);
        let second = QueryRecord::with_intent("tesla stock", IntentLabel::Transactional);
        store.upsert_query(&first).await.unwrap();
        store.upsert_query(&second).await.unwrap();

        let export = store.export_graph().await.unwrap();
        let node = export.nodes.iter().find(|n| n.kind == NodeKind::Query).unwrap();
        assert_eq!(node.intent, Some(IntentLabel::News));
    }

    #[tokio::test]
    async fn test_unset_intent_is_filled_by_later_write() {
        let store = InMemoryGraphStore::new();
        store
            .record_click(&QueryRecord::new("fed rate decision"), "https://federalreserve.gov")
            .await
            .unwrap();
        store
            .upsert_query(&QueryRecord::with_intent("fed rate decision", IntentLabel::News))
            .await
            .unwrap();

        let export = store.export_graph().await.unwrap();
        let node = export.nodes.iter().find(|n| n.kind == NodeKind::Query).unwrap();
        assert_eq!(node.intent, Some(IntentLabel::News));
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_click_yields_one_edge() {
        let store = InMemoryGraphStore::new();
        let query = QueryRecord::new("rust async book");
        store.record_click(&query, "https://rust-lang.github.io/async-book/").await.unwrap();
        store.record_click(&query, "https://rust-lang.github.io/async-book/").await.unwrap();

        assert_eq!(store.clicked_count(), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_connect_requires_existing_concept() {
        let store = InMemoryGraphStore::new();
        let err = store
            .connect_concept_to_query("Missing", &QueryRecord::new("q"))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(store.searched_by_count(), 0);
    }

    #[tokio::test]
    async fn test_links_for_concept_walks_two_hops() {
        let store = InMemoryGraphStore::new();
        let q1 = QueryRecord::new("chip export rules");
        let q2 = QueryRecord::new("nvidia export ban");
        store.create_concept_for_query(&concept("AI export policy"), &q1).await.unwrap();
        store.connect_concept_to_query("AI export policy", &q2).await.unwrap();
        store.record_click(&q1, "https://bis.doc.gov").await.unwrap();
        store.record_click(&q2, "https://bis.doc.gov").await.unwrap();
        store.record_click(&q2, "https://reuters.com/tech").await.unwrap();
        store.record_click(&QueryRecord::new("unrelated"), "https://example.com").await.unwrap();

        let links = store.links_for_concept("AI export policy").await.unwrap();
        assert_eq!(links, vec!["https://bis.doc.gov", "https://reuters.com/tech"]);
        assert!(store.links_for_concept("Nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_contains_every_node_and_edge() {
        let store = InMemoryGraphStore::new();
        let query = QueryRecord::new("chip export rules");
        store.create_concept_for_query(&concept("AI export policy"), &query).await.unwrap();
        store.record_click(&query, "https://bis.doc.gov").await.unwrap();

        let export = store.export_graph().await.unwrap();
        assert_eq!(export.count(NodeKind::Concept), 1);
        assert_eq!(export.count(NodeKind::Query), 1);
        assert_eq!(export.count(NodeKind::Link), 1);
        assert_eq!(export.count_edges(EdgeKind::SearchedBy), 1);
        assert_eq!(export.count_edges(EdgeKind::Clicked), 1);
    }
}
