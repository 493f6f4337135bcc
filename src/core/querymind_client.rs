

use std::sync::Arc;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::config::{QueryMindConfig, StoreBackend};
use super::error::{QueryMindError, Result};
use super::models::{
    ClassifyIntentRequest, ClassifyIntentResponse, GraphExport, IntentDecision,
    LinksForConceptResponse, QueryRecord, RecordClicksRequest, RecordClicksResponse,
    SubmitQueryResponse, UpsertQueryConceptRequest, UpsertQueryConceptResponse,
};
use crate::db::{GraphStore, HelixClient, HelixGraphStore, InMemoryGraphStore};
use crate::llm::concept::ConceptExtractor;
use crate::llm::embeddings::Embedder;
use crate::llm::factory::{CollaboratorFactory, EmbeddingProviderFactory, LlmProviderFactory};
use crate::llm::providers::LlmProvider;
use crate::llm::zero_shot::ZeroShotScorer;
use crate::safe_truncate;
use crate::toolkit::concepts::{ConceptGraphMaintainer, ConceptThresholds, SimilaritySearch};
use crate::toolkit::intent::{IntentFusionEngine, LazyEnsemble, MemoryIntentClassifier};


/// External services the core runs against.
pub struct Collaborators {
    pub store: Arc<dyn GraphStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn Embedder>,
    pub extractor: Arc<dyn ConceptExtractor>,
    pub scorer: Arc<dyn ZeroShotScorer>,
}

impl Collaborators {
    /// Real providers and the configured store backend.
    pub fn from_config(config: &QueryMindConfig) -> Result<Self> {
        let store: Arc<dyn GraphStore> = match config.store_backend {
            StoreBackend::Helix => Arc::new(HelixGraphStore::new(Arc::new(
                HelixClient::from_config(config),
            ))),
            StoreBackend::Memory => Arc::new(InMemoryGraphStore::new()),
        };
        let llm = LlmProviderFactory::from_config(config)?;

        Ok(Self {
            store,
            embedder: Arc::new(EmbeddingProviderFactory::from_config(config)?),
            extractor: Arc::new(CollaboratorFactory::concept_extractor(llm.clone())),
            scorer: Arc::new(CollaboratorFactory::zero_shot_scorer(config)?),
            llm,
        })
    }
}


/// Entry point for intent classification and concept-graph memory.
pub struct QueryMindClient {
    config: QueryMindConfig,
    store: Arc<dyn GraphStore>,
    ensemble: Arc<LazyEnsemble>,
    memory: Arc<MemoryIntentClassifier>,
    fusion: IntentFusionEngine,
    maintainer: ConceptGraphMaintainer,
}

impl QueryMindClient {

    pub fn new(config: QueryMindConfig) -> Result<Self> {
        config.validate()?;
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::with_collaborators(config, collaborators))
    }


    pub fn with_collaborators(config: QueryMindConfig, parts: Collaborators) -> Self {
        let search = Arc::new(SimilaritySearch::new(
            parts.store.clone(),
            config.similarity_top_k,
        ));
        let ensemble = Arc::new(LazyEnsemble::with_scorer(parts.scorer));
        let memory = Arc::new(MemoryIntentClassifier::new(
            parts.llm,
            parts.embedder.clone(),
            search.clone(),
        ));
        let fusion = IntentFusionEngine::new(
            memory.clone(),
            ensemble.clone(),
            config.early_exit_threshold,
        );
        let maintainer = ConceptGraphMaintainer::new(
            parts.store.clone(),
            search,
            parts.embedder,
            parts.extractor,
            ConceptThresholds {
                create: config.create_threshold,
                connect: config.connect_threshold,
            },
        );

        Self {
            config,
            store: parts.store,
            ensemble,
            memory,
            fusion,
            maintainer,
        }
    }

    /// Checks the store is reachable.
    pub async fn initialize(&self) -> Result<()> {
        self.store.health_check().await?;
        info!(
            "QueryMind client ready (store={}, top_k={})",
            self.store.backend_name(),
            self.config.similarity_top_k
        );
        Ok(())
    }


    pub fn config(&self) -> &QueryMindConfig {
        &self.config
    }


    pub fn store_backend(&self) -> &str {
        self.store.backend_name()
    }


    pub async fn ensemble_ready(&self) -> bool {
        self.ensemble.is_initialized().await
    }

    async fn decide_intent(&self, query: &str) -> Result<IntentDecision> {
        require_text(query, "query")?;
        self.fusion.decide(query).await
    }

    pub async fn classify_intent(&self, request: ClassifyIntentRequest) -> Result<ClassifyIntentResponse> {
        let span = info_span!("classify_intent", request_id = %Uuid::new_v4());
        let decision = self.decide_intent(&request.query).instrument(span).await?;
        info!(
            "Intent for '{}': {} ({:.3}, {})",
            safe_truncate(&request.query, 50),
            decision.label,
            decision.confidence,
            decision.source
        );
        Ok(decision.into())
    }

    pub async fn upsert_query_concept(
        &self,
        request: UpsertQueryConceptRequest,
    ) -> Result<UpsertQueryConceptResponse> {
        let span = info_span!("upsert_query_concept", request_id = %Uuid::new_v4());
        let query = QueryRecord::with_intent(request.query, request.intent);
        let outcome = self
            .maintainer
            .upsert_query_concept(&query)
            .instrument(span)
            .await?;
        Ok(UpsertQueryConceptResponse {
            query: query.content,
            outcome,
        })
    }

    pub async fn record_clicks(&self, request: RecordClicksRequest) -> Result<RecordClicksResponse> {
        let span = info_span!("record_clicks", request_id = %Uuid::new_v4());
        let query = QueryRecord {
            content: request.query,
            intent: request.intent,
        };
        let recorded = self
            .maintainer
            .record_clicks(&query, &request.links)
            .instrument(span)
            .await?;
        Ok(RecordClicksResponse {
            query: query.content,
            recorded,
        })
    }

    pub async fn links_for_concept(&self, concept: &str) -> Result<LinksForConceptResponse> {
        let span = info_span!("links_for_concept", request_id = %Uuid::new_v4());
        let links = self
            .maintainer
            .links_for_concept(concept)
            .instrument(span)
            .await?;
        Ok(LinksForConceptResponse {
            concept: concept.to_string(),
            links,
        })
    }

    /// Resolves free text to its canonical concept, then returns that
    /// concept's links.
    pub async fn links_for_topic(&self, text: &str) -> Result<LinksForConceptResponse> {
        let span = info_span!("links_for_topic", request_id = %Uuid::new_v4());
        let (concept, links) = self
            .maintainer
            .links_for_topic(text)
            .instrument(span)
            .await?;
        Ok(LinksForConceptResponse { concept, links })
    }

    pub async fn export_graph(&self) -> Result<GraphExport> {
        let span = info_span!("export_graph", request_id = %Uuid::new_v4());
        self.maintainer.export_graph().instrument(span).await
    }

    /// Classifies the query, then files it under a concept with the chosen
    /// intent.
    pub async fn submit_query(&self, query: &str) -> Result<SubmitQueryResponse> {
        let span = info_span!("submit_query", request_id = %Uuid::new_v4());
        self.submit(query).instrument(span).await
    }

    /// One embedding and one search feed both the memory signal and the
    /// concept decision.
    async fn submit(&self, query: &str) -> Result<SubmitQueryResponse> {
        require_text(query, "query")?;
        let related = self.memory.related_concepts(query).await?;
        let memory_scores = self.memory.scores_for(query, &related).await;
        let decision = self.fusion.decide_with_memory(query, memory_scores).await?;

        let record = QueryRecord::with_intent(query, decision.label);
        let outcome = self.maintainer.apply(&record, &related).await?;

        info!(
            "Submitted '{}' as {} -> {:?}",
            safe_truncate(query, 50),
            decision.label,
            outcome.concept_names()
        );
        Ok(SubmitQueryResponse {
            query: record.content,
            decision,
            outcome,
        })
    }

    /// Releases the zero-shot ensemble. Classification fails afterwards
    /// unless the memory signal is decisive on its own.
    pub async fn shutdown(&self) {
        self.ensemble.shutdown().await;
        info!("QueryMind client shut down");
    }
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(QueryMindError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}
