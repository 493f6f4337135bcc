

use serde::{Deserialize, Serialize};

use super::intent::{IntentLabel, IntentScores, IntentSource};


/// A submitted search string. Identity is the literal content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub content: String,
    pub intent: Option<IntentLabel>,
}

impl QueryRecord {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            intent: None,
        }
    }

    pub fn with_intent(content: impl Into<String>, intent: IntentLabel) -> Self {
        Self {
            content: content.into(),
            intent: Some(intent),
        }
    }
}


/// Concept as written on creation. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub name: String,
    pub intent: Option<IntentLabel>,
    pub embedding: Vec<f32>,
}


/// Concept row returned by the store for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConcept {
    pub name: String,
    #[serde(default)]
    pub intent: Option<IntentLabel>,
    pub embedding: Vec<f32>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptMatch {
    pub name: String,
    pub intent: Option<IntentLabel>,
    pub similarity: f64,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConceptOutcome {
    /// No stored concept was close enough; a new one was written.
    Created { concept: String },
    /// The query was attached to these existing concepts.
    Connected { concepts: Vec<String> },
    /// Nearest concept sits between the create and connect thresholds.
    Ambiguous { nearest: String, similarity: f64 },
}

impl ConceptOutcome {
    /// Concepts the query now hangs off.
    #[must_use]
    pub fn concept_names(&self) -> Vec<&str> {
        match self {
            Self::Created { concept } => vec![concept.as_str()],
            Self::Connected { concepts } => concepts.iter().map(String::as_str).collect(),
            Self::Ambiguous { .. } => Vec::new(),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Concept,
    Query,
    Link,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    SearchedBy,
    Clicked,
}

impl EdgeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchedBy => "SEARCHED_BY",
            Self::Clicked => "CLICKED",
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub kind: NodeKind,
    /// Identity key: concept name, query content or link address.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentLabel>,
}


#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub from: String,
    pub to: String,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphExport {
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn count_edges(&self, kind: EdgeKind) -> usize {
        self.edges.iter().filter(|e| e.kind == kind).count()
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDecision {
    pub label: IntentLabel,
    pub confidence: f64,
    pub source: IntentSource,
    /// Set when a single source crossed the early-exit threshold.
    pub early_exit: bool,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub query: String,
    pub predicted_intent: Option<IntentLabel>,
    pub confidence: f64,
    pub all_scores: IntentScores,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyIntentRequest {
    pub query: String,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyIntentResponse {
    pub label: IntentLabel,
    pub confidence: f64,
    pub source: IntentSource,
}

impl From<IntentDecision> for ClassifyIntentResponse {
    fn from(decision: IntentDecision) -> Self {
        Self {
            label: decision.label,
            confidence: decision.confidence,
            source: decision.source,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertQueryConceptRequest {
    pub query: String,
    pub intent: IntentLabel,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertQueryConceptResponse {
    pub query: String,
    #[serde(flatten)]
    pub outcome: ConceptOutcome,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordClicksRequest {
    pub query: String,
    #[serde(default)]
    pub intent: Option<IntentLabel>,
    pub links: Vec<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordClicksResponse {
    pub query: String,
    pub recorded: usize,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksForConceptResponse {
    pub concept: String,
    pub links: Vec<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQueryResponse {
    pub query: String,
    pub decision: IntentDecision,
    #[serde(flatten)]
    pub outcome: ConceptOutcome,
}
