

pub mod concepts;
pub mod intent;

pub use concepts::{ConceptGraphMaintainer, ConceptThresholds, SimilaritySearch};
pub use intent::{IntentFusionEngine, IntentSignal, LazyEnsemble, MemoryIntentClassifier};
