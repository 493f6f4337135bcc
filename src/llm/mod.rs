

pub mod concept;
pub mod embeddings;
pub mod factory;
pub mod providers;
pub mod zero_shot;

pub use concept::{ConceptExtractor, LlmConceptExtractor};
pub use embeddings::{Embedder, EmbeddingError, EmbeddingGenerator};
pub use factory::{CollaboratorFactory, EmbeddingProviderFactory, LlmProviderFactory};
pub use zero_shot::{HuggingFaceZeroShotScorer, ScorerError, ZeroShotScorer};
