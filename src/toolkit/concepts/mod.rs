

pub mod maintainer;
pub mod search;
pub mod similarity;

pub use maintainer::{decide, ConceptAction, ConceptGraphMaintainer, ConceptThresholds};
pub use search::{rank_concepts, SimilaritySearch};
pub use similarity::{cosine_similarity, SimilarityError};
