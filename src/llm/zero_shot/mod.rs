

pub mod scorer;

pub use scorer::{HuggingFaceZeroShotScorer, ScorerError, ZeroShotScorer};
