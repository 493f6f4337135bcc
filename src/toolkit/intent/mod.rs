

pub mod ensemble;
pub mod fusion;
pub mod lazy;
pub mod memory_signal;
pub mod phrases;
pub mod prompt;

pub use ensemble::ZeroShotEnsemble;
pub use fusion::{fuse_scores, IntentFusionEngine, IntentSignal};
pub use lazy::LazyEnsemble;
pub use memory_signal::MemoryIntentClassifier;
