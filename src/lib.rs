

#![allow(dead_code)]

pub mod core;
pub mod db;
pub mod llm;
pub mod mcp;
pub mod toolkit;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use utils::{round_to, safe_truncate};


pub use core::config::QueryMindConfig;
pub use core::error::{QueryMindError, Result};
pub use core::intent::{IntentLabel, IntentScores, IntentSource};
pub use core::querymind_client::QueryMindClient;
pub use db::{GraphStore, HelixClient, StoreError};
pub use llm::embeddings::{Embedder, EmbeddingGenerator};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";


pub const DEFAULT_HELIX_PORT: u16 = 6969;


pub const DEFAULT_TOP_K: usize = 5;


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;
