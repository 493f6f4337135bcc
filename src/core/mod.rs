

pub mod cache;
pub mod config;
pub mod error;
pub mod intent;
pub mod models;
pub mod querymind_client;

pub use config::{QueryMindConfig, StoreBackend};
pub use error::{QueryMindError, Result};
pub use intent::{IntentLabel, IntentScores, IntentSource};
pub use querymind_client::QueryMindClient;
