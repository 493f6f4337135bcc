

pub mod client;
pub mod helix_store;
pub mod memory;
pub mod store;

pub use client::HelixClient;
pub use helix_store::HelixGraphStore;
pub use memory::InMemoryGraphStore;
pub use store::{GraphStore, StoreError};
