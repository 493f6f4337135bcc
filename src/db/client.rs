

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use helix_rs::{HelixDB, HelixDBClient};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::store::StoreError;
use crate::core::config::QueryMindConfig;


const DEFAULT_MAX_RETRIES: u32 = 3;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

const INITIAL_RETRY_DELAY_MS: u64 = 100;

const MAX_RETRY_DELAY_MS: u64 = 10000;


/// Transport-level failures. Matched as whole phrases so query names such as
/// `connectConceptToQuery` never read as connectivity errors.
const CONNECTIVITY_PHRASES: &[&str] = &[
    "error sending request",
    "connection refused",
    "connection reset",
    "connection closed",
    "failed to connect",
    "dns error",
    "broken pipe",
    "timed out",
    "503 service unavailable",
];


/// Sorts a HelixDB failure into the store taxonomy by its message.
fn classify_error(query_name: &str, message: String) -> StoreError {
    let lower = message.to_lowercase();
    if CONNECTIVITY_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        StoreError::Connection(message)
    } else if lower.contains("unique") || lower.contains("duplicate") {
        StoreError::Constraint(message)
    } else {
        StoreError::query(query_name, message)
    }
}


pub struct HelixClient {

    inner: HelixDB,

    is_connected: AtomicBool,

    base_url: String,

    timeout: Duration,

    max_retries: u32,
}

impl HelixClient {

    pub fn new(host: &str, port: u16) -> Self {
        let endpoint = format!("http://{}", host);
        let base_url = format!("http://{}:{}", host, port);

        let inner = <HelixDB as HelixDBClient>::new(Some(&endpoint), Some(port), None);

        info!("HelixClient created for {}", base_url);

        Self {
            inner,
            is_connected: AtomicBool::new(false),
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }


    pub fn from_config(config: &QueryMindConfig) -> Self {
        Self::new(&config.helix_host, config.helix_port)
            .with_timeout(Duration::from_secs(config.store_timeout_secs))
            .with_max_retries(config.store_max_retries)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Runs a named query once, bounded by the client timeout.
    pub async fn execute_query_no_retry<T, P>(
        &self,
        query_name: &str,
        params: &P,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        match tokio::time::timeout(self.timeout, self.inner.query::<P, T>(query_name, params)).await
        {
            Ok(Ok(result)) => {
                self.is_connected.store(true, Ordering::Relaxed);
                Ok(result)
            }
            Ok(Err(e)) => Err(classify_error(query_name, e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Runs a named query, retrying connectivity failures with backoff.
    /// Only for idempotent queries.
    pub async fn execute_query<T, P>(&self, query_name: &str, params: &P) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        let mut last_error = None;
        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 1..=self.max_retries {
            debug!("Executing query: {} (attempt {})", query_name, attempt);

            match self.execute_query_no_retry::<T, P>(query_name, params).await {
                Ok(result) => {
                    debug!("Query {} succeeded", query_name);
                    return Ok(result);
                }
                Err(e) if !e.is_retryable() => {
                    debug!("Query {} failed permanently: {}", query_name, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Query {} failed (attempt {}/{}): {}",
                        query_name, attempt, self.max_retries, e
                    );
                    last_error = Some(e.to_string());

                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                    }
                }
            }
        }

        self.is_connected.store(false, Ordering::Relaxed);
        Err(StoreError::RetryExhausted {
            attempts: self.max_retries,
            last_error: last_error.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }


    pub async fn health_check(&self) -> Result<(), StoreError> {
        match self
            .execute_query_no_retry::<serde_json::Value, _>("health", &serde_json::json!({}))
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Query { message, .. })
                if message.contains("404") || message.to_lowercase().contains("not found") =>
            {
                info!("Health check passed (server alive, no health query)");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }


    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed)
    }


    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HelixClient::new("localhost", 6969);
        assert_eq!(client.base_url(), "http://localhost:6969");
        assert!(!client.is_connected());
    }

    #[test]
    fn test_client_from_config() {
        let mut config = QueryMindConfig::default();
        config.helix_host = "graph.internal".to_string();
        config.store_max_retries = 0;
        let client = HelixClient::from_config(&config);
        assert_eq!(client.base_url(), "http://graph.internal:6969");
        assert_eq!(client.max_retries, 1);
    }

    #[test]
    fn test_classify_connectivity_is_retryable() {
        let err = classify_error("upsertQuery", "error sending request for url".to_string());
        assert!(matches!(err, StoreError::Connection(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_bad_query_is_not_retryable() {
        let err = classify_error("upsertQuery", "invalid parameter type for content".to_string());
        assert!(matches!(err, StoreError::Query { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_query_name_containing_connect_is_not_retryable() {
        let err = classify_error(
            "connectConceptToQuery",
            "Query connectConceptToQuery failed: no node matching name".to_string(),
        );
        assert!(matches!(err, StoreError::Query { .. }));
        assert!(!err.is_retryable());

        let err = classify_error("upsertQuery", "client disconnected mid-write".to_string());
        assert!(!matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn test_classify_real_connectivity_phrases() {
        for message in [
            "tcp connect error: Connection refused (os error 111)",
            "connection reset by peer",
            "failed to connect to localhost:6969",
            "operation timed out",
        ] {
            let err = classify_error("upsertQuery", message.to_string());
            assert!(err.is_retryable(), "{} should be retryable", message);
        }
    }

    #[test]
    fn test_classify_unique_violation() {
        let err = classify_error("createConceptForQuery", "UNIQUE index violated on name".to_string());
        assert!(matches!(err, StoreError::Constraint(_)));
    }
}
