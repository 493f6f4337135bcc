

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::QueryMindConfig;


#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scorer call timed out after {0}s")]
    Timeout(u64),

    #[error("Model is loading, retry later: {0}")]
    ModelLoading(String),

    #[error("Invalid scorer response: {0}")]
    InvalidResponse(String),

    #[error("Scorer not initialized")]
    NotInitialized,
}

impl ScorerError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::ModelLoading(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}


/// (text, candidate phrase, hypothesis template) to a relevance score in [0, 1].
#[async_trait]
pub trait ZeroShotScorer: Send + Sync {
    /// Scores every phrase against `text` under one template. The result is
    /// aligned with `phrases`.
    async fn score_batch(
        &self,
        text: &str,
        phrases: &[&str],
        template: &str,
    ) -> Result<Vec<f64>, ScorerError>;

    /// Loads the model ahead of the first real request.
    async fn warm_up(&self) -> Result<(), ScorerError> {
        Ok(())
    }

    fn name(&self) -> &str;
}


#[derive(Serialize)]
struct ClassificationRequest<'a> {
    inputs: &'a str,
    parameters: ClassificationParameters<'a>,
    options: RequestOptions,
}

#[derive(Serialize)]
struct ClassificationParameters<'a> {
    candidate_labels: &'a [&'a str],
    hypothesis_template: &'a str,
    multi_label: bool,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
struct ClassificationResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}


/// Hugging Face inference endpoint running a zero-shot-classification pipeline.
pub struct HuggingFaceZeroShotScorer {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    multi_label: bool,
    timeout_secs: u64,
    client: Client,
}

impl HuggingFaceZeroShotScorer {

    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        multi_label: bool,
        timeout_secs: u64,
    ) -> Result<Self, ScorerError> {
        let model = model.into();
        let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), model);
        info!("Zero-shot scorer configured: {}", endpoint);

        Ok(Self {
            endpoint,
            model,
            api_key,
            multi_label,
            timeout_secs,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
        })
    }


    pub fn from_config(config: &QueryMindConfig) -> Result<Self, ScorerError> {
        Self::new(
            &config.zero_shot_url,
            config.zero_shot_model.clone(),
            config.zero_shot_api_key.clone(),
            config.zero_shot_multi_label,
            config.zero_shot_timeout_secs,
        )
    }


    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Puts the pipeline's score-sorted output back into `phrases` order.
fn align_scores(
    phrases: &[&str],
    response: ClassificationResponse,
) -> Result<Vec<f64>, ScorerError> {
    if response.labels.len() != response.scores.len() {
        return Err(ScorerError::InvalidResponse(format!(
            "{} labels but {} scores",
            response.labels.len(),
            response.scores.len()
        )));
    }

    let by_label: HashMap<String, f64> = response.labels.into_iter().zip(response.scores).collect();

    phrases
        .iter()
        .map(|phrase| {
            by_label.get(*phrase).copied().ok_or_else(|| {
                ScorerError::InvalidResponse(format!("no score for candidate '{}'", phrase))
            })
        })
        .collect()
}

#[async_trait]
impl ZeroShotScorer for HuggingFaceZeroShotScorer {
    async fn score_batch(
        &self,
        text: &str,
        phrases: &[&str],
        template: &str,
    ) -> Result<Vec<f64>, ScorerError> {
        let request = ClassificationRequest {
            inputs: text,
            parameters: ClassificationParameters {
                candidate_labels: phrases,
                hypothesis_template: template,
                multi_label: self.multi_label,
            },
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ScorerError::Timeout(self.timeout_secs)
            } else {
                ScorerError::Http(e)
            }
        })?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::ModelLoading(body));
        }

        let parsed: ClassificationResponse = response.error_for_status()?.json().await?;
        debug!("Zero-shot '{}' scored {} candidates", template, parsed.labels.len());
        align_scores(phrases, parsed)
    }

    async fn warm_up(&self) -> Result<(), ScorerError> {
        info!("Warming up zero-shot model {}", self.model);
        self.score_batch("warm up", &["warm up"], "This text is about {}")
            .await
            .map(|_| ())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_scores_restores_phrase_order() {
        let response = ClassificationResponse {
            labels: vec!["find latest developments".into(), "buy or purchase products".into()],
            scores: vec![0.9, 0.1],
        };
        let scores = align_scores(&["buy or purchase products", "find latest developments"], response)
            .unwrap();
        assert_eq!(scores, vec![0.1, 0.9]);
    }

    #[test]
    fn test_align_scores_rejects_missing_candidate() {
        let response = ClassificationResponse {
            labels: vec!["navigate to a website".into()],
            scores: vec![1.0],
        };
        assert!(matches!(
            align_scores(&["navigate to a website", "find precise information"], response),
            Err(ScorerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_align_scores_rejects_length_mismatch() {
        let response = ClassificationResponse {
            labels: vec!["a".into(), "b".into()],
            scores: vec![1.0],
        };
        assert!(align_scores(&["a", "b"], response).is_err());
    }

    #[test]
    fn test_request_shape() {
        let phrases = ["access breaking news"];
        let request = ClassificationRequest {
            inputs: "fed rate decision",
            parameters: ClassificationParameters {
                candidate_labels: &phrases,
                hypothesis_template: "This query is about {}",
                multi_label: false,
            },
            options: RequestOptions { wait_for_model: true },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["parameters"]["candidate_labels"][0], "access breaking news");
        assert_eq!(json["parameters"]["multi_label"], false);
        assert_eq!(json["options"]["wait_for_model"], true);
    }

    #[test]
    fn test_endpoint_and_retryability() {
        let scorer = HuggingFaceZeroShotScorer::from_config(&QueryMindConfig::default()).unwrap();
        assert!(scorer.endpoint().ends_with("/MoritzLaurer/deberta-v3-large-zeroshot-v2.0"));
        assert!(ScorerError::ModelLoading("loading".into()).is_retryable());
        assert!(!ScorerError::InvalidResponse("x".into()).is_retryable());
    }
}
