

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::ensemble::ZeroShotEnsemble;
use super::fusion::IntentSignal;
use crate::core::error::{QueryMindError, Result};
use crate::core::intent::{IntentScores, IntentSource};
use crate::llm::zero_shot::ZeroShotScorer;


type EnsembleInit = Box<dyn Fn() -> BoxFuture<'static, Result<ZeroShotEnsemble>> + Send + Sync>;

enum Slot {
    Empty,
    Ready(Arc<ZeroShotEnsemble>),
    Closed,
}


/// Process-scoped ensemble built on first use.
///
/// The slot lock is held across initialisation, so concurrent first callers
/// wait for one setup instead of racing. A failed setup leaves the slot empty
/// and the next caller tries again.
pub struct LazyEnsemble {
    init: EnsembleInit,
    slot: Mutex<Slot>,
    init_runs: AtomicUsize,
}

impl LazyEnsemble {
    pub fn new<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ZeroShotEnsemble>> + Send + 'static,
    {
        Self {
            init: Box::new(move || Box::pin(init())),
            slot: Mutex::new(Slot::Empty),
            init_runs: AtomicUsize::new(0),
        }
    }

    pub fn with_scorer(scorer: Arc<dyn ZeroShotScorer>) -> Self {
        Self::new(move || ZeroShotEnsemble::initialize(scorer.clone()))
    }

    pub async fn get(&self) -> Result<Arc<ZeroShotEnsemble>> {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Ready(ensemble) => return Ok(ensemble.clone()),
            Slot::Closed => {
                return Err(QueryMindError::Internal(
                    "zero-shot ensemble has been shut down".to_string(),
                ))
            }
            Slot::Empty => {}
        }

        let run = self.init_runs.fetch_add(1, Ordering::SeqCst) + 1;
        let ensemble = match (self.init)().await {
            Ok(ensemble) => Arc::new(ensemble),
            Err(e) => {
                warn!("Zero-shot ensemble initialization failed (run {}): {}", run, e);
                return Err(e);
            }
        };
        info!("Zero-shot ensemble ready ({})", ensemble.scorer_name());

        *slot = Slot::Ready(ensemble.clone());
        Ok(ensemble)
    }

    pub async fn is_initialized(&self) -> bool {
        matches!(&*self.slot.lock().await, Slot::Ready(_))
    }

    /// How many times the initialiser has been started.
    pub fn init_runs(&self) -> usize {
        self.init_runs.load(Ordering::SeqCst)
    }

    /// Drops the ensemble. Later calls fail instead of rebuilding it.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if matches!(&*slot, Slot::Ready(_)) {
            info!("Shutting down zero-shot ensemble");
        }
        *slot = Slot::Closed;
    }
}

#[async_trait]
impl IntentSignal for LazyEnsemble {
    async fn label_scores(&self, query: &str) -> Result<IntentScores> {
        let ensemble = self.get().await?;
        Ok(ensemble.classify(query).await?.all_scores)
    }

    fn source(&self) -> IntentSource {
        IntentSource::ZeroShot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedScorer;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_first_use_initializes_once() {
        let scorer = Arc::new(ScriptedScorer::uniform(0.1));
        let lazy = Arc::new(LazyEnsemble::new({
            let scorer = scorer.clone();
            move || {
                let scorer = scorer.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    ZeroShotEnsemble::initialize(scorer).await
                }
            }
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lazy = lazy.clone();
                tokio::spawn(async move { lazy.get().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(lazy.init_runs(), 1);
        assert_eq!(scorer.warm_ups(), 1);
        assert!(lazy.is_initialized().await);
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let lazy = LazyEnsemble::with_scorer(Arc::new(ScriptedScorer::failing()));
        assert!(lazy.get().await.is_err());
        assert!(lazy.get().await.is_err());
        assert_eq!(lazy.init_runs(), 2);
        assert!(!lazy.is_initialized().await);
    }

    #[tokio::test]
    async fn test_shutdown_closes_the_slot() {
        let lazy = LazyEnsemble::with_scorer(Arc::new(ScriptedScorer::uniform(0.1)));
        lazy.get().await.unwrap();
        lazy.shutdown().await;

        assert!(!lazy.is_initialized().await);
        assert!(matches!(lazy.get().await, Err(QueryMindError::Internal(_))));
        assert_eq!(lazy.init_runs(), 1);
    }

    #[tokio::test]
    async fn test_signal_reports_zero_shot_scores() {
        let lazy = LazyEnsemble::with_scorer(Arc::new(ScriptedScorer::uniform(0.3)));
        let scores = lazy.label_scores("weather in lisbon").await.unwrap();
        assert_eq!(scores.as_array(), &[0.3; 5]);
        assert_eq!(lazy.source(), IntentSource::ZeroShot);
    }
}
