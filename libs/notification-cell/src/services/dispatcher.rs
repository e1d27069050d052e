use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::{Delivery, NotificationError};

/// Receives every delivery failure. Dispatch never retries.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, task: &str, error: &NotificationError);
}

/// Default observer: a `warn!` per failure.
pub struct TracingFailureObserver;

impl FailureObserver for TracingFailureObserver {
    fn on_failure(&self, task: &str, error: &NotificationError) {
        warn!("Notification task '{}' failed: {}", task, error);
    }
}

/// Runs deliveries as detached tasks so the caller's response never waits on a provider.
#[derive(Clone)]
pub struct NotificationDispatcher {
    observer: Arc<dyn FailureObserver>,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(TracingFailureObserver))
    }
}

impl NotificationDispatcher {
    pub fn new(observer: Arc<dyn FailureObserver>) -> Self {
        Self { observer }
    }

    /// Spawns `delivery`. The handle is only useful to tests; production callers drop it.
    pub fn dispatch<F>(&self, task: &'static str, delivery: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<Delivery, NotificationError>> + Send + 'static,
    {
        let observer = self.observer.clone();

        tokio::spawn(async move {
            match delivery.await {
                Ok(outcome) => debug!("Notification task '{}' finished: {:?}", task, outcome),
                Err(e) => observer.on_failure(task, &e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        failures: Mutex<Vec<String>>,
    }

    impl FailureObserver for RecordingObserver {
        fn on_failure(&self, task: &str, _error: &NotificationError) {
            self.failures.lock().unwrap().push(task.to_string());
        }
    }

    #[tokio::test]
    async fn failures_reach_the_observer() {
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = NotificationDispatcher::new(observer.clone());

        let ok = dispatcher.dispatch("doctor_email", async { Ok(Delivery::Sent) });
        let failed = dispatcher.dispatch("patient_sms", async {
            Err(NotificationError::Provider {
                status: 500,
                message: "down".to_string(),
            })
        });
        ok.await.unwrap();
        failed.await.unwrap();

        assert_eq!(*observer.failures.lock().unwrap(), vec!["patient_sms".to_string()]);
    }

    #[tokio::test]
    async fn non_deliveries_are_not_failures() {
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = NotificationDispatcher::new(observer.clone());

        dispatcher
            .dispatch("calendar", async { Ok(Delivery::NotConnected) })
            .await
            .unwrap();

        assert!(observer.failures.lock().unwrap().is_empty());
    }
}
