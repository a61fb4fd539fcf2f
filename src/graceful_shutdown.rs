use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Coordinates an orderly shutdown of every long-running component (UDP/TCP
/// listeners, the health checker's periodic sweep): broadcast the stop
/// signal, give in-flight request tasks a moment to finish on their own,
/// then run each component's registered teardown with a bounded timeout.
///
/// Grounded on teacher's shutdown coordinator of the same shape; trimmed of
/// its cache-persistence step since persistent cache across restarts is out
/// of scope here (spec.md §1).
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<()>,
    components: Arc<Mutex<Vec<ShutdownComponent>>>,
}

type ShutdownResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type ShutdownFn = Box<dyn Fn() -> tokio::task::JoinHandle<ShutdownResult> + Send + Sync>;

struct ShutdownComponent {
    name: String,
    shutdown_fn: ShutdownFn,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            components: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A shutdown receiver for a long-running task to select! against.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Registers a teardown to run once shutdown is initiated.
    pub async fn register_component<F, Fut>(&self, name: String, shutdown_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ShutdownResult> + Send + 'static,
    {
        let component = ShutdownComponent {
            name,
            shutdown_fn: Box::new(move || {
                let fut = shutdown_fn();
                tokio::spawn(fut)
            }),
        };
        self.components.lock().await.push(component);
    }

    pub async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("initiating graceful shutdown");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("failed to send shutdown signal: {e}");
        }

        info!("waiting for in-flight requests to drain");
        tokio::time::sleep(Duration::from_millis(500)).await;

        let components = self.components.lock().await;
        let mut handles = Vec::new();
        for component in components.iter() {
            info!("shutting down component: {}", component.name);
            let handle = (component.shutdown_fn)();
            handles.push((component.name.clone(), handle));
        }
        drop(components);

        for (name, handle) in handles {
            match timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(Ok(()))) => info!("component '{name}' shut down cleanly"),
                Ok(Ok(Err(e))) => error!("component '{name}' shutdown failed: {e}"),
                Ok(Err(e)) => error!("component '{name}' shutdown task panicked: {e}"),
                Err(_) => warn!("component '{name}' shutdown timed out"),
            }
        }

        info!("graceful shutdown complete");
        Ok(())
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn runs_registered_components_on_shutdown() {
        let coordinator = GracefulShutdown::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        coordinator
            .register_component("test".into(), move || {
                let ran = ran_clone.clone();
                async move {
                    ran.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        coordinator.shutdown().await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn broadcasts_the_shutdown_signal_to_subscribers() {
        let coordinator = GracefulShutdown::new();
        let mut rx = coordinator.subscribe();
        coordinator.shutdown().await.unwrap();
        assert!(rx.try_recv().is_ok());
    }
}
