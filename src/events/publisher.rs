//! Event Publisher
//!
//! Queues events on a bounded channel and dispatches them to listeners from a
//! background task, so a slow or failing listener never holds up a request.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{deliver, EventListener, EventSink, RegistryEvent};

// == Event Publisher ==
/// Asynchronous [`EventSink`] that fans events out to listeners.
///
/// Must be started inside a Tokio runtime.
pub struct EventPublisher {
    /// Queue sender; `None` once shut down
    tx: Mutex<Option<mpsc::Sender<RegistryEvent>>>,
    /// Dispatcher task; `None` once shut down
    worker: Mutex<Option<JoinHandle<()>>>,
    listener_count: usize,
}

impl EventPublisher {
    /// Spawns the dispatcher task.
    ///
    /// # Arguments
    /// * `listeners` - Called in order for every event
    /// * `capacity` - Queue size; events beyond it are dropped with a warning
    pub fn start(listeners: Vec<Arc<dyn EventListener>>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let listener_count = listeners.len();

        for listener in &listeners {
            info!(listener = listener.name(), "Registered event listener");
        }

        let worker = tokio::spawn(dispatch_loop(listeners, rx));

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            listener_count,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listener_count
    }

    pub fn is_shutdown(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Stops accepting events and waits up to `grace` for queued ones to drain.
    ///
    /// Idempotent. If the queue has not drained in time the dispatcher is
    /// aborted and the remaining events are lost.
    pub async fn shutdown(&self, grace: Duration) {
        // Dropping the last sender closes the channel; the dispatcher exits
        // once the queue is empty.
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        drop(tx);

        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        info!("Shutting down event publisher...");
        let abort = worker.abort_handle();
        match tokio::time::timeout(grace, worker).await {
            Ok(_) => info!("Event publisher shut down"),
            Err(_) => {
                abort.abort();
                warn!(
                    "Event publisher did not drain within {:?}, pending events dropped",
                    grace
                );
            }
        }
    }
}

// == Event Sink ==
impl EventSink for EventPublisher {
    fn publish(&self, event: RegistryEvent) {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            debug!(kind = event.kind(), "Event publisher is shut down, dropping event");
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    kind = event.kind(),
                    key = event.key(),
                    "Event queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                debug!(kind = event.kind(), "Event queue closed, dropping event");
            }
        }
    }
}

// == Dispatch Loop ==
async fn dispatch_loop(
    listeners: Vec<Arc<dyn EventListener>>,
    mut rx: mpsc::Receiver<RegistryEvent>,
) {
    while let Some(event) = rx.recv().await {
        deliver(&listeners, &event);
    }
    debug!("Event dispatcher exiting");
}
