//! Asynchronous trace loading with supersession.
//!
//! Fetching is the only asynchronous boundary. Each request gets a fresh
//! [`LoadTicket`]; starting a new request aborts the task serving the
//! previous one, and any outcome that still slips through carries a stale
//! ticket the view drops.

use crate::core::{Result, TraceDocument};
use crate::source::{EvaluationHandle, TraceSource};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identifies one load request. Later requests have larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub(crate) u64);

/// Result of one fetch, tagged with the request it answers.
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub handle: EvaluationHandle,
    pub result: Result<Option<TraceDocument>>,
}

/// Spawns fetches against a [`TraceSource`] and reports them on a channel.
pub struct TraceLoader {
    source: Arc<dyn TraceSource>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<LoadOutcome>,
}

impl TraceLoader {
    /// Create a loader and the receiver its outcomes arrive on.
    pub fn new(source: Arc<dyn TraceSource>) -> (Self, mpsc::UnboundedReceiver<LoadOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Self {
            source,
            generation: 0,
            in_flight: None,
            tx,
        };
        (loader, rx)
    }

    pub fn source(&self) -> &Arc<dyn TraceSource> {
        &self.source
    }

    /// Ticket of the most recent request
    pub fn current(&self) -> Option<LoadTicket> {
        (self.generation > 0).then_some(LoadTicket(self.generation))
    }

    /// Fetch `handle`, superseding whatever was in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&mut self, handle: EvaluationHandle) -> LoadTicket {
        self.cancel();
        self.generation += 1;
        let ticket = LoadTicket(self.generation);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tracing::debug!(handle = %handle, ticket = ticket.0, "Requesting trace");
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch_trace(&handle).await;
            if tx
                .send(LoadOutcome {
                    ticket,
                    handle,
                    result,
                })
                .is_err()
            {
                tracing::debug!("Trace outcome dropped, view is gone");
            }
        }));
        ticket
    }

    /// Abort the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.in_flight.take() {
            if !task.is_finished() {
                tracing::debug!(ticket = self.generation, "Aborting superseded trace load");
                task.abort();
            }
        }
    }
}

impl Drop for TraceLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers "slow" after a long delay and everything else at once.
    struct DelayedSource;

    #[async_trait]
    impl TraceSource for DelayedSource {
        async fn list(&self) -> Result<Vec<EvaluationHandle>> {
            Ok(vec![EvaluationHandle::new("slow"), EvaluationHandle::new("fast")])
        }

        async fn fetch_trace(&self, handle: &EvaluationHandle) -> Result<Option<TraceDocument>> {
            if handle.as_str() == "slow" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(Some(TraceDocument {
                span_id: Some(handle.to_string()),
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn test_superseded_request_never_reports() {
        let (mut loader, mut rx) = TraceLoader::new(Arc::new(DelayedSource));
        let first = loader.request(EvaluationHandle::new("slow"));
        let second = loader.request(EvaluationHandle::new("fast"));
        assert!(second > first);
        assert_eq!(loader.current(), Some(second));

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.ticket, second);
        assert_eq!(outcome.handle.as_str(), "fast");

        // The aborted slow fetch never shows up
        let late = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(late.is_err());
    }
}
