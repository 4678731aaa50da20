//! Streaming event emission for the Coordinator.
//!
//! A single async trait with a default no-op method, shared as
//! `Arc<dyn EventHandler>` so the same handler instance can be cloned
//! cheaply across the `tokio::spawn`-ed agent tasks a
//! [`crate::core::coordinator::Coordinator`] run fans out to. Every event is
//! dispatched as the single [`crate::core::types::StreamEvent`] union —
//! callers that want an HTTP/SSE transport implement [`EventHandler`] and
//! forward each event over the wire; callers that don't care can rely on the
//! default no-op.

use crate::core::types::StreamEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives every [`StreamEvent`] emitted during one coordinator run.
///
/// Implementations must be cheap and non-blocking: the coordinator awaits
/// `on_event` inline between pipeline stages, so a slow handler directly
/// adds to response latency.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, _event: StreamEvent) {}
}

/// No-op handler used when a caller has no interest in the stream (e.g. the
/// non-streaming request/response API surface).
pub struct NullEventHandler;

#[async_trait]
impl EventHandler for NullEventHandler {
    async fn on_event(&self, _event: StreamEvent) {}
}

/// Collects every emitted event in order. Used by tests and by callers that
/// want to buffer a full run before replaying it (e.g. to a client that
/// connected after the run started).
#[derive(Default)]
pub struct CollectingEventHandler {
    events: tokio::sync::Mutex<Vec<StreamEvent>>,
}

impl CollectingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventHandler for CollectingEventHandler {
    async fn on_event(&self, event: StreamEvent) {
        self.events.lock().await.push(event);
    }
}

/// Monotonic sequence-number generator shared across one coordinator run,
/// so every [`StreamEvent`] variant carries a strictly increasing `seq`
/// regardless of which concurrently-spawned agent task emits it.
#[derive(Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Bundles a handler with its run's [`SequenceCounter`] so spawned agent
/// tasks can emit events without threading both separately. Cheap to clone
/// (two `Arc`s) — one clone per `tokio::spawn`-ed task.
#[derive(Clone)]
pub struct EventSink {
    handler: Arc<dyn EventHandler>,
    seq: Arc<SequenceCounter>,
}

impl EventSink {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        EventSink {
            handler,
            seq: Arc::new(SequenceCounter::new()),
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.seq.next()
    }

    pub async fn emit(&self, event: StreamEvent) {
        self.handler.on_event(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counter_is_monotonic() {
        let counter = SequenceCounter::new();
        let a = counter.next();
        let b = counter.next();
        let c = counter.next();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn collecting_handler_preserves_order() {
        let handler = CollectingEventHandler::new();
        let counter = SequenceCounter::new();
        handler
            .on_event(StreamEvent::Progress {
                seq: counter.next(),
                progress: 0.1,
                message: "starting".into(),
                timestamp: chrono::Utc::now(),
            })
            .await;
        handler
            .on_event(StreamEvent::Progress {
                seq: counter.next(),
                progress: 0.5,
                message: "midway".into(),
                timestamp: chrono::Utc::now(),
            })
            .await;
        let events = handler.events().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn sink_clones_share_one_sequence() {
        let handler = Arc::new(CollectingEventHandler::new());
        let sink = EventSink::new(handler.clone());
        let other = sink.clone();
        let a = sink.next_seq();
        let b = other.next_seq();
        let c = sink.next_seq();
        assert_eq!((a, b, c), (0, 1, 2));
    }
}
