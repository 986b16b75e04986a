//! Progress event delivery.

use tokio::sync::mpsc;

use incident_lens_core::PipelineEvent;

/// Optional sink for pipeline progress. Sending never blocks and a dropped
/// receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every event.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sink plus the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            tracing::trace!(kind = event.kind(), "emitting pipeline event");
            let _ = tx.send(event);
        }
    }
}
