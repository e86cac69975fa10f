//! Caller-facing message stream.

use tokio::sync::mpsc;

use recap_models::StreamMessage;

use crate::error::{PipelineError, PipelineResult};

/// Bounded sender of stream messages to one caller.
///
/// A full channel applies backpressure to the job; a closed channel means
/// the caller went away.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<StreamMessage>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<StreamMessage>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver that drains it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, message: StreamMessage) -> PipelineResult<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| PipelineError::ClientDisconnected)
    }

    pub async fn progress(&self, text: impl Into<String>) -> PipelineResult<()> {
        self.send(StreamMessage::progress(text)).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the receiving side is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (sink, rx) = ProgressSink::channel(4);
        sink.progress("Visiting profile").await.unwrap();
        drop(rx);

        assert!(sink.is_closed());
        assert!(sink.progress("Getting stories").await.unwrap_err().is_disconnected());
        sink.closed().await;
    }
}
