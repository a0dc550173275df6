use super::types::{ClassifySummary, IngestSummary};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Events published by the pipelines.
///
/// This is the observer abstraction that replaces the original event-socket
/// transport; hosts may bridge it to callbacks, channels or a pub/sub
/// socket. The serialized tag matches the original event names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    IndexingStatus { message: String },
    NewImageFound { path: String, status: String },
    IndexingComplete { summary: IngestSummary },
    ClassificationStatus { message: String },
    ClassificationComplete { summary: ClassifySummary },
    Error { message: String },
}

/// Observer interface for pipeline progress.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Forwards events into an unbounded tokio channel.
///
/// Dropped receivers are tolerated: a pipeline never fails because nobody
/// is listening.
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Cooperative cancellation flag checked between pipeline items.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
