//! Fan-in channel from pollers to the collector.
//!
//! Bounded by default. When full, the sink either waits for the collector
//! (`OverflowPolicy::Block`) or discards the new event
//! (`OverflowPolicy::DropNewest`). Capacity `0` selects an unbounded channel,
//! which never blocks pollers but grows without limit if the collector stalls.

use tokio::sync::mpsc;
use tracing::warn;

use crate::config::OverflowPolicy;
use crate::error::SinkClosed;
use crate::types::PollEvent;

/// Whether an event made it onto the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The channel was full and the overflow policy discarded the event.
    Dropped,
}

#[derive(Clone)]
enum SinkInner {
    Bounded(mpsc::Sender<PollEvent>),
    Unbounded(mpsc::UnboundedSender<PollEvent>),
}

/// Producer half, cloned once per poller.
#[derive(Clone)]
pub struct ResultSink {
    inner: SinkInner,
    overflow: OverflowPolicy,
}

enum ReceiverInner {
    Bounded(mpsc::Receiver<PollEvent>),
    Unbounded(mpsc::UnboundedReceiver<PollEvent>),
}

/// Consumer half, owned by the collector.
pub struct ResultReceiver {
    inner: ReceiverInner,
}

/// Create a result channel. `capacity == 0` means unbounded.
pub fn result_channel(capacity: usize, overflow: OverflowPolicy) -> (ResultSink, ResultReceiver) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ResultSink {
                inner: SinkInner::Unbounded(tx),
                overflow,
            },
            ResultReceiver {
                inner: ReceiverInner::Unbounded(rx),
            },
        )
    } else {
        let (tx, rx) = mpsc::channel(capacity);
        (
            ResultSink {
                inner: SinkInner::Bounded(tx),
                overflow,
            },
            ResultReceiver {
                inner: ReceiverInner::Bounded(rx),
            },
        )
    }
}

impl ResultSink {
    /// Publish an event, applying the overflow policy if the channel is full.
    pub async fn send(&self, event: PollEvent) -> Result<SendOutcome, SinkClosed> {
        match &self.inner {
            SinkInner::Unbounded(tx) => tx
                .send(event)
                .map(|_| SendOutcome::Delivered)
                .map_err(|_| SinkClosed),
            SinkInner::Bounded(tx) => match self.overflow {
                OverflowPolicy::Block => tx
                    .send(event)
                    .await
                    .map(|_| SendOutcome::Delivered)
                    .map_err(|_| SinkClosed),
                OverflowPolicy::DropNewest => match tx.try_send(event) {
                    Ok(()) => Ok(SendOutcome::Delivered),
                    Err(mpsc::error::TrySendError::Full(event)) => {
                        warn!(endpoint = %event.endpoint().name(), "result channel full, dropping result");
                        Ok(SendOutcome::Dropped)
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => Err(SinkClosed),
                },
            },
        }
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SinkInner::Bounded(tx) => tx.is_closed(),
            SinkInner::Unbounded(tx) => tx.is_closed(),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self.inner, SinkInner::Bounded(_))
    }
}

impl ResultReceiver {
    /// Next event, or `None` once every sink has been dropped.
    pub async fn recv(&mut self) -> Option<PollEvent> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.recv().await,
            ReceiverInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<PollEvent> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.try_recv().ok(),
            ReceiverInner::Unbounded(rx) => rx.try_recv().ok(),
        }
    }
}
