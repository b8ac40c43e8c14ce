//! Bounded message queue with backpressure.
//!
//! # Responsibilities
//! - Non-blocking enqueue for producers (full → immediate rejection)
//! - Shared dequeue for N workers
//! - Close-and-drain during shutdown

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

use crate::pipeline::message::Message;

/// Why a push was refused. The message is handed back.
#[derive(Debug)]
pub enum PushError {
    Full(Message),
    Closed(Message),
}

/// A bounded FIFO shared by many producers and many workers.
///
/// A capacity of zero rejects every push.
#[derive(Debug)]
pub struct MessageQueue {
    tx: mpsc::Sender<Message>,
    rx: QueueReceiver,
    capacity: usize,
}

impl MessageQueue {
    /// Create a queue holding at most `capacity` messages.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: QueueReceiver {
                inner: Arc::new(Mutex::new(rx)),
            },
            capacity,
        }
    }

    /// Enqueue without waiting.
    pub fn try_push(&self, message: Message) -> Result<(), PushError> {
        if self.capacity == 0 {
            return Err(PushError::Full(message));
        }

        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(m) => PushError::Full(m),
            TrySendError::Closed(m) => PushError::Closed(m),
        })
    }

    /// Handle for workers to dequeue from.
    pub fn receiver(&self) -> QueueReceiver {
        self.rx.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages currently buffered.
    pub fn len(&self) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the queue and drop whatever is still buffered.
    ///
    /// Returns the number of discarded messages. Safe to call repeatedly.
    pub async fn close(&self) -> usize {
        let mut rx = self.rx.inner.lock().await;
        rx.close();

        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

/// Shared consuming end of a [`MessageQueue`].
#[derive(Debug, Clone)]
pub struct QueueReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Message>>>,
}

impl QueueReceiver {
    /// Wait for the next message; `None` once the queue is closed and empty.
    ///
    /// Cancel safe: dropping the future never loses a message.
    pub async fn recv(&self) -> Option<Message> {
        self.inner.lock().await.recv().await
    }
}
