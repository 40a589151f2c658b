//! Per-connection ordered outbound queue and its drain task.
//!
//! Every connection owns exactly one [`DeliveryQueue`] and one
//! [`DeliveryWriter`]. Producers (the router, notices) push into the queue; the
//! writer pops in FIFO order and transmits through the connection's
//! [`FrameSink`]. Ordering per connection therefore equals enqueue order.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{
    config::BackpressurePolicy,
    domain::{Connection, FrameSink, Message, MessageId},
};

use super::{
    error::RoutingError,
    outbound::{FrameEncoder, Outbound},
};

/// Enqueue refusals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("delivery queue is full")]
    QueueFull,

    #[error("delivery queue is closed")]
    Closed,
}

/// Successful enqueue results
#[derive(Debug, PartialEq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// The oldest item was evicted to make room (drop-oldest policy)
    EvictedOldest(Outbound),
}

struct QueueState {
    items: VecDeque<Outbound>,
    closed: bool,
}

/// Bounded FIFO with an explicit backpressure policy
pub struct DeliveryQueue {
    state: Mutex<QueueState>,
    items_available: Notify,
    space_available: Notify,
    capacity: usize,
    policy: BackpressurePolicy,
    block_timeout: Duration,
}

impl DeliveryQueue {
    pub fn new(capacity: usize, policy: BackpressurePolicy, block_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(64)),
                closed: false,
            }),
            items_available: Notify::new(),
            space_available: Notify::new(),
            capacity: capacity.max(1),
            policy,
            block_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Push an item, applying the configured backpressure policy when full.
    ///
    /// Under [`BackpressurePolicy::Block`] the caller waits at most the block
    /// timeout for space before getting [`EnqueueError::QueueFull`].
    pub async fn enqueue(&self, item: Outbound) -> Result<EnqueueOutcome, EnqueueError> {
        self.push(item, self.policy).await
    }

    /// Push, waiting up to the block timeout for space whatever the policy.
    ///
    /// Used for backlog redelivery, which must neither evict nor skip.
    pub async fn enqueue_waiting(&self, item: Outbound) -> Result<EnqueueOutcome, EnqueueError> {
        self.push(item, BackpressurePolicy::Block).await
    }

    /// Push without ever waiting; a blocking policy behaves like reject.
    pub fn try_enqueue(&self, item: Outbound) -> Result<EnqueueOutcome, EnqueueError> {
        let policy = match self.policy {
            BackpressurePolicy::Block => BackpressurePolicy::Reject,
            other => other,
        };
        let mut state = self.lock();
        self.push_locked(&mut state, item, policy)
            .unwrap_or(Err(EnqueueError::QueueFull))
    }

    async fn push(
        &self,
        item: Outbound,
        policy: BackpressurePolicy,
    ) -> Result<EnqueueOutcome, EnqueueError> {
        let deadline = tokio::time::Instant::now() + self.block_timeout;
        let mut pending = item;

        loop {
            let space = self.space_available.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut state = self.lock();
                match self.push_locked(&mut state, pending, policy) {
                    Ok(result) => return result,
                    Err(item) => pending = item,
                }
            }

            if tokio::time::timeout_at(deadline, space).await.is_err() {
                tracing::debug!("Delivery queue stayed full for {:?}", self.block_timeout);
                return Err(EnqueueError::QueueFull);
            }
        }
    }

    /// Returns `Err(item)` when the caller has to wait for space.
    fn push_locked(
        &self,
        state: &mut QueueState,
        item: Outbound,
        policy: BackpressurePolicy,
    ) -> Result<Result<EnqueueOutcome, EnqueueError>, Outbound> {
        if state.closed {
            return Ok(Err(EnqueueError::Closed));
        }

        if state.items.len() < self.capacity {
            state.items.push_back(item);
            self.items_available.notify_one();
            return Ok(Ok(EnqueueOutcome::Enqueued));
        }

        match policy {
            BackpressurePolicy::Reject => Ok(Err(EnqueueError::QueueFull)),
            BackpressurePolicy::DropOldest => {
                let evicted = state.items.pop_front();
                state.items.push_back(item);
                self.items_available.notify_one();
                Ok(Ok(match evicted {
                    Some(evicted) => EnqueueOutcome::EvictedOldest(evicted),
                    None => EnqueueOutcome::Enqueued,
                }))
            }
            BackpressurePolicy::Block => Err(item),
        }
    }

    /// Pop the next item, waiting until one is available.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn next(&self) -> Option<Outbound> {
        loop {
            let available = self.items_available.notified();
            tokio::pin!(available);
            available.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    self.space_available.notify_one();
                    return Some(item);
                }
            }

            available.await;
        }
    }

    /// Close the queue and hand back everything still queued, in order.
    pub fn close(&self) -> Vec<Outbound> {
        let leftovers = {
            let mut state = self.lock();
            state.closed = true;
            state.items.drain(..).collect()
        };
        self.items_available.notify_waiters();
        self.space_available.notify_waiters();
        leftovers
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receives successful chat deliveries from writers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryListener: Send + Sync {
    async fn on_delivered(&self, message: &Message, connection: &Connection);
}

/// Bounded memory of message ids already sent on one connection
struct RecentIds {
    order: VecDeque<MessageId>,
    seen: HashSet<MessageId>,
    capacity: usize,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            seen: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    fn insert(&mut self, id: MessageId) {
        if !self.seen.insert(id) {
            return;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
    }
}

/// How a writer stopped
#[derive(Debug, Default)]
pub struct WriterExit {
    /// Chat message taken from the queue but not confirmed sent
    pub in_flight: Option<Message>,
    /// Transport failure that ended the writer, if any
    pub error: Option<RoutingError>,
    /// Chat messages successfully sent on this connection
    pub delivered: usize,
}

/// Dedicated drain task of one connection
pub struct DeliveryWriter<S: FrameSink> {
    connection: Connection,
    queue: Arc<DeliveryQueue>,
    cancel: CancellationToken,
    sink: S,
    encoder: Arc<dyn FrameEncoder>,
    listener: Arc<dyn DeliveryListener>,
    send_timeout: Duration,
    recent: RecentIds,
}

enum SendResult {
    Sent,
    Cancelled,
    Failed(RoutingError),
}

impl<S: FrameSink> DeliveryWriter<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection: Connection,
        queue: Arc<DeliveryQueue>,
        cancel: CancellationToken,
        sink: S,
        encoder: Arc<dyn FrameEncoder>,
        listener: Arc<dyn DeliveryListener>,
        send_timeout: Duration,
        dedup_window: usize,
    ) -> Self {
        Self {
            connection,
            queue,
            cancel,
            sink,
            encoder,
            listener,
            send_timeout,
            recent: RecentIds::new(dedup_window),
        }
    }

    /// Drain the queue until cancellation, queue close, or transmit failure.
    pub async fn run(mut self) -> WriterExit {
        let mut exit = WriterExit::default();

        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                item = self.queue.next() => item,
            };
            let Some(item) = item else { break };

            if let Some(message) = item.as_chat()
                && self.recent.contains(&message.id)
            {
                tracing::debug!(
                    "Skipping duplicate message {} on connection {}",
                    message.id,
                    self.connection.id
                );
                continue;
            }

            let frame = match self.encoder.encode(&item) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("Failed to encode outbound frame: {}", e);
                    continue;
                }
            };

            match self.send(frame).await {
                SendResult::Sent => {
                    if let Outbound::Chat(message) = item {
                        self.recent.insert(message.id);
                        exit.delivered += 1;
                        self.listener.on_delivered(&message, &self.connection).await;
                    }
                }
                SendResult::Cancelled => {
                    exit.in_flight = item.into_chat();
                    break;
                }
                SendResult::Failed(error) => {
                    tracing::warn!(
                        "Connection {} of '{}' failed mid-delivery: {}",
                        self.connection.id,
                        self.connection.user_id,
                        error
                    );
                    exit.in_flight = item.into_chat();
                    exit.error = Some(error);
                    break;
                }
            }
        }

        self.sink.close().await;
        tracing::debug!(
            "Writer for connection {} stopped after {} deliveries",
            self.connection.id,
            exit.delivered
        );
        exit
    }

    async fn send(&mut self, frame: String) -> SendResult {
        let send = tokio::time::timeout(self.send_timeout, self.sink.send(frame));
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => SendResult::Cancelled,
            result = send => match result {
                Ok(Ok(())) => SendResult::Sent,
                Ok(Err(e)) => SendResult::Failed(RoutingError::ConnectionLost(e)),
                Err(_) => SendResult::Failed(RoutingError::Timeout {
                    operation: "frame send",
                    attempts: 1,
                }),
            },
        }
    }
}
