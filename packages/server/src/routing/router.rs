//! Message dispatch, connection attach/detach and redelivery.

use std::sync::Arc;

use async_trait::async_trait;
use dengon_shared::time::Clock;

use crate::{
    config::{OfflinePolicy, RoutingConfig},
    domain::{
        ChatStore, Connection, ConversationId, DeliveryStatus, FrameSink, Message, MessageId,
        Payload, Timestamp, UserId, ValueObjectError,
    },
};

use super::{
    conversation_index::ConversationIndex,
    delivery_queue::{DeliveryListener, DeliveryQueue, DeliveryWriter, EnqueueError, EnqueueOutcome},
    error::RoutingError,
    outbound::{FrameEncoder, Notice, Outbound},
    registry::{ConnectionHandle, ConnectionRegistry, RegistrationToken},
    retry::with_store_retry,
};

/// Why a dispatched message ended up failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    OfflineRecipient,
}

/// What happened to a dispatched message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Accepted by this many of the recipient's connection queues
    Queued { connections: usize },
    /// Recipient offline; kept pending for redelivery on reconnect
    OfflinePending,
    /// Terminally failed
    Failed(FailureReason),
}

/// Structured result of [`Router::dispatch`], reported back to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub server_timestamp: Timestamp,
    pub outcome: DispatchOutcome,
}

impl DispatchReceipt {
    /// Status of the message record right after dispatch
    pub fn status(&self) -> DeliveryStatus {
        match self.outcome {
            DispatchOutcome::Failed(_) => DeliveryStatus::Failed,
            _ => DeliveryStatus::Pending,
        }
    }
}

/// A freshly attached connection
#[derive(Debug)]
pub struct Attachment {
    pub token: RegistrationToken,
    pub handle: ConnectionHandle,
}

/// Routes messages from senders to the live connections of recipients.
pub struct Router {
    registry: Arc<ConnectionRegistry>,
    index: Arc<ConversationIndex>,
    store: Arc<dyn ChatStore>,
    encoder: Arc<dyn FrameEncoder>,
    clock: Arc<dyn Clock>,
    config: RoutingConfig,
}

impl Router {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        index: Arc<ConversationIndex>,
        store: Arc<dyn ChatStore>,
        encoder: Arc<dyn FrameEncoder>,
        clock: Arc<dyn Clock>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            registry,
            index,
            store,
            encoder,
            clock,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn index(&self) -> &Arc<ConversationIndex> {
        &self.index
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Route one message from `sender` to `recipient`.
    ///
    /// Validation failures and store failures are errors; an offline recipient
    /// is a normal outcome governed by the offline policy.
    pub async fn dispatch(
        &self,
        sender: &UserId,
        recipient: &str,
        payload: &str,
    ) -> Result<DispatchReceipt, RoutingError> {
        let recipient = UserId::new(recipient)?;
        let payload = Payload::new(payload)?;
        if &recipient == sender {
            return Err(ValueObjectError::SelfAddressed.into());
        }

        let conversation_id = self.index.resolve(sender, &recipient).await?;
        let mut message = Message::new(
            conversation_id,
            sender.clone(),
            recipient.clone(),
            payload,
            self.now(),
        );
        self.persist(&message).await?;
        if let Err(e) = self
            .index
            .touch(conversation_id, message.server_timestamp)
            .await
        {
            tracing::warn!("Failed to touch conversation {}: {}", conversation_id, e);
        }

        let connections = self.enqueue_to_user(&recipient, &message).await;
        let outcome = if connections > 0 {
            DispatchOutcome::Queued { connections }
        } else {
            self.apply_offline_policy(&mut message).await?
        };

        tracing::info!(
            "Message {} from '{}' to '{}': {:?}",
            message.id,
            sender,
            recipient,
            outcome
        );

        Ok(DispatchReceipt {
            message_id: message.id,
            conversation_id,
            server_timestamp: message.server_timestamp,
            outcome,
        })
    }

    async fn persist(&self, message: &Message) -> Result<(), RoutingError> {
        with_store_retry(
            "save message",
            self.config.store_timeout,
            &self.config.retry,
            || self.store.save_message(message.clone()),
        )
        .await
    }

    async fn apply_offline_policy(
        &self,
        message: &mut Message,
    ) -> Result<DispatchOutcome, RoutingError> {
        match self.config.offline_policy {
            OfflinePolicy::PersistAndRetry => Ok(DispatchOutcome::OfflinePending),
            OfflinePolicy::Fail => {
                self.transition(message.id, DeliveryStatus::Failed).await?;
                message.status = DeliveryStatus::Failed;
                Ok(DispatchOutcome::Failed(FailureReason::OfflineRecipient))
            }
        }
    }

    async fn transition(&self, id: MessageId, to: DeliveryStatus) -> Result<bool, RoutingError> {
        with_store_retry(
            "transition status",
            self.config.store_timeout,
            &self.config.retry,
            || self.store.transition_status(id, to),
        )
        .await
    }

    /// Enqueue `message` to every live connection of `user`; returns how many accepted it.
    ///
    /// Runs under the user's delivery gate, after the message is persisted, so
    /// a connection still loading its backlog either picks the message up from
    /// the store or is live by the time the gate opens.
    async fn enqueue_to_user(&self, user: &UserId, message: &Message) -> usize {
        let _gate = self.registry.lock_delivery(user).await;
        let mut accepted = 0;
        for handle in self.registry.lookup_live(user) {
            if self.enqueue_to(&handle, message).await {
                accepted += 1;
            }
        }
        accepted
    }

    /// Queue a live chat message to one connection.
    ///
    /// A connection that cannot take the message in order (its queue is full,
    /// or a chat message was evicted to make room) is retired: later messages
    /// must not overtake the one it missed, so it reconnects and catches up
    /// from the store instead.
    async fn enqueue_to(&self, handle: &ConnectionHandle, message: &Message) -> bool {
        match handle.queue.enqueue(Outbound::Chat(message.clone())).await {
            Ok(EnqueueOutcome::Enqueued) => true,
            Ok(EnqueueOutcome::EvictedOldest(evicted)) => match evicted.into_chat() {
                None => true,
                Some(evicted) => {
                    tracing::warn!(
                        "Queue of connection {} full, evicted message {}; retiring the connection",
                        handle.id(),
                        evicted.id
                    );
                    handle.retire();
                    false
                }
            },
            Err(EnqueueError::QueueFull) => {
                tracing::warn!(
                    "Connection {} of '{}' fell behind at message {}; retiring the connection",
                    handle.id(),
                    handle.user_id(),
                    message.id
                );
                handle.retire();
                false
            }
            Err(EnqueueError::Closed) => false,
        }
    }

    /// Register a new connection for `user`.
    ///
    /// The connection takes no chat messages until [`Router::redeliver_pending`]
    /// has greeted it and queued its backlog.
    pub fn attach(&self, user: UserId) -> Attachment {
        let connection = Connection::new(user, self.now());
        let queue = DeliveryQueue::new(
            self.config.queue_capacity,
            self.config.backpressure,
            self.config.transport_timeout,
        );
        let handle = ConnectionHandle::new(connection, queue);
        let token = self.registry.register(handle.clone());

        tracing::info!(
            "User '{}' attached connection {}",
            handle.user_id(),
            handle.id()
        );
        Attachment { token, handle }
    }

    /// Build the drain task of an attached connection.
    pub fn writer<S: FrameSink>(
        self: &Arc<Self>,
        handle: &ConnectionHandle,
        sink: S,
    ) -> DeliveryWriter<S> {
        DeliveryWriter::new(
            handle.connection.clone(),
            handle.queue.clone(),
            handle.cancel.clone(),
            sink,
            self.encoder.clone(),
            self.clone(),
            self.config.transport_timeout,
            self.config.dedup_window,
        )
    }

    /// Queue the welcome notice and every pending message addressed to the
    /// connection's user, then open the connection to live chat messages.
    ///
    /// Runs under the user's delivery gate, so no live message can overtake
    /// the backlog, and a message sent after the client saw its welcome waits
    /// until the connection is live. The connection's writer must already be
    /// running: the backlog waits for queue space instead of applying the
    /// backpressure policy. A connection that cannot take its whole backlog
    /// is retired and the rest stays pending. Returns how many messages were
    /// queued.
    pub async fn redeliver_pending(&self, handle: &ConnectionHandle) -> usize {
        let _gate = self.registry.lock_delivery(handle.user_id()).await;
        if let Err(e) = handle
            .queue
            .try_enqueue(Outbound::Notice(Notice::Welcome(handle.connection.clone())))
        {
            tracing::warn!("Could not queue welcome for {}: {}", handle.id(), e);
        }

        let pending = match with_store_retry(
            "load pending messages",
            self.config.store_timeout,
            &self.config.retry,
            || self.store.pending_for_recipient(handle.user_id()),
        )
        .await
        {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(
                    "Could not load pending messages for '{}', retiring connection {}: {}",
                    handle.user_id(),
                    handle.id(),
                    e
                );
                handle.retire();
                return 0;
            }
        };

        let mut queued = 0;
        for message in &pending {
            if let Err(e) = handle
                .queue
                .enqueue_waiting(Outbound::Chat(message.clone()))
                .await
            {
                tracing::warn!(
                    "Connection {} took {}/{} pending message(s) before failing ({}); retiring it",
                    handle.id(),
                    queued,
                    pending.len(),
                    e
                );
                handle.retire();
                return queued;
            }
            queued += 1;
        }
        handle.mark_live();

        if queued > 0 {
            tracing::info!(
                "Redelivering {} pending message(s) to '{}' on connection {}",
                queued,
                handle.user_id(),
                handle.id()
            );
        }
        queued
    }

    /// Queue a notice to one connection without waiting.
    pub fn notify(&self, handle: &ConnectionHandle, notice: Notice) {
        if let Err(e) = handle.queue.try_enqueue(Outbound::Notice(notice)) {
            tracing::debug!("Dropped notice for connection {}: {}", handle.id(), e);
        }
    }

    /// Tear a connection down.
    ///
    /// The in-flight message (if any) and leftover chat messages stay pending
    /// in the store and are redelivered, in order, on the next reconnect. The
    /// user's other live connections already queued them, either at dispatch
    /// or from their own backlog, so nothing is requeued here. Returns the
    /// number of undelivered messages the connection left behind.
    pub fn detach(&self, token: &RegistrationToken, in_flight: Option<Message>) -> usize {
        let mut undelivered = usize::from(in_flight.is_some());

        if let Some(handle) = self.registry.unregister(token) {
            handle.retire();
            undelivered += handle
                .queue
                .close()
                .into_iter()
                .filter_map(Outbound::into_chat)
                .count();
        }

        tracing::info!(
            "User '{}' detached connection {} ({} undelivered message(s) left pending)",
            token.user_id(),
            token.connection_id(),
            undelivered
        );
        undelivered
    }

    /// Messages of a conversation, oldest first
    pub async fn history(&self, id: ConversationId) -> Result<Vec<Message>, RoutingError> {
        with_store_retry(
            "load conversation history",
            self.config.store_timeout,
            &self.config.retry,
            || self.store.conversation_history(id),
        )
        .await
    }
}

#[async_trait]
impl DeliveryListener for Router {
    async fn on_delivered(&self, message: &Message, connection: &Connection) {
        match self.transition(message.id, DeliveryStatus::Delivered).await {
            Ok(true) => {
                tracing::debug!(
                    "Message {} delivered on connection {}",
                    message.id,
                    connection.id
                );
                let notice = Notice::Delivered {
                    message_id: message.id,
                    conversation_id: message.conversation_id,
                    recipient_id: message.recipient_id.clone(),
                    delivered_at: self.now(),
                };
                for handle in self.registry.lookup(&message.sender_id) {
                    self.notify(&handle, notice.clone());
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(
                "Could not mark message {} delivered: {}",
                message.id,
                e
            ),
        }
    }
}
