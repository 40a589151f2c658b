//! InMemory ChatStore 実装
//!
//! ドメイン層が定義する ChatStore trait の具体的な実装。
//! `DashMap` をインメモリ DB として使用します。プロセスが終了すると内容は失われます。
//!
//! 会話は順序を持たない参加者の組（`ConversationKey`）で一意になり、
//! メッセージは会話ごとに保存順のインデックスを持ち、受信者ごとの
//! インデックスには Pending のメッセージだけが残ります。

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::domain::{
    ChatStore, Conversation, ConversationId, ConversationKey, DeliveryStatus, Message, MessageId,
    StoreError, Timestamp, UserId,
};

/// インメモリ ChatStore 実装
#[derive(Default)]
pub struct InMemoryChatStore {
    conversations: DashMap<ConversationId, Conversation>,
    /// 参加者の組 -> 会話 ID
    by_key: DashMap<ConversationKey, ConversationId>,
    messages: DashMap<MessageId, Message>,
    /// 会話ごとのメッセージ ID（保存順）
    threads: DashMap<ConversationId, Vec<MessageId>>,
    /// 受信者ごとの Pending メッセージ ID（保存順）。終端状態になると外れる
    inboxes: DashMap<UserId, Vec<MessageId>>,
    /// Injected write failures: (error, remaining count)
    write_faults: Mutex<Option<(StoreError, usize)>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Snapshot of a stored message
    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.messages.get(&id).map(|m| m.value().clone())
    }

    /// Make the next `count` write operations fail with `error`.
    ///
    /// Reads are never affected. Used to exercise retry and timeout handling.
    pub fn fail_next_writes(&self, error: StoreError, count: usize) {
        let mut faults = self.write_faults.lock().unwrap_or_else(|e| e.into_inner());
        *faults = (count > 0).then_some((error, count));
    }

    fn check_write(&self) -> Result<(), StoreError> {
        let mut faults = self.write_faults.lock().unwrap_or_else(|e| e.into_inner());
        let Some((error, remaining)) = faults.as_mut() else {
            return Ok(());
        };
        let error = error.clone();
        *remaining -= 1;
        if *remaining == 0 {
            *faults = None;
        }
        Err(error)
    }

    fn collect(&self, ids: &[MessageId], keep: impl Fn(&Message) -> bool) -> Vec<Message> {
        ids.iter()
            .filter_map(|id| self.messages.get(id).map(|m| m.value().clone()))
            .filter(|m| keep(m))
            .collect()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn save_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        self.check_write()?;

        match self.by_key.entry(conversation.key.clone()) {
            Entry::Occupied(entry) if *entry.get() != conversation.id => {
                // 同じ組の会話がすでにある場合は既存のものを残す
                tracing::warn!(
                    "Conversation for {} already exists as {}, ignoring {}",
                    conversation.key,
                    entry.get(),
                    conversation.id
                );
                return Ok(());
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(conversation.id);
            }
        }
        self.conversations.insert(conversation.id, conversation);
        Ok(())
    }

    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, StoreError> {
        let key = ConversationKey::new(a.clone(), b.clone());
        Ok(self
            .by_key
            .get(&key)
            .and_then(|id| self.conversations.get(id.value()).map(|c| c.value().clone())))
    }

    async fn find_conversation_by_sender_and_recipient(
        &self,
        sender: &UserId,
        recipient: &UserId,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .find_conversation(sender, recipient)
            .await?
            .filter(|c| c.is_directed(sender, recipient)))
    }

    async fn touch_conversation(
        &self,
        id: ConversationId,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        self.check_write()?;

        match self.conversations.get_mut(&id) {
            Some(mut conversation) => conversation.touch(at),
            None => tracing::debug!("Touch on unknown conversation {}", id),
        }
        Ok(())
    }

    async fn save_message(&self, message: Message) -> Result<(), StoreError> {
        self.check_write()?;

        let id = message.id;
        let conversation_id = message.conversation_id;
        let recipient = message.recipient_id.clone();
        if self.messages.insert(id, message).is_none() {
            self.threads.entry(conversation_id).or_default().push(id);
            self.inboxes.entry(recipient).or_default().push(id);
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: MessageId,
        to: DeliveryStatus,
    ) -> Result<bool, StoreError> {
        self.check_write()?;

        let recipient = {
            let mut message = self
                .messages
                .get_mut(&id)
                .ok_or(StoreError::MessageNotFound(id))?;
            if message.transition_to(to).is_err() {
                return Ok(false);
            }
            message.recipient_id.clone()
        };

        if to.is_terminal()
            && let Entry::Occupied(mut inbox) = self.inboxes.entry(recipient)
        {
            inbox.get_mut().retain(|pending| *pending != id);
            if inbox.get().is_empty() {
                inbox.remove();
            }
        }
        Ok(true)
    }

    async fn pending_for_recipient(&self, recipient: &UserId) -> Result<Vec<Message>, StoreError> {
        let ids = self
            .inboxes
            .get(recipient)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        Ok(self.collect(&ids, |m| m.status == DeliveryStatus::Pending))
    }

    async fn conversation_history(&self, id: ConversationId) -> Result<Vec<Message>, StoreError> {
        let ids = self
            .threads
            .get(&id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        Ok(self.collect(&ids, |_| true))
    }
}
