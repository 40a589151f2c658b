//! Symmetric conversation lookup.
//!
//! Maps an unordered pair of participants to exactly one conversation id.
//! The first resolution of a pair checks the store and creates the
//! conversation when none exists; concurrent first resolutions of the same
//! pair wait on one per-key cell instead of racing to create two.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use dengon_shared::time::Clock;
use tokio::sync::OnceCell;

use crate::{
    config::RetryPolicy,
    domain::{ChatStore, Conversation, ConversationId, ConversationKey, Timestamp, UserId},
};

use super::{error::RoutingError, retry::with_store_retry};

pub struct ConversationIndex {
    store: Arc<dyn ChatStore>,
    clock: Arc<dyn Clock>,
    cells: DashMap<ConversationKey, Arc<OnceCell<ConversationId>>>,
    store_timeout: Duration,
    retry: RetryPolicy,
}

impl ConversationIndex {
    pub fn new(
        store: Arc<dyn ChatStore>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            cells: DashMap::new(),
            store_timeout,
            retry,
        }
    }

    fn cell(&self, key: ConversationKey) -> Arc<OnceCell<ConversationId>> {
        self.cells.entry(key).or_default().clone()
    }

    /// Resolve (creating if needed) the conversation between `sender` and `recipient`.
    ///
    /// Idempotent and symmetric: `resolve(a, b) == resolve(b, a)`. When the
    /// conversation is created, `sender` is recorded as its initiator.
    pub async fn resolve(
        &self,
        sender: &UserId,
        recipient: &UserId,
    ) -> Result<ConversationId, RoutingError> {
        let key = ConversationKey::new(sender.clone(), recipient.clone());
        let cell = self.cell(key);

        let id = cell
            .get_or_try_init(|| async {
                let existing = with_store_retry(
                    "find conversation",
                    self.store_timeout,
                    &self.retry,
                    || self.store.find_conversation(sender, recipient),
                )
                .await?;
                if let Some(conversation) = existing {
                    return Ok(conversation.id);
                }

                let conversation = Conversation::start(
                    sender.clone(),
                    recipient.clone(),
                    Timestamp::new(self.clock.now_millis()),
                );
                let id = conversation.id;
                with_store_retry(
                    "save conversation",
                    self.store_timeout,
                    &self.retry,
                    || self.store.save_conversation(conversation.clone()),
                )
                .await?;
                tracing::info!(
                    "Conversation {} created between '{}' and '{}'",
                    id,
                    sender,
                    recipient
                );
                Ok::<_, RoutingError>(id)
            })
            .await?;

        Ok(*id)
    }

    /// Read-only symmetric lookup. Fails with [`RoutingError::NotFound`].
    pub async fn lookup(&self, a: &UserId, b: &UserId) -> Result<Conversation, RoutingError> {
        let conversation = with_store_retry(
            "find conversation",
            self.store_timeout,
            &self.retry,
            || self.store.find_conversation(a, b),
        )
        .await?
        .ok_or(RoutingError::NotFound)?;

        let _ = self.cell(conversation.key.clone()).set(conversation.id);
        Ok(conversation)
    }

    /// Read-only directed lookup: matches only conversations `sender` started
    /// with `recipient`.
    pub async fn lookup_directed(
        &self,
        sender: &UserId,
        recipient: &UserId,
    ) -> Result<Conversation, RoutingError> {
        with_store_retry(
            "find conversation by sender and recipient",
            self.store_timeout,
            &self.retry,
            || {
                self.store
                    .find_conversation_by_sender_and_recipient(sender, recipient)
            },
        )
        .await?
        .ok_or(RoutingError::NotFound)
    }

    /// Record activity on a conversation
    pub async fn touch(&self, id: ConversationId, at: Timestamp) -> Result<(), RoutingError> {
        with_store_retry(
            "touch conversation",
            self.store_timeout,
            &self.retry,
            || self.store.touch_conversation(id, at),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MockChatStore, StoreError},
        infrastructure::store::InMemoryChatStore,
    };
    use dengon_shared::time::FixedClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn index_with(store: Arc<dyn ChatStore>) -> ConversationIndex {
        ConversationIndex::new(
            store,
            Arc::new(FixedClock::new(1000)),
            Duration::from_millis(200),
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(2),
                multiplier: 2.0,
            },
        )
    }

    #[tokio::test]
    async fn test_resolve_is_symmetric() {
        // テスト項目: resolve(A, B) と resolve(B, A) は同じ会話 ID を返す
        // given (前提条件):
        let index = index_with(Arc::new(InMemoryChatStore::new()));

        // when (操作):
        let ab = index.resolve(&user("alice"), &user("bob")).await.unwrap();
        let ba = index.resolve(&user("bob"), &user("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(ab, ba);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_and_records_initiator() {
        // テスト項目: 同じ組で 2 回 resolve しても会話は 1 件だけ作成され、開始者が記録される
        // given (前提条件):
        let store = Arc::new(InMemoryChatStore::new());
        let index = index_with(store.clone());

        // when (操作):
        let first = index.resolve(&user("alice"), &user("bob")).await.unwrap();
        let second = index.resolve(&user("alice"), &user("bob")).await.unwrap();

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(store.conversation_count(), 1);
        let conversation = index.lookup(&user("bob"), &user("alice")).await.unwrap();
        assert_eq!(conversation.id, first);
        assert_eq!(conversation.initiator, user("alice"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_resolve_creates_one_conversation() {
        // テスト項目: 同じ組への最初の resolve が並行しても会話は 1 件だけ作成される
        // given (前提条件):
        let store = Arc::new(InMemoryChatStore::new());
        let index = Arc::new(index_with(store.clone()));

        // when (操作):
        let mut tasks = Vec::new();
        for i in 0..16 {
            let index = index.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    index.resolve(&user("alice"), &user("bob")).await
                } else {
                    index.resolve(&user("bob"), &user("alice")).await
                }
            }));
        }
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap());
        }

        // then (期待する結果):
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_reuses_conversation_already_in_store() {
        // テスト項目: ストアに既存の会話があれば新規作成せずにその ID を返す
        // given (前提条件):
        let existing = Conversation::start(user("bob"), user("alice"), Timestamp::new(5));
        let existing_clone = existing.clone();
        let mut store = MockChatStore::new();
        store
            .expect_find_conversation()
            .times(1)
            .returning(move |_, _| Ok(Some(existing_clone.clone())));
        store.expect_save_conversation().never();
        let index = index_with(Arc::new(store));

        // when (操作):
        let id = index.resolve(&user("alice"), &user("bob")).await.unwrap();

        // then (期待する結果):
        assert_eq!(id, existing.id);
    }

    #[tokio::test]
    async fn test_lookup_without_conversation_is_not_found() {
        // テスト項目: 読み取り専用の lookup は会話がなければ NotFound を返す
        // given (前提条件):
        let index = index_with(Arc::new(InMemoryChatStore::new()));

        // when (操作):
        let symmetric = index.lookup(&user("alice"), &user("bob")).await;
        let directed = index.lookup_directed(&user("alice"), &user("bob")).await;

        // then (期待する結果):
        assert_eq!(symmetric, Err(RoutingError::NotFound));
        assert_eq!(directed, Err(RoutingError::NotFound));
    }

    #[tokio::test]
    async fn test_lookup_directed_respects_initiator() {
        // テスト項目: 方向つき lookup は開始者から見た向きでのみ一致する
        // given (前提条件):
        let index = index_with(Arc::new(InMemoryChatStore::new()));
        let id = index.resolve(&user("alice"), &user("bob")).await.unwrap();

        // when (操作):
        let forward = index.lookup_directed(&user("alice"), &user("bob")).await;
        let backward = index.lookup_directed(&user("bob"), &user("alice")).await;

        // then (期待する結果):
        assert_eq!(forward.unwrap().id, id);
        assert_eq!(backward, Err(RoutingError::NotFound));
    }

    #[tokio::test]
    async fn test_failed_creation_is_retried_on_next_resolve() {
        // テスト項目: 作成に失敗した組は次の resolve で再試行される
        // given (前提条件):
        let saves = Arc::new(AtomicUsize::new(0));
        let saves_clone = saves.clone();
        let mut store = MockChatStore::new();
        store.expect_find_conversation().returning(|_, _| Ok(None));
        store.expect_save_conversation().returning(move |_| {
            if saves_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Unavailable("primary down".to_string()))
            } else {
                Ok(())
            }
        });
        let index = index_with(Arc::new(store));

        // when (操作):
        let first = index.resolve(&user("alice"), &user("bob")).await;
        let second = index.resolve(&user("alice"), &user("bob")).await;

        // then (期待する結果):
        assert!(matches!(first, Err(RoutingError::Store { .. })));
        assert!(second.is_ok());
        assert_eq!(saves.load(Ordering::SeqCst), 3);
    }
}
