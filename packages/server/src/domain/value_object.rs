//! Value Objects
//!
//! 識別子やメッセージ本文など、生成時に検証されるドメインの値を定義します。
//! 一度生成された値は常に妥当であることが保証されます。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// Maximum length of a user identifier (characters)
pub const MAX_USER_ID_LEN: usize = 64;

/// Maximum length of a message payload (characters)
pub const MAX_PAYLOAD_LEN: usize = 4096;

/// ユーザー識別子
///
/// 空でなく、64 文字以下で、`[A-Za-z0-9_.@-]` のみで構成される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a validated user identifier
    pub fn new(value: impl Into<String>) -> Result<Self, ValueObjectError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValueObjectError::EmptyUserId);
        }
        if value.chars().count() > MAX_USER_ID_LEN {
            return Err(ValueObjectError::UserIdTooLong {
                max: MAX_USER_ID_LEN,
            });
        }
        if let Some(c) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '-')))
        {
            return Err(ValueObjectError::InvalidUserIdChar(c));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// メッセージ本文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Payload(String);

impl Payload {
    /// Create a validated payload. Whitespace-only bodies are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueObjectError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyPayload);
        }
        if value.chars().count() > MAX_PAYLOAD_LEN {
            return Err(ValueObjectError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Payload {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Payload> for String {
    fn from(value: Payload) -> Self {
        value.0
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValueObjectError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| ValueObjectError::InvalidIdentifier(s.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// メッセージ識別子
    MessageId
);
uuid_id!(
    /// 会話識別子
    ConversationId
);
uuid_id!(
    /// 接続識別子（1 セッションごとに発行）
    ConnectionId
);

/// 会話キー
///
/// 参加者 2 名の順序を持たない組。常に辞書順にソートして保持するため、
/// `(A, B)` と `(B, A)` は同じキーになる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    low: UserId,
    high: UserId,
}

impl ConversationKey {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both participants, lexicographically ordered
    pub fn participants(&self) -> (&UserId, &UserId) {
        (&self.low, &self.high)
    }

    pub fn contains(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }

    /// The participant that is not `user`, if `user` belongs to this pair
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.low == user {
            Some(&self.high)
        } else if &self.high == user {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.low, self.high)
    }
}

/// Unix timestamp (milliseconds, UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_user_id_accepts_valid_identifier() {
        // テスト項目: 許可された文字のみの ID は生成できる
        // given (前提条件):
        let raw = "alice.smith-01@example_org";

        // when (操作):
        let result = UserId::new(raw);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), raw);
    }

    #[test]
    fn test_user_id_rejects_malformed_identifiers() {
        // テスト項目: 空文字・長すぎる ID・不正な文字はエラーになる
        // given (前提条件):
        let too_long = "a".repeat(MAX_USER_ID_LEN + 1);

        // when (操作) / then (期待する結果):
        assert_eq!(UserId::new(""), Err(ValueObjectError::EmptyUserId));
        assert_eq!(
            UserId::new(too_long),
            Err(ValueObjectError::UserIdTooLong {
                max: MAX_USER_ID_LEN
            })
        );
        assert_eq!(
            UserId::new("bob smith"),
            Err(ValueObjectError::InvalidUserIdChar(' '))
        );
        assert_eq!(
            UserId::new("bob/../admin"),
            Err(ValueObjectError::InvalidUserIdChar('/'))
        );
    }

    #[test]
    fn test_payload_rejects_blank_and_oversized_bodies() {
        // テスト項目: 空白のみの本文と上限超過の本文はエラーになる
        // given (前提条件):
        let oversized = "x".repeat(MAX_PAYLOAD_LEN + 1);

        // when (操作) / then (期待する結果):
        assert_eq!(Payload::new("   \n"), Err(ValueObjectError::EmptyPayload));
        assert_eq!(
            Payload::new(oversized),
            Err(ValueObjectError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN
            })
        );
        assert_eq!(Payload::new(" hi ").unwrap().as_str(), " hi ");
    }

    #[test]
    fn test_conversation_key_is_order_independent() {
        // テスト項目: (A, B) と (B, A) から同じ会話キーが生成される
        // given (前提条件):
        let alice = user("alice");
        let bob = user("bob");

        // when (操作):
        let ab = ConversationKey::new(alice.clone(), bob.clone());
        let ba = ConversationKey::new(bob.clone(), alice.clone());

        // then (期待する結果):
        assert_eq!(ab, ba);
        assert_eq!(ab.participants(), (&alice, &bob));
        assert_eq!(ab.other(&alice), Some(&bob));
        assert_eq!(ab.other(&user("carol")), None);
    }

    #[test]
    fn test_uuid_identifiers_parse_back_from_display() {
        // テスト項目: 表示形式の ID 文字列から同じ ID を復元できる
        // given (前提条件):
        let id = MessageId::generate();

        // when (操作):
        let parsed: MessageId = id.to_string().parse().unwrap();

        // then (期待する結果):
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ConversationId>().is_err());
    }
}
