use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fewest characters a message may contain
pub const CONTENT_MIN_CHARS: usize = 3;

/// Most characters a message may contain
pub const CONTENT_MAX_CHARS: usize = 200;

/// Identifier assigned to a message by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MessageId)
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        MessageId(value)
    }
}

/// A posted message, root or reply. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned identifier
    pub id: MessageId,

    /// Message text
    pub content: String,

    /// Display name of the author
    #[serde(rename = "username")]
    pub author: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,

    /// The message this one replies to, `None` for root messages
    #[serde(rename = "repliedToId", default)]
    pub parent_id: Option<MessageId>,

    /// Replies embedded by the service in the same payload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Message>>,

    /// Reply count reported by the service before the replies are fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
}

impl Message {
    /// Create a message payload without embedded replies or counts
    pub fn new(
        id: MessageId,
        author: impl Into<String>,
        content: impl Into<String>,
        parent_id: Option<MessageId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            author: author.into(),
            created_at,
            last_modified_at: None,
            parent_id,
            replies: None,
            reply_count: None,
        }
    }

    /// Attach an authoritative reply count
    pub fn with_reply_count(mut self, count: u64) -> Self {
        self.reply_count = Some(count);
        self
    }

    /// Attach an embedded reply list
    pub fn with_replies(mut self, replies: Vec<Message>) -> Self {
        self.replies = Some(replies);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Detach the embedded replies so the payload can be stored on its own
    pub fn take_replies(&mut self) -> Option<Vec<Message>> {
        self.replies.take()
    }
}

/// Request body for creating a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub content: String,

    /// Sent as a decimal string, omitted for root posts
    #[serde(default, skip_serializing_if = "Option::is_none", with = "parent_id_string")]
    pub parent_id: Option<MessageId>,
}

impl NewMessage {
    /// A top-level post
    pub fn root(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            parent_id: None,
        }
    }

    /// A reply to `parent_id`
    pub fn reply(parent_id: MessageId, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            parent_id: Some(parent_id),
        }
    }
}

/// Number of replies known for a node and where that number came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCount {
    /// Hint supplied by the service before the replies were fetched
    Authoritative(u64),
    /// Number of reply entries resident in the cache
    Derived(u64),
    /// Neither fetched nor hinted
    Unknown,
}

impl ReplyCount {
    pub fn value(&self) -> u64 {
        match self {
            ReplyCount::Authoritative(n) | ReplyCount::Derived(n) => *n,
            ReplyCount::Unknown => 0,
        }
    }
}

mod parent_id_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::MessageId;

    pub fn serialize<S>(value: &Option<MessageId>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(id) => serializer.serialize_str(&id.to_string()),
            None => serializer.serialize_none(),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<MessageId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => text
                .parse()
                .map(Some)
                .map_err(serde::de::Error::custom),
            Some(Raw::Number(n)) => Ok(Some(MessageId(n))),
            None => Ok(None),
        }
    }
}
