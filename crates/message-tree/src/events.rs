use crate::model::MessageId;

/// Change notifications published by the tree controller.
///
/// Subscribers only re-render; no event triggers a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// The root listing was rebuilt from a fresh fetch
    RootReplaced { generation: u64, count: usize },
    /// Replies of `id` became resident
    RepliesLoaded { id: MessageId, count: usize },
    /// A reply created in this session was appended under `parent_id`
    ReplyAdded { parent_id: MessageId, reply_id: MessageId },
    /// A node was expanded or collapsed
    ExpansionChanged { id: MessageId, expanded: bool },
}
