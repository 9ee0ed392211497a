use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{Message, MessageId, ReplyCount};

/// Reply list of a node: unknown until fetched, then a resident sequence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Children {
    #[default]
    NotLoaded,
    Loaded(Vec<MessageId>),
}

impl Children {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Children::Loaded(_))
    }

    pub fn ids(&self) -> Option<&[MessageId]> {
        match self {
            Children::Loaded(ids) => Some(ids),
            Children::NotLoaded => None,
        }
    }
}

/// Reply-loading state of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Unloaded,
    Loading,
    Loaded,
}

/// Per-message state held by the cache
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// The message payload, without embedded replies
    message: Message,
    /// Reply ids, in presentation order
    children: Children,
    /// Whether the presentation shows the replies
    expanded: bool,
    /// Whether a reply fetch is in flight
    pending_fetch: bool,
}

impl TreeNode {
    fn new(message: Message) -> Self {
        Self {
            message,
            children: Children::NotLoaded,
            expanded: false,
            pending_fetch: false,
        }
    }

    pub fn id(&self) -> MessageId {
        self.message.id
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        self.children.is_loaded()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_pending_fetch(&self) -> bool {
        self.pending_fetch
    }

    pub fn fetch_state(&self) -> FetchState {
        if self.children.is_loaded() {
            FetchState::Loaded
        } else if self.pending_fetch {
            FetchState::Loading
        } else {
            FetchState::Unloaded
        }
    }

    /// Resident count once replies are loaded, the service hint before that
    pub fn reply_count(&self) -> ReplyCount {
        match (&self.children, self.message.reply_count) {
            (Children::Loaded(ids), _) => ReplyCount::Derived(ids.len() as u64),
            (Children::NotLoaded, Some(hint)) => ReplyCount::Authoritative(hint),
            (Children::NotLoaded, None) => ReplyCount::Unknown,
        }
    }
}

/// Single source of truth for resident messages and their per-node UI state.
///
/// Nodes are indexed by id and reference their children by id, so the tree
/// has one owner and arbitrary depth without nested ownership.
#[derive(Debug, Default)]
pub struct MessageTreeCache {
    nodes: HashMap<MessageId, TreeNode>,
    root: Vec<MessageId>,
    generation: u64,
}

impl MessageTreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremented on every root replacement
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: MessageId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn root_ids(&self) -> &[MessageId] {
        &self.root
    }

    /// Root listing in service order
    pub fn get_root(&self) -> Vec<&TreeNode> {
        self.root.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Resident replies of `id`, `None` when unknown or not loaded
    pub fn children(&self, id: MessageId) -> Option<Vec<&TreeNode>> {
        let ids = self.nodes.get(&id)?.children.ids()?;
        Some(ids.iter().filter_map(|child| self.nodes.get(child)).collect())
    }

    pub fn child_ids(&self, id: MessageId) -> Option<&[MessageId]> {
        self.nodes.get(&id)?.children.ids()
    }

    /// Discard the whole tree and rebuild the root listing from `messages`
    pub fn replace_root(&mut self, messages: Vec<Message>) {
        self.nodes.clear();
        self.root.clear();
        self.generation += 1;

        for message in messages {
            let id = self.ingest(message);
            if !self.root.contains(&id) {
                self.root.push(id);
            }
        }

        debug!(
            generation = self.generation,
            roots = self.root.len(),
            resident = self.nodes.len(),
            "Replaced root listing"
        );
    }

    /// True once the replies of `id` are resident, even when there are none
    pub fn has_children(&self, id: MessageId) -> bool {
        self.nodes.get(&id).is_some_and(TreeNode::has_children)
    }

    /// Merge fetched replies into `id`, keeping already resident entries.
    ///
    /// Fetched order comes first; previously resident children missing from
    /// the fetch (such as a locally appended reply the service did not list
    /// yet) follow in their previous order. Existing nodes keep their own
    /// children and expansion, only their payload is refreshed.
    pub fn set_children(&mut self, id: MessageId, messages: Vec<Message>) {
        let previous = match self.nodes.get(&id) {
            Some(node) => node.children.ids().map(<[MessageId]>::to_vec).unwrap_or_default(),
            None => {
                debug!(%id, "Ignoring replies for a message that is not resident");
                return;
            }
        };

        let mut seen = HashSet::with_capacity(messages.len() + previous.len());
        let mut merged = Vec::with_capacity(messages.len() + previous.len());

        for message in messages {
            if message.id == id {
                debug!(%id, "Ignoring a message listed as its own reply");
                continue;
            }
            let child = self.ingest(message);
            if seen.insert(child) {
                merged.push(child);
            }
        }

        let kept_local = previous.iter().filter(|child| !seen.contains(*child)).count();
        for child in previous {
            if seen.insert(child) {
                merged.push(child);
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            debug!(%id, replies = merged.len(), kept_local, "Replies merged");
            node.children = Children::Loaded(merged);
            node.pending_fetch = false;
        }
    }

    /// Append a freshly created reply under `parent_id`.
    ///
    /// An unloaded parent becomes loaded with just this reply, so the reply is
    /// visible without fetching the rest of the subtree.
    pub fn append_child(&mut self, parent_id: MessageId, message: Message) {
        if !self.nodes.contains_key(&parent_id) {
            debug!(%parent_id, "Ignoring reply for a parent that is not resident");
            return;
        }
        if message.id == parent_id {
            debug!(%parent_id, "Ignoring a message appended as its own reply");
            return;
        }

        let child = self.ingest(message);
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            match parent.children {
                Children::Loaded(ref mut ids) => {
                    if !ids.contains(&child) {
                        ids.push(child);
                    }
                }
                Children::NotLoaded => parent.children = Children::Loaded(vec![child]),
            }
        }
    }

    pub fn set_expanded(&mut self, id: MessageId, value: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.expanded = value;
        }
    }

    pub fn set_pending_fetch(&mut self, id: MessageId, value: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.pending_fetch = value;
        }
    }

    pub fn is_expanded(&self, id: MessageId) -> bool {
        self.nodes.get(&id).is_some_and(TreeNode::is_expanded)
    }

    pub fn is_pending_fetch(&self, id: MessageId) -> bool {
        self.nodes.get(&id).is_some_and(TreeNode::is_pending_fetch)
    }

    pub fn fetch_state(&self, id: MessageId) -> Option<FetchState> {
        self.nodes.get(&id).map(TreeNode::fetch_state)
    }

    pub fn reply_count(&self, id: MessageId) -> ReplyCount {
        self.nodes
            .get(&id)
            .map(TreeNode::reply_count)
            .unwrap_or(ReplyCount::Unknown)
    }

    /// Resident reply count, else the service hint, else zero
    pub fn derived_reply_count(&self, id: MessageId) -> u64 {
        self.reply_count(id).value()
    }

    /// Insert or refresh the node for `message`; embedded replies go through
    /// `set_children` so every payload shape builds nodes the same way.
    fn ingest(&mut self, mut message: Message) -> MessageId {
        let id = message.id;
        let embedded = message.take_replies();

        match self.nodes.get_mut(&id) {
            Some(node) => node.message = message,
            None => {
                self.nodes.insert(id, TreeNode::new(message));
            }
        }

        if let Some(replies) = embedded {
            self.set_children(id, replies);
        }
        id
    }
}
