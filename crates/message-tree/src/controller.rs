use std::sync::Arc;

use tokio::sync::{broadcast, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::cache::{MessageTreeCache, TreeNode};
use crate::error::{ServiceError, ServiceResult};
use crate::events::TreeEvent;
use crate::model::{Message, MessageId, NewMessage};
use crate::service::MessageService;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What a `toggle_replies` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Replies are now shown (after a fetch or a local flip)
    Expanded,
    /// Replies are now hidden
    Collapsed,
    /// A fetch for this node was already in flight; nothing was issued
    AlreadyLoading,
    /// The message vanished on the server; the node now has no replies
    Emptied,
    /// The tree was reset while the fetch was in flight; result dropped
    Discarded,
    /// The id is not resident in the cache
    Unknown,
}

/// Turns user intents into service calls and cache updates.
///
/// The cache lock is only held for synchronous cache operations, never
/// across a service call, so concurrent intents interleave only at service
/// suspension points.
pub struct TreeController<S: MessageService> {
    /// Remote message store
    service: Arc<S>,
    /// The tree cache shared with the presentation layer
    cache: Arc<RwLock<MessageTreeCache>>,
    /// Change notifications for the presentation layer
    events: broadcast::Sender<TreeEvent>,
}

impl<S: MessageService> Clone for TreeController<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            cache: self.cache.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: MessageService> TreeController<S> {
    /// Create a controller with a fresh, empty cache
    pub fn new(service: Arc<S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            cache: Arc::new(RwLock::new(MessageTreeCache::new())),
            events,
        }
    }

    /// Subscribe to tree change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    /// Borrow the cache read-only, e.g. to flatten it for rendering
    pub async fn read(&self) -> RwLockReadGuard<'_, MessageTreeCache> {
        self.cache.read().await
    }

    /// Snapshot of the root listing
    pub async fn get_root(&self) -> Vec<TreeNode> {
        self.cache.read().await.get_root().into_iter().cloned().collect()
    }

    pub async fn root_ids(&self) -> Vec<MessageId> {
        self.cache.read().await.root_ids().to_vec()
    }

    /// Resident reply ids of `id`, `None` until loaded
    pub async fn child_ids(&self, id: MessageId) -> Option<Vec<MessageId>> {
        self.cache.read().await.child_ids(id).map(<[MessageId]>::to_vec)
    }

    pub async fn derived_reply_count(&self, id: MessageId) -> u64 {
        self.cache.read().await.derived_reply_count(id)
    }

    pub async fn has_children(&self, id: MessageId) -> bool {
        self.cache.read().await.has_children(id)
    }

    pub async fn is_expanded(&self, id: MessageId) -> bool {
        self.cache.read().await.is_expanded(id)
    }

    pub async fn check_health(&self) -> bool {
        let healthy = self.service.health_check().await;
        debug!(healthy, "Health check");
        healthy
    }

    /// Fetch the root listing and rebuild the tree from it.
    ///
    /// On failure the previous tree is left untouched.
    pub async fn load_root_messages(&self) -> ServiceResult<usize> {
        let messages = match self.service.list_roots().await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Failed to load root messages");
                return Err(e);
            }
        };

        let (generation, count) = {
            let mut cache = self.cache.write().await;
            cache.replace_root(messages);
            (cache.generation(), cache.root_ids().len())
        };

        info!(generation, count, "Loaded root messages");
        self.publish(TreeEvent::RootReplaced { generation, count });
        Ok(count)
    }

    /// Show or hide the replies of `id`, fetching them on first use.
    ///
    /// Only one fetch per node is ever in flight; toggles arriving while it
    /// is pending are dropped and the fetch completion expands the node.
    pub async fn toggle_replies(&self, id: MessageId) -> ServiceResult<ToggleOutcome> {
        let generation = {
            let mut cache = self.cache.write().await;
            let (loaded, expanded, pending) = match cache.get(id) {
                Some(node) => (node.has_children(), node.is_expanded(), node.is_pending_fetch()),
                None => {
                    debug!(%id, "Toggle for a message that is not resident");
                    return Ok(ToggleOutcome::Unknown);
                }
            };

            if loaded {
                cache.set_expanded(id, !expanded);
                drop(cache);
                self.publish(TreeEvent::ExpansionChanged {
                    id,
                    expanded: !expanded,
                });
                return Ok(if expanded {
                    ToggleOutcome::Collapsed
                } else {
                    ToggleOutcome::Expanded
                });
            }

            if pending {
                debug!(%id, "Reply fetch already in flight");
                return Ok(ToggleOutcome::AlreadyLoading);
            }

            cache.set_pending_fetch(id, true);
            cache.generation()
        };

        debug!(%id, generation, "Fetching replies");
        let result = self.service.fetch_replies(id).await;

        let mut cache = self.cache.write().await;
        if cache.generation() != generation || !cache.contains(id) {
            debug!(%id, generation, "Dropping reply fetch for a discarded tree");
            return Ok(ToggleOutcome::Discarded);
        }

        match result {
            Ok(replies) => {
                cache.set_children(id, replies);
                cache.set_expanded(id, true);
                let count = cache.child_ids(id).map_or(0, <[MessageId]>::len);
                drop(cache);

                info!(%id, count, "Loaded replies");
                self.publish(TreeEvent::RepliesLoaded { id, count });
                self.publish(TreeEvent::ExpansionChanged { id, expanded: true });
                Ok(ToggleOutcome::Expanded)
            }
            Err(ServiceError::NotFound(reason)) => {
                cache.set_children(id, Vec::new());
                cache.set_expanded(id, true);
                drop(cache);

                warn!(%id, %reason, "Message vanished, treating its replies as empty");
                self.publish(TreeEvent::RepliesLoaded { id, count: 0 });
                self.publish(TreeEvent::ExpansionChanged { id, expanded: true });
                Ok(ToggleOutcome::Emptied)
            }
            Err(e) => {
                cache.set_pending_fetch(id, false);
                warn!(%id, error = %e, "Failed to load replies");
                Err(e)
            }
        }
    }

    /// Post a reply to `parent_id` and show it under its parent.
    ///
    /// Nothing is written to the cache unless the service accepted the reply.
    pub async fn submit_reply(
        &self,
        parent_id: MessageId,
        content: impl Into<String>,
    ) -> ServiceResult<Message> {
        let request = NewMessage::reply(parent_id, content);
        let created = match self.service.create_message(&request).await {
            Ok(created) => created,
            Err(e) => {
                warn!(%parent_id, error = %e, "Failed to post reply");
                return Err(e);
            }
        };

        let appended = {
            let mut cache = self.cache.write().await;
            if cache.contains(parent_id) {
                cache.append_child(parent_id, created.clone());
                cache.set_expanded(parent_id, true);
                true
            } else {
                false
            }
        };

        if appended {
            info!(%parent_id, reply_id = %created.id, "Reply posted");
            self.publish(TreeEvent::ReplyAdded {
                parent_id,
                reply_id: created.id,
            });
        } else {
            debug!(
                %parent_id,
                reply_id = %created.id,
                "Reply posted for a parent that is no longer resident"
            );
        }
        Ok(created)
    }

    /// Post a new top-level message, then reload the root listing.
    ///
    /// A failed reload does not fail the post; the tree keeps its previous
    /// state until the next successful load.
    pub async fn post_message(&self, content: impl Into<String>) -> ServiceResult<Message> {
        let created = match self.service.create_message(&NewMessage::root(content)).await {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "Failed to post message");
                return Err(e);
            }
        };
        info!(id = %created.id, "Message posted");

        if let Err(e) = self.load_root_messages().await {
            warn!(id = %created.id, error = %e, "Posted message but could not refresh the board");
        }
        Ok(created)
    }

    fn publish(&self, event: TreeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
