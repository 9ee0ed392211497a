use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::model::{Message, MessageId, NewMessage, CONTENT_MAX_CHARS, CONTENT_MIN_CHARS};
use crate::service::MessageService;

const DEFAULT_AUTHOR: &str = "anonymous";

#[derive(Debug)]
struct State {
    messages: BTreeMap<MessageId, Message>,
    next_id: u64,
    author: String,
    reachable: bool,
    injected_failures: VecDeque<ServiceError>,
    list_calls: usize,
    create_calls: usize,
    reply_calls: HashMap<MessageId, usize>,
    reply_gate: Option<Arc<Semaphore>>,
}

impl State {
    /// Applied when a call is answered: offline first, then queued failures
    fn check_available(&mut self) -> ServiceResult<()> {
        if !self.reachable {
            return Err(ServiceError::Connectivity(
                "in-memory service is offline".to_string(),
            ));
        }
        match self.injected_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn reply_count(&self, id: MessageId) -> u64 {
        self.messages
            .values()
            .filter(|m| m.parent_id == Some(id))
            .count() as u64
    }

    fn with_count(&self, message: &Message) -> Message {
        message.clone().with_reply_count(self.reply_count(message.id))
    }
}

/// In-memory message service for tests and local runs.
///
/// Behaves like the remote service (ordering, validation, not-found) and
/// additionally records calls, can be switched offline, can fail on demand,
/// and can hold reply fetches in flight until released.
#[derive(Debug)]
pub struct InMemoryMessageService {
    state: Mutex<State>,
}

impl Default for InMemoryMessageService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageService {
    /// Create an empty service
    pub fn new() -> Self {
        Self::with_messages(Vec::new())
    }

    /// Create a service pre-populated with `messages`, kept as given
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let mut stored = BTreeMap::new();
        for mut message in messages {
            message.replies = None;
            message.reply_count = None;
            stored.insert(message.id, message);
        }
        let next_id = stored.keys().next_back().map(|id| id.0 + 1).unwrap_or(1);

        Self {
            state: Mutex::new(State {
                messages: stored,
                next_id,
                author: DEFAULT_AUTHOR.to_string(),
                reachable: true,
                injected_failures: VecDeque::new(),
                list_calls: 0,
                create_calls: 0,
                reply_calls: HashMap::new(),
                reply_gate: None,
            }),
        }
    }

    /// Author name recorded on messages created through this service
    pub async fn set_author(&self, author: impl Into<String>) {
        self.state.lock().await.author = author.into();
    }

    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.reachable = reachable;
    }

    /// Make the next answered call fail with `error`
    pub async fn fail_next(&self, error: ServiceError) {
        self.state.lock().await.injected_failures.push_back(error);
    }

    /// Hold every reply fetch in flight until `release_replies`
    pub async fn hold_replies(&self) {
        self.state.lock().await.reply_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let held and future reply fetches complete
    pub async fn release_replies(&self) {
        if let Some(gate) = self.state.lock().await.reply_gate.take() {
            gate.close();
        }
    }

    /// Delete a message, as if removed on the server
    pub async fn remove(&self, id: MessageId) -> Option<Message> {
        self.state.lock().await.messages.remove(&id)
    }

    pub async fn message(&self, id: MessageId) -> Option<Message> {
        self.state.lock().await.messages.get(&id).cloned()
    }

    pub async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }

    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }

    /// Number of reply fetches requested for `id`
    pub async fn reply_calls(&self, id: MessageId) -> usize {
        self.state
            .lock()
            .await
            .reply_calls
            .get(&id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageService for InMemoryMessageService {
    async fn list_roots(&self) -> ServiceResult<Vec<Message>> {
        let mut state = self.state.lock().await;
        state.list_calls += 1;
        state.check_available()?;

        let mut roots: Vec<&Message> = state.messages.values().filter(|m| m.is_root()).collect();
        roots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(roots.into_iter().map(|m| state.with_count(m)).collect())
    }

    async fn fetch_replies(&self, id: MessageId) -> ServiceResult<Vec<Message>> {
        let gate = {
            let mut state = self.state.lock().await;
            *state.reply_calls.entry(id).or_insert(0) += 1;
            state.reply_gate.clone()
        };

        if let Some(gate) = gate {
            debug!(%id, "Reply fetch held");
            // Closing the gate fails the acquire, which is the release signal
            let _ = gate.acquire().await;
        }

        let mut state = self.state.lock().await;
        state.check_available()?;

        if !state.messages.contains_key(&id) {
            return Err(ServiceError::NotFound(format!("message {}", id)));
        }

        let mut replies: Vec<&Message> = state
            .messages
            .values()
            .filter(|m| m.parent_id == Some(id))
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(replies.into_iter().map(|m| state.with_count(m)).collect())
    }

    async fn create_message(&self, request: &NewMessage) -> ServiceResult<Message> {
        let mut state = self.state.lock().await;
        state.create_calls += 1;
        state.check_available()?;

        let length = request.content.chars().count();
        if request.content.trim().is_empty() {
            return Err(ServiceError::Rejected("content must not be blank".to_string()));
        }
        if !(CONTENT_MIN_CHARS..=CONTENT_MAX_CHARS).contains(&length) {
            return Err(ServiceError::Rejected(format!(
                "content must be {}-{} characters long, got {}",
                CONTENT_MIN_CHARS, CONTENT_MAX_CHARS, length
            )));
        }
        if let Some(parent_id) = request.parent_id {
            if !state.messages.contains_key(&parent_id) {
                return Err(ServiceError::Rejected(format!(
                    "parent message {} does not exist",
                    parent_id
                )));
            }
        }

        let id = MessageId(state.next_id);
        state.next_id += 1;

        let now = Utc::now();
        let mut message = Message::new(
            id,
            state.author.clone(),
            request.content.clone(),
            request.parent_id,
            now,
        );
        message.last_modified_at = Some(now);
        state.messages.insert(id, message.clone());

        Ok(message)
    }

    async fn health_check(&self) -> bool {
        self.state.lock().await.reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn msg(id: u64, parent: Option<u64>, minute: u32) -> Message {
        let created_at = Utc.with_ymd_and_hms(2025, 5, 1, 10, minute, 0).unwrap();
        Message::new(
            MessageId(id),
            "seed",
            format!("seed {}", id),
            parent.map(MessageId),
            created_at,
        )
    }

    #[tokio::test]
    async fn test_roots_most_recent_first_with_counts() {
        let service = InMemoryMessageService::with_messages(vec![
            msg(1, None, 0),
            msg(2, None, 5),
            msg(3, Some(1), 6),
            msg(4, Some(1), 7),
        ]);

        let roots = assert_ok!(service.list_roots().await);
        let ids: Vec<u64> = roots.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(roots[1].reply_count, Some(2));
        assert_eq!(roots[0].reply_count, Some(0));
        assert_eq!(service.list_calls().await, 1);
    }

    #[tokio::test]
    async fn test_replies_in_creation_order() {
        let service = InMemoryMessageService::with_messages(vec![
            msg(1, None, 0),
            msg(5, Some(1), 9),
            msg(3, Some(1), 2),
        ]);

        let replies = assert_ok!(service.fetch_replies(MessageId(1)).await);
        let ids: Vec<u64> = replies.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![3, 5]);
        assert_eq!(service.reply_calls(MessageId(1)).await, 1);
    }

    #[tokio::test]
    async fn test_replies_of_missing_message_not_found() {
        let service = InMemoryMessageService::new();
        let err = assert_err!(service.fetch_replies(MessageId(8)).await);
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_validates() {
        let service = InMemoryMessageService::with_messages(vec![msg(10, None, 0)]);
        service.set_author("carol").await;

        let created = assert_ok!(
            service
                .create_message(&NewMessage::reply(MessageId(10), "xin chào"))
                .await
        );
        assert_eq!(created.id, MessageId(11));
        assert_eq!(created.author, "carol");
        assert_eq!(created.parent_id, Some(MessageId(10)));

        let too_short = assert_err!(service.create_message(&NewMessage::root("hi")).await);
        assert!(matches!(too_short, ServiceError::Rejected(_)));

        let orphan = assert_err!(
            service
                .create_message(&NewMessage::reply(MessageId(99), "orphan reply"))
                .await
        );
        assert!(matches!(orphan, ServiceError::Rejected(_)));
        assert_eq!(service.create_calls().await, 3);
    }

    #[tokio::test]
    async fn test_offline_and_injected_failures() {
        let service = InMemoryMessageService::new();
        service.set_reachable(false).await;
        assert!(!service.health_check().await);
        let err = assert_err!(service.list_roots().await);
        assert!(matches!(err, ServiceError::Connectivity(_)));

        service.set_reachable(true).await;
        service
            .fail_next(ServiceError::Rejected("busy".to_string()))
            .await;
        assert_err!(service.list_roots().await);
        assert_ok!(service.list_roots().await);
    }
}
