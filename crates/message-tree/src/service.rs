use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::model::{Message, MessageId, NewMessage};

/// Interface to the remote store of messages
#[async_trait]
pub trait MessageService: Send + Sync {
    /// List top-level messages, most recent first
    async fn list_roots(&self) -> ServiceResult<Vec<Message>>;

    /// Fetch the direct replies of a message
    async fn fetch_replies(&self, id: MessageId) -> ServiceResult<Vec<Message>>;

    /// Create a message; the service assigns id and timestamp
    async fn create_message(&self, message: &NewMessage) -> ServiceResult<Message>;

    /// Whether the service is reachable; failures count as unreachable
    async fn health_check(&self) -> bool;
}
