//! Nested message tree for a message board.
//!
//! Root messages are listed eagerly; replies are fetched per message on
//! first expansion and kept resident until the root listing is replaced.

pub mod cache;
pub mod controller;
pub mod error;
pub mod events;
pub mod memory;
pub mod model;
pub mod service;
pub mod view;

pub use cache::{Children, FetchState, MessageTreeCache, TreeNode};
pub use controller::{ToggleOutcome, TreeController};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use events::TreeEvent;
pub use memory::InMemoryMessageService;
pub use model::{Message, MessageId, NewMessage, ReplyCount, CONTENT_MAX_CHARS, CONTENT_MIN_CHARS};
pub use service::MessageService;
pub use view::{flatten_visible, FlatRow};
