//! Client side of the message board: REST service, configuration,
//! authenticated sessions, composition rules and terminal rendering.

pub mod browse;
pub mod compose;
pub mod config;
pub mod error;
pub mod http;
pub mod render;
pub mod session;

#[cfg(test)]
mod tests;

pub use browse::{board_view, reply_view, show_replies, thread_view, BoardView};
pub use compose::{validate_content, ContentError};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpMessageService;
pub use session::{Authenticator, LoginCredentials, RegisterRequest, Session, User};
