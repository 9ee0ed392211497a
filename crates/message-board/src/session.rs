use std::sync::Arc;

use async_trait::async_trait;
use message_tree::{MessageService, TreeController};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::ClientResult;

/// An authenticated board user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-side user id; numeric ids are kept in their decimal form
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Login request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub username_or_email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginCredentials {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
            remember_me: false,
        }
    }
}

/// Registration request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Authentication endpoints of the board
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<User>;

    async fn register(&self, request: &RegisterRequest) -> ClientResult<User>;
}

/// A logged-in user together with the board state they are looking at.
///
/// Every session starts from an empty tree; logging out drops it.
pub struct Session<S: MessageService> {
    user: User,
    controller: TreeController<S>,
}

impl<S> Session<S>
where
    S: MessageService + Authenticator,
{
    /// Authenticate and open a session with a fresh tree
    pub async fn login(service: Arc<S>, credentials: &LoginCredentials) -> ClientResult<Self> {
        let user = service.login(credentials).await?;
        info!(username = %user.username, "Logged in");
        Ok(Self::start(service, user))
    }

    /// Create an account and open a session for it
    pub async fn register(service: Arc<S>, request: &RegisterRequest) -> ClientResult<Self> {
        let user = service.register(request).await?;
        info!(username = %user.username, "Registered");
        Ok(Self::start(service, user))
    }
}

impl<S: MessageService> Session<S> {
    /// Open a session for an already authenticated user
    pub fn start(service: Arc<S>, user: User) -> Self {
        Self {
            user,
            controller: TreeController::new(service),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn controller(&self) -> &TreeController<S> {
        &self.controller
    }

    /// End the session, discarding the tree
    pub fn logout(self) -> User {
        info!(username = %self.user.username, "Logged out");
        self.user
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
