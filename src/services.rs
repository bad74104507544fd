//! Seams to the external backend and to the device.
//!
//! Every durable concern lives behind one of these traits. The client core only
//! ever talks to `Arc<dyn Trait>` handles, so the embedded SQLite backend in
//! [`crate::db`] and the fakes used by the tests are interchangeable.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::watch;

use crate::error::ClientError;
use crate::models::{
    AccountHandle, Message, NewMessage, PickedImage, ProfileUpdate, Session, StoredObject,
};

/// Lifecycle of the identity service's cached session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Resolved(Option<Session>),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Resolved(session) => session.as_ref(),
            SessionState::Uninitialized => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SessionState::Resolved(_))
    }
}

/// A full, ordered materialization of the message collection.
pub type Snapshot = Vec<Message>;

/// Live query output. Each item replaces the previous one entirely.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, ClientError>>;

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_account(&self, email: &str, secret: &str)
        -> Result<AccountHandle, ClientError>;

    async fn sign_in(&self, email: &str, secret: &str) -> Result<Session, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;

    async fn update_profile(
        &self,
        account: &AccountHandle,
        update: ProfileUpdate,
    ) -> Result<(), ClientError>;

    /// Cached session, readable without touching the network.
    fn current_session(&self) -> Option<Session>;

    /// Session-change subscription. Dropping the receiver unsubscribes.
    fn session_changes(&self) -> watch::Receiver<SessionState>;
}

#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Append one record to the message collection and return its id.
    async fn append(&self, record: NewMessage) -> Result<String, ClientError>;

    /// Standing query over the collection ordered by `created_at` ascending.
    async fn live_query(&self) -> Result<SnapshotStream, ClientError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, ClientError>;

    async fn download_url(&self, object: &StoredObject) -> Result<String, ClientError>;
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    async fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Device gallery access.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn request_permission(&self) -> Result<bool, ClientError>;

    /// `Ok(None)` means the user cancelled the pick.
    async fn pick_image(&self) -> Result<Option<PickedImage>, ClientError>;
}

/// User-facing feedback surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Blocking alert; resolves once the user has acknowledged it.
    async fn alert(&self, title: &str, message: &str);

    /// Non-blocking status line.
    fn banner(&self, message: &str);
}
