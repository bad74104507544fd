use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::mirror::LocalMirror;
use crate::api::navigation::Screen;
use crate::api::retry::Backoff;
use crate::api::session::SessionGate;
use crate::api::state::AppState;
use crate::error::ClientError;
use crate::models::{Message, NewMessage, Session, StoredObject};
use crate::services::{DocumentService, MediaLibrary, Notifier, ObjectStorage, Snapshot};

pub const PERMISSION_TITLE: &str = "Permission required";
pub const PERMISSION_TEXT: &str = "Gallery access is needed to send images.";
pub const IMAGE_UNREADABLE: &str = "The image could not be read.";
pub const IMAGE_SEND_FAILED: &str = "Failed to send image.";
pub const RECONNECTING: &str = "Connection to the chat room lost. Reconnecting...";
pub const RECONNECTED: &str = "Reconnected.";
pub const SUBSCRIPTION_LOST: &str = "Chat room unavailable. Showing saved messages.";

/// One rendered bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: String,
    pub author_id: String,
    pub sender: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub is_own: bool,
}

pub fn render_messages(messages: &[Message], current_uid: &str) -> Vec<MessageView> {
    messages
        .iter()
        .map(|message| {
            let is_own = message.author_id == current_uid;
            let sender = if is_own {
                "You".to_string()
            } else if message.author_display_name.is_empty() {
                "Anon".to_string()
            } else {
                message.author_display_name.clone()
            };
            MessageView {
                id: message.id.clone(),
                author_id: message.author_id.clone(),
                sender,
                text: message.text.clone().filter(|t| !t.is_empty()),
                image_url: message.image_url.clone().filter(|u| !u.is_empty()),
                is_own,
            }
        })
        .collect()
}

/// Storage path for an uploaded image. Uniqueness comes from the timestamp.
pub fn image_path(uid: &str, at: DateTime<Utc>) -> String {
    format!("images/{}_{}.jpg", uid, at.timestamp_millis())
}

/// State shared between the mounted view and its subscription task.
struct RoomShared {
    documents: Arc<dyn DocumentService>,
    notifier: Arc<dyn Notifier>,
    mirror: LocalMirror,
    messages: watch::Sender<Snapshot>,
    cancel: CancellationToken,
    backoff: Backoff,
}

impl RoomShared {
    async fn run(self: Arc<Self>) {
        let mut backoff = self.backoff.clone();
        loop {
            let err = match self.follow(&mut backoff).await {
                Ok(()) => return,
                Err(err) => err,
            };
            if self.cancel.is_cancelled() {
                return;
            }
            tracing::warn!(code = err.code(), error = %err, "live query failed");

            let Some(delay) = backoff.next_delay() else {
                tracing::error!(attempts = backoff.attempts(), "giving up on live query");
                self.notifier.banner(SUBSCRIPTION_LOST);
                return;
            };
            self.notifier.banner(RECONNECTING);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "resubscribing");

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Pump one live query until it fails. `Ok` only on cancellation.
    async fn follow(&self, backoff: &mut Backoff) -> Result<(), ClientError> {
        let mut snapshots = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            stream = self.documents.live_query() => stream?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                next = snapshots.next() => next,
            };

            match next {
                Some(Ok(snapshot)) => {
                    if backoff.attempts() > 0 {
                        self.notifier.banner(RECONNECTED);
                        backoff.reset();
                    }
                    self.apply(snapshot).await;
                }
                Some(Err(err)) => return Err(err),
                None => {
                    return Err(ClientError::backend(
                        "unavailable",
                        "Live query closed by the backend",
                    ))
                }
            }
        }
    }

    async fn apply(&self, snapshot: Snapshot) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::debug!(count = snapshot.len(), "snapshot received");
        // Mirror first so observers of `messages` never see an unsaved list.
        self.mirror.save(&snapshot).await;
        self.messages.send_replace(snapshot);
    }
}

/// The chat room while it is mounted.
pub struct RoomView {
    state: AppState,
    session: Session,
    shared: Arc<RoomShared>,
    subscription: Option<JoinHandle<()>>,
    pub composer: Composer,
}

impl RoomView {
    /// Mount the room. Without a session the navigator is sent to login and
    /// nothing is mounted.
    pub async fn mount(state: &AppState) -> Option<RoomView> {
        let session = match SessionGate::new(&state.session).room_access() {
            Ok(session) => session,
            Err(redirect) => {
                tracing::debug!(route = redirect.route(), "room requires a session");
                state.navigator.replace(redirect);
                return None;
            }
        };

        let mirror = state.mirror();
        let (messages, _) = watch::channel(Vec::new());
        if let Some(saved) = mirror.load().await {
            messages.send_replace(saved);
        }

        let cancel = CancellationToken::new();
        let shared = Arc::new(RoomShared {
            documents: state.documents.clone(),
            notifier: state.notifier.clone(),
            mirror,
            messages,
            cancel: cancel.clone(),
            backoff: Backoff::new(
                state.config.resubscribe_base_delay(),
                state.config.resubscribe_max_delay(),
                state.config.resubscribe_max_attempts,
            ),
        });
        let subscription = tokio::spawn(shared.clone().run());

        tracing::info!(uid = %session.uid, "room mounted");
        Some(RoomView {
            composer: Composer {
                documents: state.documents.clone(),
                storage: state.storage.clone(),
                notifier: state.notifier.clone(),
                author: session.clone(),
                cancel,
                draft: String::new(),
            },
            state: state.clone(),
            session,
            shared,
            subscription: Some(subscription),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Name shown in the room header.
    pub fn header_name(&self) -> String {
        self.session.author_name()
    }

    pub fn is_mounted(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    pub fn messages(&self) -> Snapshot {
        self.shared.messages.borrow().clone()
    }

    pub fn render(&self) -> Vec<MessageView> {
        render_messages(&self.shared.messages.borrow(), &self.session.uid)
    }

    /// Follows the displayed list. Each new value is already mirrored.
    pub fn watch_messages(&self) -> watch::Receiver<Snapshot> {
        self.shared.messages.subscribe()
    }

    /// Detach the live query. Nothing is applied after this returns.
    pub async fn unmount(&mut self) {
        self.shared.cancel.cancel();
        if let Some(task) = self.subscription.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "subscription task ended abnormally");
            }
            tracing::info!("room unmounted");
        }
    }

    /// Sign out, forget the mirrored history and go to login.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        if let Err(err) = self.state.identity.sign_out().await {
            tracing::error!(error = %err, "logout failed");
            return Err(err);
        }
        self.unmount().await;
        self.shared.mirror.clear().await;
        self.state.navigator.replace(Screen::Login);
        Ok(())
    }
}

impl Drop for RoomView {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSend {
    Sent(String),
    Cancelled,
    PermissionDenied,
}

/// Text field plus attachment picker.
pub struct Composer {
    documents: Arc<dyn DocumentService>,
    storage: Arc<dyn ObjectStorage>,
    notifier: Arc<dyn Notifier>,
    author: Session,
    cancel: CancellationToken,
    draft: String,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Append the trimmed draft. `Ok(None)` when there was nothing to send.
    ///
    /// Failures are logged only; the draft is kept so the user can resend.
    pub async fn send_text(&mut self) -> Result<Option<String>, ClientError> {
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }

        match self.documents.append(NewMessage::text(&self.author, text)).await {
            Ok(id) => {
                if !self.cancel.is_cancelled() {
                    self.draft.clear();
                }
                Ok(Some(id))
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "failed to send message");
                Err(err)
            }
        }
    }

    pub async fn send_image(&self, library: &dyn MediaLibrary) -> Result<ImageSend, ClientError> {
        match self.upload_and_append(library).await {
            Ok(ImageSend::PermissionDenied) => {
                self.alert(PERMISSION_TITLE, PERMISSION_TEXT).await;
                Ok(ImageSend::PermissionDenied)
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!(code = err.code(), error = %err, "failed to send image");
                let text = match &err {
                    ClientError::Validation(msg) => msg.clone(),
                    _ => IMAGE_SEND_FAILED.to_string(),
                };
                self.alert("Error", &text).await;
                Err(err)
            }
        }
    }

    async fn upload_and_append(&self, library: &dyn MediaLibrary) -> Result<ImageSend, ClientError> {
        if !library.request_permission().await? {
            return Ok(ImageSend::PermissionDenied);
        }
        let Some(picked) = library.pick_image().await? else {
            tracing::debug!("image pick cancelled");
            return Ok(ImageSend::Cancelled);
        };

        let encoded = picked
            .base64
            .ok_or_else(|| ClientError::Validation(IMAGE_UNREADABLE.to_string()))?;
        let blob = base64_simd::STANDARD
            .decode_to_vec(&encoded)
            .map_err(|e| ClientError::Internal(format!("Image decoding failed: {}", e)))?;

        let path = image_path(&self.author.uid, Utc::now());
        let object = self.storage.upload(&path, blob, &picked.content_type).await?;

        match self.append_image(&object).await {
            Ok(id) => Ok(ImageSend::Sent(id)),
            Err(err) => {
                tracing::warn!(path = %object.path, "uploaded image left without a message");
                Err(err)
            }
        }
    }

    async fn append_image(&self, object: &StoredObject) -> Result<String, ClientError> {
        let url = self.storage.download_url(object).await?;
        self.documents.append(NewMessage::image(&self.author, url)).await
    }

    async fn alert(&self, title: &str, text: &str) {
        if self.cancel.is_cancelled() {
            tracing::debug!(title, "room gone, alert dropped");
            return;
        }
        self.notifier.alert(title, text).await;
    }
}
