#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::{mpsc, watch, Notify};

use ochat::api::AppState;
use ochat::config::Config;
use ochat::error::ClientError;
use ochat::models::{
    AccountHandle, Message, NewMessage, PickedImage, ProfileUpdate, Session, StoredObject,
};
use ochat::services::{
    DocumentService, IdentityService, KeyValueStore, MediaLibrary, Notifier, ObjectStorage,
    SessionState, Snapshot, SnapshotStream,
};

pub fn session(uid: &str, name: &str) -> Session {
    Session {
        uid: uid.to_string(),
        display_name: Some(name.to_string()),
        email: Some(format!("{}@example.com", uid)),
    }
}

pub fn message(id: &str, text: &str, author_id: &str) -> Message {
    Message {
        id: id.to_string(),
        text: Some(text.to_string()),
        image_url: None,
        author_id: author_id.to_string(),
        author_display_name: format!("name-{}", author_id),
        created_at: None,
    }
}

/// Next list the room publishes. Mirroring has already happened by then.
pub async fn next_snapshot(messages: &mut watch::Receiver<Snapshot>) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(5), messages.changed())
        .await
        .expect("snapshot published in time")
        .expect("room still alive");
    let snapshot = messages.borrow_and_update().clone();
    snapshot
}

pub fn test_config() -> Config {
    Config {
        resubscribe_max_attempts: 2,
        resubscribe_base_delay_ms: 1,
        resubscribe_max_delay_ms: 5,
        ..Config::default()
    }
}

// ---------------------------------------------------------------- identity

#[derive(Default)]
pub struct IdentityCalls {
    pub sign_in: AtomicUsize,
    pub create_account: AtomicUsize,
    pub update_profile: AtomicUsize,
    pub sign_out: AtomicUsize,
}

pub struct FakeIdentity {
    pub calls: IdentityCalls,
    state: watch::Sender<SessionState>,
    pub reject_sign_in: Mutex<Option<ClientError>>,
    pub reject_profile: Mutex<Option<ClientError>>,
    pub reject_sign_out: AtomicBool,
    /// When set, create_account parks until `release` is notified.
    pub hold_create: AtomicBool,
    pub create_started: Notify,
    pub release: Notify,
}

impl FakeIdentity {
    pub fn with_state(initial: SessionState) -> Self {
        let (state, _) = watch::channel(initial);
        FakeIdentity {
            calls: IdentityCalls::default(),
            state,
            reject_sign_in: Mutex::new(None),
            reject_profile: Mutex::new(None),
            reject_sign_out: AtomicBool::new(false),
            hold_create: AtomicBool::new(false),
            create_started: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn signed_out() -> Self {
        Self::with_state(SessionState::Resolved(None))
    }

    pub fn signed_in(session: Session) -> Self {
        Self::with_state(SessionState::Resolved(Some(session)))
    }

    pub fn resolve(&self, session: Option<Session>) {
        self.state.send_replace(SessionState::Resolved(session));
    }

    pub fn network_calls(&self) -> usize {
        self.calls.sign_in.load(Ordering::SeqCst)
            + self.calls.create_account.load(Ordering::SeqCst)
            + self.calls.update_profile.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn create_account(
        &self,
        email: &str,
        _secret: &str,
    ) -> Result<AccountHandle, ClientError> {
        self.calls.create_account.fetch_add(1, Ordering::SeqCst);
        if self.hold_create.load(Ordering::SeqCst) {
            self.create_started.notify_one();
            self.release.notified().await;
        }
        Ok(AccountHandle {
            uid: format!("uid-{}", email),
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, _secret: &str) -> Result<Session, ClientError> {
        self.calls.sign_in.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.reject_sign_in.lock().unwrap().take() {
            return Err(err);
        }
        let session = Session {
            uid: "u1".to_string(),
            display_name: None,
            email: Some(email.to_string()),
        };
        self.resolve(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.calls.sign_out.fetch_add(1, Ordering::SeqCst);
        if self.reject_sign_out.load(Ordering::SeqCst) {
            return Err(ClientError::backend("auth/network-request-failed", "offline"));
        }
        self.resolve(None);
        Ok(())
    }

    async fn update_profile(
        &self,
        _account: &AccountHandle,
        _update: ProfileUpdate,
    ) -> Result<(), ClientError> {
        self.calls.update_profile.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.reject_profile.lock().unwrap().take() {
            return Err(err);
        }
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    fn session_changes(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

// ---------------------------------------------------------------- documents

type Emission = Result<Snapshot, ClientError>;

#[derive(Default)]
pub struct FakeDocuments {
    pub appended: Mutex<Vec<NewMessage>>,
    pub fail_append: AtomicBool,
    pub subscriptions: AtomicUsize,
    feeds: Mutex<Vec<mpsc::UnboundedSender<Emission>>>,
    pub subscribed: Notify,
}

impl FakeDocuments {
    pub fn appended(&self) -> Vec<NewMessage> {
        self.appended.lock().unwrap().clone()
    }

    /// Push an emission into the most recent live query. Returns false if nobody listens.
    pub fn emit(&self, emission: Emission) -> bool {
        match self.feeds.lock().unwrap().last() {
            Some(feed) => feed.send(emission).is_ok(),
            None => false,
        }
    }

    pub fn emit_snapshot(&self, snapshot: Snapshot) -> bool {
        self.emit(Ok(snapshot))
    }

    /// Wait until at least `count` live queries have been attached.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        loop {
            let notified = self.subscribed.notified();
            if self.subscriptions.load(Ordering::SeqCst) >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DocumentService for FakeDocuments {
    async fn append(&self, record: NewMessage) -> Result<String, ClientError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(ClientError::backend("permission-denied", "Missing or insufficient permissions."));
        }
        let mut appended = self.appended.lock().unwrap();
        appended.push(record);
        Ok(format!("doc-{}", appended.len()))
    }

    async fn live_query(&self) -> Result<SnapshotStream, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap().push(tx);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.subscribed.notify_waiters();

        let emissions = stream::unfold(rx, |mut rx| async move {
            let next = rx.recv().await?;
            Some((next, rx))
        });
        Ok(emissions.boxed())
    }
}

// ---------------------------------------------------------------- storage

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<(String, Vec<u8>, String)>>,
    pub fail_upload: AtomicBool,
    pub fail_url: AtomicBool,
}

impl FakeStorage {
    pub fn uploads(&self) -> Vec<(String, Vec<u8>, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, ClientError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(ClientError::backend("storage/quota-exceeded", "Quota exceeded."));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), bytes, content_type.to_string()));
        Ok(StoredObject {
            path: path.to_string(),
        })
    }

    async fn download_url(&self, object: &StoredObject) -> Result<String, ClientError> {
        if self.fail_url.load(Ordering::SeqCst) {
            return Err(ClientError::backend("storage/unknown", "url unavailable"));
        }
        Ok(format!("https://cdn.test/{}", object.path))
    }
}

// ---------------------------------------------------------------- key-value

#[derive(Default)]
pub struct MemoryKv {
    pub slots: Mutex<HashMap<String, String>>,
    pub fail: AtomicBool,
}

impl MemoryKv {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: &str) {
        self.slots
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Storage("quota exceeded".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.check()?;
        self.put(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.check()?;
        self.slots.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------- device

#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<(String, String)>>,
    pub banners: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn banners(&self) -> Vec<String> {
        self.banners.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn banner(&self, message: &str) {
        self.banners.lock().unwrap().push(message.to_string());
    }
}

pub struct FakeMediaLibrary {
    pub granted: bool,
    pub picked: Option<PickedImage>,
    pub picks: AtomicUsize,
}

impl FakeMediaLibrary {
    pub fn picking(base64: Option<&str>) -> Self {
        FakeMediaLibrary {
            granted: true,
            picked: Some(PickedImage {
                base64: base64.map(str::to_string),
                content_type: "image/jpeg".to_string(),
            }),
            picks: AtomicUsize::new(0),
        }
    }

    pub fn cancelling() -> Self {
        FakeMediaLibrary {
            granted: true,
            picked: None,
            picks: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        FakeMediaLibrary {
            granted: false,
            picked: None,
            picks: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaLibrary for FakeMediaLibrary {
    async fn request_permission(&self) -> Result<bool, ClientError> {
        Ok(self.granted)
    }

    async fn pick_image(&self) -> Result<Option<PickedImage>, ClientError> {
        self.picks.fetch_add(1, Ordering::SeqCst);
        Ok(self.picked.clone())
    }
}

// ---------------------------------------------------------------- harness

pub struct Harness {
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub documents: Arc<FakeDocuments>,
    pub storage: Arc<FakeStorage>,
    pub kv: Arc<MemoryKv>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(identity: FakeIdentity) -> Self {
        let identity = Arc::new(identity);
        let documents = Arc::new(FakeDocuments::default());
        let storage = Arc::new(FakeStorage::default());
        let kv = Arc::new(MemoryKv::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState::new(
            identity.clone(),
            documents.clone(),
            storage.clone(),
            kv.clone(),
            notifier.clone(),
            Arc::new(test_config()),
        );

        Harness {
            state,
            identity,
            documents,
            storage,
            kv,
            notifier,
        }
    }

    pub fn signed_in_as(uid: &str) -> Self {
        Self::new(FakeIdentity::signed_in(session(uid, "Rina")))
    }

    pub fn mirror_key(&self) -> String {
        self.state.config.mirror_key.clone()
    }

    pub fn mirrored(&self) -> Option<Vec<Message>> {
        self.kv
            .raw(&self.mirror_key())
            .map(|raw| serde_json::from_str(&raw).expect("mirror is valid json"))
    }
}
