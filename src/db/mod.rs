//! Embedded development backend.
//!
//! Implements the identity, document and object-storage seams on top of a
//! local SQLite file so the client can run without a hosted backend.

pub mod blobs;
pub mod kv;
pub mod messages;
pub mod models;
pub mod sessions;
pub mod users;

pub use blobs::FsObjectStorage;
pub use kv::SqliteKeyValueStore;
pub use messages::MessageRepository;
pub use models::{DeviceSession, MessageRow, User};
pub use sessions::SessionRepository;
pub use users::UserRepository;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tokio::sync::{watch, Mutex};

use crate::api::auth::secret_too_short;
use crate::config::Config;
use crate::crypto::PasswordDigest;
use crate::error::ClientError;
use crate::models::{AccountHandle, Message, NewMessage, ProfileUpdate, Session};
use crate::services::{DocumentService, IdentityService, SessionState, Snapshot, SnapshotStream};

/// Open (creating if needed) the local database and run migrations.
pub async fn connect(config: &Config) -> Result<Pool<Sqlite>, ClientError> {
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub struct LocalBackend {
    pool: Pool<Sqlite>,
    session_expiry_hours: i64,
    session_tx: watch::Sender<SessionState>,
    token: Mutex<Option<String>>,
    revision_tx: watch::Sender<u64>,
}

impl LocalBackend {
    /// Build the backend and resolve the cached session from the last run.
    pub async fn open(pool: Pool<Sqlite>, config: &Config) -> Result<Self, ClientError> {
        let (session_tx, _) = watch::channel(SessionState::Uninitialized);
        let (revision_tx, _) = watch::channel(0u64);

        let backend = LocalBackend {
            pool,
            session_expiry_hours: config.session_expiry_hours,
            session_tx,
            token: Mutex::new(None),
            revision_tx,
        };
        backend.restore_session().await?;

        Ok(backend)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn restore_session(&self) -> Result<(), ClientError> {
        let removed = SessionRepository::cleanup_expired(&self.pool).await?;
        if removed > 0 {
            tracing::debug!(removed, "expired device sessions cleaned up");
        }

        let mut restored = None;
        if let Some(device) = SessionRepository::latest_active(&self.pool).await? {
            match UserRepository::get_by_id(&self.pool, &device.user_id).await? {
                Some(user) => {
                    tracing::info!(uid = %user.id, "restored cached session");
                    *self.token.lock().await = Some(device.token);
                    restored = Some(user.to_session());
                }
                None => SessionRepository::delete(&self.pool, &device.token).await?,
            }
        }

        self.session_tx.send_replace(SessionState::Resolved(restored));
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String, ClientError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid {
        return Err(ClientError::backend(
            "auth/invalid-email",
            "The email address is badly formatted.",
        ));
    }
    Ok(email)
}

fn invalid_credential() -> ClientError {
    ClientError::backend("auth/invalid-credential", "Invalid email or password.")
}

async fn load_snapshot(pool: &Pool<Sqlite>) -> Result<Snapshot, ClientError> {
    let rows = MessageRepository::list_ordered(pool).await?;
    Ok(rows.into_iter().map(Message::from).collect())
}

#[async_trait]
impl IdentityService for LocalBackend {
    async fn create_account(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<AccountHandle, ClientError> {
        let email = normalize_email(email)?;
        if secret_too_short(secret) {
            return Err(ClientError::backend(
                "auth/weak-password",
                "Password should be at least 6 characters.",
            ));
        }

        if UserRepository::get_by_email(&self.pool, &email).await?.is_some() {
            return Err(ClientError::backend(
                "auth/email-already-in-use",
                "The email address is already in use by another account.",
            ));
        }

        let digest = PasswordDigest::derive(secret)?;
        let user = UserRepository::create(&self.pool, &email, &digest).await?;
        tracing::info!(uid = %user.id, "account created");

        Ok(AccountHandle {
            uid: user.id,
            email: user.email,
        })
    }

    async fn sign_in(&self, email: &str, secret: &str) -> Result<Session, ClientError> {
        let email = normalize_email(email)?;

        let user = UserRepository::get_by_email(&self.pool, &email)
            .await?
            .ok_or_else(invalid_credential)?;

        let digest = PasswordDigest::from_stored(&user.password_hash, &user.password_salt)?;
        if !digest.matches(secret)? {
            return Err(invalid_credential());
        }

        let device =
            SessionRepository::create(&self.pool, &user.id, self.session_expiry_hours).await?;
        let previous = self.token.lock().await.replace(device.token);
        if let Some(previous) = previous {
            SessionRepository::delete(&self.pool, &previous).await?;
        }

        let session = user.to_session();
        self.session_tx
            .send_replace(SessionState::Resolved(Some(session.clone())));
        tracing::info!(uid = %session.uid, "signed in");

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        if let Some(token) = self.token.lock().await.take() {
            SessionRepository::delete(&self.pool, &token).await?;
        }
        self.session_tx.send_replace(SessionState::Resolved(None));
        tracing::info!("signed out");
        Ok(())
    }

    async fn update_profile(
        &self,
        account: &AccountHandle,
        update: ProfileUpdate,
    ) -> Result<(), ClientError> {
        let found = UserRepository::set_display_name(
            &self.pool,
            &account.uid,
            update.display_name.as_deref(),
        )
        .await?;
        if !found {
            return Err(ClientError::backend(
                "auth/user-not-found",
                "There is no user record corresponding to this identifier.",
            ));
        }

        self.session_tx.send_if_modified(|state| match state {
            SessionState::Resolved(Some(session)) if session.uid == account.uid => {
                session.display_name = update.display_name.clone();
                true
            }
            _ => false,
        });

        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session_tx.borrow().session().cloned()
    }

    fn session_changes(&self) -> watch::Receiver<SessionState> {
        self.session_tx.subscribe()
    }
}

#[async_trait]
impl DocumentService for LocalBackend {
    async fn append(&self, record: NewMessage) -> Result<String, ClientError> {
        let row = MessageRepository::create(&self.pool, &record).await?;
        tracing::debug!(id = %row.id, seq = row.seq, "message appended");
        self.revision_tx.send_modify(|revision| *revision += 1);
        Ok(row.id)
    }

    async fn live_query(&self) -> Result<SnapshotStream, ClientError> {
        let pool = self.pool.clone();
        let mut revisions = self.revision_tx.subscribe();
        let _ = revisions.borrow_and_update();

        // First poll yields the current collection; later polls wait for an append.
        let snapshots = stream::unfold(
            (pool, revisions, true),
            |(pool, mut revisions, first)| async move {
                if !first && revisions.changed().await.is_err() {
                    return None;
                }
                let _ = revisions.borrow_and_update();
                let snapshot = load_snapshot(&pool).await;
                Some((snapshot, (pool, revisions, false)))
            },
        );

        Ok(snapshots.boxed())
    }
}
