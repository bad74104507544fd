use sqlx::FromRow;

use crate::models::{Message, Session};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
    pub created_at: i64,
}

impl User {
    pub fn to_session(&self) -> Session {
        Session {
            uid: self.id.clone(),
            display_name: self.display_name.clone(),
            email: Some(self.email.clone()),
        }
    }
}

/// Persisted sign-in for this device.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceSession {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub seq: i64,
    pub id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub author_id: String,
    pub author_display_name: String,
    pub created_at: i64, // epoch millis, assigned on insert
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            text: row.text,
            image_url: row.image_url,
            author_id: row.author_id,
            author_display_name: row.author_display_name,
            created_at: chrono::DateTime::from_timestamp_millis(row.created_at),
        }
    }
}
