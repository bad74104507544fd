use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::DeviceSession;
use crate::error::ClientError;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        user_id: &str,
        expiry_hours: i64,
    ) -> Result<DeviceSession, ClientError> {
        let id = Uuid::new_v4().to_string();
        let token = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();
        let expires_at = created_at + (expiry_hours * 3600);

        let session = sqlx::query_as::<_, DeviceSession>(
            r#"
INSERT INTO sessions (id, user_id, token, expires_at, created_at)
VALUES (?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Most recent unexpired session on this device, if any.
    pub async fn latest_active(pool: &Pool<Sqlite>) -> Result<Option<DeviceSession>, ClientError> {
        let now = chrono::Utc::now().timestamp();

        let session = sqlx::query_as::<_, DeviceSession>(
            "SELECT * FROM sessions WHERE expires_at > ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    pub async fn delete(pool: &Pool<Sqlite>, token: &str) -> Result<(), ClientError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn cleanup_expired(pool: &Pool<Sqlite>) -> Result<u64, ClientError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
