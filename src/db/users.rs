use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::crypto::PasswordDigest;
use crate::db::models::User;
use crate::error::ClientError;

pub struct UserRepository;

impl UserRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        email: &str,
        digest: &PasswordDigest,
    ) -> Result<User, ClientError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp_millis();

        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (id, email, display_name, password_hash, password_salt, created_at)
VALUES (?, ?, NULL, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(digest.hash.as_slice())
        .bind(digest.salt.as_slice())
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(
        pool: &Pool<Sqlite>,
        email: &str,
    ) -> Result<Option<User>, ClientError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<User>, ClientError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Returns `false` when no user has the given id.
    pub async fn set_display_name(
        pool: &Pool<Sqlite>,
        id: &str,
        display_name: Option<&str>,
    ) -> Result<bool, ClientError> {
        let result = sqlx::query("UPDATE users SET display_name = ? WHERE id = ?")
            .bind(display_name)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
