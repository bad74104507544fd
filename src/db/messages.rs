use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::MessageRow;
use crate::error::ClientError;
use crate::models::NewMessage;

pub struct MessageRepository;

impl MessageRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        record: &NewMessage,
    ) -> Result<MessageRow, ClientError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
INSERT INTO messages (id, text, image_url, author_id, author_display_name, created_at)
VALUES (?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(record.text.as_deref())
        .bind(record.image_url.as_deref())
        .bind(&record.author_id)
        .bind(&record.author_display_name)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Whole collection, oldest first. Insertion order breaks timestamp ties.
    pub async fn list_ordered(pool: &Pool<Sqlite>) -> Result<Vec<MessageRow>, ClientError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
SELECT seq, id, text, image_url, author_id, author_display_name, created_at
FROM messages
ORDER BY created_at ASC, seq ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
