use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated identity as observed from the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Session {
    /// Name attached to outgoing messages and shown in the room header.
    pub fn author_name(&self) -> String {
        non_empty(self.display_name.as_deref())
            .or_else(|| non_empty(self.email.as_deref()))
            .unwrap_or("Anon")
            .to_string()
    }
}

/// Handle returned when an account is created, before any profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
}

/// One record of the shared message collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_display_name: String,
    /// Server-assigned; absent while the write is still pending.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Record handed to the collection on append. The backend assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub author_id: String,
    pub author_display_name: String,
}

impl NewMessage {
    pub fn text(author: &Session, text: impl Into<String>) -> Self {
        NewMessage {
            text: Some(text.into()),
            image_url: None,
            author_id: author.uid.clone(),
            author_display_name: author.author_name(),
        }
    }

    pub fn image(author: &Session, image_url: impl Into<String>) -> Self {
        NewMessage {
            text: Some(String::new()),
            image_url: Some(image_url.into()),
            author_id: author.uid.clone(),
            author_display_name: author.author_name(),
        }
    }
}

/// Location of an uploaded blob in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
}

/// Result of a gallery pick. `base64` is `None` when the picker could not read the image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub base64: Option<String>,
    pub content_type: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
