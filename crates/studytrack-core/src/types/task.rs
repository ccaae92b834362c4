//! Study plan records: tasks, their owners, and curated content.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a plan task.
///
/// Only `Pending` is read by the daily run; nothing in this workspace
/// writes a status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    #[serde(other)]
    Other,
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => TaskStatus::Pending,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Other => "other",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of curated material. Anything that is not a video renders with the
/// generic document icon.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    #[default]
    #[serde(other)]
    Other,
}

impl ContentType {
    /// Exact match, same as the serde mapping: only `video` is a video.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "video" => ContentType::Video,
            _ => ContentType::Other,
        }
    }
}

/// A missing or null content type is `Other`.
fn content_type_or_other<'de, D>(d: D) -> std::result::Result<ContentType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ContentType>::deserialize(d)?.unwrap_or_default())
}

/// A single day's study goal for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub scheduled_date: NaiveDate,
    pub status: TaskStatus,
}

/// The owner of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    /// WhatsApp number; unset until the user completes onboarding.
    #[serde(default)]
    pub whatsapp_phone: Option<String>,
}

impl Profile {
    /// The usable contact address, if any. Blank strings count as absent.
    pub fn contact_address(&self) -> Option<&str> {
        self.whatsapp_phone
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Curated learning material attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub title: String,
    pub url: String,
    #[serde(default, deserialize_with = "content_type_or_other")]
    pub content_type: ContentType,
}

/// A due task joined with its owner and optional content.
#[derive(Debug, Clone, PartialEq)]
pub struct DueTask {
    pub task: Task,
    pub profile: Profile,
    pub content: Option<ContentItem>,
}

/// Profile columns the store may update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    FullName,
    WhatsappPhone,
}

impl ProfileField {
    /// Column name in the `profiles` table.
    pub fn column(&self) -> &'static str {
        match self {
            ProfileField::FullName => "full_name",
            ProfileField::WhatsappPhone => "whatsapp_phone",
        }
    }
}
