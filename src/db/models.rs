use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per source message that ever crossed the starboard threshold.
/// Rows are reset (counter zeroed, highlight cleared), never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarboardEntry {
    pub id: i64,
    pub source_message_id: String,
    pub source_channel_id: String,
    pub author_id: String,
    pub highlight_message_id: Option<String>,
    pub star_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StarboardEntry {
    pub fn has_highlight(&self) -> bool {
        self.highlight_message_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub discord_user_id: String,
    pub flags: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
