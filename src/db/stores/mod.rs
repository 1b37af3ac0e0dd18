use async_trait::async_trait;

use super::DatabaseError;
use super::models::{StarboardEntry, Tag, UserRecord};

#[async_trait]
pub trait StarboardStore: Send + Sync {
    async fn find_entry(
        &self,
        source_message_id: &str,
    ) -> Result<Option<StarboardEntry>, DatabaseError>;
    async fn create_entry(&self, entry: &StarboardEntry) -> Result<(), DatabaseError>;
    /// Partial update: highlight id and counter only. `None` clears the
    /// highlight id.
    async fn update_entry(
        &self,
        source_message_id: &str,
        highlight_message_id: Option<&str>,
        star_count: i64,
    ) -> Result<(), DatabaseError>;
    async fn entries_by_author(
        &self,
        author_id: &str,
    ) -> Result<Vec<StarboardEntry>, DatabaseError>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, DatabaseError>;
    async fn list_tag_names(&self) -> Result<Vec<String>, DatabaseError>;
    async fn create_tag(&self, name: &str, content: &str) -> Result<(), DatabaseError>;
    async fn update_tag(&self, name: &str, content: &str) -> Result<(), DatabaseError>;
    async fn delete_tag(&self, name: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_discord_id(
        &self,
        discord_user_id: &str,
    ) -> Result<Option<UserRecord>, DatabaseError>;
    async fn upsert_flags(&self, discord_user_id: &str, flags: i64) -> Result<(), DatabaseError>;
}
