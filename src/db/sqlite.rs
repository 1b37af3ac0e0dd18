use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::schema_sqlite::{starboard_entries, tags, users};

use super::{
    DatabaseError,
    models::{StarboardEntry, Tag, UserRecord},
};

fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))
}

// SQLite INTEGER primary keys come back as i32; the public models keep i64.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = starboard_entries)]
struct DbStarboardEntry {
    id: i32,
    source_message_id: String,
    source_channel_id: String,
    author_id: String,
    highlight_message_id: Option<String>,
    star_count: i64,
    created_at: String,
    updated_at: String,
}

impl DbStarboardEntry {
    fn to_entry(&self) -> Result<StarboardEntry, DatabaseError> {
        Ok(StarboardEntry {
            id: self.id as i64,
            source_message_id: self.source_message_id.clone(),
            source_channel_id: self.source_channel_id.clone(),
            author_id: self.author_id.clone(),
            highlight_message_id: self.highlight_message_id.clone(),
            star_count: self.star_count,
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = starboard_entries)]
struct NewStarboardEntry<'a> {
    source_message_id: &'a str,
    source_channel_id: &'a str,
    author_id: &'a str,
    highlight_message_id: Option<&'a str>,
    star_count: i64,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tags)]
struct DbTag {
    id: i32,
    name: String,
    content: String,
    created_at: String,
    updated_at: String,
}

impl DbTag {
    fn to_tag(&self) -> Result<Tag, DatabaseError> {
        Ok(Tag {
            id: self.id as i64,
            name: self.name.clone(),
            content: self.content.clone(),
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = tags)]
struct NewTag<'a> {
    name: &'a str,
    content: &'a str,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
struct DbUserRecord {
    id: i32,
    discord_user_id: String,
    flags: i64,
    created_at: String,
    updated_at: String,
}

impl DbUserRecord {
    fn to_record(&self) -> Result<UserRecord, DatabaseError> {
        Ok(UserRecord {
            id: self.id as i64,
            discord_user_id: self.discord_user_id.clone(),
            flags: self.flags,
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUserRecord<'a> {
    discord_user_id: &'a str,
    flags: i64,
    created_at: String,
    updated_at: String,
}

pub struct SqliteStarboardStore {
    db_path: Arc<String>,
}

impl SqliteStarboardStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::StarboardStore for SqliteStarboardStore {
    async fn find_entry(
        &self,
        message_id: &str,
    ) -> Result<Option<StarboardEntry>, DatabaseError> {
        let message_id = message_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::starboard_entries::dsl::*;
            starboard_entries
                .filter(source_message_id.eq(message_id))
                .select(DbStarboardEntry::as_select())
                .first::<DbStarboardEntry>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|e| e.to_entry())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn create_entry(&self, entry: &StarboardEntry) -> Result<(), DatabaseError> {
        let entry = entry.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let new_entry = NewStarboardEntry {
                source_message_id: &entry.source_message_id,
                source_channel_id: &entry.source_channel_id,
                author_id: &entry.author_id,
                highlight_message_id: entry.highlight_message_id.as_deref(),
                star_count: entry.star_count,
                created_at: datetime_to_string(&entry.created_at),
                updated_at: datetime_to_string(&entry.updated_at),
            };

            diesel::insert_into(starboard_entries::table)
                .values(&new_entry)
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn update_entry(
        &self,
        message_id: &str,
        highlight: Option<&str>,
        stars: i64,
    ) -> Result<(), DatabaseError> {
        let message_id = message_id.to_string();
        let highlight = highlight.map(str::to_string);
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::starboard_entries::dsl::*;
            diesel::update(starboard_entries.filter(source_message_id.eq(message_id)))
                .set((
                    highlight_message_id.eq(highlight),
                    star_count.eq(stars),
                    updated_at.eq(datetime_to_string(&Utc::now())),
                ))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn entries_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<StarboardEntry>, DatabaseError> {
        let author = author.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::starboard_entries::dsl::*;
            starboard_entries
                .filter(author_id.eq(author))
                .order(star_count.desc())
                .select(DbStarboardEntry::as_select())
                .load::<DbStarboardEntry>(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .iter()
                .map(|e| e.to_entry())
                .collect()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteTagStore {
    db_path: Arc<String>,
}

impl SqliteTagStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::TagStore for SqliteTagStore {
    async fn find_tag(&self, tag_name: &str) -> Result<Option<Tag>, DatabaseError> {
        let tag_name = tag_name.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::tags::dsl::*;
            tags.filter(name.eq(tag_name))
                .select(DbTag::as_select())
                .first::<DbTag>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|t| t.to_tag())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn list_tag_names(&self) -> Result<Vec<String>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::tags::dsl::*;
            tags.order(name.asc())
                .select(name)
                .load::<String>(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn create_tag(&self, tag_name: &str, tag_content: &str) -> Result<(), DatabaseError> {
        let tag_name = tag_name.to_string();
        let tag_content = tag_content.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let now = datetime_to_string(&Utc::now());
            let new_tag = NewTag {
                name: &tag_name,
                content: &tag_content,
                created_at: now.clone(),
                updated_at: now,
            };

            diesel::insert_into(tags::table)
                .values(&new_tag)
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn update_tag(&self, tag_name: &str, tag_content: &str) -> Result<(), DatabaseError> {
        let tag_name = tag_name.to_string();
        let tag_content = tag_content.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::tags::dsl::*;
            diesel::update(tags.filter(name.eq(tag_name)))
                .set((
                    content.eq(tag_content),
                    updated_at.eq(datetime_to_string(&Utc::now())),
                ))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn delete_tag(&self, tag_name: &str) -> Result<(), DatabaseError> {
        let tag_name = tag_name.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::tags::dsl::*;
            diesel::delete(tags.filter(name.eq(tag_name)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteUserStore {
    db_path: Arc<String>,
}

impl SqliteUserStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::UserStore for SqliteUserStore {
    async fn find_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let discord_id = discord_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::users::dsl::*;
            users
                .filter(discord_user_id.eq(discord_id))
                .select(DbUserRecord::as_select())
                .first::<DbUserRecord>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|u| u.to_record())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn upsert_flags(&self, discord_id: &str, new_flags: i64) -> Result<(), DatabaseError> {
        let discord_id = discord_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::users::dsl::*;
            let now = datetime_to_string(&Utc::now());
            let new_record = NewUserRecord {
                discord_user_id: &discord_id,
                flags: new_flags,
                created_at: now.clone(),
                updated_at: now.clone(),
            };

            diesel::insert_into(users)
                .values(&new_record)
                .on_conflict(discord_user_id)
                .do_update()
                .set((flags.eq(new_flags), updated_at.eq(now)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}
