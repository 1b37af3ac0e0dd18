use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::schema::{starboard_entries, tags, users};

use super::{
    DatabaseError,
    models::{StarboardEntry, Tag, UserRecord},
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = starboard_entries)]
struct DbStarboardEntry {
    id: i64,
    source_message_id: String,
    source_channel_id: String,
    author_id: String,
    highlight_message_id: Option<String>,
    star_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbStarboardEntry> for StarboardEntry {
    fn from(value: DbStarboardEntry) -> Self {
        Self {
            id: value.id,
            source_message_id: value.source_message_id,
            source_channel_id: value.source_channel_id,
            author_id: value.author_id,
            highlight_message_id: value.highlight_message_id,
            star_count: value.star_count,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
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
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tags)]
struct DbTag {
    id: i64,
    name: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbTag> for Tag {
    fn from(value: DbTag) -> Self {
        Self {
            id: value.id,
            name: value.name,
            content: value.content,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = tags)]
struct NewTag<'a> {
    name: &'a str,
    content: &'a str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
struct DbUserRecord {
    id: i64,
    discord_user_id: String,
    flags: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbUserRecord> for UserRecord {
    fn from(value: DbUserRecord) -> Self {
        Self {
            id: value.id,
            discord_user_id: value.discord_user_id,
            flags: value.flags,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUserRecord<'a> {
    discord_user_id: &'a str,
    flags: i64,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

pub struct PostgresStarboardStore {
    pool: Pool,
}

impl PostgresStarboardStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::StarboardStore for PostgresStarboardStore {
    async fn find_entry(
        &self,
        message_id: &str,
    ) -> Result<Option<StarboardEntry>, DatabaseError> {
        let pool = self.pool.clone();
        let message_id = message_id.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::starboard_entries::dsl::*;
            starboard_entries
                .filter(source_message_id.eq(message_id))
                .select(DbStarboardEntry::as_select())
                .first::<DbStarboardEntry>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn create_entry(&self, entry: &StarboardEntry) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let entry = entry.clone();
        with_connection(pool, move |conn| {
            let new_entry = NewStarboardEntry {
                source_message_id: &entry.source_message_id,
                source_channel_id: &entry.source_channel_id,
                author_id: &entry.author_id,
                highlight_message_id: entry.highlight_message_id.as_deref(),
                star_count: entry.star_count,
                created_at: &entry.created_at,
                updated_at: &entry.updated_at,
            };

            diesel::insert_into(starboard_entries::table)
                .values(&new_entry)
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn update_entry(
        &self,
        message_id: &str,
        highlight: Option<&str>,
        stars: i64,
    ) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let message_id = message_id.to_string();
        let highlight = highlight.map(str::to_string);
        with_connection(pool, move |conn| {
            use crate::db::schema::starboard_entries::dsl::*;
            diesel::update(starboard_entries.filter(source_message_id.eq(message_id)))
                .set((
                    highlight_message_id.eq(highlight),
                    star_count.eq(stars),
                    updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn entries_by_author(
        &self,
        author: &str,
    ) -> Result<Vec<StarboardEntry>, DatabaseError> {
        let pool = self.pool.clone();
        let author = author.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::starboard_entries::dsl::*;
            starboard_entries
                .filter(author_id.eq(author))
                .order(star_count.desc())
                .select(DbStarboardEntry::as_select())
                .load::<DbStarboardEntry>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}

pub struct PostgresTagStore {
    pool: Pool,
}

impl PostgresTagStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::TagStore for PostgresTagStore {
    async fn find_tag(&self, tag_name: &str) -> Result<Option<Tag>, DatabaseError> {
        let pool = self.pool.clone();
        let tag_name = tag_name.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::tags::dsl::*;
            tags.filter(name.eq(tag_name))
                .select(DbTag::as_select())
                .first::<DbTag>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn list_tag_names(&self) -> Result<Vec<String>, DatabaseError> {
        let pool = self.pool.clone();
        with_connection(pool, move |conn| {
            use crate::db::schema::tags::dsl::*;
            tags.order(name.asc())
                .select(name)
                .load::<String>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn create_tag(&self, tag_name: &str, tag_content: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let tag_name = tag_name.to_string();
        let tag_content = tag_content.to_string();
        with_connection(pool, move |conn| {
            let now = Utc::now();
            let new_tag = NewTag {
                name: &tag_name,
                content: &tag_content,
                created_at: &now,
                updated_at: &now,
            };

            diesel::insert_into(tags::table)
                .values(&new_tag)
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn update_tag(&self, tag_name: &str, tag_content: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let tag_name = tag_name.to_string();
        let tag_content = tag_content.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::tags::dsl::*;
            diesel::update(tags.filter(name.eq(tag_name)))
                .set((content.eq(tag_content), updated_at.eq(Utc::now())))
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn delete_tag(&self, tag_name: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let tag_name = tag_name.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::tags::dsl::*;
            diesel::delete(tags.filter(name.eq(tag_name)))
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}

pub struct PostgresUserStore {
    pool: Pool,
}

impl PostgresUserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::UserStore for PostgresUserStore {
    async fn find_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let pool = self.pool.clone();
        let discord_id = discord_id.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::users::dsl::*;
            users
                .filter(discord_user_id.eq(discord_id))
                .select(DbUserRecord::as_select())
                .first::<DbUserRecord>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn upsert_flags(&self, discord_id: &str, new_flags: i64) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let discord_id = discord_id.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::users::dsl::*;
            let now = Utc::now();
            let new_record = NewUserRecord {
                discord_user_id: &discord_id,
                flags: new_flags,
                created_at: &now,
                updated_at: &now,
            };

            diesel::insert_into(users)
                .values(&new_record)
                .on_conflict(discord_user_id)
                .do_update()
                .set((flags.eq(new_flags), updated_at.eq(now)))
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}
