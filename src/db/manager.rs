use crate::config::{DatabaseConfig as ConfigDatabaseConfig, DbType as ConfigDbType};
use crate::db::{DatabaseError, StarboardStore, TagStore, UserStore};
use std::sync::Arc;

#[cfg(feature = "postgres")]
use crate::db::postgres::{PostgresStarboardStore, PostgresTagStore, PostgresUserStore};
#[cfg(feature = "postgres")]
use diesel::RunQueryDsl;
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "postgres")]
use diesel::r2d2::{self, ConnectionManager};

#[cfg(feature = "postgres")]
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{SqliteStarboardStore, SqliteTagStore, SqliteUserStore};
#[cfg(feature = "sqlite")]
use diesel::Connection;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "postgres")]
    postgres_pool: Option<Pool>,
    #[cfg(feature = "sqlite")]
    sqlite_path: Option<String>,
    starboard_store: Arc<dyn StarboardStore>,
    tag_store: Arc<dyn TagStore>,
    user_store: Arc<dyn UserStore>,
    db_type: DbType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

impl From<ConfigDbType> for DbType {
    fn from(value: ConfigDbType) -> Self {
        match value {
            ConfigDbType::Postgres => DbType::Postgres,
            ConfigDbType::Sqlite => DbType::Sqlite,
        }
    }
}

impl DatabaseManager {
    pub async fn new(config: &ConfigDatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = DbType::from(config.db_type());

        match db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let connection_string = config.connection_string();
                let max_connections = config.max_connections();
                let min_connections = config.min_connections();

                let manager = ConnectionManager::<PgConnection>::new(connection_string);

                let builder = r2d2::Pool::builder()
                    .max_size(max_connections.unwrap_or(10))
                    .min_idle(Some(min_connections.unwrap_or(1)));

                let pool = builder
                    .build(manager)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;

                let starboard_store = Arc::new(PostgresStarboardStore::new(pool.clone()));
                let tag_store = Arc::new(PostgresTagStore::new(pool.clone()));
                let user_store = Arc::new(PostgresUserStore::new(pool.clone()));

                Ok(Self {
                    postgres_pool: Some(pool),
                    #[cfg(feature = "sqlite")]
                    sqlite_path: None,
                    starboard_store,
                    tag_store,
                    user_store,
                    db_type,
                })
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config
                    .sqlite_path()
                    .ok_or_else(|| DatabaseError::Connection("missing sqlite path".to_string()))?;
                let path_arc = Arc::new(path.clone());

                let starboard_store = Arc::new(SqliteStarboardStore::new(path_arc.clone()));
                let tag_store = Arc::new(SqliteTagStore::new(path_arc.clone()));
                let user_store = Arc::new(SqliteUserStore::new(path_arc));

                Ok(Self {
                    #[cfg(feature = "postgres")]
                    postgres_pool: None,
                    sqlite_path: Some(path),
                    starboard_store,
                    tag_store,
                    user_store,
                    db_type,
                })
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Connection(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Connection(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = self
                    .postgres_pool
                    .as_ref()
                    .ok_or_else(|| DatabaseError::Migration("postgres pool missing".to_string()))?;
                Self::migrate_postgres(pool).await
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = self
                    .sqlite_path
                    .as_ref()
                    .ok_or_else(|| DatabaseError::Migration("sqlite path missing".to_string()))?;
                Self::migrate_sqlite(path).await
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Migration(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Migration(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    #[cfg(feature = "postgres")]
    async fn migrate_postgres(pool: &Pool) -> Result<(), DatabaseError> {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS starboard_entries (
                    id BIGSERIAL PRIMARY KEY,
                    source_message_id TEXT NOT NULL UNIQUE,
                    source_channel_id TEXT NOT NULL,
                    author_id TEXT NOT NULL,
                    highlight_message_id TEXT,
                    star_count BIGINT NOT NULL DEFAULT 0,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS tags (
                    id BIGSERIAL PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id BIGSERIAL PRIMARY KEY,
                    discord_user_id TEXT NOT NULL UNIQUE,
                    flags BIGINT NOT NULL DEFAULT 0,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_starboard_entries_source ON starboard_entries(source_message_id)",
                "CREATE INDEX IF NOT EXISTS idx_starboard_entries_author ON starboard_entries(author_id)",
                "CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name)",
                "CREATE INDEX IF NOT EXISTS idx_users_discord_id ON users(discord_user_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(feature = "sqlite")]
    async fn migrate_sqlite(path: &str) -> Result<(), DatabaseError> {
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = SqliteConnection::establish(&path)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS starboard_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source_message_id TEXT NOT NULL UNIQUE,
                    source_channel_id TEXT NOT NULL,
                    author_id TEXT NOT NULL,
                    highlight_message_id TEXT,
                    star_count BIGINT NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS tags (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    discord_user_id TEXT NOT NULL UNIQUE,
                    flags BIGINT NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_starboard_entries_source ON starboard_entries(source_message_id)",
                "CREATE INDEX IF NOT EXISTS idx_starboard_entries_author ON starboard_entries(author_id)",
                "CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name)",
                "CREATE INDEX IF NOT EXISTS idx_users_discord_id ON users(discord_user_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn starboard_store(&self) -> Arc<dyn StarboardStore> {
        self.starboard_store.clone()
    }

    pub fn tag_store(&self) -> Arc<dyn TagStore> {
        self.tag_store.clone()
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        self.user_store.clone()
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::NamedTempFile;

    use super::DatabaseManager;
    use crate::config::DatabaseConfig;
    use crate::db::StarboardEntry;

    fn sqlite_config(path: String) -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            filename: Some(path),
            max_connections: Some(1),
            min_connections: Some(1),
        }
    }

    #[tokio::test]
    async fn sqlite_starboard_entry_roundtrip() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let db_path = file.path().to_string_lossy().to_string();

        let config = sqlite_config(db_path);
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let now = Utc::now();
        let entry = StarboardEntry {
            id: 0,
            source_message_id: "msg-1".to_string(),
            source_channel_id: "chan-1".to_string(),
            author_id: "author-1".to_string(),
            highlight_message_id: Some("highlight-1".to_string()),
            star_count: 3,
            created_at: now,
            updated_at: now,
        };

        manager
            .starboard_store()
            .create_entry(&entry)
            .await
            .expect("insert entry");

        let inserted = manager
            .starboard_store()
            .find_entry("msg-1")
            .await
            .expect("query entry")
            .expect("entry exists");
        assert_eq!(inserted.star_count, 3);
        assert!(inserted.has_highlight());

        manager
            .starboard_store()
            .update_entry("msg-1", None, 0)
            .await
            .expect("reset entry");

        let reset = manager
            .starboard_store()
            .find_entry("msg-1")
            .await
            .expect("query entry after reset")
            .expect("entry survives reset");
        assert_eq!(reset.star_count, 0);
        assert!(!reset.has_highlight());

        let manager_reopened = DatabaseManager::new(&config)
            .await
            .expect("db manager reopened");
        manager_reopened.migrate().await.expect("migrate reopened");

        let by_author = manager_reopened
            .starboard_store()
            .entries_by_author("author-1")
            .await
            .expect("query by author");
        assert_eq!(by_author.len(), 1);
    }

    #[tokio::test]
    async fn sqlite_tag_crud() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let db_path = file.path().to_string_lossy().to_string();

        let config = sqlite_config(db_path);
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let store = manager.tag_store();
        store.create_tag("guide", "read the guide").await.expect("create");
        store.create_tag("faq", "see the faq").await.expect("create second");

        let names = store.list_tag_names().await.expect("list");
        assert_eq!(names, vec!["faq".to_string(), "guide".to_string()]);

        store.update_tag("guide", "read the new guide").await.expect("update");
        let tag = store
            .find_tag("guide")
            .await
            .expect("find")
            .expect("tag exists");
        assert_eq!(tag.content, "read the new guide");

        store.delete_tag("guide").await.expect("delete");
        assert!(store.find_tag("guide").await.expect("find deleted").is_none());
    }

    #[tokio::test]
    async fn sqlite_user_flags_upsert() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let db_path = file.path().to_string_lossy().to_string();

        let config = sqlite_config(db_path);
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let store = manager.user_store();
        assert!(store.find_by_discord_id("42").await.expect("miss").is_none());

        store.upsert_flags("42", 0b101).await.expect("insert");
        let user = store
            .find_by_discord_id("42")
            .await
            .expect("find")
            .expect("user exists");
        assert_eq!(user.flags, 0b101);

        store.upsert_flags("42", 0b001).await.expect("update");
        let user = store
            .find_by_discord_id("42")
            .await
            .expect("find updated")
            .expect("user exists");
        assert_eq!(user.flags, 0b001);
    }
}
