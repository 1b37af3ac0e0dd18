pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{StarboardEntry, Tag, UserRecord};
pub use self::stores::{StarboardStore, TagStore, UserStore};

pub mod error;
pub mod manager;
pub mod models;
pub mod schema;
pub mod stores;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
