use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::db::{DatabaseManager, TagStore, UserStore};

pub mod commands;
pub mod menu;
pub mod rolesync;
pub mod sniper;
pub mod starboard;
pub mod tags;
pub mod welcome;

pub use self::commands::CooldownMap;
pub use self::menu::MenuRegistry;
pub use self::sniper::SnipeCache;
pub use self::starboard::Starboard;

/// Process-scoped context: every piece of in-memory state the handlers touch
/// lives here, created at startup and cleared on shutdown. Handlers receive
/// it by reference; nothing is module-global.
pub struct BotCore {
    config: Arc<Config>,
    db: Arc<DatabaseManager>,
    pub starboard: Starboard,
    pub sniper: SnipeCache,
    pub menus: MenuRegistry,
    pub cooldowns: CooldownMap,
}

impl BotCore {
    pub fn new(config: Arc<Config>, db: Arc<DatabaseManager>) -> Self {
        let starboard = Starboard::new(&config.starboard, db.starboard_store());
        let sniper = SnipeCache::new(Duration::from_secs(config.snipe.lifetime_secs));

        Self {
            starboard,
            sniper,
            menus: MenuRegistry::default(),
            cooldowns: CooldownMap::default(),
            config,
            db,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tag_store(&self) -> Arc<dyn TagStore> {
        self.db.tag_store()
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        self.db.user_store()
    }

    pub fn menu_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.menu.idle_timeout_secs)
    }

    /// Drop all transient in-memory state. Persistent rows are untouched.
    pub fn shutdown(&self) {
        self.sniper.clear();
        self.menus.clear();
        self.cooldowns.clear();
        info!("core state cleared");
    }
}
