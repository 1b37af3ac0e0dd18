pub use self::parser::{
    BotConfig, Config, DatabaseConfig, DbType, LoggingConfig, MenuConfig, RoleSyncConfig,
    SnipeConfig, StarboardChannelConfig, TierConfig, WelcomeConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
