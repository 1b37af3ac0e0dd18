use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "discord-community-bot", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "COMMUNITY_BOT_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,
}
