use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use once_cell::sync::Lazy;

/// Timeouts for outbound OpenMensa requests. A slow upstream must surface as
/// a fetch error, never hang a dialogue turn.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The canteen list barely changes, so the local mirror is refreshed at most
/// once per interval even though the check runs on every request.
pub const MENSA_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Per-canteen cooldown for persisting dishes out of a fetched menu.
pub const DISH_UPDATE_COOLDOWN: Duration = Duration::from_secs(6 * 60 * 60);

pub static CONFIG: Lazy<Config> = Lazy::new(Config::parse);

#[derive(Parser, Debug)]
#[command(name = "mensa-service-rs", version, about)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "MENSA_BIND", default_value = "0.0.0.0:12080")]
    pub bind: String,

    /// Base URL of the OpenMensa v2 API.
    #[arg(
        long,
        env = "OPENMENSA_ENDPOINT",
        default_value = "https://openmensa.org/api/v2"
    )]
    pub openmensa_endpoint: String,

    /// SQLite database file. Defaults to the platform data directory.
    #[arg(long, env = "MENSA_DATABASE")]
    pub database: Option<PathBuf>,

    /// Cap for the numbered canteen disambiguation list.
    #[arg(long, env = "MENSA_MAX_CANDIDATES", default_value_t = 20)]
    pub max_candidates: usize,

    /// Conversation contexts idle longer than this are evicted.
    #[arg(long, env = "MENSA_CONTEXT_TTL_HOURS", default_value_t = 24)]
    pub context_ttl_hours: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "MENSA_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mensa-service")
                .join("data.sqlite"),
        }
    }

    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_hours * 60 * 60)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
