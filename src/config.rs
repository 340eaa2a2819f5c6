//! Server configuration from environment variables

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Timings and policy flags the coordinator needs at runtime
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// How long the result is shown before the next round is dealt
    pub round_end_delay: Duration,
    /// Bot think-time range (inclusive)
    pub bot_delay_min: Duration,
    pub bot_delay_max: Duration,
    /// Hide submission authors until a winner is picked
    pub blind_judging: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_end_delay: Duration::from_secs(5),
            bot_delay_min: Duration::from_millis(1500),
            bot_delay_max: Duration::from_millis(4000),
            blind_judging: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Origins allowed to open the channel; empty means permissive
    pub allowed_origins: Vec<String>,
    pub card_deck_path: Option<PathBuf>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            allowed_origins: Vec::new(),
            card_deck_path: None,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = parse_env("PORT").unwrap_or(defaults.port);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        let card_deck_path = std::env::var("CARD_DECK_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let round_end_delay = parse_env("ROUND_END_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.game.round_end_delay);

        let mut bot_delay_min = parse_env("BOT_DELAY_MIN_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.game.bot_delay_min);
        let bot_delay_max = parse_env("BOT_DELAY_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.game.bot_delay_max);
        if bot_delay_min > bot_delay_max {
            tracing::warn!(
                "BOT_DELAY_MIN_MS ({:?}) exceeds BOT_DELAY_MAX_MS ({:?}), clamping",
                bot_delay_min,
                bot_delay_max
            );
            bot_delay_min = bot_delay_max;
        }

        let blind_judging = std::env::var("BLIND_JUDGING")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let config = Self {
            port,
            allowed_origins,
            card_deck_path,
            game: GameConfig {
                round_end_delay,
                bot_delay_min,
                bot_delay_max,
                blind_judging,
            },
        };

        tracing::info!(
            "Config: port={}, origins={:?}, deck={:?}, round_end={:?}, bots={:?}..{:?}, blind_judging={}",
            config.port,
            config.allowed_origins,
            config.card_deck_path,
            config.game.round_end_delay,
            config.game.bot_delay_min,
            config.game.bot_delay_max,
            config.game.blind_judging
        );

        config
    }

    /// Socket address to bind the server to (all interfaces)
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
