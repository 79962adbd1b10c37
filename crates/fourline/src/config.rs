//! Server configuration.

use std::time::Duration;

use fourline_lobby::MatchmakingConfig;
use fourline_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// Default: `127.0.0.1:8000`.
    pub bind_addr: String,

    pub matchmaking: MatchmakingConfig,

    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            matchmaking: MatchmakingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment.
    ///
    /// | variable                        | field                        |
    /// |---------------------------------|------------------------------|
    /// | `FOURLINE_BIND`                 | `bind_addr`                  |
    /// | `PORT`                          | `bind_addr` as `0.0.0.0:PORT`|
    /// | `FOURLINE_BOT_FALLBACK_SECS`    | `matchmaking.bot_fallback`   |
    /// | `FOURLINE_RECONNECT_GRACE_SECS` | `session.reconnect_grace`    |
    /// | `FOURLINE_BOT_MOVE_DELAY_MS`    | `session.bot_move_delay`     |
    ///
    /// `FOURLINE_BIND` wins over `PORT`. Unset variables keep the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("FOURLINE_BIND") {
            config.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = parse_number("PORT", &port)?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(raw) = lookup("FOURLINE_BOT_FALLBACK_SECS") {
            config.matchmaking.bot_fallback =
                Duration::from_secs(parse_number("FOURLINE_BOT_FALLBACK_SECS", &raw)?);
        }
        if let Some(raw) = lookup("FOURLINE_RECONNECT_GRACE_SECS") {
            config.session.reconnect_grace =
                Duration::from_secs(parse_number("FOURLINE_RECONNECT_GRACE_SECS", &raw)?);
        }
        if let Some(raw) = lookup("FOURLINE_BOT_MOVE_DELAY_MS") {
            config.session.bot_move_delay =
                Duration::from_millis(parse_number("FOURLINE_BOT_MOVE_DELAY_MS", &raw)?);
        }

        Ok(config)
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
