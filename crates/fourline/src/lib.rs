//! # fourline
//!
//! Online four-in-a-row match server.
//!
//! Clients connect over WebSocket, ask for a match under a display name,
//! and are paired first-come first-served. Anyone left waiting too long
//! plays the built-in bot instead. A player whose connection drops
//! mid-game has a grace period to come back before the opponent wins by
//! forfeit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fourline::prelude::*;
//!
//! # async fn start() -> Result<(), FourlineError> {
//! let config = ServerConfig::from_env()?;
//! let server = FourlineServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod router;
mod server;

pub use config::ServerConfig;
pub use error::{ConfigError, FourlineError};
pub use router::{ClientHandle, ConnectionRouter};
pub use server::{FourlineServer, FourlineServerBuilder, ServerContext};

pub mod prelude {
    pub use crate::{FourlineError, FourlineServer, ServerConfig, ServerContext};
    pub use fourline_lobby::MatchmakingConfig;
    pub use fourline_protocol::{ClientEvent, HumanId, Participant, ServerEvent, SessionId};
    pub use fourline_session::{InMemoryStore, MatchStore, SessionConfig};
}
