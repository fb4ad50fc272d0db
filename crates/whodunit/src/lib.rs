//! # Whodunit
//!
//! Real-time room server for social-deduction party games.
//!
//! Players connect over WebSocket, create or join a room by its short
//! code, and play rounds of one of two rulesets:
//!
//! - **blend-in** (path `/`): everyone but one player learns a secret word;
//!   clues, a vote, and a last-chance guess decide who scores.
//! - **elimination** (path `/elimination`): one hidden conspirator removes
//!   a player each night, and the table votes someone out each day.
//!
//! The server is authoritative: every room runs as its own task, and
//! clients only ever see what the rules allow them to see.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whodunit::prelude::*;
//!
//! # async fn run() -> Result<(), WhodunitError> {
//! let mut server = WhodunitServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use crate::config::{BIND_ENV, CONFIG_ENV, ConfigError, ServerConfig};
pub use error::WhodunitError;
pub use server::{GameRoute, WhodunitServer, WhodunitServerBuilder};

pub mod prelude {
    pub use crate::{
        ConfigError, GameRoute, ServerConfig, WhodunitError, WhodunitServer,
        WhodunitServerBuilder,
    };
    pub use whodunit_protocol::{
        AckResult, ClientFrame, Codec, ErrorCode, JsonCodec, PROTOCOL_VERSION, PlayerId,
        PlayerSummary, Request, RoomCode, RoomEvent, RoundPhase, ServerFrame, ServerPayload,
        TallyEntry,
    };
    pub use whodunit_room::blend_in::{BlendInAction, BlendInEvent, RoleCard};
    pub use whodunit_room::elimination::{EliminationAction, EliminationEvent, Faction};
    pub use whodunit_room::{BlendIn, Elimination, GameRules, RoomError, Ruleset, WordBank};
}
