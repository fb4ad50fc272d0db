//! Rooms and round rules for Whodunit.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! membership, host and active round. Rooms of one game share a
//! [`RoomRegistry`], which maps room codes to running rooms.
//!
//! # Key types
//!
//! - [`Ruleset`]: the trait each game implements ([`BlendIn`], [`Elimination`])
//! - [`RoomRegistry`]: creates/destroys rooms, routes players
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`GameRules`]: per-game policy (player limits, clue turns, scoring)
//! - [`WordBank`]: categories secrets are drawn from

mod config;
mod error;
mod logic;
mod registry;
mod room;
mod roster;
mod tally;
mod words;

pub mod blend_in;
pub mod elimination;

pub use blend_in::BlendIn;
pub use config::{DEFAULT_CODE_ALPHABET, GameRules};
pub use elimination::Elimination;
pub use error::{ActionError, RoomError, WordBankError};
pub use logic::{Outbox, RoundContext, Ruleset};
pub use registry::RoomRegistry;
pub use room::{PlayerSender, RoomHandle, RoomInfo};
pub use roster::{Player, Roster};
pub use tally::{Ballots, Tally, quorum_reached};
pub use words::{Category, WordBank};
