//! Wire protocol for Whodunit.
//!
//! This crate defines everything that crosses a connection:
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`]): who is talking and which
//!   room the traffic is scoped to.
//! - **Frames** ([`ClientFrame`], [`Request`], [`ServerFrame`],
//!   [`ServerPayload`]): the closed set of message kinds, each with its
//!   own strict field set.
//! - **Outcomes** ([`AckResult`], [`ErrorCode`]): the synchronous answer
//!   a caller gets for every request.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become text.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or round rules. Game
//! specific actions and events are plugged in as type parameters, so a
//! ruleset's messages are checked by the compiler rather than by
//! convention:
//!
//! ```text
//! Transport (text) → Protocol (ClientFrame<A>) → Room (Ruleset::Action)
//! Room (Ruleset::Event) → Protocol (ServerFrame<E>) → Transport (text)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AckResult, ClientFrame, ErrorCode, PlayerId, PlayerSummary, Recipient,
    Request, RoomCode, RoomEvent, RoundPhase, ServerFrame, ServerPayload,
    TallyEntry,
};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;
