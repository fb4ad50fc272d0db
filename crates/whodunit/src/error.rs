//! Unified error type for Whodunit.

use whodunit_protocol::ProtocolError;
use whodunit_room::{RoomError, WordBankError};
use whodunit_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WhodunitError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, full, rule violation).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The category corpus could not be loaded.
    #[error(transparent)]
    WordBank(#[from] WordBankError),

    /// The server configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
