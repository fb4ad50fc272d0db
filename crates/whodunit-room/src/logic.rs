//! The `Ruleset` trait: the seam between a room and its game rules.
//!
//! A room owns membership, host and delivery. Everything that makes one
//! game different from another (role topology, phase order, win and
//! scoring rules) sits behind this trait, so the same room actor and
//! registry serve both games.

use rand::rngs::StdRng;
use serde::{Serialize, de::DeserializeOwned};
use whodunit_protocol::{PlayerId, Recipient, RoundPhase};

use crate::{ActionError, GameRules, RoomError, Roster, WordBank};

/// Events a ruleset wants delivered, in order.
pub type Outbox<E> = Vec<(Recipient, E)>;

/// What a ruleset may touch while handling a call.
///
/// The roster is mutable so rules can award points; membership itself is
/// only changed by the room.
pub struct RoundContext<'a> {
    pub roster: &'a mut Roster,
    pub rules: &'a GameRules,
    pub words: &'a WordBank,
    pub rng: &'a mut StdRng,
}

/// One game's rules.
///
/// Every method is synchronous and runs inside the room actor, so a call
/// sees the room exactly as the previous call left it. Returned events
/// are delivered in order before the room's own `RoomUpdate`.
pub trait Ruleset: Send + Sync + 'static {
    /// State of one round. Replaced wholesale by each `start_round`.
    type Round: Send + 'static;

    /// What players submit during a round.
    type Action: Send + Clone + std::fmt::Debug + Serialize + DeserializeOwned + 'static;

    /// What the round tells players.
    type Event: Send + Sync + Clone + std::fmt::Debug + Serialize + DeserializeOwned + 'static;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Members needed to start when `GameRules::min_players` is unset.
    const DEFAULT_MIN_PLAYERS: usize;

    /// Deals roles and opens the first phase. The room has already
    /// checked host and minimum size.
    fn start_round(ctx: RoundContext<'_>) -> Result<(Self::Round, Outbox<Self::Event>), RoomError>;

    /// Applies one member's action. On `Err` the round is unchanged.
    fn handle_action(
        round: &mut Self::Round,
        ctx: RoundContext<'_>,
        sender: PlayerId,
        action: Self::Action,
    ) -> Result<Outbox<Self::Event>, ActionError>;

    /// Called after `player` has been removed from the roster. Must leave
    /// the round able to progress without them.
    fn on_member_left(
        round: &mut Self::Round,
        ctx: RoundContext<'_>,
        player: PlayerId,
    ) -> Outbox<Self::Event>;

    /// The round's public phase.
    fn phase(round: &Self::Round) -> RoundPhase;
}
