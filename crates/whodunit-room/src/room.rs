//! Room actor: an isolated Tokio task that owns one room.
//!
//! Membership, host and the active round live inside the task and are
//! only touched by its command loop, so every mutation of a room is
//! applied one at a time in arrival order. Events produced by a mutation
//! are pushed to member channels before the caller's reply is sent.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use whodunit_protocol::{
    PlayerId, PlayerSummary, Recipient, RoomCode, RoomEvent, RoundPhase, ServerPayload,
};

use crate::logic::{Outbox, RoundContext, Ruleset};
use crate::{ActionError, GameRules, RoomError, Roster, WordBank};

/// Channel sender for delivering outbound payloads to a member.
pub type PlayerSender<R> = mpsc::UnboundedSender<ServerPayload<<R as Ruleset>::Event>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand<R: Ruleset> {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender<R>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Replies with the number of members left.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    StartRound {
        requester: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Act {
        sender: PlayerId,
        action: R::Action,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

/// A snapshot of a room's public state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_code: RoomCode,
    pub host: Option<PlayerId>,
    pub phase: RoundPhase,
    /// Members in join order.
    pub players: Vec<PlayerSummary>,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per room and hands out clones
/// so round actions don't hold the registry lock while the room works.
pub struct RoomHandle<R: Ruleset> {
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand<R>>,
}

impl<R: Ruleset> Clone for RoomHandle<R> {
    fn clone(&self) -> Self {
        Self {
            room_code: self.room_code.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<R: Ruleset> std::fmt::Debug for RoomHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_code", &self.room_code)
            .finish_non_exhaustive()
    }
}

impl<R: Ruleset> RoomHandle<R> {
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand<R>,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }

    /// Adds a member. The first member becomes host.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender<R>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a member and returns how many remain.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    /// Host only: deals a fresh round, replacing any current one.
    pub async fn start_round(&self, requester: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartRound { requester, reply })
            .await?
    }

    /// Applies a ruleset action for `sender`.
    pub async fn act(&self, sender: PlayerId, action: R::Action) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Act {
            sender,
            action,
            reply,
        })
        .await?
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<R: Ruleset> {
    room_code: RoomCode,
    rules: Arc<GameRules>,
    words: Arc<WordBank>,
    rng: StdRng,
    roster: Roster,
    host: Option<PlayerId>,
    /// Per-member outbound channels.
    senders: HashMap<PlayerId, PlayerSender<R>>,
    round: Option<R::Round>,
    receiver: mpsc::Receiver<RoomCommand<R>>,
}

impl<R: Ruleset> RoomActor<R> {
    async fn run(mut self) {
        tracing::info!(room = %self.room_code, ruleset = R::NAME, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player_id, &name, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let result = self.handle_leave(player_id);
                    let _ = reply.send(result);
                }
                RoomCommand::StartRound { requester, reply } => {
                    let result = self.handle_start(requester);
                    let _ = reply.send(result);
                }
                RoomCommand::Act {
                    sender,
                    action,
                    reply,
                } => {
                    let result = self.handle_action(sender, action);
                    let _ = reply.send(result);
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room = %self.room_code, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room = %self.room_code, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender<R>,
    ) -> Result<(), RoomError> {
        if self.roster.contains(player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.room_code.clone()));
        }
        if self.roster.len() >= self.rules.max_players {
            return Err(RoomError::RoomFull(self.room_code.clone()));
        }

        let name = self.rules.display_name(name);
        self.roster.push(player_id, name);
        self.senders.insert(player_id, sender);
        if self.host.is_none() {
            self.host = Some(player_id);
        }
        tracing::info!(
            room = %self.room_code,
            player = %player_id,
            players = self.roster.len(),
            "player joined"
        );

        self.broadcast_update();
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<usize, RoomError> {
        if self.roster.remove(player_id).is_none() {
            return Err(RoomError::NotInRoom(player_id, self.room_code.clone()));
        }
        self.senders.remove(&player_id);
        tracing::info!(
            room = %self.room_code,
            player = %player_id,
            players = self.roster.len(),
            "player left"
        );

        if let Some(round) = self.round.as_mut() {
            let before = R::phase(round);
            let ctx = RoundContext {
                roster: &mut self.roster,
                rules: &self.rules,
                words: &self.words,
                rng: &mut self.rng,
            };
            let events = R::on_member_left(round, ctx, player_id);
            self.dispatch(events);
            self.log_transition(before);
        }

        if self.host == Some(player_id) {
            // Earliest-joined remaining member, or nobody.
            self.host = self.roster.first();
            tracing::info!(room = %self.room_code, host = ?self.host, "host changed");
            self.broadcast(RoomEvent::HostChanged { host: self.host });
        }

        self.broadcast_update();
        Ok(self.roster.len())
    }

    fn handle_start(&mut self, requester: PlayerId) -> Result<(), RoomError> {
        if self.host != Some(requester) {
            return Err(RoomError::NotHost(requester));
        }
        let need = self.rules.min_players_or(R::DEFAULT_MIN_PLAYERS);
        if self.roster.len() < need {
            return Err(RoomError::InsufficientPlayers {
                have: self.roster.len(),
                need,
            });
        }

        let ctx = RoundContext {
            roster: &mut self.roster,
            rules: &self.rules,
            words: &self.words,
            rng: &mut self.rng,
        };
        let (round, events) = R::start_round(ctx)?;
        let phase = R::phase(&round);
        self.round = Some(round);
        tracing::info!(
            room = %self.room_code,
            ruleset = R::NAME,
            players = self.roster.len(),
            %phase,
            "round started"
        );

        self.dispatch(events);
        self.broadcast_update();
        Ok(())
    }

    fn handle_action(&mut self, sender: PlayerId, action: R::Action) -> Result<(), RoomError> {
        if !self.roster.contains(sender) {
            return Err(RoomError::NotInRoom(sender, self.room_code.clone()));
        }
        let Some(round) = self.round.as_mut() else {
            return Err(ActionError::NotInPhase.into());
        };

        let before = R::phase(round);
        let ctx = RoundContext {
            roster: &mut self.roster,
            rules: &self.rules,
            words: &self.words,
            rng: &mut self.rng,
        };
        let events = R::handle_action(round, ctx, sender, action).inspect_err(|e| {
            tracing::debug!(
                room = %self.room_code,
                player = %sender,
                error = %e,
                "action rejected"
            );
        })?;

        self.dispatch(events);
        self.log_transition(before);
        self.broadcast_update();
        Ok(())
    }

    fn phase(&self) -> RoundPhase {
        self.round.as_ref().map_or(RoundPhase::Lobby, R::phase)
    }

    fn log_transition(&self, before: RoundPhase) {
        let after = self.phase();
        if before == after {
            return;
        }
        if after.is_terminal() {
            tracing::info!(room = %self.room_code, ruleset = R::NAME, "round resolved");
        } else {
            tracing::info!(
                room = %self.room_code,
                from = %before,
                to = %after,
                "phase changed"
            );
        }
    }

    /// Delivers ruleset events to their recipients, in order.
    fn dispatch(&self, events: Outbox<R::Event>) {
        for (recipient, event) in events {
            let payload = ServerPayload::Game(event);
            match recipient {
                Recipient::All => {
                    for pid in self.roster.ids() {
                        self.send_to(pid, payload.clone());
                    }
                }
                Recipient::Player(pid) => {
                    self.send_to(pid, payload);
                }
            }
        }
    }

    fn broadcast(&self, event: RoomEvent) {
        let payload = ServerPayload::Room(event);
        for pid in self.roster.ids() {
            self.send_to(pid, payload.clone());
        }
    }

    /// Public snapshot after every mutation.
    fn broadcast_update(&self) {
        self.broadcast(RoomEvent::RoomUpdate {
            room_code: self.room_code.clone(),
            host: self.host,
            phase: self.phase(),
            players: self.roster.summaries(),
        });
    }

    /// Sends a payload to one member. Silently drops it if the member's
    /// connection is gone; its disconnect will arrive as a `Leave`.
    fn send_to(&self, player_id: PlayerId, payload: ServerPayload<R::Event>) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(payload);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.room_code.clone(),
            host: self.host,
            phase: self.phase(),
            players: self.roster.summaries(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command queue; senders wait when it fills.
pub(crate) fn spawn_room<R: Ruleset>(
    room_code: RoomCode,
    rules: Arc<GameRules>,
    words: Arc<WordBank>,
    channel_size: usize,
) -> RoomHandle<R> {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor::<R> {
        room_code: room_code.clone(),
        rules,
        words,
        rng: StdRng::from_os_rng(),
        roster: Roster::new(),
        host: None,
        senders: HashMap::new(),
        round: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_code,
        sender: tx,
    }
}
