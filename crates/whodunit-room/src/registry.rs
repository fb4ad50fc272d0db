//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use whodunit_protocol::{PlayerId, RoomCode};

use crate::logic::Ruleset;
use crate::room::spawn_room;
use crate::{GameRules, PlayerSender, RoomError, RoomHandle, RoomInfo, WordBank};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// All live rooms of one ruleset, and which room each player is in.
///
/// Owned by the server for its whole lifetime and torn down with
/// [`shutdown_all`](Self::shutdown_all). A room exists exactly as long as
/// it has members: the registry destroys it when its last member leaves.
pub struct RoomRegistry<R: Ruleset> {
    /// Live rooms, keyed by code.
    rooms: HashMap<RoomCode, RoomHandle<R>>,

    /// Each player's current room. A player is in at most one.
    member_rooms: HashMap<PlayerId, RoomCode>,

    rules: Arc<GameRules>,
    words: Arc<WordBank>,
}

impl<R: Ruleset> RoomRegistry<R> {
    pub fn new(rules: GameRules, words: Arc<WordBank>) -> Self {
        Self {
            rooms: HashMap::new(),
            member_rooms: HashMap::new(),
            rules: Arc::new(rules),
            words,
        }
    }

    fn ensure_roomless(&self, player_id: PlayerId) -> Result<(), RoomError> {
        match self.member_rooms.get(&player_id) {
            Some(code) => Err(RoomError::AlreadyInRoom(player_id, code.clone())),
            None => Ok(()),
        }
    }

    /// Draws codes until one is free, up to `max_code_attempts` times.
    fn generate_code(&self) -> Result<RoomCode, RoomError> {
        let alphabet: Vec<char> = self.rules.code_alphabet.chars().collect();
        let mut rng = rand::rng();
        for _ in 0..self.rules.max_code_attempts {
            let drawn: Option<String> = (0..self.rules.code_length)
                .map(|_| alphabet.choose(&mut rng).copied())
                .collect();
            let Some(code) = drawn.as_deref().and_then(RoomCode::parse) else {
                continue;
            };
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(RoomError::CodeSpaceExhausted {
            attempts: self.rules.max_code_attempts,
        })
    }

    /// Creates a room with `player_id` as its host and only member.
    pub async fn create_room(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender<R>,
    ) -> Result<RoomCode, RoomError> {
        self.ensure_roomless(player_id)?;
        let code = self.generate_code().inspect_err(|e| {
            tracing::error!(ruleset = R::NAME, rooms = self.rooms.len(), error = %e, "room code space exhausted");
        })?;

        let handle = spawn_room::<R>(
            code.clone(),
            Arc::clone(&self.rules),
            Arc::clone(&self.words),
            DEFAULT_CHANNEL_SIZE,
        );
        if let Err(e) = handle.join(player_id, name.to_string(), sender).await {
            let _ = handle.shutdown().await;
            return Err(e);
        }

        self.rooms.insert(code.clone(), handle);
        self.member_rooms.insert(player_id, code.clone());
        tracing::info!(room = %code, ruleset = R::NAME, host = %player_id, "room created");
        Ok(code)
    }

    /// Adds a player to the room named by `code`, which is matched
    /// case-insensitively.
    pub async fn join_room(
        &mut self,
        code: &str,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender<R>,
    ) -> Result<RoomCode, RoomError> {
        self.ensure_roomless(player_id)?;
        let code = RoomCode::parse(code).ok_or_else(|| RoomError::NotFound(code.trim().to_string()))?;
        let handle = self
            .rooms
            .get(&code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

        handle.join(player_id, name.to_string(), sender).await?;
        self.member_rooms.insert(player_id, code.clone());
        Ok(code)
    }

    /// Returns a handle to `player_id`'s room, checking it is the room
    /// named by `code`.
    ///
    /// Callers send round commands through the clone without holding the
    /// registry.
    pub fn room_for(&self, player_id: PlayerId, code: &str) -> Result<RoomHandle<R>, RoomError> {
        let code = RoomCode::parse(code).ok_or_else(|| RoomError::NotFound(code.trim().to_string()))?;
        let handle = self
            .rooms
            .get(&code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        if self.member_rooms.get(&player_id) != Some(&code) {
            return Err(RoomError::NotInRoom(player_id, code));
        }
        Ok(handle.clone())
    }

    /// Removes a player from whatever room they are in, destroying the
    /// room if they were its last member. Returns the room they left.
    ///
    /// Called for explicit leaves and for every disconnect.
    pub async fn remove_member(&mut self, player_id: PlayerId) -> Result<RoomCode, RoomError> {
        let code = self
            .member_rooms
            .remove(&player_id)
            .ok_or(RoomError::NotInAnyRoom(player_id))?;
        let Some(handle) = self.rooms.get(&code).cloned() else {
            return Ok(code);
        };

        match handle.leave(player_id).await {
            Ok(0) => self.destroy_room(&code).await,
            Ok(_) => {}
            Err(RoomError::Unavailable(_)) => {
                tracing::warn!(room = %code, "room actor gone, dropping room");
                self.destroy_room(&code).await;
            }
            Err(e) => {
                tracing::warn!(room = %code, player = %player_id, error = %e, "leave failed");
            }
        }
        Ok(code)
    }

    /// Shuts a room down and forgets everyone in it.
    async fn destroy_room(&mut self, code: &RoomCode) {
        if let Some(handle) = self.rooms.remove(code) {
            let _ = handle.shutdown().await;
        }
        self.member_rooms.retain(|_, room| room != code);
        tracing::info!(room = %code, ruleset = R::NAME, "room destroyed");
    }

    /// Returns info about a specific room.
    pub async fn room_info(&self, code: &RoomCode) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        handle.get_info().await
    }

    /// The room a player is currently in, if any.
    pub fn member_room(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.member_rooms.get(&player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Stops every room actor. Used at server shutdown.
    pub async fn shutdown_all(&mut self) {
        for (code, handle) in self.rooms.drain() {
            let _ = handle.shutdown().await;
            tracing::debug!(room = %code, "room stopped for shutdown");
        }
        self.member_rooms.clear();
    }
}
