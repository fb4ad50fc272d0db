//! Room membership in join order.

use whodunit_protocol::{PlayerId, PlayerSummary};

/// A room member.
///
/// `score` only ever grows while the room lives; it resets only when the
/// room is destroyed and a new one created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
}

/// Members of one room, kept in join order.
///
/// Join order is the room's only ordering: turn order, tally tie-breaks
/// and host succession all read it. Rooms are small, so a `Vec` with
/// linear lookup is the whole data structure.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a member with zero score. Returns `false` (and changes
    /// nothing) if the id is already present.
    pub fn push(&mut self, id: PlayerId, name: String) -> bool {
        if self.contains(id) {
            return false;
        }
        self.players.push(Player { id, name, score: 0 });
        true
    }

    /// Removes a member, keeping everyone else's relative order.
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Adds points to a member. Unknown ids are ignored: a member who left
    /// mid-round can't collect.
    pub fn award(&mut self, id: PlayerId, points: u32) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.score = player.score.saturating_add(points);
        }
    }

    pub fn name_of(&self, id: PlayerId) -> &str {
        self.get(id).map(|p| p.name.as_str()).unwrap_or_default()
    }

    /// The earliest-joined member.
    pub fn first(&self) -> Option<PlayerId> {
        self.players.first().map(|p| p.id)
    }

    /// Member ids in join order.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Public scoreboard in join order.
    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players
            .iter()
            .map(|p| PlayerSummary {
                id: p.id,
                name: p.name.clone(),
                score: p.score,
            })
            .collect()
    }
}
