//! Per-ruleset room configuration.

use serde::{Deserialize, Serialize};

/// Letters and digits that can't be mistaken for each other when read
/// aloud or off a phone screen (no `0/O`, `1/I`).
pub const DEFAULT_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Policy knobs for one registry's rooms.
///
/// Every field has a default, so a config file only needs to name what it
/// changes:
///
/// ```rust
/// use whodunit_room::GameRules;
///
/// let rules: GameRules = serde_json::from_str(r#"{ "clue_rounds": 2 }"#).unwrap();
/// assert_eq!(rules.clue_rounds, 2);
/// assert_eq!(rules.max_players, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Members required to start a round. `None` uses the ruleset's own
    /// minimum.
    pub min_players: Option<usize>,

    /// Joins beyond this many members are refused.
    pub max_players: usize,

    /// Clue turns per blend-in round (K).
    pub clue_rounds: u32,

    /// Whether a blend-in voter may name themself.
    pub allow_self_vote: bool,

    /// Display names are trimmed, defaulted, then cut to this many chars.
    pub name_max_len: usize,

    /// Clues are trimmed then cut to this many chars.
    pub clue_max_len: usize,

    /// Guesses are trimmed then cut to this many chars.
    pub guess_max_len: usize,

    /// Outlier was never accused.
    pub escape_bonus: u32,

    /// Outlier was accused and named the secret.
    pub correct_guess_bonus: u32,

    /// Outlier was accused and missed: every other participant gets this.
    pub consolation_points: u32,

    /// Room code length.
    pub code_length: usize,

    /// Symbols room codes are drawn from.
    pub code_alphabet: String,

    /// Collision retries before room creation gives up.
    pub max_code_attempts: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_players: None,
            max_players: 12,
            clue_rounds: 3,
            allow_self_vote: false,
            name_max_len: 20,
            clue_max_len: 40,
            guess_max_len: 40,
            escape_bonus: 2,
            correct_guess_bonus: 3,
            consolation_points: 1,
            code_length: 4,
            code_alphabet: DEFAULT_CODE_ALPHABET.to_string(),
            max_code_attempts: 64,
        }
    }
}

impl GameRules {
    /// The effective start minimum: the configured value, or `fallback`
    /// (the ruleset's minimum) when unset.
    pub fn min_players_or(&self, fallback: usize) -> usize {
        self.min_players.unwrap_or(fallback)
    }

    /// Trims a display name, substitutes `Player` when blank, and caps
    /// its length.
    pub fn display_name(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let name = if trimmed.is_empty() { "Player" } else { trimmed };
        truncate_chars(name, self.name_max_len)
    }
}

/// Cuts `text` to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
