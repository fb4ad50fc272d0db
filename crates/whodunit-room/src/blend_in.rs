//! Blend-in rules: everyone but the outlier knows the secret word.
//!
//! A round moves strictly `Clues → Voting → (Guess) → Reveal`. Players give
//! one clue per turn for `clue_rounds` turns, then vote on who the outlier
//! is. If the accusation lands on the outlier they get one guess at the
//! secret.
//!
//! Eligibility: the members dealt in at round start who are still present.
//! Members who join mid-round wait for the next round; members who leave
//! stop counting toward every quorum immediately.

use std::collections::HashMap;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use whodunit_protocol::{PlayerId, PlayerSummary, Recipient, RoundPhase, TallyEntry};

use crate::config::truncate_chars;
use crate::logic::{Outbox, RoundContext, Ruleset};
use crate::tally::{Ballots, quorum_reached};
use crate::{ActionError, RoomError};

/// Stands in for a blank clue.
pub const NO_CLUE: &str = "(no clue)";

/// What a blend-in player can submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BlendInAction {
    Clue { text: String },
    Vote { target: PlayerId },
    Guess { text: String },
}

/// The private round-start message.
///
/// The outlier's card has no secret field at all, so there is no code path
/// that could fill one in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleCard {
    Insider {
        category: String,
        secret: String,
        clue_turn: u32,
    },
    Outlier {
        category: String,
        clue_turn: u32,
    },
}

/// One participant's clues so far, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueHistory {
    pub player: PlayerId,
    pub name: String,
    pub clues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum BlendInEvent {
    /// Sent to each participant separately.
    RoundStarted(RoleCard),
    CluesUpdate { clues: Vec<ClueHistory> },
    ClueTurn { turn: u32 },
    /// Clue collection is over. The history doubles as the ballot.
    VotingStarted { candidates: Vec<ClueHistory> },
    VotesUpdate { tally: Vec<TallyEntry> },
    Accused { suspect: PlayerId, caught: bool },
    /// Sent to the outlier alone once caught.
    GuessPrompt { category: String },
    RoundResult {
        caught: bool,
        outlier: PlayerId,
        secret: String,
        guess: Option<String>,
        correct: bool,
        scores: Vec<PlayerSummary>,
    },
}

/// The blend-in ruleset.
pub struct BlendIn;

/// State of one blend-in round.
#[derive(Debug, Clone)]
pub struct BlendInRound {
    phase: RoundPhase,
    category: String,
    secret: String,
    outlier: PlayerId,
    turn: u32,
    participants: Vec<PlayerId>,
    clues: HashMap<PlayerId, Vec<String>>,
    ballots: Ballots,
    accused: Option<PlayerId>,
    guess: Option<String>,
    correct: Option<bool>,
}

impl BlendInRound {
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn outlier(&self) -> PlayerId {
        self.outlier
    }

    /// The active clue turn, 1-based.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Members dealt in at round start, in join order.
    pub fn participants(&self) -> &[PlayerId] {
        &self.participants
    }

    pub fn clues_of(&self, player: PlayerId) -> &[String] {
        self.clues.get(&player).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn accused(&self) -> Option<PlayerId> {
        self.accused
    }

    pub fn guess(&self) -> Option<&str> {
        self.guess.as_deref()
    }

    /// `Some` once a caught outlier's guess (or forfeit) was judged.
    pub fn correct(&self) -> Option<bool> {
        self.correct
    }

    fn eligible(&self, ctx: &RoundContext<'_>) -> Vec<PlayerId> {
        self.participants
            .iter()
            .copied()
            .filter(|&id| ctx.roster.contains(id))
            .collect()
    }

    fn history(&self, ctx: &RoundContext<'_>) -> Vec<ClueHistory> {
        self.eligible(ctx)
            .into_iter()
            .map(|id| ClueHistory {
                player: id,
                name: ctx.roster.name_of(id).to_string(),
                clues: self.clues_of(id).to_vec(),
            })
            .collect()
    }

    fn submit_clue(
        &mut self,
        ctx: &mut RoundContext<'_>,
        sender: PlayerId,
        text: &str,
    ) -> Result<Outbox<BlendInEvent>, ActionError> {
        if self.phase != RoundPhase::Clues {
            return Err(ActionError::NotInPhase);
        }
        if !self.participants.contains(&sender) {
            return Err(ActionError::InvalidAction("not dealt into this round"));
        }
        let given = self.clues.entry(sender).or_default();
        if given.len() >= self.turn as usize {
            return Err(ActionError::DuplicateSubmission);
        }

        let trimmed = text.trim();
        let clue = if trimmed.is_empty() {
            NO_CLUE.to_string()
        } else {
            truncate_chars(trimmed, ctx.rules.clue_max_len)
        };
        given.push(clue);

        let mut out = vec![(
            Recipient::All,
            BlendInEvent::CluesUpdate {
                clues: self.history(ctx),
            },
        )];
        self.advance_clues(ctx, &mut out);
        Ok(out)
    }

    /// Moves to the next turn, or to Voting after the last one, once every
    /// eligible participant has given this turn's clue.
    fn advance_clues(&mut self, ctx: &RoundContext<'_>, out: &mut Outbox<BlendInEvent>) {
        let turn = self.turn as usize;
        let eligible = self.eligible(ctx);
        if !quorum_reached(&eligible, |id| self.clues_of(id).len() >= turn) {
            return;
        }

        if self.turn < ctx.rules.clue_rounds.max(1) {
            self.turn += 1;
            out.push((Recipient::All, BlendInEvent::ClueTurn { turn: self.turn }));
        } else {
            self.phase = RoundPhase::Voting;
            self.ballots.clear();
            out.push((
                Recipient::All,
                BlendInEvent::VotingStarted {
                    candidates: self.history(ctx),
                },
            ));
        }
    }

    fn submit_vote(
        &mut self,
        ctx: &mut RoundContext<'_>,
        sender: PlayerId,
        target: PlayerId,
    ) -> Result<Outbox<BlendInEvent>, ActionError> {
        if self.phase != RoundPhase::Voting {
            return Err(ActionError::NotInPhase);
        }
        let eligible = self.eligible(ctx);
        if !eligible.contains(&sender) {
            return Err(ActionError::InvalidAction("not dealt into this round"));
        }
        // A lone remaining voter has nobody else to name.
        let self_vote_ok = ctx.rules.allow_self_vote || eligible.len() == 1;
        if !eligible.contains(&target) || (target == sender && !self_vote_ok) {
            return Err(ActionError::InvalidTarget(target));
        }

        self.ballots.cast(sender, target);
        let mut out = vec![(
            Recipient::All,
            BlendInEvent::VotesUpdate {
                tally: self.ballots.tally(&eligible).entries(),
            },
        )];
        self.resolve_votes(ctx, &mut out);
        Ok(out)
    }

    /// Settles the accusation once every eligible participant has voted.
    fn resolve_votes(&mut self, ctx: &mut RoundContext<'_>, out: &mut Outbox<BlendInEvent>) {
        let eligible = self.eligible(ctx);
        if !quorum_reached(&eligible, |id| self.ballots.has_voted(id)) {
            return;
        }
        let Some(suspect) = self.ballots.tally(&eligible).leader() else {
            return;
        };

        let caught = suspect == self.outlier;
        self.accused = Some(suspect);
        out.push((Recipient::All, BlendInEvent::Accused { suspect, caught }));

        if caught {
            self.phase = RoundPhase::Guess;
            out.push((
                Recipient::Player(self.outlier),
                BlendInEvent::GuessPrompt {
                    category: self.category.clone(),
                },
            ));
        } else {
            ctx.roster.award(self.outlier, ctx.rules.escape_bonus);
            self.reveal(ctx, out);
        }
    }

    fn submit_guess(
        &mut self,
        ctx: &mut RoundContext<'_>,
        sender: PlayerId,
        text: &str,
    ) -> Result<Outbox<BlendInEvent>, ActionError> {
        if self.phase != RoundPhase::Guess {
            return Err(ActionError::NotInPhase);
        }
        if sender != self.outlier {
            return Err(ActionError::NotOutlier);
        }

        // Judged at full length; only the echoed copy is cut.
        let guess = text.trim();
        let correct = guess.to_lowercase() == self.secret.trim().to_lowercase();
        self.guess = Some(truncate_chars(guess, ctx.rules.guess_max_len));

        let mut out = Vec::new();
        self.judge_guess(ctx, correct, &mut out);
        Ok(out)
    }

    fn judge_guess(
        &mut self,
        ctx: &mut RoundContext<'_>,
        correct: bool,
        out: &mut Outbox<BlendInEvent>,
    ) {
        self.correct = Some(correct);
        if correct {
            ctx.roster.award(self.outlier, ctx.rules.correct_guess_bonus);
        } else {
            for id in self.eligible(ctx) {
                if id != self.outlier {
                    ctx.roster.award(id, ctx.rules.consolation_points);
                }
            }
        }
        self.reveal(ctx, out);
    }

    /// Terminal. Every scoring path ends here exactly once, and no action
    /// is accepted in Reveal.
    fn reveal(&mut self, ctx: &RoundContext<'_>, out: &mut Outbox<BlendInEvent>) {
        self.phase = RoundPhase::Reveal;
        out.push((
            Recipient::All,
            BlendInEvent::RoundResult {
                caught: self.accused == Some(self.outlier),
                outlier: self.outlier,
                secret: self.secret.clone(),
                guess: self.guess.clone(),
                correct: self.correct.unwrap_or(false),
                scores: ctx.roster.summaries(),
            },
        ));
    }
}

impl Ruleset for BlendIn {
    type Round = BlendInRound;
    type Action = BlendInAction;
    type Event = BlendInEvent;

    const NAME: &'static str = "blend-in";
    const DEFAULT_MIN_PLAYERS: usize = 3;

    fn start_round(
        mut ctx: RoundContext<'_>,
    ) -> Result<(BlendInRound, Outbox<BlendInEvent>), RoomError> {
        let participants = ctx.roster.ids();
        let outlier = *participants
            .choose(&mut *ctx.rng)
            .ok_or(RoomError::InsufficientPlayers { have: 0, need: 1 })?;
        let (category, secret) = ctx.words.pick(&mut *ctx.rng);
        let (category, secret) = (category.to_string(), secret.to_string());

        let out = participants
            .iter()
            .map(|&id| {
                let card = if id == outlier {
                    RoleCard::Outlier {
                        category: category.clone(),
                        clue_turn: 1,
                    }
                } else {
                    RoleCard::Insider {
                        category: category.clone(),
                        secret: secret.clone(),
                        clue_turn: 1,
                    }
                };
                (Recipient::Player(id), BlendInEvent::RoundStarted(card))
            })
            .collect();

        let round = BlendInRound {
            phase: RoundPhase::Clues,
            category,
            secret,
            outlier,
            turn: 1,
            participants,
            clues: HashMap::new(),
            ballots: Ballots::new(),
            accused: None,
            guess: None,
            correct: None,
        };
        Ok((round, out))
    }

    fn handle_action(
        round: &mut BlendInRound,
        mut ctx: RoundContext<'_>,
        sender: PlayerId,
        action: BlendInAction,
    ) -> Result<Outbox<BlendInEvent>, ActionError> {
        match action {
            BlendInAction::Clue { text } => round.submit_clue(&mut ctx, sender, &text),
            BlendInAction::Vote { target } => round.submit_vote(&mut ctx, sender, target),
            BlendInAction::Guess { text } => round.submit_guess(&mut ctx, sender, &text),
        }
    }

    fn on_member_left(
        round: &mut BlendInRound,
        mut ctx: RoundContext<'_>,
        player: PlayerId,
    ) -> Outbox<BlendInEvent> {
        if !round.participants.contains(&player) {
            return Vec::new();
        }
        round.clues.remove(&player);
        let ballots_changed = round.ballots.forget(player);

        let mut out = Vec::new();
        match round.phase {
            RoundPhase::Clues => {
                out.push((
                    Recipient::All,
                    BlendInEvent::CluesUpdate {
                        clues: round.history(&ctx),
                    },
                ));
                round.advance_clues(&ctx, &mut out);
            }
            RoundPhase::Voting => {
                if ballots_changed {
                    let tally = round.ballots.tally(&round.eligible(&ctx));
                    out.push((
                        Recipient::All,
                        BlendInEvent::VotesUpdate {
                            tally: tally.entries(),
                        },
                    ));
                }
                round.resolve_votes(&mut ctx, &mut out);
            }
            RoundPhase::Guess if player == round.outlier => {
                round.judge_guess(&mut ctx, false, &mut out);
            }
            _ => {}
        }
        out
    }

    fn phase(round: &BlendInRound) -> RoundPhase {
        round.phase
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::{Category, GameRules, Roster, WordBank};

    struct Table {
        roster: Roster,
        rules: GameRules,
        words: WordBank,
        rng: StdRng,
    }

    impl Table {
        fn new(players: u64, seed: u64) -> Self {
            let mut roster = Roster::new();
            for id in 1..=players {
                roster.push(PlayerId(id), format!("p{id}"));
            }
            Self {
                roster,
                rules: GameRules::default(),
                words: WordBank::default(),
                rng: StdRng::seed_from_u64(seed),
            }
        }

        fn ctx(&mut self) -> RoundContext<'_> {
            RoundContext {
                roster: &mut self.roster,
                rules: &self.rules,
                words: &self.words,
                rng: &mut self.rng,
            }
        }

        fn start(&mut self) -> (BlendInRound, Outbox<BlendInEvent>) {
            BlendIn::start_round(self.ctx()).unwrap()
        }

        fn act(
            &mut self,
            round: &mut BlendInRound,
            sender: PlayerId,
            action: BlendInAction,
        ) -> Result<Outbox<BlendInEvent>, ActionError> {
            BlendIn::handle_action(round, self.ctx(), sender, action)
        }

        fn leave(&mut self, round: &mut BlendInRound, player: PlayerId) -> Outbox<BlendInEvent> {
            self.roster.remove(player);
            BlendIn::on_member_left(round, self.ctx(), player)
        }

        fn score(&self, id: PlayerId) -> u32 {
            self.roster.get(id).map_or(0, |p| p.score)
        }

        fn total_score(&self) -> u32 {
            self.roster.iter().map(|p| p.score).sum()
        }

        /// Everyone still present gives every remaining clue.
        fn finish_clues(&mut self, round: &mut BlendInRound) {
            while round.phase() == RoundPhase::Clues {
                for id in round.participants().to_vec() {
                    if self.roster.contains(id) && round.clues_of(id).len() < round.turn() as usize {
                        self.act(round, id, clue("hint")).unwrap();
                    }
                }
            }
        }
    }

    fn clue(text: &str) -> BlendInAction {
        BlendInAction::Clue { text: text.into() }
    }

    fn vote(target: PlayerId) -> BlendInAction {
        BlendInAction::Vote { target }
    }

    fn guess(text: &str) -> BlendInAction {
        BlendInAction::Guess { text: text.into() }
    }

    /// Someone other than `not` and the outlier, for a vote that misses.
    fn bystander(round: &BlendInRound, not: PlayerId) -> PlayerId {
        round
            .participants()
            .iter()
            .copied()
            .find(|&id| id != not && id != round.outlier())
            .unwrap()
    }

    /// Every participant but the outlier votes the outlier; the outlier
    /// votes somebody else.
    fn catch_outlier(table: &mut Table, round: &mut BlendInRound) -> Outbox<BlendInEvent> {
        let outlier = round.outlier();
        let mut last = Vec::new();
        for id in round.participants().to_vec() {
            let target = if id == outlier { bystander(round, id) } else { outlier };
            last = table.act(round, id, vote(target)).unwrap();
        }
        last
    }

    #[test]
    fn test_role_cards_hide_secret_from_outlier() {
        for seed in 0..40 {
            for players in 3..=6 {
                let mut table = Table::new(players, seed);
                let (round, out) = table.start();
                assert_eq!(out.len(), players as usize);
                for (recipient, event) in &out {
                    let Recipient::Player(id) = *recipient else {
                        panic!("role cards must be point-to-point");
                    };
                    let json = serde_json::to_string(event).unwrap();
                    if id == round.outlier() {
                        assert!(!json.contains("secret"), "{json}");
                        assert!(!json.contains(round.secret()), "{json}");
                    } else {
                        assert!(json.contains(round.secret()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_exactly_one_outlier_among_participants() {
        let mut table = Table::new(5, 3);
        let (round, out) = table.start();
        let outliers = out
            .iter()
            .filter(|(_, e)| matches!(e, BlendInEvent::RoundStarted(RoleCard::Outlier { .. })))
            .count();
        assert_eq!(outliers, 1);
        assert!(round.participants().contains(&round.outlier()));
        assert_eq!(round.phase(), RoundPhase::Clues);
        assert_eq!(round.turn(), 1);
    }

    #[test]
    fn test_duplicate_clue_in_turn_is_rejected() {
        let mut table = Table::new(3, 1);
        let (mut round, _) = table.start();
        table.act(&mut round, PlayerId(1), clue("first")).unwrap();
        let err = table.act(&mut round, PlayerId(1), clue("second")).unwrap_err();
        assert_eq!(err, ActionError::DuplicateSubmission);
        assert_eq!(round.clues_of(PlayerId(1)), ["first".to_string()]);
    }

    #[test]
    fn test_blank_clue_becomes_placeholder_and_long_clue_is_cut() {
        let mut table = Table::new(3, 1);
        table.rules.clue_max_len = 5;
        let (mut round, _) = table.start();
        table.act(&mut round, PlayerId(1), clue("   ")).unwrap();
        table.act(&mut round, PlayerId(2), clue("  abcdefgh ")).unwrap();
        assert_eq!(round.clues_of(PlayerId(1)), [NO_CLUE.to_string()]);
        assert_eq!(round.clues_of(PlayerId(2)), ["abcde".to_string()]);
    }

    #[test]
    fn test_turn_advances_only_on_full_quorum() {
        let mut table = Table::new(3, 2);
        let (mut round, _) = table.start();
        table.act(&mut round, PlayerId(1), clue("a")).unwrap();
        let out = table.act(&mut round, PlayerId(2), clue("b")).unwrap();
        assert_eq!(round.turn(), 1);
        assert!(!out.iter().any(|(_, e)| matches!(e, BlendInEvent::ClueTurn { .. })));

        let out = table.act(&mut round, PlayerId(3), clue("c")).unwrap();
        assert_eq!(round.turn(), 2);
        assert!(matches!(out[0].1, BlendInEvent::CluesUpdate { .. }));
        assert_eq!(out[1].1, BlendInEvent::ClueTurn { turn: 2 });
    }

    #[test]
    fn test_voting_opens_after_k_turns_and_turn_never_exceeds_k() {
        let mut table = Table::new(3, 4);
        table.rules.clue_rounds = 2;
        let (mut round, _) = table.start();
        table.finish_clues(&mut round);
        assert_eq!(round.phase(), RoundPhase::Voting);
        assert_eq!(round.turn(), 2);
        for id in round.participants() {
            assert_eq!(round.clues_of(*id).len(), 2);
        }
        let err = table.act(&mut round, PlayerId(1), clue("late")).unwrap_err();
        assert_eq!(err, ActionError::NotInPhase);
    }

    #[test]
    fn test_vote_and_guess_outside_phase() {
        let mut table = Table::new(3, 5);
        let (mut round, _) = table.start();
        assert_eq!(
            table.act(&mut round, PlayerId(1), vote(PlayerId(2))).unwrap_err(),
            ActionError::NotInPhase
        );
        let outlier = round.outlier();
        assert_eq!(
            table.act(&mut round, outlier, guess("x")).unwrap_err(),
            ActionError::NotInPhase
        );
    }

    #[test]
    fn test_invalid_vote_targets() {
        let mut table = Table::new(3, 6);
        let (mut round, _) = table.start();
        table.finish_clues(&mut round);
        assert_eq!(
            table.act(&mut round, PlayerId(1), vote(PlayerId(1))).unwrap_err(),
            ActionError::InvalidTarget(PlayerId(1))
        );
        assert_eq!(
            table.act(&mut round, PlayerId(1), vote(PlayerId(99))).unwrap_err(),
            ActionError::InvalidTarget(PlayerId(99))
        );
    }

    #[test]
    fn test_self_vote_allowed_when_configured() {
        let mut table = Table::new(3, 6);
        table.rules.allow_self_vote = true;
        let (mut round, _) = table.start();
        table.finish_clues(&mut round);
        assert!(table.act(&mut round, PlayerId(1), vote(PlayerId(1))).is_ok());
    }

    #[test]
    fn test_lone_remaining_voter_may_name_themself() {
        for seed in 0..8 {
            let mut table = Table::new(3, seed);
            let (mut round, _) = table.start();
            table.finish_clues(&mut round);
            table.leave(&mut round, PlayerId(2));
            table.leave(&mut round, PlayerId(3));
            assert_eq!(round.phase(), RoundPhase::Voting);

            let out = table.act(&mut round, PlayerId(1), vote(PlayerId(1))).unwrap();
            let caught = round.outlier() == PlayerId(1);
            assert!(out.contains(&(
                Recipient::All,
                BlendInEvent::Accused { suspect: PlayerId(1), caught }
            )));
            let expected = if caught { RoundPhase::Guess } else { RoundPhase::Reveal };
            assert_eq!(round.phase(), expected);
        }
    }

    #[test]
    fn test_self_vote_still_rejected_with_two_left() {
        let mut table = Table::new(4, 9);
        let (mut round, _) = table.start();
        table.finish_clues(&mut round);
        table.leave(&mut round, PlayerId(4));
        table.leave(&mut round, PlayerId(3));
        assert_eq!(
            table.act(&mut round, PlayerId(1), vote(PlayerId(1))).unwrap_err(),
            ActionError::InvalidTarget(PlayerId(1))
        );
    }

    #[test]
    fn test_revote_overwrites_and_tally_counts_voters() {
        let mut table = Table::new(4, 8);
        let (mut round, _) = table.start();
        table.finish_clues(&mut round);
        table.act(&mut round, PlayerId(1), vote(PlayerId(2))).unwrap();
        let out = table.act(&mut round, PlayerId(1), vote(PlayerId(3))).unwrap();
        let BlendInEvent::VotesUpdate { tally } = &out[0].1 else {
            panic!("expected a tally, got {out:?}");
        };
        assert_eq!(tally, &vec![TallyEntry { player: PlayerId(3), votes: 1 }]);

        let out = table.act(&mut round, PlayerId(2), vote(PlayerId(3))).unwrap();
        let BlendInEvent::VotesUpdate { tally } = &out[0].1 else {
            panic!("expected a tally, got {out:?}");
        };
        assert_eq!(tally.iter().map(|t| t.votes).sum::<u32>(), 2);
    }

    #[test]
    fn test_caught_outlier_guessing_right_scores_three() {
        let mut table = Table::new(3, 11);
        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.finish_clues(&mut round);

        let out = catch_outlier(&mut table, &mut round);
        assert!(out.contains(&(
            Recipient::All,
            BlendInEvent::Accused { suspect: outlier, caught: true }
        )));
        assert!(out.iter().any(|(r, e)| {
            *r == Recipient::Player(outlier) && matches!(e, BlendInEvent::GuessPrompt { .. })
        }));
        assert_eq!(round.phase(), RoundPhase::Guess);

        let insider = bystander(&round, outlier);
        assert_eq!(
            table.act(&mut round, insider, guess("anything")).unwrap_err(),
            ActionError::NotOutlier
        );

        let shouted = format!("  {}  ", round.secret().to_uppercase());
        let out = table.act(&mut round, outlier, guess(&shouted)).unwrap();
        let BlendInEvent::RoundResult { caught, correct, outlier: revealed, .. } = &out[0].1 else {
            panic!("expected the result, got {out:?}");
        };
        assert!(*caught);
        assert!(*correct);
        assert_eq!(*revealed, outlier);
        assert_eq!(table.score(outlier), 3);
        assert_eq!(table.total_score(), 3);
        assert_eq!(round.phase(), RoundPhase::Reveal);
    }

    #[test]
    fn test_long_secret_is_judged_before_the_echo_is_cut() {
        let secret = "The Remarkably Long Name Of A Mountain Pass In Winter";
        let mut table = Table::new(3, 21);
        table.words = WordBank::new(vec![Category {
            name: "Places".into(),
            words: vec![secret.into()],
        }])
        .unwrap();
        assert!(secret.chars().count() > table.rules.guess_max_len);

        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.finish_clues(&mut round);
        catch_outlier(&mut table, &mut round);

        let out = table.act(&mut round, outlier, guess(&secret.to_lowercase())).unwrap();
        let BlendInEvent::RoundResult { correct, guess: echoed, .. } = &out[0].1 else {
            panic!("expected the result, got {out:?}");
        };
        assert!(*correct);
        assert_eq!(
            echoed.as_deref().map(|g| g.chars().count()),
            Some(table.rules.guess_max_len)
        );
        assert_eq!(table.score(outlier), 3);
    }

    #[test]
    fn test_caught_outlier_guessing_wrong_consoles_everyone_else() {
        let mut table = Table::new(4, 12);
        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.finish_clues(&mut round);
        catch_outlier(&mut table, &mut round);

        table.act(&mut round, outlier, guess("definitely not it")).unwrap();
        assert_eq!(table.score(outlier), 0);
        for id in round.participants() {
            if *id != outlier {
                assert_eq!(table.score(*id), 1);
            }
        }
        assert_eq!(table.total_score(), 3);
    }

    #[test]
    fn test_escape_pays_exactly_the_bonus_once() {
        let mut table = Table::new(4, 13);
        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.finish_clues(&mut round);

        // Everyone piles onto one insider; the insider votes the outlier.
        let scapegoat = bystander(&round, outlier);
        let mut last = Vec::new();
        for id in round.participants().to_vec() {
            let target = if id == scapegoat { outlier } else { scapegoat };
            last = table.act(&mut round, id, vote(target)).unwrap();
        }
        assert!(last.iter().any(|(_, e)| matches!(
            e,
            BlendInEvent::RoundResult { caught: false, correct: false, guess: None, .. }
        )));
        assert_eq!(table.score(outlier), 2);
        assert_eq!(table.total_score(), 2);

        // Reveal is terminal; nothing more can score.
        assert_eq!(
            table.act(&mut round, scapegoat, vote(outlier)).unwrap_err(),
            ActionError::NotInPhase
        );
        assert_eq!(table.total_score(), 2);
    }

    #[test]
    fn test_disconnect_during_clues_relaxes_quorum() {
        let mut table = Table::new(4, 14);
        let (mut round, _) = table.start();
        for id in 1..=3 {
            table.act(&mut round, PlayerId(id), clue("x")).unwrap();
        }
        assert_eq!(round.turn(), 1);

        let out = table.leave(&mut round, PlayerId(4));
        assert_eq!(round.turn(), 2);
        assert!(out.contains(&(Recipient::All, BlendInEvent::ClueTurn { turn: 2 })));
    }

    #[test]
    fn test_disconnect_of_last_voter_resolves_voting() {
        let mut table = Table::new(4, 15);
        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.finish_clues(&mut round);

        let laggard = round
            .participants()
            .iter()
            .copied()
            .find(|&id| id != outlier)
            .unwrap();
        let decoy = round
            .participants()
            .iter()
            .copied()
            .find(|&id| id != outlier && id != laggard)
            .unwrap();
        for id in round.participants().to_vec() {
            if id == laggard {
                continue;
            }
            let target = if id == outlier { decoy } else { outlier };
            table.act(&mut round, id, vote(target)).unwrap();
        }
        assert_eq!(round.phase(), RoundPhase::Voting);

        let out = table.leave(&mut round, laggard);
        assert!(out.iter().any(|(_, e)| matches!(e, BlendInEvent::Accused { .. })));
        assert_ne!(round.phase(), RoundPhase::Voting);
    }

    #[test]
    fn test_disconnect_drops_ballots_naming_the_departed() {
        let mut table = Table::new(4, 16);
        let (mut round, _) = table.start();
        table.finish_clues(&mut round);
        table.act(&mut round, PlayerId(1), vote(PlayerId(4))).unwrap();
        table.act(&mut round, PlayerId(2), vote(PlayerId(3))).unwrap();

        let out = table.leave(&mut round, PlayerId(4));
        assert!(out.contains(&(
            Recipient::All,
            BlendInEvent::VotesUpdate {
                tally: vec![TallyEntry { player: PlayerId(3), votes: 1 }]
            }
        )));
        assert_eq!(
            table.act(&mut round, PlayerId(1), vote(PlayerId(4))).unwrap_err(),
            ActionError::InvalidTarget(PlayerId(4))
        );
    }

    #[test]
    fn test_outlier_leaving_during_guess_counts_as_wrong() {
        let mut table = Table::new(4, 17);
        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.finish_clues(&mut round);
        catch_outlier(&mut table, &mut round);

        let out = table.leave(&mut round, outlier);
        assert!(out.iter().any(|(_, e)| matches!(
            e,
            BlendInEvent::RoundResult { caught: true, correct: false, .. }
        )));
        assert_eq!(table.total_score(), 3);
        assert_eq!(round.phase(), RoundPhase::Reveal);
    }

    #[test]
    fn test_outlier_leaving_early_forfeits_escape_bonus() {
        let mut table = Table::new(4, 18);
        let (mut round, _) = table.start();
        let outlier = round.outlier();
        table.leave(&mut round, outlier);
        table.finish_clues(&mut round);

        let remaining: Vec<PlayerId> = table.roster.ids();
        for (i, &id) in remaining.iter().enumerate() {
            let target = remaining[(i + 1) % remaining.len()];
            table.act(&mut round, id, vote(target)).unwrap();
        }
        assert_eq!(round.phase(), RoundPhase::Reveal);
        assert_eq!(table.total_score(), 0);
    }

    #[test]
    fn test_mid_round_joiner_is_not_required() {
        let mut table = Table::new(3, 19);
        let (mut round, _) = table.start();
        table.roster.push(PlayerId(9), "late".into());
        assert!(matches!(
            table.act(&mut round, PlayerId(9), clue("hi")).unwrap_err(),
            ActionError::InvalidAction(_)
        ));
        table.finish_clues(&mut round);
        assert_eq!(round.phase(), RoundPhase::Voting);
    }

    #[test]
    fn test_round_started_wire_shape() {
        let event = BlendInEvent::RoundStarted(RoleCard::Outlier {
            category: "Foods".into(),
            clue_turn: 1,
        });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "RoundStarted");
        assert_eq!(json["role"], "outlier");
        assert_eq!(json["category"], "Foods");
        assert!(json.get("secret").is_none());
    }
}
