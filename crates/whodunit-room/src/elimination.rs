//! Elimination rules: one hidden conspirator against everyone else.
//!
//! Rounds cycle `Night → Day → Night …` until one faction is gone. At night
//! the conspirator removes one civilian; by day every living member votes
//! and the tally leader is removed.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use whodunit_protocol::{PlayerId, Recipient, RoundPhase, TallyEntry};

use crate::logic::{Outbox, RoundContext, Ruleset};
use crate::tally::{Ballots, quorum_reached};
use crate::{ActionError, RoomError};

/// Fewest members that can form both factions.
const MIN_TABLE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EliminationAction {
    NightKill { target: PlayerId },
    DayVote { target: PlayerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Conspirator,
    Civilian,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EliminationEvent {
    /// Sent to each participant separately; never broadcast.
    RoleAssigned {
        faction: Faction,
        players: Vec<PlayerId>,
    },
    NightFell { night: u32 },
    NightResult {
        eliminated: PlayerId,
        alive: Vec<PlayerId>,
    },
    VotesUpdate { tally: Vec<TallyEntry> },
    DayResult {
        eliminated: PlayerId,
        tally: Vec<TallyEntry>,
    },
    /// Terminal. Emitted once per round.
    GameEnded {
        winner: Faction,
        conspirator: PlayerId,
    },
}

/// The elimination ruleset.
pub struct Elimination;

#[derive(Debug, Clone)]
pub struct EliminationRound {
    phase: RoundPhase,
    night: u32,
    conspirator: PlayerId,
    participants: Vec<PlayerId>,
    /// Living participants still present, in join order.
    alive: Vec<PlayerId>,
    ballots: Ballots,
    winner: Option<Faction>,
}

impl EliminationRound {
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// The current night, starting at 1.
    pub fn night(&self) -> u32 {
        self.night
    }

    pub fn conspirator(&self) -> PlayerId {
        self.conspirator
    }

    pub fn participants(&self) -> &[PlayerId] {
        &self.participants
    }

    pub fn alive(&self) -> &[PlayerId] {
        &self.alive
    }

    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    pub fn faction_of(&self, player: PlayerId) -> Faction {
        if player == self.conspirator {
            Faction::Conspirator
        } else {
            Faction::Civilian
        }
    }

    fn is_alive(&self, player: PlayerId) -> bool {
        self.alive.contains(&player)
    }

    fn remove_alive(&mut self, player: PlayerId) {
        self.alive.retain(|&id| id != player);
    }

    /// Which faction has won, if either.
    fn decided(&self) -> Option<Faction> {
        if !self.is_alive(self.conspirator) {
            Some(Faction::Civilian)
        } else if self.alive.iter().all(|&id| id == self.conspirator) {
            Some(Faction::Conspirator)
        } else {
            None
        }
    }

    fn end(&mut self, winner: Faction, out: &mut Outbox<EliminationEvent>) {
        self.phase = RoundPhase::Ended;
        self.winner = Some(winner);
        self.ballots.clear();
        out.push((
            Recipient::All,
            EliminationEvent::GameEnded {
                winner,
                conspirator: self.conspirator,
            },
        ));
    }

    fn night_kill(
        &mut self,
        sender: PlayerId,
        target: PlayerId,
    ) -> Result<Outbox<EliminationEvent>, ActionError> {
        if self.phase != RoundPhase::Night {
            return Err(ActionError::NotInPhase);
        }
        if !self.is_alive(sender) {
            return Err(ActionError::InvalidAction("eliminated players cannot act"));
        }
        if sender != self.conspirator {
            return Err(ActionError::InvalidAction("only the conspirator acts at night"));
        }
        if !self.is_alive(target) || self.faction_of(target) != Faction::Civilian {
            return Err(ActionError::InvalidTarget(target));
        }

        self.remove_alive(target);
        let mut out = vec![(
            Recipient::All,
            EliminationEvent::NightResult {
                eliminated: target,
                alive: self.alive.clone(),
            },
        )];
        match self.decided() {
            Some(winner) => self.end(winner, &mut out),
            None => {
                self.phase = RoundPhase::Day;
                self.ballots.clear();
            }
        }
        Ok(out)
    }

    fn day_vote(
        &mut self,
        sender: PlayerId,
        target: PlayerId,
    ) -> Result<Outbox<EliminationEvent>, ActionError> {
        if self.phase != RoundPhase::Day {
            return Err(ActionError::NotInPhase);
        }
        if !self.is_alive(sender) {
            return Err(ActionError::InvalidAction("eliminated players cannot act"));
        }
        if self.ballots.has_voted(sender) {
            return Err(ActionError::DuplicateSubmission);
        }
        if !self.is_alive(target) {
            return Err(ActionError::InvalidTarget(target));
        }

        self.ballots.cast(sender, target);
        let mut out = vec![(
            Recipient::All,
            EliminationEvent::VotesUpdate {
                tally: self.ballots.tally(&self.alive).entries(),
            },
        )];
        self.resolve_day(&mut out);
        Ok(out)
    }

    /// Removes the tally leader once every living member has voted, then
    /// either ends the game or starts the next night.
    fn resolve_day(&mut self, out: &mut Outbox<EliminationEvent>) {
        if !quorum_reached(&self.alive, |id| self.ballots.has_voted(id)) {
            return;
        }
        let tally = self.ballots.tally(&self.alive);
        let Some(eliminated) = tally.leader() else {
            return;
        };

        self.remove_alive(eliminated);
        self.ballots.clear();
        out.push((
            Recipient::All,
            EliminationEvent::DayResult {
                eliminated,
                tally: tally.entries(),
            },
        ));

        match self.decided() {
            Some(winner) => self.end(winner, out),
            None => {
                self.night += 1;
                self.phase = RoundPhase::Night;
                out.push((Recipient::All, EliminationEvent::NightFell { night: self.night }));
            }
        }
    }
}

impl Ruleset for Elimination {
    type Round = EliminationRound;
    type Action = EliminationAction;
    type Event = EliminationEvent;

    const NAME: &'static str = "elimination";
    const DEFAULT_MIN_PLAYERS: usize = 4;

    fn start_round(
        mut ctx: RoundContext<'_>,
    ) -> Result<(EliminationRound, Outbox<EliminationEvent>), RoomError> {
        let participants = ctx.roster.ids();
        if participants.len() < MIN_TABLE {
            return Err(RoomError::InsufficientPlayers {
                have: participants.len(),
                need: MIN_TABLE,
            });
        }
        let conspirator = *participants
            .choose(&mut *ctx.rng)
            .ok_or(RoomError::InsufficientPlayers { have: 0, need: MIN_TABLE })?;

        let round = EliminationRound {
            phase: RoundPhase::Night,
            night: 1,
            conspirator,
            alive: participants.clone(),
            participants,
            ballots: Ballots::new(),
            winner: None,
        };

        let mut out: Outbox<EliminationEvent> = round
            .participants
            .iter()
            .map(|&id| {
                (
                    Recipient::Player(id),
                    EliminationEvent::RoleAssigned {
                        faction: round.faction_of(id),
                        players: round.participants.clone(),
                    },
                )
            })
            .collect();
        out.push((Recipient::All, EliminationEvent::NightFell { night: 1 }));
        Ok((round, out))
    }

    fn handle_action(
        round: &mut EliminationRound,
        _ctx: RoundContext<'_>,
        sender: PlayerId,
        action: EliminationAction,
    ) -> Result<Outbox<EliminationEvent>, ActionError> {
        match action {
            EliminationAction::NightKill { target } => round.night_kill(sender, target),
            EliminationAction::DayVote { target } => round.day_vote(sender, target),
        }
    }

    fn on_member_left(
        round: &mut EliminationRound,
        _ctx: RoundContext<'_>,
        player: PlayerId,
    ) -> Outbox<EliminationEvent> {
        if round.phase == RoundPhase::Ended || !round.is_alive(player) {
            return Vec::new();
        }
        round.remove_alive(player);
        let ballots_changed = round.ballots.forget(player);

        let mut out = Vec::new();
        if let Some(winner) = round.decided() {
            round.end(winner, &mut out);
            return out;
        }
        if round.phase == RoundPhase::Day {
            if ballots_changed {
                out.push((
                    Recipient::All,
                    EliminationEvent::VotesUpdate {
                        tally: round.ballots.tally(&round.alive).entries(),
                    },
                ));
            }
            round.resolve_day(&mut out);
        }
        out
    }

    fn phase(round: &EliminationRound) -> RoundPhase {
        round.phase
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::{GameRules, Roster, WordBank};

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

        fn start(&mut self) -> (EliminationRound, Outbox<EliminationEvent>) {
            Elimination::start_round(self.ctx()).unwrap()
        }

        fn act(
            &mut self,
            round: &mut EliminationRound,
            sender: PlayerId,
            action: EliminationAction,
        ) -> Result<Outbox<EliminationEvent>, ActionError> {
            Elimination::handle_action(round, self.ctx(), sender, action)
        }

        fn leave(&mut self, round: &mut EliminationRound, player: PlayerId) -> Outbox<EliminationEvent> {
            self.roster.remove(player);
            Elimination::on_member_left(round, self.ctx(), player)
        }
    }

    fn kill(target: PlayerId) -> EliminationAction {
        EliminationAction::NightKill { target }
    }

    fn vote(target: PlayerId) -> EliminationAction {
        EliminationAction::DayVote { target }
    }

    fn civilians(round: &EliminationRound) -> Vec<PlayerId> {
        round
            .alive()
            .iter()
            .copied()
            .filter(|&id| id != round.conspirator())
            .collect()
    }

    fn games_ended(out: &Outbox<EliminationEvent>) -> usize {
        out.iter()
            .filter(|(_, e)| matches!(e, EliminationEvent::GameEnded { .. }))
            .count()
    }

    #[test]
    fn test_roles_are_point_to_point_with_one_conspirator() {
        let mut table = Table::new(5, 21);
        let (round, out) = table.start();
        let mut conspirators = 0;
        for (recipient, event) in &out {
            if let EliminationEvent::RoleAssigned { faction, .. } = event {
                let Recipient::Player(id) = *recipient else {
                    panic!("roles must never be broadcast");
                };
                assert_eq!(*faction, round.faction_of(id));
                if *faction == Faction::Conspirator {
                    conspirators += 1;
                }
            }
        }
        assert_eq!(conspirators, 1);
        assert_eq!(
            out.last().unwrap(),
            &(Recipient::All, EliminationEvent::NightFell { night: 1 })
        );
        assert_eq!(round.phase(), RoundPhase::Night);
    }

    #[test]
    fn test_start_needs_two_members() {
        let mut table = Table::new(1, 1);
        let err = Elimination::start_round(table.ctx()).unwrap_err();
        assert!(matches!(err, RoomError::InsufficientPlayers { have: 1, need: 2 }));
    }

    #[test]
    fn test_night_action_rules() {
        let mut table = Table::new(4, 22);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let civ = civilians(&round);

        assert_eq!(
            table.act(&mut round, civ[0], kill(civ[1])).unwrap_err(),
            ActionError::InvalidAction("only the conspirator acts at night")
        );
        assert_eq!(
            table.act(&mut round, conspirator, kill(conspirator)).unwrap_err(),
            ActionError::InvalidTarget(conspirator)
        );
        assert_eq!(
            table.act(&mut round, conspirator, kill(PlayerId(99))).unwrap_err(),
            ActionError::InvalidTarget(PlayerId(99))
        );
        assert_eq!(
            table.act(&mut round, civ[0], vote(civ[1])).unwrap_err(),
            ActionError::NotInPhase
        );

        let out = table.act(&mut round, conspirator, kill(civ[0])).unwrap();
        assert!(matches!(
            &out[0].1,
            EliminationEvent::NightResult { eliminated, alive }
                if *eliminated == civ[0] && alive.len() == 3
        ));
        assert_eq!(round.phase(), RoundPhase::Day);

        assert_eq!(
            table.act(&mut round, conspirator, kill(civ[1])).unwrap_err(),
            ActionError::NotInPhase
        );
        assert_eq!(
            table.act(&mut round, civ[0], vote(civ[1])).unwrap_err(),
            ActionError::InvalidAction("eliminated players cannot act")
        );
        assert_eq!(
            table.act(&mut round, civ[1], vote(civ[0])).unwrap_err(),
            ActionError::InvalidTarget(civ[0])
        );
    }

    #[test]
    fn test_second_day_vote_is_duplicate() {
        let mut table = Table::new(4, 23);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let civ = civilians(&round);
        table.act(&mut round, conspirator, kill(civ[0])).unwrap();

        table.act(&mut round, civ[1], vote(civ[2])).unwrap();
        assert_eq!(
            table.act(&mut round, civ[1], vote(conspirator)).unwrap_err(),
            ActionError::DuplicateSubmission
        );
    }

    #[test]
    fn test_four_player_civilians_win_once() {
        let mut table = Table::new(4, 24);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let victim = civilians(&round)[0];

        let mut ended = 0;
        let out = table.act(&mut round, conspirator, kill(victim)).unwrap();
        ended += games_ended(&out);

        let voters = round.alive().to_vec();
        assert_eq!(voters.len(), 3);
        for voter in voters {
            let out = table.act(&mut round, voter, vote(conspirator)).unwrap();
            ended += games_ended(&out);
            if let Some((_, EliminationEvent::DayResult { eliminated, tally })) = out
                .iter()
                .find(|(_, e)| matches!(e, EliminationEvent::DayResult { .. }))
            {
                assert_eq!(*eliminated, conspirator);
                assert_eq!(tally.iter().map(|t| t.votes).sum::<u32>(), 3);
            }
            if round.phase() == RoundPhase::Ended {
                assert_eq!(
                    out.last().unwrap().1,
                    EliminationEvent::GameEnded {
                        winner: Faction::Civilian,
                        conspirator,
                    }
                );
            }
        }
        assert_eq!(ended, 1);
        assert_eq!(round.winner(), Some(Faction::Civilian));

        // Ended is terminal.
        assert_eq!(
            table.act(&mut round, victim, vote(conspirator)).unwrap_err(),
            ActionError::NotInPhase
        );
        let survivor = round.alive()[0];
        let out = table.leave(&mut round, survivor);
        assert_eq!(games_ended(&out), 0);
    }

    #[test]
    fn test_conspirator_wins_when_civilians_run_out() {
        let mut table = Table::new(3, 25);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let civ = civilians(&round);

        table.act(&mut round, conspirator, kill(civ[0])).unwrap();
        table.act(&mut round, conspirator, vote(civ[1])).unwrap();
        let out = table.act(&mut round, civ[1], vote(civ[1])).unwrap();
        assert_eq!(
            out.last().unwrap().1,
            EliminationEvent::GameEnded {
                winner: Faction::Conspirator,
                conspirator,
            }
        );
    }

    #[test]
    fn test_night_kill_of_last_civilian_ends_immediately() {
        let mut table = Table::new(2, 26);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let civ = civilians(&round)[0];
        let out = table.act(&mut round, conspirator, kill(civ)).unwrap();
        assert_eq!(games_ended(&out), 1);
        assert_eq!(round.winner(), Some(Faction::Conspirator));
    }

    #[test]
    fn test_day_without_decision_starts_next_night() {
        let mut table = Table::new(5, 27);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let civ = civilians(&round);
        table.act(&mut round, conspirator, kill(civ[0])).unwrap();

        let scapegoat = civ[1];
        let mut last = Vec::new();
        for voter in round.alive().to_vec() {
            last = table.act(&mut round, voter, vote(scapegoat)).unwrap();
        }
        assert!(last.contains(&(Recipient::All, EliminationEvent::NightFell { night: 2 })));
        assert_eq!(round.phase(), RoundPhase::Night);
        assert_eq!(round.night(), 2);
        assert_eq!(round.alive().len(), 3);
    }

    #[test]
    fn test_conspirator_leaving_hands_civilians_the_win() {
        let mut table = Table::new(4, 28);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let out = table.leave(&mut round, conspirator);
        assert_eq!(
            out,
            vec![(
                Recipient::All,
                EliminationEvent::GameEnded {
                    winner: Faction::Civilian,
                    conspirator,
                }
            )]
        );
    }

    #[test]
    fn test_day_quorum_recomputed_on_departure() {
        let mut table = Table::new(5, 29);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let civ = civilians(&round);
        table.act(&mut round, conspirator, kill(civ[0])).unwrap();

        // Everyone alive but civ[3] votes for civ[1].
        for voter in round.alive().to_vec() {
            if voter != civ[3] {
                table.act(&mut round, voter, vote(civ[1])).unwrap();
            }
        }
        assert_eq!(round.phase(), RoundPhase::Day);

        let out = table.leave(&mut round, civ[3]);
        assert!(out.iter().any(|(_, e)| matches!(
            e,
            EliminationEvent::DayResult { eliminated, .. } if *eliminated == civ[1]
        )));
        assert_eq!(round.phase(), RoundPhase::Night);
    }

    #[test]
    fn test_eliminated_member_leaving_changes_nothing() {
        let mut table = Table::new(4, 30);
        let (mut round, _) = table.start();
        let conspirator = round.conspirator();
        let victim = civilians(&round)[0];
        table.act(&mut round, conspirator, kill(victim)).unwrap();
        assert!(table.leave(&mut round, victim).is_empty());
        assert_eq!(round.phase(), RoundPhase::Day);
    }
}
