//! Hand scoring: High, Low, Jack, Off-Jack and Game, plus the setback rule.

use log::info;
use serde::{Deserialize, Serialize};

use super::constants::NUM_TEAMS;
use super::entities::{Card, CompletedTrick, Rank, SeatIndex, Suit, TeamIndex, team_of};
use super::record::{GameRecord, Phase};

/// A category won by a specific card.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Award {
    pub team: TeamIndex,
    pub card: Card,
}

/// Everything that went into one hand's score change.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub trump: Suit,
    /// Highest trump-suit card played, credited to the team that played it.
    pub high: Option<Award>,
    /// Lowest trump-suit card played, credited to the team that played it.
    pub low: Option<Award>,
    /// Team that captured the jack of trump.
    pub jack: Option<TeamIndex>,
    /// Team that captured the off-jack.
    pub off_jack: Option<TeamIndex>,
    /// Team with strictly more game points. `None` on a tie.
    pub game: Option<TeamIndex>,
    pub game_points: [u32; NUM_TEAMS],
    /// Categories earned per team.
    pub points: [i32; NUM_TEAMS],
    pub bidder: SeatIndex,
    pub bidder_team: TeamIndex,
    pub bid_amount: u8,
    pub bid_made: bool,
    pub deltas: [i32; NUM_TEAMS],
}

/// Scores a finished hand.
///
/// `captured` holds the cards each team won in tricks. High and Low look at
/// who played the card; Jack, Off-Jack and Game look at who captured it.
#[must_use]
pub fn calculate(
    tricks: &[CompletedTrick],
    captured: &[Vec<Card>; NUM_TEAMS],
    trump: Suit,
    bidder: SeatIndex,
    bid_amount: u8,
) -> ScoreBreakdown {
    let trump_plays = move || {
        tricks
            .iter()
            .flat_map(|trick| trick.plays.iter())
            .filter(move |play| play.card.suit == trump)
    };
    let high = trump_plays().max_by_key(|play| play.card.rank).map(|play| Award {
        team: team_of(play.seat),
        card: play.card,
    });
    let low = trump_plays().min_by_key(|play| play.card.rank).map(|play| Award {
        team: team_of(play.seat),
        card: play.card,
    });

    let captured_by = |target: Card| {
        tricks
            .iter()
            .find(|trick| trick.cards().any(|card| card == target))
            .map(|trick| team_of(trick.winner))
    };
    let jack = captured_by(Card::new(Rank::Jack, trump));
    let off_jack = captured_by(Card::new(Rank::Jack, trump.off_suit()));

    let game_points = [0, 1].map(|team| {
        captured[team]
            .iter()
            .map(|card| card.rank.game_points())
            .sum::<u32>()
    });
    let game = match game_points[0].cmp(&game_points[1]) {
        std::cmp::Ordering::Greater => Some(0),
        std::cmp::Ordering::Less => Some(1),
        std::cmp::Ordering::Equal => None,
    };

    let mut points = [0; NUM_TEAMS];
    let awarded = [high.map(|a| a.team), low.map(|a| a.team), jack, off_jack, game];
    for team in awarded.into_iter().flatten() {
        points[team] += 1;
    }

    let bidder_team = team_of(bidder);
    let bid_made = points[bidder_team] >= i32::from(bid_amount);
    let mut deltas = points;
    if !bid_made {
        deltas[bidder_team] = -i32::from(bid_amount);
    }

    ScoreBreakdown {
        trump,
        high,
        low,
        jack,
        off_jack,
        game,
        game_points,
        points,
        bidder,
        bidder_team,
        bid_amount,
        bid_made,
        deltas,
    }
}

/// Outcome of settling a hand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settlement {
    pub breakdown: ScoreBreakdown,
    /// Set when this hand ended the game.
    pub winner: Option<TeamIndex>,
}

impl GameRecord {
    /// Scores the finished hand and applies the result to the team totals.
    ///
    /// Runs once per hand: returns `None` outside the scoring phase or when the
    /// hand has already been settled. Moves the table to `finished` when a
    /// team reaches the target score.
    pub fn settle_hand(&mut self) -> Option<Settlement> {
        if self.phase != Phase::Scoring || self.hand_result.is_some() {
            return None;
        }
        let (trump, bidder) = (self.trump?, self.bid_winner?);
        let breakdown = calculate(
            &self.completed_tricks,
            &self.captured,
            trump,
            bidder,
            self.winning_bid,
        );
        for (team, delta) in self.teams.iter_mut().zip(breakdown.deltas) {
            team.score += delta;
        }
        info!(
            "Hand scored: deltas {:?}, totals {} / {}",
            breakdown.deltas, self.teams[0].score, self.teams[1].score
        );

        // Both teams can cross together; the lower team index takes it.
        let winner = (0..NUM_TEAMS).find(|&team| self.teams[team].score >= self.target_score);
        if let Some(team) = winner {
            self.teams[team].games_won += 1;
            self.phase = Phase::Finished;
            info!("Team {team} wins the game");
        }
        self.hand_result = Some(breakdown.clone());
        Some(Settlement { breakdown, winner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::TrickPlay;

    fn trick(plays: &[(&str, SeatIndex)], winner: SeatIndex) -> CompletedTrick {
        let plays: Vec<TrickPlay> = plays
            .iter()
            .map(|&(id, seat)| TrickPlay {
                card: id.parse().unwrap(),
                seat,
            })
            .collect();
        CompletedTrick {
            leader: plays[0].seat,
            lead_suit: plays[0].card.suit,
            plays,
            winner,
        }
    }

    fn captured_from(tricks: &[CompletedTrick]) -> [Vec<Card>; NUM_TEAMS] {
        let mut captured: [Vec<Card>; NUM_TEAMS] = Default::default();
        for trick in tricks {
            captured[team_of(trick.winner)].extend(trick.cards());
        }
        captured
    }

    /// Team 0 captures 21 game points and holds High and Jack, team 1 holds Low
    /// and captures 9.
    fn sample_tricks() -> Vec<CompletedTrick> {
        vec![
            trick(&[("ace_hearts", 0), ("2_hearts", 1), ("jack_hearts", 2), ("10_clubs", 3)], 0),
            trick(&[("king_spades", 2), ("jack_spades", 3), ("queen_spades", 0), ("6_spades", 1)], 2),
            trick(&[("ace_clubs", 1), ("king_clubs", 2), ("queen_clubs", 3), ("2_clubs", 0)], 1),
        ]
    }

    // === Category Tests ===

    #[test]
    fn test_sample_hand_categories() {
        let tricks = sample_tricks();
        let result = calculate(&tricks, &captured_from(&tricks), Suit::Hearts, 0, 4);
        assert_eq!(result.high.map(|a| a.team), Some(0));
        assert_eq!(result.low.map(|a| a.team), Some(1));
        assert_eq!(result.jack, Some(0));
        assert_eq!(result.off_jack, None);
        assert_eq!(result.game_points, [21, 9]);
        assert_eq!(result.game, Some(0));
        assert_eq!(result.points, [3, 1]);
    }

    #[test]
    fn test_setback_when_bid_missed() {
        let tricks = sample_tricks();
        let result = calculate(&tricks, &captured_from(&tricks), Suit::Hearts, 0, 4);
        assert!(!result.bid_made);
        assert_eq!(result.bidder_team, 0);
        assert_eq!(result.deltas, [-4, 1]);
    }

    #[test]
    fn test_bid_made_scores_earned_points() {
        let tricks = sample_tricks();
        let result = calculate(&tricks, &captured_from(&tricks), Suit::Hearts, 2, 3);
        assert!(result.bid_made);
        assert_eq!(result.deltas, [3, 1]);
    }

    #[test]
    fn test_high_low_credit_the_player_not_the_capturer() {
        // Seat 1 plays the only trump and loses the trick to nobody else's trump.
        let tricks = vec![trick(
            &[("king_clubs", 0), ("5_diamonds", 1), ("2_clubs", 2), ("3_clubs", 3)],
            1,
        )];
        let mut captured: [Vec<Card>; NUM_TEAMS] = Default::default();
        // Pretend team 0 ended up with the cards; High/Low must still go to team 1.
        captured[0].extend(tricks[0].cards());
        let result = calculate(&tricks, &captured, Suit::Diamonds, 1, 2);
        assert_eq!(result.high, result.low);
        assert_eq!(result.high.map(|a| a.team), Some(1));
    }

    #[test]
    fn test_off_jack_excluded_from_high_low() {
        // Trump spades: the jack of clubs is trump but not a spade.
        let tricks = vec![trick(
            &[("jack_clubs", 0), ("4_spades", 1), ("9_spades", 2), ("2_hearts", 3)],
            0,
        )];
        let result = calculate(&tricks, &captured_from(&tricks), Suit::Spades, 0, 2);
        assert_eq!(result.high.unwrap().card, "9_spades".parse().unwrap());
        assert_eq!(result.low.unwrap().card, "4_spades".parse().unwrap());
        assert_eq!(result.off_jack, Some(0));
        assert_eq!(result.jack, None);
    }

    #[test]
    fn test_game_tie_awards_nobody() {
        let tricks = vec![
            trick(&[("10_hearts", 0), ("2_clubs", 1), ("3_clubs", 2), ("4_clubs", 3)], 0),
            trick(&[("10_spades", 1), ("5_clubs", 2), ("6_clubs", 3), ("7_clubs", 0)], 1),
        ];
        let result = calculate(&tricks, &captured_from(&tricks), Suit::Diamonds, 0, 2);
        assert_eq!(result.game_points, [10, 10]);
        assert_eq!(result.game, None);
        assert_eq!(result.high, None);
        assert_eq!(result.points, [0, 0]);
        assert_eq!(result.deltas, [-2, 0]);
    }

    // === Settlement Tests ===

    fn scoring_record() -> GameRecord {
        let tricks = sample_tricks();
        let mut record = GameRecord::new(10);
        record.phase = Phase::Scoring;
        record.trump = Some(Suit::Hearts);
        record.bid_winner = Some(0);
        record.winning_bid = 4;
        record.captured = captured_from(&tricks);
        record.completed_tricks = tricks;
        record
    }

    #[test]
    fn test_settle_applies_once() {
        let mut record = scoring_record();
        let settlement = record.settle_hand().unwrap();
        assert_eq!(settlement.winner, None);
        assert_eq!(record.teams[0].score, -4);
        assert_eq!(record.teams[1].score, 1);
        assert_eq!(record.phase, Phase::Scoring);
        assert!(record.settle_hand().is_none());
        assert_eq!(record.teams[0].score, -4);
    }

    #[test]
    fn test_settle_reaching_target_finishes_game() {
        let mut record = scoring_record();
        record.teams[1].score = 9;
        let settlement = record.settle_hand().unwrap();
        assert_eq!(settlement.winner, Some(1));
        assert_eq!(record.phase, Phase::Finished);
        assert_eq!(record.teams[1].games_won, 1);
    }

    #[test]
    fn test_simultaneous_target_goes_to_first_team() {
        let mut record = scoring_record();
        record.bid_winner = Some(2);
        record.winning_bid = 2;
        record.teams = [Default::default(); NUM_TEAMS];
        record.teams[0].score = 8;
        record.teams[1].score = 9;
        let settlement = record.settle_hand().unwrap();
        assert_eq!(settlement.winner, Some(0));
        assert_eq!(record.teams[0].games_won, 1);
        assert_eq!(record.teams[1].games_won, 0);
    }
}
