//! Per-recipient snapshots of a [`GameRecord`].
//!
//! The public [`TableView`] is identical for everyone. A [`GameView`] adds the
//! recipient's own hand and credential, and the kitty only while the recipient
//! is choosing from it.

use serde::{Deserialize, Serialize};

use super::entities::{Bid, Card, CompletedTrick, SeatIndex, Suit, Trick, TrickPlay};
use super::record::{GameRecord, Phase, Presence, Team};
use super::scoring::ScoreBreakdown;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeatView {
    pub seat: SeatIndex,
    pub occupied: bool,
    pub name: String,
    pub connected: bool,
    pub presence: Option<Presence>,
    pub hand_size: usize,
    pub has_bid: bool,
    pub discard_pending: bool,
    pub discard_complete: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TrickView {
    pub plays: Vec<TrickPlay>,
    pub leader: SeatIndex,
    pub lead_suit: Option<Suit>,
    pub winner: Option<SeatIndex>,
}

impl From<&Trick> for TrickView {
    fn from(trick: &Trick) -> Self {
        Self {
            plays: trick.plays.clone(),
            leader: trick.leader,
            lead_suit: trick.lead_suit,
            winner: trick.winner,
        }
    }
}

impl From<&CompletedTrick> for TrickView {
    fn from(trick: &CompletedTrick) -> Self {
        Self {
            plays: trick.plays.clone(),
            leader: trick.leader,
            lead_suit: Some(trick.lead_suit),
            winner: Some(trick.winner),
        }
    }
}

/// State every connection sees.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableView {
    pub phase: Phase,
    pub seats: Vec<SeatView>,
    pub teams: Vec<Team>,
    pub current_trick: Option<TrickView>,
    pub last_trick: Option<TrickView>,
    pub trump: Option<Suit>,
    pub bids: Vec<Bid>,
    pub dealer: SeatIndex,
    pub seat_to_act: Option<SeatIndex>,
    pub tricks_played: usize,
    pub bid_winner: Option<SeatIndex>,
    pub winning_bid: u8,
    pub kitty_size: usize,
    pub house: Option<SeatIndex>,
    pub trump_broken: bool,
    pub target_score: i32,
    pub hand_result: Option<ScoreBreakdown>,
}

/// State delivered to one connection.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameView {
    pub state: TableView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<SeatIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kitty: Option<Vec<Card>>,
}

impl GameRecord {
    #[must_use]
    pub fn table_view(&self) -> TableView {
        let seats = self
            .seats
            .iter()
            .enumerate()
            .map(|(seat, slot)| SeatView {
                seat,
                occupied: slot.is_some(),
                name: slot.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
                connected: slot.as_ref().is_some_and(|p| p.is_connected()),
                presence: slot.as_ref().map(|p| p.presence),
                hand_size: slot.as_ref().map_or(0, |p| p.hand.len()),
                has_bid: self.has_bid(seat),
                discard_pending: self.discards[seat].is_pending(),
                discard_complete: self.discards[seat].is_complete(),
            })
            .collect();
        let turn_based = !matches!(self.phase, Phase::Lobby | Phase::Finished);

        TableView {
            phase: self.phase,
            seats,
            teams: self.teams.to_vec(),
            current_trick: self.current_trick.as_ref().map(TrickView::from),
            last_trick: self.last_trick.as_ref().map(TrickView::from),
            trump: self.trump,
            bids: self.bids.clone(),
            dealer: self.dealer,
            seat_to_act: turn_based.then_some(self.seat_to_act),
            tricks_played: self.tricks_played,
            bid_winner: self.bid_winner,
            winning_bid: self.winning_bid,
            kitty_size: self.kitty.len(),
            house: self.house,
            trump_broken: self.trump_broken,
            target_score: self.target_score,
            hand_result: self.hand_result.clone(),
        }
    }

    /// View for the connection attached to `seat`, or a spectator when `None`.
    #[must_use]
    pub fn view_for(&self, seat: Option<SeatIndex>) -> GameView {
        self.view_with(self.table_view(), seat)
    }

    /// Personalizes an already built table view.
    #[must_use]
    pub fn view_with(&self, state: TableView, seat: Option<SeatIndex>) -> GameView {
        let Some((seat, player)) = seat.and_then(|s| self.player(s).map(|p| (s, p))) else {
            return GameView {
                state,
                seat: None,
                hand: None,
                credential: None,
                kitty: None,
            };
        };
        let sees_kitty = self.phase == Phase::Kitty && self.seat_to_act == seat;
        GameView {
            state,
            seat: Some(seat),
            hand: Some(player.hand.clone()),
            credential: player.credential.as_ref().map(|c| c.as_str().to_string()),
            kitty: sees_kitty.then(|| self.kitty.clone()),
        }
    }
}
