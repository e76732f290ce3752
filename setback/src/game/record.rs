//! The table aggregate: seats, teams, phase and all per-hand card state.
//!
//! A [`GameRecord`] is only ever replaced wholesale by the action engine, so
//! every field here is a snapshot of one consistent point in the game.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::constants::{
    DECK_SIZE, DEFAULT_TARGET_SCORE, HAND_SIZE, KITTY_SIZE, MAX_NAME_LENGTH, NUM_SEATS, NUM_TEAMS,
};
use super::entities::{Bid, Card, CompletedTrick, Deck, SeatIndex, Suit, Trick, next_seat};
use super::scoring::ScoreBreakdown;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lobby,
    Bidding,
    Kitty,
    Discard,
    Playing,
    Scoring,
    Finished,
}

impl Phase {
    /// Phases in which a hand has been dealt and a bid has been won.
    #[must_use]
    pub const fn has_contract(self) -> bool {
        matches!(self, Self::Kitty | Self::Discard | Self::Playing | Self::Scoring)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::Bidding => "bidding",
            Self::Kitty => "kitty",
            Self::Discard => "discard",
            Self::Playing => "playing",
            Self::Scoring => "scoring",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// Connection sub-state of an occupied seat.
///
/// `Vacated` is a seat whose occupant left or was kicked mid-hand. The record
/// is kept so the hand survives, but the name is cleared and anyone may take
/// the seat over.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Connected,
    Disconnected,
    Vacated,
}

/// Private rejoin token issued to a seated player.
#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Constant-time comparison against a presented token.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub name: String,
    pub hand: Vec<Card>,
    pub credential: Option<Credential>,
    pub presence: Presence,
}

impl Player {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name,
            hand: Vec::new(),
            credential: Some(Credential::generate()),
            presence: Presence::Connected,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.presence == Presence::Connected
    }

    #[must_use]
    pub fn holds(&self, card: &Card) -> bool {
        self.hand.contains(card)
    }

    /// Frees the seat for takeover. The hand stays in play.
    pub fn vacate(&mut self) {
        self.name.clear();
        self.presence = Presence::Vacated;
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Team {
    pub score: i32,
    pub games_won: u32,
}

/// Progress of one seat through the discard-and-draw round.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum DiscardState {
    #[default]
    NotStarted,
    /// Chosen ahead of the seat's turn; applied when the turn arrives.
    Pending(Vec<Card>),
    Complete,
}

impl DiscardState {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// One table's complete state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameRecord {
    pub phase: Phase,
    pub seats: [Option<Player>; NUM_SEATS],
    pub teams: [Team; NUM_TEAMS],
    pub deck: Deck,
    pub current_trick: Option<Trick>,
    pub last_trick: Option<CompletedTrick>,
    pub trump: Option<Suit>,
    pub bids: Vec<Bid>,
    pub dealer: SeatIndex,
    pub seat_to_act: SeatIndex,
    pub tricks_played: usize,
    pub bid_winner: Option<SeatIndex>,
    pub winning_bid: u8,
    pub target_score: i32,
    pub kitty: Vec<Card>,
    pub discards: [DiscardState; NUM_SEATS],
    pub completed_tricks: Vec<CompletedTrick>,
    /// Cards won in tricks this hand, per team.
    pub captured: [Vec<Card>; NUM_TEAMS],
    /// Kitty leftovers and discards, face down until the next deal.
    pub out_of_play: Vec<Card>,
    pub trump_broken: bool,
    pub house: Option<SeatIndex>,
    /// Set once the finished hand has been scored.
    pub hand_result: Option<ScoreBreakdown>,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SCORE)
    }
}

impl GameRecord {
    #[must_use]
    pub fn new(target_score: i32) -> Self {
        Self {
            phase: Phase::Lobby,
            seats: Default::default(),
            teams: Default::default(),
            deck: Deck::empty(),
            current_trick: None,
            last_trick: None,
            trump: None,
            bids: Vec::new(),
            dealer: 0,
            seat_to_act: 0,
            tricks_played: 0,
            bid_winner: None,
            winning_bid: 0,
            target_score,
            kitty: Vec::new(),
            discards: Default::default(),
            completed_tricks: Vec::new(),
            captured: Default::default(),
            out_of_play: Vec::new(),
            trump_broken: false,
            house: None,
            hand_result: None,
        }
    }

    #[must_use]
    pub fn player(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats.get(seat).and_then(Option::as_ref)
    }

    pub(crate) fn player_mut(&mut self, seat: SeatIndex) -> Option<&mut Player> {
        self.seats.get_mut(seat).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn is_house(&self, seat: SeatIndex) -> bool {
        self.house == Some(seat)
    }

    /// Seat holding the given credential, if any.
    #[must_use]
    pub fn seat_for_credential(&self, presented: &str) -> Option<SeatIndex> {
        self.seats.iter().position(|slot| {
            slot.as_ref()
                .and_then(|player| player.credential.as_ref())
                .is_some_and(|credential| credential.matches(presented))
        })
    }

    /// Count of seats holding a player who has not been vacated.
    #[must_use]
    pub fn seated_count(&self) -> usize {
        self.seats
            .iter()
            .flatten()
            .filter(|player| player.presence != Presence::Vacated)
            .count()
    }

    #[must_use]
    pub fn highest_bid(&self) -> u8 {
        self.bids.iter().map(|bid| bid.amount).max().unwrap_or(0)
    }

    #[must_use]
    pub fn has_bid(&self, seat: SeatIndex) -> bool {
        self.bids.iter().any(|bid| bid.seat == seat)
    }

    /// Cards in `seat`'s hand that may legally be played right now.
    #[must_use]
    pub fn legal_plays(&self, seat: SeatIndex) -> Vec<Card> {
        let (Some(player), Some(trump)) = (self.player(seat), self.trump) else {
            return Vec::new();
        };
        if self.phase != Phase::Playing || seat != self.seat_to_act {
            return Vec::new();
        }
        let lead = self.current_trick.as_ref().and_then(|trick| trick.lead_suit);
        match lead {
            Some(lead) if player.hand.iter().any(|card| follows(card, trump, lead)) => player
                .hand
                .iter()
                .copied()
                .filter(|card| follows(card, trump, lead))
                .collect(),
            _ => player.hand.clone(),
        }
    }

    /// Every card the record accounts for in the current hand.
    ///
    /// Outside the lobby this is always the full 52-card deck exactly once.
    #[must_use]
    pub fn all_cards(&self) -> Vec<Card> {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        cards.extend_from_slice(self.deck.cards());
        for player in self.seats.iter().flatten() {
            cards.extend_from_slice(&player.hand);
        }
        cards.extend_from_slice(&self.kitty);
        if let Some(trick) = &self.current_trick {
            cards.extend(trick.cards());
        }
        for trick in &self.completed_tricks {
            cards.extend(trick.cards());
        }
        cards.extend_from_slice(&self.out_of_play);
        cards
    }

    /// Clears all per-hand state and deals a freshly shuffled deck.
    ///
    /// Bidding opens with the seat left of the dealer.
    pub(crate) fn deal_hand(&mut self, deck: Deck) {
        self.deck = deck;
        for player in self.seats.iter_mut().flatten() {
            player.hand = self.deck.deal(HAND_SIZE);
        }
        self.kitty = self.deck.deal(KITTY_SIZE);
        self.phase = Phase::Bidding;
        self.seat_to_act = next_seat(self.dealer);
        self.bids.clear();
        self.trump = None;
        self.bid_winner = None;
        self.winning_bid = 0;
        self.tricks_played = 0;
        self.current_trick = None;
        self.last_trick = None;
        self.completed_tricks.clear();
        self.captured = Default::default();
        self.out_of_play.clear();
        self.discards = Default::default();
        self.trump_broken = false;
        self.hand_result = None;
    }

    /// Next occupied, non-vacated seat after `seat` in turn order.
    pub(crate) fn next_occupied_after(&self, seat: SeatIndex) -> Option<SeatIndex> {
        (1..=NUM_SEATS)
            .map(|offset| (seat + offset) % NUM_SEATS)
            .find(|&candidate| {
                self.player(candidate)
                    .is_some_and(|player| player.presence != Presence::Vacated)
            })
    }
}

/// Whether `card` satisfies a lead of `lead` under `trump`.
fn follows(card: &Card, trump: Suit, lead: Suit) -> bool {
    card.effective_suit(trump) == lead
}

/// Trims a requested display name, substituting a seat-based default.
#[must_use]
pub fn normalize_name(name: &str, seat: SeatIndex) -> String {
    let trimmed: String = name.trim().chars().take(MAX_NAME_LENGTH).collect();
    let trimmed = trimmed.trim_end().to_string();
    if trimmed.is_empty() {
        format!("Player {}", seat + 1)
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_empty_lobby() {
        let record = GameRecord::new(21);
        assert_eq!(record.phase, Phase::Lobby);
        assert_eq!(record.target_score, 21);
        assert!(record.seats.iter().all(Option::is_none));
        assert_eq!(record.house, None);
        assert!(record.all_cards().is_empty());
    }

    #[test]
    fn test_deal_hand_accounts_for_all_cards() {
        let mut record = GameRecord::default();
        for seat in 0..NUM_SEATS {
            record.seats[seat] = Some(Player::new(format!("p{seat}")));
        }
        record.dealer = 3;
        record.deal_hand(Deck::shuffled());

        assert_eq!(record.phase, Phase::Bidding);
        assert_eq!(record.seat_to_act, 0);
        assert_eq!(record.kitty.len(), 6);
        assert_eq!(record.deck.remaining(), 22);
        let mut cards = record.all_cards();
        cards.sort();
        cards.dedup();
        assert_eq!(cards.len(), DECK_SIZE);
    }

    #[test]
    fn test_credential_matching() {
        let credential = Credential::generate();
        assert_eq!(credential.as_str().len(), 32);
        assert!(credential.matches(credential.as_str()));
        assert!(!credential.matches("nope"));
        assert!(!credential.matches(""));
        assert_eq!(format!("{credential:?}"), "Credential(..)");
    }

    #[test]
    fn test_seat_for_credential() {
        let mut record = GameRecord::default();
        let mut player = Player::new("ann".to_string());
        let token = player.credential.clone().unwrap();
        record.seats[2] = Some(player.clone());
        assert_eq!(record.seat_for_credential(token.as_str()), Some(2));
        assert_eq!(record.seat_for_credential("stale"), None);

        player.vacate();
        assert!(player.name.is_empty());
        player.credential = None;
        record.seats[2] = Some(player);
        assert_eq!(record.seat_for_credential(token.as_str()), None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Ann  ", 0), "Ann");
        assert_eq!(normalize_name("   ", 2), "Player 3");
        assert_eq!(normalize_name(&"x".repeat(40), 0).len(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_next_occupied_after_wraps() {
        let mut record = GameRecord::default();
        record.seats[1] = Some(Player::new("b".to_string()));
        assert_eq!(record.next_occupied_after(3), Some(1));
        assert_eq!(record.next_occupied_after(1), Some(1));
        record.seats[1] = None;
        assert_eq!(record.next_occupied_after(0), None);
    }
}
