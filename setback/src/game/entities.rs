use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeStruct};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::constants::{DECK_SIZE, NUM_SEATS};

/// Seat position at the table (0..=3).
pub type SeatIndex = usize;

/// Team index (0 or 1).
pub type TeamIndex = usize;

/// Team that owns a seat.
#[must_use]
pub const fn team_of(seat: SeatIndex) -> TeamIndex {
    seat % 2
}

/// Seat to the left of `seat`, wrapping around the table.
#[must_use]
pub const fn next_seat(seat: SeatIndex) -> SeatIndex {
    (seat + 1) % NUM_SEATS
}

/// Errors from parsing card identities and suit names.
#[derive(Debug, Clone, Eq, Error, PartialEq)]
pub enum ParseCardError {
    #[error("unknown suit '{0}'")]
    Suit(String),
    #[error("unknown rank '{0}'")]
    Rank(String),
    #[error("malformed card id '{0}'")]
    Malformed(String),
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Self::Spades, Self::Hearts, Self::Diamonds, Self::Clubs];

    /// The other suit of the same colour.
    #[must_use]
    pub const fn off_suit(self) -> Self {
        match self {
            Self::Spades => Self::Clubs,
            Self::Clubs => Self::Spades,
            Self::Hearts => Self::Diamonds,
            Self::Diamonds => Self::Hearts,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spades => "spades",
            Self::Hearts => "hearts",
            Self::Diamonds => "diamonds",
            Self::Clubs => "clubs",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Spades => "♠",
            Self::Hearts => "♥",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Suit {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|suit| suit.as_str() == s)
            .ok_or_else(|| ParseCardError::Suit(s.to_string()))
    }
}

/// Card rank. The discriminant is the face value with ace high.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Rank {
    Two = 2,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
        Self::Ace,
    ];

    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Points toward the "game" category.
    #[must_use]
    pub const fn game_points(self) -> u32 {
        match self {
            Self::Ace => 4,
            Self::King => 3,
            Self::Queen => 2,
            Self::Jack => 1,
            Self::Ten => 10,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "jack",
            Self::Queen => "queen",
            Self::King => "king",
            Self::Ace => "ace",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
            other => other.as_str(),
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Rank {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rank| rank.as_str() == s)
            .ok_or_else(|| ParseCardError::Rank(s.to_string()))
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Slot of the off-jack on the trump ordering scale. Regular trumps sit at
/// `2 * rank`, which puts this strictly between the jack (22) and the ten (20).
const OFF_JACK_ORDER: u8 = 2 * Rank::Ten.value() + 1;

/// A playing card. Identity on the wire is `"<rank>_<suit>"`, e.g. `10_hearts`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }

    /// Stable identity string.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}_{}", self.rank.as_str(), self.suit.as_str())
    }

    /// True for the jack of trump's same-colour partner suit.
    #[must_use]
    pub fn is_off_jack(&self, trump: Suit) -> bool {
        self.rank == Rank::Jack && self.suit == trump.off_suit()
    }

    /// True for any card of the trump suit and for the off-jack.
    #[must_use]
    pub fn is_trump(&self, trump: Suit) -> bool {
        self.suit == trump || self.is_off_jack(trump)
    }

    /// The suit this card counts as when following.
    #[must_use]
    pub fn effective_suit(&self, trump: Suit) -> Suit {
        if self.is_trump(trump) { trump } else { self.suit }
    }

    /// Ordering key among trumps. Zero for non-trump cards.
    #[must_use]
    pub fn trump_order(&self, trump: Suit) -> u8 {
        if self.suit == trump {
            2 * self.rank.value()
        } else if self.is_off_jack(trump) {
            OFF_JACK_ORDER
        } else {
            0
        }
    }

    /// Whether this card beats `other` in a trick with the given trump and lead.
    #[must_use]
    pub fn beats(&self, other: &Card, trump: Suit, lead: Suit) -> bool {
        match (self.is_trump(trump), other.is_trump(trump)) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => self.trump_order(trump) > other.trump_order(trump),
            (false, false) if self.suit == other.suit => self.rank > other.rank,
            (false, false) => self.suit == lead,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rank, suit) = s
            .split_once('_')
            .ok_or_else(|| ParseCardError::Malformed(s.to_string()))?;
        Ok(Self::new(rank.parse()?, suit.parse()?))
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Card", 3)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("suit", &self.suit)?;
        state.serialize_field("rank", &self.rank)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            suit: Suit,
            rank: Rank,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Self::new(raw.rank, raw.suit))
    }
}

/// The undealt cards of a hand. Dealing takes from the front.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A deck with no cards, used between hands.
    #[must_use]
    pub fn empty() -> Self {
        Self { cards: Vec::new() }
    }

    /// A full deck shuffled with the thread-local OS-seeded generator.
    #[must_use]
    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle();
        deck
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    /// Fisher-Yates shuffle with a caller-supplied generator.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Removes and returns up to `n` cards from the top of the deck.
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let n = n.min(self.cards.len());
        self.cards.drain(..n).collect()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Bid {
    pub seat: SeatIndex,
    pub amount: u8,
}

impl Bid {
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        self.amount == 0
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TrickPlay {
    pub card: Card,
    pub seat: SeatIndex,
}

/// The trick in progress.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Trick {
    pub plays: Vec<TrickPlay>,
    pub leader: SeatIndex,
    pub lead_suit: Option<Suit>,
    pub winner: Option<SeatIndex>,
}

impl Trick {
    #[must_use]
    pub fn new(leader: SeatIndex) -> Self {
        Self {
            plays: Vec::with_capacity(NUM_SEATS),
            leader,
            lead_suit: None,
            winner: None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.plays.len() == NUM_SEATS
    }

    /// Seat whose card beats every other card played so far.
    #[must_use]
    pub fn leading_seat(&self, trump: Suit) -> Option<SeatIndex> {
        let lead = self.lead_suit?;
        let mut best = self.plays.first()?;
        for play in &self.plays[1..] {
            if play.card.beats(&best.card, trump, lead) {
                best = play;
            }
        }
        Some(best.seat)
    }

    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.plays.iter().map(|play| play.card)
    }
}

/// A finished trick. Never modified after it is archived.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CompletedTrick {
    pub plays: Vec<TrickPlay>,
    pub leader: SeatIndex,
    pub lead_suit: Suit,
    pub winner: SeatIndex,
}

impl CompletedTrick {
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.plays.iter().map(|play| play.card)
    }
}
