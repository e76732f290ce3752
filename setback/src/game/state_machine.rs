//! Setback action engine.
//!
//! [`GameRecord::apply`] validates one action against the current record and
//! returns the record that results from it. The input record is never touched,
//! so a rejected action leaves the table exactly as it was.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::constants::{HAND_SIZE, MAX_BID, MIN_BID, NUM_SEATS, PASS, TRICKS_PER_HAND};
use super::entities::{
    Bid, Card, CompletedTrick, Deck, SeatIndex, Suit, Trick, TrickPlay, next_seat, team_of,
};
use super::record::{Credential, DiscardState, GameRecord, Phase, Player, Presence, normalize_name};

/// Everything a seated player or a spectator can ask the table to do.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    JoinSeat { seat: SeatIndex, name: String },
    LeaveSeat,
    ChangeName { name: String },
    Kick { target: SeatIndex },
    TransferHouse { target: SeatIndex },
    StartGame,
    PlaceBid { amount: u8 },
    SelectTrump { suit: Suit },
    TakeKitty { cards: Vec<Card> },
    Discard { cards: Vec<Card> },
    DiscardAndDraw { cards: Vec<Card> },
    PlayCard { card: Card },
    Rejoin { credential: String },
    NewHand,
    ResetGame,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinSeat { seat, name } => write!(f, "join seat {seat} as '{name}'"),
            Self::LeaveSeat => write!(f, "leave seat"),
            Self::ChangeName { name } => write!(f, "rename to '{name}'"),
            Self::Kick { target } => write!(f, "kick seat {target}"),
            Self::TransferHouse { target } => write!(f, "transfer house to seat {target}"),
            Self::StartGame => write!(f, "start game"),
            Self::PlaceBid { amount: PASS } => write!(f, "pass"),
            Self::PlaceBid { amount } => write!(f, "bid {amount}"),
            Self::SelectTrump { suit } => write!(f, "select trump {suit}"),
            Self::TakeKitty { cards } => write!(f, "take {} from kitty", cards.len()),
            Self::Discard { cards } => write!(f, "discard {}", cards.len()),
            Self::DiscardAndDraw { cards } => write!(f, "discard and draw {}", cards.len()),
            Self::PlayCard { card } => write!(f, "play {card}"),
            Self::Rejoin { .. } => write!(f, "rejoin"),
            Self::NewHand => write!(f, "new hand"),
            Self::ResetGame => write!(f, "reset game"),
        }
    }
}

/// Reasons an action is rejected. None of them change the record.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ActionError {
    #[error("not allowed during {0}")]
    WrongPhase(Phase),
    #[error("not your turn")]
    NotYourTurn,
    #[error("you must be seated to do that")]
    NotSeated,
    #[error("only the house can do that")]
    HouseOnly,
    #[error("only the bid winner can do that")]
    BidWinnerOnly,
    #[error("seat {0} is taken")]
    SeatOccupied(SeatIndex),
    #[error("seat {0} is empty")]
    SeatEmpty(SeatIndex),
    #[error("seat {0} does not exist")]
    InvalidSeat(SeatIndex),
    #[error("need 4 seated players")]
    NotEnoughPlayers,
    #[error("bid must be a pass, or between 2 and 6 and above {high}")]
    InvalidBid { high: u8 },
    #[error("{0} is not in your hand")]
    CardNotInHand(String),
    #[error("{0} is not in the kitty")]
    CardNotInKitty(String),
    #[error("must follow {0}")]
    MustFollowSuit(Suit),
    #[error("'{0}' is not a suit")]
    InvalidTrump(String),
    #[error("must discard down to six cards (holding {held})")]
    MustDiscardToSix { held: usize },
    #[error("unknown or expired credential")]
    RejoinFailed,
    #[error("select trump first")]
    TrumpNotSelected,
    #[error("take the kitty first")]
    KittyNotTaken,
    #[error("already discarded this hand")]
    DiscardAlreadyComplete,
    #[error("only {remaining} cards left to draw")]
    DeckExhausted { remaining: usize },
    #[error("can't target your own seat")]
    CannotTargetSelf,
    #[error("seat {0} has no connected player")]
    SeatUnavailable(SeatIndex),
}

impl ActionError {
    /// Stable machine-readable code sent to clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongPhase(_) => "wrong_phase",
            Self::NotYourTurn | Self::NotSeated | Self::HouseOnly | Self::BidWinnerOnly => {
                "turn_violation"
            }
            Self::SeatOccupied(_) => "seat_occupied",
            Self::SeatEmpty(_) => "seat_empty",
            Self::InvalidSeat(_) => "invalid_seat",
            Self::NotEnoughPlayers => "not_enough_players",
            Self::InvalidBid { .. } => "invalid_bid",
            Self::CardNotInHand(_) => "card_not_in_hand",
            Self::CardNotInKitty(_) => "card_not_in_kitty",
            Self::MustFollowSuit(_) => "must_follow_suit",
            Self::InvalidTrump(_) => "invalid_trump",
            Self::MustDiscardToSix { .. } => "must_discard_to_six",
            Self::RejoinFailed => "rejoin_failed",
            Self::TrumpNotSelected => "trump_not_selected",
            Self::KittyNotTaken => "kitty_not_taken",
            Self::DiscardAlreadyComplete => "discard_already_complete",
            Self::DeckExhausted { .. } => "deck_exhausted",
            Self::CannotTargetSelf => "cannot_target_self",
            Self::SeatUnavailable(_) => "seat_unavailable",
        }
    }
}

/// Removes `cards` from `hand` one at a time, failing on the first card that
/// isn't there. `hand` is only modified on success.
fn remove_cards(hand: &mut Vec<Card>, cards: &[Card]) -> Result<(), ActionError> {
    let mut remaining = hand.clone();
    for card in cards {
        let idx = remaining
            .iter()
            .position(|held| held == card)
            .ok_or_else(|| ActionError::CardNotInHand(card.id()))?;
        remaining.swap_remove(idx);
    }
    *hand = remaining;
    Ok(())
}

impl GameRecord {
    /// Applies `action` on behalf of `actor`, shuffling with the thread RNG.
    ///
    /// `actor` is the seat the acting connection is attached to, or `None`
    /// for a spectator.
    ///
    /// # Errors
    ///
    /// Returns the rule the action violates. `self` is unchanged either way.
    pub fn apply(&self, actor: Option<SeatIndex>, action: &Action) -> Result<Self, ActionError> {
        self.apply_with(actor, action, &mut rand::rng())
    }

    /// Same as [`GameRecord::apply`] with a caller-supplied shuffle source.
    ///
    /// # Errors
    ///
    /// Returns the rule the action violates.
    pub fn apply_with<R: Rng + ?Sized>(
        &self,
        actor: Option<SeatIndex>,
        action: &Action,
        rng: &mut R,
    ) -> Result<Self, ActionError> {
        let mut next = self.clone();
        match action {
            Action::JoinSeat { seat, name } => next.join_seat(actor, *seat, name)?,
            Action::Rejoin { credential } => next.rejoin(actor, credential)?,
            Action::LeaveSeat => {
                let seat = next.require_seated(actor)?;
                next.leave_seat(seat);
            }
            Action::ChangeName { name } => {
                let seat = next.require_seated(actor)?;
                if let Some(player) = next.player_mut(seat) {
                    player.name = normalize_name(name, seat);
                }
            }
            Action::Kick { target } => next.kick(actor, *target)?,
            Action::TransferHouse { target } => next.transfer_house(actor, *target)?,
            Action::StartGame => next.start_game(actor, rng)?,
            Action::PlaceBid { amount } => next.place_bid(actor, *amount)?,
            Action::SelectTrump { suit } => {
                next.require_bid_winner(actor, Phase::Kitty)?;
                next.trump = Some(*suit);
            }
            Action::TakeKitty { cards } => next.take_kitty(actor, cards)?,
            Action::Discard { cards } => next.discard(actor, cards)?,
            Action::DiscardAndDraw { cards } => next.discard_and_draw(actor, cards)?,
            Action::PlayCard { card } => next.play_card(actor, *card)?,
            Action::NewHand => next.new_hand(actor, rng)?,
            Action::ResetGame => next.reset_game(actor)?,
        }
        Ok(next)
    }

    /// Marks a seat's occupant as dropped by the transport.
    ///
    /// Name, hand and credential are kept so the player can rejoin.
    pub fn disconnect(&mut self, seat: SeatIndex) {
        if let Some(player) = self.player_mut(seat)
            && player.presence == Presence::Connected
        {
            player.presence = Presence::Disconnected;
        }
    }

    pub(crate) fn require_seated(&self, actor: Option<SeatIndex>) -> Result<SeatIndex, ActionError> {
        match actor.and_then(|seat| self.player(seat).map(|player| (seat, player))) {
            Some((seat, player)) if player.presence != Presence::Vacated => Ok(seat),
            _ => Err(ActionError::NotSeated),
        }
    }

    pub(crate) fn require_phase(&self, phase: Phase) -> Result<(), ActionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(ActionError::WrongPhase(self.phase))
        }
    }

    fn require_house(&self, actor: Option<SeatIndex>) -> Result<SeatIndex, ActionError> {
        let seat = self.require_seated(actor)?;
        if self.is_house(seat) {
            Ok(seat)
        } else {
            Err(ActionError::HouseOnly)
        }
    }

    pub(crate) fn require_turn(
        &self,
        actor: Option<SeatIndex>,
        phase: Phase,
    ) -> Result<SeatIndex, ActionError> {
        self.require_phase(phase)?;
        let seat = self.require_seated(actor)?;
        if seat == self.seat_to_act {
            Ok(seat)
        } else {
            Err(ActionError::NotYourTurn)
        }
    }

    pub(crate) fn require_bid_winner(
        &self,
        actor: Option<SeatIndex>,
        phase: Phase,
    ) -> Result<SeatIndex, ActionError> {
        self.require_phase(phase)?;
        let seat = self.require_seated(actor)?;
        if self.bid_winner == Some(seat) {
            Ok(seat)
        } else {
            Err(ActionError::BidWinnerOnly)
        }
    }

    fn require_target(&self, house: SeatIndex, target: SeatIndex) -> Result<(), ActionError> {
        if target >= NUM_SEATS {
            return Err(ActionError::InvalidSeat(target));
        }
        if target == house {
            return Err(ActionError::CannotTargetSelf);
        }
        Ok(())
    }

    // === Seating ===

    fn join_seat(
        &mut self,
        actor: Option<SeatIndex>,
        seat: SeatIndex,
        name: &str,
    ) -> Result<(), ActionError> {
        if seat >= NUM_SEATS {
            return Err(ActionError::InvalidSeat(seat));
        }
        match &self.seats[seat] {
            Some(player) if player.is_connected() => return Err(ActionError::SeatOccupied(seat)),
            None if self.phase != Phase::Lobby => return Err(ActionError::WrongPhase(self.phase)),
            _ => {}
        }

        // A lobby takeover seats someone new, so the absent house's role
        // moves on rather than passing with the chair.
        if self.phase == Phase::Lobby && self.seats[seat].is_some() && self.is_house(seat) {
            self.seats[seat] = None;
            self.house = self.next_occupied_after(seat);
            if let Some(house) = self.house {
                self.dealer = house;
            }
        }

        // Switching seats: the old seat is left first, as one step.
        let carried_house = match actor.filter(|&old| self.player(old).is_some()) {
            Some(old) => {
                let was_house = self.is_house(old);
                self.leave_seat(old);
                was_house
            }
            None => false,
        };

        let name = normalize_name(name, seat);
        let mid_hand = self.phase != Phase::Lobby;
        match self.seats[seat].as_mut() {
            Some(player) if mid_hand => {
                player.name = name;
                player.credential = Some(Credential::generate());
                player.presence = Presence::Connected;
            }
            _ => self.seats[seat] = Some(Player::new(name)),
        }

        if carried_house || self.house.is_none() {
            self.house = Some(seat);
            if self.phase == Phase::Lobby {
                self.dealer = seat;
            }
        }
        Ok(())
    }

    fn leave_seat(&mut self, seat: SeatIndex) {
        if self.phase == Phase::Lobby {
            self.seats[seat] = None;
            if self.is_house(seat) {
                self.house = self.next_occupied_after(seat);
            }
            if self.dealer == seat {
                self.dealer = self.house.unwrap_or(0);
            }
        } else if let Some(player) = self.player_mut(seat) {
            player.vacate();
        }
    }

    fn rejoin(&mut self, actor: Option<SeatIndex>, credential: &str) -> Result<(), ActionError> {
        let seat = self
            .seat_for_credential(credential)
            .ok_or(ActionError::RejoinFailed)?;
        if let Some(old) = actor.filter(|&old| old != seat && self.player(old).is_some()) {
            self.leave_seat(old);
        }
        if let Some(player) = self.player_mut(seat) {
            if player.name.is_empty() {
                player.name = normalize_name("", seat);
            }
            player.presence = Presence::Connected;
        }
        Ok(())
    }

    fn kick(&mut self, actor: Option<SeatIndex>, target: SeatIndex) -> Result<(), ActionError> {
        let house = self.require_house(actor)?;
        self.require_target(house, target)?;
        if self.seats[target].is_none() {
            return Err(ActionError::SeatEmpty(target));
        }
        if self.phase == Phase::Lobby {
            self.seats[target] = None;
            if self.dealer == target {
                self.dealer = house;
            }
        } else if let Some(player) = self.player_mut(target) {
            player.vacate();
            player.credential = None;
        }
        Ok(())
    }

    fn transfer_house(
        &mut self,
        actor: Option<SeatIndex>,
        target: SeatIndex,
    ) -> Result<(), ActionError> {
        let house = self.require_house(actor)?;
        self.require_target(house, target)?;
        match self.player(target) {
            Some(player) if player.is_connected() && !player.name.is_empty() => {
                self.house = Some(target);
                Ok(())
            }
            _ => Err(ActionError::SeatUnavailable(target)),
        }
    }

    // === Hand lifecycle ===

    fn start_game<R: Rng + ?Sized>(
        &mut self,
        actor: Option<SeatIndex>,
        rng: &mut R,
    ) -> Result<(), ActionError> {
        self.require_phase(Phase::Lobby)?;
        self.require_house(actor)?;
        if self.seated_count() < NUM_SEATS {
            return Err(ActionError::NotEnoughPlayers);
        }
        self.deal_fresh(rng);
        Ok(())
    }

    fn deal_fresh<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut deck = Deck::default();
        deck.shuffle_with(rng);
        self.deal_hand(deck);
    }

    fn new_hand<R: Rng + ?Sized>(
        &mut self,
        actor: Option<SeatIndex>,
        rng: &mut R,
    ) -> Result<(), ActionError> {
        self.require_seated(actor)?;
        match self.phase {
            Phase::Scoring => {
                self.dealer = next_seat(self.dealer);
                self.deal_fresh(rng);
            }
            Phase::Finished => self.restart_lobby(|player| player.is_connected()),
            phase => return Err(ActionError::WrongPhase(phase)),
        }
        Ok(())
    }

    fn reset_game(&mut self, actor: Option<SeatIndex>) -> Result<(), ActionError> {
        self.require_house(actor)?;
        self.restart_lobby(|player| player.presence != Presence::Vacated);
        Ok(())
    }

    /// Rebuilds an empty lobby keeping games won, target score, the house role
    /// and every player for which `keep` holds.
    fn restart_lobby(&mut self, keep: impl Fn(&Player) -> bool) {
        let mut fresh = GameRecord::new(self.target_score);
        for (team, old) in fresh.teams.iter_mut().zip(&self.teams) {
            team.games_won = old.games_won;
        }
        for (slot, old) in fresh.seats.iter_mut().zip(&self.seats) {
            *slot = old.as_ref().filter(|player| keep(player)).map(|player| Player {
                hand: Vec::new(),
                ..player.clone()
            });
        }
        fresh.house = match self.house {
            Some(house) if fresh.seats[house].is_some() => Some(house),
            Some(house) => fresh.next_occupied_after(house),
            None => None,
        };
        fresh.dealer = fresh.house.unwrap_or(0);
        *self = fresh;
    }

    // === Bidding and kitty ===

    fn place_bid(&mut self, actor: Option<SeatIndex>, amount: u8) -> Result<(), ActionError> {
        let seat = self.require_turn(actor, Phase::Bidding)?;
        let high = self.highest_bid();
        if amount != PASS && (!(MIN_BID..=MAX_BID).contains(&amount) || amount <= high) {
            return Err(ActionError::InvalidBid { high });
        }

        let all_passed = self.bids.len() == NUM_SEATS - 1 && self.bids.iter().all(Bid::is_pass);
        let amount = if seat == self.dealer && amount == PASS && all_passed {
            debug!("Dealer forced to bid {MIN_BID} after three passes");
            MIN_BID
        } else {
            amount
        };
        self.bids.push(Bid { seat, amount });

        if self.bids.len() < NUM_SEATS {
            self.seat_to_act = next_seat(seat);
            return Ok(());
        }
        // Every non-pass strictly exceeds the last, so the maximum is unique.
        if let Some(winner) = self.bids.iter().max_by_key(|bid| bid.amount).copied() {
            self.bid_winner = Some(winner.seat);
            self.winning_bid = winner.amount;
            self.seat_to_act = winner.seat;
            self.phase = Phase::Kitty;
        }
        Ok(())
    }

    fn take_kitty(&mut self, actor: Option<SeatIndex>, cards: &[Card]) -> Result<(), ActionError> {
        let seat = self.require_bid_winner(actor, Phase::Kitty)?;
        let mut kitty = self.kitty.clone();
        let mut taken = Vec::with_capacity(cards.len());
        for card in cards {
            let idx = kitty
                .iter()
                .position(|held| held == card)
                .ok_or_else(|| ActionError::CardNotInKitty(card.id()))?;
            taken.push(kitty.swap_remove(idx));
        }
        if let Some(player) = self.player_mut(seat) {
            player.hand.extend(taken);
        }
        self.out_of_play.append(&mut kitty);
        self.kitty.clear();
        Ok(())
    }

    /// The bid winner's discard, which closes the kitty phase.
    fn discard(&mut self, actor: Option<SeatIndex>, cards: &[Card]) -> Result<(), ActionError> {
        let seat = self.require_bid_winner(actor, Phase::Kitty)?;
        if self.trump.is_none() {
            return Err(ActionError::TrumpNotSelected);
        }
        if !self.kitty.is_empty() {
            return Err(ActionError::KittyNotTaken);
        }
        let mut hand = self.player(seat).map(|p| p.hand.clone()).unwrap_or_default();
        remove_cards(&mut hand, cards)?;
        if hand.len() > HAND_SIZE {
            return Err(ActionError::MustDiscardToSix { held: hand.len() });
        }
        let short = HAND_SIZE - hand.len();
        hand.extend(self.deck.deal(short));
        if let Some(player) = self.player_mut(seat) {
            player.hand = hand;
        }
        self.out_of_play.extend_from_slice(cards);

        self.phase = Phase::Discard;
        self.discards = Default::default();
        self.discards[seat] = DiscardState::Complete;
        self.seat_to_act = next_seat(self.dealer);
        self.advance_discards();
        Ok(())
    }

    // === Discard and draw ===

    fn discard_and_draw(
        &mut self,
        actor: Option<SeatIndex>,
        cards: &[Card],
    ) -> Result<(), ActionError> {
        self.require_phase(Phase::Discard)?;
        let seat = self.require_seated(actor)?;
        if self.discards[seat].is_complete() {
            return Err(ActionError::DiscardAlreadyComplete);
        }
        let mut hand = self.player(seat).map(|p| p.hand.clone()).unwrap_or_default();
        remove_cards(&mut hand, cards)?;

        // Seats between the one to act and this one draw first.
        let mut promised = 0;
        let mut other = self.seat_to_act;
        while other != seat {
            if let DiscardState::Pending(pending) = &self.discards[other] {
                promised += pending.len();
            }
            other = next_seat(other);
        }
        let remaining = self.deck.remaining().saturating_sub(promised);
        if cards.len() > remaining {
            return Err(ActionError::DeckExhausted { remaining });
        }

        self.discards[seat] = DiscardState::Pending(cards.to_vec());
        if seat == self.seat_to_act {
            self.advance_discards();
        }
        Ok(())
    }

    /// Resolves discards in turn order starting at the seat to act, applying
    /// each buffered selection until a seat without one is reached.
    fn advance_discards(&mut self) {
        loop {
            if self.discards.iter().all(DiscardState::is_complete) {
                let leader = self.bid_winner.unwrap_or(self.seat_to_act);
                self.phase = Phase::Playing;
                self.seat_to_act = leader;
                self.current_trick = Some(Trick::new(leader));
                return;
            }
            while self.discards[self.seat_to_act].is_complete() {
                self.seat_to_act = next_seat(self.seat_to_act);
            }
            let seat = self.seat_to_act;
            let DiscardState::Pending(cards) = std::mem::take(&mut self.discards[seat]) else {
                return;
            };
            if cards.len() > self.deck.remaining() {
                // Earlier seats drew the cards this selection counted on.
                return;
            }
            let Some(player) = self.seats[seat].as_mut() else {
                return;
            };
            if remove_cards(&mut player.hand, &cards).is_err() {
                // Hand changed under the selection; the seat has to choose again.
                return;
            }
            player.hand.extend(self.deck.deal(cards.len()));
            self.out_of_play.extend(cards);
            self.discards[seat] = DiscardState::Complete;
        }
    }

    // === Trick play ===

    fn play_card(&mut self, actor: Option<SeatIndex>, card: Card) -> Result<(), ActionError> {
        let seat = self.require_turn(actor, Phase::Playing)?;
        let trump = self.trump.ok_or(ActionError::TrumpNotSelected)?;
        let hand = self.player(seat).map(|p| p.hand.as_slice()).unwrap_or_default();
        if !hand.contains(&card) {
            return Err(ActionError::CardNotInHand(card.id()));
        }
        let lead = self.current_trick.as_ref().and_then(|trick| trick.lead_suit);
        if let Some(lead) = lead
            && card.effective_suit(trump) != lead
            && hand.iter().any(|held| held.effective_suit(trump) == lead)
        {
            return Err(ActionError::MustFollowSuit(lead));
        }

        if let Some(player) = self.player_mut(seat) {
            player.hand.retain(|held| *held != card);
        }
        if card.is_trump(trump) {
            self.trump_broken = true;
        }
        let mut trick = self.current_trick.take().unwrap_or_else(|| Trick::new(seat));
        if trick.plays.is_empty() {
            trick.lead_suit = Some(card.effective_suit(trump));
        }
        trick.plays.push(TrickPlay { card, seat });

        if !trick.is_complete() {
            self.seat_to_act = next_seat(seat);
            self.current_trick = Some(trick);
            return Ok(());
        }

        let winner = trick.leading_seat(trump).unwrap_or(trick.leader);
        let completed = CompletedTrick {
            lead_suit: trick.lead_suit.unwrap_or(trump),
            leader: trick.leader,
            plays: trick.plays,
            winner,
        };
        self.captured[team_of(winner)].extend(completed.cards());
        self.last_trick = Some(completed.clone());
        self.completed_tricks.push(completed);
        self.tricks_played += 1;
        self.seat_to_act = winner;
        if self.tricks_played == TRICKS_PER_HAND {
            self.phase = Phase::Scoring;
        } else {
            self.current_trick = Some(Trick::new(winner));
        }
        Ok(())
    }
}
