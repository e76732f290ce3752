//! Setback game engine.
//!
//! This module provides the rules half of the table:
//! - Card model with trump and off-jack ordering
//! - The [`GameRecord`] aggregate holding one table's state
//! - The action engine validating and applying player actions
//! - Hand scoring with the setback penalty
//! - Personalized views for broadcast

pub mod constants;
pub mod entities;
pub mod record;
pub mod scoring;
pub mod state_machine;
pub mod views;

pub use entities::{Card, Deck, ParseCardError, Rank, SeatIndex, Suit, TeamIndex, team_of};
pub use record::{Credential, DiscardState, GameRecord, Phase, Player, Presence, Team};
pub use scoring::{ScoreBreakdown, Settlement};
pub use state_machine::{Action, ActionError};
pub use views::{GameView, TableView};
