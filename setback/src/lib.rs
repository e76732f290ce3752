//! # Setback
//!
//! An authoritative engine for four-player, two-team Setback (Pitch).
//!
//! The rules live in [`game`] as a pure state machine: every action is checked
//! against a [`GameRecord`] and either produces the next record or an
//! [`ActionError`] that leaves the table untouched. The [`table`] module wraps
//! one record in an async actor that serializes actions from many connections
//! and fans out personalized views.
//!
//! ## Phases
//!
//! - **Lobby**: players take seats, the house starts the game
//! - **Bidding**: one bid or pass per seat, dealer forced to 2 if all pass
//! - **Kitty**: bid winner names trump, takes kitty cards and discards to six
//! - **Discard**: every other seat discards and draws in turn
//! - **Playing**: six tricks with follow-suit enforced
//! - **Scoring**: High, Low, Jack, Off-Jack and Game are tallied
//! - **Finished**: a team reached the target score
//!
//! ## Example
//!
//! ```
//! use setback::{Action, GameRecord, Phase};
//!
//! let mut game = GameRecord::default();
//! for seat in 0..4 {
//!     let join = Action::JoinSeat { seat, name: format!("p{seat}") };
//!     game = game.apply(None, &join).unwrap();
//! }
//! let game = game.apply(Some(0), &Action::StartGame).unwrap();
//! assert_eq!(game.phase, Phase::Bidding);
//! ```

/// Rules, cards, scoring and views.
pub mod game;
pub use game::{
    Action, ActionError, Card, GameRecord, GameView, Phase, Rank, ScoreBreakdown, Suit,
    constants::{self, DEFAULT_TARGET_SCORE, NUM_SEATS},
};

/// Async table actor and connection registry.
pub mod table;
pub use table::{TableActor, TableConfig, TableHandle};
