//! Fixed table dimensions and rule constants.

/// Seats at a table. Seats 0 and 2 form team 0, seats 1 and 3 form team 1.
pub const NUM_SEATS: usize = 4;
pub const NUM_TEAMS: usize = 2;

/// Cards dealt to each seat and to the kitty.
pub const HAND_SIZE: usize = 6;
pub const KITTY_SIZE: usize = 6;
pub const TRICKS_PER_HAND: usize = 6;
pub const DECK_SIZE: usize = 52;

/// Bid amounts. Zero is a pass.
pub const PASS: u8 = 0;
pub const MIN_BID: u8 = 2;
pub const MAX_BID: u8 = 6;

pub const DEFAULT_TARGET_SCORE: i32 = 52;

/// Display names are trimmed and cut to this many characters.
pub const MAX_NAME_LENGTH: usize = 24;
