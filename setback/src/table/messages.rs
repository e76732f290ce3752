//! Table actor message types and the client wire vocabulary.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::registry::ConnectionId;
use crate::game::{
    Action, ActionError, Card, GameRecord, GameView, Phase, ScoreBreakdown, SeatIndex, Suit,
    TeamIndex, constants::NUM_TEAMS,
};

/// Actions as clients send them. Cards are identity strings and suits are
/// names, so decoding never fails on game content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    JoinSeat {
        seat: SeatIndex,
        #[serde(default)]
        name: String,
    },
    LeaveSeat,
    ChangeName {
        name: String,
    },
    Kick {
        target_seat: SeatIndex,
    },
    TransferHouse {
        target_seat: SeatIndex,
    },
    StartGame,
    PlaceBid {
        amount: i64,
    },
    SelectTrump {
        suit: String,
    },
    TakeKitty {
        #[serde(default)]
        card_ids: Vec<String>,
    },
    Discard {
        #[serde(default)]
        card_ids: Vec<String>,
    },
    DiscardAndDraw {
        #[serde(default)]
        card_ids: Vec<String>,
    },
    PlayCard {
        card_id: String,
    },
    Rejoin {
        credential: String,
    },
    NewHand,
    ResetGame,
}

fn parse_cards(
    ids: &[String],
    unknown: impl Fn(String) -> ActionError,
) -> Result<Vec<Card>, ActionError> {
    ids.iter()
        .map(|id| id.parse().map_err(|_| unknown(id.clone())))
        .collect()
}

impl ClientAction {
    /// Converts to a game action for `actor` at `record`.
    ///
    /// Actions carrying cards or a suit are checked for phase and role first,
    /// so an out-of-turn sender hears about that rather than a bad value.
    ///
    /// # Errors
    ///
    /// The phase or role rule the sender fails, else the errors of
    /// [`ClientAction::into_action`].
    pub fn resolve(
        self,
        record: &GameRecord,
        actor: Option<SeatIndex>,
    ) -> Result<Action, ActionError> {
        match &self {
            Self::SelectTrump { .. } | Self::TakeKitty { .. } | Self::Discard { .. } => {
                record.require_bid_winner(actor, Phase::Kitty)?;
            }
            Self::DiscardAndDraw { .. } => {
                record.require_phase(Phase::Discard)?;
                record.require_seated(actor)?;
            }
            Self::PlayCard { .. } => {
                record.require_turn(actor, Phase::Playing)?;
            }
            _ => {}
        }
        self.into_action()
    }

    /// Converts wire identifiers into typed game values.
    ///
    /// # Errors
    ///
    /// An unknown card id is reported as a card the player doesn't hold (or
    /// that isn't in the kitty), and an unknown suit as an invalid trump.
    pub fn into_action(self) -> Result<Action, ActionError> {
        let action = match self {
            Self::JoinSeat { seat, name } => Action::JoinSeat { seat, name },
            Self::LeaveSeat => Action::LeaveSeat,
            Self::ChangeName { name } => Action::ChangeName { name },
            Self::Kick { target_seat } => Action::Kick {
                target: target_seat,
            },
            Self::TransferHouse { target_seat } => Action::TransferHouse {
                target: target_seat,
            },
            Self::StartGame => Action::StartGame,
            // Out-of-range amounts still go through the engine so phase and
            // turn are checked first; 255 is never a legal bid.
            Self::PlaceBid { amount } => Action::PlaceBid {
                amount: u8::try_from(amount).unwrap_or(u8::MAX),
            },
            Self::SelectTrump { suit } => Action::SelectTrump {
                suit: suit
                    .parse::<Suit>()
                    .map_err(|_| ActionError::InvalidTrump(suit.clone()))?,
            },
            Self::TakeKitty { card_ids } => Action::TakeKitty {
                cards: parse_cards(&card_ids, ActionError::CardNotInKitty)?,
            },
            Self::Discard { card_ids } => Action::Discard {
                cards: parse_cards(&card_ids, ActionError::CardNotInHand)?,
            },
            Self::DiscardAndDraw { card_ids } => Action::DiscardAndDraw {
                cards: parse_cards(&card_ids, ActionError::CardNotInHand)?,
            },
            Self::PlayCard { card_id } => Action::PlayCard {
                card: card_id
                    .parse()
                    .map_err(|_| ActionError::CardNotInHand(card_id.clone()))?,
            },
            Self::Rejoin { credential } => Action::Rejoin { credential },
            Self::NewHand => Action::NewHand,
            Self::ResetGame => Action::ResetGame,
        };
        Ok(action)
    }
}

/// Frames sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Personalized table state
    StateUpdate { view: GameView },
    /// A rejected action or undecodable frame
    Error { code: String, message: String },
    /// Breakdown of the hand just scored
    ScoreUpdate { result: ScoreBreakdown },
    /// A team reached the target score
    GameOver {
        winning_team: TeamIndex,
        games_won: [u32; NUM_TEAMS],
    },
}

impl ServerMessage {
    #[must_use]
    pub fn rejected(err: &ActionError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Error {
            code: "bad_request".to_string(),
            message: message.into(),
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// A connection was registered and needs its first view
    Connected { connection: ConnectionId },

    /// A decoded client action
    Action {
        connection: ConnectionId,
        action: ClientAction,
    },

    /// A connection closed; `seat` is the seat it held, if any
    Disconnected {
        connection: ConnectionId,
        seat: Option<SeatIndex>,
    },

    /// Get a table summary
    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },

    /// Get the view a given seat (or a spectator) would receive
    GetView {
        seat: Option<SeatIndex>,
        response: oneshot::Sender<GameView>,
    },
}

/// Table summary for health checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Table name
    pub name: String,

    /// Current game phase
    pub phase: Phase,

    /// Open connections, seated or not
    pub connections: usize,

    /// Seats held by a player
    pub seated: usize,

    pub target_score: i32,
    pub scores: [i32; NUM_TEAMS],
    pub games_won: [u32; NUM_TEAMS],
}
