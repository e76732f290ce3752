//! Table module running one Setback table as an async actor.
//!
//! This module implements:
//! - TableActor: sole owner of the [`GameRecord`](crate::GameRecord), applying
//!   actions one at a time from an mpsc inbox
//! - ConnectionRegistry: which connections are open and which seat each holds
//! - Wire messages in both directions
//! - Table configuration
//!
//! ## Architecture
//!
//! Every connection pushes decoded actions into the same bounded queue, so all
//! game-affecting actions are totally ordered. After each action the actor
//! sends every connection its own view through a bounded outbound queue. A
//! connection whose queue is full is dropped instead of blocking the rest.
//!
//! ## Example
//!
//! ```no_run
//! use setback::table::{TableActor, TableConfig, messages::ClientAction};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, handle) = TableActor::new(TableConfig::default());
//!     tokio::spawn(actor.run());
//!
//!     let (outbound, mut frames) = mpsc::channel(16);
//!     let connection = handle.connect(outbound).await.unwrap();
//!     let join = ClientAction::JoinSeat { seat: 0, name: "ann".into() };
//!     handle.submit(connection, join).await.unwrap();
//!     while let Some(frame) = frames.recv().await {
//!         println!("{frame}");
//!     }
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;
pub mod registry;

pub use actor::{TableActor, TableError, TableHandle};
pub use config::{InvalidTableConfig, TableConfig};
pub use messages::{ClientAction, ServerMessage, TableMessage, TableSummary};
pub use registry::{ConnectionId, ConnectionRegistry, Delivery, RegistryError};
