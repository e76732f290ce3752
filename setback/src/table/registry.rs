//! Connection registry: which connections are open and which seat each holds.
//!
//! The registry has its own lock so the transport can register and drop
//! connections while the table actor is busy applying an action.

use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::game::{SeatIndex, constants::NUM_SEATS};

/// Identifier of one transport connection.
pub type ConnectionId = Uuid;

/// Why a seat could not be attached to a connection
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("seat {0} does not exist")]
    InvalidSeat(SeatIndex),
}

/// Result of queueing a frame for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Outbound queue full; the connection is not keeping up.
    Stalled,
    /// Connection unknown or its writer has gone away.
    Gone,
}

#[derive(Debug)]
struct Connection {
    outbound: mpsc::Sender<String>,
    seat: Option<SeatIndex>,
}

#[derive(Debug, Default)]
struct Connections {
    by_id: HashMap<ConnectionId, Connection>,
    seats: [Option<ConnectionId>; NUM_SEATS],
}

impl Connections {
    fn clear_seat_of(&mut self, id: ConnectionId) -> Option<SeatIndex> {
        let seat = self.by_id.get_mut(&id)?.seat.take()?;
        if self.seats[seat] == Some(id) {
            self.seats[seat] = None;
        }
        Some(seat)
    }
}

/// Shared seat/connection bookkeeping
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Connections>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection as a spectator and return its id
    pub async fn register(&self, outbound: mpsc::Sender<String>) -> ConnectionId {
        let id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .by_id
            .insert(id, Connection { outbound, seat: None });
        id
    }

    /// Remove a connection, returning the seat it held
    pub async fn unregister(&self, id: ConnectionId) -> Option<SeatIndex> {
        let mut inner = self.inner.write().await;
        let seat = inner.clear_seat_of(id);
        inner.by_id.remove(&id);
        seat
    }

    pub async fn seat_of(&self, id: ConnectionId) -> Option<SeatIndex> {
        self.inner.read().await.by_id.get(&id)?.seat
    }

    /// Connection currently attached to `seat`
    pub async fn holder(&self, seat: SeatIndex) -> Option<ConnectionId> {
        *self.inner.read().await.seats.get(seat)?
    }

    /// Attach `id` to `seat`, detaching it from any previous seat.
    ///
    /// Returns the connection that held `seat` before, now a spectator.
    ///
    /// # Errors
    ///
    /// Fails if `id` was already unregistered or `seat` is out of range.
    pub async fn assign(
        &self,
        id: ConnectionId,
        seat: SeatIndex,
    ) -> Result<Option<ConnectionId>, RegistryError> {
        let mut inner = self.inner.write().await;
        if seat >= NUM_SEATS {
            return Err(RegistryError::InvalidSeat(seat));
        }
        if !inner.by_id.contains_key(&id) {
            return Err(RegistryError::UnknownConnection(id));
        }
        inner.clear_seat_of(id);
        let evicted = inner.seats[seat].filter(|&other| other != id);
        if let Some(other) = evicted
            && let Some(connection) = inner.by_id.get_mut(&other)
        {
            connection.seat = None;
        }
        inner.seats[seat] = Some(id);
        if let Some(connection) = inner.by_id.get_mut(&id) {
            connection.seat = Some(seat);
        }
        Ok(evicted)
    }

    /// Detach whichever connection holds `seat`
    pub async fn release(&self, seat: SeatIndex) -> Option<ConnectionId> {
        let mut inner = self.inner.write().await;
        let id = inner.seats.get_mut(seat)?.take()?;
        if let Some(connection) = inner.by_id.get_mut(&id) {
            connection.seat = None;
        }
        Some(id)
    }

    /// Every open connection with the seat it holds
    pub async fn recipients(&self) -> Vec<(ConnectionId, Option<SeatIndex>)> {
        self.inner
            .read()
            .await
            .by_id
            .iter()
            .map(|(id, connection)| (*id, connection.seat))
            .collect()
    }

    /// Queue a frame without waiting for space
    pub async fn deliver(&self, id: ConnectionId, payload: String) -> Delivery {
        let inner = self.inner.read().await;
        let Some(connection) = inner.by_id.get(&id) else {
            return Delivery::Gone;
        };
        match connection.outbound.try_send(payload) {
            Ok(()) => Delivery::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Stalled,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Gone,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
