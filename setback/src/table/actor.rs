//! Table actor implementation with async message handling.

use super::{
    config::TableConfig,
    messages::{ClientAction, ServerMessage, TableMessage, TableSummary},
    registry::{ConnectionId, ConnectionRegistry, Delivery},
};
use crate::game::{Action, GameRecord, GameView, Presence, SeatIndex, constants::NUM_SEATS};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Failures talking to a table actor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("table is closed")]
    Closed,

    #[error("table dropped the reply")]
    NoReply,
}

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    registry: ConnectionRegistry,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, registry: ConnectionRegistry) -> Self {
        Self { sender, registry }
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed)
    }

    /// Register a connection as a spectator. The table answers with its
    /// first view on `outbound`.
    pub async fn connect(
        &self,
        outbound: mpsc::Sender<String>,
    ) -> Result<ConnectionId, TableError> {
        let connection = self.registry.register(outbound).await;
        if let Err(e) = self.send(TableMessage::Connected { connection }).await {
            self.registry.unregister(connection).await;
            return Err(e);
        }
        Ok(connection)
    }

    /// Queue an action from `connection`
    pub async fn submit(
        &self,
        connection: ConnectionId,
        action: ClientAction,
    ) -> Result<(), TableError> {
        self.send(TableMessage::Action { connection, action }).await
    }

    /// Drop a connection. A seat it held is marked disconnected unless
    /// another connection has taken it over.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), TableError> {
        let seat = self.registry.unregister(connection).await;
        self.send(TableMessage::Disconnected { connection, seat })
            .await
    }

    /// Get a table summary
    pub async fn summary(&self) -> Result<TableSummary, TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::GetSummary { response }).await?;
        rx.await.map_err(|_| TableError::NoReply)
    }

    /// Get the view `seat` would be sent, or a spectator's for `None`
    pub async fn view(&self, seat: Option<SeatIndex>) -> Result<GameView, TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::GetView { seat, response }).await?;
        rx.await.map_err(|_| TableError::NoReply)
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// True once the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Table actor owning the game record
pub struct TableActor {
    /// Table configuration
    config: TableConfig,

    /// Authoritative game state
    record: GameRecord,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Open connections and their seats
    registry: ConnectionRegistry,

    /// Connections whose outbound queue overflowed or closed during the
    /// current message
    stalled: Vec<ConnectionId>,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(config: TableConfig) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let registry = ConnectionRegistry::new();
        let record = GameRecord::new(config.target_score);

        let actor = Self {
            config,
            record,
            inbox,
            registry: registry.clone(),
            stalled: Vec::new(),
        };

        (actor, TableHandle::new(sender, registry))
    }

    /// Run the table actor event loop until every handle is dropped
    pub async fn run(mut self) {
        log::info!(
            "Table '{}' starting (target score {})",
            self.config.name,
            self.config.target_score
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
            self.reap_stalled().await;
        }

        log::info!("Table '{}' closed", self.config.name);
    }

    /// Handle a table message
    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Connected { connection } => {
                log::debug!("Table '{}': connection {} opened", self.config.name, connection);
                let seat = self.registry.seat_of(connection).await;
                let view = self.record.view_for(seat);
                self.send_to(connection, &ServerMessage::StateUpdate { view })
                    .await;
            }

            TableMessage::Action { connection, action } => {
                self.handle_action(connection, action).await;
            }

            TableMessage::Disconnected { connection, seat } => {
                log::debug!("Table '{}': connection {} closed", self.config.name, connection);
                if let Some(seat) = seat
                    && self.mark_disconnected(seat).await
                {
                    self.broadcast_state().await;
                }
            }

            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary().await);
            }

            TableMessage::GetView { seat, response } => {
                let _ = response.send(self.record.view_for(seat));
            }
        }
    }

    async fn handle_action(&mut self, connection: ConnectionId, action: ClientAction) {
        let actor = self.registry.seat_of(connection).await;
        let applied = action.resolve(&self.record, actor).and_then(|action| {
            self.record
                .apply(actor, &action)
                .map(|next| (action, next))
        });

        let (action, next) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                log::debug!(
                    "Table '{}': rejected action from {}: {}",
                    self.config.name,
                    connection,
                    e
                );
                self.send_to(connection, &ServerMessage::rejected(&e)).await;
                let view = self.record.view_for(actor);
                self.send_to(connection, &ServerMessage::StateUpdate { view })
                    .await;
                return;
            }
        };

        match actor {
            Some(seat) => log::info!("Table '{}': seat {} {}", self.config.name, seat, action),
            None => log::info!("Table '{}': spectator {}", self.config.name, action),
        }
        self.record = next;
        self.sync_registry(connection, &action).await;

        if let Some(settlement) = self.record.settle_hand() {
            self.broadcast(&ServerMessage::ScoreUpdate {
                result: settlement.breakdown,
            })
            .await;
            if let Some(winning_team) = settlement.winner {
                let games_won = self.record.teams.map(|team| team.games_won);
                self.broadcast(&ServerMessage::GameOver {
                    winning_team,
                    games_won,
                })
                .await;
            }
        }

        self.broadcast_state().await;
    }

    /// Bring the seat mapping in line with the record after `action`.
    async fn sync_registry(&mut self, connection: ConnectionId, action: &Action) {
        let seated = match action {
            Action::JoinSeat { seat, .. } => Some(*seat),
            Action::Rejoin { credential } => self.record.seat_for_credential(credential),
            _ => None,
        };
        if let Some(seat) = seated {
            match self.registry.assign(connection, seat).await {
                Ok(Some(evicted)) => log::debug!(
                    "Table '{}': connection {} replaced {} at seat {}",
                    self.config.name,
                    connection,
                    evicted,
                    seat
                ),
                Ok(None) => {}
                Err(e) => {
                    // The connection closed before its seat was attached.
                    log::debug!("Table '{}': seat {} left dark: {}", self.config.name, seat, e);
                    self.mark_disconnected(seat).await;
                }
            }
        }

        // Seats that were left, kicked or freed by a restart lose their
        // connection, which stays on as a spectator.
        for seat in 0..NUM_SEATS {
            let open = self
                .record
                .player(seat)
                .is_none_or(|player| player.presence == Presence::Vacated);
            if open && let Some(released) = self.registry.release(seat).await {
                log::debug!(
                    "Table '{}': connection {} unseated from seat {}",
                    self.config.name,
                    released,
                    seat
                );
            }
        }
    }

    /// Returns true if the record changed.
    async fn mark_disconnected(&mut self, seat: SeatIndex) -> bool {
        if self.registry.holder(seat).await.is_some() {
            return false;
        }
        let connected = self
            .record
            .player(seat)
            .is_some_and(|player| player.is_connected());
        if connected {
            log::info!("Table '{}': seat {} disconnected", self.config.name, seat);
            self.record.disconnect(seat);
        }
        connected
    }

    /// Drop connections that failed delivery, then tell everyone else about
    /// any seat that went dark. Repeats while that follow-up pass stalls more.
    async fn reap_stalled(&mut self) {
        while !self.stalled.is_empty() {
            let mut changed = false;
            for connection in std::mem::take(&mut self.stalled) {
                let seat = self.registry.unregister(connection).await;
                log::warn!(
                    "Table '{}': dropping stalled connection {}",
                    self.config.name,
                    connection
                );
                if let Some(seat) = seat {
                    changed |= self.mark_disconnected(seat).await;
                }
            }
            if changed {
                self.broadcast_state().await;
            }
        }
    }

    async fn send_to(&mut self, connection: ConnectionId, message: &ServerMessage) {
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Table '{}': failed to encode message: {}", self.config.name, e);
                return;
            }
        };
        self.deliver(connection, payload).await;
    }

    async fn deliver(&mut self, connection: ConnectionId, payload: String) {
        match self.registry.deliver(connection, payload).await {
            Delivery::Sent => {}
            Delivery::Stalled | Delivery::Gone => {
                if !self.stalled.contains(&connection) {
                    self.stalled.push(connection);
                }
            }
        }
    }

    /// Send the same frame to every connection
    async fn broadcast(&mut self, message: &ServerMessage) {
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Table '{}': failed to encode message: {}", self.config.name, e);
                return;
            }
        };
        for (connection, _) in self.registry.recipients().await {
            self.deliver(connection, payload.clone()).await;
        }
    }

    /// Send each connection its own view of the table
    async fn broadcast_state(&mut self) {
        let state = self.record.table_view();
        for (connection, seat) in self.registry.recipients().await {
            let view = self.record.view_with(state.clone(), seat);
            self.send_to(connection, &ServerMessage::StateUpdate { view })
                .await;
        }
    }

    async fn summary(&self) -> TableSummary {
        TableSummary {
            name: self.config.name.clone(),
            phase: self.record.phase,
            connections: self.registry.len().await,
            seated: self.record.seated_count(),
            target_score: self.record.target_score,
            scores: self.record.teams.map(|team| team.score),
            games_won: self.record.teams.map(|team| team.games_won),
        }
    }
}
