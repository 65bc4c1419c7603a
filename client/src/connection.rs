//! The async shell around a [`Session`].
//!
//! [`Connection::spawn`] starts two tasks per connection:
//!
//! - **Ingestion** owns the session. It takes decoded records one at a time
//!   from the record channel, publishes the committed [`View`] through a
//!   `watch` channel and forwards the resulting events. It then waits for
//!   those events to reach every listener before taking the next record, so
//!   listeners never run alongside record processing and always see the view
//!   as of the record that produced their event. Control messages from
//!   handles (sent moves, close) are polled first, so a close is never
//!   followed by another record.
//! - **Delivery** owns the [`Dispatcher`] and calls listeners. Subscription
//!   changes travel on the same channel as events, so they take effect
//!   between two events and never in the middle of one.
//!
//! Outbound commands are written to the transport channel and never
//! acknowledged. The only feedback a sent move gets is its echo or an
//! illegal-move record.

use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, Listener, ListenerId};
use crate::error::SyncError;
use crate::events::{Category, Event};
use crate::game::Game;
use crate::seeks::Seek;
use crate::session::{Output, Session, View};
use log::{debug, info, warn};
use shared::{Command, GameType, Move, Record, NAVIGATE_ALL_PLIES};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

enum Control {
    MakeMove {
        game_id: u32,
        mv: Move,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Close,
}

enum Delivery {
    Event(Event),
    Subscribe {
        id: ListenerId,
        category: Category,
        listener: Box<dyn Listener>,
    },
    Unsubscribe(ListenerId),
    Reset,
    Flush(oneshot::Sender<()>),
}

pub struct Connection {
    session: Session,
    records: mpsc::Receiver<Record>,
    control: mpsc::Receiver<Control>,
    delivery: mpsc::UnboundedSender<Delivery>,
    transport: mpsc::UnboundedSender<Command>,
    view: watch::Sender<View>,
}

impl Connection {
    /// Starts processing `records`, writing outbound commands to
    /// `transport`. The record channel is usually built with
    /// [`ClientConfig::record_channel`].
    pub fn spawn(
        config: ClientConfig,
        records: mpsc::Receiver<Record>,
        transport: mpsc::UnboundedSender<Command>,
    ) -> ConnectionHandle {
        let (control_tx, control_rx) = mpsc::channel(config.command_buffer.max(1));
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(View::default());

        let connection = Connection {
            session: Session::new(&config),
            records,
            control: control_rx,
            delivery: delivery_tx.clone(),
            transport: transport.clone(),
            view: view_tx,
        };

        let ingestion = tokio::spawn(connection.run());
        tokio::spawn(deliver(Dispatcher::new(), delivery_rx));

        ConnectionHandle {
            control: control_tx,
            delivery: delivery_tx,
            transport,
            view: view_rx,
            next_listener: Arc::new(AtomicU64::new(1)),
            ingestion: Arc::new(tokio::sync::Mutex::new(Some(ingestion))),
        }
    }

    async fn run(mut self) {
        info!("Connection started");
        let mut out = Output::new();

        loop {
            tokio::select! {
                biased;

                message = self.control.recv() => match message {
                    Some(Control::MakeMove { game_id, mv, reply }) => {
                        let result = self.send_move(game_id, mv);
                        let _ = reply.send(result);
                    }
                    Some(Control::Close) | None => break,
                },

                record = self.records.recv() => match record {
                    Some(record) => {
                        self.session.process(record, &mut out);
                        self.commit(&mut out).await;
                    }
                    None => {
                        info!("Record stream ended");
                        break;
                    }
                },
            }
        }

        // Everything tracked for this connection goes with it.
        self.view.send_replace(View::default());
        let _ = self.delivery.send(Delivery::Reset);
        info!("Connection closed");
    }

    /// Records the move as pending before writing it, so its echo can
    /// never overtake the expectation.
    fn send_move(&mut self, game_id: u32, mv: Move) -> Result<(), SyncError> {
        self.session.record_sent_move(game_id, mv)?;
        debug!("Game {}: sending move {}", game_id, mv);
        self.transport
            .send(Command::Move(mv))
            .map_err(|_| SyncError::ConnectionClosed)
    }

    async fn commit(&mut self, out: &mut Output) {
        // Readers must see a game before they hear about it.
        if let Some(view) = self.session.take_view() {
            self.view.send_replace(view);
        }

        let delivered = !out.events.is_empty();
        for event in out.events.drain(..) {
            if self.delivery.send(Delivery::Event(event)).is_err() {
                warn!("Delivery task gone, dropping event");
            }
        }

        for command in out.commands.drain(..) {
            debug!("Sending {}", command);
            if self.transport.send(command).is_err() {
                warn!("Transport gone, dropping command");
            }
        }

        if delivered {
            self.wait_for_delivery().await;
        }
    }

    /// Blocks ingestion until the delivery task has handled everything sent
    /// to it so far.
    async fn wait_for_delivery(&self) {
        let (done, wait) = oneshot::channel();
        if self.delivery.send(Delivery::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn deliver(mut dispatcher: Dispatcher, mut messages: mpsc::UnboundedReceiver<Delivery>) {
    while let Some(message) = messages.recv().await {
        match message {
            Delivery::Event(event) => dispatcher.dispatch(&event),
            Delivery::Subscribe {
                id,
                category,
                listener,
            } => dispatcher.subscribe(id, category, listener),
            Delivery::Unsubscribe(id) => {
                if !dispatcher.unsubscribe(id) {
                    debug!("Listener {:?} was not subscribed", id);
                }
            }
            Delivery::Reset => dispatcher.reset(),
            Delivery::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Cloneable access to a running connection.
///
/// Lookups read the last committed view. Commands are checked against that
/// same view before they are written.
#[derive(Clone)]
pub struct ConnectionHandle {
    control: mpsc::Sender<Control>,
    delivery: mpsc::UnboundedSender<Delivery>,
    transport: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<View>,
    next_listener: Arc<AtomicU64>,
    ingestion: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl ConnectionHandle {
    pub fn subscribe<L>(&self, category: Category, listener: L) -> ListenerId
    where
        L: Listener + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let message = Delivery::Subscribe {
            id,
            category,
            listener: Box::new(listener),
        };
        if self.delivery.send(message).is_err() {
            warn!("Delivery task gone, listener {:?} dropped", id);
        }
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        let _ = self.delivery.send(Delivery::Unsubscribe(id));
    }

    pub fn game(&self, game_id: u32) -> Result<Game, SyncError> {
        self.view
            .borrow()
            .games
            .get(&game_id)
            .cloned()
            .ok_or(SyncError::NoSuchGame(game_id))
    }

    pub fn games(&self) -> Vec<Game> {
        self.view.borrow().games.values().cloned().collect()
    }

    /// Open seeks in registry order.
    pub fn seeks(&self) -> Vec<Seek> {
        self.view.borrow().seeks.clone()
    }

    /// Sends a move in one of the user's games. Fails if the game is not
    /// tracked, is not the user's, or the connection is closed. Rejection by
    /// the server arrives later as an illegal-move event.
    pub async fn make_move(&self, game_id: u32, mv: Move) -> Result<(), SyncError> {
        let (reply, response) = oneshot::channel();
        self.control
            .send(Control::MakeMove { game_id, mv, reply })
            .await
            .map_err(|_| SyncError::ConnectionClosed)?;
        response.await.map_err(|_| SyncError::ConnectionClosed)?
    }

    pub fn resign(&self, game_id: u32) -> Result<(), SyncError> {
        self.game(game_id)?.require_played()?;
        self.send(Command::Resign)
    }

    pub fn request_draw(&self, game_id: u32) -> Result<(), SyncError> {
        self.game(game_id)?.require_played()?;
        self.send(Command::Draw)
    }

    pub fn request_abort(&self, game_id: u32) -> Result<(), SyncError> {
        self.game(game_id)?.require_played()?;
        self.send(Command::Abort)
    }

    pub fn request_adjourn(&self, game_id: u32) -> Result<(), SyncError> {
        self.game(game_id)?.require_played()?;
        self.send(Command::Adjourn)
    }

    pub fn go_backward(&self, game_id: u32, plies: u32) -> Result<(), SyncError> {
        self.game(game_id)?.require_examined()?;
        self.send(Command::Backward(plies))
    }

    pub fn go_forward(&self, game_id: u32, plies: u32) -> Result<(), SyncError> {
        self.game(game_id)?.require_examined()?;
        self.send(Command::Forward(plies))
    }

    pub fn go_to_beginning(&self, game_id: u32) -> Result<(), SyncError> {
        self.go_backward(game_id, NAVIGATE_ALL_PLIES)
    }

    pub fn go_to_end(&self, game_id: u32) -> Result<(), SyncError> {
        self.go_forward(game_id, NAVIGATE_ALL_PLIES)
    }

    /// Leaves a game the way its type requires: resigning a played game,
    /// unexamining an examined one, unobserving an observed one. Isolated
    /// positions need nothing.
    pub fn quit_game(&self, game_id: u32) -> Result<(), SyncError> {
        let game = self.game(game_id)?;
        match game.game_type {
            GameType::Mine if game.played => self.send(Command::Resign),
            GameType::Mine => self.send(Command::Unexamine),
            GameType::Observed => self.send(Command::Unobserve(game_id)),
            GameType::Isolated => Ok(()),
        }
    }

    pub fn accept_seek(&self, seek_id: u32) -> Result<(), SyncError> {
        let known = self.view.borrow().seeks.iter().any(|seek| seek.id == seek_id);
        if !known {
            return Err(SyncError::NoSuchSeek(seek_id));
        }
        self.send(Command::Play(seek_id))
    }

    /// Asks the server to end the session.
    pub fn exit(&self) -> Result<(), SyncError> {
        self.send(Command::Quit)
    }

    /// Stops record processing and discards all state. Records still queued
    /// are dropped unprocessed.
    pub async fn close(&self) {
        let _ = self.control.send(Control::Close).await;
        self.join().await;
    }

    /// Waits for record processing to stop, either after [`close`] or once
    /// every record sender is gone and the queue is drained.
    ///
    /// [`close`]: ConnectionHandle::close
    pub async fn join(&self) {
        if let Some(ingestion) = self.ingestion.lock().await.take() {
            if let Err(e) = ingestion.await {
                warn!("Ingestion task failed: {}", e);
            }
        }
    }

    /// Waits until every event forwarded so far has reached its listeners.
    pub async fn flush(&self) -> Result<(), SyncError> {
        let (done, wait) = oneshot::channel();
        self.delivery
            .send(Delivery::Flush(done))
            .map_err(|_| SyncError::ConnectionClosed)?;
        wait.await.map_err(|_| SyncError::ConnectionClosed)
    }

    /// Waits until the next committed view is published.
    pub async fn changed(&mut self) -> Result<(), SyncError> {
        self.view
            .changed()
            .await
            .map_err(|_| SyncError::ConnectionClosed)
    }

    fn send(&self, command: Command) -> Result<(), SyncError> {
        debug!("Sending {}", command);
        self.transport
            .send(command)
            .map_err(|_| SyncError::ConnectionClosed)
    }
}
