//! # Chess Server Synchronization Library
//!
//! This library turns the stream of decoded records a FICS-style chess server
//! sends into a consistent picture of the games, offers and seeks visible to
//! one logged-in user, and reports every change as a typed event.
//!
//! ## Architecture Overview
//!
//! The server never says "a move was made" or "a move was taken back". It
//! sends a full board snapshot after every change and leaves it to the client
//! to work out what happened. The engine is built around that fact.
//!
//! ### Snapshot Classification
//! Each snapshot is compared with the previous one for the same game. The
//! ply difference, the presence of a verbose move and the board-setup mode
//! together decide whether the snapshot is a move, a takeback, a position
//! reset or a plain refresh.
//!
//! ### Move Echoes
//! Moves sent by the user are queued per game until the server echoes them
//! back in a snapshot. An illegal-move record pops the oldest pending move
//! and reports it, since the server does not reliably name the rejected move.
//!
//! ### Strict Ordering
//! All records of one connection are handled by one task, one after the
//! other. Events reach listeners in the order the records arrived, on a
//! separate delivery task, so a slow listener never blocks ingestion.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The synchronous core:
//! - Game start from metadata or placeholder details
//! - Snapshot classification and clock/orientation reporting
//! - Offer and seek record handling
//! - The committed view readable from other tasks
//!
//! ### Connection Module (`connection`)
//! The async shell: the ingestion and delivery tasks, and the
//! [`ConnectionHandle`] through which applications subscribe, look up games
//! and issue commands.
//!
//! ### Dispatch Module (`dispatch`)
//! Registration-ordered fan-out of events to listeners, including the seek
//! replay a late subscriber receives.
//!
//! ### Supporting Modules
//! - `game`: tracked games and their per-game state
//! - `offers`: draw, abort, adjourn and takeback bookkeeping
//! - `echo`: the pending-move queue
//! - `seeks`: the seek registry
//! - `variant`: category name resolution
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::{ClientConfig, Category, Connection, Event};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), client::SyncError> {
//! let (records_tx, records_rx) = mpsc::channel(1000);
//! let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();
//!
//! let handle = Connection::spawn(ClientConfig::default(), records_rx, transport_tx);
//!
//! handle.subscribe(Category::Move, |event: &Event| println!("{:?}", event));
//!
//! // Feed decoded records through `records_tx`, write what arrives on
//! // `transport_rx` to the server.
//! # drop(records_tx);
//! # while let Some(command) = transport_rx.recv().await {
//! #     println!("{}", command);
//! # }
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Handling
//!
//! No record can break a connection. Lookups of games and seeks the client
//! no longer tracks are dropped quietly, unknown variants are reported as
//! plain text and excluded from tracking. Only commands fail, synchronously,
//! when the target game is of the wrong kind.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod echo;
pub mod error;
pub mod events;
pub mod game;
pub mod offers;
pub mod seeks;
pub mod session;
pub mod variant;

pub use config::ClientConfig;
pub use connection::{Connection, ConnectionHandle};
pub use dispatch::{Dispatcher, Listener, ListenerId};
pub use error::SyncError;
pub use events::{Category, Event, OfferKind};
pub use game::Game;
pub use seeks::Seek;
pub use session::{Output, Session, View};
pub use variant::Variant;
