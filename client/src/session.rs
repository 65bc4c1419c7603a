//! Per-connection game state and the record-by-record synchronization logic.
//!
//! A [`Session`] consumes decoded records strictly one at a time and turns
//! each into zero or more [`Event`]s, plus the occasional command the engine
//! itself has to send. It is entirely synchronous; the async plumbing lives
//! in [`crate::connection`].
//!
//! ## Snapshot classification
//!
//! Every board snapshot of a known game is compared with the previous one:
//! a one-ply advance with a verbose move is a move, a backwards step that
//! fits in the recorded move list is a takeback, an unchanged ply count is a
//! refresh, and anything else resets the position. Clocks and board
//! orientation are re-reported on every snapshot regardless.
//!
//! ## Absorbed failures
//!
//! The server routinely refers to games and seeks the client no longer
//! tracks. Such lookup misses end the handling of that record and nothing
//! more; [`Session::process`] never fails.

use crate::config::ClientConfig;
use crate::error::SyncError;
use crate::events::{Event, OfferKind};
use crate::game::{Game, InternalGameState, Transition};
use crate::seeks::{Seek, SeekRegistry};
use crate::variant::Variant;
use log::{debug, info, warn};
use shared::{
    BoardSnapshot, Color, Command, GameLocator, GameMetadata, GameResult, GameType, Move,
    OfferAction, OfferActor, OfferRecord, Record,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// What handling one record produced, in order.
#[derive(Debug, Default)]
pub struct Output {
    pub events: Vec<Event>,
    pub commands: Vec<Command>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.commands.clear();
    }
}

/// Committed state readable outside the ingestion path.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub games: BTreeMap<u32, Game>,
    pub seeks: Vec<Seek>,
}

pub struct Session {
    refresh_seeks_after_game: bool,
    games: BTreeMap<u32, InternalGameState>,
    /// Announced games whose first snapshot has not arrived yet.
    unstarted: HashMap<u32, GameMetadata>,
    /// Games excluded from tracking until they close.
    unsupported: HashSet<u32>,
    seeks: SeekRegistry,
    primary_played: Option<u32>,
    primary_observed: Option<u32>,
    dirty: bool,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            refresh_seeks_after_game: config.refresh_seeks_after_game,
            games: BTreeMap::new(),
            unstarted: HashMap::new(),
            unsupported: HashSet::new(),
            seeks: SeekRegistry::new(),
            primary_played: None,
            primary_observed: None,
            dirty: false,
        }
    }

    /// Handles one record. Failures are logged and otherwise dropped.
    pub fn process(&mut self, record: Record, out: &mut Output) {
        if let Err(e) = self.apply(record, out) {
            debug!("Record ignored: {}", e);
        }
    }

    fn apply(&mut self, record: Record, out: &mut Output) -> Result<(), SyncError> {
        match record {
            Record::GameInfo(metadata) => {
                self.unstarted.insert(metadata.game_id, metadata);
                Ok(())
            }
            Record::Board(snapshot) => self.handle_board(snapshot, out),
            Record::GameClose { game_id, result } => self.close_game(game_id, result, out),
            Record::IllegalMove { move_string, .. } => {
                self.illegal_move(move_string.as_deref(), out)
            }
            Record::BsetupMode { entered } => {
                let game_id = self.find_my_game()?;
                if let Some(state) = self.games.get_mut(&game_id) {
                    state.set_bsetup(entered);
                }
                Ok(())
            }
            Record::PrimaryGameChanged { game_id } => {
                self.primary_observed = Some(game_id);
                Ok(())
            }
            Record::SimulBoardChanged { game_id } => {
                self.primary_played = Some(game_id);
                Ok(())
            }
            Record::SeekAdded(info) => {
                let seek = Seek::from_info(info)?;
                self.seeks.add(seek, &mut out.events);
                self.dirty = true;
                Ok(())
            }
            Record::SeeksRemoved { seek_ids } => {
                self.seeks.remove(&seek_ids, &mut out.events);
                self.dirty = true;
                Ok(())
            }
            Record::SeeksCleared => {
                self.seeks.clear(&mut out.events);
                self.dirty = true;
                Ok(())
            }
            Record::Offer(offer) => self.handle_offer(offer, out),
            Record::TakebackUpdated { game_id, plies } => {
                let state = self
                    .games
                    .get_mut(&game_id)
                    .ok_or(SyncError::NoSuchGame(game_id))?;
                let color = state.offers.takeback_offerer();
                state.offers.update_takeback(color, plies, &mut out.events);
                Ok(())
            }
            Record::Chat(message) => {
                out.events.push(Event::Chat(message));
                Ok(())
            }
            Record::PlainText { line } => {
                out.events.push(Event::PlainText(line));
                Ok(())
            }
        }
    }

    fn handle_board(&mut self, snapshot: BoardSnapshot, out: &mut Output) -> Result<(), SyncError> {
        let game_id = snapshot.game_id;

        if let Some(metadata) = self.unstarted.remove(&game_id) {
            self.start_game(metadata, &snapshot, out)?;
        } else if self.games.contains_key(&game_id) {
            self.advance(&snapshot, out);
        } else if self.unsupported.contains(&game_id) {
            return Ok(());
        } else {
            // The server skips the game info record when examination starts.
            out.events.push(Event::PlainText(format!(
                "Game {} started without game information; tracking it with placeholder details.",
                game_id
            )));
            let metadata = Game::placeholder_metadata(&snapshot);
            self.start_game(metadata, &snapshot, out)?;
        }

        let state = self
            .games
            .get_mut(&game_id)
            .ok_or(SyncError::NoSuchGame(game_id))?;

        for color in [Color::White, Color::Black] {
            let time_ms = match color {
                Color::White => snapshot.white_time_ms,
                Color::Black => snapshot.black_time_ms,
            };
            out.events.push(Event::ClockAdjusted {
                game_id,
                color,
                time_ms,
                running: snapshot.clock_running && snapshot.side_to_move == color,
            });
        }

        let flipped = snapshot.flipped;
        let previous = state.replace_board(snapshot);
        if previous.flipped != flipped {
            out.events.push(Event::BoardFlipped { game_id, flipped });
        }

        Ok(())
    }

    fn start_game(
        &mut self,
        metadata: GameMetadata,
        snapshot: &BoardSnapshot,
        out: &mut Output,
    ) -> Result<(), SyncError> {
        let game_id = metadata.game_id;

        let variant = match Variant::resolve(&metadata.category) {
            Ok(variant) => variant,
            Err(e) => {
                out.events.push(Event::PlainText(format!(
                    "This client does not support the {} variant and is unable to display game {}.",
                    metadata.category, game_id
                )));
                out.events.push(Event::PlainText(
                    "Please use the appropriate command to abort this game.".to_string(),
                ));
                if self.games.remove(&game_id).is_some() {
                    self.dirty = true;
                }
                self.unsupported.insert(game_id);
                return Err(e);
            }
        };

        let game = Game::new(&metadata, variant, snapshot);
        if self.games.contains_key(&game_id) {
            warn!("Game {} restarted while still tracked", game_id);
        }
        self.unsupported.remove(&game_id);

        info!(
            "Game {} started: {} vs {} ({})",
            game_id, game.white_name, game.black_name, game.category
        );
        out.events.push(Event::GameStarted(game.clone()));

        let mine = game.game_type == GameType::Mine;
        self.games
            .insert(game_id, InternalGameState::new(game, snapshot.clone()));
        self.dirty = true;

        // The server suppresses seek removals while the user plays.
        if mine {
            self.seeks.clear(&mut out.events);
        }

        Ok(())
    }

    fn advance(&mut self, snapshot: &BoardSnapshot, out: &mut Output) {
        let game_id = snapshot.game_id;
        let Some(state) = self.games.get_mut(&game_id) else {
            return;
        };

        match state.classify(snapshot) {
            Transition::MoveMade(mv) => {
                out.events.push(Event::MoveMade {
                    game_id,
                    mv,
                    san: snapshot.move_san.clone(),
                });
                if state.pending.confirm(&mv) {
                    debug!("Game {}: move {} echoed", game_id, mv);
                }
                state.push_move(mv);
            }
            Transition::Takeback(plies) => {
                out.events.push(Event::Takeback { game_id, plies });
                state.take_back(plies);
            }
            Transition::PositionReset => {
                state.reset_position(snapshot);
                out.events.push(Event::PositionChanged {
                    game_id,
                    board: snapshot.board.clone(),
                    side_to_move: snapshot.side_to_move,
                    ply: snapshot.ply,
                });
                // Moves made in bsetup come back as position changes.
                if state.in_bsetup() {
                    state.pending.discard_head();
                }
                self.dirty = true;
            }
            Transition::Unchanged => {}
        }
    }

    fn close_game(
        &mut self,
        game_id: u32,
        result: GameResult,
        out: &mut Output,
    ) -> Result<(), SyncError> {
        if self.primary_played == Some(game_id) {
            self.primary_played = None;
        }
        if self.primary_observed == Some(game_id) {
            self.primary_observed = None;
        }

        // Announced games can close before their first snapshot arrives.
        let announced = self.unstarted.remove(&game_id).is_some();

        let Some(mut state) = self.games.remove(&game_id) else {
            if self.unsupported.remove(&game_id) || announced {
                return Ok(());
            }
            return Err(SyncError::NoSuchGame(game_id));
        };

        state.game.result = Some(result);
        info!("Game {} ended: {:?}", game_id, result);
        self.dirty = true;

        let mine = state.game.game_type == GameType::Mine;
        out.events.push(Event::GameEnded {
            game: state.game,
            result,
        });

        if mine && self.refresh_seeks_after_game {
            out.commands.push(Command::SetSeekInfo(true));
        }

        Ok(())
    }

    fn illegal_move(&mut self, move_string: Option<&str>, out: &mut Output) -> Result<(), SyncError> {
        let game_id = self.find_my_game()?;
        let state = self
            .games
            .get_mut(&game_id)
            .ok_or(SyncError::NoSuchGame(game_id))?;

        match state.pending.reject(move_string) {
            Some(mv) => out.events.push(Event::IllegalMove { game_id, mv }),
            // Probably typed directly by the user.
            None => debug!("Game {}: illegal move with nothing pending", game_id),
        }

        Ok(())
    }

    fn handle_offer(&mut self, offer: OfferRecord, out: &mut Output) -> Result<(), SyncError> {
        let kind =
            OfferKind::from_name(&offer.kind).ok_or(SyncError::UnknownOfferKind(offer.kind))?;
        let game_id = self.locate(&offer.locator)?;
        let state = self
            .games
            .get_mut(&game_id)
            .ok_or(SyncError::NoSuchGame(game_id))?;

        let actor = match &offer.actor {
            OfferActor::User => state.game.user_player,
            OfferActor::Opponent => state.game.user_player.map(Color::opponent),
            OfferActor::Player(name) => state.game.player_named(name),
        }
        .ok_or(SyncError::NoSuchGame(game_id))?;

        let events = &mut out.events;
        match offer.action {
            OfferAction::Offered => state.offers.toggle(actor, kind, true, offer.plies, events),
            OfferAction::Declined => {
                state
                    .offers
                    .toggle(actor.opponent(), kind, false, None, events)
            }
            OfferAction::Withdrawn => state.offers.toggle(actor, kind, false, None, events),
            OfferAction::Countered if kind == OfferKind::Takeback => {
                state
                    .offers
                    .offer_takeback(actor, offer.plies.unwrap_or(1), events)
            }
            OfferAction::Countered => state.offers.toggle(actor, kind, true, None, events),
        }

        Ok(())
    }

    fn locate(&self, locator: &GameLocator) -> Result<u32, SyncError> {
        match locator {
            GameLocator::Id(game_id) if self.games.contains_key(game_id) => Ok(*game_id),
            GameLocator::Id(game_id) => Err(SyncError::NoSuchGame(*game_id)),
            GameLocator::Mine => self.find_my_game(),
            GameLocator::Opponent(handle) => self
                .games
                .values()
                .find(|state| {
                    state
                        .game
                        .user_player
                        .is_some_and(|user| state.game.name_of(user.opponent()) == handle)
                })
                .map(|state| state.game.id)
                .ok_or_else(|| SyncError::NoGameAgainst(handle.clone())),
        }
    }

    /// The user's primary game, falling back to the lowest-numbered game of
    /// the user.
    fn find_my_game(&self) -> Result<u32, SyncError> {
        if let Some(game_id) = self.primary_played {
            if self.games.contains_key(&game_id) {
                return Ok(game_id);
            }
        }

        self.games
            .values()
            .find(|state| state.game.game_type == GameType::Mine)
            .map(|state| state.game.id)
            .ok_or(SyncError::NoUserGame)
    }

    /// Queues a move written to the server so its echo can be recognized.
    pub fn record_sent_move(&mut self, game_id: u32, mv: Move) -> Result<(), SyncError> {
        let state = self
            .games
            .get_mut(&game_id)
            .ok_or(SyncError::NoSuchGame(game_id))?;
        state.game.require_mine()?;
        state.pending.push(mv);
        Ok(())
    }

    pub fn game(&self, game_id: u32) -> Option<&InternalGameState> {
        self.games.get(&game_id)
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn seeks(&self) -> &SeekRegistry {
        &self.seeks
    }

    #[cfg(test)]
    pub(crate) fn is_unsupported(&self, game_id: u32) -> bool {
        self.unsupported.contains(&game_id)
    }

    /// Builds a fresh [`View`] if anything visible changed since the last
    /// call.
    pub fn take_view(&mut self) -> Option<View> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }

        Some(View {
            games: self
                .games
                .iter()
                .map(|(id, state)| (*id, state.game.clone()))
                .collect(),
            seeks: self.seeks.iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tests::snapshot;
    use shared::{Relation, SeekInfo, MAX_SEEK_RATING};
    use tokio_test::{assert_err, assert_ok};

    fn session() -> Session {
        Session::new(&ClientConfig::default())
    }

    fn metadata(game_id: u32, category: &str) -> GameMetadata {
        GameMetadata {
            game_id,
            category: category.to_string(),
            rated: true,
            white_initial_secs: 180,
            white_increment_secs: 0,
            black_initial_secs: 180,
            black_increment_secs: 0,
            white_rating: 1720,
            black_rating: 1650,
            white_registered: true,
            black_registered: true,
        }
    }

    fn seek_info(seek_id: u32) -> SeekInfo {
        SeekInfo {
            seek_id,
            handle: format!("seeker{}", seek_id),
            rating: 1400,
            provisional: false,
            titles: 0,
            match_type: "blitz".to_string(),
            time_minutes: 3,
            increment_secs: 0,
            rated: false,
            desired_color: None,
            min_rating: 0,
            max_rating: MAX_SEEK_RATING,
            manual_accept: false,
            formula: false,
        }
    }

    fn feed(session: &mut Session, record: Record) -> Output {
        let mut out = Output::new();
        session.process(record, &mut out);
        out
    }

    fn moves_and_takebacks(out: &Output) -> Vec<&Event> {
        out.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Event::MoveMade { .. } | Event::Takeback { .. } | Event::PositionChanged { .. }
                )
            })
            .collect()
    }

    fn start(session: &mut Session, game_id: u32, ply: u32) {
        feed(session, Record::GameInfo(metadata(game_id, "blitz")));
        feed(session, Record::Board(snapshot(game_id, ply, None)));
    }

    #[test]
    fn test_game_start_with_metadata() {
        let mut session = session();
        feed(&mut session, Record::GameInfo(metadata(4, "blitz")));
        let out = feed(&mut session, Record::Board(snapshot(4, 0, None)));

        match &out.events[0] {
            Event::GameStarted(game) => {
                assert_eq!(game.id, 4);
                assert_eq!(game.variant, Variant::Standard);
                assert_eq!(game.white_rating, Some(1720));
                assert!(game.rated);
            }
            other => panic!("Expected game start, got {:?}", other),
        }

        let clocks = out
            .events
            .iter()
            .filter(|e| matches!(e, Event::ClockAdjusted { .. }))
            .count();
        assert_eq!(clocks, 2);
        assert_eq!(session.game_count(), 1);
    }

    #[test]
    fn test_unannounced_game_gets_placeholder() {
        let mut session = session();
        let out = feed(&mut session, Record::Board(snapshot(8, 20, None)));

        assert!(matches!(out.events[0], Event::PlainText(_)));
        match &out.events[1] {
            Event::GameStarted(game) => {
                assert_eq!(game.variant, Variant::Placeholder);
                assert_eq!(game.starting_ply, 20);
            }
            other => panic!("Expected game start, got {:?}", other),
        }
        assert!(session.game(8).is_some());
    }

    #[test]
    fn test_unsupported_variant_is_excluded() {
        let mut session = session();
        feed(&mut session, Record::GameInfo(metadata(3, "bughouse")));
        let out = feed(&mut session, Record::Board(snapshot(3, 0, None)));

        assert_eq!(out.events.len(), 2);
        assert!(out
            .events
            .iter()
            .all(|e| matches!(e, Event::PlainText(_))));
        assert!(session.game(3).is_none());
        assert!(session.is_unsupported(3));

        // Later snapshots are ignored until the game closes.
        let out = feed(&mut session, Record::Board(snapshot(3, 1, Some("P/e2-e4"))));
        assert!(out.is_empty());

        let out = feed(
            &mut session,
            Record::GameClose {
                game_id: 3,
                result: GameResult::Unknown,
            },
        );
        assert!(out.is_empty());
        assert!(!session.is_unsupported(3));
    }

    #[test]
    fn test_move_list_tracks_ply() {
        let mut session = session();
        start(&mut session, 1, 0);

        let moves = ["P/e2-e4", "P/e7-e5", "N/g1-f3", "N/b8-c6"];
        for (i, verbose) in moves.iter().enumerate() {
            feed(
                &mut session,
                Record::Board(snapshot(1, i as u32 + 1, Some(verbose))),
            );
            let state = session.game(1).unwrap();
            assert_eq!(
                state.moves().len() as u32,
                state.board().ply - state.game.starting_ply
            );
        }
    }

    #[test]
    fn test_takeback_shrinks_move_list() {
        let mut session = session();
        start(&mut session, 1, 0);
        for (ply, verbose) in [(1, "P/e2-e4"), (2, "P/e7-e5"), (3, "N/g1-f3")] {
            feed(&mut session, Record::Board(snapshot(1, ply, Some(verbose))));
        }

        let out = feed(&mut session, Record::Board(snapshot(1, 1, None)));

        assert_eq!(
            moves_and_takebacks(&out),
            vec![&Event::Takeback {
                game_id: 1,
                plies: 2
            }]
        );
        assert_eq!(session.game(1).unwrap().moves().len(), 1);
    }

    #[test]
    fn test_takeback_beyond_history_resets() {
        let mut session = session();
        start(&mut session, 1, 10);
        feed(&mut session, Record::Board(snapshot(1, 11, Some("P/e2-e4"))));

        let out = feed(&mut session, Record::Board(snapshot(1, 8, None)));

        assert!(matches!(
            moves_and_takebacks(&out)[..],
            [Event::PositionChanged { ply: 8, .. }]
        ));
        let state = session.game(1).unwrap();
        assert!(state.moves().is_empty());
        assert_eq!(state.game.starting_ply, 8);
    }

    #[test]
    fn test_bsetup_always_resets() {
        let mut session = session();
        start(&mut session, 1, 0);
        feed(&mut session, Record::Board(snapshot(1, 1, Some("P/e2-e4"))));
        feed(&mut session, Record::BsetupMode { entered: true });

        for (ply, verbose) in [(1, None), (2, Some("P/e7-e5")), (0, None), (5, None)] {
            let out = feed(&mut session, Record::Board(snapshot(1, ply, verbose)));
            assert!(matches!(
                moves_and_takebacks(&out)[..],
                [Event::PositionChanged { .. }]
            ));
        }

        feed(&mut session, Record::BsetupMode { entered: false });
        let out = feed(&mut session, Record::Board(snapshot(1, 5, None)));
        assert!(moves_and_takebacks(&out).is_empty());
    }

    #[test]
    fn test_refresh_is_silent_apart_from_clocks() {
        let mut session = session();
        start(&mut session, 1, 4);

        let out = feed(&mut session, Record::Board(snapshot(1, 4, None)));

        assert_eq!(out.events.len(), 2);
        assert!(out
            .events
            .iter()
            .all(|e| matches!(e, Event::ClockAdjusted { .. })));
    }

    #[test]
    fn test_clock_and_flip_reporting() {
        let mut session = session();
        start(&mut session, 1, 0);

        let mut next = snapshot(1, 1, Some("P/e2-e4"));
        next.flipped = true;
        next.white_time_ms = 178_500;
        let out = feed(&mut session, Record::Board(next));

        assert!(out.events.contains(&Event::ClockAdjusted {
            game_id: 1,
            color: Color::White,
            time_ms: 178_500,
            running: false,
        }));
        assert!(out.events.contains(&Event::ClockAdjusted {
            game_id: 1,
            color: Color::Black,
            time_ms: 180_000,
            running: true,
        }));
        assert_eq!(
            out.events.last(),
            Some(&Event::BoardFlipped {
                game_id: 1,
                flipped: true
            })
        );
    }

    #[test]
    fn test_echo_confirmation() {
        let mut session = session();
        start(&mut session, 1, 0);
        assert_ok!(session.record_sent_move(1, "e2e4".parse().unwrap()));

        let out = feed(&mut session, Record::Board(snapshot(1, 1, Some("P/e2-e4"))));

        assert!(session.game(1).unwrap().pending.is_empty());
        assert!(!out
            .events
            .iter()
            .any(|e| matches!(e, Event::IllegalMove { .. })));
    }

    #[test]
    fn test_illegal_move_pops_pending() {
        let mut session = session();
        start(&mut session, 1, 0);
        assert_ok!(session.record_sent_move(1, "e2e5".parse().unwrap()));

        let out = feed(
            &mut session,
            Record::IllegalMove {
                move_string: None,
                reason: None,
            },
        );

        assert_eq!(
            out.events,
            vec![Event::IllegalMove {
                game_id: 1,
                mv: "e2e5".parse().unwrap()
            }]
        );
        assert!(session.game(1).unwrap().pending.is_empty());

        let out = feed(
            &mut session,
            Record::IllegalMove {
                move_string: Some("e2e5".to_string()),
                reason: None,
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_sent_move_requires_own_game() {
        let mut session = session();
        feed(&mut session, Record::GameInfo(metadata(2, "blitz")));
        let mut observed = snapshot(2, 0, None);
        observed.relation = Relation::ObservingPlayed;
        feed(&mut session, Record::Board(observed));

        assert!(matches!(
            session.record_sent_move(2, "e2e4".parse().unwrap()),
            Err(SyncError::PreconditionViolation { game_id: 2, .. })
        ));
        let missing = assert_err!(session.record_sent_move(9, "e2e4".parse().unwrap()));
        assert_eq!(missing, SyncError::NoSuchGame(9));
    }

    #[test]
    fn test_own_game_clears_seeks() {
        let mut session = session();
        for id in [4, 9, 2] {
            feed(&mut session, Record::SeekAdded(seek_info(id)));
        }

        feed(&mut session, Record::GameInfo(metadata(1, "blitz")));
        let out = feed(&mut session, Record::Board(snapshot(1, 0, None)));

        let removed: Vec<u32> = out
            .events
            .iter()
            .filter_map(|e| match e {
                Event::SeekRemoved(seek) => Some(seek.id),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![4, 9, 2]);
        assert!(session.seeks().is_empty());
    }

    #[test]
    fn test_observed_game_keeps_seeks() {
        let mut session = session();
        feed(&mut session, Record::SeekAdded(seek_info(4)));

        feed(&mut session, Record::GameInfo(metadata(1, "blitz")));
        let mut observed = snapshot(1, 0, None);
        observed.relation = Relation::ObservingPlayed;
        feed(&mut session, Record::Board(observed));

        assert_eq!(session.seeks().len(), 1);
    }

    #[test]
    fn test_unsupported_seek_never_tracked() {
        let mut session = session();
        let mut info = seek_info(6);
        info.match_type = "bughouse".to_string();

        let out = feed(&mut session, Record::SeekAdded(info));
        assert!(out.is_empty());

        let out = feed(&mut session, Record::SeeksRemoved { seek_ids: vec![6] });
        assert!(out.is_empty());
    }

    #[test]
    fn test_game_close_reports_result_and_refreshes_seeks() {
        let mut session = session();
        start(&mut session, 1, 0);

        let out = feed(
            &mut session,
            Record::GameClose {
                game_id: 1,
                result: GameResult::WhiteWins,
            },
        );

        match &out.events[..] {
            [Event::GameEnded { game, result }] => {
                assert_eq!(*result, GameResult::WhiteWins);
                assert_eq!(game.result, Some(GameResult::WhiteWins));
            }
            other => panic!("Unexpected events: {:?}", other),
        }
        assert_eq!(out.commands, vec![Command::SetSeekInfo(true)]);
        assert!(session.game(1).is_none());

        // A second close is a stale lookup.
        let out = feed(
            &mut session,
            Record::GameClose {
                game_id: 1,
                result: GameResult::Unknown,
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_close_before_first_snapshot_forgets_metadata() {
        let mut session = session();
        feed(&mut session, Record::GameInfo(metadata(6, "suicide")));
        let out = feed(
            &mut session,
            Record::GameClose {
                game_id: 6,
                result: GameResult::Unknown,
            },
        );
        assert!(out.is_empty());

        // The id is reused by a game that arrives without game information.
        let out = feed(&mut session, Record::Board(snapshot(6, 0, None)));

        assert!(matches!(out.events[0], Event::PlainText(_)));
        match &out.events[1] {
            Event::GameStarted(game) => {
                assert_eq!(game.variant, Variant::Placeholder);
                assert_eq!(game.white_rating, None);
            }
            other => panic!("Expected game start, got {:?}", other),
        }
    }

    #[test]
    fn test_seek_refresh_can_be_disabled() {
        let config = ClientConfig {
            refresh_seeks_after_game: false,
            ..ClientConfig::default()
        };
        let mut session = Session::new(&config);
        start(&mut session, 1, 0);

        let out = feed(
            &mut session,
            Record::GameClose {
                game_id: 1,
                result: GameResult::Draw,
            },
        );
        assert!(out.commands.is_empty());
    }

    #[test]
    fn test_offer_routing() {
        let mut session = session();
        // The user plays white against bob.
        start(&mut session, 1, 0);

        let out = feed(
            &mut session,
            Record::Offer(OfferRecord {
                locator: GameLocator::Opponent("bob".to_string()),
                actor: OfferActor::Opponent,
                kind: "draw".to_string(),
                action: OfferAction::Offered,
                plies: None,
            }),
        );
        assert_eq!(
            out.events,
            vec![Event::Offer {
                game_id: 1,
                color: Color::Black,
                kind: OfferKind::Draw,
                made: true,
                plies: None
            }]
        );

        // Declining switches off the opponent's offer.
        let out = feed(
            &mut session,
            Record::Offer(OfferRecord {
                locator: GameLocator::Opponent("bob".to_string()),
                actor: OfferActor::User,
                kind: "draw".to_string(),
                action: OfferAction::Declined,
                plies: None,
            }),
        );
        assert_eq!(
            out.events,
            vec![Event::Offer {
                game_id: 1,
                color: Color::Black,
                kind: OfferKind::Draw,
                made: false,
                plies: None
            }]
        );
    }

    #[test]
    fn test_offer_lookup_misses_are_silent() {
        let mut session = session();
        start(&mut session, 1, 0);

        for offer in [
            OfferRecord {
                locator: GameLocator::Id(1),
                actor: OfferActor::Player("alice".to_string()),
                kind: "pause".to_string(),
                action: OfferAction::Offered,
                plies: None,
            },
            OfferRecord {
                locator: GameLocator::Opponent("zed".to_string()),
                actor: OfferActor::Opponent,
                kind: "draw".to_string(),
                action: OfferAction::Offered,
                plies: None,
            },
            OfferRecord {
                locator: GameLocator::Id(1),
                actor: OfferActor::Player("zed".to_string()),
                kind: "abort".to_string(),
                action: OfferAction::Offered,
                plies: None,
            },
            OfferRecord {
                locator: GameLocator::Id(77),
                actor: OfferActor::Player("alice".to_string()),
                kind: "abort".to_string(),
                action: OfferAction::Offered,
                plies: None,
            },
        ] {
            let out = feed(&mut session, Record::Offer(offer));
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_takeback_counter_and_update() {
        let mut session = session();
        start(&mut session, 1, 0);

        feed(
            &mut session,
            Record::Offer(OfferRecord {
                locator: GameLocator::Id(1),
                actor: OfferActor::Player("alice".to_string()),
                kind: "takeback".to_string(),
                action: OfferAction::Offered,
                plies: Some(2),
            }),
        );

        let out = feed(
            &mut session,
            Record::Offer(OfferRecord {
                locator: GameLocator::Id(1),
                actor: OfferActor::Player("bob".to_string()),
                kind: "takeback".to_string(),
                action: OfferAction::Countered,
                plies: Some(1),
            }),
        );
        assert_eq!(
            out.events,
            vec![
                Event::Offer {
                    game_id: 1,
                    color: Color::White,
                    kind: OfferKind::Takeback,
                    made: false,
                    plies: Some(2)
                },
                Event::Offer {
                    game_id: 1,
                    color: Color::Black,
                    kind: OfferKind::Takeback,
                    made: true,
                    plies: Some(1)
                },
            ]
        );

        let out = feed(
            &mut session,
            Record::TakebackUpdated {
                game_id: 1,
                plies: 3,
            },
        );
        assert_eq!(
            out.events,
            vec![
                Event::Offer {
                    game_id: 1,
                    color: Color::Black,
                    kind: OfferKind::Takeback,
                    made: false,
                    plies: Some(1)
                },
                Event::Offer {
                    game_id: 1,
                    color: Color::Black,
                    kind: OfferKind::Takeback,
                    made: true,
                    plies: Some(3)
                },
            ]
        );
    }

    #[test]
    fn test_passthrough_channels() {
        let mut session = session();
        let out = feed(
            &mut session,
            Record::PlainText {
                line: "fics% ".to_string(),
            },
        );
        assert_eq!(out.events, vec![Event::PlainText("fics% ".to_string())]);
    }

    #[test]
    fn test_primary_game_selection() {
        let mut session = session();
        start(&mut session, 1, 0);
        start(&mut session, 2, 0);
        assert_ok!(session.record_sent_move(2, "d2d4".parse().unwrap()));

        feed(&mut session, Record::SimulBoardChanged { game_id: 2 });
        let out = feed(
            &mut session,
            Record::IllegalMove {
                move_string: None,
                reason: None,
            },
        );

        assert_eq!(
            out.events,
            vec![Event::IllegalMove {
                game_id: 2,
                mv: "d2d4".parse().unwrap()
            }]
        );
    }

    #[test]
    fn test_view_only_built_after_changes() {
        let mut session = session();
        assert!(session.take_view().is_none());

        start(&mut session, 1, 0);
        let view = session.take_view().unwrap();
        assert!(view.games.contains_key(&1));
        assert!(session.take_view().is_none());

        // Clock-only snapshots do not change the view.
        feed(&mut session, Record::Board(snapshot(1, 0, None)));
        assert!(session.take_view().is_none());
    }
}
