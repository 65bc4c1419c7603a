use crate::echo::PendingMoves;
use crate::error::SyncError;
use crate::offers::OfferTracker;
use crate::variant::{Variant, PLACEHOLDER_CATEGORY};
use log::warn;
use shared::{BoardSnapshot, Color, GameMetadata, GameResult, GameType, Move};

/// Read-only description of a tracked game.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: u32,
    pub category: String,
    pub variant: Variant,
    pub game_type: GameType,
    /// False for examined games and isolated positions.
    pub played: bool,
    pub rated: bool,
    pub white_name: String,
    pub black_name: String,
    pub white_rating: Option<u32>,
    pub black_rating: Option<u32>,
    pub white_time_ms: u64,
    pub white_increment_ms: u64,
    pub black_time_ms: u64,
    pub black_increment_ms: u64,
    /// The side the user plays, for played games of the user only.
    pub user_player: Option<Color>,
    pub initially_flipped: bool,
    pub initial_board: String,
    pub initial_side_to_move: Color,
    pub starting_ply: u32,
    pub result: Option<GameResult>,
}

impl Game {
    pub fn new(metadata: &GameMetadata, variant: Variant, snapshot: &BoardSnapshot) -> Self {
        let game_type = snapshot.relation.game_type();
        let played = snapshot.relation.is_played();

        let user_player = if game_type == GameType::Mine && played {
            if snapshot.relation.is_my_turn() {
                Some(snapshot.side_to_move)
            } else {
                Some(snapshot.side_to_move.opponent())
            }
        } else {
            None
        };

        Self {
            id: metadata.game_id,
            category: metadata.category.clone(),
            variant,
            game_type,
            played,
            rated: metadata.rated,
            white_name: snapshot.white_name.clone(),
            black_name: snapshot.black_name.clone(),
            white_rating: metadata.white_registered.then_some(metadata.white_rating),
            black_rating: metadata.black_registered.then_some(metadata.black_rating),
            white_time_ms: u64::from(metadata.white_initial_secs) * 1000,
            white_increment_ms: u64::from(metadata.white_increment_secs) * 1000,
            black_time_ms: u64::from(metadata.black_initial_secs) * 1000,
            black_increment_ms: u64::from(metadata.black_increment_secs) * 1000,
            user_player,
            initially_flipped: snapshot.flipped,
            initial_board: snapshot.board.clone(),
            initial_side_to_move: snapshot.side_to_move,
            starting_ply: snapshot.ply,
            result: None,
        }
    }

    /// Stand-in metadata for a game whose first snapshot arrived unannounced.
    pub fn placeholder_metadata(snapshot: &BoardSnapshot) -> GameMetadata {
        GameMetadata {
            game_id: snapshot.game_id,
            category: PLACEHOLDER_CATEGORY.to_string(),
            rated: false,
            white_initial_secs: snapshot.initial_time_secs,
            white_increment_secs: snapshot.increment_secs,
            black_initial_secs: snapshot.initial_time_secs,
            black_increment_secs: snapshot.increment_secs,
            white_rating: 0,
            black_rating: 0,
            white_registered: false,
            black_registered: false,
        }
    }

    pub fn player_named(&self, name: &str) -> Option<Color> {
        if self.white_name == name {
            Some(Color::White)
        } else if self.black_name == name {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn name_of(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_name,
            Color::Black => &self.black_name,
        }
    }

    pub fn require_mine(&self) -> Result<(), SyncError> {
        if self.game_type != GameType::Mine {
            return Err(self.violation("a game of the user"));
        }
        Ok(())
    }

    pub fn require_played(&self) -> Result<(), SyncError> {
        if self.game_type != GameType::Mine || !self.played {
            return Err(self.violation("a played game of the user"));
        }
        Ok(())
    }

    pub fn require_examined(&self) -> Result<(), SyncError> {
        if self.game_type != GameType::Mine || self.played {
            return Err(self.violation("a game examined by the user"));
        }
        Ok(())
    }

    fn violation(&self, expected: &'static str) -> SyncError {
        SyncError::PreconditionViolation {
            game_id: self.id,
            expected,
        }
    }
}

/// How a new snapshot relates to the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    MoveMade(Move),
    Takeback(u32),
    PositionReset,
    Unchanged,
}

#[derive(Debug)]
pub struct InternalGameState {
    pub game: Game,
    moves: Vec<Move>,
    board: BoardSnapshot,
    bsetup: bool,
    pub offers: OfferTracker,
    pub pending: PendingMoves,
}

impl InternalGameState {
    pub fn new(game: Game, snapshot: BoardSnapshot) -> Self {
        Self {
            offers: OfferTracker::new(game.id),
            game,
            moves: Vec::new(),
            board: snapshot,
            bsetup: false,
            pending: PendingMoves::new(),
        }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn board(&self) -> &BoardSnapshot {
        &self.board
    }

    pub fn in_bsetup(&self) -> bool {
        self.bsetup
    }

    pub fn set_bsetup(&mut self, entered: bool) {
        self.bsetup = entered;
    }

    /// Classifies `next` against the last snapshot seen for this game.
    ///
    /// In bsetup mode every snapshot reflects an edit, so it always resets
    /// the position.
    pub fn classify(&self, next: &BoardSnapshot) -> Transition {
        if self.bsetup {
            return Transition::PositionReset;
        }

        let difference = i64::from(next.ply) - i64::from(self.board.ply);
        match difference {
            d if d < 0 => {
                let plies = d.unsigned_abs();
                if plies <= self.moves.len() as u64 {
                    Transition::Takeback(plies as u32)
                } else {
                    Transition::PositionReset
                }
            }
            // Refreshes and re-sends after an illegal move.
            0 => Transition::Unchanged,
            1 => match next.move_verbose.as_deref() {
                Some(verbose) => match Move::from_verbose(verbose) {
                    Ok(mv) => Transition::MoveMade(mv),
                    Err(e) => {
                        warn!("Game {}: unreadable move '{}': {}", self.game.id, verbose, e);
                        Transition::PositionReset
                    }
                },
                None => Transition::PositionReset,
            },
            _ => Transition::PositionReset,
        }
    }

    pub fn push_move(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// Drops the last `plies` moves. The caller has checked the count via
    /// [`InternalGameState::classify`].
    pub fn take_back(&mut self, plies: u32) {
        let keep = self.moves.len().saturating_sub(plies as usize);
        self.moves.truncate(keep);
    }

    /// Restarts move tracking from the position in `snapshot`.
    pub fn reset_position(&mut self, snapshot: &BoardSnapshot) {
        self.game.initial_board = snapshot.board.clone();
        self.game.initial_side_to_move = snapshot.side_to_move;
        self.game.starting_ply = snapshot.ply;
        self.moves.clear();
    }

    /// Stores `snapshot` as the latest one, returning the one it replaces.
    pub fn replace_board(&mut self, snapshot: BoardSnapshot) -> BoardSnapshot {
        std::mem::replace(&mut self.board, snapshot)
    }
}
