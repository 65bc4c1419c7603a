//! Protocol vocabulary shared between the decoding layer and the client engine.
//!
//! Everything in this crate is plain data: the decoded inbound records, the
//! outbound commands with their wire encoding, and the small value types
//! (colors, squares, moves, results) both sides of the engine talk in.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod moves;
pub mod records;

pub use moves::{CastlingSide, Move, MoveParseError, PromotionPiece, Square};
pub use records::{
    BoardSnapshot, ChatKind, ChatMessage, GameLocator, GameMetadata, OfferAction, OfferActor,
    OfferRecord, Record, SeekInfo,
};

/// Upper bound the server uses for an unrestricted opponent rating range.
pub const MAX_SEEK_RATING: u32 = 9999;

/// Ply argument that makes `backward`/`forward` run to either end of a game.
pub const NAVIGATE_ALL_PLIES: u32 = 999;

/// Seeker title bits as sent in seek records.
pub mod titles {
    pub const UNREGISTERED: u32 = 0x01;
    pub const COMPUTER: u32 = 0x02;
    pub const GM: u32 = 0x04;
    pub const IM: u32 = 0x08;
    pub const FM: u32 = 0x10;
    pub const WGM: u32 = 0x20;
    pub const WIM: u32 = 0x40;
    pub const WFM: u32 = 0x80;

    const DISPLAY_ORDER: [(u32, &str); 7] = [
        (COMPUTER, "(C)"),
        (GM, "(GM)"),
        (IM, "(IM)"),
        (FM, "(FM)"),
        (WGM, "(WGM)"),
        (WIM, "(WIM)"),
        (WFM, "(WFM)"),
    ];

    /// Renders the title bits the way the server displays them, e.g. `(C)(GM)`.
    pub fn display(mask: u32) -> String {
        DISPLAY_ORDER
            .iter()
            .filter(|(bit, _)| mask & bit != 0)
            .map(|(_, text)| *text)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Parses the single-letter side code used in board and seek records.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'W' => Some(Color::White),
            'B' => Some(Color::Black),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    /// Played or examined by the user.
    Mine,
    Observed,
    Isolated,
}

/// The user's relation to the game a board snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    IsolatedPosition,
    ObservingExamined,
    Examining,
    PlayingOpponentMove,
    PlayingMyMove,
    ObservingPlayed,
}

impl Relation {
    /// Maps the numeric relation code carried by board records.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -3 => Some(Relation::IsolatedPosition),
            -2 => Some(Relation::ObservingExamined),
            2 => Some(Relation::Examining),
            -1 => Some(Relation::PlayingOpponentMove),
            1 => Some(Relation::PlayingMyMove),
            0 => Some(Relation::ObservingPlayed),
            _ => None,
        }
    }

    pub fn game_type(self) -> GameType {
        match self {
            Relation::Examining | Relation::PlayingOpponentMove | Relation::PlayingMyMove => {
                GameType::Mine
            }
            Relation::ObservingExamined | Relation::ObservingPlayed => GameType::Observed,
            Relation::IsolatedPosition => GameType::Isolated,
        }
    }

    pub fn is_played(self) -> bool {
        matches!(
            self,
            Relation::PlayingOpponentMove | Relation::PlayingMyMove | Relation::ObservingPlayed
        )
    }

    pub fn is_my_turn(self) -> bool {
        self == Relation::PlayingMyMove
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Unknown,
}

impl GameResult {
    /// Maps a score string such as `1-0` or `1/2-1/2`.
    pub fn from_score(score: &str) -> Self {
        match score {
            "1-0" => GameResult::WhiteWins,
            "0-1" => GameResult::BlackWins,
            "1/2-1/2" => GameResult::Draw,
            _ => GameResult::Unknown,
        }
    }
}

/// A plain command written to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Move(Move),
    Resign,
    Draw,
    Abort,
    Adjourn,
    Backward(u32),
    Forward(u32),
    Play(u32),
    Unobserve(u32),
    Unexamine,
    Quit,
    SetSeekInfo(bool),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move(mv) => write!(f, "{}", mv),
            Command::Resign => f.write_str("resign"),
            Command::Draw => f.write_str("draw"),
            Command::Abort => f.write_str("abort"),
            Command::Adjourn => f.write_str("adjourn"),
            Command::Backward(plies) => write!(f, "backward {}", plies),
            Command::Forward(plies) => write!(f, "forward {}", plies),
            Command::Play(seek_id) => write!(f, "play {}", seek_id),
            Command::Unobserve(game_id) => write!(f, "unobserve {}", game_id),
            Command::Unexamine => f.write_str("unexamine"),
            Command::Quit => f.write_str("quit"),
            Command::SetSeekInfo(on) => write!(f, "iset seekinfo {}", if *on { 1 } else { 0 }),
        }
    }
}
