//! Decoded inbound records.
//!
//! Tokenizing raw server lines into these records happens upstream; the
//! engine only ever sees fully typed values.

use crate::{Color, GameResult, Relation};
use serde::{Deserialize, Serialize};

/// Full board state sent after every move or board change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub game_id: u32,
    /// Plies played since the start of the game.
    pub ply: u32,
    /// Board encoding, rank 8 first, as sent by the server.
    pub board: String,
    pub side_to_move: Color,
    pub relation: Relation,
    pub white_name: String,
    pub black_name: String,
    pub initial_time_secs: u32,
    pub increment_secs: u32,
    pub clock_running: bool,
    pub white_time_ms: i64,
    pub black_time_ms: i64,
    pub flipped: bool,
    pub move_verbose: Option<String>,
    pub move_san: Option<String>,
}

/// Game information announced before the first snapshot of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub game_id: u32,
    pub category: String,
    pub rated: bool,
    pub white_initial_secs: u32,
    pub white_increment_secs: u32,
    pub black_initial_secs: u32,
    pub black_increment_secs: u32,
    pub white_rating: u32,
    pub black_rating: u32,
    pub white_registered: bool,
    pub black_registered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekInfo {
    pub seek_id: u32,
    pub handle: String,
    pub rating: u32,
    pub provisional: bool,
    /// Bitmask of [`crate::titles`] flags.
    pub titles: u32,
    pub match_type: String,
    pub time_minutes: u32,
    pub increment_secs: u32,
    pub rated: bool,
    /// `None` when the seeker accepts either color.
    pub desired_color: Option<Color>,
    pub min_rating: u32,
    pub max_rating: u32,
    pub manual_accept: bool,
    pub formula: bool,
}

/// How an offer record identifies its game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameLocator {
    Id(u32),
    /// The user's played game against this opponent.
    Opponent(String),
    /// The user's primary game.
    Mine,
}

/// Who performed the offer action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferActor {
    User,
    Opponent,
    Player(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferAction {
    Offered,
    Declined,
    Withdrawn,
    /// Takeback counter-offer: replaces the opposing request.
    Countered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub locator: GameLocator,
    pub actor: OfferActor,
    /// Raw offer name as sent by the server (`draw`, `abort`, ...).
    pub kind: String,
    pub action: OfferAction,
    pub plies: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatKind {
    Tell,
    Say,
    Ptell,
    ChannelTell,
    Kibitz,
    Whisper,
    Qtell,
    Shout,
    Ishout,
    Tshout,
    Cshout,
    Announcement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub kind: ChatKind,
    pub sender: Option<String>,
    pub titles: String,
    pub rating: Option<u32>,
    pub message: String,
    /// Game or channel number the message was sent to.
    pub forum: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    GameInfo(GameMetadata),
    Board(BoardSnapshot),
    GameClose { game_id: u32, result: GameResult },
    IllegalMove {
        move_string: Option<String>,
        reason: Option<String>,
    },
    BsetupMode { entered: bool },
    PrimaryGameChanged { game_id: u32 },
    SimulBoardChanged { game_id: u32 },
    SeekAdded(SeekInfo),
    SeeksRemoved { seek_ids: Vec<u32> },
    SeeksCleared,
    Offer(OfferRecord),
    TakebackUpdated { game_id: u32, plies: u32 },
    Chat(ChatMessage),
    PlainText { line: String },
}
