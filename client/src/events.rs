use crate::game::Game;
use crate::seeks::Seek;
use shared::{ChatMessage, Color, GameResult, Move};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Game,
    Move,
    Clock,
    BoardFlip,
    Offer,
    Seek,
    Chat,
    PlainText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferKind {
    Draw,
    Abort,
    Adjourn,
    Takeback,
}

impl OfferKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "draw" => Some(OfferKind::Draw),
            "abort" => Some(OfferKind::Abort),
            "adjourn" => Some(OfferKind::Adjourn),
            "takeback" => Some(OfferKind::Takeback),
            _ => None,
        }
    }
}

/// A notification derived from one or more inbound records.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    GameStarted(Game),
    GameEnded {
        game: Game,
        result: GameResult,
    },
    MoveMade {
        game_id: u32,
        mv: Move,
        san: Option<String>,
    },
    Takeback {
        game_id: u32,
        plies: u32,
    },
    PositionChanged {
        game_id: u32,
        board: String,
        side_to_move: Color,
        ply: u32,
    },
    IllegalMove {
        game_id: u32,
        mv: Move,
    },
    ClockAdjusted {
        game_id: u32,
        color: Color,
        time_ms: i64,
        running: bool,
    },
    BoardFlipped {
        game_id: u32,
        flipped: bool,
    },
    /// `plies` is set for takeback offers only.
    Offer {
        game_id: u32,
        color: Color,
        kind: OfferKind,
        made: bool,
        plies: Option<u32>,
    },
    SeekAdded(Seek),
    SeekRemoved(Seek),
    Chat(ChatMessage),
    PlainText(String),
}

impl Event {
    pub fn category(&self) -> Category {
        match self {
            Event::GameStarted(_) | Event::GameEnded { .. } => Category::Game,
            Event::MoveMade { .. }
            | Event::Takeback { .. }
            | Event::PositionChanged { .. }
            | Event::IllegalMove { .. } => Category::Move,
            Event::ClockAdjusted { .. } => Category::Clock,
            Event::BoardFlipped { .. } => Category::BoardFlip,
            Event::Offer { .. } => Category::Offer,
            Event::SeekAdded(_) | Event::SeekRemoved(_) => Category::Seek,
            Event::Chat(_) => Category::Chat,
            Event::PlainText(_) => Category::PlainText,
        }
    }
}
