use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveParseError {
    #[error("invalid square: {0}")]
    InvalidSquare(String),
    #[error("invalid promotion piece: {0}")]
    InvalidPiece(char),
    #[error("malformed move: {0}")]
    Malformed(String),
}

/// A board square, file and rank both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }
}

impl FromStr for Square {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(MoveParseError::InvalidSquare(s.to_string()));
        }

        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| MoveParseError::InvalidSquare(s.to_string()))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, (b'1' + self.rank) as char)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastlingSide {
    Kingside,
    Queenside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromotionPiece {
    Queen,
    Rook,
    Bishop,
    Knight,
    // Suicide chess lets pawns promote to a king.
    King,
}

impl PromotionPiece {
    /// The server sends promotion letters upper case for both sides.
    pub fn from_letter(letter: char) -> Result<Self, MoveParseError> {
        match letter.to_ascii_uppercase() {
            'Q' => Ok(PromotionPiece::Queen),
            'R' => Ok(PromotionPiece::Rook),
            'B' => Ok(PromotionPiece::Bishop),
            'N' => Ok(PromotionPiece::Knight),
            'K' => Ok(PromotionPiece::King),
            _ => Err(MoveParseError::InvalidPiece(letter)),
        }
    }

    pub fn letter(self) -> char {
        match self {
            PromotionPiece::Queen => 'Q',
            PromotionPiece::Rook => 'R',
            PromotionPiece::Bishop => 'B',
            PromotionPiece::Knight => 'N',
            PromotionPiece::King => 'K',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Normal {
        from: Square,
        to: Square,
    },
    Castling {
        side: CastlingSide,
    },
    Promotion {
        from: Square,
        to: Square,
        piece: PromotionPiece,
    },
}

impl Move {
    /// Canonical string the server accepts for this move.
    pub fn to_protocol_string(&self) -> String {
        match self {
            Move::Normal { from, to } => format!("{}{}", from, to),
            Move::Castling {
                side: CastlingSide::Kingside,
            } => "O-O".to_string(),
            Move::Castling {
                side: CastlingSide::Queenside,
            } => "O-O-O".to_string(),
            Move::Promotion { from, to, piece } => format!("{}{}={}", from, to, piece.letter()),
        }
    }

    /// Parses the verbose move of a board snapshot: `P/e2-e4`, `P/e7-e8=Q`,
    /// `o-o` or `o-o-o`.
    pub fn from_verbose(verbose: &str) -> Result<Self, MoveParseError> {
        if verbose.eq_ignore_ascii_case("o-o") {
            return Ok(Move::Castling {
                side: CastlingSide::Kingside,
            });
        }
        if verbose.eq_ignore_ascii_case("o-o-o") {
            return Ok(Move::Castling {
                side: CastlingSide::Queenside,
            });
        }

        let malformed = || MoveParseError::Malformed(verbose.to_string());
        if verbose.as_bytes().get(1) != Some(&b'/') {
            return Err(malformed());
        }

        let from: Square = verbose.get(2..4).ok_or_else(malformed)?.parse()?;
        let to: Square = verbose.get(5..7).ok_or_else(malformed)?.parse()?;

        match verbose.find('=') {
            Some(idx) => {
                let letter = verbose[idx + 1..].chars().next().ok_or_else(malformed)?;
                Ok(Move::Promotion {
                    from,
                    to,
                    piece: PromotionPiece::from_letter(letter)?,
                })
            }
            None => Ok(Move::Normal { from, to }),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_protocol_string())
    }
}

/// Parses the protocol form produced by [`Move::to_protocol_string`].
impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "O-O" | "o-o" => {
                return Ok(Move::Castling {
                    side: CastlingSide::Kingside,
                })
            }
            "O-O-O" | "o-o-o" => {
                return Ok(Move::Castling {
                    side: CastlingSide::Queenside,
                })
            }
            _ => {}
        }

        let malformed = || MoveParseError::Malformed(s.to_string());
        let from: Square = s.get(0..2).ok_or_else(malformed)?.parse()?;
        let to: Square = s.get(2..4).ok_or_else(malformed)?.parse()?;

        match s.get(4..).ok_or_else(malformed)? {
            "" => Ok(Move::Normal { from, to }),
            rest => {
                let mut chars = rest.chars();
                match (chars.next(), chars.next(), chars.next()) {
                    (Some('='), Some(letter), None) => Ok(Move::Promotion {
                        from,
                        to,
                        piece: PromotionPiece::from_letter(letter)?,
                    }),
                    _ => Err(malformed()),
                }
            }
        }
    }
}
