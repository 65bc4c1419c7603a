use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// Category attached to games the server started without announcing them.
pub const PLACEHOLDER_CATEGORY: &str = "placeholder";

/// Rule families the client knows how to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Standard,
    /// Castling allowed on both wings regardless of the king's start file.
    BothSidesCastling,
    NoCastling,
    /// Chess-like rules with no further special handling.
    ChessLike,
    FischerRandom,
    Suicide,
    Atomic,
    Losers,
    /// Stand-in for games whose real category the server never sent.
    Placeholder,
}

impl Variant {
    /// Maps a server category name, e.g. `blitz` or `wild/fr`.
    pub fn resolve(category: &str) -> Result<Self, SyncError> {
        let unsupported = || SyncError::UnsupportedVariant(category.to_string());

        if ["lightning", "blitz", "standard", "untimed"]
            .iter()
            .any(|name| category.eq_ignore_ascii_case(name))
        {
            return Ok(Variant::Standard);
        }

        if let Some(wild) = category.strip_prefix("wild/") {
            return match wild {
                "0" | "1" => Ok(Variant::BothSidesCastling),
                "2" | "3" => Ok(Variant::NoCastling),
                "5" | "8" | "8a" => Ok(Variant::ChessLike),
                "fr" => Ok(Variant::FischerRandom),
                _ => Err(unsupported()),
            };
        }

        match category {
            "suicide" => Ok(Variant::Suicide),
            "losers" => Ok(Variant::Losers),
            "atomic" => Ok(Variant::Atomic),
            PLACEHOLDER_CATEGORY => Ok(Variant::Placeholder),
            _ => Err(unsupported()),
        }
    }
}
