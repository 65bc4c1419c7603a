/// Failures the engine distinguishes.
///
/// Record handlers absorb every variant; only the command API surfaces
/// errors, synchronously, to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("unknown offer kind: {0}")]
    UnknownOfferKind(String),
    #[error("no such game: {0}")]
    NoSuchGame(u32),
    #[error("the user has no game in progress")]
    NoUserGame,
    #[error("the user has no game against {0}")]
    NoGameAgainst(String),
    #[error("no such seek: {0}")]
    NoSuchSeek(u32),
    #[error("game {game_id} must be {expected}")]
    PreconditionViolation {
        game_id: u32,
        expected: &'static str,
    },
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
    #[error("connection closed")]
    ConnectionClosed,
}
