/// Rejections reported back to the player. None of them are fatal; the
/// caller may retry after a reset.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Session ended")]
    SessionEnded,
    #[error("No credits left")]
    InsufficientCredits,
    #[error("No active session")]
    NoActiveSession,
    #[error("You must roll at least twice before cashing out.")]
    InsufficientEngagement { rolls: u64, required: u64 },
    #[error("invalid session snapshot: {0}")]
    InvalidSnapshot(String),
}

pub type GameResult<T> = Result<T, GameError>;
