use thiserror::Error;

/// Join-time rejections. Everything else in the room degrades to a no-op or
/// a targeted message instead of failing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("game is already in progress")]
    GameInProgress,
    #[error("room is full")]
    RoomFull,
    #[error("Emoji {emoji} is already taken by {holder}!")]
    EmojiTaken { emoji: String, holder: String },
}

pub type RoomResult<T> = Result<T, RoomError>;
