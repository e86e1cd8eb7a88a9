use serde::{Deserialize, Serialize};
use crate::BinCodeMessage;

/// Actions a player's client may send. Disconnection is not a request; the
/// transport signals it with a close frame or a failed send.
#[derive(Deserialize, Serialize, PartialEq, Debug, Clone)]
pub enum ClientRequest {
    Join {
        name: String,
        emoji: Option<String>,
    },
    StartGame,
    SubmitDrawing {
        image: Vec<u8>,
    },
    /// Extend whichever phase timer is currently running.
    AddTime,
    SubmitGuess {
        guess: String,
    },
    /// Client-signalled fallback when its own guess countdown hits zero.
    GuessTimeUp,
    SubmitVote {
        vote: String,
        likes: Vec<String>,
    },
    /// Artist path: no choice to make on your own drawing, likes only.
    SubmitLikesOnly {
        likes: Vec<String>,
    },
    ContinueToNext,
    NextRound,
    PlayAgain,
}

impl BinCodeMessage<'_> for ClientRequest {}
