use std::fmt;

use serde::{Deserialize, Serialize};
use crate::BinCodeMessage;

/// Stable identity of a player, allocated by the room roster. Survives
/// reconnection; a fresh websocket re-binds to the same id by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Light and dark shades of a player's assigned hue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    pub light: String,
    pub dark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub emoji: String,
    pub color_index: usize,
    pub score: i64,
    pub likes: u32,
    pub connected: bool,
}

/// One entry of a voting screen's option list. `is_correct` is consumed by
/// the reveal animation, never shown before the vote is cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOption {
    pub text: String,
    pub player_id: PlayerId,
    pub is_correct: bool,
}

/// A recorded guess with its author's display name resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessEntry {
    pub player_id: PlayerId,
    pub player: String,
    pub guess: String,
}

/// A recorded vote with its voter's display name resolved and the
/// correctness verdict attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub player_id: PlayerId,
    pub voter: String,
    pub vote: Option<String>,
    pub likes: Vec<String>,
    pub correct: bool,
}

/// Everything the server pushes at clients, both targeted and broadcast.
///
/// The drawing and voting countdowns tick as `TimerTick`; the guessing
/// countdown has its own pair so a late guess screen can tell them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerEvent {
    Joined {
        player_id: PlayerId,
        colors: ColorPair,
    },
    GameInProgress,
    EmojiTaken {
        message: String,
    },
    UpdateLobby {
        players: Vec<PlayerSummary>,
    },
    GameStarted {
        round: u32,
    },
    YourTurnDraw {
        prompt: String,
        round: u32,
    },
    TimerTick {
        time: u32,
    },
    TimerExpired,
    ShowGuessingPhase,
    YourTurnGuess {
        image: Vec<u8>,
        drawing_index: usize,
    },
    GuessTimerTick {
        time: u32,
    },
    GuessTimerExpired,
    ShowVotingPhase,
    YourTurnVote {
        image: Vec<u8>,
        options: Vec<VoteOption>,
        artist_id: PlayerId,
        players: Vec<PlayerSummary>,
    },
    ShowCurrentScores {
        correct_answer: String,
        artist_id: PlayerId,
        drawing_image: Vec<u8>,
        scores: Vec<(PlayerId, i64)>,
        likes: Vec<(PlayerId, u32)>,
        players: Vec<PlayerSummary>,
        guesses: Vec<GuessEntry>,
        votes: Vec<VoteEntry>,
    },
    ShowFinal {
        scores: Vec<(PlayerId, i64)>,
        likes: Vec<(PlayerId, u32)>,
        players: Vec<PlayerSummary>,
    },
    Wait {
        message: String,
    },
    DuplicateGuess {
        message: String,
    },
    Reset,
}

impl BinCodeMessage<'_> for ServerEvent {}
