//! Round state: the phase, the drawings of the round in submission order,
//! and the per-drawing guess and vote sets. All collection rules live here;
//! the actor in `mod.rs` decides when a phase is complete because that
//! depends on who is still connected.

use std::collections::{HashMap, HashSet};

use protocol::PlayerId;
use thiserror::Error;

use super::scoring::ScoreReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Drawing,
    Guessing(usize),
    Voting(usize),
    /// Scores for the indexed drawing are on screen; waiting for everyone
    /// to hit continue.
    Scoreboard(usize),
    Final,
}

#[derive(Debug, Clone)]
pub struct Drawing {
    pub artist: PlayerId,
    pub prompt: String,
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Guess {
    pub player: PlayerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub player: PlayerId,
    /// `None` for the artist's likes-only submission; an empty string for a
    /// timed-out voter.
    pub choice: Option<String>,
    pub liked: Vec<String>,
}

/// Why a guess bounced. The message goes back to the sender only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuessRejection {
    #[error("That's the real prompt! Try guessing something different.")]
    RealPrompt,
    #[error("That prompt has already been submitted! Try something different.")]
    Duplicate,
    #[error("Submit an actual guess first!")]
    Blank,
}

pub struct State {
    pub phase: Phase,
    pub round: u32,
    pub drawings: Vec<Drawing>,
    pub guesses: HashMap<usize, Vec<Guess>>,
    pub votes: HashMap<usize, Vec<Vote>>,
    /// Cursor into `drawings` while guessing/voting/scoring.
    pub current: usize,
    pub continue_ready: HashSet<PlayerId>,
    /// Cached scoreboard of the drawing currently on screen, for resyncing
    /// reconnecting players without re-scoring.
    pub last_report: Option<ScoreReport>,
}

impl State {
    pub fn new() -> Self {
        Self {
            phase: Phase::Lobby,
            round: 0,
            drawings: Vec::new(),
            guesses: HashMap::new(),
            votes: HashMap::new(),
            current: 0,
            continue_ready: HashSet::new(),
            last_report: None,
        }
    }

    /// Clears the round collections and bumps the round counter.
    pub fn start_round(&mut self) {
        self.round += 1;
        self.drawings.clear();
        self.guesses.clear();
        self.votes.clear();
        self.current = 0;
        self.continue_ready.clear();
        self.last_report = None;
    }

    /// Back to a pristine lobby. Player tallies live in the roster and are
    /// the caller's business.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn artist_of(&self, index: usize) -> Option<PlayerId> {
        self.drawings.get(index).map(|d| d.artist)
    }

    pub fn has_drawn(&self, player: PlayerId) -> bool {
        self.drawings.iter().any(|d| d.artist == player)
    }

    /// Stores a drawing unless this artist already has one this round.
    pub fn record_drawing(&mut self, artist: PlayerId, prompt: String, image: Vec<u8>) -> bool {
        if self.has_drawn(artist) {
            return false;
        }
        self.drawings.push(Drawing {
            artist,
            prompt,
            image,
        });
        true
    }

    /// Validates and stores a guess. `Ok(true)` means stored, `Ok(false)`
    /// means this player already guessed (silently ignored).
    pub fn record_guess(
        &mut self,
        index: usize,
        player: PlayerId,
        text: String,
        accept_blank: bool,
    ) -> Result<bool, GuessRejection> {
        let Some(drawing) = self.drawings.get(index) else {
            return Ok(false);
        };
        if text.is_empty() && !accept_blank {
            return Err(GuessRejection::Blank);
        }
        let folded = text.to_lowercase();
        if folded == drawing.prompt.to_lowercase() {
            return Err(GuessRejection::RealPrompt);
        }
        let guesses = self.guesses.entry(index).or_default();
        if guesses
            .iter()
            .any(|g| !g.text.is_empty() && g.text.to_lowercase() == folded)
        {
            return Err(GuessRejection::Duplicate);
        }
        if guesses.iter().any(|g| g.player == player) {
            return Ok(false);
        }
        guesses.push(Guess { player, text });
        Ok(true)
    }

    /// Timeout path: a blank guess for every listed player still missing
    /// one.
    pub fn fill_missing_guesses(
        &mut self,
        index: usize,
        players: impl IntoIterator<Item = PlayerId>,
    ) {
        let guesses = self.guesses.entry(index).or_default();
        for player in players {
            if !guesses.iter().any(|g| g.player == player) {
                guesses.push(Guess {
                    player,
                    text: String::new(),
                });
            }
        }
    }

    /// Stores a vote unless this player already has one for the drawing.
    pub fn record_vote(
        &mut self,
        index: usize,
        player: PlayerId,
        choice: Option<String>,
        liked: Vec<String>,
    ) -> bool {
        if index >= self.drawings.len() {
            return false;
        }
        let votes = self.votes.entry(index).or_default();
        if votes.iter().any(|v| v.player == player) {
            return false;
        }
        votes.push(Vote {
            player,
            choice,
            liked,
        });
        true
    }

    pub fn guess_count(&self, index: usize) -> usize {
        self.guesses.get(&index).map_or(0, Vec::len)
    }

    pub fn vote_count(&self, index: usize) -> usize {
        self.votes.get(&index).map_or(0, Vec::len)
    }

    pub fn guessed(&self, index: usize, player: PlayerId) -> bool {
        self.guesses
            .get(&index)
            .map_or(false, |gs| gs.iter().any(|g| g.player == player))
    }

    pub fn voted(&self, index: usize, player: PlayerId) -> bool {
        self.votes
            .get(&index)
            .map_or(false, |vs| vs.iter().any(|v| v.player == player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_drawing(prompt: &str) -> State {
        let mut state = State::new();
        state.start_round();
        state.record_drawing(PlayerId(1), prompt.to_string(), vec![0xAB]);
        state
    }

    #[test]
    fn one_drawing_per_artist_per_round() {
        let mut state = State::new();
        state.start_round();
        assert!(state.record_drawing(PlayerId(1), "flying cat".into(), vec![1]));
        assert!(!state.record_drawing(PlayerId(1), "flying cat".into(), vec![2]));
        assert_eq!(state.drawings.len(), 1);

        state.start_round();
        assert!(state.record_drawing(PlayerId(1), "banana king".into(), vec![3]));
    }

    #[test]
    fn real_prompt_guess_is_rejected_in_any_casing() {
        let mut state = state_with_drawing("Flying Cat");
        for attempt in ["flying cat", "FLYING CAT", "FlYiNg CaT"] {
            assert_eq!(
                state.record_guess(0, PlayerId(2), attempt.to_string(), false),
                Err(GuessRejection::RealPrompt)
            );
        }
        assert_eq!(state.guess_count(0), 0);
    }

    #[test]
    fn duplicate_guess_is_rejected_case_insensitively() {
        let mut state = state_with_drawing("flying cat");
        assert_eq!(
            state.record_guess(0, PlayerId(2), "cat with wings".into(), false),
            Ok(true)
        );
        assert_eq!(
            state.record_guess(0, PlayerId(3), "Cat With Wings".into(), false),
            Err(GuessRejection::Duplicate)
        );
        assert_eq!(state.guess_count(0), 1);
    }

    #[test]
    fn blank_guess_policy_is_configurable() {
        let mut state = state_with_drawing("flying cat");
        assert_eq!(
            state.record_guess(0, PlayerId(2), String::new(), false),
            Err(GuessRejection::Blank)
        );
        assert_eq!(
            state.record_guess(0, PlayerId(2), String::new(), true),
            Ok(true)
        );
    }

    #[test]
    fn timeout_blanks_do_not_collide_with_each_other() {
        let mut state = state_with_drawing("flying cat");
        state.fill_missing_guesses(0, [PlayerId(2), PlayerId(3)]);
        assert_eq!(state.guess_count(0), 2);
        // a second fill is idempotent
        state.fill_missing_guesses(0, [PlayerId(2), PlayerId(3)]);
        assert_eq!(state.guess_count(0), 2);
    }

    #[test]
    fn second_guess_from_the_same_player_is_ignored() {
        let mut state = state_with_drawing("flying cat");
        assert_eq!(
            state.record_guess(0, PlayerId(2), "superman".into(), false),
            Ok(true)
        );
        assert_eq!(
            state.record_guess(0, PlayerId(2), "batman".into(), false),
            Ok(false)
        );
        assert_eq!(state.guess_count(0), 1);
    }

    #[test]
    fn one_vote_per_player_per_drawing() {
        let mut state = state_with_drawing("flying cat");
        assert!(state.record_vote(0, PlayerId(2), Some("flying cat".into()), vec![]));
        assert!(!state.record_vote(0, PlayerId(2), Some("superman".into()), vec![]));
        assert_eq!(state.vote_count(0), 1);
        assert!(state.voted(0, PlayerId(2)));
    }

    #[test]
    fn votes_on_a_missing_drawing_are_dropped() {
        let mut state = state_with_drawing("flying cat");
        assert!(!state.record_vote(7, PlayerId(2), Some("flying cat".into()), vec![]));
    }

    #[test]
    fn start_round_clears_the_previous_round() {
        let mut state = state_with_drawing("flying cat");
        state
            .record_guess(0, PlayerId(2), "superman".into(), false)
            .unwrap();
        state.record_vote(0, PlayerId(2), Some("flying cat".into()), vec![]);
        state.continue_ready.insert(PlayerId(2));
        state.current = 3;

        state.start_round();
        assert_eq!(state.round, 2);
        assert!(state.drawings.is_empty());
        assert!(state.guesses.is_empty());
        assert!(state.votes.is_empty());
        assert!(state.continue_ready.is_empty());
        assert_eq!(state.current, 0);
    }
}
