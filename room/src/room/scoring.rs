//! Resolves one drawing's votes against its guesses and real prompt.
//!
//! Vote matching against the prompt and against guesses is
//! case-insensitive; like matching against guess text is exact. The
//! asymmetry is deliberate and matches the shipped behavior of the game.

use protocol::{GuessEntry, PlayerId, VoteEntry};

use crate::player::Roster;

use super::state::{Drawing, Guess, Vote};

pub const CORRECT_VOTE_AWARD: i64 = 1000;
/// Earned by the artist for every voter who found the truth.
pub const ARTIST_AWARD: i64 = 500;
/// Earned by a guess author for every voter fooled by their fabrication.
pub const FOOLED_AWARD: i64 = 500;

/// The scoreboard explanation for one drawing, replayable from the recorded
/// guess and vote sets.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub correct_answer: String,
    pub artist: PlayerId,
    pub artist_name: String,
    pub guesses: Vec<GuessEntry>,
    pub votes: Vec<VoteEntry>,
}

/// Applies score and like deltas to the roster and builds the report.
/// Deterministic for a fixed roster, drawing, guess set, and vote set.
/// Contributions referencing players who have left the roster are skipped.
pub fn score_drawing(
    roster: &mut Roster,
    drawing: &Drawing,
    guesses: &[Guess],
    votes: &[Vote],
) -> ScoreReport {
    let folded_answer = drawing.prompt.to_lowercase();
    let mut vote_entries = Vec::with_capacity(votes.len());

    for vote in votes {
        // likes are independent of the vote outcome, and exact-match only
        for liked in &vote.liked {
            for guess in guesses {
                if guess.text == *liked {
                    roster.add_likes(guess.player, 1);
                }
            }
        }

        let choice = vote.choice.as_deref().filter(|c| !c.is_empty());
        let mut correct = false;
        if let Some(choice) = choice {
            let folded_choice = choice.to_lowercase();
            if folded_choice == folded_answer {
                correct = true;
                roster.add_score(vote.player, CORRECT_VOTE_AWARD);
                roster.add_score(drawing.artist, ARTIST_AWARD);
            } else if let Some(author) = guesses
                .iter()
                .find(|g| !g.text.is_empty() && g.text.to_lowercase() == folded_choice)
            {
                // no points for falling for your own fabrication
                if author.player != vote.player {
                    roster.add_score(author.player, FOOLED_AWARD);
                }
            }
        }

        vote_entries.push(VoteEntry {
            player_id: vote.player,
            voter: roster.name_or_unknown(vote.player),
            vote: vote.choice.clone(),
            likes: vote.liked.clone(),
            correct,
        });
    }

    let guess_entries = guesses
        .iter()
        .map(|g| GuessEntry {
            player_id: g.player,
            player: roster.name_or_unknown(g.player),
            guess: g.text.clone(),
        })
        .collect();

    ScoreReport {
        correct_answer: drawing.prompt.clone(),
        artist: drawing.artist,
        artist_name: roster.name_or_unknown(drawing.artist),
        guesses: guess_entries,
        votes: vote_entries,
    }
}
