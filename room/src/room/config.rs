use protocol::ColorPair;

use crate::consts::PLAYER_COLORS;

/// Tunable game rules, everything overridable from the command line.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub drawing_secs: u32,
    pub guessing_secs: u32,
    pub voting_secs: u32,
    /// Applied to whichever phase timer is running when a player asks for
    /// more time.
    pub add_time_secs: u32,
    pub min_players: usize,
    pub max_players: usize,
    pub rounds: u32,
    /// Whether an explicitly submitted blank guess is stored instead of
    /// rejected. Timeout auto-fill stores blanks regardless.
    pub accept_blank_guesses: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            drawing_secs: 90,
            guessing_secs: 45,
            voting_secs: 30,
            add_time_secs: 30,
            min_players: 3,
            max_players: 80,
            rounds: 1,
            accept_blank_guesses: false,
        }
    }
}

impl GameConfig {
    pub fn color_for(&self, color_index: usize) -> ColorPair {
        let [light, dark] = PLAYER_COLORS[color_index % PLAYER_COLORS.len()];
        ColorPair {
            light: light.to_string(),
            dark: dark.to_string(),
        }
    }
}
