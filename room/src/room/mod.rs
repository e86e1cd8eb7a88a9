//! The room actor.
//!
//! One task owns the whole game: roster, phase, round collections, and the
//! three phase timers. Connection pumps and timer tasks reach it only
//! through its request channel, so every handler below runs as one atomic
//! step. Two simultaneous submissions, or a submission racing an expiry,
//! serialize here and cannot double-advance a phase.

mod config;
mod error;
mod request;
mod scoring;
mod state;

use rand::seq::SliceRandom;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tracing::{debug, info, warn};

use protocol::{ClientRequest, PlayerId, ServerEvent, VoteOption};
use prompts::PromptBank;

use crate::conn::Connection;
use crate::consts::{DEFAULT_EMOJI, REQ_CHANNEL_SIZE};
use crate::player::Roster;
use crate::timer::Countdown;
use crate::types::{ConnId, WsStream};

pub use config::GameConfig;
pub use request::{Request as RoomReq, TimerKind};
use error::{RoomError, RoomResult};
use scoring::{score_drawing, ScoreReport};
use state::{Phase, State};

enum Admitted {
    Fresh(PlayerId),
    Reclaimed(PlayerId),
}

pub struct Room {
    config: GameConfig,
    state: State,
    roster: Roster,
    prompts: PromptBank,

    rx: Receiver<RoomReq>,
    loopback: Sender<RoomReq>,

    draw_timer: Countdown,
    guess_timer: Countdown,
    vote_timer: Countdown,

    next_conn: u64,
}

impl Room {
    pub fn new(config: GameConfig, prompts: PromptBank) -> Self {
        let (loopback, rx) = channel::<RoomReq>(REQ_CHANNEL_SIZE);
        Self {
            draw_timer: Countdown::new(TimerKind::Draw, loopback.clone()),
            guess_timer: Countdown::new(TimerKind::Guess, loopback.clone()),
            vote_timer: Countdown::new(TimerKind::Vote, loopback.clone()),
            config,
            state: State::new(),
            roster: Roster::new(),
            prompts,
            rx,
            loopback,
            next_conn: 0,
        }
    }

    pub fn handle(&self) -> Sender<RoomReq> {
        self.loopback.clone()
    }

    pub async fn run(&mut self) {
        while let Some(req) = self.rx.recv().await {
            match req {
                RoomReq::Connect { ws_stream } => self.accept_connection(ws_stream),
                RoomReq::ConnClosed(conn_id) => self.handle_disconnect(conn_id).await,
                RoomReq::Client(conn_id, req) => self.handle_client(conn_id, req).await,
                RoomReq::Tick {
                    kind,
                    epoch,
                    remaining,
                } => self.handle_tick(kind, epoch, remaining),
                RoomReq::Expired { kind, epoch } => self.handle_expiry(kind, epoch),
            }
        }
    }

    fn accept_connection(&mut self, ws_stream: WsStream) {
        self.next_conn += 1;
        let id = ConnId(self.next_conn);
        let conn = Connection::spawn(id, ws_stream, self.loopback.clone());
        self.roster.park(conn);
        debug!(conn = id.0, "connection accepted");
    }

    async fn handle_client(&mut self, conn_id: ConnId, req: ClientRequest) {
        match req {
            ClientRequest::Join { name, emoji } => self.handle_join(conn_id, name, emoji),
            req => {
                let Some(player_id) = self.roster.player_for_conn(conn_id) else {
                    debug!(conn = conn_id.0, "request from an unjoined connection ignored");
                    return;
                };
                match req {
                    ClientRequest::StartGame => self.handle_start_game().await,
                    ClientRequest::SubmitDrawing { image } => {
                        self.handle_drawing(player_id, image)
                    }
                    ClientRequest::AddTime => self.handle_add_time(),
                    ClientRequest::SubmitGuess { guess } => self.handle_guess(player_id, guess),
                    ClientRequest::GuessTimeUp => self.handle_guess_time_up(),
                    ClientRequest::SubmitVote { vote, likes } => {
                        self.handle_vote(player_id, Some(vote), likes)
                    }
                    ClientRequest::SubmitLikesOnly { likes } => {
                        self.handle_vote(player_id, None, likes)
                    }
                    ClientRequest::ContinueToNext => self.handle_continue(player_id).await,
                    ClientRequest::NextRound => self.handle_next_round().await,
                    ClientRequest::PlayAgain => self.handle_play_again(),
                    ClientRequest::Join { .. } => {}
                }
            }
        }
    }

    // -- joining and leaving --------------------------------------------

    fn handle_join(&mut self, conn_id: ConnId, name: String, emoji: Option<String>) {
        let name = name.trim().to_string();
        let emoji = emoji
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EMOJI.to_string());

        match self.admit(conn_id, &name, emoji) {
            Ok(Admitted::Reclaimed(player_id)) => {
                self.send_joined(player_id);
                info!(%player_id, name, "player reconnected");
                self.resync_player(player_id);
            }
            Ok(Admitted::Fresh(player_id)) => {
                self.send_joined(player_id);
                self.broadcast_lobby();
                info!(%player_id, name, "player joined");
            }
            Err(err) => {
                let event = match err {
                    RoomError::EmojiTaken { .. } => ServerEvent::EmojiTaken {
                        message: err.to_string(),
                    },
                    RoomError::GameInProgress | RoomError::RoomFull => {
                        ServerEvent::GameInProgress
                    }
                };
                self.send_to_conn(conn_id, &event);
            }
        }
    }

    /// Lets a connection in as a player: either reclaiming an existing
    /// record by case-folded name, or registering a fresh one while the
    /// lobby is open and not full.
    fn admit(&mut self, conn_id: ConnId, name: &str, emoji: String) -> RoomResult<Admitted> {
        let reclaiming = self.roster.find_by_name(name);
        if let Some(holder) = self.roster.emoji_holder(&emoji, reclaiming) {
            return Err(RoomError::EmojiTaken {
                emoji,
                holder: holder.name.clone(),
            });
        }

        if let Some(player_id) = reclaiming {
            if let Some(conn) = self.roster.take_pending(conn_id) {
                self.roster.attach(player_id, emoji, conn);
            }
            return Ok(Admitted::Reclaimed(player_id));
        }

        if self.state.phase != Phase::Lobby {
            return Err(RoomError::GameInProgress);
        }
        if self.roster.len() >= self.config.max_players {
            return Err(RoomError::RoomFull);
        }

        let Some(conn) = self.roster.take_pending(conn_id) else {
            return Err(RoomError::GameInProgress);
        };
        Ok(Admitted::Fresh(
            self.roster.join(name.to_string(), emoji, conn),
        ))
    }

    fn send_joined(&self, player_id: PlayerId) {
        let colors = self
            .roster
            .get(player_id)
            .map(|p| self.config.color_for(p.color_index))
            .unwrap_or_else(|| self.config.color_for(0));
        self.send_to_player(player_id, &ServerEvent::Joined { player_id, colors });
    }

    async fn handle_disconnect(&mut self, conn_id: ConnId) {
        if self.roster.take_pending(conn_id).is_some() {
            return;
        }
        let Some(player_id) = self.roster.player_for_conn(conn_id) else {
            return;
        };

        if self.state.phase == Phase::Lobby {
            self.roster.remove(player_id);
            self.broadcast_lobby();
            info!(%player_id, "player left the lobby");
            return;
        }

        // mid-game: keep the record so the same name can come back, but the
        // phase must not wait for someone who will never answer
        self.roster.detach(player_id);
        info!(%player_id, "player disconnected mid-game");
        match self.state.phase {
            Phase::Drawing => self.check_drawing_complete(),
            Phase::Guessing(_) => self.check_guessing_complete(),
            Phase::Voting(_) => self.check_voting_complete(),
            Phase::Scoreboard(_) => self.check_continues().await,
            Phase::Lobby | Phase::Final => {}
        }
    }

    /// Brings a reconnected player back to wherever the game is.
    fn resync_player(&mut self, player_id: PlayerId) {
        let event = self.resync_event(player_id);
        self.send_to_player(player_id, &event);
        if self.state.phase == Phase::Lobby {
            self.broadcast_lobby();
        }
    }

    /// The one event that puts a player on the right screen for the current
    /// phase: their active turn if they still owe an action, a wait screen
    /// otherwise.
    fn resync_event(&self, player_id: PlayerId) -> ServerEvent {
        match self.state.phase {
            Phase::Lobby => ServerEvent::UpdateLobby {
                players: self.roster.summaries(),
            },
            Phase::Drawing => {
                if self.state.has_drawn(player_id) {
                    wait("Waiting for others to finish drawing...")
                } else {
                    let prompt = self
                        .roster
                        .get(player_id)
                        .and_then(|p| p.prompt.clone())
                        .unwrap_or_default();
                    ServerEvent::YourTurnDraw {
                        prompt,
                        round: self.state.round,
                    }
                }
            }
            Phase::Guessing(index) => match self.state.drawings.get(index) {
                Some(drawing)
                    if drawing.artist != player_id && !self.state.guessed(index, player_id) =>
                {
                    ServerEvent::YourTurnGuess {
                        image: drawing.image.clone(),
                        drawing_index: index,
                    }
                }
                _ => wait("Waiting for others to guess..."),
            },
            Phase::Voting(index) => {
                if self.state.voted(index, player_id) {
                    wait("Waiting for others to vote...")
                } else {
                    match self.state.drawings.get(index) {
                        Some(drawing) => ServerEvent::YourTurnVote {
                            image: drawing.image.clone(),
                            options: self.voting_options(index, player_id),
                            artist_id: drawing.artist,
                            players: self.roster.summaries(),
                        },
                        None => wait("Waiting for others to vote..."),
                    }
                }
            }
            Phase::Scoreboard(index) => match (&self.state.last_report, self.state.drawings.get(index)) {
                (Some(report), Some(drawing)) => self.scoreboard_event(report, &drawing.image),
                _ => wait("Waiting for the next drawing..."),
            },
            Phase::Final => ServerEvent::ShowFinal {
                scores: self.roster.scores(),
                likes: self.roster.likes(),
                players: self.roster.summaries(),
            },
        }
    }

    // -- lobby ----------------------------------------------------------

    async fn handle_start_game(&mut self) {
        if self.state.phase != Phase::Lobby {
            return;
        }
        if self.roster.connected_count() < self.config.min_players {
            debug!(
                connected = self.roster.connected_count(),
                needed = self.config.min_players,
                "not enough players to start"
            );
            return;
        }
        self.start_round().await;
    }

    async fn start_round(&mut self) {
        self.state.start_round();
        self.state.phase = Phase::Drawing;
        let round = self.state.round;

        self.broadcast(&ServerEvent::GameStarted { round });

        // every record gets a prompt, connected or not, so a reconnecting
        // player still has something to draw
        for player_id in self.roster.ids() {
            let prompt = self.prompts.draw().await;
            if let Some(player) = self.roster.get_mut(player_id) {
                player.prompt = Some(prompt.clone());
            }
            self.send_to_player(player_id, &ServerEvent::YourTurnDraw { prompt, round });
        }

        self.draw_timer.start(self.config.drawing_secs);
        info!(round, players = self.roster.len(), "round started");
    }

    // -- drawing --------------------------------------------------------

    fn handle_drawing(&mut self, player_id: PlayerId, image: Vec<u8>) {
        if self.state.phase != Phase::Drawing {
            return;
        }
        let Some(prompt) = self.roster.get(player_id).and_then(|p| p.prompt.clone()) else {
            return;
        };
        if !self.state.record_drawing(player_id, prompt, image) {
            return;
        }
        debug!(%player_id, "drawing submitted");
        self.check_drawing_complete();
    }

    fn check_drawing_complete(&mut self) {
        if self.state.phase == Phase::Drawing
            && self.state.drawings.len() >= self.roster.connected_count()
        {
            self.finish_drawing_phase()
        }
    }

    fn finish_drawing_phase(&mut self) {
        self.draw_timer.stop();
        if self.state.drawings.is_empty() {
            warn!("no drawings were submitted, abandoning the round");
            self.reset_to_lobby();
            return;
        }
        self.state.current = 0;
        self.enter_guessing();
    }

    // -- guessing -------------------------------------------------------

    fn enter_guessing(&mut self) {
        let index = self.state.current;
        let Some(drawing) = self.state.drawings.get(index) else {
            return;
        };
        let artist = drawing.artist;
        let image = drawing.image.clone();

        self.state.phase = Phase::Guessing(index);
        self.broadcast(&ServerEvent::ShowGuessingPhase);

        for player_id in self.roster.connected_ids() {
            if player_id == artist {
                self.send_to_player(
                    player_id,
                    &wait("Waiting for others to guess your drawing..."),
                );
            } else {
                self.send_to_player(
                    player_id,
                    &ServerEvent::YourTurnGuess {
                        image: image.clone(),
                        drawing_index: index,
                    },
                );
            }
        }

        self.guess_timer.start(self.config.guessing_secs);
        debug!(index, "guessing started");
    }

    fn handle_guess(&mut self, player_id: PlayerId, guess: String) {
        let Phase::Guessing(index) = self.state.phase else {
            return;
        };
        if self.state.artist_of(index) == Some(player_id) {
            return;
        }
        let guess = guess.trim().to_string();
        match self
            .state
            .record_guess(index, player_id, guess, self.config.accept_blank_guesses)
        {
            Err(rejection) => {
                self.send_to_player(
                    player_id,
                    &ServerEvent::DuplicateGuess {
                        message: rejection.to_string(),
                    },
                );
            }
            Ok(false) => {}
            Ok(true) => self.check_guessing_complete(),
        }
    }

    fn handle_guess_time_up(&mut self) {
        let Phase::Guessing(index) = self.state.phase else {
            return;
        };
        self.finish_guessing(index, true);
    }

    fn check_guessing_complete(&mut self) {
        let Phase::Guessing(index) = self.state.phase else {
            return;
        };
        if self.state.guess_count(index) >= self.expected_guessers(index).len() {
            self.finish_guessing(index, false);
        }
    }

    /// Connected players who owe a guess for this drawing: everyone but the
    /// artist.
    fn expected_guessers(&self, index: usize) -> Vec<PlayerId> {
        let artist = self.state.artist_of(index);
        self.roster
            .connected_ids()
            .into_iter()
            .filter(|id| Some(*id) != artist)
            .collect()
    }

    fn finish_guessing(&mut self, index: usize, fill_missing: bool) {
        self.guess_timer.stop();
        if fill_missing {
            let missing: Vec<_> = self
                .expected_guessers(index)
                .into_iter()
                .filter(|id| !self.state.guessed(index, *id))
                .collect();
            self.state.fill_missing_guesses(index, missing);
        }
        self.enter_voting();
    }

    // -- voting ---------------------------------------------------------

    fn enter_voting(&mut self) {
        let index = self.state.current;
        let Some(drawing) = self.state.drawings.get(index) else {
            return;
        };
        let artist = drawing.artist;
        let image = drawing.image.clone();

        self.state.phase = Phase::Voting(index);
        self.broadcast(&ServerEvent::ShowVotingPhase);

        let players = self.roster.summaries();
        for player_id in self.roster.connected_ids() {
            let options = self.voting_options(index, player_id);
            self.send_to_player(
                player_id,
                &ServerEvent::YourTurnVote {
                    image: image.clone(),
                    options,
                    artist_id: artist,
                    players: players.clone(),
                },
            );
        }

        self.vote_timer.start(self.config.voting_secs);
        debug!(index, "voting started");
    }

    /// The recipient's ballot: the real prompt plus everyone's non-empty
    /// guesses, minus the recipient's own. The artist is the exception and
    /// sees all of them, to hand out likes. Shuffled per recipient.
    fn voting_options(&self, index: usize, recipient: PlayerId) -> Vec<VoteOption> {
        let Some(drawing) = self.state.drawings.get(index) else {
            return Vec::new();
        };
        let mut options = vec![VoteOption {
            text: drawing.prompt.clone(),
            player_id: drawing.artist,
            is_correct: true,
        }];
        let artist_view = recipient == drawing.artist;
        if let Some(guesses) = self.state.guesses.get(&index) {
            for g in guesses {
                if g.text.trim().is_empty() {
                    continue;
                }
                if !artist_view && g.player == recipient {
                    continue;
                }
                options.push(VoteOption {
                    text: g.text.clone(),
                    player_id: g.player,
                    is_correct: false,
                });
            }
        }
        options.shuffle(&mut rand::thread_rng());
        options
    }

    fn handle_vote(&mut self, player_id: PlayerId, choice: Option<String>, likes: Vec<String>) {
        let Phase::Voting(index) = self.state.phase else {
            return;
        };
        let choice = choice.map(|c| c.trim().to_string());
        if !self.state.record_vote(index, player_id, choice, likes) {
            return;
        }
        self.check_voting_complete();
    }

    fn check_voting_complete(&mut self) {
        let Phase::Voting(index) = self.state.phase else {
            return;
        };
        if self.state.vote_count(index) >= self.roster.connected_count() {
            self.finish_voting(index, false);
        }
    }

    fn finish_voting(&mut self, index: usize, fill_missing: bool) {
        self.vote_timer.stop();
        if fill_missing {
            let missing: Vec<_> = self
                .roster
                .connected_ids()
                .into_iter()
                .filter(|id| !self.state.voted(index, *id))
                .collect();
            for player_id in missing {
                self.state
                    .record_vote(index, player_id, Some(String::new()), Vec::new());
            }
        }
        self.show_current_scores(index);
    }

    // -- scoring and continuation ---------------------------------------

    fn show_current_scores(&mut self, index: usize) {
        let Some(drawing) = self.state.drawings.get(index).cloned() else {
            return;
        };
        let guesses = self.state.guesses.get(&index).cloned().unwrap_or_default();
        let votes = self.state.votes.get(&index).cloned().unwrap_or_default();

        let report = score_drawing(&mut self.roster, &drawing, &guesses, &votes);
        self.state.phase = Phase::Scoreboard(index);

        let event = self.scoreboard_event(&report, &drawing.image);
        info!(index, artist = %report.artist_name, "scores shown");
        self.state.last_report = Some(report);
        self.broadcast(&event);
    }

    fn scoreboard_event(&self, report: &ScoreReport, image: &[u8]) -> ServerEvent {
        ServerEvent::ShowCurrentScores {
            correct_answer: report.correct_answer.clone(),
            artist_id: report.artist,
            drawing_image: image.to_vec(),
            scores: self.roster.scores(),
            likes: self.roster.likes(),
            players: self.roster.summaries(),
            guesses: report.guesses.clone(),
            votes: report.votes.clone(),
        }
    }

    async fn handle_continue(&mut self, player_id: PlayerId) {
        let Phase::Scoreboard(_) = self.state.phase else {
            return;
        };
        self.state.continue_ready.insert(player_id);
        self.notify_waiting_for_continues();
        self.check_continues().await;
    }

    fn notify_waiting_for_continues(&self) {
        let connected = self.roster.connected_ids();
        let ready: Vec<_> = connected
            .iter()
            .filter(|id| self.state.continue_ready.contains(id))
            .copied()
            .collect();
        let waiting = connected.len().saturating_sub(ready.len());
        if waiting == 0 {
            return;
        }
        let plural = if waiting == 1 { "" } else { "s" };
        let event = wait(&format!("Waiting for {waiting} player{plural} to continue..."));
        for player_id in ready {
            self.send_to_player(player_id, &event);
        }
    }

    async fn check_continues(&mut self) {
        let Phase::Scoreboard(index) = self.state.phase else {
            return;
        };
        let connected = self.roster.connected_ids();
        if connected.is_empty() {
            return;
        }
        if connected
            .iter()
            .all(|id| self.state.continue_ready.contains(id))
        {
            self.state.continue_ready.clear();
            self.advance_after_scoreboard(index).await;
        }
    }

    async fn advance_after_scoreboard(&mut self, index: usize) {
        let next = index + 1;
        if next < self.state.drawings.len() {
            self.state.current = next;
            self.enter_guessing();
        } else if self.state.round < self.config.rounds {
            self.start_round().await;
        } else {
            self.show_final();
        }
    }

    /// Host override on the round's last scoreboard: skip the stragglers.
    async fn handle_next_round(&mut self) {
        let Phase::Scoreboard(index) = self.state.phase else {
            return;
        };
        if index + 1 < self.state.drawings.len() {
            return;
        }
        self.state.continue_ready.clear();
        if self.state.round < self.config.rounds {
            self.start_round().await;
        } else {
            self.show_final();
        }
    }

    // -- endgame --------------------------------------------------------

    fn show_final(&mut self) {
        self.state.phase = Phase::Final;
        self.broadcast(&ServerEvent::ShowFinal {
            scores: self.roster.scores(),
            likes: self.roster.likes(),
            players: self.roster.summaries(),
        });
        info!("game over");
    }

    fn handle_play_again(&mut self) {
        if self.state.phase != Phase::Final {
            return;
        }
        self.roster.reset_scores();
        self.reset_to_lobby();
        info!("play again, back to the lobby");
    }

    fn reset_to_lobby(&mut self) {
        self.stop_timers();
        self.state.reset();
        self.roster.purge_detached();
        if !self.roster.is_empty() {
            self.broadcast(&ServerEvent::Reset);
            self.broadcast_lobby();
        }
    }

    // -- timers ---------------------------------------------------------

    fn handle_add_time(&mut self) {
        let secs = self.config.add_time_secs;
        let timer = match self.state.phase {
            Phase::Drawing => &mut self.draw_timer,
            Phase::Guessing(_) => &mut self.guess_timer,
            Phase::Voting(_) => &mut self.vote_timer,
            _ => return,
        };
        if timer.is_active() {
            timer.add_time(secs);
            debug!(secs, "timer extended");
        }
    }

    fn handle_tick(&mut self, kind: TimerKind, epoch: u64, remaining: u32) {
        if !self.timer_event_current(kind, epoch) {
            return;
        }
        let event = match kind {
            TimerKind::Draw | TimerKind::Vote => ServerEvent::TimerTick { time: remaining },
            TimerKind::Guess => ServerEvent::GuessTimerTick { time: remaining },
        };
        self.broadcast(&event);
    }

    fn handle_expiry(&mut self, kind: TimerKind, epoch: u64) {
        if !self.timer_event_current(kind, epoch) {
            return;
        }
        match (kind, self.state.phase) {
            (TimerKind::Draw, Phase::Drawing) => {
                info!("drawing time is up");
                self.broadcast(&ServerEvent::TimerExpired);
                self.finish_drawing_phase();
            }
            (TimerKind::Guess, Phase::Guessing(index)) => {
                info!(index, "guessing time is up");
                self.broadcast(&ServerEvent::GuessTimerExpired);
                self.finish_guessing(index, true);
            }
            // the voting countdown completes silently; the scoreboard is
            // the reveal
            (TimerKind::Vote, Phase::Voting(index)) => {
                info!(index, "voting time is up");
                self.finish_voting(index, true);
            }
            _ => debug!(?kind, "stale expiry ignored"),
        }
    }

    fn timer_event_current(&self, kind: TimerKind, epoch: u64) -> bool {
        let timer = match kind {
            TimerKind::Draw => &self.draw_timer,
            TimerKind::Guess => &self.guess_timer,
            TimerKind::Vote => &self.vote_timer,
        };
        epoch == timer.epoch()
    }

    fn stop_timers(&mut self) {
        self.draw_timer.stop();
        self.guess_timer.stop();
        self.vote_timer.stop();
    }

    // -- delivery -------------------------------------------------------

    fn broadcast(&self, event: &ServerEvent) {
        for player in self.roster.players() {
            player.send(event);
        }
    }

    fn broadcast_lobby(&self) {
        self.broadcast(&ServerEvent::UpdateLobby {
            players: self.roster.summaries(),
        });
    }

    fn send_to_player(&self, player_id: PlayerId, event: &ServerEvent) {
        if let Some(player) = self.roster.get(player_id) {
            player.send(event);
        }
    }

    fn send_to_conn(&self, conn_id: ConnId, event: &ServerEvent) {
        if let Some(conn) = self.roster.pending(conn_id) {
            conn.send(event);
        }
    }
}

fn wait(message: &str) -> ServerEvent {
    ServerEvent::Wait {
        message: message.to_string(),
    }
}
