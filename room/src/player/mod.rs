//! Player records and the roster that owns them.
//!
//! A player is identity plus tally: name, emoji, hue, score, likes, and the
//! secret prompt for the current round. The websocket is an attachment; a
//! mid-game disconnect detaches it and leaves the record behind so the same
//! name can reclaim it. Lookup by connection and by case-folded name goes
//! through secondary indexes, not scans.

use std::collections::HashMap;

use protocol::{PlayerId, PlayerSummary, ServerEvent};

use crate::conn::Connection;
use crate::consts::PLAYER_COLORS;
use crate::types::ConnId;

#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub emoji: String,
    pub color_index: usize,
    pub score: i64,
    pub likes: u32,
    pub prompt: Option<String>,
    conn: Option<Connection>,
}

impl Player {
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn send(&self, event: &ServerEvent) {
        if let Some(conn) = &self.conn {
            conn.send(event);
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
            emoji: self.emoji.clone(),
            color_index: self.color_index,
            score: self.score,
            likes: self.likes,
            connected: self.is_connected(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Default)]
pub struct Roster {
    players: HashMap<PlayerId, Player>,
    /// Accepted sockets that have not joined yet.
    pending: HashMap<ConnId, Connection>,
    by_conn: HashMap<ConnId, PlayerId>,
    by_name: HashMap<String, PlayerId>,
    next_id: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.is_connected()).count()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Join order, which is also color order.
    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.players.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn connected_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self
            .players
            .values()
            .filter(|p| p.is_connected())
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn park(&mut self, conn: Connection) {
        self.pending.insert(conn.id, conn);
    }

    pub fn pending(&self, conn_id: ConnId) -> Option<&Connection> {
        self.pending.get(&conn_id)
    }

    pub fn take_pending(&mut self, conn_id: ConnId) -> Option<Connection> {
        self.pending.remove(&conn_id)
    }

    /// Registers a brand-new player on a pending connection.
    pub fn join(&mut self, name: String, emoji: String, conn: Connection) -> PlayerId {
        self.next_id += 1;
        let id = PlayerId(self.next_id);
        let color_index = self.players.len() % PLAYER_COLORS.len();
        self.by_conn.insert(conn.id, id);
        self.by_name.insert(normalize(&name), id);
        self.players.insert(
            id,
            Player {
                id,
                name,
                emoji,
                color_index,
                score: 0,
                likes: 0,
                prompt: None,
                conn: Some(conn),
            },
        );
        id
    }

    pub fn find_by_name(&self, name: &str) -> Option<PlayerId> {
        self.by_name.get(&normalize(name)).copied()
    }

    /// The player currently holding `emoji`, ignoring `excluding` (the
    /// record a reconnecting player is about to reclaim).
    pub fn emoji_holder(&self, emoji: &str, excluding: Option<PlayerId>) -> Option<&Player> {
        self.players
            .values()
            .find(|p| Some(p.id) != excluding && p.emoji == emoji)
    }

    /// Binds a fresh connection to an existing record, superseding any
    /// still-attached one (whose pump tasks die with it).
    pub fn attach(&mut self, id: PlayerId, emoji: String, conn: Connection) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(old) = player.conn.take() {
            self.by_conn.remove(&old.id);
        }
        self.by_conn.insert(conn.id, id);
        player.emoji = emoji;
        player.conn = Some(conn);
    }

    /// Drops the connection but keeps the record for reconnection.
    pub fn detach(&mut self, id: PlayerId) {
        if let Some(player) = self.players.get_mut(&id) {
            if let Some(conn) = player.conn.take() {
                self.by_conn.remove(&conn.id);
            }
        }
    }

    /// Removes the record entirely (lobby semantics).
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        if let Some(conn) = &player.conn {
            self.by_conn.remove(&conn.id);
        }
        self.by_name.remove(&normalize(&player.name));
        Some(player)
    }

    /// Drops records whose player never came back. Applied whenever the
    /// room returns to the lobby, where absent players do not exist.
    pub fn purge_detached(&mut self) {
        let gone: Vec<_> = self
            .players
            .values()
            .filter(|p| !p.is_connected())
            .map(|p| p.id)
            .collect();
        for id in gone {
            self.remove(id);
        }
    }

    pub fn player_for_conn(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.by_conn.get(&conn_id).copied()
    }

    pub fn add_score(&mut self, id: PlayerId, delta: i64) {
        if let Some(player) = self.players.get_mut(&id) {
            player.score += delta;
        }
    }

    pub fn add_likes(&mut self, id: PlayerId, delta: u32) {
        if let Some(player) = self.players.get_mut(&id) {
            player.likes += delta;
        }
    }

    pub fn name_or_unknown(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map_or_else(|| "Unknown".to_string(), |p| p.name.clone())
    }

    pub fn reset_scores(&mut self) {
        for player in self.players.values_mut() {
            player.score = 0;
            player.likes = 0;
            player.prompt = None;
        }
    }

    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.players.get(&id))
            .map(Player::summary)
            .collect()
    }

    pub fn scores(&self) -> Vec<(PlayerId, i64)> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.players.get(&id))
            .map(|p| (p.id, p.score))
            .collect()
    }

    pub fn likes(&self) -> Vec<(PlayerId, u32)> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.players.get(&id))
            .map(|p| (p.id, p.likes))
            .collect()
    }
}
