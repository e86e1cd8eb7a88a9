use protocol::ClientRequest;

use crate::types::{ConnId, WsStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Draw,
    Guess,
    Vote,
}

/// Everything that can reach the room actor. One channel carries player
/// actions, connection lifecycle, and timer events, so handling any single
/// request is an atomic step of the game.
#[derive(Debug)]
pub enum Request {
    Client(ConnId, ClientRequest),
    Connect { ws_stream: WsStream },
    ConnClosed(ConnId),
    Tick {
        kind: TimerKind,
        epoch: u64,
        remaining: u32,
    },
    Expired {
        kind: TimerKind,
        epoch: u64,
    },
}
