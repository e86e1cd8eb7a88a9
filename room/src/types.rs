use tokio_tungstenite::WebSocketStream;
use tokio::net::TcpStream;
pub use tokio_tungstenite::tungstenite::Message as WsMsg;

pub type WsStream = WebSocketStream<TcpStream>;

/// Identity of one live websocket connection, assigned at accept time. A
/// player outlives its connection; the roster maps one to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);
