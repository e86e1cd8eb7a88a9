//! Per-connection pump tasks.
//!
//! Every accepted websocket splits into a reader task (binary frame ->
//! decoded request -> room channel), a writer task draining this
//! connection's outbound queue, and a heartbeat ping task. All three die
//! with the connection; dropping a `Connection` aborts them so a replaced
//! session cannot leak background work.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use protocol::{BinCodeMessage, ClientRequest, ServerEvent};

use crate::consts::{CONN_CHANNEL_SIZE, HB_DURATION};
use crate::room::RoomReq;
use crate::types::{ConnId, WsMsg, WsStream};

#[derive(Debug)]
pub struct Connection {
    pub id: ConnId,
    outbound: mpsc::Sender<WsMsg>,
    rx_handle: JoinHandle<()>,
    tx_handle: JoinHandle<()>,
    ping_handle: JoinHandle<()>,
}

impl Connection {
    pub fn spawn(id: ConnId, stream: WsStream, room_tx: mpsc::Sender<RoomReq>) -> Self {
        let (mut ws_tx, mut ws_rx) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<WsMsg>(CONN_CHANNEL_SIZE);

        let ping_tx = outbound.clone();
        let ping_handle = tokio::spawn(async move {
            loop {
                if ping_tx.send(WsMsg::Ping(Vec::new())).await.is_err() {
                    break;
                }
                time::sleep(HB_DURATION).await;
            }
        });

        let reader_tx = room_tx.clone();
        let rx_handle = tokio::spawn(async move {
            while let Some(Ok(ws_msg)) = ws_rx.next().await {
                match ws_msg {
                    WsMsg::Binary(bin) => {
                        if let Ok(req) = ClientRequest::deser(&bin) {
                            if reader_tx.send(RoomReq::Client(id, req)).await.is_err() {
                                return;
                            }
                        }
                    }
                    WsMsg::Close(_) => break,
                    _ => {}
                }
            }
            // a dead stream without a close frame counts as gone too
            let _ = reader_tx.send(RoomReq::ConnClosed(id)).await;
        });

        let writer_tx = room_tx;
        let tx_handle = tokio::spawn(async move {
            while let Some(ws_msg) = outbound_rx.recv().await {
                if ws_tx.send(ws_msg).await.is_err() {
                    let _ = writer_tx.send(RoomReq::ConnClosed(id)).await;
                    break;
                }
            }
        });

        Self {
            id,
            outbound,
            rx_handle,
            tx_handle,
            ping_handle,
        }
    }

    /// Best-effort delivery; a full or closed queue drops the event rather
    /// than stalling the room.
    pub fn send(&self, event: &ServerEvent) {
        if let Ok(msg) = event.ser() {
            let _ = self.outbound.try_send(msg);
        }
    }

    fn abort(&self) {
        self.rx_handle.abort();
        self.tx_handle.abort();
        self.ping_handle.abort();
    }

    /// Test seam: a connection whose outbound queue is observable and whose
    /// pump tasks are inert.
    #[cfg(test)]
    pub(crate) fn test_pair(id: ConnId) -> (Self, mpsc::Receiver<WsMsg>) {
        let (outbound, rx) = mpsc::channel(CONN_CHANNEL_SIZE);
        let noop = || tokio::spawn(async {});
        (
            Self {
                id,
                outbound,
                rx_handle: noop(),
                tx_handle: noop(),
                ping_handle: noop(),
            },
            rx,
        )
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.abort();
    }
}
