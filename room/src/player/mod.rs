use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, timeout};
use tracing::{debug, warn};

use protocol::{JsonMessage, PlayerRequest, PlayerResponse};

use crate::consts::*;
use crate::error::ErrorKind;
use crate::room::RoomReq;
use crate::types::*;

pub type Outgoing = Arc<PlayerResponse>;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}

/// Sending half of the outbound queue. Dropping the sender is how the pump
/// learns it should flush, say goodbye and hang up.
#[derive(Debug)]
struct Outbox {
    tx: Mutex<Option<mpsc::Sender<Outgoing>>>,
    hangup: Notify,
}

impl Outbox {
    fn push(&self, resp: Outgoing) -> Result<(), SendError> {
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(SendError::Closed)?;
        tx.try_send(resp).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    fn close(&self) {
        self.tx.lock().take();
    }

    fn is_closed(&self) -> bool {
        self.tx.lock().as_ref().map_or(true, |tx| tx.is_closed())
    }
}

/// One live websocket of a participant.
#[derive(Debug)]
pub struct Connection {
    participant: ParticipantId,
    id: u64,
    outbox: Arc<Outbox>,

    _rx_handle: Option<JoinHandle<()>>,
    _tx_handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Splits the socket and starts both pumps. Inbound requests go straight
    /// to `room_tx`; the room learns about the hangup through a logout.
    pub fn spawn(participant: ParticipantId, stream: WsStream, room_tx: mpsc::Sender<RoomReq>) -> Arc<Self> {
        let (ws_tx, ws_rx) = stream.split();
        let (tx, rx) = mpsc::channel::<Outgoing>(OUTBOUND_QUEUE);
        let outbox = Arc::new(Outbox { tx: Mutex::new(Some(tx)), hangup: Notify::new() });
        let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);

        let _tx_handle = tokio::spawn(outbound(participant, ws_tx, rx, outbox.clone()));
        let _rx_handle = tokio::spawn(inbound(participant, id, ws_rx, room_tx, outbox.clone()));

        Arc::new(Self {
            participant,
            id,
            outbox,
            _rx_handle: Some(_rx_handle),
            _tx_handle: Some(_tx_handle),
        })
    }

    /// A connection without a socket; whatever the room sends lands in the
    /// returned receiver.
    pub fn detached(participant: ParticipantId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Outgoing>) {
        let (tx, rx) = mpsc::channel::<Outgoing>(capacity);
        let outbox = Arc::new(Outbox { tx: Mutex::new(Some(tx)), hangup: Notify::new() });
        let conn = Self {
            participant,
            id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            outbox,
            _rx_handle: None,
            _tx_handle: None,
        };
        (Arc::new(conn), rx)
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Never waits: a full queue is reported instead.
    pub fn send(&self, resp: Outgoing) -> Result<(), SendError> {
        self.outbox.push(resp)
    }

    pub fn close(&self) {
        self.outbox.close();
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

async fn inbound(
    participant: ParticipantId,
    conn_id: u64,
    mut ws_rx: SplitStream<WsStream>,
    room_tx: mpsc::Sender<RoomReq>,
    outbox: Arc<Outbox>,
) {
    loop {
        let frame = tokio::select! {
            _ = outbox.hangup.notified() => break,
            frame = timeout(PONG_WAIT, ws_rx.next()) => frame,
        };
        let ws_msg = match frame {
            Err(_) => {
                debug!(%participant, "read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                debug!(%participant, %err, "read failed");
                break;
            }
            Ok(Some(Ok(ws_msg))) => ws_msg,
        };
        let text = match ws_msg {
            WsMsg::Text(text) => text,
            WsMsg::Binary(bin) => match String::from_utf8(bin) {
                Ok(text) => text,
                Err(err) => {
                    reject(&outbox, ErrorKind::Decode(err.to_string()));
                    continue;
                }
            },
            WsMsg::Close(_) => break,
            WsMsg::Ping(_) | WsMsg::Pong(_) | WsMsg::Frame(_) => continue,
        };
        match PlayerRequest::decode(&text) {
            Ok(req) => {
                if room_tx.send(RoomReq::PlayerReq(participant, req)).await.is_err() {
                    break;
                }
            }
            Err(err) => reject(&outbox, err.into()),
        }
    }
    room_tx
        .send(RoomReq::PlayerLogout { participant, conn_id })
        .await
        .unwrap_or_default();
}

fn reject(outbox: &Outbox, err: ErrorKind) {
    if let Err(send_err) = outbox.push(Arc::new(PlayerResponse::error(err))) {
        debug!(%send_err, "dropped error frame");
    }
}

async fn outbound(
    participant: ParticipantId,
    mut ws_tx: SplitSink<WsStream, WsMsg>,
    mut rx: mpsc::Receiver<Outgoing>,
    outbox: Arc<Outbox>,
) {
    let mut heartbeat = time::interval(HB_DURATION);
    heartbeat.tick().await;
    loop {
        let ws_msg = tokio::select! {
            resp = rx.recv() => match resp {
                Some(resp) => match resp.ser() {
                    Ok(ws_msg) => ws_msg,
                    Err(err) => {
                        warn!(%participant, %err, "failed to encode frame");
                        continue;
                    }
                },
                None => {
                    let _ = timeout(WRITE_WAIT, ws_tx.send(WsMsg::Close(None))).await;
                    break;
                }
            },
            _ = heartbeat.tick() => WsMsg::Ping(Vec::new()),
        };
        match timeout(WRITE_WAIT, ws_tx.send(ws_msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(%participant, %err, "write failed");
                break;
            }
            Err(_) => {
                debug!(%participant, "write deadline exceeded");
                break;
            }
        }
    }
    outbox.close();
    outbox.hangup.notify_one();
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn full_queue_is_reported() {
        let (conn, mut rx) = Connection::detached(Uuid::new_v4(), 1);
        conn.send(Arc::new(PlayerResponse::OdaiFinish)).unwrap();
        assert_eq!(conn.send(Arc::new(PlayerResponse::DrawFinish)), Err(SendError::Full));
        assert_eq!(*rx.try_recv().unwrap(), PlayerResponse::OdaiFinish);
        conn.send(Arc::new(PlayerResponse::DrawFinish)).unwrap();
    }

    #[test]
    fn closed_connection_refuses_frames() {
        let (conn, mut rx) = Connection::detached(Uuid::new_v4(), 4);
        conn.send(Arc::new(PlayerResponse::ShowStart)).unwrap();
        conn.close();
        assert!(conn.is_closed());
        assert_eq!(conn.send(Arc::new(PlayerResponse::ShowStart)), Err(SendError::Closed));
        // queued frames survive the close
        assert_eq!(*rx.try_recv().unwrap(), PlayerResponse::ShowStart);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ids_are_unique() {
        let participant = Uuid::new_v4();
        let (a, _rx_a) = Connection::detached(participant, 1);
        let (b, _rx_b) = Connection::detached(participant, 1);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.participant(), b.participant());
    }
}
