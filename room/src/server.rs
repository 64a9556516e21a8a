use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{
    Callback as HsCallback, ErrorResponse as HsError, Request as HsReq, Response as HsResp,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consts::*;
use crate::error::ErrorKind;
use crate::player::Connection;
use crate::store::RoomStore;
use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    #[error("handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("handshake rejected")]
    Rejected,
    #[error("{0} is not in any room")]
    NotInRoom(ParticipantId),
    #[error(transparent)]
    Room(#[from] ErrorKind),
}

/// Accepts websocket upgrades forever, one task per socket.
pub async fn serve(listener: TcpListener, store: RoomStore) {
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "websocket listener ready"),
        Err(err) => warn!(%err, "websocket listener has no local address"),
    }
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(err) = accept(stream, store).await {
                        debug!(%addr, %err, "upgrade failed");
                    }
                });
            }
            Err(err) => warn!(%err, "accept failed"),
        }
    }
}

async fn accept(stream: TcpStream, store: RoomStore) -> Result<(), UpgradeError> {
    let (login_tx, login_rx) = oneshot::channel::<ParticipantId>();
    let config = WebSocketConfig {
        max_message_size: Some(MAX_MESSAGE_SIZE),
        ..WebSocketConfig::default()
    };
    let mut ws_stream = tokio_tungstenite::accept_hdr_async_with_config(
        stream,
        Callback { login_result: login_tx },
        Some(config),
    )
    .await?;
    let participant = login_rx.await.map_err(|_| UpgradeError::Rejected)?;

    let room = match store.get_room_by_participant(&participant).await {
        Some(room) => room,
        None => {
            ws_stream.close(None).await.unwrap_or_default();
            return Err(UpgradeError::NotInRoom(participant));
        }
    };
    debug!(%participant, room = %room.id(), "upgraded");
    let conn = Connection::spawn(participant, ws_stream, room.sender());
    room.login(conn).await?;
    Ok(())
}

struct Callback {
    login_result: oneshot::Sender<ParticipantId>,
}

impl HsCallback for Callback {
    fn on_request(self, req: &HsReq, resp: HsResp) -> Result<HsResp, HsError> {
        let (status, reason) = if req.uri().path() != WS_PATH {
            (StatusCode::NOT_FOUND, "no such endpoint")
        } else {
            match participant_from_query(req.uri().query()) {
                Some(participant) => {
                    self.login_result.send(participant).unwrap_or_default();
                    return Ok(resp);
                }
                None => (StatusCode::BAD_REQUEST, "missing or malformed user"),
            }
        };
        let mut err = HsError::new(Some(reason.to_string()));
        *err.status_mut() = status;
        Err(err)
    }
}

fn participant_from_query(query: Option<&str>) -> Option<ParticipantId> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "user")
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}
