use std::sync::Arc;

use tokio::sync::oneshot;

use protocol::{RoomView, User};

use crate::error::RoomResult;
use crate::player::Connection;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerType {
    Odai,
    Draw,
    Answer,
    Break,
}

#[derive(Debug)]
pub enum Request {
    PlayerReq(ParticipantId, protocol::PlayerRequest),
    PlayerLogin(Arc<Connection>),
    PlayerLogout {
        participant: ParticipantId,
        conn_id: u64,
    },

    Join {
        user: User,
        reply: oneshot::Sender<RoomResult<RoomView>>,
    },

    Timer {
        kind: TimerType,
        epoch: u64,
    },
}
