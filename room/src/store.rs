use std::collections::HashMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc::Sender;
use tokio::sync::{oneshot, watch, RwLock};
use tracing::info;

use protocol::{RoomView, User};

use crate::consts::*;
use crate::error::{ErrorKind, RoomResult};
use crate::player::Connection;
use crate::registry::ConnectionRegistry;
use crate::room::{Room, RoomReq};
use crate::types::*;

/// Cheap handle to a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    tx: Sender<RoomReq>,
    view: watch::Receiver<RoomView>,
}

impl RoomHandle {
    pub(crate) fn new(id: RoomId, tx: Sender<RoomReq>, view: watch::Receiver<RoomView>) -> Self {
        Self { id, tx, view }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest membership snapshot, without a round trip to the room.
    pub fn view(&self) -> RoomView {
        self.view.borrow().clone()
    }

    pub fn sender(&self) -> Sender<RoomReq> {
        self.tx.clone()
    }

    pub async fn join(&self, user: User) -> RoomResult<RoomView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomReq::Join { user, reply })
            .await
            .map_err(|_| ErrorKind::Closed)?;
        rx.await.map_err(|_| ErrorKind::Closed)?
    }

    /// Hands a live connection to the room. If the room is already gone the
    /// connection is closed so its pumps wind down.
    pub async fn login(&self, conn: Arc<Connection>) -> RoomResult<()> {
        if self.tx.send(RoomReq::PlayerLogin(conn.clone())).await.is_err() {
            conn.close();
            return Err(ErrorKind::Closed);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Rooms {
    by_id: HashMap<RoomId, RoomHandle>,
    by_participant: HashMap<ParticipantId, RoomId>,
}

/// Every open room, plus which room each participant belongs to.
#[derive(Debug, Clone, Default)]
pub struct RoomStore {
    rooms: Arc<RwLock<Rooms>>,
    registry: ConnectionRegistry,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    pub async fn create_room(&self, host: User, capacity: usize) -> RoomResult<RoomView> {
        if !(MIN_MEMBERS..=MAX_CAPACITY).contains(&capacity) {
            return Err(ErrorKind::Decode(format!(
                "capacity must be within {}..={}",
                MIN_MEMBERS, MAX_CAPACITY
            )));
        }
        let host_id = host.user_id;
        let room = {
            let mut rooms = self.rooms.write().await;
            let id = loop {
                let id = random_room_id();
                if !rooms.by_id.contains_key(&id) {
                    break id;
                }
            };
            let room = Room::new(id.clone(), capacity, host, self.clone());
            rooms.by_id.insert(id.clone(), room.handle());
            rooms.by_participant.insert(host_id, id);
            room
        };
        info!(room = %room.id(), host = %host_id, capacity, "room created");
        let view = room.handle().view();
        tokio::spawn(room.run());
        Ok(RoomView { user_id: Some(host_id), ..view })
    }

    pub async fn join_room(&self, room_id: &str, user: User) -> RoomResult<RoomView> {
        let handle = self.get_room(room_id).await.ok_or(ErrorKind::NotFound)?;
        let user_id = user.user_id;
        let view = handle.join(user).await?;
        self.rooms
            .write()
            .await
            .by_participant
            .insert(user_id, handle.id().to_string());
        Ok(RoomView { user_id: Some(user_id), ..view })
    }

    pub async fn get_room(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.by_id.get(room_id).cloned()
    }

    pub async fn get_room_by_participant(&self, participant: &ParticipantId) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        let room_id = rooms.by_participant.get(participant)?;
        rooms.by_id.get(room_id).cloned()
    }

    pub async fn delete_room(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        if rooms.by_id.remove(room_id).is_some() {
            rooms.by_participant.retain(|_, id| id != room_id);
            info!(room = %room_id, "room removed");
        }
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.by_id.len()
    }
}

fn random_room_id() -> RoomId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ROOM_ID_LEN)
        .map(char::from)
        .collect()
}
