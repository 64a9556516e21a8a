mod answer;
mod config;
mod draw;
mod hint;
mod lobby;
mod odai;
mod request;
mod show;
mod state;
mod timer;


use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use protocol::{
    ChangeHostBody, PlayerRequest as PlayerReq, PlayerResponse as PlayerResp, RoomNewMemberBody, RoomView,
    User,
};

use crate::consts::*;
use crate::error::{ErrorKind, RoomResult};
use crate::player::SendError;
use crate::registry::ConnectionRegistry;
use crate::store::{RoomHandle, RoomStore};
use crate::types::*;

pub use config::{Canvas, Config, BOARDS};
pub use request::Request as RoomReq;
pub use request::TimerType;
pub use state::{Phase, ShowPhase};

use state::State;
use timer::PhaseTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

/// One game room. Owns all of its state and is driven only through its
/// request queue, so handlers never race each other.
pub struct Room {
    id: RoomId,
    capacity: usize,
    host: ParticipantId,
    members: Vec<User>,

    config: Config,
    state: State,

    timer: PhaseTimer,
    break_timer: PhaseTimer,

    registry: ConnectionRegistry,
    store: RoomStore,

    rm_rx: Receiver<RoomReq>,
    loopback: Sender<RoomReq>,

    view_tx: watch::Sender<RoomView>,
    view_rx: watch::Receiver<RoomView>,

    rng: StdRng,
}

impl Room {
    pub fn new(id: RoomId, capacity: usize, host: User, store: RoomStore) -> Self {
        let (loopback, rm_rx) = channel::<RoomReq>(ROOM_QUEUE);
        let view = RoomView {
            room_id: id.clone(),
            capacity,
            host_id: host.user_id,
            members: vec![host.clone()],
            user_id: None,
        };
        let (view_tx, view_rx) = watch::channel(view);
        let config = Config::new();

        Self {
            id,
            capacity,
            host: host.user_id,
            members: vec![host],

            state: State::new(&config),
            config,

            timer: PhaseTimer::new(),
            break_timer: PhaseTimer::new(),

            registry: store.registry(),
            store,

            rm_rx,
            loopback,

            view_tx,
            view_rx,

            rng: StdRng::from_entropy(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> RoomHandle {
        RoomHandle::new(self.id.clone(), self.loopback.clone(), self.view_rx.clone())
    }

    pub async fn run(mut self) {
        info!(room = %self.id, "room opened");
        self.arm_break_timer();
        while let Some(req) = self.rm_rx.recv().await {
            if self.process(req).await == Flow::Break {
                break;
            }
        }
        info!(room = %self.id, "room closed");
    }

    pub(crate) async fn process(&mut self, req: RoomReq) -> Flow {
        match req {
            RoomReq::PlayerReq(from, req) => {
                let kind = req.kind();
                if let Err(err) = self.dispatch(from, req).await {
                    debug!(room = %self.id, participant = %from, ?kind, %err, "request rejected");
                    self.send(from, PlayerResp::error(&err));
                }
            }
            RoomReq::PlayerLogin(conn) => self.login(conn),
            RoomReq::PlayerLogout { participant, conn_id } => self.logout(participant, conn_id),
            RoomReq::Join { user, reply } => {
                let res = self.join(user);
                reply.send(res).unwrap_or_default();
            }
            RoomReq::Timer { kind, epoch } => return self.on_timer(kind, epoch).await,
        }
        Flow::Continue
    }

    async fn dispatch(&mut self, from: ParticipantId, req: PlayerReq) -> RoomResult<()> {
        if !self.is_member(&from) {
            return Err(ErrorKind::NotFound);
        }
        match req {
            PlayerReq::RoomSetOption(body) => self.on_set_option(from, body),
            PlayerReq::RequestGameStart => self.on_game_start(from),
            PlayerReq::OdaiReady => self.on_odai_ready(from),
            PlayerReq::OdaiCancel => self.on_odai_cancel(from),
            PlayerReq::OdaiSend(body) => self.on_odai_send(from, body),
            PlayerReq::DrawReady => self.on_draw_ready(from),
            PlayerReq::DrawCancel => self.on_draw_cancel(from),
            PlayerReq::DrawSend(body) => self.on_draw_send(from, body).await,
            PlayerReq::AnswerReady => self.on_answer_ready(from),
            PlayerReq::AnswerCancel => self.on_answer_cancel(from),
            PlayerReq::AnswerSend(body) => self.on_answer_send(from, body),
            PlayerReq::ShowNext => self.on_show_next(from),
            PlayerReq::ReturnRoom => self.on_return_room(from),
        }
    }

    async fn on_timer(&mut self, kind: TimerType, epoch: u64) -> Flow {
        if kind == TimerType::Break {
            if self.break_timer.fire(kind, epoch) {
                return self.break_room().await;
            }
            return Flow::Continue;
        }
        if !self.timer.fire(kind, epoch) {
            debug!(room = %self.id, ?kind, epoch, "stale timer");
            return Flow::Continue;
        }
        match (kind, self.state.phase) {
            (TimerType::Odai, Phase::Odai) => self.finish_odai(),
            (TimerType::Draw, Phase::Draw) => self.finish_draw_round(),
            (TimerType::Answer, Phase::Answer) => self.finish_answer(),
            (kind, phase) => debug!(room = %self.id, ?kind, ?phase, "timer outlived its phase"),
        }
        Flow::Continue
    }

    async fn break_room(&mut self) -> Flow {
        info!(room = %self.id, "room abandoned, breaking up");
        self.timer.stop();
        let resp = Arc::new(PlayerResp::BreakRoom);
        for member in self.members.iter() {
            if let Some(conn) = self.registry.lookup(&member.user_id) {
                conn.send(resp.clone()).unwrap_or_default();
            }
            self.registry.unregister(&member.user_id);
        }
        self.store.delete_room(&self.id).await;
        Flow::Break
    }

    fn arm_phase_timer(&mut self, kind: TimerType) -> DateTime<Utc> {
        let limit = self.state.time_limit;
        self.timer
            .arm(kind, Duration::from_secs(limit) + SUBMIT_GRACE, self.loopback.clone());
        let timeout = Utc::now() + chrono::Duration::seconds(limit as i64);
        self.state.timeout = Some(timeout);
        timeout
    }

    fn arm_break_timer(&mut self) {
        self.break_timer
            .arm(TimerType::Break, BREAK_AFTER, self.loopback.clone());
    }

    fn expect_phase(&self, phase: Phase) -> RoomResult<()> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(ErrorKind::WrongPhase)
        }
    }

    fn expect_host(&self, from: &ParticipantId) -> RoomResult<()> {
        if self.host == *from {
            Ok(())
        } else {
            Err(ErrorKind::Unauthorized)
        }
    }

    fn is_member(&self, id: &ParticipantId) -> bool {
        self.members.iter().any(|m| m.user_id == *id)
    }

    fn member(&self, id: &ParticipantId) -> Option<&User> {
        self.members.iter().find(|m| m.user_id == *id)
    }

    fn member_ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|m| m.user_id).collect()
    }

    fn is_connected(&self, id: &ParticipantId) -> bool {
        self.registry.is_connected(id)
    }

    fn ready_count(&self) -> usize {
        self.state
            .ready
            .iter()
            .filter(|id| self.is_connected(id))
            .count()
    }

    /// Every connected member is ready.
    fn all_ready(&self) -> bool {
        self.members
            .iter()
            .filter(|m| self.is_connected(&m.user_id))
            .all(|m| self.state.ready.contains(&m.user_id))
    }

    fn view(&self) -> RoomView {
        RoomView {
            room_id: self.id.clone(),
            capacity: self.capacity,
            host_id: self.host,
            members: self.members.clone(),
            user_id: None,
        }
    }

    fn publish_view(&self) {
        self.view_tx.send(self.view()).unwrap_or_default();
    }

    fn member_body(&self) -> RoomNewMemberBody {
        RoomNewMemberBody {
            capacity: self.capacity,
            host_id: self.host,
            members: self.members.clone(),
        }
    }

    fn send(&mut self, to: ParticipantId, resp: PlayerResp) {
        self.deliver(to, Arc::new(resp));
    }

    fn broadcast(&mut self, resp: PlayerResp) {
        let resp = Arc::new(resp);
        for to in self.member_ids() {
            self.deliver(to, resp.clone());
        }
    }

    /// Non-blocking hand-off to the participant's queue. A peer that cannot
    /// keep up is disconnected rather than waited for. Failing to reach the
    /// host hands the role to someone reachable.
    fn deliver(&mut self, to: ParticipantId, resp: Arc<PlayerResp>) -> bool {
        let delivered = match self.registry.lookup(&to) {
            Some(conn) => match conn.send(resp) {
                Ok(()) => true,
                Err(SendError::Full) => {
                    warn!(room = %self.id, participant = %to, "outbound queue full, dropping connection");
                    self.registry.unregister_conn(&to, conn.id());
                    false
                }
                Err(SendError::Closed) => {
                    self.registry.unregister_conn(&to, conn.id());
                    false
                }
            },
            None => false,
        };
        if !delivered && to == self.host {
            self.change_host();
        }
        delivered
    }

    fn change_host(&mut self) {
        let Some(pos) = self.members.iter().position(|m| m.user_id == self.host) else {
            return;
        };
        let len = self.members.len();
        let next = (1..len)
            .map(|step| self.members[(pos + step) % len].user_id)
            .find(|id| self.is_connected(id));
        match next {
            Some(host_id) => {
                info!(room = %self.id, from = %self.host, to = %host_id, "host changed");
                self.host = host_id;
                self.publish_view();
                self.broadcast(PlayerResp::ChangeHost(ChangeHostBody { host_id }));
            }
            None => debug!(room = %self.id, "no connected member to take over host"),
        }
    }
}
