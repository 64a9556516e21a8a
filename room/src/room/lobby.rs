use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use protocol::{
    AnswerStartBody, ContentBody, GameStartBody, PlayerResponse as PlayerResp, RoomSetOptionBody, RoomView, User,
};

use super::state::{Phase, State};
use super::{hint, Room, TimerType};
use crate::canvas;
use crate::consts::*;
use crate::error::{ErrorKind, RoomResult};
use crate::player::Connection;
use crate::types::*;

impl Room {
    pub(super) fn join(&mut self, user: User) -> RoomResult<RoomView> {
        self.expect_phase(Phase::Room)?;
        if self.is_member(&user.user_id) {
            return Err(ErrorKind::AlreadyExists);
        }
        if self.members.len() >= self.capacity {
            return Err(ErrorKind::RoomFull);
        }
        info!(room = %self.id, participant = %user.user_id, name = %user.username, "member joined");
        self.members.push(user);
        self.publish_view();
        self.broadcast(PlayerResp::RoomNewMember(self.member_body()));
        Ok(self.view())
    }

    pub(super) fn login(&mut self, conn: Arc<Connection>) {
        let participant = conn.participant();
        if !self.is_member(&participant) {
            warn!(room = %self.id, %participant, "connection from a stranger");
            conn.close();
            return;
        }
        info!(room = %self.id, %participant, "player connected");
        self.registry.register(conn);
        self.send(
            participant,
            PlayerResp::WelcomeNewClient(ContentBody { content: WELCOME.to_string() }),
        );
        self.resume(participant);
    }

    /// Repeats whatever the phase still expects from a (re)connected player.
    fn resume(&mut self, participant: ParticipantId) {
        let timeout = self.state.timeout.unwrap_or_else(Utc::now);
        let time_limit = self.state.time_limit;
        match self.state.phase {
            Phase::Room => {
                self.send(participant, PlayerResp::RoomNewMember(self.member_body()));
                self.send(participant, PlayerResp::RoomUpdateOption(self.config.to_body()));
            }
            Phase::Odai => {
                if !self.state.has_topic(&participant) {
                    let odai_hint = hint::odai_example(&mut self.rng);
                    self.send(
                        participant,
                        PlayerResp::GameStart(GameStartBody { odai_hint, time_limit, timeout }),
                    );
                }
            }
            Phase::Draw => {
                if let Some(topic) = self.state.pending_topic_of(&participant) {
                    self.send_draw_start(topic);
                }
            }
            Phase::Answer => {
                let pending = self
                    .state
                    .topic_answered_by(&participant)
                    .map(|idx| &self.state.topics[idx])
                    .filter(|topic| topic.answer.is_none())
                    .map(|topic| canvas::encode_img(&topic.img));
                if let Some(img) = pending {
                    self.send(
                        participant,
                        PlayerResp::AnswerStart(AnswerStartBody { img, time_limit, timeout }),
                    );
                }
            }
            Phase::Show => {
                self.send(participant, PlayerResp::ShowStart);
                if let Some(item) = self.current_show_item() {
                    self.send(participant, item);
                }
            }
        }
    }

    pub(super) fn logout(&mut self, participant: ParticipantId, conn_id: u64) {
        self.registry.unregister_conn(&participant, conn_id);
        if self.is_connected(&participant) {
            // a newer socket already took over
            return;
        }
        info!(room = %self.id, %participant, "player disconnected");
        if participant == self.host {
            self.change_host();
        }
        self.recheck_phase();
    }

    /// A departure can be the last thing a phase was waiting for.
    fn recheck_phase(&mut self) {
        match self.state.phase {
            Phase::Odai => {
                if self.all_ready() {
                    self.finish_odai();
                }
            }
            Phase::Draw => {
                if self.draw_round_complete() {
                    self.finish_draw_round();
                }
            }
            Phase::Answer => {
                if self.answers_complete() {
                    self.finish_answer();
                }
            }
            Phase::Room | Phase::Show => {}
        }
    }

    pub(super) fn on_set_option(&mut self, from: ParticipantId, body: RoomSetOptionBody) -> RoomResult<()> {
        self.expect_phase(Phase::Room)?;
        self.expect_host(&from)?;
        self.config.apply(body)?;
        self.broadcast(PlayerResp::RoomUpdateOption(self.config.to_body()));
        Ok(())
    }

    pub(super) fn on_game_start(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Room)?;
        self.expect_host(&from)?;
        if self.members.len() < MIN_MEMBERS {
            return Err(ErrorKind::NotEnoughMembers);
        }

        self.break_timer.stop();
        self.state = State::new(&self.config);
        self.state.phase = Phase::Odai;
        let timeout = self.arm_phase_timer(TimerType::Odai);
        info!(
            room = %self.id,
            members = self.members.len(),
            board = %self.state.canvas.board_name,
            time_limit = self.state.time_limit,
            "game started"
        );

        let time_limit = self.state.time_limit;
        for member in self.member_ids() {
            let odai_hint = hint::odai_example(&mut self.rng);
            self.send(
                member,
                PlayerResp::GameStart(GameStartBody { odai_hint, time_limit, timeout }),
            );
        }
        Ok(())
    }
}
