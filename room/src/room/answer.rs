use tracing::info;

use protocol::{AnswerSendBody, PlayerResponse as PlayerResp, ReadyCountBody};

use super::state::{Phase, ShowPhase};
use super::Room;
use crate::error::{ErrorKind, RoomResult};
use crate::types::*;

impl Room {
    pub(super) fn on_answer_ready(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Answer)?;
        self.state.add_ready(from);
        self.answer_ready_changed();
        Ok(())
    }

    pub(super) fn on_answer_cancel(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Answer)?;
        self.state.cancel_ready(&from);
        self.answer_ready_changed();
        Ok(())
    }

    pub(super) fn on_answer_send(&mut self, from: ParticipantId, body: AnswerSendBody) -> RoomResult<()> {
        self.expect_phase(Phase::Answer)?;
        let idx = self.state.topic_answered_by(&from).ok_or(ErrorKind::NotFound)?;
        let topic = &mut self.state.topics[idx];
        if topic.answer.is_some() {
            return Err(ErrorKind::AlreadyExists);
        }
        topic.answer = Some(body.answer.trim().to_string());
        self.state.add_ready(from);
        self.answer_ready_changed();
        Ok(())
    }

    fn answer_ready_changed(&mut self) {
        let ready = self.ready_count();
        self.broadcast(PlayerResp::AnswerInput(ReadyCountBody { ready }));
        if self.answers_complete() {
            self.finish_answer();
        }
    }

    /// Every connected answerer is ready.
    pub(super) fn answers_complete(&self) -> bool {
        self.state
            .topics
            .iter()
            .filter_map(|topic| topic.answerer)
            .filter(|answerer| self.is_connected(answerer))
            .all(|answerer| self.state.ready.contains(&answerer))
    }

    pub(super) fn finish_answer(&mut self) {
        if self.state.phase != Phase::Answer {
            return;
        }
        self.timer.stop();
        self.broadcast(PlayerResp::AnswerFinish);
        info!(room = %self.id, "answers collected, showing results");

        self.state.reset_ready();
        self.state.phase = Phase::Show;
        self.state.show_count = 0;
        self.state.show_phase = ShowPhase::Odai;
        self.state.timeout = None;
        self.broadcast(PlayerResp::ShowStart);
        self.arm_break_timer();
    }
}
