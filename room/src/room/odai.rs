use tracing::{error, info};

use protocol::{OdaiSendBody, PlayerResponse as PlayerResp, ReadyCountBody};

use super::state::{Drawer, Phase};
use super::{hint, Room, TimerType};
use crate::error::RoomResult;
use crate::scheduler;
use crate::types::*;

const HINT_ATTEMPTS: usize = 8;

impl Room {
    pub(super) fn on_odai_ready(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Odai)?;
        self.state.add_ready(from);
        self.odai_ready_changed();
        Ok(())
    }

    pub(super) fn on_odai_cancel(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Odai)?;
        self.state.cancel_ready(&from);
        self.odai_ready_changed();
        Ok(())
    }

    pub(super) fn on_odai_send(&mut self, from: ParticipantId, body: OdaiSendBody) -> RoomResult<()> {
        self.expect_phase(Phase::Odai)?;
        self.state.add_topic(from, body.odai)?;
        self.state.add_ready(from);
        self.odai_ready_changed();
        Ok(())
    }

    fn odai_ready_changed(&mut self) {
        let ready = self.ready_count();
        self.broadcast(PlayerResp::OdaiInput(ReadyCountBody { ready }));
        if self.all_ready() {
            self.finish_odai();
        }
    }

    pub(super) fn finish_odai(&mut self) {
        if self.state.phase != Phase::Odai {
            return;
        }
        self.timer.stop();
        self.broadcast(PlayerResp::OdaiFinish);
        self.backfill_topics();

        let senders: Vec<ParticipantId> = self.state.topics.iter().map(|t| t.sender).collect();
        let plan = match scheduler::schedule(&senders, self.state.all_draw_phase(), &mut self.rng) {
            Ok(plan) => plan,
            Err(err) => {
                error!(room = %self.id, %err, "failed to assign roles");
                self.reset_to_lobby();
                return;
            }
        };
        for (topic, assignment) in self.state.topics.iter_mut().zip(plan) {
            topic.answerer = Some(assignment.answerer);
            topic.drawers = assignment
                .drawers
                .into_iter()
                .map(|slot| Drawer { participant: slot.drawer, area: slot.area })
                .collect();
        }

        info!(room = %self.id, topics = self.state.topics.len(), "odai collected");
        self.state.reset_ready();
        self.state.reset_updated();
        self.state.draw_count = 0;
        self.state.phase = Phase::Draw;
        self.arm_phase_timer(TimerType::Draw);
        self.send_draw_starts();
    }

    /// Members who never sent an odai get a generated one.
    fn backfill_topics(&mut self) {
        let silent: Vec<ParticipantId> = self
            .member_ids()
            .into_iter()
            .filter(|id| !self.state.has_topic(id))
            .collect();
        for member in silent {
            let mut attempt = 0;
            loop {
                let mut title = hint::odai_example(&mut self.rng);
                if attempt >= HINT_ATTEMPTS {
                    title = format!("{}{}", title, attempt);
                }
                if self.state.add_topic(member, title).is_ok() {
                    break;
                }
                attempt += 1;
            }
        }
    }
}
