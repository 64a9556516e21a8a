use tracing::info;

use protocol::{NextShowStatus, PlayerResponse as PlayerResp, ShowAnswerBody, ShowCanvasBody, ShowOdaiBody};

use super::state::{Phase, ShowPhase, State};
use super::Room;
use crate::canvas;
use crate::error::{ErrorKind, RoomResult};
use crate::types::*;

impl Room {
    /// Walks the reveal one step: odai, then the picture, then the answer,
    /// topic after topic. Past the last answer it does nothing.
    pub(super) fn on_show_next(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Show)?;
        self.expect_host(&from)?;
        if self.state.show_phase == ShowPhase::End {
            return Ok(());
        }

        let idx = self.state.show_count;
        let resp = self.show_item(self.state.show_phase, idx)?;
        let (next_phase, next_count) = match self.state.show_phase {
            ShowPhase::Odai => (ShowPhase::Canvas, idx),
            ShowPhase::Canvas => (ShowPhase::Answer, idx),
            _ if idx + 1 >= self.state.topics.len() => (ShowPhase::End, idx),
            _ => (ShowPhase::Odai, idx + 1),
        };

        self.state.show_phase = next_phase;
        self.state.show_count = next_count;
        self.broadcast(resp);
        Ok(())
    }

    /// What the table is looking at right now, if anything was revealed yet.
    pub(super) fn current_show_item(&self) -> Option<PlayerResp> {
        let (phase, idx) = match (self.state.show_phase, self.state.show_count) {
            (ShowPhase::Odai, 0) => return None,
            (ShowPhase::Odai, idx) => (ShowPhase::Answer, idx - 1),
            (ShowPhase::Canvas, idx) => (ShowPhase::Odai, idx),
            (ShowPhase::Answer, idx) => (ShowPhase::Canvas, idx),
            (ShowPhase::End, idx) => (ShowPhase::Answer, idx),
        };
        self.show_item(phase, idx).ok()
    }

    fn show_item(&self, phase: ShowPhase, idx: usize) -> RoomResult<PlayerResp> {
        let topic = self.state.topics.get(idx).ok_or(ErrorKind::NotFound)?;
        let resp = match phase {
            ShowPhase::Odai => {
                let sender = self.member(&topic.sender).ok_or(ErrorKind::NotFound)?.clone();
                PlayerResp::ShowOdai(ShowOdaiBody {
                    sender,
                    next: NextShowStatus::Canvas,
                    odai: topic.title.clone(),
                })
            }
            ShowPhase::Canvas => PlayerResp::ShowCanvas(ShowCanvasBody {
                img: canvas::encode_img(&topic.img),
                next: NextShowStatus::Answer,
            }),
            ShowPhase::Answer => {
                let answerer = topic
                    .answerer
                    .and_then(|id| self.member(&id))
                    .ok_or(ErrorKind::NotFound)?
                    .clone();
                let last = idx + 1 >= self.state.topics.len();
                PlayerResp::ShowAnswer(ShowAnswerBody {
                    answerer,
                    answer: topic.answer.clone().unwrap_or_default(),
                    next: if last { NextShowStatus::End } else { NextShowStatus::Odai },
                })
            }
            ShowPhase::End => return Err(ErrorKind::WrongPhase),
        };
        Ok(resp)
    }

    pub(super) fn on_return_room(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Show)?;
        self.expect_host(&from)?;
        self.reset_to_lobby();
        Ok(())
    }

    pub(super) fn reset_to_lobby(&mut self) {
        info!(room = %self.id, "back to the lobby");
        self.timer.stop();
        self.state = State::new(&self.config);
        self.broadcast(PlayerResp::NextRoom);
        self.arm_break_timer();
    }
}
