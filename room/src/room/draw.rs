use tracing::{debug, error, info, warn};

use protocol::{AnswerStartBody, CanvasArea, DrawSendBody, DrawStartBody, PlayerResponse as PlayerResp, ReadyCountBody};

use super::state::Phase;
use super::{Room, TimerType};
use crate::canvas::{self, CompositeError};
use crate::error::{ErrorKind, RoomResult};
use crate::types::*;

impl Room {
    pub(super) fn on_draw_ready(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Draw)?;
        self.state.add_ready(from);
        self.broadcast_draw_input();
        Ok(())
    }

    pub(super) fn on_draw_cancel(&mut self, from: ParticipantId) -> RoomResult<()> {
        self.expect_phase(Phase::Draw)?;
        self.state.cancel_ready(&from);
        self.broadcast_draw_input();
        Ok(())
    }

    fn broadcast_draw_input(&mut self) {
        let ready = self.ready_count();
        self.broadcast(PlayerResp::DrawInput(ReadyCountBody { ready }));
    }

    pub(super) async fn on_draw_send(&mut self, from: ParticipantId, body: DrawSendBody) -> RoomResult<()> {
        self.expect_phase(Phase::Draw)?;
        if let Some(round) = body.draw_phase_num {
            if round != self.state.draw_count {
                return Err(ErrorKind::WrongPhase);
            }
        }
        let idx = self.state.pending_topic_of(&from).ok_or(ErrorKind::NotFound)?;
        let overlay = canvas::decode_img(&body.img).map_err(|err| ErrorKind::Decode(err.to_string()))?;

        let base = self.state.topics[idx].img.clone();
        let layer = overlay.clone();
        let merged = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, CompositeError> {
            if base.is_empty() {
                canvas::check_layer(&layer)?;
            }
            let merged = canvas::merge_layer(&base, &layer);
            if let Err(CompositeError::Base(_)) = merged {
                // the layer replaces the base, so it has to stand on its own
                canvas::check_layer(&layer)?;
            }
            merged
        })
        .await
        .unwrap_or(Err(CompositeError::Aborted));

        match merged {
            Ok(img) => self.apply_fragment(idx, img),
            Err(err @ CompositeError::Base(_)) => {
                // an unreadable base is dropped and the fragment starts over
                warn!(room = %self.id, topic = idx, %err, "discarding unreadable canvas");
                self.apply_fragment(idx, overlay);
                self.send(from, PlayerResp::error(&err));
            }
            Err(err) => return Err(err.into()),
        }

        self.state.add_ready(from);
        self.broadcast_draw_input();
        if self.draw_round_complete() {
            self.finish_draw_round();
        }
        Ok(())
    }

    fn apply_fragment(&mut self, idx: usize, img: Vec<u8>) {
        let topic = &mut self.state.topics[idx];
        topic.img = img;
        topic.updated = true;
        debug!(room = %self.id, topic = idx, round = self.state.draw_count, "fragment merged");
    }

    /// Every topic got this round's fragment or its drawer is gone.
    pub(super) fn draw_round_complete(&self) -> bool {
        let round = self.state.draw_count;
        self.state.topics.iter().all(|topic| {
            topic.updated
                || topic
                    .drawers
                    .get(round)
                    .map_or(true, |drawer| !self.is_connected(&drawer.participant))
        })
    }

    pub(super) fn finish_draw_round(&mut self) {
        if self.state.phase != Phase::Draw {
            return;
        }
        self.timer.stop();
        self.broadcast(PlayerResp::DrawFinish);
        self.state.reset_ready();
        self.state.reset_updated();

        if self.state.draw_count + 1 < self.state.all_draw_phase() {
            self.state.draw_count += 1;
            debug!(room = %self.id, round = self.state.draw_count, "next draw round");
            self.arm_phase_timer(TimerType::Draw);
            self.send_draw_starts();
        } else {
            self.start_answer();
        }
    }

    pub(super) fn send_draw_starts(&mut self) {
        for idx in 0..self.state.topics.len() {
            self.send_draw_start(idx);
        }
    }

    pub(super) fn send_draw_start(&mut self, idx: usize) {
        match self.draw_start_body(idx) {
            Ok((drawer, body)) => self.send(drawer, PlayerResp::DrawStart(body)),
            Err(err) => error!(room = %self.id, topic = idx, %err, "no drawer for topic"),
        }
    }

    fn draw_start_body(&self, idx: usize) -> RoomResult<(ParticipantId, DrawStartBody)> {
        let drawer = self.state.current_drawer(idx)?;
        let topic = &self.state.topics[idx];
        let round = self.state.draw_count;
        let body = DrawStartBody {
            all_draw_phase_num: self.state.all_draw_phase(),
            canvas: CanvasArea {
                area_id: drawer.area,
                board_name: self.state.canvas.board_name.clone(),
            },
            draw_phase_num: round,
            img: canvas::encode_img(&topic.img),
            odai: topic.title.clone(),
            time_limit: self.state.time_limit,
            timeout: self.state.timeout.unwrap_or_else(chrono::Utc::now),
            drawn_area: topic.drawers[..round].iter().map(|d| d.area).collect(),
        };
        Ok((drawer.participant, body))
    }

    fn start_answer(&mut self) {
        info!(room = %self.id, "drawing finished");
        self.state.phase = Phase::Answer;
        self.state.reset_ready();
        let timeout = self.arm_phase_timer(TimerType::Answer);
        let time_limit = self.state.time_limit;

        let starts: Vec<(ParticipantId, String)> = self
            .state
            .topics
            .iter()
            .filter_map(|topic| topic.answerer.map(|a| (a, canvas::encode_img(&topic.img))))
            .collect();
        for (answerer, img) in starts {
            self.send(answerer, PlayerResp::AnswerStart(AnswerStartBody { img, time_limit, timeout }));
        }
    }
}
