use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::config::{Canvas, Config};
use crate::error::{ErrorKind, RoomResult};
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Room,
    Odai,
    Draw,
    Answer,
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowPhase {
    Odai,
    Canvas,
    Answer,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawer {
    pub participant: ParticipantId,
    pub area: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub title: String,
    pub sender: ParticipantId,
    pub answerer: Option<ParticipantId>,
    pub drawers: Vec<Drawer>,
    /// PNG of everything drawn so far; empty before the first fragment.
    pub img: Vec<u8>,
    pub updated: bool,
    pub answer: Option<String>,
}

impl Topic {
    pub fn new(sender: ParticipantId, title: String) -> Self {
        Self {
            title,
            sender,
            answerer: None,
            drawers: Vec::new(),
            img: Vec::new(),
            updated: false,
            answer: None,
        }
    }
}

/// Everything that lives for one game and is thrown away on return.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub phase: Phase,
    pub ready: HashSet<ParticipantId>,
    pub topics: Vec<Topic>,
    pub draw_count: usize,
    pub show_count: usize,
    pub show_phase: ShowPhase,

    // settings frozen at game start
    pub canvas: Canvas,
    pub time_limit: u64,
    pub timeout: Option<DateTime<Utc>>,
}

impl State {
    pub fn new(config: &Config) -> Self {
        Self {
            phase: Phase::Room,
            ready: HashSet::new(),
            topics: Vec::new(),
            draw_count: 0,
            show_count: 0,
            show_phase: ShowPhase::Odai,
            canvas: config.canvas.clone(),
            time_limit: config.time_limit,
            timeout: None,
        }
    }

    pub fn add_ready(&mut self, id: ParticipantId) -> bool {
        self.ready.insert(id)
    }

    pub fn cancel_ready(&mut self, id: &ParticipantId) -> bool {
        self.ready.remove(id)
    }

    pub fn reset_ready(&mut self) {
        self.ready.clear();
    }

    pub fn reset_updated(&mut self) {
        for topic in self.topics.iter_mut() {
            topic.updated = false;
        }
    }

    pub fn add_topic(&mut self, sender: ParticipantId, title: String) -> RoomResult<()> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ErrorKind::Decode("empty odai".into()));
        }
        if self.topics.iter().any(|t| t.sender == sender || t.title == title) {
            return Err(ErrorKind::AlreadyExists);
        }
        self.topics.push(Topic::new(sender, title));
        Ok(())
    }

    pub fn has_topic(&self, sender: &ParticipantId) -> bool {
        self.topics.iter().any(|t| t.sender == *sender)
    }

    pub fn all_draw_phase(&self) -> usize {
        self.canvas.all_area
    }

    pub fn current_drawer(&self, topic: usize) -> RoomResult<&Drawer> {
        self.topics
            .get(topic)
            .ok_or(ErrorKind::NotFound)?
            .drawers
            .get(self.draw_count)
            .ok_or(ErrorKind::InvalidDrawCount)
    }

    /// The topic `drawer` still owes a fragment for this round.
    pub fn pending_topic_of(&self, drawer: &ParticipantId) -> Option<usize> {
        let round = self.draw_count;
        self.topics.iter().position(|t| {
            !t.updated && t.drawers.get(round).map(|d| d.participant) == Some(*drawer)
        })
    }

    pub fn topic_answered_by(&self, answerer: &ParticipantId) -> Option<usize> {
        self.topics.iter().position(|t| t.answerer == Some(*answerer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn ready_is_idempotent() {
        let mut state = State::new(&Config::new());
        let id = Uuid::new_v4();
        assert!(state.add_ready(id));
        assert!(!state.add_ready(id));
        assert_eq!(state.ready.len(), 1);
        assert!(state.cancel_ready(&id));
        assert!(!state.cancel_ready(&id));
        assert!(state.ready.is_empty());
    }

    #[test]
    fn topics_are_unique_per_sender_and_title() {
        let mut state = State::new(&Config::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        state.add_topic(a, "宇宙のなす".into()).unwrap();
        assert!(matches!(state.add_topic(a, "別のお題".into()), Err(ErrorKind::AlreadyExists)));
        assert!(matches!(state.add_topic(b, " 宇宙のなす ".into()), Err(ErrorKind::AlreadyExists)));
        assert!(matches!(state.add_topic(b, "   ".into()), Err(ErrorKind::Decode(_))));
        assert_eq!(state.topics.len(), 1);
        assert!(state.has_topic(&a));
        assert!(!state.has_topic(&b));
    }

    #[test]
    fn pending_topic_follows_round() {
        let mut state = State::new(&Config::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        state.add_topic(a, "x".into()).unwrap();
        state.topics[0].drawers = vec![
            Drawer { participant: b, area: 1 },
            Drawer { participant: a, area: 0 },
        ];
        assert_eq!(state.pending_topic_of(&b), Some(0));
        assert_eq!(state.pending_topic_of(&a), None);

        state.topics[0].updated = true;
        assert_eq!(state.pending_topic_of(&b), None);

        state.draw_count = 1;
        state.reset_updated();
        assert_eq!(state.pending_topic_of(&a), Some(0));
        assert_eq!(state.current_drawer(0).unwrap().area, 0);

        state.draw_count = 2;
        assert!(matches!(state.current_drawer(0), Err(ErrorKind::InvalidDrawCount)));
    }
}
