use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JsonMessage, ParticipantId, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextShowStatus {
    Odai,
    Canvas,
    Answer,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomNewMemberBody {
    pub capacity: usize,
    pub host_id: ParticipantId,
    pub members: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdateOptionBody {
    pub time_limit: u64,
    pub board_name: String,
    pub all_area: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartBody {
    pub odai_hint: String,
    pub time_limit: u64,
    pub timeout: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyCountBody {
    pub ready: usize,
}

/// Which part of the board a drawer paints this round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasArea {
    pub area_id: usize,
    pub board_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawStartBody {
    pub all_draw_phase_num: usize,
    pub canvas: CanvasArea,
    pub draw_phase_num: usize,
    pub img: String,
    pub odai: String,
    pub time_limit: u64,
    pub timeout: DateTime<Utc>,
    pub drawn_area: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerStartBody {
    pub img: String,
    pub time_limit: u64,
    pub timeout: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowOdaiBody {
    pub sender: User,
    pub next: NextShowStatus,
    pub odai: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowCanvasBody {
    pub img: String,
    pub next: NextShowStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowAnswerBody {
    pub answerer: User,
    pub answer: String,
    pub next: NextShowStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeHostBody {
    pub host_id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBody {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerResponse {
    RoomNewMember(RoomNewMemberBody),
    RoomUpdateOption(RoomUpdateOptionBody),
    GameStart(GameStartBody),
    OdaiInput(ReadyCountBody),
    OdaiFinish,
    DrawStart(DrawStartBody),
    DrawInput(ReadyCountBody),
    DrawFinish,
    AnswerStart(AnswerStartBody),
    AnswerInput(ReadyCountBody),
    AnswerFinish,
    ShowStart,
    ShowOdai(ShowOdaiBody),
    ShowCanvas(ShowCanvasBody),
    ShowAnswer(ShowAnswerBody),
    NextRoom,
    ChangeHost(ChangeHostBody),
    BreakRoom,
    WelcomeNewClient(ContentBody),
    Error(ContentBody),
}

impl JsonMessage for PlayerResponse {}

impl PlayerResponse {
    pub fn error(content: impl ToString) -> Self {
        PlayerResponse::Error(ContentBody { content: content.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::Message;

    #[test]
    fn unit_event_has_no_body() {
        let value = serde_json::to_value(&PlayerResponse::OdaiFinish).unwrap();
        assert_eq!(value, serde_json::json!({"type": "ODAI_FINISH"}));
    }

    #[test]
    fn error_event_shape() {
        let value = serde_json::to_value(&PlayerResponse::error("wrong phase")).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["body"]["content"], "wrong phase");
    }

    #[test]
    fn draw_start_fields_are_camel_case() {
        let resp = PlayerResponse::DrawStart(DrawStartBody {
            all_draw_phase_num: 4,
            canvas: CanvasArea { area_id: 2, board_name: "2x2".into() },
            draw_phase_num: 1,
            img: String::new(),
            odai: "伝説のなす".into(),
            time_limit: 60,
            timeout: Utc::now(),
            drawn_area: vec![3],
        });
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "DRAW_START");
        assert_eq!(value["body"]["allDrawPhaseNum"], 4);
        assert_eq!(value["body"]["canvas"]["areaId"], 2);
        assert_eq!(value["body"]["canvas"]["boardName"], "2x2");
        assert_eq!(value["body"]["drawnArea"], serde_json::json!([3]));
    }

    #[test]
    fn next_status_is_lowercase() {
        let value = serde_json::to_value(NextShowStatus::End).unwrap();
        assert_eq!(value, "end");
    }

    #[test]
    fn ser_produces_text_frame() {
        let resp = PlayerResponse::ChangeHost(ChangeHostBody { host_id: ParticipantId::nil() });
        match resp.ser().unwrap() {
            Message::Text(text) => {
                assert_eq!(PlayerResponse::deser(&text).unwrap(), resp);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }
}
