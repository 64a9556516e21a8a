use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    RoomSetOption,
    RequestGameStart,
    OdaiReady,
    OdaiCancel,
    OdaiSend,
    DrawReady,
    DrawCancel,
    DrawSend,
    AnswerReady,
    AnswerCancel,
    AnswerSend,
    ShowNext,
    ReturnRoom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSetOptionBody {
    pub time_limit: Option<u64>,
    pub board_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdaiSendBody {
    pub odai: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSendBody {
    /// base64 PNG, optionally with a `data:image/png;base64,` prefix
    pub img: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_phase_num: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSendBody {
    pub answer: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "body", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRequest {
    RoomSetOption(RoomSetOptionBody),
    RequestGameStart,
    OdaiReady,
    OdaiCancel,
    OdaiSend(OdaiSendBody),
    DrawReady,
    DrawCancel,
    DrawSend(DrawSendBody),
    AnswerReady,
    AnswerCancel,
    AnswerSend(AnswerSendBody),
    ShowNext,
    ReturnRoom,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("{0:?} requires a body")]
    MissingBody(RequestKind),
    #[error("failed to decode {kind:?} body: {source}")]
    Body {
        kind: RequestKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    body: Option<Value>,
}

impl PlayerRequest {
    /// Two-stage decode so an unknown event name and a malformed body
    /// surface as different errors.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Malformed)?;
        let kind: RequestKind = serde_json::from_value(Value::String(envelope.kind.clone()))
            .map_err(|_| FrameError::UnknownEventType(envelope.kind))?;
        let body = envelope.body;

        let req = match kind {
            RequestKind::RoomSetOption => PlayerRequest::RoomSetOption(decode_body(kind, body)?),
            RequestKind::RequestGameStart => PlayerRequest::RequestGameStart,
            RequestKind::OdaiReady => PlayerRequest::OdaiReady,
            RequestKind::OdaiCancel => PlayerRequest::OdaiCancel,
            RequestKind::OdaiSend => PlayerRequest::OdaiSend(decode_body(kind, body)?),
            RequestKind::DrawReady => PlayerRequest::DrawReady,
            RequestKind::DrawCancel => PlayerRequest::DrawCancel,
            RequestKind::DrawSend => PlayerRequest::DrawSend(decode_body(kind, body)?),
            RequestKind::AnswerReady => PlayerRequest::AnswerReady,
            RequestKind::AnswerCancel => PlayerRequest::AnswerCancel,
            RequestKind::AnswerSend => PlayerRequest::AnswerSend(decode_body(kind, body)?),
            RequestKind::ShowNext => PlayerRequest::ShowNext,
            RequestKind::ReturnRoom => PlayerRequest::ReturnRoom,
        };
        Ok(req)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            PlayerRequest::RoomSetOption(_) => RequestKind::RoomSetOption,
            PlayerRequest::RequestGameStart => RequestKind::RequestGameStart,
            PlayerRequest::OdaiReady => RequestKind::OdaiReady,
            PlayerRequest::OdaiCancel => RequestKind::OdaiCancel,
            PlayerRequest::OdaiSend(_) => RequestKind::OdaiSend,
            PlayerRequest::DrawReady => RequestKind::DrawReady,
            PlayerRequest::DrawCancel => RequestKind::DrawCancel,
            PlayerRequest::DrawSend(_) => RequestKind::DrawSend,
            PlayerRequest::AnswerReady => RequestKind::AnswerReady,
            PlayerRequest::AnswerCancel => RequestKind::AnswerCancel,
            PlayerRequest::AnswerSend(_) => RequestKind::AnswerSend,
            PlayerRequest::ShowNext => RequestKind::ShowNext,
            PlayerRequest::ReturnRoom => RequestKind::ReturnRoom,
        }
    }
}

fn decode_body<T: DeserializeOwned>(kind: RequestKind, body: Option<Value>) -> Result<T, FrameError> {
    let value = body.ok_or(FrameError::MissingBody(kind))?;
    serde_json::from_value(value).map_err(|source| FrameError::Body { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_unit_event_without_body() {
        let req = PlayerRequest::decode(r#"{"type":"ODAI_READY"}"#).unwrap();
        assert_eq!(req, PlayerRequest::OdaiReady);
    }

    #[test]
    fn unit_event_ignores_null_body() {
        let req = PlayerRequest::decode(r#"{"type":"SHOW_NEXT","body":null}"#).unwrap();
        assert_eq!(req, PlayerRequest::ShowNext);
    }

    #[test]
    fn decodes_body_event() {
        let req = PlayerRequest::decode(r#"{"type":"ODAI_SEND","body":{"odai":"ねこのリンゴ"}}"#).unwrap();
        assert_eq!(
            req,
            PlayerRequest::OdaiSend(OdaiSendBody { odai: "ねこのリンゴ".into() })
        );
    }

    #[test]
    fn draw_send_phase_is_optional() {
        let req = PlayerRequest::decode(r#"{"type":"DRAW_SEND","body":{"img":"AAAA"}}"#).unwrap();
        match req {
            PlayerRequest::DrawSend(body) => {
                assert_eq!(body.img, "AAAA");
                assert_eq!(body.draw_phase_num, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_reported_separately() {
        let err = PlayerRequest::decode(r#"{"type":"DANCE","body":{}}"#).unwrap_err();
        assert!(matches!(err, FrameError::UnknownEventType(ref t) if t == "DANCE"));
    }

    #[test]
    fn missing_body_is_reported() {
        let err = PlayerRequest::decode(r#"{"type":"ANSWER_SEND"}"#).unwrap_err();
        assert!(matches!(err, FrameError::MissingBody(RequestKind::AnswerSend)));
    }

    #[test]
    fn malformed_body_is_reported() {
        let err = PlayerRequest::decode(r#"{"type":"ODAI_SEND","body":{"odai":12}}"#).unwrap_err();
        assert!(matches!(err, FrameError::Body { kind: RequestKind::OdaiSend, .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = PlayerRequest::decode("not json").unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn encode_matches_decode() {
        let req = PlayerRequest::AnswerSend(AnswerSendBody { answer: "なす".into() });
        let text = req.encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "ANSWER_SEND");
        assert_eq!(value["body"]["answer"], "なす");
        assert_eq!(PlayerRequest::decode(&text).unwrap(), req);
    }
}
