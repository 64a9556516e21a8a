use protocol::FrameError;

use crate::canvas::CompositeError;

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("operation not allowed in the current phase")]
    WrongPhase,
    #[error("only the host may do that")]
    Unauthorized,
    #[error("not enough members")]
    NotEnoughMembers,
    #[error("already exists")]
    AlreadyExists,
    #[error("failed to decode: {0}")]
    Decode(String),
    #[error("not found")]
    NotFound,
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("invalid draw count")]
    InvalidDrawCount,
    #[error("room is full")]
    RoomFull,
    #[error(transparent)]
    Image(#[from] CompositeError),
    #[error("room is closed")]
    Closed,
}

impl From<FrameError> for ErrorKind {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::UnknownEventType(kind) => ErrorKind::UnknownEventType(kind),
            other => ErrorKind::Decode(other.to_string()),
        }
    }
}

pub type RoomResult<T> = Result<T, ErrorKind>;
