pub mod model;
pub mod request;
pub mod response;

pub use model::*;
pub use request::*;
pub use response::*;

use serde::{de::DeserializeOwned, Serialize};
use tokio_tungstenite::tungstenite::Message;

/// Frames travel as JSON text: `{"type": EVENT, "body": {...}}`.
pub trait JsonMessage: Serialize + DeserializeOwned {
    fn deser(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn ser(&self) -> Result<Message, serde_json::Error> {
        let text = serde_json::to_string(self)?;
        Ok(Message::Text(text))
    }
}
