use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
pub use tokio_tungstenite::tungstenite::Message as WsMsg;

pub use protocol::ParticipantId;

pub type WsStream = WebSocketStream<TcpStream>;
pub type RoomId = String;
