pub mod consts;
pub mod types;
pub mod error;

pub mod canvas;
pub mod scheduler;
pub mod registry;
pub mod player;
pub mod room;
pub mod store;
pub mod server;

pub use error::{ErrorKind, RoomResult};
pub use registry::ConnectionRegistry;
pub use store::{RoomHandle, RoomStore};
