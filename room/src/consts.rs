use std::ops::RangeInclusive;
use tokio::time::Duration;

/// Largest inbound frame; a full-size canvas fragment fits.
pub const MAX_MESSAGE_SIZE: usize = 300_000;
pub const OUTBOUND_QUEUE: usize = 256;
pub const ROOM_QUEUE: usize = 64;

pub const PONG_WAIT: Duration = Duration::from_secs(60);
pub const HB_DURATION: Duration = Duration::from_secs(54);
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

pub const BREAK_AFTER: Duration = Duration::from_secs(15 * 60);
/// Slack added to every phase deadline before the server forces the transition.
pub const SUBMIT_GRACE: Duration = Duration::from_secs(3);

pub const DEFAULT_TIME_LIMIT: u64 = 60;
pub const TIME_LIMIT_RANGE: RangeInclusive<u64> = 10..=300;

pub const MIN_MEMBERS: usize = 2;
pub const MAX_CAPACITY: usize = 15;

pub const ROOM_ID_LEN: usize = 10;
pub const WS_PATH: &str = "/ws";
pub const WELCOME: &str = "welcome to nascalay";
