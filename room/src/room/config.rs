
use protocol::{RoomSetOptionBody, RoomUpdateOptionBody};

use crate::consts::*;
use crate::error::{ErrorKind, RoomResult};

/// Board layouts a room can pick. Rounds per game equal the area count.
pub const BOARDS: [(&str, usize); 5] = [("2x2", 4), ("2x3", 6), ("3x3", 9), ("4x4", 16), ("5x5", 25)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    pub board_name: String,
    pub all_area: usize,
}

impl Canvas {
    pub fn by_name(name: &str) -> Option<Self> {
        BOARDS
            .iter()
            .find(|(board, _)| *board == name)
            .map(|(board, area)| Canvas { board_name: board.to_string(), all_area: *area })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        let (board, area) = BOARDS[0];
        Canvas { board_name: board.to_string(), all_area: area }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub time_limit: u64,
    pub canvas: Canvas,
}

impl Config {
    pub fn new() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            canvas: Canvas::default(),
        }
    }

    /// All-or-nothing: a bad field leaves the config untouched.
    pub fn apply(&mut self, body: RoomSetOptionBody) -> RoomResult<()> {
        let time_limit = match body.time_limit {
            Some(secs) if TIME_LIMIT_RANGE.contains(&secs) => secs,
            Some(secs) => {
                return Err(ErrorKind::Decode(format!(
                    "time limit {}s is outside {}..={}",
                    secs,
                    TIME_LIMIT_RANGE.start(),
                    TIME_LIMIT_RANGE.end()
                )))
            }
            None => self.time_limit,
        };
        let canvas = match body.board_name {
            Some(name) => Canvas::by_name(&name).ok_or(ErrorKind::NotFound)?,
            None => self.canvas.clone(),
        };
        self.time_limit = time_limit;
        self.canvas = canvas;
        Ok(())
    }

    pub fn to_body(&self) -> RoomUpdateOptionBody {
        RoomUpdateOptionBody {
            time_limit: self.time_limit,
            board_name: self.canvas.board_name.clone(),
            all_area: self.canvas.all_area,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new();
        assert_eq!(config.time_limit, 60);
        assert_eq!(config.canvas.board_name, "2x2");
        assert_eq!(config.canvas.all_area, 4);
    }

    #[test]
    fn apply_partial_update() {
        let mut config = Config::new();
        config
            .apply(RoomSetOptionBody { time_limit: None, board_name: Some("3x3".into()) })
            .unwrap();
        assert_eq!(config.time_limit, 60);
        assert_eq!(config.canvas.all_area, 9);

        config
            .apply(RoomSetOptionBody { time_limit: Some(120), board_name: None })
            .unwrap();
        assert_eq!(config.time_limit, 120);
        assert_eq!(config.canvas.board_name, "3x3");
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let mut config = Config::new();
        let err = config
            .apply(RoomSetOptionBody { time_limit: Some(90), board_name: Some("9x9".into()) })
            .unwrap_err();
        assert!(matches!(err, ErrorKind::NotFound));
        assert_eq!(config, Config::new());

        assert!(config
            .apply(RoomSetOptionBody { time_limit: Some(5), board_name: None })
            .is_err());
        assert_eq!(config.time_limit, 60);
    }

    #[test]
    fn every_board_is_reachable() {
        for (name, area) in BOARDS {
            assert_eq!(Canvas::by_name(name).unwrap().all_area, area);
        }
        assert!(Canvas::by_name("1x1").is_none());
    }
}
