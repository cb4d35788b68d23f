use common::config::ConfigError;
use common::protocol::MissingField;
use common::tictactoe::MoveError;
use common::{DeviceId, MatchId};
use thiserror::Error;

/// Rejection of a single request. None of these are transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("device {0} has no active match")]
    NoActiveMatch(DeviceId),
    #[error("device is not a player of this match")]
    Forbidden,
    #[error("not your turn")]
    InvalidTurn,
    #[error("position ({x}, {y}) is outside the {size}x{size} board")]
    OutOfBounds { x: i64, y: i64, size: usize },
    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: usize, y: usize },
    #[error("match has already finished")]
    AlreadyFinished,
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameErrorKind {
    NotFound,
    Forbidden,
    InvalidTurn,
    OutOfBounds,
    CellOccupied,
    AlreadyFinished,
    BadRequest,
}

impl GameError {
    pub fn kind(&self) -> GameErrorKind {
        match self {
            GameError::DeviceNotFound(_)
            | GameError::MatchNotFound(_)
            | GameError::NoActiveMatch(_) => GameErrorKind::NotFound,
            GameError::Forbidden => GameErrorKind::Forbidden,
            GameError::InvalidTurn => GameErrorKind::InvalidTurn,
            GameError::OutOfBounds { .. } => GameErrorKind::OutOfBounds,
            GameError::CellOccupied { .. } => GameErrorKind::CellOccupied,
            GameError::AlreadyFinished => GameErrorKind::AlreadyFinished,
            GameError::BadRequest(_) => GameErrorKind::BadRequest,
        }
    }
}

impl From<MoveError> for GameError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::OutOfBounds { x, y, size } => GameError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                size,
            },
            MoveError::CellOccupied { x, y } => GameError::CellOccupied { x, y },
        }
    }
}

impl From<MissingField> for GameError {
    fn from(err: MissingField) -> Self {
        GameError::BadRequest(err.to_string())
    }
}

/// Failures of process startup and the HTTP listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid bind address {address}: {source}")]
    BadAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("web server error: {0}")]
    Serve(#[source] std::io::Error),
}
