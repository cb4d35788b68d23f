//! Session backend for N-in-a-row matches between anonymous devices.

pub mod cleanup_task;
pub mod device_registry;
pub mod error;
pub mod game_service;
pub mod lobby_manager;
pub mod match_manager;
pub mod server_config;
pub mod session_sweeper;
pub mod web_server;

pub use error::{GameError, GameErrorKind, ServerError};
pub use game_service::GameService;
