pub mod config;
pub mod defaults;
pub mod identifiers;
pub mod logger;
pub mod protocol;
pub mod tictactoe;

pub use identifiers::*;
