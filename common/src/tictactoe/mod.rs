mod board;
mod mark;
mod win_detector;

pub use board::{Board, MoveError, NotSquare};
pub use mark::Mark;
pub use win_detector::{detect_winner, win_length_for};
