use std::ops::RangeInclusive;

pub const MIN_BOARD_SIZE: usize = 3;
pub const MAX_BOARD_SIZE: usize = 7;
pub const BOARD_SIZE_RANGE: RangeInclusive<usize> = MIN_BOARD_SIZE..=MAX_BOARD_SIZE;

/// Boards at least this wide need four in a row instead of three.
pub const LONG_LINE_BOARD_SIZE: usize = 5;

pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ALIAS_PREFIX_LEN: usize = 8;

/// Clamps a requested board size into the supported range.
pub fn clamp_board_size(size: i64) -> usize {
    size.clamp(MIN_BOARD_SIZE as i64, MAX_BOARD_SIZE as i64) as usize
}
