use crate::defaults::LONG_LINE_BOARD_SIZE;

use super::board::Board;
use super::mark::Mark;

/// Number of identical marks in a line needed to win on a board of `size`.
pub fn win_length_for(size: usize) -> usize {
    if size >= LONG_LINE_BOARD_SIZE { 4 } else { 3 }
}

/// Returns the mark owning the first complete line, or `None`.
///
/// Rows and columns are scanned by line index, then by window offset, with
/// the column window checked right after the row window of the same offset.
/// Diagonals are scanned last, by anchor, down-right before down-left.
pub fn detect_winner(board: &Board) -> Option<Mark> {
    let size = board.size();
    let win_count = win_length_for(size);
    if size < win_count {
        return None;
    }
    let cells = board.rows();
    let windows = size - win_count + 1;

    for i in 0..size {
        for j in 0..windows {
            if let Some(mark) = check_line((0..win_count).map(|k| cells[i][j + k])) {
                return Some(mark);
            }
            if let Some(mark) = check_line((0..win_count).map(|k| cells[j + k][i])) {
                return Some(mark);
            }
        }
    }

    for i in 0..windows {
        for j in 0..windows {
            if let Some(mark) = check_line((0..win_count).map(|k| cells[i + k][j + k])) {
                return Some(mark);
            }
            if let Some(mark) =
                check_line((0..win_count).map(|k| cells[i + k][j + win_count - 1 - k]))
            {
                return Some(mark);
            }
        }
    }

    None
}

fn check_line(mut line: impl Iterator<Item = Mark>) -> Option<Mark> {
    let first = line.next()?;
    if first.is_empty() {
        return None;
    }
    line.all(|mark| mark == first).then_some(first)
}
