use std::collections::{HashMap, HashSet};
use std::fmt;

use common::defaults::{BOARD_SIZE_RANGE, clamp_board_size};
use common::protocol::{MatchStateResponse, MatchSummary, MoveResponse, Players};
use common::tictactoe::{Board, Mark, detect_winner};
use common::{DeviceId, MatchId};
use rand::Rng;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::device_registry::DeviceRegistry;
use crate::error::GameError;
use crate::lobby_manager::MatchmakingLobby;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    InProgress,
    Finished { winner: Mark },
    /// Board filled without a line.
    Draw,
}

#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub player_x: DeviceId,
    pub player_o: DeviceId,
    pub board: Board,
    /// Meaningful only while the match is in progress.
    pub turn: DeviceId,
    pub status: MatchStatus,
}

impl Match {
    fn new(id: MatchId, player_x: DeviceId, player_o: DeviceId, size: usize) -> Self {
        Self {
            id,
            turn: player_x.clone(),
            player_x,
            player_o,
            board: Board::new(size),
            status: MatchStatus::InProgress,
        }
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn players(&self) -> Players {
        Players::from([
            (self.player_x.clone(), Mark::X),
            (self.player_o.clone(), Mark::O),
        ])
    }

    pub fn has_player(&self, device_id: &DeviceId) -> bool {
        &self.player_x == device_id || &self.player_o == device_id
    }

    pub fn symbol_of(&self, device_id: &DeviceId) -> Option<Mark> {
        if &self.player_x == device_id {
            Some(Mark::X)
        } else if &self.player_o == device_id {
            Some(Mark::O)
        } else {
            None
        }
    }

    pub fn player_with(&self, mark: Mark) -> Option<&DeviceId> {
        match mark {
            Mark::X => Some(&self.player_x),
            Mark::O => Some(&self.player_o),
            Mark::Empty => None,
        }
    }

    pub fn opponent_of(&self, device_id: &DeviceId) -> Option<&DeviceId> {
        self.symbol_of(device_id)
            .and_then(|mark| mark.opponent())
            .and_then(|mark| self.player_with(mark))
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == MatchStatus::InProgress
    }

    pub fn winner(&self) -> Option<Mark> {
        match self.status {
            MatchStatus::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.status == MatchStatus::Draw
    }

    pub fn current_turn(&self) -> Option<&DeviceId> {
        self.is_in_progress().then_some(&self.turn)
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.id.clone(),
            players: self.players(),
            board_size: self.size(),
        }
    }

    pub fn snapshot(&self) -> MatchStateResponse {
        MatchStateResponse {
            board: self.board.clone(),
            turn: self.current_turn().cloned(),
            winner: self.winner(),
            draw: self.is_draw(),
            size: self.size(),
            players: self.players(),
            // Abandonment is not tracked; devices in a running match are
            // never evicted.
            opponent_left: false,
        }
    }

    fn finish(&mut self, winner: Mark, registry: &mut DeviceRegistry) {
        self.status = MatchStatus::Finished { winner };
        let (winner_id, loser_id) = match winner {
            Mark::O => (&self.player_o, &self.player_x),
            _ => (&self.player_x, &self.player_o),
        };
        record_outcome(registry, winner_id, loser_id);
    }
}

fn record_outcome(registry: &mut DeviceRegistry, winner: &DeviceId, loser: &DeviceId) {
    for (device_id, won) in [(winner, true), (loser, false)] {
        if let Err(err) = registry.record_result(device_id, won) {
            warn!("Could not record result for {}: {}", device_id, err);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchRequestOutcome {
    /// A new pairing, or the device's already running match.
    Paired(MatchSummary),
    Waiting { board_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The match had already ended and was only removed.
    Closed,
    Forfeited { winner: Mark },
}

impl fmt::Display for LeaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveOutcome::Closed => write!(f, "Match finished"),
            LeaveOutcome::Forfeited { winner } => {
                write!(f, "You left the match. {} wins the match.", winner)
            }
        }
    }
}

/// Owns every match. Device data is only reached through the registry passed
/// into each call.
#[derive(Debug, Default)]
pub struct MatchManager {
    matches: HashMap<MatchId, Match>,
}

impl MatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_match<R: Rng + ?Sized>(
        &mut self,
        lobby: &mut MatchmakingLobby,
        device_id: &DeviceId,
        requested_size: Option<i64>,
        now: Instant,
        rng: &mut R,
    ) -> MatchRequestOutcome {
        if let Ok(existing) = self.find_active_match_for(device_id) {
            return MatchRequestOutcome::Paired(existing.summary());
        }

        let board_size = match requested_size {
            Some(size) => clamp_board_size(size),
            None => rng.random_range(BOARD_SIZE_RANGE),
        };

        let Some(opponent) = lobby.find_opponent(device_id, board_size) else {
            lobby.enqueue(device_id, board_size, now);
            info!(
                "Device {} queued for {}x{}, {} waiting",
                device_id,
                board_size,
                board_size,
                lobby.len()
            );
            return MatchRequestOutcome::Waiting { board_size };
        };

        lobby.remove(&opponent);
        lobby.remove(device_id);

        let (player_x, player_o) = if rng.random_bool(0.5) {
            (device_id.clone(), opponent)
        } else {
            (opponent, device_id.clone())
        };

        let mut match_id = MatchId::generate();
        while self.matches.contains_key(&match_id) {
            match_id = MatchId::generate();
        }

        let game = Match::new(match_id.clone(), player_x, player_o, board_size);
        info!(
            "Match {} created: {} (X) vs {} (O) on {}x{}",
            match_id, game.player_x, game.player_o, board_size, board_size
        );
        let summary = game.summary();
        self.matches.insert(match_id, game);
        MatchRequestOutcome::Paired(summary)
    }

    pub fn make_move(
        &mut self,
        registry: &mut DeviceRegistry,
        match_id: &MatchId,
        device_id: &DeviceId,
        x: i64,
        y: i64,
        now: Instant,
    ) -> Result<MoveResponse, GameError> {
        let game = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| GameError::MatchNotFound(match_id.clone()))?;

        if !game.is_in_progress() {
            return Err(GameError::AlreadyFinished);
        }
        if &game.turn != device_id {
            return Err(GameError::InvalidTurn);
        }

        let size = game.size();
        let (Ok(row), Ok(col)) = (usize::try_from(x), usize::try_from(y)) else {
            return Err(GameError::OutOfBounds { x, y, size });
        };
        let mark = game.symbol_of(device_id).ok_or(GameError::Forbidden)?;

        game.board.apply_move(row, col, mark)?;
        registry.touch(device_id, now);

        if let Some(winner) = detect_winner(&game.board) {
            info!("Match {} won by {} ({})", match_id, device_id, winner);
            game.finish(winner, registry);
        } else if game.board.is_full() {
            info!("Match {} ended in a draw", match_id);
            game.status = MatchStatus::Draw;
        } else if let Some(next) = game.opponent_of(device_id).cloned() {
            game.turn = next;
        }

        Ok(MoveResponse {
            board: game.board.clone(),
            next_turn: game.current_turn().cloned(),
            winner: game.winner(),
            draw: game.is_draw(),
        })
    }

    /// Removes the match. Leaving a running match forfeits it to the opponent.
    pub fn leave(
        &mut self,
        registry: &mut DeviceRegistry,
        match_id: &MatchId,
        device_id: &DeviceId,
        now: Instant,
    ) -> Result<LeaveOutcome, GameError> {
        let game = self
            .matches
            .get(match_id)
            .ok_or_else(|| GameError::MatchNotFound(match_id.clone()))?;

        let Some(opponent) = game.opponent_of(device_id).cloned() else {
            return Err(GameError::Forbidden);
        };
        let outcome = match game.symbol_of(&opponent) {
            Some(winner) if game.is_in_progress() => LeaveOutcome::Forfeited { winner },
            _ => LeaveOutcome::Closed,
        };

        registry.touch(device_id, now);
        if let LeaveOutcome::Forfeited { winner } = outcome {
            info!("Device {} left match {}, {} wins", device_id, match_id, winner);
            record_outcome(registry, &opponent, device_id);
        } else {
            info!("Closed finished match {}", match_id);
        }

        self.matches.remove(match_id);
        Ok(outcome)
    }

    /// Concedes a running match. The match stays queryable as finished.
    pub fn surrender(
        &mut self,
        registry: &mut DeviceRegistry,
        match_id: &MatchId,
        device_id: &DeviceId,
        now: Instant,
    ) -> Result<Mark, GameError> {
        let game = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| GameError::MatchNotFound(match_id.clone()))?;

        let winner = game
            .symbol_of(device_id)
            .and_then(|mark| mark.opponent())
            .ok_or(GameError::Forbidden)?;
        if !game.is_in_progress() {
            return Err(GameError::AlreadyFinished);
        }

        registry.touch(device_id, now);
        info!("Device {} surrendered match {}, {} wins", device_id, match_id, winner);
        game.finish(winner, registry);
        Ok(winner)
    }

    pub fn get_state(&self, match_id: &MatchId) -> Result<MatchStateResponse, GameError> {
        self.matches
            .get(match_id)
            .map(Match::snapshot)
            .ok_or_else(|| GameError::MatchNotFound(match_id.clone()))
    }

    pub fn find_active_match_for(&self, device_id: &DeviceId) -> Result<&Match, GameError> {
        self.matches
            .values()
            .find(|game| game.is_in_progress() && game.has_player(device_id))
            .ok_or_else(|| GameError::NoActiveMatch(device_id.clone()))
    }

    /// Devices taking part in a match that is still running.
    pub fn active_players(&self) -> HashSet<DeviceId> {
        self.matches
            .values()
            .filter(|game| game.is_in_progress())
            .flat_map(|game| [game.player_x.clone(), game.player_o.clone()])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
