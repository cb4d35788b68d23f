use std::sync::Arc;
use std::time::Duration;

use common::protocol::{
    CreateMatchRequest, DeviceInfoResponse, DeviceListResponse, MatchStateResponse, MatchSummary,
    MessageResponse, MoveRequest, MoveResponse, PlayerActionRequest, RegisterDeviceRequest,
    RegisterDeviceResponse, ResetStatsResponse,
};
use common::{DeviceId, MatchId};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::device_registry::DeviceRegistry;
use crate::error::GameError;
use crate::lobby_manager::MatchmakingLobby;
use crate::match_manager::{MatchManager, MatchRequestOutcome};
use crate::session_sweeper::SessionSweeper;

/// Entry point for every device request.
///
/// The registry, lobby and match table each sit behind their own lock. An
/// operation takes the locks it needs in the order registry, lobby, matches
/// and keeps them until it returns, so concurrent requests touching the same
/// store are applied one after another.
#[derive(Debug, Clone)]
pub struct GameService {
    registry: Arc<Mutex<DeviceRegistry>>,
    lobby: Arc<Mutex<MatchmakingLobby>>,
    matches: Arc<Mutex<MatchManager>>,
    sweeper: SessionSweeper,
}

struct Stores<'a> {
    registry: MutexGuard<'a, DeviceRegistry>,
    lobby: MutexGuard<'a, MatchmakingLobby>,
    matches: MutexGuard<'a, MatchManager>,
}

impl GameService {
    pub fn new(inactivity_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(DeviceRegistry::new())),
            lobby: Arc::new(Mutex::new(MatchmakingLobby::new())),
            matches: Arc::new(Mutex::new(MatchManager::new())),
            sweeper: SessionSweeper::new(inactivity_timeout),
        }
    }

    async fn lock_all(&self) -> Stores<'_> {
        let registry = self.registry.lock().await;
        let lobby = self.lobby.lock().await;
        let matches = self.matches.lock().await;
        Stores {
            registry,
            lobby,
            matches,
        }
    }

    /// Locks everything and evicts idle devices first.
    async fn lock_swept(&self) -> Stores<'_> {
        let mut stores = self.lock_all().await;
        let Stores {
            registry,
            lobby,
            matches,
        } = &mut stores;
        self.sweeper.sweep(registry, lobby, matches, Instant::now());
        stores
    }

    pub async fn sweep(&self) -> Vec<DeviceId> {
        let mut stores = self.lock_all().await;
        let Stores {
            registry,
            lobby,
            matches,
        } = &mut stores;
        self.sweeper.sweep(registry, lobby, matches, Instant::now())
    }

    pub async fn is_registered(&self, device_id: &DeviceId) -> bool {
        self.registry.lock().await.contains(device_id)
    }

    pub async fn register_device(&self, request: RegisterDeviceRequest) -> RegisterDeviceResponse {
        let alias = request.alias.filter(|alias| !alias.trim().is_empty());
        let device_id = self.registry.lock().await.register(alias, Instant::now());
        RegisterDeviceResponse { device_id }
    }

    pub async fn list_devices(&self) -> DeviceListResponse {
        let stores = self.lock_swept().await;
        DeviceListResponse {
            connected_devices: stores.registry.live_devices(),
        }
    }

    pub async fn device_info(&self, device_id: &DeviceId) -> Result<DeviceInfoResponse, GameError> {
        let stores = self.lock_swept().await;
        let device = stores.registry.get(device_id)?;
        Ok(DeviceInfoResponse {
            connected: true,
            alias: device.alias.clone(),
            wins: device.wins,
            losses: device.losses,
            ratio: device.ratio(),
        })
    }

    pub async fn reset_stats(&self, device_id: &DeviceId) -> Result<ResetStatsResponse, GameError> {
        let mut stores = self.lock_swept().await;
        let device = stores.registry.reset_stats(device_id)?;
        let (wins, losses) = (device.wins, device.losses);
        stores.registry.touch(device_id, Instant::now());
        Ok(ResetStatsResponse {
            message: "Stats reset".to_string(),
            wins,
            losses,
        })
    }

    /// The running match of a device, used to reconnect to it.
    pub async fn active_match(&self, device_id: &DeviceId) -> Result<MatchSummary, GameError> {
        let stores = self.lock_swept().await;
        stores.registry.get(device_id)?;
        stores
            .matches
            .find_active_match_for(device_id)
            .map(|game| game.summary())
    }

    pub async fn request_match(
        &self,
        request: CreateMatchRequest,
    ) -> Result<MatchRequestOutcome, GameError> {
        let (device_id, size) = request.into_parts()?;
        let mut stores = self.lock_swept().await;
        if !stores.registry.contains(&device_id) {
            return Err(GameError::DeviceNotFound(device_id));
        }

        let now = Instant::now();
        let Stores {
            registry,
            lobby,
            matches,
        } = &mut stores;
        let outcome = matches.request_match(lobby, &device_id, size, now, &mut rand::rng());

        match &outcome {
            MatchRequestOutcome::Paired(summary) => {
                for player in summary.players.keys() {
                    registry.touch(player, now);
                }
            }
            MatchRequestOutcome::Waiting { .. } => registry.touch(&device_id, now),
        }
        Ok(outcome)
    }

    pub async fn make_move(
        &self,
        match_id: &MatchId,
        request: MoveRequest,
    ) -> Result<MoveResponse, GameError> {
        let (device_id, x, y) = request.into_parts()?;
        let mut registry = self.registry.lock().await;
        let mut matches = self.matches.lock().await;
        matches.make_move(&mut registry, match_id, &device_id, x, y, Instant::now())
    }

    pub async fn match_state(&self, match_id: &MatchId) -> Result<MatchStateResponse, GameError> {
        self.matches.lock().await.get_state(match_id)
    }

    pub async fn leave_match(
        &self,
        match_id: &MatchId,
        request: PlayerActionRequest,
    ) -> Result<MessageResponse, GameError> {
        let device_id = request.into_device_id()?;
        let mut registry = self.registry.lock().await;
        let mut matches = self.matches.lock().await;
        let outcome = matches.leave(&mut registry, match_id, &device_id, Instant::now())?;
        Ok(MessageResponse::new(outcome.to_string()))
    }

    pub async fn surrender(
        &self,
        match_id: &MatchId,
        request: PlayerActionRequest,
    ) -> Result<MessageResponse, GameError> {
        let device_id = request.into_device_id()?;
        let mut registry = self.registry.lock().await;
        let mut matches = self.matches.lock().await;
        let winner = matches.surrender(&mut registry, match_id, &device_id, Instant::now())?;
        Ok(MessageResponse::new(format!(
            "You surrendered. {} wins the match.",
            winner
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::Players;
    use common::tictactoe::Mark;

    const TIMEOUT: Duration = Duration::from_secs(300);

    async fn register(service: &GameService, alias: Option<&str>) -> DeviceId {
        service
            .register_device(RegisterDeviceRequest {
                alias: alias.map(str::to_string),
            })
            .await
            .device_id
    }

    async fn request(
        service: &GameService,
        device_id: &DeviceId,
        size: Option<i64>,
    ) -> Result<MatchRequestOutcome, GameError> {
        service
            .request_match(CreateMatchRequest {
                device_id: Some(device_id.clone()),
                size,
            })
            .await
    }

    async fn play(
        service: &GameService,
        match_id: &MatchId,
        device_id: &DeviceId,
        x: i64,
        y: i64,
    ) -> Result<MoveResponse, GameError> {
        service
            .make_move(
                match_id,
                MoveRequest {
                    device_id: Some(device_id.clone()),
                    x: Some(x),
                    y: Some(y),
                },
            )
            .await
    }

    fn action(device_id: &DeviceId) -> PlayerActionRequest {
        PlayerActionRequest {
            device_id: Some(device_id.clone()),
        }
    }

    fn player_with(players: &Players, mark: Mark) -> DeviceId {
        players
            .iter()
            .find(|(_, symbol)| **symbol == mark)
            .map(|(id, _)| id.clone())
            .unwrap()
    }

    /// Registers two devices and pairs them; returns (match, X holder, O holder).
    async fn start_match(service: &GameService, size: i64) -> (MatchId, DeviceId, DeviceId) {
        let a = register(service, Some("A")).await;
        let b = register(service, Some("B")).await;
        let waiting = request(service, &a, Some(size)).await.unwrap();
        assert_eq!(waiting, MatchRequestOutcome::Waiting { board_size: size as usize });
        let MatchRequestOutcome::Paired(summary) = request(service, &b, Some(size)).await.unwrap()
        else {
            panic!("expected a pairing");
        };
        let x = player_with(&summary.players, Mark::X);
        let o = player_with(&summary.players, Mark::O);
        (summary.match_id, x, o)
    }

    #[tokio::test]
    async fn test_registered_devices_are_listed() {
        let service = GameService::new(TIMEOUT);

        let a = register(&service, Some("A")).await;
        let b = register(&service, None).await;

        assert_ne!(a, b);
        let listed = service.list_devices().await.connected_devices;
        assert!(listed.contains(&a));
        assert!(listed.contains(&b));
    }

    #[tokio::test]
    async fn test_device_info_of_new_device() {
        let service = GameService::new(TIMEOUT);
        let id = register(&service, None).await;

        let info = service.device_info(&id).await.unwrap();

        assert!(info.connected);
        assert_eq!(info.alias, id.short());
        assert_eq!((info.wins, info.losses), (0, 0));
        assert_eq!(info.ratio, 0.0);
    }

    #[tokio::test]
    async fn test_blank_alias_falls_back_to_handle_prefix() {
        let service = GameService::new(TIMEOUT);
        let id = register(&service, Some("  ")).await;

        assert_eq!(service.device_info(&id).await.unwrap().alias, id.short());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_device_disappears_on_next_read() {
        let service = GameService::new(TIMEOUT);
        let idle = register(&service, None).await;
        tokio::time::advance(Duration::from_secs(200)).await;
        let active = register(&service, None).await;

        tokio::time::advance(Duration::from_secs(101)).await;

        let listed = service.list_devices().await.connected_devices;
        assert_eq!(listed, vec![active.clone()]);
        assert_eq!(
            service.device_info(&idle).await,
            Err(GameError::DeviceNotFound(idle.clone()))
        );
        assert!(service.device_info(&active).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_device_leaves_the_lobby() {
        let service = GameService::new(TIMEOUT);
        let idle = register(&service, None).await;
        request(&service, &idle, Some(3)).await.unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        let newcomer = register(&service, None).await;
        let outcome = request(&service, &newcomer, Some(3)).await.unwrap();

        assert_eq!(outcome, MatchRequestOutcome::Waiting { board_size: 3 });
        assert!(!service.is_registered(&idle).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_refreshes_activity() {
        let service = GameService::new(TIMEOUT);
        let id = register(&service, None).await;
        tokio::time::advance(Duration::from_secs(250)).await;
        request(&service, &id, Some(3)).await.unwrap();

        tokio::time::advance(Duration::from_secs(250)).await;

        assert!(service.device_info(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_request_match_validation() {
        let service = GameService::new(TIMEOUT);

        let missing_field = service.request_match(CreateMatchRequest::default()).await;
        let unknown_device = request(&service, &DeviceId::from("ghost"), Some(3)).await;

        assert!(matches!(missing_field, Err(GameError::BadRequest(_))));
        assert_eq!(
            unknown_device,
            Err(GameError::DeviceNotFound(DeviceId::from("ghost")))
        );
    }

    #[tokio::test]
    async fn test_request_match_is_idempotent() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 3).await;

        for device in [&x, &o, &x] {
            let MatchRequestOutcome::Paired(summary) = request(&service, device, None).await.unwrap()
            else {
                panic!("expected the running match");
            };
            assert_eq!(summary.match_id, match_id);
        }
        assert_eq!(service.active_match(&x).await.unwrap().match_id, match_id);
    }

    #[tokio::test]
    async fn test_pairing_sets_x_as_first_turn() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 6).await;

        let state = service.match_state(&match_id).await.unwrap();

        assert_eq!(state.size, 6);
        assert_eq!(state.turn, Some(x.clone()));
        assert_eq!(state.players[&x], Mark::X);
        assert_eq!(state.players[&o], Mark::O);
        assert!(!state.opponent_left);
    }

    #[tokio::test]
    async fn test_move_rejections() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 3).await;

        assert_eq!(play(&service, &match_id, &o, 0, 0).await, Err(GameError::InvalidTurn));
        assert!(matches!(
            play(&service, &match_id, &x, 0, 5).await,
            Err(GameError::OutOfBounds { .. })
        ));
        play(&service, &match_id, &x, 0, 0).await.unwrap();
        assert_eq!(
            play(&service, &match_id, &o, 0, 0).await,
            Err(GameError::CellOccupied { x: 0, y: 0 })
        );

        let missing = MatchId::from("missing");
        assert_eq!(
            play(&service, &missing, &o, 1, 1).await,
            Err(GameError::MatchNotFound(missing.clone()))
        );
        let incomplete = service
            .make_move(
                &match_id,
                MoveRequest {
                    device_id: Some(o.clone()),
                    x: Some(1),
                    y: None,
                },
            )
            .await;
        assert!(matches!(incomplete, Err(GameError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_full_game_x_wins() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 3).await;
        let moves = [(&x, 0, 0), (&o, 1, 0), (&x, 0, 1), (&o, 1, 1), (&x, 0, 2)];

        let mut last = None;
        for (device, row, col) in moves {
            last = Some(play(&service, &match_id, device, row, col).await.unwrap());
        }

        let last = last.unwrap();
        assert_eq!(last.winner, Some(Mark::X));
        assert_eq!(last.next_turn, None);

        let state = service.match_state(&match_id).await.unwrap();
        assert_eq!(state.winner, Some(Mark::X));

        let x_info = service.device_info(&x).await.unwrap();
        assert_eq!((x_info.wins, x_info.losses), (1, 0));
        assert_eq!(x_info.ratio, 1.0);
        let o_info = service.device_info(&o).await.unwrap();
        assert_eq!((o_info.wins, o_info.losses), (0, 1));
        assert_eq!(o_info.ratio, 0.0);

        assert!(matches!(
            service.active_match(&x).await,
            Err(GameError::NoActiveMatch(_))
        ));
    }

    #[tokio::test]
    async fn test_leave_removes_match_and_awards_opponent() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 3).await;
        play(&service, &match_id, &x, 1, 1).await.unwrap();

        let response = service.leave_match(&match_id, action(&o)).await.unwrap();

        assert!(response.message.contains("X wins"));
        assert_eq!(
            service.match_state(&match_id).await,
            Err(GameError::MatchNotFound(match_id.clone()))
        );
        assert_eq!(service.device_info(&x).await.unwrap().wins, 1);
        assert_eq!(service.device_info(&o).await.unwrap().losses, 1);
        assert_eq!(
            service.leave_match(&match_id, action(&o)).await.unwrap_err(),
            GameError::MatchNotFound(match_id.clone())
        );
    }

    #[tokio::test]
    async fn test_leave_and_surrender_require_membership() {
        let service = GameService::new(TIMEOUT);
        let (match_id, _, _) = start_match(&service, 3).await;
        let stranger = register(&service, None).await;

        assert_eq!(
            service.leave_match(&match_id, action(&stranger)).await.unwrap_err(),
            GameError::Forbidden
        );
        assert_eq!(
            service.surrender(&match_id, action(&stranger)).await.unwrap_err(),
            GameError::Forbidden
        );
        assert!(matches!(
            service.surrender(&match_id, PlayerActionRequest::default()).await,
            Err(GameError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_surrender_keeps_match() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 5).await;

        let response = service.surrender(&match_id, action(&x)).await.unwrap();

        assert!(response.message.contains("O wins"));
        let state = service.match_state(&match_id).await.unwrap();
        assert_eq!(state.winner, Some(Mark::O));
        assert_eq!(state.turn, None);
        assert_eq!(service.device_info(&o).await.unwrap().wins, 1);
        assert_eq!(
            service.surrender(&match_id, action(&o)).await.unwrap_err(),
            GameError::AlreadyFinished
        );
        assert_eq!(
            play(&service, &match_id, &x, 0, 0).await,
            Err(GameError::AlreadyFinished)
        );

        let closed = service.leave_match(&match_id, action(&o)).await.unwrap();
        assert_eq!(closed.message, "Match finished");
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, _) = start_match(&service, 3).await;
        service.surrender(&match_id, action(&x)).await.unwrap();

        let reset = service.reset_stats(&x).await.unwrap();

        assert_eq!((reset.wins, reset.losses), (0, 0));
        let info = service.device_info(&x).await.unwrap();
        assert_eq!((info.wins, info.losses), (0, 0));
        assert!(matches!(
            service.reset_stats(&DeviceId::from("ghost")).await,
            Err(GameError::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_active_match_lookup() {
        let service = GameService::new(TIMEOUT);
        let idle = register(&service, None).await;

        assert_eq!(
            service.active_match(&idle).await,
            Err(GameError::NoActiveMatch(idle.clone()))
        );
        assert!(matches!(
            service.active_match(&DeviceId::from("ghost")).await,
            Err(GameError::DeviceNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_pair_exactly_once() {
        let service = GameService::new(TIMEOUT);
        let mut devices = Vec::new();
        for _ in 0..8 {
            devices.push(register(&service, None).await);
        }

        let handles: Vec<_> = devices
            .iter()
            .cloned()
            .map(|device_id| {
                let service = service.clone();
                tokio::spawn(async move { request(&service, &device_id, Some(4)).await })
            })
            .collect();

        let mut match_ids = Vec::new();
        for handle in handles {
            if let MatchRequestOutcome::Paired(summary) = handle.await.unwrap().unwrap() {
                match_ids.push(summary.match_id);
            }
        }

        assert_eq!(match_ids.len(), 4);
        for device in &devices {
            assert!(service.active_match(device).await.is_ok());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_moves_on_same_cell_apply_once() {
        let service = GameService::new(TIMEOUT);
        let (match_id, x, o) = start_match(&service, 3).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                let match_id = match_id.clone();
                let x = x.clone();
                tokio::spawn(async move { play(&service, &match_id, &x, 1, 1).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(err) => assert_eq!(err, GameError::InvalidTurn),
            }
        }

        assert_eq!(applied, 1);
        let state = service.match_state(&match_id).await.unwrap();
        assert_eq!(state.board.filled_cells(), 1);
        assert_eq!(state.board.get(1, 1), Some(Mark::X));
        assert_eq!(state.turn, Some(o));
    }
}
