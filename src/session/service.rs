//! Session service - connection registration and arena assignment

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::{ArenaHandle, ArenaRegistry, GameArena, KillLog, PlayerInput};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Player connection handle for routing messages
#[derive(Clone)]
pub struct PlayerConnection {
    pub user_id: Uuid,
    /// Channel to send inputs toward the player's current arena
    pub input_tx: mpsc::Sender<PlayerInput>,
    /// Fan-out of arena broadcasts toward this player's socket
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
}

/// Session service: owns the connection table and assigns arenas
pub struct SessionService {
    registry: Arc<ArenaRegistry>,
    kill_log: Arc<KillLog>,
    /// Connected players, in an arena or not yet joined
    players: Arc<DashMap<Uuid, PlayerConnection>>,
    /// Map of player -> current arena
    player_arenas: Arc<DashMap<Uuid, Uuid>>,
    arena_max_players: usize,
    respawn_delay: f32,
}

impl SessionService {
    pub fn new(
        registry: Arc<ArenaRegistry>,
        kill_log: Arc<KillLog>,
        arena_max_players: usize,
        respawn_delay: f32,
    ) -> Self {
        Self {
            registry,
            kill_log,
            players: Arc::new(DashMap::new()),
            player_arenas: Arc::new(DashMap::new()),
            arena_max_players,
            respawn_delay,
        }
    }

    /// Register a player connection (called when WebSocket connects).
    /// Returns channels for communication.
    pub async fn register_player(
        &self,
        user_id: Uuid,
    ) -> (mpsc::Sender<PlayerInput>, broadcast::Receiver<ServerMsg>) {
        // Personal channels for this player
        let (input_tx, mut input_rx) = mpsc::channel::<PlayerInput>(64);
        let (snapshot_tx, snapshot_rx) = broadcast::channel::<ServerMsg>(64);

        let connection = PlayerConnection {
            user_id,
            input_tx: input_tx.clone(),
            snapshot_tx: snapshot_tx.clone(),
        };
        self.players.insert(user_id, connection);

        // Route inputs from the personal channel into whichever arena
        // currently owns the player
        let registry = self.registry.clone();
        let player_arenas = self.player_arenas.clone();
        let players_for_input = self.players.clone();

        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                let arena_id = player_arenas.get(&user_id).map(|r| *r);
                if let Some(arena_id) = arena_id {
                    if let Some(handle) = registry.get(&arena_id) {
                        if handle.input_tx.send(input).await.is_err() {
                            warn!(user_id = %user_id, "Failed to forward input to arena");
                        }
                    }
                }
            }
            // Cleanup when the socket side drops its sender
            players_for_input.remove(&user_id);
        });

        // Route arena broadcasts back to the player
        let snapshot_tx_clone = snapshot_tx.clone();
        let player_arenas_clone = self.player_arenas.clone();
        let registry_clone = self.registry.clone();
        let players_for_snapshot = self.players.clone();

        tokio::spawn(async move {
            let mut current_arena_rx: Option<broadcast::Receiver<ServerMsg>> = None;
            let mut current_arena_id: Option<Uuid> = None;

            loop {
                // Re-subscribe whenever the player's arena changed
                let new_arena_id = player_arenas_clone.get(&user_id).map(|r| *r);
                if new_arena_id != current_arena_id {
                    current_arena_id = new_arena_id;
                    current_arena_rx = new_arena_id.and_then(|aid| {
                        registry_clone.get(&aid).map(|h| h.broadcast_tx.subscribe())
                    });
                }

                if let Some(ref mut rx) = current_arena_rx {
                    match rx.recv().await {
                        Ok(msg) => {
                            let _ = snapshot_tx_clone.send(msg);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(user_id = %user_id, lagged = n, "Snapshot receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            current_arena_rx = None;
                            current_arena_id = None;
                        }
                    }
                } else {
                    // Not in an arena, poll for assignment
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }

                if !players_for_snapshot.contains_key(&user_id) {
                    break;
                }
            }
        });

        (input_tx, snapshot_rx)
    }

    /// Unregister a player (called when WebSocket disconnects)
    pub async fn unregister_player(&self, user_id: Uuid) {
        let arena_id = self.player_arenas.get(&user_id).map(|r| *r);
        if let Some(arena_id) = arena_id {
            if let Some(handle) = self.registry.get(&arena_id) {
                let leave = PlayerInput {
                    user_id,
                    msg: ClientMsg::LeaveArena,
                    received_at: unix_millis(),
                };
                if handle.input_tx.send(leave).await.is_err() {
                    warn!(user_id = %user_id, "Arena already gone during disconnect");
                }
            }
        }

        self.player_arenas.remove(&user_id);
        self.players.remove(&user_id);
        info!(user_id = %user_id, "Player session closed");
    }

    /// Assign the player to an arena and forward the join command.
    /// Routing order: the specifically requested arena, then any arena
    /// with room, otherwise a fresh one.
    pub async fn join_arena(&self, user_id: Uuid, msg: ClientMsg) -> Result<Uuid, String> {
        let requested = match &msg {
            ClientMsg::JoinArena { arena_id, .. } => *arena_id,
            _ => return Err("not a join message".to_string()),
        };

        let handle = match requested.and_then(|id| self.registry.get(&id)) {
            Some(handle) if handle.player_count() < self.arena_max_players => handle,
            Some(_) => {
                self.notify_error(user_id, "arena_full", "Arena is full");
                return Err("arena is full".to_string());
            }
            None => match self.registry.find_available_arena(self.arena_max_players) {
                Some(handle) => handle,
                None => self.create_arena(),
            },
        };

        // Mapping goes in first so the snapshot router picks up the arena
        // before the join confirmation is broadcast
        self.player_arenas.insert(user_id, handle.id);

        let join_input = PlayerInput {
            user_id,
            msg,
            received_at: unix_millis(),
        };
        if handle.input_tx.send(join_input).await.is_err() {
            self.player_arenas.remove(&user_id);
            self.notify_error(user_id, "arena_closed", "Arena is shutting down");
            return Err("arena is shutting down".to_string());
        }

        Ok(handle.id)
    }

    /// Push an error straight to one player's socket
    fn notify_error(&self, user_id: Uuid, code: &str, message: &str) {
        if let Some(conn) = self.players.get(&user_id) {
            let _ = conn.snapshot_tx.send(ServerMsg::Error {
                code: code.to_string(),
                message: message.to_string(),
            });
        }
    }

    /// Create a new arena and spawn its tick task
    fn create_arena(&self) -> ArenaHandle {
        let arena_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (arena, handle) = GameArena::new(
            arena_id,
            seed,
            self.arena_max_players,
            self.respawn_delay,
            self.kill_log.clone(),
        );
        self.registry.insert(handle.clone());

        info!(arena_id = %arena_id, seed, "Created new arena");

        let registry = self.registry.clone();
        let player_arenas = self.player_arenas.clone();
        tokio::spawn(async move {
            arena.run().await;

            // Cleanup after the arena winds down
            registry.remove(&arena_id);
            player_arenas.retain(|_, assigned| *assigned != arena_id);
            info!(arena_id = %arena_id, "Arena removed from registry");
        });

        handle
    }

    /// Get player's current arena ID
    pub fn get_player_arena(&self, user_id: &Uuid) -> Option<Uuid> {
        self.player_arenas.get(user_id).map(|r| *r)
    }

    /// Number of connected sockets (not necessarily in arenas)
    pub fn connected_players(&self) -> usize {
        self.players.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> SessionService {
        SessionService::new(
            Arc::new(ArenaRegistry::new()),
            Arc::new(KillLog::default()),
            16,
            3.0,
        )
    }

    fn join_msg(arena_id: Option<Uuid>) -> ClientMsg {
        ClientMsg::JoinArena {
            arena_id,
            weapon: crate::ws::protocol::WeaponClass::Rifle,
            display_name: None,
        }
    }

    #[tokio::test]
    async fn first_join_creates_an_arena() {
        let service = test_service();
        let user = Uuid::new_v4();
        service.register_player(user).await;

        let arena_id = service.join_arena(user, join_msg(None)).await.unwrap();

        assert_eq!(service.registry.active_arenas(), 1);
        assert_eq!(service.get_player_arena(&user), Some(arena_id));
    }

    #[tokio::test]
    async fn second_join_reuses_the_open_arena() {
        let service = test_service();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        service.register_player(a).await;
        service.register_player(b).await;

        let first = service.join_arena(a, join_msg(None)).await.unwrap();
        let second = service.join_arena(b, join_msg(None)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.registry.active_arenas(), 1);
    }

    #[tokio::test]
    async fn requested_arena_wins_over_open_ones() {
        let service = test_service();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        service.register_player(a).await;
        service.register_player(b).await;

        let first = service.join_arena(a, join_msg(None)).await.unwrap();
        // Request a specific arena id; a stale one falls back to routing
        let second = service
            .join_arena(b, join_msg(Some(first)))
            .await
            .unwrap();
        assert_eq!(first, second);

        let stale = Uuid::new_v4();
        let third = service.join_arena(b, join_msg(Some(stale))).await.unwrap();
        assert_eq!(third, first);
    }

    #[tokio::test]
    async fn disconnect_clears_the_session() {
        let service = test_service();
        let user = Uuid::new_v4();
        service.register_player(user).await;
        service.join_arena(user, join_msg(None)).await.unwrap();

        service.unregister_player(user).await;

        assert_eq!(service.get_player_arena(&user), None);
        assert_eq!(service.connected_players(), 0);
    }
}
