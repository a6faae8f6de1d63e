use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use uuid::Uuid;

use fps_arena_server::game::{ArenaRegistry, GameArena, KillLog, PlayerInput};
use fps_arena_server::session::SessionService;
use fps_arena_server::util::time::unix_millis;
use fps_arena_server::ws::protocol::{ClientMsg, GameEvent, ServerMsg, WeaponClass};

// Blackbox integration tests that drive arenas the way the WebSocket layer
// does: commands in through the handle, broadcasts out.

fn join_msg(name: &str) -> ClientMsg {
    ClientMsg::JoinArena {
        arena_id: None,
        weapon: WeaponClass::Rifle,
        display_name: Some(name.to_string()),
    }
}

fn input(user_id: Uuid, msg: ClientMsg) -> PlayerInput {
    PlayerInput {
        user_id,
        msg,
        received_at: unix_millis(),
    }
}

fn input_tick(seq: u32, move_z: f32) -> ClientMsg {
    ClientMsg::InputTick {
        seq,
        move_x: 0.0,
        move_z,
        run: false,
        jump: false,
        yaw: 0.0,
        pitch: 0.0,
        fire_held: false,
        fire_released: false,
        reload_pressed: false,
    }
}

/// Receive broadcasts until `pick` extracts a value, or panic after 2s
async fn recv_until<F, T>(rx: &mut broadcast::Receiver<ServerMsg>, mut pick: F) -> T
where
    F: FnMut(ServerMsg) -> Option<T>,
{
    timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if let Some(out) = pick(msg) {
                        return out;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("broadcast channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

#[tokio::test]
async fn join_confirms_roster_and_empty_kill_feed() {
    let (arena, handle) = GameArena::new(Uuid::new_v4(), 7, 16, 3.0, Arc::new(KillLog::default()));
    tokio::spawn(arena.run());

    let mut rx = handle.broadcast_tx.subscribe();
    let user = Uuid::new_v4();
    handle
        .input_tx
        .send(input(user, join_msg("alice")))
        .await
        .unwrap();

    let (players, recent_kills) = recv_until(&mut rx, |msg| match msg {
        ServerMsg::ArenaJoined {
            players,
            recent_kills,
            ..
        } => Some((players, recent_kills)),
        _ => None,
    })
    .await;

    assert_eq!(players.len(), 1);
    assert_eq!(players[0].user_id, user);
    assert_eq!(players[0].display_name, "alice");
    assert!(recent_kills.is_empty());
}

#[tokio::test]
async fn held_movement_advances_position_between_snapshots() {
    let (arena, handle) = GameArena::new(Uuid::new_v4(), 9, 16, 3.0, Arc::new(KillLog::default()));
    tokio::spawn(arena.run());

    let mut rx = handle.broadcast_tx.subscribe();
    let user = Uuid::new_v4();
    handle
        .input_tx
        .send(input(user, join_msg("runner")))
        .await
        .unwrap();

    // First snapshot fixes the spawn position
    let z0 = recv_until(&mut rx, |msg| match msg {
        ServerMsg::Snapshot { players, .. } => {
            players.iter().find(|p| p.user_id == user).map(|p| p.z)
        }
        _ => None,
    })
    .await;

    // One forward input; the level persists on the server until replaced
    handle
        .input_tx
        .send(input(user, input_tick(1, 1.0)))
        .await
        .unwrap();

    let z1 = recv_until(&mut rx, |msg| match msg {
        ServerMsg::Snapshot { players, .. } => players
            .iter()
            .find(|p| p.user_id == user)
            .and_then(|p| (p.z > z0 + 0.1).then_some(p.z)),
        _ => None,
    })
    .await;

    assert!(z1 > z0);
}

#[tokio::test]
async fn self_damage_death_respawns_without_kill_feed_entry() {
    let kill_log = Arc::new(KillLog::default());
    let (arena, handle) = GameArena::new(Uuid::new_v4(), 11, 16, 0.2, kill_log.clone());
    tokio::spawn(arena.run());

    let mut rx = handle.broadcast_tx.subscribe();
    let user = Uuid::new_v4();
    handle
        .input_tx
        .send(input(user, join_msg("faller")))
        .await
        .unwrap();

    recv_until(&mut rx, |msg| {
        matches!(msg, ServerMsg::ArenaJoined { .. }).then_some(())
    })
    .await;

    handle
        .input_tx
        .send(input(user, ClientMsg::UpdateHealth { delta: -150.0 }))
        .await
        .unwrap();

    recv_until(&mut rx, |msg| match msg {
        ServerMsg::Snapshot { events, .. } => events
            .iter()
            .any(|e| matches!(e, GameEvent::Death { user_id } if *user_id == user))
            .then_some(()),
        _ => None,
    })
    .await;

    // 0.2s respawn delay, then the player comes back at full health
    let (alive, health) = recv_until(&mut rx, |msg| match msg {
        ServerMsg::Snapshot {
            players, events, ..
        } => {
            if events
                .iter()
                .any(|e| matches!(e, GameEvent::Respawn { user_id, .. } if *user_id == user))
            {
                players
                    .iter()
                    .find(|p| p.user_id == user)
                    .map(|p| (p.alive, p.health))
            } else {
                None
            }
        }
        _ => None,
    })
    .await;

    assert!(alive);
    assert_eq!(health, 100.0);

    // Environmental deaths never reach the kill feed
    assert!(kill_log.is_empty());
}

#[tokio::test]
async fn ping_echoes_the_client_timestamp() {
    let (arena, handle) = GameArena::new(Uuid::new_v4(), 13, 16, 3.0, Arc::new(KillLog::default()));
    tokio::spawn(arena.run());

    let mut rx = handle.broadcast_tx.subscribe();
    handle
        .input_tx
        .send(input(Uuid::new_v4(), ClientMsg::Ping { t: 12345 }))
        .await
        .unwrap();

    let t = recv_until(&mut rx, |msg| match msg {
        ServerMsg::Pong { t } => Some(t),
        _ => None,
    })
    .await;

    assert_eq!(t, 12345);
}

#[tokio::test]
async fn session_routes_joins_and_cleans_up_empty_arenas() {
    let registry = Arc::new(ArenaRegistry::new());
    let service = SessionService::new(registry.clone(), Arc::new(KillLog::default()), 16, 3.0);

    let user = Uuid::new_v4();
    let (_input_tx, mut personal_rx) = service.register_player(user).await;
    service.join_arena(user, join_msg("drifter")).await.unwrap();

    // The personal channel picks up the arena's snapshot stream
    recv_until(&mut personal_rx, |msg| {
        matches!(msg, ServerMsg::Snapshot { .. }).then_some(())
    })
    .await;
    assert_eq!(registry.active_arenas(), 1);

    service.unregister_player(user).await;

    // The emptied arena winds down and leaves the registry
    timeout(Duration::from_secs(2), async {
        while registry.active_arenas() != 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("arena was not cleaned up after the last player left");
}
