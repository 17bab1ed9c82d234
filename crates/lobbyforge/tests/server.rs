//! Integration tests for the lobby server event loop.

mod common;

use std::time::Duration;

use common::*;
use lobbyforge::prelude::*;
use lobbyforge::LobbyServerBuilder;
use lobbyforge_session::hash_password;
use tokio::sync::mpsc;

/// Polls `check` until it holds, failing the test after two seconds.
async fn wait_until(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn connect_event(player_id: PlayerId) -> HostEvent {
    HostEvent::Connect {
        player_id,
        address: addr(1),
        state: state_in("survival"),
    }
}

fn command(player_id: PlayerId, verb: &str, args: &[&str]) -> HostEvent {
    HostEvent::Command {
        player_id,
        verb: verb.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

fn lobby_builder() -> LobbyServerBuilder {
    LobbyServer::<MemoryCredentialStore, RecordingHost>::builder()
        .lobby_config(lobby_config())
}

#[tokio::test]
async fn test_register_and_logout_through_event_loop() {
    let host = RecordingHost::new();
    let server = lobby_builder()
        .build(MemoryCredentialStore::new(), host.clone())
        .unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));
    let id = PlayerId::new();
    host.join(id, "survival");

    tx.send(connect_event(id)).await.unwrap();
    wait_until(|| host.notices(id).contains(&MessageKey::UnregisteredWelcome))
        .await;

    tx.send(command(id, "/register", &["hunter22"])).await.unwrap();
    wait_until(|| host.notices(id).contains(&MessageKey::RegisterSuccess))
        .await;

    tx.send(command(id, "logout", &[])).await.unwrap();
    wait_until(|| host.kicked(id)).await;

    tx.send(HostEvent::Shutdown).await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_login_wrong_then_right_password() {
    let id = PlayerId::new();
    let store = MemoryCredentialStore::new()
        .with_record(id, hash_password(id, "secret1"));
    let host = RecordingHost::new();
    let server = lobby_builder().build(store, host.clone()).unwrap();
    let manager = server.manager().clone();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));
    host.join(id, "survival");

    tx.send(connect_event(id)).await.unwrap();
    wait_until(|| host.notices(id).contains(&MessageKey::RegisteredWelcome))
        .await;
    tx.send(command(id, "login", &["wrong"])).await.unwrap();
    tx.send(command(id, "login", &["secret1"])).await.unwrap();
    wait_until(|| host.notices(id).contains(&MessageKey::LoginSuccessful))
        .await;

    assert!(host.notices(id).contains(&MessageKey::LoginUnsuccessful));
    assert!(manager.is_allowed(id));

    drop(tx);
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_flushes_pending_register() {
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::new();
    let server = LobbyServer::<FileCredentialStore, RecordingHost>::builder()
        .lobby_config(lobby_config())
        .credentials_dir(dir.path())
        .build_file_backed(host.clone())
        .unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));
    let id = PlayerId::new();
    host.join(id, "survival");

    tx.send(connect_event(id)).await.unwrap();
    wait_until(|| host.notices(id).contains(&MessageKey::UnregisteredWelcome))
        .await;
    tx.send(command(id, "register", &["hunter22"])).await.unwrap();
    tx.send(HostEvent::Shutdown).await.unwrap();
    run.await.unwrap().unwrap();

    let record = dir.path().join(format!("{id}.json"));
    let body = std::fs::read_to_string(record).unwrap();
    assert!(body.contains(&hash_password(id, "hunter22")));
    assert!(host.kicked(id));
}

#[tokio::test]
async fn test_disconnect_event_restores_state() {
    let host = RecordingHost::new();
    let server = lobby_builder()
        .build(MemoryCredentialStore::new(), host.clone())
        .unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));
    let id = PlayerId::new();
    host.join(id, "survival");

    tx.send(connect_event(id)).await.unwrap();
    wait_until(|| host.world_of(id) == Some(WorldId::from(LOBBY))).await;
    tx.send(HostEvent::Disconnect {
        player_id: id,
        world: WorldId::from(LOBBY),
    })
    .await
    .unwrap();
    wait_until(|| host.world_of(id) == Some(WorldId::from("survival"))).await;

    tx.send(HostEvent::Shutdown).await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unknown_command_is_left_to_host() {
    let host = RecordingHost::new();
    let server = lobby_builder()
        .build(MemoryCredentialStore::new(), host.clone())
        .unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));
    let id = PlayerId::new();

    tx.send(command(id, "home", &[])).await.unwrap();
    tx.send(HostEvent::Shutdown).await.unwrap();
    run.await.unwrap().unwrap();

    assert!(host.notices(id).is_empty());
}

#[tokio::test]
async fn test_bad_spawn_point_event_alerts_operators() {
    let host = RecordingHost::new();
    let server = lobby_builder()
        .build(MemoryCredentialStore::new(), host.clone())
        .unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));

    tx.send(HostEvent::AddSpawnPoint {
        location: Location::new("survival", 0.0, 70.0, 0.0),
    })
    .await
    .unwrap();
    tx.send(HostEvent::Shutdown).await.unwrap();
    run.await.unwrap().unwrap();

    assert_eq!(host.alerts().len(), 1);
    assert!(host.alerts()[0].contains("survival"));
}

#[tokio::test]
async fn test_build_rejects_spawn_points_in_two_worlds() {
    let mut lobby = lobby_config();
    lobby
        .spawn_points
        .push(Location::new("survival", 0.0, 70.0, 0.0));

    let result = LobbyServer::<MemoryCredentialStore, RecordingHost>::builder()
        .lobby_config(lobby)
        .build(MemoryCredentialStore::new(), RecordingHost::new());

    assert!(matches!(result, Err(LobbyforgeError::Lobby(_))));
}

#[test]
fn test_config_file_missing_is_config_error() {
    let dir = tempfile::tempdir().unwrap();

    let result = LobbyServer::<MemoryCredentialStore, RecordingHost>::builder()
        .config_file(dir.path().join("lobby.toml"));

    assert!(matches!(result, Err(LobbyforgeError::Config(_))));
}

#[test]
fn test_config_file_sets_credentials_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lobby.toml");
    let records = dir.path().join("records");
    let toml = format!(
        "credentials_dir = {:?}\n{}",
        records.display().to_string(),
        r#"
        [[lobby.spawn_points]]
        world = "lobby"
        x = 0.5
        y = 65.0
        z = 0.5
        "#
    );
    std::fs::write(&path, toml).unwrap();
    let host = RecordingHost::new();
    let server = LobbyServer::<FileCredentialStore, RecordingHost>::builder()
        .config_file(&path)
        .unwrap()
        .build_file_backed(host.clone())
        .unwrap();

    assert_eq!(server.manager().credentials().dir(), records.as_path());
    assert_eq!(server.manager().lobby_world(), Some(WorldId::from(LOBBY)));
}

#[tokio::test]
async fn test_events_from_json_lines() {
    let host = RecordingHost::new();
    let server = lobby_builder()
        .build(MemoryCredentialStore::new(), host.clone())
        .unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(server.run(rx));
    let script = r#"
        {"type":"Connect","player_id":"6f9619ff-8b86-d011-b42d-00c04fc964ff","address":"192.168.1.1","state":{"location":{"world":"survival","x":0.0,"y":70.0,"z":0.0},"food_level":20,"health":20.0,"max_health":20.0}}
        {"type":"Shutdown"}
    "#;

    for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let event: HostEvent = serde_json::from_str(line).unwrap();
        tx.send(event).await.unwrap();
    }
    run.await.unwrap().unwrap();

    let id: PlayerId =
        serde_json::from_str("\"6f9619ff-8b86-d011-b42d-00c04fc964ff\"")
            .unwrap();
    assert!(host.notices(id).contains(&MessageKey::UnregisteredWelcome));
}
