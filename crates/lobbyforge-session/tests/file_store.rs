//! Integration tests for the file-backed credential store.

use std::sync::Arc;

use lobbyforge_protocol::PlayerId;
use lobbyforge_session::{
    hash_password, CredentialError, CredentialStore, FileCredentialStore,
};

#[tokio::test]
async fn test_load_missing_record_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path());

    let loaded = store.load(PlayerId::new()).await.unwrap();

    assert_eq!(loaded, None);
}

#[tokio::test]
async fn test_persist_then_load_returns_digest() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path().join("players"));
    let id = PlayerId::new();
    let digest = hash_password(id, "secret1");

    store.persist(id, &digest).await.unwrap();

    assert_eq!(store.load(id).await.unwrap(), Some(digest));
}

#[tokio::test]
async fn test_persist_writes_password_field_and_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path());
    let id = PlayerId::new();

    store.persist(id, "deadbeef").await.unwrap();

    let body = std::fs::read_to_string(store.record_path(id)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["password"], "deadbeef");

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_persist_overwrites_previous_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path());
    let id = PlayerId::new();

    store.persist(id, "first").await.unwrap();
    store.persist(id, "second").await.unwrap();

    assert_eq!(store.load(id).await.unwrap(), Some("second".into()));
}

#[tokio::test]
async fn test_load_malformed_record_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path());
    let id = PlayerId::new();
    std::fs::write(store.record_path(id), r#"{"pass": 1}"#).unwrap();

    let result = store.load(id).await;

    assert!(matches!(result, Err(CredentialError::Malformed { .. })));
}

#[tokio::test]
async fn test_persist_into_unwritable_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the directory should be.
    let blocker = dir.path().join("players");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let store = FileCredentialStore::new(&blocker);

    let result = store.persist(PlayerId::new(), "abc").await;

    assert!(matches!(result, Err(CredentialError::Io { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_players_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path()));

    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..16 {
        let store = store.clone();
        tasks.spawn(async move {
            let id = PlayerId::new();
            let digest = format!("digest-{n}");
            store.persist(id, &digest).await.unwrap();
            (id, digest)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (id, digest) = joined.unwrap();
        assert_eq!(store.load(id).await.unwrap(), Some(digest));
    }
}
