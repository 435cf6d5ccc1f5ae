//! SQLite-backed tests for the database layer.

use super::Database;
use crate::error::{Error, ProcessError};
use crate::types::{DownloadFormat, Episode, MediaType, Process, Request, Status, Step};

async fn test_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(&dir.path().join("test.db")).await.unwrap();
    (db, dir)
}

fn sample_request(url: &str) -> Request {
    Request {
        id: "tok1234567".to_string(),
        user_id: 11,
        chat_id: 22,
        message_id: 33,
        url: url.to_string(),
        format: Some(DownloadFormat::Mp3),
        quality: Some("192k".to_string()),
        force: false,
    }
}

fn sample_episode(url: &str) -> Episode {
    Episode {
        id: 0,
        title: "Title".to_string(),
        description: "Desc".to_string(),
        thumbnail_file: "t.jpg".to_string(),
        media_file: "m.mp3".to_string(),
        media_type: MediaType::Mp3,
        media_duration: 120,
        media_size: 4096,
        author: "Author".to_string(),
        original_url: url.to_string(),
        canonical_url: format!("{url}?canonical"),
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let _db = Database::new(&path).await.unwrap();
    // Re-opening the same file runs migrations again without error
    let _db2 = Database::new(&path).await.unwrap();
}

#[tokio::test]
async fn upsert_assigns_id_and_timestamps_on_insert() {
    let (db, _dir) = test_db().await;
    let mut process = Process::new(sample_request("https://x/1"));

    db.upsert_process(&mut process).await.unwrap();

    assert!(process.id.is_persisted());
    let loaded = db.process_by_id(process.id).await.unwrap().unwrap();
    assert_eq!(loaded.step, Step::Creating);
    assert_eq!(loaded.status, Status::InProgress);
    assert_eq!(loaded.request, process.request);
    assert!(loaded.episode.is_none());
}

#[tokio::test]
async fn upsert_updates_in_place_and_keeps_id() {
    let (db, _dir) = test_db().await;
    let mut process = Process::new(sample_request("https://x/1"));
    db.upsert_process(&mut process).await.unwrap();
    let id = process.id;

    process.step = Step::Downloading;
    db.upsert_process(&mut process).await.unwrap();

    assert_eq!(process.id, id, "update must not reassign the id");
    let loaded = db.process_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.step, Step::Downloading);

    // Only one row exists for this url
    let count = db
        .count_processes_by_url_and_status("https://x/1", Status::InProgress)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn error_snapshot_survives_a_round_trip() {
    let (db, _dir) = test_db().await;
    let mut process = Process::new(sample_request("https://x/1"));
    process.status = Status::Failed;
    process.error = Some(ProcessError::from(&Error::EpisodeExists));
    db.upsert_process(&mut process).await.unwrap();

    let loaded = db.process_by_id(process.id).await.unwrap().unwrap();
    let err = loaded.error.unwrap();
    assert_eq!(err.kind.code(), 104);
    assert_eq!(err.message, "episode already exists");
}

#[tokio::test]
async fn count_distinguishes_url_and_status() {
    let (db, _dir) = test_db().await;

    let mut a = Process::new(sample_request("https://x/1"));
    db.upsert_process(&mut a).await.unwrap();

    let mut b = Process::new(sample_request("https://x/1"));
    b.status = Status::Failed;
    db.upsert_process(&mut b).await.unwrap();

    let mut c = Process::new(sample_request("https://x/2"));
    db.upsert_process(&mut c).await.unwrap();

    assert_eq!(
        db.count_processes_by_url_and_status("https://x/1", Status::InProgress)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        db.count_processes_by_url_and_status("https://x/1", Status::Failed)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        db.count_processes_by_url_and_status("https://x/3", Status::InProgress)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn processes_by_status_attaches_episodes() {
    let (db, _dir) = test_db().await;

    let mut episode = sample_episode("https://x/1");
    db.insert_episode(&mut episode).await.unwrap();
    assert!(episode.id > 0);

    let mut process = Process::new(sample_request("https://x/1"));
    process.episode = Some(episode.clone());
    db.upsert_process(&mut process).await.unwrap();

    let in_progress = db.processes_by_status(Status::InProgress).await.unwrap();
    assert_eq!(in_progress.len(), 1);
    let attached = in_progress[0].episode.as_ref().unwrap();
    assert_eq!(attached.id, episode.id);
    assert_eq!(attached.media_file, "m.mp3");
    assert_eq!(attached.media_type, MediaType::Mp3);
}

#[tokio::test]
async fn episodes_by_original_url_only_matches_exactly() {
    let (db, _dir) = test_db().await;

    let mut e1 = sample_episode("https://x/1");
    db.insert_episode(&mut e1).await.unwrap();
    let mut e2 = sample_episode("https://x/2");
    db.insert_episode(&mut e2).await.unwrap();

    let found = db.episodes_by_original_url("https://x/1").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].original_url, "https://x/1");

    assert!(
        db.episodes_by_original_url("https://x/nope")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn list_episodes_returns_newest_first() {
    let (db, _dir) = test_db().await;

    let mut first = sample_episode("https://x/1");
    db.insert_episode(&mut first).await.unwrap();
    let mut second = sample_episode("https://x/2");
    db.insert_episode(&mut second).await.unwrap();

    let all = db.list_episodes().await.unwrap();
    assert_eq!(all.len(), 2);
    // Same created_at second is possible; id breaks the tie
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);
}
