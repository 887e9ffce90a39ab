mod common;

use std::fs;
use std::time::Duration;

use common::{credentials, eventually, RecordingTransport};
use keepsake_core::{Mode, SyncConfig};
use keepsake_sync::{
    sync, FetchOutcome, Namespaced, PersistOutcome, Schedule, Store, SyncOptions, UploadStatus,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const FAST: Schedule = Schedule {
    grace: Duration::from_millis(20),
    every: Some(Duration::from_millis(50)),
};

fn config(dir: &TempDir, mode: Mode) -> SyncConfig {
    SyncConfig {
        local_path: dir.path().to_path_buf(),
        remote_path: "site".into(),
        mode,
        ..SyncConfig::default()
    }
}

fn mirrored(config: SyncConfig, remote: &RecordingTransport, schedule: Schedule) -> SyncOptions {
    SyncOptions::new(config)
        .credentials(Some(credentials()))
        .transport(remote.shared())
        .schedule(schedule)
}

fn register(store: &Store, namespace: &str, options: SyncOptions) -> Namespaced {
    sync(store, namespace, options, |_| {})
        .expect("sync")
        .into_structured()
        .expect("structured registration")
}

// ---------------------------------------------------------------------------
// Structured mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bootstrap_pulls_remote_copy_before_loading() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cfg.json"), r#"{"a": 0, "stale": true}"#).unwrap();
    let remote = RecordingTransport::with_file("site/cfg.json", br#"{"a": 1, "remote": true}"#);

    let store = Store::new();
    store
        .object(&"cfg".into())
        .write()
        .insert("mem".into(), json!(1));
    let cfg = register(&store, "cfg", mirrored(config(&dir, Mode::Structured), &remote, FAST));

    let report = cfg.handle().ready().await.expect("bootstrap");
    assert_eq!(report.fetch, FetchOutcome::Fetched);
    assert_eq!(remote.fetch_count(), 1);
    assert_eq!(
        fs::read(dir.path().join("cfg.json")).unwrap(),
        br#"{"a": 1, "remote": true}"#
    );
    assert_eq!(
        Value::Object(cfg.snapshot()),
        json!({"a": 1, "remote": true, "mem": 1})
    );
}

#[tokio::test]
async fn failed_fetch_keeps_local_copy() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cfg.json"), r#"{"a": 1}"#).unwrap();
    let remote = RecordingTransport::new();

    let store = Store::new();
    let cfg = register(&store, "cfg", mirrored(config(&dir, Mode::Structured), &remote, FAST));

    let report = cfg.handle().ready().await.expect("bootstrap");
    assert_eq!(report.fetch, FetchOutcome::Failed);
    assert_eq!(
        fs::read_to_string(dir.path().join("cfg.json")).unwrap(),
        r#"{"a": 1}"#
    );
    assert_eq!(Value::Object(cfg.snapshot()), json!({"a": 1}));
}

#[tokio::test]
async fn unreachable_remote_still_persists_locally() {
    let dir = TempDir::new().unwrap();
    let remote = RecordingTransport::unreachable();

    let store = Store::new();
    let cfg = register(&store, "cfg", mirrored(config(&dir, Mode::Structured), &remote, FAST));
    let report = cfg.handle().ready().await.expect("bootstrap still completes");
    assert_eq!(report.fetch, FetchOutcome::Failed);

    cfg.write().insert("x".into(), json!(1));
    let path = dir.path().join("cfg.json");
    assert!(
        eventually(|| fs::read_to_string(&path).is_ok_and(|s| s == "{\n  \"x\": 1\n}")).await
    );
    assert_eq!(remote.upload_count(), 0);
}

#[tokio::test]
async fn changes_are_uploaded_once_per_digest() {
    let dir = TempDir::new().unwrap();
    let remote = RecordingTransport::new();

    let store = Store::new();
    let cfg = register(&store, "cfg", mirrored(config(&dir, Mode::Structured), &remote, FAST));
    cfg.handle().ready().await.expect("bootstrap");
    cfg.write().insert("x".into(), json!(1));

    assert!(eventually(|| remote.file("site/cfg.json").is_some()).await);
    assert_eq!(
        remote.file("site/cfg.json").unwrap(),
        b"{\n  \"x\": 1\n}".to_vec()
    );

    // several unchanged cycles
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(remote.upload_count(), 1);

    cfg.write().insert("x".into(), json!(2));
    assert!(eventually(|| remote.upload_count() == 2).await);
    assert_eq!(
        remote.file("site/cfg.json").unwrap(),
        b"{\n  \"x\": 2\n}".to_vec()
    );
}

#[tokio::test]
async fn persistence_waits_for_a_slow_fetch() {
    let dir = TempDir::new().unwrap();
    let (remote, release) = RecordingTransport::gated();
    remote.put("site/cfg.json", br#"{"remote": 1}"#);

    let store = Store::new();
    store
        .object(&"cfg".into())
        .write()
        .insert("mem".into(), json!(1));
    let cfg = register(&store, "cfg", mirrored(config(&dir, Mode::Structured), &remote, FAST));

    // Several grace periods and intervals pass while the fetch is stuck.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let path = dir.path().join("cfg.json");
    assert!(!cfg.handle().is_ready());
    assert!(!path.exists(), "nothing may be written before bootstrap");
    assert_eq!(remote.upload_count(), 0);

    release.send(()).expect("fetch still waiting");
    let report = cfg.handle().ready().await.expect("bootstrap");
    assert_eq!(report.fetch, FetchOutcome::Fetched);

    assert!(eventually(|| remote.upload_count() == 1).await);
    let expected = json!({"mem": 1, "remote": 1});
    let uploaded: Value =
        serde_json::from_slice(&remote.file("site/cfg.json").unwrap()).expect("uploaded json");
    assert_eq!(uploaded, expected);
    let written: Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).expect("local json");
    assert_eq!(written, expected);
}

#[tokio::test]
async fn without_credentials_the_remote_is_never_contacted() {
    let dir = TempDir::new().unwrap();
    let remote = RecordingTransport::new();
    let options = mirrored(config(&dir, Mode::Structured), &remote, FAST).credentials(None);
    assert!(!options.remote_enabled());

    let store = Store::new();
    let cfg = register(&store, "cfg", options);
    let report = cfg.handle().ready().await.expect("bootstrap");
    assert_eq!(report.fetch, FetchOutcome::Skipped);

    cfg.write().insert("x".into(), json!(1));
    let path = dir.path().join("cfg.json");
    assert!(eventually(|| path.exists()).await);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(remote.fetch_count(), 0);
    assert_eq!(remote.upload_count(), 0);
}

// ---------------------------------------------------------------------------
// Blob mode
// ---------------------------------------------------------------------------

const MANUAL: Schedule = Schedule {
    grace: Duration::from_secs(3_600),
    every: None,
};

#[tokio::test]
async fn blob_bootstrap_lands_raw_bytes_without_loading() {
    let dir = TempDir::new().unwrap();
    let payload = [0u8, 159, 146, 150, b'\n'];
    let remote = RecordingTransport::with_file("site/payload", &payload);

    let store = Store::new();
    let control = sync(
        &store,
        "payload",
        mirrored(config(&dir, Mode::Blob), &remote, MANUAL),
        |_| {},
    )
    .expect("sync")
    .into_blob()
    .expect("blob registration");

    let report = control.handle().ready().await.expect("bootstrap");
    assert_eq!(report.fetch, FetchOutcome::Fetched);
    assert!(!report.loaded_local);
    assert_eq!(control.local_file(), dir.path().join("payload"));
    assert_eq!(fs::read(control.local_file()).unwrap(), payload);
    assert!(!dir.path().join("payload.json").exists());
}

#[tokio::test]
async fn blob_persist_uploads_caller_file_once() {
    let dir = TempDir::new().unwrap();
    let remote = RecordingTransport::new();

    let store = Store::new();
    let control = sync(
        &store,
        "payload",
        mirrored(config(&dir, Mode::Blob), &remote, MANUAL),
        |_| {},
    )
    .expect("sync")
    .into_blob()
    .expect("blob registration");
    control.handle().ready().await.expect("bootstrap");

    fs::write(control.local_file(), b"opaque bytes").unwrap();
    let first = control.persist().await;
    assert_eq!(
        first.outcome,
        PersistOutcome::Persisted {
            wrote_local: false,
            upload: UploadStatus::Uploaded,
        }
    );
    assert_eq!(remote.file("site/payload").unwrap(), b"opaque bytes".to_vec());

    let second = control.persist().await;
    assert_eq!(second.outcome, PersistOutcome::Unchanged);
    assert_eq!(remote.upload_count(), 1);
}

#[tokio::test]
async fn persist_with_reports_even_when_nothing_changed() {
    let dir = TempDir::new().unwrap();
    let remote = RecordingTransport::new();

    let store = Store::new();
    let control = sync(
        &store,
        "payload",
        mirrored(config(&dir, Mode::Blob), &remote, MANUAL),
        |_| {},
    )
    .expect("sync")
    .into_blob()
    .expect("blob registration");
    control.handle().ready().await.expect("bootstrap");

    // No local file yet: the empty digest is recorded, nothing is uploaded.
    let (tx, rx) = tokio::sync::oneshot::channel();
    control.persist_with(move |report| {
        let _ = tx.send(report);
    });
    let report = rx.await.expect("callback fired");
    assert_eq!(
        report.outcome,
        PersistOutcome::Persisted {
            wrote_local: false,
            upload: UploadStatus::Skipped,
        }
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    control
        .persist_with(move |report| {
            let _ = tx.send(report);
        })
        .await
        .expect("persist task");
    assert_eq!(rx.await.unwrap().outcome, PersistOutcome::Unchanged);
    assert_eq!(remote.upload_count(), 0);
}

#[tokio::test]
async fn blob_without_mirror_persists_locally_only() {
    let dir = TempDir::new().unwrap();
    let store = Store::new();
    let control = sync(
        &store,
        "payload",
        SyncOptions::new(config(&dir, Mode::Blob))
            .credentials(None)
            .schedule(MANUAL),
        |_| {},
    )
    .expect("sync")
    .into_blob()
    .expect("blob registration");
    control.handle().ready().await.expect("bootstrap");

    fs::write(control.local_file(), b"bytes").unwrap();
    let report = control.persist().await;
    assert_eq!(
        report.outcome,
        PersistOutcome::Persisted {
            wrote_local: false,
            upload: UploadStatus::Disabled,
        }
    );
    assert!(!control.destroy(), "no mirror, nothing to tear down");
}
