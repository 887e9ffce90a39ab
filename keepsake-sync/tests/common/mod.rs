#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keepsake_core::Credentials;
use keepsake_sync::{Connection, SyncError, Transport};

#[derive(Default)]
struct RemoteState {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
    uploads: AtomicUsize,
    fail_connect: bool,
    /// Blocks the first fetch until a value arrives (or the sender drops).
    fetch_gate: Mutex<Option<mpsc::Receiver<()>>>,
}

/// In-memory remote that records every transfer. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<RemoteState>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            state: Arc::new(RemoteState {
                fail_connect: true,
                ..RemoteState::default()
            }),
        }
    }

    /// A remote whose first fetch stalls until the returned sender fires.
    pub fn gated() -> (Self, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let transport = Self {
            state: Arc::new(RemoteState {
                fetch_gate: Mutex::new(Some(gate)),
                ..RemoteState::default()
            }),
        };
        (transport, release)
    }

    pub fn with_file(path: &str, bytes: &[u8]) -> Self {
        let transport = Self::new();
        transport.put(path, bytes);
        transport
    }

    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.files.lock().unwrap().get(path).cloned()
    }

    pub fn upload_count(&self) -> usize {
        self.state.uploads.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn shared(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }
}

impl Transport for RecordingTransport {
    fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn Connection>, SyncError> {
        if self.state.fail_connect {
            return Err(SyncError::Remote {
                op: "connect",
                path: String::new(),
                message: "connection refused".into(),
            });
        }
        Ok(Box::new(RecordingConnection {
            remote: self.clone(),
        }))
    }
}

struct RecordingConnection {
    remote: RecordingTransport,
}

impl Connection for RecordingConnection {
    fn retrieve(&mut self, remote_path: &str) -> Result<Vec<u8>, SyncError> {
        let gate = self.remote.state.fetch_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        self.remote.state.fetches.fetch_add(1, Ordering::SeqCst);
        self.remote
            .file(remote_path)
            .ok_or_else(|| SyncError::RemoteNotFound {
                path: remote_path.to_string(),
            })
    }

    fn store(&mut self, remote_path: &str, bytes: &[u8]) -> Result<(), SyncError> {
        self.remote.state.uploads.fetch_add(1, Ordering::SeqCst);
        self.remote.put(remote_path, bytes);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), SyncError> {
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        host: "ftp.test".into(),
        user: "tester".into(),
        password: "secret".into(),
    }
}

/// Poll `condition` every 10ms for up to three seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
