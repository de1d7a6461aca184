//! Shared test helpers: collaborator doubles and pipeline construction.

use crate::catalog::Catalog;
use crate::collaborators::{Collaborators, Decoder, Fetched, Storage, Transfer};
use crate::condition::ConditionFilter;
use crate::config::Config;
use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::types::{Event, FileDescriptor, Stage};
use crate::verify::DigestAlgorithm;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Semaphore, broadcast};

/// Every collaborator call, in the order it happened: (stage, key)
pub(crate) type CallLog = Arc<Mutex<Vec<(Stage, String)>>>;

/// Deterministic body served for a key
pub(crate) fn body_for(key: &str) -> Vec<u8> {
    format!("payload of {key}").into_bytes()
}

/// Descriptor with declared length and MD5 matching [`body_for`]
pub(crate) fn descriptor(key: &str) -> FileDescriptor {
    let body = body_for(key);
    plain_descriptor(key)
        .with_length(body.len() as u64)
        .with_hash(DigestAlgorithm::Md5.hex_digest(&body))
}

/// Descriptor without declared length or hash
pub(crate) fn plain_descriptor(key: &str) -> FileDescriptor {
    FileDescriptor::new(key, format!("http://patch.test/{key}"), format!("files/{key}.dat"))
}

/// Catalog of fully declared descriptors
pub(crate) fn catalog(keys: &[&str]) -> Catalog {
    Catalog::new(keys.iter().map(|k| descriptor(k)).collect()).unwrap()
}

/// Transfer serving [`body_for`] and reporting the body length
pub(crate) struct StubTransfer {
    log: CallLog,
    failing: HashSet<String>,
    reported: HashMap<String, Option<u64>>,
}

impl StubTransfer {
    /// Fail the fetch for this key
    pub(crate) fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Override the reported length for this key
    pub(crate) fn reporting(mut self, key: &str, length: Option<u64>) -> Self {
        self.reported.insert(key.to_string(), length);
        self
    }
}

#[async_trait]
impl Transfer for StubTransfer {
    async fn fetch(&self, descriptor: &FileDescriptor) -> crate::Result<Fetched> {
        self.log
            .lock()
            .unwrap()
            .push((Stage::Download, descriptor.key.clone()));

        if self.failing.contains(&descriptor.key) {
            return Err(Error::stage(Stage::Download, &descriptor.path, "HTTP 404 Not Found"));
        }

        let bytes = body_for(&descriptor.key);
        let reported_length = self
            .reported
            .get(&descriptor.key)
            .copied()
            .unwrap_or(Some(bytes.len() as u64));
        Ok(Fetched {
            bytes,
            reported_length,
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Identity decoder that can flip the first byte for chosen keys
pub(crate) struct StubDecoder {
    log: CallLog,
    corrupt: HashSet<String>,
}

impl StubDecoder {
    /// Flip one bit of the first byte for this key
    pub(crate) fn corrupting(mut self, key: &str) -> Self {
        self.corrupt.insert(key.to_string());
        self
    }
}

#[async_trait]
impl Decoder for StubDecoder {
    async fn decode(&self, descriptor: &FileDescriptor, mut raw: Vec<u8>) -> crate::Result<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .push((Stage::Decode, descriptor.key.clone()));

        if self.corrupt.contains(&descriptor.key)
            && let Some(first) = raw.first_mut()
        {
            *first ^= 0x01;
        }
        Ok(raw)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// In-memory storage, optionally blocking each write on a gate permit
pub(crate) struct MemoryStorage {
    log: CallLog,
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    gate: Option<Arc<Semaphore>>,
}

impl MemoryStorage {
    /// Require one gate permit per store; returns the gate
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Bytes written to a path
    pub(crate) fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Number of files written
    pub(crate) fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store(&self, destination: &Path, bytes: &[u8]) -> crate::Result<()> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let key = destination
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        self.log.lock().unwrap().push((Stage::Store, key));
        self.files
            .lock()
            .unwrap()
            .insert(destination.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Collaborator doubles sharing one call log
pub(crate) struct Doubles {
    pub(crate) log: CallLog,
    pub(crate) transfer: StubTransfer,
    pub(crate) decoder: StubDecoder,
    pub(crate) storage: MemoryStorage,
}

impl Doubles {
    pub(crate) fn new() -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        Self {
            transfer: StubTransfer {
                log: log.clone(),
                failing: HashSet::new(),
                reported: HashMap::new(),
            },
            decoder: StubDecoder {
                log: log.clone(),
                corrupt: HashSet::new(),
            },
            storage: MemoryStorage {
                log: log.clone(),
                files: Mutex::new(HashMap::new()),
                gate: None,
            },
            log,
        }
    }

    /// Wire the doubles into a collaborator set, dropping the log handle
    pub(crate) fn into_collaborators(self) -> Collaborators {
        Collaborators {
            transfer: Arc::new(self.transfer),
            decoder: Arc::new(self.decoder),
            storage: Arc::new(self.storage),
        }
    }
}

/// A pipeline wired to doubles, with its download root in a temp dir
pub(crate) struct Harness {
    pub(crate) pipeline: Pipeline,
    pub(crate) log: CallLog,
    pub(crate) storage: Arc<MemoryStorage>,
    /// Download root; must be kept alive for the duration of the test
    pub(crate) temp_dir: TempDir,
}

impl Harness {
    /// Snapshot of the call log
    pub(crate) fn calls(&self) -> Vec<(Stage, String)> {
        self.log.lock().unwrap().clone()
    }

    /// Calls made for one key, in order
    pub(crate) fn stages_for(&self, key: &str) -> Vec<Stage> {
        self.calls()
            .into_iter()
            .filter(|(_, k)| k == key)
            .map(|(stage, _)| stage)
            .collect()
    }

    /// Where a descriptor's file lands
    pub(crate) fn destination(&self, key: &str) -> PathBuf {
        plain_descriptor(key).destination(self.temp_dir.path())
    }
}

/// Build a harness from doubles, an explicit filter and a config tweak
pub(crate) fn build_with_filter(
    configure: impl FnOnce(&mut Config),
    doubles: Doubles,
    filter: ConditionFilter,
) -> Harness {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.download_path = temp_dir.path().to_path_buf();
    configure(&mut config);

    let storage = Arc::new(doubles.storage);
    let collaborators = Collaborators {
        transfer: Arc::new(doubles.transfer),
        decoder: Arc::new(doubles.decoder),
        storage: storage.clone(),
    };

    Harness {
        pipeline: Pipeline::with_filter(config, collaborators, filter),
        log: doubles.log,
        storage,
        temp_dir,
    }
}

/// Build a harness from doubles and a config tweak
pub(crate) fn build(configure: impl FnOnce(&mut Config), doubles: Doubles) -> Harness {
    build_with_filter(configure, doubles, ConditionFilter::new())
}

/// Harness with default doubles
pub(crate) fn harness(configure: impl FnOnce(&mut Config)) -> Harness {
    build(configure, Doubles::new())
}

/// Concurrent mode with the same pool size for every stage
pub(crate) fn concurrent(workers: usize) -> impl FnOnce(&mut Config) {
    move |config| {
        config.concurrency.thread_usage = true;
        config.concurrency.parallel_download = workers;
        config.concurrency.parallel_decode = workers;
        config.concurrency.parallel_store = workers;
    }
}

/// Everything buffered on the receiver right now
pub(crate) fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait (bounded) for the next event matching `pred`, discarding others
pub(crate) async fn next_matching(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Whether a matching event arrives within `window`
pub(crate) async fn arrives_within(
    rx: &mut broadcast::Receiver<Event>,
    window: Duration,
    pred: impl Fn(&Event) -> bool,
) -> bool {
    tokio::time::timeout(window, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return,
                Ok(_) => {}
                Err(_) => std::future::pending::<()>().await,
            }
        }
    })
    .await
    .is_ok()
}

pub(crate) fn is_stored(event: &Event) -> bool {
    matches!(event, Event::Stored { .. })
}

pub(crate) fn is_batch_complete(event: &Event) -> bool {
    matches!(event, Event::BatchComplete { .. })
}
