//! In-process backend driver
//!
//! Emulates a document store closely enough to exercise every path of the
//! client without a server:
//!
//! - buckets of raw JSON bodies, optionally created on first connect
//! - optional credentials, checked at connect
//! - policy-aware stores (add / replace / set)
//! - get-and-lock with expiry; stores from other sessions see `KeyExists`
//!   while the lock is held, a second lock attempt sees `Locked`
//! - configurable response latency and random jitter
//! - one-shot fault injection per key
//!
//! # Design
//!
//! - [`MemoryCluster`]: shared data (`DashMap` of buckets), thread-safe so
//!   several clients can point at it
//! - [`MemoryBackend`]: one session's request queue, ordered by the instant
//!   each response becomes available
//!
//! Requests take effect when their response is delivered from
//! [`Backend::wait`], not when they are submitted.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::Rng;
use tracing::trace;

use dockv_core::{BackendStatus, OperationId, StorePolicy};

use super::{Backend, Completion, ConnectParams, FetchCommand, StoreCommand, Wakeup};
use crate::config::{MemoryOptions, MAX_MEMORY_DELAY_US};

/// Name selecting this driver in [`ClientConfig::backend`](crate::ClientConfig)
pub const DRIVER_NAME: &str = "memory";

/// Largest body a store accepts
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Clusters handed out by [`MemoryCluster::shared`], one per host name
static SHARED_CLUSTERS: Lazy<DashMap<String, Arc<MemoryCluster>>> = Lazy::new(DashMap::new);

/// The shared state of an emulated server
#[derive(Debug)]
pub struct MemoryCluster {
    buckets: DashMap<String, Arc<MemoryBucket>>,
    credentials: RwLock<Option<(String, Option<String>)>>,
    auto_create: bool,
    next_session: AtomicU64,
}

impl MemoryCluster {
    /// Create an empty cluster that creates buckets on first connect
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            credentials: RwLock::new(None),
            auto_create: true,
            next_session: AtomicU64::new(1),
        }
    }

    /// Create an empty cluster that only serves buckets made with
    /// [`create_bucket`](Self::create_bucket)
    pub fn strict() -> Self {
        Self {
            auto_create: false,
            ..Self::new()
        }
    }

    /// Process-wide cluster for `host`, created on first use
    pub fn shared(host: &str) -> Arc<Self> {
        let entry = SHARED_CLUSTERS
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(MemoryCluster::new()));
        Arc::clone(&*entry)
    }

    /// Require these credentials from every connecting session
    pub fn require_credentials(&self, user: impl Into<String>, password: Option<String>) {
        *self.credentials.write() = Some((user.into(), password));
    }

    /// Create a bucket if it does not exist yet
    pub fn create_bucket(&self, name: &str) -> Arc<MemoryBucket> {
        let entry = self
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::default()));
        Arc::clone(&*entry)
    }

    /// Look up an existing bucket
    pub fn bucket(&self, name: &str) -> Option<Arc<MemoryBucket>> {
        self.buckets.get(name).map(|b| Arc::clone(&*b))
    }

    fn authenticate(&self, params: &ConnectParams) -> Result<(), BackendStatus> {
        match &*self.credentials.read() {
            None => Ok(()),
            Some((user, password)) => {
                if params.user.as_deref() == Some(user.as_str()) && params.password == *password {
                    Ok(())
                } else {
                    Err(BackendStatus::AuthFailure)
                }
            }
        }
    }

    fn open_bucket(&self, name: &str) -> Result<Arc<MemoryBucket>, BackendStatus> {
        if self.auto_create {
            Ok(self.create_bucket(name))
        } else {
            self.bucket(name).ok_or(BackendStatus::BucketNotFound)
        }
    }

    fn new_session(&self) -> u64 {
        self.next_session.fetch_add(1, AtomicOrdering::SeqCst)
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    body: Vec<u8>,
    lock: Option<DocumentLock>,
}

#[derive(Debug, Clone, Copy)]
struct DocumentLock {
    session: u64,
    until: Instant,
}

impl StoredDocument {
    fn lock_holder(&self, now: Instant) -> Option<u64> {
        self.lock
            .filter(|lock| lock.until > now)
            .map(|lock| lock.session)
    }
}

/// One namespace of documents
#[derive(Debug, Default)]
pub struct MemoryBucket {
    documents: DashMap<String, StoredDocument>,
    faults: DashMap<String, BackendStatus>,
}

impl MemoryBucket {
    /// Raw stored body of `key`
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.documents.get(key).map(|doc| doc.body.clone())
    }

    /// Overwrite `key` with a raw body, bypassing policies and locks
    pub fn insert_raw(&self, key: &str, body: impl Into<Vec<u8>>) {
        self.documents.insert(
            key.to_string(),
            StoredDocument {
                body: body.into(),
                lock: None,
            },
        );
    }

    /// Check if `key` exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    /// Check if `key` currently holds an unexpired lock
    pub fn is_locked(&self, key: &str) -> bool {
        self.documents
            .get(key)
            .map(|doc| doc.lock_holder(Instant::now()).is_some())
            .unwrap_or(false)
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the bucket holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Make the next request touching `key` complete with `status`
    pub fn inject_fault(&self, key: &str, status: BackendStatus) {
        self.faults.insert(key.to_string(), status);
    }

    fn take_fault(&self, key: &str) -> Option<BackendStatus> {
        self.faults.remove(key).map(|(_, status)| status)
    }

    fn apply_store(&self, session: u64, command: StoreCommand) -> BackendStatus {
        if let Some(status) = self.take_fault(&command.key) {
            return status;
        }
        if command.body.len() > MAX_DOCUMENT_BYTES {
            return BackendStatus::ValueTooLarge;
        }

        let now = Instant::now();
        match self.documents.entry(command.key) {
            Entry::Occupied(mut entry) => {
                let locked_by_other = entry
                    .get()
                    .lock_holder(now)
                    .map(|holder| holder != session)
                    .unwrap_or(false);
                if locked_by_other || command.policy == StorePolicy::AddIfAbsent {
                    return BackendStatus::KeyExists;
                }
                // a successful store releases the lock
                *entry.get_mut() = StoredDocument {
                    body: command.body,
                    lock: None,
                };
                BackendStatus::Success
            }
            Entry::Vacant(entry) => {
                if command.policy == StorePolicy::ReplaceIfPresent {
                    return BackendStatus::KeyNotFound;
                }
                entry.insert(StoredDocument {
                    body: command.body,
                    lock: None,
                });
                BackendStatus::Success
            }
        }
    }

    fn apply_fetch(&self, session: u64, command: FetchCommand) -> Result<Vec<u8>, BackendStatus> {
        if let Some(status) = self.take_fault(&command.key) {
            return Err(status);
        }

        let mut doc = self
            .documents
            .get_mut(&command.key)
            .ok_or(BackendStatus::KeyNotFound)?;

        if let Some(duration) = command.lock {
            let now = Instant::now();
            if doc.lock_holder(now).is_some() {
                return Err(BackendStatus::Locked);
            }
            doc.lock = Some(DocumentLock {
                session,
                until: now + duration,
            });
        }
        Ok(doc.body.clone())
    }
}

#[derive(Debug)]
enum Request {
    Store(StoreCommand),
    Fetch(FetchCommand),
}

#[derive(Debug)]
struct Queued {
    ready_at: Instant,
    seq: u64,
    id: OperationId,
    request: Request,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

/// One session against a [`MemoryCluster`]
#[derive(Debug)]
pub struct MemoryBackend {
    cluster: Arc<MemoryCluster>,
    bucket: Option<Arc<MemoryBucket>>,
    session: u64,
    latency: Duration,
    jitter: Duration,
    queue: BinaryHeap<Reverse<Queued>>,
    next_seq: u64,
}

fn max_delay() -> Duration {
    Duration::from_micros(MAX_MEMORY_DELAY_US)
}

impl MemoryBackend {
    /// Create an unconnected session with immediate responses
    pub fn new(cluster: Arc<MemoryCluster>) -> Self {
        Self {
            cluster,
            bucket: None,
            session: 0,
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Create a session tuned by `options`
    pub fn from_options(cluster: Arc<MemoryCluster>, options: &MemoryOptions) -> Self {
        Self::new(cluster)
            .with_latency(options.latency())
            .with_jitter(options.jitter())
    }

    /// Delay every response by `latency`, capped at [`MAX_MEMORY_DELAY_US`]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency.min(max_delay());
        self
    }

    /// Add up to `jitter` of random delay to every response, capped like
    /// the latency
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter.min(max_delay());
        self
    }

    fn enqueue(&mut self, id: OperationId, request: Request) -> Result<(), BackendStatus> {
        if self.bucket.is_none() {
            return Err(BackendStatus::NotConnected);
        }
        let mut delay = self.latency;
        if !self.jitter.is_zero() {
            let bound = u64::try_from(self.jitter.as_micros()).unwrap_or(MAX_MEMORY_DELAY_US);
            let extra = rand::thread_rng().gen_range(0..=bound);
            delay = delay.saturating_add(Duration::from_micros(extra));
        }
        let now = Instant::now();
        let ready_at = now
            .checked_add(delay)
            .or_else(|| now.checked_add(max_delay()))
            .unwrap_or(now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Queued {
            ready_at,
            seq,
            id,
            request,
        }));
        Ok(())
    }

    fn execute(&self, queued: Queued) -> Completion {
        let (status, body) = match &self.bucket {
            None => (BackendStatus::NotConnected, None),
            Some(bucket) => match queued.request {
                Request::Store(command) => (bucket.apply_store(self.session, command), None),
                Request::Fetch(command) => match bucket.apply_fetch(self.session, command) {
                    Ok(body) => (BackendStatus::Success, Some(body)),
                    Err(status) => (status, None),
                },
            },
        };
        trace!(id = %queued.id, %status, "memory backend completed request");
        Completion {
            id: queued.id,
            status,
            body,
        }
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn connect(&mut self, params: &ConnectParams) -> Result<(), BackendStatus> {
        self.cluster.authenticate(params)?;
        self.bucket = Some(self.cluster.open_bucket(&params.bucket)?);
        self.session = self.cluster.new_session();
        Ok(())
    }

    fn store(&mut self, id: OperationId, command: StoreCommand) -> Result<(), BackendStatus> {
        self.enqueue(id, Request::Store(command))
    }

    fn fetch(&mut self, id: OperationId, command: FetchCommand) -> Result<(), BackendStatus> {
        self.enqueue(id, Request::Fetch(command))
    }

    fn wait(&mut self, deadline: Option<Instant>) -> Wakeup {
        let ready_at = match self.queue.peek() {
            Some(Reverse(next)) => next.ready_at,
            None => return Wakeup::Idle,
        };

        let now = Instant::now();
        if ready_at > now {
            match deadline {
                Some(deadline) if deadline < ready_at => {
                    if deadline > now {
                        thread::sleep(deadline - now);
                    }
                    return Wakeup::TimedOut;
                }
                _ => thread::sleep(ready_at - now),
            }
        }

        match self.queue.pop() {
            Some(Reverse(queued)) => Wakeup::Completed(self.execute(queued)),
            None => Wakeup::Idle,
        }
    }

    fn in_flight(&self) -> usize {
        self.queue.len()
    }

    fn disconnect(&mut self) {
        self.queue.clear();
        self.bucket = None;
    }
}
