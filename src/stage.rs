//! Per-stage work queues with optional worker pools.
//!
//! A [`StageManager`] owns the FIFO queue for one stage. In synchronous mode the
//! caller drives it one request at a time with [`StageManager::run_one`]; in
//! concurrent mode [`StageManager::init_pool`] starts a dispatcher that drains the
//! queue onto at most `workers` concurrently running handler invocations.

use crate::types::{FileDescriptor, Stage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Download stage payload: nothing beyond the descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fetch;

/// Decode stage payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Raw bytes from the transfer
    pub bytes: Vec<u8>,
    /// Length the transfer layer announced, if any
    pub reported_length: Option<u64>,
}

/// Store stage payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Decoded bytes to persist
    pub bytes: Vec<u8>,
}

/// A descriptor plus the payload its current stage works on
#[derive(Debug, Clone)]
pub struct StageRequest<P> {
    /// The file this request belongs to
    pub descriptor: Arc<FileDescriptor>,
    /// Stage-specific payload
    pub payload: P,
}

impl<P> StageRequest<P> {
    /// Create a request
    pub fn new(descriptor: Arc<FileDescriptor>, payload: P) -> Self {
        Self {
            descriptor,
            payload,
        }
    }

    /// Carry the descriptor into the next stage with a new payload
    pub fn advance<Q>(self, payload: Q) -> StageRequest<Q> {
        StageRequest {
            descriptor: self.descriptor,
            payload,
        }
    }

    /// Relative path of the descriptor, for logging
    pub fn path(&self) -> &str {
        &self.descriptor.path
    }
}

/// Executes one request of a stage and fires its completion callback
///
/// The handler is responsible for everything that happens between dequeue and
/// completion; the manager only counts the request as done once `handle`
/// returns.
#[async_trait]
pub trait StageHandler<P: Send + 'static>: Send + Sync + 'static {
    /// Process one request
    async fn handle(&self, request: StageRequest<P>);
}

struct WorkerPool {
    workers: usize,
    stop: CancellationToken,
    dispatcher: JoinHandle<()>,
}

struct StageInner<P> {
    stage: Stage,
    queue: Mutex<VecDeque<StageRequest<P>>>,
    /// Queued plus in-flight requests
    pending: AtomicUsize,
    wake: Notify,
    pool: Mutex<Option<WorkerPool>>,
}

impl<P: Send + 'static> StageInner<P> {
    async fn next_request(&self) -> StageRequest<P> {
        loop {
            if let Some(request) = self.queue.lock().await.pop_front() {
                return request;
            }
            self.wake.notified().await;
        }
    }

    fn finish(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Queue and optional worker pool for one stage
pub struct StageManager<P> {
    inner: Arc<StageInner<P>>,
}

impl<P> Clone for StageManager<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Send + 'static> StageManager<P> {
    /// Create an idle manager with an empty queue and no pool
    pub fn new(stage: Stage) -> Self {
        Self {
            inner: Arc::new(StageInner {
                stage,
                queue: Mutex::new(VecDeque::new()),
                pending: AtomicUsize::new(0),
                wake: Notify::new(),
                pool: Mutex::new(None),
            }),
        }
    }

    /// Stage this manager serves
    pub fn stage(&self) -> Stage {
        self.inner.stage
    }

    /// Start a worker pool draining the queue with `handler`
    ///
    /// At most `workers` requests run at once; dequeue order is FIFO but
    /// completion order is not. The pool stops when `shutdown` is cancelled or
    /// [`StageManager::shutdown`] is called. Returns `false` without changing
    /// anything if a pool already exists.
    pub async fn init_pool<H>(
        &self,
        workers: usize,
        handler: Arc<H>,
        shutdown: &CancellationToken,
    ) -> bool
    where
        H: StageHandler<P>,
    {
        let mut pool = self.inner.pool.lock().await;
        if let Some(existing) = pool.as_ref() {
            tracing::warn!(
                stage = %self.inner.stage,
                workers = existing.workers,
                "worker pool already initialized"
            );
            return false;
        }

        let workers = workers.max(1);
        let stop = shutdown.child_token();
        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&self.inner),
            handler,
            Arc::new(Semaphore::new(workers)),
            stop.clone(),
        ));

        tracing::debug!(stage = %self.inner.stage, workers, "worker pool started");

        *pool = Some(WorkerPool {
            workers,
            stop,
            dispatcher,
        });
        true
    }

    /// Whether a worker pool is active
    pub async fn has_pool(&self) -> bool {
        self.inner.pool.lock().await.is_some()
    }

    /// Append a request to the tail of the queue
    ///
    /// With a pool this is enough for the request to be picked up; without one
    /// nothing runs until [`StageManager::run_one`] is called.
    pub async fn enqueue(&self, request: StageRequest<P>) {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        self.inner.queue.lock().await.push_back(request);
        self.inner.wake.notify_one();
    }

    /// Pop the oldest request and run it on the caller's task
    ///
    /// Returns `false` if the queue was empty, or if a pool owns the queue.
    pub async fn run_one<H>(&self, handler: &H) -> bool
    where
        H: StageHandler<P>,
    {
        if self.has_pool().await {
            tracing::warn!(stage = %self.inner.stage, "run_one ignored: worker pool active");
            return false;
        }

        let request = self.inner.queue.lock().await.pop_front();
        match request {
            Some(request) => {
                handler.handle(request).await;
                self.inner.finish();
                true
            }
            None => false,
        }
    }

    /// Requests queued or in flight (not yet returned from the handler)
    pub fn pending_count(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Requests waiting in the queue
    pub async fn queued_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Stop the worker pool, if any, and wait for its dispatcher to exit
    ///
    /// Requests already handed to a worker run to completion; queued requests
    /// stay queued.
    pub async fn shutdown(&self) {
        let pool = self.inner.pool.lock().await.take();
        if let Some(pool) = pool {
            pool.stop.cancel();
            if let Err(e) = pool.dispatcher.await {
                tracing::warn!(stage = %self.inner.stage, error = %e, "dispatcher task failed");
            }
        }
    }
}

async fn dispatch<P, H>(
    inner: Arc<StageInner<P>>,
    handler: Arc<H>,
    permits: Arc<Semaphore>,
    stop: CancellationToken,
) where
    P: Send + 'static,
    H: StageHandler<P>,
{
    loop {
        // Take a permit before dequeuing so an idle worker always gets the oldest request
        let permit = tokio::select! {
            _ = stop.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let request = tokio::select! {
            _ = stop.cancelled() => break,
            request = inner.next_request() => request,
        };

        let inner = Arc::clone(&inner);
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let _permit = permit;
            handler.handle(request).await;
            inner.finish();
        });
    }

    tracing::debug!(stage = %inner.stage, "dispatcher stopped");
}
