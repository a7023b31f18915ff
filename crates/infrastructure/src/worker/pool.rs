use ferrous_lb_application::ports::Dispatcher;
use ferrous_lb_domain::config::WorkerConfig;
use ferrous_lb_domain::DomainError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::slot::Slot;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Job queue of a single worker thread.
pub(crate) struct WorkerQueue {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Job>,
}

impl WorkerQueue {
    /// Queues `job` on the worker. Returns false when the worker has stopped,
    /// in which case the job is dropped without running.
    pub(crate) fn post(&self, job: Job) -> bool {
        self.sender.send(job).is_ok()
    }
}

/// Fixed set of worker threads, each running its own event loop.
///
/// Jobs posted to one worker run in FIFO order on that worker's thread. There
/// is no ordering between different workers.
pub struct WorkerPool {
    queues: Arc<[WorkerQueue]>,
    dispatchers: Vec<Dispatcher>,
    threads: Vec<JoinHandle<()>>,
    jobs_run: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn start(config: &WorkerConfig) -> Result<Self, DomainError> {
        if config.threads == 0 {
            return Err(DomainError::WorkerPool(
                "at least one worker thread is required".into(),
            ));
        }

        let shutdown = CancellationToken::new();
        let jobs_run = Arc::new(AtomicU64::new(0));
        let mut queues = Vec::with_capacity(config.threads);
        let mut dispatchers = Vec::with_capacity(config.threads);
        let mut threads = Vec::with_capacity(config.threads);

        for index in 0..config.threads {
            let name: Arc<str> = Arc::from(format!("{}-{}", config.name_prefix, index));
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let dispatcher = Dispatcher::new(Arc::clone(&name), index, runtime.handle().clone());
            let (sender, receiver) = mpsc::unbounded_channel();

            let thread = std::thread::Builder::new()
                .name(name.to_string())
                .spawn({
                    let dispatcher = dispatcher.clone();
                    let shutdown = shutdown.clone();
                    let jobs_run = Arc::clone(&jobs_run);
                    move || run_worker(runtime, dispatcher, receiver, jobs_run, shutdown)
                })?;

            queues.push(WorkerQueue { name, sender });
            dispatchers.push(dispatcher);
            threads.push(thread);
        }

        info!(workers = config.threads, "Worker pool started");

        Ok(Self {
            queues: Arc::from(queues),
            dispatchers,
            threads,
            jobs_run,
            shutdown,
        })
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn dispatchers(&self) -> &[Dispatcher] {
        &self.dispatchers
    }

    /// Jobs taken off the queues so far, across all workers. A job is counted
    /// before it runs.
    pub fn jobs_run(&self) -> u64 {
        self.jobs_run.load(Ordering::Relaxed)
    }

    /// Allocates a per-worker slot. Each worker builds its own value with
    /// `init` the first time the slot is accessed on that worker.
    pub fn allocate_slot<T, F>(&self, init: F) -> Slot<T>
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Slot::new(Arc::clone(&self.queues), init)
    }

    /// Queues `job` on worker `index`.
    pub fn post<F>(&self, index: usize, job: F) -> Result<(), DomainError>
    where
        F: FnOnce() + Send + 'static,
    {
        let queue = self
            .queues
            .get(index)
            .ok_or_else(|| DomainError::WorkerPool(format!("no worker with index {}", index)))?;
        if queue.post(Box::new(job)) {
            Ok(())
        } else {
            Err(DomainError::WorkerPool(format!("worker '{}' has stopped", queue.name)))
        }
    }

    /// Runs `job` on worker `index` and waits for its result.
    pub async fn run_on<R, F>(&self, index: usize, job: F) -> Result<R, DomainError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.post(index, move || {
            let _ = tx.send(job());
        })?;
        rx.await
            .map_err(|_| DomainError::WorkerPool(format!("job on worker {} did not complete", index)))
    }

    /// Stops every worker and waits for the threads to exit. Jobs still
    /// queued are dropped without running.
    pub fn shutdown(mut self) {
        self.shutdown.cancel();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                error!("Worker thread panicked during shutdown");
            }
        }
        info!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn run_worker(
    runtime: tokio::runtime::Runtime,
    dispatcher: Dispatcher,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    jobs_run: Arc<AtomicU64>,
    shutdown: CancellationToken,
) {
    dispatcher.install_current();
    debug!(worker = dispatcher.name(), "Worker started");

    runtime.block_on(async {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = jobs.recv() => match job {
                    Some(job) => {
                        jobs_run.fetch_add(1, Ordering::Relaxed);
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            error!(worker = dispatcher.name(), "Worker job panicked");
                        }
                    }
                    None => break,
                },
            }
        }
    });

    debug!(worker = dispatcher.name(), "Worker stopped");
}
