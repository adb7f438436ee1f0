use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, instrument};

use super::ThreadPool;
use crate::Result;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool implemented with a shared job queue (i.e. channel).
///
/// This implementation uses the MPMC [`channel`] provided by the crossbeam crate, as a single
/// producer (the pool itself) with the worker threads as consumers.
///
/// If a job panics, the worker thread running it is replaced by a new one, so the number of
/// workers stays fixed. A failure to start a replacement thread is logged and the pool shrinks
/// by one.
///
/// [`channel`]: https://docs.rs/crossbeam/0.8.1/crossbeam/channel/index.html
pub struct SharedQueueThreadPool {
    /// the sending part of the channel
    tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    /// create a new thread pool with the given number of `threads`.
    /// Every thread created will have a handle to the receiving end of the channel
    fn new(threads: u32) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<Job>();
        for i in 0..threads {
            let task_rx = TaskReceiver(rx.clone());
            thread::Builder::new()
                .name(format!("tabledb-worker-{}", i))
                .spawn(move || run_tasks(task_rx))?;
        }
        debug!("created shared queue thread pool with {} threads", threads);
        Ok(SharedQueueThreadPool { tx })
    }

    /// Spawns a function into the thread pool.
    ///
    /// If every worker is gone the job is dropped and an error is logged.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            error!("There are no threads in the pool, job dropped");
        }
    }
}

/// A type that can receive tasks (i.e. closures) from a channel and run them.
/// Additionally, this type is responsible for restarting any threads that panicked
#[derive(Clone)]
struct TaskReceiver(Receiver<Job>);

impl Drop for TaskReceiver {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!("worker panicked, starting a new thread");
            let task_rx = self.clone();
            if let Err(e) = thread::Builder::new().spawn(move || run_tasks(task_rx)) {
                error!("Failed to spawn a thread: {}", e);
            }
        }
    }
}

/// waits for a task to arrive on its (wrapped) receiver, and then runs the task.
/// Returns once the pool has been dropped.
#[instrument(skip(rx))]
fn run_tasks(rx: TaskReceiver) {
    loop {
        match rx.0.recv() {
            Ok(task) => {
                debug!("received a new task");
                task();
            }
            Err(_) => {
                debug!("Thread exited because the thread pool was destroyed.");
                break;
            }
        }
    }
}
