//! Thread pools that run the server's request handlers.
//!
//! The server hands every accepted connection to a [`ThreadPool`]. Two implementations are
//! provided: [`SharedQueueThreadPool`], a fixed set of worker threads pulling jobs from a shared
//! crossbeam channel, and [`RayonThreadPool`], backed by a rayon work stealing pool.
use crate::Result;

/// The functionality of a pool of worker threads
pub trait ThreadPool {
    /// creates a new thread pool with the given number of `threads`.
    ///
    /// # Errors
    /// returns an error if any thread fails to start
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// runs `job` on one of the pool's threads.
    ///
    /// Spawning always succeeds. A job that panics does not shrink the pool.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

mod rayon_pool;
mod shared_queue;

pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
