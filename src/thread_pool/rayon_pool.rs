use tracing::debug;

use super::ThreadPool;
use crate::{Result, TableError};

/// A thread pool that uses a work stealing strategy as implemented by the [`Rayon`] library.
///
/// Jobs are queued onto the pool with `spawn`, so the caller never blocks on them.
///
/// [`Rayon`]: https://docs.rs/rayon/latest/rayon/index.html
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("tabledb-rayon-{}", i))
            .build()
            .map_err(|e| TableError::Config(format!("could not build thread pool: {:?}", &e)))?;
        debug!("created rayon thread pool with {} threads", &threads);

        Ok(Self { pool })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // rayon aborts the process when a spawned job panics
        self.pool.spawn(move || {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).is_err() {
                debug!("job panicked");
            }
        });
    }
}
