//! Fixed-size worker pool.
//!
//! Every remote call, every backoff wait and every resend runs on the pool's
//! worker threads. Its size is the only throttle: leaves submitted while all
//! workers are busy wait in the scheduler's queue.

use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::DispatchError;

const WORKER_THREAD_NAME: &str = "courier-worker";

#[derive(Debug)]
pub struct WorkerPool {
    runtime: Runtime,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, DispatchError> {
        if threads == 0 {
            return Err(DispatchError::EmptyPool);
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(WORKER_THREAD_NAME)
            .enable_all()
            .build()
            .map_err(DispatchError::PoolStart)?;

        tracing::debug!(threads, "Worker pool started");
        Ok(Self { runtime, threads })
    }

    /// Handle used by dispatchers to submit leaves.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// Drive `future` to completion from the calling thread.
    ///
    /// Blocks the caller. Must not be called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
