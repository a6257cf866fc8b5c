//! Minimal background task plumbing for the few operations that leave the
//! UI thread (remote fetches and background removal).
//!
//! Native targets run the future on a worker thread; the web target spawns
//! it on the browser's event loop. Either way the result lands in a shared
//! slot that the UI polls once per frame.

use futures::FutureExt as _;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
pub type TaskFuture<T> = futures::future::BoxFuture<'static, T>;

#[cfg(target_arch = "wasm32")]
pub type TaskFuture<T> = futures::future::LocalBoxFuture<'static, T>;

#[cfg(not(target_arch = "wasm32"))]
pub fn boxed<F>(future: F) -> TaskFuture<F::Output>
where
    F: Future + Send + 'static,
{
    future.boxed()
}

#[cfg(target_arch = "wasm32")]
pub fn boxed<F>(future: F) -> TaskFuture<F::Output>
where
    F: Future + 'static,
{
    future.boxed_local()
}

/// A future running in the background whose output can be polled without blocking
pub struct BackgroundTask<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> std::fmt::Debug for BackgroundTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("finished", &self.slot.lock().is_some())
            .finish()
    }
}

impl<T: Send + 'static> BackgroundTask<T> {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn spawn(future: TaskFuture<T>) -> Self {
        let slot = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&slot);
        std::thread::spawn(move || {
            let output = futures::executor::block_on(future);
            *worker_slot.lock() = Some(output);
        });
        Self { slot }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn spawn(future: TaskFuture<T>) -> Self {
        let slot = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&slot);
        wasm_bindgen_futures::spawn_local(async move {
            let output = future.await;
            *worker_slot.lock() = Some(output);
        });
        Self { slot }
    }

    /// A task that has already finished
    pub fn ready(output: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(output))),
        }
    }

    /// Take the output if the future has completed
    pub fn poll(&self) -> Option<T> {
        self.slot.lock().take()
    }
}
