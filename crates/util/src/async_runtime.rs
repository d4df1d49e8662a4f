//! Async runtime helpers for blocking callers.
//!
//! This module provides a single entry point for executing async futures from
//! synchronous code paths, reusing the current Tokio runtime when available.

use anyhow::anyhow;
use std::future::Future;
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    task,
};

/// Execute an async future from synchronous code.
///
/// # Arguments
/// - `future`: The future to run to completion.
///
/// # Returns
/// Returns the future's output or an error if no usable Tokio runtime exists.
///
/// # Notes
/// - Reuses the current runtime when it is multi-threaded.
/// - Refuses to run inside a current-thread runtime, where blocking would deadlock.
/// - Falls back to a single-threaded runtime for call sites outside Tokio.
pub fn block_on_future<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = T>,
{
    if let Ok(handle) = Handle::try_current() {
        if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(anyhow!("cannot block inside a current-thread Tokio runtime"));
        }
        Ok(task::block_in_place(|| handle.block_on(future)))
    } else {
        Ok(tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| anyhow!(error))?
            .block_on(future))
    }
}
