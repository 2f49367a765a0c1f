use anyhow::{Context, Result};

/// Runs a synchronous [`Db`](crate::db::port::Db) closure on Tokio's blocking
/// pool so async callers never stall a runtime worker on MySQL I/O.
///
/// Dropping the returned future detaches the closure; it still runs to
/// completion but its result is discarded.
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("blocking database task failed")?
}
