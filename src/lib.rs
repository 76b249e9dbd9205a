//! Follow a file the way `tail -n 0 -F` does, without losing data across
//! log rotation.
//!
//! The follower keeps draining the descriptor it already holds after the
//! path is renamed, removed or replaced, and switches to the new file
//! only once the old one is exhausted. Rotation performed by an external
//! tool therefore cannot drop the bytes written between the rename and
//! the reopen.
//!
//! Supported path types: regular file, FIFO (unix) and symlink to
//! either. In-place truncation is not detected — it cannot be recognized
//! reliably from size alone on every supported platform — so a truncated
//! file keeps being read from the old offset.
//!
//! # Example
//!
//! ```rust,no_run
//! use tailf::{follow, CancellationToken, FollowOptions, StderrLogger};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cancel = CancellationToken::new();
//!     let mut tail = follow(cancel.clone(), StderrLogger, "app.log", FollowOptions::new());
//!
//!     let mut buf = vec![0u8; 4096];
//!     loop {
//!         match tail.pull(&mut buf).await {
//!             Ok(n) => print!("{}", String::from_utf8_lossy(&buf[..n])),
//!             Err(err) if err.is_end_of_stream() => break,
//!             Err(err) => eprintln!("tail: {err}"),
//!         }
//!     }
//! }
//! ```

mod error;
mod logger;
mod options;
mod platform;
mod stream;
mod tail;
mod tracked;

#[cfg(test)]
mod test_helpers;

pub use error::{Error, Result};
pub use logger::{Logger, StderrLogger, TracingLogger};
pub use options::{FollowOptions, Whence, DEFAULT_POLL_DELAY, DEFAULT_POLL_TIMEOUT};
pub use stream::TailStream;
pub use tail::Tail;

// Cancellation is part of the public surface; re-export it so callers do
// not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;

use std::path::Path;
use std::sync::Arc;

/// Starts following `path` using polling.
///
/// If the path already exists as a regular file, tracking begins at the
/// position selected by [`FollowOptions::whence`] (the end by default).
/// A failure to open the path is logged and retried from the first
/// [`pull`](Tail::pull) rather than returned here.
///
/// Cancelling `cancel` closes the descriptor underneath any pending read
/// and makes every later pull report end-of-stream.
///
/// Must be called from within a tokio runtime: each opened descriptor
/// spawns a cancellation watcher task.
pub fn follow(
    cancel: CancellationToken,
    log: impl Logger + Send + Sync + 'static,
    path: impl AsRef<Path>,
    options: FollowOptions,
) -> Tail {
    Tail::new(cancel, Arc::new(log), path.as_ref().to_path_buf(), options)
}

/// Follows `path` as an async stream of pulled byte chunks.
///
/// The follower stops when `cancel` fires or the stream is dropped.
pub fn follow_stream(
    cancel: &CancellationToken,
    log: impl Logger + Send + Sync + 'static,
    path: impl AsRef<Path>,
    options: FollowOptions,
) -> TailStream {
    TailStream::new(cancel, log, path, options)
}
