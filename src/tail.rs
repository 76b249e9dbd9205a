//! The follow engine: drives reads, polling, re-open and the rotation
//! handoff behind a single pull operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::options::FollowOptions;
use crate::tracked::TrackedFile;

/// What the previous pull left behind, kept across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastPull {
    /// Data or nothing was returned; the next pull arms a fresh timeout.
    Clean,
    /// An error was surfaced; the next pull retries without a timeout so
    /// the caller is not charged extra latency for an error it saw.
    Errored,
    /// End-of-stream was reported; every later pull reports it again.
    Done,
}

/// A follower with `tail -n 0 -F` behaviour.
///
/// Unlike `tail` it keeps reading a renamed or removed file until a new
/// file is created under the original name, so rotation performed by an
/// external tool cannot lose the bytes appended between the rename and
/// the reopen.
///
/// In-place truncation is not supported: it cannot be detected reliably
/// from size alone on all supported platforms, so the follower ignores
/// it.
pub struct Tail {
    cancel: CancellationToken,
    log: Arc<dyn Logger + Send + Sync>,
    path: PathBuf,
    poll_delay: Duration,
    poll_timeout: Duration,
    file: TrackedFile,
    next: Option<TrackedFile>,
    last: LastPull,
}

impl Tail {
    /// Starts tracking `path`. If the path exists as a regular file,
    /// tracking begins at the position selected by the whence option (the
    /// end by default). An initial open failure is logged, not returned;
    /// the first pull retries it.
    pub(crate) fn new(
        cancel: CancellationToken,
        log: Arc<dyn Logger + Send + Sync>,
        path: PathBuf,
        options: FollowOptions,
    ) -> Self {
        let mut tail = Self {
            file: TrackedFile::new(cancel.clone(), path.clone()),
            next: None,
            last: LastPull::Clean,
            cancel,
            log,
            path,
            poll_delay: options.poll_delay,
            poll_timeout: options.poll_timeout,
        };

        let mut err = tail.file.open().err().map(Error::from);
        if err.is_none() && tail.file.is_regular() {
            if let Err(seek_err) = tail.file.seek(options.whence.into()) {
                tail.file.close();
                err = Some(seek_err);
            }
        }
        if let Some(err) = err {
            tail.log.print(format_args!(
                "tail: cannot open {:?} for reading: {}",
                tail.path, err
            ));
        }

        tail
    }

    /// The path under observation.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns data appended to the followed path, waiting for more when
    /// none is available yet and chasing replacements across rotation.
    ///
    /// A successful call yields at least one byte; chunks are not aligned
    /// on line boundaries. `Ok(0)` is returned only for an empty buffer.
    /// After cancellation every call returns [`Error::EndOfStream`]; after
    /// any other error the next call resumes recovery and returns either
    /// data or end-of-stream. Must not be called concurrently with itself.
    pub async fn pull(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.last == LastPull::Done {
            return Err(Error::EndOfStream);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = match self.last {
            LastPull::Clean => Some(Instant::now() + self.poll_timeout),
            _ => None,
        };
        self.last = LastPull::Clean;

        if !self.file.is_open() {
            if let Err(err) = self.wait_open(deadline).await {
                return Err(self.surface(err));
            }
        }

        loop {
            match self.drain(deadline, buf).await {
                Ok(0) => {} // poll delay elapsed, try again
                Ok(n) => return Ok(n),
                Err(err) => return Err(self.surface(err)),
            }
        }
    }

    /// Records the error classification so the next pull knows whether to
    /// arm a timeout, then hands the error back for returning.
    fn surface(&mut self, err: Error) -> Error {
        self.last = if err.is_end_of_stream() {
            LastPull::Done
        } else {
            LastPull::Errored
        };
        err
    }

    /// Retries opening the current file until it succeeds, the deadline
    /// expires or the follow is cancelled. The inaccessibility notice is
    /// logged on the first failed attempt only.
    async fn wait_open(&mut self, deadline: Option<Instant>) -> Result<()> {
        let mut notified = false;
        loop {
            let err = match self.file.open() {
                Ok(()) => {
                    self.log.print(format_args!(
                        "tail: {:?} has appeared;  following new file",
                        self.path
                    ));
                    return Ok(());
                }
                Err(err) => err,
            };
            if !notified {
                self.log.print(format_args!(
                    "tail: {:?} has become inaccessible: {}",
                    self.path, err
                ));
                notified = true;
            }
            tokio::select! {
                _ = time::sleep(self.poll_delay) => {}
                _ = expire(deadline) => return Err(err.into()),
                _ = self.cancel.cancelled() => return Err(Error::EndOfStream),
            }
        }
    }

    /// Rotation readiness: once the current file is detached, start
    /// tracking the path again as the pending file; retry a pending that
    /// failed to open; discard a pending that turned out to be the
    /// reattached current inode (a stat race, not a rotation).
    fn open_next(&mut self) -> Option<Error> {
        if self.next.is_none() {
            if !self.file.is_detached() {
                return None;
            }
            let mut next = TrackedFile::new(self.cancel.clone(), self.path.clone());
            let result = next.open();
            match &result {
                Ok(()) => self.log.print(format_args!(
                    "tail: {:?} has been replaced;  following new file",
                    self.path
                )),
                Err(err) => self.log.print(format_args!(
                    "tail: {:?} has become inaccessible: {}",
                    self.path, err
                )),
            }
            self.next = Some(next);
            return result.err().map(Error::from);
        }

        let Some(mut next) = self.next.take() else {
            return None;
        };
        if !next.is_open() {
            let result = next.open();
            if result.is_ok() {
                self.log.print(format_args!(
                    "tail: {:?} has appeared;  following new file",
                    self.path
                ));
            }
            self.next = Some(next);
            return result.err().map(Error::from);
        }
        if next.same_file_as(&self.file) && !self.file.is_detached() {
            // Dropping the pending closes it; the current descriptor is
            // already reading this inode.
            return None;
        }
        self.next = Some(next);
        None
    }

    /// One drain attempt on the current file. Returns data immediately;
    /// hands off to an open pending file when the current one is
    /// exhausted; otherwise waits out the poll delay. `Ok(0)` means the
    /// delay elapsed and the caller should retry.
    async fn drain(&mut self, deadline: Option<Instant>, buf: &mut [u8]) -> Result<usize> {
        let mut local: Option<Error>;
        loop {
            let open_err = self.open_next();
            match self.file.read(buf) {
                Ok(n) if n > 0 => return Ok(n),
                Ok(_) => {
                    // End of the current inode. If the replacement is
                    // already open, finish with this descriptor and drain
                    // the new file from its beginning.
                    if let Some(next) = self.next.take() {
                        if next.is_open() {
                            self.file.close();
                            self.file = next;
                            continue;
                        }
                        self.next = Some(next);
                    }
                    local = open_err;
                    break;
                }
                Err(Error::Closed) => return Err(Error::EndOfStream),
                Err(err) if err.is_would_block() => {
                    // Non-blocking FIFO with nothing buffered: no data now.
                    local = None;
                    break;
                }
                Err(err) => {
                    self.log.print(format_args!(
                        "tail: error reading {:?}: {}",
                        self.path, err
                    ));
                    local = Some(err);
                    break;
                }
            }
        }

        // The timeout only gates how long to sit on a pending error; an
        // idle wait with nothing wrong never expires.
        let deadline = if local.is_some() { deadline } else { None };
        tokio::select! {
            _ = time::sleep(self.poll_delay) => Ok(0),
            _ = expire(deadline) => match local.take() {
                Some(err) => Err(err),
                None => Ok(0),
            },
            _ = self.cancel.cancelled() => Err(Error::EndOfStream),
        }
    }
}

/// Sleeps until the deadline; pends forever when no deadline is armed.
async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => futures::future::pending().await,
    }
}
