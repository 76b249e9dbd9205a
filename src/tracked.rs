//! Tracked file: an open descriptor plus the identity captured at open
//! time, with cancellation wired to close the descriptor.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::platform;

/// Identity and shape of the file at the moment it was opened.
#[derive(Debug)]
struct Snapshot {
    id: platform::FileId,
    regular: bool,
}

/// An open descriptor bound to the path it came from.
///
/// The descriptor stays readable after the path is renamed or removed;
/// [`is_detached`](TrackedFile::is_detached) reports when the path has
/// moved on to a different inode so the follow loop can start chasing the
/// replacement. The descriptor slot is shared with a watcher task that
/// empties it when cancellation fires, which both releases the resource
/// and interrupts a pending read.
pub(crate) struct TrackedFile {
    path: PathBuf,
    cancel: CancellationToken,
    guard: Option<CancellationToken>,
    slot: Arc<Mutex<Option<File>>>,
    snapshot: Option<Snapshot>,
}

fn lock(slot: &Mutex<Option<File>>) -> MutexGuard<'_, Option<File>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TrackedFile {
    /// Constructs an unopened tracked file. `cancel` is the engine-level
    /// token; each successful open derives a private child from it.
    pub(crate) fn new(cancel: CancellationToken, path: PathBuf) -> Self {
        Self {
            path,
            cancel,
            guard: None,
            slot: Arc::new(Mutex::new(None)),
            snapshot: None,
        }
    }

    /// Opens the descriptor and captures its identity.
    ///
    /// The identity is read from the descriptor, not the path, so both are
    /// guaranteed to describe the same inode. On success a watcher task is
    /// spawned that closes the descriptor when cancellation fires,
    /// unblocking any read in progress. On failure the descriptor, if any
    /// was opened, is dropped before returning.
    pub(crate) fn open(&mut self) -> io::Result<()> {
        let file = platform::open_for_follow(&self.path)?;
        let regular = file.metadata()?.file_type().is_file();
        let id = platform::file_id(&file)?;

        let guard = self.cancel.child_token();
        let slot = Arc::new(Mutex::new(Some(file)));
        let watched = Arc::clone(&slot);
        let fired = guard.clone();
        tokio::spawn(async move {
            fired.cancelled().await;
            lock(&watched).take();
        });

        self.slot = slot;
        self.snapshot = Some(Snapshot { id, regular });
        self.guard = Some(guard);
        Ok(())
    }

    /// Reads from the descriptor. `Ok(0)` is end-of-stream on a regular
    /// file; a non-blocking FIFO with nothing buffered reports
    /// `WouldBlock` instead. An emptied slot reports [`Error::Closed`].
    pub(crate) fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut slot = lock(&self.slot);
        let Some(file) = slot.as_mut() else {
            return Err(Error::Closed);
        };
        loop {
            match file.read(buf) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
                Ok(n) => return Ok(n),
            }
        }
    }

    /// Repositions the descriptor; used for the initial whence seek.
    pub(crate) fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let mut slot = lock(&self.slot);
        match slot.as_mut() {
            Some(file) => Ok(file.seek(pos)?),
            None => Err(Error::Closed),
        }
    }

    /// Drops the descriptor and identity and fires the private
    /// cancellation. Idempotent.
    pub(crate) fn close(&mut self) {
        lock(&self.slot).take();
        self.snapshot = None;
        if let Some(guard) = self.guard.take() {
            guard.cancel();
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// True when the open-time mode bits describe a regular file, meaning
    /// the initial whence seek is meaningful.
    pub(crate) fn is_regular(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|snapshot| snapshot.regular)
    }

    /// Stats the path (not the descriptor): true when the path is gone or
    /// now holds a different inode than the one opened here. Any stat
    /// error counts as detached. Detachment means a replacement should be
    /// looked for, not that reading must stop.
    pub(crate) fn is_detached(&self) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return true;
        };
        match platform::path_id(&self.path) {
            Ok(id) => id != snapshot.id,
            Err(_) => true,
        }
    }

    /// True when both tracked files were opened on the same inode.
    pub(crate) fn same_file_as(&self, other: &TrackedFile) -> bool {
        match (&self.snapshot, &other.snapshot) {
            (Some(a), Some(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Drop for TrackedFile {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use crate::platform::create_file;

    struct Target {
        _dir: tempfile::TempDir,
        path: PathBuf,
        writer: File,
    }

    fn target() -> Target {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.log");
        let writer = create_file(&path).unwrap();
        Target {
            _dir: dir,
            path,
            writer,
        }
    }

    #[tokio::test]
    async fn test_open_captures_regular_identity() {
        let target = target();
        let mut tracked = TrackedFile::new(CancellationToken::new(), target.path.clone());

        assert!(!tracked.is_open());
        tracked.open().unwrap();
        assert!(tracked.is_open());
        assert!(tracked.is_regular());
        assert!(!tracked.is_detached());
    }

    #[tokio::test]
    async fn test_read_returns_appended_bytes() {
        let mut target = target();
        let mut tracked = TrackedFile::new(CancellationToken::new(), target.path.clone());
        tracked.open().unwrap();

        target.writer.write_all(b"hello").unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(tracked.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        // Regular file at end-of-stream.
        assert_eq!(tracked.read(&mut buf).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_read_reports_closed() {
        let target = target();
        let mut tracked = TrackedFile::new(CancellationToken::new(), target.path.clone());
        tracked.open().unwrap();

        tracked.close();
        tracked.close();

        assert!(!tracked.is_open());
        let mut buf = [0u8; 4];
        assert!(matches!(tracked.read(&mut buf), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_detached_after_rename() {
        let target = target();
        let mut tracked = TrackedFile::new(CancellationToken::new(), target.path.clone());
        tracked.open().unwrap();

        let aside = target.path.with_extension("rotated");
        std::fs::rename(&target.path, &aside).unwrap();
        assert!(tracked.is_detached());

        // The renamed inode is still readable through the descriptor.
        let mut buf = [0u8; 4];
        assert_eq!(tracked.read(&mut buf).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_detached_after_replacement() {
        let target = target();
        let mut tracked = TrackedFile::new(CancellationToken::new(), target.path.clone());
        tracked.open().unwrap();

        std::fs::remove_file(&target.path).unwrap();
        let _replacement = create_file(&target.path).unwrap();
        assert!(tracked.is_detached());
    }

    #[tokio::test]
    async fn test_cancellation_closes_descriptor() {
        let target = target();
        let cancel = CancellationToken::new();
        let mut tracked = TrackedFile::new(cancel.clone(), target.path.clone());
        tracked.open().unwrap();

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!tracked.is_open());
        let mut buf = [0u8; 4];
        assert!(matches!(tracked.read(&mut buf), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_same_file_as_tracks_inode() {
        let target = target();
        let cancel = CancellationToken::new();
        let mut first = TrackedFile::new(cancel.clone(), target.path.clone());
        let mut second = TrackedFile::new(cancel.clone(), target.path.clone());
        first.open().unwrap();
        second.open().unwrap();
        assert!(first.same_file_as(&second));

        std::fs::remove_file(&target.path).unwrap();
        let _replacement = create_file(&target.path).unwrap();
        let mut third = TrackedFile::new(cancel, target.path.clone());
        third.open().unwrap();
        assert!(!first.same_file_as(&third));
    }
}
