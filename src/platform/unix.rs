use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::Path;

/// File identity: device and inode from a stat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileId {
    dev: u64,
    ino: u64,
}

/// Opens `path` for streaming reads.
///
/// Read/write access plus `O_NONBLOCK` is load-bearing: a read-only open
/// of a FIFO blocks until a writer appears, blocking mode would keep a
/// close from interrupting a pending read, and holding write access keeps
/// at least one writer attached to a FIFO so reads report "no data yet"
/// instead of end-of-stream.
pub(crate) fn open_for_follow(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Creates the tracked target. Test support.
#[cfg(test)]
pub(crate) fn create_file(path: &Path) -> io::Result<File> {
    File::create(path)
}

/// Identity of an open descriptor, from the descriptor itself.
pub(crate) fn file_id(file: &File) -> io::Result<FileId> {
    file.metadata().map(|meta| id_of(&meta))
}

/// Identity of whatever currently lives at `path`. Resolves symlinks and
/// never opens the file, so it is safe on a FIFO with no writers.
pub(crate) fn path_id(path: &Path) -> io::Result<FileId> {
    fs::metadata(path).map(|meta| id_of(&meta))
}

fn id_of(meta: &Metadata) -> FileId {
    FileId {
        dev: meta.dev(),
        ino: meta.ino(),
    }
}
