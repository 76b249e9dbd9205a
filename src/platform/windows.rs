use std::fs::{File, OpenOptions};
use std::io;
use std::os::windows::fs::OpenOptionsExt;
use std::path::Path;

use same_file::Handle;

const FILE_SHARE_READ: u32 = 0x0000_0001;
const FILE_SHARE_WRITE: u32 = 0x0000_0002;
const FILE_SHARE_DELETE: u32 = 0x0000_0004;
const SHARE_ALL: u32 = FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE;

/// File identity backed by the volume serial and file index.
#[derive(Debug)]
pub(crate) struct FileId(Handle);

impl PartialEq for FileId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for FileId {}

/// Opens `path` for streaming reads with share-delete, so the file can be
/// renamed or removed by another process while the handle is held.
pub(crate) fn open_for_follow(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .share_mode(SHARE_ALL)
        .open(path)
}

/// Creates the tracked target with the same sharing so tests can rotate
/// it underneath an open reader. Test support.
#[cfg(test)]
pub(crate) fn create_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .share_mode(SHARE_ALL)
        .open(path)
}

/// Identity of an open handle.
pub(crate) fn file_id(file: &File) -> io::Result<FileId> {
    Handle::from_file(file.try_clone()?).map(FileId)
}

/// Identity of whatever currently lives at `path`. Resolves symlinks.
pub(crate) fn path_id(path: &Path) -> io::Result<FileId> {
    Handle::from_path(path).map(FileId)
}
