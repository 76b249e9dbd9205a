//! Platform-specific open semantics and file identity.
//!
//! Opening for a follow differs per OS: unix descriptors must be
//! non-blocking so FIFOs neither wedge on open nor on read, while Windows
//! handles must be opened with share-delete so an external rotation tool
//! can rename or remove the file while it is held.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::{file_id, open_for_follow, path_id, FileId};
#[cfg(all(unix, test))]
pub(crate) use unix::create_file;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::{file_id, open_for_follow, path_id, FileId};
#[cfg(all(windows, test))]
pub(crate) use windows::create_file;
