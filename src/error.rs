//! Error types for the follow engine.

use std::io;

use thiserror::Error;

/// The main error type for follow operations.
///
/// Platform errors are surfaced raw: the `Io` variant carries the
/// unwrapped [`std::io::Error`] so callers can match on its
/// [`kind`](std::io::Error::kind) directly.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from opening, reading or stat-ing the followed path.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The descriptor was closed underneath a read. This happens only when
    /// cancellation fires while a read is pending.
    #[error("file handle closed")]
    Closed,

    /// Terminal value: the follow has been cancelled. Every later pull
    /// reports this again.
    #[error("end of stream")]
    EndOfStream,
}

/// A convenient Result type for follow operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for the terminal end-of-stream value produced after
    /// cancellation.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// True when the followed path does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }

    /// True when the OS rejected the open.
    pub fn is_permission_denied(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::PermissionDenied)
    }

    /// True when a non-blocking read had nothing ready. Absorbed by the
    /// engine; callers never observe it.
    pub fn is_would_block(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::WouldBlock)
    }

    /// The underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(err) => Some(err.kind()),
            _ => None,
        }
    }
}
