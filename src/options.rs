//! Follow configuration: poll durations and the starting position.

use std::io::SeekFrom;
use std::time::Duration;

/// Default delay between polling attempts.
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(200);

/// Default idle interval after which a pending error is surfaced.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Starting position on an already-existing regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Whence {
    /// Deliver the whole file before following appends.
    Start,
    /// Follow from the descriptor's current position.
    Current,
    /// Follow new appends only, `tail -n 0` style.
    #[default]
    End,
}

impl From<Whence> for SeekFrom {
    fn from(whence: Whence) -> SeekFrom {
        match whence {
            Whence::Start => SeekFrom::Start(0),
            Whence::Current => SeekFrom::Current(0),
            Whence::End => SeekFrom::End(0),
        }
    }
}

/// Options applied when constructing a [`Tail`](crate::Tail).
#[derive(Debug, Clone, Copy)]
pub struct FollowOptions {
    pub(crate) poll_delay: Duration,
    pub(crate) poll_timeout: Duration,
    pub(crate) whence: Whence,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            poll_delay: DEFAULT_POLL_DELAY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            whence: Whence::End,
        }
    }
}

impl FollowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between polling attempts, trading latency for CPU.
    pub fn poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// How long to wait without data before a pending open or read error
    /// is surfaced to the caller.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Where to start on an already-existing regular file.
    pub fn whence(mut self, whence: Whence) -> Self {
        self.whence = whence;
        self
    }
}
