//! Async stream adapter over the pull interface.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::logger::Logger;
use crate::options::FollowOptions;
use crate::tail::Tail;

const PULL_BUF_SIZE: usize = 8 * 1024;

/// A stream of byte chunks pulled from a followed path.
///
/// Chunks preserve append order and are not aligned on line boundaries.
/// Dropping the stream stops its follower; the token handed to
/// [`TailStream::new`] is only observed, never cancelled from here.
pub struct TailStream {
    receiver: mpsc::UnboundedReceiver<Result<Vec<u8>>>,
    shutdown: CancellationToken,
    _task: JoinHandle<()>,
}

impl TailStream {
    /// Spawns a follower for `path` and exposes its output as a stream.
    /// The follower stops when `cancel` fires or the stream is dropped.
    pub fn new(
        cancel: &CancellationToken,
        log: impl Logger + Send + Sync + 'static,
        path: impl AsRef<Path>,
        options: FollowOptions,
    ) -> Self {
        let shutdown = cancel.child_token();
        let tail = Tail::new(
            shutdown.clone(),
            Arc::new(log),
            path.as_ref().to_path_buf(),
            options,
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(tail, tx));

        Self {
            receiver: rx,
            shutdown,
            _task: task,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Drop for TailStream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Stream for TailStream {
    type Item = Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Pulls chunks until end-of-stream or the receiver goes away.
async fn pump(mut tail: Tail, tx: mpsc::UnboundedSender<Result<Vec<u8>>>) {
    let mut buf = vec![0u8; PULL_BUF_SIZE];
    loop {
        match tail.pull(&mut buf).await {
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(err) if err.is_end_of_stream() => return,
            Err(err) => {
                if tx.send(Err(err)).is_err() {
                    return;
                }
            }
        }
    }
}
