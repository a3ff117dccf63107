//! Ordered output queue between the resolver and its consumer
//!
//! The resolver pushes finished objects in the order they resolve; the
//! consumer drains them one at a time. The queue never reorders. It ends
//! with an explicit terminal signal, either success or a carried error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rehash_core::error::{RehashError, RehashResult};
use rehash_core::GitObject;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

enum Message {
    Object(GitObject),
    Done,
    Failed(RehashError),
}

/// Producer half of the output queue
#[derive(Clone)]
pub struct OutputSequencer {
    tx: UnboundedSender<Message>,
    ended: Arc<AtomicBool>,
}

/// Consumer half of the output queue
pub struct OutputStream {
    rx: UnboundedReceiver<Message>,
    ended: bool,
}

impl OutputSequencer {
    /// Create a connected sequencer and stream
    pub fn channel() -> (OutputSequencer, OutputStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            OutputSequencer {
                tx,
                ended: Arc::new(AtomicBool::new(false)),
            },
            OutputStream { rx, ended: false },
        )
    }

    /// Append a finished object.
    ///
    /// Fails with `Aborted` once the consumer has gone away, and with
    /// `OutputClosed` after a terminal signal was sent.
    pub fn push(&self, object: GitObject) -> RehashResult<()> {
        if self.ended.load(Ordering::Acquire) {
            return Err(RehashError::OutputClosed);
        }
        self.tx
            .send(Message::Object(object))
            .map_err(|_| RehashError::Aborted)
    }

    /// End the sequence successfully
    pub fn finish(&self) -> RehashResult<()> {
        if self.ended.swap(true, Ordering::AcqRel) {
            return Err(RehashError::OutputClosed);
        }
        self.tx.send(Message::Done).map_err(|_| RehashError::Aborted)
    }

    /// End the sequence with an error.
    ///
    /// Ignored when the sequence already ended or nobody is listening.
    pub fn fail(&self, error: RehashError) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.tx.send(Message::Failed(error));
    }

    /// Whether the consumer stopped listening
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl OutputStream {
    /// Next object; `None` after a successful end.
    ///
    /// An error is always the last item of the stream.
    pub async fn next(&mut self) -> Option<RehashResult<GitObject>> {
        if self.ended {
            return None;
        }
        match self.rx.recv().await {
            Some(Message::Object(object)) => Some(Ok(object)),
            Some(Message::Done) => {
                self.ended = true;
                None
            }
            Some(Message::Failed(error)) => {
                self.ended = true;
                Some(Err(error))
            }
            None => {
                self.ended = true;
                Some(Err(RehashError::UpstreamRead {
                    message: "rewrite stopped without a terminal signal".to_string(),
                    source: None,
                }))
            }
        }
    }

    /// Drain everything, failing on the terminal error
    pub async fn collect(mut self) -> RehashResult<Vec<GitObject>> {
        let mut objects = Vec::new();
        while let Some(next) = self.next().await {
            objects.push(next?);
        }
        Ok(objects)
    }

    /// Stop consuming; the producer sees `Aborted` on its next push
    pub fn close(&mut self) {
        self.rx.close();
    }
}
