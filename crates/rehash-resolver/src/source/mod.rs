//! Object sources feeding the rewrite engine
//!
//! A source is pulled one object at a time. `None` marks the end of input,
//! `Some(Err(_))` an upstream failure. Sources can be abandoned mid-way with
//! `abort`, which the engine calls when the run fails or the consumer goes
//! away.

use std::future::Future;

use rehash_core::error::RehashResult;
use rehash_core::GitObject;
use tokio::sync::mpsc;

/// Lazy, finite, abortable sequence of objects
pub trait ObjectSource: Send {
    /// Pull the next object
    fn next_object(&mut self) -> impl Future<Output = Option<RehashResult<GitObject>>> + Send;

    /// Abandon the sequence; later pulls return `None`
    fn abort(&mut self) {}
}

impl<S: ObjectSource> ObjectSource for &mut S {
    fn next_object(&mut self) -> impl Future<Output = Option<RehashResult<GitObject>>> + Send {
        (**self).next_object()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

/// Source backed by an iterator
pub struct IterSource<I> {
    iter: I,
    aborted: bool,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = RehashResult<GitObject>> + Send,
{
    pub fn new(iter: I) -> Self {
        Self { iter, aborted: false }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl IterSource<std::iter::Map<std::vec::IntoIter<GitObject>, fn(GitObject) -> RehashResult<GitObject>>> {
    /// Source over an in-memory list of objects
    pub fn from_objects(objects: Vec<GitObject>) -> Self {
        Self::new(objects.into_iter().map(Ok as fn(GitObject) -> RehashResult<GitObject>))
    }
}

impl<I> ObjectSource for IterSource<I>
where
    I: Iterator<Item = RehashResult<GitObject>> + Send,
{
    async fn next_object(&mut self) -> Option<RehashResult<GitObject>> {
        if self.aborted {
            return None;
        }
        self.iter.next()
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

/// Source fed by a producer task through a bounded channel.
///
/// The channel bound is the backpressure between the producer and the
/// engine; aborting closes the channel so the producer's sends fail.
pub struct ChannelSource {
    rx: mpsc::Receiver<RehashResult<GitObject>>,
}

impl ChannelSource {
    /// Create a source and the sender a producer writes into
    pub fn channel(capacity: usize) -> (mpsc::Sender<RehashResult<GitObject>>, ChannelSource) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, ChannelSource { rx })
    }
}

impl ObjectSource for ChannelSource {
    async fn next_object(&mut self) -> Option<RehashResult<GitObject>> {
        self.rx.recv().await
    }

    fn abort(&mut self) {
        self.rx.close();
    }
}
