//! Reverse pipeline: dual-form objects back to source form
//!
//! Each object carries its own source hashes, so restoring is a plain map
//! over the stream with no buffering across objects.

use rehash_codec::restore_content;
use rehash_core::error::RehashResult;
use rehash_core::{GitObject, HashAlgorithm};
use tracing::{debug, error, info};

use crate::output::{OutputSequencer, OutputStream};
use crate::source::{IterSource, ObjectSource};

/// Strips target hash material of a fixed width
#[derive(Debug, Clone, Copy)]
pub struct Restorer {
    target_width: usize,
}

impl Restorer {
    /// Restorer for objects rewritten with `algorithm`
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::with_width(algorithm.width())
    }

    /// Restorer for an explicit target hash width
    pub fn with_width(target_width: usize) -> Self {
        Self { target_width }
    }

    /// Restore a single object
    pub fn restore(&self, object: GitObject) -> RehashResult<GitObject> {
        let content = restore_content(object.kind, &object.content, self.target_width)?;
        Ok(GitObject::with_length(object.kind, object.declared_length, content))
    }

    /// Restore everything `source` yields into `output`.
    ///
    /// Leaves the terminal signal to the caller, like the forward resolver.
    pub async fn run<S: ObjectSource>(&self, mut source: S, output: &OutputSequencer) -> RehashResult<usize> {
        let mut restored = 0;
        while let Some(next) = source.next_object().await {
            let result = next.and_then(|object| self.restore(object)).and_then(|object| output.push(object));
            if let Err(err) = result {
                debug!("Aborting object source: {}", err);
                source.abort();
                return Err(err);
            }
            restored += 1;
        }
        Ok(restored)
    }
}

/// Run the reverse pipeline on the current tokio runtime
pub fn spawn_restore<S>(source: S, algorithm: HashAlgorithm) -> OutputStream
where
    S: ObjectSource + 'static,
{
    let (output, stream) = OutputSequencer::channel();
    tokio::spawn(async move {
        let result = Restorer::new(algorithm).run(source, &output).await;
        finish_restore(result, &output);
    });
    stream
}

/// Restore an in-memory list of objects
pub async fn restore_objects(objects: Vec<GitObject>, algorithm: HashAlgorithm) -> RehashResult<Vec<GitObject>> {
    let (output, stream) = OutputSequencer::channel();
    let result = Restorer::new(algorithm)
        .run(IterSource::from_objects(objects), &output)
        .await;
    finish_restore(result, &output);
    stream.collect().await
}

fn finish_restore(result: RehashResult<usize>, output: &OutputSequencer) {
    match result {
        Ok(count) => {
            info!("Restored {} objects", count);
            if let Err(err) = output.finish() {
                debug!("Could not signal the end of output: {}", err);
            }
        }
        Err(err) => {
            error!("Restore failed: {}", err);
            output.fail(err);
        }
    }
}
