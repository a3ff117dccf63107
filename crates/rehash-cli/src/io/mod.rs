//! Reading and writing object streams on disk

pub mod framed;
pub mod loose;

use std::fs::File;
use std::io::{BufReader, BufWriter};

use camino::Utf8Path;
use rehash_core::error::{RehashError, RehashResult};
use rehash_core::GitObject;
use rehash_resolver::ChannelSource;
use tracing::debug;

pub use framed::{FrameReader, FrameWriter};
pub use loose::{write_loose_object, LooseReader};

/// Objects buffered between the reader thread and the engine
pub const CHANNEL_CAPACITY: usize = 64;

/// Boxed object iterator handed to the reader thread
pub type ObjectIter = Box<dyn Iterator<Item = RehashResult<GitObject>> + Send>;

/// Open `path` as a loose object directory or a framed stream file
pub fn open_input(path: &Utf8Path) -> RehashResult<ObjectIter> {
    if path.is_dir() {
        return Ok(Box::new(LooseReader::open(path)?));
    }
    Ok(Box::new(open_frames(path)?))
}

/// Open a framed stream file
pub fn open_frames(path: &Utf8Path) -> RehashResult<FrameReader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| RehashError::io(format!("Failed to open {}", path), e))?;
    Ok(FrameReader::new(BufReader::new(file)))
}

/// Create a framed stream file, truncating an existing one
pub fn create_frames(path: &Utf8Path) -> RehashResult<FrameWriter<BufWriter<File>>> {
    let file = File::create(path).map_err(|e| RehashError::io(format!("Failed to create {}", path), e))?;
    Ok(FrameWriter::new(BufWriter::new(file)))
}

/// Feed `objects` to an engine from a blocking reader thread.
///
/// The thread stops after the first error or once the engine aborts the
/// source.
pub fn spawn_reader(objects: ObjectIter) -> ChannelSource {
    let (tx, source) = ChannelSource::channel(CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || {
        for item in objects {
            let failed = item.is_err();
            if tx.blocking_send(item).is_err() {
                debug!("Object source aborted, stopping reader");
                return;
            }
            if failed {
                return;
            }
        }
    });
    source
}
