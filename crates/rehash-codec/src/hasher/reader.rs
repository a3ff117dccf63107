//! Pass-through reader that hashes whatever flows through it

use std::io::{self, Read};

use rehash_core::error::{RehashError, RehashResult};
use rehash_core::ObjectKind;

use super::{DualDigest, DualHasher, TargetSpec};

/// Reader that feeds a [`DualHasher`] and yields identical bytes.
///
/// Digests are published only once the inner reader reports end of
/// stream. A read error drops the accumulators, so a failed stream never
/// yields a partial digest.
pub struct HashingReader<R> {
    inner: R,
    hasher: Option<DualHasher>,
    digest: Option<DualDigest>,
    failure: Option<String>,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R, kind: ObjectKind, declared_length: u64, target: impl Into<TargetSpec>) -> Self {
        Self {
            inner,
            hasher: Some(DualHasher::new(kind, declared_length, target)),
            digest: None,
            failure: None,
        }
    }

    /// Digests, available after end of stream
    pub fn digest(&self) -> Option<&DualDigest> {
        self.digest.as_ref()
    }

    /// Consume the reader and return its digests
    pub fn finish(self) -> RehashResult<DualDigest> {
        if let Some(digest) = self.digest {
            return Ok(digest);
        }
        let message = self
            .failure
            .unwrap_or_else(|| "stream was not read to the end".to_string());
        Err(RehashError::UpstreamRead { message, source: None })
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(0) if !buf.is_empty() => {
                if let Some(hasher) = self.hasher.take() {
                    self.digest = Some(hasher.finalize());
                }
                Ok(0)
            }
            Ok(n) => {
                if let Some(hasher) = self.hasher.as_mut() {
                    hasher.update(&buf[..n]);
                }
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                self.hasher = None;
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }
}
