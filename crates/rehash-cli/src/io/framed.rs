//! Framed object streams
//!
//! A stream is a sequence of frames, each a header followed by the object
//! content:
//!
//! ```text
//! <kind> <declared length>\0<content>
//! <kind> <declared length> <content length>\0<content>
//! ```
//!
//! The short header is the loose-object header and is used whenever the
//! content is exactly the declared length, which holds for every source
//! form object. Rewritten objects carry extra hash material, so their
//! frames name the content length separately.

use std::io::{BufRead, Read, Write};

use rehash_core::error::{RehashError, RehashResult};
use rehash_core::{GitObject, ObjectKind};

/// Longest header accepted before the NUL terminator
const MAX_HEADER_LEN: u64 = 64;

/// Parsed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: ObjectKind,
    pub declared_length: u64,
    pub content_length: usize,
}

impl FrameHeader {
    /// Parse header text without its NUL terminator
    pub fn parse(header: &[u8]) -> RehashResult<Self> {
        let text = std::str::from_utf8(header).map_err(|_| frame_error("frame header is not UTF-8"))?;
        let mut fields = text.split(' ');

        let kind: ObjectKind = fields.next().unwrap_or_default().parse()?;
        let declared_length: u64 = parse_number(fields.next(), "declared length")?;
        let content_length = match fields.next() {
            Some(field) => parse_number(Some(field), "content length")?,
            None => usize::try_from(declared_length)
                .map_err(|_| frame_error(format!("declared length {} does not fit in memory", declared_length)))?,
        };
        if fields.next().is_some() {
            return Err(frame_error(format!("unexpected fields in frame header '{}'", text)));
        }

        Ok(Self {
            kind,
            declared_length,
            content_length,
        })
    }

    /// Header bytes, NUL terminator included
    pub fn encode(&self) -> Vec<u8> {
        let text = if self.content_length as u64 == self.declared_length {
            format!("{} {}\0", self.kind, self.declared_length)
        } else {
            format!("{} {} {}\0", self.kind, self.declared_length, self.content_length)
        };
        text.into_bytes()
    }
}

fn parse_number<T: std::str::FromStr>(field: Option<&str>, what: &str) -> RehashResult<T> {
    let field = field.ok_or_else(|| frame_error(format!("frame header has no {}", what)))?;
    field
        .parse()
        .map_err(|_| frame_error(format!("invalid {} '{}'", what, field)))
}

fn frame_error(message: impl Into<String>) -> RehashError {
    RehashError::UpstreamRead {
        message: message.into(),
        source: None,
    }
}

/// Reads frames one object at a time
pub struct FrameReader<R> {
    inner: R,
    offset: u64,
    failed: bool,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            failed: false,
        }
    }

    /// Next object, or `None` at a clean end of stream
    pub fn read_object(&mut self) -> RehashResult<Option<GitObject>> {
        let mut header = Vec::new();
        let read = (&mut self.inner)
            .take(MAX_HEADER_LEN + 1)
            .read_until(0, &mut header)
            .map_err(|e| RehashError::upstream(format!("reading frame header at byte {}", self.offset), e))?;
        if read == 0 {
            return Ok(None);
        }
        if header.pop() != Some(0) {
            return Err(frame_error(format!(
                "truncated or oversized frame header at byte {}",
                self.offset
            )));
        }

        let frame = FrameHeader::parse(&header)?;
        let mut content = Vec::new();
        (&mut self.inner)
            .take(frame.content_length as u64)
            .read_to_end(&mut content)
            .map_err(|e| RehashError::upstream(format!("reading {} content at byte {}", frame.kind, self.offset), e))?;
        if content.len() != frame.content_length {
            return Err(frame_error(format!(
                "{} content at byte {} is truncated to {} of {} bytes",
                frame.kind,
                self.offset,
                content.len(),
                frame.content_length
            )));
        }
        self.offset += (read + frame.content_length) as u64;

        Ok(Some(GitObject::with_length(frame.kind, frame.declared_length, content)))
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = RehashResult<GitObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.read_object().transpose();
        self.failed = matches!(next, Some(Err(_)));
        next
    }
}

/// Writes objects as frames
pub struct FrameWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write_object(&mut self, object: &GitObject) -> RehashResult<()> {
        let header = FrameHeader {
            kind: object.kind,
            declared_length: object.declared_length,
            content_length: object.content.len(),
        };
        self.inner
            .write_all(&header.encode())
            .and_then(|_| self.inner.write_all(&object.content))
            .map_err(|e| RehashError::io(format!("Failed to write {} frame", object.kind), e))?;
        self.written += 1;
        Ok(())
    }

    /// Number of frames written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the inner writer
    pub fn finish(mut self) -> RehashResult<W> {
        self.inner
            .flush()
            .map_err(|e| RehashError::io("Failed to flush object stream".to_string(), e))?;
        Ok(self.inner)
    }
}
