//! `rehash hash-object`: print both hashes of a file

use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use rehash_codec::{DualDigest, HashingReader};
use rehash_config::RehashToml;
use rehash_core::error::{RehashError, RehashResult};
use rehash_core::{HashAlgorithm, ObjectKind};

use super::CommandContext;

/// Hash a file's content as an object of `kind`.
///
/// The target hash covers the bytes as they are; no references are
/// rewritten.
pub fn hash_file(path: &Utf8Path, kind: ObjectKind, algorithm: HashAlgorithm) -> RehashResult<DualDigest> {
    let file = File::open(path).map_err(|e| RehashError::io(format!("Failed to open {}", path), e))?;
    let length = file
        .metadata()
        .map_err(|e| RehashError::io(format!("Failed to stat {}", path), e))?
        .len();

    let mut reader = HashingReader::new(BufReader::new(file), kind, length, algorithm);
    std::io::copy(&mut reader, &mut std::io::sink())
        .map_err(|e| RehashError::io(format!("Failed to read {}", path), e))?;
    reader.finish()
}

pub async fn execute(
    kind: ObjectKind,
    file: &Utf8Path,
    config: &RehashToml,
    ctx: &CommandContext,
) -> RehashResult<DualDigest> {
    let algorithm = config.target.algorithm;
    let digest = hash_file(file, kind, algorithm)?;

    ctx.output.print(&format!("sha1 {}", digest.source));
    ctx.output.print(&format!("{} {}", algorithm, digest.target));
    Ok(digest)
}
