//! Loose object directories
//!
//! Objects live at `xx/yyyy...` below the objects directory, where the path
//! spells the object's SHA-1. Each file is the zlib-compressed header and
//! content. Reading verifies the hash against the path.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::bufread::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rehash_codec::hasher::source_id;
use rehash_codec::HashingReader;
use rehash_core::error::{RehashError, RehashResult};
use rehash_core::{GitObject, HashAlgorithm, ObjectId};
use tracing::debug;
use walkdir::WalkDir;

use super::framed::FrameHeader;

/// Iterator over the objects of a loose object directory
pub struct LooseReader {
    paths: std::vec::IntoIter<(ObjectId, Utf8PathBuf)>,
}

impl LooseReader {
    /// Scan `dir` for object files.
    ///
    /// A `.git` directory or one containing `objects/` is accepted as well.
    pub fn open(dir: &Utf8Path) -> RehashResult<Self> {
        let paths = object_paths(&objects_dir(dir))?;
        debug!("Found {} loose objects under {}", paths.len(), dir);
        Ok(Self {
            paths: paths.into_iter(),
        })
    }
}

impl Iterator for LooseReader {
    type Item = RehashResult<GitObject>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, path) = self.paths.next()?;
        Some(read_loose_object(&path, &id))
    }
}

fn objects_dir(dir: &Utf8Path) -> Utf8PathBuf {
    let nested = dir.join("objects");
    if nested.is_dir() {
        nested
    } else {
        dir.to_path_buf()
    }
}

fn is_hex(name: &str, len: usize) -> bool {
    name.len() == len && name.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Object files below `dir`, sorted by hash
pub fn object_paths(dir: &Utf8Path) -> RehashResult<Vec<(ObjectId, Utf8PathBuf)>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(2).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| RehashError::upstream(format!("scanning {}", dir), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
            continue;
        };
        let (Some(prefix), Some(rest)) = (
            path.parent().and_then(Utf8Path::file_name),
            path.file_name(),
        ) else {
            continue;
        };
        if !is_hex(prefix, 2) || !is_hex(rest, ObjectId::HEX_LEN - 2) {
            debug!("Skipping non-object file {}", path);
            continue;
        }
        let id = ObjectId::from_hex(&format!("{}{}", prefix, rest).to_ascii_lowercase())?;
        paths.push((id, path));
    }
    Ok(paths)
}

/// Inflate one object file and check its hash against `expected`
pub fn read_loose_object(path: &Utf8Path, expected: &ObjectId) -> RehashResult<GitObject> {
    let file = File::open(path).map_err(|e| RehashError::upstream(format!("opening {}", path), e))?;
    let mut reader = BufReader::new(ZlibDecoder::new(BufReader::new(file)));

    let mut header = Vec::new();
    (&mut reader)
        .take(64)
        .read_until(0, &mut header)
        .map_err(|e| RehashError::upstream(format!("inflating {}", path), e))?;
    if header.pop() != Some(0) {
        return Err(RehashError::UpstreamRead {
            message: format!("{} has no object header", path),
            source: None,
        });
    }
    let frame = FrameHeader::parse(&header)?;

    let mut hashing = HashingReader::new(&mut reader, frame.kind, frame.declared_length, HashAlgorithm::Sha1);
    let mut content = Vec::new();
    (&mut hashing)
        .take(frame.declared_length.saturating_add(1))
        .read_to_end(&mut content)
        .map_err(|e| RehashError::upstream(format!("inflating {}", path), e))?;
    let digest = hashing.finish()?;

    if content.len() as u64 != frame.declared_length {
        return Err(RehashError::malformed(
            frame.kind,
            format!("{} holds {} bytes but declares {}", path, content.len(), frame.declared_length),
        ));
    }
    if digest.source != *expected {
        return Err(RehashError::InvalidHash {
            expected: expected.to_hex(),
            actual: digest.source.to_hex(),
        });
    }
    Ok(GitObject::with_length(frame.kind, frame.declared_length, content))
}

/// Write a source form object; existing objects are left alone
pub fn write_loose_object(dir: &Utf8Path, object: &GitObject) -> RehashResult<ObjectId> {
    let id = source_id(object.kind, object.declared_length, &object.content);
    let hex = id.to_hex();
    let (prefix, rest) = hex.split_at(2);
    let parent = dir.join(prefix);
    let path = parent.join(rest);
    if path.exists() {
        return Ok(id);
    }

    fs::create_dir_all(&parent).map_err(|e| RehashError::io(format!("Failed to create {}", parent), e))?;
    let file = File::create(&path).map_err(|e| RehashError::io(format!("Failed to create {}", path), e))?;
    let compress = |mut encoder: ZlibEncoder<File>| -> std::io::Result<()> {
        encoder.write_all(&object.header())?;
        encoder.write_all(&object.content)?;
        encoder.finish()?;
        Ok(())
    };
    compress(ZlibEncoder::new(file, Compression::default()))
        .map_err(|e| RehashError::io(format!("Failed to write {}", path), e))?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehash_core::ObjectKind;
    use tempfile::TempDir;

    fn temp_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_write_then_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_path(&temp_dir);

        let blob = GitObject::blob(b"hello world\n".to_vec());
        let id = write_loose_object(&dir, &blob).unwrap();
        assert_eq!(id.to_hex(), "3b18e512dba79e4c8300dd08aeb37f8e728b8dad");
        assert!(dir.join("3b").join("18e512dba79e4c8300dd08aeb37f8e728b8dad").is_file());

        let objects: Vec<_> = LooseReader::open(&dir).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(objects, vec![blob]);
    }

    #[test]
    fn test_objects_subdirectory_is_used() {
        let temp_dir = TempDir::new().unwrap();
        let git_dir = temp_path(&temp_dir);
        let tree = GitObject::new(ObjectKind::Tree, Vec::new());
        write_loose_object(&git_dir.join("objects"), &tree).unwrap();
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let objects: Vec<_> = LooseReader::open(&git_dir).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(objects, vec![tree]);
    }

    #[test]
    fn test_non_object_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_path(&temp_dir);
        fs::create_dir_all(dir.join("pack")).unwrap();
        fs::write(dir.join("pack").join("pack-1234.idx"), b"idx").unwrap();
        fs::create_dir_all(dir.join("info")).unwrap();
        fs::write(dir.join("info").join("packs"), b"").unwrap();

        assert!(object_paths(&dir).unwrap().is_empty());
    }

    #[test]
    fn test_hash_mismatch_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_path(&temp_dir);
        let blob = GitObject::blob(b"original".to_vec());
        let id = write_loose_object(&dir, &blob).unwrap();

        // move the object to a path spelling another hash
        let hex = id.to_hex();
        let wrong = format!("{}{}", &hex[..39], if hex.ends_with('0') { "1" } else { "0" });
        fs::create_dir_all(dir.join(&wrong[..2])).unwrap();
        fs::rename(dir.join(&hex[..2]).join(&hex[2..]), dir.join(&wrong[..2]).join(&wrong[2..])).unwrap();

        let results: Vec<_> = LooseReader::open(&dir).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], Err(RehashError::InvalidHash { expected, .. }) if *expected == wrong));
    }

    #[test]
    fn test_oversized_declared_length_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_path(&temp_dir);
        let path = dir.join("ab").join("cd".repeat(19));
        fs::create_dir_all(dir.join("ab")).unwrap();

        let mut encoder = ZlibEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"blob 18446744073709551615\0x").unwrap();
        encoder.finish().unwrap();

        let id = ObjectId::from_hex(&format!("ab{}", "cd".repeat(19))).unwrap();
        assert!(read_loose_object(&path, &id).is_err());
    }

    #[test]
    fn test_existing_object_is_not_rewritten() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_path(&temp_dir);
        let blob = GitObject::blob(b"same".to_vec());

        let first = write_loose_object(&dir, &blob).unwrap();
        let second = write_loose_object(&dir, &blob).unwrap();
        assert_eq!(first, second);
    }
}
