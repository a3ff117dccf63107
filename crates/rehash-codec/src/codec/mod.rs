//! Per-kind reference extraction and target hash injection
//!
//! Each codec works on one fully buffered object. `parse_links` finds the
//! source hashes an object references and where they sit; `patch_content`
//! produces the dual form once every referenced hash has a target.

use indexmap::IndexMap;
use rehash_core::error::{RehashError, RehashResult};
use rehash_core::{ObjectId, ObjectKind, TargetHash};

pub mod text;
pub mod tree;

/// Where a target hash must be inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchLocation {
    /// Header line index of a commit or tag
    Line(usize),
    /// Byte offset just past a tree record's source hash
    Offset(usize),
}

/// Referenced source hash to every place it appears, in first-seen order
pub type Links = IndexMap<ObjectId, Vec<PatchLocation>>;

/// Extract the references an object embeds
pub fn parse_links(kind: ObjectKind, content: &[u8]) -> RehashResult<Links> {
    match kind {
        ObjectKind::Blob => Ok(Links::new()),
        ObjectKind::Tree => tree::parse_links(content),
        ObjectKind::Commit | ObjectKind::Tag => text::parse_links(kind, content),
    }
}

/// Produce the dual form of an object.
///
/// `resolve` must return a target hash for every key in `links`; `self_id`
/// is the object's own source id, written into the commit/tag identity line.
pub fn patch_content<'a, F>(
    kind: ObjectKind,
    content: &[u8],
    self_id: &ObjectId,
    links: &Links,
    resolve: F,
) -> RehashResult<Vec<u8>>
where
    F: Fn(&ObjectId) -> Option<&'a TargetHash>,
{
    let mut patches: Vec<(PatchLocation, &TargetHash)> = Vec::new();
    for (id, locations) in links {
        let target = resolve(id).ok_or_else(|| RehashError::InvalidHash {
            expected: format!("target hash for {}", id),
            actual: "unresolved".to_string(),
        })?;
        patches.extend(locations.iter().map(|loc| (*loc, target)));
    }
    patches.sort_by_key(|(loc, _)| *loc);

    match kind {
        ObjectKind::Blob => Ok(content.to_vec()),
        ObjectKind::Tree => Ok(tree::patch(content, &patches)),
        ObjectKind::Commit | ObjectKind::Tag => text::patch(kind, content, self_id, &patches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_blob_has_no_links() {
        let links = parse_links(ObjectKind::Blob, b"tree 0123\n").unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_unresolved_link_is_rejected() {
        let id = ObjectId::new([7u8; 20]);
        let mut content = b"100644 a\0".to_vec();
        content.extend_from_slice(id.as_bytes());

        let links = parse_links(ObjectKind::Tree, &content).unwrap();
        let empty: HashMap<ObjectId, TargetHash> = HashMap::new();
        let result = patch_content(ObjectKind::Tree, &content, &ObjectId::new([0; 20]), &links, |h| {
            empty.get(h)
        });
        assert!(result.is_err());
    }
}
