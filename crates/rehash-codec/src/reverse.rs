//! Reverse codec: dual form back to source form
//!
//! Every dual-form object carries its source hashes positionally, so the
//! reverse direction needs no hashing and no dependency tracking.

use rehash_core::error::RehashResult;
use rehash_core::ObjectKind;

use crate::codec::{text, tree};

/// Strip target hash material from one object's content
pub fn restore_content(kind: ObjectKind, content: &[u8], target_width: usize) -> RehashResult<Vec<u8>> {
    match kind {
        ObjectKind::Blob => Ok(content.to_vec()),
        ObjectKind::Tree => tree::restore(content, target_width),
        ObjectKind::Commit | ObjectKind::Tag => text::restore(kind, content, target_width),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::codec::{parse_links, patch_content};
    use crate::hasher::TargetAccumulator;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;
    use rehash_core::{HashAlgorithm, ObjectId, TargetHash};
    use std::collections::HashMap;

    fn tree_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(("[a-z0-9._-]{1,12}", prop::array::uniform20(any::<u8>())), 0..8).prop_map(
            |entries| {
                let mut out = Vec::new();
                for (name, hash) in entries {
                    out.extend_from_slice(format!("100644 {}", name).as_bytes());
                    out.push(0);
                    out.extend_from_slice(&hash);
                }
                out
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        /// Forward patch followed by restore yields the original tree
        #[test]
        fn tree_restore_inverts_patch(tree in tree_strategy()) {
            let links = parse_links(ObjectKind::Tree, &tree).unwrap();
            let targets: HashMap<ObjectId, TargetHash> = links
                .keys()
                .map(|id| (*id, TargetAccumulator::digest(HashAlgorithm::Blake3, id.as_bytes())))
                .collect();
            let dual = patch_content(ObjectKind::Tree, &tree, &ObjectId::new([0; 20]), &links, |id| targets.get(id)).unwrap();

            prop_assert_eq!(restore_content(ObjectKind::Tree, &dual, 32).unwrap(), tree);
        }

        /// Commit bodies survive the round trip byte for byte
        #[test]
        fn commit_body_is_opaque(body in prop::collection::vec(any::<u8>(), 0..200), parents in 0usize..4) {
            let mut content = format!("tree {}\n", "ab".repeat(20)).into_bytes();
            for i in 0..parents {
                content.extend_from_slice(format!("parent {:040x}\n", i + 1).as_bytes());
            }
            content.push(b'\n');
            content.extend_from_slice(&body);

            let links = parse_links(ObjectKind::Commit, &content).unwrap();
            let targets: HashMap<ObjectId, TargetHash> = links
                .keys()
                .map(|id| (*id, TargetAccumulator::digest(HashAlgorithm::Sha256, id.as_bytes())))
                .collect();
            let dual = patch_content(ObjectKind::Commit, &content, &ObjectId::new([5; 20]), &links, |id| targets.get(id)).unwrap();

            prop_assert_eq!(restore_content(ObjectKind::Commit, &dual, 32).unwrap(), content);
        }
    }
}
