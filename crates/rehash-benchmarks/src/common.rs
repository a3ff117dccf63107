//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use rehash_codec::source_id;
use rehash_core::{GitObject, ObjectKind};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(50)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Deterministic pseudo-random content
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i.wrapping_mul(31) ^ (i >> 7)) as u8).collect()
}

/// A linear history of `commits` commits, each adding one file to a
/// single tree of `files_per_commit` blobs per step.
///
/// Objects come blobs first, then trees, then commits.
pub fn synthetic_history(commits: usize, files_per_commit: usize, blob_size: usize) -> Vec<GitObject> {
    let mut blobs = Vec::new();
    let mut trees = Vec::new();
    let mut history = Vec::new();
    let mut entries: Vec<(String, GitObject)> = Vec::new();
    let mut parent: Option<GitObject> = None;

    for c in 0..commits {
        for f in 0..files_per_commit {
            let mut content = create_test_content(blob_size);
            content.extend_from_slice(format!("commit {} file {}\n", c, f).as_bytes());
            let blob = GitObject::blob(content);
            entries.push((format!("file-{:05}-{:03}", c, f), blob.clone()));
            blobs.push(blob);
        }

        let mut tree = Vec::new();
        for (name, blob) in &entries {
            tree.extend_from_slice(format!("100644 {}\0", name).as_bytes());
            tree.extend_from_slice(id_of(blob).as_bytes());
        }
        let tree = GitObject::new(ObjectKind::Tree, tree);

        let mut text = format!("tree {}\n", id_of(&tree));
        if let Some(parent) = &parent {
            text.push_str(&format!("parent {}\n", id_of(parent)));
        }
        text.push_str(&format!(
            "author Bench <bench@example.com> {} +0000\ncommitter Bench <bench@example.com> {} +0000\n\ncommit {}\n",
            1_700_000_000 + c,
            1_700_000_000 + c,
            c
        ));
        let commit = GitObject::new(ObjectKind::Commit, text.into_bytes());

        trees.push(tree);
        history.push(commit.clone());
        parent = Some(commit);
    }

    blobs.into_iter().chain(trees).chain(history).collect()
}

fn id_of(object: &GitObject) -> rehash_core::ObjectId {
    source_id(object.kind, object.declared_length, &object.content)
}
