use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use rehash_codec::{parse_links, restore_content, source_id, TargetAccumulator};
use rehash_core::error::RehashError;
use rehash_core::{GitObject, HashAlgorithm, ObjectId, ObjectKind, TargetHash};

use super::*;
use crate::lookup::{FnLookup, MapLookup, NoLookup};
use crate::source::ChannelSource;

const ALG: HashAlgorithm = HashAlgorithm::Sha256;

fn id_of(object: &GitObject) -> ObjectId {
    source_id(object.kind, object.declared_length, &object.content)
}

fn target_of(content: &[u8]) -> TargetHash {
    TargetAccumulator::digest(ALG, content)
}

fn tree(entries: &[(&str, &GitObject)]) -> GitObject {
    let mut content = Vec::new();
    for (name, object) in entries {
        let mode = if object.kind == ObjectKind::Tree { "40000" } else { "100644" };
        content.extend_from_slice(format!("{} {}\0", mode, name).as_bytes());
        content.extend_from_slice(id_of(object).as_bytes());
    }
    GitObject::new(ObjectKind::Tree, content)
}

fn commit(tree: &GitObject, parents: &[&GitObject], message: &str) -> GitObject {
    let mut text = format!("tree {}\n", id_of(tree));
    for parent in parents {
        text.push_str(&format!("parent {}\n", id_of(parent)));
    }
    text.push_str("author A <a@example.com> 1700000000 +0000\n");
    text.push_str("committer A <a@example.com> 1700000000 +0000\n\n");
    text.push_str(message);
    GitObject::new(ObjectKind::Commit, text.into_bytes())
}

/// blob, tree holding it, commit of the tree
fn small_repo() -> (GitObject, GitObject, GitObject) {
    let b = GitObject::blob(b"hello world\n".to_vec());
    let t = tree(&[("hello.txt", &b)]);
    let c = commit(&t, &[], "initial\n");
    (b, t, c)
}

fn expected_tree(t: &GitObject, b: &GitObject) -> Vec<u8> {
    let mut content = t.content.clone();
    content.extend_from_slice(target_of(&b.content).as_bytes());
    content
}

fn expected_commit(c: &GitObject, t_dual: &[u8]) -> Vec<u8> {
    let text = std::str::from_utf8(&c.content).unwrap();
    let (first, rest) = text.split_once('\n').unwrap();
    format!(
        "sha1 {}\n{} {}\n{}",
        id_of(c),
        first,
        target_of(t_dual).to_hex(),
        rest
    )
    .into_bytes()
}

fn recording_lookup(
    answers: HashMap<String, Vec<u8>>,
) -> (
    Arc<Mutex<Vec<String>>>,
    FnLookup<impl FnMut(String) -> std::future::Ready<rehash_core::RehashResult<Vec<u8>>> + Send>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = calls.clone();
    let lookup = FnLookup::new(move |hex: String| {
        seen.lock().unwrap().push(hex.clone());
        std::future::ready(answers.get(&hex).cloned().ok_or_else(|| RehashError::LookupFailure {
            hash: hex,
            message: "unknown".to_string(),
            source: None,
        }))
    });
    (calls, lookup)
}

#[tokio::test]
async fn test_blob_tree_commit_in_order() {
    let (b, t, c) = small_repo();
    let out = rewrite_objects(vec![b.clone(), t.clone(), c.clone()], NoLookup, ALG)
        .await
        .unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0], b);

    let t_dual = expected_tree(&t, &b);
    assert_eq!(out[1].kind, ObjectKind::Tree);
    assert_eq!(out[1].content, t_dual);
    assert_eq!(out[1].declared_length, t.content.len() as u64);

    assert_eq!(out[2].kind, ObjectKind::Commit);
    assert_eq!(out[2].content, expected_commit(&c, &t_dual));
    assert_eq!(out[2].declared_length, c.content.len() as u64);
}

#[tokio::test]
async fn test_forward_references_are_deferred() {
    let (b, t, c) = small_repo();
    let in_order = rewrite_objects(vec![b.clone(), t.clone(), c.clone()], NoLookup, ALG)
        .await
        .unwrap();
    let reversed = rewrite_objects(vec![c, t, b], NoLookup, ALG).await.unwrap();

    // same content, emitted in dependency order regardless of input order
    assert_eq!(reversed, in_order);
}

#[tokio::test]
async fn test_self_contained_input_never_looks_up() {
    let (b, t, c) = small_repo();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let lookup = FnLookup::new(move |_hex: String| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(vec![0u8; 32]) }
    });

    let out = rewrite_objects(vec![c, b, t], lookup, ALG).await.unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_blob_is_looked_up_once() {
    let (b, t, c) = small_repo();
    let b_target = target_of(&b.content);
    let answers = HashMap::from([(id_of(&b).to_hex(), b_target.as_bytes().to_vec())]);
    let (calls, lookup) = recording_lookup(answers);

    let out = rewrite_objects(vec![t.clone(), c.clone()], lookup, ALG).await.unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![id_of(&b).to_hex()]);
    let t_dual = expected_tree(&t, &b);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].content, t_dual);
    assert_eq!(out[1].content, expected_commit(&c, &t_dual));
}

#[tokio::test]
async fn test_hash_shared_by_many_waiters_is_looked_up_once() {
    let missing = GitObject::blob(b"shared".to_vec());
    let t1 = tree(&[("a", &missing)]);
    let t2 = tree(&[("b", &missing), ("c", &missing)]);
    let answers = HashMap::from([(id_of(&missing).to_hex(), vec![7u8; 32])]);
    let (calls, lookup) = recording_lookup(answers);

    let out = rewrite_objects(vec![t1, t2], lookup, ALG).await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_lookup_failure_fails_run() {
    let (_, t, c) = small_repo();
    let (output, mut stream) = OutputSequencer::channel();
    let result = Resolver::new(ALG, NoLookup, output.clone())
        .run(IterSource::from_objects(vec![t, c]))
        .await;
    finish_run(result, &output);

    // neither object can be emitted without the blob's target
    let first = stream.next().await.unwrap();
    assert!(matches!(first, Err(RehashError::LookupFailure { .. })));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_lookup_with_wrong_width_fails() {
    let (b, t, _) = small_repo();
    let answers = HashMap::from([(id_of(&b).to_hex(), vec![1u8; 20])]);
    let (_, lookup) = recording_lookup(answers);

    let err = rewrite_objects(vec![t], lookup, ALG).await.unwrap_err();
    assert!(matches!(err, RehashError::LookupFailure { ref message, .. } if message.contains("32-byte")));
}

#[tokio::test]
async fn test_map_lookup_resolves_missing_hashes() {
    let (b, t, c) = small_repo();
    let mut lookup = MapLookup::new();
    lookup.insert(id_of(&b), target_of(&b.content));

    let out = rewrite_objects(vec![t.clone(), c], lookup, ALG).await.unwrap();
    assert_eq!(out[0].content, expected_tree(&t, &b));
}

#[tokio::test]
async fn test_malformed_tree_is_not_emitted() {
    let b = GitObject::blob(b"fine".to_vec());
    let broken = GitObject::new(ObjectKind::Tree, b"100644 name-without-terminator".to_vec());
    let (output, mut stream) = OutputSequencer::channel();
    let result = Resolver::new(ALG, NoLookup, output.clone())
        .run(IterSource::from_objects(vec![b.clone(), broken]))
        .await;
    finish_run(result, &output);

    assert_eq!(stream.next().await.unwrap().unwrap(), b);
    assert!(matches!(
        stream.next().await.unwrap(),
        Err(RehashError::MalformedEncoding { .. })
    ));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_upstream_error_aborts_source() {
    let objects = vec![
        Ok(GitObject::blob(b"a".to_vec())),
        Err(RehashError::UnknownObjectKind {
            kind: "bogus".to_string(),
        }),
        Ok(GitObject::blob(b"never".to_vec())),
    ];
    let (output, stream) = OutputSequencer::channel();
    let mut source = IterSource::new(objects.into_iter());
    let result = Resolver::new(ALG, NoLookup, output.clone()).run(&mut source).await;

    assert!(matches!(result, Err(RehashError::UnknownObjectKind { .. })));
    assert!(source.is_aborted());
    finish_run(result, &output);
    assert!(stream.collect().await.is_err());
}

#[tokio::test]
async fn test_duplicate_objects_are_each_emitted() {
    let b = GitObject::blob(b"twice".to_vec());
    let out = rewrite_objects(vec![b.clone(), b.clone()], NoLookup, ALG)
        .await
        .unwrap();
    assert_eq!(out, vec![b.clone(), b]);
}

#[tokio::test]
async fn test_stats_count_deferred_objects() {
    let (b, t, c) = small_repo();
    let (output, _stream) = OutputSequencer::channel();
    let stats = Resolver::new(ALG, NoLookup, output)
        .run(IterSource::from_objects(vec![c, t, b]))
        .await
        .unwrap();

    assert_eq!(
        stats,
        RewriteStats {
            objects: 3,
            blobs: 1,
            emitted: 3,
            deferred: 2,
            lookups: 0,
        }
    );
}

#[tokio::test]
async fn test_spawn_rewrite_streams_objects() {
    let (b, t, c) = small_repo();
    let mut stream = spawn_rewrite(IterSource::from_objects(vec![b, t, c]), NoLookup, ALG);

    let mut kinds = Vec::new();
    while let Some(next) = stream.next().await {
        kinds.push(next.unwrap().kind);
    }
    assert_eq!(kinds, vec![ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit]);
}

#[tokio::test]
async fn test_dropping_stream_aborts_producer() {
    let (tx, source) = ChannelSource::channel(1);
    let mut stream = spawn_rewrite(source, NoLookup, ALG);

    tx.send(Ok(GitObject::blob(b"first".to_vec()))).await.unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    // the engine notices on its next pull and closes the channel
    let _ = tx.send(Ok(GitObject::blob(b"second".to_vec()))).await;
    let closed = tokio::time::timeout(Duration::from_secs(5), tx.closed()).await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_lookup_result_discarded_after_cancel() {
    let first = GitObject::blob(b"first".to_vec());
    let second = GitObject::blob(b"second".to_vec());
    let t = tree(&[("a", &first), ("b", &second)]);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let gate = Arc::new(tokio::sync::Notify::new());
    let lookup = FnLookup::new({
        let calls = calls.clone();
        let gate = gate.clone();
        move |hex: String| {
            calls.lock().unwrap().push(hex);
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok(vec![0u8; 32])
            }
        }
    });

    let (output, stream) = OutputSequencer::channel();
    let handle = tokio::spawn(Resolver::new(ALG, lookup, output).run(IterSource::from_objects(vec![t])));
    while calls.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }
    drop(stream);
    gate.notify_one();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(RehashError::Aborted)));
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_round_trip_through_restore() {
    let (b, t, c) = small_repo();
    let input = vec![c, b, t];
    let rewritten = rewrite_objects(input.clone(), NoLookup, ALG).await.unwrap();
    let restored = crate::restore_objects(rewritten, ALG).await.unwrap();

    let mut expected = input;
    let mut actual = restored;
    expected.sort_by_key(id_of);
    actual.sort_by_key(id_of);
    assert_eq!(actual, expected);
}

/// Blobs, one tree and commit per blob prefix, and a tag on the last commit
fn build_repo(blobs: &[Vec<u8>], commits: usize) -> Vec<GitObject> {
    let blobs: Vec<GitObject> = blobs.iter().map(|c| GitObject::blob(c.clone())).collect();
    let mut objects = blobs.clone();
    let mut previous: Option<GitObject> = None;
    for i in 0..commits {
        let count = i % blobs.len() + 1;
        let names: Vec<String> = (0..count).map(|j| format!("f{}", j)).collect();
        let entries: Vec<(&str, &GitObject)> = names.iter().map(String::as_str).zip(blobs.iter()).collect();
        let t = tree(&entries);
        let parents: Vec<&GitObject> = previous.iter().collect();
        let c = commit(&t, &parents, &format!("commit {}\n", i));
        objects.push(t);
        objects.push(c.clone());
        previous = Some(c);
    }
    if let Some(head) = previous {
        let tag = format!(
            "object {}\ntype commit\ntag v1\ntagger T <t@example.com> 1 +0000\n\nrelease\n",
            id_of(&head)
        );
        objects.push(GitObject::new(ObjectKind::Tag, tag.into_bytes()));
    }
    objects
}

fn repo_strategy() -> impl Strategy<Value = Vec<GitObject>> {
    (prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 1..5), 1usize..4)
        .prop_map(|(blobs, commits)| build_repo(&blobs, commits))
        .prop_flat_map(|objects| Just(objects).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_any_input_order_emits_dependencies_first(objects in repo_strategy()) {
        let out = tokio_test::block_on(rewrite_objects(objects.clone(), NoLookup, ALG)).unwrap();
        prop_assert_eq!(out.len(), objects.len());

        let mut position = HashMap::new();
        let mut restored = Vec::new();
        for (i, object) in out.iter().enumerate() {
            let content = restore_content(object.kind, &object.content, ALG.width()).unwrap();
            let original = GitObject::with_length(object.kind, object.declared_length, content);
            position.entry(id_of(&original)).or_insert(i);
            restored.push(original);
        }

        for (i, object) in restored.iter().enumerate() {
            for link in parse_links(object.kind, &object.content).unwrap().keys() {
                let dep = position.get(link).copied();
                prop_assert!(dep.is_some_and(|p| p < i), "{} emitted before {}", object.kind, link);
            }
        }

        let mut expected = objects;
        expected.sort_by_key(id_of);
        restored.sort_by_key(id_of);
        prop_assert_eq!(restored, expected);
    }

    #[test]
    fn test_removed_blob_causes_one_lookup(objects in repo_strategy()) {
        let full = tokio_test::block_on(rewrite_objects(objects.clone(), NoLookup, ALG)).unwrap();
        let Some(pos) = objects.iter().position(|o| o.kind == ObjectKind::Blob) else {
            return Ok(());
        };
        let mut objects = objects;
        let removed = objects.remove(pos);
        let removed_id = id_of(&removed);
        // duplicate blob contents leave another copy in the stream
        let still_present = objects.iter().any(|o| id_of(o) == removed_id);
        let referenced = objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Tree)
            .any(|o| parse_links(o.kind, &o.content).unwrap().contains_key(&removed_id));

        let answers = HashMap::from([(removed_id.to_hex(), target_of(&removed.content).as_bytes().to_vec())]);
        let (calls, lookup) = recording_lookup(answers);
        let out = tokio_test::block_on(rewrite_objects(objects.clone(), lookup, ALG)).unwrap();

        prop_assert_eq!(out.len(), objects.len());
        let expected_calls = usize::from(referenced && !still_present);
        prop_assert_eq!(calls.lock().unwrap().len(), expected_calls);

        // everything else is rewritten exactly as in the complete stream
        let mut expected = full;
        let dropped = expected.iter().position(|o| *o == removed);
        prop_assert!(dropped.is_some());
        expected.remove(dropped.unwrap());
        let mut actual = out;
        let by_form = |o: &GitObject| (o.kind.as_str(), o.content.clone());
        expected.sort_by_key(by_form);
        actual.sort_by_key(by_form);
        prop_assert_eq!(actual, expected);
    }
}
