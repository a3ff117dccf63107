//! The rewrite engine
//!
//! Blobs are hashed and emitted as they arrive. Every other object is
//! buffered, indexed and parked until all hashes it references have
//! targets; the engine moves on to the next input object right after
//! indexing. Resolving an object records its own target hash, which wakes
//! whoever waits on it. Once input ends, hashes that never appeared are
//! fetched from the lookup collaborator one at a time.
//!
//! Emission order is resolution order, so an object is always emitted
//! after everything it references.

use std::collections::{HashMap, HashSet, VecDeque};

use rehash_codec::hasher::SourceHasher;
use rehash_codec::{parse_links, patch_content, DualHasher, TargetAccumulator};
use rehash_core::error::{RehashError, RehashResult};
use rehash_core::{GitObject, HashAlgorithm, ObjectId, ObjectKind, TargetHash};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheInsert, HashCache};
use crate::index::{DependencyIndex, EntryId, PendingEntry};
use crate::lookup::Lookup;
use crate::output::{OutputSequencer, OutputStream};
use crate::source::{IterSource, ObjectSource};

mod roots;

#[cfg(test)]
mod tests;

/// Counters for one rewrite run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Objects read from the source
    pub objects: usize,
    /// Blobs among them
    pub blobs: usize,
    /// Objects pushed to the output
    pub emitted: usize,
    /// Non-blob objects that could not resolve on arrival
    pub deferred: usize,
    /// Lookup collaborator calls
    pub lookups: usize,
}

/// Dependency-aware resolver for one run.
///
/// Owns the hash cache and the dependency index; neither outlives the run.
pub struct Resolver<L> {
    algorithm: HashAlgorithm,
    cache: HashCache,
    index: DependencyIndex,
    pending: HashMap<EntryId, PendingEntry>,
    pending_ids: HashMap<ObjectId, EntryId>,
    next_entry: EntryId,
    looked_up: HashSet<ObjectId>,
    lookup: L,
    output: OutputSequencer,
    stats: RewriteStats,
}

impl<L: Lookup> Resolver<L> {
    /// Create a resolver writing into `output`
    pub fn new(algorithm: HashAlgorithm, lookup: L, output: OutputSequencer) -> Self {
        Self {
            algorithm,
            cache: HashCache::new(),
            index: DependencyIndex::new(),
            pending: HashMap::new(),
            pending_ids: HashMap::new(),
            next_entry: 0,
            looked_up: HashSet::new(),
            lookup,
            output,
            stats: RewriteStats::default(),
        }
    }

    /// Rewrite everything `source` yields.
    ///
    /// Pushes objects but leaves the terminal signal to the caller. On
    /// failure the source is aborted before the error is returned.
    pub async fn run<S: ObjectSource>(mut self, mut source: S) -> RehashResult<RewriteStats> {
        match self.drive(&mut source).await {
            Ok(()) => {
                debug_assert!(self.pending.is_empty());
                Ok(self.stats)
            }
            Err(err) => {
                debug!("Aborting object source: {}", err);
                source.abort();
                Err(err)
            }
        }
    }

    async fn drive<S: ObjectSource>(&mut self, source: &mut S) -> RehashResult<()> {
        while let Some(next) = source.next_object().await {
            if self.output.is_closed() {
                return Err(RehashError::Aborted);
            }
            self.accept(next?)?;
        }
        debug!(
            "Input ended with {} pending objects waiting on {} hashes",
            self.pending.len(),
            self.index.len()
        );
        self.drain_on_input_end().await
    }

    fn accept(&mut self, object: GitObject) -> RehashResult<()> {
        self.stats.objects += 1;
        if !object.kind.has_links() {
            return self.emit_blob(object);
        }

        let entry = self.index_entry(object)?;
        self.try_resolve(entry)?;
        if let Some(entry) = self.pending.get(&entry) {
            debug!("Deferring {} {} until its references resolve", entry.kind, entry.source_id);
            self.stats.deferred += 1;
        }
        Ok(())
    }

    fn emit_blob(&mut self, object: GitObject) -> RehashResult<()> {
        self.stats.blobs += 1;
        let mut hasher = DualHasher::new(ObjectKind::Blob, object.declared_length, self.algorithm);
        hasher.update(&object.content);
        let digest = hasher.finalize();

        self.output.push(object)?;
        self.stats.emitted += 1;
        self.settle(digest.source, digest.target)
    }

    /// Buffer, hash and register a non-blob object
    fn index_entry(&mut self, object: GitObject) -> RehashResult<EntryId> {
        let mut hasher = SourceHasher::new(object.kind, object.declared_length);
        hasher.update(&object.content);
        let source_id = hasher.finalize();
        let links = parse_links(object.kind, &object.content)?;

        let entry = self.next_entry;
        self.next_entry += 1;
        for hash in links.keys() {
            if !self.cache.contains(hash) {
                self.index.register(*hash, entry);
            }
        }
        self.pending_ids.entry(source_id).or_insert(entry);
        self.pending.insert(
            entry,
            PendingEntry::new(object.kind, object.declared_length, source_id, links, object.content),
        );
        Ok(entry)
    }

    /// Resolve an entry if all of its references have targets
    fn try_resolve(&mut self, entry: EntryId) -> RehashResult<()> {
        match self.attempt(entry)? {
            Some((source_id, target)) => self.settle(source_id, target),
            None => Ok(()),
        }
    }

    /// One resolution attempt; returns the entry's hashes once emitted
    fn attempt(&mut self, entry_id: EntryId) -> RehashResult<Option<(ObjectId, TargetHash)>> {
        match self.pending.get_mut(&entry_id) {
            None => return Ok(None),
            Some(entry) if entry.resolving => return Ok(None),
            Some(entry) => {
                if !entry.is_ready(&self.cache) {
                    entry.attempts += 1;
                    return Ok(None);
                }
                entry.resolving = true;
            }
        }
        let Some(entry) = self.pending.remove(&entry_id) else {
            return Ok(None);
        };
        if self.pending_ids.get(&entry.source_id) == Some(&entry_id) {
            self.pending_ids.remove(&entry.source_id);
        }

        let cache = &self.cache;
        let content = patch_content(entry.kind, &entry.buffer, &entry.source_id, &entry.links, |id| {
            cache.get(id)
        })?;
        let target = TargetAccumulator::digest(self.algorithm, &content);

        debug!(
            "Emitting {} {} after {} failed attempts",
            entry.kind, entry.source_id, entry.attempts
        );
        self.output
            .push(GitObject::with_length(entry.kind, entry.declared_length, content))?;
        self.stats.emitted += 1;
        Ok(Some((entry.source_id, target)))
    }

    /// Record a resolved hash and re-attempt everyone waiting on it.
    ///
    /// Each resolution may wake further waiters, so this runs as a work
    /// queue rather than recursively.
    fn settle(&mut self, source_id: ObjectId, target: TargetHash) -> RehashResult<()> {
        let mut queue: VecDeque<EntryId> = self.record(source_id, target).into();
        while let Some(entry) = queue.pop_front() {
            if let Some((source_id, target)) = self.attempt(entry)? {
                queue.extend(self.record(source_id, target));
            }
        }
        Ok(())
    }

    fn record(&mut self, source_id: ObjectId, target: TargetHash) -> Vec<EntryId> {
        if let CacheInsert::Conflict { existing } = self.cache.record(source_id, target.clone()) {
            warn!(
                "Keeping target {} for {}, ignoring conflicting {}",
                existing, source_id, target
            );
        }
        self.index.take(&source_id)
    }

    /// Retry every waiter, then look up missing hashes until none are left
    async fn drain_on_input_end(&mut self) -> RehashResult<()> {
        loop {
            for entry in self.index.waiting_entries() {
                self.try_resolve(entry)?;
            }
            if self.index.is_empty() {
                return Ok(());
            }

            let root = roots::find_root(&self.index, &self.pending, &self.pending_ids, &self.cache)?;
            if !self.looked_up.insert(root) {
                return Err(RehashError::LookupFailure {
                    hash: root.to_hex(),
                    message: "hash is still unresolved after its lookup".to_string(),
                    source: None,
                });
            }
            if self.output.is_closed() {
                return Err(RehashError::Aborted);
            }

            let hex = root.to_hex();
            debug!(
                "Looking up {} for {} waiting objects",
                hex,
                self.index.waiting_on(&root).len()
            );
            self.stats.lookups += 1;
            let result = self.lookup.lookup(&hex).await;
            if self.output.is_closed() {
                return Err(RehashError::Aborted);
            }

            let bytes = result.map_err(|err| match err {
                err @ RehashError::LookupFailure { .. } => err,
                other => RehashError::lookup(hex.clone(), other),
            })?;
            if bytes.len() != self.algorithm.width() {
                return Err(RehashError::LookupFailure {
                    hash: hex,
                    message: format!(
                        "expected a {}-byte {} hash, got {} bytes",
                        self.algorithm.width(),
                        self.algorithm,
                        bytes.len()
                    ),
                    source: None,
                });
            }
            self.settle(root, TargetHash::new(bytes))?;
        }
    }
}

/// Run a rewrite on the current tokio runtime.
///
/// The returned stream yields objects as they resolve and ends with the
/// run's outcome.
pub fn spawn_rewrite<S, L>(source: S, lookup: L, algorithm: HashAlgorithm) -> OutputStream
where
    S: ObjectSource + 'static,
    L: Lookup + 'static,
{
    let (output, stream) = OutputSequencer::channel();
    tokio::spawn(async move {
        let resolver = Resolver::new(algorithm, lookup, output.clone());
        finish_run(resolver.run(source).await, &output);
    });
    stream
}

/// Rewrite an in-memory list of objects
pub async fn rewrite_objects<L: Lookup>(
    objects: Vec<GitObject>,
    lookup: L,
    algorithm: HashAlgorithm,
) -> RehashResult<Vec<GitObject>> {
    let (output, stream) = OutputSequencer::channel();
    let resolver = Resolver::new(algorithm, lookup, output.clone());
    finish_run(resolver.run(IterSource::from_objects(objects)).await, &output);
    stream.collect().await
}

fn finish_run(result: RehashResult<RewriteStats>, output: &OutputSequencer) {
    match result {
        Ok(stats) => {
            info!(
                "Rewrote {} objects ({} blobs, {} deferred, {} lookups)",
                stats.objects, stats.blobs, stats.deferred, stats.lookups
            );
            if let Err(err) = output.finish() {
                debug!("Could not signal the end of output: {}", err);
            }
        }
        Err(err) => {
            error!("Rewrite failed: {}", err);
            output.fail(err);
        }
    }
}
