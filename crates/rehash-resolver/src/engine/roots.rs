//! Choosing which missing hash to look up next
//!
//! Unresolved hashes form a graph: a hash that belongs to a pending entry
//! points at the hashes that entry still waits on. Looking up a hash that
//! is itself pending would be wasted work, since it resolves on its own
//! once its dependencies do. The useful candidates are the leaves: hashes
//! someone waits on that never showed up in the input.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use rehash_core::error::{RehashError, RehashResult};
use rehash_core::ObjectId;

use crate::cache::HashCache;
use crate::index::{DependencyIndex, EntryId, PendingEntry};

/// Graph of unresolved hashes, edges pointing from dependent to dependency
pub(crate) fn unresolved_graph(
    index: &DependencyIndex,
    pending: &HashMap<EntryId, PendingEntry>,
    pending_ids: &HashMap<ObjectId, EntryId>,
    cache: &HashCache,
) -> DiGraphMap<ObjectId, ()> {
    let mut graph = DiGraphMap::new();
    for hash in index.hashes() {
        graph.add_node(*hash);
        let Some(entry) = pending_ids.get(hash).and_then(|id| pending.get(id)) else {
            continue;
        };
        for dependency in entry.missing(cache) {
            graph.add_edge(*hash, *dependency, ());
        }
    }
    graph
}

/// First hash in registration order that is waited on but not pending.
///
/// With content addressing the unresolved graph is acyclic, so a leaf
/// always exists; crafted input without one fails with `DependencyCycle`.
pub(crate) fn find_root(
    index: &DependencyIndex,
    pending: &HashMap<EntryId, PendingEntry>,
    pending_ids: &HashMap<ObjectId, EntryId>,
    cache: &HashCache,
) -> RehashResult<ObjectId> {
    let graph = unresolved_graph(index, pending, pending_ids, cache);
    let root = index.hashes().find(|hash| {
        !pending_ids.contains_key(*hash)
            && graph.neighbors_directed(**hash, Direction::Outgoing).next().is_none()
    });
    if let Some(root) = root {
        return Ok(*root);
    }

    let hashes = match toposort(&graph, None) {
        Err(cycle) => cycle.node_id().to_hex(),
        Ok(_) => index
            .hashes()
            .map(|hash| hash.to_hex())
            .collect::<Vec<_>>()
            .join(", "),
    };
    Err(RehashError::DependencyCycle { hashes })
}
