//! Persisted snapshots of a symbol graph.
//!
//! A [`Snapshot`] carries explicit data only: identity paths, locations,
//! owner paths, and per-kind payloads. Resolved link products and
//! transient (linker-synthesized) nodes are excluded; re-linking after
//! restore regenerates all of them. Node ordering is deterministic, so
//! equal graphs serialize byte-identically regardless of registration
//! order.

use serde::{Deserialize, Serialize};

use crate::base::SourceLocation;
use super::error::LinkError;
use super::module::{Entry, ExternalPlaceholder, Module};
use super::node::{Node, NodeId, NodeKind};
use super::path::SymbolPath;

/// One persisted node. Owner is recorded by path; arena ids are not
/// stable across processes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub path: SymbolPath,
    pub owner: Option<SymbolPath>,
    pub declaration_locations: Vec<SourceLocation>,
    pub definition_location: Option<SourceLocation>,
    pub kind: NodeKind,
}

/// A persisted module image: front-end-registered symbols plus the
/// already-expanded externals (so a restored module never re-parses what
/// a previous run already expanded).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub owned: Vec<SnapshotNode>,
    pub externals: Vec<SnapshotNode>,
}

impl Module {
    /// Capture the explicit state of this module.
    pub fn snapshot(&self) -> Snapshot {
        let mut owned = Vec::new();
        for entry in self.contents.values() {
            for &id in entry.ids() {
                let node = self.node(id);
                if node.transient {
                    continue;
                }
                owned.push(self.snapshot_node(node));
            }
        }
        owned.sort_by_cached_key(|n| n.path.to_string());

        let mut externals = Vec::new();
        for group in self.externals.values() {
            for placeholder in group {
                if let Some(id) = placeholder.node() {
                    externals.push(self.snapshot_node(self.node(id)));
                }
            }
        }
        externals.sort_by_cached_key(|n| n.path.to_string());

        Snapshot { owned, externals }
    }

    fn snapshot_node(&self, node: &Node) -> SnapshotNode {
        SnapshotNode {
            path: node.path.clone(),
            owner: node.owner.map(|o| self.node(o).path.clone()),
            declaration_locations: node.declaration_locations.clone(),
            definition_location: node.definition_location,
            kind: node.kind.clone(),
        }
    }

    /// Rebuild a module from a snapshot. The result is unlinked;
    /// [`Module::link_all`] regenerates every resolved field and every
    /// transient node.
    pub fn restore(snapshot: Snapshot) -> Result<Module, LinkError> {
        let mut module = Module::new();
        let mut owners: Vec<(NodeId, SymbolPath)> = Vec::new();

        for snap in snapshot.owned {
            let node = rebuild_node(snap.path, snap.declaration_locations, snap.definition_location, snap.kind);
            if let Some(id) = module.register(node)? {
                if let Some(owner_path) = snap.owner {
                    owners.push((id, owner_path));
                }
            }
        }

        // Already-expanded externals re-enter as expanded placeholder
        // groups, outside the owned registry.
        for snap in snapshot.externals {
            let path = snap.path.clone();
            let node = rebuild_node(snap.path, snap.declaration_locations, snap.definition_location, snap.kind);
            let id = module.alloc(node);
            if let Some(owner_path) = snap.owner {
                owners.push((id, owner_path));
            }
            module
                .externals
                .entry(path)
                .or_default()
                .push(ExternalPlaceholder::pre_expanded(id));
        }

        // Owners wire up by path once everything exists.
        for (id, owner_path) in owners {
            let owner = match module.contents.get(&owner_path) {
                Some(Entry::Single(owner)) => Some(*owner),
                _ => module
                    .externals
                    .get(&owner_path)
                    .and_then(|group| group.iter().find_map(|p| p.node())),
            };
            module.nodes[id.index() as usize].owner = owner;
        }

        Ok(module)
    }
}

fn rebuild_node(
    path: SymbolPath,
    declaration_locations: Vec<SourceLocation>,
    definition_location: Option<SourceLocation>,
    kind: NodeKind,
) -> Node {
    let mut node = Node::new(path, None, false, kind);
    node.declaration_locations = declaration_locations;
    node.definition_location = definition_location;
    node
}
