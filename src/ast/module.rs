//! Module — the symbol registry, two-phase linker, and lazy resolver for
//! out-of-project symbols.
//!
//! A `Module` owns every node of one symbol graph in an arena, indexed by
//! identity path and by kind. Linking proceeds in two phases: `link`
//! resolves direct structural references (a field's declared type, a base
//! edge's target), `latelink` computes transitive properties (virtual and
//! override resolution, friend resolution) that need those direct
//! references to already be valid everywhere in the graph.
//!
//! Registration during linking is deferred onto a pending queue, so the
//! phase currently iterating the registry never observes concurrent
//! growth. This is the module's entire mutation-safety device: it makes
//! "register while iterating" safe on one logical thread.

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::{debug, error, warn};

use crate::base::SourceLocation;
use super::error::LinkError;
use super::fundamentals;
use super::node::{
    CallableData, MemberData, Node, NodeId, NodeKind, NodeKindTag, Visibility,
};
use super::path::{Segment, SymbolPath};
use super::type_ref::{ResolvedType, TypeLookup, TypeRef, TypeRefBase, TypeShape};

// ============================================================================
// REGISTRY ENTRIES & LOOKUP RESULTS
// ============================================================================

/// What the registry stores at one identity path.
///
/// Multi-valued kinds accumulate as an ordered list; everything else
/// merges into a single kept node. Consumers must handle both shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Single(NodeId),
    Multi(Vec<NodeId>),
}

impl Entry {
    /// All ids at this entry, in registration order.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Entry::Single(id) => std::slice::from_ref(id),
            Entry::Multi(ids) => ids,
        }
    }
}

/// A successful [`Module::find`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Found {
    One(NodeId),
    Many(Vec<NodeId>),
}

impl Found {
    /// The single hit, if unambiguous.
    pub fn one(&self) -> Option<NodeId> {
        match self {
            Found::One(id) => Some(*id),
            Found::Many(_) => None,
        }
    }

    /// All hits, in order.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            Found::One(id) => vec![*id],
            Found::Many(ids) => ids.clone(),
        }
    }
}

/// Linking lifecycle. `Linked` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkState {
    Unlinked,
    Linking,
    Linked,
}

// ============================================================================
// LAZY EXTERNALS
// ============================================================================

/// Opaque front-end token for an unexpanded out-of-project symbol
/// (a parser cursor handle).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExternalHandle(pub u64);

/// A not-yet-expanded out-of-project symbol, as delivered by the front-end.
#[derive(Clone, Debug)]
pub struct ExternalSeed {
    pub handle: ExternalHandle,
    pub path: SymbolPath,
    pub location: Option<SourceLocation>,
}

/// Expansion lifecycle of one placeholder. Modeled explicitly so the
/// single-threaded assumption stays visible: `Expanding` must never be
/// observed by a second caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExpandState {
    Unexpanded,
    Expanding,
    Expanded,
}

/// One deferred out-of-project symbol occurrence.
#[derive(Debug)]
pub struct ExternalPlaceholder {
    handle: ExternalHandle,
    location: Option<SourceLocation>,
    owner: Option<NodeId>,
    state: ExpandState,
    node: Option<NodeId>,
}

impl ExternalPlaceholder {
    /// The expanded node, once this placeholder has been expanded.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn state(&self) -> ExpandState {
        self.state
    }

    /// Restore-path constructor: a placeholder that was already expanded
    /// in a previous run.
    pub(crate) fn pre_expanded(node: NodeId) -> Self {
        Self {
            handle: ExternalHandle(0),
            location: None,
            owner: None,
            state: ExpandState::Expanded,
            node: Some(node),
        }
    }
}

/// Injected dependency that turns a placeholder into a real node.
///
/// Called by the core only from inside [`Module::find`], only on a
/// registry miss. Returns the built node plus seeds for the node's own
/// children, which become new placeholders; eagerly parsing every
/// transitively included header is cost-prohibitive, so only symbols
/// actually referenced get expanded.
pub trait ExternalExpander {
    fn expand(
        &mut self,
        handle: ExternalHandle,
        path: &SymbolPath,
    ) -> Option<(Node, Vec<ExternalSeed>)>;
}

// ============================================================================
// MODULE
// ============================================================================

/// The registry and linker for one symbol graph.
///
/// Exactly one `Module` owns its full node set at a time; node ids never
/// alias across modules. Resolved fields and children lists are
/// contractually stable and complete only after [`Module::link_all`] has
/// returned.
pub struct Module {
    pub(crate) nodes: Vec<Node>,
    pub(crate) contents: IndexMap<SymbolPath, Entry>,
    pub(crate) by_kind: FxHashMap<NodeKindTag, Vec<NodeId>>,
    pub(crate) state: LinkState,
    pending: VecDeque<Node>,
    pub(crate) externals: IndexMap<SymbolPath, Vec<ExternalPlaceholder>>,
    expander: Option<Box<dyn ExternalExpander>>,
    fundamentals: FxHashMap<SymbolPath, NodeId>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("symbols", &self.contents.len())
            .field("state", &self.state)
            .field("externals", &self.externals.len())
            .finish()
    }
}

impl Module {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            contents: IndexMap::new(),
            by_kind: FxHashMap::default(),
            state: LinkState::Unlinked,
            pending: VecDeque::new(),
            externals: IndexMap::new(),
            expander: None,
            fundamentals: FxHashMap::default(),
        }
    }

    /// Inject the external-resolution hook. Must happen before linking if
    /// any out-of-project symbol will be referenced.
    pub fn set_external_expander(&mut self, expander: Box<dyn ExternalExpander>) {
        self.expander = Some(expander);
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The node behind an id.
    ///
    /// # Panics
    /// Panics if the id was not issued by this module.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Registry entry at a path, without fundamental/external fallback and
    /// without triggering expansion.
    pub fn get(&self, path: &SymbolPath) -> Option<&Entry> {
        self.contents.get(path)
    }

    /// All registered symbols, in registration order.
    pub fn symbols(&self) -> impl Iterator<Item = (&SymbolPath, &Entry)> {
        self.contents.iter()
    }

    /// Ids of every registered node of one kind, in registration order.
    pub fn nodes_of_kind(&self, tag: NodeKindTag) -> &[NodeId] {
        self.by_kind.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of registered identity paths.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a node.
    ///
    /// Outside linking, the node is stored immediately (merging or
    /// list-appending per kind) and its kept id is returned. During
    /// linking, the registration is deferred onto the pending queue and
    /// `Ok(None)` is returned; the linker drains the queue itself.
    pub fn register(&mut self, node: Node) -> Result<Option<NodeId>, LinkError> {
        match self.state {
            LinkState::Linking => {
                self.pending.push_back(node);
                Ok(None)
            }
            LinkState::Linked => Err(LinkError::RegisterAfterLink { path: node.path }),
            LinkState::Unlinked => self.register_internal(node).map(Some),
        }
    }

    pub(crate) fn alloc(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.id = id;
        let owner = node.owner;
        self.nodes.push(node);
        // An owner attached before registration is wired into its child
        // list immediately; parameter dedup scans that list, so it must
        // be current before linking rebuilds it.
        if let Some(owner) = owner {
            self.node_mut(owner).children.push(id);
        }
        id
    }

    fn register_internal(&mut self, node: Node) -> Result<NodeId, LinkError> {
        let tag = node.kind.tag();
        if tag.multi_valued() {
            // Parameters de-duplicate per owner+index across repeated
            // declarations of their callable.
            if tag == NodeKindTag::Parameter {
                if let Some(kept) = self.matching_parameter(&node) {
                    self.merge_parameter(kept, node)?;
                    return Ok(kept);
                }
            }
            let path = node.path.clone();
            let id = self.alloc(node);
            match self.contents.get_mut(&path) {
                Some(Entry::Multi(ids)) => ids.push(id),
                Some(Entry::Single(_)) => {
                    // Mixed kinds at one path. Keep the original entry but
                    // leave the newcomer reachable through the kind index.
                    warn!(path = %path, "multi-valued registration at a single-valued path");
                }
                None => {
                    self.contents.insert(path, Entry::Multi(vec![id]));
                }
            }
            self.by_kind.entry(tag).or_default().push(id);
            Ok(id)
        } else {
            match self.contents.get(&node.path) {
                Some(Entry::Single(kept)) => {
                    let kept = *kept;
                    self.merge_into(kept, node)?;
                    Ok(kept)
                }
                Some(Entry::Multi(_)) => {
                    warn!(path = %node.path, "single-valued registration at a multi-valued path");
                    let path = node.path.clone();
                    let id = self.alloc(node);
                    if let Some(Entry::Multi(ids)) = self.contents.get_mut(&path) {
                        ids.push(id);
                    }
                    self.by_kind.entry(tag).or_default().push(id);
                    Ok(id)
                }
                None => {
                    let path = node.path.clone();
                    let id = self.alloc(node);
                    self.contents.insert(path, Entry::Single(id));
                    self.by_kind.entry(tag).or_default().push(id);
                    Ok(id)
                }
            }
        }
    }

    /// Merge an incoming occurrence into the kept node at the same path:
    /// definition locations combine (a second full definition is a fault),
    /// declarations accumulate, and the incoming children are re-owned.
    fn merge_into(&mut self, kept: NodeId, mut incoming: Node) -> Result<(), LinkError> {
        {
            let kept_node = self.node(kept);
            if let (Some(a), Some(b)) = (kept_node.callable(), incoming.callable()) {
                if a.parameter_types != b.parameter_types {
                    return Err(LinkError::ParameterMismatch {
                        path: incoming.path,
                    });
                }
            }
            if let Some(location) = incoming.definition_location {
                if kept_node.definition_location.is_some() {
                    return Err(LinkError::DuplicateDefinition {
                        path: incoming.path,
                        location,
                    });
                }
            }
        }

        let children = std::mem::take(&mut incoming.children);
        let decls = std::mem::take(&mut incoming.declaration_locations);
        let definition = incoming.definition_location;

        let kept_node = self.node_mut(kept);
        if definition.is_some() {
            kept_node.definition_location = definition;
        }
        kept_node.declaration_locations.extend(decls);

        for child in children {
            self.node_mut(child).owner = Some(kept);
            self.node_mut(kept).children.push(child);
        }
        Ok(())
    }

    /// An already-registered parameter of the same callable at the same
    /// index, if any. Scans only the owning callable's children.
    fn matching_parameter(&self, node: &Node) -> Option<NodeId> {
        let NodeKind::Parameter(incoming) = &node.kind else {
            return None;
        };
        let owner = node.owner?;
        self.node(owner).children.iter().copied().find(|&id| {
            matches!(&self.node(id).kind, NodeKind::Parameter(p) if p.index == incoming.index)
        })
    }

    fn merge_parameter(&mut self, kept: NodeId, incoming: Node) -> Result<(), LinkError> {
        let NodeKind::Parameter(new_data) = incoming.kind else {
            unreachable!("merge_parameter called on a non-parameter");
        };
        let new_path = incoming.path;
        let decls = incoming.declaration_locations;

        let kept_node = self.node_mut(kept);
        let NodeKind::Parameter(data) = &mut kept_node.kind else {
            unreachable!();
        };
        if data.type_ref != new_data.type_ref {
            return Err(LinkError::ParameterMismatch {
                path: kept_node.path.clone(),
            });
        }
        // A declaration that names the parameter wins over an unnamed one.
        let mut reindex = None;
        if data.name.is_none() && new_data.name.is_some() {
            data.name = new_data.name;
            reindex = Some((kept_node.path.clone(), new_path.clone()));
            kept_node.path = new_path;
        }
        kept_node.declaration_locations.extend(decls);

        // The registry is keyed by path; follow the rename.
        if let Some((old_path, new_path)) = reindex {
            if let Some(Entry::Multi(ids)) = self.contents.get_mut(&old_path) {
                ids.retain(|&other| other != kept);
                if ids.is_empty() {
                    self.contents.shift_remove(&old_path);
                }
            }
            match self.contents.get_mut(&new_path) {
                Some(Entry::Multi(ids)) => ids.push(kept),
                Some(Entry::Single(_)) => {}
                None => {
                    self.contents.insert(new_path, Entry::Multi(vec![kept]));
                }
            }
        }
        Ok(())
    }

    /// Eagerly detach a node: path index, kind index, and former owner's
    /// child list. Driven by the incremental-recompile collaborator before
    /// re-ingesting a changed source's symbols.
    pub fn remove(&mut self, id: NodeId) {
        let path = self.node(id).path.clone();
        let tag = self.node(id).kind.tag();

        match self.contents.get_mut(&path) {
            Some(Entry::Single(kept)) if *kept == id => {
                self.contents.shift_remove(&path);
            }
            Some(Entry::Multi(ids)) => {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.contents.shift_remove(&path);
                }
            }
            _ => {}
        }
        if let Some(ids) = self.by_kind.get_mut(&tag) {
            ids.retain(|&other| other != id);
        }
        if let Some(owner) = self.node(id).owner {
            self.node_mut(owner).children.retain(|&child| child != id);
        }
        // Sever the back-reference so the linking-time children rebuild
        // cannot resurrect the node.
        self.node_mut(id).owner = None;
    }

    /// Every registered id, in registration order.
    fn registered_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.contents.len());
        for entry in self.contents.values() {
            out.extend_from_slice(entry.ids());
        }
        out
    }

    // ------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------

    /// Link the whole graph. Runs exactly once.
    ///
    /// 1. Rebuild every node's children list from the stored owner
    ///    back-references (defends against duplicates from prior partial
    ///    runs).
    /// 2. Run the per-kind `link` hook on every node registered so far;
    ///    nodes synthesized here (implicit constructors/destructors) land
    ///    on the pending queue.
    /// 3. Drain the queue FIFO: register, connect to the parent resolved
    ///    from the path, and `link` each drained node — including nodes
    ///    enqueued by earlier drained nodes.
    /// 4. Run `latelink` on everything registered so far, then drain once
    ///    more, invoking both hooks on newly surfaced nodes.
    pub fn link_all(&mut self) -> Result<(), LinkError> {
        if self.state != LinkState::Unlinked {
            return Err(LinkError::AlreadyLinked);
        }
        self.state = LinkState::Linking;
        debug!(symbols = self.contents.len(), "linking module");

        // Phase 1: children from owner back-references.
        for node in &mut self.nodes {
            node.children.clear();
        }
        let ids = self.registered_ids();
        for &id in &ids {
            if let Some(owner) = self.node(id).owner {
                self.node_mut(owner).children.push(id);
            }
        }

        // Phase 2: direct references.
        for &id in &ids {
            self.link_node(id).map_err(|e| {
                error!(path = %self.node(id).path, "while linking symbol");
                e
            })?;
        }

        // Phase 3: implicit symbols added during link().
        self.drain_pending(false)?;

        // Phase 4: transitive properties, then implicits added by them.
        let ids = self.registered_ids();
        for &id in &ids {
            self.latelink_node(id).map_err(|e| {
                error!(path = %self.node(id).path, "while late-linking symbol");
                e
            })?;
        }
        self.drain_pending(true)?;

        self.state = LinkState::Linked;
        Ok(())
    }

    fn drain_pending(&mut self, late: bool) -> Result<(), LinkError> {
        while let Some(node) = self.pending.pop_front() {
            let id = self.register_internal(node).map_err(|e| {
                error!("while registering implicit symbol generated during linking");
                e
            })?;

            // Connect to the parent the path resolves to.
            if self.node(id).owner.is_none() {
                if let Some(parent_path) = self.node(id).path.parent() {
                    if let Some(found) = self.find(&parent_path) {
                        if let Some(parent) = found.one() {
                            self.node_mut(id).owner = Some(parent);
                            self.node_mut(parent).children.push(id);
                        }
                    }
                }
            }

            self.link_node(id)?;
            if late {
                self.latelink_node(id)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Per-kind link hooks
    // ------------------------------------------------------------------

    fn link_node(&mut self, id: NodeId) -> Result<(), LinkError> {
        match self.node(id).kind.tag() {
            NodeKindTag::Record => self.link_record(id),
            NodeKindTag::Field => {
                let type_ref = match &self.node(id).kind {
                    NodeKind::Field { type_ref, .. } => type_ref.clone(),
                    _ => unreachable!(),
                };
                let lookup = self.resolve_type_ref(&type_ref);
                if lookup.is_unresolved() {
                    warn!(path = %self.node(id).path, ty = %type_ref, "could not resolve field type");
                }
                if let NodeKind::Field { resolved, .. } = &mut self.node_mut(id).kind {
                    *resolved = Some(lookup);
                }
                Ok(())
            }
            NodeKindTag::StaticVar | NodeKindTag::GlobalVar => {
                let type_ref = match &self.node(id).kind {
                    NodeKind::StaticVar { type_ref, .. } | NodeKind::GlobalVar { type_ref, .. } => {
                        type_ref.clone()
                    }
                    _ => unreachable!(),
                };
                let lookup = match &type_ref {
                    Some(tr) => self.resolve_type_ref(tr),
                    None => TypeLookup::Unresolved,
                };
                if lookup.is_unresolved() {
                    warn!(path = %self.node(id).path, "could not resolve variable type");
                }
                match &mut self.node_mut(id).kind {
                    NodeKind::StaticVar { resolved, .. } | NodeKind::GlobalVar { resolved, .. } => {
                        *resolved = Some(lookup)
                    }
                    _ => unreachable!(),
                }
                Ok(())
            }
            NodeKindTag::Base => {
                let target = match &self.node(id).kind {
                    NodeKind::Base { target, .. } => target.clone(),
                    _ => unreachable!(),
                };
                let lookup = self.find_as_lookup(&target);
                if lookup.is_unresolved() {
                    let owner = self
                        .node(id)
                        .owner
                        .map(|o| self.node(o).path.to_string())
                        .unwrap_or_default();
                    warn!(target = %target, owner = %owner, "could not resolve parent type");
                }
                if let NodeKind::Base {
                    resolved_target, ..
                } = &mut self.node_mut(id).kind
                {
                    *resolved_target = Some(lookup);
                }
                Ok(())
            }
            NodeKindTag::Function
            | NodeKindTag::StaticMethod
            | NodeKindTag::Method
            | NodeKindTag::Constructor
            | NodeKindTag::Destructor => {
                debug_assert!(
                    matches!(
                        self.node(id).path.own_name(),
                        Some(Segment::CallParameterized { .. })
                    ),
                    "callable {} is missing its call-parameterized segment",
                    self.node(id).path
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// A record type with a definition and no user-declared constructor
    /// gets a transient public default constructor, and likewise a
    /// destructor if absent. Linking is active, so the registrations land
    /// on the pending queue.
    fn link_record(&mut self, id: NodeId) -> Result<(), LinkError> {
        let Some(def_loc) = self.node(id).definition_location else {
            return Ok(());
        };
        let path = self.node(id).path.clone();
        let own_name = match path.own_name() {
            Some(segment) => segment.base_name().clone(),
            None => return Ok(()),
        };

        let has_ctor = self
            .node(id)
            .children
            .iter()
            .any(|&c| self.node(c).kind.tag() == NodeKindTag::Constructor);
        if !has_ctor {
            let ctor_path = path.join(Segment::call_parameterized(own_name.clone(), vec![], vec![]));
            let ctor = Node::constructor(
                ctor_path,
                def_loc,
                true,
                MemberData::new(Visibility::Public),
                CallableData::new(None, vec![]).inline(true),
            )
            .transient();
            self.register(ctor)?;
        }

        let has_dtor = self
            .node(id)
            .children
            .iter()
            .any(|&c| self.node(c).kind.tag() == NodeKindTag::Destructor);
        if !has_dtor {
            let dtor_path = path.join(Segment::call_parameterized(
                format!("~{own_name}"),
                vec![],
                vec![],
            ));
            let dtor = Node::destructor(
                dtor_path,
                def_loc,
                true,
                MemberData::new(Visibility::Public),
                super::node::VirtualData::explicit(false, false, false),
                CallableData::new(None, vec![]).inline(true),
            )
            .transient();
            self.register(dtor)?;
        }
        Ok(())
    }

    fn latelink_node(&mut self, id: NodeId) -> Result<(), LinkError> {
        match self.node(id).kind.tag() {
            NodeKindTag::Method => {
                self.latelink_virtual(id);
                Ok(())
            }
            NodeKindTag::Destructor => {
                self.latelink_destructor(id);
                Ok(())
            }
            NodeKindTag::Friend => {
                let target = match &self.node(id).kind {
                    NodeKind::Friend { target, .. } => target.clone(),
                    _ => unreachable!(),
                };
                let lookup = self.find_as_lookup(&target);
                if let NodeKind::Friend {
                    resolved_target, ..
                } = &mut self.node_mut(id).kind
                {
                    *resolved_target = Some(lookup);
                }
                Ok(())
            }
            NodeKindTag::Parameter => {
                let type_ref = match &self.node(id).kind {
                    NodeKind::Parameter(data) => data.type_ref.clone(),
                    _ => unreachable!(),
                };
                let lookup = self.resolve_type_ref(&type_ref);
                if let NodeKind::Parameter(data) = &mut self.node_mut(id).kind {
                    data.resolved = Some(lookup);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Virtual / override / abstract resolution
    // ------------------------------------------------------------------

    /// The member this one overrides or hides: the first matching member
    /// found in the owning record's ancestry. Matching is by final path
    /// segment, so callables match on their full call signature.
    pub fn inherited_version(&self, member: NodeId) -> Option<NodeId> {
        let owner = self.node(member).owner?;
        if self.node(owner).kind.tag() != NodeKindTag::Record {
            return None;
        }
        let name = self.node(member).path.own_name()?.clone();
        self.find_member_in_parents(owner, &name)
    }

    /// Virtual-ness of a member, computed over its inherited chain without
    /// relying on sibling latelink order.
    fn computed_virtual(&self, member: NodeId) -> bool {
        let explicit = self
            .node(member)
            .virtual_data()
            .is_some_and(|v| v.explicit_virtual);
        if explicit {
            return true;
        }
        // Inheritance is acyclic by construction; this terminates.
        self.inherited_version(member)
            .is_some_and(|parent| self.computed_virtual(parent))
    }

    fn latelink_virtual(&mut self, id: NodeId) {
        let parent_virtual = self
            .inherited_version(id)
            .is_some_and(|parent| self.computed_virtual(parent));
        if let Some(virt) = self.node_mut(id).virtual_data_mut() {
            virt.resolved_virtual = Some(virt.explicit_virtual || parent_virtual);
            // Override-ness depends on the parent member's virtual-ness,
            // not the parent's own override flag.
            virt.resolved_override = Some(virt.explicit_override || parent_virtual);
        }
    }

    /// Destructors chain by type, not by signature: a destructor is
    /// virtual if any destructor in the flattened ancestor set of its
    /// declaring type is explicitly virtual.
    fn latelink_destructor(&mut self, id: NodeId) {
        let ancestor_dtors = match self.node(id).owner {
            Some(owner) => self.ancestor_destructors(owner),
            None => Vec::new(),
        };
        let any_ancestor_virtual = ancestor_dtors.iter().any(|&d| {
            self.node(d)
                .virtual_data()
                .is_some_and(|v| v.explicit_virtual)
        });
        if let Some(virt) = self.node_mut(id).virtual_data_mut() {
            virt.resolved_virtual = Some(virt.explicit_virtual || any_ancestor_virtual);
            virt.resolved_override = Some(any_ancestor_virtual);
        }
    }

    /// Destructors of every ancestor of `record`, depth-first over base
    /// edges in declaration order. Excludes `record`'s own destructor.
    fn ancestor_destructors(&self, record: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in &self.node(record).children {
            if let NodeKind::Base {
                resolved_target: Some(TypeLookup::Node(target)),
                ..
            } = &self.node(child).kind
            {
                let target = *target;
                if let Some(dtor) = self
                    .node(target)
                    .children
                    .iter()
                    .copied()
                    .find(|&c| self.node(c).kind.tag() == NodeKindTag::Destructor)
                {
                    out.push(dtor);
                }
                out.extend(self.ancestor_destructors(target));
            }
        }
        out
    }

    /// A record type is abstract if explicitly marked so or if any direct
    /// member is pure virtual. Deliberately not recursive into parent
    /// types: inherited unimplemented pure-virtuals are not detected.
    pub fn is_abstract(&self, record: NodeId) -> bool {
        if let NodeKind::Record(data) = &self.node(record).kind {
            if data.explicit_abstract {
                return true;
            }
        }
        self.node(record).children.iter().any(|&c| {
            self.node(c)
                .virtual_data()
                .is_some_and(|v| v.explicit_abstract)
        })
    }

    /// Member lookup on a record type: own children first, then (if
    /// `search_parents`) depth-first into each base edge in declaration
    /// order, returning the first hit. Diamond inheritance returns the
    /// first-found member without validating agreement across paths; this
    /// is a known limitation, not a feature.
    pub fn find_member(
        &self,
        record: NodeId,
        name: &Segment,
        search_parents: bool,
    ) -> Option<NodeId> {
        for &child in &self.node(record).children {
            let node = self.node(child);
            if node.member().is_some() && node.path.own_name() == Some(name) {
                return Some(child);
            }
        }
        if search_parents {
            return self.find_member_in_parents(record, name);
        }
        None
    }

    /// Member lookup restricted to the ancestry of `record`.
    pub fn find_member_in_parents(&self, record: NodeId, name: &Segment) -> Option<NodeId> {
        for &child in &self.node(record).children {
            if let NodeKind::Base {
                resolved_target: Some(TypeLookup::Node(target)),
                ..
            } = &self.node(child).kind
            {
                if let Some(hit) = self.find_member(*target, name, true) {
                    return Some(hit);
                }
            }
        }
        None
    }

    /// True if any friend declaration of `record` satisfies `selector`.
    pub fn is_friended(&self, record: NodeId, selector: impl Fn(&Node) -> bool) -> bool {
        self.node(record)
            .children
            .iter()
            .any(|&c| self.node(c).kind.tag() == NodeKindTag::Friend && selector(self.node(c)))
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve an identity path to its node(s).
    ///
    /// Resolution order: owned registry, then the fixed fundamental-type
    /// set, then lazy expansion of external placeholders.
    ///
    /// # Panics
    /// Panics if called before linking has begun.
    pub fn find(&mut self, path: &SymbolPath) -> Option<Found> {
        assert!(
            self.state != LinkState::Unlinked,
            "Module::find may only be called once linking has begun"
        );

        if let Some(entry) = self.contents.get(path) {
            return Some(match entry {
                Entry::Single(id) => Found::One(*id),
                Entry::Multi(ids) => Found::Many(ids.clone()),
            });
        }

        if fundamentals::is_fundamental(path) {
            return Some(Found::One(self.intern_fundamental(path)));
        }

        self.try_find_external(path)
    }

    fn find_as_lookup(&mut self, path: &SymbolPath) -> TypeLookup {
        match self.find(path) {
            Some(Found::One(id)) => TypeLookup::Node(id),
            Some(Found::Many(ids)) => TypeLookup::Overloads(ids),
            None => TypeLookup::Unresolved,
        }
    }

    /// Fundamental types are shared fixtures: interned into the arena on
    /// first lookup, never registry entries.
    fn intern_fundamental(&mut self, path: &SymbolPath) -> NodeId {
        if let Some(&id) = self.fundamentals.get(path) {
            return id;
        }
        let name = path
            .own_name()
            .expect("fundamental paths have one segment")
            .base_name()
            .clone();
        let id = self.alloc(Node::fundamental(&name));
        self.fundamentals.insert(path.clone(), id);
        id
    }

    // ------------------------------------------------------------------
    // Type-reference resolution
    // ------------------------------------------------------------------

    /// Resolve a type reference. Plain value shapes go through an ordinary
    /// path lookup; qualified shapes are resolved structurally. Unresolved
    /// sub-parts are tolerated, not fatal.
    pub fn resolve_type_ref(&mut self, type_ref: &TypeRef) -> TypeLookup {
        if type_ref.is_plain_value() {
            match &type_ref.base {
                Some(TypeRefBase::Path(path)) => self.find_as_lookup(path),
                Some(TypeRefBase::Literal(text)) => {
                    let path = SymbolPath::root().join_name(text.clone());
                    self.find_as_lookup(&path)
                }
                Some(TypeRefBase::Nested(inner)) => self.resolve_type_ref(inner),
                None => TypeLookup::Unresolved,
            }
        } else {
            match self.resolve_qualified(type_ref) {
                Ok(resolved) => TypeLookup::Qualified(Box::new(resolved)),
                // resolve_qualified only faults on plain values.
                Err(_) => TypeLookup::Unresolved,
            }
        }
    }

    /// Structurally resolve a pointer/reference/function-pointer shaped
    /// reference: each sub-part (base, return type, arguments, owner) is
    /// resolved recursively.
    ///
    /// Faults only on the misuse case of a plain value reference, which
    /// must go through [`Module::resolve_type_ref`] or a direct lookup.
    pub fn resolve_qualified(&mut self, type_ref: &TypeRef) -> Result<ResolvedType, LinkError> {
        let shape = type_ref.shape.tag();
        let qualifiers = type_ref.qualifiers.clone();

        let base_lookup = |module: &mut Self| match &type_ref.base {
            Some(TypeRefBase::Path(path)) => module.find_as_lookup(path),
            Some(TypeRefBase::Nested(inner)) => module.resolve_type_ref(inner),
            Some(TypeRefBase::Literal(text)) => {
                let path = SymbolPath::root().join_name(text.clone());
                module.find_as_lookup(&path)
            }
            None => TypeLookup::Unresolved,
        };

        match &type_ref.shape {
            TypeShape::Value { .. } => Err(LinkError::UnqualifiedResolve),
            TypeShape::Pointer | TypeShape::Reference | TypeShape::MoveReference => {
                let base = base_lookup(self);
                Ok(ResolvedType {
                    shape,
                    qualifiers,
                    base: Some(base),
                    owner: None,
                    return_type: None,
                    args: Vec::new(),
                })
            }
            TypeShape::FunctionPointer { return_type, args } => {
                let return_type = self.resolve_type_ref(return_type);
                let args = args.iter().map(|a| self.resolve_type_ref(a)).collect();
                Ok(ResolvedType {
                    shape,
                    qualifiers,
                    base: None,
                    owner: None,
                    return_type: Some(return_type),
                    args,
                })
            }
            TypeShape::MemberFieldPointer { owner } => {
                let owner = self.find_as_lookup(owner);
                let base = base_lookup(self);
                Ok(ResolvedType {
                    shape,
                    qualifiers,
                    base: Some(base),
                    owner: Some(owner),
                    return_type: None,
                    args: Vec::new(),
                })
            }
            TypeShape::MemberFunctionPointer {
                owner,
                return_type,
                args,
                ..
            } => {
                let owner = self.find_as_lookup(owner);
                let return_type = self.resolve_type_ref(return_type);
                let args = args.iter().map(|a| self.resolve_type_ref(a)).collect();
                Ok(ResolvedType {
                    shape,
                    qualifiers,
                    base: None,
                    owner: Some(owner),
                    return_type: Some(return_type),
                    args,
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Lazy external expansion
    // ------------------------------------------------------------------

    /// Record an out-of-project symbol occurrence for possible later
    /// expansion. Occurrences at one path and location are de-duplicated.
    pub fn add_external(&mut self, seed: ExternalSeed) {
        self.add_external_with_owner(seed, None);
    }

    fn add_external_with_owner(&mut self, seed: ExternalSeed, owner: Option<NodeId>) {
        let group = self.externals.entry(seed.path).or_default();
        let already_known = seed.location.is_some()
            && group.iter().any(|p| p.location == seed.location);
        if !already_known {
            group.push(ExternalPlaceholder {
                handle: seed.handle,
                location: seed.location,
                owner,
                state: ExpandState::Unexpanded,
                node: None,
            });
        }
    }

    /// Resolve a path against the external placeholder groups, expanding
    /// the longest already-known prefix group on demand until the path
    /// resolves or its group is exhausted.
    fn try_find_external(&mut self, requested: &SymbolPath) -> Option<Found> {
        loop {
            // Trivial case: the requested group is fully expanded.
            if let Some(group) = self.externals.get(requested) {
                if group.iter().all(|p| p.state == ExpandState::Expanded) {
                    let ids: Vec<NodeId> = group.iter().filter_map(|p| p.node).collect();
                    return match ids.len() {
                        0 => {
                            warn!(path = %requested, "external group expanded to no nodes");
                            None
                        }
                        1 => Some(Found::One(ids[0])),
                        _ => Some(Found::Many(ids)),
                    };
                }
            }

            // Longest already-known prefix of the requested path.
            let mut known: Option<SymbolPath> = None;
            let mut cursor = Some(requested.clone());
            while let Some(path) = cursor {
                if path.is_empty() {
                    break;
                }
                if self.externals.contains_key(&path) {
                    known = Some(path);
                    break;
                }
                cursor = path.parent();
            }

            let Some(group_path) = known else {
                // Probably a system-library symbol nobody handed us.
                warn!(path = %requested, "could not locate external symbol");
                return None;
            };

            if self.externals[&group_path]
                .iter()
                .all(|p| p.state == ExpandState::Expanded)
            {
                // The containing group is exhausted and the symbol never
                // surfaced. Expected miss; the Expanded states prevent any
                // re-expansion on later calls.
                warn!(path = %requested, group = %group_path, "unresolvable external symbol");
                return None;
            }

            self.expand_group(&group_path);
        }
    }

    /// Expand every unexpanded placeholder in one group, registering each
    /// expanded node's children as new placeholders.
    fn expand_group(&mut self, group_path: &SymbolPath) {
        let Some(mut expander) = self.expander.take() else {
            warn!(path = %group_path, "no external expander injected; marking group unresolvable");
            if let Some(group) = self.externals.get_mut(group_path) {
                for placeholder in group {
                    placeholder.state = ExpandState::Expanded;
                }
            }
            return;
        };

        let count = self.externals[group_path].len();
        for i in 0..count {
            {
                let placeholder = &mut self.externals.get_mut(group_path).unwrap()[i];
                if placeholder.state != ExpandState::Unexpanded {
                    continue;
                }
                placeholder.state = ExpandState::Expanding;
            }
            let (handle, owner) = {
                let placeholder = &self.externals[group_path][i];
                (placeholder.handle, placeholder.owner)
            };

            match expander.expand(handle, group_path) {
                Some((mut node, seeds)) => {
                    debug!(path = %group_path, "expanded external symbol");
                    node.owner = owner;
                    // alloc wires the owner's child list.
                    let id = self.alloc(node);
                    {
                        let placeholder = &mut self.externals.get_mut(group_path).unwrap()[i];
                        placeholder.state = ExpandState::Expanded;
                        placeholder.node = Some(id);
                    }
                    for seed in seeds {
                        self.add_external_with_owner(seed, Some(id));
                    }
                }
                None => {
                    debug!(path = %group_path, "external handle produced no node");
                    let placeholder = &mut self.externals.get_mut(group_path).unwrap()[i];
                    placeholder.state = ExpandState::Expanded;
                }
            }
        }

        self.expander = Some(expander);
    }
}
