//! The tagged node hierarchy: one node per declared-or-defined symbol.
//!
//! The original open class hierarchy (member-ness, virtual-capability,
//! callable-ness as mixins) is flattened into a closed [`NodeKind`] enum
//! with per-kind payload. The capability mixins survive as payload structs
//! ([`MemberData`], [`VirtualData`], [`CallableData`]) reachable through
//! uniform accessors on [`Node`], so consumers can ask "is this a member?"
//! without matching every kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::base::SourceLocation;
use super::path::{Segment, SymbolPath};
use super::type_ref::{TypeLookup, TypeRef};

// ============================================================================
// IDS
// ============================================================================

/// Index of a node in its owning [`Module`](super::Module)'s arena.
///
/// Assigned at registration. Ids are meaningless across Modules; two
/// Modules never alias the same node set.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel for nodes that have not been registered yet.
    pub(crate) const UNASSIGNED: NodeId = NodeId(u32::MAX);

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == NodeId::UNASSIGNED {
            write!(f, "NodeId(unassigned)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

// ============================================================================
// CAPABILITY PAYLOADS
// ============================================================================

/// Member visibility within a record type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Member-ness: the node's owner is a record type and it carries
/// visibility.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberData {
    pub visibility: Visibility,
}

impl MemberData {
    pub const fn new(visibility: Visibility) -> Self {
        Self { visibility }
    }
}

/// Virtual-capability: explicit flags from the declaration, plus resolved
/// flags computed during latelink. Resolved flags are `None` until the
/// second linking phase has run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualData {
    pub explicit_virtual: bool,
    pub explicit_override: bool,
    /// Pure-virtual ("= 0") on its own declaration.
    pub explicit_abstract: bool,
    #[serde(skip)]
    pub resolved_virtual: Option<bool>,
    #[serde(skip)]
    pub resolved_override: Option<bool>,
}

impl VirtualData {
    pub fn explicit(explicit_virtual: bool, explicit_override: bool, explicit_abstract: bool) -> Self {
        Self {
            explicit_virtual,
            explicit_override,
            explicit_abstract,
            resolved_virtual: None,
            resolved_override: None,
        }
    }
}

/// Callable-ness: return type, declared parameter signature, deleted and
/// inline flags. Ordered parameter *nodes* are children of the callable;
/// `parameter_types` carries the declared signature for overload paths and
/// merge checking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableData {
    /// `None` for constructors and destructors.
    pub return_type: Option<TypeRef>,
    pub parameter_types: Vec<TypeRef>,
    pub deleted: bool,
    pub inline: bool,
}

impl CallableData {
    pub fn new(return_type: Option<TypeRef>, parameter_types: Vec<TypeRef>) -> Self {
        Self {
            return_type,
            parameter_types,
            deleted: false,
            inline: false,
        }
    }

    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }
}

/// Record-type payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordData {
    /// Explicitly marked abstract by the front-end (saves a scan when the
    /// parser already knows).
    pub explicit_abstract: bool,
}

/// Parameter payload. The node's path is anonymous (keyed by location);
/// the declared name, if any, lives here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterData {
    pub index: u32,
    pub name: Option<SmolStr>,
    pub type_ref: TypeRef,
    #[serde(skip)]
    pub resolved: Option<TypeLookup>,
}

// ============================================================================
// NODE KINDS
// ============================================================================

/// Per-kind payload of a [`Node`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Namespace,
    Record(RecordData),
    /// Built-in scalar type. Never registered by the front-end; interned
    /// lazily by the module on lookup.
    Fundamental,
    Annotation {
        text: SmolStr,
    },
    Field {
        member: MemberData,
        type_ref: TypeRef,
        #[serde(skip)]
        resolved: Option<TypeLookup>,
    },
    StaticVar {
        member: MemberData,
        type_ref: Option<TypeRef>,
        #[serde(skip)]
        resolved: Option<TypeLookup>,
    },
    GlobalVar {
        type_ref: Option<TypeRef>,
        #[serde(skip)]
        resolved: Option<TypeLookup>,
    },
    Function {
        call: CallableData,
    },
    StaticMethod {
        member: MemberData,
        call: CallableData,
    },
    Method {
        member: MemberData,
        virt: VirtualData,
        call: CallableData,
        receiver_const: bool,
        receiver_volatile: bool,
    },
    Constructor {
        member: MemberData,
        call: CallableData,
    },
    Destructor {
        member: MemberData,
        virt: VirtualData,
        call: CallableData,
    },
    Parameter(ParameterData),
    /// Inheritance edge from the owning record to `target`.
    Base {
        member: MemberData,
        target: SymbolPath,
        explicit_virtual: bool,
        #[serde(skip)]
        resolved_target: Option<TypeLookup>,
    },
    Friend {
        member: MemberData,
        target: SymbolPath,
        #[serde(skip)]
        resolved_target: Option<TypeLookup>,
    },
    TemplateParameter {
        index: u32,
        name: SmolStr,
        /// `typename`, `class`, `int`, a concept name, ...
        declaration_kind: SmolStr,
        default_value: Option<SmolStr>,
    },
}

impl NodeKind {
    /// The fieldless tag for this kind.
    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Namespace => NodeKindTag::Namespace,
            NodeKind::Record(_) => NodeKindTag::Record,
            NodeKind::Fundamental => NodeKindTag::Fundamental,
            NodeKind::Annotation { .. } => NodeKindTag::Annotation,
            NodeKind::Field { .. } => NodeKindTag::Field,
            NodeKind::StaticVar { .. } => NodeKindTag::StaticVar,
            NodeKind::GlobalVar { .. } => NodeKindTag::GlobalVar,
            NodeKind::Function { .. } => NodeKindTag::Function,
            NodeKind::StaticMethod { .. } => NodeKindTag::StaticMethod,
            NodeKind::Method { .. } => NodeKindTag::Method,
            NodeKind::Constructor { .. } => NodeKindTag::Constructor,
            NodeKind::Destructor { .. } => NodeKindTag::Destructor,
            NodeKind::Parameter(_) => NodeKindTag::Parameter,
            NodeKind::Base { .. } => NodeKindTag::Base,
            NodeKind::Friend { .. } => NodeKindTag::Friend,
            NodeKind::TemplateParameter { .. } => NodeKindTag::TemplateParameter,
        }
    }
}

/// Fieldless mirror of [`NodeKind`], used as the by-kind index key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKindTag {
    Namespace,
    Record,
    Fundamental,
    Annotation,
    Field,
    StaticVar,
    GlobalVar,
    Function,
    StaticMethod,
    Method,
    Constructor,
    Destructor,
    Parameter,
    Base,
    Friend,
    TemplateParameter,
}

impl NodeKindTag {
    /// Multi-valued kinds accumulate in an ordered list at their path
    /// instead of merging. This is a declared per-kind capability, not
    /// inferred from path shape.
    pub fn multi_valued(self) -> bool {
        matches!(
            self,
            NodeKindTag::Annotation
                | NodeKindTag::Parameter
                | NodeKindTag::Friend
                | NodeKindTag::Fundamental
        )
    }
}

// ============================================================================
// NODE
// ============================================================================

/// One declared-or-defined symbol in the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub path: SymbolPath,
    /// Synthesized by the linker itself (implicit constructors and
    /// destructors). Excluded from persisted snapshots.
    pub transient: bool,
    /// Declaration-only sightings, accumulated across merges.
    pub declaration_locations: Vec<SourceLocation>,
    /// At most one full definition per identity.
    pub definition_location: Option<SourceLocation>,
    /// Non-owning back-reference to the enclosing node.
    pub owner: Option<NodeId>,
    /// Owned, ordered children. Wired eagerly as owned nodes register and
    /// rebuilt from owner back-references at the start of linking.
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    /// Build an unregistered node. `location` is recorded as the
    /// definition or as a declaration according to `is_definition`;
    /// fundamental types pass no location at all.
    pub fn new(
        path: SymbolPath,
        location: Option<SourceLocation>,
        is_definition: bool,
        kind: NodeKind,
    ) -> Self {
        let mut node = Self {
            id: NodeId::UNASSIGNED,
            path,
            transient: false,
            declaration_locations: Vec::new(),
            definition_location: None,
            owner: None,
            children: Vec::new(),
            kind,
        };
        if let Some(loc) = location {
            if is_definition {
                node.definition_location = Some(loc);
            } else {
                node.declaration_locations.push(loc);
            }
        }
        // An inline definition is also visible as a declaration wherever
        // its header is included.
        if is_definition && node.callable().is_some_and(|call| call.inline) {
            if let Some(loc) = location {
                node.declaration_locations.push(loc);
            }
        }
        node
    }

    /// The arena id.
    ///
    /// # Panics
    /// Panics if the node has not been registered.
    pub fn id(&self) -> NodeId {
        assert!(
            self.id != NodeId::UNASSIGNED,
            "node {} has not been registered",
            self.path
        );
        self.id
    }

    /// Attach the owner before registration.
    #[must_use]
    pub fn owned_by(mut self, owner: NodeId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Mark as linker-synthesized.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn is_definition(&self) -> bool {
        self.definition_location.is_some()
    }

    // ------------------------------------------------------------------
    // Capability accessors
    // ------------------------------------------------------------------

    /// Member capability, if this kind is owned by a record type.
    pub fn member(&self) -> Option<&MemberData> {
        match &self.kind {
            NodeKind::Field { member, .. }
            | NodeKind::StaticVar { member, .. }
            | NodeKind::StaticMethod { member, .. }
            | NodeKind::Method { member, .. }
            | NodeKind::Constructor { member, .. }
            | NodeKind::Destructor { member, .. }
            | NodeKind::Base { member, .. }
            | NodeKind::Friend { member, .. } => Some(member),
            _ => None,
        }
    }

    /// Virtual capability, if this kind can be virtual.
    pub fn virtual_data(&self) -> Option<&VirtualData> {
        match &self.kind {
            NodeKind::Method { virt, .. } | NodeKind::Destructor { virt, .. } => Some(virt),
            _ => None,
        }
    }

    pub fn virtual_data_mut(&mut self) -> Option<&mut VirtualData> {
        match &mut self.kind {
            NodeKind::Method { virt, .. } | NodeKind::Destructor { virt, .. } => Some(virt),
            _ => None,
        }
    }

    /// Callable capability, if this kind has a call signature.
    pub fn callable(&self) -> Option<&CallableData> {
        match &self.kind {
            NodeKind::Function { call }
            | NodeKind::StaticMethod { call, .. }
            | NodeKind::Method { call, .. }
            | NodeKind::Constructor { call, .. }
            | NodeKind::Destructor { call, .. } => Some(call),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Factory constructors, mirroring the parser front-end's node kinds
    // ------------------------------------------------------------------

    pub fn namespace(path: SymbolPath, location: SourceLocation) -> Self {
        Self::new(path, Some(location), false, NodeKind::Namespace)
    }

    pub fn record(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        explicit_abstract: bool,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::Record(RecordData { explicit_abstract }),
        )
    }

    /// An annotation attached to the symbol at `owner_path`.
    pub fn annotation(
        owner_path: &SymbolPath,
        text: impl Into<SmolStr>,
        location: SourceLocation,
    ) -> Self {
        let text = text.into();
        let path = owner_path.join(Segment::anonymous(
            location,
            format!("annotation '{text}'"),
        ));
        Self::new(path, Some(location), true, NodeKind::Annotation { text })
    }

    pub fn field(
        path: SymbolPath,
        location: SourceLocation,
        visibility: Visibility,
        type_ref: TypeRef,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            true,
            NodeKind::Field {
                member: MemberData::new(visibility),
                type_ref,
                resolved: None,
            },
        )
    }

    pub fn static_var(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        visibility: Visibility,
        type_ref: Option<TypeRef>,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::StaticVar {
                member: MemberData::new(visibility),
                type_ref,
                resolved: None,
            },
        )
    }

    pub fn global_var(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        type_ref: Option<TypeRef>,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::GlobalVar {
                type_ref,
                resolved: None,
            },
        )
    }

    pub fn function(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        call: CallableData,
    ) -> Self {
        Self::new(path, Some(location), is_definition, NodeKind::Function { call })
    }

    pub fn static_method(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        member: MemberData,
        call: CallableData,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::StaticMethod { member, call },
        )
    }

    pub fn method(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        member: MemberData,
        virt: VirtualData,
        call: CallableData,
        receiver_const: bool,
        receiver_volatile: bool,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::Method {
                member,
                virt,
                call,
                receiver_const,
                receiver_volatile,
            },
        )
    }

    pub fn constructor(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        member: MemberData,
        call: CallableData,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::Constructor { member, call },
        )
    }

    pub fn destructor(
        path: SymbolPath,
        location: SourceLocation,
        is_definition: bool,
        member: MemberData,
        virt: VirtualData,
        call: CallableData,
    ) -> Self {
        Self::new(
            path,
            Some(location),
            is_definition,
            NodeKind::Destructor { member, virt, call },
        )
    }

    /// A callable parameter. The path is anonymous, keyed by the
    /// parameter's own location; the declared name (if any) is payload.
    pub fn parameter(
        callable_path: &SymbolPath,
        location: SourceLocation,
        index: u32,
        name: Option<SmolStr>,
        type_ref: TypeRef,
    ) -> Self {
        let display = name.as_deref().unwrap_or("");
        let path = callable_path.join(Segment::anonymous(
            location,
            format!("parameter #{index}: {type_ref} {display}"),
        ));
        Self::new(
            path,
            Some(location),
            false,
            NodeKind::Parameter(ParameterData {
                index,
                name,
                type_ref,
                resolved: None,
            }),
        )
    }

    /// An inheritance edge owned by the record at `owner_path`.
    pub fn base(
        owner_path: &SymbolPath,
        target: SymbolPath,
        location: SourceLocation,
        visibility: Visibility,
        explicit_virtual: bool,
    ) -> Self {
        let path = owner_path.join(Segment::anonymous(location, format!("parent {target}")));
        Self::new(
            path,
            Some(location),
            true,
            NodeKind::Base {
                member: MemberData::new(visibility),
                target,
                explicit_virtual,
                resolved_target: None,
            },
        )
    }

    pub fn friend_decl(
        owner_path: &SymbolPath,
        target: SymbolPath,
        location: SourceLocation,
        visibility: Visibility,
    ) -> Self {
        let path = owner_path.join(Segment::anonymous(location, format!("friend {target}")));
        Self::new(
            path,
            Some(location),
            true,
            NodeKind::Friend {
                member: MemberData::new(visibility),
                target,
                resolved_target: None,
            },
        )
    }

    pub fn template_parameter(
        owner_path: &SymbolPath,
        location: SourceLocation,
        index: u32,
        name: impl Into<SmolStr>,
        declaration_kind: impl Into<SmolStr>,
        default_value: Option<SmolStr>,
    ) -> Self {
        let name = name.into();
        let declaration_kind = declaration_kind.into();
        let path = owner_path.join(Segment::anonymous(
            location,
            format!("template parameter {declaration_kind} {name}"),
        ));
        Self::new(
            path,
            Some(location),
            true,
            NodeKind::TemplateParameter {
                index,
                name,
                declaration_kind,
                default_value,
            },
        )
    }

    pub(crate) fn fundamental(name: &str) -> Self {
        Self::new(
            SymbolPath::root().join_name(name),
            None,
            true,
            NodeKind::Fundamental,
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.path, self.kind.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new(FileId::new(0), line, 1)
    }

    #[test]
    fn test_definition_vs_declaration_bookkeeping() {
        let path = SymbolPath::root().join_name("Widget");
        let decl = Node::record(path.clone(), loc(1), false, false);
        let def = Node::record(path, loc(2), true, false);

        assert_eq!(decl.declaration_locations, vec![loc(1)]);
        assert_eq!(decl.definition_location, None);
        assert!(decl.declaration_locations.len() == 1);

        assert!(def.declaration_locations.is_empty());
        assert_eq!(def.definition_location, Some(loc(2)));
    }

    #[test]
    fn test_inline_definition_counts_as_declaration() {
        let path = SymbolPath::root()
            .join_name("free")
            .with_call_signature(vec![], vec![]);
        let call = CallableData::new(Some(TypeRef::literal("void")), vec![]).inline(true);
        let node = Node::function(path, loc(5), true, call);

        assert_eq!(node.definition_location, Some(loc(5)));
        assert_eq!(node.declaration_locations, vec![loc(5)]);
    }

    #[test]
    fn test_capability_accessors() {
        let record_path = SymbolPath::root().join_name("Widget");
        let method = Node::method(
            record_path.join_name("draw").with_call_signature(vec![], vec![]),
            loc(3),
            true,
            MemberData::new(Visibility::Public),
            VirtualData::explicit(true, false, false),
            CallableData::new(Some(TypeRef::literal("void")), vec![]),
            false,
            false,
        );

        assert!(method.member().is_some());
        assert!(method.callable().is_some());
        assert!(method.virtual_data().is_some());
        assert_eq!(method.virtual_data().unwrap().resolved_virtual, None);

        let ns = Node::namespace(SymbolPath::root().join_name("gpr460"), loc(1));
        assert!(ns.member().is_none());
        assert!(ns.callable().is_none());
        assert!(ns.virtual_data().is_none());
    }

    #[test]
    fn test_multi_valued_is_declared_per_kind() {
        assert!(NodeKindTag::Annotation.multi_valued());
        assert!(NodeKindTag::Parameter.multi_valued());
        assert!(NodeKindTag::Friend.multi_valued());
        assert!(NodeKindTag::Fundamental.multi_valued());
        assert!(!NodeKindTag::Record.multi_valued());
        assert!(!NodeKindTag::Method.multi_valued());
    }

    #[test]
    fn test_anonymous_kinds_build_anonymous_paths() {
        let owner = SymbolPath::root().join_name("Widget");
        let annotation = Node::annotation(&owner, "stix::reflect", loc(8));
        let base = Node::base(
            &owner,
            SymbolPath::root().join_name("Object"),
            loc(9),
            Visibility::Public,
            false,
        );

        assert!(!annotation.path.is_referenceable());
        assert!(!base.path.is_referenceable());
        assert_eq!(annotation.path.parent(), Some(owner.clone()));
        assert_eq!(base.path.parent(), Some(owner));
    }
}
