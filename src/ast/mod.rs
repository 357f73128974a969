//! The semantic symbol graph.
//!
//! ## Layout (dependency order)
//!
//! ```text
//! module    → registry, two-phase linker, lazy external expansion
//!   ↓
//! snapshot  → persisted graph images (explicit state only)
//!   ↓
//! node      → tagged node hierarchy + capability payloads
//!   ↓
//! type_ref  → unresolved/resolved type references
//!   ↓
//! path      → structural symbol identity
//! ```
//!
//! `fundamentals` is the fixed built-in scalar registry; `error` holds the
//! unrecoverable linking faults.

pub mod error;
pub mod fundamentals;
pub mod module;
pub mod node;
pub mod path;
pub mod snapshot;
pub mod type_ref;

pub use error::LinkError;
pub use module::{
    Entry, ExpandState, ExternalExpander, ExternalHandle, ExternalPlaceholder, ExternalSeed,
    Found, LinkState, Module,
};
pub use node::{
    CallableData, MemberData, Node, NodeId, NodeKind, NodeKindTag, ParameterData, RecordData,
    Visibility, VirtualData,
};
pub use path::{Segment, SymbolPath, TemplateArg};
pub use snapshot::{Snapshot, SnapshotNode};
pub use type_ref::{
    Qualifier, ResolvedType, ShapeTag, TypeLookup, TypeRef, TypeRefBase, TypeShape,
};
