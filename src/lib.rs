//! # stix-base
//!
//! Core library for the STIX reflection toolchain: the semantic symbol
//! graph built from C++ translation units, and the two-phase linker that
//! stitches per-unit observations into one queryable module.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ast     → symbol graph: paths, nodes, type refs, Module registry/linker
//!   ↓
//! base    → primitives (FileId, FileSet, SourceLocation)
//! ```
//!
//! The parser front-end (a libclang driver) and the code generators sit in
//! separate tools; this crate is the model they share. The front-end
//! registers nodes and external seeds, [`Module::link_all`] resolves the
//! graph, and generators walk it or persist it as a [`Snapshot`].

pub mod ast;
pub mod base;

// Re-export the working surface
pub use ast::{
    CallableData, Entry, ExpandState, ExternalExpander, ExternalHandle, ExternalSeed, Found,
    LinkError, LinkState, MemberData, Module, Node, NodeId, NodeKind, NodeKindTag, Qualifier,
    ResolvedType, Segment, Snapshot, SymbolPath, TemplateArg, TypeLookup, TypeRef, TypeRefBase,
    TypeShape, Visibility, VirtualData,
};
pub use base::{FileId, FileSet, SourceLocation};
