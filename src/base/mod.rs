//! Foundation types for the STIX toolchain.
//!
//! This module provides fundamental types used throughout the symbol graph:
//! - [`FileId`] - Interned file identifiers
//! - [`FileSet`] - Path ↔ FileId registry
//! - [`SourceLocation`] - File + line + column positions
//!
//! This module has NO dependencies on other stix modules.

mod file_id;
mod file_set;
mod location;

pub use file_id::FileId;
pub use file_set::FileSet;
pub use location::SourceLocation;
