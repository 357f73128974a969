//! Unrecoverable logic faults raised while building or linking the graph.
//!
//! These abort the current build. Degraded resolution (an unresolved base
//! class or field type) is *not* an error: it produces an explicit
//! unresolved marker and a warning instead.

use thiserror::Error;

use crate::base::SourceLocation;
use super::path::SymbolPath;

/// A fault detected during registration or linking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Two full definitions were observed for one identity path.
    #[error("symbol {path} defined more than once (second definition at {location})")]
    DuplicateDefinition {
        path: SymbolPath,
        location: SourceLocation,
    },

    /// Two occurrences of one callable disagree on their parameter list.
    #[error("parameter list mismatch while merging occurrences of {path}")]
    ParameterMismatch { path: SymbolPath },

    /// Qualified-type resolution was requested for a plain value
    /// reference. Plain references go through an ordinary lookup.
    #[error("illegal: unqualified value reference passed to qualified-type resolution")]
    UnqualifiedResolve,

    /// `register` was called after linking completed.
    #[error("cannot register new symbols after linking: {path}")]
    RegisterAfterLink { path: SymbolPath },

    /// `link_all` runs exactly once per module.
    #[error("module has already been linked")]
    AlreadyLinked,
}
