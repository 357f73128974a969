//! Identity paths — structural, hashable symbol identity.
//!
//! A [`SymbolPath`] names one logical symbol independently of which
//! translation unit observed it. The parser front-end builds paths by
//! walking the enclosing-scope chain up to (but excluding) the translation
//! unit root, stripping redundant `struct`/`class`/`enum` keywords from
//! type names, and keying anonymous entities by their defining location.
//! Two translation units that see the same logical symbol therefore
//! produce equal paths.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::base::SourceLocation;
use super::type_ref::{Qualifier, TypeRef};

// ============================================================================
// SEGMENTS
// ============================================================================

/// A template argument: either a type (by path) or a literal value
/// (int, char, enum constant, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateArg {
    Type(SymbolPath),
    Value(SmolStr),
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Type(path) => write!(f, "{path}"),
            TemplateArg::Value(v) => write!(f, "{v}"),
        }
    }
}

/// One segment of a [`SymbolPath`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Segment {
    /// A plain name: `Engine`, `update`.
    Basic(SmolStr),

    /// A templated name with its ordered arguments: `vector<int>`.
    Templated {
        base: SmolStr,
        args: Vec<TemplateArg>,
    },

    /// An unnamed entity, keyed by its defining location. The tag is
    /// purely descriptive and does not participate in equality.
    Anonymous {
        location: SourceLocation,
        tag: SmolStr,
    },

    /// A callable name carrying its parameter types and receiver affixes
    /// (const/volatile — never virtual/override), disambiguating overload
    /// groups. Affixes are kept sorted.
    CallParameterized {
        base: SmolStr,
        args: Vec<TypeRef>,
        affixes: Vec<Qualifier>,
    },
}

impl Segment {
    /// Create a basic segment.
    pub fn basic(name: impl Into<SmolStr>) -> Self {
        Segment::Basic(name.into())
    }

    /// Create a templated segment.
    pub fn templated(base: impl Into<SmolStr>, args: Vec<TemplateArg>) -> Self {
        Segment::Templated {
            base: base.into(),
            args,
        }
    }

    /// Create an anonymous segment keyed by `location`.
    pub fn anonymous(location: SourceLocation, tag: impl Into<SmolStr>) -> Self {
        Segment::Anonymous {
            location,
            tag: tag.into(),
        }
    }

    /// Create a call-parameterized segment. Affixes are sorted on build.
    pub fn call_parameterized(
        base: impl Into<SmolStr>,
        args: Vec<TypeRef>,
        mut affixes: Vec<Qualifier>,
    ) -> Self {
        affixes.sort_unstable();
        Segment::CallParameterized {
            base: base.into(),
            args,
            affixes,
        }
    }

    /// The bare name of this segment, without template or call decoration.
    /// Anonymous segments yield their descriptive tag.
    pub fn base_name(&self) -> &SmolStr {
        match self {
            Segment::Basic(name) => name,
            Segment::Templated { base, .. } => base,
            Segment::Anonymous { tag, .. } => tag,
            Segment::CallParameterized { base, .. } => base,
        }
    }
}

// Anonymous segments compare by location alone; the descriptive tag is
// display-only.
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Segment::Basic(a), Segment::Basic(b)) => a == b,
            (
                Segment::Templated { base: a, args: x },
                Segment::Templated { base: b, args: y },
            ) => a == b && x == y,
            (
                Segment::Anonymous { location: a, .. },
                Segment::Anonymous { location: b, .. },
            ) => a == b,
            (
                Segment::CallParameterized {
                    base: a,
                    args: x,
                    affixes: p,
                },
                Segment::CallParameterized {
                    base: b,
                    args: y,
                    affixes: q,
                },
            ) => a == b && x == y && p == q,
            _ => false,
        }
    }
}

impl Eq for Segment {}

impl std::hash::Hash for Segment {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Segment::Basic(name) => name.hash(state),
            Segment::Templated { base, args } => {
                base.hash(state);
                args.hash(state);
            }
            Segment::Anonymous { location, .. } => location.hash(state),
            Segment::CallParameterized {
                base,
                args,
                affixes,
            } => {
                base.hash(state);
                args.hash(state);
                affixes.hash(state);
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Basic(name) => write!(f, "{name}"),
            Segment::Templated { base, args } => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Segment::Anonymous { location, tag } => write!(f, "({tag} at {location})"),
            Segment::CallParameterized {
                base,
                args,
                affixes,
            } => {
                write!(f, "{base}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")?;
                for affix in affixes {
                    write!(f, " {affix}")?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SYMBOL PATH
// ============================================================================

/// The structural identity of one logical symbol: an ordered sequence of
/// segments. Equality and hashing are structural over the full sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SymbolPath {
    segments: Vec<Segment>,
}

impl SymbolPath {
    /// The empty (translation-unit root) path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Append a segment, returning a new path.
    #[must_use]
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// Append a plain name, returning a new path.
    #[must_use]
    pub fn join_name(&self, name: impl Into<SmolStr>) -> Self {
        self.join(Segment::basic(name))
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment sequence.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True if `prefix`'s segments are a leading subsequence of this path's.
    pub fn starts_with(&self, prefix: &SymbolPath) -> bool {
        if prefix.segments.len() > self.segments.len() {
            return false;
        }
        self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// The enclosing scope's path, or `None` at the root.
    pub fn parent(&self) -> Option<SymbolPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The final segment, or `None` at the root.
    pub fn own_name(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Display form of the final segment.
    pub fn name(&self) -> String {
        self.own_name().map(|s| s.to_string()).unwrap_or_default()
    }

    /// A path is referenceable iff it contains no anonymous segment.
    /// Does not do visibility checks.
    pub fn is_referenceable(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Anonymous { .. }))
    }

    /// Anything within a template has no stable storage address: it is
    /// compiler-generated upon instantiation.
    pub fn is_dynamically_instanced(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Templated { .. }))
    }

    /// The controlled path-fixup step for callables: replace the final
    /// segment with a [`Segment::CallParameterized`] wrapping its base
    /// name, once the parameter list is known.
    ///
    /// # Panics
    /// Panics on the root path.
    #[must_use]
    pub fn with_call_signature(&self, args: Vec<TypeRef>, affixes: Vec<Qualifier>) -> Self {
        let own = self
            .own_name()
            .expect("cannot attach a call signature to the root path");
        let fixed = Segment::call_parameterized(own.base_name().clone(), args, affixes);
        let parent = self.parent().unwrap_or_default();
        parent.join(fixed)
    }
}

impl fmt::Display for SymbolPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "::{segment}")?;
        }
        if self.segments.is_empty() {
            write!(f, "::")?;
        }
        Ok(())
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
    fn test_join_returns_new_path() {
        let a = SymbolPath::root().join_name("A");
        let ab = a.join_name("B");

        assert_eq!(a.len(), 1);
        assert_eq!(ab.len(), 2);
        assert_eq!(ab.parent(), Some(a));
    }

    #[test]
    fn test_structural_equality() {
        let ab = SymbolPath::root().join_name("A").join_name("B");
        let ab2 = SymbolPath::root().join_name("A").join_name("B");
        let ac = SymbolPath::root().join_name("A").join_name("C");

        assert_eq!(ab, ab2);
        assert_ne!(ab, ac);
    }

    #[test]
    fn test_starts_with() {
        let a = SymbolPath::root().join_name("A");
        let ab = a.join_name("B");

        assert!(ab.starts_with(&a));
        assert!(ab.starts_with(&ab));
        assert!(!a.starts_with(&ab));
        assert!(ab.starts_with(&SymbolPath::root()));
    }

    #[test]
    fn test_referenceable() {
        let named = SymbolPath::root().join_name("A").join_name("b");
        assert!(named.is_referenceable());

        let anon = SymbolPath::root()
            .join_name("A")
            .join(Segment::anonymous(loc(4), "anonymous"));
        assert!(!anon.is_referenceable());
    }

    #[test]
    fn test_dynamically_instanced() {
        let plain = SymbolPath::root().join_name("A");
        assert!(!plain.is_dynamically_instanced());

        let templated = SymbolPath::root().join(Segment::templated(
            "vector",
            vec![TemplateArg::Value(SmolStr::new("3"))],
        ));
        assert!(templated.is_dynamically_instanced());
    }

    #[test]
    fn test_anonymous_keyed_by_location() {
        let a = SymbolPath::root().join(Segment::anonymous(loc(1), "anonymous"));
        let b = SymbolPath::root().join(Segment::anonymous(loc(1), "anonymous"));
        let c = SymbolPath::root().join(Segment::anonymous(loc(2), "anonymous"));
        let d = SymbolPath::root().join(Segment::anonymous(loc(1), "different tag"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        // The tag is display-only.
        assert_eq!(a, d);
    }

    #[test]
    fn test_call_parameterized_affixes_sorted() {
        let a = Segment::call_parameterized(
            "get",
            vec![],
            vec![Qualifier::Volatile, Qualifier::Const],
        );
        let b = Segment::call_parameterized(
            "get",
            vec![],
            vec![Qualifier::Const, Qualifier::Volatile],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_with_call_signature() {
        let method = SymbolPath::root().join_name("Widget").join_name("draw");
        let fixed = method.with_call_signature(vec![], vec![Qualifier::Const]);

        assert_eq!(fixed.parent(), method.parent());
        assert!(matches!(
            fixed.own_name(),
            Some(Segment::CallParameterized { base, .. }) if base == "draw"
        ));
    }

    #[test]
    fn test_display() {
        let path = SymbolPath::root().join_name("gpr460").join_name("EngineCore");
        assert_eq!(path.to_string(), "::gpr460::EngineCore");
        assert_eq!(SymbolPath::root().to_string(), "::");
    }
}
