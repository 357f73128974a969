//! Type references — structural descriptions of declared types.
//!
//! A [`TypeRef`] is the *unresolved* form: what a declaration says about a
//! type (its base name, cv-qualifiers, and pointer/reference/function
//! shape). The linker turns it into a [`ResolvedType`]/[`TypeLookup`],
//! where referenced sub-paths are replaced with resolved node references
//! or an explicit [`TypeLookup::Unresolved`] marker.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::node::NodeId;
use super::path::SymbolPath;

// ============================================================================
// QUALIFIERS
// ============================================================================

/// A cv-style qualifier. Qualifier lists are kept sorted so that list
/// equality is set equality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Qualifier {
    Const,
    Volatile,
    Restrict,
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Qualifier::Const => "const",
            Qualifier::Volatile => "volatile",
            Qualifier::Restrict => "restrict",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// UNRESOLVED TYPE REFERENCES
// ============================================================================

/// The base of a type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRefBase {
    /// A named type, by identity path.
    Path(SymbolPath),
    /// A nested reference (the pointee of a pointer/reference shape).
    Nested(Box<TypeRef>),
    /// A literal spelling that has no declaration to point at
    /// (`auto`, an undeduced template parameter, ...).
    Literal(SmolStr),
}

/// The shape of a type reference, with shape-specific fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeShape {
    /// A plain value type: `Foo`, `vector<int>`.
    Value { template_args: Vec<TypeRef> },
    /// `T*`
    Pointer,
    /// `T&`
    Reference,
    /// `T&&`
    MoveReference,
    /// `R (*)(Args...)`
    FunctionPointer {
        return_type: Box<TypeRef>,
        args: Vec<TypeRef>,
    },
    /// `T Owner::*`
    MemberFieldPointer { owner: SymbolPath },
    /// `R (Owner::*)(Args...) cv`
    MemberFunctionPointer {
        owner: SymbolPath,
        return_type: Box<TypeRef>,
        args: Vec<TypeRef>,
        receiver_qualifiers: Vec<Qualifier>,
    },
}

impl TypeShape {
    /// The fieldless tag for this shape.
    pub fn tag(&self) -> ShapeTag {
        match self {
            TypeShape::Value { .. } => ShapeTag::Value,
            TypeShape::Pointer => ShapeTag::Pointer,
            TypeShape::Reference => ShapeTag::Reference,
            TypeShape::MoveReference => ShapeTag::MoveReference,
            TypeShape::FunctionPointer { .. } => ShapeTag::FunctionPointer,
            TypeShape::MemberFieldPointer { .. } => ShapeTag::MemberFieldPointer,
            TypeShape::MemberFunctionPointer { .. } => ShapeTag::MemberFunctionPointer,
        }
    }
}

/// Fieldless mirror of [`TypeShape`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeTag {
    Value,
    Pointer,
    Reference,
    MoveReference,
    FunctionPointer,
    MemberFieldPointer,
    MemberFunctionPointer,
}

/// An unresolved type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// What the shape applies to. `None` only for function-pointer shapes,
    /// which carry their structure in the shape itself.
    pub base: Option<TypeRefBase>,
    /// Sorted cv-qualifier set.
    pub qualifiers: Vec<Qualifier>,
    /// Pointer/reference/function shape.
    pub shape: TypeShape,
}

impl TypeRef {
    fn build(base: Option<TypeRefBase>, mut qualifiers: Vec<Qualifier>, shape: TypeShape) -> Self {
        qualifiers.sort_unstable();
        qualifiers.dedup();
        Self {
            base,
            qualifiers,
            shape,
        }
    }

    /// A plain named value type.
    pub fn named(path: SymbolPath) -> Self {
        Self::value(TypeRefBase::Path(path), vec![], vec![])
    }

    /// A value type with qualifiers and template arguments.
    pub fn value(base: TypeRefBase, qualifiers: Vec<Qualifier>, template_args: Vec<TypeRef>) -> Self {
        Self::build(Some(base), qualifiers, TypeShape::Value { template_args })
    }

    /// A literal spelling with no declaration (`auto`, ...).
    pub fn literal(text: impl Into<SmolStr>) -> Self {
        Self::value(TypeRefBase::Literal(text.into()), vec![], vec![])
    }

    /// A pointer to `pointee`. Pointer-to-reference is not valid syntax.
    pub fn pointer(pointee: TypeRef, qualifiers: Vec<Qualifier>) -> Self {
        debug_assert!(
            !matches!(
                pointee.shape,
                TypeShape::Reference | TypeShape::MoveReference
            ),
            "pointer-to-reference is not valid syntax"
        );
        Self::build(
            Some(TypeRefBase::Nested(Box::new(pointee))),
            qualifiers,
            TypeShape::Pointer,
        )
    }

    /// An lvalue reference to `pointee`.
    pub fn reference(pointee: TypeRef, qualifiers: Vec<Qualifier>) -> Self {
        Self::build(
            Some(TypeRefBase::Nested(Box::new(pointee))),
            qualifiers,
            TypeShape::Reference,
        )
    }

    /// An rvalue reference to `pointee`.
    pub fn move_reference(pointee: TypeRef, qualifiers: Vec<Qualifier>) -> Self {
        Self::build(
            Some(TypeRefBase::Nested(Box::new(pointee))),
            qualifiers,
            TypeShape::MoveReference,
        )
    }

    /// A free function pointer.
    pub fn function_pointer(
        return_type: TypeRef,
        args: Vec<TypeRef>,
        qualifiers: Vec<Qualifier>,
    ) -> Self {
        Self::build(
            None,
            qualifiers,
            TypeShape::FunctionPointer {
                return_type: Box::new(return_type),
                args,
            },
        )
    }

    /// A pointer to a data member of `owner`.
    pub fn member_field_pointer(
        owner: SymbolPath,
        field_type: TypeRef,
        qualifiers: Vec<Qualifier>,
    ) -> Self {
        Self::build(
            Some(TypeRefBase::Nested(Box::new(field_type))),
            qualifiers,
            TypeShape::MemberFieldPointer { owner },
        )
    }

    /// A pointer to a member function of `owner`.
    pub fn member_function_pointer(
        owner: SymbolPath,
        return_type: TypeRef,
        args: Vec<TypeRef>,
        qualifiers: Vec<Qualifier>,
        mut receiver_qualifiers: Vec<Qualifier>,
    ) -> Self {
        receiver_qualifiers.sort_unstable();
        Self::build(
            None,
            qualifiers,
            TypeShape::MemberFunctionPointer {
                owner,
                return_type: Box::new(return_type),
                args,
                receiver_qualifiers,
            },
        )
    }

    /// True for plain value shapes, which resolve through a direct registry
    /// lookup rather than qualified-type resolution.
    pub fn is_plain_value(&self) -> bool {
        matches!(self.shape, TypeShape::Value { .. })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quals = |f: &mut fmt::Formatter<'_>, qs: &[Qualifier]| -> fmt::Result {
            for q in qs {
                write!(f, " {q}")?;
            }
            Ok(())
        };
        let base = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            match &self.base {
                Some(TypeRefBase::Path(p)) => write!(f, "{p}"),
                Some(TypeRefBase::Nested(t)) => write!(f, "{t}"),
                Some(TypeRefBase::Literal(s)) => write!(f, "{s}"),
                None => Ok(()),
            }
        };
        match &self.shape {
            TypeShape::Value { template_args } => {
                base(f)?;
                if !template_args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in template_args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                quals(f, &self.qualifiers)
            }
            TypeShape::Pointer => {
                base(f)?;
                write!(f, "*")?;
                quals(f, &self.qualifiers)
            }
            TypeShape::Reference => {
                base(f)?;
                write!(f, "&")?;
                quals(f, &self.qualifiers)
            }
            TypeShape::MoveReference => {
                base(f)?;
                write!(f, "&&")?;
                quals(f, &self.qualifiers)
            }
            TypeShape::FunctionPointer { return_type, args } => {
                write!(f, "{return_type} (*")?;
                quals(f, &self.qualifiers)?;
                write!(f, ")(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            TypeShape::MemberFieldPointer { owner } => {
                base(f)?;
                write!(f, " {owner}::*")?;
                quals(f, &self.qualifiers)
            }
            TypeShape::MemberFunctionPointer {
                owner,
                return_type,
                args,
                receiver_qualifiers,
            } => {
                write!(f, "{return_type} ({owner}::*")?;
                quals(f, &self.qualifiers)?;
                write!(f, ")(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")?;
                quals(f, receiver_qualifiers)
            }
        }
    }
}

// ============================================================================
// RESOLVED TYPE REFERENCES
// ============================================================================

/// Where a type lookup landed.
///
/// `Unresolved` is the explicit degraded marker: the reference survives
/// linking, is logged, and downstream consumers skip or annotate it
/// instead of crashing.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum TypeLookup {
    /// One node.
    Node(NodeId),
    /// An overload-ambiguous hit (multi-valued registration or externals).
    Overloads(Vec<NodeId>),
    /// A structurally resolved pointer/reference/function shape.
    Qualified(Box<ResolvedType>),
    /// No declaration found.
    #[default]
    Unresolved,
}

impl TypeLookup {
    /// The single resolved node, if the lookup landed on exactly one.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            TypeLookup::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// True for the degraded marker.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, TypeLookup::Unresolved)
    }
}

/// The resolved counterpart of a qualified (non-plain-value) [`TypeRef`]:
/// each structural sub-part replaced with a [`TypeLookup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedType {
    /// The shape of the original reference.
    pub shape: ShapeTag,
    /// Sorted cv-qualifier set, carried over.
    pub qualifiers: Vec<Qualifier>,
    /// Resolved base/pointee, for pointer, reference, and member-field
    /// shapes.
    pub base: Option<TypeLookup>,
    /// Resolved owning type, for member-pointer shapes.
    pub owner: Option<TypeLookup>,
    /// Resolved return type, for function-pointer shapes.
    pub return_type: Option<TypeLookup>,
    /// Resolved argument types, in order, for function-pointer shapes.
    pub args: Vec<TypeLookup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo() -> SymbolPath {
        SymbolPath::root().join_name("Foo")
    }

    #[test]
    fn test_qualifier_set_equality() {
        let a = TypeRef::value(
            TypeRefBase::Path(foo()),
            vec![Qualifier::Volatile, Qualifier::Const],
            vec![],
        );
        let b = TypeRef::value(
            TypeRefBase::Path(foo()),
            vec![Qualifier::Const, Qualifier::Volatile],
            vec![],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_distinguishes() {
        let value = TypeRef::named(foo());
        let ptr = TypeRef::pointer(TypeRef::named(foo()), vec![]);
        let reference = TypeRef::reference(TypeRef::named(foo()), vec![]);

        assert_ne!(value, ptr);
        assert_ne!(ptr, reference);
    }

    #[test]
    fn test_display_pointer() {
        let ptr = TypeRef::pointer(TypeRef::named(foo()), vec![Qualifier::Const]);
        assert_eq!(ptr.to_string(), "::Foo* const");
    }

    #[test]
    fn test_display_function_pointer() {
        let fp = TypeRef::function_pointer(
            TypeRef::literal("int"),
            vec![TypeRef::named(foo())],
            vec![],
        );
        assert_eq!(fp.to_string(), "int (*)(::Foo)");
    }

    #[test]
    fn test_display_member_function_pointer() {
        let fp = TypeRef::member_function_pointer(
            foo(),
            TypeRef::literal("int"),
            vec![],
            vec![],
            vec![Qualifier::Const],
        );
        assert_eq!(fp.to_string(), "int (::Foo::*)() const");
    }
}
