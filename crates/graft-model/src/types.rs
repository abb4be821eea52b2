use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::decl::DeclId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Simple name of the boxed wrapper type.
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Byte => "Byte",
            Primitive::Short => "Short",
            Primitive::Char => "Character",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
        }
    }

    /// Widening primitive conversion (JLS 5.1.2), reflexively closed.
    pub fn widens_to(self, other: Primitive) -> bool {
        use Primitive::*;
        if self == other {
            return true;
        }
        match self {
            Byte => matches!(other, Short | Int | Long | Float | Double),
            Short | Char => matches!(other, Int | Long | Float | Double),
            Int => matches!(other, Long | Float | Double),
            Long => matches!(other, Float | Double),
            Float => matches!(other, Double),
            Boolean | Double => false,
        }
    }
}

/// A resolved or unresolved mention of a type.
///
/// Varargs parameters are modeled with their array-typed erasure as the
/// declared [`TypeRef`]; the declaring method's `is_varargs` flag governs
/// variable-arity call matching.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TypeRef {
    Primitive(Primitive),
    /// A resolved nominal type, possibly parameterized. An empty argument
    /// list is a raw (or non-generic) use.
    Named { decl: DeclId, args: Vec<TypeRef> },
    /// A type variable, identified by name within its declaring scope.
    Var(String),
    Array(Box<TypeRef>),
    /// `?` or `? extends T`.
    Wildcard { upper: Option<Box<TypeRef>> },
    /// A type known only by name (e.g. a library type outside the snapshot).
    Unresolved(String),
}

impl TypeRef {
    pub fn named(decl: DeclId) -> TypeRef {
        TypeRef::Named {
            decl,
            args: Vec::new(),
        }
    }

    pub fn array(elem: TypeRef) -> TypeRef {
        TypeRef::Array(Box::new(elem))
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeRef::Primitive(_))
    }

    /// The erasure of this reference: type arguments dropped, type variables
    /// erased to their nominal upper bound placeholder.
    pub fn erasure(&self) -> TypeRef {
        match self {
            TypeRef::Primitive(p) => TypeRef::Primitive(*p),
            TypeRef::Named { decl, .. } => TypeRef::Named {
                decl: *decl,
                args: Vec::new(),
            },
            TypeRef::Var(_) => TypeRef::Unresolved("java.lang.Object".to_string()),
            TypeRef::Array(elem) => TypeRef::Array(Box::new(elem.erasure())),
            TypeRef::Wildcard { upper } => match upper {
                Some(t) => t.erasure(),
                None => TypeRef::Unresolved("java.lang.Object".to_string()),
            },
            TypeRef::Unresolved(name) => TypeRef::Unresolved(name.clone()),
        }
    }

    /// Simple name for unresolved references (`java.lang.Integer` -> `Integer`).
    pub fn unresolved_simple_name(&self) -> Option<&str> {
        match self {
            TypeRef::Unresolved(name) => Some(name.rsplit('.').next().unwrap_or(name)),
            _ => None,
        }
    }

    /// Whether this reference boxes/unboxes to `other` (by wrapper simple
    /// name for types outside the snapshot).
    pub fn boxes_to(&self, other: &TypeRef) -> bool {
        match (self, other) {
            (TypeRef::Primitive(p), _) => other
                .unresolved_simple_name()
                .is_some_and(|n| n == p.boxed_name()),
            (_, TypeRef::Primitive(p)) => self
                .unresolved_simple_name()
                .is_some_and(|n| n == p.boxed_name()),
            _ => false,
        }
    }
}
