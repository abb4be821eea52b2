use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::text::Span;
use crate::types::TypeRef;

/// Identifier for a declaration in a [`crate::Program`] snapshot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a compilation unit.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a call site.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct CallSiteId(pub u32);

impl CallSiteId {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Private,
    /// Package-private visibility (no modifier in source).
    PackagePrivate,
    Protected,
    Public,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::PackagePrivate => "",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::PackagePrivate
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    Interface,
    Method,
    Constructor,
    Field,
    Parameter,
    /// A local variable inside a method body (modeled so Inline Temp has a
    /// declaration to target).
    Local,
}

/// How a type declaration is nested in its surrounding program text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nesting {
    #[default]
    TopLevel,
    Member,
    Local,
    Anonymous,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

/// A named program entity: type, method, constructor, field, parameter, or
/// local.
///
/// Every declaration has at most one enclosing declaration; top-level types
/// have none. The binder supplies spans (the declaration's full text range in
/// its unit) and, for members with an initializer or body, the body text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub modifiers: Modifiers,
    pub nesting: Nesting,
    pub enclosing: Option<DeclId>,
    pub type_params: Vec<TypeParam>,
    /// Supertype references; only meaningful for type declarations.
    pub supertypes: Vec<TypeRef>,
    /// Field/parameter/local type, or a method's return type.
    pub ty: Option<TypeRef>,
    /// Ordered parameter declarations for methods and constructors.
    pub params: Vec<DeclId>,
    /// Whether the last parameter is declared variable-arity.
    pub is_varargs: bool,
    pub span: Option<Span>,
    /// Method body text (between braces) or field/local initializer text.
    pub body: Option<String>,
}

impl Declaration {
    pub fn is_type(&self) -> bool {
        matches!(self.kind, DeclKind::Class | DeclKind::Interface)
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, DeclKind::Method | DeclKind::Constructor)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract
    }
}
