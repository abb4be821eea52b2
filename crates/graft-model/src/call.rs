use serde::{Deserialize, Serialize};

use crate::decl::{CallSiteId, DeclId, UnitId};
use crate::text::TextRange;
use crate::types::TypeRef;

/// The receiver of an invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receiver {
    /// No written receiver; the call dispatches on the enclosing instance.
    ImplicitThis,
    /// An explicit receiver expression (`this`, a name, a chain, ...).
    Expr(String),
    /// No receiver at all (static call resolved through the enclosing scope
    /// or an import).
    None,
}

impl Receiver {
    pub fn expr_text(&self) -> Option<&str> {
        match self {
            Receiver::Expr(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Invocation,
    /// `expr::name` — receiver bound at the reference site.
    BoundMethodRef,
    /// `Type::name` — the receiver becomes the functional interface's first
    /// parameter.
    UnboundMethodRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub text: String,
    /// Binder-supplied static type of the argument expression.
    pub ty: TypeRef,
}

impl Argument {
    pub fn new(text: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            text: text.into(),
            ty,
        }
    }
}

/// A syntactic invocation or method-reference expression.
///
/// Call sites are discovered fresh per refactoring pass by traversing the
/// snapshot's compilation units in order; they are never cached across
/// applied edits because bindings invalidate once an edit lands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub id: CallSiteId,
    pub unit: UnitId,
    /// Absolute range of the whole invocation expression within its unit.
    pub range: TextRange,
    /// Innermost enclosing method/constructor/initializer declaration.
    pub enclosing: DeclId,
    pub name: String,
    pub receiver: Receiver,
    /// Binder-supplied static type of the receiver expression, when present.
    pub receiver_ty: Option<TypeRef>,
    pub args: Vec<Argument>,
    pub kind: CallKind,
    /// Enclosing-instance qualifier used by the call, e.g. the `Outer.this`
    /// in `Outer.this.m()`. Carried so moves can rewrite or reject it.
    pub outer_qualifier: Option<String>,
}

impl CallSite {
    pub fn is_method_ref(&self) -> bool {
        matches!(
            self.kind,
            CallKind::BoundMethodRef | CallKind::UnboundMethodRef
        )
    }
}

/// A plain identifier reference to a field, local, or parameter.
///
/// Modeled separately from [`CallSite`] so inline refactorings can find every
/// use of the declaration they erase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    pub unit: UnitId,
    pub range: TextRange,
    pub target: DeclId,
    /// Innermost enclosing member declaration.
    pub enclosing: DeclId,
    /// Whether the use occurs inside an array initializer. Inlining into
    /// array initializers is restricted (reference identity of the stored
    /// element must not fan out).
    pub in_array_initializer: bool,
}
