//! Program model and binding resolver for the Graft refactoring engine.
//!
//! A [`Program`] is an immutable snapshot of a Java-like program — types,
//! members, call sites, name references, and capture edges — supplied by an
//! external parser/binder. The engine reads one snapshot per refactoring
//! request and never mutates it; after edits are applied upstream, the host
//! rebuilds the model from scratch.
//!
//! [`resolve::resolve_call`] implements overload resolution (strict / loose /
//! variable-arity invocation with generic type-argument inference) as a pure
//! query over a snapshot. [`OverrideIndex`] is the derived override relation
//! computed once per request.

mod builder;
mod call;
mod decl;
mod hierarchy;
mod program;
pub mod resolve;
mod text;
mod types;

pub use builder::{ModelError, ProgramBuilder};
pub use call::{Argument, CallKind, CallSite, NameRef, Receiver};
pub use decl::{
    CallSiteId, DeclId, DeclKind, Declaration, Modifiers, Nesting, TypeParam, UnitId, Visibility,
};
pub use hierarchy::OverrideIndex;
pub use program::{CaptureEdge, CompilationUnit, Program};
pub use resolve::{BindError, Binding};
pub use text::{Span, TextRange};
pub use types::{Primitive, TypeRef};
