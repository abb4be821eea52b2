use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::call::{CallSite, NameRef};
use crate::decl::{CallSiteId, DeclId, DeclKind, Declaration, UnitId};
use crate::text::TextRange;
use crate::types::TypeRef;

/// One source file of the snapshot, with its full text.
///
/// Unit order is the snapshot's canonical traversal order; every engine
/// enumeration walks units in this order so results are deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub id: UnitId,
    pub path: String,
    pub text: String,
}

/// A modeled capture of an enclosing instance by a nested (inner, local, or
/// anonymous) type.
///
/// `handle` is an expression reaching the captured outer instance from inside
/// the nested scope (`Outer.this`), or `None` when no accessible handle
/// exists (static nested context, lambda-desugared classes, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEdge {
    pub nested: DeclId,
    pub outer: DeclId,
    pub handle: Option<String>,
}

/// An immutable program snapshot: declarations, call sites, name references,
/// and capture edges, produced by the external parser/binder.
///
/// The engine never mutates a snapshot; after an edit set is applied the host
/// rebuilds the model from scratch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub(crate) decls: Vec<Declaration>,
    pub(crate) units: Vec<CompilationUnit>,
    pub(crate) call_sites: Vec<CallSite>,
    pub(crate) refs: Vec<NameRef>,
    pub(crate) captures: Vec<CaptureEdge>,
}

impl Program {
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.as_usize()]
    }

    pub fn decls(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> &CompilationUnit {
        &self.units[id.as_usize()]
    }

    pub fn call_site(&self, id: CallSiteId) -> &CallSite {
        &self.call_sites[id.as_usize()]
    }

    /// Call sites of one unit, in source order.
    pub fn call_sites_in_unit(&self, unit: UnitId) -> impl Iterator<Item = &CallSite> {
        self.call_sites.iter().filter(move |c| c.unit == unit)
    }

    /// All call sites, in unit order then source order.
    pub fn call_sites(&self) -> impl Iterator<Item = &CallSite> {
        self.units
            .iter()
            .flat_map(move |unit| self.call_sites_in_unit(unit.id))
    }

    pub fn references_to(&self, target: DeclId) -> Vec<&NameRef> {
        self.refs.iter().filter(|r| r.target == target).collect()
    }

    pub fn captures(&self) -> &[CaptureEdge] {
        &self.captures
    }

    /// The handle expression reaching `outer` from inside `nested`, if the
    /// capture is modeled at all.
    pub fn capture_handle(&self, nested: DeclId, outer: DeclId) -> Option<&CaptureEdge> {
        self.captures
            .iter()
            .find(|c| c.nested == nested && c.outer == outer)
    }

    /// Direct members of a type declaration, in declaration order.
    pub fn members_of(&self, ty: DeclId) -> impl Iterator<Item = &Declaration> {
        self.decls.iter().filter(move |d| {
            d.enclosing == Some(ty) && !matches!(d.kind, DeclKind::Parameter | DeclKind::Local)
        })
    }

    /// Methods declared directly on `ty` with the given name.
    pub fn methods_named<'a>(&'a self, ty: DeclId, name: &'a str) -> Vec<&'a Declaration> {
        self.members_of(ty)
            .filter(|d| d.is_method() && d.name == name)
            .collect()
    }

    /// The innermost enclosing type declaration of `decl` (itself, if a type).
    pub fn enclosing_type(&self, decl: DeclId) -> Option<DeclId> {
        let mut cur = Some(decl);
        while let Some(id) = cur {
            let d = self.decl(id);
            if d.is_type() {
                return Some(id);
            }
            cur = d.enclosing;
        }
        None
    }

    /// Dotted qualified name through the enclosing chain.
    pub fn qualified_name(&self, decl: DeclId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(decl);
        while let Some(id) = cur {
            let d = self.decl(id);
            parts.push(d.name.clone());
            cur = d.enclosing;
        }
        parts.reverse();
        parts.join(".")
    }

    pub fn find_type(&self, qualified: &str) -> Option<DeclId> {
        self.decls
            .iter()
            .find(|d| d.is_type() && self.qualified_name(d.id) == qualified)
            .map(|d| d.id)
    }

    /// Declarations of the direct supertypes of `ty` that live in the
    /// snapshot.
    pub fn direct_supertypes(&self, ty: DeclId) -> Vec<DeclId> {
        self.decl(ty)
            .supertypes
            .iter()
            .filter_map(|s| match s {
                TypeRef::Named { decl, .. } => Some(*decl),
                _ => None,
            })
            .collect()
    }

    /// Transitive supertypes of `ty` in deterministic (breadth-first,
    /// declaration-order) order. Cycle-safe; excludes `ty` itself.
    pub fn all_supertypes(&self, ty: DeclId) -> Vec<DeclId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = self.direct_supertypes(ty);
        while let Some(next) = queue.first().copied() {
            queue.remove(0);
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            queue.extend(self.direct_supertypes(next));
        }
        out
    }

    /// Direct subtypes of `ty` in declaration order.
    pub fn direct_subtypes(&self, ty: DeclId) -> Vec<DeclId> {
        self.decls
            .iter()
            .filter(|d| d.is_type() && self.direct_supertypes(d.id).contains(&ty))
            .map(|d| d.id)
            .collect()
    }

    pub fn is_subtype_decl(&self, sub: DeclId, sup: DeclId) -> bool {
        sub == sup || self.all_supertypes(sub).contains(&sup)
    }

    /// Nominal subtyping over type references. Parameterized types relate
    /// when the supertype side is raw or the arguments match exactly
    /// (invariance); arrays are covariant in reference element types.
    pub fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            // Widening primitive conversion counts as subtyping for
            // applicability and specificity purposes.
            (TypeRef::Primitive(f), TypeRef::Primitive(t)) => f.widens_to(*t),
            (TypeRef::Named { decl: s, args: sa }, TypeRef::Named { decl: t, args: ta }) => {
                self.is_subtype_decl(*s, *t) && (ta.is_empty() || sa == ta)
            }
            (
                TypeRef::Named { .. } | TypeRef::Array(_) | TypeRef::Var(_),
                TypeRef::Unresolved(name),
            ) => {
                // Everything reference-typed flows to Object.
                is_object(name)
            }
            (TypeRef::Unresolved(a), TypeRef::Unresolved(b)) => a == b || is_object(b),
            (TypeRef::Array(a), TypeRef::Array(b)) => {
                (a.is_reference() && self.is_subtype(a, b)) || a == b
            }
            (_, TypeRef::Wildcard { upper }) => match upper {
                Some(bound) => self.is_subtype(sub, bound),
                None => sub.is_reference(),
            },
            (TypeRef::Var(a), TypeRef::Var(b)) => a == b,
            _ => false,
        }
    }

    /// Human-readable display of a type reference, for synthesized source
    /// text and messages.
    pub fn display_type(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Primitive(p) => p.keyword().to_string(),
            TypeRef::Named { decl, args } => {
                let name = self.decl(*decl).name.clone();
                if args.is_empty() {
                    name
                } else {
                    let args: Vec<String> = args.iter().map(|a| self.display_type(a)).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            TypeRef::Var(name) => name.clone(),
            TypeRef::Array(elem) => format!("{}[]", self.display_type(elem)),
            TypeRef::Wildcard { upper } => match upper {
                Some(bound) => format!("? extends {}", self.display_type(bound)),
                None => "?".to_string(),
            },
            TypeRef::Unresolved(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
        }
    }

    /// The declaration's full text, sliced from its unit.
    pub fn decl_text(&self, decl: DeclId) -> Option<&str> {
        let span = self.decl(decl).span?;
        let unit = self.unit(span.unit);
        unit.text.get(span.range.start..span.range.end)
    }

    /// Erased parameter types of a method, for signature comparison.
    pub fn erased_param_types(&self, method: DeclId) -> Vec<TypeRef> {
        self.decl(method)
            .params
            .iter()
            .map(|p| {
                self.decl(*p)
                    .ty
                    .as_ref()
                    .map(TypeRef::erasure)
                    .unwrap_or(TypeRef::Unresolved("java.lang.Object".to_string()))
            })
            .collect()
    }

    /// Whether two methods share a logical signature (name + erased
    /// parameter types).
    pub fn same_signature(&self, a: DeclId, b: DeclId) -> bool {
        self.decl(a).name == self.decl(b).name
            && self.erased_param_types(a) == self.erased_param_types(b)
    }

    /// Text of a unit restricted to `range`.
    pub fn slice(&self, unit: UnitId, range: TextRange) -> &str {
        &self.unit(unit).text[range.start..range.end]
    }
}

fn is_object(name: &str) -> bool {
    name == "java.lang.Object" || name == "Object"
}
