use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::call::{Argument, CallSite, Receiver};
use crate::decl::{DeclId, Declaration};
use crate::program::Program;
use crate::types::TypeRef;

/// Resolved link from a call site to exactly one declaration, plus the
/// type-argument substitution active at that site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub decl: DeclId,
    pub substitution: BTreeMap<String, TypeRef>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("no applicable declaration for `{name}` with {arity} argument(s)")]
    Unresolved { name: String, arity: usize },
    #[error("ambiguous call to `{name}`: {candidates:?} are equally applicable")]
    Ambiguous {
        name: String,
        candidates: Vec<DeclId>,
    },
}

/// Overload applicability tiers, tried in order (JLS 15.12.2 phases).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// No boxing, no varargs expansion.
    Strict,
    /// Boxing/unboxing allowed.
    Loose,
    /// Trailing arguments packed into the varargs array.
    VariableArity,
}

const PHASES: [Phase; 3] = [Phase::Strict, Phase::Loose, Phase::VariableArity];

/// Resolve an invocation or method reference to exactly one declaration.
///
/// Pure query over the snapshot: candidates come from the receiver's static
/// type when one is known, otherwise from the enclosing scope chain walked
/// innermost-outward. Within a phase the most specific applicable candidate
/// wins; an unresolvable tie is [`BindError::Ambiguous`].
pub fn resolve_call(program: &Program, site: &CallSite) -> Result<Binding, BindError> {
    let candidate_sets = candidate_sets(program, site);

    for candidates in candidate_sets {
        if candidates.is_empty() {
            continue;
        }
        // The innermost scope declaring the name wins; outer scopes are not
        // consulted even if this set ends up inapplicable.
        return pick_applicable(program, site, &candidates);
    }

    Err(BindError::Unresolved {
        name: site.name.clone(),
        arity: site.args.len(),
    })
}

/// Candidate declarations grouped by scope level, innermost first.
fn candidate_sets(program: &Program, site: &CallSite) -> Vec<Vec<DeclId>> {
    if let Some(TypeRef::Named { decl, .. }) = &site.receiver_ty {
        return vec![methods_visible_in(program, *decl, &site.name)];
    }
    if matches!(site.receiver, Receiver::Expr(_)) {
        // Receiver expression with no modeled type: nothing to resolve
        // against.
        return Vec::new();
    }

    let mut sets = Vec::new();
    let mut cur = Some(site.enclosing);
    while let Some(id) = cur {
        let d = program.decl(id);
        if d.is_type() {
            sets.push(methods_visible_in(program, id, &site.name));
        }
        cur = d.enclosing;
    }
    sets
}

/// Methods named `name` declared in `ty` or inherited from its supertypes,
/// with overridden duplicates removed (the subtype declaration wins).
fn methods_visible_in(program: &Program, ty: DeclId, name: &str) -> Vec<DeclId> {
    let mut out: Vec<DeclId> = Vec::new();
    let mut chain = vec![ty];
    chain.extend(program.all_supertypes(ty));
    for t in chain {
        for m in program.methods_named(t, name) {
            let overridden = out.iter().any(|prev| program.same_signature(*prev, m.id));
            if !overridden {
                out.push(m.id);
            }
        }
    }
    out
}

fn pick_applicable(
    program: &Program,
    site: &CallSite,
    candidates: &[DeclId],
) -> Result<Binding, BindError> {
    for phase in PHASES {
        let mut applicable: Vec<(DeclId, BTreeMap<String, TypeRef>)> = Vec::new();
        for id in candidates {
            let method = program.decl(*id);
            if let Some(subst) = applicability(program, method, &site.args, phase) {
                applicable.push((*id, subst));
            }
        }
        match applicable.len() {
            0 => continue,
            1 => {
                let (decl, substitution) = applicable.remove(0);
                return Ok(Binding { decl, substitution });
            }
            _ => {
                let winner = most_specific(program, &applicable);
                return match winner {
                    Some((decl, substitution)) => Ok(Binding { decl, substitution }),
                    None => Err(BindError::Ambiguous {
                        name: site.name.clone(),
                        candidates: applicable.into_iter().map(|(d, _)| d).collect(),
                    }),
                };
            }
        }
    }

    Err(BindError::Unresolved {
        name: site.name.clone(),
        arity: site.args.len(),
    })
}

/// Judge one candidate under one phase. Returns the inferred type-argument
/// substitution when the candidate is applicable. Unification failure
/// excludes the candidate; it never fails the whole resolution.
fn applicability(
    program: &Program,
    method: &Declaration,
    args: &[Argument],
    phase: Phase,
) -> Option<BTreeMap<String, TypeRef>> {
    let param_types: Vec<TypeRef> = method
        .params
        .iter()
        .map(|p| {
            program
                .decl(*p)
                .ty
                .clone()
                .unwrap_or(TypeRef::Unresolved("java.lang.Object".to_string()))
        })
        .collect();

    let expected: Vec<TypeRef> = match phase {
        Phase::Strict | Phase::Loose => {
            if args.len() != param_types.len() {
                return None;
            }
            param_types
        }
        Phase::VariableArity => {
            if !method.is_varargs || param_types.is_empty() {
                return None;
            }
            let fixed = param_types.len() - 1;
            if args.len() < fixed {
                return None;
            }
            let element = match &param_types[fixed] {
                TypeRef::Array(elem) => (**elem).clone(),
                other => other.clone(),
            };
            let mut expanded: Vec<TypeRef> = param_types[..fixed].to_vec();
            expanded.extend(std::iter::repeat(element).take(args.len() - fixed));
            expanded
        }
    };

    let vars: HashSet<String> = method
        .type_params
        .iter()
        .map(|tp| tp.name.clone())
        .collect();
    let mut subst = BTreeMap::new();

    for (param, arg) in expected.iter().zip(args) {
        if !unify(program, param, &arg.ty, &vars, &mut subst) {
            return None;
        }
    }

    for (param, arg) in expected.iter().zip(args) {
        let param = substitute(param, &subst);
        if !convertible(program, &arg.ty, &param, phase) {
            return None;
        }
    }

    Some(subst)
}

/// Solve type variables by unifying an argument type against a parameter
/// type. Primitive arguments are boxed before binding a variable.
fn unify(
    program: &Program,
    param: &TypeRef,
    arg: &TypeRef,
    vars: &HashSet<String>,
    subst: &mut BTreeMap<String, TypeRef>,
) -> bool {
    match (param, arg) {
        (TypeRef::Var(v), _) if vars.contains(v) => {
            let arg = match arg {
                TypeRef::Primitive(p) => {
                    TypeRef::Unresolved(format!("java.lang.{}", p.boxed_name()))
                }
                other => other.clone(),
            };
            match subst.get(v) {
                None => {
                    subst.insert(v.clone(), arg);
                    true
                }
                Some(bound) if *bound == arg => true,
                Some(bound) if program.is_subtype(&arg, bound) => true,
                Some(bound) if program.is_subtype(bound, &arg) => {
                    subst.insert(v.clone(), arg);
                    true
                }
                Some(_) => false,
            }
        }
        (TypeRef::Named { decl: pd, args: pa }, TypeRef::Named { decl: ad, args: aa })
            if pd == ad && pa.len() == aa.len() =>
        {
            pa.iter()
                .zip(aa)
                .all(|(p, a)| unify(program, p, a, vars, subst))
        }
        (TypeRef::Array(p), TypeRef::Array(a)) => unify(program, p, a, vars, subst),
        _ => true,
    }
}

fn substitute(ty: &TypeRef, subst: &BTreeMap<String, TypeRef>) -> TypeRef {
    match ty {
        TypeRef::Var(v) => subst.get(v).cloned().unwrap_or_else(|| ty.clone()),
        TypeRef::Named { decl, args } => TypeRef::Named {
            decl: *decl,
            args: args.iter().map(|a| substitute(a, subst)).collect(),
        },
        TypeRef::Array(elem) => TypeRef::Array(Box::new(substitute(elem, subst))),
        TypeRef::Wildcard { upper } => TypeRef::Wildcard {
            upper: upper.as_ref().map(|b| Box::new(substitute(b, subst))),
        },
        other => other.clone(),
    }
}

fn convertible(program: &Program, from: &TypeRef, to: &TypeRef, phase: Phase) -> bool {
    match (from, to) {
        (TypeRef::Primitive(f), TypeRef::Primitive(t)) => f.widens_to(*t),
        _ => {
            if program.is_subtype(from, to) {
                return true;
            }
            if matches!(to, TypeRef::Var(_)) {
                // An unbound variable accepts any reference argument.
                return from.is_reference() || phase != Phase::Strict;
            }
            match phase {
                Phase::Strict => false,
                Phase::Loose | Phase::VariableArity => from.boxes_to(to),
            }
        }
    }
}

/// The unique most specific candidate, or `None` on an unresolvable tie.
fn most_specific(
    program: &Program,
    applicable: &[(DeclId, BTreeMap<String, TypeRef>)],
) -> Option<(DeclId, BTreeMap<String, TypeRef>)> {
    let mut best: Option<&(DeclId, BTreeMap<String, TypeRef>)> = None;
    for entry in applicable {
        match best {
            None => best = Some(entry),
            Some(current) => {
                if strictly_more_specific(program, entry.0, current.0) {
                    best = Some(entry);
                }
            }
        }
    }
    let best = best?;
    let unique = applicable
        .iter()
        .all(|other| other.0 == best.0 || strictly_more_specific(program, best.0, other.0));
    unique.then(|| best.clone())
}

fn strictly_more_specific(program: &Program, a: DeclId, b: DeclId) -> bool {
    let at = program.erased_param_types(a);
    let bt = program.erased_param_types(b);
    if at.len() != bt.len() {
        // A fixed-arity match beats one that only fits via varargs packing.
        return at.len() > bt.len();
    }
    if at == bt {
        return false;
    }
    at.iter().zip(&bt).all(|(x, y)| program.is_subtype(x, y))
}
