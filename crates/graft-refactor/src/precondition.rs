//! Shared precondition rules.
//!
//! Every catalog entry runs its kind-specific checks through these helpers
//! before computing a structural delta. All checks are pure queries over the
//! snapshot; they accumulate entries into a [`RefactoringStatus`] and never
//! mutate the model.

use graft_model::{
    CallSiteId, DeclId, Nesting, OverrideIndex, Program, Receiver, TypeRef, Visibility,
};

use crate::ident::validate_identifier;
use crate::scan::unqualified_occurrences;
use crate::status::{RefactoringStatus, StatusAnchor};

/// Validate a host-supplied name, pushing an error on failure.
pub(crate) fn validated_name(name: &str, status: &mut RefactoringStatus) -> Option<String> {
    match validate_identifier(name) {
        Ok(name) => Some(name),
        Err(err) => {
            status.error(format!("`{name}` is not a usable identifier: {err}"), None);
            None
        }
    }
}

/// The top-level type enclosing `decl` (itself, if top level).
pub(crate) fn top_level_of(program: &Program, decl: DeclId) -> DeclId {
    let mut cur = decl;
    loop {
        let d = program.decl(cur);
        match d.enclosing {
            Some(outer) => cur = outer,
            None => return cur,
        }
    }
}

/// Whether code inside `from` may access `member` where it is (or will be)
/// declared, under `owner`'s visibility rules.
pub(crate) fn accessible(
    program: &Program,
    visibility: Visibility,
    owner: DeclId,
    from: DeclId,
) -> bool {
    match visibility {
        Visibility::Public | Visibility::PackagePrivate => true,
        Visibility::Private => top_level_of(program, owner) == top_level_of(program, from),
        Visibility::Protected => {
            let from_ty = match program.enclosing_type(from) {
                Some(ty) => ty,
                None => return false,
            };
            program.is_subtype_decl(from_ty, owner)
                || top_level_of(program, owner) == top_level_of(program, from)
        }
    }
}

/// Accessibility must not regress for any call site that stays behind after
/// `member` is re-declared on `new_owner`.
pub(crate) fn check_visibility_after_move(
    program: &Program,
    member: DeclId,
    new_owner: DeclId,
    sites: &[CallSiteId],
    status: &mut RefactoringStatus,
) {
    let visibility = program.decl(member).modifiers.visibility;
    for &site_id in sites {
        let site = program.call_site(site_id);
        if !accessible(program, visibility, new_owner, site.enclosing) {
            status.error(
                format!(
                    "`{}` would no longer be accessible from `{}` after the move",
                    program.qualified_name(member),
                    program.qualified_name(site.enclosing),
                ),
                Some(StatusAnchor::CallSite(site_id)),
            );
        }
    }
}

/// Names of instance members visible unqualified inside `ty`: its own and its
/// supertypes' non-static fields and methods.
pub(crate) fn instance_member_names(program: &Program, ty: DeclId) -> Vec<String> {
    let mut names = Vec::new();
    let mut types = vec![ty];
    types.extend(program.all_supertypes(ty));
    for t in types {
        for member in program.members_of(t) {
            if !member.is_static() && !member.is_type() && !names.contains(&member.name) {
                names.push(member.name.clone());
            }
        }
    }
    names
}

/// Instance members of the enclosing type that `method`'s body references
/// without qualification. These are the references that must be re-threaded
/// when the method leaves its type or loses its `this`.
pub(crate) fn instance_state_refs(program: &Program, method: DeclId) -> Vec<String> {
    let decl = program.decl(method);
    let body = match &decl.body {
        Some(body) => body,
        None => return Vec::new(),
    };
    let ty = match program.enclosing_type(method) {
        Some(ty) => ty,
        None => return Vec::new(),
    };
    let own_params: Vec<&str> = decl
        .params
        .iter()
        .map(|p| program.decl(*p).name.as_str())
        .collect();
    instance_member_names(program, ty)
        .into_iter()
        .filter(|name| !own_params.contains(&name.as_str()))
        .filter(|name| !unqualified_occurrences(body, name).is_empty())
        .collect()
}

/// A member of a local or anonymous class cannot leave its type while it
/// reads enclosing-instance state with no modeled handle back to that
/// instance. Fatal: there is nothing to thread.
pub(crate) fn check_outer_capture(
    program: &Program,
    method: DeclId,
    status: &mut RefactoringStatus,
) {
    let ty = match program.enclosing_type(method) {
        Some(ty) => ty,
        None => return,
    };
    if !matches!(
        program.decl(ty).nesting,
        Nesting::Local | Nesting::Anonymous
    ) {
        return;
    }
    let outer = match program.decl(ty).enclosing.and_then(|e| program.enclosing_type(e)) {
        Some(outer) => outer,
        None => return,
    };
    let body = match &program.decl(method).body {
        Some(body) => body.as_str(),
        None => return,
    };
    let captured: Vec<String> = instance_member_names(program, outer)
        .into_iter()
        .filter(|name| !unqualified_occurrences(body, name).is_empty())
        .collect();
    if captured.is_empty() {
        return;
    }
    match program.capture_handle(ty, outer) {
        Some(edge) if edge.handle.is_some() => {}
        _ => {
            status.fatal(
                format!(
                    "`{}` captures `{}` of the enclosing instance, and `{}` has no \
                     accessible handle to that instance",
                    program.qualified_name(method),
                    captured.join("`, `"),
                    program.decl(ty).name,
                ),
                Some(StatusAnchor::Decl(method)),
            );
        }
    }
}

/// Duplicate member signature or field shadowing in the target scope.
pub(crate) fn check_member_collision(
    program: &Program,
    target_ty: DeclId,
    name: &str,
    erased_params: Option<&[TypeRef]>,
    exclude: &[DeclId],
    status: &mut RefactoringStatus,
) {
    for member in program.members_of(target_ty) {
        if member.name != name || exclude.contains(&member.id) {
            continue;
        }
        let clash = match erased_params {
            // Method vs method: same erased signature only.
            Some(params) => member.is_method() && program.erased_param_types(member.id) == params,
            // Field vs anything of the same name.
            None => true,
        };
        if clash {
            status.error(
                format!(
                    "`{}` already declares a member named `{}` with this signature",
                    program.qualified_name(target_ty),
                    name,
                ),
                Some(StatusAnchor::Decl(member.id)),
            );
        }
    }
}

/// The full override chain of `method`, with an informational entry when the
/// change will propagate beyond the requested declaration.
pub(crate) fn chain_of(
    program: &Program,
    overrides: &OverrideIndex,
    method: DeclId,
    status: &mut RefactoringStatus,
) -> Vec<DeclId> {
    let chain = overrides.chain(method);
    if chain.len() > 1 {
        let names: Vec<String> = chain
            .iter()
            .map(|&d| program.qualified_name(d))
            .collect();
        status.info(format!(
            "change propagates through the override chain: {}",
            names.join(", ")
        ));
    }
    chain
}

/// Call sites bound to any declaration of `chain`, in stable unit order.
///
/// Binding goes through the resolver so overloads of the same name on the
/// same type never leak in.
pub(crate) fn sites_bound_to(program: &Program, chain: &[DeclId]) -> Vec<CallSiteId> {
    let names: Vec<&str> = chain.iter().map(|&d| program.decl(d).name.as_str()).collect();
    let mut out = Vec::new();
    for site in program.call_sites() {
        if !names.contains(&site.name.as_str()) {
            continue;
        }
        if let Ok(binding) = graft_model::resolve::resolve_call(program, site) {
            if chain.contains(&binding.decl) {
                out.push(site.id);
            }
        }
    }
    out
}

/// Whether a call site invokes its target through a receiver statically typed
/// as a proper supertype of the target's declaring type.
pub(crate) fn dispatches_through_supertype(program: &Program, site_id: CallSiteId, target: DeclId) -> bool {
    let site = program.call_site(site_id);
    let owner = match program.enclosing_type(target) {
        Some(owner) => owner,
        None => return false,
    };
    match (&site.receiver, &site.receiver_ty) {
        (Receiver::Expr(_), Some(TypeRef::Named { decl, .. })) => {
            *decl != owner && program.is_subtype_decl(owner, *decl)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::{Primitive, ProgramBuilder, Visibility};

    fn int() -> TypeRef {
        TypeRef::Primitive(Primitive::Int)
    }

    #[test]
    fn private_members_stay_accessible_only_inside_their_top_level_type() {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let a = b.class(unit, "A");
        let helper = b.method(a, "helper", None, &[], Some(""));
        b.set_visibility(helper, Visibility::Private);
        let other_unit = b.unit("C.java");
        let c = b.class(other_unit, "C");
        let caller = b.method(c, "caller", None, &[], Some(""));
        let program = b.finish().expect("valid model");

        assert!(accessible(&program, Visibility::Private, a, helper));
        assert!(!accessible(&program, Visibility::Private, a, caller));
        assert!(accessible(&program, Visibility::PackagePrivate, a, caller));
    }

    #[test]
    fn instance_state_refs_see_inherited_members_but_not_parameters() {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let base = b.class(unit, "Base");
        b.field(base, "shared", int());
        let a = b.class(unit, "A");
        b.extends(a, base);
        b.field(a, "total", int());
        let m = b.method(
            a,
            "work",
            Some(int()),
            &[("total", int())],
            Some("return total + shared;"),
        );
        let program = b.finish().expect("valid model");

        // `total` is shadowed by the parameter; only `shared` is instance state.
        assert_eq!(instance_state_refs(&program, m), vec!["shared".to_string()]);
    }

    #[test]
    fn collisions_compare_erased_signatures() {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let a = b.class(unit, "A");
        b.method(a, "run", None, &[("x", int())], Some(""));
        let program = b.finish().expect("valid model");

        let mut status = RefactoringStatus::new();
        check_member_collision(&program, a, "run", Some(&[int()]), &[], &mut status);
        assert!(!status.allows_edits());

        let mut status = RefactoringStatus::new();
        check_member_collision(
            &program,
            a,
            "run",
            Some(&[TypeRef::array(int())]),
            &[],
            &mut status,
        );
        assert!(status.allows_edits());
    }
}
