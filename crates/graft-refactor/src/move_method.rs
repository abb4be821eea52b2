//! Move Instance Method.
//!
//! Moves an instance method to the type of one of its reference-typed
//! parameters or fields. The moved body swaps receivers: references through
//! the new receiver become implicit `this`, the old `this` becomes an
//! explicit parameter (threaded only when the body still needs the source
//! instance). By default the original method stays behind as a delegator;
//! with `inline_delegator` it is deleted and every call site is rewritten
//! with the receiver/argument swap.

use graft_model::{DeclId, DeclKind, OverrideIndex, Program, TextRange, TypeRef};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, CancelFlag, RefactorError, RefactorOutcome};
use crate::precondition::{
    accessible, chain_of, check_member_collision, check_outer_capture,
    check_visibility_after_move, dispatches_through_supertype, instance_state_refs,
    sites_bound_to,
};
use crate::rewrite::{rewrite_sites, ArgSource, ReceiverChange, RewritePlan};
use crate::scan::unqualified_occurrences;
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::{class_indent, insert_member, method_text};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "via")]
pub enum MoveTarget {
    /// Move to the declared type of the parameter at `index`.
    Parameter { index: usize },
    /// Move to the declared type of a field of the enclosing class.
    Field { field: DeclId },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MoveInstanceMethod {
    pub method: DeclId,
    pub target: MoveTarget,
    /// Delete the original and rewrite all call sites instead of keeping a
    /// delegating stub behind.
    #[serde(default)]
    pub inline_delegator: bool,
}

pub(crate) fn perform(
    program: &Program,
    params: &MoveInstanceMethod,
    allow_partial: bool,
    cancel: &CancelFlag,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let mut status = RefactoringStatus::new();
    if decl.is_static() {
        status.error(
            format!("`{}` is static; only instance methods move by receiver", decl.name),
            Some(StatusAnchor::Decl(params.method)),
        );
    }
    let source_ty = match program.enclosing_type(params.method) {
        Some(ty) => ty,
        None => return Err(RefactorError::WrongTargetKind("member method")),
    };

    // Resolve the new receiver.
    let (target_ty, receiver_name, removed_param) = match params.target {
        MoveTarget::Parameter { index } => {
            let param = match decl.params.get(index) {
                Some(&p) => p,
                None => {
                    status.error(
                        format!("`{}` has no parameter at position {index}", decl.name),
                        Some(StatusAnchor::Decl(params.method)),
                    );
                    return Ok(outcome(status, EditSet::new()));
                }
            };
            match target_type_of(program, param) {
                Some(ty) => (ty, program.decl(param).name.clone(), Some(index)),
                None => {
                    status.error(
                        format!(
                            "parameter `{}` does not have a class type in the snapshot",
                            program.decl(param).name
                        ),
                        Some(StatusAnchor::Decl(param)),
                    );
                    return Ok(outcome(status, EditSet::new()));
                }
            }
        }
        MoveTarget::Field { field } => {
            let field_decl = program.decl(field);
            if field_decl.kind != DeclKind::Field || field_decl.enclosing != Some(source_ty) {
                status.error(
                    format!("`{}` is not a field of the method's class", field_decl.name),
                    Some(StatusAnchor::Decl(field)),
                );
                return Ok(outcome(status, EditSet::new()));
            }
            match target_type_of(program, field) {
                Some(ty) => (ty, field_decl.name.clone(), None),
                None => {
                    status.error(
                        format!(
                            "field `{}` does not have a class type in the snapshot",
                            field_decl.name
                        ),
                        Some(StatusAnchor::Decl(field)),
                    );
                    return Ok(outcome(status, EditSet::new()));
                }
            }
        }
    };

    // An override chain pins the method to its hierarchy; moving one link
    // would break dynamic dispatch.
    let overrides = OverrideIndex::compute(program);
    let chain = chain_of(program, &overrides, params.method, &mut status);
    if chain.len() > 1 {
        status.error(
            format!(
                "`{}` participates in an override chain and cannot move",
                program.qualified_name(params.method)
            ),
            Some(StatusAnchor::Decl(params.method)),
        );
    }

    let sites = sites_bound_to(program, &[params.method]);
    for &site in &sites {
        if dispatches_through_supertype(program, site, params.method) {
            status.error(
                "call dispatches through a supertype-typed receiver; the moved method would \
                 not be reachable",
                Some(StatusAnchor::CallSite(site)),
            );
        }
    }
    if params.inline_delegator {
        for &site in &sites {
            if program.call_site(site).enclosing == params.method {
                status.error(
                    format!("`{}` calls itself; keep a delegator instead", decl.name),
                    Some(StatusAnchor::CallSite(site)),
                );
            }
        }
    }
    check_outer_capture(program, params.method, &mut status);

    // Does the moved body still need the source instance?
    let body = decl.body.clone().unwrap_or_default();
    let state_refs = instance_state_refs(program, params.method);
    let needs_self = !state_refs.is_empty() || !unqualified_occurrences(&body, "this").is_empty();
    let self_name = if needs_self {
        Some(choose_self_name(program, decl, removed_param, source_ty))
    } else {
        None
    };

    // New parameter list: the receiver parameter is replaced (in place) by
    // the threaded source instance, or simply dropped.
    let mut new_params: Vec<(String, String)> = Vec::new();
    let mut arg_sources: Vec<ArgSource> = Vec::new();
    for (idx, &p) in decl.params.iter().enumerate() {
        if removed_param == Some(idx) {
            if let Some(name) = &self_name {
                new_params.push((program.decl(source_ty).name.clone(), name.clone()));
                arg_sources.push(ArgSource::Receiver);
            }
            continue;
        }
        let param = program.decl(p);
        let ty = param
            .ty
            .as_ref()
            .map(|t| program.display_type(t))
            .unwrap_or_else(|| "Object".to_string());
        new_params.push((ty, param.name.clone()));
        arg_sources.push(ArgSource::Existing(idx));
    }
    if removed_param.is_none() {
        if let Some(name) = &self_name {
            new_params.push((program.decl(source_ty).name.clone(), name.clone()));
            arg_sources.push(ArgSource::Receiver);
        }
    }

    let new_erased: Vec<TypeRef> = decl
        .params
        .iter()
        .enumerate()
        .filter(|(idx, _)| removed_param != Some(*idx))
        .map(|(_, &p)| {
            program
                .decl(p)
                .ty
                .as_ref()
                .map(TypeRef::erasure)
                .unwrap_or(TypeRef::Unresolved("java.lang.Object".to_string()))
        })
        .chain(self_name.iter().map(|_| TypeRef::named(source_ty)))
        .collect();
    check_member_collision(program, target_ty, &decl.name, Some(&new_erased), &[], &mut status);

    if !accessible(program, decl.modifiers.visibility, target_ty, params.method) {
        status.error(
            format!(
                "`{}` would not be accessible on `{}` from its old class",
                decl.name,
                program.decl(target_ty).name
            ),
            Some(StatusAnchor::Decl(target_ty)),
        );
    }
    if params.inline_delegator {
        check_visibility_after_move(program, params.method, target_ty, &sites, &mut status);
    }

    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let new_body = rewrite_moved_body(&body, &receiver_name, self_name.as_deref(), &state_refs);
    let target_indent = class_indent(program.decl_text(target_ty).unwrap_or(""));
    let new_method = method_text(
        program,
        &target_indent,
        &decl.modifiers,
        decl.ty.as_ref(),
        &decl.name,
        &new_params,
        decl.is_varargs,
        Some(&new_body),
    );
    debug!(
        method = %program.qualified_name(params.method),
        target = %program.qualified_name(target_ty),
        needs_self,
        "moving instance method"
    );

    let mut edits = EditSet::new();
    edits.push(insert_member(program, target_ty, &new_method));

    if params.inline_delegator {
        let plan = RewritePlan {
            chain: vec![params.method],
            new_name: None,
            receiver: match params.target {
                MoveTarget::Parameter { index } => ReceiverChange::ToArgument { param_index: index },
                MoveTarget::Field { .. } => ReceiverChange::ToReceiverField {
                    field_name: receiver_name.clone(),
                },
            },
            args: Some(arg_sources),
        };
        let rewritten = rewrite_sites(program, &sites, &plan, cancel);
        if rewritten.cancelled {
            return Ok(RefactorOutcome::cancelled());
        }
        for (site, reason) in rewritten.rejections() {
            if allow_partial {
                status.warning(
                    format!("call site left unchanged: {reason}"),
                    Some(StatusAnchor::CallSite(site)),
                );
            } else {
                status.error(
                    format!("call site cannot be rewritten: {reason}"),
                    Some(StatusAnchor::CallSite(site)),
                );
            }
        }
        for edit in rewritten.edits() {
            edits.push(edit.clone());
        }
        edits.push(Edit::delete_decl(program, params.method));
    } else {
        // The original becomes a delegator forwarding to the moved method.
        let delegate_args: Vec<String> = arg_sources
            .iter()
            .map(|source| match source {
                ArgSource::Receiver => "this".to_string(),
                ArgSource::Existing(idx) => program.decl(decl.params[*idx]).name.clone(),
                _ => unreachable!("move synthesizes only receiver/existing arguments"),
            })
            .collect();
        let call = format!("{}.{}({})", receiver_name, decl.name, delegate_args.join(", "));
        let stmt = match &decl.ty {
            Some(_) => format!("return {call};"),
            None => format!("{call};"),
        };
        let old_text = program.decl_text(params.method).unwrap_or("");
        let old_indent: String = old_text
            .chars()
            .take_while(|c| *c == ' ')
            .collect();
        let delegator = method_text(
            program,
            &old_indent,
            &decl.modifiers,
            decl.ty.as_ref(),
            &decl.name,
            &crate::synth::param_list(program, params.method),
            decl.is_varargs,
            Some(&stmt),
        );
        edits.push(Edit::replace_decl(program, params.method, delegator));
    }

    status.info(format!(
        "moved `{}` to `{}` ({} call sites)",
        program.qualified_name(params.method),
        program.decl(target_ty).name,
        sites.len()
    ));
    Ok(outcome(status, edits))
}

fn target_type_of(program: &Program, decl: DeclId) -> Option<DeclId> {
    match program.decl(decl).ty.as_ref()? {
        TypeRef::Named { decl, .. } => Some(*decl),
        _ => None,
    }
}

/// A name for the threaded source instance that collides with nothing the
/// body can see.
fn choose_self_name(
    program: &Program,
    decl: &graft_model::Declaration,
    removed_param: Option<usize>,
    source_ty: DeclId,
) -> String {
    let taken: Vec<String> = decl
        .params
        .iter()
        .enumerate()
        .filter(|(idx, _)| removed_param != Some(*idx))
        .map(|(_, &p)| program.decl(p).name.clone())
        .collect();
    let base = program.decl(source_ty).name[..1].to_ascii_lowercase();
    if !taken.contains(&base) {
        return base;
    }
    let mut idx = 0usize;
    loop {
        let candidate = format!("{base}{idx}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        idx += 1;
    }
}

/// Rewrite the moved body for its new home: the old receiver name becomes
/// implicit `this`, the old `this` becomes the threaded parameter, and
/// unqualified source-instance members are qualified through it.
fn rewrite_moved_body(
    body: &str,
    receiver_name: &str,
    self_name: Option<&str>,
    state_refs: &[String],
) -> String {
    let mut repls: Vec<(TextRange, String)> = Vec::new();
    let bytes = body.as_bytes();
    for at in unqualified_occurrences(body, receiver_name) {
        let after = at + receiver_name.len();
        if bytes.get(after) == Some(&b'.') {
            // `b.mB1()` reads as `this.mB1()` in the new home; drop the
            // qualifier entirely.
            repls.push((TextRange::new(at, after + 1), String::new()));
        } else {
            repls.push((TextRange::new(at, after), "this".to_string()));
        }
    }
    if let Some(self_name) = self_name {
        for at in unqualified_occurrences(body, "this") {
            repls.push((TextRange::new(at, at + 4), self_name.to_string()));
        }
        for name in state_refs {
            for at in unqualified_occurrences(body, name) {
                repls.push((TextRange::new(at, at), format!("{self_name}.")));
            }
        }
    }
    repls.sort_by(|a, b| (b.0.start, b.0.end).cmp(&(a.0.start, a.0.end)));
    let mut out = body.to_string();
    for (range, text) in repls {
        out.replace_range(range.start..range.end, &text);
    }
    out
}
