//! Make Static.
//!
//! Converts an instance method to a static one. When the body still reads
//! instance state or `this`, the receiver is threaded as an explicit first
//! parameter; otherwise the parameter list is untouched. Every bound call
//! site switches to type-qualified invocation.

use graft_model::{CallKind, DeclId, DeclKind, Modifiers, OverrideIndex, Program, TextRange, TypeRef};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, CancelFlag, RefactorError, RefactorOutcome};
use crate::precondition::{
    chain_of, check_member_collision, check_outer_capture, instance_state_refs, sites_bound_to,
};
use crate::rewrite::{apply_inner_rewrites, rewrite_sites, ArgSource, ReceiverChange, RewritePlan};
use crate::scan::unqualified_occurrences;
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::method_text;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MakeStatic {
    pub method: DeclId,
}

pub(crate) fn perform(
    program: &Program,
    params: &MakeStatic,
    allow_partial: bool,
    cancel: &CancelFlag,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let owner = match program.enclosing_type(params.method) {
        Some(ty) => ty,
        None => return Err(RefactorError::WrongTargetKind("member method")),
    };
    let mut status = RefactoringStatus::new();
    if decl.is_static() {
        status.error(
            format!("`{}` is already static", decl.name),
            Some(StatusAnchor::Decl(params.method)),
        );
    }

    // A static method cannot participate in dynamic dispatch.
    let overrides = OverrideIndex::compute(program);
    let chain = chain_of(program, &overrides, params.method, &mut status);
    if chain.len() > 1 {
        status.error(
            format!(
                "`{}` participates in an override chain and cannot become static",
                program.qualified_name(params.method)
            ),
            Some(StatusAnchor::Decl(params.method)),
        );
    }
    check_outer_capture(program, params.method, &mut status);

    let body = decl.body.clone().unwrap_or_default();
    let state_refs = instance_state_refs(program, params.method);
    let needs_self = !state_refs.is_empty() || !unqualified_occurrences(&body, "this").is_empty();
    let self_name = if needs_self {
        Some(choose_self_name(program, decl, owner))
    } else {
        None
    };

    if needs_self {
        let mut erased: Vec<TypeRef> = vec![TypeRef::named(owner)];
        erased.extend(decl.params.iter().map(|&p| {
            program
                .decl(p)
                .ty
                .as_ref()
                .map(TypeRef::erasure)
                .unwrap_or(TypeRef::Unresolved("java.lang.Object".to_string()))
        }));
        check_member_collision(
            program,
            owner,
            &decl.name,
            Some(&erased),
            &[params.method],
            &mut status,
        );
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let sites = sites_bound_to(program, &[params.method]);
    // A bound method reference captures its receiver; with the receiver
    // becoming a parameter there is no expression form left to capture it.
    let mut rewritable = Vec::with_capacity(sites.len());
    for &site_id in &sites {
        let site = program.call_site(site_id);
        if needs_self && site.kind == CallKind::BoundMethodRef {
            if allow_partial {
                status.warning(
                    "bound method reference left unchanged: its receiver becomes a parameter",
                    Some(StatusAnchor::CallSite(site_id)),
                );
            } else {
                status.error(
                    "bound method reference cannot capture a receiver that becomes a parameter",
                    Some(StatusAnchor::CallSite(site_id)),
                );
            }
            continue;
        }
        rewritable.push(site_id);
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let mut new_params: Vec<(String, String)> = Vec::new();
    let mut arg_sources: Vec<ArgSource> = Vec::new();
    if let Some(name) = &self_name {
        new_params.push((program.decl(owner).name.clone(), name.clone()));
        arg_sources.push(ArgSource::Receiver);
    }
    for (idx, &p) in decl.params.iter().enumerate() {
        let param = program.decl(p);
        let ty = param
            .ty
            .as_ref()
            .map(|t| program.display_type(t))
            .unwrap_or_else(|| "Object".to_string());
        new_params.push((ty, param.name.clone()));
        if decl.is_varargs && idx + 1 == decl.params.len() {
            arg_sources.push(ArgSource::ExistingRest(idx));
        } else {
            arg_sources.push(ArgSource::Existing(idx));
        }
    }

    let plan = RewritePlan {
        chain: vec![params.method],
        new_name: None,
        receiver: ReceiverChange::ToStatic {
            type_name: program.decl(owner).name.clone(),
        },
        args: Some(arg_sources),
    };

    // Recursive self-calls are substituted into the redeclared body; the
    // receiver-threading pass below then renames their `this` argument.
    let (inner, outer): (Vec<_>, Vec<_>) = rewritable
        .iter()
        .copied()
        .partition(|&s| program.call_site(s).enclosing == params.method);
    let body = match apply_inner_rewrites(program, params.method, &inner, &plan, body) {
        Ok(body) => body,
        Err(reason) => {
            status.error(
                format!("call inside `{}` cannot be rewritten: {reason}", decl.name),
                Some(StatusAnchor::Decl(params.method)),
            );
            return Ok(outcome(status, EditSet::new()));
        }
    };

    let new_body = rewrite_static_body(&body, self_name.as_deref(), &state_refs);
    let old_text = program.decl_text(params.method).unwrap_or("");
    let indent: String = old_text.chars().take_while(|c| *c == ' ').collect();
    let modifiers = Modifiers {
        is_static: true,
        is_abstract: false,
        ..decl.modifiers
    };
    let redeclared = method_text(
        program,
        &indent,
        &modifiers,
        decl.ty.as_ref(),
        &decl.name,
        &new_params,
        decl.is_varargs,
        Some(&new_body),
    );
    debug!(
        method = %program.qualified_name(params.method),
        needs_self,
        sites = sites.len(),
        "making method static"
    );

    let mut edits = EditSet::new();
    edits.push(Edit::replace_decl(program, params.method, redeclared));

    let rewritten = rewrite_sites(program, &outer, &plan, cancel);
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

    status.info(format!(
        "made `{}` static ({} call sites)",
        program.qualified_name(params.method),
        sites.len()
    ));
    Ok(outcome(status, edits))
}

/// Rewrite the body for static context: `this` becomes the threaded
/// parameter and unqualified instance members are qualified through it.
fn rewrite_static_body(body: &str, self_name: Option<&str>, state_refs: &[String]) -> String {
    let self_name = match self_name {
        Some(name) => name,
        None => return body.to_string(),
    };
    let mut repls: Vec<(TextRange, String)> = Vec::new();
    for at in unqualified_occurrences(body, "this") {
        repls.push((TextRange::new(at, at + 4), self_name.to_string()));
    }
    for name in state_refs {
        for at in unqualified_occurrences(body, name) {
            repls.push((TextRange::new(at, at), format!("{self_name}.")));
        }
    }
    repls.sort_by(|a, b| (b.0.start, b.0.end).cmp(&(a.0.start, a.0.end)));
    let mut out = body.to_string();
    for (range, text) in repls {
        out.replace_range(range.start..range.end, &text);
    }
    out
}

/// A parameter name for the threaded receiver that collides with none of the
/// existing ones.
fn choose_self_name(program: &Program, decl: &graft_model::Declaration, owner: DeclId) -> String {
    let taken: Vec<String> = decl
        .params
        .iter()
        .map(|&p| program.decl(p).name.clone())
        .collect();
    let base = program.decl(owner).name[..1].to_ascii_lowercase();
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
