//! Introduce Indirection.
//!
//! Synthesizes a static entry point on a chosen type that forwards to the
//! original method, then rewrites exactly the one designated call site to go
//! through it. Every other call site is left untouched; this is the
//! narrowest rewrite in the catalog.

use graft_model::{CallSiteId, DeclId, Modifiers, Program, Receiver, Visibility};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::EditSet;
use crate::engine::{outcome, RefactorError, RefactorOutcome};
use crate::precondition::{check_member_collision, validated_name};
use crate::rewrite::anchored_edit;
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::{class_indent, insert_member, method_text, param_list};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntroduceIndirection {
    /// The single call site routed through the new entry point.
    pub call_site: CallSiteId,
    /// Type gaining the static forwarding method.
    pub delegate_type: DeclId,
    /// Name of the entry point; defaults to the target method's name.
    #[serde(default)]
    pub name: Option<String>,
}

pub(crate) fn perform(
    program: &Program,
    params: &IntroduceIndirection,
) -> Result<RefactorOutcome, RefactorError> {
    let mut status = RefactoringStatus::new();
    if !program.decl(params.delegate_type).is_type() {
        return Err(RefactorError::WrongTargetKind("type"));
    }
    let site = program.call_site(params.call_site);
    let target = match graft_model::resolve::resolve_call(program, site) {
        Ok(binding) => binding.decl,
        Err(err) => {
            status.fatal(
                format!("designated call does not resolve: {err}"),
                Some(StatusAnchor::CallSite(params.call_site)),
            );
            return Ok(outcome(status, EditSet::new()));
        }
    };
    if site.is_method_ref() {
        status.error(
            "a method reference cannot be routed through an indirection",
            Some(StatusAnchor::CallSite(params.call_site)),
        );
        return Ok(outcome(status, EditSet::new()));
    }
    let target_decl = program.decl(target);
    let owner = match program.enclosing_type(target) {
        Some(owner) => owner,
        None => return Err(RefactorError::WrongTargetKind("member method")),
    };
    let name = match params.name.as_deref() {
        Some(requested) => match validated_name(requested, &mut status) {
            Some(name) => name,
            None => return Ok(outcome(status, EditSet::new())),
        },
        None => target_decl.name.clone(),
    };

    // The entry point takes the receiver first, then the forwarded
    // parameters; a static target forwards without a receiver.
    let mut entry_params = param_list(program, target);
    let receiver_name = choose_receiver_name(program, target, owner);
    if !target_decl.is_static() {
        entry_params.insert(0, (program.decl(owner).name.clone(), receiver_name.clone()));
    }
    let mut erased = program.erased_param_types(target);
    if !target_decl.is_static() {
        erased.insert(0, graft_model::TypeRef::named(owner));
    }
    check_member_collision(program, params.delegate_type, &name, Some(&erased), &[], &mut status);
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let forward_args: Vec<String> = target_decl
        .params
        .iter()
        .map(|&p| program.decl(p).name.clone())
        .collect();
    let forward = if target_decl.is_static() {
        format!("{}.{}({})", program.decl(owner).name, target_decl.name, forward_args.join(", "))
    } else {
        format!("{}.{}({})", receiver_name, target_decl.name, forward_args.join(", "))
    };
    let body = match &target_decl.ty {
        Some(_) => format!("return {forward};"),
        None => format!("{forward};"),
    };
    let modifiers = Modifiers {
        visibility: Visibility::Public,
        is_static: true,
        is_abstract: false,
        is_final: false,
    };
    let indent = class_indent(program.decl_text(params.delegate_type).unwrap_or(""));
    let entry = method_text(
        program,
        &indent,
        &modifiers,
        target_decl.ty.as_ref(),
        &name,
        &entry_params,
        false,
        Some(&body),
    );

    // Only the designated site changes.
    let mut call_args: Vec<String> = Vec::new();
    if !target_decl.is_static() {
        match &site.receiver {
            Receiver::Expr(expr) => call_args.push(expr.clone()),
            Receiver::ImplicitThis => call_args.push("this".to_string()),
            Receiver::None => {
                status.error(
                    "instance target reached without a receiver",
                    Some(StatusAnchor::CallSite(params.call_site)),
                );
                return Ok(outcome(status, EditSet::new()));
            }
        }
    }
    call_args.extend(site.args.iter().map(|a| a.text.clone()));
    let new_call = format!(
        "{}.{}({})",
        program.decl(params.delegate_type).name,
        name,
        call_args.join(", ")
    );
    let site_edit = match anchored_edit(program, site, new_call) {
        Ok(edit) => edit,
        Err(reason) => {
            status.error(reason, Some(StatusAnchor::CallSite(params.call_site)));
            return Ok(outcome(status, EditSet::new()));
        }
    };

    let mut edits = EditSet::new();
    edits.push(insert_member(program, params.delegate_type, &entry));
    edits.push(site_edit);
    debug!(
        target = %program.qualified_name(target),
        delegate = %program.decl(params.delegate_type).name,
        "introduced indirection"
    );
    status.info(format!(
        "routed one call to `{}` through `{}.{}`",
        program.qualified_name(target),
        program.decl(params.delegate_type).name,
        name
    ));
    Ok(outcome(status, edits))
}

/// Receiver parameter name that collides with none of the forwarded ones.
fn choose_receiver_name(program: &Program, target: DeclId, owner: DeclId) -> String {
    let taken: Vec<String> = program
        .decl(target)
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
