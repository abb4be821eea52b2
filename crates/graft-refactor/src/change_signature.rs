//! Change Method Signature.
//!
//! Reorders, adds, removes, and renames parameters, optionally renaming the
//! method. The change propagates through the full override chain atomically:
//! every declaration in the chain is rewritten, or the status carries an
//! error and the edit set stays empty. Call sites bound anywhere into the
//! chain are rewritten against the new parameter order; a trailing varargs
//! parameter keeps its packed tail whether the site passed loose arguments
//! or one explicit array.

use graft_model::{DeclId, DeclKind, OverrideIndex, Program, TypeRef};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, CancelFlag, RefactorError, RefactorOutcome};
use crate::expr::has_side_effects;
use crate::precondition::{chain_of, check_member_collision, sites_bound_to, validated_name};
use crate::rewrite::{apply_inner_rewrites, rewrite_sites, ArgSource, ReceiverChange, RewritePlan};
use crate::scan::{replace_identifier, unqualified_occurrences};
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::method_text;

/// One parameter of the new signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum ParameterSpec {
    /// Keep the old parameter at `index`, optionally under a new name.
    Existing {
        index: usize,
        #[serde(default)]
        rename: Option<String>,
    },
    /// Introduce a new parameter; every existing call site receives
    /// `default_value` as the argument.
    Add {
        name: String,
        ty: TypeRef,
        default_value: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeSignature {
    pub method: DeclId,
    #[serde(default)]
    pub new_name: Option<String>,
    /// The new parameter list, in order. Old parameters not listed are
    /// removed.
    pub parameters: Vec<ParameterSpec>,
    /// Force the trailing parameter's arity; `None` keeps the old varargs
    /// flag when the old varargs parameter stays last.
    #[serde(default)]
    pub make_varargs: Option<bool>,
}

pub(crate) fn perform(
    program: &Program,
    params: &ChangeSignature,
    allow_partial: bool,
    cancel: &CancelFlag,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let mut status = RefactoringStatus::new();

    let new_name = match &params.new_name {
        Some(name) => match validated_name(name, &mut status) {
            Some(name) => Some(name),
            None => return Ok(outcome(status, EditSet::new())),
        },
        None => None,
    };
    for spec in &params.parameters {
        match spec {
            ParameterSpec::Existing { index, rename } => {
                if *index >= decl.params.len() {
                    status.error(
                        format!("`{}` has no parameter at position {index}", decl.name),
                        Some(StatusAnchor::Decl(params.method)),
                    );
                }
                if let Some(rename) = rename {
                    validated_name(rename, &mut status);
                }
            }
            ParameterSpec::Add { name, .. } => {
                validated_name(name, &mut status);
            }
        }
    }
    let mut seen = Vec::new();
    for spec in &params.parameters {
        if let ParameterSpec::Existing { index, .. } = spec {
            if seen.contains(index) {
                status.error(
                    format!("parameter {index} is listed twice in the new signature"),
                    Some(StatusAnchor::Decl(params.method)),
                );
            }
            seen.push(*index);
        }
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    // The change is chain-wide: abstract and interface declarations are
    // equal members, and all of them update together.
    let overrides = OverrideIndex::compute(program);
    let chain = chain_of(program, &overrides, params.method, &mut status);
    let sites = sites_bound_to(program, &chain);

    let old_varargs_kept = decl.is_varargs
        && matches!(
            params.parameters.last(),
            Some(ParameterSpec::Existing { index, .. }) if *index + 1 == decl.params.len()
        );
    let new_varargs = params.make_varargs.unwrap_or(old_varargs_kept);
    let final_name = new_name.as_deref().unwrap_or(&decl.name);

    let new_erased: Vec<TypeRef> = params
        .parameters
        .iter()
        .map(|spec| match spec {
            ParameterSpec::Existing { index, .. } => program
                .decl(decl.params[*index])
                .ty
                .as_ref()
                .map(TypeRef::erasure)
                .unwrap_or(TypeRef::Unresolved("java.lang.Object".to_string())),
            ParameterSpec::Add { ty, .. } => ty.erasure(),
        })
        .collect();
    for &member in &chain {
        if let Some(owner) = program.enclosing_type(member) {
            check_member_collision(program, owner, final_name, Some(&new_erased), &chain, &mut status);
        }
    }

    check_removed_and_renamed(program, params, &chain, &mut status);
    check_arity_at_sites(program, params, &sites, decl.is_varargs, new_varargs, &mut status);

    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let arg_sources: Vec<ArgSource> = params
        .parameters
        .iter()
        .map(|spec| match spec {
            ParameterSpec::Existing { index, .. } => {
                if decl.is_varargs && *index + 1 == decl.params.len() {
                    ArgSource::ExistingRest(*index)
                } else {
                    ArgSource::Existing(*index)
                }
            }
            ParameterSpec::Add { default_value, .. } => ArgSource::Literal(default_value.clone()),
        })
        .collect();
    let plan = RewritePlan {
        chain: chain.clone(),
        new_name: new_name.clone(),
        receiver: ReceiverChange::Unchanged,
        args: Some(arg_sources),
    };

    // Sites inside a chain member's own body (recursion, sibling overrides
    // calling through the declaration) are substituted into the redeclared
    // text; anchoring them separately would collide with the redeclaration.
    let (inner, outer): (Vec<_>, Vec<_>) = sites
        .iter()
        .copied()
        .partition(|&s| chain.contains(&program.call_site(s).enclosing));

    let mut edits = EditSet::new();
    for &member in &chain {
        let body = match program.decl(member).body.clone() {
            Some(text) => match apply_inner_rewrites(program, member, &inner, &plan, text) {
                Ok(text) => Some(text),
                Err(reason) => {
                    status.error(
                        format!("call inside `{}` cannot be rewritten: {reason}", program.qualified_name(member)),
                        Some(StatusAnchor::Decl(member)),
                    );
                    return Ok(outcome(status, EditSet::new()));
                }
            },
            None => None,
        };
        edits.push(redeclare(program, member, params, final_name, new_varargs, body));
    }

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

    debug!(
        method = %program.qualified_name(params.method),
        chain = chain.len(),
        sites = sites.len(),
        "signature changed"
    );
    status.info(format!(
        "changed the signature of `{}` across {} declaration(s) and {} call site(s)",
        program.qualified_name(params.method),
        chain.len(),
        sites.len()
    ));
    Ok(outcome(status, edits))
}

/// Removed parameters must be dead in every chain member's body, and removed
/// arguments must not carry side effects a caller relies on.
fn check_removed_and_renamed(
    program: &Program,
    params: &ChangeSignature,
    chain: &[DeclId],
    status: &mut RefactoringStatus,
) {
    let decl = program.decl(params.method);
    let kept: Vec<usize> = params
        .parameters
        .iter()
        .filter_map(|spec| match spec {
            ParameterSpec::Existing { index, .. } => Some(*index),
            ParameterSpec::Add { .. } => None,
        })
        .collect();
    for (index, _) in decl.params.iter().enumerate() {
        if kept.contains(&index) {
            continue;
        }
        for &member in chain {
            let member_decl = program.decl(member);
            let param = match member_decl.params.get(index) {
                Some(&p) => program.decl(p),
                None => continue,
            };
            let used = member_decl
                .body
                .as_deref()
                .map(|body| !unqualified_occurrences(body, &param.name).is_empty())
                .unwrap_or(false);
            if used {
                status.error(
                    format!(
                        "parameter `{}` is removed but still used in `{}`",
                        param.name,
                        program.qualified_name(member)
                    ),
                    Some(StatusAnchor::Decl(member)),
                );
            }
        }
    }
}

/// Re-validate call sites whose argument shape the change disturbs: dropped
/// side-effecting arguments, and arity under the new fixed/varargs rules.
fn check_arity_at_sites(
    program: &Program,
    params: &ChangeSignature,
    sites: &[graft_model::CallSiteId],
    old_varargs: bool,
    new_varargs: bool,
    status: &mut RefactoringStatus,
) {
    let decl = program.decl(params.method);
    let kept: Vec<usize> = params
        .parameters
        .iter()
        .filter_map(|spec| match spec {
            ParameterSpec::Existing { index, .. } => Some(*index),
            ParameterSpec::Add { .. } => None,
        })
        .collect();
    let fixed_params = if old_varargs {
        decl.params.len().saturating_sub(1)
    } else {
        decl.params.len()
    };
    for &site_id in sites {
        let site = program.call_site(site_id);
        for (index, _) in decl.params.iter().enumerate() {
            if kept.contains(&index) || index >= fixed_params {
                continue;
            }
            if let Some(arg) = site.args.get(index) {
                if has_side_effects(&arg.text) {
                    status.warning(
                        format!(
                            "removed argument `{}` has side effects; it will no longer \
                             be evaluated",
                            arg.text
                        ),
                        Some(StatusAnchor::CallSite(site_id)),
                    );
                }
            }
        }
        let min_args = if new_varargs {
            params.parameters.len().saturating_sub(1)
        } else {
            params.parameters.len()
        };
        // Arity after rewriting: kept fixed args + added defaults + the
        // varargs tail (which may be empty).
        let tail = site.args.len().saturating_sub(fixed_params);
        let rewritten_args = params
            .parameters
            .iter()
            .map(|spec| match spec {
                ParameterSpec::Existing { index, .. }
                    if old_varargs && *index + 1 == decl.params.len() =>
                {
                    tail
                }
                _ => 1,
            })
            .sum::<usize>();
        if rewritten_args < min_args {
            status.error(
                format!(
                    "call passes {} argument(s) where the new signature needs at least {}",
                    rewritten_args, min_args
                ),
                Some(StatusAnchor::CallSite(site_id)),
            );
        }
    }
}

/// Re-render one chain member under the new signature, renaming parameters
/// inside its body.
fn redeclare(
    program: &Program,
    member: DeclId,
    params: &ChangeSignature,
    final_name: &str,
    new_varargs: bool,
    body: Option<String>,
) -> Edit {
    let decl = program.decl(member);
    let mut new_params: Vec<(String, String)> = Vec::new();
    let mut body = body;
    for spec in &params.parameters {
        match spec {
            ParameterSpec::Existing { index, rename } => {
                // Chain members may use different parameter names; each body
                // renames its own.
                let param = program.decl(decl.params[*index]);
                let ty = param
                    .ty
                    .as_ref()
                    .map(|t| program.display_type(t))
                    .unwrap_or_else(|| "Object".to_string());
                let name = match rename {
                    Some(new) => {
                        if let Some(text) = body.take() {
                            body = Some(replace_identifier(&text, &param.name, new).0);
                        }
                        new.clone()
                    }
                    None => param.name.clone(),
                };
                new_params.push((ty, name));
            }
            ParameterSpec::Add { name, ty, .. } => {
                new_params.push((program.display_type(ty), name.clone()));
            }
        }
    }
    let old_text = program.decl_text(member).unwrap_or("");
    let indent: String = old_text.chars().take_while(|c| *c == ' ').collect();
    let rendered = method_text(
        program,
        &indent,
        &decl.modifiers,
        decl.ty.as_ref(),
        final_name,
        &new_params,
        new_varargs,
        body.as_deref(),
    );
    Edit::replace_decl(program, member, rendered)
}
