//! Inline Constant / Temp / Method.
//!
//! The inverse of extraction: the definition's text replaces every use and
//! the definition disappears. Textual substitution changes evaluation counts
//! when the substituted expression has side effects, and changes reference
//! identity when a lambda or method reference stored once fans out into an
//! array, so both situations reject the inline instead of miscompiling.

use graft_model::{DeclId, DeclKind, NameRef, Program, TextRange};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, CancelFlag, RefactorError, RefactorOutcome};
use crate::expr::has_side_effects;
use crate::precondition::instance_state_refs;
use crate::rewrite::anchored_edit;
use crate::scan::{replace_identifier, unqualified_occurrences};
use crate::status::{RefactoringStatus, StatusAnchor};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InlineConstant {
    pub field: DeclId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InlineTemp {
    pub local: DeclId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InlineMethod {
    pub method: DeclId,
}

pub(crate) fn inline_constant(
    program: &Program,
    params: &InlineConstant,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.field);
    if decl.kind != DeclKind::Field {
        return Err(RefactorError::WrongTargetKind("field"));
    }
    inline_value(program, params.field, "constant")
}

pub(crate) fn inline_temp(
    program: &Program,
    params: &InlineTemp,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.local);
    if decl.kind != DeclKind::Local {
        return Err(RefactorError::WrongTargetKind("local variable"));
    }
    inline_value(program, params.local, "temp")
}

/// Shared path for constants and temps: one initializer, many uses.
fn inline_value(
    program: &Program,
    target: DeclId,
    what: &str,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(target);
    let mut status = RefactoringStatus::new();
    let init = match &decl.body {
        Some(init) => init.clone(),
        None => {
            status.error(
                format!("`{}` has no initializer to inline", decl.name),
                Some(StatusAnchor::Decl(target)),
            );
            return Ok(outcome(status, EditSet::new()));
        }
    };
    let uses = program.references_to(target);

    if has_side_effects(&init) && uses.len() >= 2 {
        status.error(
            format!(
                "initializer `{}` has side effects and `{}` is used {} times; inlining \
                 would repeat the effect",
                init,
                decl.name,
                uses.len()
            ),
            Some(StatusAnchor::Decl(target)),
        );
    }
    if has_side_effects(&init) && uses.is_empty() {
        status.error(
            format!(
                "initializer `{}` has side effects and `{}` is never read; inlining \
                 would drop the effect",
                init, decl.name
            ),
            Some(StatusAnchor::Decl(target)),
        );
    }
    // A lambda or method reference names one identity; fanning it into an
    // array initializer (or several uses) multiplies the identities.
    let single_identity = init.contains("->") || init.contains("::");
    if single_identity && (uses.len() >= 2 || uses.iter().any(|u| u.in_array_initializer)) {
        status.error(
            format!(
                "`{}` holds a function identity; inlining it into its uses would create \
                 distinct identities",
                decl.name
            ),
            Some(StatusAnchor::Decl(target)),
        );
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let replacement = parenthesized(&init);
    let mut edits = EditSet::new();
    for use_ref in &uses {
        match ref_edit(program, use_ref, replacement.clone()) {
            Ok(edit) => edits.push(edit),
            Err(reason) => {
                status.error(reason, None);
                return Ok(outcome(status, EditSet::new()));
            }
        }
    }
    edits.push(Edit::delete_decl(program, target));
    debug!(name = %decl.name, uses = uses.len(), "inlined {what}");
    status.info(format!("inlined {} `{}` into {} use(s)", what, decl.name, uses.len()));
    Ok(outcome(status, edits))
}

pub(crate) fn inline_method(
    program: &Program,
    params: &InlineMethod,
    allow_partial: bool,
    cancel: &CancelFlag,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let mut status = RefactoringStatus::new();
    let body = decl.body.as_deref().unwrap_or("").trim();

    // Only single-return bodies inline; anything else needs control-flow
    // surgery the engine does not attempt.
    let expr = match single_expression(body, decl.ty.is_some()) {
        Some(expr) => expr.to_string(),
        None => {
            status.error(
                format!("`{}` is not a single-expression method", decl.name),
                Some(StatusAnchor::Decl(params.method)),
            );
            return Ok(outcome(status, EditSet::new()));
        }
    };
    let state_refs = instance_state_refs(program, params.method);
    let owner = program.enclosing_type(params.method);

    let sites = crate::precondition::sites_bound_to(program, &[params.method]);
    if sites.iter().any(|&s| program.call_site(s).enclosing == params.method) {
        status.error(
            format!("`{}` calls itself and cannot be inlined", decl.name),
            Some(StatusAnchor::Decl(params.method)),
        );
        return Ok(outcome(status, EditSet::new()));
    }
    let mut edits = EditSet::new();
    let mut rejected = 0usize;
    for unit in program.units() {
        if cancel.is_cancelled() {
            return Ok(RefactorOutcome::cancelled());
        }
        for site in program.call_sites_in_unit(unit.id) {
            if !sites.contains(&site.id) {
                continue;
            }
            match inline_at_site(program, site, decl, &expr, &state_refs, owner) {
                Ok(edit) => edits.push(edit),
                Err(reason) => {
                    rejected += 1;
                    if allow_partial {
                        status.warning(
                            format!("call site left unchanged: {reason}"),
                            Some(StatusAnchor::CallSite(site.id)),
                        );
                    } else {
                        status.error(
                            format!("call site cannot be inlined: {reason}"),
                            Some(StatusAnchor::CallSite(site.id)),
                        );
                    }
                }
            }
        }
    }

    // The declaration only disappears once nothing references it.
    if rejected == 0 {
        edits.push(Edit::delete_decl(program, params.method));
    } else if allow_partial {
        status.info(format!(
            "`{}` is kept: {} call site(s) still reference it",
            decl.name, rejected
        ));
    }
    debug!(method = %program.qualified_name(params.method), sites = sites.len(), rejected, "inline method");
    status.info(format!(
        "inlined `{}` into {} call site(s)",
        decl.name,
        sites.len() - rejected
    ));
    Ok(outcome(status, edits))
}

fn inline_at_site(
    program: &Program,
    site: &graft_model::CallSite,
    decl: &graft_model::Declaration,
    expr: &str,
    state_refs: &[String],
    owner: Option<DeclId>,
) -> Result<Edit, String> {
    if site.is_method_ref() {
        return Err("a method reference has no argument list to substitute into".to_string());
    }
    // Substitute arguments for parameters; a side-effecting argument must
    // not fan out into repeated evaluation.
    let mut substituted = expr.to_string();
    for (idx, &p) in decl.params.iter().enumerate() {
        let param = program.decl(p);
        let arg = site
            .args
            .get(idx)
            .ok_or_else(|| format!("call passes no argument for `{}`", param.name))?;
        let occurrences = unqualified_occurrences(&substituted, &param.name).len();
        if occurrences >= 2 && has_side_effects(&arg.text) {
            return Err(format!(
                "argument `{}` has side effects and `{}` is used {} times in the body",
                arg.text, param.name, occurrences
            ));
        }
        let (next, _) = replace_identifier(&substituted, &param.name, &parenthesized(&arg.text));
        substituted = next;
    }

    // Qualify instance state through the call's own receiver.
    let receiver = match (&site.receiver, owner) {
        (graft_model::Receiver::Expr(expr), _) => Some(expr.clone()),
        (graft_model::Receiver::ImplicitThis, Some(owner)) => {
            let site_ty = program.enclosing_type(site.enclosing);
            if site_ty == Some(owner) || site_ty.is_some_and(|t| program.is_subtype_decl(t, owner))
            {
                None
            } else {
                return Err("enclosing instance is unreachable from this call".to_string());
            }
        }
        _ => None,
    };
    if let Some(receiver) = &receiver {
        for name in state_refs {
            let qualified = format!("{receiver}.{name}");
            let (next, _) = replace_identifier(&substituted, name, &qualified);
            substituted = next;
        }
        let (next, _) = replace_identifier(&substituted, "this", receiver);
        substituted = next;
    }

    anchored_edit(program, site, parenthesized(&substituted))
}

/// `return <expr>;` (or a lone statement for void methods) yields the
/// expression; anything longer is not inlinable.
fn single_expression(body: &str, has_return_type: bool) -> Option<&str> {
    let stmt = body.strip_suffix(';')?.trim();
    if stmt.contains('\n') || stmt.contains(';') {
        return None;
    }
    if has_return_type {
        Some(stmt.strip_prefix("return")?.trim())
    } else {
        Some(stmt)
    }
}

/// Wrap compound expressions so substitution never rebinds operators.
fn parenthesized(expr: &str) -> String {
    let simple = expr
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '"');
    let already = expr.starts_with('(') && expr.ends_with(')');
    let call_like = expr.ends_with(')') && !expr.contains(|c: char| "+-*/%<>=&|?".contains(c));
    if simple || already || call_like {
        expr.to_string()
    } else {
        format!("({expr})")
    }
}

fn ref_edit(program: &Program, use_ref: &NameRef, new_text: String) -> Result<Edit, String> {
    let span = program
        .decl(use_ref.enclosing)
        .span
        .ok_or_else(|| "use lies in a declaration with no span".to_string())?;
    if !span.range.contains_range(use_ref.range) {
        return Err("use lies outside its enclosing declaration's span".to_string());
    }
    Ok(Edit::replace(
        use_ref.enclosing,
        TextRange::new(
            use_ref.range.start - span.range.start,
            use_ref.range.end - span.range.start,
        ),
        new_text,
    ))
}
