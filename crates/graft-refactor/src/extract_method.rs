//! Extract Method.
//!
//! Extracts a whole-line statement selection out of a method body into a new
//! sibling method. Parameters are the free variables of the selection
//! (enclosing parameters and locals declared before it); a single local that
//! is declared inside the selection and read after it becomes the return
//! value. Control flow crossing the selection boundary cannot be preserved
//! by a plain call, so `return` / `break` / `continue` inside the selection
//! reject the extraction.

use graft_model::{DeclId, DeclKind, Modifiers, Program, TextRange, Visibility};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, RefactorError, RefactorOutcome};
use crate::precondition::{check_member_collision, validated_name};
use crate::scan::{reindent, unqualified_occurrences};
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::{insert_member, method_text};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractMethod {
    pub method: DeclId,
    /// Whole-line range within the method declaration's own text.
    pub selection: TextRange,
    pub new_name: String,
}

pub(crate) fn perform(
    program: &Program,
    params: &ExtractMethod,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let mut status = RefactoringStatus::new();
    let new_name = match validated_name(&params.new_name, &mut status) {
        Some(name) => name,
        None => return Ok(outcome(status, EditSet::new())),
    };
    let enclosing_ty = match program.enclosing_type(params.method) {
        Some(ty) => ty,
        None => return Err(RefactorError::WrongTargetKind("member method")),
    };

    let text = program.decl_text(params.method).unwrap_or("");
    let span = match decl.span {
        Some(span) => span,
        None => return Err(RefactorError::WrongTargetKind("method with source text")),
    };
    let sel = params.selection;
    if sel.end > text.len() || sel.is_empty() {
        status.error("selection lies outside the method text", Some(StatusAnchor::Decl(params.method)));
        return Ok(outcome(status, EditSet::new()));
    }
    let selection_text = &text[sel.start..sel.end];
    let starts_line = sel.start == 0 || text.as_bytes()[sel.start - 1] == b'\n';
    let ends_line = sel.end == text.len() || text.as_bytes()[sel.end - 1] == b'\n';
    if !starts_line || !ends_line || selection_text.trim().is_empty() {
        status.error(
            "selection must cover whole statement lines",
            Some(StatusAnchor::Decl(params.method)),
        );
        return Ok(outcome(status, EditSet::new()));
    }
    for keyword in ["return", "break", "continue"] {
        if !unqualified_occurrences(selection_text, keyword).is_empty() {
            status.error(
                format!("selection contains `{keyword}`; the jump would cross the extraction boundary"),
                Some(StatusAnchor::Decl(params.method)),
            );
        }
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    // Free variables of the selection, in parameter-then-declaration order.
    let mut new_params: Vec<(String, String)> = Vec::new();
    for &p in &decl.params {
        let param = program.decl(p);
        if !unqualified_occurrences(selection_text, &param.name).is_empty() {
            let ty = param
                .ty
                .as_ref()
                .map(|t| program.display_type(t))
                .unwrap_or_else(|| "Object".to_string());
            new_params.push((ty, param.name.clone()));
        }
    }
    let abs_sel = TextRange::new(span.range.start + sel.start, span.range.start + sel.end);
    let mut result_local: Option<(String, String)> = None;
    let mut locals: Vec<&graft_model::Declaration> = program
        .decls()
        .filter(|d| d.kind == DeclKind::Local && d.enclosing == Some(params.method))
        .collect();
    locals.sort_by_key(|d| d.span.map(|s| s.range.start));
    for local in locals {
        let local_span = match local.span {
            Some(s) => s,
            None => continue,
        };
        let ty = local
            .ty
            .as_ref()
            .map(|t| program.display_type(t))
            .unwrap_or_else(|| "Object".to_string());
        let declared_inside = abs_sel.contains_range(local_span.range);
        let used_inside = !unqualified_occurrences(selection_text, &local.name).is_empty();
        let used_after = !unqualified_occurrences(&text[sel.end..], &local.name).is_empty();
        if declared_inside && used_after {
            if result_local.is_some() {
                status.error(
                    format!(
                        "more than one value flows out of the selection (`{}` and `{}`)",
                        result_local.as_ref().map(|(_, n)| n.as_str()).unwrap_or(""),
                        local.name
                    ),
                    Some(StatusAnchor::Decl(local.id)),
                );
            }
            result_local = Some((ty, local.name.clone()));
        } else if !declared_inside && used_inside {
            new_params.push((ty, local.name.clone()));
        }
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let erased: Vec<graft_model::TypeRef> = free_variable_erasures(program, params.method, &new_params);
    check_member_collision(program, enclosing_ty, &new_name, Some(&erased), &[], &mut status);
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let method_indent: String = text.chars().take_while(|c| *c == ' ').collect();
    let body_indent = format!("{method_indent}    ");
    let mut new_body = reindent(selection_text, &body_indent, "");
    if !new_body.ends_with('\n') {
        new_body.push('\n');
    }
    let ret_ty = result_local
        .as_ref()
        .and_then(|(_, name)| local_type(program, params.method, name));
    if let Some((_, name)) = &result_local {
        new_body.push_str(&format!("return {name};"));
    }

    let arg_names: Vec<&str> = new_params.iter().map(|(_, n)| n.as_str()).collect();
    let call = format!("{}({})", new_name, arg_names.join(", "));
    let call_stmt = match &result_local {
        Some((ty, name)) => format!("{body_indent}{ty} {name} = {call};\n"),
        None => format!("{body_indent}{call};\n"),
    };

    let modifiers = Modifiers {
        visibility: Visibility::Private,
        is_static: decl.is_static(),
        is_abstract: false,
        is_final: false,
    };
    let new_method = method_text(
        program,
        &method_indent,
        &modifiers,
        ret_ty.as_ref(),
        &new_name,
        &new_params,
        false,
        Some(new_body.trim_end_matches('\n')),
    );
    debug!(
        method = %program.qualified_name(params.method),
        name = %new_name,
        params = new_params.len(),
        returns = result_local.is_some(),
        "extracting method"
    );

    let mut edits = EditSet::new();
    edits.push(Edit::replace(params.method, sel, call_stmt));
    edits.push(insert_member(program, enclosing_ty, &new_method));
    status.info(format!(
        "extracted {} line(s) into `{}`",
        selection_text.lines().count(),
        new_name
    ));
    Ok(outcome(status, edits))
}

/// Erased types of the chosen parameters, recovered from the declarations
/// the names came from.
fn free_variable_erasures(
    program: &Program,
    method: DeclId,
    params: &[(String, String)],
) -> Vec<graft_model::TypeRef> {
    params
        .iter()
        .map(|(_, name)| {
            program
                .decls()
                .find(|d| {
                    matches!(d.kind, DeclKind::Parameter | DeclKind::Local)
                        && d.name == *name
                        && (d.enclosing == Some(method)
                            || program.decl(method).params.contains(&d.id))
                })
                .and_then(|d| d.ty.as_ref().map(graft_model::TypeRef::erasure))
                .unwrap_or(graft_model::TypeRef::Unresolved("java.lang.Object".to_string()))
        })
        .collect()
}

/// The declared type of the out-flowing local, found by name among the
/// method's locals.
fn local_type(program: &Program, method: DeclId, name: &str) -> Option<graft_model::TypeRef> {
    program
        .decls()
        .find(|d| d.kind == DeclKind::Local && d.enclosing == Some(method) && d.name == name)
        .and_then(|d| d.ty.clone())
}
