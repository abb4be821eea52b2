//! Introduce Parameter Object.
//!
//! Bundles a group of parameters into a synthesized carrier class and
//! rewrites the signature, its override chain, and every bound call site to
//! construct and pass the carrier. Carrier fields follow the declared
//! parameter order, and argument expressions keep their left-to-right
//! evaluation order inside the constructor call. Recursive self-calls are
//! ordinary bound sites and are rewritten like any other.

use graft_model::{DeclId, DeclKind, OverrideIndex, Program, TypeRef};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, CancelFlag, RefactorError, RefactorOutcome};
use crate::precondition::{chain_of, check_member_collision, sites_bound_to, top_level_of, validated_name};
use crate::rewrite::{apply_inner_rewrites, rewrite_sites, ArgSource, ReceiverChange, RewritePlan};
use crate::scan::replace_identifier;
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::{append_sibling, method_text};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntroduceParameterObject {
    pub method: DeclId,
    /// Name of the synthesized carrier class.
    pub class_name: String,
    /// Name of the carrier parameter; defaults to the class name with its
    /// first letter lowered.
    #[serde(default)]
    pub parameter_name: Option<String>,
    /// Indices of the parameters to bundle; `None` bundles all of them.
    #[serde(default)]
    pub parameters: Option<Vec<usize>>,
}

pub(crate) fn perform(
    program: &Program,
    params: &IntroduceParameterObject,
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
    let class_name = match validated_name(&params.class_name, &mut status) {
        Some(name) => name,
        None => return Ok(outcome(status, EditSet::new())),
    };
    let obj_name = match &params.parameter_name {
        Some(name) => match validated_name(name, &mut status) {
            Some(name) => name,
            None => return Ok(outcome(status, EditSet::new())),
        },
        None => lower_first(&class_name),
    };

    // Grouped indices in declared order, whatever order the host listed.
    let mut grouped: Vec<usize> = match &params.parameters {
        Some(indices) => indices.clone(),
        None => (0..decl.params.len()).collect(),
    };
    grouped.sort_unstable();
    let before = grouped.len();
    grouped.dedup();
    if grouped.len() != before {
        status.error(
            "a parameter is listed twice in the group",
            Some(StatusAnchor::Decl(params.method)),
        );
    }
    if grouped.is_empty() {
        status.error("the group is empty", Some(StatusAnchor::Decl(params.method)));
    }
    for &index in &grouped {
        if index >= decl.params.len() {
            status.error(
                format!("`{}` has no parameter at position {index}", decl.name),
                Some(StatusAnchor::Decl(params.method)),
            );
        }
    }
    if decl.is_varargs && grouped.contains(&(decl.params.len().saturating_sub(1))) {
        status.error(
            format!(
                "the variable-arity parameter of `{}` cannot join the group",
                decl.name
            ),
            Some(StatusAnchor::Decl(params.method)),
        );
    }
    if program.decls().any(|d| d.is_type() && d.name == class_name) {
        status.error(
            format!("a type named `{class_name}` already exists"),
            Some(StatusAnchor::Decl(owner)),
        );
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    let overrides = OverrideIndex::compute(program);
    let chain = chain_of(program, &overrides, params.method, &mut status);
    let sites = sites_bound_to(program, &chain);

    let insert_at = grouped[0];
    let carrier_ty = TypeRef::Unresolved(class_name.clone());
    let new_erased: Vec<TypeRef> = decl
        .params
        .iter()
        .enumerate()
        .filter_map(|(idx, &p)| {
            if idx == insert_at {
                Some(carrier_ty.erasure())
            } else if grouped.contains(&idx) {
                None
            } else {
                program
                    .decl(p)
                    .ty
                    .as_ref()
                    .map(TypeRef::erasure)
                    .or(Some(TypeRef::Unresolved("java.lang.Object".to_string())))
            }
        })
        .collect();
    for &member in &chain {
        if let Some(member_owner) = program.enclosing_type(member) {
            check_member_collision(
                program,
                member_owner,
                &decl.name,
                Some(&new_erased),
                &chain,
                &mut status,
            );
        }
    }
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    // Carrier fields use the requested method's parameter names and types.
    let fields: Vec<(String, String)> = grouped
        .iter()
        .map(|&idx| {
            let param = program.decl(decl.params[idx]);
            let ty = param
                .ty
                .as_ref()
                .map(|t| program.display_type(t))
                .unwrap_or_else(|| "Object".to_string());
            (ty, param.name.clone())
        })
        .collect();
    let carrier = carrier_class_text(&class_name, &fields);

    let new_varargs =
        decl.is_varargs && !grouped.contains(&(decl.params.len().saturating_sub(1)));

    let mut arg_sources: Vec<ArgSource> = Vec::new();
    for (idx, _) in decl.params.iter().enumerate() {
        if idx == insert_at {
            arg_sources.push(ArgSource::Carrier {
                class: class_name.clone(),
                parts: grouped.iter().map(|&g| ArgSource::Existing(g)).collect(),
            });
        } else if grouped.contains(&idx) {
            continue;
        } else if new_varargs && idx + 1 == decl.params.len() {
            arg_sources.push(ArgSource::ExistingRest(idx));
        } else {
            arg_sources.push(ArgSource::Existing(idx));
        }
    }
    let plan = RewritePlan {
        chain: chain.clone(),
        new_name: None,
        receiver: ReceiverChange::Unchanged,
        args: Some(arg_sources),
    };

    // Recursive self-calls live inside bodies that are re-rendered whole;
    // their rewrites are substituted into the body text instead of anchored.
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
                        format!(
                            "call inside `{}` cannot be rewritten: {reason}",
                            program.qualified_name(member)
                        ),
                        Some(StatusAnchor::Decl(member)),
                    );
                    return Ok(outcome(status, EditSet::new()));
                }
            },
            None => None,
        };
        edits.push(redeclare(
            program, member, &grouped, insert_at, &class_name, &obj_name, new_varargs, body,
        ));
    }
    edits.push(append_sibling(program, top_level_of(program, owner), &carrier));

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
        class = %class_name,
        fields = fields.len(),
        sites = sites.len(),
        "introduced parameter object"
    );
    status.info(format!(
        "bundled {} parameter(s) of `{}` into `{}` across {} call site(s)",
        grouped.len(),
        program.qualified_name(params.method),
        class_name,
        sites.len()
    ));
    Ok(outcome(status, edits))
}

/// Re-render one chain member with the carrier parameter, qualifying grouped
/// parameter uses in its body through the carrier's fields.
#[allow(clippy::too_many_arguments)]
fn redeclare(
    program: &Program,
    member: DeclId,
    grouped: &[usize],
    insert_at: usize,
    class_name: &str,
    obj_name: &str,
    new_varargs: bool,
    body: Option<String>,
) -> Edit {
    let decl = program.decl(member);
    let mut new_params: Vec<(String, String)> = Vec::new();
    let mut body = body;
    for (idx, &p) in decl.params.iter().enumerate() {
        if idx == insert_at {
            new_params.push((class_name.to_string(), obj_name.to_string()));
        }
        if grouped.contains(&idx) {
            // Each chain member qualifies its own parameter names.
            let param = program.decl(p);
            if let Some(text) = body.take() {
                let field = format!("{obj_name}.{}", param.name);
                body = Some(replace_identifier(&text, &param.name, &field).0);
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
    }
    let old_text = program.decl_text(member).unwrap_or("");
    let indent: String = old_text.chars().take_while(|c| *c == ' ').collect();
    let rendered = method_text(
        program,
        &indent,
        &decl.modifiers,
        decl.ty.as_ref(),
        &decl.name,
        &new_params,
        new_varargs,
        body.as_deref(),
    );
    Edit::replace_decl(program, member, rendered)
}

/// Immutable carrier: public final fields in declared parameter order and a
/// constructor assigning them in the same order.
fn carrier_class_text(class_name: &str, fields: &[(String, String)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("public final class {class_name} {{\n"));
    for (ty, name) in fields {
        out.push_str(&format!("    public final {ty} {name};\n"));
    }
    out.push('\n');
    let ctor_params: Vec<String> = fields
        .iter()
        .map(|(ty, name)| format!("{ty} {name}"))
        .collect();
    out.push_str(&format!(
        "    public {class_name}({}) {{\n",
        ctor_params.join(", ")
    ));
    for (_, name) in fields {
        out.push_str(&format!("        this.{name} = {name};\n"));
    }
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn carrier_fields_follow_declared_parameter_order() {
        let text = carrier_class_text(
            "Range",
            &[
                ("int".to_string(), "start".to_string()),
                ("int".to_string(), "end".to_string()),
            ],
        );
        assert_eq!(
            text,
            "public final class Range {\n\
             \x20   public final int start;\n\
             \x20   public final int end;\n\
             \n\
             \x20   public Range(int start, int end) {\n\
             \x20       this.start = start;\n\
             \x20       this.end = end;\n\
             \x20   }\n\
             }\n"
        );
    }
}
