//! Call-site rewriting.
//!
//! A refactoring expresses how a declaration's contract changes as a
//! [`RewritePlan`]; this module enumerates every bound call site (through the
//! override chain when the change is chain-wide) and produces per site either
//! a replacement expression or a rejection reason. Enumeration walks
//! compilation units in snapshot order and checks the cancellation flag
//! between units, so output order is stable and cancellation never surfaces a
//! partial edit set.

use graft_model::{
    CallKind, CallSite, CallSiteId, DeclId, Program, Receiver, TextRange,
};
use tracing::debug;

use crate::edit::Edit;
use crate::engine::CancelFlag;

/// How the receiver convention of the rewritten declaration changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReceiverChange {
    Unchanged,
    /// The argument at `param_index` of the old signature becomes the new
    /// receiver expression (move to a parameter's type).
    ToArgument { param_index: usize },
    /// The old receiver's field becomes the new receiver (move to a field's
    /// type). An implicit `this` receiver renders as the bare field name.
    ToReceiverField { field_name: String },
    /// The call becomes a static invocation qualified by `type_name`.
    ToStatic { type_name: String },
}

/// Where each argument of the rewritten invocation comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ArgSource {
    /// The old argument at this index, unchanged.
    Existing(usize),
    /// Every old argument from this index on, in order: the tail of a
    /// variable-arity call, whether packed loose or passed as one array.
    ExistingRest(usize),
    /// The old receiver expression (implicit `this` renders as `this`).
    Receiver,
    /// A fixed expression, e.g. the fill value of an added parameter.
    Literal(String),
    /// A carrier constructor wrapping a group of old arguments in field
    /// order. Argument evaluation order is preserved left to right.
    Carrier { class: String, parts: Vec<ArgSource> },
}

/// The structural delta one catalog entry hands to the rewriter.
#[derive(Clone, Debug)]
pub(crate) struct RewritePlan {
    /// Declarations whose call sites are rewritten; every member of an
    /// override chain when the change is chain-wide.
    pub chain: Vec<DeclId>,
    pub new_name: Option<String>,
    pub receiver: ReceiverChange,
    /// New argument list; `None` leaves arguments untouched.
    pub args: Option<Vec<ArgSource>>,
}

/// One rewritten call site, or the reason it could not be rewritten.
#[derive(Clone, Debug)]
pub(crate) struct SiteRewrite {
    pub site: CallSiteId,
    pub result: Result<Edit, String>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub rewrites: Vec<SiteRewrite>,
    pub cancelled: bool,
}

impl RewriteOutcome {
    pub fn edits(&self) -> impl Iterator<Item = &Edit> {
        self.rewrites.iter().filter_map(|r| r.result.as_ref().ok())
    }

    pub fn rejections(&self) -> impl Iterator<Item = (CallSiteId, &str)> {
        self.rewrites
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.site, e.as_str())))
    }
}

/// Rewrite every call site bound into `plan.chain`.
pub(crate) fn rewrite_sites(
    program: &Program,
    sites: &[CallSiteId],
    plan: &RewritePlan,
    cancel: &CancelFlag,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();
    for unit in program.units() {
        if cancel.is_cancelled() {
            debug!(unit = %unit.path, "call-site rewrite cancelled");
            return RewriteOutcome {
                rewrites: Vec::new(),
                cancelled: true,
            };
        }
        for site in program.call_sites_in_unit(unit.id) {
            if !sites.contains(&site.id) {
                continue;
            }
            outcome.rewrites.push(SiteRewrite {
                site: site.id,
                result: rewrite_one(program, site, plan),
            });
        }
    }
    debug!(
        rewritten = outcome.edits().count(),
        rejected = outcome.rejections().count(),
        "call sites rewritten"
    );
    outcome
}

fn rewrite_one(program: &Program, site: &CallSite, plan: &RewritePlan) -> Result<Edit, String> {
    let new_text = rewrite_call_text(program, site, plan)?;
    anchored_edit(program, site, new_text)
}

/// The replacement expression for one call site, without anchoring.
///
/// Sites enclosed in a declaration the refactoring redeclares wholesale
/// cannot carry their own edit (it would overlap the redeclaration); their
/// replacement text is substituted into the redeclared body instead.
pub(crate) fn rewrite_call_text(
    program: &Program,
    site: &CallSite,
    plan: &RewritePlan,
) -> Result<String, String> {
    let binding = graft_model::resolve::resolve_call(program, site)
        .map_err(|err| format!("call no longer resolves: {err}"))?;
    let name = plan
        .new_name
        .clone()
        .unwrap_or_else(|| program.decl(binding.decl).name.clone());

    if site.is_method_ref() {
        return method_ref_text(site, plan, &name);
    }

    let receiver_text = match &plan.receiver {
        ReceiverChange::Unchanged => match &site.receiver {
            Receiver::Expr(expr) => Some(expr.clone()),
            Receiver::ImplicitThis | Receiver::None => None,
        },
        ReceiverChange::ToArgument { param_index } => {
            let arg = site
                .args
                .get(*param_index)
                .ok_or_else(|| format!("call passes no argument for parameter {param_index}"))?;
            Some(arg.text.clone())
        }
        ReceiverChange::ToReceiverField { field_name } => match &site.receiver {
            Receiver::Expr(expr) => Some(format!("{expr}.{field_name}")),
            Receiver::ImplicitThis => Some(field_name.clone()),
            Receiver::None => return Err("static call has no receiver field".to_string()),
        },
        ReceiverChange::ToStatic { type_name } => Some(type_name.clone()),
    };

    let args_text = match &plan.args {
        None => site
            .args
            .iter()
            .map(|a| a.text.clone())
            .collect::<Vec<_>>(),
        Some(sources) => {
            let mut out = Vec::with_capacity(sources.len());
            for source in sources {
                // A packed varargs tail flattens into however many arguments
                // the site actually passes.
                if let ArgSource::ExistingRest(from) = source {
                    out.extend(site.args.iter().skip(*from).map(|a| a.text.clone()));
                } else {
                    out.push(render_arg(program, site, source)?);
                }
            }
            out
        }
    };

    Ok(match receiver_text {
        Some(receiver) => format!("{}.{}({})", receiver, name, args_text.join(", ")),
        None => format!("{}({})", name, args_text.join(", ")),
    })
}

fn method_ref_text(site: &CallSite, plan: &RewritePlan, name: &str) -> Result<String, String> {
    match (&plan.receiver, site.kind) {
        (ReceiverChange::Unchanged, _) => {
            let qualifier = match &site.receiver {
                Receiver::Expr(expr) => expr.clone(),
                Receiver::ImplicitThis => "this".to_string(),
                Receiver::None => return Err("method reference has no qualifier".to_string()),
            };
            Ok(format!("{qualifier}::{name}"))
        }
        (ReceiverChange::ToStatic { type_name }, _) => Ok(format!("{type_name}::{name}")),
        (ReceiverChange::ToReceiverField { field_name }, CallKind::BoundMethodRef) => {
            match &site.receiver {
                Receiver::Expr(expr) => Ok(format!("{expr}.{field_name}::{name}")),
                Receiver::ImplicitThis => Ok(format!("{field_name}::{name}")),
                Receiver::None => Err("method reference has no qualifier".to_string()),
            }
        }
        // A move rewires the receiver parameter; an unbound reference has no
        // written receiver to rewire.
        (ReceiverChange::ToReceiverField { .. }, _) => Err(
            "unbound method reference cannot be rewritten when the receiver parameter moves"
                .to_string(),
        ),
        (ReceiverChange::ToArgument { .. }, CallKind::UnboundMethodRef) => Err(
            "unbound method reference cannot be rewritten when the receiver parameter moves"
                .to_string(),
        ),
        (ReceiverChange::ToArgument { .. }, _) => Err(
            "bound method reference cannot swap its receiver for an argument".to_string(),
        ),
    }
}

fn render_arg(program: &Program, site: &CallSite, source: &ArgSource) -> Result<String, String> {
    match source {
        ArgSource::Existing(index) => site
            .args
            .get(*index)
            .map(|a| a.text.clone())
            .ok_or_else(|| format!("call passes no argument at position {index}")),
        ArgSource::ExistingRest(from) => Ok(site
            .args
            .iter()
            .skip(*from)
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join(", ")),
        ArgSource::Receiver => old_receiver_text(program, site),
        ArgSource::Literal(text) => Ok(text.clone()),
        ArgSource::Carrier { class, parts } => {
            let mut rendered = Vec::with_capacity(parts.len());
            for part in parts {
                rendered.push(render_arg(program, site, part)?);
            }
            Ok(format!("new {}({})", class, rendered.join(", ")))
        }
    }
}

/// The old receiver as an expression usable in argument position.
///
/// Inside a nested class the implicit receiver is the enclosing instance;
/// reaching it needs the call's written qualifier or a modeled capture
/// handle. Without either the site is unrewritable.
fn old_receiver_text(program: &Program, site: &CallSite) -> Result<String, String> {
    match &site.receiver {
        Receiver::Expr(expr) => Ok(expr.clone()),
        Receiver::None => Err("static call has no receiver to forward".to_string()),
        Receiver::ImplicitThis => {
            if let Some(qualifier) = &site.outer_qualifier {
                return Ok(qualifier.clone());
            }
            let site_ty = program
                .enclosing_type(site.enclosing)
                .ok_or_else(|| "call has no enclosing type".to_string())?;
            if let Ok(binding) = graft_model::resolve::resolve_call(program, site) {
                if let Some(owner) = program.enclosing_type(binding.decl) {
                    if site_ty != owner && !program.is_subtype_decl(site_ty, owner) {
                        // Enclosing-instance dispatch from a nested scope.
                        return match program.capture_handle(site_ty, owner) {
                            Some(edge) => edge.handle.clone().ok_or_else(|| {
                                "enclosing instance is unreachable from this nested scope"
                                    .to_string()
                            }),
                            None => Err(
                                "enclosing instance is unreachable from this nested scope"
                                    .to_string(),
                            ),
                        };
                    }
                }
            }
            Ok("this".to_string())
        }
    }
}

/// Substitute the rewritten text of `member`'s own bound call sites into its
/// body, for declarations the refactoring re-renders wholesale.
///
/// Duplicate call texts inside one body rewrite to identical replacements, so
/// first-occurrence substitution in source order is exact.
pub(crate) fn apply_inner_rewrites(
    program: &Program,
    member: DeclId,
    sites: &[CallSiteId],
    plan: &RewritePlan,
    body: String,
) -> Result<String, String> {
    let mut out = body;
    // Sites arrive in source order; searching forward from the previous
    // substitution keeps each one matched to its own occurrence.
    let mut search_from = 0usize;
    for &site_id in sites {
        let site = program.call_site(site_id);
        if site.enclosing != member {
            continue;
        }
        let old = program.slice(site.unit, site.range);
        let new = rewrite_call_text(program, site, plan)?;
        match out[search_from..].find(old) {
            Some(rel) => {
                let at = search_from + rel;
                out.replace_range(at..at + old.len(), &new);
                search_from = at + new.len();
            }
            None => return Err(format!("call text `{old}` not found in the declaration body")),
        }
    }
    Ok(out)
}

/// Anchor the replacement to the call's enclosing declaration.
pub(crate) fn anchored_edit(
    program: &Program,
    site: &CallSite,
    new_text: String,
) -> Result<Edit, String> {
    let span = program
        .decl(site.enclosing)
        .span
        .ok_or_else(|| "enclosing declaration has no span".to_string())?;
    if !span.range.contains_range(site.range) {
        return Err("call lies outside its enclosing declaration's span".to_string());
    }
    Ok(Edit::replace(
        site.enclosing,
        TextRange::new(
            site.range.start - span.range.start,
            site.range.end - span.range.start,
        ),
        new_text,
    ))
}
