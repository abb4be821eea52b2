//! Request dispatch.
//!
//! One request reads one immutable snapshot and produces one outcome. The
//! pipeline per kind is linear: validate, compute the structural delta,
//! rewrite call sites, synthesize edits; no stage is re-entered. Hosts
//! serialize requests against the same project state themselves, rebuilding
//! the snapshot after every applied edit set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use graft_model::Program;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::change_signature::ChangeSignature;
use crate::edit::{EditError, EditSet};
use crate::extract_method::ExtractMethod;
use crate::indirection::IntroduceIndirection;
use crate::inline::{InlineConstant, InlineMethod, InlineTemp};
use crate::make_static::MakeStatic;
use crate::move_method::MoveInstanceMethod;
use crate::parameter_object::IntroduceParameterObject;
use crate::pull_up::{PullUp, PushDown};
use crate::status::RefactoringStatus;

/// Shared cooperative-cancellation flag. Long enumerations check it between
/// compilation units; a cancelled request produces no edits, never partial
/// ones.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("target declaration is not a {0}")]
    WrongTargetKind(&'static str),
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// The serializable sum of all catalog parameter structs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    MoveInstanceMethod(MoveInstanceMethod),
    ChangeSignature(ChangeSignature),
    ExtractMethod(ExtractMethod),
    PullUp(PullUp),
    PushDown(PushDown),
    IntroduceIndirection(IntroduceIndirection),
    InlineConstant(InlineConstant),
    InlineTemp(InlineTemp),
    InlineMethod(InlineMethod),
    IntroduceParameterObject(IntroduceParameterObject),
    MakeStatic(MakeStatic),
}

impl RequestKind {
    fn name(&self) -> &'static str {
        match self {
            RequestKind::MoveInstanceMethod(_) => "move_instance_method",
            RequestKind::ChangeSignature(_) => "change_signature",
            RequestKind::ExtractMethod(_) => "extract_method",
            RequestKind::PullUp(_) => "pull_up",
            RequestKind::PushDown(_) => "push_down",
            RequestKind::IntroduceIndirection(_) => "introduce_indirection",
            RequestKind::InlineConstant(_) => "inline_constant",
            RequestKind::InlineTemp(_) => "inline_temp",
            RequestKind::InlineMethod(_) => "inline_method",
            RequestKind::IntroduceParameterObject(_) => "introduce_parameter_object",
            RequestKind::MakeStatic(_) => "make_static",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RefactorRequest {
    #[serde(flatten)]
    pub kind: RequestKind,
    /// When set, unrewritable call sites degrade to warnings instead of
    /// aborting the whole request.
    #[serde(default)]
    pub allow_partial: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RefactorOutcome {
    pub status: RefactoringStatus,
    pub edits: EditSet,
    pub cancelled: bool,
}

impl RefactorOutcome {
    pub(crate) fn cancelled() -> Self {
        let mut status = RefactoringStatus::new();
        status.info("request cancelled; no edits produced");
        Self {
            status,
            edits: EditSet::new(),
            cancelled: true,
        }
    }
}

/// Run one refactoring request against one snapshot.
pub fn perform(
    program: &Program,
    request: &RefactorRequest,
    cancel: &CancelFlag,
) -> Result<RefactorOutcome, RefactorError> {
    debug!(kind = request.kind.name(), allow_partial = request.allow_partial, "refactoring requested");
    let allow_partial = request.allow_partial;
    let mut outcome = match &request.kind {
        RequestKind::MoveInstanceMethod(params) => {
            crate::move_method::perform(program, params, allow_partial, cancel)?
        }
        RequestKind::ChangeSignature(params) => {
            crate::change_signature::perform(program, params, allow_partial, cancel)?
        }
        RequestKind::ExtractMethod(params) => crate::extract_method::perform(program, params)?,
        RequestKind::PullUp(params) => crate::pull_up::pull_up(program, params)?,
        RequestKind::PushDown(params) => crate::pull_up::push_down(program, params)?,
        RequestKind::IntroduceIndirection(params) => {
            crate::indirection::perform(program, params)?
        }
        RequestKind::InlineConstant(params) => crate::inline::inline_constant(program, params)?,
        RequestKind::InlineTemp(params) => crate::inline::inline_temp(program, params)?,
        RequestKind::InlineMethod(params) => {
            crate::inline::inline_method(program, params, allow_partial, cancel)?
        }
        RequestKind::IntroduceParameterObject(params) => {
            crate::parameter_object::perform(program, params, allow_partial, cancel)?
        }
        RequestKind::MakeStatic(params) => {
            crate::make_static::perform(program, params, allow_partial, cancel)?
        }
    };

    if outcome.cancelled || !outcome.status.allows_edits() {
        outcome.edits = EditSet::new();
    } else {
        outcome.edits.normalize(program)?;
    }
    debug!(
        entries = outcome.status.entries.len(),
        edits = outcome.edits.len(),
        cancelled = outcome.cancelled,
        "refactoring finished"
    );
    Ok(outcome)
}

/// Assemble an outcome from accumulated status and edits, dropping edits
/// whenever the status forbids them.
pub(crate) fn outcome(status: RefactoringStatus, edits: EditSet) -> RefactorOutcome {
    let edits = if status.allows_edits() { edits } else { EditSet::new() };
    RefactorOutcome {
        status,
        edits,
        cancelled: false,
    }
}
