//! Semantics-aware refactorings over a bound program snapshot.
//!
//! The engine reads an immutable [`graft_model::Program`], checks the
//! preconditions of the requested catalog entry, and produces a
//! [`RefactorOutcome`]: a [`RefactoringStatus`] describing what was checked
//! and an [`EditSet`] of declaration-anchored text edits. Nothing here
//! touches the snapshot; applying edits and rebuilding the snapshot is the
//! host's job.
//!
//! The catalog today:
//! - Move Instance Method (`MoveInstanceMethod`)
//! - Change Method Signature (`ChangeSignature`)
//! - Extract Method (`ExtractMethod`)
//! - Pull Up / Push Down (`PullUp`, `PushDown`)
//! - Introduce Indirection (`IntroduceIndirection`)
//! - Inline Constant / Temp / Method (`InlineConstant`, `InlineTemp`, `InlineMethod`)
//! - Introduce Parameter Object (`IntroduceParameterObject`)
//! - Make Static (`MakeStatic`)

mod change_signature;
mod edit;
mod engine;
mod expr;
mod extract_method;
mod ident;
mod indirection;
mod inline;
mod make_static;
mod move_method;
mod parameter_object;
mod precondition;
mod preview;
mod pull_up;
mod rewrite;
mod scan;
mod status;
mod synth;

pub use change_signature::{ChangeSignature, ParameterSpec};
pub use edit::{Edit, EditError, EditSet};
pub use engine::{perform, CancelFlag, RefactorError, RefactorOutcome, RefactorRequest, RequestKind};
pub use extract_method::ExtractMethod;
pub use ident::{validate_identifier, IdentifierError};
pub use indirection::IntroduceIndirection;
pub use inline::{InlineConstant, InlineMethod, InlineTemp};
pub use make_static::MakeStatic;
pub use move_method::{MoveInstanceMethod, MoveTarget};
pub use parameter_object::IntroduceParameterObject;
pub use preview::{generate_preview, RefactoringPreview, UnitPreview};
pub use pull_up::{PullUp, PushDown};
pub use status::{RefactoringStatus, Severity, StatusAnchor, StatusEntry};
