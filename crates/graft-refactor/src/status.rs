use graft_model::{CallSiteId, DeclId};
use serde::{Deserialize, Serialize};

/// Severity of a status entry. The highest severity observed gates whether
/// edits are produced at all.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// Where a status entry points, when it points anywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusAnchor {
    Decl(DeclId),
    CallSite(CallSiteId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub severity: Severity,
    pub message: String,
    pub anchor: Option<StatusAnchor>,
}

/// Ordered, accumulated validation result of one refactoring request.
///
/// Entries accumulate in the order checks run; nothing is short-circuited
/// except fatal conditions, which the owning refactoring surfaces by
/// returning early with the status collected so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactoringStatus {
    pub entries: Vec<StatusEntry>,
}

impl RefactoringStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>, anchor: Option<StatusAnchor>) {
        self.entries.push(StatusEntry {
            severity,
            message: message.into(),
            anchor,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message, None);
    }

    pub fn warning(&mut self, message: impl Into<String>, anchor: Option<StatusAnchor>) {
        self.push(Severity::Warning, message, anchor);
    }

    pub fn error(&mut self, message: impl Into<String>, anchor: Option<StatusAnchor>) {
        self.push(Severity::Error, message, anchor);
    }

    pub fn fatal(&mut self, message: impl Into<String>, anchor: Option<StatusAnchor>) {
        self.push(Severity::Fatal, message, anchor);
    }

    pub fn merge(&mut self, other: RefactoringStatus) {
        self.entries.extend(other.entries);
    }

    /// Highest severity observed, or `None` when the status is clean.
    pub fn severity(&self) -> Option<Severity> {
        self.entries.iter().map(|e| e.severity).max()
    }

    pub fn has_fatal(&self) -> bool {
        self.severity() == Some(Severity::Fatal)
    }

    /// Whether edits may be produced: no error or fatal entry present.
    pub fn allows_edits(&self) -> bool {
        self.severity().map_or(true, |s| s < Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn severity_is_the_maximum_of_all_entries() {
        let mut status = RefactoringStatus::new();
        assert_eq!(status.severity(), None);
        status.info("found 3 call sites");
        status.warning("1 call site could not be updated", None);
        assert_eq!(status.severity(), Some(Severity::Warning));
        assert!(status.allows_edits());
        status.error("name collision", None);
        assert!(!status.allows_edits());
        assert!(!status.has_fatal());
        status.fatal("capture is unreachable", None);
        assert!(status.has_fatal());
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut status = RefactoringStatus::new();
        status.error("first", None);
        status.info("second");
        let messages: Vec<&str> = status.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
