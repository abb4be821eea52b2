//! Declaration-anchored source edits.
//!
//! Every edit names the declaration it modifies and a range relative to that
//! declaration's span, never a raw file offset. Anchoring keeps edit sets
//! valid across snapshots whose units share declaration identity, and makes
//! two independently produced edit sets comparable.

use std::collections::BTreeMap;

use graft_model::{DeclId, Program, TextRange, UnitId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("declaration {0:?} has no source span to anchor an edit to")]
    MissingSpan(DeclId),
    #[error("edit range {range:?} exceeds the span of declaration {anchor:?}")]
    RangeOutOfBounds { anchor: DeclId, range: TextRange },
    #[error("conflicting edits overlap in `{path}`")]
    Overlap { path: String },
}

/// One replacement, relative to the anchor declaration's span. Insertions
/// carry an empty range; deletions carry empty `new_text`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub anchor: DeclId,
    pub range: TextRange,
    pub new_text: String,
}

impl Edit {
    pub fn replace(anchor: DeclId, range: TextRange, new_text: impl Into<String>) -> Self {
        Self {
            anchor,
            range,
            new_text: new_text.into(),
        }
    }

    pub fn insert(anchor: DeclId, offset: usize, new_text: impl Into<String>) -> Self {
        Self::replace(anchor, TextRange::new(offset, offset), new_text)
    }

    pub fn delete(anchor: DeclId, range: TextRange) -> Self {
        Self::replace(anchor, range, "")
    }

    /// Replace the anchor declaration's entire text.
    pub fn replace_decl(program: &Program, anchor: DeclId, new_text: impl Into<String>) -> Self {
        let len = program.decl_text(anchor).map_or(0, str::len);
        Self::replace(anchor, TextRange::new(0, len), new_text)
    }

    /// Delete the anchor declaration's entire text.
    pub fn delete_decl(program: &Program, anchor: DeclId) -> Self {
        Self::replace_decl(program, anchor, "")
    }
}

/// An edit resolved to absolute unit coordinates, ready to apply.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolvedEdit {
    unit: UnitId,
    range: TextRange,
    new_text: String,
}

/// The ordered collection of edits produced by one refactoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSet {
    pub edits: Vec<Edit>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn merge(&mut self, other: EditSet) {
        self.edits.extend(other.edits);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Sort edits into the deterministic application order (unit, then
    /// position, then anchor), drop exact duplicates, and reject overlaps.
    ///
    /// An insertion at a range boundary does not overlap the neighbouring
    /// replacement; two insertions at the same offset are kept in their
    /// synthesis order.
    pub fn normalize(&mut self, program: &Program) -> Result<(), EditError> {
        let mut keyed: Vec<(ResolvedEdit, usize, Edit)> = Vec::with_capacity(self.edits.len());
        for (idx, edit) in self.edits.iter().enumerate() {
            keyed.push((resolve(program, edit)?, idx, edit.clone()));
        }
        keyed.sort_by(|(a, ai, _), (b, bi, _)| {
            (a.unit, a.range.start, a.range.end, ai).cmp(&(b.unit, b.range.start, b.range.end, bi))
        });
        keyed.dedup_by(|(a, _, ae), (b, _, be)| a == b && ae.anchor == be.anchor);

        for pair in keyed.windows(2) {
            let (prev, _, _) = &pair[0];
            let (next, _, _) = &pair[1];
            if prev.unit == next.unit
                && prev.range.end > next.range.start
                && !prev.range.is_empty()
                && !next.range.is_empty()
            {
                return Err(EditError::Overlap {
                    path: program.unit(prev.unit).path.clone(),
                });
            }
        }

        self.edits = keyed.into_iter().map(|(_, _, e)| e).collect();
        Ok(())
    }

    /// Apply the edit set to the snapshot's units, returning the new text of
    /// every changed unit keyed by path. The set is normalized first.
    pub fn apply(mut self, program: &Program) -> Result<BTreeMap<String, String>, EditError> {
        self.normalize(program)?;
        let mut resolved: Vec<ResolvedEdit> = self
            .edits
            .iter()
            .map(|e| resolve(program, e))
            .collect::<Result<_, _>>()?;
        // Apply back to front so earlier offsets stay valid.
        resolved.sort_by(|a, b| {
            (b.unit, b.range.start, b.range.end).cmp(&(a.unit, a.range.start, a.range.end))
        });

        let mut out = BTreeMap::new();
        for edit in resolved {
            let unit = program.unit(edit.unit);
            let text = out
                .entry(unit.path.clone())
                .or_insert_with(|| unit.text.clone());
            text.replace_range(edit.range.start..edit.range.end, &edit.new_text);
        }
        Ok(out)
    }
}

fn resolve(program: &Program, edit: &Edit) -> Result<ResolvedEdit, EditError> {
    let span = program
        .decl(edit.anchor)
        .span
        .ok_or(EditError::MissingSpan(edit.anchor))?;
    if edit.range.end > span.range.len() {
        return Err(EditError::RangeOutOfBounds {
            anchor: edit.anchor,
            range: edit.range,
        });
    }
    Ok(ResolvedEdit {
        unit: span.unit,
        range: TextRange::new(
            span.range.start + edit.range.start,
            span.range.start + edit.range.end,
        ),
        new_text: edit.new_text.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::{Primitive, ProgramBuilder, TypeRef};
    use pretty_assertions::assert_eq;

    fn int() -> TypeRef {
        TypeRef::Primitive(Primitive::Int)
    }

    fn sample() -> (Program, DeclId) {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let a = b.class(unit, "A");
        let m = b.method(a, "count", Some(int()), &[("x", int())], Some("return x;"));
        (b.finish().expect("valid model"), m)
    }

    #[test]
    fn anchored_edits_apply_in_unit_coordinates() {
        let (program, m) = sample();
        let text = program.decl_text(m).unwrap();
        let at = text.find("count").unwrap();
        let mut edits = EditSet::new();
        edits.push(Edit::replace(m, TextRange::new(at, at + 5), "size"));
        let changed = edits.apply(&program).unwrap();
        assert!(changed["A.java"].contains("int size(int x)"));
        assert!(!changed["A.java"].contains("count"));
    }

    #[test]
    fn duplicate_edits_collapse_and_overlaps_are_rejected() {
        let (program, m) = sample();
        let mut edits = EditSet::new();
        edits.push(Edit::replace(m, TextRange::new(0, 3), "pub"));
        edits.push(Edit::replace(m, TextRange::new(0, 3), "pub"));
        edits.normalize(&program).unwrap();
        assert_eq!(edits.len(), 1);

        edits.push(Edit::replace(m, TextRange::new(2, 5), "other"));
        let err = edits.normalize(&program).unwrap_err();
        assert_eq!(
            err,
            EditError::Overlap {
                path: "A.java".to_string()
            }
        );
    }

    #[test]
    fn insertions_at_a_replacement_boundary_are_allowed() {
        let (program, m) = sample();
        let mut edits = EditSet::new();
        edits.push(Edit::insert(m, 0, "@Deprecated\n    "));
        edits.push(Edit::replace(m, TextRange::new(0, 3), "long"));
        assert!(edits.normalize(&program).is_ok());
    }

    #[test]
    fn ranges_outside_the_anchor_span_are_rejected() {
        let (program, m) = sample();
        let len = program.decl_text(m).unwrap().len();
        let mut edits = EditSet::new();
        edits.push(Edit::replace(m, TextRange::new(0, len + 1), ""));
        assert!(matches!(
            edits.normalize(&program),
            Err(EditError::RangeOutOfBounds { .. })
        ));
    }
}
