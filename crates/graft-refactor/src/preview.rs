//! Preview generation.
//!
//! Hosts show the user what an edit set does before applying it. The preview
//! applies the edits to an in-memory copy of the snapshot and renders a
//! unified diff per changed unit; the snapshot itself is never mutated.

use similar::TextDiff;

use crate::edit::{EditError, EditSet};
use graft_model::Program;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitPreview {
    pub path: String,
    pub original: String,
    pub modified: String,
    pub unified_diff: String,
    pub edit_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefactoringPreview {
    pub total_units: usize,
    pub total_edits: usize,
    pub units: Vec<UnitPreview>,
}

pub fn generate_preview(
    program: &Program,
    edits: &EditSet,
) -> Result<RefactoringPreview, EditError> {
    let mut normalized = edits.clone();
    normalized.normalize(program)?;
    let total_edits = normalized.len();
    let modified_units = normalized.clone().apply(program)?;

    let mut units = Vec::new();
    for (path, modified) in &modified_units {
        let original = program
            .units()
            .iter()
            .find(|u| u.path == *path)
            .map(|u| u.text.as_str())
            .unwrap_or("");
        if original == modified.as_str() {
            continue;
        }
        let diff = TextDiff::from_lines(original, modified.as_str());
        let unified_diff = diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{path}"), &format!("b/{path}"))
            .to_string();
        let edit_count = normalized
            .edits
            .iter()
            .filter(|e| {
                program
                    .decl(e.anchor)
                    .span
                    .is_some_and(|span| program.unit(span.unit).path == *path)
            })
            .count();
        units.push(UnitPreview {
            path: path.clone(),
            original: original.to_string(),
            modified: modified.clone(),
            unified_diff,
            edit_count,
        });
    }

    Ok(RefactoringPreview {
        total_units: units.len(),
        total_edits,
        units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Edit;
    use graft_model::{Primitive, ProgramBuilder, TextRange, TypeRef};

    #[test]
    fn preview_shows_a_unified_diff_per_changed_unit() {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let a = b.class(unit, "A");
        let m = b.method(
            a,
            "count",
            Some(TypeRef::Primitive(Primitive::Int)),
            &[("x", TypeRef::Primitive(Primitive::Int))],
            Some("return x;"),
        );
        let program = b.finish().expect("valid model");

        let text = program.decl_text(m).unwrap();
        let at = text.find("count").unwrap();
        let mut edits = EditSet::new();
        edits.push(Edit::replace(m, TextRange::new(at, at + 5), "size"));

        let preview = generate_preview(&program, &edits).unwrap();
        assert_eq!(preview.total_units, 1);
        assert_eq!(preview.total_edits, 1);
        let unit = &preview.units[0];
        assert_eq!(unit.path, "A.java");
        assert!(unit.unified_diff.starts_with("--- a/A.java"));
        assert!(unit.unified_diff.contains("-    int count(int x) {"));
        assert!(unit.unified_diff.contains("+    int size(int x) {"));
    }
}
