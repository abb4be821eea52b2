use std::collections::{BTreeSet, HashMap};

use crate::decl::DeclId;
use crate::program::Program;

/// Derived override relation: method -> directly overridden/overriding
/// methods.
///
/// Computed once per refactoring request from the snapshot's supertype graph;
/// the engine never maintains a live inheritance structure. Abstract methods
/// and interface (default) methods participate as equal members of a chain.
#[derive(Clone, Debug, Default)]
pub struct OverrideIndex {
    /// method -> methods it directly overrides (in supertypes).
    overrides: HashMap<DeclId, Vec<DeclId>>,
    /// method -> methods that directly override it (in subtypes).
    overridden_by: HashMap<DeclId, Vec<DeclId>>,
}

impl OverrideIndex {
    pub fn compute(program: &Program) -> Self {
        let mut index = OverrideIndex::default();
        for decl in program.decls() {
            if !decl.is_method() || decl.is_static() {
                continue;
            }
            let Some(class) = decl.enclosing else {
                continue;
            };
            if !program.decl(class).is_type() {
                continue;
            }
            for sup in program.all_supertypes(class) {
                for candidate in program.methods_named(sup, &decl.name) {
                    if candidate.is_static() {
                        continue;
                    }
                    if program.erased_param_types(decl.id)
                        != program.erased_param_types(candidate.id)
                    {
                        continue;
                    }
                    // Only record the *direct* override: skip when a type
                    // between `class` and `sup` already declares the member.
                    let shadowed = program.all_supertypes(class).iter().any(|mid| {
                        *mid != sup
                            && program.is_subtype_decl(*mid, sup)
                            && program
                                .methods_named(*mid, &decl.name)
                                .iter()
                                .any(|m| program.same_signature(m.id, decl.id))
                    });
                    if shadowed {
                        continue;
                    }
                    index.overrides.entry(decl.id).or_default().push(candidate.id);
                    index
                        .overridden_by
                        .entry(candidate.id)
                        .or_default()
                        .push(decl.id);
                }
            }
        }
        for list in index.overrides.values_mut() {
            list.sort();
            list.dedup();
        }
        for list in index.overridden_by.values_mut() {
            list.sort();
            list.dedup();
        }
        index
    }

    pub fn directly_overrides(&self, method: DeclId) -> &[DeclId] {
        self.overrides.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn directly_overridden_by(&self, method: DeclId) -> &[DeclId] {
        self.overridden_by
            .get(&method)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_overridden(&self, method: DeclId) -> bool {
        !self.directly_overridden_by(method).is_empty()
    }

    pub fn is_override(&self, method: DeclId) -> bool {
        !self.directly_overrides(method).is_empty()
    }

    /// The full override chain of one logical member, `method` included, in
    /// ascending [`DeclId`] order.
    pub fn chain(&self, method: DeclId) -> Vec<DeclId> {
        let mut seen = BTreeSet::new();
        let mut queue = vec![method];
        while let Some(next) = queue.pop() {
            if !seen.insert(next) {
                continue;
            }
            queue.extend(self.directly_overrides(next));
            queue.extend(self.directly_overridden_by(next));
        }
        seen.into_iter().collect()
    }
}
