//! Reference rewriting: repoints every access of a relocated field.

use crate::ir::visit::{walk_declaration_mut, walk_expr_mut, MutVisitor};
use crate::ir::{DeclId, Expr, FieldId, FunctionId, Literal, Program};
use indexmap::IndexMap;

/// Old field identity → new field identity, in relocation order.
///
/// Keys are unique: a field is relocated at most once per pass invocation.
/// Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    entries: IndexMap<FieldId, FieldId>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: FieldId, new: FieldId) {
        let previous = self.entries.insert(old, new);
        debug_assert!(previous.is_none(), "field relocated twice");
    }

    pub fn get(&self, old: FieldId) -> Option<FieldId> {
        self.entries.get(&old).copied()
    }

    pub fn contains(&self, old: FieldId) -> bool {
        self.entries.contains_key(&old)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, FieldId)> + '_ {
        self.entries.iter().map(|(old, new)| (*old, *new))
    }

    pub fn values(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.entries.values().copied()
    }

    /// Appends every entry of `other`. Maps of different groups never share
    /// keys.
    pub fn extend(&mut self, other: &SubstitutionMap) {
        for (old, new) in other.iter() {
            self.insert(old, new);
        }
    }
}

/// Rewrites field reads and writes according to a [`SubstitutionMap`].
///
/// Relocated fields are static, so the rewritten access carries no receiver.
/// The old receiver expression is dropped without being evaluated; receivers
/// of relocated fields are always the trivial `this` or instance load.
pub struct FieldRemapper<'m> {
    map: &'m SubstitutionMap,
    rewritten: usize,
}

impl<'m> FieldRemapper<'m> {
    pub fn new(map: &'m SubstitutionMap) -> Self {
        FieldRemapper { map, rewritten: 0 }
    }

    /// Number of accesses rewritten so far.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }
}

impl MutVisitor for FieldRemapper<'_> {
    fn visit_expr(&mut self, expr: &mut Expr, program: &mut Program) {
        let replacement = match expr {
            Expr::GetField { field, .. } => self.map.get(*field).map(|new| Expr::GetField {
                field: new,
                receiver: None,
            }),
            Expr::SetField { field, value, .. } => match self.map.get(*field) {
                Some(new) => {
                    let mut value = std::mem::replace(&mut **value, Expr::Literal(Literal::Null));
                    self.visit_expr(&mut value, program);
                    Some(Expr::SetField {
                        field: new,
                        receiver: None,
                        value: Box::new(value),
                    })
                }
                None => None,
            },
            _ => None,
        };

        match replacement {
            Some(replacement) => {
                *expr = replacement;
                self.rewritten += 1;
            }
            None => walk_expr_mut(self, expr, program),
        }
    }
}

/// Rewrites every access in the subtree rooted at `root`. Returns the number
/// of rewritten accesses.
pub fn rewrite_declaration(program: &mut Program, root: DeclId, map: &SubstitutionMap) -> usize {
    if map.is_empty() {
        return 0;
    }
    let mut remapper = FieldRemapper::new(map);
    walk_declaration_mut(&mut remapper, root, program);
    remapper.rewritten()
}

/// Rewrites every access in a free-standing function body.
pub fn rewrite_function(program: &mut Program, function: FunctionId, map: &SubstitutionMap) -> usize {
    if map.is_empty() {
        return 0;
    }
    let mut remapper = FieldRemapper::new(map);
    remapper.visit_function(function, program);
    remapper.rewritten()
}
