//! Companion field lowering.
//!
//! Moves the storage of companion properties into the enclosing declaration
//! as static fields, and turns the fields of standalone singletons into static
//! fields of the singleton itself. Initializer blocks follow their fields so
//! static initialization keeps source order.
//!
//! Each top-level declaration is a group: every declaration in the group is
//! classified and relocated first, then one rewrite over the whole group
//! repoints the accesses, since a moved field may be read by any sibling
//! method of the group. Once every group is lowered, the whole program is
//! swept again with the union of all group maps so reads from other
//! declarations of the file and from top-level functions follow as well.

use super::relocate::{relocate_field, relocate_initializer_block};
use super::rewrite::{rewrite_declaration, rewrite_function, SubstitutionMap};
use super::{LoweringPass, LoweringReport, RelocationKind};
use crate::error::{LoweringError, Result};
use crate::interop::InteropQueries;
use crate::ir::{DeclId, DeclKind, FieldId, Member, Program, Property};
use tracing::{debug, trace};

/// How a declaration's members are relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationMode {
    /// Standalone singleton: fields become static fields of the same
    /// declaration.
    SelfPromote,
    /// Companion members move into the parent.
    Hoist { companion: DeclId },
}

pub struct CompanionFieldsLowering<'q> {
    queries: &'q dyn InteropQueries,
}

impl<'q> CompanionFieldsLowering<'q> {
    pub fn new(queries: &'q dyn InteropQueries) -> Self {
        Self { queries }
    }

    /// Decides how `decl` is relocated. `None` when there is nothing to move.
    pub fn classify(&self, program: &Program, decl: DeclId) -> Result<Option<RelocationMode>> {
        let d = &program.declarations[decl];
        if d.is_standalone_singleton() {
            require_receiver(program, decl)?;
            return Ok(Some(RelocationMode::SelfPromote));
        }
        match find_companion(program, decl)? {
            Some(companion) => {
                require_receiver(program, companion)?;
                Ok(Some(RelocationMode::Hoist { companion }))
            }
            None => Ok(None),
        }
    }

    /// Lowers one top-level declaration and everything nested in it.
    pub fn lower_group(
        &self,
        program: &mut Program,
        root: DeclId,
        report: &mut LoweringReport,
    ) -> Result<SubstitutionMap> {
        let mut map = SubstitutionMap::new();
        for decl in program.subtree(root) {
            if program.declarations[decl].fields_lowered {
                return Err(LoweringError::AlreadyLowered {
                    declaration: program.qualified_name(decl),
                });
            }
            match self.classify(program, decl)? {
                Some(RelocationMode::SelfPromote) => {
                    self.promote(program, decl, &mut map, report)?;
                }
                Some(RelocationMode::Hoist { companion }) => {
                    self.hoist(program, decl, companion, &mut map, report)?;
                }
                None => {}
            }
            program.declarations[decl].fields_lowered = true;
        }

        report.rewritten_references += rewrite_declaration(program, root, &map);
        Ok(map)
    }

    fn promote(
        &self,
        program: &mut Program,
        singleton: DeclId,
        map: &mut SubstitutionMap,
        report: &mut LoweringReport,
    ) -> Result<()> {
        debug!(
            declaration = %program.qualified_name(singleton),
            "promoting singleton fields to static storage"
        );
        let members = std::mem::take(&mut program.declarations[singleton].members);
        let mut lowered = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Member::Property(mut property) => {
                    if let Some(old) = self.backing_field(program, &property, singleton) {
                        let new = relocate_field(program, self.queries, old, singleton, singleton)?;
                        property.backing_field = Some(new);
                        map.insert(old, new);
                        report.record(program, RelocationKind::Promoted, old, new);
                    }
                    lowered.push(Member::Property(property));
                }
                Member::Initializer(init) if !init.is_static => {
                    let moved =
                        relocate_initializer_block(program, self.queries, init, singleton, singleton)?;
                    report.relocated_initializers += 1;
                    lowered.push(Member::Initializer(moved));
                }
                other => lowered.push(other),
            }
        }
        program.declarations[singleton].members = lowered;
        Ok(())
    }

    fn hoist(
        &self,
        program: &mut Program,
        parent: DeclId,
        companion: DeclId,
        map: &mut SubstitutionMap,
        report: &mut LoweringReport,
    ) -> Result<()> {
        let into_interface = self.queries.is_platform_interface(program, parent);
        debug!(
            parent = %program.qualified_name(parent),
            companion = %program.declarations[companion].name,
            into_interface,
            "hoisting companion fields"
        );

        let members = std::mem::take(&mut program.declarations[companion].members);
        let mut kept = Vec::with_capacity(members.len());
        let mut hoisted = Vec::new();
        for member in members {
            match member {
                Member::Property(mut property) => {
                    let eligible = self
                        .backing_field(program, &property, companion)
                        .filter(|_| self.is_eligible(program, &property, into_interface));
                    if let Some(old) = eligible {
                        let new = relocate_field(program, self.queries, old, companion, parent)?;
                        property.backing_field = Some(new);
                        map.insert(old, new);
                        report.record(program, RelocationKind::Hoisted, old, new);
                        hoisted.push(Member::Field(new));
                    }
                    kept.push(Member::Property(property));
                }
                Member::Initializer(init) => {
                    let moved =
                        relocate_initializer_block(program, self.queries, init, companion, parent)?;
                    report.relocated_initializers += 1;
                    hoisted.push(Member::Initializer(moved));
                }
                other => kept.push(other),
            }
        }
        program.declarations[companion].members = kept;
        program.declarations[parent].members.extend(hoisted);
        Ok(())
    }

    /// The backing field of `property` if it has real storage owned by
    /// `owner`.
    fn backing_field(
        &self,
        program: &Program,
        property: &Property,
        owner: DeclId,
    ) -> Option<FieldId> {
        if property.is_fake_override {
            trace!(property = %property.name, "skipping fake override");
            return None;
        }
        match property.backing_field {
            Some(field) if program.fields[field].parent == owner => Some(field),
            Some(_) => None,
            None => {
                trace!(property = %property.name, "no backing field");
                None
            }
        }
    }

    /// Interfaces may only hold constant-like static fields, so only `const`
    /// and explicitly exposed properties move into one.
    fn is_eligible(&self, program: &Program, property: &Property, into_interface: bool) -> bool {
        if !into_interface || property.is_const {
            return true;
        }
        let exposed = property
            .backing_field
            .is_some_and(|field| self.queries.has_direct_field_annotation(&program.fields[field]));
        if !exposed {
            trace!(property = %property.name, "stays on companion of interface");
        }
        exposed
    }
}

fn require_receiver(program: &Program, decl: DeclId) -> Result<()> {
    if program.declarations[decl].this_receiver.is_none() {
        return Err(LoweringError::MissingReceiver {
            declaration: program.qualified_name(decl),
        });
    }
    Ok(())
}

/// The companion nested in `decl`, if any.
pub fn find_companion(program: &Program, decl: DeclId) -> Result<Option<DeclId>> {
    let companions: Vec<DeclId> = program.declarations[decl]
        .nested()
        .filter(|nested| program.declarations[*nested].kind == DeclKind::Companion)
        .collect();
    match companions.as_slice() {
        [] => Ok(None),
        [companion] => Ok(Some(*companion)),
        _ => Err(LoweringError::MultipleCompanions {
            declaration: program.qualified_name(decl),
            companions: companions
                .iter()
                .map(|c| program.declarations[*c].name.clone())
                .collect(),
        }),
    }
}

impl LoweringPass for CompanionFieldsLowering<'_> {
    fn name(&self) -> &'static str {
        "companion-fields"
    }

    fn run(&mut self, program: &mut Program, report: &mut LoweringReport) -> Result<bool> {
        let roots: Vec<DeclId> = program.top_level_declarations().collect();
        let mut all = SubstitutionMap::new();
        for &root in &roots {
            let map = self.lower_group(program, root, report)?;
            all.extend(&map);
        }

        // Accesses already rewritten name new fields, which are never keys.
        for root in roots {
            report.rewritten_references += rewrite_declaration(program, root, &all);
        }
        let functions: Vec<_> = program.top_level_functions().collect();
        for function in functions {
            report.rewritten_references += rewrite_function(program, function, &all);
        }

        let changed = !all.is_empty() || report.relocated_initializers > 0;
        report.substitutions.extend(&all);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop::DefaultInterop;
    use crate::ir::{Declaration, Scope, TypeRef};

    fn give_receiver(program: &mut Program, decl: DeclId) {
        let ty = TypeRef::new(program.declarations[decl].name.clone());
        let this = program.add_variable("this", ty, false, Scope::Declaration(decl));
        program.declarations[decl].this_receiver = Some(this);
    }

    #[test]
    fn test_classify_modes() {
        let mut program = Program::new("test");
        let plain = program.add_declaration(Declaration::new("Plain", DeclKind::Class));
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        let mut companion = Declaration::new("Companion", DeclKind::Companion);
        companion.parent = Some(host);
        let companion = program.add_declaration(companion);
        let single = program.add_declaration(Declaration::new("Registry", DeclKind::Singleton));
        let mut local = Declaration::new("Local", DeclKind::Singleton);
        local.is_local = true;
        let local = program.add_declaration(local);
        for object in [companion, single] {
            give_receiver(&mut program, object);
        }

        let queries = DefaultInterop::default();
        let pass = CompanionFieldsLowering::new(&queries);
        assert_eq!(pass.classify(&program, plain).unwrap(), None);
        assert_eq!(
            pass.classify(&program, host).unwrap(),
            Some(RelocationMode::Hoist { companion })
        );
        assert_eq!(
            pass.classify(&program, single).unwrap(),
            Some(RelocationMode::SelfPromote)
        );
        assert_eq!(pass.classify(&program, local).unwrap(), None);
        assert_eq!(pass.classify(&program, companion).unwrap(), None);
    }

    #[test]
    fn test_nested_singleton_is_not_promoted() {
        let mut program = Program::new("test");
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        let mut nested = Declaration::new("Cache", DeclKind::Singleton);
        nested.parent = Some(host);
        let nested = program.add_declaration(nested);

        let queries = DefaultInterop::default();
        let pass = CompanionFieldsLowering::new(&queries);
        assert_eq!(pass.classify(&program, nested).unwrap(), None);
    }

    #[test]
    fn test_object_without_receiver_rejected() {
        let mut program = Program::new("test");
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        let mut companion = Declaration::new("Companion", DeclKind::Companion);
        companion.parent = Some(host);
        program.add_declaration(companion);
        let single = program.add_declaration(Declaration::new("Registry", DeclKind::Singleton));

        let queries = DefaultInterop::default();
        let pass = CompanionFieldsLowering::new(&queries);
        let err = pass.classify(&program, host).unwrap_err();
        assert_eq!(err.to_string(), "`Host.Companion` has no receiver slot");
        assert!(matches!(
            pass.classify(&program, single),
            Err(LoweringError::MissingReceiver { .. })
        ));
    }

    #[test]
    fn test_two_companions_rejected() {
        let mut program = Program::new("test");
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        for name in ["A", "B"] {
            let mut companion = Declaration::new(name, DeclKind::Companion);
            companion.parent = Some(host);
            program.add_declaration(companion);
        }

        let err = find_companion(&program, host).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`Host` declares more than one companion: A, B"
        );
    }
}
