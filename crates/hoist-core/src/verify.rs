//! Structural IR verification.
//!
//! Checks, over everything reachable from the program's top-level items:
//!
//! - every field is owned by exactly one declaration, and that declaration is
//!   the field's parent;
//! - fields owned by interfaces are static;
//! - every field relocated by the lowering is owned and static, and is never
//!   accessed through a receiver;
//! - every field read or write targets an owned field.

use crate::ir::visit::{walk_declaration, walk_expr, Visitor};
use crate::ir::{DeclId, DeclKind, Expr, FieldId, Member, Program};
use crate::lowering::SubstitutionMap;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("field `{field}` is owned by both `{first}` and `{second}`")]
    MultipleOwners {
        field: String,
        first: String,
        second: String,
    },
    #[error("field `{field}` is listed by `{listed_in}` but its parent is `{parent}`")]
    ParentMismatch {
        field: String,
        listed_in: String,
        parent: String,
    },
    #[error("interface `{interface}` owns instance field `{field}`")]
    InstanceFieldInInterface { interface: String, field: String },
    #[error("relocated field `{field}` is not owned by any declaration")]
    UnownedRelocation { field: String },
    #[error("relocated field `{field}` is not static")]
    NonStaticRelocation { field: String },
    #[error("static field `{field}` is accessed through a receiver")]
    StaticAccessWithReceiver { field: String },
    #[error("reference to field `{field}` (f{index}) which no declaration owns")]
    DanglingReference { field: String, index: usize },
}

/// Verifies `program`. `relocated` lists the fields moved by the lowering;
/// pass an empty map to check plain ownership only.
pub fn verify_program(program: &Program, relocated: &SubstitutionMap) -> Result<(), VerifyError> {
    let owners = collect_owners(program)?;

    let relocated: FxHashSet<FieldId> = relocated.values().collect();
    for &field in &relocated {
        if !owners.contains_key(&field) {
            return Err(VerifyError::UnownedRelocation {
                field: program.qualified_field_name(field),
            });
        }
        if !program.fields[field].is_static() {
            return Err(VerifyError::NonStaticRelocation {
                field: program.qualified_field_name(field),
            });
        }
    }

    let mut checker = ReferenceChecker {
        owners: &owners,
        relocated: &relocated,
        error: None,
    };
    for root in program.top_level_declarations() {
        walk_declaration(&mut checker, root, program);
    }
    for function in program.top_level_functions() {
        checker.visit_function(function, program);
    }
    match checker.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Field → owning declaration for every reachable declaration.
fn collect_owners(program: &Program) -> Result<FxHashMap<FieldId, DeclId>, VerifyError> {
    let mut owners: FxHashMap<FieldId, DeclId> = FxHashMap::default();
    for root in program.top_level_declarations() {
        for decl in program.subtree(root) {
            for member in &program.declarations[decl].members {
                if let Member::Field(field) = member {
                    let parent = program.fields[*field].parent;
                    if parent != decl {
                        return Err(VerifyError::ParentMismatch {
                            field: program.fields[*field].name.clone(),
                            listed_in: program.qualified_name(decl),
                            parent: program.qualified_name(parent),
                        });
                    }
                }
            }
            for field in program.owned_fields(decl) {
                if let Some(first) = owners.insert(field, decl) {
                    return Err(VerifyError::MultipleOwners {
                        field: program.fields[field].name.clone(),
                        first: program.qualified_name(first),
                        second: program.qualified_name(decl),
                    });
                }
                if program.declarations[decl].kind == DeclKind::Interface
                    && !program.fields[field].is_static()
                {
                    return Err(VerifyError::InstanceFieldInInterface {
                        interface: program.qualified_name(decl),
                        field: program.fields[field].name.clone(),
                    });
                }
            }
        }
    }
    Ok(owners)
}

struct ReferenceChecker<'a> {
    owners: &'a FxHashMap<FieldId, DeclId>,
    relocated: &'a FxHashSet<FieldId>,
    error: Option<VerifyError>,
}

impl ReferenceChecker<'_> {
    fn check(&mut self, program: &Program, field: FieldId, has_receiver: bool) {
        if self.error.is_some() {
            return;
        }
        if !self.owners.contains_key(&field) {
            self.error = Some(VerifyError::DanglingReference {
                field: program.fields[field].name.clone(),
                index: field.index(),
            });
        } else if has_receiver && self.relocated.contains(&field) {
            self.error = Some(VerifyError::StaticAccessWithReceiver {
                field: program.qualified_field_name(field),
            });
        }
    }
}

impl Visitor for ReferenceChecker<'_> {
    fn visit_expr(&mut self, expr: &Expr, program: &Program) {
        match expr {
            Expr::GetField { field, receiver } | Expr::SetField { field, receiver, .. } => {
                self.check(program, *field, receiver.is_some());
            }
            _ => {}
        }
        walk_expr(self, expr, program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Declaration, Field, FieldFlags, Function, Stmt, TypeRef, Visibility};

    fn field(program: &mut Program, owner: DeclId, name: &str, flags: FieldFlags) -> FieldId {
        program.fields.alloc(Field {
            name: name.to_string(),
            ty: TypeRef::new("Int"),
            flags,
            visibility: Visibility::Public,
            annotations: Vec::new(),
            initializer: None,
            parent: owner,
        })
    }

    #[test]
    fn test_dangling_reference_detected() {
        let mut program = Program::new("test");
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        let orphan = field(&mut program, host, "orphan", FieldFlags::empty());
        let main = program.functions.alloc(Function {
            name: "main".to_string(),
            owner: None,
            params: Vec::new(),
            body: crate::ir::Block::new(vec![Stmt::Expr(Expr::get_field(orphan, None))]),
        });
        program.items.push(crate::ir::Item::Function(main));

        let err = verify_program(&program, &SubstitutionMap::new()).unwrap_err();
        assert!(matches!(err, VerifyError::DanglingReference { ref field, .. } if field == "orphan"));
    }

    #[test]
    fn test_field_listed_twice_detected() {
        let mut program = Program::new("test");
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        let x = field(&mut program, host, "x", FieldFlags::empty());
        program.declarations[host].members.push(Member::Field(x));
        program.declarations[host].members.push(Member::Field(x));

        let err = verify_program(&program, &SubstitutionMap::new()).unwrap_err();
        assert!(matches!(err, VerifyError::MultipleOwners { .. }));
    }

    #[test]
    fn test_interface_instance_field_rejected() {
        let mut program = Program::new("test");
        let api = program.add_declaration(Declaration::new("Api", DeclKind::Interface));
        let x = field(&mut program, api, "x", FieldFlags::FINAL);
        program.declarations[api].members.push(Member::Field(x));

        let err = verify_program(&program, &SubstitutionMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "interface `Api` owns instance field `x`");
    }

    #[test]
    fn test_relocated_field_must_be_static() {
        let mut program = Program::new("test");
        let host = program.add_declaration(Declaration::new("Host", DeclKind::Class));
        let old = field(&mut program, host, "x", FieldFlags::empty());
        let new = field(&mut program, host, "x", FieldFlags::empty());
        program.declarations[host].members.push(Member::Field(new));
        let mut map = SubstitutionMap::new();
        map.insert(old, new);

        let err = verify_program(&program, &map).unwrap_err();
        assert!(matches!(err, VerifyError::NonStaticRelocation { .. }));
    }
}
