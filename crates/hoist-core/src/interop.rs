//! Capability queries the lowering consumes from the front-end.

use crate::config::LoweringConfig;
use crate::ir::{DeclId, DeclKind, Field, FieldId, Program};

/// Read-only platform and interop queries.
///
/// Implementations must be `Sync`: the same instance is shared by every
/// worker when programs are lowered in parallel.
pub trait InteropQueries: Sync {
    /// Whether `decl` compiles to a platform interface, which may only hold
    /// public static final constant-like fields.
    fn is_platform_interface(&self, program: &Program, decl: DeclId) -> bool;

    /// Whether `field` is explicitly marked for direct field exposure.
    fn has_direct_field_annotation(&self, field: &Field) -> bool;

    /// The synthesized static field holding the sole instance of `decl`.
    fn singleton_instance_field(&self, program: &Program, decl: DeclId) -> Option<FieldId>;
}

/// Answers every query from the IR itself.
#[derive(Debug, Clone)]
pub struct DefaultInterop {
    direct_field_annotation: String,
}

impl DefaultInterop {
    pub fn new(config: &LoweringConfig) -> Self {
        DefaultInterop {
            direct_field_annotation: config.direct_field_annotation.clone(),
        }
    }
}

impl Default for DefaultInterop {
    fn default() -> Self {
        Self::new(&LoweringConfig::default())
    }
}

impl InteropQueries for DefaultInterop {
    fn is_platform_interface(&self, program: &Program, decl: DeclId) -> bool {
        program.declarations[decl].kind == DeclKind::Interface
    }

    fn has_direct_field_annotation(&self, field: &Field) -> bool {
        field.has_annotation(&self.direct_field_annotation)
    }

    fn singleton_instance_field(&self, program: &Program, decl: DeclId) -> Option<FieldId> {
        program.declarations[decl].instance_field
    }
}
