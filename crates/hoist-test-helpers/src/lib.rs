//! Test utilities for hoist: an IR builder, shared program documents and
//! shortcuts for running the lowering.

pub mod builder;
pub mod fixtures;

pub use builder::{ProgramBuilder, PropertyDef};

use hoist_core::{
    print_program, DefaultInterop, Lowerer, LoweringConfig, LoweringError, LoweringReport, Program,
};

/// Builds a program from a YAML document, panicking on invalid input.
pub fn load(text: &str) -> Program {
    match Program::from_yaml(text) {
        Ok(program) => program,
        Err(err) => panic!("invalid test document: {err}"),
    }
}

/// Lowers `program` with the default configuration.
pub fn try_lower(program: &mut Program) -> Result<LoweringReport, LoweringError> {
    let config = LoweringConfig::default();
    let interop = DefaultInterop::new(&config);
    Lowerer::new(&config, &interop).lower(program)
}

/// Lowers `program` with the default configuration, panicking on failure.
pub fn lower(program: &mut Program) -> LoweringReport {
    match try_lower(program) {
        Ok(report) => report,
        Err(err) => panic!("lowering failed: {err}"),
    }
}

/// Printed IR, for comparisons and snapshots.
pub fn dump(program: &Program) -> String {
    print_program(program)
}
