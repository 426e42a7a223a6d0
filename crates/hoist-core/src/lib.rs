//! Hoist: companion and singleton field lowering.
//!
//! Takes a resolved class IR and relocates the storage of companion
//! properties into the enclosing declaration as static fields, promotes the
//! fields of standalone singletons to static storage, moves initializer
//! blocks along with them, and repoints every access of a moved field.
//!
//! ```no_run
//! use hoist_core::{DefaultInterop, Lowerer, LoweringConfig, Program};
//!
//! let mut program = Program::from_yaml("name: Empty.kt").unwrap();
//! let config = LoweringConfig::default();
//! let interop = DefaultInterop::new(&config);
//! let report = Lowerer::new(&config, &interop).lower(&mut program).unwrap();
//! assert!(report.relocations.is_empty());
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod interop;
pub mod ir;
pub mod lowering;
pub mod printer;
pub mod session;
pub mod verify;

pub use config::{ConfigError, LoweringConfig, CONFIG_FILE_NAME};
pub use document::{build_program, ProgramDoc};
pub use error::{DocumentError, LoweringError, Result, SessionError, VerifyError};
pub use interop::{DefaultInterop, InteropQueries};
pub use ir::{DeclId, DeclKind, FieldId, Program};
pub use lowering::{
    CompanionFieldsLowering, Lowerer, LoweringPass, LoweringReport, Relocation, RelocationKind,
    SubstitutionMap,
};
pub use printer::print_program;
pub use session::{Manifest, ResolutionCache};
pub use verify::verify_program;
