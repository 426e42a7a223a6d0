//! Error types.
//!
//! Expected absences (no companion, no backing field, ineligible interface
//! property) are not errors. Everything here aborts the current program.

use thiserror::Error;

pub use crate::document::DocumentError;
pub use crate::session::SessionError;
pub use crate::verify::VerifyError;

pub type Result<T> = std::result::Result<T, LoweringError>;

#[derive(Debug, Error)]
pub enum LoweringError {
    /// The pass is not idempotent; running it twice is a pipeline bug.
    #[error("companion field lowering already applied to `{declaration}`")]
    AlreadyLowered { declaration: String },

    #[error("annotations of `{program}` are not resolved; run annotation resolution first")]
    AnnotationsUnresolved { program: String },

    #[error("`{declaration}` has no synthesized singleton-instance field")]
    MissingInstanceField { declaration: String },

    #[error("`{declaration}` has no receiver slot")]
    MissingReceiver { declaration: String },

    #[error("`{declaration}` declares more than one companion: {}", companions.join(", "))]
    MultipleCompanions {
        declaration: String,
        companions: Vec<String>,
    },

    #[error("IR verification failed after `{pass}`: {source}")]
    Verification {
        pass: &'static str,
        #[source]
        source: VerifyError,
    },
}
