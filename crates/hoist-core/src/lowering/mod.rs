//! Lowering pipeline.
//!
//! A [`Lowerer`] runs its passes over one program at a time and verifies the
//! result when configured to. Programs are independent, so
//! [`Lowerer::lower_all`] spreads them over the rayon pool.

pub mod companion_fields;
pub mod relocate;
pub mod rewrite;

pub use companion_fields::{find_companion, CompanionFieldsLowering, RelocationMode};
pub use relocate::{relocate_field, relocate_initializer_block};
pub use rewrite::{rewrite_declaration, FieldRemapper, SubstitutionMap};

use crate::config::LoweringConfig;
use crate::error::{LoweringError, Result};
use crate::interop::InteropQueries;
use crate::ir::{FieldId, Program};
use crate::verify::verify_program;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// A structural IR-to-IR pass.
pub trait LoweringPass {
    fn name(&self) -> &'static str;

    /// Runs the pass. Returns whether the program changed.
    fn run(&mut self, program: &mut Program, report: &mut LoweringReport) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationKind {
    /// Companion field moved into the parent.
    Hoisted,
    /// Singleton field turned static in place.
    Promoted,
}

/// One relocated field, by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub kind: RelocationKind,
    pub from: String,
    pub to: String,
}

/// What the lowering did to one program.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoweringReport {
    pub program: String,
    pub relocations: Vec<Relocation>,
    pub relocated_initializers: usize,
    pub rewritten_references: usize,
    #[serde(skip)]
    pub substitutions: SubstitutionMap,
}

impl LoweringReport {
    pub fn new(program: impl Into<String>) -> Self {
        LoweringReport {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, program: &Program, kind: RelocationKind, old: FieldId, new: FieldId) {
        self.relocations.push(Relocation {
            kind,
            from: program.qualified_field_name(old),
            to: program.qualified_field_name(new),
        });
    }

    pub fn count(&self, kind: RelocationKind) -> usize {
        self.relocations.iter().filter(|r| r.kind == kind).count()
    }
}

pub struct Lowerer<'a> {
    config: &'a LoweringConfig,
    queries: &'a dyn InteropQueries,
}

impl<'a> Lowerer<'a> {
    pub fn new(config: &'a LoweringConfig, queries: &'a dyn InteropQueries) -> Self {
        Self { config, queries }
    }

    fn passes(&self) -> Vec<Box<dyn LoweringPass + 'a>> {
        vec![Box::new(CompanionFieldsLowering::new(self.queries))]
    }

    /// Lowers a single program.
    ///
    /// The passes are not idempotent: lowering the same program twice fails
    /// with [`LoweringError::AlreadyLowered`].
    pub fn lower(&self, program: &mut Program) -> Result<LoweringReport> {
        if !program.annotations_resolved {
            return Err(LoweringError::AnnotationsUnresolved {
                program: program.name.clone(),
            });
        }

        let mut report = LoweringReport::new(program.name.clone());
        for mut pass in self.passes() {
            let start = Instant::now();
            let changed = pass.run(program, &mut report)?;
            debug!(
                pass = pass.name(),
                program = %program.name,
                changed,
                elapsed_us = start.elapsed().as_micros() as u64,
                "pass finished"
            );
            if self.config.verify {
                verify_program(program, &report.substitutions).map_err(|source| {
                    LoweringError::Verification {
                        pass: pass.name(),
                        source,
                    }
                })?;
            }
        }
        Ok(report)
    }

    /// Lowers every program, in parallel when configured. Stops at the first
    /// error.
    pub fn lower_all(&self, programs: &mut [Program]) -> Result<Vec<LoweringReport>> {
        let start = Instant::now();
        let reports: Vec<LoweringReport> = if self.config.parallel {
            programs
                .par_iter_mut()
                .map(|program| self.lower(program))
                .collect::<Result<_>>()?
        } else {
            programs
                .iter_mut()
                .map(|program| self.lower(program))
                .collect::<Result<_>>()?
        };
        info!(
            programs = reports.len(),
            relocated = reports.iter().map(|r| r.relocations.len()).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "lowering finished"
        );
        Ok(reports)
    }
}
