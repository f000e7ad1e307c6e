//! Prosa Code Generation - two target dialects
//!
//! Both backends lower the same AST under the same symbol-table invariants
//! and the interpreter's operator semantics; they differ in instruction
//! shapes, naming scheme and storage model. Every generated label and
//! temporary derives its name from an AST node id, which keeps names unique
//! across the whole unit. The static checking pass runs first; generation
//! itself never evaluates anything.

pub mod llvm;
pub mod x86;

use crate::ast::Program;
use crate::error::ProsaResult;
use crate::types;

/// Target instruction style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Frame-relative storage, accumulator register, push/pop discipline
    StackFrame,
    /// Virtual-register temporaries, global cells, explicit basic blocks
    Ssa,
}

/// Type-check a unit and lower it for the selected dialect. There is no
/// partial output: the first error aborts generation.
pub fn generate(program: &Program, dialect: Dialect) -> ProsaResult<String> {
    let annotations = types::check(program)?;
    match dialect {
        Dialect::StackFrame => x86::generate(program, &annotations),
        Dialect::Ssa => llvm::generate(program, &annotations),
    }
}
