//! Host-function to Weft transpilation
//!
//! Turns a narrowly shaped, annotated recursive host function into a
//! single Weft `bend`/`fork` definition. The pipeline is three pure
//! stages: entry (opt-in check), shape check (normalize or reject), and
//! emission. A function that is not marked recursive passes through
//! untouched; a function whose shape is not translatable is rejected with
//! the offending construct named, and stays callable in the host.

pub mod ast;
pub mod emit;
pub mod shape;

pub use ast::{Annotation, BinOp, CmpOp, Expr, FnDef, Param, Stmt};
pub use emit::TranspiledSource;
pub use shape::{BranchBody, PlanBranch, RecursionPlan};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranspileError {
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: String },

    #[error("function body has no reachable final return")]
    MissingReturn,
}

/// The outcome of offering a function for transpilation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transpiled {
    /// No recursion marker; the function is left to the host untranslated.
    Skipped,
    /// The emitted Weft definition.
    Source(TranspiledSource),
}

/// Transpile one host function.
pub fn transpile(def: &FnDef) -> Result<Transpiled, TranspileError> {
    if !def.recursive {
        return Ok(Transpiled::Skipped);
    }
    let plan = shape::check(def)?;
    Ok(Transpiled::Source(emit::emit(&plan)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmarked_functions_pass_through() {
        let def = FnDef::new("plain")
            .param("x", Annotation::U24)
            .body(vec![Stmt::While {
                cond: Expr::num(1),
                body: vec![],
            }]);
        // Shape problems are irrelevant without the marker.
        assert_eq!(transpile(&def).expect("skipped"), Transpiled::Skipped);
    }

    #[test]
    fn marked_functions_are_checked() {
        let def = FnDef::new("broken")
            .param("x", Annotation::U24)
            .recursive()
            .body(vec![Stmt::Assign {
                name: "x".to_string(),
                value: Expr::num(1),
            }]);
        let err = transpile(&def).unwrap_err();
        assert!(matches!(
            err,
            TranspileError::Unsupported { construct } if construct == "assignment"
        ));
    }
}
