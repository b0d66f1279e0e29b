//! Runtime terms and the evaluator seam
//!
//! A [`Term`] is the crate's handle on a Weft graph node. The crate builds
//! terms, hands them to an [`Evaluator`], and reads constructor/number form
//! back out; it never reduces anything itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Num;

/// A Weft term in the shape the bridge cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// A scalar literal.
    Num(Num),

    /// A reference to a book definition by name.
    Ref(String),

    /// A saturated constructor application, name in `Type/Ctor` form.
    Ctr { name: String, args: Vec<Term> },

    /// A function application awaiting reduction.
    App { fun: Box<Term>, args: Vec<Term> },

    /// A superposition of two alternatives.
    Sup(Box<Term>, Box<Term>),

    /// An erased value.
    Era,
}

impl Term {
    pub fn u24(value: u32) -> Self {
        Term::Num(Num::U24(value))
    }

    pub fn r#ref(name: impl Into<String>) -> Self {
        Term::Ref(name.into())
    }

    pub fn ctr(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Ctr {
            name: name.into(),
            args,
        }
    }

    pub fn app(fun: Term, args: Vec<Term>) -> Self {
        Term::App {
            fun: Box::new(fun),
            args,
        }
    }

    pub fn sup(left: Term, right: Term) -> Self {
        Term::Sup(Box::new(left), Box::new(right))
    }

    /// Short label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Num(_) => "number",
            Term::Ref(_) => "reference",
            Term::Ctr { .. } => "constructor",
            Term::App { .. } => "application",
            Term::Sup(..) => "superposition",
            Term::Era => "erasure",
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Num(num) => write!(f, "{}", num),
            Term::Ref(name) => write!(f, "{}", name),
            Term::Ctr { name, args } => {
                if args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    write!(f, "({}", name)?;
                    for arg in args {
                        write!(f, " {}", arg)?;
                    }
                    write!(f, ")")
                }
            }
            Term::App { fun, args } => {
                write!(f, "({}", fun)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Term::Sup(l, r) => write!(f, "{{{} {}}}", l, r),
            Term::Era => write!(f, "*"),
        }
    }
}

/// Which Weft reducer runs the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The reference interpreter.
    #[default]
    Native,
    /// The compiled C reducer.
    C,
    /// The CUDA reducer.
    Cuda,
}

impl Backend {
    /// The runner command the evaluator maps this to.
    pub fn command(&self) -> &'static str {
        match self {
            Backend::Native => "run",
            Backend::C => "run-c",
            Backend::Cuda => "run-cu",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

/// Failure inside the external evaluator, carried opaquely.
#[derive(Error, Debug)]
#[error("evaluator failure: {0}")]
pub struct EvalError(pub String);

/// The external Weft evaluator.
///
/// `bind` turns a definition name into a callable term handle; `evaluate`
/// reduces a term to normal form on the selected backend. Both are blocking.
pub trait Evaluator {
    /// Bind a book definition to a term handle. The default is a plain
    /// by-name reference, which suits evaluators that resolve names at
    /// reduction time.
    fn bind(&self, name: &str) -> Result<Term, EvalError> {
        Ok(Term::Ref(name.to_string()))
    }

    /// Reduce `term` to normal form.
    fn evaluate(&self, term: &Term, backend: Backend) -> Result<Term, EvalError>;
}
