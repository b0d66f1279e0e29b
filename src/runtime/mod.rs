//! Definition invocation
//!
//! [`Callable`] is the proxy a host gets from [`Book::def`]. Invocation is
//! one pass: arity check, marshal arguments, bind the definition handle,
//! hand a single application term to the evaluator, wrap the reduced
//! result. Nothing external happens before the arity check passes, and the
//! evaluator is called exactly once per invocation.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::book::{Book, Def};
use crate::marshal::{self, LazyAdtView, MarshalError};
use crate::term::{EvalError, Evaluator, Term};
use crate::types::{RegistryError, TypeDescriptor};
use crate::value::Value;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("unknown definition: {0}")]
    UnknownDefinition(String),

    #[error("definition `{def}` expects {expected} arguments, got {got}")]
    Arity {
        def: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// The result of an invocation, shaped by the definition's result type.
#[derive(Debug)]
pub enum Output {
    /// A fully materialized value (scalar results, superpositions).
    Value(Value),
    /// An ADT result, convertible on demand.
    Lazy(LazyAdtView),
    /// A reduced term of no registered type; still printable and inspectable.
    Term(Term),
}

impl Output {
    pub fn into_value(self) -> Result<Value, MarshalError> {
        match self {
            Output::Value(value) => Ok(value),
            Output::Lazy(view) => view.to_value(),
            Output::Term(term) => Err(MarshalError::Unreduced(term.kind())),
        }
    }

    pub fn lazy(self) -> Option<LazyAdtView> {
        match self {
            Output::Lazy(view) => Some(view),
            _ => None,
        }
    }
}

/// A callable proxy for one book definition.
#[derive(Debug)]
pub struct Callable<'b> {
    book: &'b Book,
    def: &'b Def,
}

impl Book {
    /// Look up a definition as a callable proxy.
    pub fn def(&self, name: &str) -> Result<Callable<'_>, InvokeError> {
        let def = self
            .def_entry(name)
            .ok_or_else(|| InvokeError::UnknownDefinition(name.to_string()))?;
        Ok(Callable { book: self, def })
    }
}

impl<'b> Callable<'b> {
    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn arity(&self) -> usize {
        self.def.arity()
    }

    /// Invoke the definition with positional arguments.
    pub fn invoke(
        &self,
        evaluator: &dyn Evaluator,
        args: &[Value],
    ) -> Result<Output, InvokeError> {
        if args.len() != self.def.arity() {
            return Err(InvokeError::Arity {
                def: self.def.name().to_string(),
                expected: self.def.arity(),
                got: args.len(),
            });
        }

        let registry = self.book.registry();
        let mut term_args = Vec::with_capacity(args.len());
        for (param, arg) in self.def.params().iter().zip(args) {
            let descriptor = match &param.annotation {
                Some(ann) => registry.resolve(ann)?,
                None => marshal::infer_descriptor(arg, registry)?,
            };
            term_args.push(marshal::to_term(arg, &descriptor, registry)?);
        }

        let handle = self.def.handle(evaluator)?;
        let call = if term_args.is_empty() {
            handle
        } else {
            Term::app(handle, term_args)
        };

        debug!(def = %self.def.name(), backend = %self.book.backend(), "invoking definition");
        let reduced = evaluator.evaluate(&call, self.book.backend())?;
        self.wrap(reduced)
    }

    /// Shape the reduced term by the declared (or inferred) result type.
    fn wrap(&self, reduced: Term) -> Result<Output, InvokeError> {
        let registry = self.book.registry();
        if let Some(ann) = self.def.result_annotation() {
            return match registry.resolve(ann)? {
                TypeDescriptor::Adt(schema) => Ok(Output::Lazy(marshal::lazy_view(
                    reduced,
                    schema,
                    Arc::clone(registry),
                ))),
                descriptor @ TypeDescriptor::Scalar(_) => {
                    let value = marshal::from_term(&reduced, &descriptor, registry)?;
                    Ok(Output::Value(value))
                }
            };
        }
        if matches!(reduced, Term::Num(_) | Term::Sup(..)) {
            let value = marshal::lift(&reduced, registry)?;
            return Ok(Output::Value(value));
        }
        let schema = match &reduced {
            Term::Ctr { name, .. } => registry.adt_of_ctor(name),
            _ => None,
        };
        match schema {
            Some(schema) => Ok(Output::Lazy(marshal::lazy_view(
                reduced,
                schema,
                Arc::clone(registry),
            ))),
            None => Ok(Output::Term(reduced)),
        }
    }
}
