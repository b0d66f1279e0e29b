//! Lazy ADT views
//!
//! A [`LazyAdtView`] holds a reduced term plus its schema and peels one
//! constructor layer per [`force`](LazyAdtView::force). It never calls the
//! evaluator; anything still in application or reference form surfaces as
//! [`MarshalError::Unreduced`]. Views are forward-only; clone before
//! forcing to restart from the root.

use std::sync::Arc;

use tracing::trace;

use crate::marshal::{check_num, lift, resolve_ctr, MarshalError};
use crate::term::Term;
use crate::types::{AdtSchema, ListShape, TypeDescriptor, TypeRegistry};
use crate::value::{Num, Value};

/// A not-yet-converted ADT result.
#[derive(Debug, Clone)]
pub struct LazyAdtView {
    term: Term,
    schema: Arc<AdtSchema>,
    registry: Arc<TypeRegistry>,
}

/// One forced constructor layer.
#[derive(Debug)]
pub struct AdtLayer {
    pub type_name: String,
    pub ctr_name: String,
    pub fields: Vec<LazyField>,
}

/// A field of a forced layer. Scalars materialize immediately; ADT fields
/// stay lazy; a superposed field is lifted eagerly.
#[derive(Debug)]
pub enum LazyField {
    Num(Num),
    Adt(LazyAdtView),
    Fan(Value),
}

impl LazyAdtView {
    pub(super) fn new(term: Term, schema: Arc<AdtSchema>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            term,
            schema,
            registry,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.schema.name
    }

    /// Force exactly one constructor layer.
    pub fn force(self) -> Result<AdtLayer, MarshalError> {
        let LazyAdtView {
            term,
            schema: expected,
            registry,
        } = self;
        let (name, args) = match term {
            Term::Ctr { name, args } => (name, args),
            other @ (Term::Num(_) | Term::Sup(..)) => {
                return Err(MarshalError::TypeMismatch {
                    expected: expected.name.clone(),
                    got: other.kind().to_string(),
                });
            }
            other => return Err(MarshalError::Unreduced(other.kind())),
        };

        let (schema, ctr_name) = resolve_ctr(&name, &registry)?;
        if schema.name != expected.name {
            return Err(MarshalError::TypeMismatch {
                expected: expected.name.clone(),
                got: schema.name.clone(),
            });
        }
        let arity = match schema.ctor(&ctr_name) {
            Some(ctr) => ctr.arity(),
            None => unreachable!("resolve_ctr checked the constructor"),
        };
        if args.len() != arity {
            return Err(MarshalError::FieldCount {
                ctr: format!("{}/{}", schema.name, ctr_name),
                expected: arity,
                got: args.len(),
            });
        }
        trace!(r#type = %schema.name, ctr = %ctr_name, "forcing constructor layer");

        let mut fields = Vec::with_capacity(args.len());
        for arg in args {
            fields.push(lazy_field(arg, &registry)?);
        }
        Ok(AdtLayer {
            type_name: schema.name.clone(),
            ctr_name,
            fields,
        })
    }

    /// Convert the whole subtree eagerly.
    pub fn to_value(&self) -> Result<Value, MarshalError> {
        let descriptor = TypeDescriptor::Adt(Arc::clone(&self.schema));
        crate::marshal::from_term(&self.term, &descriptor, &self.registry)
    }

    /// Iterate a list-shaped ADT one cons cell at a time.
    pub fn iter(self) -> Result<LazyListIter, MarshalError> {
        let shape = self.schema.list_shape().ok_or_else(|| {
            MarshalError::TypeMismatch {
                expected: "list-shaped ADT".to_string(),
                got: self.schema.name.clone(),
            }
        })?;
        Ok(LazyListIter {
            term: Some(self.term),
            schema: self.schema,
            registry: self.registry,
            shape,
        })
    }

    /// Collect a list-shaped ADT into a vector of element values.
    pub fn to_list(self) -> Result<Vec<Value>, MarshalError> {
        self.iter()?.collect()
    }
}

fn lazy_field(term: Term, registry: &Arc<TypeRegistry>) -> Result<LazyField, MarshalError> {
    match term {
        Term::Num(num) => {
            check_num(num)?;
            Ok(LazyField::Num(num))
        }
        Term::Ctr { name, args } => {
            let (schema, _) = resolve_ctr(&name, registry)?;
            Ok(LazyField::Adt(LazyAdtView::new(
                Term::Ctr { name, args },
                schema,
                Arc::clone(registry),
            )))
        }
        Term::Sup(..) => Ok(LazyField::Fan(lift(&term, registry)?)),
        other => Err(MarshalError::Unreduced(other.kind())),
    }
}

/// Forward-only iterator over a cons chain. Each `next` forces exactly one
/// constructor application.
#[derive(Debug)]
pub struct LazyListIter {
    term: Option<Term>,
    schema: Arc<AdtSchema>,
    registry: Arc<TypeRegistry>,
    shape: ListShape,
}

impl LazyListIter {
    fn step(&mut self, term: Term) -> Result<Option<Value>, MarshalError> {
        let (name, args) = match term {
            Term::Ctr { name, args } => (name, args),
            other @ (Term::Num(_) | Term::Sup(..)) => {
                return Err(MarshalError::TypeMismatch {
                    expected: self.schema.name.clone(),
                    got: other.kind().to_string(),
                });
            }
            other => return Err(MarshalError::Unreduced(other.kind())),
        };
        let index = self.schema.ctor_index(&name).ok_or_else(|| {
            MarshalError::TypeMismatch {
                expected: self.schema.name.clone(),
                got: name.clone(),
            }
        })?;
        if index == self.shape.nil_index {
            return Ok(None);
        }
        if args.len() != 2 {
            return Err(MarshalError::FieldCount {
                ctr: name,
                expected: 2,
                got: args.len(),
            });
        }
        let mut args = args.into_iter();
        let (first, second) = match (args.next(), args.next()) {
            (Some(a), Some(b)) => (a, b),
            _ => unreachable!("length checked above"),
        };
        let (head, tail) = if self.shape.head_index == 0 {
            (first, second)
        } else {
            (second, first)
        };
        let value = lift(&head, &self.registry)?;
        self.term = Some(tail);
        Ok(Some(value))
    }
}

impl Iterator for LazyListIter {
    type Item = Result<Value, MarshalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let term = self.term.take()?;
        match self.step(term) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
