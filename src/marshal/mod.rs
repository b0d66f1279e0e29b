//! Value marshalling between host values and runtime terms
//!
//! `to_term` lowers a [`Value`] into constructor/number form; `from_term`
//! lifts a reduced term back. Both directions run on explicit work stacks so
//! deeply nested data never consumes host call stack. Scalars outside their
//! declared width are rejected, never truncated. Terms still containing
//! applications or references are reported as [`MarshalError::Unreduced`];
//! reduction is the evaluator's job, not ours.

mod lazy;

pub use lazy::{AdtLayer, LazyAdtView, LazyField, LazyListIter};

use std::sync::Arc;

use thiserror::Error;

use crate::term::Term;
use crate::types::{AdtSchema, ScalarKind, ScalarType, TypeDescriptor, TypeRegistry};
use crate::value::{Num, Value};

#[derive(Error, Debug)]
pub enum MarshalError {
    #[error("value {value} out of range for {scalar}")]
    Range { value: String, scalar: String },

    #[error("type `{type_name}` has no constructor `{ctr_name}`")]
    UnknownVariant { type_name: String, ctr_name: String },

    #[error("unknown type or constructor: {0}")]
    UnknownType(String),

    #[error("constructor `{ctr}` expects {expected} fields, got {got}")]
    FieldCount {
        ctr: String,
        expected: usize,
        got: usize,
    },

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("term not in value form: {0}")]
    Unreduced(&'static str),
}

fn num_type_name(num: Num) -> &'static str {
    match num {
        Num::U24(_) => "u24",
        Num::I24(_) => "i24",
        Num::F24(_) => "f24",
    }
}

fn range_error(num: Num, scalar: &str) -> MarshalError {
    MarshalError::Range {
        value: num.to_string(),
        scalar: scalar.to_string(),
    }
}

/// Checks a scalar against a declared width and kind.
fn check_scalar(num: Num, scalar: &ScalarType) -> Result<(), MarshalError> {
    match (scalar.kind, num) {
        (ScalarKind::Uint, Num::U24(v)) => {
            if v > scalar.unsigned_max() {
                return Err(range_error(num, &scalar.name));
            }
        }
        (ScalarKind::Int, Num::I24(v)) => {
            let (lo, hi) = scalar.signed_range();
            if v < lo || v > hi {
                return Err(range_error(num, &scalar.name));
            }
        }
        // The float carrier is width-checked by construction.
        (ScalarKind::Float, Num::F24(_)) => {}
        _ => {
            return Err(MarshalError::TypeMismatch {
                expected: scalar.name.clone(),
                got: num_type_name(num).to_string(),
            });
        }
    }
    Ok(())
}

/// Checks a scalar against its own kind's natural 24-bit bounds. Applied to
/// every number during conversion; the descriptor check narrows further at
/// the root.
pub(super) fn check_num(num: Num) -> Result<(), MarshalError> {
    match num {
        Num::U24(v) if v > crate::value::U24::MAX => Err(range_error(num, "u24")),
        Num::I24(v) if !(crate::value::I24::MIN..=crate::value::I24::MAX).contains(&v) => {
            Err(range_error(num, "i24"))
        }
        _ => Ok(()),
    }
}

/// Checks the root value against the declared descriptor. Fan halves each
/// conform to the same descriptor.
fn check_root(value: &Value, descriptor: &TypeDescriptor) -> Result<(), MarshalError> {
    let mut work = vec![value];
    while let Some(value) = work.pop() {
        match (value, descriptor) {
            (Value::Num(num), TypeDescriptor::Scalar(scalar)) => check_scalar(*num, scalar)?,
            (Value::Variant { type_name, .. }, TypeDescriptor::Adt(schema)) => {
                if type_name != &schema.name {
                    return Err(MarshalError::TypeMismatch {
                        expected: schema.name.clone(),
                        got: type_name.clone(),
                    });
                }
            }
            (Value::Fan(l, r), _) => {
                work.push(r.as_ref());
                work.push(l.as_ref());
            }
            (value, descriptor) => {
                return Err(MarshalError::TypeMismatch {
                    expected: descriptor.name().to_string(),
                    got: match value {
                        Value::Num(num) => num_type_name(*num).to_string(),
                        Value::Variant { type_name, .. } => type_name.clone(),
                        Value::Fan(..) => "fan".to_string(),
                    },
                });
            }
        }
    }
    Ok(())
}

/// Infer a descriptor from a value's own shape: scalars map to the builtin
/// widths, variants resolve through the registry, a fan carries its left
/// half's type.
pub fn infer_descriptor(
    value: &Value,
    registry: &TypeRegistry,
) -> Result<TypeDescriptor, MarshalError> {
    let mut value = value;
    loop {
        match value {
            Value::Num(num) => {
                return registry
                    .resolve(num_type_name(*num))
                    .map_err(|_| MarshalError::UnknownType(num_type_name(*num).to_string()));
            }
            Value::Variant { type_name, .. } => {
                return registry
                    .adt(type_name)
                    .map(TypeDescriptor::Adt)
                    .map_err(|_| MarshalError::UnknownType(type_name.clone()));
            }
            Value::Fan(l, _) => value = l.as_ref(),
        }
    }
}

enum Build<'v> {
    Visit(&'v Value),
    Ctr { name: String, argc: usize },
    Sup,
}

/// Lower a host value to a term, checked against `descriptor` at the root
/// and against the registry at every constructor.
pub fn to_term(
    value: &Value,
    descriptor: &TypeDescriptor,
    registry: &TypeRegistry,
) -> Result<Term, MarshalError> {
    check_root(value, descriptor)?;

    let mut work = vec![Build::Visit(value)];
    let mut out: Vec<Term> = Vec::new();
    while let Some(step) = work.pop() {
        match step {
            Build::Visit(Value::Num(num)) => {
                check_num(*num)?;
                out.push(Term::Num(*num));
            }
            Build::Visit(Value::Variant {
                type_name,
                ctr_name,
                fields,
            }) => {
                let schema = registry
                    .adt(type_name)
                    .map_err(|_| MarshalError::UnknownType(type_name.clone()))?;
                let ctr = schema.ctor(ctr_name).ok_or_else(|| {
                    MarshalError::UnknownVariant {
                        type_name: type_name.clone(),
                        ctr_name: ctr_name.clone(),
                    }
                })?;
                if fields.len() != ctr.arity() {
                    return Err(MarshalError::FieldCount {
                        ctr: schema.full_name(ctr),
                        expected: ctr.arity(),
                        got: fields.len(),
                    });
                }
                work.push(Build::Ctr {
                    name: schema.full_name(ctr),
                    argc: fields.len(),
                });
                for field in fields.iter().rev() {
                    work.push(Build::Visit(field));
                }
            }
            Build::Visit(Value::Fan(l, r)) => {
                work.push(Build::Sup);
                work.push(Build::Visit(r.as_ref()));
                work.push(Build::Visit(l.as_ref()));
            }
            Build::Ctr { name, argc } => {
                // Every queued field pushed exactly one term.
                let args = out.split_off(out.len() - argc);
                out.push(Term::Ctr { name, args });
            }
            Build::Sup => match (out.pop(), out.pop()) {
                (Some(r), Some(l)) => out.push(Term::sup(l, r)),
                _ => unreachable!("sup halves already lowered"),
            },
        }
    }
    match out.pop() {
        Some(term) => Ok(term),
        None => unreachable!("root value always lowers to one term"),
    }
}

enum Parse<'t> {
    Visit(&'t Term),
    Variant {
        type_name: String,
        ctr_name: String,
        argc: usize,
    },
    Fan,
}

pub(super) fn resolve_ctr(
    name: &str,
    registry: &TypeRegistry,
) -> Result<(Arc<AdtSchema>, String), MarshalError> {
    if let Some((type_name, short)) = name.split_once('/') {
        let schema = registry
            .adt(type_name)
            .map_err(|_| MarshalError::UnknownType(type_name.to_string()))?;
        if schema.ctor(short).is_none() {
            return Err(MarshalError::UnknownVariant {
                type_name: type_name.to_string(),
                ctr_name: short.to_string(),
            });
        }
        Ok((schema, short.to_string()))
    } else {
        let schema = registry
            .adt_of_ctor(name)
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))?;
        Ok((schema, name.to_string()))
    }
}

/// Lift a reduced term back into a host value, checked against `descriptor`
/// at the root. The whole term is converted eagerly.
pub fn from_term(
    term: &Term,
    descriptor: &TypeDescriptor,
    registry: &TypeRegistry,
) -> Result<Value, MarshalError> {
    let value = lift(term, registry)?;
    check_root(&value, descriptor)?;
    Ok(value)
}

/// Lift without a root descriptor check, for results whose type is carried
/// by the term itself.
pub(crate) fn lift(term: &Term, registry: &TypeRegistry) -> Result<Value, MarshalError> {
    let mut work = vec![Parse::Visit(term)];
    let mut out: Vec<Value> = Vec::new();
    while let Some(step) = work.pop() {
        match step {
            Parse::Visit(Term::Num(num)) => {
                check_num(*num)?;
                out.push(Value::Num(*num));
            }
            Parse::Visit(Term::Ctr { name, args }) => {
                let (schema, ctr_name) = resolve_ctr(name, registry)?;
                let ctr = match schema.ctor(&ctr_name) {
                    Some(ctr) => ctr,
                    None => unreachable!("resolve_ctr checked the constructor"),
                };
                if args.len() != ctr.arity() {
                    return Err(MarshalError::FieldCount {
                        ctr: schema.full_name(ctr),
                        expected: ctr.arity(),
                        got: args.len(),
                    });
                }
                work.push(Parse::Variant {
                    type_name: schema.name.clone(),
                    ctr_name,
                    argc: args.len(),
                });
                for arg in args.iter().rev() {
                    work.push(Parse::Visit(arg));
                }
            }
            Parse::Visit(Term::Sup(l, r)) => {
                work.push(Parse::Fan);
                work.push(Parse::Visit(r.as_ref()));
                work.push(Parse::Visit(l.as_ref()));
            }
            Parse::Visit(other) => {
                return Err(MarshalError::Unreduced(other.kind()));
            }
            Parse::Variant {
                type_name,
                ctr_name,
                argc,
            } => {
                let fields = out.split_off(out.len() - argc);
                out.push(Value::Variant {
                    type_name,
                    ctr_name,
                    fields,
                });
            }
            Parse::Fan => match (out.pop(), out.pop()) {
                (Some(r), Some(l)) => out.push(Value::fan(l, r)),
                _ => unreachable!("fan halves already lifted"),
            },
        }
    }
    match out.pop() {
        Some(value) => Ok(value),
        None => unreachable!("root term always lifts to one value"),
    }
}

/// Wrap a reduced term in a lazy view over `schema`. Nothing is converted
/// until the view is forced.
pub fn lazy_view(term: Term, schema: Arc<AdtSchema>, registry: Arc<TypeRegistry>) -> LazyAdtView {
    LazyAdtView::new(term, schema, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{list_schema, tree_schema};

    fn registry() -> Arc<TypeRegistry> {
        let mut reg = TypeRegistry::new();
        reg.register_adt(list_schema()).expect("list");
        reg.register_adt(tree_schema()).expect("tree");
        Arc::new(reg)
    }

    #[test]
    fn scalar_round_trip() {
        let reg = registry();
        let desc = reg.resolve("u24").expect("u24");
        let term = to_term(&Value::u24(42), &desc, &reg).expect("lower");
        assert_eq!(term, Term::u24(42));
        let back = from_term(&term, &desc, &reg).expect("lift");
        assert_eq!(back, Value::u24(42));
    }

    #[test]
    fn out_of_range_scalar_is_rejected() {
        let reg = registry();
        let desc = reg.resolve("u24").expect("u24");
        let err = to_term(&Value::u24(0x100_0000), &desc, &reg).unwrap_err();
        assert!(matches!(err, MarshalError::Range { .. }));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let reg = registry();
        let desc = reg.resolve("u24").expect("u24");
        let err = to_term(&Value::i24(-3), &desc, &reg).unwrap_err();
        assert!(matches!(err, MarshalError::TypeMismatch { .. }));
    }

    #[test]
    fn variant_lowers_to_full_constructor_names() {
        let reg = registry();
        let desc = reg.resolve("List").expect("List");
        let value = Value::list(vec![Value::u24(7)]);
        let term = to_term(&value, &desc, &reg).expect("lower");
        assert_eq!(
            term,
            Term::ctr(
                "List/Cons",
                vec![Term::u24(7), Term::ctr("List/Nil", vec![])]
            )
        );
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let reg = registry();
        let desc = reg.resolve("List").expect("List");
        let bad = Value::variant("List", "Cons", vec![Value::u24(1)]);
        let err = to_term(&bad, &desc, &reg).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::FieldCount {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn unknown_constructor_is_rejected() {
        let reg = registry();
        let desc = reg.resolve("List").expect("List");
        let bad = Value::variant("List", "Snoc", vec![]);
        let err = to_term(&bad, &desc, &reg).unwrap_err();
        assert!(matches!(err, MarshalError::UnknownVariant { .. }));
    }

    #[test]
    fn sup_lifts_to_fan() {
        let reg = registry();
        let desc = reg.resolve("u24").expect("u24");
        let term = Term::sup(Term::u24(1), Term::u24(2));
        let value = from_term(&term, &desc, &reg).expect("lift");
        assert_eq!(value, Value::fan(Value::u24(1), Value::u24(2)));
    }

    #[test]
    fn unreduced_terms_are_reported() {
        let reg = registry();
        let desc = reg.resolve("u24").expect("u24");
        let term = Term::app(Term::r#ref("main"), vec![]);
        let err = from_term(&term, &desc, &reg).unwrap_err();
        assert!(matches!(err, MarshalError::Unreduced("application")));
    }

    #[test]
    fn deep_list_round_trips_without_recursion() {
        let reg = registry();
        let desc = reg.resolve("List").expect("List");
        let value = Value::list((0..10_000).map(Value::u24).collect());
        let term = to_term(&value, &desc, &reg).expect("lower");
        let back = from_term(&term, &desc, &reg).expect("lift");
        assert_eq!(back, value);
    }

    #[test]
    fn infer_descriptor_from_shape() {
        let reg = registry();
        let desc = infer_descriptor(&Value::u24(1), &reg).expect("scalar");
        assert_eq!(desc.name(), "u24");
        let desc =
            infer_descriptor(&Value::variant("Tree", "Leaf", vec![Value::u24(1)]), &reg)
                .expect("adt");
        assert_eq!(desc.name(), "Tree");
        let err = infer_descriptor(&Value::variant("Gone", "X", vec![]), &reg).unwrap_err();
        assert!(matches!(err, MarshalError::UnknownType(_)));
    }
}
