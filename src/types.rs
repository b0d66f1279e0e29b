//! Type registry for book-declared types
//!
//! Every `Book` owns one [`TypeRegistry`]. It maps scalar names to widths
//! and ADT names to [`AdtSchema`]s, and keeps a constructor index so a bare
//! constructor name (`Cons` or `List/Cons`) resolves back to its type.
//! There are no process-global registries; two books never share one.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("conflicting schema for `{name}`: {reason}")]
    ConflictingSchema { name: String, reason: String },

    #[error("invalid width for scalar `{name}`: {bits} bits (the carrier is 24)")]
    InvalidWidth { name: String, bits: u8 },
}

// ============================================================================
// Scalars
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Uint,
    Int,
    Float,
}

/// A named fixed-width scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarType {
    pub name: String,
    pub bits: u8,
    pub kind: ScalarKind,
}

impl ScalarType {
    pub fn new(name: impl Into<String>, bits: u8, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            bits,
            kind,
        }
    }

    /// Inclusive upper bound for unsigned scalars of this width.
    pub fn unsigned_max(&self) -> u32 {
        (1u32 << self.bits) - 1
    }

    /// Inclusive signed bounds for this width.
    pub fn signed_range(&self) -> (i32, i32) {
        let half = 1i32 << (self.bits - 1);
        (-half, half - 1)
    }
}

// ============================================================================
// ADT schemas
// ============================================================================

/// A constructor field. `recursive` marks a `~field` in book syntax: the
/// field holds a value of the enclosing type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub recursive: bool,
}

impl FieldSpec {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recursive: false,
        }
    }

    pub fn recursive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recursive: true,
        }
    }
}

/// One constructor of an ADT, fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl ConstructorSpec {
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![],
        }
    }

    pub fn with_fields(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

/// The shape of a list-like ADT: exactly one nullary terminator and one
/// constructor carrying one payload field plus one recursive tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListShape {
    pub cons_index: usize,
    pub nil_index: usize,
    pub head_index: usize,
    pub tail_index: usize,
}

/// An algebraic data type declared in a book's `type` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdtSchema {
    pub name: String,
    pub ctrs: Vec<ConstructorSpec>,
}

impl AdtSchema {
    pub fn new(name: impl Into<String>, ctrs: Vec<ConstructorSpec>) -> Self {
        Self {
            name: name.into(),
            ctrs,
        }
    }

    pub fn ctor(&self, name: &str) -> Option<&ConstructorSpec> {
        let name = self.short_name(name);
        self.ctrs.iter().find(|c| c.name == name)
    }

    pub fn ctor_index(&self, name: &str) -> Option<usize> {
        let name = self.short_name(name);
        self.ctrs.iter().position(|c| c.name == name)
    }

    /// Constructor full name, `Type/Ctor`.
    pub fn full_name(&self, ctr: &ConstructorSpec) -> String {
        format!("{}/{}", self.name, ctr.name)
    }

    /// Strips a `Type/` qualifier when it names this type.
    fn short_name<'a>(&self, name: &'a str) -> &'a str {
        match name.split_once('/') {
            Some((type_name, short)) if type_name == self.name => short,
            _ => name,
        }
    }

    /// Detects the cons/nil shape used by `to_list` and the list iterator.
    pub fn list_shape(&self) -> Option<ListShape> {
        if self.ctrs.len() != 2 {
            return None;
        }
        let nil_index = self.ctrs.iter().position(|c| c.fields.is_empty())?;
        let cons_index = 1 - nil_index;
        let cons = &self.ctrs[cons_index];
        if cons.fields.len() != 2 {
            return None;
        }
        let tail_index = cons.fields.iter().position(|f| f.recursive)?;
        let head_index = 1 - tail_index;
        if cons.fields[head_index].recursive {
            return None;
        }
        Some(ListShape {
            cons_index,
            nil_index,
            head_index,
            tail_index,
        })
    }

    fn validate(&self) -> Result<(), RegistryError> {
        for (i, ctr) in self.ctrs.iter().enumerate() {
            if self.ctrs[..i].iter().any(|c| c.name == ctr.name) {
                return Err(RegistryError::ConflictingSchema {
                    name: self.name.clone(),
                    reason: format!("constructor `{}` declared twice", ctr.name),
                });
            }
        }
        Ok(())
    }
}

/// Builtin cons-list schema: `Cons { head, ~tail } | Nil`.
pub fn list_schema() -> AdtSchema {
    AdtSchema::new(
        "List",
        vec![
            ConstructorSpec::with_fields(
                "Cons",
                vec![FieldSpec::plain("head"), FieldSpec::recursive("tail")],
            ),
            ConstructorSpec::unit("Nil"),
        ],
    )
}

/// Builtin binary tree schema: `Node { ~left, ~right } | Leaf { value }`.
pub fn tree_schema() -> AdtSchema {
    AdtSchema::new(
        "Tree",
        vec![
            ConstructorSpec::with_fields(
                "Node",
                vec![FieldSpec::recursive("left"), FieldSpec::recursive("right")],
            ),
            ConstructorSpec::with_fields("Leaf", vec![FieldSpec::plain("value")]),
        ],
    )
}

// ============================================================================
// Registry
// ============================================================================

/// A resolved type: either a scalar width or a shared ADT schema.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    Adt(Arc<AdtSchema>),
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Scalar(s) => &s.name,
            TypeDescriptor::Adt(schema) => &schema.name,
        }
    }
}

/// Book-scoped name resolution for scalars and ADTs.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    scalars: IndexMap<String, ScalarType>,
    adts: IndexMap<String, Arc<AdtSchema>>,
    // constructor name (short form) -> owning type name
    ctr_index: IndexMap<String, String>,
}

impl TypeRegistry {
    /// An empty registry preloaded with the builtin scalars.
    pub fn new() -> Self {
        let mut reg = Self::default();
        reg.scalars.insert(
            "u24".to_string(),
            ScalarType::new("u24", 24, ScalarKind::Uint),
        );
        reg.scalars.insert(
            "i24".to_string(),
            ScalarType::new("i24", 24, ScalarKind::Int),
        );
        reg.scalars.insert(
            "f24".to_string(),
            ScalarType::new("f24", 24, ScalarKind::Float),
        );
        reg
    }

    /// Register an unsigned scalar of the given width. Widths run from 1 to
    /// the 24-bit carrier; identical re-registration is a no-op.
    pub fn register_scalar(&mut self, name: &str, bits: u8) -> Result<(), RegistryError> {
        if bits == 0 || bits > 24 {
            return Err(RegistryError::InvalidWidth {
                name: name.to_string(),
                bits,
            });
        }
        let scalar = ScalarType::new(name, bits, ScalarKind::Uint);
        if let Some(existing) = self.scalars.get(name) {
            if *existing == scalar {
                return Ok(());
            }
            return Err(RegistryError::ConflictingSchema {
                name: name.to_string(),
                reason: format!("already registered as {} bits", existing.bits),
            });
        }
        if self.adts.contains_key(name) {
            return Err(RegistryError::ConflictingSchema {
                name: name.to_string(),
                reason: "already registered as an ADT".to_string(),
            });
        }
        self.scalars.insert(name.to_string(), scalar);
        Ok(())
    }

    /// Register an ADT schema. Re-registering an identical schema is a
    /// no-op; a different shape under the same name is rejected.
    pub fn register_adt(&mut self, schema: AdtSchema) -> Result<(), RegistryError> {
        schema.validate()?;
        if let Some(existing) = self.adts.get(&schema.name) {
            if **existing == schema {
                return Ok(());
            }
            return Err(RegistryError::ConflictingSchema {
                name: schema.name.clone(),
                reason: "a different shape is already registered under this name".to_string(),
            });
        }
        if self.scalars.contains_key(&schema.name) {
            return Err(RegistryError::ConflictingSchema {
                name: schema.name.clone(),
                reason: "already registered as a scalar".to_string(),
            });
        }
        for ctr in &schema.ctrs {
            if let Some(owner) = self.ctr_index.get(&ctr.name) {
                if owner != &schema.name {
                    return Err(RegistryError::ConflictingSchema {
                        name: schema.name.clone(),
                        reason: format!(
                            "constructor `{}` already belongs to `{}`",
                            ctr.name, owner
                        ),
                    });
                }
            }
        }
        for ctr in &schema.ctrs {
            self.ctr_index.insert(ctr.name.clone(), schema.name.clone());
        }
        self.adts.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Look up a type by name.
    pub fn resolve(&self, name: &str) -> Result<TypeDescriptor, RegistryError> {
        if let Some(scalar) = self.scalars.get(name) {
            return Ok(TypeDescriptor::Scalar(scalar.clone()));
        }
        if let Some(schema) = self.adts.get(name) {
            return Ok(TypeDescriptor::Adt(Arc::clone(schema)));
        }
        Err(RegistryError::UnknownType(name.to_string()))
    }

    /// Look up an ADT schema by type name.
    pub fn adt(&self, name: &str) -> Result<Arc<AdtSchema>, RegistryError> {
        self.adts
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    /// Resolve a constructor name (`Cons` or `List/Cons`) to its schema.
    pub fn adt_of_ctor(&self, ctr_name: &str) -> Option<Arc<AdtSchema>> {
        if let Some((type_name, short)) = ctr_name.split_once('/') {
            let schema = self.adts.get(type_name)?;
            schema.ctor(short)?;
            return Some(Arc::clone(schema));
        }
        let owner = self.ctr_index.get(ctr_name)?;
        self.adts.get(owner).map(Arc::clone)
    }

    pub fn adt_names(&self) -> impl Iterator<Item = &str> {
        self.adts.keys().map(String::as_str)
    }

    pub fn adts(&self) -> impl Iterator<Item = &Arc<AdtSchema>> {
        self.adts.values()
    }

    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalars.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scalars_resolve() {
        let reg = TypeRegistry::new();
        for name in ["u24", "i24", "f24"] {
            let desc = reg.resolve(name).expect("builtin scalar");
            match desc {
                TypeDescriptor::Scalar(s) => assert_eq!(s.bits, 24),
                _ => panic!("expected scalar for {name}"),
            }
        }
    }

    #[test]
    fn register_adt_is_idempotent() {
        let mut reg = TypeRegistry::new();
        reg.register_adt(list_schema()).expect("first registration");
        reg.register_adt(list_schema())
            .expect("identical re-registration");
        assert_eq!(reg.adt_names().count(), 1);
    }

    #[test]
    fn conflicting_shape_is_rejected() {
        let mut reg = TypeRegistry::new();
        reg.register_adt(list_schema()).expect("first registration");
        let other = AdtSchema::new("List", vec![ConstructorSpec::unit("Nil")]);
        let err = reg.register_adt(other).unwrap_err();
        assert!(matches!(err, RegistryError::ConflictingSchema { .. }));
    }

    #[test]
    fn ctor_index_resolves_short_and_full_names() {
        let mut reg = TypeRegistry::new();
        reg.register_adt(tree_schema()).expect("register");
        let by_short = reg.adt_of_ctor("Node").expect("short name");
        let by_full = reg.adt_of_ctor("Tree/Node").expect("full name");
        assert_eq!(by_short.name, "Tree");
        assert_eq!(by_full.name, "Tree");
        assert!(reg.adt_of_ctor("Tree/Missing").is_none());
    }

    #[test]
    fn constructor_collision_across_types_is_rejected() {
        let mut reg = TypeRegistry::new();
        reg.register_adt(list_schema()).expect("register");
        let clash = AdtSchema::new(
            "Queue",
            vec![ConstructorSpec::unit("Nil"), ConstructorSpec::unit("End")],
        );
        let err = reg.register_adt(clash).unwrap_err();
        assert!(matches!(err, RegistryError::ConflictingSchema { .. }));
    }

    #[test]
    fn list_shape_detection() {
        let shape = list_schema().list_shape().expect("list-shaped");
        assert_eq!(shape.head_index, 0);
        assert_eq!(shape.tail_index, 1);
        assert!(tree_schema().list_shape().is_none());
    }

    #[test]
    fn scalar_widths_are_bounded_by_the_carrier() {
        let mut reg = TypeRegistry::new();
        let err = reg.register_scalar("u32", 32).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidWidth { bits: 32, .. }
        ));
        let err = reg.register_scalar("unit", 0).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidWidth { bits: 0, .. }));
        reg.register_scalar("u1", 1).expect("narrowest width");
        reg.register_scalar("word", 24).expect("carrier width");
        assert!(reg.resolve("u32").is_err());
    }

    #[test]
    fn scalar_bounds() {
        let s = ScalarType::new("u24", 24, ScalarKind::Uint);
        assert_eq!(s.unsigned_max(), 0xff_ffff);
        let (lo, hi) = ScalarType::new("i24", 24, ScalarKind::Int).signed_range();
        assert_eq!(lo, -0x80_0000);
        assert_eq!(hi, 0x7f_ffff);
    }
}
