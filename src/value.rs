//! Host-side runtime values
//!
//! A [`Value`] is what the host hands to (and receives from) the bridge:
//! a 24-bit scalar, a tagged variant of a declared ADT, or a superposed
//! [`Value::Fan`] pair.

use serde::{Deserialize, Serialize};

/// A 24-bit scalar in the runtime's native numeric encodings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Num {
    U24(u32),
    I24(i32),
    F24(f32),
}

impl std::fmt::Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Num::U24(v) => write!(f, "{}", v),
            Num::I24(v) => write!(f, "{:+}", v),
            Num::F24(v) => write!(f, "{:?}", v),
        }
    }
}

/// Unsigned 24-bit scalar wrapper.
///
/// `new` wraps modulo 2^24; `try_new` rejects out-of-range input. The
/// marshaller always rejects (see `marshal`), so masking only happens when
/// the host asks for it explicitly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct U24(u32);

impl U24 {
    pub const MAX: u32 = 0xff_ffff;

    pub fn new(value: u32) -> Self {
        Self(value & Self::MAX)
    }

    pub fn try_new(value: u32) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Debug for U24 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for U24 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for U24 {
    fn from(value: u32) -> Self {
        U24::new(value)
    }
}

impl From<U24> for u32 {
    fn from(value: U24) -> Self {
        value.0
    }
}

impl std::ops::Add for U24 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        U24::new(self.0.wrapping_add(other.0))
    }
}

impl std::ops::Sub for U24 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        U24::new(self.0.wrapping_sub(other.0))
    }
}

impl std::ops::Mul for U24 {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        U24::new(self.0.wrapping_mul(other.0))
    }
}

/// Signed 24-bit scalar wrapper (two's complement).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct I24(i32);

impl I24 {
    pub const MAX: i32 = 0x7f_ffff;
    pub const MIN: i32 = -0x80_0000;

    /// Wraps into the 24-bit two's-complement range.
    pub fn new(value: i32) -> Self {
        let masked = value & 0xff_ffff;
        if masked > Self::MAX {
            Self(masked - 0x100_0000)
        } else {
            Self(masked)
        }
    }

    pub fn try_new(value: i32) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Debug for I24 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for I24 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for I24 {
    fn from(value: i32) -> Self {
        I24::new(value)
    }
}

impl std::ops::Add for I24 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        I24::new(self.0.wrapping_add(other.0))
    }
}

impl std::ops::Sub for I24 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        I24::new(self.0.wrapping_sub(other.0))
    }
}

/// A host value that crosses the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A scalar number.
    Num(Num),

    /// An instance of a declared ADT constructor, fields in schema order.
    Variant {
        type_name: String,
        ctr_name: String,
        fields: Vec<Value>,
    },

    /// A superposed pair of alternative values, evaluated in one call.
    Fan(Box<Value>, Box<Value>),
}

impl Value {
    pub fn u24(value: u32) -> Self {
        Value::Num(Num::U24(value))
    }

    pub fn i24(value: i32) -> Self {
        Value::Num(Num::I24(value))
    }

    pub fn f24(value: f32) -> Self {
        Value::Num(Num::F24(value))
    }

    /// Build a variant instance with positional fields.
    pub fn variant(
        type_name: impl Into<String>,
        ctr_name: impl Into<String>,
        fields: Vec<Value>,
    ) -> Self {
        Value::Variant {
            type_name: type_name.into(),
            ctr_name: ctr_name.into(),
            fields,
        }
    }

    pub fn fan(left: Value, right: Value) -> Self {
        Value::Fan(Box::new(left), Box::new(right))
    }

    /// Build a cons-list instance of the builtin `List` ADT.
    pub fn list(items: Vec<Value>) -> Self {
        let mut out = Value::variant("List", "Nil", vec![]);
        for item in items.into_iter().rev() {
            out = Value::variant("List", "Cons", vec![item, out]);
        }
        out
    }

    /// The scalar inside, if this is a number.
    pub fn as_num(&self) -> Option<Num> {
        match self {
            Value::Num(num) => Some(*num),
            _ => None,
        }
    }

    /// The `u24` payload, if this is an unsigned scalar.
    pub fn as_u24(&self) -> Option<u32> {
        match self {
            Value::Num(Num::U24(v)) => Some(*v),
            _ => None,
        }
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::u24(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::i24(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::f24(value)
    }
}

impl From<U24> for Value {
    fn from(value: U24) -> Self {
        Value::u24(value.get())
    }
}

impl From<I24> for Value {
    fn from(value: I24) -> Self {
        Value::i24(value.get())
    }
}
