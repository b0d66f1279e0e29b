//! Weftr: a host-side bridge for the Weft graph-reduction runtime
//!
//! Weft programs live in "books": text modules declaring ADTs and
//! definitions. This crate loads a book's declaration surface, exposes its
//! definitions as callable proxies, and converts values between the host
//! and the runtime's term representation. Reduction itself happens behind
//! the [`Evaluator`] trait; the bridge never reduces a term.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Weftr Bridge               │
//! │                                         │
//! │  book      - Declaration-surface loader │
//! │  types     - Book-scoped type registry  │
//! │  marshal   - Value/term conversion      │
//! │  runtime   - Callable invocation        │
//! │  transpile - bend/fork emission         │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │      Weft evaluation (Evaluator)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Book declarations
//!
//! Only type blocks and definition headers are parsed; bodies are opaque:
//!
//! ```text
//! type Tree:
//!   Node { val, ~left, ~right }
//!   Leaf
//!
//! def sum(tree: Tree) -> u24:
//!   ...
//! ```
//!
//! `~field` marks a recursive field; annotations are optional and checked
//! against the book's registry.

pub mod book;
pub mod marshal;
pub mod runtime;
pub mod term;
pub mod transpile;
pub mod types;
pub mod value;

pub use book::{Book, Def, LoadError, ParamSpec};
pub use marshal::{from_term, to_term, LazyAdtView, MarshalError};
pub use runtime::{Callable, InvokeError, Output};
pub use term::{Backend, EvalError, Evaluator, Term};
pub use transpile::{transpile, FnDef, Transpiled, TranspileError};
pub use types::{AdtSchema, RegistryError, TypeDescriptor, TypeRegistry};
pub use value::{Num, Value, I24, U24};
