//! Books: loaded Weft modules
//!
//! A [`Book`] is the parsed declaration surface of a `.weft` source file:
//! its ADT schemas (in a book-scoped [`TypeRegistry`]) and its definition
//! headers. Function bodies stay opaque; the full source text is retained
//! for the external evaluator. Books are immutable once loaded, apart from
//! backend selection.

mod loader;

pub use loader::LoadError;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use crate::term::{Backend, EvalError, Evaluator, Term};
use crate::types::{AdtSchema, RegistryError, TypeRegistry};

/// One declared parameter of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    /// Declared type name, when the header carries one (`x: u24`).
    pub annotation: Option<String>,
}

/// A definition header: name, parameters, optional result annotation, and
/// the lazily-bound compiled-term handle.
#[derive(Debug)]
pub struct Def {
    name: String,
    params: Vec<ParamSpec>,
    result: Option<String>,
    handle: OnceLock<Term>,
}

impl Def {
    pub(crate) fn new(name: String, params: Vec<ParamSpec>, result: Option<String>) -> Self {
        Self {
            name,
            params,
            result,
            handle: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn result_annotation(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// The compiled-term handle, binding through the evaluator on first use.
    pub(crate) fn handle(&self, evaluator: &dyn Evaluator) -> Result<Term, EvalError> {
        if let Some(term) = self.handle.get() {
            return Ok(term.clone());
        }
        let term = evaluator.bind(&self.name)?;
        Ok(self.handle.get_or_init(|| term).clone())
    }
}

/// An immutable, loaded book.
#[derive(Debug)]
pub struct Book {
    source: String,
    registry: Arc<TypeRegistry>,
    defs: IndexMap<String, Def>,
    backend: Backend,
}

impl Book {
    /// Parse book source text.
    pub fn load(source: &str) -> Result<Self, LoadError> {
        loader::load(source)
    }

    /// Read and parse a `.weft` file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path)?;
        Self::load(&source)
    }

    /// The verbatim source text, as handed to the evaluator.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Look up a declared ADT schema.
    pub fn adt(&self, name: &str) -> Result<Arc<AdtSchema>, RegistryError> {
        self.registry.adt(name)
    }

    pub(crate) fn def_entry(&self, name: &str) -> Option<&Def> {
        self.defs.get(name)
    }

    pub fn defs(&self) -> impl Iterator<Item = &Def> {
        self.defs.values()
    }

    pub fn def_names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Which reducer `invoke` asks the evaluator to use.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.backend = backend;
    }

    pub(crate) fn from_parts(
        source: String,
        registry: TypeRegistry,
        defs: IndexMap<String, Def>,
    ) -> Self {
        Self {
            source,
            registry: Arc::new(registry),
            defs,
            backend: Backend::default(),
        }
    }
}
