//! Declaration-surface scanner for book source
//!
//! The loader reads just enough of the grammar to know what a book
//! declares: `type Name:` blocks with their constructor lines and
//! `def name(params):` headers. Everything indented under a `def` is an
//! opaque body owned by the external evaluator.
//!
//! ```text
//! type Tree:
//!   Node { val, ~left, ~right }
//!   Leaf
//!
//! def sum(tree: Tree) -> u24:
//!   ...body is not parsed...
//! ```

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::book::{Book, Def, ParamSpec};
use crate::types::{AdtSchema, ConstructorSpec, FieldSpec, RegistryError, TypeRegistry};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to read book file: {0}")]
    Io(#[from] std::io::Error),
}

fn parse_error(line: usize, message: impl Into<String>) -> LoadError {
    LoadError::Parse {
        line,
        message: message.into(),
    }
}

// Which top-level block the scanner is inside.
enum Block {
    Idle,
    Type(AdtSchema),
    Def,
}

pub(super) fn load(source: &str) -> Result<Book, LoadError> {
    let mut registry = TypeRegistry::new();
    let mut defs: IndexMap<String, Def> = IndexMap::new();
    let mut block = Block::Idle;

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let stripped = strip_comment(raw);
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indented = raw.starts_with(' ') || raw.starts_with('\t');

        if !indented {
            if let Block::Type(schema) = std::mem::replace(&mut block, Block::Idle) {
                registry.register_adt(schema)?;
            }
            if let Some(rest) = trimmed.strip_prefix("type ") {
                let name = parse_type_header(rest, line)?;
                block = Block::Type(AdtSchema::new(name, vec![]));
            } else if trimmed.starts_with("def ") {
                let def = parse_def_header(trimmed, line)?;
                if defs.contains_key(def.name()) {
                    return Err(LoadError::DuplicateDefinition(def.name().to_string()));
                }
                defs.insert(def.name().to_string(), def);
                block = Block::Def;
            } else {
                return Err(parse_error(
                    line,
                    format!("expected `type` or `def`, found `{trimmed}`"),
                ));
            }
        } else {
            match &mut block {
                Block::Type(schema) => {
                    let ctr = parse_ctor_line(trimmed, line)?;
                    if schema.ctrs.iter().any(|c| c.name == ctr.name) {
                        return Err(parse_error(
                            line,
                            format!("constructor `{}` declared twice", ctr.name),
                        ));
                    }
                    schema.ctrs.push(ctr);
                }
                // Opaque body line; the evaluator parses these.
                Block::Def => {}
                Block::Idle => {
                    return Err(parse_error(line, "indented line outside any block"));
                }
            }
        }
    }
    if let Block::Type(schema) = block {
        registry.register_adt(schema)?;
    }

    // Annotations may name types declared anywhere in the file, so they
    // are resolved only once the whole surface is scanned.
    for def in defs.values() {
        for param in def.params() {
            if let Some(ann) = &param.annotation {
                registry.resolve(ann)?;
            }
        }
        if let Some(ann) = def.result_annotation() {
            registry.resolve(ann)?;
        }
    }

    debug!(
        defs = defs.len(),
        types = registry.adt_names().count(),
        "loaded book"
    );
    Ok(Book::from_parts(source.to_string(), registry, defs))
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn check_ident(s: &str, what: &str, line: usize) -> Result<(), LoadError> {
    let mut chars = s.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(parse_error(line, format!("invalid {what} name: `{s}`")))
    }
}

fn parse_type_header(rest: &str, line: usize) -> Result<String, LoadError> {
    let name = rest
        .trim()
        .strip_suffix(':')
        .ok_or_else(|| parse_error(line, "type header must end with `:`"))?
        .trim();
    check_ident(name, "type", line)?;
    Ok(name.to_string())
}

fn parse_ctor_line(trimmed: &str, line: usize) -> Result<ConstructorSpec, LoadError> {
    let Some((name, rest)) = trimmed.split_once('{') else {
        check_ident(trimmed, "constructor", line)?;
        return Ok(ConstructorSpec::unit(trimmed));
    };
    let name = name.trim();
    check_ident(name, "constructor", line)?;
    let inner = rest
        .trim()
        .strip_suffix('}')
        .ok_or_else(|| parse_error(line, "unclosed `{` in constructor fields"))?;
    let mut fields = Vec::new();
    for piece in inner.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(parse_error(line, "empty field in constructor"));
        }
        let (field_name, recursive) = match piece.strip_prefix('~') {
            Some(rest) => (rest.trim(), true),
            None => (piece, false),
        };
        check_ident(field_name, "field", line)?;
        fields.push(FieldSpec {
            name: field_name.to_string(),
            recursive,
        });
    }
    Ok(ConstructorSpec::with_fields(name, fields))
}

fn parse_def_header(trimmed: &str, line: usize) -> Result<Def, LoadError> {
    let rest = match trimmed.strip_prefix("def ") {
        Some(rest) => rest,
        None => unreachable!("caller matched the `def ` prefix"),
    };
    let head = rest
        .trim()
        .strip_suffix(':')
        .ok_or_else(|| parse_error(line, "def header must end with `:`"))?;

    let open = head
        .find('(')
        .ok_or_else(|| parse_error(line, "def header missing `(`"))?;
    let close = head
        .rfind(')')
        .ok_or_else(|| parse_error(line, "def header missing `)`"))?;
    if close < open {
        return Err(parse_error(line, "mismatched parentheses in def header"));
    }
    let name = head[..open].trim();
    check_ident(name, "definition", line)?;

    let mut params = Vec::new();
    let params_src = head[open + 1..close].trim();
    if !params_src.is_empty() {
        for piece in params_src.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(parse_error(line, "empty parameter in def header"));
            }
            let (param_name, annotation) = match piece.split_once(':') {
                Some((n, ann)) => {
                    let ann = ann.trim();
                    check_ident(ann, "type", line)?;
                    (n.trim(), Some(ann.to_string()))
                }
                None => (piece, None),
            };
            check_ident(param_name, "parameter", line)?;
            params.push(ParamSpec {
                name: param_name.to_string(),
                annotation,
            });
        }
    }

    let tail = head[close + 1..].trim();
    let result = if tail.is_empty() {
        None
    } else {
        let ann = tail
            .strip_prefix("->")
            .ok_or_else(|| parse_error(line, "expected `->` before result type"))?
            .trim();
        check_ident(ann, "type", line)?;
        Some(ann.to_string())
    };

    Ok(Def::new(name.to_string(), params, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = "\
# sorting demo
type List:
  Cons { head, ~tail }
  Nil

def sort(xs: List) -> List:
  ...

def add(a: u24, b: u24) -> u24:
  ...

def main():
  ...
";

    #[test]
    fn loads_types_and_defs() {
        let book = load(BOOK).expect("load");
        assert_eq!(book.def_names().collect::<Vec<_>>(), ["sort", "add", "main"]);
        let list = book.adt("List").expect("List declared");
        assert_eq!(list.ctrs.len(), 2);
        assert!(list.ctrs[0].fields[1].recursive);
    }

    #[test]
    fn def_headers_carry_annotations_and_arity() {
        let book = load(BOOK).expect("load");
        let add = book.def_entry("add").expect("add");
        assert_eq!(add.arity(), 2);
        assert_eq!(add.params()[0].annotation.as_deref(), Some("u24"));
        assert_eq!(add.result_annotation(), Some("u24"));
        let main = book.def_entry("main").expect("main");
        assert_eq!(main.arity(), 0);
        assert_eq!(main.result_annotation(), None);
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let src = "def f(x):\n  ...\ndef f(y):\n  ...\n";
        let err = load(src).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateDefinition(name) if name == "f"));
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let src = "type List:\n  Cons { head, ~tail }\n\nwhat is this\n";
        let err = load(src).unwrap_err();
        let LoadError::Parse { line, .. } = err else {
            panic!("expected parse error, got {err}");
        };
        assert_eq!(line, 4);
    }

    #[test]
    fn unknown_annotation_is_rejected() {
        let src = "def f(x: Widget):\n  ...\n";
        let err = load(src).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Registry(RegistryError::UnknownType(name)) if name == "Widget"
        ));
    }

    #[test]
    fn annotations_may_reference_later_types() {
        let src = "def first(xs: List) -> List:\n  ...\n\ntype List:\n  Cons { head, ~tail }\n  Nil\n";
        load(src).expect("forward reference resolves");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let src = "# header\n\ntype T:  # trailing\n  A { x }\n\n  B\n";
        let book = load(src).expect("load");
        let t = book.adt("T").expect("T");
        assert_eq!(t.ctrs.len(), 2);
    }

    #[test]
    fn loading_is_idempotent() {
        let a = load(BOOK).expect("first");
        let b = load(BOOK).expect("second");
        assert_eq!(
            a.def_names().collect::<Vec<_>>(),
            b.def_names().collect::<Vec<_>>()
        );
        assert_eq!(a.adt("List").expect("a"), b.adt("List").expect("b"));
    }
}
