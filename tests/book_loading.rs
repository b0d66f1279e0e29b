//! Book loading: declaration surface, idempotence, error reporting.

use weftr::book::{Book, LoadError};
use weftr::types::RegistryError;

const SORT_BOOK: &str = "\
type List:
  Cons { head, ~tail }
  Nil

def sort(xs: List) -> List:
  match xs:
    case List/Nil:
      return List/Nil
    case List/Cons:
      return insert(xs.head, sort(xs.tail))

def insert(v, xs):
  return xs

def main():
  return sort([5, 3, 1, 4, 2])
";

#[test]
fn declaration_surface_is_parsed() {
    let book = Book::load(SORT_BOOK).expect("load");
    assert_eq!(
        book.def_names().collect::<Vec<_>>(),
        ["sort", "insert", "main"]
    );

    let list = book.adt("List").expect("List");
    assert_eq!(list.ctrs[0].name, "Cons");
    assert_eq!(list.ctrs[0].fields[0].name, "head");
    assert!(!list.ctrs[0].fields[0].recursive);
    assert!(list.ctrs[0].fields[1].recursive);
    assert_eq!(list.ctrs[1].name, "Nil");
}

#[test]
fn bodies_are_retained_verbatim() {
    let book = Book::load(SORT_BOOK).expect("load");
    assert_eq!(book.source(), SORT_BOOK);
}

#[test]
fn loading_is_idempotent() {
    let a = Book::load(SORT_BOOK).expect("first");
    let b = Book::load(SORT_BOOK).expect("second");
    assert_eq!(
        a.def_names().collect::<Vec<_>>(),
        b.def_names().collect::<Vec<_>>()
    );
    assert_eq!(a.adt("List").expect("a"), b.adt("List").expect("b"));
    let sort_a = a.def("sort").expect("a.sort");
    let sort_b = b.def("sort").expect("b.sort");
    assert_eq!(sort_a.arity(), sort_b.arity());
}

#[test]
fn duplicate_definitions_are_rejected() {
    let src = "def twice(x):\n  return x\n\ndef twice(y):\n  return y\n";
    let err = Book::load(src).unwrap_err();
    assert!(matches!(err, LoadError::DuplicateDefinition(name) if name == "twice"));
}

#[test]
fn conflicting_type_blocks_are_rejected() {
    let src = "\
type Shape:
  Circle { r }

type Shape:
  Square { side }
";
    let err = Book::load(src).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Registry(RegistryError::ConflictingSchema { .. })
    ));
}

#[test]
fn identical_type_blocks_are_tolerated() {
    let src = "\
type Pair:
  Two { a, b }

type Pair:
  Two { a, b }
";
    let book = Book::load(src).expect("identical redeclaration");
    assert_eq!(book.adt("Pair").expect("Pair").ctrs.len(), 1);
}

#[test]
fn stray_top_level_text_reports_its_line() {
    let src = "def ok(x):\n  return x\n\n???\n";
    let err = Book::load(src).unwrap_err();
    let LoadError::Parse { line, .. } = err else {
        panic!("expected parse error, got {err}");
    };
    assert_eq!(line, 4);
}

#[test]
fn annotations_must_name_known_types() {
    let src = "def f(x: Missing) -> u24:\n  return x\n";
    let err = Book::load(src).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Registry(RegistryError::UnknownType(name)) if name == "Missing"
    ));
}

#[test]
fn missing_file_surfaces_io_error() {
    let err = Book::load_file("/nonexistent/book.weft").unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}
