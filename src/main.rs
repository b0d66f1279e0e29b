//! Weftr CLI - tools for working with Weft books
//!
//! Commands:
//!   weftr inspect <book.weft>  - Display a book's declaration surface

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use weftr::{Book, Def};

#[derive(Parser)]
#[command(name = "weftr")]
#[command(about = "Tools for working with Weft books", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a book and display its types and definitions
    Inspect {
        /// Path to the .weft file
        book_file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { book_file, json } => inspect_command(&book_file, json),
    }
}

fn inspect_command(book_file: &PathBuf, json: bool) -> anyhow::Result<()> {
    let book = Book::load_file(book_file)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", book_file.display(), e))?;

    if json {
        print_json(&book)?;
    } else {
        print_book(&book);
    }
    Ok(())
}

fn print_book(book: &Book) {
    println!("Book: {} definitions", book.defs().count());
    println!();

    let registry = book.registry();
    let adts: Vec<_> = registry.adts().collect();
    if !adts.is_empty() {
        println!("Types:");
        for schema in adts {
            println!("  type {}:", schema.name);
            for ctr in &schema.ctrs {
                println!("    {}", format_ctor(ctr));
            }
        }
        println!();
    }

    println!("Definitions:");
    for def in book.defs() {
        println!("  {}", format_def(def));
    }
}

fn format_ctor(ctr: &weftr::types::ConstructorSpec) -> String {
    if ctr.fields.is_empty() {
        return ctr.name.clone();
    }
    let fields = ctr
        .fields
        .iter()
        .map(|f| {
            if f.recursive {
                format!("~{}", f.name)
            } else {
                f.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {{ {} }}", ctr.name, fields)
}

fn format_def(def: &Def) -> String {
    let params = def
        .params()
        .iter()
        .map(|p| match &p.annotation {
            Some(ann) => format!("{}: {}", p.name, ann),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    match def.result_annotation() {
        Some(result) => format!("{}({}) -> {}", def.name(), params, result),
        None => format!("{}({})", def.name(), params),
    }
}

fn print_json(book: &Book) -> anyhow::Result<()> {
    let types: Vec<_> = book
        .registry()
        .adts()
        .map(|schema| {
            serde_json::json!({
                "name": schema.name,
                "constructors": schema.ctrs,
            })
        })
        .collect();

    let defs: Vec<_> = book
        .defs()
        .map(|def| {
            serde_json::json!({
                "name": def.name(),
                "arity": def.arity(),
                "params": def.params().iter().map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "annotation": p.annotation,
                    })
                }).collect::<Vec<_>>(),
                "result": def.result_annotation(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "types": types,
        "definitions": defs,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
