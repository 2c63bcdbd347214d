//! I/O glue for the cshim shim generator.
//!
//! The core (`cshim-gen`) is pure: symbol model in, header text out. This
//! crate supplies the collaborator sides of that contract — a loader that
//! turns a symbol-graph JSON file into a validated
//! [`SymbolModel`](cshim_model::SymbolModel), and the `cshim` binary that
//! wires loading, generation, and file writing together.

pub mod loader;

pub use loader::{parse_symbol_graph, LoadError, LoadedModule};
