//! Deterministic C shim header generation.
//!
//! This crate is the core of cshim: it turns a validated
//! [`SymbolModel`](cshim_model::SymbolModel) into one self-contained C
//! header exposing every symbol through a flat, ABI-stable interface.
//! Classes and protocols cross the boundary as opaque pointer handles,
//! value types as opaque boxes (or flat structs when their public layout is
//! fully primitive), enums as C enums over their raw values, and every
//! property/method as free functions taking the owner handle first.
//!
//! ```text
//! SymbolModel -> [names] -> [representations] -> [thunks] -> [assembly] -> String
//! ```
//!
//! The pipeline is a pure, single-pass transformation. Its headline contract
//! is determinism: the same model always renders byte-identical text, and
//! every emitted identifier is derived from symbol identities and declared
//! order, never from process state.
//!
//! # Example
//!
//! ```
//! use cshim_model::{Symbol, SymbolKind, SymbolModel};
//!
//! let mut model = SymbolModel::new("Demo").unwrap();
//! model
//!     .insert(Symbol::new("s:Listener", "Listener", SymbolKind::Protocol))
//!     .unwrap();
//!
//! let header = cshim_gen::generate(&model).unwrap();
//! assert!(header.contains("typedef void* Listener;"));
//! ```
//!
//! Generation either returns the complete header or exactly one
//! [`GenError`] naming the offending symbol and member; there is no
//! partial-output mode, and a failed run leaves nothing behind.

use cshim_model::SymbolModel;
use smol_str::SmolStr;
use thiserror::Error;

mod emit;
mod ident;
mod repr;
mod thunk;

pub use repr::{repr_kind, CType, CTypeDef, ReprKind};
pub use thunk::{CFunction, CParam, MemberDecls};

/// Errors that abort a generation run.
///
/// All variants are fatal and deterministic: the same model fails the same
/// way every time, so the remedy is always a fix to the input model, never
/// a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// A member references a type identity absent from the model.
    #[error("`{symbol}.{member}` references `{target}`, which is not in the model")]
    UnresolvedReference {
        symbol: SmolStr,
        member: SmolStr,
        target: SmolStr,
    },

    /// A type reference has no flat C representation.
    #[error("`{symbol}.{member}` has no C representation for `{spelling}`")]
    UnrepresentableType {
        symbol: SmolStr,
        member: SmolStr,
        spelling: SmolStr,
    },

    /// Two declarations for one identity, or an unresolvable name clash.
    /// Either way the model is inconsistent upstream.
    #[error("identifier `{name}` cannot be synthesized uniquely for identity `{usr}`")]
    IdentifierCollision { name: SmolStr, usr: SmolStr },
}

/// Generate the complete shim header for a model.
pub fn generate(model: &SymbolModel) -> Result<String, GenError> {
    let names = ident::NameTable::build(model)?;
    let resolver = repr::Resolver::new(model, &names);

    let mut groups = Vec::with_capacity(model.len());
    for symbol in model.symbols() {
        let mut decls = Vec::with_capacity(symbol.members.len());
        for member in &symbol.members {
            decls.push(thunk::build_member(&resolver, &names, symbol, member)?);
        }
        groups.push(decls);
    }

    Ok(emit::assemble(model, &resolver, &groups))
}
