//! Deduplication and header assembly.
//!
//! Types are emitted exactly once, in first-use order: the model is walked
//! in registry order, each symbol's own definition first, then any types its
//! members reference that have not been defined yet. All definitions precede
//! all accessor/thunk declarations, so every definition textually precedes
//! its first use. The whole unit is wrapped in an include guard and an
//! `extern "C"` block, and the rendering touches no unordered collection,
//! keeping repeated runs byte-identical.

use cshim_model::{Member, MemberDecl, Symbol, SymbolModel, TypeRef};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::repr::{CTypeDef, Resolver};
use crate::thunk::MemberDecls;

/// Tracks which type identities have already been emitted. Re-emission
/// requests for a known identity are no-ops.
#[derive(Debug, Default)]
pub(crate) struct Deduplicator {
    emitted: FxHashSet<SmolStr>,
}

impl Deduplicator {
    /// Returns true the first time an identity is seen.
    pub(crate) fn mark(&mut self, usr: &SmolStr) -> bool {
        self.emitted.insert(usr.clone())
    }
}

/// Render the complete header. `groups` holds each symbol's member
/// declarations, parallel to the model's enumeration order.
pub(crate) fn assemble(
    model: &SymbolModel,
    resolver: &Resolver<'_>,
    groups: &[Vec<MemberDecls>],
) -> String {
    let guard = guard_name(model.module());
    let defs = collect_definitions(model, resolver);

    let mut out = String::new();
    out.push_str(&format!("#ifndef {guard}\n"));
    out.push_str(&format!("#define {guard}\n\n"));
    out.push_str("#include <stdbool.h>\n");
    out.push_str("#include <stdint.h>\n\n");
    out.push_str("#ifdef __cplusplus\n");
    out.push_str("extern \"C\" {\n");
    out.push_str("#endif\n\n");

    if !defs.is_empty() {
        out.push_str("// Bridged type definitions\n\n");
        for def in &defs {
            out.push_str(&def.to_string());
            out.push('\n');
        }
    }

    for decls in groups.iter().flatten() {
        out.push_str(&decls.comment);
        out.push('\n');
        for function in &decls.functions {
            out.push_str(&function.to_string());
        }
        out.push('\n');
    }

    out.push_str("#ifdef __cplusplus\n");
    out.push_str("}\n");
    out.push_str("#endif\n\n");
    out.push_str(&format!("#endif // {guard}\n"));
    out
}

/// Type definitions in first-use order, each identity exactly once.
fn collect_definitions(model: &SymbolModel, resolver: &Resolver<'_>) -> Vec<CTypeDef> {
    let mut dedup = Deduplicator::default();
    let mut defs = Vec::new();

    for symbol in model.symbols() {
        push_definition(&mut dedup, &mut defs, resolver, symbol);
        for member in &symbol.members {
            for ty in member_type_refs(member) {
                if let TypeRef::Named(target) = ty {
                    // Reference validity was established while building the
                    // member declarations.
                    if let Some(referent) = model.get(target) {
                        push_definition(&mut dedup, &mut defs, resolver, referent);
                    }
                }
            }
        }
    }

    defs
}

fn push_definition(
    dedup: &mut Deduplicator,
    defs: &mut Vec<CTypeDef>,
    resolver: &Resolver<'_>,
    symbol: &Symbol,
) {
    if dedup.mark(&symbol.usr) {
        defs.push(resolver.definition(symbol));
    }
}

fn member_type_refs(member: &Member) -> Vec<&TypeRef> {
    match &member.decl {
        MemberDecl::Property { ty, .. } => vec![ty],
        MemberDecl::Method { params, ret } => {
            let mut refs: Vec<&TypeRef> = params.iter().map(|p| &p.ty).collect();
            refs.push(ret);
            refs
        }
    }
}

/// Include guard for a module name: `Virtualization` -> `VIRTUALIZATION_SHIM_H`.
fn guard_name(module: &str) -> String {
    let mut guard = String::with_capacity(module.len() + 8);
    for (i, c) in module.chars().enumerate() {
        if c.is_ascii_alphanumeric() {
            if i == 0 && c.is_ascii_digit() {
                guard.push('_');
            }
            guard.push(c.to_ascii_uppercase());
        } else {
            guard.push('_');
        }
    }
    guard.push_str("_SHIM_H");
    guard
}
