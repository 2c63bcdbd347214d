//! Type representation resolution.
//!
//! Decides, for every type a member can reference, its C-visible shape. The
//! mapping is total over valid models and deterministic:
//!
//! - classes and protocols cross the boundary as bare pointer-sized handles;
//! - structs with a fully primitive public layout keep that layout;
//! - any other struct becomes a one-field opaque box whose `_internal`
//!   capsule is owned by the runtime bridge, never by generated code;
//! - enums become C enums over their known raw values, with a single
//!   `_Unknown = 0` placeholder when no cases are known;
//! - primitives pass through to fixed-width C scalars.
//!
//! Function-typed references cannot be flattened and abort generation.

use std::fmt;

use cshim_model::{Member, Primitive, Symbol, SymbolKind, SymbolModel, TypeRef};
use smol_str::SmolStr;

use crate::ident::NameTable;
use crate::GenError;

/// The derived representation class of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprKind {
    /// Reference-semantics type or protocol; a bare pointer-sized handle.
    OpaquePointer,
    /// Value-semantics type with private layout; a one-field wrapper struct.
    OpaqueBox,
    /// Value-semantics type whose public layout is fully primitive.
    FlatStruct,
    /// Enumeration over a raw integer.
    Enum,
}

/// Derive the representation class of a symbol. Total: every symbol kind
/// maps to exactly one class.
pub fn repr_kind(symbol: &Symbol) -> ReprKind {
    match symbol.kind {
        SymbolKind::Class | SymbolKind::Protocol => ReprKind::OpaquePointer,
        SymbolKind::Enum => ReprKind::Enum,
        SymbolKind::Struct => {
            let flat = !symbol.fields.is_empty()
                && symbol
                    .fields
                    .iter()
                    .all(|f| matches!(f.ty, TypeRef::Primitive(_)));
            if flat {
                ReprKind::FlatStruct
            } else {
                ReprKind::OpaqueBox
            }
        }
    }
}

/// A type as spelled at a use site (parameter or return slot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    /// A typedef'd name emitted by this generator.
    Named(SmolStr),
    /// A fixed-width scalar from `<stdint.h>`/`<stdbool.h>`.
    Scalar(&'static str),
    Void,
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Named(name) => write!(f, "{name}"),
            CType::Scalar(spelling) => write!(f, "{spelling}"),
            CType::Void => write!(f, "void"),
        }
    }
}

/// A type definition to be emitted exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CTypeDef {
    OpaquePointer {
        name: SmolStr,
        kind: SymbolKind,
    },
    OpaqueBox {
        name: SmolStr,
    },
    FlatStruct {
        name: SmolStr,
        fields: Vec<(SmolStr, &'static str)>,
    },
    Enum {
        name: SmolStr,
        cases: Vec<(SmolStr, i64)>,
    },
}

impl CTypeDef {
    pub fn name(&self) -> &str {
        match self {
            CTypeDef::OpaquePointer { name, .. }
            | CTypeDef::OpaqueBox { name }
            | CTypeDef::FlatStruct { name, .. }
            | CTypeDef::Enum { name, .. } => name,
        }
    }
}

impl fmt::Display for CTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CTypeDef::OpaquePointer { name, kind } => {
                writeln!(f, "// {name} bridges a {kind}")?;
                writeln!(f, "typedef void* {name};")
            }
            CTypeDef::OpaqueBox { name } => {
                writeln!(f, "// {name} bridges a struct with private layout")?;
                writeln!(f, "typedef struct {{")?;
                writeln!(f, "    void* _internal;")?;
                writeln!(f, "}} {name};")
            }
            CTypeDef::FlatStruct { name, fields } => {
                writeln!(f, "// {name} bridges a struct")?;
                writeln!(f, "typedef struct {{")?;
                for (field, spelling) in fields {
                    writeln!(f, "    {spelling} {field};")?;
                }
                writeln!(f, "}} {name};")
            }
            CTypeDef::Enum { name, cases } => {
                writeln!(f, "// {name} bridges an enum")?;
                writeln!(f, "typedef enum {{")?;
                for (case, value) in cases {
                    writeln!(f, "    {case} = {value},")?;
                }
                writeln!(f, "}} {name};")
            }
        }
    }
}

/// Resolves type references against one model and one name table.
pub(crate) struct Resolver<'a> {
    model: &'a SymbolModel,
    names: &'a NameTable,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(model: &'a SymbolModel, names: &'a NameTable) -> Self {
        Self { model, names }
    }

    /// Spelling of a type at a use site. Fails on references that left the
    /// model (`UnresolvedReference`) or cannot be flattened
    /// (`UnrepresentableType`).
    pub(crate) fn use_site(
        &self,
        symbol: &Symbol,
        member: &Member,
        ty: &TypeRef,
    ) -> Result<CType, GenError> {
        match ty {
            TypeRef::Named(target) => {
                if self.model.get(target).is_none() {
                    return Err(GenError::UnresolvedReference {
                        symbol: symbol.name.clone(),
                        member: member.name.clone(),
                        target: target.clone(),
                    });
                }
                Ok(CType::Named(self.names.type_name(target).clone()))
            }
            TypeRef::Primitive(p) => Ok(CType::Scalar(scalar_spelling(*p))),
            TypeRef::Void => Ok(CType::Void),
            TypeRef::Closure(spelling) => Err(GenError::UnrepresentableType {
                symbol: symbol.name.clone(),
                member: member.name.clone(),
                spelling: spelling.clone(),
            }),
        }
    }

    /// The definition emitted for a symbol. Infallible: every symbol kind
    /// has exactly one definition shape.
    pub(crate) fn definition(&self, symbol: &Symbol) -> CTypeDef {
        let name = self.names.type_name(&symbol.usr).clone();
        match repr_kind(symbol) {
            ReprKind::OpaquePointer => CTypeDef::OpaquePointer {
                name,
                kind: symbol.kind,
            },
            ReprKind::OpaqueBox => CTypeDef::OpaqueBox { name },
            ReprKind::FlatStruct => {
                let fields = symbol
                    .fields
                    .iter()
                    .map(|f| {
                        let spelling = match f.ty {
                            TypeRef::Primitive(p) => scalar_spelling(p),
                            // repr_kind only selects FlatStruct when every
                            // field is primitive.
                            _ => unreachable!("flat struct with non-primitive field"),
                        };
                        (SmolStr::new(crate::ident::escape_component(&f.name)), spelling)
                    })
                    .collect();
                CTypeDef::FlatStruct { name, fields }
            }
            ReprKind::Enum => {
                let case_names = self.names.case_names(&symbol.usr);
                let cases = if symbol.cases.is_empty() {
                    vec![(case_names[0].clone(), 0)]
                } else {
                    symbol
                        .cases
                        .iter()
                        .zip(case_names)
                        .enumerate()
                        .map(|(i, (case, name))| (name.clone(), case.value.unwrap_or(i as i64)))
                        .collect()
                };
                CTypeDef::Enum { name, cases }
            }
        }
    }
}

/// Fixed-width C scalar for a primitive.
pub(crate) fn scalar_spelling(p: Primitive) -> &'static str {
    match p {
        Primitive::Bool => "bool",
        Primitive::Int8 => "int8_t",
        Primitive::Int16 => "int16_t",
        Primitive::Int32 => "int32_t",
        Primitive::Int64 => "int64_t",
        Primitive::UInt8 => "uint8_t",
        Primitive::UInt16 => "uint16_t",
        Primitive::UInt32 => "uint32_t",
        Primitive::UInt64 => "uint64_t",
        // Pointer-width words: the bridged runtime's Int/UInt are
        // word-sized, so `int` would truncate on LP64 targets.
        Primitive::Int => "intptr_t",
        Primitive::UInt => "uintptr_t",
        Primitive::Float32 => "float",
        Primitive::Float64 => "double",
        Primitive::CString => "const char*",
    }
}
