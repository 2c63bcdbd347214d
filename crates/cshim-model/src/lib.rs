//! Symbol model IR for the cshim shim generator.
//!
//! The model is a read-only registry of every type-level entity a managed
//! runtime module exports (classes, structs, enums, protocols) together with
//! their properties and methods. It is built once per generation run by a
//! collaborator (typically the symbol-graph loader in `cshim-cli`), validated,
//! and then handed immutably to `cshim-gen`.
//!
//! Two invariants matter to everything downstream:
//!
//! - **Identity**: every symbol and member carries a stable mangled identity
//!   (its *usr*). Identities are unique within a model; qualified names need
//!   not be (nested types and overloads may collide superficially).
//! - **Order**: symbols enumerate in insertion order, members in supplied
//!   order. The registry never reorders — deterministic output is derived
//!   from this order by the generator, not re-sorted later.
//!
//! # Example
//!
//! ```
//! use cshim_model::{Member, MemberDecl, Primitive, Symbol, SymbolKind, SymbolModel, TypeRef};
//!
//! let mut model = SymbolModel::new("Virtualization").unwrap();
//! model
//!     .insert(
//!         Symbol::new("s:VM", "VirtualMachine", SymbolKind::Class).with_member(Member::property(
//!             "s:VM.state",
//!             "state",
//!             TypeRef::Primitive(Primitive::Int32),
//!             false,
//!         )),
//!     )
//!     .unwrap();
//! assert!(model.validate().is_ok());
//! ```

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;

// ============================================================================
// Symbols
// ============================================================================

/// The kind of a type-level entity in the source metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Reference-semantics type.
    Class,
    /// Value-semantics type.
    Struct,
    /// Enumeration with a raw integer representation.
    Enum,
    /// Behavioral contract; bridged like a reference type.
    Protocol,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Class => write!(f, "class"),
            SymbolKind::Struct => write!(f, "struct"),
            SymbolKind::Enum => write!(f, "enum"),
            SymbolKind::Protocol => write!(f, "protocol"),
        }
    }
}

/// One case of an enum symbol.
///
/// `value` is the raw value when the metadata exposes it; cases without one
/// are numbered by position at emission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumCase {
    pub name: SmolStr,
    pub value: Option<i64>,
}

impl EnumCase {
    pub fn new(name: impl Into<SmolStr>, value: Option<i64>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A public field of a struct symbol.
///
/// Only present when the source metadata exposes a stable layout. A struct
/// with no fields (or with any non-primitive field) crosses the boundary as
/// an opaque box instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub name: SmolStr,
    pub ty: TypeRef,
}

impl StructField {
    pub fn new(name: impl Into<SmolStr>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A named, kinded entity exported by the bridged module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Stable mangled identity. Unique within a model.
    pub usr: SmolStr,
    /// Qualified name, with `.` separating nesting levels (`Outer.Inner`).
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Known cases, enums only. Empty means the enum is bridged opaquely.
    pub cases: Vec<EnumCase>,
    /// Known public fields, structs only. Empty means the layout is private.
    pub fields: Vec<StructField>,
    /// Properties and methods, in supplied order.
    pub members: Vec<Member>,
}

impl Symbol {
    pub fn new(usr: impl Into<SmolStr>, name: impl Into<SmolStr>, kind: SymbolKind) -> Self {
        Self {
            usr: usr.into(),
            name: name.into(),
            kind,
            cases: Vec::new(),
            fields: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_case(mut self, case: EnumCase) -> Self {
        self.cases.push(case);
        self
    }

    pub fn with_field(mut self, field: StructField) -> Self {
        self.fields.push(field);
        self
    }
}

// ============================================================================
// Members
// ============================================================================

/// A property or method owned by exactly one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Stable mangled identity of the member itself.
    pub usr: SmolStr,
    /// Unqualified member name.
    pub name: SmolStr,
    pub decl: MemberDecl,
}

impl Member {
    /// Shorthand for a property member.
    pub fn property(
        usr: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        ty: TypeRef,
        writable: bool,
    ) -> Self {
        Self {
            usr: usr.into(),
            name: name.into(),
            decl: MemberDecl::Property { ty, writable },
        }
    }

    /// Shorthand for a method member.
    pub fn method(
        usr: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        params: Vec<Param>,
        ret: TypeRef,
    ) -> Self {
        Self {
            usr: usr.into(),
            name: name.into(),
            decl: MemberDecl::Method { params, ret },
        }
    }

    /// The source-language signature echoed above each generated declaration,
    /// e.g. `restoreMachineState(from:options:)` or `state` for a property.
    pub fn signature(&self) -> String {
        match &self.decl {
            MemberDecl::Property { .. } => self.name.to_string(),
            MemberDecl::Method { params, .. } => {
                let mut sig = String::from(self.name.as_str());
                sig.push('(');
                for param in params {
                    match &param.label {
                        Some(label) => sig.push_str(label),
                        None => sig.push('_'),
                    }
                    sig.push(':');
                }
                sig.push(')');
                sig
            }
        }
    }
}

/// The declaration payload of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberDecl {
    Property {
        ty: TypeRef,
        /// Read-write properties get a setter in addition to the getter.
        writable: bool,
    },
    Method {
        params: Vec<Param>,
        ret: TypeRef,
    },
}

/// A method parameter. The label is documentation only; it never affects the
/// flattened calling convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub label: Option<SmolStr>,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(label: impl Into<SmolStr>, ty: TypeRef) -> Self {
        Self {
            label: Some(label.into()),
            ty,
        }
    }

    pub fn unlabeled(ty: TypeRef) -> Self {
        Self { label: None, ty }
    }
}

// ============================================================================
// Type references
// ============================================================================

/// A non-owning reference to a symbol or a primitive.
///
/// `Named` holds the usr of a symbol expected to be present in the same
/// model; resolution happens against the registry, never eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Reference to a symbol in the registry, by mangled identity.
    Named(SmolStr),
    Primitive(Primitive),
    /// No value; valid as a return slot only.
    Void,
    /// A function-typed reference, kept by its original spelling. The flat
    /// ABI cannot carry these; loaders are expected to filter them out.
    Closure(SmolStr),
}

impl TypeRef {
    pub fn named(usr: impl Into<SmolStr>) -> Self {
        TypeRef::Named(usr.into())
    }
}

/// Primitive value types that pass through the boundary unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    /// Platform-word signed integer.
    Int,
    /// Platform-word unsigned integer.
    UInt,
    Float32,
    Float64,
    /// NUL-terminated string.
    CString,
}

// ============================================================================
// Registry
// ============================================================================

/// Read-only registry of all symbols in one generation run.
///
/// Keyed by mangled identity, enumerating in insertion order. Built once,
/// validated, then treated as immutable by the generator.
#[derive(Debug, Clone)]
pub struct SymbolModel {
    module: SmolStr,
    symbols: IndexMap<SmolStr, Symbol>,
}

impl SymbolModel {
    /// Create an empty model for the named module.
    pub fn new(module: impl Into<SmolStr>) -> Result<Self, ModelError> {
        let module = module.into();
        if module.is_empty() {
            return Err(ModelError::EmptyModule);
        }
        Ok(Self {
            module,
            symbols: IndexMap::new(),
        })
    }

    /// Name of the bridged module; names the output unit and include guard.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Register a symbol. Identities must be unique.
    pub fn insert(&mut self, symbol: Symbol) -> Result<(), ModelError> {
        if self.symbols.contains_key(&symbol.usr) {
            return Err(ModelError::DuplicateSymbol { usr: symbol.usr });
        }
        self.symbols.insert(symbol.usr.clone(), symbol);
        Ok(())
    }

    /// Look up a symbol by mangled identity.
    pub fn get(&self, usr: &str) -> Option<&Symbol> {
        self.symbols.get(usr)
    }

    /// All symbols, in insertion order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Total member count across all symbols.
    pub fn member_count(&self) -> usize {
        self.symbols.values().map(|s| s.members.len()).sum()
    }

    /// Check that every `Named` reference reachable from any member or
    /// struct field resolves within this model.
    ///
    /// Generation performs the same lookups lazily; validating up front lets
    /// callers reject a broken model before any work happens.
    pub fn validate(&self) -> Result<(), ModelError> {
        for symbol in self.symbols.values() {
            for field in &symbol.fields {
                self.check_ref(symbol, &field.name, &field.ty)?;
            }
            for member in &symbol.members {
                match &member.decl {
                    MemberDecl::Property { ty, .. } => {
                        self.check_ref(symbol, &member.name, ty)?;
                    }
                    MemberDecl::Method { params, ret } => {
                        for param in params {
                            self.check_ref(symbol, &member.name, &param.ty)?;
                        }
                        self.check_ref(symbol, &member.name, ret)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn check_ref(&self, symbol: &Symbol, member: &SmolStr, ty: &TypeRef) -> Result<(), ModelError> {
        if let TypeRef::Named(target) = ty {
            if !self.symbols.contains_key(target) {
                return Err(ModelError::UnresolvedReference {
                    symbol: symbol.name.clone(),
                    member: member.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building or validating a symbol model.
///
/// All of these indicate broken input; none is recoverable within a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("module name must not be empty")]
    EmptyModule,

    #[error("duplicate symbol identity `{usr}`")]
    DuplicateSymbol { usr: SmolStr },

    #[error("`{symbol}.{member}` references `{target}`, which is not in the model")]
    UnresolvedReference {
        symbol: SmolStr,
        member: SmolStr,
        target: SmolStr,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn point() -> Symbol {
        Symbol::new("s:Point", "Point", SymbolKind::Struct)
            .with_member(Member::property(
                "s:Point.x",
                "x",
                TypeRef::Primitive(Primitive::Int32),
                true,
            ))
            .with_member(Member::property(
                "s:Point.y",
                "y",
                TypeRef::Primitive(Primitive::Int32),
                true,
            ))
    }

    #[test]
    fn insert_and_lookup() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model.insert(point()).unwrap();

        assert_eq!(model.len(), 1);
        assert_eq!(model.get("s:Point").unwrap().name, "Point");
        assert!(model.get("s:Missing").is_none());
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model.insert(point()).unwrap();

        let err = model.insert(point()).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateSymbol {
                usr: "s:Point".into()
            }
        );
    }

    #[test]
    fn empty_module_name_is_rejected() {
        assert_eq!(SymbolModel::new("").unwrap_err(), ModelError::EmptyModule);
    }

    #[test]
    fn enumeration_preserves_insertion_order() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model
            .insert(Symbol::new("s:B", "Beta", SymbolKind::Class))
            .unwrap();
        model
            .insert(Symbol::new("s:A", "Alpha", SymbolKind::Class))
            .unwrap();

        let names: Vec<&str> = model.symbols().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Alpha"]);
    }

    #[test]
    fn validate_accepts_resolved_references() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model
            .insert(Symbol::new("s:Device", "Device", SymbolKind::Class))
            .unwrap();
        model
            .insert(
                Symbol::new("s:Host", "Host", SymbolKind::Class).with_member(Member::method(
                    "s:Host.attach",
                    "attach",
                    vec![Param::new("device", TypeRef::named("s:Device"))],
                    TypeRef::Void,
                )),
            )
            .unwrap();

        assert!(model.validate().is_ok());
    }

    #[test]
    fn validate_reports_unresolved_return_type() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model
            .insert(
                Symbol::new("s:Host", "Host", SymbolKind::Class).with_member(Member::method(
                    "s:Host.snapshot",
                    "snapshot",
                    vec![],
                    TypeRef::named("s:Snapshot"),
                )),
            )
            .unwrap();

        let err = model.validate().unwrap_err();
        assert_eq!(
            err,
            ModelError::UnresolvedReference {
                symbol: "Host".into(),
                member: "snapshot".into(),
                target: "s:Snapshot".into(),
            }
        );
    }

    #[test]
    fn validate_reports_unresolved_struct_field() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model
            .insert(
                Symbol::new("s:Frame", "Frame", SymbolKind::Struct)
                    .with_field(StructField::new("origin", TypeRef::named("s:Origin"))),
            )
            .unwrap();

        assert!(matches!(
            model.validate(),
            Err(ModelError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn method_signature_echoes_labels() {
        let member = Member::method(
            "s:VM.restore",
            "restoreMachineState",
            vec![
                Param::new("from", TypeRef::Primitive(Primitive::CString)),
                Param::unlabeled(TypeRef::Primitive(Primitive::Bool)),
            ],
            TypeRef::Void,
        );
        assert_eq!(member.signature(), "restoreMachineState(from:_:)");
    }

    #[test]
    fn property_signature_is_its_name() {
        let member = Member::property("s:VM.state", "state", TypeRef::Void, false);
        assert_eq!(member.signature(), "state");
    }

    #[test]
    fn member_count_sums_all_symbols() {
        let mut model = SymbolModel::new("Demo").unwrap();
        model.insert(point()).unwrap();
        model
            .insert(Symbol::new("s:Empty", "Empty", SymbolKind::Protocol))
            .unwrap();

        assert_eq!(model.member_count(), 2);
    }
}
