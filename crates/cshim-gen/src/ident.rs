//! Identifier synthesis.
//!
//! Every identifier in the output unit is synthesized here, up front, in one
//! deterministic pass over the model:
//!
//! 1. typedef names for all symbols, in registry order;
//! 2. enum case constants (C enum constants share the ordinary identifier
//!    namespace, so they are claimed like everything else);
//! 3. member names, symbol by symbol, members in supplied order.
//!
//! Typedef names are the escaped qualified name with nesting dots rendered as
//! the `_` delimiter; they carry no scheme prefix. Member functions are
//! namespaced by their owner: `{Type}_{member}`, with `_get`/`_set` marking
//! property accessors and a signature tag marking parameterized methods.
//!
//! The signature tag is derived from the member alone (one short code per
//! parameter type), so overloads that differ in parameter count or types get
//! distinct names that stay stable when a sibling overload is removed from
//! the model. Overloads identical up to argument labels fall back to an
//! ordinal in declaration order (`_2`, `_3`, ...).
//!
//! Escaping doubles underscores and hex-codes other punctuation, which keeps
//! ordinary source names (`[A-Za-z0-9_.]`) unambiguous after joining.
//! Residual clashes from exotic punctuation are absorbed by the ordinal path
//! of the claim table, never dropped.

use cshim_model::{MemberDecl, Symbol, SymbolKind, SymbolModel, TypeRef};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::repr::{self, ReprKind};
use crate::GenError;

/// Names a member contributes to the output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MemberNames {
    Accessor {
        getter: SmolStr,
        setter: Option<SmolStr>,
    },
    Thunk(SmolStr),
}

/// All identifiers for one generation run, keyed by mangled identity.
///
/// Built once per run; recomputed from scratch every run so results never
/// depend on process lifetime.
#[derive(Debug, Default)]
pub(crate) struct NameTable {
    /// Final identifier -> claiming identity.
    taken: FxHashMap<SmolStr, SmolStr>,
    /// Identities already named; a second claim is a model inconsistency.
    seen: FxHashMap<SmolStr, SmolStr>,
    type_names: FxHashMap<SmolStr, SmolStr>,
    case_names: FxHashMap<SmolStr, Vec<SmolStr>>,
    member_names: FxHashMap<SmolStr, MemberNames>,
}

impl NameTable {
    pub(crate) fn build(model: &SymbolModel) -> Result<Self, GenError> {
        let mut table = NameTable::default();

        for symbol in model.symbols() {
            let name = table.claim(type_name(&symbol.name), &symbol.usr)?;
            table.type_names.insert(symbol.usr.clone(), name);
        }

        for symbol in model.symbols() {
            if symbol.kind == SymbolKind::Enum {
                table.claim_cases(symbol)?;
            }
        }

        for symbol in model.symbols() {
            for member in &symbol.members {
                table.claim_member(model, symbol, member)?;
            }
        }

        Ok(table)
    }

    pub(crate) fn type_name(&self, usr: &str) -> &SmolStr {
        &self.type_names[usr]
    }

    pub(crate) fn case_names(&self, usr: &str) -> &[SmolStr] {
        &self.case_names[usr]
    }

    pub(crate) fn member_names(&self, usr: &str) -> &MemberNames {
        &self.member_names[usr]
    }

    fn claim_cases(&mut self, symbol: &Symbol) -> Result<(), GenError> {
        let type_name = self.type_names[&symbol.usr].clone();
        let mut names = Vec::new();
        if symbol.cases.is_empty() {
            // Placeholder constant for opaquely bridged enums.
            let usr = SmolStr::new(format!("{}#Unknown", symbol.usr));
            names.push(self.claim(format!("{type_name}_Unknown"), &usr)?);
        } else {
            for case in &symbol.cases {
                let usr = SmolStr::new(format!("{}#{}", symbol.usr, case.name));
                let want = format!("{type_name}_{}", escape_component(&case.name));
                names.push(self.claim(want, &usr)?);
            }
        }
        self.case_names.insert(symbol.usr.clone(), names);
        Ok(())
    }

    fn claim_member(
        &mut self,
        model: &SymbolModel,
        symbol: &Symbol,
        member: &cshim_model::Member,
    ) -> Result<(), GenError> {
        let owner = self.type_names[&symbol.usr].clone();
        let base = format!("{owner}_{}", escape_component(&member.name));

        let names = match &member.decl {
            MemberDecl::Property { writable, .. } => {
                // The base itself is claimed (and thereby reserved) so that
                // both accessors share one collision-resolved stem.
                let stem = self.claim(base, &member.usr)?;
                let getter = self.reserve(format!("{stem}_get"), &member.usr)?;
                let setter = if *writable {
                    Some(self.reserve(format!("{stem}_set"), &member.usr)?)
                } else {
                    None
                };
                MemberNames::Accessor { getter, setter }
            }
            MemberDecl::Method { params, .. } => {
                let mut want = base;
                if !params.is_empty() {
                    want.push('_');
                    for param in params {
                        want.push_str(&type_code(model, symbol, member, &param.ty)?);
                    }
                }
                MemberNames::Thunk(self.claim(want, &member.usr)?)
            }
        };

        self.member_names.insert(member.usr.clone(), names);
        Ok(())
    }

    /// Claim an identifier for an identity, appending a declaration-order
    /// ordinal when the wanted name is already taken by another identity.
    fn claim(&mut self, want: String, usr: &SmolStr) -> Result<SmolStr, GenError> {
        self.check_identity(&want, usr)?;
        let name = if !self.taken.contains_key(want.as_str()) {
            SmolStr::new(want)
        } else {
            let mut ordinal = 2usize;
            loop {
                let candidate = format!("{want}_{ordinal}");
                if !self.taken.contains_key(candidate.as_str()) {
                    break SmolStr::new(candidate);
                }
                ordinal += 1;
            }
        };
        self.taken.insert(name.clone(), usr.clone());
        Ok(name)
    }

    /// Register a name derived from an already-claimed stem. Derived names
    /// cannot be taken under the current escaping scheme; if one is, the
    /// model is inconsistent and the clash must not be papered over.
    fn reserve(&mut self, want: String, usr: &SmolStr) -> Result<SmolStr, GenError> {
        if self.taken.contains_key(want.as_str()) {
            return Err(GenError::IdentifierCollision {
                name: want.into(),
                usr: usr.clone(),
            });
        }
        let name = SmolStr::new(want);
        self.taken.insert(name.clone(), usr.clone());
        Ok(name)
    }

    fn check_identity(&mut self, want: &str, usr: &SmolStr) -> Result<(), GenError> {
        if let Some(first) = self.seen.get(usr) {
            return Err(GenError::IdentifierCollision {
                name: first.clone(),
                usr: usr.clone(),
            });
        }
        self.seen.insert(usr.clone(), SmolStr::new(want));
        Ok(())
    }
}

/// Typedef name for a qualified symbol name: components escaped, nesting
/// dots rendered as the delimiter (`Outer.Inner` -> `Outer_Inner`).
pub(crate) fn type_name(qualified: &str) -> String {
    let mut out = String::with_capacity(qualified.len());
    for (i, component) in qualified.split('.').enumerate() {
        if i > 0 {
            out.push('_');
        }
        out.push_str(&escape_component(component));
    }
    out
}

/// Escape one source-name component into identifier characters.
///
/// Alphanumerics pass through, `_` doubles to `__` so the single-underscore
/// delimiter stays recognizable, anything else becomes `_x` plus the byte's
/// hex. A leading digit gets an `_` prefix to keep the result legal in
/// leading position.
pub(crate) fn escape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for (i, byte) in component.bytes().enumerate() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' => out.push(byte as char),
            b'0'..=b'9' => {
                if i == 0 {
                    out.push('_');
                }
                out.push(byte as char);
            }
            b'_' => out.push_str("__"),
            _ => {
                out.push_str("_x");
                out.push_str(&format!("{byte:02x}"));
            }
        }
    }
    out
}

/// One-code-per-parameter signature tag component.
fn type_code(
    model: &SymbolModel,
    symbol: &Symbol,
    member: &cshim_model::Member,
    ty: &TypeRef,
) -> Result<String, GenError> {
    use cshim_model::Primitive::*;

    let code = match ty {
        TypeRef::Named(target) => {
            let referent = model.get(target).ok_or_else(|| GenError::UnresolvedReference {
                symbol: symbol.name.clone(),
                member: member.name.clone(),
                target: target.clone(),
            })?;
            match repr::repr_kind(referent) {
                ReprKind::Enum => "e",
                _ => "h",
            }
        }
        TypeRef::Primitive(p) => match p {
            Bool => "b",
            Int8 => "i8",
            Int16 => "i16",
            Int32 => "i32",
            Int64 => "i64",
            UInt8 => "u8",
            UInt16 => "u16",
            UInt32 => "u32",
            UInt64 => "u64",
            Int => "iw",
            UInt => "uw",
            Float32 => "f32",
            Float64 => "f64",
            CString => "s",
        },
        TypeRef::Void => "v",
        TypeRef::Closure(spelling) => {
            return Err(GenError::UnrepresentableType {
                symbol: symbol.name.clone(),
                member: member.name.clone(),
                spelling: spelling.clone(),
            })
        }
    };
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cshim_model::{Member, Param, Primitive, SymbolModel};
    use pretty_assertions::assert_eq;

    fn model_with(symbols: Vec<Symbol>) -> SymbolModel {
        let mut model = SymbolModel::new("Demo").unwrap();
        for symbol in symbols {
            model.insert(symbol).unwrap();
        }
        model
    }

    #[test]
    fn escape_passes_plain_names_through() {
        assert_eq!(escape_component("widthInPixels"), "widthInPixels");
    }

    #[test]
    fn escape_doubles_underscores() {
        assert_eq!(escape_component("raw_value"), "raw__value");
    }

    #[test]
    fn escape_hex_codes_punctuation() {
        assert_eq!(escape_component("a.b"), "a_x2eb");
        assert_eq!(escape_component("a+b"), "a_x2bb");
    }

    #[test]
    fn escape_guards_leading_digit() {
        assert_eq!(escape_component("3d"), "_3d");
    }

    #[test]
    fn escaping_is_injective_over_underscore_and_dot() {
        // The two source spellings that commonly alias after naive joining.
        assert_ne!(type_name("Outer.Inner"), type_name("Outer_Inner"));
        assert_ne!(escape_component("a_b"), escape_component("a__b"));
    }

    #[test]
    fn nested_names_use_the_delimiter() {
        assert_eq!(type_name("Outer.Inner"), "Outer_Inner");
    }

    #[test]
    fn property_names_share_a_stem() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class).with_member(
            Member::property(
                "s:VM.state",
                "state",
                TypeRef::Primitive(Primitive::Int32),
                true,
            ),
        )]);
        let names = NameTable::build(&model).unwrap();

        assert_eq!(
            *names.member_names("s:VM.state"),
            MemberNames::Accessor {
                getter: "VM_state_get".into(),
                setter: Some("VM_state_set".into()),
            }
        );
    }

    #[test]
    fn readonly_property_has_no_setter_name() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class).with_member(
            Member::property(
                "s:VM.id",
                "id",
                TypeRef::Primitive(Primitive::UInt64),
                false,
            ),
        )]);
        let names = NameTable::build(&model).unwrap();

        assert_eq!(
            *names.member_names("s:VM.id"),
            MemberNames::Accessor {
                getter: "VM_id_get".into(),
                setter: None,
            }
        );
    }

    #[test]
    fn zero_parameter_method_gets_bare_base() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class).with_member(
            Member::method("s:VM.start", "start", vec![], TypeRef::Void),
        )]);
        let names = NameTable::build(&model).unwrap();

        assert_eq!(*names.member_names("s:VM.start"), MemberNames::Thunk("VM_start".into()));
    }

    #[test]
    fn parameterized_method_gets_signature_tag() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class).with_member(
            Member::method(
                "s:VM.resize",
                "resize",
                vec![
                    Param::new("width", TypeRef::Primitive(Primitive::UInt64)),
                    Param::new("height", TypeRef::Primitive(Primitive::UInt64)),
                ],
                TypeRef::Void,
            ),
        )]);
        let names = NameTable::build(&model).unwrap();

        assert_eq!(
            *names.member_names("s:VM.resize"),
            MemberNames::Thunk("VM_resize_u64u64".into())
        );
    }

    #[test]
    fn count_overloads_stay_stable_without_the_sibling() {
        let both = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class)
            .with_member(Member::method("s:VM.start0", "start", vec![], TypeRef::Void))
            .with_member(Member::method(
                "s:VM.start1",
                "start",
                vec![Param::new("paused", TypeRef::Primitive(Primitive::Bool))],
                TypeRef::Void,
            ))]);
        let names = NameTable::build(&both).unwrap();
        let one_arg_name = match names.member_names("s:VM.start1") {
            MemberNames::Thunk(name) => name.clone(),
            other => panic!("expected thunk, got {other:?}"),
        };

        // Rerun with the zero-argument overload removed: the survivor keeps
        // its name.
        let only_one = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class).with_member(
            Member::method(
                "s:VM.start1",
                "start",
                vec![Param::new("paused", TypeRef::Primitive(Primitive::Bool))],
                TypeRef::Void,
            ),
        )]);
        let names = NameTable::build(&only_one).unwrap();
        assert_eq!(*names.member_names("s:VM.start1"), MemberNames::Thunk(one_arg_name));
    }

    #[test]
    fn label_only_overloads_get_declaration_order_ordinals() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class)
            .with_member(Member::method(
                "s:VM.load#url",
                "load",
                vec![Param::new("url", TypeRef::Primitive(Primitive::CString))],
                TypeRef::Void,
            ))
            .with_member(Member::method(
                "s:VM.load#path",
                "load",
                vec![Param::new("path", TypeRef::Primitive(Primitive::CString))],
                TypeRef::Void,
            ))]);
        let names = NameTable::build(&model).unwrap();

        assert_eq!(*names.member_names("s:VM.load#url"), MemberNames::Thunk("VM_load_s".into()));
        assert_eq!(
            *names.member_names("s:VM.load#path"),
            MemberNames::Thunk("VM_load_s_2".into())
        );
    }

    #[test]
    fn duplicate_member_identity_is_a_collision() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class)
            .with_member(Member::method("s:VM.dup", "first", vec![], TypeRef::Void))
            .with_member(Member::method("s:VM.dup", "second", vec![], TypeRef::Void))]);

        assert!(matches!(
            NameTable::build(&model),
            Err(GenError::IdentifierCollision { .. })
        ));
    }

    #[test]
    fn opaque_enum_claims_a_placeholder_constant() {
        let model = model_with(vec![Symbol::new("s:Boot", "BootState", SymbolKind::Enum)]);
        let names = NameTable::build(&model).unwrap();

        assert_eq!(names.case_names("s:Boot"), &["BootState_Unknown"]);
    }

    #[test]
    fn closure_parameter_is_unrepresentable() {
        let model = model_with(vec![Symbol::new("s:VM", "VM", SymbolKind::Class).with_member(
            Member::method(
                "s:VM.onStop",
                "onStop",
                vec![Param::new("handler", TypeRef::Closure("() -> Void".into()))],
                TypeRef::Void,
            ),
        )]);

        assert!(matches!(
            NameTable::build(&model),
            Err(GenError::UnrepresentableType { .. })
        ));
    }
}
