//! Accessor and thunk declaration building.
//!
//! Every property becomes a getter (and, when writable, a setter); every
//! method becomes one flat function taking the owner handle first and the
//! declared parameters in order. Declarations only: bodies belong to the
//! runtime bridge layer, not to this generator.

use std::fmt;

use cshim_model::{Member, MemberDecl, Symbol, TypeRef};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::ident::{self, MemberNames, NameTable};
use crate::repr::{CType, Resolver};
use crate::GenError;

/// One parameter of a generated function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CParam {
    pub name: SmolStr,
    pub ty: CType,
}

/// One generated function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CFunction {
    pub name: SmolStr,
    pub ret: CType,
    pub params: Vec<CParam>,
}

impl fmt::Display for CFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.ret, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", param.ty, param.name)?;
        }
        writeln!(f, ");")
    }
}

/// The declarations one member contributes, with the source signature that
/// is echoed above them as documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecls {
    pub comment: String,
    pub functions: Vec<CFunction>,
}

/// Build the declarations for one member.
pub(crate) fn build_member(
    resolver: &Resolver<'_>,
    names: &NameTable,
    symbol: &Symbol,
    member: &Member,
) -> Result<MemberDecls, GenError> {
    let self_param = CParam {
        name: SmolStr::new_inline("self"),
        ty: CType::Named(names.type_name(&symbol.usr).clone()),
    };

    match &member.decl {
        MemberDecl::Property { ty, writable } => {
            reject_value_void(symbol, member, ty)?;
            let value = resolver.use_site(symbol, member, ty)?;
            let (getter, setter) = match names.member_names(&member.usr) {
                MemberNames::Accessor { getter, setter } => (getter, setter),
                MemberNames::Thunk(_) => unreachable!("property named as a thunk"),
            };

            let mut functions = vec![CFunction {
                name: getter.clone(),
                ret: value.clone(),
                params: vec![self_param.clone()],
            }];
            debug_assert_eq!(setter.is_some(), *writable);
            if let Some(setter) = setter {
                functions.push(CFunction {
                    name: setter.clone(),
                    ret: CType::Void,
                    params: vec![
                        self_param,
                        CParam {
                            name: SmolStr::new_inline("value"),
                            ty: value,
                        },
                    ],
                });
            }

            Ok(MemberDecls {
                comment: format!("// property: {}", member.signature()),
                functions,
            })
        }
        MemberDecl::Method { params, ret } => {
            let name = match names.member_names(&member.usr) {
                MemberNames::Thunk(name) => name.clone(),
                MemberNames::Accessor { .. } => unreachable!("method named as an accessor"),
            };

            let mut c_params = vec![self_param];
            let mut used: FxHashSet<SmolStr> = FxHashSet::default();
            used.insert(SmolStr::new_inline("self"));
            for (i, param) in params.iter().enumerate() {
                reject_value_void(symbol, member, &param.ty)?;
                let wanted = param
                    .label
                    .as_ref()
                    .map(|label| SmolStr::new(ident::escape_component(label)))
                    .filter(|name| !used.contains(name))
                    .unwrap_or_else(|| SmolStr::new(format!("arg{i}")));
                used.insert(wanted.clone());
                c_params.push(CParam {
                    name: wanted,
                    ty: resolver.use_site(symbol, member, &param.ty)?,
                });
            }

            Ok(MemberDecls {
                comment: format!("// method: {}", member.signature()),
                functions: vec![CFunction {
                    name,
                    ret: resolver.use_site(symbol, member, ret)?,
                    params: c_params,
                }],
            })
        }
    }
}

/// `void` is a return slot, never a value type.
fn reject_value_void(symbol: &Symbol, member: &Member, ty: &TypeRef) -> Result<(), GenError> {
    if matches!(ty, TypeRef::Void) {
        return Err(GenError::UnrepresentableType {
            symbol: symbol.name.clone(),
            member: member.name.clone(),
            spelling: SmolStr::new_inline("()"),
        });
    }
    Ok(())
}
