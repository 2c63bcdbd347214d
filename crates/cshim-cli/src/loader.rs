//! Symbol-graph loading.
//!
//! Parses the symbol-graph JSON a metadata extractor produces and builds the
//! in-memory model the generator consumes. All cross-references are resolved
//! eagerly here (`SymbolModel::validate`), so generation never late-binds.
//!
//! Members carrying function-typed values (completion handlers and other
//! callbacks) cannot cross the flat ABI; the loader skips them and reports
//! how many were dropped, rather than aborting on metadata the bridge can
//! never express.

use cshim_model::{
    EnumCase, Member, ModelError, Param, Primitive, StructField, Symbol, SymbolKind, SymbolModel,
    TypeRef,
};
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while turning symbol-graph JSON into a model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse symbol graph: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown primitive type `{name}`")]
    UnknownPrimitive { name: String },

    #[error("member `{id}` must declare exactly one of `property` or `method`")]
    MalformedMember { id: SmolStr },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A parsed and validated module, plus how many members were dropped for
/// carrying function-typed values.
#[derive(Debug)]
pub struct LoadedModule {
    pub model: SymbolModel,
    pub skipped_members: usize,
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphNode {
    module: ModuleNode,
    symbols: Vec<SymbolNode>,
}

#[derive(Debug, Deserialize)]
struct ModuleNode {
    name: SmolStr,
}

#[derive(Debug, Deserialize)]
struct SymbolNode {
    id: SmolStr,
    name: SmolStr,
    kind: KindNode,
    #[serde(default)]
    cases: Vec<CaseNode>,
    #[serde(default)]
    fields: Vec<FieldNode>,
    #[serde(default)]
    members: Vec<MemberNode>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum KindNode {
    Class,
    Struct,
    Enum,
    Protocol,
}

impl From<KindNode> for SymbolKind {
    fn from(kind: KindNode) -> Self {
        match kind {
            KindNode::Class => SymbolKind::Class,
            KindNode::Struct => SymbolKind::Struct,
            KindNode::Enum => SymbolKind::Enum,
            KindNode::Protocol => SymbolKind::Protocol,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaseNode {
    name: SmolStr,
    #[serde(default)]
    value: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FieldNode {
    name: SmolStr,
    #[serde(rename = "type")]
    ty: TypeNode,
}

#[derive(Debug, Deserialize)]
struct MemberNode {
    id: SmolStr,
    name: SmolStr,
    #[serde(default)]
    property: Option<PropertyNode>,
    #[serde(default)]
    method: Option<MethodNode>,
}

#[derive(Debug, Deserialize)]
struct PropertyNode {
    #[serde(rename = "type")]
    ty: TypeNode,
    #[serde(default)]
    writable: bool,
}

#[derive(Debug, Deserialize)]
struct MethodNode {
    #[serde(default)]
    params: Vec<ParamNode>,
    #[serde(default)]
    returns: Option<TypeNode>,
}

#[derive(Debug, Deserialize)]
struct ParamNode {
    #[serde(default)]
    label: Option<SmolStr>,
    #[serde(rename = "type")]
    ty: TypeNode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeNode {
    Symbol { symbol: SmolStr },
    Primitive { primitive: String },
    Closure { closure: SmolStr },
}

impl TypeNode {
    fn to_type_ref(&self) -> Result<TypeRef, LoadError> {
        match self {
            TypeNode::Symbol { symbol } => Ok(TypeRef::Named(symbol.clone())),
            TypeNode::Primitive { primitive } => Ok(TypeRef::Primitive(parse_primitive(primitive)?)),
            TypeNode::Closure { closure } => Ok(TypeRef::Closure(closure.clone())),
        }
    }
}

fn parse_primitive(name: &str) -> Result<Primitive, LoadError> {
    let primitive = match name {
        "bool" => Primitive::Bool,
        "int8" => Primitive::Int8,
        "int16" => Primitive::Int16,
        "int32" => Primitive::Int32,
        "int64" => Primitive::Int64,
        "uint8" => Primitive::UInt8,
        "uint16" => Primitive::UInt16,
        "uint32" => Primitive::UInt32,
        "uint64" => Primitive::UInt64,
        "int" => Primitive::Int,
        "uint" => Primitive::UInt,
        "float32" => Primitive::Float32,
        "float64" => Primitive::Float64,
        "string" => Primitive::CString,
        _ => {
            return Err(LoadError::UnknownPrimitive {
                name: name.to_string(),
            })
        }
    };
    Ok(primitive)
}

// ============================================================================
// Loading
// ============================================================================

/// Parse symbol-graph JSON into a validated model.
pub fn parse_symbol_graph(json: &str) -> Result<LoadedModule, LoadError> {
    let graph: GraphNode = serde_json::from_str(json)?;
    let mut model = SymbolModel::new(graph.module.name)?;
    let mut skipped = 0usize;

    for node in graph.symbols {
        let mut symbol = Symbol::new(node.id, node.name, node.kind.into());
        for case in node.cases {
            symbol = symbol.with_case(EnumCase::new(case.name, case.value));
        }
        for field in node.fields {
            symbol = symbol.with_field(StructField::new(field.name, field.ty.to_type_ref()?));
        }
        for member in node.members {
            match build_member(member)? {
                Some(member) => symbol = symbol.with_member(member),
                None => skipped += 1,
            }
        }
        model.insert(symbol)?;
    }

    model.validate()?;
    Ok(LoadedModule {
        model,
        skipped_members: skipped,
    })
}

/// Build one member, or `None` when it carries a function-typed value the
/// flat ABI cannot express.
fn build_member(node: MemberNode) -> Result<Option<Member>, LoadError> {
    match (node.property, node.method) {
        (Some(property), None) => {
            let ty = property.ty.to_type_ref()?;
            if matches!(ty, TypeRef::Closure(_)) {
                return Ok(None);
            }
            Ok(Some(Member::property(
                node.id,
                node.name,
                ty,
                property.writable,
            )))
        }
        (None, Some(method)) => {
            let ret = match &method.returns {
                Some(ty) => ty.to_type_ref()?,
                None => TypeRef::Void,
            };
            let mut params = Vec::with_capacity(method.params.len());
            for param in method.params {
                params.push(Param {
                    label: param.label,
                    ty: param.ty.to_type_ref()?,
                });
            }
            if matches!(ret, TypeRef::Closure(_))
                || params.iter().any(|p| matches!(p.ty, TypeRef::Closure(_)))
            {
                return Ok(None);
            }
            Ok(Some(Member::method(node.id, node.name, params, ret)))
        }
        _ => Err(LoadError::MalformedMember { id: node.id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GRAPH: &str = r#"{
        "module": { "name": "Virtualization" },
        "symbols": [
            {
                "id": "s:BootState",
                "name": "BootState",
                "kind": "enum",
                "cases": [
                    { "name": "stopped", "value": 0 },
                    { "name": "running", "value": 1 }
                ]
            },
            {
                "id": "s:VM",
                "name": "VirtualMachine",
                "kind": "class",
                "members": [
                    {
                        "id": "s:VM.state",
                        "name": "state",
                        "property": { "type": { "symbol": "s:BootState" } }
                    },
                    {
                        "id": "s:VM.resize",
                        "name": "resize",
                        "method": {
                            "params": [
                                { "label": "width", "type": { "primitive": "uint64" } },
                                { "label": "height", "type": { "primitive": "uint64" } }
                            ],
                            "returns": { "primitive": "bool" }
                        }
                    },
                    {
                        "id": "s:VM.onStop",
                        "name": "onStop",
                        "method": {
                            "params": [
                                { "label": "handler", "type": { "closure": "() -> Void" } }
                            ]
                        }
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_symbols_members_and_cases() {
        let loaded = parse_symbol_graph(GRAPH).unwrap();

        assert_eq!(loaded.model.module(), "Virtualization");
        assert_eq!(loaded.model.len(), 2);
        let vm = loaded.model.get("s:VM").unwrap();
        assert_eq!(vm.kind, SymbolKind::Class);
        assert_eq!(vm.members.len(), 2);
        let boot = loaded.model.get("s:BootState").unwrap();
        assert_eq!(boot.cases.len(), 2);
    }

    #[test]
    fn callback_members_are_skipped_and_counted() {
        let loaded = parse_symbol_graph(GRAPH).unwrap();

        assert_eq!(loaded.skipped_members, 1);
        let vm = loaded.model.get("s:VM").unwrap();
        assert!(vm.members.iter().all(|m| m.name != "onStop"));
    }

    #[test]
    fn loaded_graph_generates_a_header() {
        let loaded = parse_symbol_graph(GRAPH).unwrap();
        let header = cshim_gen::generate(&loaded.model).unwrap();

        assert!(header.contains("typedef void* VirtualMachine;"));
        assert!(header.contains("BootState VirtualMachine_state_get(VirtualMachine self);"));
        assert!(header.contains(
            "bool VirtualMachine_resize_u64u64(VirtualMachine self, uint64_t width, uint64_t height);"
        ));
    }

    #[test]
    fn missing_payload_is_a_malformed_member() {
        let graph = r#"{
            "module": { "name": "Demo" },
            "symbols": [
                {
                    "id": "s:VM",
                    "name": "VM",
                    "kind": "class",
                    "members": [ { "id": "s:VM.x", "name": "x" } ]
                }
            ]
        }"#;

        assert!(matches!(
            parse_symbol_graph(graph),
            Err(LoadError::MalformedMember { .. })
        ));
    }

    #[test]
    fn unknown_primitive_is_rejected() {
        let graph = r#"{
            "module": { "name": "Demo" },
            "symbols": [
                {
                    "id": "s:VM",
                    "name": "VM",
                    "kind": "class",
                    "members": [
                        {
                            "id": "s:VM.x",
                            "name": "x",
                            "property": { "type": { "primitive": "decimal" } }
                        }
                    ]
                }
            ]
        }"#;

        assert!(matches!(
            parse_symbol_graph(graph),
            Err(LoadError::UnknownPrimitive { name }) if name == "decimal"
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let graph = r#"{
            "module": { "name": "Demo" },
            "symbols": [ { "id": "s:F", "name": "F", "kind": "typealias" } ]
        }"#;

        assert!(matches!(parse_symbol_graph(graph), Err(LoadError::Json(_))));
    }

    #[test]
    fn dangling_reference_fails_validation() {
        let graph = r#"{
            "module": { "name": "Demo" },
            "symbols": [
                {
                    "id": "s:VM",
                    "name": "VM",
                    "kind": "class",
                    "members": [
                        {
                            "id": "s:VM.disk",
                            "name": "disk",
                            "property": { "type": { "symbol": "s:Disk" } }
                        }
                    ]
                }
            ]
        }"#;

        assert!(matches!(
            parse_symbol_graph(graph),
            Err(LoadError::Model(ModelError::UnresolvedReference { .. }))
        ));
    }
}
