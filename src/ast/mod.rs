//! This module contains the loader for the Solidity compiler's "combined
//! JSON" output, together with the typed AST node tree it produces.
//!
//! The combined JSON is the sole input to the library. Every AST node in it
//! carries `{id, name, src, attributes, children[]}`; the loader decodes the
//! node kinds it recognises into typed variants, keeps the raw attribute
//! payload around for inspection, and retains anything it does not recognise
//! as an opaque [`NodeKind::Ignored`] node. Unknown nodes are not an error.

use std::collections::{HashMap, HashSet};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::load;

/// The identifier the compiler assigns to each AST node.
///
/// Identifiers are unique within one combined JSON blob, across all of its
/// source units.
pub type NodeId = i64;

/// The top-most structure of the combined JSON: all source files involved in
/// one compilation, their ASTs, and the compiled contract binaries.
#[derive(Clone, Debug, Deserialize)]
pub struct Combined {
    /// Compiled binaries keyed by `<path>:<ContractName>`.
    #[serde(default)]
    pub contracts: HashMap<String, CompiledContract>,

    /// All source unit paths, in compilation order.
    #[serde(rename = "sourceList", default)]
    pub source_list: Vec<String>,

    /// The raw AST of each source unit, keyed by path.
    #[serde(default)]
    pub sources: HashMap<String, CombinedSource>,

    /// The compiler version string.
    #[serde(default)]
    pub version: String,
}

/// A compiled contract's binary payload in hex.
#[derive(Clone, Debug, Deserialize)]
pub struct CompiledContract {
    #[serde(rename = "bin", default)]
    pub binary: String,
}

/// The per-source-unit wrapper around the raw AST.
#[derive(Clone, Debug, Deserialize)]
pub struct CombinedSource {
    #[serde(rename = "AST")]
    pub ast: Value,
}

/// A contract's definition kind.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    #[default]
    Contract,
    Interface,
    Library,
}

/// A Solidity function's or variable's visibility.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Internal,
    External,
    Private,
}

/// A Solidity function's state mutability.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    Nonpayable,
    Payable,
}

/// A Solidity variable's storage location.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    #[default]
    Default,
    Memory,
    Storage,
    Calldata,
}

/// One node of a parsed AST.
///
/// The common header fields live here; the per-kind attributes live in the
/// [`NodeKind`] variant. The raw attribute payload is retained verbatim so
/// that callers can reach fields the typed decoding does not surface.
#[derive(Clone, Debug)]
pub struct Node {
    /// The compiler-assigned node id.
    pub id: NodeId,

    /// The `start:length:file` source mapping of the node.
    pub src: String,

    /// The raw attribute payload, exactly as it appeared in the JSON.
    pub attributes: Value,

    /// The typed decoding of the node.
    pub kind: NodeKind,

    children: Vec<Node>,
}

impl Node {
    /// Gets the node's children, in source order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Gets the node kind's name as it appears in the JSON.
    #[must_use]
    pub fn name(&self) -> &str {
        self.kind.name()
    }
}

/// The typed decoding of each recognised AST node kind.
///
/// The variants carry only the attributes the library consumes; everything
/// else remains reachable through [`Node::attributes`].
#[derive(Clone, Debug)]
pub enum NodeKind {
    SourceUnit(SourceUnit),
    PragmaDirective(PragmaDirective),
    ContractDefinition(ContractDefinition),
    StructDefinition(StructDefinition),
    VariableDeclaration(VariableDeclaration),
    ElementaryTypeName(ElementaryTypeName),
    ModifierDefinition(ModifierDefinition),
    ParameterList,
    FunctionDefinition(FunctionDefinition),
    UserDefinedTypeName(UserDefinedTypeName),
    ModifierInvocation,
    Identifier(Identifier),
    InheritanceSpecifier,
    EnumDefinition(EnumDefinition),
    EnumValue(EnumValue),
    Mapping(Mapping),
    ArrayTypeName(ArrayTypeName),
    UsingForDirective,
    Literal(Literal),
    ImportDirective(ImportDirective),
    EventDefinition(EventDefinition),
    Block,

    /// A node kind the loader does not recognise, retained opaquely.
    Ignored { name: String },
}

impl NodeKind {
    /// Gets the kind's name as it appears in the combined JSON.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SourceUnit(_) => "SourceUnit",
            Self::PragmaDirective(_) => "PragmaDirective",
            Self::ContractDefinition(_) => "ContractDefinition",
            Self::StructDefinition(_) => "StructDefinition",
            Self::VariableDeclaration(_) => "VariableDeclaration",
            Self::ElementaryTypeName(_) => "ElementaryTypeName",
            Self::ModifierDefinition(_) => "ModifierDefinition",
            Self::ParameterList => "ParameterList",
            Self::FunctionDefinition(_) => "FunctionDefinition",
            Self::UserDefinedTypeName(_) => "UserDefinedTypeName",
            Self::ModifierInvocation => "ModifierInvocation",
            Self::Identifier(_) => "Identifier",
            Self::InheritanceSpecifier => "InheritanceSpecifier",
            Self::EnumDefinition(_) => "EnumDefinition",
            Self::EnumValue(_) => "EnumValue",
            Self::Mapping(_) => "Mapping",
            Self::ArrayTypeName(_) => "ArrayTypeName",
            Self::UsingForDirective => "UsingForDirective",
            Self::Literal(_) => "Literal",
            Self::ImportDirective(_) => "ImportDirective",
            Self::EventDefinition(_) => "EventDefinition",
            Self::Block => "Block",
            Self::Ignored { name } => name.as_str(),
        }
    }
}

/// The attributes of a source unit: one Solidity file's definitions.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUnit {
    #[serde(default)]
    pub absolute_path: Option<String>,
    #[serde(default)]
    pub exported_symbols: HashMap<String, Vec<NodeId>>,
}

/// The attributes of a file-level pragma declaration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PragmaDirective {
    #[serde(default)]
    pub literals: Vec<String>,
}

/// The attributes of a contract definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: NodeId,
    #[serde(default)]
    pub fully_implemented: bool,

    /// The inheritance linearisation computed by the compiler. The first
    /// element is always the contract's own id.
    #[serde(default)]
    pub linearized_base_contracts: Vec<NodeId>,

    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub contract_kind: ContractKind,
}

/// The attributes of a struct definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructDefinition {
    #[serde(default)]
    pub canonical_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: NodeId,
    #[serde(default)]
    pub visibility: Visibility,
}

/// The attributes of a variable declaration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDeclaration {
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: NodeId,
    #[serde(default)]
    pub state_variable: bool,
    #[serde(default)]
    pub storage_location: StorageLocation,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// The attributes of an elementary type name such as `uint256`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementaryTypeName {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// The attributes of a modifier definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// The attributes of a function definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub implemented: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub payable: bool,
    #[serde(default)]
    pub scope: NodeId,
    #[serde(default)]
    pub state_mutability: StateMutability,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub documentation: Option<String>,
}

/// The attributes of a user-defined type name: a use site of an enum,
/// struct or contract type. The referenced declaration may appear later in
/// the source, making this a forward reference.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefinedTypeName {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub referenced_declaration: NodeId,
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// The attributes of an identifier use site.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub referenced_declaration: NodeId,
}

/// The attributes of an enum definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDefinition {
    #[serde(default)]
    pub canonical_name: String,
    #[serde(default)]
    pub name: String,
}

/// The attributes of one case of an enum definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    #[serde(default)]
    pub name: String,
}

/// The attributes of a mapping type name.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// The attributes of an array type name such as `int32[8]`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayTypeName {
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// The attributes of a literal.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Literal {
    #[serde(default)]
    pub hexvalue: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_constant: bool,
    #[serde(default)]
    pub is_l_value: bool,
    #[serde(default)]
    pub is_pure: bool,
    #[serde(default)]
    pub l_value_requested: bool,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
}

/// The attributes of an import declaration, kept raw.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDirective {
    #[serde(rename = "SourceUnit", default)]
    pub source_unit: Value,
    #[serde(default)]
    pub absolute_path: Value,
    #[serde(default)]
    pub file: Value,
    #[serde(default)]
    pub scope: Value,
    #[serde(default)]
    pub symbol_aliases: Value,
    #[serde(default)]
    pub unit_alias: Value,
}

/// The attributes of an event definition.
///
/// The compiler emits no canonical name for events; the extractor derives
/// one from the enclosing contract during its walk.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    #[serde(default)]
    pub name: String,
}

/// The raw shape shared by every AST node.
#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    id: NodeId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    src: String,
    #[serde(default)]
    attributes: Value,
    #[serde(default)]
    children: Vec<Value>,
}

/// Parses a raw AST representation into a [`Node`] tree.
///
/// Node kinds the loader does not recognise are retained as
/// [`NodeKind::Ignored`] and reported once per kind at debug level; they are
/// not an error.
///
/// # Errors
///
/// Returns [`load::Error::MalformedNode`] when the JSON does not have the
/// `{id, name, src, attributes, children[]}` node shape, or when a
/// recognised node's attributes fail to decode.
pub fn parse(raw: &Value) -> load::Result<Node> {
    let mut seen_unknown = HashSet::new();
    parse_node(raw, &mut seen_unknown)
}

fn parse_node(raw: &Value, seen_unknown: &mut HashSet<String>) -> load::Result<Node> {
    let raw_node: RawNode =
        serde_json::from_value(raw.clone()).map_err(|e| load::Error::MalformedNode {
            reason: e.to_string(),
        })?;

    let kind = match raw_node.name.as_str() {
        "SourceUnit" => NodeKind::SourceUnit(attributes(&raw_node)?),
        "PragmaDirective" => NodeKind::PragmaDirective(attributes(&raw_node)?),
        "ContractDefinition" => NodeKind::ContractDefinition(attributes(&raw_node)?),
        "StructDefinition" => NodeKind::StructDefinition(attributes(&raw_node)?),
        "VariableDeclaration" => NodeKind::VariableDeclaration(attributes(&raw_node)?),
        "ElementaryTypeName" => NodeKind::ElementaryTypeName(attributes(&raw_node)?),
        "ModifierDefinition" => NodeKind::ModifierDefinition(attributes(&raw_node)?),
        "ParameterList" => NodeKind::ParameterList,
        "FunctionDefinition" => NodeKind::FunctionDefinition(attributes(&raw_node)?),
        "UserDefinedTypeName" => NodeKind::UserDefinedTypeName(attributes(&raw_node)?),
        "ModifierInvocation" => NodeKind::ModifierInvocation,
        "Identifier" => NodeKind::Identifier(attributes(&raw_node)?),
        "InheritanceSpecifier" => NodeKind::InheritanceSpecifier,
        "EnumDefinition" => NodeKind::EnumDefinition(attributes(&raw_node)?),
        "EnumValue" => NodeKind::EnumValue(attributes(&raw_node)?),
        "Mapping" => NodeKind::Mapping(attributes(&raw_node)?),
        "ArrayTypeName" => NodeKind::ArrayTypeName(attributes(&raw_node)?),
        "UsingForDirective" => NodeKind::UsingForDirective,
        "Literal" => NodeKind::Literal(attributes(&raw_node)?),
        "ImportDirective" => NodeKind::ImportDirective(attributes(&raw_node)?),
        "EventDefinition" => NodeKind::EventDefinition(attributes(&raw_node)?),
        "Block" => NodeKind::Block,
        unknown => {
            if seen_unknown.insert(unknown.to_owned()) {
                tracing::debug!(node = unknown, "ignoring unrecognised AST node kind");
            }
            NodeKind::Ignored {
                name: unknown.to_owned(),
            }
        }
    };

    let children = raw_node
        .children
        .iter()
        .map(|child| parse_node(child, seen_unknown))
        .collect::<load::Result<Vec<_>>>()?;

    Ok(Node {
        id: raw_node.id,
        src: raw_node.src,
        attributes: raw_node.attributes,
        kind,
        children,
    })
}

/// Decodes a raw node's attribute payload into the typed attributes for its
/// kind. An absent or null payload decodes as all-defaults.
fn attributes<T: DeserializeOwned + Default>(raw: &RawNode) -> load::Result<T> {
    if raw.attributes.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(raw.attributes.clone()).map_err(|e| load::Error::MalformedNode {
        reason: format!("{} attributes: {e}", raw.name),
    })
}

/// Traverses a node tree in pre-order.
pub fn pre_traverse<'a>(root: &'a Node, f: &mut dyn FnMut(&'a Node)) {
    f(root);
    for child in root.children() {
        pre_traverse(child, f);
    }
}

/// Traverses a node tree in post-order.
pub fn post_traverse<'a>(root: &'a Node, f: &mut dyn FnMut(&'a Node)) {
    for child in root.children() {
        post_traverse(child, f);
    }
    f(root);
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{parse, post_traverse, pre_traverse, NodeKind};

    fn example_unit() -> serde_json::Value {
        json!({
            "id": 10,
            "name": "SourceUnit",
            "src": "0:120:0",
            "attributes": {"absolutePath": "box/Box.sol", "exportedSymbols": {"Box": [9]}},
            "children": [
                {
                    "id": 9,
                    "name": "ContractDefinition",
                    "src": "0:118:0",
                    "attributes": {
                        "name": "Box",
                        "contractKind": "contract",
                        "fullyImplemented": true,
                        "linearizedBaseContracts": [9],
                        "documentation": null
                    },
                    "children": [
                        {
                            "id": 3,
                            "name": "InlineAssembly",
                            "src": "10:5:0",
                            "attributes": {"operations": "{}"},
                            "children": []
                        },
                        {"id": 4, "name": "Block", "src": "20:2:0"}
                    ]
                }
            ]
        })
    }

    #[test]
    fn parses_recognised_nodes() -> anyhow::Result<()> {
        let root = parse(&example_unit())?;

        assert_eq!(root.id, 10);
        assert_eq!(root.name(), "SourceUnit");
        let NodeKind::SourceUnit(unit) = &root.kind else {
            panic!("expected a SourceUnit root")
        };
        assert_eq!(unit.absolute_path.as_deref(), Some("box/Box.sol"));

        let contract = &root.children()[0];
        let NodeKind::ContractDefinition(definition) = &contract.kind else {
            panic!("expected a ContractDefinition child")
        };
        assert_eq!(definition.name, "Box");
        assert_eq!(definition.linearized_base_contracts, vec![9]);
        assert_eq!(definition.documentation, None);

        Ok(())
    }

    #[test]
    fn retains_unknown_nodes_as_ignored() -> anyhow::Result<()> {
        let root = parse(&example_unit())?;
        let unknown = &root.children()[0].children()[0];

        assert!(matches!(&unknown.kind, NodeKind::Ignored { name } if name == "InlineAssembly"));
        assert_eq!(unknown.attributes["operations"], json!("{}"));

        Ok(())
    }

    #[test]
    fn tolerates_absent_attributes() -> anyhow::Result<()> {
        let root = parse(&json!({"id": 1, "name": "ParameterList", "src": "0:0:0"}))?;
        assert!(matches!(root.kind, NodeKind::ParameterList));

        let root = parse(&json!({
            "id": 2, "name": "FunctionDefinition", "src": "0:0:0", "attributes": null
        }))?;
        let NodeKind::FunctionDefinition(function) = &root.kind else {
            panic!("expected a FunctionDefinition")
        };
        assert!(!function.is_constructor);

        Ok(())
    }

    #[test]
    fn rejects_malformed_attributes() {
        let result = parse(&json!({
            "id": 3,
            "name": "ContractDefinition",
            "src": "0:0:0",
            "attributes": {"contractKind": "monad"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn traversal_orders() -> anyhow::Result<()> {
        let root = parse(&example_unit())?;

        let mut pre = Vec::new();
        pre_traverse(&root, &mut |node| pre.push(node.id));
        assert_eq!(pre, vec![10, 9, 3, 4]);

        let mut post = Vec::new();
        post_traverse(&root, &mut |node| post.push(node.id));
        assert_eq!(post, vec![3, 4, 9, 10]);

        Ok(())
    }
}
