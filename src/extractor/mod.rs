//! This module contains the type extractor: the pre-order walk over one
//! source unit's AST that populates the [`TypeMap`], and the extraction of
//! each contract's callable API.
//!
//! Extraction leaves [`Type::Reference`] placeholders behind for
//! user-defined type names, because the declaration a use site points at may
//! appear later in the source. The project assembler runs the map's resolve
//! pass once every source unit has been walked; API extraction happens after
//! that pass and therefore only ever sees resolved types.

pub mod project;

use crate::{
    ast::{self, Node, NodeKind, StateMutability, Visibility},
    error::load,
    types::{map::TypeMap, project::Function, ArrayLength, StructField, Type},
};

/// Extracts the contract definitions that are direct children of a source
/// unit root, in source order.
#[must_use]
pub fn contract_definitions(root: &Node) -> Vec<&Node> {
    root.children()
        .iter()
        .filter(|child| matches!(child.kind, NodeKind::ContractDefinition(_)))
        .collect()
}

/// Walks one source unit in pre-order and records a type for every
/// type-bearing node, keyed by node id.
///
/// The walk tracks the enclosing contract's name as it goes: the compiler
/// emits no canonical name for events, so the extractor derives
/// `Contract.Event` itself, which is only possible when the contract
/// definition has been visited before the events inside it.
///
/// # Errors
///
/// Returns a [`load::Error`] when a type-bearing node does not have the
/// child shape the compiler documents for it.
pub fn source_unit_types(path: &str, root: &Node) -> load::Result<TypeMap> {
    let mut map = TypeMap::new();
    let mut contract_name = String::new();
    let mut failure = None;

    ast::pre_traverse(root, &mut |node| {
        if failure.is_some() {
            return;
        }
        let extracted = match &node.kind {
            NodeKind::ContractDefinition(definition) => {
                contract_name = definition.name.clone();
                Some(Ok(contract_type(path, definition)))
            }
            NodeKind::ElementaryTypeName(_)
            | NodeKind::UserDefinedTypeName(_)
            | NodeKind::ArrayTypeName(_)
            | NodeKind::StructDefinition(_)
            | NodeKind::EnumDefinition(_)
            | NodeKind::Mapping(_) => Some(node_type(path, node)),
            NodeKind::EventDefinition(_) => Some(event_type(path, node, &contract_name)),
            _ => None,
        };
        if let Some(result) = extracted {
            match result {
                Ok(typ) => map.insert(node.id, typ),
                Err(error) => failure = Some(error),
            }
        }
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(map),
    }
}

/// Extracts the type a node declares or names.
///
/// Handles every type-bearing node kind except events, which need the
/// enclosing contract's name and are extracted by the traversal directly.
fn node_type(path: &str, node: &Node) -> load::Result<Type> {
    match &node.kind {
        NodeKind::ContractDefinition(definition) => Ok(contract_type(path, definition)),
        NodeKind::UserDefinedTypeName(use_site) => {
            Ok(Type::Reference(use_site.referenced_declaration))
        }
        NodeKind::ElementaryTypeName(name) => Ok(Type::Elementary(name.type_name.clone())),
        NodeKind::ArrayTypeName(_) => array_type(path, node),
        NodeKind::StructDefinition(_) => struct_type(path, node),
        NodeKind::EnumDefinition(_) => enum_type(path, node),
        NodeKind::Mapping(_) => mapping_type(path, node),
        other => Err(load::Error::UnexpectedNode {
            node:     other.name().to_owned(),
            expected: "a type-bearing node".to_owned(),
        }),
    }
}

fn contract_type(path: &str, definition: &ast::ContractDefinition) -> Type {
    let qualified = format!("{path}:{}", definition.name);
    match definition.contract_kind {
        ast::ContractKind::Contract => Type::ContractAddress(qualified),
        ast::ContractKind::Interface => Type::InterfaceAddress(qualified),
        ast::ContractKind::Library => Type::LibraryAddress(qualified),
    }
}

fn array_type(path: &str, node: &Node) -> load::Result<Type> {
    let NodeKind::ArrayTypeName(attributes) = &node.kind else {
        unreachable!("array_type is only called on ArrayTypeName nodes")
    };
    match node.children() {
        [element] => Ok(Type::Array {
            length:  ArrayLength::Dynamic,
            element: Box::new(node_type(path, element)?),
        }),
        [element, _length_expression] => {
            // The second child is the length expression, which may be any
            // constant expression. The compiler has already evaluated it
            // into the node's type string, so parse the trailing `[N]` out
            // of that rather than evaluating expressions here.
            let length = fixed_length(&attributes.type_name)?;
            Ok(Type::Array {
                length:  ArrayLength::Fixed(length),
                element: Box::new(node_type(path, element)?),
            })
        }
        children => Err(load::Error::MalformedArrayTypeName {
            found: children.len(),
        }),
    }
}

fn fixed_length(type_name: &str) -> load::Result<usize> {
    let malformed = || load::Error::MalformedArrayLength {
        type_name: type_name.to_owned(),
    };
    let open = type_name.rfind('[').ok_or_else(malformed)?;
    let digits = type_name[open + 1..]
        .strip_suffix(']')
        .ok_or_else(malformed)?;
    digits.parse().map_err(|_| malformed())
}

fn struct_type(path: &str, node: &Node) -> load::Result<Type> {
    let NodeKind::StructDefinition(definition) = &node.kind else {
        unreachable!("struct_type is only called on StructDefinition nodes")
    };
    let fields = node
        .children()
        .iter()
        .map(|child| {
            let NodeKind::VariableDeclaration(declaration) = &child.kind else {
                return Err(load::Error::UnexpectedNode {
                    node:     child.name().to_owned(),
                    expected: "VariableDeclaration".to_owned(),
                });
            };
            let typ = declared_type(path, child)?;
            Ok(StructField::new(declaration.name.clone(), typ))
        })
        .collect::<load::Result<Vec<_>>>()?;

    Ok(Type::named(
        format!("{path}:{}", definition.canonical_name),
        Type::Struct { fields },
    ))
}

fn enum_type(path: &str, node: &Node) -> load::Result<Type> {
    let NodeKind::EnumDefinition(definition) = &node.kind else {
        unreachable!("enum_type is only called on EnumDefinition nodes")
    };
    let cases = node
        .children()
        .iter()
        .map(|child| match &child.kind {
            NodeKind::EnumValue(case) => Ok(case.name.clone()),
            other => Err(load::Error::UnexpectedNode {
                node:     other.name().to_owned(),
                expected: "EnumValue".to_owned(),
            }),
        })
        .collect::<load::Result<Vec<_>>>()?;

    Ok(Type::named(
        format!("{path}:{}", definition.canonical_name),
        Type::Enum(cases),
    ))
}

fn event_type(path: &str, node: &Node, contract_name: &str) -> load::Result<Type> {
    let NodeKind::EventDefinition(definition) = &node.kind else {
        unreachable!("event_type is only called on EventDefinition nodes")
    };
    let [parameters] = node.children() else {
        return Err(load::Error::MalformedEventDefinition {
            found: node.children().len(),
        });
    };
    if !matches!(parameters.kind, NodeKind::ParameterList) {
        return Err(load::Error::UnexpectedNode {
            node:     parameters.name().to_owned(),
            expected: "ParameterList".to_owned(),
        });
    }

    let args = parameters
        .children()
        .iter()
        .map(|parameter| {
            if !matches!(parameter.kind, NodeKind::VariableDeclaration(_)) {
                return Err(load::Error::UnexpectedNode {
                    node:     parameter.name().to_owned(),
                    expected: "VariableDeclaration".to_owned(),
                });
            }
            declared_type(path, parameter)
        })
        .collect::<load::Result<Vec<_>>>()?;

    Ok(Type::named(
        format!("{path}:{contract_name}.{}", definition.name),
        Type::Event {
            name: definition.name.clone(),
            args,
        },
    ))
}

fn mapping_type(path: &str, node: &Node) -> load::Result<Type> {
    let [key, value] = node.children() else {
        return Err(load::Error::MalformedMapping {
            found: node.children().len(),
        });
    };
    Ok(Type::Mapping {
        key:   Box::new(node_type(path, key)?),
        value: Box::new(node_type(path, value)?),
    })
}

/// Extracts the type of a variable declaration's single type-name child.
fn declared_type(path: &str, declaration: &Node) -> load::Result<Type> {
    let [type_name] = declaration.children() else {
        return Err(load::Error::MalformedVariableDeclaration {
            found: declaration.children().len(),
        });
    };
    node_type(path, type_name)
}

/// Extracts the callable API of one contract definition: synthesised
/// getters for its public state variables and every non-constructor
/// function. Inherited functions are reached through the contract's parents
/// at lookup time, not duplicated here.
///
/// # Errors
///
/// Returns a [`load::Error`] when a function or variable does not have the
/// child shape the compiler documents.
pub fn contract_api(contract: &Node, type_map: &TypeMap) -> load::Result<Vec<Function>> {
    let children = contract.children();
    let mut extracted = Vec::with_capacity(children.len());
    for child in children {
        match &child.kind {
            NodeKind::VariableDeclaration(declaration) => {
                // Only public and external state variables export getters.
                if matches!(
                    declaration.visibility,
                    Visibility::Public | Visibility::External
                ) {
                    extracted.push(variable_getter(declaration, child, type_map)?);
                }
            }
            NodeKind::FunctionDefinition(definition) if !definition.is_constructor => {
                extracted.push(function_api(definition, child, type_map)?);
            }
            _ => {}
        }
    }
    Ok(extracted)
}

/// Synthesises the getter function Solidity generates for a public state
/// variable.
///
/// The accessor's parameters are collected by descending the variable's
/// type: each mapping layer contributes its key type, each array layer an
/// index of `uint256`, stopping at the first type that is neither. That
/// concrete tail is the getter's single output.
fn variable_getter(
    declaration: &ast::VariableDeclaration,
    node: &Node,
    type_map: &TypeMap,
) -> load::Result<Function> {
    let [type_name] = node.children() else {
        return Err(load::Error::MalformedVariableDeclaration {
            found: node.children().len(),
        });
    };
    let typ = type_map.deref(type_name.id).clone();
    let (inputs, output) = accessor_parameters(typ, Vec::new());

    Ok(Function {
        name: declaration.name.clone(),
        natspec: None,
        visibility: declaration.visibility,
        // Generated getters read state and never write it.
        state_mutability: StateMutability::View,
        inputs,
        outputs: vec![output],
    })
}

fn accessor_parameters(typ: Type, mut collected: Vec<Type>) -> (Vec<Type>, Type) {
    match typ {
        Type::Mapping { key, value } => {
            collected.push(*key);
            accessor_parameters(*value, collected)
        }
        Type::Array { element, .. } => {
            collected.push(Type::elementary("uint256"));
            accessor_parameters(*element, collected)
        }
        concrete => (collected, concrete),
    }
}

/// Extracts a function definition's type information.
fn function_api(
    definition: &ast::FunctionDefinition,
    node: &Node,
    type_map: &TypeMap,
) -> load::Result<Function> {
    let [inputs_node, outputs_node, ..] = node.children() else {
        return Err(load::Error::UnexpectedNode {
            node:     format!("FunctionDefinition {}", definition.name),
            expected: "two leading ParameterList children".to_owned(),
        });
    };
    for parameters in [inputs_node, outputs_node] {
        if !matches!(parameters.kind, NodeKind::ParameterList) {
            return Err(load::Error::UnexpectedNode {
                node:     parameters.name().to_owned(),
                expected: "ParameterList".to_owned(),
            });
        }
    }

    let inputs = parameter_types(inputs_node, type_map)?;
    let outputs = parameter_types(outputs_node, type_map)?;
    assert!(
        inputs
            .iter()
            .chain(outputs.iter())
            .all(|typ| !typ.contains_reference()),
        "unresolved reference in the parameters of {}",
        definition.name
    );

    // The payable flag subsumes the mutability attribute on older compiler
    // output that predates the `payable` mutability.
    let state_mutability = if definition.payable {
        StateMutability::Payable
    } else {
        definition.state_mutability
    };

    Ok(Function {
        name: definition.name.clone(),
        natspec: definition.documentation.clone(),
        visibility: definition.visibility,
        state_mutability,
        inputs,
        outputs,
    })
}

fn parameter_types(parameters: &Node, type_map: &TypeMap) -> load::Result<Vec<Type>> {
    parameters
        .children()
        .iter()
        .map(|parameter| {
            if !matches!(parameter.kind, NodeKind::VariableDeclaration(_)) {
                return Err(load::Error::UnexpectedNode {
                    node:     parameter.name().to_owned(),
                    expected: "VariableDeclaration".to_owned(),
                });
            }
            let [type_name] = parameter.children() else {
                return Err(load::Error::MalformedVariableDeclaration {
                    found: parameter.children().len(),
                });
            };
            Ok(type_map.deref(type_name.id).clone())
        })
        .collect()
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{contract_api, contract_definitions, source_unit_types};
    use crate::{
        ast::{self, StateMutability, Visibility},
        types::{ArrayLength, StructField, Type},
    };

    /// A hand-written source unit exercising every type-bearing node: a
    /// contract with an enum, a struct referencing it, an event, a public
    /// mapping variable, and a transfer function.
    fn example_unit() -> ast::Node {
        let unit = json!({
            "id": 100, "name": "SourceUnit", "src": "0:0:0",
            "attributes": {},
            "children": [{
                "id": 99, "name": "ContractDefinition", "src": "0:0:0",
                "attributes": {
                    "name": "Registry",
                    "contractKind": "contract",
                    "linearizedBaseContracts": [99]
                },
                "children": [
                    {
                        "id": 3, "name": "EnumDefinition", "src": "0:0:0",
                        "attributes": {"canonicalName": "Registry.Status", "name": "Status"},
                        "children": [
                            {"id": 1, "name": "EnumValue", "src": "0:0:0", "attributes": {"name": "Open"}},
                            {"id": 2, "name": "EnumValue", "src": "0:0:0", "attributes": {"name": "Closed"}}
                        ]
                    },
                    {
                        "id": 8, "name": "StructDefinition", "src": "0:0:0",
                        "attributes": {"canonicalName": "Registry.Entry", "name": "Entry"},
                        "children": [
                            {
                                "id": 5, "name": "VariableDeclaration", "src": "0:0:0",
                                "attributes": {"name": "status", "type": "enum Registry.Status"},
                                "children": [{
                                    "id": 4, "name": "UserDefinedTypeName", "src": "0:0:0",
                                    "attributes": {"name": "Status", "referencedDeclaration": 3, "type": "enum Registry.Status"}
                                }]
                            },
                            {
                                "id": 7, "name": "VariableDeclaration", "src": "0:0:0",
                                "attributes": {"name": "scores", "type": "uint256[3]"},
                                "children": [{
                                    "id": 6, "name": "ArrayTypeName", "src": "0:0:0",
                                    "attributes": {"type": "uint256[3]"},
                                    "children": [
                                        {"id": 60, "name": "ElementaryTypeName", "src": "0:0:0",
                                         "attributes": {"name": "uint256", "type": "uint256"}},
                                        {"id": 61, "name": "Literal", "src": "0:0:0",
                                         "attributes": {"value": "3", "type": "int_const 3"}}
                                    ]
                                }]
                            }
                        ]
                    },
                    {
                        "id": 12, "name": "EventDefinition", "src": "0:0:0",
                        "attributes": {"name": "Registered"},
                        "children": [{
                            "id": 11, "name": "ParameterList", "src": "0:0:0",
                            "children": [{
                                "id": 10, "name": "VariableDeclaration", "src": "0:0:0",
                                "attributes": {"name": "who", "type": "address"},
                                "children": [{
                                    "id": 9, "name": "ElementaryTypeName", "src": "0:0:0",
                                    "attributes": {"name": "address", "type": "address"}
                                }]
                            }]
                        }]
                    },
                    {
                        "id": 16, "name": "VariableDeclaration", "src": "0:0:0",
                        "attributes": {
                            "name": "entries", "stateVariable": true, "visibility": "public",
                            "type": "mapping(address => uint256)"
                        },
                        "children": [{
                            "id": 15, "name": "Mapping", "src": "0:0:0",
                            "attributes": {"type": "mapping(address => uint256)"},
                            "children": [
                                {"id": 13, "name": "ElementaryTypeName", "src": "0:0:0",
                                 "attributes": {"name": "address", "type": "address"}},
                                {"id": 14, "name": "ElementaryTypeName", "src": "0:0:0",
                                 "attributes": {"name": "uint256", "type": "uint256"}}
                            ]
                        }]
                    },
                    {
                        "id": 23, "name": "FunctionDefinition", "src": "0:0:0",
                        "attributes": {
                            "name": "register", "visibility": "public",
                            "stateMutability": "nonpayable", "isConstructor": false
                        },
                        "children": [
                            {
                                "id": 20, "name": "ParameterList", "src": "0:0:0",
                                "children": [{
                                    "id": 19, "name": "VariableDeclaration", "src": "0:0:0",
                                    "attributes": {"name": "who", "type": "address"},
                                    "children": [{
                                        "id": 18, "name": "ElementaryTypeName", "src": "0:0:0",
                                        "attributes": {"name": "address", "type": "address"}
                                    }]
                                }]
                            },
                            {
                                "id": 22, "name": "ParameterList", "src": "0:0:0",
                                "children": [{
                                    "id": 21, "name": "VariableDeclaration", "src": "0:0:0",
                                    "attributes": {"name": "", "type": "enum Registry.Status"},
                                    "children": [{
                                        "id": 24, "name": "UserDefinedTypeName", "src": "0:0:0",
                                        "attributes": {"name": "Status", "referencedDeclaration": 3, "type": "enum Registry.Status"}
                                    }]
                                }]
                            },
                            {"id": 25, "name": "Block", "src": "0:0:0"}
                        ]
                    }
                ]
            }]
        });
        ast::parse(&unit).expect("the example unit should parse")
    }

    #[test]
    fn extracts_declarations_and_use_sites() -> anyhow::Result<()> {
        let root = example_unit();
        let map = source_unit_types("registry.sol", &root)?;

        assert_eq!(
            map.get(99),
            Some(&Type::ContractAddress("registry.sol:Registry".into()))
        );
        assert_eq!(
            map.get(3),
            Some(&Type::named(
                "registry.sol:Registry.Status",
                Type::Enum(vec!["Open".into(), "Closed".into()]),
            ))
        );
        assert_eq!(map.get(4), Some(&Type::Reference(3)));
        assert_eq!(map.get(60), Some(&Type::elementary("uint256")));
        Ok(())
    }

    #[test]
    fn array_lengths_come_from_the_type_string() -> anyhow::Result<()> {
        let root = example_unit();
        let map = source_unit_types("registry.sol", &root)?;

        let Some(Type::Array { length, element }) = map.get(6) else {
            panic!("node 6 should be an array type")
        };
        assert_eq!(*length, ArrayLength::Fixed(3));
        assert_eq!(**element, Type::elementary("uint256"));
        Ok(())
    }

    #[test]
    fn struct_fields_keep_declaration_order() -> anyhow::Result<()> {
        let root = example_unit();
        let mut map = source_unit_types("registry.sol", &root)?;
        map.resolve_references();

        let Some(Type::Named { name, inner }) = map.get(8) else {
            panic!("node 8 should be a named struct")
        };
        assert_eq!(name, "registry.sol:Registry.Entry");
        let Type::Struct { fields } = inner.as_ref() else {
            panic!("the named payload should be a struct")
        };
        assert_eq!(fields[0].name, "status");
        assert!(matches!(&fields[0].typ, Type::Named { inner, .. }
            if matches!(inner.as_ref(), Type::Enum(_))));
        assert_eq!(
            fields[1],
            StructField::new("scores", Type::array(3, Type::elementary("uint256"))),
        );
        Ok(())
    }

    #[test]
    fn events_get_canonical_names_from_their_contract() -> anyhow::Result<()> {
        let root = example_unit();
        let map = source_unit_types("registry.sol", &root)?;

        assert_eq!(
            map.get(12),
            Some(&Type::named(
                "registry.sol:Registry.Registered",
                Type::Event {
                    name: "Registered".into(),
                    args: vec![Type::elementary("address")],
                },
            ))
        );
        Ok(())
    }

    #[test]
    fn api_includes_functions_and_getters() -> anyhow::Result<()> {
        let root = example_unit();
        let mut map = source_unit_types("registry.sol", &root)?;
        map.resolve_references();

        let definitions = contract_definitions(&root);
        assert_eq!(definitions.len(), 1);
        let api = contract_api(definitions[0], &map)?;
        assert_eq!(api.len(), 2);

        let getter = &api[0];
        assert_eq!(getter.name, "entries");
        assert_eq!(getter.visibility, Visibility::Public);
        assert_eq!(getter.state_mutability, StateMutability::View);
        assert_eq!(getter.inputs, vec![Type::elementary("address")]);
        assert_eq!(getter.outputs, vec![Type::elementary("uint256")]);
        assert_eq!(getter.signature(), "entries(address)");

        let register = &api[1];
        assert_eq!(register.signature(), "register(address)");
        assert_eq!(register.outputs.len(), 1);
        Ok(())
    }
}
