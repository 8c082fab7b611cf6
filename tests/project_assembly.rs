//! This module is an integration test that loads a small, hand-compiled
//! two-file project and checks the assembled model end to end: path
//! stripping, inheritance, getters, user-defined types, and call-data
//! construction through the codec.
#![cfg(test)]

use abi_link::{
    ast::{ContractKind, StateMutability, Visibility},
    call_data, decode, encode, load_project, selector,
    types::Type,
};
use serde_json::json;

const COMBINED_JSON: &str = include_str!("asset/combined.json");

#[test]
fn strips_the_shared_path_prefix() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;

    assert_eq!(project.root(), "ex/contracts/");
    assert!(project.contract("Ownable.sol", "Ownable").is_some());
    assert!(project.contract("erc20/Token.sol", "Token").is_some());
    Ok(())
}

#[test]
fn attaches_compiled_binaries_by_unstripped_key() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;

    let token = project.contract("erc20/Token.sol", "Token").unwrap();
    let binary = token.binary.as_deref().expect("Token was compiled");
    assert_eq!(binary.len(), 18);
    assert_eq!(&binary[..2], [0x60, 0x80]);

    let ownable = project.contract("Ownable.sol", "Ownable").unwrap();
    assert!(ownable.binary.is_none());
    Ok(())
}

#[test]
fn builds_the_api_without_the_constructor() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;
    let token = project.contract("erc20/Token.sol", "Token").unwrap();

    assert_eq!(token.kind, ContractKind::Contract);
    assert_eq!(token.natspec.as_deref(), Some("A minimal token."));
    assert_eq!(token.parents, vec![20]);

    // accounts getter, transfer, phaseOf, and the fallback; no constructor.
    assert_eq!(token.api.len(), 4);
    assert!(token.api.contains_key("accounts(address)"));
    assert!(token.api.contains_key("transfer(address,uint256)"));
    assert!(token.api.contains_key("phaseOf(address)"));
    assert!(token.api.contains_key("()"));
    assert!(!token.api.keys().any(|sig| sig.starts_with("Token(")));

    let fallback = &token.api["()"];
    assert!(fallback.is_fallback());
    assert_eq!(fallback.state_mutability, StateMutability::Payable);
    Ok(())
}

#[test]
fn synthesises_the_mapping_getter() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;
    let token = project.contract("erc20/Token.sol", "Token").unwrap();

    let getter = &token.api["accounts(address)"];
    assert_eq!(getter.visibility, Visibility::Public);
    assert_eq!(getter.state_mutability, StateMutability::View);
    assert_eq!(getter.inputs, vec![Type::elementary("address")]);

    // The mapping's value type is the named struct, reference-free.
    let [output] = getter.outputs.as_slice() else {
        panic!("the getter returns a single value")
    };
    assert!(!output.contains_reference());
    assert_eq!(output.solidity_signature(), "(uint256,uint8)");
    Ok(())
}

#[test]
fn registers_user_defined_types_per_contract() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;

    let token = project.contract("erc20/Token.sol", "Token").unwrap();
    assert!(token.types.contains_key("Phase"));
    assert!(token.types.contains_key("Account"));
    assert!(token.types.contains_key("Transfer"));

    let ownable = project.contract("Ownable.sol", "Ownable").unwrap();
    assert!(ownable.types.is_empty());

    let Some(Type::Named { inner, .. }) = token.types.get("Phase") else {
        panic!("Phase should be a named type")
    };
    assert_eq!(
        inner.as_ref(),
        &Type::Enum(vec!["Seed".into(), "Sale".into(), "Done".into()])
    );
    Ok(())
}

#[test]
fn no_reference_escapes_assembly() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;

    for contracts in project.files().values() {
        for contract in contracts.values() {
            for function in contract.api.values() {
                for typ in function.inputs.iter().chain(function.outputs.iter()) {
                    assert!(!typ.contains_reference(), "{}", function.signature());
                }
            }
            for typ in contract.types.values() {
                assert!(!typ.contains_reference());
            }
        }
    }
    Ok(())
}

#[test]
fn lookup_walks_the_linearised_parents() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;

    // Declared on Ownable, callable through Token.
    let inherited = project.function("erc20/Token.sol", "Token", "transferOwnership(address)")?;
    assert_eq!(
        inherited.natspec.as_deref(),
        Some("Hands the contract over to `newOwner`.")
    );

    let owner = project.function("erc20/Token.sol", "Token", "owner()")?;
    assert_eq!(owner.outputs, vec![Type::elementary("address")]);

    let missing = project.function("erc20/Token.sol", "Token", "mint(uint256)");
    let message = missing.expect_err("mint is not declared").to_string();
    assert!(message.contains("transfer(address,uint256)"));
    assert!(message.contains("transferOwnership(address)"));
    Ok(())
}

#[test]
fn call_data_runs_through_the_codec() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;
    let transfer = project.function("erc20/Token.sol", "Token", "transfer(address,uint256)")?;

    let data = call_data(
        transfer,
        &json!(["0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", 1000]),
    )?;

    assert_eq!(data.len(), 4 + 64);
    assert_eq!(data[..4], selector(transfer));
    assert_eq!(data[4 + 63], 0xe8); // 1000 = 0x03e8
    assert_eq!(data[4 + 62], 0x03);

    // The return value decodes through the output tuple.
    let result = decode(&Type::Tuple(transfer.outputs.clone()), &{
        let mut word = [0u8; 32];
        word[31] = 1;
        word
    })?;
    assert_eq!(result, json!([true]));
    Ok(())
}

#[test]
fn enum_round_trips_through_a_looked_up_type() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;
    let token = project.contract("erc20/Token.sol", "Token").unwrap();
    let phase = token.types.get("Phase").unwrap();

    let encoded = encode(phase, &json!("Sale"))?;
    assert_eq!(decode(phase, &encoded)?, json!("Sale"));

    let error = encode(phase, &json!("Purple")).expect_err("Purple is not a phase");
    assert_eq!(
        error.to_string(),
        "unexpected enum case: Purple, expected one of: Seed, Sale, Done"
    );
    Ok(())
}

#[test]
fn struct_values_round_trip_through_the_getter_output() -> anyhow::Result<()> {
    let project = load_project(COMBINED_JSON.as_bytes())?;
    let getter = project.function("erc20/Token.sol", "Token", "accounts(address)")?;
    let output = &getter.outputs[0];

    let value = json!({"balance": 4096, "phase": "Done"});
    let encoded = encode(output, &value)?;
    assert_eq!(encoded.len(), 64);
    assert_eq!(decode(output, &encoded)?, value);
    Ok(())
}
