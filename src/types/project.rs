//! This module contains the model of an assembled project: its source
//! files, their contracts, and each contract's callable API.
//!
//! A [`Project`] is built once from the compiler's combined JSON and is
//! immutable afterwards; it can be shared freely across threads. Replacing a
//! project means building a new one and swapping it in whole.

use std::{
    collections::{BTreeMap, HashMap},
    iter,
};

use itertools::Itertools;

use crate::{
    ast::{ContractKind, NodeId, StateMutability, Visibility},
    error::lookup,
    types::Type,
};

/// The name of the fallback function, which Solidity declares without one.
pub const FALLBACK_FUNCTION_NAME: &str = "";

/// An assembled project: every contract of every source unit, keyed by the
/// unit's path relative to the shared root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Project {
    root:      String,
    files:     BTreeMap<String, BTreeMap<String, Contract>>,
    locations: HashMap<NodeId, (String, String)>,
}

impl Project {
    /// Assembles a project from its parts. The `locations` index maps each
    /// contract's AST node id to its `(file, name)` coordinates and must
    /// cover every contract in `files`.
    pub(crate) fn new(root: String, files: BTreeMap<String, BTreeMap<String, Contract>>) -> Self {
        let locations = files
            .iter()
            .flat_map(|(file, contracts)| {
                contracts
                    .values()
                    .map(move |c| (c.id, (file.clone(), c.name.clone())))
            })
            .collect();
        Self {
            root,
            files,
            locations,
        }
    }

    /// Gets the longest shared directory prefix that was stripped from every
    /// source unit path.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Gets the project's source units and their contracts, keyed by
    /// root-relative path.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, BTreeMap<String, Contract>> {
        &self.files
    }

    /// Gets the contract `name` defined in the source unit at `file`, if
    /// there is one.
    #[must_use]
    pub fn contract(&self, file: &str, name: &str) -> Option<&Contract> {
        self.files.get(file)?.get(name)
    }

    /// Gets the contract declared by the AST node `id`, if there is one.
    #[must_use]
    pub fn contract_by_id(&self, id: NodeId) -> Option<&Contract> {
        let (file, name) = self.locations.get(&id)?;
        self.contract(file, name)
    }

    /// Looks up a function by its canonical Solidity signature, searching
    /// the contract itself and then its linearised parents in order.
    ///
    /// # Errors
    ///
    /// Returns a [`lookup::Error`] naming the missing file, contract, or
    /// signature; the signature error lists every signature that is
    /// callable on the contract.
    pub fn function(
        &self,
        file: &str,
        contract: &str,
        signature: &str,
    ) -> lookup::Result<&Function> {
        let contracts = self.files.get(file).ok_or_else(|| lookup::Error::FileNotFound {
            file: file.to_owned(),
        })?;
        let target = contracts
            .get(contract)
            .ok_or_else(|| lookup::Error::ContractNotFound {
                contract: contract.to_owned(),
            })?;

        let lineage = iter::once(target)
            .chain(target.parents.iter().filter_map(|id| self.contract_by_id(*id)));

        let mut available = Vec::new();
        for candidate in lineage {
            if let Some(function) = candidate.api.get(signature) {
                return Ok(function);
            }
            available.extend(candidate.api.keys().cloned());
        }

        Err(lookup::Error::FunctionNotFound {
            signature: signature.to_owned(),
            available: available.iter().join(", "),
        })
    }
}

/// One contract, interface or library of the project.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contract {
    /// The AST node id of the contract's definition.
    pub id: NodeId,

    /// The root-relative path of the source unit defining the contract.
    pub file: String,

    /// The contract's name.
    pub name: String,

    /// The AST node ids of the linearised base contracts, most-derived
    /// first, excluding the contract itself. Resolved through
    /// [`Project::contract_by_id`]; the resulting graph is a DAG.
    pub parents: Vec<NodeId>,

    /// The contract's natspec documentation, when present.
    pub natspec: Option<String>,

    /// Whether this is a contract, an interface, or a library.
    pub kind: ContractKind,

    /// The contract's callable API, keyed by canonical Solidity signature.
    /// Includes synthesised getters for public state variables and the
    /// fallback function; excludes constructors.
    pub api: BTreeMap<String, Function>,

    /// The user-defined types declared inside the contract, keyed by their
    /// unqualified name.
    pub types: BTreeMap<String, Type>,

    /// The compiled runtime binary, when the combined JSON carried one.
    pub binary: Option<Vec<u8>>,
}

impl Contract {
    /// Gets every API function sharing the bare `name`, in signature order.
    ///
    /// Solidity permits overloading, so a name can resolve to any number of
    /// functions; the canonical signature is the unambiguous key.
    #[must_use]
    pub fn overloads(&self, name: &str) -> Vec<&Function> {
        self.api.values().filter(|f| f.name == name).collect()
    }

    /// Formats the contract's qualified `file:Name` identifier.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.file, self.name)
    }
}

/// One callable function of a contract's API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
    /// The function's name. The fallback function has the empty name.
    pub name: String,

    /// The function's natspec documentation, when present.
    pub natspec: Option<String>,

    /// The function's declared visibility.
    pub visibility: Visibility,

    /// The function's state mutability.
    pub state_mutability: StateMutability,

    /// The function's parameter types, in declaration order.
    pub inputs: Vec<Type>,

    /// The function's return types, in declaration order.
    pub outputs: Vec<Type>,
}

impl Function {
    /// Formats the function's canonical Solidity signature,
    /// `name(T1,T2,…)`, using each argument type's canonical spelling.
    #[must_use]
    pub fn signature(&self) -> String {
        let inputs = self.inputs.iter().map(Type::solidity_signature).join(",");
        format!("{}({inputs})", self.name)
    }

    /// Checks whether this is the fallback function.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.name == FALLBACK_FUNCTION_NAME
    }
}
