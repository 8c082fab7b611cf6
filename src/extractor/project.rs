//! This module contains the project assembler: it turns one combined JSON
//! blob into an immutable [`Project`].
//!
//! Assembly strips the longest directory prefix shared by every source unit
//! so that file keys stay portable across machines; the prefix is
//! re-attached when cross-referencing the compiled-contract table, whose
//! keys are still fully qualified. E.g. the files `a/x/b.sol` and `a/c.sol`
//! become `x/b.sol` and `c.sol` under the root `a/`.

use std::collections::{BTreeMap, HashSet};

use crate::{
    ast::{self, Combined, NodeKind},
    error::load,
    extractor,
    types::{
        map::TypeMap,
        project::{Contract, Project},
        Type,
    },
};

/// Loads a project from the raw bytes of a compiled project's combined
/// JSON.
///
/// This is the one entry point for building the model: parse, extract every
/// source unit's types, resolve references, and assemble the contracts. The
/// returned project is immutable; loading again builds a replacement
/// wholesale.
///
/// # Errors
///
/// Returns a [`load::Error`] when the JSON cannot be parsed, when an AST
/// node is malformed, or when the assembly finds an inconsistency such as
/// an unknown parent contract.
pub fn load_project(combined_json: &[u8]) -> load::Result<Project> {
    let combined: Combined =
        serde_json::from_slice(combined_json).map_err(|e| load::Error::MalformedJson {
            reason: e.to_string(),
        })?;
    assemble(&combined)
}

/// Assembles an already-parsed combined JSON blob into a [`Project`].
///
/// # Errors
///
/// As for [`load_project`], excluding the initial JSON parse.
pub fn assemble(combined: &Combined) -> load::Result<Project> {
    let mut prefix = LongestPathPrefix::default();
    for path in &combined.source_list {
        prefix.observe(path);
    }

    // Parse every source unit and extract its types into one shared map.
    let mut type_map = TypeMap::new();
    let mut source_units = Vec::with_capacity(combined.sources.len());
    for (path, source) in &combined.sources {
        let relative = prefix.strip(path)?.to_owned();
        let root = ast::parse(&source.ast).map_err(|e| load::Error::MalformedAst {
            path:   path.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(root.kind, NodeKind::SourceUnit(_)) {
            return Err(load::Error::UnexpectedRoot {
                path:  path.clone(),
                found: root.name().to_owned(),
            });
        }
        type_map.merge(extractor::source_unit_types(&relative, &root)?);
        source_units.push((relative, root));
    }

    type_map.resolve_references();

    let mut files: BTreeMap<String, BTreeMap<String, Contract>> = BTreeMap::new();
    for (path, root) in &source_units {
        for node in extractor::contract_definitions(root) {
            let NodeKind::ContractDefinition(definition) = &node.kind else {
                unreachable!("contract_definitions only yields ContractDefinition nodes")
            };

            let api = extractor::contract_api(node, &type_map)?
                .into_iter()
                .map(|function| (function.signature(), function))
                .collect();

            // The compiled-contract table is keyed by the unstripped path.
            let qualified = format!("{}:{}", prefix.prepend(path), definition.name);
            let binary = match combined.contracts.get(&qualified) {
                Some(compiled) => Some(hex::decode(&compiled.binary).map_err(|_| {
                    load::Error::MalformedBinary { path: path.clone() }
                })?),
                None => None,
            };

            let types = contract_types(&type_map, path, &definition.name);

            // The linearisation starts with the contract's own id.
            let parents = definition
                .linearized_base_contracts
                .get(1..)
                .unwrap_or(&[])
                .to_vec();

            files.entry(path.clone()).or_default().insert(
                definition.name.clone(),
                Contract {
                    id: node.id,
                    file: path.clone(),
                    name: definition.name.clone(),
                    parents,
                    natspec: definition.documentation.clone(),
                    kind: definition.contract_kind,
                    api,
                    types,
                    binary,
                },
            );
        }
    }

    // Every linearised parent must itself be a known contract.
    let known: HashSet<i64> = files
        .values()
        .flat_map(|contracts| contracts.values().map(|c| c.id))
        .collect();
    for contracts in files.values() {
        for contract in contracts.values() {
            for parent in &contract.parents {
                if !known.contains(parent) {
                    return Err(load::Error::UnknownParent {
                        contract: contract.qualified_name(),
                        parent:   *parent,
                    });
                }
            }
        }
    }

    let project = Project::new(prefix.get().to_owned(), files);
    tracing::debug!(
        root = %project.root(),
        files = project.files().len(),
        "assembled project model"
    );
    Ok(project)
}

/// Collects the user-defined types that belong to one contract: every named
/// type qualified as `file:ContractName…`, registered under the suffix past
/// the last `.` of its qualified name. Events are included, since their
/// canonical names carry the same `file:ContractName` prefix.
fn contract_types(
    type_map: &TypeMap,
    file: &str,
    contract_name: &str,
) -> BTreeMap<String, Type> {
    let qualified = format!("{file}:{contract_name}");
    type_map
        .iter()
        .filter_map(|(_, typ)| match typ {
            Type::Named { name, .. } if name.starts_with(&qualified) => {
                let short = name[name.rfind('.').map_or(0, |dot| dot + 1)..].to_owned();
                Some((short, typ.clone()))
            }
            _ => None,
        })
        .collect()
}

/// The longest directory prefix shared by every observed path, trimmed to
/// the last path separator.
#[derive(Debug, Default)]
struct LongestPathPrefix {
    prefix: Option<String>,
}

impl LongestPathPrefix {
    fn observe(&mut self, path: &str) {
        let next = match self.prefix.take() {
            None => directory_of(path).to_owned(),
            Some(current) => {
                let shared = current
                    .bytes()
                    .zip(path.bytes())
                    .take_while(|(a, b)| a == b)
                    .count();
                directory_within(&current, shared).to_owned()
            }
        };
        self.prefix = Some(next);
    }

    fn get(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    fn strip<'a>(&self, path: &'a str) -> load::Result<&'a str> {
        path.strip_prefix(self.get())
            .ok_or_else(|| load::Error::PathOutsidePrefix {
                path:   path.to_owned(),
                prefix: self.get().to_owned(),
            })
    }

    fn prepend(&self, path: &str) -> String {
        format!("{}{path}", self.get())
    }
}

/// Cuts `path` back to just past its last `/`, or to nothing when it has
/// none.
fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(separator) => &path[..=separator],
        None => "",
    }
}

/// As [`directory_of`], considering only the first `limit` bytes.
fn directory_within(path: &str, limit: usize) -> &str {
    match path.as_bytes()[..limit].iter().rposition(|&b| b == b'/') {
        Some(separator) => &path[..=separator],
        None => "",
    }
}
