//! This module contains the mapping from AST node ids to the types they
//! declare, together with the resolve pass that eliminates forward
//! references.

use std::collections::HashMap;

use crate::{ast::NodeId, types::Type};

/// A mapping from AST node id to the type that node declares or names.
///
/// The extractor populates one of these per combined JSON blob. While it is
/// being populated the values may contain [`Type::Reference`] placeholders;
/// [`TypeMap::resolve_references`] rewrites the whole map so that none
/// survive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeMap {
    entries: HashMap<NodeId, Type>,
}

impl TypeMap {
    /// Creates an empty type map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `typ` as the type declared by the AST node `id`.
    pub fn insert(&mut self, id: NodeId, typ: Type) {
        self.entries.insert(id, typ);
    }

    /// Gets the type recorded for `id`, without chasing references.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Type> {
        self.entries.get(&id)
    }

    /// Absorbs all entries of `other` into this map.
    pub fn merge(&mut self, other: TypeMap) {
        self.entries.extend(other.entries);
    }

    /// Gets the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the `(id, type)` entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Type)> {
        self.entries.iter().map(|(id, typ)| (*id, typ))
    }

    /// Dereferences `id`, chasing transitive [`Type::Reference`] entries
    /// until a non-reference type is reached.
    ///
    /// # Panics
    ///
    /// Panics when `id` (or any id reached through it) has no entry. The
    /// extractor records a type for every node a reference can name, so a
    /// missing key is a bug in the extractor, not a recoverable condition.
    #[must_use]
    pub fn deref(&self, id: NodeId) -> &Type {
        let typ = self
            .entries
            .get(&id)
            .unwrap_or_else(|| panic!("no type recorded for AST node {id}"));
        match typ {
            Type::Reference(next) => self.deref(*next),
            concrete => concrete,
        }
    }

    /// Rewrites every entry so that no [`Type::Reference`] remains anywhere
    /// in the map.
    ///
    /// Each entry is mapped through a function that substitutes references
    /// with their (recursively resolved) targets. Because
    /// [`Type::map`] does not re-apply the function at container roots,
    /// every reference is resolved exactly once and the pass reaches a fix
    /// point in a single sweep.
    ///
    /// # Panics
    ///
    /// Panics when a reference names an id with no entry, as for
    /// [`TypeMap::deref`].
    pub fn resolve_references(&mut self) {
        let resolved = self
            .entries
            .iter()
            .map(|(id, typ)| (*id, self.resolved(typ)))
            .collect();
        self.entries = resolved;
    }

    fn resolved(&self, typ: &Type) -> Type {
        typ.map(&mut |leaf| match leaf {
            Type::Reference(id) => self.resolved(self.deref(*id)),
            concrete => concrete.clone(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::TypeMap;
    use crate::types::{StructField, Type};

    #[test]
    fn deref_chases_transitive_references() {
        let mut map = TypeMap::new();
        map.insert(1, Type::Reference(2));
        map.insert(2, Type::Reference(3));
        map.insert(3, Type::elementary("uint256"));

        assert_eq!(map.deref(1), &Type::elementary("uint256"));
        assert_eq!(map.deref(3), &Type::elementary("uint256"));
    }

    #[test]
    #[should_panic(expected = "no type recorded for AST node 9")]
    fn deref_of_missing_id_panics() {
        let map = TypeMap::new();
        let _ = map.deref(9);
    }

    #[test]
    fn resolve_eliminates_forward_references() {
        // A struct whose field forward-references an enum declared later in
        // the source unit, through a use-site reference.
        let mut map = TypeMap::new();
        map.insert(
            1,
            Type::named(
                "a.sol:A.Wrapper",
                Type::Struct {
                    fields: vec![StructField::new("state", Type::Reference(7))],
                },
            ),
        );
        map.insert(7, Type::Reference(3));
        map.insert(
            3,
            Type::named("a.sol:A.State", Type::Enum(vec!["On".into(), "Off".into()])),
        );

        map.resolve_references();

        for (_, typ) in map.iter() {
            assert!(!typ.contains_reference());
        }
        let expected = Type::named(
            "a.sol:A.Wrapper",
            Type::Struct {
                fields: vec![StructField::new(
                    "state",
                    Type::named("a.sol:A.State", Type::Enum(vec!["On".into(), "Off".into()])),
                )],
            },
        );
        assert_eq!(map.get(1), Some(&expected));
    }

    #[test]
    fn resolve_handles_nested_containers() {
        let mut map = TypeMap::new();
        map.insert(
            10,
            Type::dynamic_array(Type::Mapping {
                key:   Box::new(Type::elementary("address")),
                value: Box::new(Type::Reference(11)),
            }),
        );
        map.insert(11, Type::elementary("bool"));

        map.resolve_references();

        let expected = Type::dynamic_array(Type::Mapping {
            key:   Box::new(Type::elementary("address")),
            value: Box::new(Type::elementary("bool")),
        });
        assert_eq!(map.get(10), Some(&expected));
    }
}
