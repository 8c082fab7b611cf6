//! This module contains the model of the Solidity type system that the rest
//! of the library operates over.
//!
//! # Invariants
//!
//! Each individual variant in [`Type`] describes the invariants placed upon
//! it. It is the responsibility of the code constructing these values to
//! ensure that the invariants are satisfied. Code utilising them will assume
//! that the data has been correctly constructed. In particular, the
//! [`Type::Reference`] variant exists only while the extractor is running;
//! after its resolve pass no reachable type may be a reference, and the codec
//! treats encountering one as a programmer error.
//!
//! # Missing Solidity Types
//!
//! Solidity supports a `fixed` and `ufixed` family in the ABI, but the
//! language support for them is lacking. They are represented here as
//! [`Type::Elementary`] spellings and rejected by the codec.

pub mod map;
pub mod project;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::ast::NodeId;

/// A type in the Solidity type system, as extracted from a compiled
/// project's AST.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// A leaf of the type system, spelled the way the compiler spells it:
    /// `uint256`, `bytes`, `address`, `bytes1` through `bytes32`, and so on.
    Elementary(String),

    /// An array of `element` values, either fixed-`length` or dynamic.
    ///
    /// Note that Solidity accepts zero-length array types: `uint256[0]` is
    /// valid and distinct from `uint256[]`.
    Array {
        length:  ArrayLength,
        element: Box<Type>,
    },

    /// A struct with ordered `fields`. Field names are unique within the
    /// struct, and field order is significant for the encoding.
    Struct { fields: Vec<StructField> },

    /// An ordered sequence of types: a function's argument or return list.
    Tuple(Vec<Type>),

    /// An enumeration, carrying its case names in declaration order. Cases
    /// are unique within the enum and serialised as their zero-based index.
    Enum(Vec<String>),

    /// A mapping from `key` to `value`.
    ///
    /// Mappings cannot be ABI-encoded; the variant is kept for signature
    /// formatting and getter synthesis.
    Mapping { key: Box<Type>, value: Box<Type> },

    /// An event with its ordered argument types.
    ///
    /// Events are not ABI-encodable through this codec.
    Event { name: String, args: Vec<Type> },

    /// A name wrapping an `inner` type: a struct, enum or event definition
    /// qualified as `path:CanonicalName`. Transparent for encoding and
    /// signature purposes, preserved in the model.
    Named { name: String, inner: Box<Type> },

    /// A contract type, behaving as `address` when encoded.
    ContractAddress(String),

    /// An interface type, behaving as `address` when encoded.
    InterfaceAddress(String),

    /// A library type, behaving as `address` when encoded.
    LibraryAddress(String),

    /// A forward reference to the AST node that declares the actual type.
    ///
    /// Only the extractor may observe this variant; its resolve pass
    /// eliminates every reference before types reach any consumer.
    Reference(NodeId),
}

/// The length of an array type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayLength {
    /// A compile-time fixed length.
    Fixed(usize),

    /// A length only known at runtime; such arrays encode as a pointer to a
    /// `(length, items…)` region in the tail.
    Dynamic,
}

/// One field of a struct type.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StructField {
    /// The field's name, unique within the struct.
    pub name: String,

    /// The field's type.
    #[serde(rename = "type")]
    pub typ: Type,
}

impl StructField {
    /// Constructs a new struct field named `name` with the type `typ`.
    #[must_use]
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        let name = name.into();
        Self { name, typ }
    }
}

impl Type {
    /// Constructs an elementary type from its compiler spelling.
    #[must_use]
    pub fn elementary(name: impl Into<String>) -> Self {
        Self::Elementary(name.into())
    }

    /// Constructs a fixed-length array of `length` copies of `element`.
    #[must_use]
    pub fn array(length: usize, element: Type) -> Self {
        Self::Array {
            length:  ArrayLength::Fixed(length),
            element: Box::new(element),
        }
    }

    /// Constructs a dynamically-sized array of `element` values.
    #[must_use]
    pub fn dynamic_array(element: Type) -> Self {
        Self::Array {
            length:  ArrayLength::Dynamic,
            element: Box::new(element),
        }
    }

    /// Wraps `inner` under the qualified `name`.
    #[must_use]
    pub fn named(name: impl Into<String>, inner: Type) -> Self {
        Self::Named {
            name:  name.into(),
            inner: Box::new(inner),
        }
    }

    /// Formats the type the way it is spelled in a canonical Solidity
    /// function signature.
    ///
    /// Enums are spelled `uint8`; contract, interface and library types are
    /// spelled `address`; a named type is spelled as its payload. Mappings
    /// can never appear in a function signature, but are formatted as
    /// `mapping(K => V)` for completeness.
    ///
    /// # Panics
    ///
    /// Panics when called on a [`Type::Reference`], which cannot outlive the
    /// extractor's resolve pass.
    #[must_use]
    pub fn solidity_signature(&self) -> String {
        match self {
            Self::Elementary(name) => name.clone(),
            Self::Array { length, element } => {
                let element = element.solidity_signature();
                match length {
                    ArrayLength::Fixed(n) => format!("{element}[{n}]"),
                    ArrayLength::Dynamic => format!("{element}[]"),
                }
            }
            Self::Struct { fields } => {
                let fields = fields.iter().map(|f| f.typ.solidity_signature()).join(",");
                format!("({fields})")
            }
            Self::Tuple(types) => {
                let types = types.iter().map(Type::solidity_signature).join(",");
                format!("({types})")
            }
            Self::Enum(_) => "uint8".to_owned(),
            Self::Mapping { key, value } => {
                format!(
                    "mapping({} => {})",
                    key.solidity_signature(),
                    value.solidity_signature()
                )
            }
            Self::Event { name, args } => {
                let args = args.iter().map(Type::solidity_signature).join(",");
                format!("{name}({args})")
            }
            Self::Named { inner, .. } => inner.solidity_signature(),
            Self::ContractAddress(_) | Self::InterfaceAddress(_) | Self::LibraryAddress(_) => {
                "address".to_owned()
            }
            Self::Reference(id) => {
                panic!("unresolved type reference {id} escaped the extractor")
            }
        }
    }

    /// Rebuilds the type, applying `f` to every leaf.
    ///
    /// Container variants map over their children and reconstruct themselves
    /// without re-applying `f` at their own root; leaf variants (elementary
    /// types, enums, the address kinds and references) are replaced by
    /// `f`'s result. This is the shape the extractor's fix-point resolve
    /// pass relies on: substituting a reference's target resolves it exactly
    /// once.
    #[must_use]
    pub fn map(&self, f: &mut dyn FnMut(&Type) -> Type) -> Type {
        match self {
            Self::Array { length, element } => Self::Array {
                length:  *length,
                element: Box::new(element.map(f)),
            },
            Self::Struct { fields } => Self::Struct {
                fields: fields
                    .iter()
                    .map(|field| StructField::new(field.name.clone(), field.typ.map(f)))
                    .collect(),
            },
            Self::Tuple(types) => Self::Tuple(types.iter().map(|t| t.map(f)).collect()),
            Self::Mapping { key, value } => Self::Mapping {
                key:   Box::new(key.map(f)),
                value: Box::new(value.map(f)),
            },
            Self::Event { name, args } => Self::Event {
                name: name.clone(),
                args: args.iter().map(|t| t.map(f)).collect(),
            },
            Self::Named { name, inner } => Self::Named {
                name:  name.clone(),
                inner: Box::new(inner.map(f)),
            },
            leaf => f(leaf),
        }
    }

    /// Checks whether the encoded size of a value of this type depends on
    /// the value itself.
    ///
    /// `bytes` and `string` values, dynamically-sized arrays, and any
    /// composite containing one of those are dynamic; everything else
    /// occupies a fixed number of head bytes.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Elementary(name) => name == "bytes" || name == "string",
            Self::Array { length, element } => match length {
                ArrayLength::Dynamic => true,
                ArrayLength::Fixed(_) => element.is_dynamic(),
            },
            Self::Struct { fields } => fields.iter().any(|f| f.typ.is_dynamic()),
            Self::Tuple(types) => types.iter().any(Type::is_dynamic),
            Self::Named { inner, .. } => inner.is_dynamic(),
            _ => false,
        }
    }

    /// Checks whether the type still contains a [`Type::Reference`]
    /// anywhere.
    ///
    /// After project assembly this must be false for every type reachable
    /// from every contract.
    #[must_use]
    pub fn contains_reference(&self) -> bool {
        match self {
            Self::Reference(_) => true,
            Self::Array { element, .. } => element.contains_reference(),
            Self::Struct { fields } => fields.iter().any(|f| f.typ.contains_reference()),
            Self::Tuple(types) => types.iter().any(Type::contains_reference),
            Self::Mapping { key, value } => {
                key.contains_reference() || value.contains_reference()
            }
            Self::Event { args, .. } => args.iter().any(Type::contains_reference),
            Self::Named { inner, .. } => inner.contains_reference(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{StructField, Type};

    #[test]
    fn formats_elementary_signatures() {
        assert_eq!(Type::elementary("uint256").solidity_signature(), "uint256");
        assert_eq!(Type::elementary("bytes").solidity_signature(), "bytes");
    }

    #[test]
    fn formats_array_signatures() {
        let fixed = Type::array(8, Type::elementary("int32"));
        assert_eq!(fixed.solidity_signature(), "int32[8]");

        let dynamic = Type::dynamic_array(Type::array(2, Type::elementary("address")));
        assert_eq!(dynamic.solidity_signature(), "address[2][]");
    }

    #[test]
    fn formats_composite_signatures() {
        let tuple = Type::Tuple(vec![
            Type::elementary("uint256"),
            Type::dynamic_array(Type::elementary("bytes32")),
        ]);
        assert_eq!(tuple.solidity_signature(), "(uint256,bytes32[])");

        let strct = Type::Struct {
            fields: vec![
                StructField::new("owner", Type::elementary("address")),
                StructField::new("balance", Type::elementary("uint256")),
            ],
        };
        assert_eq!(strct.solidity_signature(), "(address,uint256)");
    }

    #[test]
    fn enums_and_addresses_have_fixed_spellings() {
        let color = Type::Enum(vec!["Red".into(), "Green".into(), "Blue".into()]);
        assert_eq!(color.solidity_signature(), "uint8");

        let contract = Type::ContractAddress("token.sol:Token".into());
        assert_eq!(contract.solidity_signature(), "address");
    }

    #[test]
    fn named_types_are_transparent() {
        let named = Type::named("token.sol:Token.Balance", Type::elementary("uint128"));
        assert_eq!(named.solidity_signature(), "uint128");
    }

    #[test]
    fn formats_mapping_and_event_signatures() {
        let mapping = Type::Mapping {
            key:   Box::new(Type::elementary("address")),
            value: Box::new(Type::elementary("uint256")),
        };
        assert_eq!(mapping.solidity_signature(), "mapping(address => uint256)");

        let event = Type::Event {
            name: "Transfer".into(),
            args: vec![Type::elementary("address"), Type::elementary("uint256")],
        };
        assert_eq!(event.solidity_signature(), "Transfer(address,uint256)");
    }

    #[test]
    fn map_replaces_leaves_but_not_containers() {
        let mut swap = |t: &Type| match t {
            Type::Elementary(_) => Type::elementary("bool"),
            other => other.clone(),
        };

        let tuple = Type::Tuple(vec![Type::elementary("uint8")]);
        let mapped = tuple.map(&mut swap);
        assert_eq!(mapped, Type::Tuple(vec![Type::elementary("bool")]));

        let named = Type::named("a.sol:A.T", Type::elementary("uint8"));
        let mapped = named.map(&mut swap);
        assert_eq!(mapped, Type::named("a.sol:A.T", Type::elementary("bool")));

        let leaf = Type::elementary("uint8");
        assert_eq!(leaf.map(&mut swap), Type::elementary("bool"));
    }

    #[test]
    fn dynamic_predicate_propagates_through_composites() {
        assert!(Type::elementary("bytes").is_dynamic());
        assert!(Type::elementary("string").is_dynamic());
        assert!(!Type::elementary("uint256").is_dynamic());

        assert!(Type::dynamic_array(Type::elementary("uint8")).is_dynamic());
        assert!(!Type::array(3, Type::elementary("uint8")).is_dynamic());
        assert!(Type::array(3, Type::elementary("bytes")).is_dynamic());

        let strct = Type::Struct {
            fields: vec![StructField::new("data", Type::elementary("bytes"))],
        };
        assert!(strct.is_dynamic());
    }

    #[test]
    fn reference_detection_reaches_all_children() {
        let clean = Type::Tuple(vec![Type::elementary("uint256")]);
        assert!(!clean.contains_reference());

        let dirty = Type::Struct {
            fields: vec![StructField::new("pending", Type::Reference(42))],
        };
        assert!(dirty.contains_reference());
    }

    #[test]
    #[should_panic(expected = "unresolved type reference")]
    fn signature_of_reference_panics() {
        let _ = Type::Reference(7).solidity_signature();
    }
}
