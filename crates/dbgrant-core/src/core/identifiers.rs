// crates/dbgrant-core/src/core/identifiers.rs
// ============================================================================
// Module: dbgrant Identifiers
// Description: Composite external identifiers and typed entity ids.
// Purpose: Round-trip managed entity identity through a single opaque string.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The orchestrator persists one scalar string per managed entity. This module
//! encodes a fixed number of typed fields into that string and decodes it back
//! with validation. Elements are joined with `/`; the empty string is the null
//! identity.
//!
//! Arity is a property of the identifier *kind* ([`IdentifierKind`]), not of
//! an instance, so identifiers of different kinds are distinct Rust types.
//!
//! Elements are not escaped. Callers must not place `/` inside an element; a
//! value containing the delimiter will not decode back to the same elements.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use serde::ser::Error as _;
use thiserror::Error;

use crate::core::diagnostics::Diagnostic;
use crate::core::diagnostics::Diagnostics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Delimiter between identifier elements in the external string form.
pub const ELEMENT_DELIMITER: char = '/';

/// Kind label used by the free-standing codec functions.
const RAW_KIND: &str = "composite";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier decoding and access errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The external string split into the wrong number of elements.
    #[error("{kind} identifier expects {expected} element(s), found {actual}")]
    Cardinality {
        /// Identifier kind label.
        kind: &'static str,
        /// Arity declared by the kind.
        expected: usize,
        /// Element count found in the input.
        actual: usize,
    },
    /// An element could not be parsed as the expected entity id.
    #[error("{kind} identifier element {index} is not a valid {expected}: '{value}'")]
    InvalidElement {
        /// Identifier kind label.
        kind: &'static str,
        /// Element position.
        index: usize,
        /// Label of the expected entity id type.
        expected: &'static str,
        /// Offending element text.
        value: String,
    },
    /// The identifier is null or unknown and has no elements.
    #[error("{kind} identifier has no value")]
    NotConcrete {
        /// Identifier kind label.
        kind: &'static str,
    },
    /// The requested element position exceeds the kind's arity.
    #[error("{kind} identifier has no element {index}")]
    ElementOutOfRange {
        /// Identifier kind label.
        kind: &'static str,
        /// Requested element position.
        index: usize,
    },
}

impl From<IdentifierError> for Diagnostic {
    fn from(error: IdentifierError) -> Self {
        Self::error("Invalid identifier", error.to_string())
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Joins identifier elements into the external string form.
///
/// No escaping is performed; elements must not contain [`ELEMENT_DELIMITER`].
#[must_use]
pub fn encode_elements<S: AsRef<str>>(elements: &[S]) -> String {
    let mut encoded = String::new();
    for (index, element) in elements.iter().enumerate() {
        if index > 0 {
            encoded.push(ELEMENT_DELIMITER);
        }
        encoded.push_str(element.as_ref());
    }
    encoded
}

/// Splits an external identifier string into exactly `arity` elements.
///
/// Returns `Ok(None)` for the empty string (the null identity).
///
/// # Errors
///
/// Returns [`IdentifierError::Cardinality`] when the split length differs
/// from `arity`.
pub fn decode_elements(arity: usize, input: &str) -> Result<Option<Vec<String>>, IdentifierError> {
    split_checked(RAW_KIND, arity, input)
}

/// Splits `input` and checks the element count against `arity`.
fn split_checked(
    kind: &'static str,
    arity: usize,
    input: &str,
) -> Result<Option<Vec<String>>, IdentifierError> {
    if input.is_empty() {
        return Ok(None);
    }
    let elements: Vec<String> = input.split(ELEMENT_DELIMITER).map(str::to_string).collect();
    if elements.len() != arity {
        return Err(IdentifierError::Cardinality {
            kind,
            expected: arity,
            actual: elements.len(),
        });
    }
    Ok(Some(elements))
}

// ============================================================================
// SECTION: Entity Ids
// ============================================================================

/// Integer identity assigned to an entity by the managed store.
pub trait EntityId: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Label used in diagnostics and identifier kind names.
    const LABEL: &'static str;
    /// Kind name of permission identifiers keyed by this entity.
    const PERMISSION_KIND: &'static str;

    /// Creates the id from a raw value (returns `None` if negative).
    fn from_raw(raw: i64) -> Option<Self>;

    /// Returns the raw value.
    fn get(self) -> i64;

    /// Parses a canonical decimal rendering (ASCII digits only).
    fn parse(value: &str) -> Option<Self> {
        if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        value.parse::<i64>().ok().and_then(Self::from_raw)
    }
}

/// Database identifier assigned by the managed store.
///
/// # Invariants
/// - Always >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId(i64);

impl DatabaseId {
    /// Creates a database identifier from a raw value (returns `None` if negative).
    #[must_use]
    pub const fn from_raw(raw: i64) -> Option<Self> {
        if raw < 0 { None } else { Some(Self(raw)) }
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl EntityId for DatabaseId {
    const LABEL: &'static str = "database id";
    const PERMISSION_KIND: &'static str = "database permission";

    fn from_raw(raw: i64) -> Option<Self> {
        Self::from_raw(raw)
    }

    fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Database principal identifier (roles and users).
///
/// # Invariants
/// - Always >= 0.
/// - Unique across databases within one managed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalId(i64);

impl PrincipalId {
    /// Creates a principal identifier from a raw value (returns `None` if negative).
    #[must_use]
    pub const fn from_raw(raw: i64) -> Option<Self> {
        if raw < 0 { None } else { Some(Self(raw)) }
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl EntityId for PrincipalId {
    const LABEL: &'static str = "principal id";
    const PERMISSION_KIND: &'static str = "principal permission";

    fn from_raw(raw: i64) -> Option<Self> {
        Self::from_raw(raw)
    }

    fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Composite Identifier
// ============================================================================

/// Static description of an identifier kind.
pub trait IdentifierKind: 'static {
    /// Kind label used in diagnostics.
    const NAME: &'static str;
    /// Number of elements every concrete identifier of this kind carries.
    const ARITY: usize;
}

/// Value state of an identifier.
///
/// # Invariants
/// - `Null` and `Unknown` carry no elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierState {
    /// No identity (decoded from the empty string).
    Null,
    /// Identity not known yet (computed during apply).
    Unknown,
    /// Concrete elements, exactly as many as the kind's arity.
    Concrete(Vec<String>),
}

/// External identity of a managed entity.
///
/// # Invariants
/// - A concrete instance carries exactly `K::ARITY` elements.
/// - Never mutated after construction.
pub struct CompositeId<K: IdentifierKind> {
    /// Identifier value.
    state: IdentifierState,
    /// Kind marker.
    kind: PhantomData<fn() -> K>,
}

impl<K: IdentifierKind> CompositeId<K> {
    /// Builds a concrete identifier from elements already checked against the arity.
    fn concrete(elements: Vec<String>) -> Self {
        Self {
            state: IdentifierState::Concrete(elements),
            kind: PhantomData,
        }
    }

    /// Returns the null identifier.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            state: IdentifierState::Null,
            kind: PhantomData,
        }
    }

    /// Returns the unknown identifier.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            state: IdentifierState::Unknown,
            kind: PhantomData,
        }
    }

    /// Decodes the external string form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Cardinality`] when the element count does
    /// not match `K::ARITY`.
    pub fn decode(input: &str) -> Result<Self, IdentifierError> {
        Ok(split_checked(K::NAME, K::ARITY, input)?.map_or_else(Self::null, Self::concrete))
    }

    /// Composes an identifier from elements.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Cardinality`] when the element count does
    /// not match `K::ARITY`.
    pub fn from_elements<I, S>(elements: I) -> Result<Self, IdentifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elements: Vec<String> = elements.into_iter().map(Into::into).collect();
        if elements.len() != K::ARITY {
            return Err(IdentifierError::Cardinality {
                kind: K::NAME,
                expected: K::ARITY,
                actual: elements.len(),
            });
        }
        Ok(Self::concrete(elements))
    }

    /// Composes an identifier from a fixed-size element array.
    ///
    /// The array length is checked against `K::ARITY` at compile time.
    #[must_use]
    pub fn from_array<const N: usize>(elements: [String; N]) -> Self {
        const { assert!(N == K::ARITY, "element count must equal the identifier arity") };
        Self::concrete(elements.into())
    }

    /// Returns the value state.
    #[must_use]
    pub const fn state(&self) -> &IdentifierState {
        &self.state
    }

    /// Returns the elements of a concrete identifier.
    #[must_use]
    pub fn elements(&self) -> Option<&[String]> {
        match &self.state {
            IdentifierState::Concrete(elements) => Some(elements),
            IdentifierState::Null | IdentifierState::Unknown => None,
        }
    }

    /// Returns true for the null identifier.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.state, IdentifierState::Null)
    }

    /// Returns true for the unknown identifier.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self.state, IdentifierState::Unknown)
    }

    /// Returns the external string form; `None` when the value is unknown.
    #[must_use]
    pub fn encode(&self) -> Option<String> {
        match &self.state {
            IdentifierState::Null => Some(String::new()),
            IdentifierState::Unknown => None,
            IdentifierState::Concrete(elements) => Some(encode_elements(elements)),
        }
    }

    /// Returns the raw text of one element.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the identifier is not concrete or the
    /// index exceeds the arity.
    pub fn element_str(&self, index: usize) -> Result<&str, IdentifierError> {
        let elements = self.elements().ok_or(IdentifierError::NotConcrete {
            kind: K::NAME,
        })?;
        elements.get(index).map(String::as_str).ok_or(IdentifierError::ElementOutOfRange {
            kind: K::NAME,
            index,
        })
    }

    /// Parses one element as an entity id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidElement`] when the element is not a
    /// canonical non-negative integer.
    pub fn parse_element<T: EntityId>(&self, index: usize) -> Result<T, IdentifierError> {
        let value = self.element_str(index)?;
        T::parse(value).ok_or_else(|| IdentifierError::InvalidElement {
            kind: K::NAME,
            index,
            expected: T::LABEL,
            value: value.to_string(),
        })
    }

    /// Parses one element as an entity id, recording failures as diagnostics.
    pub fn element<T: EntityId>(&self, index: usize, diagnostics: &mut Diagnostics) -> Option<T> {
        match self.parse_element(index) {
            Ok(id) => Some(id),
            Err(error) => {
                diagnostics.push(error.into());
                None
            }
        }
    }

    /// Returns a kind-erased copy for cross-kind comparison.
    #[must_use]
    pub fn erase(&self) -> AnyIdentifier {
        AnyIdentifier {
            kind: K::NAME,
            arity: K::ARITY,
            state: self.state.clone(),
        }
    }
}

impl<K: IdentifierKind> Clone for CompositeId<K> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: IdentifierKind> PartialEq for CompositeId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl<K: IdentifierKind> Eq for CompositeId<K> {}

impl<K: IdentifierKind> Hash for CompositeId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
    }
}

impl<K: IdentifierKind> fmt::Debug for CompositeId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeId").field("kind", &K::NAME).field("state", &self.state).finish()
    }
}

impl<K: IdentifierKind> fmt::Display for CompositeId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            IdentifierState::Null => Ok(()),
            IdentifierState::Unknown => f.write_str("(unknown)"),
            IdentifierState::Concrete(elements) => f.write_str(&encode_elements(elements)),
        }
    }
}

impl<K: IdentifierKind> Default for CompositeId<K> {
    /// Attributes absent from a planned state are computed and not known yet.
    fn default() -> Self {
        Self::unknown()
    }
}

impl<K: IdentifierKind> Serialize for CompositeId<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(encoded) = self.encode() else {
            return Err(S::Error::custom(format!("{} identifier is unknown", K::NAME)));
        };
        serializer.serialize_str(&encoded)
    }
}

impl<'de, K: IdentifierKind> Deserialize<'de> for CompositeId<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::null()),
            Some(input) => Self::decode(&input).map_err(D::Error::custom),
        }
    }
}

/// Kind-erased identifier.
///
/// # Invariants
/// - Equality is false whenever `kind` or `arity` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnyIdentifier {
    /// Identifier kind label.
    pub kind: &'static str,
    /// Arity of the kind.
    pub arity: usize,
    /// Identifier value.
    pub state: IdentifierState,
}

impl AnyIdentifier {
    /// Decodes an identifier whose kind is only known at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Cardinality`] on an element count mismatch.
    pub fn decode(kind: &'static str, arity: usize, input: &str) -> Result<Self, IdentifierError> {
        let state = split_checked(kind, arity, input)?
            .map_or(IdentifierState::Null, IdentifierState::Concrete);
        Ok(Self {
            kind,
            arity,
            state,
        })
    }
}

// ============================================================================
// SECTION: Numeric Identifier
// ============================================================================

/// Kind of single-element identifiers holding one entity id.
pub struct Numeric<T>(PhantomData<fn() -> T>);

impl<T: EntityId> IdentifierKind for Numeric<T> {
    const NAME: &'static str = T::LABEL;
    const ARITY: usize = 1;
}

/// Identifier holding a single entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct NumericId<T: EntityId>(CompositeId<Numeric<T>>);

impl<T: EntityId> NumericId<T> {
    /// Creates a concrete identifier for `id`.
    #[must_use]
    pub fn new(id: T) -> Self {
        Self(CompositeId::from_array([id.to_string()]))
    }

    /// Returns the null identifier.
    #[must_use]
    pub const fn null() -> Self {
        Self(CompositeId::null())
    }

    /// Returns the unknown identifier.
    #[must_use]
    pub const fn unknown() -> Self {
        Self(CompositeId::unknown())
    }

    /// Decodes the external string form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Cardinality`] when the input holds more than one element.
    pub fn decode(input: &str) -> Result<Self, IdentifierError> {
        CompositeId::decode(input).map(Self)
    }

    /// Parses the entity id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the identifier is not concrete or not numeric.
    pub fn parse_id(&self) -> Result<T, IdentifierError> {
        self.0.parse_element(0)
    }

    /// Parses the entity id, recording failures as diagnostics.
    pub fn id(&self, diagnostics: &mut Diagnostics) -> Option<T> {
        self.0.element(0, diagnostics)
    }

    /// Returns the underlying composite identifier.
    #[must_use]
    pub const fn as_composite(&self) -> &CompositeId<Numeric<T>> {
        &self.0
    }
}

impl<T: EntityId> Default for NumericId<T> {
    fn default() -> Self {
        Self::unknown()
    }
}

impl<T: EntityId> fmt::Display for NumericId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Permission Identifier
// ============================================================================

/// Kind of identifiers pairing an entity id with a permission name.
pub struct Permission<T>(PhantomData<fn() -> T>);

impl<T: EntityId> IdentifierKind for Permission<T> {
    const NAME: &'static str = T::PERMISSION_KIND;
    const ARITY: usize = 2;
}

/// Identifier of a permission granted to an entity.
///
/// Element 0 is the entity id, element 1 the opaque permission name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct PermissionId<T: EntityId>(CompositeId<Permission<T>>);

impl<T: EntityId> PermissionId<T> {
    /// Creates a concrete identifier.
    #[must_use]
    pub fn new(id: T, permission: impl Into<String>) -> Self {
        Self(CompositeId::from_array([id.to_string(), permission.into()]))
    }

    /// Returns the null identifier.
    #[must_use]
    pub const fn null() -> Self {
        Self(CompositeId::null())
    }

    /// Returns the unknown identifier.
    #[must_use]
    pub const fn unknown() -> Self {
        Self(CompositeId::unknown())
    }

    /// Decodes the external string form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Cardinality`] when the input does not hold two elements.
    pub fn decode(input: &str) -> Result<Self, IdentifierError> {
        CompositeId::decode(input).map(Self)
    }

    /// Parses the entity id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the identifier is not concrete or
    /// element 0 is not numeric.
    pub fn parse_entity_id(&self) -> Result<T, IdentifierError> {
        self.0.parse_element(0)
    }

    /// Parses the entity id, recording failures as diagnostics.
    pub fn entity_id(&self, diagnostics: &mut Diagnostics) -> Option<T> {
        self.0.element(0, diagnostics)
    }

    /// Returns the permission name of a concrete identifier.
    #[must_use]
    pub fn permission_name(&self) -> Option<&str> {
        self.0.element_str(1).ok()
    }

    /// Returns the underlying composite identifier.
    #[must_use]
    pub const fn as_composite(&self) -> &CompositeId<Permission<T>> {
        &self.0
    }
}

impl<T: EntityId> Default for PermissionId<T> {
    fn default() -> Self {
        Self::unknown()
    }
}

impl<T: EntityId> fmt::Display for PermissionId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
