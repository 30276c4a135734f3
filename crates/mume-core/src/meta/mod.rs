// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Type and property metadata.
//!
//! Four type kinds cover everything the engine can describe: opaque pointer
//! handles, simple scalars and enumerations, compound records, and generic
//! containers. Descriptors are built once per record shape and shared with
//! `Arc` wherever the same value type recurs.
//!
//! ```
//! use std::sync::Arc;
//! use mume_core::meta::{PropertyFlags, TypeDesc};
//!
//! let mut profile = TypeDesc::compound("profile");
//! {
//!     let c = profile.as_compound_mut().unwrap();
//!     c.add_direct("zoom", 1, PropertyFlags::RWC, Arc::new(TypeDesc::double()))
//!         .unwrap();
//!     c.add_direct("title", 2, PropertyFlags::RWC, Arc::new(TypeDesc::string()))
//!         .unwrap();
//!     c.finish();
//! }
//! let storage = profile.default_value();
//! assert!(profile.as_compound().unwrap().find("zoom").is_some());
//! assert_eq!(storage.as_record().unwrap().len(), 2);
//! ```

mod compound;
mod container;
pub(crate) mod property;
mod simple;
mod value;

pub use compound::CompoundType;
pub use container::{ContainerFlavor, ContainerType};
pub use property::{Property, PropertyFlags, PropertyKind};
pub use simple::{label, EnumLabel, SimpleType, BOOL_LABELS};
pub use value::Value;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::variant::{Variant, VariantTag};

/// Errors for metadata operations.
#[derive(Debug)]
pub enum MetaError {
    /// String conversion requested on a non-simple type.
    NotSimple,
    NotCompound,
    NotContainer,
    /// A value does not structurally match the type it was used with.
    TypeMismatch { expected: String },
    TagMismatch {
        expected: VariantTag,
        found: VariantTag,
    },
    DuplicateProperty(String),
    UnknownProperty(String),
    /// Enumeration label not in the table; the value is left unchanged.
    UnknownLabel(String),
    /// Enumeration value not in the table.
    UnknownValue(i32),
    Parse { tag: VariantTag, text: String },
    /// Mutation of a compound type after `finish()`.
    Finished,
    IndexOutOfBounds { index: usize, len: usize },
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSimple => write!(f, "operation defined for simple types only"),
            Self::NotCompound => write!(f, "operation defined for compound types only"),
            Self::NotContainer => write!(f, "operation defined for container types only"),
            Self::TypeMismatch { expected } => write!(f, "value does not match type {}", expected),
            Self::TagMismatch { expected, found } => {
                write!(f, "tag mismatch: expected {}, found {}", expected, found)
            }
            Self::DuplicateProperty(name) => write!(f, "duplicate property {:?}", name),
            Self::UnknownProperty(name) => write!(f, "unknown property {:?}", name),
            Self::UnknownLabel(s) => write!(f, "unknown enumeration label {:?}", s),
            Self::UnknownValue(v) => write!(f, "value {} has no enumeration label", v),
            Self::Parse { tag, text } => write!(f, "cannot parse {:?} as {}", text, tag),
            Self::Finished => write!(f, "compound type already finished"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index out of bounds: {} >= {}", index, len)
            }
        }
    }
}

impl std::error::Error for MetaError {}

impl From<crate::variant::VariantError> for MetaError {
    fn from(e: crate::variant::VariantError) -> Self {
        use crate::variant::VariantError;
        match e {
            VariantError::TagMismatch { expected, found } => {
                MetaError::TagMismatch { expected, found }
            }
            VariantError::Parse { to, text } => MetaError::Parse { tag: to, text },
            VariantError::NotConvertible { to, .. } => MetaError::TagMismatch {
                expected: to,
                found: VariantTag::Object,
            },
            _ => MetaError::TypeMismatch {
                expected: "object".to_string(),
            },
        }
    }
}

/// The four type kinds.
#[derive(Debug)]
pub enum TypeKind {
    /// Opaque runtime handle; not convertible, not persisted.
    Pointer,
    Simple(SimpleType),
    Compound(CompoundType),
    Container(ContainerType),
}

/// A named type descriptor.
///
/// Descriptors are immutable once built (compounds freeze on `finish()`)
/// and shared by reference counting: the same `Arc<TypeDesc>` may back any
/// number of properties and container element types.
pub struct TypeDesc {
    name: Cow<'static, str>,
    kind: TypeKind,
}

impl TypeDesc {
    pub fn new(name: impl Into<Cow<'static, str>>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn int() -> Self {
        Self::new("int", TypeKind::Simple(SimpleType::int()))
    }

    pub fn float() -> Self {
        Self::new("float", TypeKind::Simple(SimpleType::float()))
    }

    pub fn double() -> Self {
        Self::new("double", TypeKind::Simple(SimpleType::double()))
    }

    pub fn string() -> Self {
        Self::new("string", TypeKind::Simple(SimpleType::string()))
    }

    pub fn boolean() -> Self {
        Self::new("boolean", TypeKind::Simple(SimpleType::enumeration(&BOOL_LABELS)))
    }

    pub fn enumeration(name: impl Into<Cow<'static, str>>, labels: &'static [EnumLabel]) -> Self {
        Self::new(name, TypeKind::Simple(SimpleType::enumeration(labels)))
    }

    pub fn pointer(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, TypeKind::Pointer)
    }

    /// Start a compound type; add properties through
    /// [`TypeDesc::as_compound_mut`], then call `finish()`.
    pub fn compound(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, TypeKind::Compound(CompoundType::new()))
    }

    pub fn list(elem: Arc<TypeDesc>) -> Self {
        Self::new(
            "list",
            TypeKind::Container(ContainerType::new(ContainerFlavor::List, elem)),
        )
    }

    pub fn vector(elem: Arc<TypeDesc>) -> Self {
        Self::new(
            "vector",
            TypeKind::Container(ContainerType::new(ContainerFlavor::Vector, elem)),
        )
    }

    pub fn ordered_set(elem: Arc<TypeDesc>) -> Self {
        Self::new(
            "ordered-set",
            TypeKind::Container(ContainerType::new(ContainerFlavor::OrderedSet, elem)),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The variant tag of a simple type; `None` for the other kinds.
    pub fn tag(&self) -> Option<VariantTag> {
        match &self.kind {
            TypeKind::Simple(s) => Some(s.tag()),
            _ => None,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TypeKind::Simple(_))
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, TypeKind::Compound(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, TypeKind::Container(_))
    }

    pub fn as_simple(&self) -> Option<&SimpleType> {
        match &self.kind {
            TypeKind::Simple(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundType> {
        match &self.kind {
            TypeKind::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut CompoundType> {
        match &mut self.kind {
            TypeKind::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerType> {
        match &self.kind {
            TypeKind::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Find a declared property on a compound type.
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.as_compound()?.find(name)
    }

    /// Default storage for one instance of this type.
    pub fn default_value(&self) -> Value {
        match &self.kind {
            TypeKind::Pointer => Value::Pointer(None),
            TypeKind::Simple(s) => match s.tag() {
                VariantTag::Int => Value::Int(0),
                VariantTag::Float => Value::Float(0.0),
                VariantTag::Double => Value::Double(0.0),
                VariantTag::Str => Value::Str(String::new()),
                VariantTag::Object => Value::Pointer(None),
            },
            TypeKind::Compound(c) => c.default_value(),
            TypeKind::Container(_) => Value::Seq(Vec::new()),
        }
    }

    /// Whether a value structurally matches this type.
    pub fn value_matches(&self, v: &Value) -> bool {
        match &self.kind {
            TypeKind::Pointer => matches!(v, Value::Pointer(_)),
            TypeKind::Simple(s) => v.tag() == Some(s.tag()),
            TypeKind::Compound(c) => v
                .as_record()
                .map(|slots| slots.len() == c.slot_count())
                .unwrap_or(false),
            TypeKind::Container(c) => v
                .as_seq()
                .map(|items| items.iter().all(|i| c.element_type().value_matches(i)))
                .unwrap_or(false),
        }
    }

    /// Parse a string into a variant of this type.
    ///
    /// Defined for simple types only; compound and container types fail.
    pub fn set_from_string(&self, s: &str) -> Result<Variant, MetaError> {
        match &self.kind {
            TypeKind::Simple(t) => t.set_from_string(s),
            _ => Err(MetaError::NotSimple),
        }
    }

    /// Format a variant of this type as a string.
    ///
    /// Defined for simple types only; compound and container types fail.
    pub fn get_as_string(&self, v: &Variant) -> Result<String, MetaError> {
        match &self.kind {
            TypeKind::Simple(t) => t.get_as_string(v),
            _ => Err(MetaError::NotSimple),
        }
    }

    /// Compare two values of this type.
    ///
    /// Simple types use their comparator (which may be overridden);
    /// everything else compares structurally.
    pub fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        if let TypeKind::Simple(s) = &self.kind {
            if let (Some(va), Some(vb)) = (a.to_variant(), b.to_variant()) {
                return s.compare(&va, &vb);
            }
        }
        a.compare(b)
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TypeKind::Pointer => "pointer",
            TypeKind::Simple(_) => "simple",
            TypeKind::Compound(_) => "compound",
            TypeKind::Container(_) => "container",
        };
        write!(f, "TypeDesc({:?}, {})", self.name, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversion_simple_only() {
        let c = TypeDesc::compound("rec");
        assert!(matches!(c.set_from_string("x"), Err(MetaError::NotSimple)));
        assert!(matches!(
            c.get_as_string(&Variant::Int(0)),
            Err(MetaError::NotSimple)
        ));

        let l = TypeDesc::list(Arc::new(TypeDesc::int()));
        assert!(matches!(l.set_from_string("x"), Err(MetaError::NotSimple)));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(TypeDesc::int().default_value(), Value::Int(0));
        assert_eq!(
            TypeDesc::vector(Arc::new(TypeDesc::int())).default_value(),
            Value::Seq(vec![])
        );
        assert!(matches!(
            TypeDesc::pointer("handle").default_value(),
            Value::Pointer(None)
        ));
    }

    #[test]
    fn test_value_matches() {
        let int_t = TypeDesc::int();
        assert!(int_t.value_matches(&Value::Int(1)));
        assert!(!int_t.value_matches(&Value::Str("1".into())));

        let vec_t = TypeDesc::vector(Arc::new(TypeDesc::int()));
        assert!(vec_t.value_matches(&Value::Seq(vec![Value::Int(1)])));
        assert!(!vec_t.value_matches(&Value::Seq(vec![Value::Str("x".into())])));
    }

    #[test]
    fn test_shared_element_type() {
        // One descriptor backs two container types.
        let int_t = Arc::new(TypeDesc::int());
        let a = TypeDesc::list(int_t.clone());
        let b = TypeDesc::vector(int_t.clone());
        assert!(Arc::ptr_eq(
            a.as_container().unwrap().element_type(),
            b.as_container().unwrap().element_type()
        ));
        assert_eq!(Arc::strong_count(&int_t), 3);
    }
}
