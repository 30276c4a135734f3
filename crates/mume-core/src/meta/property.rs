// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Property descriptors.
//!
//! A property names one addressable piece of a compound type or class.
//! Direct properties occupy a slot inside compound [`Value`] storage; simple
//! properties go through an accessor pair that downcasts the receiver to its
//! concrete type. The receiver is `&dyn Any`, so the same descriptor shape
//! serves both `Value`-backed object descriptors and Rust-struct-backed
//! class instances.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::meta::{TypeDesc, Value};
use crate::variant::{Variant, VariantTag};

/// Access flags for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const NONE: PropertyFlags = PropertyFlags(0);
    pub const READ: PropertyFlags = PropertyFlags(0b0001);
    pub const WRITE: PropertyFlags = PropertyFlags(0b0010);
    /// Settable during property-mode construction.
    pub const CONSTRUCT: PropertyFlags = PropertyFlags(0b0100);
    /// Settable only during property-mode construction.
    pub const CONSTRUCT_ONLY: PropertyFlags = PropertyFlags(0b1000);

    /// The common read/write/construct combination.
    pub const RWC: PropertyFlags = PropertyFlags(0b0111);

    pub fn contains(self, other: PropertyFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PropertyFlags {
    type Output = PropertyFlags;

    fn bitor(self, rhs: PropertyFlags) -> PropertyFlags {
        PropertyFlags(self.0 | rhs.0)
    }
}

pub type GetFn = Box<dyn Fn(&dyn Any) -> Option<Variant> + Send + Sync>;
pub type SetFn = Box<dyn Fn(&mut dyn Any, &Variant) -> bool + Send + Sync>;

/// The two property kinds.
pub enum PropertyKind {
    /// Value embedded in a slot of compound storage, described by its own
    /// type.
    Direct { slot: usize, ty: Arc<TypeDesc> },
    /// Accessor pair over the owning instance.
    Simple { tag: VariantTag, get: GetFn, set: SetFn },
}

/// A named, typed, flagged member of a compound type or class.
pub struct Property {
    name: Cow<'static, str>,
    id: u32,
    flags: PropertyFlags,
    kind: PropertyKind,
}

impl Property {
    pub(crate) fn direct(
        name: impl Into<Cow<'static, str>>,
        id: u32,
        flags: PropertyFlags,
        slot: usize,
        ty: Arc<TypeDesc>,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            flags,
            kind: PropertyKind::Direct { slot, ty },
        }
    }

    /// Build a simple property over accessor functions on the concrete
    /// receiver type `T`.
    pub fn simple<T: Any>(
        name: impl Into<Cow<'static, str>>,
        id: u32,
        flags: PropertyFlags,
        tag: VariantTag,
        get: fn(&T) -> Variant,
        set: fn(&mut T, &Variant) -> bool,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            flags,
            kind: PropertyKind::Simple {
                tag,
                get: Box::new(move |any| any.downcast_ref::<T>().map(get)),
                set: Box::new(move |any, v| {
                    any.downcast_mut::<T>().map(|t| set(t, v)).unwrap_or(false)
                }),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn readable(&self) -> bool {
        self.flags.contains(PropertyFlags::READ)
    }

    pub fn writable(&self) -> bool {
        self.flags.contains(PropertyFlags::WRITE)
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// The variant tag values of this property carry, if scalar-shaped.
    ///
    /// Direct properties of compound or container type have no single tag.
    pub fn tag(&self) -> Option<VariantTag> {
        match &self.kind {
            PropertyKind::Direct { ty, .. } => ty.tag(),
            PropertyKind::Simple { tag, .. } => Some(*tag),
        }
    }

    /// The embedded value type of a direct property.
    pub fn value_type(&self) -> Option<&Arc<TypeDesc>> {
        match &self.kind {
            PropertyKind::Direct { ty, .. } => Some(ty),
            PropertyKind::Simple { .. } => None,
        }
    }

    pub(crate) fn slot(&self) -> Option<usize> {
        match &self.kind {
            PropertyKind::Direct { slot, .. } => Some(*slot),
            PropertyKind::Simple { .. } => None,
        }
    }

    /// Read this property from a receiver.
    ///
    /// For direct properties the receiver must be the compound's [`Value`]
    /// storage and the slot must be scalar-shaped; for simple properties it
    /// must be the accessor's concrete type.
    pub fn get(&self, receiver: &dyn Any) -> Option<Variant> {
        match &self.kind {
            PropertyKind::Direct { slot, .. } => receiver
                .downcast_ref::<Value>()?
                .as_record()?
                .get(*slot)?
                .to_variant(),
            PropertyKind::Simple { get, .. } => get(receiver),
        }
    }

    /// Write this property on a receiver. The variant must already carry
    /// the property's tag; conversion is the caller's concern.
    pub fn set(&self, receiver: &mut dyn Any, value: &Variant) -> bool {
        match &self.kind {
            PropertyKind::Direct { slot, .. } => {
                let Some(stored) = Value::from_variant(value) else {
                    return false;
                };
                match receiver
                    .downcast_mut::<Value>()
                    .and_then(Value::as_record_mut)
                    .and_then(|slots| slots.get_mut(*slot))
                {
                    Some(dest) => {
                        *dest = stored;
                        true
                    }
                    None => false,
                }
            }
            PropertyKind::Simple { set, .. } => set(receiver, value),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            PropertyKind::Direct { slot, ty } => format!("direct(slot {}, {})", slot, ty.name()),
            PropertyKind::Simple { tag, .. } => format!("simple({})", tag),
        };
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("kind", &kind)
            .finish()
    }
}
