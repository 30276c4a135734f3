// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Compound (record) types.
//!
//! Building is a two-phase protocol: add direct and simple properties in any
//! order, then [`CompoundType::finish`] sorts the property array by name and
//! freezes it. Lookups work in both phases and find the same property; the
//! finished phase uses binary search.

use std::borrow::Cow;
use std::sync::Arc;

use crate::meta::{MetaError, Property, PropertyFlags, TypeDesc, Value};

/// A record type described by a sorted list of named properties.
#[derive(Debug)]
pub struct CompoundType {
    props: Vec<Property>,
    direct_slots: usize,
    finished: bool,
}

impl CompoundType {
    pub(crate) fn new() -> Self {
        Self {
            props: Vec::new(),
            direct_slots: 0,
            finished: false,
        }
    }

    fn check_open(&self, name: &str) -> Result<(), MetaError> {
        if self.finished {
            return Err(MetaError::Finished);
        }
        if self.props.iter().any(|p| p.name() == name) {
            return Err(MetaError::DuplicateProperty(name.to_string()));
        }
        Ok(())
    }

    /// Append a direct property; its value occupies the next storage slot.
    pub fn add_direct(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        id: u32,
        flags: PropertyFlags,
        ty: Arc<TypeDesc>,
    ) -> Result<(), MetaError> {
        let name = name.into();
        self.check_open(&name)?;
        let slot = self.direct_slots;
        self.props.push(Property::direct(name, id, flags, slot, ty));
        self.direct_slots += 1;
        Ok(())
    }

    /// Append an already-built simple property (an accessor pair, typically
    /// over the compound's own [`Value`] storage).
    pub fn add_property(&mut self, prop: Property) -> Result<(), MetaError> {
        self.check_open(prop.name())?;
        if prop.slot().is_some() {
            // Direct properties must come through add_direct so slots stay
            // consistent with the storage layout.
            return Err(MetaError::NotSimple);
        }
        self.props.push(prop);
        Ok(())
    }

    /// Sort the property array by name and freeze the set.
    pub fn finish(&mut self) {
        self.props.sort_by(|a, b| a.name().cmp(b.name()));
        self.finished = true;
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Find a declared property by name; linear before [`finish`], binary
    /// search after.
    ///
    /// [`finish`]: CompoundType::finish
    pub fn find(&self, name: &str) -> Option<&Property> {
        if self.finished {
            self.props
                .binary_search_by(|p| p.name().cmp(name))
                .ok()
                .map(|i| &self.props[i])
        } else {
            self.props.iter().find(|p| p.name() == name)
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.props
    }

    /// Number of storage slots direct properties occupy.
    pub fn slot_count(&self) -> usize {
        self.direct_slots
    }

    /// Default storage for one instance: each direct property's slot holds
    /// its type's default value.
    pub fn default_value(&self) -> Value {
        let mut slots = vec![Value::Int(0); self.direct_slots];
        for prop in &self.props {
            if let (Some(slot), Some(ty)) = (prop.slot(), prop.value_type()) {
                slots[slot] = ty.default_value();
            }
        }
        Value::Record(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompoundType {
        let mut c = CompoundType::new();
        c.add_direct("i", 1, PropertyFlags::RWC, Arc::new(TypeDesc::int()))
            .unwrap();
        c.add_direct("f", 2, PropertyFlags::RWC, Arc::new(TypeDesc::float()))
            .unwrap();
        c.add_direct("s", 3, PropertyFlags::RWC, Arc::new(TypeDesc::string()))
            .unwrap();
        c
    }

    #[test]
    fn test_lookup_stable_across_finish() {
        let mut c = sample();
        let before = c.find("f").map(|p| (p.name().to_string(), p.id()));
        c.finish();
        let after = c.find("f").map(|p| (p.name().to_string(), p.id()));
        assert_eq!(before, after);
        assert_eq!(before, Some(("f".to_string(), 2)));
    }

    #[test]
    fn test_lookup_unknown_not_found() {
        let mut c = sample();
        assert!(c.find("missing").is_none());
        c.finish();
        assert!(c.find("missing").is_none());
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let mut c = sample();
        let err = c.add_direct("i", 9, PropertyFlags::RWC, Arc::new(TypeDesc::int()));
        assert!(matches!(err, Err(MetaError::DuplicateProperty(_))));
    }

    #[test]
    fn test_add_after_finish_rejected() {
        let mut c = sample();
        c.finish();
        let err = c.add_direct("x", 9, PropertyFlags::RWC, Arc::new(TypeDesc::int()));
        assert!(matches!(err, Err(MetaError::Finished)));
    }

    #[test]
    fn test_simple_property_over_storage() {
        use crate::variant::{Variant, VariantTag};

        let mut c = CompoundType::new();
        c.add_direct("w", 1, PropertyFlags::RWC, Arc::new(TypeDesc::int()))
            .unwrap();
        c.add_direct("h", 2, PropertyFlags::RWC, Arc::new(TypeDesc::int()))
            .unwrap();
        // A computed, read-only property over the record storage.
        c.add_property(Property::simple::<Value>(
            "area",
            3,
            PropertyFlags::READ,
            VariantTag::Int,
            |v| {
                let slots = v.as_record().expect("record storage");
                match (&slots[0], &slots[1]) {
                    (Value::Int(w), Value::Int(h)) => Variant::Int(w * h),
                    _ => Variant::Int(0),
                }
            },
            |_, _| false,
        ))
        .unwrap();
        c.finish();

        let mut storage = c.default_value();
        storage.as_record_mut().unwrap()[0] = Value::Int(3);
        storage.as_record_mut().unwrap()[1] = Value::Int(4);
        let area = c.find("area").unwrap().get(&storage).unwrap();
        assert_eq!(area, Variant::Int(12));
    }

    #[test]
    fn test_direct_property_refused_by_add_property() {
        let mut c = sample();
        let stray = Property::direct("x", 9, PropertyFlags::RWC, 0, Arc::new(TypeDesc::int()));
        assert!(c.add_property(stray).is_err());
    }

    #[test]
    fn test_default_value_layout() {
        let mut c = sample();
        c.finish();
        let v = c.default_value();
        let slots = v.as_record().unwrap();
        // Slots follow declaration order regardless of the name sort.
        assert_eq!(slots[0], Value::Int(0));
        assert_eq!(slots[1], Value::Float(0.0));
        assert_eq!(slots[2], Value::Str(String::new()));
    }
}
