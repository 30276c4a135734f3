// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Process-wide class interning.
//!
//! Classes are created on first definition, cached by name and never
//! destroyed: they are permanent metadata, leaked deliberately. First
//! access from multiple threads is synchronized; the first definition of a
//! name wins and every later definition returns the cached class.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::meta::Property;
use crate::object::{Class, ConstructFn};

static CLASSES: OnceLock<RwLock<HashMap<&'static str, &'static Class>>> = OnceLock::new();

fn classes() -> &'static RwLock<HashMap<&'static str, &'static Class>> {
    CLASSES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Specification of a class to define.
pub struct ClassSpec {
    pub name: &'static str,
    pub super_class: Option<&'static Class>,
    pub properties: Vec<Property>,
    pub construct: ConstructFn,
    pub container: bool,
}

impl ClassSpec {
    pub fn new(name: &'static str, construct: ConstructFn) -> Self {
        Self {
            name,
            super_class: None,
            properties: Vec::new(),
            construct,
            container: false,
        }
    }

    pub fn with_super(mut self, super_class: &'static Class) -> Self {
        self.super_class = Some(super_class);
        self
    }

    pub fn with_property(mut self, prop: Property) -> Self {
        self.properties.push(prop);
        self
    }

    pub fn with_properties(mut self, props: impl IntoIterator<Item = Property>) -> Self {
        self.properties.extend(props);
        self
    }

    /// Mark instances as implementing the container contract.
    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }
}

/// Look up an already-defined class by name.
pub fn lookup(name: &str) -> Option<&'static Class> {
    classes().read().get(name).copied()
}

/// Define a class, or return the cached one if the name is already defined.
pub fn define(spec: ClassSpec) -> &'static Class {
    if let Some(existing) = lookup(spec.name) {
        return existing;
    }
    let mut map = classes().write();
    // Double-check under the write lock: another thread may have defined
    // the class between the read and here.
    if let Some(&existing) = map.get(spec.name) {
        return existing;
    }
    let class: &'static Class = Box::leak(Box::new(Class::from_spec(spec)));
    map.insert(class.name(), class);
    class
}
