// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! The class/object runtime.
//!
//! A [`Class`] is a single-inheritance descriptor: name, optional
//! superclass, the properties it declares itself, and a construction
//! function covering the four construction modes. Virtual behavior lives on
//! the [`Object`] trait, one implementation per concrete class; inheritance
//! is composition with an explicit base field, and inherited property access
//! reaches the base state through [`Object::class_state`].
//!
//! Classes are interned process-wide (see [`registry`]) and live for the
//! process lifetime.

pub mod containers;
pub mod registry;

pub use containers::{list_class, ordered_set_class, vector_class, Container};
pub use registry::ClassSpec;

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use crate::meta::{Property, PropertyFlags};
use crate::variant::{Variant, VariantError};

/// A heap-allocated object handle.
pub type ObjectBox = Box<dyn Object>;

/// Errors for object construction and property access.
#[derive(Debug)]
pub enum ObjectError {
    UnknownProperty(String),
    NotReadable(String),
    NotWritable(String),
    /// An operation received an object of the wrong class.
    WrongClass {
        expected: &'static str,
        found: &'static str,
    },
    /// A constructor in the superclass chain signaled failure.
    ConstructFailed(String),
    /// An accessor refused the value.
    AccessFailed(String),
    Variant(VariantError),
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty(name) => write!(f, "unknown property {:?}", name),
            Self::NotReadable(name) => write!(f, "property {:?} is not readable", name),
            Self::NotWritable(name) => write!(f, "property {:?} is not writable", name),
            Self::WrongClass { expected, found } => {
                write!(f, "wrong class: expected {}, found {}", expected, found)
            }
            Self::ConstructFailed(msg) => write!(f, "construction failed: {}", msg),
            Self::AccessFailed(name) => write!(f, "property access failed for {:?}", name),
            Self::Variant(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ObjectError {}

impl From<VariantError> for ObjectError {
    fn from(e: VariantError) -> Self {
        ObjectError::Variant(e)
    }
}

/// The four construction modes.
pub enum Construct<'a> {
    /// Explicit positional arguments.
    Normal(&'a [Variant]),
    /// Copy-construct from an existing object.
    Clone(&'a dyn Object),
    /// Construct, then inject a batch of named property values atomically.
    /// Used by deserialization.
    Properties(&'a [(&'a Property, Variant)]),
    /// Construct a lightweight search key (for lookups that should not pay
    /// for a full object).
    Key(&'a [Variant]),
}

/// Construction entry point of a class.
pub type ConstructFn = fn(&Construct<'_>) -> Result<ObjectBox, ObjectError>;

/// A single-inheritance class descriptor.
///
/// Created once through [`registry::define`] and never destroyed.
pub struct Class {
    name: &'static str,
    super_class: Option<&'static Class>,
    /// Own declared properties, sorted by name.
    props: Box<[Property]>,
    construct: ConstructFn,
    container: bool,
}

impl Class {
    pub(crate) fn from_spec(spec: ClassSpec) -> Self {
        let mut props = spec.properties;
        props.sort_by(|a, b| a.name().cmp(b.name()));
        Self {
            name: spec.name,
            super_class: spec.super_class,
            props: props.into_boxed_slice(),
            construct: spec.construct,
            container: spec.container,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn super_class(&self) -> Option<&'static Class> {
        self.super_class
    }

    /// Whether instances implement [`Container`].
    pub fn is_container(&self) -> bool {
        self.container
    }

    /// Exact-class identity.
    pub fn is_a(&self, other: &Class) -> bool {
        std::ptr::eq(self, other)
    }

    /// Reflexive-transitive ancestor check.
    pub fn is_of(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(c) = current {
            if std::ptr::eq(c, other) {
                return true;
            }
            current = c.super_class;
        }
        false
    }

    /// Properties declared by this class itself, sorted by name.
    pub fn own_properties(&self) -> &[Property] {
        &self.props
    }

    /// All properties, base classes first.
    pub fn properties(&'static self) -> Vec<(&'static Class, &'static Property)> {
        let mut out = Vec::new();
        if let Some(base) = self.super_class {
            out.extend(base.properties());
        }
        out.extend(self.props.iter().map(|p| (self, p)));
        out
    }

    /// Find a property by name on this class or an ancestor. Returns the
    /// declaring class alongside the property.
    pub fn find_property(
        &'static self,
        name: &str,
    ) -> Option<(&'static Class, &'static Property)> {
        let mut current = Some(self);
        while let Some(c) = current {
            if let Ok(i) = c.props.binary_search_by(|p| p.name().cmp(name)) {
                return Some((c, &c.props[i]));
            }
            current = c.super_class;
        }
        None
    }

    /// Run the construction function.
    pub fn construct(&self, mode: &Construct<'_>) -> Result<ObjectBox, ObjectError> {
        (self.construct)(mode)
    }

    /// Normal-mode construction.
    pub fn create(&self, args: &[Variant]) -> Result<ObjectBox, ObjectError> {
        self.construct(&Construct::Normal(args))
    }

    /// Property-mode construction.
    pub fn create_with_properties(
        &self,
        batch: &[(&Property, Variant)],
    ) -> Result<ObjectBox, ObjectError> {
        self.construct(&Construct::Properties(batch))
    }

    /// Key-mode construction.
    pub fn create_key(&self, args: &[Variant]) -> Result<ObjectBox, ObjectError> {
        self.construct(&Construct::Key(args))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("super", &self.super_class.map(Class::name))
            .field("properties", &self.props.len())
            .finish()
    }
}

/// Implemented by every object kind the engine can hold.
///
/// `clone_object` is the copy dispatch; `compare_object` the comparison
/// dispatch. Classes with a base carry it as a field and must forward
/// `class_state` to it for ancestor classes (explicit delegation).
pub trait Object: Any + fmt::Debug {
    fn class(&self) -> &'static Class;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Deep copy.
    fn clone_object(&self) -> ObjectBox;

    /// State view for `class`, which must be this object's class or an
    /// ancestor. The default covers classes without a base; overriding
    /// implementations forward ancestor requests to their base field.
    fn class_state(&self, class: &'static Class) -> Option<&dyn Any> {
        if self.class().is_a(class) {
            Some(self.as_any())
        } else {
            None
        }
    }

    fn class_state_mut(&mut self, class: &'static Class) -> Option<&mut dyn Any> {
        if self.class().is_a(class) {
            Some(self.as_any_mut())
        } else {
            None
        }
    }

    /// Total order among objects; the default orders by class name only.
    fn compare_object(&self, other: &dyn Object) -> Ordering {
        self.class().name().cmp(other.class().name())
    }

    fn as_container(&self) -> Option<&dyn Container> {
        None
    }

    fn as_container_mut(&mut self) -> Option<&mut dyn Container> {
        None
    }
}

/// Clone an object through clone-mode construction.
pub fn clone_object(obj: &dyn Object) -> Result<ObjectBox, ObjectError> {
    obj.class().construct(&Construct::Clone(obj))
}

/// Read a named property, walking the class chain for the declaration.
pub fn get_property(obj: &dyn Object, name: &str) -> Result<Variant, ObjectError> {
    let (decl, prop) = obj
        .class()
        .find_property(name)
        .ok_or_else(|| ObjectError::UnknownProperty(name.to_string()))?;
    if !prop.readable() {
        return Err(ObjectError::NotReadable(name.to_string()));
    }
    let state = obj.class_state(decl).ok_or(ObjectError::WrongClass {
        expected: decl.name(),
        found: obj.class().name(),
    })?;
    prop.get(state)
        .ok_or_else(|| ObjectError::AccessFailed(name.to_string()))
}

/// Write a named property. The value is converted to the property's
/// declared tag before the accessor runs.
pub fn set_property(obj: &mut dyn Object, name: &str, value: &Variant) -> Result<(), ObjectError> {
    set_property_impl(obj, name, value, false)
}

fn set_property_impl(
    obj: &mut dyn Object,
    name: &str,
    value: &Variant,
    constructing: bool,
) -> Result<(), ObjectError> {
    let (decl, prop) = obj
        .class()
        .find_property(name)
        .ok_or_else(|| ObjectError::UnknownProperty(name.to_string()))?;
    let allowed = prop.writable()
        || (constructing && prop.flags().contains(PropertyFlags::CONSTRUCT))
        || (constructing && prop.flags().contains(PropertyFlags::CONSTRUCT_ONLY));
    if !allowed {
        return Err(ObjectError::NotWritable(name.to_string()));
    }
    let converted;
    let value = match prop.tag() {
        Some(tag) if value.tag() != tag => {
            let mut v = value.clone();
            v.convert(tag)?;
            converted = v;
            &converted
        }
        _ => value,
    };
    let found = obj.class().name();
    let state = obj.class_state_mut(decl).ok_or(ObjectError::WrongClass {
        expected: decl.name(),
        found,
    })?;
    if prop.set(state, value) {
        Ok(())
    } else {
        Err(ObjectError::AccessFailed(name.to_string()))
    }
}

/// Apply a property-mode construction batch to a freshly built object.
///
/// Intended for use inside construction functions handling
/// [`Construct::Properties`]; construct-time-only properties are settable
/// here and nowhere else.
pub fn apply_properties(
    obj: &mut dyn Object,
    batch: &[(&Property, Variant)],
) -> Result<(), ObjectError> {
    for (prop, value) in batch {
        set_property_impl(obj, prop.name(), value, true)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::VariantTag;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    // A two-level hierarchy used across the runtime tests: `item` with a
    // name, `entry` deriving from it with a count.

    #[derive(Debug, Clone, Default)]
    struct Item {
        name: String,
    }

    fn item_class() -> &'static Class {
        registry::define(
            ClassSpec::new("item", construct_item)
                .with_property(Property::simple::<Item>(
                    "name",
                    1,
                    PropertyFlags::RWC,
                    VariantTag::Str,
                    |i| Variant::from(i.name.clone()),
                    |i, v| v.as_str().map(|s| i.name = s.to_string()).is_ok(),
                )),
        )
    }

    fn construct_item(mode: &Construct<'_>) -> Result<ObjectBox, ObjectError> {
        match mode {
            Construct::Normal(args) | Construct::Key(args) => {
                let name = args
                    .first()
                    .and_then(|v| v.as_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Ok(Box::new(Item { name }))
            }
            Construct::Clone(src) => src
                .as_any()
                .downcast_ref::<Item>()
                .map(|i| Box::new(i.clone()) as ObjectBox)
                .ok_or(ObjectError::WrongClass {
                    expected: "item",
                    found: src.class().name(),
                }),
            Construct::Properties(batch) => {
                let mut item = Item::default();
                apply_properties(&mut item, batch)?;
                Ok(Box::new(item))
            }
        }
    }

    impl Object for Item {
        fn class(&self) -> &'static Class {
            item_class()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn clone_object(&self) -> ObjectBox {
            Box::new(self.clone())
        }

        fn compare_object(&self, other: &dyn Object) -> Ordering {
            match other.as_any().downcast_ref::<Item>() {
                Some(o) => self.name.cmp(&o.name),
                None => self.class().name().cmp(other.class().name()),
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Entry {
        base: Item,
        count: i32,
    }

    fn entry_class() -> &'static Class {
        registry::define(
            ClassSpec::new("entry", construct_entry)
                .with_super(item_class())
                .with_property(Property::simple::<Entry>(
                    "count",
                    2,
                    PropertyFlags::RWC,
                    VariantTag::Int,
                    |e| Variant::Int(e.count),
                    |e, v| v.as_int().map(|i| e.count = i).is_ok(),
                )),
        )
    }

    fn construct_entry(mode: &Construct<'_>) -> Result<ObjectBox, ObjectError> {
        match mode {
            Construct::Normal(args) => {
                // Chain-call the superclass constructor first.
                let base = item_class().create(&args[..args.len().min(1)])?;
                let base = base
                    .as_any()
                    .downcast_ref::<Item>()
                    .cloned()
                    .expect("item constructor yields Item");
                let count = args.get(1).and_then(|v| v.as_int().ok()).unwrap_or(0);
                Ok(Box::new(Entry { base, count }))
            }
            Construct::Clone(src) => src
                .as_any()
                .downcast_ref::<Entry>()
                .map(|e| Box::new(e.clone()) as ObjectBox)
                .ok_or(ObjectError::WrongClass {
                    expected: "entry",
                    found: src.class().name(),
                }),
            Construct::Properties(batch) => {
                let mut entry = Entry::default();
                apply_properties(&mut entry, batch)?;
                Ok(Box::new(entry))
            }
            Construct::Key(args) => construct_entry(&Construct::Normal(*args)),
        }
    }

    impl Object for Entry {
        fn class(&self) -> &'static Class {
            entry_class()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn clone_object(&self) -> ObjectBox {
            Box::new(self.clone())
        }

        fn class_state(&self, class: &'static Class) -> Option<&dyn Any> {
            if self.class().is_a(class) {
                Some(self.as_any())
            } else {
                self.base.class_state(class)
            }
        }

        fn class_state_mut(&mut self, class: &'static Class) -> Option<&mut dyn Any> {
            if self.class().is_a(class) {
                Some(self.as_any_mut())
            } else {
                self.base.class_state_mut(class)
            }
        }
    }

    #[test]
    fn test_is_a_is_of() {
        let (item, entry) = (item_class(), entry_class());
        assert!(item.is_a(item));
        assert!(!entry.is_a(item));
        assert!(entry.is_of(item));
        assert!(entry.is_of(entry));
        assert!(!item.is_of(entry));
    }

    #[test]
    fn test_normal_construction_and_property_walk() {
        let obj = entry_class()
            .create(&[Variant::from("doc"), Variant::Int(3)])
            .unwrap();
        // Own property.
        assert_eq!(get_property(obj.as_ref(), "count").unwrap(), Variant::Int(3));
        // Inherited property reaches the base state.
        assert_eq!(
            get_property(obj.as_ref(), "name").unwrap(),
            Variant::from("doc")
        );
        assert!(get_property(obj.as_ref(), "missing").is_err());
    }

    #[test]
    fn test_set_property_converts_first() {
        let mut obj = entry_class().create(&[Variant::from("doc")]).unwrap();
        // String value against an int property converts before the accessor.
        set_property(obj.as_mut(), "count", &Variant::from("41")).unwrap();
        assert_eq!(get_property(obj.as_ref(), "count").unwrap(), Variant::Int(41));
        // Unparseable value is refused.
        assert!(set_property(obj.as_mut(), "count", &Variant::from("nope")).is_err());
    }

    #[test]
    fn test_clone_mode() {
        let original = entry_class()
            .create(&[Variant::from("a"), Variant::Int(7)])
            .unwrap();
        let copy = clone_object(original.as_ref()).unwrap();
        assert_eq!(get_property(copy.as_ref(), "count").unwrap(), Variant::Int(7));
        assert_eq!(get_property(copy.as_ref(), "name").unwrap(), Variant::from("a"));
    }

    #[test]
    fn test_property_mode_batch() {
        let class = entry_class();
        let name_prop = class.find_property("name").unwrap().1;
        let count_prop = class.find_property("count").unwrap().1;
        let batch = [
            (name_prop, Variant::from("batched")),
            (count_prop, Variant::Int(12)),
        ];
        let obj = class.create_with_properties(&batch).unwrap();
        assert_eq!(
            get_property(obj.as_ref(), "name").unwrap(),
            Variant::from("batched")
        );
        assert_eq!(get_property(obj.as_ref(), "count").unwrap(), Variant::Int(12));
    }

    #[test]
    fn test_key_mode() {
        let key = item_class().create_key(&[Variant::from("needle")]).unwrap();
        let full = item_class().create(&[Variant::from("needle")]).unwrap();
        assert_eq!(key.compare_object(full.as_ref()), Ordering::Equal);
    }

    #[test]
    fn test_accumulated_properties_base_first() {
        let names: Vec<_> = entry_class()
            .properties()
            .iter()
            .map(|(_, p)| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["name".to_string(), "count".to_string()]);
    }

    #[test]
    fn test_variant_object_ownership() {
        // Deep clone by default: mutating the copy leaves the original.
        let obj = item_class().create(&[Variant::from("owned")]).unwrap();
        let original = Variant::object(obj);
        let mut copy = original.clone();
        copy.with_object_mut(|o| set_property(o, "name", &Variant::from("changed")).unwrap())
            .unwrap();
        assert_eq!(
            original
                .with_object(|o| get_property(o, "name").unwrap())
                .unwrap(),
            Variant::from("owned")
        );

        // The shared arm is the explicit escape: clones alias.
        let handle = crate::variant::shared_object(
            item_class().create(&[Variant::from("s")]).unwrap(),
        );
        let a = Variant::shared(handle.clone());
        let mut b = a.clone();
        b.with_object_mut(|o| set_property(o, "name", &Variant::from("both")).unwrap())
            .unwrap();
        assert_eq!(
            a.with_object(|o| get_property(o, "name").unwrap()).unwrap(),
            Variant::from("both")
        );
    }

    // Construction-failure propagation: the partially built base must be
    // dropped exactly once and the constructor must return Err.

    static FRAGILE_DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    struct DropCounted {
        base: Item,
    }

    impl Drop for DropCounted {
        fn drop(&mut self) {
            FRAGILE_DROPS.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }

    fn fragile_class() -> &'static Class {
        registry::define(ClassSpec::new("fragile", construct_fragile).with_super(item_class()))
    }

    fn construct_fragile(mode: &Construct<'_>) -> Result<ObjectBox, ObjectError> {
        match mode {
            Construct::Normal(args) => {
                let base = item_class().create(args)?;
                let base = base
                    .as_any()
                    .downcast_ref::<Item>()
                    .cloned()
                    .expect("item constructor yields Item");
                // Own initialization fails after the base is built.
                let _partial = DropCounted { base };
                Err(ObjectError::ConstructFailed("fragile init refused".into()))
            }
            _ => Err(ObjectError::ConstructFailed("unsupported mode".into())),
        }
    }

    impl Object for DropCounted {
        fn class(&self) -> &'static Class {
            fragile_class()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn clone_object(&self) -> ObjectBox {
            Box::new(DropCounted {
                base: self.base.clone(),
            })
        }
    }

    #[test]
    fn test_construction_failure_destructs_once() {
        FRAGILE_DROPS.store(0, AtomicOrdering::SeqCst);
        let result = fragile_class().create(&[Variant::from("x")]);
        assert!(result.is_err());
        assert_eq!(FRAGILE_DROPS.load(AtomicOrdering::SeqCst), 1);
    }
}
