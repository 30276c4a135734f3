// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Runtime object, type and persistence engine of the Mume document reader.
//!
//! Everything above this crate (widgets, viewers, document loaders) consumes
//! the machinery here:
//!
//! - [`variant`] — tagged values ({int, float, double, string, object}),
//!   the uniform currency at the typed/string boundary.
//! - [`meta`] — type and property metadata: simple scalars and
//!   enumerations, compound records built in two phases, generic containers,
//!   and the [`Value`](meta::Value) storage they describe.
//! - [`object`] — the class/object runtime: single-inheritance class
//!   descriptors interned for the process lifetime, trait-based virtual
//!   dispatch, four construction modes and the generic property access path.
//! - [`objectbase`] — a hierarchical, named object database with symbolic
//!   links, enclosing-scope name resolution and an XML dialect with file
//!   inclusion. Holds the application profile and book metadata.
//! - [`serialize`] — a class-registry-driven object-graph serializer to a
//!   second, independent XML dialect, able to snapshot and restore
//!   arbitrary registered objects including generic containers.
//!
//! The engines are single-threaded and synchronous; every operation runs to
//! completion on the calling thread. Class interning is the one shared
//! surface and is synchronized internally. Diagnostics go through the
//! [`log`] facade; the embedder picks the sink.
//!
//! # Example: a typed profile in the objectbase
//!
//! ```
//! use std::sync::Arc;
//! use mume_core::meta::{PropertyFlags, TypeDesc};
//! use mume_core::objectbase::ObjectBase;
//! use mume_core::variant::Variant;
//!
//! let mut profile_type = TypeDesc::compound("profile");
//! {
//!     let c = profile_type.as_compound_mut().unwrap();
//!     c.add_direct("zoom", 1, PropertyFlags::RWC, Arc::new(TypeDesc::double())).unwrap();
//!     c.add_direct("last_file", 2, PropertyFlags::RWC, Arc::new(TypeDesc::string())).unwrap();
//!     c.finish();
//! }
//!
//! let mut base = ObjectBase::new();
//! let root = base.root();
//! base.register_type(root, "profile", Arc::new(profile_type)).unwrap();
//! base.add_object(root, "app", "profile").unwrap();
//! base.object_mut(root, "app").unwrap().set("zoom", &Variant::Double(1.25)).unwrap();
//!
//! let mut saved = Vec::new();
//! base.save(&mut saved).unwrap();
//! assert!(String::from_utf8(saved).unwrap().contains("zoom"));
//! ```

pub mod meta;
pub mod object;
pub mod objectbase;
pub mod serialize;
pub mod variant;
pub mod xml;

pub use meta::{MetaError, Property, PropertyFlags, TypeDesc, TypeKind, Value};
pub use object::{Class, ClassSpec, Construct, Container, Object, ObjectBox, ObjectError};
pub use objectbase::{BaseError, FsResolver, NsId, ObjDesc, ObjectBase, StreamResolver};
pub use serialize::{SerializeError, Serializer};
pub use variant::{shared_object, SharedObject, Variant, VariantError, VariantTag};
