// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! The serialize engine: generic object-graph snapshot and restore.
//!
//! Independent of the objectbase: a flat, class-registry-keyed store of
//! named root objects, able to persist arbitrary registered classes —
//! including generic containers — to a second XML dialect rooted at
//! `<mume version=".." compatibility="..">`. Writing walks each root
//! object's class chain through the generic property path; reading buffers
//! property/variant pairs per element and constructs every object with a
//! single property-mode batch, never by field-by-field mutation.
//!
//! Roots are shared handles: the caller keeps its [`SharedObject`] and the
//! engine replaces the handle's contents on restore, so live references see
//! the loaded state.

mod reader;
mod writer;

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use crate::object::{Class, ObjectBox, ObjectError};
use crate::objectbase::is_valid_identifier;
use crate::variant::{shared_object, SharedObject};

/// Version stamped on written documents.
pub const FORMAT_VERSION: &str = "1.0";

/// Errors for the serialize engine.
#[derive(Debug)]
pub enum SerializeError {
    /// The document is not serialize-dialect XML.
    Xml(String),
    /// The document's compatibility version exceeds this engine's.
    Incompatible { found: String },
    UnknownClass(String),
    InvalidName(String),
    DuplicateRoot(String),
    Io(io::Error),
    Object(ObjectError),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml(msg) => write!(f, "malformed document: {}", msg),
            Self::Incompatible { found } => {
                write!(
                    f,
                    "document compatibility {} exceeds engine version {}",
                    found, FORMAT_VERSION
                )
            }
            Self::UnknownClass(name) => write!(f, "unknown class {:?}", name),
            Self::InvalidName(name) => write!(f, "invalid root name {:?}", name),
            Self::DuplicateRoot(name) => write!(f, "duplicate root {:?}", name),
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Object(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SerializeError {}

impl From<io::Error> for SerializeError {
    fn from(e: io::Error) -> Self {
        SerializeError::Io(e)
    }
}

impl From<ObjectError> for SerializeError {
    fn from(e: ObjectError) -> Self {
        SerializeError::Object(e)
    }
}

/// A named root entry.
pub struct RootEntry {
    name: String,
    object: SharedObject,
}

impl RootEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> SharedObject {
        self.object.clone()
    }
}

/// The serialize engine.
pub struct Serializer {
    classes: BTreeMap<&'static str, &'static Class>,
    roots: Vec<RootEntry>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            classes: BTreeMap::new(),
            roots: Vec::new(),
        }
    }

    /// Register a class for (de)serialization. Returns `false` when a class
    /// of that name is already registered.
    pub fn register_class(&mut self, class: &'static Class) -> bool {
        if self.classes.contains_key(class.name()) {
            return false;
        }
        self.classes.insert(class.name(), class);
        true
    }

    pub fn class(&self, name: &str) -> Option<&'static Class> {
        self.classes.get(name).copied()
    }

    /// Add a named root object. The engine shares ownership through the
    /// handle; the caller's clone stays live across restores.
    pub fn add_root(&mut self, name: &str, object: SharedObject) -> Result<(), SerializeError> {
        if !is_valid_identifier(name) {
            return Err(SerializeError::InvalidName(name.to_string()));
        }
        if self.roots.iter().any(|r| r.name == name) {
            return Err(SerializeError::DuplicateRoot(name.to_string()));
        }
        self.roots.push(RootEntry {
            name: name.to_string(),
            object,
        });
        Ok(())
    }

    /// Add a root by boxing a fresh object; returns the shared handle.
    pub fn add_root_object(
        &mut self,
        name: &str,
        object: ObjectBox,
    ) -> Result<SharedObject, SerializeError> {
        let handle = shared_object(object);
        self.add_root(name, handle.clone())?;
        Ok(handle)
    }

    pub fn root(&self, name: &str) -> Option<SharedObject> {
        self.roots
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.object.clone())
    }

    pub fn roots(&self) -> impl Iterator<Item = &RootEntry> {
        self.roots.iter()
    }

    pub fn remove_root(&mut self, name: &str) -> bool {
        let before = self.roots.len();
        self.roots.retain(|r| r.name != name);
        self.roots.len() != before
    }

    /// Write all roots as serialize-dialect XML.
    pub fn save(&self, w: &mut dyn Write) -> Result<(), SerializeError> {
        writer::save(self, w)
    }

    pub fn save_to_string(&self) -> Result<String, SerializeError> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        String::from_utf8(buf).map_err(|e| SerializeError::Xml(e.to_string()))
    }

    /// Restore roots from serialize-dialect XML.
    ///
    /// A root that already exists has its handle's contents replaced, so
    /// callers holding the handle observe the restored state; unknown root
    /// names become new entries. A document whose `compatibility` exceeds
    /// [`FORMAT_VERSION`] lexically is refused whole; per-fragment problems
    /// are logged and skipped.
    pub fn load(&mut self, xml_text: &str) -> Result<(), SerializeError> {
        let loaded = reader::load(self, xml_text)?;
        for (name, object) in loaded {
            match self.roots.iter().position(|r| r.name == name) {
                Some(i) => {
                    *self.roots[i].object.borrow_mut() = object;
                }
                None => self.roots.push(RootEntry {
                    name,
                    object: shared_object(object),
                }),
            }
        }
        Ok(())
    }

    pub fn load_from(&mut self, r: &mut dyn Read) -> Result<(), SerializeError> {
        let mut text = String::new();
        r.read_to_string(&mut text)?;
        self.load(&text)
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("classes", &self.classes.len())
            .field("roots", &self.roots.len())
            .finish()
    }
}
