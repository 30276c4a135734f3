// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Tagged values.
//!
//! A [`Variant`] holds exactly one of {int, float, double, string, object}
//! and is the uniform currency at the typed/string boundary of both
//! persistence engines. String and object payloads each come in an owned and
//! a borrowed/shared arm; the borrowed arms are the explicit escape from the
//! default ownership rules (owned strings are freed with the variant, owned
//! objects are deep-cloned on copy).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::object::{Object, ObjectBox};

/// Shared, mutable handle to a boxed object.
///
/// Used where a variant (or a serializer root) refers to an object it does
/// not own. The engines are single-threaded by contract, hence `Rc`.
pub type SharedObject = Rc<RefCell<ObjectBox>>;

/// Wrap an object into a [`SharedObject`] handle.
pub fn shared_object(obj: ObjectBox) -> SharedObject {
    Rc::new(RefCell::new(obj))
}

/// The five value kinds a [`Variant`] can hold.
///
/// The owned and borrowed string arms share [`VariantTag::Str`]; the owned
/// and shared object arms share [`VariantTag::Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantTag {
    Int,
    Float,
    Double,
    Str,
    Object,
}

impl VariantTag {
    pub fn name(self) -> &'static str {
        match self {
            VariantTag::Int => "int",
            VariantTag::Float => "float",
            VariantTag::Double => "double",
            VariantTag::Str => "string",
            VariantTag::Object => "object",
        }
    }

    /// Ordering rank used when comparing variants of different tags.
    fn rank(self) -> u8 {
        match self {
            VariantTag::Int => 0,
            VariantTag::Float => 1,
            VariantTag::Double => 2,
            VariantTag::Str => 3,
            VariantTag::Object => 4,
        }
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors for variant access and conversion.
#[derive(Debug)]
pub enum VariantError {
    /// Typed access against a variant holding a different tag.
    TagMismatch {
        expected: VariantTag,
        found: VariantTag,
    },
    /// Conversion between the given tags is not defined.
    NotConvertible { from: VariantTag, to: VariantTag },
    /// A string payload did not parse as the target tag.
    Parse { to: VariantTag, text: String },
    /// Object access against an object-tagged variant holding no object.
    NullObject,
    /// The operation requires an owned payload but the variant borrows.
    NotOwned,
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagMismatch { expected, found } => {
                write!(f, "variant tag mismatch: expected {}, found {}", expected, found)
            }
            Self::NotConvertible { from, to } => {
                write!(f, "variant not convertible: {} to {}", from, to)
            }
            Self::Parse { to, text } => write!(f, "cannot parse {:?} as {}", text, to),
            Self::NullObject => write!(f, "variant holds no object"),
            Self::NotOwned => write!(f, "variant does not own its payload"),
        }
    }
}

impl std::error::Error for VariantError {}

/// A tagged value.
#[derive(Debug)]
pub enum Variant {
    Int(i32),
    Float(f32),
    Double(f64),
    Str(String),
    /// Borrowed string; the caller retains lifetime responsibility.
    StaticStr(&'static str),
    /// Owned object; deep-cloned when the variant is cloned. `None` is the
    /// object-tagged variant before a payload is attached.
    Object(Option<ObjectBox>),
    /// Shared object handle; cloning the variant shares, never copies.
    Shared(SharedObject),
}

impl Variant {
    /// Create a variant of the given tag with its default payload
    /// (zero, empty string, or no object).
    pub fn new(tag: VariantTag) -> Self {
        match tag {
            VariantTag::Int => Variant::Int(0),
            VariantTag::Float => Variant::Float(0.0),
            VariantTag::Double => Variant::Double(0.0),
            VariantTag::Str => Variant::Str(String::new()),
            VariantTag::Object => Variant::Object(None),
        }
    }

    /// Create an owned-object variant.
    pub fn object(obj: ObjectBox) -> Self {
        Variant::Object(Some(obj))
    }

    /// Create a shared-object variant.
    pub fn shared(handle: SharedObject) -> Self {
        Variant::Shared(handle)
    }

    pub fn tag(&self) -> VariantTag {
        match self {
            Variant::Int(_) => VariantTag::Int,
            Variant::Float(_) => VariantTag::Float,
            Variant::Double(_) => VariantTag::Double,
            Variant::Str(_) | Variant::StaticStr(_) => VariantTag::Str,
            Variant::Object(_) | Variant::Shared(_) => VariantTag::Object,
        }
    }

    /// Change the tag and re-initialize the payload, releasing any owned
    /// payload held before.
    pub fn reset(&mut self, tag: VariantTag) {
        *self = Variant::new(tag);
    }

    fn mismatch(&self, expected: VariantTag) -> VariantError {
        VariantError::TagMismatch {
            expected,
            found: self.tag(),
        }
    }

    pub fn as_int(&self) -> Result<i32, VariantError> {
        match self {
            Variant::Int(v) => Ok(*v),
            _ => Err(self.mismatch(VariantTag::Int)),
        }
    }

    pub fn as_float(&self) -> Result<f32, VariantError> {
        match self {
            Variant::Float(v) => Ok(*v),
            _ => Err(self.mismatch(VariantTag::Float)),
        }
    }

    pub fn as_double(&self) -> Result<f64, VariantError> {
        match self {
            Variant::Double(v) => Ok(*v),
            _ => Err(self.mismatch(VariantTag::Double)),
        }
    }

    pub fn as_str(&self) -> Result<&str, VariantError> {
        match self {
            Variant::Str(s) => Ok(s),
            Variant::StaticStr(s) => Ok(s),
            _ => Err(self.mismatch(VariantTag::Str)),
        }
    }

    pub fn set_int(&mut self, v: i32) -> Result<(), VariantError> {
        match self {
            Variant::Int(slot) => {
                *slot = v;
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Int)),
        }
    }

    pub fn set_float(&mut self, v: f32) -> Result<(), VariantError> {
        match self {
            Variant::Float(slot) => {
                *slot = v;
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Float)),
        }
    }

    pub fn set_double(&mut self, v: f64) -> Result<(), VariantError> {
        match self {
            Variant::Double(slot) => {
                *slot = v;
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Double)),
        }
    }

    pub fn set_str(&mut self, v: impl Into<String>) -> Result<(), VariantError> {
        match self {
            Variant::Str(_) | Variant::StaticStr(_) => {
                *self = Variant::Str(v.into());
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Str)),
        }
    }

    /// Borrow a static string instead of owning one.
    pub fn set_static_str(&mut self, v: &'static str) -> Result<(), VariantError> {
        match self {
            Variant::Str(_) | Variant::StaticStr(_) => {
                *self = Variant::StaticStr(v);
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Str)),
        }
    }

    pub fn set_object(&mut self, obj: ObjectBox) -> Result<(), VariantError> {
        match self {
            Variant::Object(_) | Variant::Shared(_) => {
                *self = Variant::Object(Some(obj));
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Object)),
        }
    }

    /// Share an object handle instead of owning a clone.
    pub fn set_shared(&mut self, handle: SharedObject) -> Result<(), VariantError> {
        match self {
            Variant::Object(_) | Variant::Shared(_) => {
                *self = Variant::Shared(handle);
                Ok(())
            }
            _ => Err(self.mismatch(VariantTag::Object)),
        }
    }

    pub fn has_object(&self) -> bool {
        matches!(self, Variant::Object(Some(_)) | Variant::Shared(_))
    }

    /// Run `f` against the held object, owned or shared.
    pub fn with_object<R>(&self, f: impl FnOnce(&dyn Object) -> R) -> Result<R, VariantError> {
        match self {
            Variant::Object(Some(obj)) => Ok(f(obj.as_ref())),
            Variant::Shared(handle) => Ok(f(handle.borrow().as_ref())),
            Variant::Object(None) => Err(VariantError::NullObject),
            _ => Err(self.mismatch(VariantTag::Object)),
        }
    }

    /// Run `f` against the held object mutably, owned or shared.
    pub fn with_object_mut<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Object) -> R,
    ) -> Result<R, VariantError> {
        match self {
            Variant::Object(Some(obj)) => Ok(f(obj.as_mut())),
            Variant::Shared(handle) => Ok(f(handle.borrow_mut().as_mut())),
            Variant::Object(None) => Err(VariantError::NullObject),
            _ => Err(self.mismatch(VariantTag::Object)),
        }
    }

    /// Move the owned object out, leaving an empty object-tagged variant.
    pub fn take_object(&mut self) -> Result<ObjectBox, VariantError> {
        match self {
            Variant::Object(slot) => slot.take().ok_or(VariantError::NullObject),
            Variant::Shared(_) => Err(VariantError::NotOwned),
            _ => Err(self.mismatch(VariantTag::Object)),
        }
    }

    /// Convert the payload to `target` in place.
    ///
    /// int, float, double and string interconvert; the object tag never
    /// converts to or from anything. Converting to the current tag is a
    /// no-op. On failure the variant is left unchanged.
    pub fn convert(&mut self, target: VariantTag) -> Result<(), VariantError> {
        let from = self.tag();
        if from == target {
            return Ok(());
        }
        if from == VariantTag::Object || target == VariantTag::Object {
            return Err(VariantError::NotConvertible { from, to: target });
        }
        let converted = if from == VariantTag::Str {
            parse_str(self.as_str().expect("string tag"), target)?
        } else if target == VariantTag::Str {
            // Format from the original representation so each width keeps
            // its own shortest decimal form.
            Variant::Str(match self {
                Variant::Int(v) => v.to_string(),
                Variant::Float(v) => v.to_string(),
                Variant::Double(v) => v.to_string(),
                _ => unreachable!("string and object handled above"),
            })
        } else {
            let wide = match self {
                Variant::Int(v) => f64::from(*v),
                Variant::Float(v) => f64::from(*v),
                Variant::Double(v) => *v,
                _ => unreachable!("string and object handled above"),
            };
            match target {
                VariantTag::Int => Variant::Int(wide as i32),
                VariantTag::Float => Variant::Float(wide as f32),
                VariantTag::Double => Variant::Double(wide),
                VariantTag::Str | VariantTag::Object => unreachable!("handled above"),
            }
        };
        *self = converted;
        Ok(())
    }

    /// Total order over variants.
    ///
    /// Variants of different tags order by tag; same-tag variants order by
    /// payload. An object-tagged variant holding no object orders before one
    /// holding an object.
    pub fn compare(&self, other: &Variant) -> Ordering {
        let (ta, tb) = (self.tag(), other.tag());
        if ta != tb {
            return ta.rank().cmp(&tb.rank());
        }
        match (self, other) {
            (Variant::Int(a), Variant::Int(b)) => a.cmp(b),
            (Variant::Float(a), Variant::Float(b)) => a.total_cmp(b),
            (Variant::Double(a), Variant::Double(b)) => a.total_cmp(b),
            _ if ta == VariantTag::Str => {
                self.as_str().expect("str tag").cmp(other.as_str().expect("str tag"))
            }
            _ => {
                // Object tag: absent orders before present.
                match (self.has_object(), other.has_object()) {
                    (false, false) => Ordering::Equal,
                    (false, true) => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    (true, true) => self
                        .with_object(|a| {
                            other.with_object(|b| a.compare_object(b)).expect("has object")
                        })
                        .expect("has object"),
                }
            }
        }
    }
}

/// Parse a string payload into the target scalar tag.
fn parse_str(s: &str, target: VariantTag) -> Result<Variant, VariantError> {
    let s = s.trim();
    let parsed = match target {
        VariantTag::Int => s.parse::<i32>().ok().map(Variant::Int),
        VariantTag::Float => s.parse::<f32>().ok().map(Variant::Float),
        VariantTag::Double => s.parse::<f64>().ok().map(Variant::Double),
        _ => None,
    };
    parsed.ok_or_else(|| VariantError::Parse {
        to: target,
        text: s.to_string(),
    })
}

impl Clone for Variant {
    /// Deep-clones owned objects; shares the handle of shared objects.
    fn clone(&self) -> Self {
        match self {
            Variant::Int(v) => Variant::Int(*v),
            Variant::Float(v) => Variant::Float(*v),
            Variant::Double(v) => Variant::Double(*v),
            Variant::Str(s) => Variant::Str(s.clone()),
            Variant::StaticStr(s) => Variant::StaticStr(s),
            Variant::Object(obj) => Variant::Object(obj.as_ref().map(|o| o.clone_object())),
            Variant::Shared(handle) => Variant::Shared(handle.clone()),
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int(v)
    }
}

impl From<f32> for Variant {
    fn from(v: f32) -> Self {
        Variant::Float(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Str(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Str(v.to_string())
    }
}
