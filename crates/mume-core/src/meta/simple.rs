// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Simple (scalar and enumeration) types.
//!
//! A simple type carries the string conversion pair and the comparator for
//! one scalar kind. Enumerations are simple types whose conversions go
//! through a static label table instead of the scalar grammar.

use std::cmp::Ordering;

use crate::meta::MetaError;
use crate::variant::{Variant, VariantTag};

/// One entry of an enumeration label table.
#[derive(Debug, Clone, Copy)]
pub struct EnumLabel {
    pub name: &'static str,
    pub value: i32,
}

/// Shorthand for building enumeration label tables.
pub const fn label(name: &'static str, value: i32) -> EnumLabel {
    EnumLabel { name, value }
}

pub type FromStrFn = fn(&str) -> Option<Variant>;
pub type ToStrFn = fn(&Variant) -> Option<String>;
pub type CmpFn = fn(&Variant, &Variant) -> Ordering;

/// Descriptor of a simple type.
pub struct SimpleType {
    tag: VariantTag,
    from_str: FromStrFn,
    to_str: ToStrFn,
    cmp: Option<CmpFn>,
    labels: Option<&'static [EnumLabel]>,
}

impl SimpleType {
    pub fn new(tag: VariantTag, from_str: FromStrFn, to_str: ToStrFn) -> Self {
        Self {
            tag,
            from_str,
            to_str,
            cmp: None,
            labels: None,
        }
    }

    /// Override the default payload comparator.
    pub fn with_compare(mut self, cmp: CmpFn) -> Self {
        self.cmp = Some(cmp);
        self
    }

    pub fn int() -> Self {
        Self::new(
            VariantTag::Int,
            |s| s.trim().parse::<i32>().ok().map(Variant::Int),
            |v| v.as_int().ok().map(|i| i.to_string()),
        )
    }

    pub fn float() -> Self {
        Self::new(
            VariantTag::Float,
            |s| s.trim().parse::<f32>().ok().map(Variant::Float),
            |v| v.as_float().ok().map(|f| f.to_string()),
        )
    }

    pub fn double() -> Self {
        Self::new(
            VariantTag::Double,
            |s| s.trim().parse::<f64>().ok().map(Variant::Double),
            |v| v.as_double().ok().map(|f| f.to_string()),
        )
    }

    pub fn string() -> Self {
        Self::new(
            VariantTag::Str,
            |s| Some(Variant::Str(s.to_string())),
            |v| v.as_str().ok().map(str::to_string),
        )
    }

    /// An enumeration over a static label table. Values are stored as ints.
    pub fn enumeration(labels: &'static [EnumLabel]) -> Self {
        let mut t = Self::int();
        t.labels = Some(labels);
        t
    }

    pub fn tag(&self) -> VariantTag {
        self.tag
    }

    pub fn labels(&self) -> Option<&'static [EnumLabel]> {
        self.labels
    }

    /// Parse a string into a variant of this type.
    ///
    /// Enumerations accept only known labels; the scalar grammar applies
    /// otherwise.
    pub fn set_from_string(&self, s: &str) -> Result<Variant, MetaError> {
        if let Some(labels) = self.labels {
            return labels
                .iter()
                .find(|l| l.name == s)
                .map(|l| Variant::Int(l.value))
                .ok_or_else(|| MetaError::UnknownLabel(s.to_string()));
        }
        (self.from_str)(s).ok_or_else(|| MetaError::Parse {
            tag: self.tag,
            text: s.to_string(),
        })
    }

    /// Format a variant of this type as a string.
    ///
    /// Fails on tag mismatch; enumerations fail on values outside the label
    /// table.
    pub fn get_as_string(&self, v: &Variant) -> Result<String, MetaError> {
        if v.tag() != self.tag {
            return Err(MetaError::TagMismatch {
                expected: self.tag,
                found: v.tag(),
            });
        }
        if let Some(labels) = self.labels {
            let value = v.as_int().expect("tag checked");
            return labels
                .iter()
                .find(|l| l.value == value)
                .map(|l| l.name.to_string())
                .ok_or(MetaError::UnknownValue(value));
        }
        (self.to_str)(v).ok_or_else(|| MetaError::TagMismatch {
            expected: self.tag,
            found: v.tag(),
        })
    }

    /// Compare two variants of this type.
    pub fn compare(&self, a: &Variant, b: &Variant) -> Ordering {
        match self.cmp {
            Some(cmp) => cmp(a, b),
            None => a.compare(b),
        }
    }
}

impl std::fmt::Debug for SimpleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleType")
            .field("tag", &self.tag)
            .field("labels", &self.labels.map(<[EnumLabel]>::len))
            .finish()
    }
}

/// Label table for the standard boolean type.
pub static BOOL_LABELS: [EnumLabel; 2] = [label("false", 0), label("true", 1)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_round_trip() {
        let t = SimpleType::int();
        for v in [-1, 0, 42, i32::MAX, i32::MIN] {
            let s = t.get_as_string(&Variant::Int(v)).unwrap();
            assert_eq!(t.set_from_string(&s).unwrap(), Variant::Int(v));
        }
    }

    #[test]
    fn test_float_round_trip() {
        let t = SimpleType::float();
        for v in [0.0f32, 1.0, -2.5, 3.125e10] {
            let s = t.get_as_string(&Variant::Float(v)).unwrap();
            assert_eq!(t.set_from_string(&s).unwrap(), Variant::Float(v));
        }
    }

    #[test]
    fn test_string_round_trip() {
        let t = SimpleType::string();
        let s = t.get_as_string(&Variant::from("hello obj1")).unwrap();
        assert_eq!(t.set_from_string(&s).unwrap(), Variant::from("hello obj1"));
    }

    #[test]
    fn test_tag_mismatch_rejected() {
        let t = SimpleType::int();
        assert!(t.get_as_string(&Variant::from("nope")).is_err());
    }

    static COLORS: [EnumLabel; 3] = [label("red", 0), label("green", 1), label("blue", 2)];

    #[test]
    fn test_enumeration_labels() {
        let t = SimpleType::enumeration(&COLORS);
        assert_eq!(t.set_from_string("green").unwrap(), Variant::Int(1));
        assert_eq!(t.get_as_string(&Variant::Int(2)).unwrap(), "blue");
    }

    #[test]
    fn test_enumeration_unknown_label_fails() {
        let t = SimpleType::enumeration(&COLORS);
        assert!(matches!(
            t.set_from_string("magenta"),
            Err(MetaError::UnknownLabel(_))
        ));
        assert!(matches!(
            t.get_as_string(&Variant::Int(9)),
            Err(MetaError::UnknownValue(9))
        ));
    }

    #[test]
    fn test_boolean_is_enumeration() {
        let t = SimpleType::enumeration(&BOOL_LABELS);
        assert_eq!(t.set_from_string("true").unwrap(), Variant::Int(1));
        assert_eq!(t.get_as_string(&Variant::Int(0)).unwrap(), "false");
    }

    #[test]
    fn test_custom_compare() {
        fn by_magnitude(a: &Variant, b: &Variant) -> Ordering {
            let (a, b) = (a.as_int().unwrap_or(0), b.as_int().unwrap_or(0));
            a.abs().cmp(&b.abs())
        }
        let t = SimpleType::int().with_compare(by_magnitude);
        assert_eq!(t.compare(&Variant::Int(-5), &Variant::Int(3)), Ordering::Greater);
    }
}
