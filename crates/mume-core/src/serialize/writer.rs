// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Serialize-dialect writer.
//!
//! Each root emits as `<rootname class="ClassName">`. Compound objects walk
//! the full class chain (base classes first): readable scalar properties
//! become attributes, object-valued properties nest as elements named by the
//! property and tagged with the referenced object's runtime class. Container
//! objects emit one `<l>` child per entry: nested objects recurse with a
//! `class` attribute, scalar entries carry their text as character data.

use std::io::Write;

use crate::object::{get_property, Object};
use crate::serialize::{SerializeError, Serializer, FORMAT_VERSION};
use crate::variant::{Variant, VariantTag};
use crate::xml::XmlWriter;

pub(crate) fn save(ser: &Serializer, w: &mut dyn Write) -> Result<(), SerializeError> {
    let mut xw = XmlWriter::new(w);
    xw.declaration()?;
    xw.open(
        "mume",
        &[("version", FORMAT_VERSION), ("compatibility", FORMAT_VERSION)],
    )?;
    for root in ser.roots() {
        let object = root.object();
        let object = object.borrow();
        write_object(&mut xw, root.name(), &**object)?;
    }
    xw.close("mume")?;
    Ok(())
}

fn write_object(
    xw: &mut XmlWriter<&mut dyn Write>,
    tag: &str,
    obj: &dyn Object,
) -> Result<(), SerializeError> {
    let class = obj.class();

    if let Some(container) = obj.as_container() {
        xw.open(tag, &[("class", class.name())])?;
        for entry in container.values() {
            write_entry(xw, entry)?;
        }
        xw.close(tag)?;
        return Ok(());
    }

    // Scalar properties first: they become attributes of this element.
    let mut attrs: Vec<(&str, String)> = Vec::new();
    let mut object_props: Vec<&str> = Vec::new();
    for (_, prop) in class.properties() {
        if !prop.readable() {
            continue;
        }
        match prop.tag() {
            Some(VariantTag::Object) => object_props.push(prop.name()),
            Some(_) => match get_property(obj, prop.name()) {
                Ok(mut v) => {
                    if v.convert(VariantTag::Str).is_ok() {
                        attrs.push((prop.name(), v.as_str().expect("string").to_string()));
                    }
                }
                Err(e) => log::warn!("property {:?} unreadable: {}", prop.name(), e),
            },
            // Structured direct properties have no place in this dialect.
            None => {}
        }
    }

    let mut attr_refs: Vec<(&str, &str)> = vec![("class", class.name())];
    attr_refs.extend(attrs.iter().map(|(n, v)| (*n, v.as_str())));

    if object_props.is_empty() {
        xw.empty(tag, &attr_refs)?;
        return Ok(());
    }

    xw.open(tag, &attr_refs)?;
    for name in object_props {
        match get_property(obj, name) {
            Ok(v) => {
                if v.has_object() {
                    v.with_object(|inner| write_object(xw, name, inner))
                        .expect("object checked")?;
                }
                // Absent objects are simply not written.
            }
            Err(e) => log::warn!("property {:?} unreadable: {}", name, e),
        }
    }
    xw.close(tag)?;
    Ok(())
}

fn write_entry(
    xw: &mut XmlWriter<&mut dyn Write>,
    entry: &Variant,
) -> Result<(), SerializeError> {
    if entry.tag() == VariantTag::Object {
        if entry.has_object() {
            entry
                .with_object(|inner| write_object(xw, "l", inner))
                .expect("object checked")?;
        }
        return Ok(());
    }
    let mut v = entry.clone();
    match v.convert(VariantTag::Str) {
        Ok(()) => xw.text_element("l", &[], v.as_str().expect("string"))?,
        Err(e) => log::warn!("container entry has no string form: {}", e),
    }
    Ok(())
}
