// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Serialize-dialect reader.
//!
//! Recursive descent over the parsed document. For every non-container
//! element the reader buffers (property, variant) pairs — attributes and
//! scalar child elements arrive as string variants, object-valued children
//! recurse first — and constructs the object with a single property-mode
//! batch when the element closes. Container-shaped elements buffer their
//! pending entry variants and bulk-insert them into the freshly constructed
//! container.
//!
//! The root `compatibility` attribute gates the whole document; everything
//! below it degrades gracefully (warn and skip).

use roxmltree::{Document, Node};

use crate::meta::Property;
use crate::object::{Class, ObjectBox};
use crate::serialize::{SerializeError, Serializer, FORMAT_VERSION};
use crate::variant::{Variant, VariantTag};

pub(crate) fn load(
    ser: &Serializer,
    xml_text: &str,
) -> Result<Vec<(String, ObjectBox)>, SerializeError> {
    let doc = Document::parse(xml_text).map_err(|e| SerializeError::Xml(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "mume" {
        return Err(SerializeError::Xml(format!(
            "expected <mume>, found <{}>",
            root.tag_name().name()
        )));
    }

    // Refuse documents from a future format before reading anything else.
    let compatibility = root.attribute("compatibility").unwrap_or(FORMAT_VERSION);
    if compatibility > FORMAT_VERSION {
        return Err(SerializeError::Incompatible {
            found: compatibility.to_string(),
        });
    }

    let mut out = Vec::new();
    for child in root.children().filter(Node::is_element) {
        let name = child.tag_name().name();
        let Some(class_name) = child.attribute("class") else {
            log::warn!("root {:?} without class attribute skipped", name);
            continue;
        };
        let Some(class) = ser.class(class_name) else {
            log::warn!("root {:?} skipped: unknown class {:?}", name, class_name);
            continue;
        };
        match read_object(ser, class, child) {
            Ok(object) => out.push((name.to_string(), object)),
            Err(e) => log::warn!("root {:?} skipped: {}", name, e),
        }
    }
    Ok(out)
}

fn read_object(
    ser: &Serializer,
    class: &'static Class,
    elem: Node<'_, '_>,
) -> Result<ObjectBox, SerializeError> {
    if class.is_container() {
        return read_container(ser, class, elem);
    }

    let mut batch: Vec<(&'static Property, Variant)> = Vec::new();

    for attr in elem.attributes() {
        if attr.name() == "class" {
            continue;
        }
        let Some((_, prop)) = class.find_property(attr.name()) else {
            log::warn!(
                "unknown attribute {:?} on class {} skipped",
                attr.name(),
                class.name()
            );
            continue;
        };
        // String variants convert to the declared tag during the batch.
        batch.push((prop, Variant::from(attr.value())));
    }

    for child in elem.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        let Some((_, prop)) = class.find_property(tag) else {
            log::warn!("unknown property <{}> on class {} skipped", tag, class.name());
            continue;
        };
        if prop.tag() == Some(VariantTag::Object) {
            let Some(class_name) = child.attribute("class") else {
                log::warn!("property <{}> without class attribute skipped", tag);
                continue;
            };
            let Some(child_class) = ser.class(class_name) else {
                log::warn!("property <{}> skipped: unknown class {:?}", tag, class_name);
                continue;
            };
            match read_object(ser, child_class, child) {
                Ok(object) => batch.push((prop, Variant::object(object))),
                Err(e) => log::warn!("property <{}> skipped: {}", tag, e),
            }
        } else {
            // Scalar leaf: character data becomes a string variant.
            let text = child.text().unwrap_or("");
            batch.push((prop, Variant::from(text)));
        }
    }

    // One atomic property-mode construction per element.
    Ok(class.create_with_properties(&batch)?)
}

fn read_container(
    ser: &Serializer,
    class: &'static Class,
    elem: Node<'_, '_>,
) -> Result<ObjectBox, SerializeError> {
    let mut pending: Vec<Variant> = Vec::new();
    for child in elem.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        if tag != "l" {
            log::warn!("unexpected element <{}> in container skipped", tag);
            continue;
        }
        match child.attribute("class") {
            Some(class_name) => {
                let Some(child_class) = ser.class(class_name) else {
                    log::warn!("container entry skipped: unknown class {:?}", class_name);
                    continue;
                };
                match read_object(ser, child_class, child) {
                    Ok(object) => pending.push(Variant::object(object)),
                    Err(e) => log::warn!("container entry skipped: {}", e),
                }
            }
            None => pending.push(Variant::from(child.text().unwrap_or(""))),
        }
    }

    let mut object = class.create(&[])?;
    let container = object
        .as_container_mut()
        .ok_or_else(|| SerializeError::UnknownClass(class.name().to_string()))?;
    for entry in pending {
        container.insert(entry);
    }
    Ok(object)
}
