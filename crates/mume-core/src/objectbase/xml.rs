// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Objectbase XML load/save.
//!
//! Dialect: `<root>` containing `<namespace name=..>`, `<object type=..
//! name=.. [value=..]>`, `<link name=.. target=..>` and `<include file=..>`.
//! Scalar objects carry their value as an attribute; compound and container
//! objects nest property elements and `<l>` entries. `<include>` re-parses
//! another stream into the current namespace context, so included files
//! extend the surrounding namespace.
//!
//! Structural problems (unknown type, unknown property, duplicate name,
//! unreadable include) are logged and skipped; the rest of the document
//! still loads. Registered types are not persisted: a loader registers the
//! same types before reading.

use std::io::{self, Read, Write};

use roxmltree::{Document, Node};

use crate::meta::{PropertyKind, TypeDesc, TypeKind, Value};
use crate::objectbase::{BaseError, NsId, ObjDesc, ObjectBase, StreamResolver};
use crate::variant::{Variant, VariantTag};
use crate::xml::XmlWriter;

/// Upper bound on nested `<include>` processing.
const MAX_INCLUDE_DEPTH: usize = 16;

pub(crate) fn save(base: &ObjectBase, w: &mut dyn Write) -> io::Result<()> {
    let mut xw = XmlWriter::new(w);
    xw.declaration()?;
    xw.open("root", &[])?;
    write_namespace_body(base, &mut xw, 0)?;
    xw.close("root")
}

fn write_namespace_body(
    base: &ObjectBase,
    xw: &mut XmlWriter<&mut dyn Write>,
    ns: usize,
) -> io::Result<()> {
    let node = &base.nodes[ns];
    for desc in node.objects.values() {
        write_object(xw, desc)?;
    }
    for (name, target) in &node.links {
        xw.empty("link", &[("name", name), ("target", target)])?;
    }
    for &child in &node.children {
        let child_name = base.nodes[child].name.clone();
        xw.open("namespace", &[("name", &child_name)])?;
        write_namespace_body(base, xw, child)?;
        xw.close("namespace")?;
    }
    Ok(())
}

fn write_object(xw: &mut XmlWriter<&mut dyn Write>, desc: &ObjDesc) -> io::Result<()> {
    let ty = desc.ty().clone();
    if ty.is_simple() {
        let text = desc
            .scalar()
            .ok()
            .and_then(|v| ty.get_as_string(&v).ok());
        match text {
            Some(text) => xw.empty(
                "object",
                &[
                    ("type", desc.type_name()),
                    ("name", desc.name()),
                    ("value", &text),
                ],
            ),
            None => {
                log::warn!("object {:?} has no string form; skipped on save", desc.name());
                Ok(())
            }
        }
    } else {
        xw.open(
            "object",
            &[("type", desc.type_name()), ("name", desc.name())],
        )?;
        write_value_children(xw, &ty, desc.value())?;
        xw.close("object")
    }
}

fn write_value_children(
    xw: &mut XmlWriter<&mut dyn Write>,
    ty: &TypeDesc,
    value: &Value,
) -> io::Result<()> {
    match ty.kind() {
        TypeKind::Compound(compound) => {
            for prop in compound.properties() {
                match prop.kind() {
                    PropertyKind::Direct { slot, ty: prop_ty } => {
                        let Some(slot_value) = value.as_record().and_then(|r| r.get(*slot))
                        else {
                            continue;
                        };
                        if prop_ty.is_simple() {
                            let text = slot_value
                                .to_variant()
                                .and_then(|v| prop_ty.get_as_string(&v).ok());
                            match text {
                                Some(text) => xw.empty(prop.name(), &[("value", &text)])?,
                                None => log::warn!(
                                    "property {:?} has no string form; skipped on save",
                                    prop.name()
                                ),
                            }
                        } else if prop_ty.is_compound() || prop_ty.is_container() {
                            xw.open(prop.name(), &[])?;
                            write_value_children(xw, prop_ty, slot_value)?;
                            xw.close(prop.name())?;
                        }
                        // Pointer-typed slots are runtime-only state.
                    }
                    PropertyKind::Simple { .. } => {
                        if !(prop.readable() && prop.writable()) {
                            continue;
                        }
                        if let Some(mut v) = prop.get(value) {
                            if v.convert(VariantTag::Str).is_ok() {
                                let text = v.as_str().expect("converted to string");
                                xw.empty(prop.name(), &[("value", text)])?;
                            }
                        }
                    }
                }
            }
        }
        TypeKind::Container(container) => {
            let elem_ty = container.element_type();
            if let Some(items) = value.as_seq() {
                for item in items {
                    if elem_ty.is_simple() {
                        let text = item
                            .to_variant()
                            .and_then(|v| elem_ty.get_as_string(&v).ok());
                        match text {
                            Some(text) => xw.empty("l", &[("value", &text)])?,
                            None => log::warn!("container entry has no string form; skipped"),
                        }
                    } else {
                        xw.open("l", &[])?;
                        write_value_children(xw, elem_ty, item)?;
                        xw.close("l")?;
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn load_into(
    base: &mut ObjectBase,
    ns: NsId,
    xml_text: &str,
    resolver: &dyn StreamResolver,
    depth: usize,
) -> Result<(), BaseError> {
    let doc = Document::parse(xml_text).map_err(|e| BaseError::Malformed(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "root" {
        return Err(BaseError::Malformed(format!(
            "expected <root>, found <{}>",
            root.tag_name().name()
        )));
    }
    load_children(base, ns, root, resolver, depth);
    Ok(())
}

fn load_children(
    base: &mut ObjectBase,
    ns: NsId,
    elem: Node<'_, '_>,
    resolver: &dyn StreamResolver,
    depth: usize,
) {
    for child in elem.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "namespace" => {
                let Some(name) = child.attribute("name") else {
                    log::warn!("<namespace> without name attribute skipped");
                    continue;
                };
                match base.create_namespace(ns, name) {
                    Ok(sub) => load_children(base, sub, child, resolver, depth),
                    Err(e) => log::warn!("namespace {:?} skipped: {}", name, e),
                }
            }
            "object" => load_object(base, ns, child),
            "link" => {
                let (Some(name), Some(target)) =
                    (child.attribute("name"), child.attribute("target"))
                else {
                    log::warn!("<link> without name/target attributes skipped");
                    continue;
                };
                if let Err(e) = base.add_link(ns, name, target) {
                    log::warn!("link {:?} skipped: {}", name, e);
                }
            }
            "include" => {
                let Some(file) = child.attribute("file") else {
                    log::warn!("<include> without file attribute skipped");
                    continue;
                };
                if depth >= MAX_INCLUDE_DEPTH {
                    log::warn!("include depth limit reached; {:?} skipped", file);
                    continue;
                }
                load_include(base, ns, file, resolver, depth);
            }
            other => log::warn!("unknown element <{}> skipped", other),
        }
    }
}

fn load_include(
    base: &mut ObjectBase,
    ns: NsId,
    file: &str,
    resolver: &dyn StreamResolver,
    depth: usize,
) {
    let mut text = String::new();
    match resolver.open(file) {
        Ok(mut stream) => {
            if let Err(e) = stream.read_to_string(&mut text) {
                log::warn!("include {:?} unreadable: {}", file, e);
                return;
            }
        }
        Err(e) => {
            log::warn!("include {:?} not resolved: {}", file, e);
            return;
        }
    }
    // Included documents re-enter the same namespace context: they extend
    // the surrounding namespace rather than replacing it.
    if let Err(e) = load_into(base, ns, &text, resolver, depth + 1) {
        log::warn!("include {:?} skipped: {}", file, e);
    }
}

fn load_object(base: &mut ObjectBase, ns: NsId, elem: Node<'_, '_>) {
    let (Some(type_name), Some(name)) = (elem.attribute("type"), elem.attribute("name")) else {
        log::warn!("<object> without type/name attributes skipped");
        return;
    };
    let Some(ty) = base.lookup_type(ns, type_name) else {
        log::warn!("object {:?} skipped: unknown type {:?}", name, type_name);
        return;
    };
    if let Err(e) = base.add_object(ns, name, type_name) {
        log::warn!("object {:?} skipped: {}", name, e);
        return;
    }

    if let Some(text) = elem.attribute("value") {
        match ty.set_from_string(text) {
            Ok(v) => {
                let desc = base.object_mut(ns, name).expect("object just added");
                if let Err(e) = desc.set_scalar(&v) {
                    log::warn!("object {:?} value rejected: {}", name, e);
                }
            }
            Err(e) => log::warn!("object {:?} value {:?} rejected: {}", name, text, e),
        }
    } else {
        let desc = base.object_mut(ns, name).expect("object just added");
        let ty = desc.ty().clone();
        fill_value(&ty, elem, desc.value_mut());
    }
}

fn fill_value(ty: &TypeDesc, elem: Node<'_, '_>, value: &mut Value) {
    match ty.kind() {
        TypeKind::Compound(compound) => {
            for child in elem.children().filter(Node::is_element) {
                let tag = child.tag_name().name();
                let Some(prop) = compound.find(tag) else {
                    log::warn!("unknown property element <{}> skipped", tag);
                    continue;
                };
                match prop.kind() {
                    PropertyKind::Direct { slot, ty: prop_ty } => {
                        let Some(slot_value) =
                            value.as_record_mut().and_then(|r| r.get_mut(*slot))
                        else {
                            continue;
                        };
                        if prop_ty.is_simple() {
                            let Some(text) = child.attribute("value") else {
                                log::warn!("property <{}> without value attribute skipped", tag);
                                continue;
                            };
                            match prop_ty.set_from_string(text) {
                                Ok(v) => {
                                    if let Some(stored) = Value::from_variant(&v) {
                                        *slot_value = stored;
                                    }
                                }
                                Err(e) => {
                                    log::warn!("property <{}> value {:?} rejected: {}", tag, text, e);
                                }
                            }
                        } else {
                            fill_value(prop_ty, child, slot_value);
                        }
                    }
                    PropertyKind::Simple { .. } => {
                        let Some(text) = child.attribute("value") else {
                            log::warn!("property <{}> without value attribute skipped", tag);
                            continue;
                        };
                        let mut v = Variant::from(text);
                        if let Some(want) = prop.tag() {
                            if v.convert(want).is_err() {
                                log::warn!("property <{}> value {:?} rejected", tag, text);
                                continue;
                            }
                        }
                        if !prop.set(&mut *value, &v) {
                            log::warn!("property <{}> refused its value", tag);
                        }
                    }
                }
            }
        }
        TypeKind::Container(container) => {
            let elem_ty = container.element_type().clone();
            for child in elem.children().filter(Node::is_element) {
                if child.tag_name().name() != "l" {
                    log::warn!(
                        "unexpected element <{}> in container skipped",
                        child.tag_name().name()
                    );
                    continue;
                }
                let mut item = elem_ty.default_value();
                if elem_ty.is_simple() {
                    let Some(text) = child.attribute("value") else {
                        log::warn!("container entry without value attribute skipped");
                        continue;
                    };
                    match elem_ty.set_from_string(text) {
                        Ok(v) => match Value::from_variant(&v) {
                            Some(stored) => item = stored,
                            None => continue,
                        },
                        Err(e) => {
                            log::warn!("container entry {:?} rejected: {}", text, e);
                            continue;
                        }
                    }
                } else {
                    fill_value(&elem_ty, child, &mut item);
                }
                if let Err(e) = container.insert(value, item) {
                    log::warn!("container entry rejected: {}", e);
                }
            }
        }
        _ => {}
    }
}
