// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Shared XML emission helpers.
//!
//! Both persistence dialects (objectbase and serialize) write XML through
//! [`XmlWriter`], a small indenting element writer. Reading goes through
//! `roxmltree`, which decodes the standard entities itself; only the write
//! side needs explicit escaping.

use std::borrow::Cow;
use std::io::{self, Write};

/// Escape the five standard XML entities in attribute values and text.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '\'', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Indenting XML element writer.
///
/// Tracks nesting depth and emits two-space indentation per level. The
/// caller is responsible for balanced `open`/`close` pairs.
pub struct XmlWriter<W: Write> {
    w: W,
    depth: usize,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(w: W) -> Self {
        Self { w, depth: 0 }
    }

    /// Emit the XML declaration.
    pub fn declaration(&mut self) -> io::Result<()> {
        writeln!(self.w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)
    }

    fn indent(&mut self) -> io::Result<()> {
        for _ in 0..self.depth {
            self.w.write_all(b"  ")?;
        }
        Ok(())
    }

    fn write_attrs(&mut self, attrs: &[(&str, &str)]) -> io::Result<()> {
        for (name, value) in attrs {
            write!(self.w, " {}=\"{}\"", name, escape(value))?;
        }
        Ok(())
    }

    /// Open an element with child content to follow.
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.indent()?;
        write!(self.w, "<{}", tag)?;
        self.write_attrs(attrs)?;
        writeln!(self.w, ">")?;
        self.depth += 1;
        Ok(())
    }

    /// Emit a self-closing element.
    pub fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.indent()?;
        write!(self.w, "<{}", tag)?;
        self.write_attrs(attrs)?;
        writeln!(self.w, "/>")
    }

    /// Emit an element whose only content is character data.
    pub fn text_element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> io::Result<()> {
        self.indent()?;
        write!(self.w, "<{}", tag)?;
        self.write_attrs(attrs)?;
        writeln!(self.w, ">{}</{}>", escape(text), tag)
    }

    /// Close an element previously opened with [`XmlWriter::open`].
    pub fn close(&mut self, tag: &str) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        writeln!(self.w, "</{}>", tag)
    }
}
