// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Container types.
//!
//! A container type pairs one element type with a container flavor and
//! implements the shared iteration contract (len/get/iter/insert/erase/
//! clear) against [`Value::Seq`] storage. The same implementation serves
//! every element type.

use std::sync::Arc;

use crate::meta::{MetaError, TypeDesc, Value};

/// The concrete container behind a container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFlavor {
    /// Insertion-ordered sequence.
    List,
    /// Growable array; indexable, insertion-ordered.
    Vector,
    /// Kept sorted by the element comparator; duplicates are ignored.
    OrderedSet,
}

/// A homogeneous container of one element type.
#[derive(Debug)]
pub struct ContainerType {
    flavor: ContainerFlavor,
    elem: Arc<TypeDesc>,
}

impl ContainerType {
    pub(crate) fn new(flavor: ContainerFlavor, elem: Arc<TypeDesc>) -> Self {
        Self { flavor, elem }
    }

    pub fn flavor(&self) -> ContainerFlavor {
        self.flavor
    }

    pub fn element_type(&self) -> &Arc<TypeDesc> {
        &self.elem
    }

    fn seq<'a>(&self, storage: &'a Value) -> Result<&'a [Value], MetaError> {
        storage.as_seq().ok_or(MetaError::NotContainer)
    }

    fn seq_mut<'a>(&self, storage: &'a mut Value) -> Result<&'a mut Vec<Value>, MetaError> {
        storage.as_seq_mut().ok_or(MetaError::NotContainer)
    }

    pub fn len(&self, storage: &Value) -> Result<usize, MetaError> {
        Ok(self.seq(storage)?.len())
    }

    pub fn is_empty(&self, storage: &Value) -> Result<bool, MetaError> {
        Ok(self.seq(storage)?.is_empty())
    }

    pub fn get<'a>(&self, storage: &'a Value, index: usize) -> Result<&'a Value, MetaError> {
        let items = self.seq(storage)?;
        items.get(index).ok_or(MetaError::IndexOutOfBounds {
            index,
            len: items.len(),
        })
    }

    pub fn iter<'a>(
        &self,
        storage: &'a Value,
    ) -> Result<impl Iterator<Item = &'a Value>, MetaError> {
        Ok(self.seq(storage)?.iter())
    }

    /// Insert an element.
    ///
    /// A fresh element is constructed in place and the item value-copied
    /// into it, so element types need not be trivially copyable. Returns
    /// `false` when an ordered set already contains an equal element.
    pub fn insert(&self, storage: &mut Value, item: Value) -> Result<bool, MetaError> {
        if !self.elem.value_matches(&item) {
            return Err(MetaError::TypeMismatch {
                expected: self.elem.name().to_string(),
            });
        }
        let items = self.seq_mut(storage)?;
        match self.flavor {
            ContainerFlavor::List | ContainerFlavor::Vector => {
                items.push(item);
                Ok(true)
            }
            ContainerFlavor::OrderedSet => {
                match items.binary_search_by(|e| self.elem.compare_values(e, &item)) {
                    Ok(_) => Ok(false),
                    Err(pos) => {
                        items.insert(pos, item);
                        Ok(true)
                    }
                }
            }
        }
    }

    /// Remove and return the element at `index`.
    pub fn erase(&self, storage: &mut Value, index: usize) -> Result<Value, MetaError> {
        let items = self.seq_mut(storage)?;
        if index >= items.len() {
            return Err(MetaError::IndexOutOfBounds {
                index,
                len: items.len(),
            });
        }
        Ok(items.remove(index))
    }

    pub fn clear(&self, storage: &mut Value) -> Result<(), MetaError> {
        self.seq_mut(storage)?.clear();
        Ok(())
    }
}
