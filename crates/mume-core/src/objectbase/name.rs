// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 the Mume Project

//! Name resolution.
//!
//! Names are `:`-separated segment paths; a leading `:` anchors resolution
//! at the tree root. Relative lookups that fail in the starting namespace
//! retry one level up the parent chain, so objects in enclosing scopes are
//! found from descendants. After the segments resolve, a link for the
//! remaining leaf substitutes its target string and resolution restarts.
//! Substitutions are bounded: a link cycle fails the lookup instead of
//! looping forever.

use crate::objectbase::{NsId, ObjectBase};

/// Upper bound on link substitutions per lookup.
pub(crate) const MAX_LINK_HOPS: usize = 16;

/// What the resolved leaf must denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Want {
    Object,
    Type,
}

/// Local names start with a letter or underscore and continue with
/// alphanumerics or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a name into (absolute, segments). Empty segments make the name
/// invalid.
pub(crate) fn split_name(name: &str) -> Option<(bool, Vec<&str>)> {
    let absolute = name.starts_with(':');
    let rest = if absolute { &name[1..] } else { name };
    if rest.is_empty() {
        return None;
    }
    let segs: Vec<&str> = rest.split(':').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some((absolute, segs))
}

impl ObjectBase {
    /// The namespace itself followed by its ancestors up to the root.
    fn scope_chain(&self, mut ns: usize) -> Vec<usize> {
        let mut chain = vec![ns];
        while let Some(parent) = self.nodes[ns].parent {
            chain.push(parent);
            ns = parent;
        }
        chain
    }

    /// Resolve `name` from `start` to the namespace and leaf holding the
    /// wanted entry, chasing links and searching enclosing scopes.
    pub(crate) fn resolve_existing(
        &self,
        start: NsId,
        name: &str,
        want: Want,
    ) -> Option<(usize, String)> {
        let mut anchor = start.0;
        let mut current = name.to_string();

        for _hop in 0..=MAX_LINK_HOPS {
            let (absolute, segs) = split_name(&current)?;
            let scopes = if absolute {
                vec![0]
            } else {
                self.scope_chain(anchor)
            };

            let mut substitution: Option<(usize, String)> = None;
            'scopes: for &scope in &scopes {
                let mut ns = scope;
                for seg in &segs[..segs.len() - 1] {
                    match self.child_ns(ns, seg) {
                        Some(child) => ns = child,
                        None => continue 'scopes,
                    }
                }
                let leaf = segs[segs.len() - 1];

                // A link for the remaining name substitutes its target and
                // restarts resolution from the link's namespace.
                if let Some(target) = self.nodes[ns].links.get(leaf) {
                    substitution = Some((ns, target.clone()));
                    break 'scopes;
                }

                let found = match want {
                    Want::Object => self.nodes[ns].objects.contains_key(leaf),
                    Want::Type => self.nodes[ns].types.contains_key(leaf),
                };
                if found {
                    return Some((ns, leaf.to_string()));
                }
            }

            match substitution {
                Some((ns, target)) => {
                    anchor = ns;
                    current = target;
                }
                None => return None,
            }
        }

        log::warn!(
            "name resolution for {:?} exceeded {} link substitutions; giving up",
            name,
            MAX_LINK_HOPS
        );
        None
    }

    /// Resolve `name` for insertion: create missing intermediate namespaces
    /// and return the target namespace plus the leaf name. No enclosing
    /// scope retry and no link chasing happen in add mode.
    pub(crate) fn resolve_for_add(
        &mut self,
        start: NsId,
        name: &str,
    ) -> Result<(usize, String), crate::objectbase::BaseError> {
        let (absolute, segs) = split_name(name)
            .ok_or_else(|| crate::objectbase::BaseError::InvalidName(name.to_string()))?;
        let mut ns = if absolute { 0 } else { start.0 };
        for seg in &segs[..segs.len() - 1] {
            ns = match self.child_ns(ns, seg) {
                Some(child) => child,
                None => self.create_child(ns, seg)?,
            };
        }
        Ok((ns, segs[segs.len() - 1].to_string()))
    }

    /// Public face of link-aware object resolution: the namespace and local
    /// name an object lookup would land on.
    pub fn resolve_object_name(&self, start: NsId, name: &str) -> Option<(NsId, String)> {
        self.resolve_existing(start, name, Want::Object)
            .map(|(ns, leaf)| (NsId(ns), leaf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_grammar() {
        assert!(is_valid_identifier("abc"));
        assert!(is_valid_identifier("_a1"));
        assert!(is_valid_identifier("A9_b"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("9abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier("a:b"));
        assert!(!is_valid_identifier("a b"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a"), Some((false, vec!["a"])));
        assert_eq!(split_name(":a:b"), Some((true, vec!["a", "b"])));
        assert_eq!(split_name("a:b:c"), Some((false, vec!["a", "b", "c"])));
        assert_eq!(split_name(""), None);
        assert_eq!(split_name(":"), None);
        assert_eq!(split_name("a::b"), None);
    }
}
