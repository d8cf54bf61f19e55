//! The part table: every named payload of a package, keyed by partname.

use crate::opc::content_types::ContentTypeRegistry;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::collections::BTreeMap;

/// A resolved view of one part: name, payload and content type.
#[derive(Debug, Clone, Copy)]
pub struct Part<'a> {
    partname: &'a PackURI,
    blob: &'a [u8],
    content_type: &'a str,
}

impl<'a> Part<'a> {
    #[inline]
    pub fn partname(&self) -> &'a PackURI {
        self.partname
    }

    #[inline]
    pub fn blob(&self) -> &'a [u8] {
        self.blob
    }

    #[inline]
    pub fn content_type(&self) -> &'a str {
        self.content_type
    }
}

/// Partname to raw bytes.
///
/// This is exactly the set of members written to (or read from) the container.
/// Ordering by partname keeps archive output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartTable {
    parts: BTreeMap<PackURI, Vec<u8>>,
}

impl PartTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a part, returning the previous payload.
    pub fn insert(&mut self, partname: PackURI, blob: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.parts.insert(partname, blob.into())
    }

    #[inline]
    pub fn get(&self, partname: &str) -> Option<&[u8]> {
        self.parts.get(partname).map(Vec::as_slice)
    }

    /// Payload of a part the container cannot do without.
    pub fn require(&self, partname: &str) -> Result<&[u8]> {
        self.get(partname).ok_or_else(|| {
            OpcError::MalformedContainer(format!("required part missing: {}", partname))
        })
    }

    pub fn remove(&mut self, partname: &str) -> Result<Vec<u8>> {
        self.parts
            .remove(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    #[inline]
    pub fn contains(&self, partname: &str) -> bool {
        self.parts.contains_key(partname)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackURI, &[u8])> {
        self.parts.iter().map(|(uri, blob)| (uri, blob.as_slice()))
    }

    pub fn partnames(&self) -> impl Iterator<Item = &PackURI> {
        self.parts.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Move every part of `other` into this table, replacing same-named parts.
    pub fn extend(&mut self, other: PartTable) {
        self.parts.extend(other.parts);
    }

    /// Resolve the content type of every part except `[Content_Types].xml` itself.
    ///
    /// Fails on the first part with no override and no matching default.
    pub fn resolve<'a>(&'a self, registry: &'a ContentTypeRegistry) -> Result<Vec<Part<'a>>> {
        self.parts
            .iter()
            .filter(|(uri, _)| uri.as_str() != CONTENT_TYPES_URI)
            .map(|(partname, blob)| {
                Ok(Part {
                    partname,
                    blob,
                    content_type: registry.resolve(partname)?,
                })
            })
            .collect()
    }
}

impl FromIterator<(PackURI, Vec<u8>)> for PartTable {
    fn from_iter<T: IntoIterator<Item = (PackURI, Vec<u8>)>>(iter: T) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}
