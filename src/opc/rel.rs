//! Relationship-related objects for OPC packages.
//!
//! A `.rels` part holds one relationship scope: the set of typed links from a
//! single source (the package, the document part, the pages part, a page) to
//! their targets.

use crate::common::xml::{XML_DECLARATION_STANDALONE, push_attr};
use crate::opc::allocator::NumberingPolicy;
use crate::opc::constants::{namespace, target_mode};
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;

/// A single relationship from a source to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a relative part reference or external URL
    target_ref: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    pub fn new(r_id: String, reltype: String, target_ref: String, is_external: bool) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            is_external,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference as written in the `.rels` part.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

/// One relationship scope, in insertion order.
///
/// Parse order is preserved so that id allocation and serialized output are
/// deterministic for a given input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    /// Base URI against which internal targets resolve
    base_uri: String,

    rels: Vec<Relationship>,
}

impl Relationships {
    /// Create an empty scope whose targets resolve against `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: Vec::new(),
        }
    }

    /// Empty scope for the relationships of `source`.
    pub fn for_source(source: &PackURI) -> Self {
        Self::new(source.base_uri())
    }

    /// Base URI of this scope.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add an internal relationship.
    ///
    /// Fails with [`OpcError::DuplicateRelationshipId`] if `r_id` is already present;
    /// the existing entry is left untouched.
    pub fn add(
        &mut self,
        r_id: impl Into<String>,
        target_ref: impl Into<String>,
        reltype: impl Into<String>,
    ) -> Result<&Relationship> {
        self.insert(Relationship::new(
            r_id.into(),
            reltype.into(),
            target_ref.into(),
            false,
        ))
    }

    /// Add an external relationship (`TargetMode="External"`).
    pub fn add_external(
        &mut self,
        r_id: impl Into<String>,
        target_url: impl Into<String>,
        reltype: impl Into<String>,
    ) -> Result<&Relationship> {
        self.insert(Relationship::new(
            r_id.into(),
            reltype.into(),
            target_url.into(),
            true,
        ))
    }

    fn insert(&mut self, rel: Relationship) -> Result<&Relationship> {
        if self.contains(rel.r_id()) {
            return Err(OpcError::DuplicateRelationshipId {
                scope: self.base_uri.clone(),
                r_id: rel.r_id,
            });
        }
        self.rels.push(rel);
        Ok(&self.rels[self.rels.len() - 1])
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Result<Relationship> {
        let pos = self
            .rels
            .iter()
            .position(|rel| rel.r_id() == r_id)
            .ok_or_else(|| self.not_found(r_id))?;
        Ok(self.rels.remove(pos))
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id() == r_id)
    }

    /// Get a relationship by its ID, failing if absent.
    pub fn resolve(&self, r_id: &str) -> Result<&Relationship> {
        self.get(r_id).ok_or_else(|| self.not_found(r_id))
    }

    #[inline]
    pub fn contains(&self, r_id: &str) -> bool {
        self.get(r_id).is_some()
    }

    /// Absolute partname an internal relationship points at.
    pub fn target_partname(&self, rel: &Relationship) -> Result<PackURI> {
        if rel.is_external() {
            return Err(OpcError::InvalidPackUri(format!(
                "relationship '{}' is external: {}",
                rel.r_id(),
                rel.target_ref()
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, rel.target_ref())
    }

    /// Get the single relationship of a given type.
    ///
    /// Returns an error if no relationship of the type is found, or if several are.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|rel| rel.reltype() == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "no relationship of type '{}' in '{}'",
                reltype, self.base_uri
            ))),
            (Some(_), Some(_)) => Err(OpcError::MalformedContainer(format!(
                "multiple relationships of type '{}' in '{}'",
                reltype, self.base_uri
            ))),
        }
    }

    /// Next free relationship ID under the `rId<N>` convention.
    pub fn next_r_id(&self) -> Result<String> {
        NumberingPolicy::rel_id().next("relationship id", self.rels.iter().map(|rel| rel.r_id()))
    }

    /// Get an iterator over all relationships in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    fn not_found(&self, r_id: &str) -> OpcError {
        OpcError::RelationshipNotFound(format!("'{}' in '{}'", r_id, self.base_uri))
    }

    /// Serialize relationships to `.rels` XML, in insertion order.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + 160 * self.rels.len());

        xml.push_str(XML_DECLARATION_STANDALONE);
        xml.push('\n');
        xml.push_str("<Relationships");
        push_attr(&mut xml, "xmlns", namespace::OPC_RELATIONSHIPS);
        xml.push('>');

        for rel in &self.rels {
            xml.push_str("<Relationship");
            push_attr(&mut xml, "Id", rel.r_id());
            push_attr(&mut xml, "Type", rel.reltype());
            push_attr(&mut xml, "Target", rel.target_ref());
            if rel.is_external() {
                push_attr(&mut xml, "TargetMode", target_mode::EXTERNAL);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Parse a `.rels` part.
    ///
    /// # Arguments
    /// * `rels_xml` - Content of the `.rels` part
    /// * `rels_uri` - Partname of the `.rels` part, used for error context and to
    ///   derive the base URI of the scope
    pub fn from_xml(rels_xml: &[u8], rels_uri: &PackURI) -> Result<Self> {
        let source = rels_uri.rels_source().ok_or_else(|| {
            OpcError::InvalidPackUri(format!("'{}' is not a relationships part", rels_uri))
        })?;
        let mut rels = Self::for_source(&source);
        let part = rels_uri.as_str();

        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let local = e.local_name();
                    if !saw_root {
                        if local.as_ref() != b"Relationships" {
                            return Err(OpcError::xml(part, "root element is not <Relationships>"));
                        }
                        saw_root = true;
                    } else if local.as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut external = false;

                        for attr in e.attributes() {
                            let attr = attr.map_err(|err| OpcError::xml(part, err))?;
                            let value = attr
                                .unescape_value()
                                .map_err(|err| OpcError::xml(part, err))?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(value.into_owned()),
                                b"Type" => reltype = Some(value.into_owned()),
                                b"Target" => target_ref = Some(value.into_owned()),
                                b"TargetMode" => external = value == target_mode::EXTERNAL,
                                _ => {},
                            }
                        }

                        match (r_id, reltype, target_ref) {
                            (Some(id), Some(rt), Some(tr)) => {
                                rels.insert(Relationship::new(id, rt, tr, external))?;
                            },
                            _ => {
                                return Err(OpcError::xml(
                                    part,
                                    "<Relationship> requires Id, Type and Target attributes",
                                ));
                            },
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::xml(part, e)),
                _ => {},
            }
            buf.clear();
        }

        if !saw_root {
            return Err(OpcError::xml(part, "document has no root element"));
        }

        Ok(rels)
    }
}
