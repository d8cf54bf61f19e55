//! The page collection: `pages.xml`, its relationship scope and the page parts.

use crate::common::xml::XML_DECLARATION;
use crate::opc::allocator::{AllocatedKeys, PartAllocator};
use crate::opc::constants::{content_type as ct, relationship_type as rt};
use crate::opc::content_types::ContentTypeRegistry;
use crate::opc::error::OpcError;
use crate::opc::packuri::PackURI;
use crate::opc::part::PartTable;
use crate::opc::rel::Relationships;
use crate::visio::error::{Result, VisioError};
use crate::visio::page::{Page, PageEntry, default_root_attributes};
use crate::visio::raw::{Attributes, RawXml, push_attrs, split_element};
use std::collections::HashSet;

/// Default location of the pages part.
pub const PAGES_URI: &str = "/visio/pages/pages.xml";

/// Everything the page collection writes back into the part table.
#[derive(Debug, Clone)]
pub struct SerializedPages {
    pub pages_xml: String,
    pub rels_xml: String,
    pub page_parts: Vec<(PackURI, String)>,
}

/// Ordered pages plus the relationship scope of the pages part.
///
/// Invariants: every page's relationship id resolves in `rels` to that page's
/// part, page ids are unique, and no two pages share a relationship.
#[derive(Debug, Clone)]
pub struct PageCollection {
    partname: PackURI,
    root_attributes: Attributes,
    pages: Vec<Page>,
    /// Children of `<Pages>` other than `Page`, written after the pages
    preserved: Vec<RawXml>,
    rels: Relationships,
    allocator: PartAllocator,
}

impl PageCollection {
    /// Empty collection at `partname`.
    pub fn new(partname: PackURI, allocator: PartAllocator) -> Self {
        Self {
            rels: Relationships::for_source(&partname),
            partname,
            root_attributes: default_root_attributes(),
            pages: Vec::new(),
            preserved: Vec::new(),
            allocator,
        }
    }

    /// Load the collection from the part table.
    ///
    /// Parses the pages part to recover `(id, name, relId)` in document order,
    /// resolves each relationship to its page part and parses that part.
    /// A missing relationship or page part aborts the load. Unresolvable
    /// content types abort only when `strict`.
    pub fn from_parts(
        parts: &PartTable,
        partname: PackURI,
        content_types: &ContentTypeRegistry,
        allocator: PartAllocator,
        strict: bool,
    ) -> Result<Self> {
        let part = partname.as_str();
        let xml = std::str::from_utf8(parts.require(part)?)
            .map_err(|err| VisioError::xml(part, err))?;

        let rels_uri = partname.rels_uri()?;
        let rels = match parts.get(rels_uri.as_str()) {
            Some(blob) => Relationships::from_xml(blob, &rels_uri)?,
            None => Relationships::for_source(&partname),
        };

        let (root_attributes, children) = split_element(xml, "Pages", part)?;

        let mut pages = Vec::with_capacity(children.len());
        let mut preserved = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut seen_rels = HashSet::new();

        for child in children {
            if child.name != "Page" {
                log::trace!("keeping <{}> in {} verbatim", child.name, part);
                preserved.push(RawXml::new(child.raw));
                continue;
            }
            let entry = PageEntry::from_xml(child.raw, part)?;

            if !seen_ids.insert(entry.id.clone()) {
                return Err(OpcError::AllocationConflict {
                    kind: "page id",
                    value: entry.id,
                }
                .into());
            }
            if !seen_rels.insert(entry.r_id.clone()) {
                return Err(OpcError::AllocationConflict {
                    kind: "relationship id",
                    value: entry.r_id,
                }
                .into());
            }

            let rel = rels.resolve(&entry.r_id)?;
            let dangling = || OpcError::DanglingRelationship {
                scope: rels.base_uri().to_string(),
                r_id: rel.r_id().to_string(),
                target: rel.target_ref().to_string(),
            };
            if rel.is_external() {
                return Err(dangling().into());
            }
            let page_uri = rels.target_partname(rel)?;
            let blob = parts.get(page_uri.as_str()).ok_or_else(dangling)?;

            match content_types.resolve(&page_uri) {
                Ok(_) => {},
                Err(err) if strict => return Err(err.into()),
                Err(err) => log::warn!("tolerating page part without content type: {}", err),
            }

            pages.push(Page::from_entry(entry, page_uri, blob)?);
        }

        for rel in rels.iter().filter(|rel| rel.reltype() == rt::VSD_PAGE) {
            if !seen_rels.contains(rel.r_id()) {
                let message = format!(
                    "page relationship '{}' -> '{}' is not listed in {}",
                    rel.r_id(),
                    rel.target_ref(),
                    part
                );
                if strict {
                    return Err(OpcError::MalformedContainer(message).into());
                }
                log::warn!("{}", message);
            }
        }

        log::debug!("loaded {} pages from {}", pages.len(), part);

        Ok(Self {
            partname,
            root_attributes,
            pages,
            preserved,
            rels,
            allocator,
        })
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Children of `<Pages>` other than `Page`, kept verbatim.
    #[inline]
    pub fn preserved(&self) -> &[RawXml] {
        &self.preserved
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    /// Index of the first page with the given display name.
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.pages.iter().position(|page| page.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Append a new empty page.
    ///
    /// Id, relationship id and filename are planned from the current state and
    /// checked against the relationship scope, the content-type overrides and
    /// `is_taken` (existing parts) before anything changes. Either the page,
    /// its relationship and its content-type override are all added, or none.
    pub fn add_page(
        &mut self,
        name: impl Into<String>,
        content_types: &mut ContentTypeRegistry,
        is_taken: impl Fn(&str) -> bool,
    ) -> Result<&mut Page> {
        let keys = self.pages.iter().map(|page| AllocatedKeys {
            id: page.id(),
            r_id: page.r_id(),
            filename: page.filename(),
        });
        let mut plan = self.allocator.plan(keys)?;
        // The scope may hold relationships other than pages.
        plan.r_id = self
            .allocator
            .next_rel_id(self.rels.iter().map(|rel| rel.r_id()))?;

        let page_uri = PackURI::from_rel_ref(self.rels.base_uri(), &plan.filename)?;
        if self.rels.contains(&plan.r_id) {
            return Err(conflict("relationship id", &plan.r_id));
        }
        if self.pages.iter().any(|page| page.id() == plan.id) {
            return Err(conflict("page id", &plan.id));
        }
        if content_types.override_for(page_uri.as_str()).is_some()
            || is_taken(page_uri.as_str())
            || self.pages.iter().any(|page| page.partname() == &page_uri)
        {
            return Err(conflict("page part", page_uri.as_str()));
        }

        let target = page_uri.relative_ref(self.rels.base_uri());
        self.rels.add(plan.r_id.clone(), target, rt::VSD_PAGE)?;
        content_types.add_override(page_uri.as_str(), ct::VSD_PAGE);

        log::debug!(
            "added page id={} r_id={} part={}",
            plan.id,
            plan.r_id,
            page_uri
        );

        let index = self.pages.len();
        self.pages.push(Page::new(name, plan, page_uri));
        Ok(&mut self.pages[index])
    }

    /// Serialize `pages.xml`. Entry order is page order.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + 1536 * self.pages.len());
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<Pages");
        push_attrs(&mut xml, &self.root_attributes);
        xml.push('>');
        for page in &self.pages {
            page.push_entry_xml(&mut xml);
        }
        for raw in &self.preserved {
            xml.push_str(raw.as_str());
        }
        xml.push_str("</Pages>");
        xml
    }

    /// Serialize the pages part, its relationships and every page part.
    pub fn serialize(&self) -> Result<SerializedPages> {
        let page_parts = self
            .pages
            .iter()
            .map(|page| Ok((page.partname().clone(), page.to_xml()?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(SerializedPages {
            pages_xml: self.to_xml(),
            rels_xml: self.rels.to_xml(),
            page_parts,
        })
    }

    /// Serialize into `parts`, replacing any previous versions.
    pub fn write_parts(&self, parts: &mut PartTable) -> Result<()> {
        let serialized = self.serialize()?;
        parts.insert(self.partname.clone(), serialized.pages_xml.into_bytes());
        parts.insert(self.partname.rels_uri()?, serialized.rels_xml.into_bytes());
        for (partname, xml) in serialized.page_parts {
            parts.insert(partname, xml.into_bytes());
        }
        Ok(())
    }

    /// Partnames this collection owns: the pages part, its `.rels` and each page part.
    pub fn owned_partnames(&self) -> Result<Vec<PackURI>> {
        let mut owned = vec![self.partname.clone(), self.partname.rels_uri()?];
        owned.extend(self.pages.iter().map(|page| page.partname().clone()));
        Ok(owned)
    }
}

fn conflict(kind: &'static str, value: &str) -> VisioError {
    OpcError::AllocationConflict {
        kind,
        value: value.to_string(),
    }
    .into()
}
