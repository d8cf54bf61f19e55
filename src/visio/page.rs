//! A single drawing page: its entry in `pages.xml` and its own page part.

use crate::common::xml::{XML_DECLARATION, push_attr};
use crate::opc::allocator::PageAllocation;
use crate::opc::constants::namespace;
use crate::opc::packuri::PackURI;
use crate::visio::connect::Connect;
use crate::visio::error::{Result, VisioError};
use crate::visio::raw::{Attributes, RawXml, attr, push_attrs, split_element};
use crate::visio::shape::Shape;

/// `(cell name, value, unit)` of the page sheet written for new pages: A4
/// portrait in millimetres.
const DEFAULT_PAGE_SHEET_CELLS: [(&str, &str, Option<&str>); 17] = [
    ("PageWidth", "8.26771653543307", None),
    ("PageHeight", "11.69291338582677", None),
    ("ShdwOffsetX", "0.1181102362204724", None),
    ("ShdwOffsetY", "-0.1181102362204724", None),
    ("PageScale", "0.03937007874015748", Some("MM")),
    ("DrawingScale", "0.03937007874015748", Some("MM")),
    ("DrawingSizeType", "0", None),
    ("DrawingScaleType", "0", None),
    ("InhibitSnap", "0", None),
    ("PageLockReplace", "0", Some("BOOL")),
    ("PageLockDuplicate", "0", Some("BOOL")),
    ("UIVisibility", "0", None),
    ("ShdwType", "0", None),
    ("ShdwObliqueAngle", "0", None),
    ("ShdwScaleFactor", "1", None),
    ("DrawingResizeType", "1", None),
    ("PageShapeSplit", "1", None),
];

fn default_page_sheet() -> RawXml {
    let mut xml = String::with_capacity(1024);
    xml.push_str(r#"<PageSheet LineStyle="0" FillStyle="0" TextStyle="0">"#);
    for (name, value, unit) in DEFAULT_PAGE_SHEET_CELLS {
        xml.push_str("<Cell");
        push_attr(&mut xml, "N", name);
        push_attr(&mut xml, "V", value);
        if let Some(unit) = unit {
            push_attr(&mut xml, "U", unit);
        }
        xml.push_str("/>");
    }
    xml.push_str("</PageSheet>");
    RawXml::new(xml)
}

fn default_entry_attributes(name: &str) -> Attributes {
    [
        ("NameU", name),
        ("IsCustomNameU", "1"),
        ("IsCustomName", "1"),
        ("ViewScale", "0.82"),
        ("ViewCenterX", "4.1275082550165"),
        ("ViewCenterY", "8.5852171704343"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Root attributes shared by `pages.xml` and page parts.
pub(crate) fn default_root_attributes() -> Attributes {
    [
        ("xmlns", namespace::VSD_MAIN),
        ("xmlns:r", namespace::OFC_RELATIONSHIPS),
        ("xml:space", "preserve"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// One `<Page>` element of `pages.xml`, before its part is resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageEntry {
    pub id: String,
    pub name: String,
    pub r_id: String,
    pub attributes: Attributes,
    pub children: Vec<RawXml>,
}

impl PageEntry {
    /// Parse one `<Page>` element of `pages.xml`.
    pub fn from_xml(xml: &str, part: &str) -> Result<Self> {
        let (attrs, children) = split_element(xml, "Page", part)?;

        let mut id = None;
        let mut name = String::new();
        let mut attributes = Vec::new();
        for (key, value) in attrs {
            match key.as_str() {
                "ID" => id = Some(value),
                "Name" => name = value,
                _ => attributes.push((key, value)),
            }
        }
        let id = id.ok_or_else(|| VisioError::xml(part, "<Page> without ID attribute"))?;

        let mut r_id = None;
        let mut kept = Vec::new();
        for child in children {
            if child.name == "Rel" {
                let (rel_attrs, _) = split_element(child.raw, "Rel", part)?;
                let value = rel_attrs
                    .iter()
                    .find(|(key, _)| key == "id" || key.ends_with(":id"))
                    .map(|(_, value)| value.clone());
                r_id = value;
            } else {
                kept.push(RawXml::new(child.raw));
            }
        }
        let r_id = r_id.ok_or_else(|| {
            VisioError::xml(part, format!("<Page ID=\"{}\"> has no <Rel r:id>", id))
        })?;

        Ok(Self {
            id,
            name,
            r_id,
            attributes,
            children: kept,
        })
    }
}

/// A page: the `pages.xml` entry plus the parsed page part.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Display name; may be empty
    pub name: String,
    id: String,
    r_id: String,
    partname: PackURI,
    /// Attributes of the `pages.xml` entry other than `ID` and `Name`
    pub entry_attributes: Attributes,
    /// Children of the `pages.xml` entry other than `Rel`, verbatim
    entry_children: Vec<RawXml>,
    /// Attributes of the `PageContents` root, namespace declarations included
    pub root_attributes: Attributes,
    pub shapes: Vec<Shape>,
    connects: Vec<Connect>,
    connects_raw: Option<RawXml>,
    /// Other `PageContents` children, verbatim
    preserved: Vec<RawXml>,
}

impl Page {
    /// A new, empty page with the default page sheet.
    pub fn new(name: impl Into<String>, allocation: PageAllocation, partname: PackURI) -> Self {
        let name = name.into();
        Self {
            entry_attributes: default_entry_attributes(&name),
            name,
            id: allocation.id,
            r_id: allocation.r_id,
            partname,
            entry_children: vec![default_page_sheet()],
            root_attributes: default_root_attributes(),
            shapes: Vec::new(),
            connects: Vec::new(),
            connects_raw: None,
            preserved: Vec::new(),
        }
    }

    /// Build a page from its `pages.xml` entry and the bytes of its part.
    pub(crate) fn from_entry(entry: PageEntry, partname: PackURI, contents: &[u8]) -> Result<Self> {
        let part = partname.as_str();
        let xml = std::str::from_utf8(contents).map_err(|err| VisioError::xml(part, err))?;
        let (root_attributes, children) = split_element(xml, "PageContents", part)?;

        let mut shapes = Vec::new();
        let mut connects = Vec::new();
        let mut connects_raw = None;
        let mut preserved = Vec::new();

        for child in children {
            match child.name {
                "Shapes" => {
                    let (_, items) = split_element(child.raw, "Shapes", part)?;
                    for item in items {
                        if item.name != "Shape" {
                            return Err(VisioError::xml(
                                part,
                                format!("unexpected <{}> inside <Shapes>", item.name),
                            ));
                        }
                        shapes.push(Shape::from_xml(item.raw, part)?);
                    }
                },
                "Connects" => {
                    let (_, items) = split_element(child.raw, "Connects", part)?;
                    for item in items {
                        connects.push(Connect::from_xml(item.raw, part)?);
                    }
                    connects_raw = Some(RawXml::new(child.raw));
                },
                _ => preserved.push(RawXml::new(child.raw)),
            }
        }

        log::trace!(
            "parsed {}: {} shapes, {} connects",
            part,
            shapes.len(),
            connects.len()
        );

        Ok(Self {
            name: entry.name,
            id: entry.id,
            r_id: entry.r_id,
            partname,
            entry_attributes: entry.attributes,
            entry_children: entry.children,
            root_attributes,
            shapes,
            connects,
            connects_raw,
            preserved,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Filename of the page part, e.g. `page3.xml`.
    #[inline]
    pub fn filename(&self) -> &str {
        self.partname.filename()
    }

    #[inline]
    pub fn connects(&self) -> &[Connect] {
        &self.connects
    }

    /// Add a connect record.
    ///
    /// The page's original `Connects` block is no longer authoritative after
    /// this, so saving the page fails until connect serialization exists.
    pub fn add_connect(&mut self, connect: Connect) {
        self.connects_raw = None;
        self.connects.push(connect);
    }

    pub fn preserved(&self) -> &[RawXml] {
        &self.preserved
    }

    pub fn entry_children(&self) -> &[RawXml] {
        &self.entry_children
    }

    /// Top-level shape by id.
    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|shape| shape.id == id)
    }

    pub fn shape_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|shape| shape.id == id)
    }

    /// Every shape id on the page, including ids nested in preserved groups.
    pub fn shape_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.shapes.len());
        for shape in &self.shapes {
            ids.push(shape.id.clone());
            ids.extend(shape.nested_ids());
        }
        ids
    }

    /// Append this page's `<Page>` entry for `pages.xml`.
    pub(crate) fn push_entry_xml(&self, xml: &mut String) {
        xml.push_str("<Page");
        push_attr(xml, "ID", &self.id);
        if !self.name.is_empty() {
            push_attr(xml, "Name", &self.name);
        }
        push_attrs(xml, &self.entry_attributes);
        xml.push('>');
        for child in &self.entry_children {
            xml.push_str(child.as_str());
        }
        xml.push_str("<Rel");
        push_attr(xml, "r:id", &self.r_id);
        xml.push_str("/></Page>");
    }

    /// Serialize the page part (`PageContents`).
    ///
    /// Fails with [`VisioError::Unsupported`] when connects were added to the
    /// page, since they cannot be written yet.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(1024 + 1024 * self.shapes.len());
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<PageContents");
        push_attrs(&mut xml, &self.root_attributes);
        xml.push('>');

        if !self.shapes.is_empty() {
            xml.push_str("<Shapes>");
            for shape in &self.shapes {
                shape.push_xml(&mut xml);
            }
            xml.push_str("</Shapes>");
        }

        match &self.connects_raw {
            Some(raw) => xml.push_str(raw.as_str()),
            None if !self.connects.is_empty() => {
                xml.push_str("<Connects>");
                for connect in &self.connects {
                    xml.push_str(&connect.to_xml()?);
                }
                xml.push_str("</Connects>");
            },
            None => {},
        }

        for raw in &self.preserved {
            xml.push_str(raw.as_str());
        }

        xml.push_str("</PageContents>");
        Ok(xml)
    }

    /// Value of an entry attribute such as `NameU` or `Background`.
    pub fn entry_attribute(&self, name: &str) -> Option<&str> {
        attr(&self.entry_attributes, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visio::shape::ShapeAttributes;

    fn allocation(n: u32) -> PageAllocation {
        PageAllocation {
            id: n.to_string(),
            r_id: format!("rId{}", n),
            filename: format!("page{}.xml", n),
        }
    }

    fn partname(n: u32) -> PackURI {
        PackURI::new(format!("/visio/pages/page{}.xml", n)).unwrap()
    }

    const PAGE_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<PageContents xmlns="http://schemas.microsoft.com/office/visio/2012/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:x="urn:extra" xml:space="preserve">
  <Shapes>
    <Shape ID="1" Type="Shape" LineStyle="3" FillStyle="3" TextStyle="3"><Cell N="PinX" V="1"/></Shape>
    <Shape ID="2" Type="Group"><Shapes><Shape ID="7" Type="Shape"/></Shapes></Shape>
  </Shapes>
  <Connects>
    <Connect FromSheet="2" FromCell="BeginX" FromPart="9" ToSheet="1" ToCell="PinX" ToPart="3"/>
  </Connects>
  <x:Extension>keep me</x:Extension>
</PageContents>"#;

    fn entry() -> PageEntry {
        PageEntry {
            id: "0".into(),
            name: "Page-1".into(),
            r_id: "rId1".into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_new_page_defaults() {
        let page = Page::new("Network", allocation(3), partname(3));
        assert_eq!(page.id(), "3");
        assert_eq!(page.r_id(), "rId3");
        assert_eq!(page.filename(), "page3.xml");
        assert_eq!(page.entry_attribute("NameU"), Some("Network"));

        let mut entry = String::new();
        page.push_entry_xml(&mut entry);
        assert!(entry.starts_with(r#"<Page ID="3" Name="Network" NameU="Network" IsCustomNameU="1""#));
        assert!(entry.contains(r#"<PageSheet LineStyle="0" FillStyle="0" TextStyle="0"><Cell N="PageWidth" V="8.26771653543307"/>"#));
        assert!(entry.contains(r#"<Cell N="PageScale" V="0.03937007874015748" U="MM"/>"#));
        assert!(entry.ends_with(r#"<Rel r:id="rId3"/></Page>"#));

        let xml = page.to_xml().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.ends_with(r#"xml:space="preserve"></PageContents>"#));
    }

    #[test]
    fn test_parse_contents() {
        let page = Page::from_entry(entry(), partname(1), PAGE_XML.as_bytes()).unwrap();
        assert_eq!(page.shapes.len(), 2);
        assert_eq!(page.connects().len(), 1);
        assert_eq!(page.connects()[0].to_sheet.as_deref(), Some("1"));
        assert_eq!(page.preserved().len(), 1);
        assert_eq!(page.shape_ids(), ["1", "2", "7"]);
        assert_eq!(page.shape("2").unwrap().shape_type, "Group");
    }

    #[test]
    fn test_contents_round_trip_without_mutation() {
        let page = Page::from_entry(entry(), partname(1), PAGE_XML.as_bytes()).unwrap();
        let xml = page.to_xml().unwrap();

        assert!(xml.contains(r#"xmlns:x="urn:extra""#));
        assert!(xml.contains("<x:Extension>keep me</x:Extension>"));
        assert!(xml.contains(r#"<Connect FromSheet="2" FromCell="BeginX""#));

        let reparsed = Page::from_entry(entry(), partname(1), xml.as_bytes()).unwrap();
        assert_eq!(reparsed, page);
    }

    #[test]
    fn test_added_connect_cannot_be_saved() {
        let mut page = Page::new("A", allocation(1), partname(1));
        page.shapes.push(Shape::from_attributes("1", ShapeAttributes::new()));
        assert!(page.to_xml().is_ok());

        page.add_connect(Connect::default());
        assert!(matches!(page.to_xml(), Err(VisioError::Unsupported(_))));
    }

    #[test]
    fn test_entry_parse() {
        let xml = r#"<Page ID="4" NameU="Detail" Name="Detail" ViewScale="1"><PageSheet><Cell N="PageWidth" V="11"/></PageSheet><Rel r:id="rId7"/></Page>"#;
        let entry = PageEntry::from_xml(xml, "/visio/pages/pages.xml").unwrap();
        assert_eq!(entry.id, "4");
        assert_eq!(entry.name, "Detail");
        assert_eq!(entry.r_id, "rId7");
        assert_eq!(entry.attributes.len(), 2);
        assert_eq!(
            entry.children,
            [RawXml::new(r#"<PageSheet><Cell N="PageWidth" V="11"/></PageSheet>"#)]
        );
    }

    #[test]
    fn test_entry_without_rel_fails() {
        let xml = r#"<Page ID="4" Name="Detail"/>"#;
        assert!(PageEntry::from_xml(xml, "/visio/pages/pages.xml").is_err());
    }

    #[test]
    fn test_non_utf8_page_is_xml_error() {
        let err = Page::from_entry(entry(), partname(1), &[0x3c, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(
            err,
            VisioError::Opc(crate::opc::error::OpcError::Xml { .. })
        ));
    }
}
