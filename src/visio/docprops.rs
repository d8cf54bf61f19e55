//! Boilerplate parts written for freshly created documents.
//!
//! Loaded documents keep their own `docProps`, `document.xml` and
//! `windows.xml` untouched; these generators only seed new packages.

use crate::common::xml::{XML_DECLARATION, escape_xml, push_attr};
use crate::opc::constants::namespace;
use chrono::{DateTime, SecondsFormat, Utc};

/// `fmtid` shared by the user-defined custom properties.
const CUSTOM_PROPERTIES_FMTID: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";

/// Build number recorded as the creating and editing application build.
const BUILD_NUMBER: &str = "1006637809";

/// Document properties for a new package.
#[derive(Debug, Clone, PartialEq)]
pub struct DocProps {
    pub application: String,
    pub app_version: String,
    pub language: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub company: Option<String>,
    pub manager: Option<String>,
    pub is_metric: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for DocProps {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            application: "Microsoft Visio".to_string(),
            app_version: "15.0000".to_string(),
            language: "en-US".to_string(),
            title: None,
            subject: None,
            creator: None,
            company: None,
            manager: None,
            is_metric: true,
            created: now,
            modified: now,
        }
    }
}

fn w3cdtf(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn push_text_element(xml: &mut String, tag: &str, text: Option<&str>) {
    match text {
        Some(text) if !text.is_empty() => {
            xml.push('<');
            xml.push_str(tag);
            xml.push('>');
            xml.push_str(&escape_xml(text));
            xml.push_str("</");
            xml.push_str(tag);
            xml.push('>');
        },
        _ => {
            xml.push('<');
            xml.push_str(tag);
            xml.push_str("/>");
        },
    }
}

impl DocProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the properties as modified now.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// `docProps/app.xml`, listing `page_names` under the `Pages` heading.
    pub fn to_app_xml<S: AsRef<str>>(&self, page_names: &[S]) -> String {
        let mut buffer = itoa::Buffer::new();
        let count = buffer.format(page_names.len());

        let mut xml = String::with_capacity(1024 + 64 * page_names.len());
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<Properties");
        push_attr(&mut xml, "xmlns", namespace::OFC_EXTENDED_PROPERTIES);
        push_attr(&mut xml, "xmlns:vt", namespace::OFC_DOC_PROPS_VTYPES);
        xml.push('>');

        xml.push_str("<Template/>");
        push_text_element(&mut xml, "Application", Some(&self.application));
        xml.push_str("<ScaleCrop>false</ScaleCrop>");

        xml.push_str(r#"<HeadingPairs><vt:vector size="2" baseType="variant">"#);
        xml.push_str("<vt:variant><vt:lpstr>Pages</vt:lpstr></vt:variant>");
        xml.push_str("<vt:variant><vt:i4>");
        xml.push_str(count);
        xml.push_str("</vt:i4></vt:variant></vt:vector></HeadingPairs>");

        xml.push_str("<TitlesOfParts><vt:vector");
        push_attr(&mut xml, "size", count);
        push_attr(&mut xml, "baseType", "lpstr");
        xml.push('>');
        for name in page_names {
            xml.push_str("<vt:lpstr>");
            xml.push_str(&escape_xml(name.as_ref()));
            xml.push_str("</vt:lpstr>");
        }
        xml.push_str("</vt:vector></TitlesOfParts>");

        push_text_element(&mut xml, "Manager", self.manager.as_deref());
        push_text_element(&mut xml, "Company", self.company.as_deref());
        xml.push_str("<LinksUpToDate>false</LinksUpToDate>");
        xml.push_str("<SharedDoc>false</SharedDoc>");
        xml.push_str("<HyperlinkBase/>");
        xml.push_str("<HyperlinksChanged>false</HyperlinksChanged>");
        push_text_element(&mut xml, "AppVersion", Some(&self.app_version));
        xml.push_str("</Properties>");
        xml
    }

    /// `docProps/core.xml`.
    pub fn to_core_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<cp:coreProperties");
        push_attr(&mut xml, "xmlns:cp", namespace::OPC_CORE_PROPERTIES);
        push_attr(&mut xml, "xmlns:dc", namespace::DC);
        push_attr(&mut xml, "xmlns:dcterms", namespace::DC_TERMS);
        push_attr(&mut xml, "xmlns:dcmitype", namespace::DCMI_TYPE);
        push_attr(&mut xml, "xmlns:xsi", namespace::XSI);
        xml.push('>');

        push_text_element(&mut xml, "dc:title", self.title.as_deref());
        push_text_element(&mut xml, "dc:subject", self.subject.as_deref());
        push_text_element(&mut xml, "dc:creator", self.creator.as_deref());
        xml.push_str("<cp:keywords/><dc:description/>");
        push_text_element(&mut xml, "cp:lastModifiedBy", self.creator.as_deref());
        for (tag, time) in [("dcterms:created", &self.created), ("dcterms:modified", &self.modified)] {
            xml.push('<');
            xml.push_str(tag);
            xml.push_str(r#" xsi:type="dcterms:W3CDTF">"#);
            xml.push_str(&w3cdtf(time));
            xml.push_str("</");
            xml.push_str(tag);
            xml.push('>');
        }
        xml.push_str("<cp:category/>");
        push_text_element(&mut xml, "dc:language", Some(&self.language));
        xml.push_str("</cp:coreProperties>");
        xml
    }

    /// `docProps/custom.xml`.
    pub fn to_custom_xml(&self) -> String {
        let modified = w3cdtf(&self.modified);
        let properties: [(&str, &str, &str); 5] = [
            ("_VPID_ALTERNATENAMES", "vt:lpwstr", ""),
            ("BuildNumberCreated", "vt:i4", BUILD_NUMBER),
            ("BuildNumberEdited", "vt:i4", BUILD_NUMBER),
            ("IsMetric", "vt:bool", if self.is_metric { "true" } else { "false" }),
            ("TimeEdited", "vt:filetime", &modified),
        ];

        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<Properties");
        push_attr(&mut xml, "xmlns", namespace::OFC_CUSTOM_PROPERTIES);
        push_attr(&mut xml, "xmlns:vt", namespace::OFC_DOC_PROPS_VTYPES);
        xml.push('>');

        let mut pid = itoa::Buffer::new();
        // User-defined property ids start at 2.
        for (index, (name, value_type, value)) in properties.into_iter().enumerate() {
            xml.push_str("<property");
            push_attr(&mut xml, "fmtid", CUSTOM_PROPERTIES_FMTID);
            push_attr(&mut xml, "pid", pid.format(index + 2));
            push_attr(&mut xml, "name", name);
            xml.push('>');
            push_text_element(&mut xml, value_type, Some(value));
            xml.push_str("</property>");
        }

        xml.push_str("</Properties>");
        xml
    }

    /// `visio/document.xml` with an empty style sheet set.
    pub fn to_document_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<VisioDocument");
        push_attr(&mut xml, "xmlns", namespace::VSD_MAIN);
        push_attr(&mut xml, "xmlns:r", namespace::OFC_RELATIONSHIPS);
        push_attr(&mut xml, "xml:space", "preserve");
        xml.push('>');
        xml.push_str(
            r#"<DocumentSettings TopPage="0" DefaultTextStyle="3" DefaultLineStyle="3" DefaultFillStyle="3" DefaultGuideStyle="0"/>"#,
        );
        xml.push_str("<Colors/><FaceNames/>");
        xml.push_str("<StyleSheets>");
        xml.push_str(r#"<StyleSheet ID="0" NameU="No Style" IsCustomNameU="1" Name="No Style" IsCustomName="1"/>"#);
        xml.push_str(r#"<StyleSheet ID="3" NameU="Normal" IsCustomNameU="1" Name="Normal" IsCustomName="1" LineStyle="0" FillStyle="0" TextStyle="0"/>"#);
        xml.push_str("</StyleSheets>");
        xml.push_str("</VisioDocument>");
        xml
    }

    /// `visio/windows.xml` with no open windows.
    pub fn to_windows_xml(&self) -> String {
        let mut xml = String::with_capacity(256);
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<Windows");
        push_attr(&mut xml, "ClientWidth", "1024");
        push_attr(&mut xml, "ClientHeight", "768");
        push_attr(&mut xml, "xmlns", namespace::VSD_MAIN);
        push_attr(&mut xml, "xmlns:r", namespace::OFC_RELATIONSHIPS);
        push_attr(&mut xml, "xml:space", "preserve");
        xml.push_str("/>");
        xml
    }
}

/// EMF signature (" EMF") stored in the header record.
const EMF_SIGNATURE: u32 = 0x464D_4520;
const EMR_HEADER: u32 = 1;
const EMR_EOF: u32 = 14;
const EMR_HEADER_SIZE: u32 = 88;
const EMR_EOF_SIZE: u32 = 20;

/// A valid, empty EMF metafile: one header record and one end-of-file record.
pub fn blank_thumbnail() -> Vec<u8> {
    let total = EMR_HEADER_SIZE + EMR_EOF_SIZE;
    let mut emf = Vec::with_capacity(total as usize);

    fn put_u32(emf: &mut Vec<u8>, value: u32) {
        emf.extend_from_slice(&value.to_le_bytes());
    }

    // EMR_HEADER
    put_u32(&mut emf, EMR_HEADER);
    put_u32(&mut emf, EMR_HEADER_SIZE);
    for _ in 0..8 {
        // rclBounds and rclFrame
        put_u32(&mut emf, 0);
    }
    put_u32(&mut emf, EMF_SIGNATURE);
    put_u32(&mut emf, 0x0001_0000); // nVersion
    put_u32(&mut emf, total); // nBytes
    put_u32(&mut emf, 2); // nRecords
    emf.extend_from_slice(&1u16.to_le_bytes()); // nHandles
    emf.extend_from_slice(&0u16.to_le_bytes()); // sReserved
    put_u32(&mut emf, 0); // nDescription
    put_u32(&mut emf, 0); // offDescription
    put_u32(&mut emf, 0); // nPalEntries
    put_u32(&mut emf, 1024); // szlDevice
    put_u32(&mut emf, 768);
    put_u32(&mut emf, 320); // szlMillimeters
    put_u32(&mut emf, 240);

    // EMR_EOF
    put_u32(&mut emf, EMR_EOF);
    put_u32(&mut emf, EMR_EOF_SIZE);
    put_u32(&mut emf, 0); // nPalEntries
    put_u32(&mut emf, 16); // offPalEntries
    put_u32(&mut emf, EMR_EOF_SIZE); // nSizeLast

    emf
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> DocProps {
        let mut props = DocProps::new();
        props.created = Utc.with_ymd_and_hms(2016, 8, 29, 6, 42, 32).unwrap();
        props.modified = Utc.with_ymd_and_hms(2016, 8, 31, 19, 23, 29).unwrap();
        props
    }

    #[test]
    fn test_app_xml_lists_pages() {
        let xml = fixed().to_app_xml(&["Overview", "R&D"]);
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("<vt:i4>2</vt:i4>"));
        assert!(xml.contains(r#"<vt:vector size="2" baseType="lpstr"><vt:lpstr>Overview</vt:lpstr><vt:lpstr>R&amp;D</vt:lpstr></vt:vector>"#));
        assert!(xml.contains("<Application>Microsoft Visio</Application>"));
        assert!(xml.contains("<AppVersion>15.0000</AppVersion>"));

        let empty: [&str; 0] = [];
        assert!(fixed().to_app_xml(&empty).contains("<vt:i4>0</vt:i4>"));
    }

    #[test]
    fn test_core_xml_timestamps() {
        let xml = fixed().to_core_xml();
        assert!(xml.contains(r#"<dcterms:created xsi:type="dcterms:W3CDTF">2016-08-29T06:42:32Z</dcterms:created>"#));
        assert!(xml.contains(r#"<dcterms:modified xsi:type="dcterms:W3CDTF">2016-08-31T19:23:29Z</dcterms:modified>"#));
        assert!(xml.contains("<dc:language>en-US</dc:language>"));
        assert!(xml.contains("<dc:title/>"));
    }

    #[test]
    fn test_touch_updates_modified_only() {
        let mut props = fixed();
        props.touch();
        assert!(props.modified > props.created);
        assert_eq!(props.created, Utc.with_ymd_and_hms(2016, 8, 29, 6, 42, 32).unwrap());
    }

    #[test]
    fn test_custom_xml_properties() {
        let xml = fixed().to_custom_xml();
        assert_eq!(xml.matches("<property ").count(), 5);
        assert!(xml.contains(r#"pid="6" name="TimeEdited"><vt:filetime>2016-08-31T19:23:29Z</vt:filetime>"#));
        assert!(xml.contains("<vt:bool>true</vt:bool>"));
        assert!(xml.contains("<vt:lpwstr/>"));
    }

    #[test]
    fn test_generated_parts_are_well_formed() {
        let props = fixed();
        for xml in [
            props.to_app_xml(&["A"]),
            props.to_core_xml(),
            props.to_custom_xml(),
            props.to_document_xml(),
            props.to_windows_xml(),
        ] {
            let mut reader = quick_xml::Reader::from_str(&xml);
            loop {
                match reader.read_event() {
                    Ok(quick_xml::events::Event::Eof) => break,
                    Ok(_) => {},
                    Err(e) => panic!("malformed XML: {}\n{}", e, xml),
                }
            }
        }
    }

    #[test]
    fn test_blank_thumbnail_header() {
        let emf = blank_thumbnail();
        assert_eq!(emf.len(), 108);
        assert_eq!(u32::from_le_bytes(emf[0..4].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(emf[40..44].try_into().unwrap()), EMF_SIGNATURE);
        assert_eq!(u32::from_le_bytes(emf[48..52].try_into().unwrap()), 108);
        assert_eq!(u32::from_le_bytes(emf[88..92].try_into().unwrap()), EMR_EOF);
    }
}
