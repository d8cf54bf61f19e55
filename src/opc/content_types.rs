//! The content-type registry stored in `[Content_Types].xml`.
//!
//! Implements the OPC content type discovery algorithm: an `Override` keyed by
//! the exact partname wins, otherwise the `Default` keyed by the partname's
//! extension applies. Entries keep their insertion order so that serialized
//! output is deterministic.

use crate::common::xml::{XML_DECLARATION_STANDALONE, push_attr};
use crate::opc::constants::{content_type as ct, namespace};
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Maps file extensions and explicit partnames to content types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypeRegistry {
    /// Extension (stored lowercase) to content type
    defaults: Vec<(String, String)>,

    /// Partname to content type
    overrides: Vec<(String, String)>,
}

impl ContentTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the entries every Visio package carries.
    pub fn visio_defaults() -> Self {
        let mut registry = Self::new();
        registry.add_default("emf", ct::X_EMF);
        registry.add_default("rels", ct::OPC_RELATIONSHIPS);
        registry.add_default("xml", ct::XML);
        registry.add_override("/visio/document.xml", ct::VSD_DRAWING_MAIN);
        registry.add_override("/docProps/core.xml", ct::OPC_CORE_PROPERTIES);
        registry.add_override("/docProps/app.xml", ct::OFC_EXTENDED_PROPERTIES);
        registry.add_override("/docProps/custom.xml", ct::OFC_CUSTOM_PROPERTIES);
        registry.add_override("/visio/pages/pages.xml", ct::VSD_PAGES);
        registry.add_override("/visio/windows.xml", ct::VSD_WINDOWS);
        registry
    }

    /// Add or replace the default content type for an extension.
    ///
    /// Extensions compare case-insensitively; a replaced entry keeps its position.
    pub fn add_default(&mut self, extension: impl AsRef<str>, content_type: impl Into<String>) {
        let extension = extension.as_ref().trim_start_matches('.').to_ascii_lowercase();
        let content_type = content_type.into();
        match self.defaults.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(entry) => entry.1 = content_type,
            None => self.defaults.push((extension, content_type)),
        }
    }

    /// Add or replace the override content type for an exact partname.
    pub fn add_override(&mut self, partname: impl Into<String>, content_type: impl Into<String>) {
        let partname = partname.into();
        let content_type = content_type.into();
        match self
            .overrides
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&partname))
        {
            Some(entry) => entry.1 = content_type,
            None => self.overrides.push((partname, content_type)),
        }
    }

    /// Remove the default for an extension, returning its content type.
    pub fn remove_default(&mut self, extension: &str) -> Result<String> {
        let extension = extension.trim_start_matches('.');
        let pos = self
            .defaults
            .iter()
            .position(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .ok_or_else(|| OpcError::ContentTypeNotFound(format!("extension '{}'", extension)))?;
        Ok(self.defaults.remove(pos).1)
    }

    /// Remove the override for a partname, returning its content type.
    pub fn remove_override(&mut self, partname: &str) -> Result<String> {
        let pos = self
            .overrides
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(partname))
            .ok_or_else(|| OpcError::ContentTypeNotFound(partname.to_string()))?;
        Ok(self.overrides.remove(pos).1)
    }

    /// Default content type registered for an extension.
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, ct)| ct.as_str())
    }

    /// Override content type registered for a partname.
    pub fn override_for(&self, partname: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(partname))
            .map(|(_, ct)| ct.as_str())
    }

    /// Resolve the content type of a part: override first, then extension default.
    pub fn resolve(&self, partname: &PackURI) -> Result<&str> {
        self.override_for(partname.as_str())
            .or_else(|| self.default_for(partname.ext()))
            .ok_or_else(|| OpcError::UnresolvedContentType(partname.to_string()))
    }

    /// Iterate `(extension, content type)` pairs in insertion order.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate `(partname, content type)` pairs in insertion order.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Generate the XML for `[Content_Types].xml`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + 128 * (self.defaults.len() + self.overrides.len()));
        xml.push_str(XML_DECLARATION_STANDALONE);
        xml.push('\n');
        xml.push_str("<Types");
        push_attr(&mut xml, "xmlns", namespace::OPC_CONTENT_TYPES);
        xml.push('>');

        for (extension, content_type) in &self.defaults {
            xml.push_str("<Default");
            push_attr(&mut xml, "Extension", extension);
            push_attr(&mut xml, "ContentType", content_type);
            xml.push_str("/>");
        }

        for (partname, content_type) in &self.overrides {
            xml.push_str("<Override");
            push_attr(&mut xml, "PartName", partname);
            push_attr(&mut xml, "ContentType", content_type);
            xml.push_str("/>");
        }

        xml.push_str("</Types>");
        xml
    }

    /// Parse `[Content_Types].xml`.
    ///
    /// `Default` and `Override` elements are read by local name in any order;
    /// unknown elements are ignored.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut registry = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if !saw_root {
                        if e.local_name().as_ref() != b"Types" {
                            return Err(OpcError::xml(
                                CONTENT_TYPES_URI,
                                "root element is not <Types>",
                            ));
                        }
                        saw_root = true;
                    } else {
                        match e.local_name().as_ref() {
                            b"Default" => {
                                let (extension, content_type) =
                                    Self::required_pair(e, b"Extension", b"ContentType")?;
                                registry.add_default(extension, content_type);
                            },
                            b"Override" => {
                                let (partname, content_type) =
                                    Self::required_pair(e, b"PartName", b"ContentType")?;
                                registry.add_override(partname, content_type);
                            },
                            _ => {},
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::xml(CONTENT_TYPES_URI, e)),
                _ => {},
            }
            buf.clear();
        }

        if !saw_root {
            return Err(OpcError::xml(CONTENT_TYPES_URI, "document has no root element"));
        }

        Ok(registry)
    }

    /// Read two required attributes from a `Default`/`Override` element.
    fn required_pair(e: &BytesStart<'_>, key: &[u8], value: &[u8]) -> Result<(String, String)> {
        let mut first = None;
        let mut second = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|err| OpcError::xml(CONTENT_TYPES_URI, err))?;
            let text = || {
                attr.unescape_value()
                    .map(|v| v.into_owned())
                    .map_err(|err| OpcError::xml(CONTENT_TYPES_URI, err))
            };
            if attr.key.as_ref() == key {
                first = Some(text()?);
            } else if attr.key.as_ref() == value {
                second = Some(text()?);
            }
        }

        match (first, second) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(OpcError::xml(
                CONTENT_TYPES_URI,
                format!(
                    "<{}> requires {} and {} attributes",
                    String::from_utf8_lossy(e.local_name().as_ref()),
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(value)
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_override_then_default() {
        let xml = br#"<?xml version="1.0"?>
            <Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Override PartName="/visio/document.xml" ContentType="application/vnd.ms-visio.drawing.main+xml"/>
                <Default Extension="xml" ContentType="application/xml"/>
                <Unknown Foo="bar"/>
                <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
            </Types>"#;

        let registry = ContentTypeRegistry::from_xml(xml).unwrap();

        let uri = PackURI::new("/visio/windows.xml").unwrap();
        assert_eq!(registry.resolve(&uri).unwrap(), "application/xml");

        let uri = PackURI::new("/visio/document.xml").unwrap();
        assert_eq!(registry.resolve(&uri).unwrap(), ct::VSD_DRAWING_MAIN);

        let uri = PackURI::new("/docProps/thumbnail.emf").unwrap();
        assert!(matches!(
            registry.resolve(&uri),
            Err(OpcError::UnresolvedContentType(name)) if name == "/docProps/thumbnail.emf"
        ));
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let mut registry = ContentTypeRegistry::new();
        registry.add_default("xml", "text/xml");
        registry.add_default("XML", ct::XML);
        registry.add_override("/a.xml", "one");
        registry.add_override("/a.xml", "two");

        assert_eq!(registry.defaults().count(), 1);
        assert_eq!(registry.default_for("xml"), Some(ct::XML));
        assert_eq!(registry.override_for("/a.xml"), Some("two"));
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut registry = ContentTypeRegistry::visio_defaults();
        assert_eq!(registry.remove_default("emf").unwrap(), ct::X_EMF);
        assert!(matches!(
            registry.remove_default("emf"),
            Err(OpcError::ContentTypeNotFound(_))
        ));
        assert_eq!(
            registry.remove_override("/visio/windows.xml").unwrap(),
            ct::VSD_WINDOWS
        );
        assert!(matches!(
            registry.remove_override("/visio/windows.xml"),
            Err(OpcError::ContentTypeNotFound(_))
        ));
    }

    #[test]
    fn test_to_xml_is_ordered_and_declared() {
        let xml = ContentTypeRegistry::visio_defaults().to_xml();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#));
        assert!(xml.contains(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#));

        let emf = xml.find(r#"Extension="emf""#).unwrap();
        let rels = xml.find(r#"Extension="rels""#).unwrap();
        let first_override = xml.find("<Override").unwrap();
        assert!(emf < rels);
        assert!(rels < first_override);
        assert!(xml.contains(
            r#"<Override PartName="/visio/pages/pages.xml" ContentType="application/vnd.ms-visio.pages+xml"/>"#
        ));
    }

    #[test]
    fn test_missing_attribute_is_xml_error() {
        let xml = br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml"/></Types>"#;
        assert!(matches!(
            ContentTypeRegistry::from_xml(xml),
            Err(OpcError::Xml { .. })
        ));
    }

    #[test]
    fn test_wrong_root_is_xml_error() {
        assert!(matches!(
            ContentTypeRegistry::from_xml(b"<Relationships/>"),
            Err(OpcError::Xml { .. })
        ));
        assert!(matches!(
            ContentTypeRegistry::from_xml(b""),
            Err(OpcError::Xml { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_entries(
            defaults in proptest::collection::btree_map("[a-z]{1,5}", "[a-z]+/[a-z.+&<>\"-]{1,20}", 0..6),
            overrides in proptest::collection::btree_map("/[a-z]{1,8}/[a-z0-9]{1,8}\\.xml", "[a-z]+/[a-z.+'-]{1,20}", 0..6),
        ) {
            let mut registry = ContentTypeRegistry::new();
            for (ext, ct) in &defaults {
                registry.add_default(ext, ct.clone());
            }
            for (name, ct) in &overrides {
                registry.add_override(name.clone(), ct.clone());
            }

            let parsed = ContentTypeRegistry::from_xml(registry.to_xml().as_bytes()).unwrap();
            prop_assert_eq!(&parsed, &registry);
        }
    }
}
