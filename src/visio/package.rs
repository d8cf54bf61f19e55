/// The Visio package model and the codec that moves it in and out of a container.
///
/// Load order is content types, package relationships, the document part's
/// relationships, then the page collection. Saving writes the reverse and
/// validates the complete part set before anything reaches the destination.
use crate::opc::allocator::PartAllocator;
use crate::opc::constants::relationship_type as rt;
use crate::opc::content_types::ContentTypeRegistry;
use crate::opc::error::OpcError;
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::part::PartTable;
use crate::opc::phys_pkg::{self, PhysPkgReader};
use crate::opc::rel::Relationships;
use crate::opc::workdir::{self, WorkDir};
use crate::visio::config::CodecOptions;
use crate::visio::docprops::{self, DocProps};
use crate::visio::error::Result;
use crate::visio::page::Page;
use crate::visio::pages::{PAGES_URI, PageCollection};
use std::path::Path;

const DOCUMENT_URI: &str = "/visio/document.xml";
const WINDOWS_URI: &str = "/visio/windows.xml";
const APP_URI: &str = "/docProps/app.xml";
const CORE_URI: &str = "/docProps/core.xml";
const CUSTOM_URI: &str = "/docProps/custom.xml";
const THUMBNAIL_URI: &str = "/docProps/thumbnail.emf";

/// Prefix of working directories created under the temp location.
const WORKDIR_PREFIX: &str = ".vsdx-";

/// An in-memory Visio package.
///
/// The content-type registry, the package and document relationship scopes and
/// the page collection are modelled; every other part is carried opaquely and
/// written back byte for byte.
#[derive(Debug, Clone)]
pub struct VisioPackage {
    content_types: ContentTypeRegistry,
    package_rels: Relationships,
    document_partname: PackURI,
    document_rels: Relationships,
    pages: PageCollection,
    /// Parts with no model of their own
    parts: PartTable,
    /// Regenerated into `docProps/{app,core,custom}.xml` on save when set
    docprops: Option<DocProps>,
}

impl VisioPackage {
    /// A fresh, empty document.
    ///
    /// Carries the five canonical package relationships (document, core,
    /// extended and custom properties, thumbnail), the document's links to the
    /// pages and windows parts, and generated boilerplate for each.
    pub fn new(numbering: PartAllocator) -> Result<Self> {
        let package_uri = PackURI::new(PACKAGE_URI)?;
        let document_partname = PackURI::new(DOCUMENT_URI)?;
        let pages_partname = PackURI::new(PAGES_URI)?;

        let mut package_rels = Relationships::for_source(&package_uri);
        for (target, reltype) in [
            (DOCUMENT_URI, rt::VSD_DOCUMENT),
            (CORE_URI, rt::CORE_PROPERTIES),
            (APP_URI, rt::EXTENDED_PROPERTIES),
            (CUSTOM_URI, rt::CUSTOM_PROPERTIES),
            (THUMBNAIL_URI, rt::THUMBNAIL),
        ] {
            let r_id = package_rels.next_r_id()?;
            let target = PackURI::new(target)?.relative_ref(package_rels.base_uri());
            package_rels.add(r_id, target, reltype)?;
        }

        let mut document_rels = Relationships::for_source(&document_partname);
        for (target, reltype) in [(PAGES_URI, rt::VSD_PAGES), (WINDOWS_URI, rt::VSD_WINDOWS)] {
            let r_id = document_rels.next_r_id()?;
            let target = PackURI::new(target)?.relative_ref(document_rels.base_uri());
            document_rels.add(r_id, target, reltype)?;
        }

        let props = DocProps::new();
        let mut parts = PartTable::new();
        parts.insert(document_partname.clone(), props.to_document_xml());
        parts.insert(PackURI::new(WINDOWS_URI)?, props.to_windows_xml());
        parts.insert(PackURI::new(THUMBNAIL_URI)?, docprops::blank_thumbnail());

        Ok(Self {
            content_types: ContentTypeRegistry::visio_defaults(),
            package_rels,
            document_partname,
            document_rels,
            pages: PageCollection::new(pages_partname, numbering),
            parts,
            docprops: Some(props),
        })
    }

    #[inline]
    pub fn content_types(&self) -> &ContentTypeRegistry {
        &self.content_types
    }

    #[inline]
    pub fn content_types_mut(&mut self) -> &mut ContentTypeRegistry {
        &mut self.content_types
    }

    #[inline]
    pub fn package_rels(&self) -> &Relationships {
        &self.package_rels
    }

    #[inline]
    pub fn document_partname(&self) -> &PackURI {
        &self.document_partname
    }

    #[inline]
    pub fn document_rels(&self) -> &Relationships {
        &self.document_rels
    }

    #[inline]
    pub fn pages(&self) -> &PageCollection {
        &self.pages
    }

    #[inline]
    pub fn pages_mut(&mut self) -> &mut PageCollection {
        &mut self.pages
    }

    /// Parts carried through unmodelled.
    #[inline]
    pub fn parts(&self) -> &PartTable {
        &self.parts
    }

    #[inline]
    pub fn docprops(&self) -> Option<&DocProps> {
        self.docprops.as_ref()
    }

    /// Generated document properties. Loaded packages have none until
    /// [`VisioPackage::set_docprops`] is called, and keep their own parts.
    #[inline]
    pub fn docprops_mut(&mut self) -> Option<&mut DocProps> {
        self.docprops.as_mut()
    }

    pub fn set_docprops(&mut self, docprops: DocProps) {
        self.docprops = Some(docprops);
    }

    /// Append a new empty page; see [`PageCollection::add_page`].
    pub fn add_page(&mut self, name: impl Into<String>) -> Result<&mut Page> {
        let parts = &self.parts;
        self.pages
            .add_page(name, &mut self.content_types, |partname| parts.contains(partname))
    }
}

/// Reads and writes [`VisioPackage`]s.
#[derive(Debug, Clone, Default)]
pub struct PackageCodec {
    options: CodecOptions,
}

impl PackageCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// A fresh package using this codec's numbering conventions.
    pub fn create(&self) -> Result<VisioPackage> {
        VisioPackage::new(self.options.numbering.clone())
    }

    /// Build the package model from a part table.
    ///
    /// Any parse error, missing required part or (in strict mode) dangling
    /// relationship or untyped part aborts the whole load.
    pub fn load(&self, mut parts: PartTable) -> Result<VisioPackage> {
        let strict = self.options.strict;

        let content_types = ContentTypeRegistry::from_xml(parts.require(CONTENT_TYPES_URI)?)?;
        log::debug!(
            "parsed content types: {} defaults, {} overrides",
            content_types.defaults().count(),
            content_types.overrides().count()
        );

        let package_rels_uri = PackURI::new(PACKAGE_URI)?.rels_uri()?;
        let package_rels =
            Relationships::from_xml(parts.require(package_rels_uri.as_str())?, &package_rels_uri)?;

        let document_rel = package_rels.part_with_reltype(rt::VSD_DOCUMENT)?;
        let document_partname = package_rels.target_partname(document_rel)?;
        if !parts.contains(document_partname.as_str()) {
            return Err(dangling(&package_rels, document_rel.r_id(), document_rel.target_ref()).into());
        }

        let document_rels_uri = document_partname.rels_uri()?;
        let document_rels = Relationships::from_xml(
            parts.require(document_rels_uri.as_str())?,
            &document_rels_uri,
        )?;
        log::debug!(
            "parsed relationships: {} package, {} document",
            package_rels.len(),
            document_rels.len()
        );

        let pages_rel = document_rels.part_with_reltype(rt::VSD_PAGES)?;
        let pages_partname = document_rels.target_partname(pages_rel)?;
        let pages = PageCollection::from_parts(
            &parts,
            pages_partname,
            &content_types,
            self.options.numbering.clone(),
            strict,
        )?;

        check_targets(&package_rels, &parts, strict)?;
        check_targets(&document_rels, &parts, strict)?;
        check_targets(pages.rels(), &parts, strict)?;
        check_passthrough_rels(&parts, &[&package_rels_uri, &document_rels_uri], strict)?;
        check_content_types(&parts, &content_types, strict)?;

        let mut modelled = vec![
            PackURI::new(CONTENT_TYPES_URI)?,
            package_rels_uri,
            document_rels_uri,
        ];
        modelled.extend(pages.owned_partnames()?);
        for partname in &modelled {
            if parts.contains(partname.as_str()) {
                parts.remove(partname.as_str())?;
            }
        }

        log::debug!(
            "loaded package: {} pages, {} pass-through parts",
            pages.len(),
            parts.len()
        );

        Ok(VisioPackage {
            content_types,
            package_rels,
            document_partname,
            document_rels,
            pages,
            parts,
            docprops: None,
        })
    }

    /// Serialize the package into a complete part table.
    ///
    /// Every part must resolve a content type, whatever the strictness.
    pub fn save(&self, package: &VisioPackage) -> Result<PartTable> {
        let mut parts = package.parts.clone();

        if let Some(props) = &package.docprops {
            let names: Vec<&str> = package.pages.pages().iter().map(|page| page.name.as_str()).collect();
            parts.insert(PackURI::new(APP_URI)?, props.to_app_xml(&names));
            parts.insert(PackURI::new(CORE_URI)?, props.to_core_xml());
            parts.insert(PackURI::new(CUSTOM_URI)?, props.to_custom_xml());
        }

        package.pages.write_parts(&mut parts)?;
        parts.insert(
            package.document_partname.rels_uri()?,
            package.document_rels.to_xml(),
        );
        parts.insert(
            PackURI::new(PACKAGE_URI)?.rels_uri()?,
            package.package_rels.to_xml(),
        );
        parts.insert(PackURI::new(CONTENT_TYPES_URI)?, package.content_types.to_xml());

        parts.resolve(&package.content_types)?;
        let strict = self.options.strict;
        check_targets(&package.package_rels, &parts, strict)?;
        check_targets(&package.document_rels, &parts, strict)?;
        check_targets(package.pages.rels(), &parts, strict)?;

        log::debug!("serialized {} parts", parts.len());
        Ok(parts)
    }

    /// Load a package from archive bytes held in memory.
    pub fn from_bytes(&self, data: &[u8]) -> Result<VisioPackage> {
        let parts = PhysPkgReader::new(data)?.read_parts()?;
        self.load(parts)
    }

    /// Serialize a package to archive bytes.
    pub fn to_bytes(&self, package: &VisioPackage) -> Result<Vec<u8>> {
        let parts = self.save(package)?;
        Ok(phys_pkg::write_to_vec(&parts, self.options.compression.method())?)
    }

    /// Load a package from a file.
    ///
    /// The archive is extracted into a scoped working directory that is
    /// removed however the load ends.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<VisioPackage> {
        let path = path.as_ref();
        log::info!("loading {}", path.display());

        let data = std::fs::read(path).map_err(OpcError::from)?;
        let workdir = WorkDir::acquire(self.options.workdir.as_deref(), WORKDIR_PREFIX)?;
        let parts = PhysPkgReader::new(&data)?.extract_to(workdir.path())?;
        self.load(parts)
    }

    /// Save a package to a file.
    ///
    /// The part tree is staged in a scoped working directory and the archive
    /// replaces `path` atomically, only after every part serialized and
    /// validated. On failure an existing file at `path` is left as it was.
    pub fn write_file(&self, package: &VisioPackage, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        log::info!("saving {}", path.display());

        let workdir = WorkDir::acquire(self.options.workdir.as_deref(), WORKDIR_PREFIX)?;
        let parts = self.save(package)?;
        phys_pkg::write_tree(&parts, workdir.path())?;
        let bytes = phys_pkg::write_to_vec(&parts, self.options.compression.method())?;
        workdir::replace_file(path, &bytes)?;
        Ok(())
    }
}

fn dangling(rels: &Relationships, r_id: &str, target: &str) -> OpcError {
    OpcError::DanglingRelationship {
        scope: rels.base_uri().to_string(),
        r_id: r_id.to_string(),
        target: target.to_string(),
    }
}

/// Every internal target of `rels` must be a part of `parts`.
fn check_targets(rels: &Relationships, parts: &PartTable, strict: bool) -> Result<()> {
    for rel in rels.iter().filter(|rel| !rel.is_external()) {
        let target = rels.target_partname(rel)?;
        if parts.contains(target.as_str()) {
            continue;
        }
        let err = dangling(rels, rel.r_id(), rel.target_ref());
        if strict {
            return Err(err.into());
        }
        log::warn!("tolerating {}", err);
    }
    Ok(())
}

/// Validate `.rels` parts the model does not own, such as page-level relationships.
fn check_passthrough_rels(parts: &PartTable, skip: &[&PackURI], strict: bool) -> Result<()> {
    for (partname, blob) in parts.iter() {
        if partname.ext() != "rels" || skip.contains(&partname) {
            continue;
        }
        let rels = Relationships::from_xml(blob, partname)?;
        log::trace!("checking {} relationships in {}", rels.len(), partname);
        check_targets(&rels, parts, strict)?;
    }
    Ok(())
}

fn check_content_types(parts: &PartTable, registry: &ContentTypeRegistry, strict: bool) -> Result<()> {
    if strict {
        parts.resolve(registry)?;
        return Ok(());
    }
    for partname in parts.partnames() {
        if partname.as_str() != CONTENT_TYPES_URI && registry.resolve(partname).is_err() {
            log::warn!("tolerating part without content type: {}", partname);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as ct;
    use crate::visio::error::VisioError;
    use crate::visio::shape::{Shape, ShapeAttributes};

    fn fresh() -> VisioPackage {
        VisioPackage::new(PartAllocator::default()).unwrap()
    }

    #[test]
    fn test_fresh_package_relationships() {
        let package = fresh();
        let rels: Vec<_> = package
            .package_rels()
            .iter()
            .map(|rel| (rel.r_id(), rel.target_ref(), rel.reltype()))
            .collect();
        assert_eq!(
            rels,
            [
                ("rId1", "visio/document.xml", rt::VSD_DOCUMENT),
                ("rId2", "docProps/core.xml", rt::CORE_PROPERTIES),
                ("rId3", "docProps/app.xml", rt::EXTENDED_PROPERTIES),
                ("rId4", "docProps/custom.xml", rt::CUSTOM_PROPERTIES),
                ("rId5", "docProps/thumbnail.emf", rt::THUMBNAIL),
            ]
        );

        let doc_rels: Vec<_> = package
            .document_rels()
            .iter()
            .map(|rel| (rel.r_id(), rel.target_ref()))
            .collect();
        assert_eq!(doc_rels, [("rId1", "pages/pages.xml"), ("rId2", "windows.xml")]);
    }

    #[test]
    fn test_save_fresh_package() {
        let codec = PackageCodec::default();
        let parts = codec.save(&fresh()).unwrap();

        for partname in [
            CONTENT_TYPES_URI,
            "/_rels/.rels",
            DOCUMENT_URI,
            "/visio/_rels/document.xml.rels",
            PAGES_URI,
            "/visio/pages/_rels/pages.xml.rels",
            WINDOWS_URI,
            APP_URI,
            CORE_URI,
            CUSTOM_URI,
            THUMBNAIL_URI,
        ] {
            assert!(parts.contains(partname), "missing {}", partname);
        }
        assert_eq!(parts.len(), 11);
        assert_eq!(parts.get(THUMBNAIL_URI).unwrap().len(), 108);
    }

    #[test]
    fn test_load_saved_package() {
        let codec = PackageCodec::default();
        let mut package = fresh();
        package.add_page("Overview").unwrap();
        let page = package.pages_mut().get_mut(0).unwrap();
        page.shapes.push(Shape::from_attributes("1", ShapeAttributes::new()));

        let loaded = codec.load(codec.save(&package).unwrap()).unwrap();
        assert_eq!(loaded.pages().len(), 1);
        assert_eq!(loaded.pages().pages()[0].name, "Overview");
        assert_eq!(loaded.pages().pages()[0].shapes.len(), 1);
        assert_eq!(loaded.package_rels(), package.package_rels());
        assert_eq!(loaded.content_types(), package.content_types());
        assert!(loaded.docprops().is_none());

        // docProps and the other unmodelled parts pass through.
        assert!(loaded.parts().contains(APP_URI));
        assert!(loaded.parts().contains(WINDOWS_URI));
        assert!(!loaded.parts().contains(PAGES_URI));
        assert!(!loaded.parts().contains(CONTENT_TYPES_URI));
    }

    #[test]
    fn test_add_page_registers_override() {
        let mut package = fresh();
        let page = package.add_page("First").unwrap();
        assert_eq!((page.id(), page.r_id(), page.filename()), ("1", "rId1", "page1.xml"));
        assert_eq!(
            package.content_types().override_for("/visio/pages/page1.xml"),
            Some(ct::VSD_PAGE)
        );
    }

    #[test]
    fn test_add_page_refuses_existing_part() {
        let codec = PackageCodec::default();
        let mut parts = codec.save(&fresh()).unwrap();
        parts.insert(
            PackURI::new("/visio/pages/page1.xml").unwrap(),
            b"<PageContents/>".to_vec(),
        );

        let mut package = codec.load(parts).unwrap();
        assert!(matches!(
            package.add_page("Clash"),
            Err(VisioError::Opc(OpcError::AllocationConflict { .. }))
        ));
        assert!(package.pages().is_empty());
    }

    #[test]
    fn test_missing_document_part() {
        let codec = PackageCodec::default();
        let mut parts = codec.save(&fresh()).unwrap();
        parts.remove(DOCUMENT_URI).unwrap();
        assert!(matches!(
            codec.load(parts),
            Err(VisioError::Opc(OpcError::DanglingRelationship { ref target, .. })) if target == "visio/document.xml"
        ));
    }

    #[test]
    fn test_dangling_package_relationship_strictness() {
        let mut parts = PackageCodec::default().save(&fresh()).unwrap();
        parts.remove(THUMBNAIL_URI).unwrap();

        let strict = PackageCodec::default();
        assert!(matches!(
            strict.load(parts.clone()),
            Err(VisioError::Opc(OpcError::DanglingRelationship { ref r_id, .. })) if r_id == "rId5"
        ));

        let lenient = PackageCodec::new(CodecOptions::new().with_strict(false));
        let package = lenient.load(parts).unwrap();
        assert!(!package.parts().contains(THUMBNAIL_URI));
    }

    #[test]
    fn test_dangling_passthrough_relationship() {
        let codec = PackageCodec::default();
        let mut package = fresh();
        package.add_page("P").unwrap();
        let mut parts = codec.save(&package).unwrap();

        let rels_uri = PackURI::new("/visio/pages/_rels/page1.xml.rels").unwrap();
        let mut page_rels = Relationships::for_source(&PackURI::new("/visio/pages/page1.xml").unwrap());
        page_rels
            .add("rId1", "../masters/master1.xml", "http://schemas.microsoft.com/visio/2010/relationships/master")
            .unwrap();
        parts.insert(rels_uri, page_rels.to_xml());

        assert!(matches!(
            codec.load(parts),
            Err(VisioError::Opc(OpcError::DanglingRelationship { ref target, .. })) if target == "../masters/master1.xml"
        ));
    }

    #[test]
    fn test_untyped_part() {
        let mut parts = PackageCodec::default().save(&fresh()).unwrap();
        parts.insert(PackURI::new("/visio/media/image1.png").unwrap(), vec![0x89, b'P', b'N', b'G']);

        assert!(matches!(
            PackageCodec::default().load(parts.clone()),
            Err(VisioError::Opc(OpcError::UnresolvedContentType(_)))
        ));

        // Tolerated on load, still refused on save.
        let lenient = PackageCodec::new(CodecOptions::new().with_strict(false));
        let package = lenient.load(parts).unwrap();
        assert!(matches!(
            lenient.save(&package),
            Err(VisioError::Opc(OpcError::UnresolvedContentType(ref name))) if name == "/visio/media/image1.png"
        ));
    }

    #[test]
    fn test_missing_required_parts() {
        let codec = PackageCodec::default();
        let saved = codec.save(&fresh()).unwrap();

        for required in [CONTENT_TYPES_URI, "/_rels/.rels", "/visio/_rels/document.xml.rels"] {
            let mut parts = saved.clone();
            parts.remove(required).unwrap();
            assert!(
                matches!(codec.load(parts), Err(VisioError::Opc(OpcError::MalformedContainer(_)))),
                "removing {}",
                required
            );
        }
    }

    #[test]
    fn test_regenerated_app_xml_lists_pages() {
        let codec = PackageCodec::default();
        let mut package = fresh();
        package.add_page("Alpha").unwrap();
        package.add_page("Beta").unwrap();

        let parts = codec.save(&package).unwrap();
        let app = std::str::from_utf8(parts.get(APP_URI).unwrap()).unwrap();
        assert!(app.contains("<vt:lpstr>Alpha</vt:lpstr><vt:lpstr>Beta</vt:lpstr>"));
    }

    #[test]
    fn test_byte_round_trip() {
        let codec = PackageCodec::new(CodecOptions::new().with_compression(crate::visio::Compression::Stored));
        let mut package = fresh();
        package.add_page("A").unwrap();

        let bytes = codec.to_bytes(&package).unwrap();
        let loaded = codec.from_bytes(&bytes).unwrap();
        assert_eq!(loaded.pages().pages()[0].filename(), "page1.xml");
        assert!(matches!(
            codec.from_bytes(b"PK but not really"),
            Err(VisioError::Opc(OpcError::MalformedContainer(_)))
        ));
    }
}
