/// Constant values related to the Open Packaging Convention as used by Visio.
///
/// This module contains content type URIs (like MIME-types) that specify a part's format,
/// XML namespaces, and relationship types found in VSDX packages.

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    // Image content types
    pub const X_EMF: &str = "image/x-emf";

    // Office common content types
    pub const OFC_CUSTOM_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.custom-properties+xml";
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";

    // OPC core content types
    pub const OPC_CORE_PROPERTIES: &str =
        "application/vnd.openxmlformats-package.core-properties+xml";
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

    // Visio drawing content types
    pub const VSD_DRAWING_MAIN: &str = "application/vnd.ms-visio.drawing.main+xml";
    pub const VSD_PAGES: &str = "application/vnd.ms-visio.pages+xml";
    pub const VSD_PAGE: &str = "application/vnd.ms-visio.page+xml";
    pub const VSD_WINDOWS: &str = "application/vnd.ms-visio.windows+xml";

    // Generic XML
    pub const XML: &str = "application/xml";
}

/// XML namespace URIs emitted verbatim in package parts
pub mod namespace {
    /// Office relationships namespace (the `r:` prefix in drawing parts)
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// OPC relationships namespace
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";

    /// Visio 2012 drawing namespace
    pub const VSD_MAIN: &str = "http://schemas.microsoft.com/office/visio/2012/main";

    /// Extended (app) properties namespace
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";

    /// Custom properties namespace
    pub const OFC_CUSTOM_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties";

    /// Variant types used by app and custom properties
    pub const OFC_DOC_PROPS_VTYPES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

    /// Core properties namespace
    pub const OPC_CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";

    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const DC_TERMS: &str = "http://purl.org/dc/terms/";
    pub const DCMI_TYPE: &str = "http://purl.org/dc/dcmitype/";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// Internal relationship target mode (default)
    pub const INTERNAL: &str = "Internal";

    /// External relationship target mode (e.g., hyperlinks to external URLs)
    pub const EXTERNAL: &str = "External";
}

/// Relationship type URIs used in VSDX packages
pub mod relationship_type {
    // Core relationships
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const CUSTOM_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/custom-properties";
    pub const THUMBNAIL: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

    // Visio document parts
    pub const VSD_DOCUMENT: &str = "http://schemas.microsoft.com/visio/2010/relationships/document";
    pub const VSD_PAGES: &str = "http://schemas.microsoft.com/visio/2010/relationships/pages";
    pub const VSD_PAGE: &str = "http://schemas.microsoft.com/visio/2010/relationships/page";
    pub const VSD_WINDOWS: &str = "http://schemas.microsoft.com/visio/2010/relationships/windows";
}
