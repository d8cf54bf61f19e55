//! Visio (`.vsdx`) drawing documents.
//!
//! Built on the OPC layer in [`crate::opc`]:
//!
//! 1. **Page model** (`shape`, `connect`, `page`, `pages`): shapes with typed
//!    placement cells and authored geometry, glue records, and the ordered page
//!    collection with its relationship scope
//! 2. **Package** (`package`): the whole package in memory plus the codec that
//!    loads and saves it
//! 3. **Document API** (`document`): handle-based access for callers
//!
//! Structure the model does not understand is kept verbatim and written back
//! unchanged, so a load followed by a save loses nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use vsdx::visio::{Document, ShapeAttributes};
//!
//! let mut doc = Document::from_file("network.vsdx")?;
//! let page = doc.add_page("Appendix")?;
//! doc.add_shape(page, ShapeAttributes::new().with_name("Router"))?;
//! doc.to_file("network.vsdx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod config;
pub mod connect;
pub mod docprops;
pub mod document;
pub mod error;
pub mod package;
pub mod page;
pub mod pages;
pub mod raw;
pub mod shape;


pub use config::{CodecOptions, Compression};
pub use connect::Connect;
pub use docprops::DocProps;
pub use document::{Document, PageHandle, ShapeHandle};
pub use error::{Result, VisioError};
pub use package::{PackageCodec, VisioPackage};
pub use page::Page;
pub use pages::PageCollection;
pub use raw::RawXml;
pub use shape::{KnownCell, PathSegment, SegmentKind, Shape, ShapeAttributes, Transform};
