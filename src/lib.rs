//! vsdx - read and write Microsoft Visio `.vsdx` drawings
//!
//! A `.vsdx` file is an Open Packaging Conventions (OPC) container: a ZIP
//! archive of typed XML parts linked by relationships. This crate keeps the
//! whole package in memory and preserves every cross-reference on load,
//! mutation and save.
//!
//! # Features
//!
//! - **OPC layer**: part table, content types, relationship scopes and
//!   collision-free identifier allocation
//! - **Page model**: pages, shapes with typed placement cells, glue records
//! - **Lossless round trips**: unmodelled parts and XML are carried verbatim
//! - **Safe saves**: the destination is replaced atomically after the whole
//!   package has serialized
//!
//! # Example - Creating a drawing
//!
//! ```no_run
//! use vsdx::visio::{Document, ShapeAttributes};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = Document::new()?;
//! let page = doc.add_page("Floor plan")?;
//! doc.add_shape(page, ShapeAttributes::new().with_pin(4.0, 5.5).with_size(3.0, 2.0))?;
//! doc.to_file("floor-plan.vsdx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Inspecting a drawing
//!
//! ```no_run
//! use vsdx::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::from_file("floor-plan.vsdx")?;
//! for page in doc.pages() {
//!     println!("{} ({}): {} shapes", page.name, page.filename(), page.shapes.len());
//! }
//! # Ok(())
//! # }
//! ```

/// Shared utilities
pub mod common;

/// Open Packaging Conventions container layer
///
/// Format-agnostic: part names, content types, relationships, numbering and
/// the ZIP collaborator.
pub mod opc;

/// Visio document model and package codec
pub mod visio;

// Re-export commonly used types for convenience
pub use opc::{OpcError, PackURI};
pub use visio::{CodecOptions, Document, PageHandle, ShapeAttributes, ShapeHandle, VisioError};
