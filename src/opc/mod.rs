//! Open Packaging Conventions (OPC) layer.
//!
//! The container-level model every Visio package sits on:
//!
//! - Part table and part names
//! - Content type registry (`[Content_Types].xml`)
//! - Relationship scopes (`_rels/*.rels`)
//! - Numbered identifier allocation
//! - ZIP-based physical packaging and scoped working directories

pub mod allocator;
pub mod constants;
pub mod content_types;
pub mod error;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod rel;
pub mod workdir;

// Re-export commonly used types
pub use allocator::{NumberingPolicy, PageAllocation, PartAllocator};
pub use content_types::ContentTypeRegistry;
pub use error::{OpcError, Result};
pub use packuri::PackURI;
pub use part::{Part, PartTable};
pub use phys_pkg::{PhysPkgReader, PhysPkgWriter};
pub use rel::{Relationship, Relationships};
pub use workdir::WorkDir;
