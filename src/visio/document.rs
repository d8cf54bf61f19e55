//! Handle-based document API over a loaded or fresh package.

use crate::opc::allocator::NumberingPolicy;
use crate::visio::config::CodecOptions;
use crate::visio::error::{Result, VisioError};
use crate::visio::package::{PackageCodec, VisioPackage};
use crate::visio::page::Page;
use crate::visio::shape::{Shape, ShapeAttributes};
use std::path::Path;

/// Handle to a page of a [`Document`].
///
/// Pages are never removed, so a handle stays valid for the life of the
/// document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(usize);

impl PageHandle {
    /// Position of the page in document order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a top-level shape on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle {
    page: PageHandle,
    index: usize,
}

impl ShapeHandle {
    #[inline]
    pub fn page(self) -> PageHandle {
        self.page
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index
    }
}

/// A Visio drawing.
///
/// # Examples
///
/// ```rust,no_run
/// use vsdx::visio::{Document, ShapeAttributes};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut doc = Document::new()?;
/// let page = doc.add_page("Overview")?;
/// doc.add_shape(page, ShapeAttributes::new().with_pin(2.0, 3.0).with_size(1.5, 0.75))?;
/// doc.to_file("overview.vsdx")?;
///
/// let doc = Document::from_file("overview.vsdx")?;
/// assert_eq!(doc.pages().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    package: VisioPackage,
    codec: PackageCodec,
}

impl Document {
    /// A new, empty drawing with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(CodecOptions::default())
    }

    pub fn with_options(options: CodecOptions) -> Result<Self> {
        let codec = PackageCodec::new(options);
        Ok(Self {
            package: codec.create()?,
            codec,
        })
    }

    /// Open a `.vsdx` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with(path, CodecOptions::default())
    }

    pub fn from_file_with(path: impl AsRef<Path>, options: CodecOptions) -> Result<Self> {
        let codec = PackageCodec::new(options);
        Ok(Self {
            package: codec.read_file(path)?,
            codec,
        })
    }

    /// Load from archive bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with(data, CodecOptions::default())
    }

    pub fn from_bytes_with(data: &[u8], options: CodecOptions) -> Result<Self> {
        let codec = PackageCodec::new(options);
        Ok(Self {
            package: codec.from_bytes(data)?,
            codec,
        })
    }

    /// Save to `path`, replacing any existing file only on success.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.codec.write_file(&self.package, path)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.codec.to_bytes(&self.package)
    }

    #[inline]
    pub fn package(&self) -> &VisioPackage {
        &self.package
    }

    #[inline]
    pub fn package_mut(&mut self) -> &mut VisioPackage {
        &mut self.package
    }

    #[inline]
    pub fn options(&self) -> &CodecOptions {
        self.codec.options()
    }

    /// Pages in document order.
    #[inline]
    pub fn pages(&self) -> &[Page] {
        self.package.pages().pages()
    }

    /// Append a page named `name`.
    pub fn add_page(&mut self, name: impl Into<String>) -> Result<PageHandle> {
        self.package.add_page(name)?;
        Ok(PageHandle(self.package.pages().len() - 1))
    }

    pub fn page(&self, handle: PageHandle) -> Result<&Page> {
        self.package
            .pages()
            .get(handle.0)
            .ok_or_else(|| VisioError::PageNotFound(format!("index {}", handle.0)))
    }

    pub fn page_mut(&mut self, handle: PageHandle) -> Result<&mut Page> {
        self.package
            .pages_mut()
            .get_mut(handle.0)
            .ok_or_else(|| VisioError::PageNotFound(format!("index {}", handle.0)))
    }

    /// First page with the given display name.
    pub fn page_by_name(&self, name: &str) -> Option<PageHandle> {
        self.package.pages().position_by_name(name).map(PageHandle)
    }

    /// Add a rectangle shape built from `attrs` to a page.
    ///
    /// The shape id is one above the highest id already used on the page,
    /// counting shapes nested inside groups.
    pub fn add_shape(&mut self, page: PageHandle, attrs: ShapeAttributes) -> Result<ShapeHandle> {
        let target = self.page_mut(page)?;
        let ids = target.shape_ids();
        let id = NumberingPolicy::page_id().next("shape id", ids.iter().map(String::as_str))?;

        log::trace!("adding shape {} to page {}", id, target.id());
        target.shapes.push(Shape::from_attributes(id, attrs));
        Ok(ShapeHandle {
            page,
            index: target.shapes.len() - 1,
        })
    }

    pub fn shape(&self, handle: ShapeHandle) -> Result<&Shape> {
        self.page(handle.page)?
            .shapes
            .get(handle.index)
            .ok_or_else(|| shape_not_found(handle))
    }

    pub fn shape_mut(&mut self, handle: ShapeHandle) -> Result<&mut Shape> {
        self.page_mut(handle.page)?
            .shapes
            .get_mut(handle.index)
            .ok_or_else(|| shape_not_found(handle))
    }
}

fn shape_not_found(handle: ShapeHandle) -> VisioError {
    VisioError::ShapeNotFound(format!(
        "index {} on page {}",
        handle.index, handle.page.0
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_page_and_shapes() {
        let mut doc = Document::new().unwrap();
        let first = doc.add_page("First").unwrap();
        let second = doc.add_page("Second").unwrap();
        assert_eq!((first.index(), second.index()), (0, 1));
        assert_eq!(doc.page(second).unwrap().id(), "2");
        assert_eq!(doc.page_by_name("Second"), Some(second));
        assert_eq!(doc.page_by_name("Third"), None);

        let a = doc.add_shape(first, ShapeAttributes::new()).unwrap();
        let b = doc
            .add_shape(first, ShapeAttributes::new().with_size(2.0, 3.0))
            .unwrap();
        assert_eq!(doc.shape(a).unwrap().id, "1");
        assert_eq!(doc.shape(b).unwrap().id, "2");
        assert_eq!(doc.shape(b).unwrap().transform.height, Some(3.0));
        assert_eq!(b.page(), first);
        assert_eq!(b.index(), 1);

        doc.shape_mut(a).unwrap().name = Some("Box".to_string());
        assert_eq!(doc.page(first).unwrap().shape("1").unwrap().name.as_deref(), Some("Box"));
    }

    #[test]
    fn test_shape_ids_count_nested() {
        let mut doc = Document::new().unwrap();
        let page = doc.add_page("Groups").unwrap();
        let group = Shape::from_xml(
            r#"<Shape ID="4" Type="Group"><Shapes><Shape ID="9" Type="Shape"/></Shapes></Shape>"#,
            "t",
        )
        .unwrap();
        doc.page_mut(page).unwrap().shapes.push(group);

        let handle = doc.add_shape(page, ShapeAttributes::new()).unwrap();
        assert_eq!(doc.shape(handle).unwrap().id, "10");
    }

    #[test]
    fn test_bad_handles() {
        let mut doc = Document::new().unwrap();
        let page = doc.add_page("Only").unwrap();
        let shape = doc.add_shape(page, ShapeAttributes::new()).unwrap();

        let other = Document::new().unwrap();
        assert!(matches!(other.page(page), Err(VisioError::PageNotFound(_))));
        assert!(matches!(other.shape(shape), Err(VisioError::PageNotFound(_))));

        let mut empty_page = Document::new().unwrap();
        empty_page.add_page("Blank").unwrap();
        assert!(matches!(empty_page.shape(shape), Err(VisioError::ShapeNotFound(_))));
    }
}
