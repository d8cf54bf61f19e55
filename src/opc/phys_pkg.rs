//! Provides a general interface to a physical OPC package (ZIP file).
//!
//! Reading turns an archive into a [`PartTable`]; writing turns a `PartTable`
//! back into an archive. Nothing here knows about Visio.

use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use crate::opc::part::PartTable;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

/// Physical package reader over an in-memory archive.
pub struct PhysPkgReader<'data> {
    archive: ZipArchive<Cursor<&'data [u8]>>,
}

impl<'data> PhysPkgReader<'data> {
    /// Open an archive held in memory.
    ///
    /// Bytes that are not a ZIP archive are a [`OpcError::MalformedContainer`].
    pub fn new(data: &'data [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data)).map_err(container_error)?;
        Ok(Self { archive })
    }

    /// Number of members in the archive, directories included.
    #[inline]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Read every file member into a part table.
    ///
    /// Directory entries are skipped. Member names that escape the archive
    /// root (`../x`, absolute paths) make the container malformed.
    pub fn read_parts(&mut self) -> Result<PartTable> {
        let mut parts = PartTable::new();

        for index in 0..self.archive.len() {
            let mut file = self.archive.by_index(index).map_err(container_error)?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            if file.enclosed_name().is_none() {
                return Err(OpcError::MalformedContainer(format!(
                    "member name escapes archive root: {}",
                    name
                )));
            }

            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;

            let partname = PackURI::from_membername(&name)?;
            log::trace!("read part {} ({} bytes)", partname, blob.len());
            if parts.insert(partname, blob).is_some() {
                return Err(OpcError::MalformedContainer(format!(
                    "duplicate archive member: {}",
                    name
                )));
            }
        }

        if !parts.contains(CONTENT_TYPES_URI) {
            return Err(OpcError::MalformedContainer(format!(
                "required part missing: {}",
                CONTENT_TYPES_URI
            )));
        }

        Ok(parts)
    }

    /// Extract the archive below `dir`, then return its parts.
    ///
    /// `dir` is expected to be a scoped working directory owned by the caller.
    pub fn extract_to(&mut self, dir: &Path) -> Result<PartTable> {
        let parts = self.read_parts()?;
        write_tree(&parts, dir)?;
        log::debug!("extracted {} parts to {}", parts.len(), dir.display());
        Ok(parts)
    }
}

/// Lay out every part below `dir` as a file at its member name.
pub fn write_tree(parts: &PartTable, dir: &Path) -> Result<()> {
    for (partname, blob) in parts.iter() {
        let path = dir.join(partname.membername());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, blob)?;
    }
    Ok(())
}

/// Physical package writer.
///
/// `[Content_Types].xml` is always the first member, as many readers expect.
pub struct PhysPkgWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl PhysPkgWriter<Cursor<Vec<u8>>> {
    /// Writer producing an in-memory archive.
    pub fn in_memory(compression: CompressionMethod) -> Self {
        Self::new(Cursor::new(Vec::new()), compression)
    }
}

impl<W: Write + Seek> PhysPkgWriter<W> {
    pub fn new(sink: W, compression: CompressionMethod) -> Self {
        Self {
            zip: ZipWriter::new(sink),
            options: SimpleFileOptions::default().compression_method(compression),
        }
    }

    /// Write one part as an archive member.
    pub fn write(&mut self, partname: &PackURI, blob: &[u8]) -> Result<()> {
        self.zip.start_file(partname.membername(), self.options)?;
        self.zip.write_all(blob)?;
        Ok(())
    }

    /// Write a whole part table, content types first, then the rest by partname.
    pub fn write_parts(&mut self, parts: &PartTable) -> Result<()> {
        let content_types = parts.require(CONTENT_TYPES_URI)?;
        self.write(&PackURI::new(CONTENT_TYPES_URI)?, content_types)?;

        for (partname, blob) in parts.iter() {
            if partname.as_str() != CONTENT_TYPES_URI {
                self.write(partname, blob)?;
            }
        }
        Ok(())
    }

    /// Finish the archive and hand back the sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

/// Serialize a part table into archive bytes.
pub fn write_to_vec(parts: &PartTable, compression: CompressionMethod) -> Result<Vec<u8>> {
    let mut writer = PhysPkgWriter::in_memory(compression);
    writer.write_parts(parts)?;
    Ok(writer.finish()?.into_inner())
}

fn container_error(err: ZipError) -> OpcError {
    match err {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            OpcError::MalformedContainer(err.to_string())
        },
        other => OpcError::Zip(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_parts() -> PartTable {
        let mut parts = PartTable::new();
        parts.insert(PackURI::new("/visio/document.xml").unwrap(), b"<VisioDocument/>".to_vec());
        parts.insert(PackURI::new(CONTENT_TYPES_URI).unwrap(), b"<Types/>".to_vec());
        parts.insert(PackURI::new("/_rels/.rels").unwrap(), b"<Relationships/>".to_vec());
        parts
    }

    #[test]
    fn test_write_then_read() {
        let parts = sample_parts();
        let bytes = write_to_vec(&parts, CompressionMethod::Deflated).unwrap();

        let mut reader = PhysPkgReader::new(&bytes).unwrap();
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.read_parts().unwrap(), parts);
    }

    #[test]
    fn test_content_types_written_first() {
        let bytes = write_to_vec(&sample_parts(), CompressionMethod::Stored).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "[Content_Types].xml");
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        assert!(matches!(
            PhysPkgReader::new(b"definitely not a zip archive"),
            Err(OpcError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_missing_content_types_is_malformed() {
        let mut parts = PartTable::new();
        parts.insert(PackURI::new("/visio/document.xml").unwrap(), b"<x/>".to_vec());
        let mut writer = PhysPkgWriter::in_memory(CompressionMethod::Stored);
        writer.write(&PackURI::new("/visio/document.xml").unwrap(), b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut reader = PhysPkgReader::new(&bytes).unwrap();
        assert!(matches!(
            reader.read_parts(),
            Err(OpcError::MalformedContainer(ref msg)) if msg.contains("[Content_Types].xml")
        ));
        assert!(matches!(
            write_to_vec(&parts, CompressionMethod::Stored),
            Err(OpcError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_extract_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = write_to_vec(&sample_parts(), CompressionMethod::Deflated).unwrap();

        let parts = PhysPkgReader::new(&bytes).unwrap().extract_to(dir.path()).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            std::fs::read(dir.path().join("visio/document.xml")).unwrap(),
            b"<VisioDocument/>"
        );
        assert!(dir.path().join("_rels/.rels").is_file());
    }
}
