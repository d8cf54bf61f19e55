/// The PackURI value type: a part name inside an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path
/// separators. The ZIP member name of a part is its PackURI without the
/// leading slash.
use crate::opc::error::{OpcError, Result};

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml item
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// Represents a partname within an OPC package (e.g. `/visio/pages/page1.xml`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a new PackURI. The string must begin with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a ZIP member name (`visio/document.xml`).
    pub fn from_membername(membername: &str) -> Result<Self> {
        let trimmed = membername.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(OpcError::InvalidPackUri(format!(
                "empty member name '{}'",
                membername
            )));
        }
        Self::new(format!("/{}", trimmed))
    }

    /// Resolve a relative reference (like `../pages/page1.xml`) against a base URI
    /// (like `/visio/pages`) into an absolute PackURI.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in joined.split('/') {
            match segment {
                "" | "." => {},
                ".." => {
                    segments.pop();
                },
                _ => segments.push(segment),
            }
        }

        Self::new(format!("/{}", segments.join("/")))
    }

    /// Directory portion of this PackURI: `/visio/pages` for `/visio/pages/page1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Filename portion: `page1.xml` for `/visio/pages/page1.xml`, empty for `/`.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Extension without the leading period: `xml` for `/visio/document.xml`.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// The ZIP member name: the URI with its leading slash stripped.
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// PackURI of the `.rels` part holding this part's relationships.
    ///
    /// `/visio/_rels/document.xml.rels` for `/visio/document.xml`, and
    /// `/_rels/.rels` for the package pseudo-partname.
    pub fn rels_uri(&self) -> Result<PackURI> {
        let base_uri = self.base_uri();
        let rels = if base_uri == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base_uri, self.filename())
        };
        Self::new(rels)
    }

    /// For a `.rels` part, the PackURI of the source it describes.
    ///
    /// Returns `None` when this is not a relationships part.
    pub fn rels_source(&self) -> Option<PackURI> {
        let source_name = self.filename().strip_suffix(".rels")?;
        let rels_dir = self.base_uri();
        let source_dir = rels_dir.strip_suffix("_rels")?;
        let source_dir = source_dir.strip_suffix('/').unwrap_or(source_dir);
        let source = if source_name.is_empty() {
            PACKAGE_URI.to_string()
        } else {
            format!("{}/{}", source_dir, source_name)
        };
        PackURI::new(source).ok()
    }

    /// Relative reference from `base_uri` to this PackURI, as written in a `.rels` Target.
    ///
    /// `pages/page1.xml` from `/visio`; `../document.xml` from `/visio/pages`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = vec![".."; from.len() - common];
        parts.extend_from_slice(&to[common..]);
        parts.join("/")
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

impl std::borrow::Borrow<str> for PackURI {
    fn borrow(&self) -> &str {
        &self.uri
    }
}
