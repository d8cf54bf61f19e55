//! Verbatim XML fragments and the reader helpers that capture them.
//!
//! Structure the model does not understand (sections, nested shape groups,
//! text blocks, page sheets) is carried as [`RawXml`] and written back exactly
//! as it was read.

use crate::common::xml::push_attr;
use crate::visio::error::{Result, VisioError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};
use std::fmt;

/// A verbatim, well-formed XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawXml(String);

impl RawXml {
    pub fn new(xml: impl Into<String>) -> Self {
        RawXml(xml.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawXml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered `(qualified name, unescaped value)` attribute list.
pub type Attributes = Vec<(String, String)>;

/// Read all attributes of `e`, in document order.
pub(crate) fn attributes(e: &BytesStart<'_>, part: &str) -> Result<Attributes> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| VisioError::xml(part, err))?;
        let value = attr
            .unescape_value()
            .map_err(|err| VisioError::xml(part, err))?;
        out.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(out)
}

/// Value of attribute `name`, if present.
#[inline]
pub(crate) fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

pub(crate) fn push_attrs(out: &mut String, attrs: &[(String, String)]) {
    for (name, value) in attrs {
        push_attr(out, name, value);
    }
}

/// Consume the rest of the element opened by `e` and return its full source text.
///
/// `start` is the reader position immediately before the start tag was read.
pub(crate) fn capture_element<'a>(
    input: &'a str,
    reader: &mut Reader<&'a [u8]>,
    start: usize,
    e: &BytesStart<'_>,
    part: &str,
) -> Result<&'a str> {
    reader
        .read_to_end(e.name())
        .map_err(|err| VisioError::xml(part, err))?;
    slice(input, start, reader.buffer_position() as usize, part)
}

/// Source text of the empty element just read.
pub(crate) fn capture_empty<'a>(
    input: &'a str,
    reader: &Reader<&'a [u8]>,
    start: usize,
    part: &str,
) -> Result<&'a str> {
    slice(input, start, reader.buffer_position() as usize, part)
}

fn slice<'a>(input: &'a str, start: usize, end: usize, part: &str) -> Result<&'a str> {
    input
        .get(start..end)
        .ok_or_else(|| VisioError::xml(part, format!("invalid element span {}..{}", start, end)))
}

/// A direct child element, by local name and full source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Child<'a> {
    pub name: &'a str,
    pub raw: &'a str,
}

/// Split `xml` into the attributes of its root element and its direct children.
///
/// The root must have local name `root`. Prolog events, comments and
/// whitespace around children are skipped; non-blank text directly inside the
/// root is an error.
pub(crate) fn split_element<'a>(
    xml: &'a str,
    root: &str,
    part: &str,
) -> Result<(Attributes, Vec<Child<'a>>)> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let root_attrs = loop {
        match reader
            .read_event()
            .map_err(|err| VisioError::xml(part, err))?
        {
            Event::Start(e) if e.local_name().as_ref() == root.as_bytes() => {
                break attributes(&e, part)?;
            },
            Event::Empty(e) if e.local_name().as_ref() == root.as_bytes() => {
                return Ok((attributes(&e, part)?, Vec::new()));
            },
            Event::Start(e) | Event::Empty(e) => {
                return Err(VisioError::xml(
                    part,
                    format!(
                        "expected <{}>, found <{}>",
                        root,
                        String::from_utf8_lossy(e.local_name().as_ref())
                    ),
                ));
            },
            Event::Eof => {
                return Err(VisioError::xml(part, format!("missing <{}> element", root)));
            },
            _ => {},
        }
    };

    let mut children = Vec::new();
    loop {
        let start = reader.buffer_position() as usize;
        match reader
            .read_event()
            .map_err(|err| VisioError::xml(part, err))?
        {
            Event::Start(e) => {
                let raw = capture_element(xml, &mut reader, start, &e, part)?;
                children.push(Child {
                    name: local_name(raw, part)?,
                    raw,
                });
            },
            Event::Empty(_) => {
                let raw = capture_empty(xml, &reader, start, part)?;
                children.push(Child {
                    name: local_name(raw, part)?,
                    raw,
                });
            },
            Event::Text(t) if !is_blank(&t) => {
                return Err(VisioError::xml(part, format!("unexpected text inside <{}>", root)));
            },
            Event::End(_) => break,
            Event::Eof => {
                return Err(VisioError::xml(part, format!("unclosed <{}> element", root)));
            },
            _ => {},
        }
    }

    Ok((root_attrs, children))
}

/// Local name of the element whose source text starts at `raw`.
fn local_name<'a>(raw: &'a str, part: &str) -> Result<&'a str> {
    let tag = raw
        .strip_prefix('<')
        .ok_or_else(|| VisioError::xml(part, "element does not start with '<'"))?;
    let end = tag
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    let qname = &tag[..end];
    Ok(qname.rsplit(':').next().unwrap_or(qname))
}

/// Whether a text node is only inter-element whitespace.
#[inline]
pub(crate) fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Parse a cell value as `f64`.
#[inline]
pub(crate) fn parse_f64(value: &str) -> Option<f64> {
    fast_float2::parse(value.trim()).ok()
}
