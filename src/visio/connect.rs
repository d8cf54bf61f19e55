use crate::visio::error::{Result, VisioError};
use crate::visio::raw::{Attributes, attributes};
use quick_xml::Reader;
use quick_xml::events::Event;

/// A glue record between two shapes: `(from_sheet, from_part, from_cell)`
/// connects to `(to_sheet, to_part, to_cell)`.
///
/// Read-only data. Writing connects back out is not supported; pages that were
/// loaded with a `Connects` block re-emit it verbatim instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connect {
    pub from_sheet: Option<String>,
    pub from_part: Option<String>,
    pub from_cell: Option<String>,
    pub to_sheet: Option<String>,
    pub to_part: Option<String>,
    pub to_cell: Option<String>,
    /// Attributes without a typed field
    pub attributes: Attributes,
}

impl Connect {
    /// Parse a `<Connect>` element.
    pub fn from_xml(xml: &str, part: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader
                .read_event()
                .map_err(|err| VisioError::xml(part, err))?
            {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Connect" => {
                    let mut connect = Connect::default();
                    for (key, value) in attributes(&e, part)? {
                        let slot = match key.as_str() {
                            "FromSheet" => &mut connect.from_sheet,
                            "FromPart" => &mut connect.from_part,
                            "FromCell" => &mut connect.from_cell,
                            "ToSheet" => &mut connect.to_sheet,
                            "ToPart" => &mut connect.to_part,
                            "ToCell" => &mut connect.to_cell,
                            _ => {
                                connect.attributes.push((key, value));
                                continue;
                            },
                        };
                        *slot = Some(value);
                    }
                    return Ok(connect);
                },
                Event::Start(_) | Event::Empty(_) | Event::Eof => {
                    return Err(VisioError::xml(part, "expected a <Connect> element"));
                },
                _ => {},
            }
        }
    }

    /// Always fails: there is no writer for connects yet.
    pub fn to_xml(&self) -> Result<String> {
        Err(VisioError::Unsupported(format!(
            "serializing Connect from sheet {} to sheet {}",
            self.from_sheet.as_deref().unwrap_or("?"),
            self.to_sheet.as_deref().unwrap_or("?")
        )))
    }
}
