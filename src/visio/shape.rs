//! Shapes on a page.
//!
//! A [`Shape`] keeps the cells it understands as typed fields ([`Transform`],
//! style references, authored geometry). Everything else round-trips through
//! a sideband: unknown attributes, simple unknown cells, and verbatim
//! structural children such as non-authored sections, nested `Shapes` groups
//! and `Text`. Units and formulas of imported transform cells are kept beside
//! the typed values in [`KnownCell`]s.

use crate::common::xml::push_attr;
use crate::visio::error::{Result, VisioError};
use crate::visio::raw::{
    Attributes, RawXml, attr, attributes, capture_element, capture_empty, parse_f64, push_attrs,
};
use memchr::memmem;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Formula written with `LocPinX`.
pub const LOC_PIN_X_FORMULA: &str = "Width*0.5";
/// Formula written with `LocPinY`.
pub const LOC_PIN_Y_FORMULA: &str = "Height*0.5";

/// Placement cells of a shape. `None` means the shape does not carry the cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transform {
    pub pin_x: Option<f64>,
    pub pin_y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub angle: Option<f64>,
    pub flip_x: Option<bool>,
    pub flip_y: Option<bool>,
    pub loc_pin_x: Option<f64>,
    pub loc_pin_y: Option<f64>,
    pub resize_mode: Option<i32>,
}

/// Path operation of one geometry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    MoveTo,
    LineTo,
}

impl SegmentKind {
    fn row_type(self) -> &'static str {
        match self {
            SegmentKind::MoveTo => "RelMoveTo",
            SegmentKind::LineTo => "RelLineTo",
        }
    }

    fn from_row_type(row_type: &str) -> Option<Self> {
        match row_type {
            "RelMoveTo" => Some(SegmentKind::MoveTo),
            "RelLineTo" => Some(SegmentKind::LineTo),
            _ => None,
        }
    }
}

/// One geometry row, in coordinates relative to the shape's width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    pub kind: SegmentKind,
    pub x: f64,
    pub y: f64,
}

impl PathSegment {
    pub const fn move_to(x: f64, y: f64) -> Self {
        Self {
            kind: SegmentKind::MoveTo,
            x,
            y,
        }
    }

    pub const fn line_to(x: f64, y: f64) -> Self {
        Self {
            kind: SegmentKind::LineTo,
            x,
            y,
        }
    }
}

/// The closed unit rectangle, scaled by the shape's width and height.
pub const UNIT_RECTANGLE: [PathSegment; 5] = [
    PathSegment::move_to(0.0, 0.0),
    PathSegment::line_to(1.0, 0.0),
    PathSegment::line_to(1.0, 1.0),
    PathSegment::line_to(0.0, 1.0),
    PathSegment::line_to(0.0, 0.0),
];

/// How an imported transform cell was written, beside its typed value.
///
/// Kept only when writing the typed value back would change the cell: a unit,
/// a formula other than the default one, or a value spelled differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownCell {
    pub name: String,
    pub unit: Option<String>,
    pub formula: Option<String>,
    /// `V` as it appeared in the source
    text: String,
    /// `V` as the typed value would be written
    canonical: String,
}

/// A simple cell the model has no typed field for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub formula: Option<String>,
}

impl Cell {
    fn push_xml(&self, out: &mut String) {
        out.push_str("<Cell");
        push_attr(out, "N", &self.name);
        push_attr(out, "V", &self.value);
        if let Some(unit) = &self.unit {
            push_attr(out, "U", unit);
        }
        if let Some(formula) = &self.formula {
            push_attr(out, "F", formula);
        }
        out.push_str("/>");
    }
}

/// Attributes for authoring a new shape.
///
/// # Examples
///
/// ```rust
/// use vsdx::visio::ShapeAttributes;
///
/// let attrs = ShapeAttributes::new()
///     .with_name("Server")
///     .with_pin(4.0, 5.5)
///     .with_size(2.0, 1.0);
/// assert_eq!(attrs.width, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAttributes {
    pub shape_type: String,
    pub name: Option<String>,
    pub line_style: String,
    pub fill_style: String,
    pub text_style: String,
    pub pin_x: f64,
    pub pin_y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub resize_mode: i32,
}

impl Default for ShapeAttributes {
    fn default() -> Self {
        Self {
            shape_type: "Shape".to_string(),
            name: None,
            line_style: "3".to_string(),
            fill_style: "3".to_string(),
            text_style: "3".to_string(),
            pin_x: 0.5,
            pin_y: 0.5,
            width: 1.0,
            height: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
            resize_mode: 0,
        }
    }
}

impl ShapeAttributes {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, shape_type: impl Into<String>) -> Self {
        self.shape_type = shape_type.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_styles(
        mut self,
        line: impl Into<String>,
        fill: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.line_style = line.into();
        self.fill_style = fill.into();
        self.text_style = text.into();
        self
    }

    pub fn with_pin(mut self, x: f64, y: f64) -> Self {
        self.pin_x = x;
        self.pin_y = y;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub fn with_resize_mode(mut self, resize_mode: i32) -> Self {
        self.resize_mode = resize_mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: String,
    pub shape_type: String,
    pub name: Option<String>,
    pub line_style: Option<String>,
    pub fill_style: Option<String>,
    pub text_style: Option<String>,
    pub transform: Transform,
    /// Authored geometry, written as a `Geometry` section of relative rows
    pub geometry: Vec<PathSegment>,
    /// Simple cells without a typed field
    pub cells: Vec<Cell>,
    /// Unit, formula and spelling of imported transform cells
    known_cells: Vec<KnownCell>,
    /// Shape attributes without a typed field
    pub attributes: Attributes,
    /// Cells that carry more than a name, value, unit and formula
    raw_cells: Vec<RawXml>,
    /// Structural children kept verbatim
    preserved: Vec<RawXml>,
}

impl Shape {
    /// Empty shape with the given id and no cells.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            shape_type: "Shape".to_string(),
            name: None,
            line_style: None,
            fill_style: None,
            text_style: None,
            transform: Transform::default(),
            geometry: Vec::new(),
            cells: Vec::new(),
            known_cells: Vec::new(),
            attributes: Vec::new(),
            raw_cells: Vec::new(),
            preserved: Vec::new(),
        }
    }

    /// Author a shape: every transform cell set, geometry the unit rectangle.
    pub fn from_attributes(id: impl Into<String>, attrs: ShapeAttributes) -> Self {
        let mut shape = Self::new(id);
        shape.shape_type = attrs.shape_type;
        shape.name = attrs.name;
        shape.line_style = Some(attrs.line_style);
        shape.fill_style = Some(attrs.fill_style);
        shape.text_style = Some(attrs.text_style);
        shape.transform = Transform {
            pin_x: Some(attrs.pin_x),
            pin_y: Some(attrs.pin_y),
            width: Some(attrs.width),
            height: Some(attrs.height),
            angle: Some(attrs.angle),
            flip_x: Some(attrs.flip_x),
            flip_y: Some(attrs.flip_y),
            loc_pin_x: Some(attrs.width * 0.5),
            loc_pin_y: Some(attrs.height * 0.5),
            resize_mode: Some(attrs.resize_mode),
        };
        shape.geometry = UNIT_RECTANGLE.to_vec();
        shape
    }

    /// Structural children kept verbatim, in document order.
    pub fn preserved(&self) -> &[RawXml] {
        &self.preserved
    }

    /// Source form of an imported transform cell, if it needs one to round-trip.
    pub fn known_cell(&self, name: &str) -> Option<&KnownCell> {
        self.known_cells.iter().find(|cell| cell.name == name)
    }

    /// Cells kept verbatim because they carry extra attributes or children.
    pub fn raw_cells(&self) -> &[RawXml] {
        &self.raw_cells
    }

    /// Ids of shapes nested inside preserved group content.
    pub fn nested_ids(&self) -> Vec<String> {
        let finder = memmem::Finder::new(b"<Shape ");
        let mut ids = Vec::new();
        for raw in &self.preserved {
            if finder.find(raw.as_str().as_bytes()).is_none() {
                continue;
            }
            let mut reader = Reader::from_str(raw.as_str());
            loop {
                match reader.read_event() {
                    Ok(Event::Start(e)) | Ok(Event::Empty(e))
                        if e.local_name().as_ref() == b"Shape" =>
                    {
                        if let Ok(Some(id)) = e.try_get_attribute("ID")
                            && let Ok(value) = id.unescape_value()
                        {
                            ids.push(value.into_owned());
                        }
                    },
                    Ok(Event::Eof) | Err(_) => break,
                    _ => {},
                }
            }
        }
        ids
    }

    /// Parse a `<Shape>` element.
    ///
    /// `part` names the page part the fragment came from, for error context.
    pub fn from_xml(xml: &str, part: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut shape = loop {
            match reader
                .read_event()
                .map_err(|err| VisioError::xml(part, err))?
            {
                Event::Start(e) if e.local_name().as_ref() == b"Shape" => {
                    break Self::from_start(&e, part)?;
                },
                Event::Empty(e) if e.local_name().as_ref() == b"Shape" => {
                    return Self::from_start(&e, part);
                },
                Event::Start(_) | Event::Empty(_) | Event::Eof => {
                    return Err(VisioError::xml(part, "expected a <Shape> element"));
                },
                _ => {},
            }
        };

        loop {
            let start = reader.buffer_position() as usize;
            match reader
                .read_event()
                .map_err(|err| VisioError::xml(part, err))?
            {
                Event::Empty(e) => {
                    let raw = capture_empty(xml, &reader, start, part)?;
                    if e.local_name().as_ref() == b"Cell" {
                        shape.read_cell(&e, raw, part)?;
                    } else {
                        shape.preserved.push(RawXml::new(raw));
                    }
                },
                Event::Start(e) => {
                    let raw = capture_element(xml, &mut reader, start, &e, part)?;
                    match e.local_name().as_ref() {
                        b"Cell" => shape.raw_cells.push(RawXml::new(raw)),
                        b"Section" if shape.geometry.is_empty() => {
                            match parse_authored_geometry(raw) {
                                Some(segments) => shape.geometry = segments,
                                None => shape.preserved.push(RawXml::new(raw)),
                            }
                        },
                        _ => shape.preserved.push(RawXml::new(raw)),
                    }
                },
                Event::End(_) => break,
                Event::Eof => {
                    return Err(VisioError::xml(part, "unexpected end of <Shape>"));
                },
                _ => {},
            }
        }

        Ok(shape)
    }

    fn from_start(e: &BytesStart<'_>, part: &str) -> Result<Self> {
        let mut shape = Self::new(String::new());
        let mut has_id = false;
        for (key, value) in attributes(e, part)? {
            match key.as_str() {
                "ID" => {
                    shape.id = value;
                    has_id = true;
                },
                "Type" => shape.shape_type = value,
                "Name" => shape.name = Some(value),
                "LineStyle" => shape.line_style = Some(value),
                "FillStyle" => shape.fill_style = Some(value),
                "TextStyle" => shape.text_style = Some(value),
                _ => shape.attributes.push((key, value)),
            }
        }
        if !has_id {
            return Err(VisioError::xml(part, "<Shape> without ID attribute"));
        }
        Ok(shape)
    }

    fn read_cell(&mut self, e: &BytesStart<'_>, raw: &str, part: &str) -> Result<()> {
        let attrs = attributes(e, part)?;
        let Some(name) = attr(&attrs, "N") else {
            self.raw_cells.push(RawXml::new(raw));
            return Ok(());
        };
        if attrs
            .iter()
            .any(|(key, _)| !matches!(key.as_str(), "N" | "V" | "U" | "F"))
        {
            self.raw_cells.push(RawXml::new(raw));
            return Ok(());
        }

        let value = attr(&attrs, "V").unwrap_or_default();
        let unit = attr(&attrs, "U");
        let formula = attr(&attrs, "F");
        if let Some(canonical) = self.set_known_cell(name, value) {
            if unit.is_some() || formula != default_formula(name) || canonical != value {
                self.known_cells.push(KnownCell {
                    name: name.to_string(),
                    unit: unit.map(str::to_string),
                    formula: formula.map(str::to_string),
                    text: value.to_string(),
                    canonical,
                });
            }
            return Ok(());
        }

        self.cells.push(Cell {
            name: name.to_string(),
            value: value.to_string(),
            unit: unit.map(str::to_string),
            formula: formula.map(str::to_string),
        });
        Ok(())
    }

    /// Store a known cell's value in its typed field and return the value as
    /// it would be written back. `None` if the name is unknown, the value does
    /// not parse or the field is already set.
    fn set_known_cell(&mut self, name: &str, value: &str) -> Option<String> {
        let t = &mut self.transform;
        match name {
            "FlipX" | "FlipY" => {
                let slot = if name == "FlipX" { &mut t.flip_x } else { &mut t.flip_y };
                if slot.is_some() {
                    return None;
                }
                let flag = match value {
                    "0" => false,
                    "1" => true,
                    _ => return None,
                };
                *slot = Some(flag);
                Some(flag_text(flag).to_string())
            },
            "ResizeMode" => {
                if t.resize_mode.is_some() {
                    return None;
                }
                let mode = atoi_simd::parse::<i32, false, false>(value.as_bytes()).ok()?;
                t.resize_mode = Some(mode);
                Some(itoa::Buffer::new().format(mode).to_string())
            },
            _ => {
                let slot = match name {
                    "PinX" => &mut t.pin_x,
                    "PinY" => &mut t.pin_y,
                    "Width" => &mut t.width,
                    "Height" => &mut t.height,
                    "Angle" => &mut t.angle,
                    "LocPinX" => &mut t.loc_pin_x,
                    "LocPinY" => &mut t.loc_pin_y,
                    _ => return None,
                };
                if slot.is_some() {
                    return None;
                }
                let number = parse_f64(value)?;
                *slot = Some(number);
                Some(number.to_string())
            },
        }
    }

    /// Serialize to a `<Shape>` element.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512);
        self.push_xml(&mut xml);
        xml
    }

    pub(crate) fn push_xml(&self, xml: &mut String) {
        xml.push_str("<Shape");
        push_attr(xml, "ID", &self.id);
        push_attr(xml, "Type", &self.shape_type);
        if let Some(name) = &self.name {
            push_attr(xml, "Name", name);
        }
        for (key, value) in [
            ("LineStyle", &self.line_style),
            ("FillStyle", &self.fill_style),
            ("TextStyle", &self.text_style),
        ] {
            if let Some(value) = value {
                push_attr(xml, key, value);
            }
        }
        push_attrs(xml, &self.attributes);

        let has_children = self.has_transform_cells()
            || !self.cells.is_empty()
            || !self.raw_cells.is_empty()
            || !self.geometry.is_empty()
            || !self.preserved.is_empty();
        if !has_children {
            xml.push_str("/>");
            return;
        }
        xml.push('>');

        self.push_transform_cells(xml);
        for cell in &self.cells {
            cell.push_xml(xml);
        }
        for raw in &self.raw_cells {
            xml.push_str(raw.as_str());
        }
        if !self.geometry.is_empty() {
            push_geometry(xml, &self.geometry);
        }
        for raw in &self.preserved {
            xml.push_str(raw.as_str());
        }

        xml.push_str("</Shape>");
    }

    fn has_transform_cells(&self) -> bool {
        self.transform != Transform::default()
    }

    fn push_transform_cells(&self, xml: &mut String) {
        let t = &self.transform;
        let numbers = [
            ("PinX", t.pin_x),
            ("PinY", t.pin_y),
            ("Width", t.width),
            ("Height", t.height),
            ("LocPinX", t.loc_pin_x),
            ("LocPinY", t.loc_pin_y),
            ("Angle", t.angle),
        ];
        for (name, value) in numbers {
            if let Some(value) = value {
                self.push_known_cell(xml, name, value.to_string());
            }
        }
        for (name, flag) in [("FlipX", t.flip_x), ("FlipY", t.flip_y)] {
            if let Some(flag) = flag {
                self.push_known_cell(xml, name, flag_text(flag).to_string());
            }
        }
        if let Some(mode) = t.resize_mode {
            let mut buffer = itoa::Buffer::new();
            self.push_known_cell(xml, "ResizeMode", buffer.format(mode).to_string());
        }
    }

    /// Write a typed cell. An imported cell keeps its unit, and keeps its
    /// formula and spelling while the typed value is unchanged.
    fn push_known_cell(&self, xml: &mut String, name: &str, value: String) {
        let Some(source) = self.known_cell(name) else {
            push_cell(xml, name, &value, None, default_formula(name));
            return;
        };
        if source.canonical == value {
            push_cell(
                xml,
                name,
                &source.text,
                source.unit.as_deref(),
                source.formula.as_deref(),
            );
        } else {
            push_cell(xml, name, &value, source.unit.as_deref(), default_formula(name));
        }
    }
}

/// Formula written with a typed cell when nothing else is known about it.
fn default_formula(name: &str) -> Option<&'static str> {
    match name {
        "LocPinX" => Some(LOC_PIN_X_FORMULA),
        "LocPinY" => Some(LOC_PIN_Y_FORMULA),
        _ => None,
    }
}

fn flag_text(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}

fn push_cell(
    xml: &mut String,
    name: &str,
    value: &str,
    unit: Option<&str>,
    formula: Option<&str>,
) {
    xml.push_str("<Cell");
    push_attr(xml, "N", name);
    push_attr(xml, "V", value);
    if let Some(unit) = unit {
        push_attr(xml, "U", unit);
    }
    if let Some(formula) = formula {
        push_attr(xml, "F", formula);
    }
    xml.push_str("/>");
}

fn push_geometry(xml: &mut String, segments: &[PathSegment]) {
    xml.push_str(r#"<Section N="Geometry" IX="0">"#);
    let mut buffer = itoa::Buffer::new();
    for (index, segment) in segments.iter().enumerate() {
        xml.push_str("<Row");
        push_attr(xml, "T", segment.kind.row_type());
        push_attr(xml, "IX", buffer.format(index + 1));
        xml.push('>');
        push_cell(xml, "X", &segment.x.to_string(), None, None);
        push_cell(xml, "Y", &segment.y.to_string(), None, None);
        xml.push_str("</Row>");
    }
    xml.push_str("</Section>");
}

/// Recognise a geometry section in exactly the form [`push_geometry`] writes.
///
/// Anything else (other section kinds, extra cells, formulas, non-relative rows)
/// returns `None` and the section is kept verbatim.
fn parse_authored_geometry(section: &str) -> Option<Vec<PathSegment>> {
    let mut reader = Reader::from_str(section);
    reader.config_mut().trim_text(true);

    match reader.read_event().ok()? {
        Event::Start(e) if e.local_name().as_ref() == b"Section" => {
            let attrs = attributes(&e, "").ok()?;
            if attrs.len() != 2
                || attr(&attrs, "N") != Some("Geometry")
                || attr(&attrs, "IX") != Some("0")
            {
                return None;
            }
        },
        _ => return None,
    }

    let mut segments = Vec::new();
    let mut buffer = itoa::Buffer::new();
    loop {
        match reader.read_event().ok()? {
            Event::Start(row) if row.local_name().as_ref() == b"Row" => {
                let attrs = attributes(&row, "").ok()?;
                if attrs.len() != 2
                    || attr(&attrs, "IX") != Some(buffer.format(segments.len() + 1))
                {
                    return None;
                }
                let kind = SegmentKind::from_row_type(attr(&attrs, "T")?)?;

                let (mut x, mut y) = (None, None);
                loop {
                    match reader.read_event().ok()? {
                        Event::Empty(cell) if cell.local_name().as_ref() == b"Cell" => {
                            let attrs = attributes(&cell, "").ok()?;
                            if attrs.len() != 2 {
                                return None;
                            }
                            let value = parse_f64(attr(&attrs, "V")?)?;
                            match attr(&attrs, "N")? {
                                "X" if x.is_none() => x = Some(value),
                                "Y" if y.is_none() => y = Some(value),
                                _ => return None,
                            }
                        },
                        Event::End(_) => break,
                        _ => return None,
                    }
                }
                segments.push(PathSegment { kind, x: x?, y: y? });
            },
            Event::End(_) => break,
            _ => return None,
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "/visio/pages/page1.xml";

    #[test]
    fn test_authored_shape_round_trip() {
        let attrs = ShapeAttributes::new()
            .with_name("Box")
            .with_pin(4.25, 5.5)
            .with_size(2.0, 0.75);
        let shape = Shape::from_attributes("7", attrs);
        let xml = shape.to_xml();

        assert!(xml.starts_with(
            r#"<Shape ID="7" Type="Shape" Name="Box" LineStyle="3" FillStyle="3" TextStyle="3">"#
        ));
        assert!(xml.contains(r#"<Cell N="LocPinX" V="1" F="Width*0.5"/>"#));
        assert!(xml.contains(r#"<Cell N="LocPinY" V="0.375" F="Height*0.5"/>"#));
        assert!(xml.contains(r#"<Row T="RelMoveTo" IX="1"><Cell N="X" V="0"/><Cell N="Y" V="0"/></Row>"#));
        assert!(xml.contains(r#"<Row T="RelLineTo" IX="5">"#));

        let parsed = Shape::from_xml(&xml, PART).unwrap();
        assert_eq!(parsed.transform.pin_x, Some(4.25));
        assert_eq!(parsed.transform.pin_y, Some(5.5));
        assert_eq!(parsed.transform.width, Some(2.0));
        assert_eq!(parsed.transform.height, Some(0.75));
        assert_eq!(parsed.geometry, UNIT_RECTANGLE);
        assert!(parsed.preserved().is_empty());
        assert_eq!(parsed, shape);
    }

    #[test]
    fn test_cell_emit_order() {
        let xml = Shape::from_attributes("1", ShapeAttributes::new()).to_xml();
        let order = [
            "\"PinX\"",
            "\"PinY\"",
            "\"Width\"",
            "\"Height\"",
            "\"LocPinX\"",
            "\"LocPinY\"",
            "\"Angle\"",
            "\"FlipX\"",
            "\"FlipY\"",
            "\"ResizeMode\"",
            "\"Geometry\"",
        ];
        let positions: Vec<usize> = order.iter().map(|n| xml.find(n).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_imported_geometry_is_preserved_verbatim() {
        let geometry = r#"<Section N="Geometry" IX="0"><Cell N="NoFill" V="0"/><Row T="MoveTo" IX="1"><Cell N="X" V="0"/><Cell N="Y" V="0"/></Row><Row T="ArcTo" IX="2"><Cell N="X" V="1" F="Width"/><Cell N="Y" V="0"/><Cell N="A" V="0.1"/></Row></Section>"#;
        let xml = format!(
            r#"<Shape ID="3" Type="Shape" Master="2"><Cell N="PinX" V="1.5"/>{}<Text>Hello &amp; bye</Text></Shape>"#,
            geometry
        );

        let shape = Shape::from_xml(&xml, PART).unwrap();
        assert!(shape.geometry.is_empty());
        assert_eq!(shape.preserved().len(), 2);
        assert_eq!(shape.preserved()[0].as_str(), geometry);
        assert_eq!(shape.attributes, [("Master".to_string(), "2".to_string())]);

        let out = shape.to_xml();
        assert!(out.contains(geometry));
        assert!(out.contains("<Text>Hello &amp; bye</Text>"));
        assert_eq!(Shape::from_xml(&out, PART).unwrap(), shape);
    }

    #[test]
    fn test_nested_group_preserved_and_ids_found() {
        let xml = r#"<Shape ID="10" Type="Group">
  <Cell N="PinX" V="2"/>
  <Shapes>
    <Shape ID="11" Type="Shape"><Cell N="PinX" V="0.5"/></Shape>
    <Shape ID="14" Type="Shape"/>
  </Shapes>
</Shape>"#;
        let shape = Shape::from_xml(xml, PART).unwrap();
        assert_eq!(shape.shape_type, "Group");
        assert_eq!(shape.preserved().len(), 1);
        assert_eq!(shape.nested_ids(), ["11", "14"]);
    }

    #[test]
    fn test_unknown_and_nonconforming_cells() {
        let xml = r##"<Shape ID="2"><Cell N="LineWeight" V="0.01" U="PT"/><Cell N="PinY" V="1" E="#N/A"/><Cell N="FlipX" V="1"/><Cell N="Angle" V="Inh"/></Shape>"##;
        let shape = Shape::from_xml(xml, PART).unwrap();

        assert_eq!(shape.transform.flip_x, Some(true));
        assert_eq!(shape.transform.pin_y, None);
        assert_eq!(shape.transform.angle, None);
        assert_eq!(
            shape.cells,
            [
                Cell {
                    name: "LineWeight".into(),
                    value: "0.01".into(),
                    unit: Some("PT".into()),
                    formula: None,
                },
                Cell {
                    name: "Angle".into(),
                    value: "Inh".into(),
                    unit: None,
                    formula: None,
                },
            ]
        );
        assert_eq!(shape.raw_cells().len(), 1);
        assert!(shape.to_xml().contains(r##"<Cell N="PinY" V="1" E="#N/A"/>"##));
    }

    #[test]
    fn test_known_cells_with_unit_and_formula_are_typed() {
        let xml = r#"<Shape ID="1"><Cell N="PinX" V="2.5" U="MM"/><Cell N="Width" V="1" F="Inh"/><Cell N="Height" V="0.5" F="GUARD(0.5)"/><Cell N="LocPinX" V="0.3" F="Width*0.3"/></Shape>"#;
        let shape = Shape::from_xml(xml, PART).unwrap();

        assert_eq!(shape.transform.pin_x, Some(2.5));
        assert_eq!(shape.transform.width, Some(1.0));
        assert_eq!(shape.transform.height, Some(0.5));
        assert_eq!(shape.transform.loc_pin_x, Some(0.3));
        assert!(shape.cells.is_empty());
        assert_eq!(shape.known_cell("PinX").unwrap().unit.as_deref(), Some("MM"));
        assert_eq!(shape.known_cell("Width").unwrap().formula.as_deref(), Some("Inh"));

        let out = shape.to_xml();
        assert!(out.contains(r#"<Cell N="PinX" V="2.5" U="MM"/>"#));
        assert!(out.contains(r#"<Cell N="Width" V="1" F="Inh"/>"#));
        assert!(out.contains(r#"<Cell N="Height" V="0.5" F="GUARD(0.5)"/>"#));
        assert!(out.contains(r#"<Cell N="LocPinX" V="0.3" F="Width*0.3"/>"#));
        assert_eq!(Shape::from_xml(&out, PART).unwrap(), shape);
    }

    #[test]
    fn test_known_cell_spelling_kept_until_changed() {
        let xml = r#"<Shape ID="1"><Cell N="PinX" V="2.50" U="IN" F="GUARD(2.5)"/><Cell N="LocPinY" V="0.25"/></Shape>"#;
        let mut shape = Shape::from_xml(xml, PART).unwrap();

        let out = shape.to_xml();
        assert!(out.contains(r#"<Cell N="PinX" V="2.50" U="IN" F="GUARD(2.5)"/>"#));
        assert!(out.contains(r#"<Cell N="LocPinY" V="0.25"/>"#));

        shape.transform.pin_x = Some(3.0);
        let out = shape.to_xml();
        assert!(out.contains(r#"<Cell N="PinX" V="3" U="IN"/>"#));
    }

    #[test]
    fn test_attribute_whitespace_round_trip() {
        let xml = r#"<Shape ID="1" Name="a&#xA;b"><Cell N="Prompt" V="line1&#xA;line2&#x9;x" F="IF(A,&#xA;1,2)"/></Shape>"#;
        let shape = Shape::from_xml(xml, PART).unwrap();
        assert_eq!(shape.name.as_deref(), Some("a\nb"));
        assert_eq!(shape.cells[0].value, "line1\nline2\tx");

        let out = shape.to_xml();
        assert!(out.contains(r#"Name="a&#xA;b""#));
        assert!(out.contains(r#"V="line1&#xA;line2&#x9;x" F="IF(A,&#xA;1,2)""#));
        assert!(!out.contains('\n'));
        assert_eq!(Shape::from_xml(&out, PART).unwrap(), shape);
    }

    #[test]
    fn test_missing_id_is_xml_error() {
        assert!(Shape::from_xml(r#"<Shape Type="Shape"/>"#, PART).is_err());
        assert!(Shape::from_xml(r#"<Connect/>"#, PART).is_err());
        assert!(Shape::from_xml(r#"<Shape ID="1"><Cell N="PinX" V="1"/>"#, PART).is_err());
    }

    #[test]
    fn test_bare_shape_is_empty_element() {
        let shape = Shape::new("4");
        assert_eq!(shape.to_xml(), r#"<Shape ID="4" Type="Shape"/>"#);
        assert_eq!(Shape::from_xml(&shape.to_xml(), PART).unwrap(), shape);
    }
}
