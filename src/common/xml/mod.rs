//! XML helpers shared by every part serializer.
//!
//! Serializers in this crate build their output by pushing into a `String`;
//! these helpers keep escaping and the fixed declarations in one place.

pub mod escape;

pub use escape::{escape_attr, escape_xml, push_attr};

/// Declaration emitted at the top of every XML part.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Declaration required by `[Content_Types].xml` and every `.rels` part.
pub const XML_DECLARATION_STANDALONE: &str =
    r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#;
