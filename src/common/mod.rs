//! Utilities shared across the package and drawing layers.

pub mod xml;
