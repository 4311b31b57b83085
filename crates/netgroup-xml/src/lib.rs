//! On-disk XML forms.
//!
//! Group netlists and maps are written in one canonical byte form, so the
//! same value always serialises to the same file. Parsing re-serialises the
//! result and warns when the bytes differ from the input.

pub mod kicad;
mod read;
mod tags;
mod write;

use thiserror::Error;

pub use read::{parse_map, parse_netlist};
pub use write::{map_to_xml, netlist_to_xml};

/// First child of every document this crate writes.
pub const XML_WARNING: &str = "WARNING: This file has been automatically generated. Do not edit!";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialised XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Model(#[from] netgroup_core::Error),

    #[error("unexpected root element <{found}>, expected one of: {expected}")]
    UnexpectedRoot {
        found: String,
        expected: &'static str,
    },

    #[error("Missing required element: {0}")]
    MissingElement(&'static str),

    #[error("Missing required attribute '{attr}' on element '{element}'")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },

    #[error("invalid date {0:?}: {1}")]
    InvalidDate(String, chrono::ParseError),

    #[error("{what} {key:?} appears twice in {element}")]
    Duplicate {
        what: &'static str,
        key: String,
        element: String,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;
