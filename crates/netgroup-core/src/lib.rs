//! Group netlists: which user-defined groups of schematic components exist,
//! which of their pins share a net, and the maps derived from that.

pub mod component;
mod connect;
pub mod diagnostics;
mod error;
pub mod glob;
mod id;
pub mod map;
pub mod merge;
pub mod netlist;
pub mod netlister;

pub use connect::ConnectedNetlist;
pub use error::{Error, Result};
pub use glob::GroupGlob;
pub use id::{
    GlobalPinIdentifier, GroupIdentifier, GroupPath, GroupType, PinName, Schematic, Validation,
};
pub use map::{GroupMap, ManyToManyMap, OneToManyMap};
pub use netlist::{Flavor, Group, Net, Netlist, Provenance};

/// Recorded as the `tool` of every document this crate produces.
pub const TOOL_NAME: &str = concat!("netgroup v", env!("CARGO_PKG_VERSION"));
