use thiserror::Error;

use crate::id::{GlobalPinIdentifier, GroupIdentifier};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {kind} {value:?}: character {character:?} is not allowed (expected [A-Za-z0-9_+- ])")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        character: char,
    },

    #[error("{kind} must not be empty")]
    EmptyIdentifier { kind: &'static str },

    #[error("invalid group path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("invalid group identifier {0:?}: expected <schematic>/<path>/<type>")]
    MalformedGroupIdentifier(String),

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("root group {root} not found; known groups: {}", format_candidates(.known, .type_field))]
    RootGroupNotFound {
        root: String,
        known: Vec<String>,
        /// Component field that declares groups in this netlist's flavor.
        type_field: &'static str,
    },

    #[error("pin {pin:?} of group {group} is not numeric; even/odd pin mapping needs integer pin names")]
    NonNumericPin { group: GroupIdentifier, pin: String },

    #[error("group {0} is defined more than once")]
    DuplicateGroup(GroupIdentifier),

    #[error("group map field {name:?} of group {group} is set twice ({first:?} and {second:?}, second on {component})")]
    DuplicateMapField {
        group: GroupIdentifier,
        name: String,
        first: String,
        second: String,
        component: String,
    },

    #[error("pin {pin:?} is declared twice on group {group}")]
    DuplicatePinName { group: GroupIdentifier, pin: String },

    /// [`Error::DuplicatePinName`] as raised while building groups from
    /// components, naming the two components that declare the pin.
    #[error("explicit pin name {pin:?} is declared twice in group {group} (on {first} and {second})")]
    DuplicateExplicitPin {
        group: GroupIdentifier,
        pin: String,
        first: String,
        second: String,
    },

    #[error("group pin {pin} resolves to both {first} and {second}")]
    ConflictingPinOwner {
        pin: GlobalPinIdentifier,
        first: String,
        second: String,
    },

    #[error("pin {0} is part of more than one net")]
    PinInMultipleNets(GlobalPinIdentifier),

    #[error("net references pin {0}, which no group declares")]
    UnknownPin(GlobalPinIdentifier),

    #[error("a net must contain at least one pin")]
    EmptyNet,

    #[error("no netlists to merge")]
    NoNetlists,

    #[error("cannot merge a {first} netlist with a {second} netlist")]
    MixedFlavors {
        first: &'static str,
        second: &'static str,
    },

    #[error("{what} {key} appears in more than one netlist")]
    DuplicateAcrossSchematics { what: &'static str, key: String },

    #[error("groups {first} and {second} are connected by {glob:?} but expose different pins")]
    IncompatiblePinSets {
        glob: String,
        first: GroupIdentifier,
        second: GroupIdentifier,
    },

    #[error("component {0} appears more than once in the component netlist")]
    DuplicateComponent(String),

    #[error("sheet path {0:?} appears more than once")]
    DuplicateSheetPath(String),

    #[error("sheet {sheet:?} has no parent sheet {parent:?} (sheet names must not contain '/')")]
    MissingParentSheet { sheet: String, parent: String },

    #[error("sheet path {0:?} must start and end with '/'")]
    MalformedSheetPath(String),
}

fn format_candidates(known: &[String], type_field: &str) -> String {
    if known.is_empty() {
        format!("none (did you set the {type_field} field on any component?)")
    } else {
        known.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
