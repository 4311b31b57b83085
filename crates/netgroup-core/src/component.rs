//! Component-level netlist as exported by the schematic editor.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub reference: String,
    /// Sheet path the component was placed on, e.g. `/` or `/power/`.
    pub sheetpath: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub reference: String,
    pub pin: String,
    pub pin_function: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentNet {
    pub name: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNetlist {
    pub source: PathBuf,
    pub schematic: String,
    pub sheets: Vec<String>,
    pub components: BTreeMap<String, Component>,
    pub nets: Vec<ComponentNet>,
}

impl ComponentNetlist {
    pub fn new(source: PathBuf) -> Self {
        Self {
            schematic: schematic_name(&source),
            source,
            sheets: Vec::new(),
            components: BTreeMap::new(),
            nets: Vec::new(),
        }
    }

    pub fn add_component(&mut self, component: Component) -> Result<()> {
        if self.components.contains_key(&component.reference) {
            return Err(Error::DuplicateComponent(component.reference));
        }
        self.components
            .insert(component.reference.clone(), component);
        Ok(())
    }
}

/// File name of the root schematic without its `.kicad_sch` extension.
pub fn schematic_name(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(".kicad_sch") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schematic_name_drops_extension() {
        assert_eq!(
            schematic_name(Path::new("/home/me/board/Main Board.kicad_sch")),
            "Main Board"
        );
        assert_eq!(schematic_name(Path::new("legacy.sch")), "legacy.sch");
    }

    #[test]
    fn duplicate_reference_is_rejected() {
        let mut netlist = ComponentNetlist::new(PathBuf::from("a.kicad_sch"));
        let r1 = Component {
            reference: "R1".into(),
            sheetpath: "/".into(),
            fields: BTreeMap::new(),
        };
        netlist.add_component(r1.clone()).unwrap();
        assert!(matches!(
            netlist.add_component(r1),
            Err(Error::DuplicateComponent(r)) if r == "R1"
        ));
    }
}
