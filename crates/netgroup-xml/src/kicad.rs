//! Reader for the schematic editor's XML netlist export.

use std::path::PathBuf;

use netgroup_core::component::{Component, ComponentNet, ComponentNetlist, Node as ComponentNode};
use roxmltree::{Document, Node};

use crate::{CodecError, Result};

const EXPORT: &str = "export";

/// Parse an `<export>` document into a component netlist.
///
/// The schematic name is derived from the `design/source` path, so the
/// document describes itself regardless of where it was saved.
pub fn parse_component_netlist(text: &str) -> Result<ComponentNetlist> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    if !root.has_tag_name(EXPORT) {
        return Err(CodecError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
            expected: EXPORT,
        });
    }

    let design = child(root, "design").ok_or(CodecError::MissingElement("design"))?;
    let source = child(design, "source")
        .and_then(|s| s.text())
        .ok_or(CodecError::MissingElement("source"))?;
    let mut netlist = ComponentNetlist::new(PathBuf::from(source));

    for sheet in design.children().filter(|n| n.has_tag_name("sheet")) {
        netlist
            .sheets
            .push(required_attribute(sheet, "sheet", "name")?.to_string());
    }

    for comp in grandchildren(root, "components", "comp") {
        netlist.add_component(parse_component(comp)?)?;
    }

    for net in grandchildren(root, "nets", "net") {
        let mut parsed = ComponentNet {
            name: net.attribute("name").unwrap_or_default().to_string(),
            nodes: Vec::new(),
        };
        for node in net.children().filter(|n| n.has_tag_name("node")) {
            parsed.nodes.push(ComponentNode {
                reference: required_attribute(node, "node", "ref")?.to_string(),
                pin: required_attribute(node, "node", "pin")?.to_string(),
                pin_function: node.attribute("pinfunction").unwrap_or_default().to_string(),
            });
        }
        netlist.nets.push(parsed);
    }

    log::debug!(
        "Read {} components and {} nets from {}",
        netlist.components.len(),
        netlist.nets.len(),
        netlist.source.display()
    );
    Ok(netlist)
}

fn parse_component(comp: Node) -> Result<Component> {
    let reference = required_attribute(comp, "comp", "ref")?.to_string();
    let sheetpath = child(comp, "sheetpath")
        .ok_or(CodecError::MissingElement("sheetpath"))
        .and_then(|s| required_attribute(s, "sheetpath", "names"))?
        .to_string();

    let mut component = Component {
        reference,
        sheetpath,
        fields: Default::default(),
    };
    for field in grandchildren(comp, "fields", "field") {
        let name = required_attribute(field, "field", "name")?;
        let value = field.text().unwrap_or_default();
        if component
            .fields
            .insert(name.to_string(), value.to_string())
            .is_some()
        {
            return Err(CodecError::Duplicate {
                what: "field",
                key: name.to_string(),
                element: component.reference,
            });
        }
    }
    Ok(component)
}

fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn grandchildren<'a, 'i>(
    node: Node<'a, 'i>,
    container: &'static str,
    item: &'static str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    child(node, container)
        .into_iter()
        .flat_map(move |c| c.children().filter(move |n| n.has_tag_name(item)))
}

fn required_attribute<'a>(
    node: Node<'a, '_>,
    element: &'static str,
    attr: &'static str,
) -> Result<&'a str> {
    node.attribute(attr)
        .ok_or(CodecError::MissingAttribute { element, attr })
}
