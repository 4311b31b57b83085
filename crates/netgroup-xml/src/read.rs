use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use chrono::NaiveDateTime;
use netgroup_core::{
    Error as ModelError, GlobalPinIdentifier, Group, GroupIdentifier, GroupMap,
    ManyToManyMap, Net, Netlist, OneToManyMap, PinName, Provenance,
    diagnostics::{DiagnosticKind, Diagnostics, WithDiagnostics},
};
use roxmltree::{Document, Node};

use crate::{
    CodecError, Result,
    tags::{self, Tags},
    write::{map_to_xml, netlist_to_xml},
};

/// Parse a group or snippet netlist.
pub fn parse_netlist(text: &str) -> Result<WithDiagnostics<Netlist>> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    let flavor =
        tags::netlist_flavor(root.tag_name().name()).ok_or_else(|| CodecError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
            expected: "groupNetlist, snippetNetlist",
        })?;
    let tags = tags::tags(flavor);

    let mut netlist = Netlist::new(flavor, parse_provenance(root)?);
    for node in grandchildren(root, tags.groups, tags.group) {
        netlist.add_group(parse_group(node, tags, tags.group, |_| Ok(()))?)?;
    }
    for node in grandchildren(root, tags::NETS, tags::NET) {
        let net = Net::new(
            children(node, tags::NODE)
                .map(|n| parse_pin_ref(n, tags::NODE))
                .collect::<Result<Vec<_>>>()?,
        )?;
        if let Some(pin) = netlist.nets.get(&net).and_then(|n| n.iter().next()) {
            return Err(ModelError::PinInMultipleNets(pin.clone()).into());
        }
        netlist.nets.insert(net);
    }
    netlist.validate()?;

    let mut diagnostics = Diagnostics::default();
    self_check(text, &netlist_to_xml(&netlist)?, &mut diagnostics);
    Ok(WithDiagnostics::new(netlist, diagnostics))
}

/// Parse a one-to-many map (it has a root group) or a many-to-many map.
pub fn parse_map(text: &str) -> Result<WithDiagnostics<GroupMap>> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    let flavor =
        tags::map_flavor(root.tag_name().name()).ok_or_else(|| CodecError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
            expected: "groupMap, snippetMap",
        })?;
    let tags = tags::tags(flavor);
    let provenance = parse_provenance(root)?;

    let map = match child(root, tags.root_group) {
        Some(root_node) => {
            let root_group = parse_group(root_node, tags, tags.root_group, |_| Ok(()))?;
            let mut groups = BTreeMap::new();
            for node in grandchildren(root, tags.groups, tags.group) {
                let group = parse_group(node, tags, tags.group, |pin| {
                    pin.attribute(tags.root_group_pin)
                        .map(PinName::new)
                        .transpose()
                        .map_err(CodecError::from)
                })?;
                insert_group(&mut groups, group)?;
            }
            GroupMap::OneToMany(OneToManyMap {
                flavor,
                provenance,
                root_group,
                groups,
            })
        }
        None => {
            let mut groups = BTreeMap::new();
            for node in grandchildren(root, tags.groups, tags.group) {
                let group = parse_group(node, tags, tags.group, |pin| {
                    children(pin, tags::OTHER_PIN)
                        .map(|other| parse_pin_ref(other, tags::OTHER_PIN))
                        .collect::<Result<BTreeSet<_>>>()
                })?;
                insert_group(&mut groups, group)?;
            }
            GroupMap::ManyToMany(ManyToManyMap {
                flavor,
                provenance,
                groups,
            })
        }
    };

    let mut diagnostics = Diagnostics::default();
    self_check(text, &map_to_xml(&map)?, &mut diagnostics);
    Ok(WithDiagnostics::new(map, diagnostics))
}

fn self_check(input: &str, reserialized: &[u8], diagnostics: &mut Diagnostics) {
    if input.as_bytes() != reserialized {
        log::debug!(
            "Re-serialised document:\n{}",
            String::from_utf8_lossy(reserialized)
        );
        diagnostics.warn(
            DiagnosticKind::StringifyDiverged,
            "The input was written by a different serialiser or is malformed: \
             serialising the parsed document does not reproduce it",
        );
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn required_child<'a, 'i>(node: Node<'a, 'i>, tag: &'static str) -> Result<Node<'a, 'i>> {
    child(node, tag).ok_or(CodecError::MissingElement(tag))
}

fn children<'a, 'i>(node: Node<'a, 'i>, tag: &'static str) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(move |n| n.has_tag_name(tag))
}

/// `node/container/item` elements.
fn grandchildren<'a, 'i>(
    node: Node<'a, 'i>,
    container: &'static str,
    item: &'static str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    child(node, container)
        .into_iter()
        .flat_map(move |c| children(c, item))
}

fn attribute<'a>(node: Node<'a, '_>, element: &'static str, attr: &'static str) -> Result<&'a str> {
    node.attribute(attr)
        .ok_or(CodecError::MissingAttribute { element, attr })
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or_default()
}

fn parse_provenance(root: Node) -> Result<Provenance> {
    let header = required_child(root, tags::HEADER)?;
    let mut sources = BTreeSet::new();
    for source in grandchildren(header, tags::SOURCES, tags::SOURCE) {
        if !sources.insert(PathBuf::from(text(source))) {
            return Err(CodecError::Duplicate {
                what: "source",
                key: text(source).to_string(),
                element: tags::SOURCES.to_string(),
            });
        }
    }
    let date = text(required_child(header, tags::DATE)?);
    let date = date
        .parse::<NaiveDateTime>()
        .map_err(|e| CodecError::InvalidDate(date.to_string(), e))?;
    let tool = text(required_child(header, tags::TOOL)?).to_string();
    Ok(Provenance {
        sources,
        date,
        tool,
    })
}

fn parse_id(node: Node, element: &'static str) -> Result<GroupIdentifier> {
    Ok(GroupIdentifier::from_parts(
        attribute(node, element, "schematic")?,
        attribute(node, element, "path")?,
        attribute(node, element, "type")?,
    )?)
}

fn parse_pin_ref(node: Node, element: &'static str) -> Result<GlobalPinIdentifier> {
    Ok(GlobalPinIdentifier::new(
        parse_id(node, element)?,
        PinName::new(attribute(node, element, "pin")?)?,
    ))
}

fn parse_group<P>(
    node: Node,
    tags: &Tags,
    element: &'static str,
    mut parse_pin: impl FnMut(Node) -> Result<P>,
) -> Result<Group<P>> {
    let mut group = Group::new(parse_id(node, element)?);
    for field in grandchildren(node, tags.map_fields, tags.map_field) {
        let name = attribute(field, tags.map_field, "name")?;
        if group
            .group_map_fields
            .insert(name.to_string(), text(field).to_string())
            .is_some()
        {
            return Err(CodecError::Duplicate {
                what: "map field",
                key: name.to_string(),
                element: group.id.stringify(),
            });
        }
    }
    for pin in grandchildren(node, tags::PINS, tags::PIN) {
        let name = PinName::new(attribute(pin, tags::PIN, "name")?)?;
        group.add_pin(name, parse_pin(pin)?)?;
    }
    Ok(group)
}

fn insert_group<P>(
    groups: &mut BTreeMap<GroupIdentifier, Group<P>>,
    group: Group<P>,
) -> Result<()> {
    if groups.contains_key(&group.id) {
        return Err(ModelError::DuplicateGroup(group.id).into());
    }
    groups.insert(group.id.clone(), group);
    Ok(())
}
