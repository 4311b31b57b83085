//! Grouping a component netlist into a group netlist.
//!
//! Components join a group through the flavor's type field. Group pins are
//! either named explicitly through `<pin prefix><component pin>` fields, or,
//! for groups without any such field, after the component pin's function.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use itertools::Itertools;

use crate::{
    Error, Flavor, GlobalPinIdentifier, Group, GroupIdentifier, GroupPath, GroupType, Net,
    Netlist, PinName, Provenance, Result, Schematic, Validation,
    component::{Component, ComponentNetlist},
    diagnostics::{DiagnosticKind, Diagnostics, WithDiagnostics},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct NetlisterOptions {
    pub flavor: Flavor,
    pub validation: Validation,
}

struct RawGroup<'a> {
    members: Vec<&'a Component>,
    map_fields: BTreeMap<String, String>,
}

/// Explicit pin names of one group, keyed by `(component, component pin)`.
type ExplicitPins = BTreeMap<(String, String), PinName>;

pub fn group_netlist(
    input: &ComponentNetlist,
    options: NetlisterOptions,
    date: NaiveDateTime,
) -> Result<WithDiagnostics<Netlist>> {
    let NetlisterOptions { flavor, validation } = options;
    let mut diagnostics = Diagnostics::default();

    check_sheets(&input.sheets)?;
    let schematic = Schematic::parse_with(&input.schematic, validation, &mut diagnostics)?;

    let mut raw_groups: BTreeMap<GroupIdentifier, RawGroup> = BTreeMap::new();
    let mut owner_group: BTreeMap<&str, GroupIdentifier> = BTreeMap::new();
    for component in input.components.values() {
        let Some(group_type) = component.fields.get(flavor.type_field()) else {
            warn_orphan_fields(component, flavor, &mut diagnostics);
            continue;
        };
        let id = GroupIdentifier::new(
            schematic.clone(),
            GroupPath::parse_with(&component.sheetpath, validation, &mut diagnostics)?,
            GroupType::parse_with(group_type, validation, &mut diagnostics)?,
        );
        let raw = raw_groups.entry(id.clone()).or_insert_with(|| RawGroup {
            members: Vec::new(),
            map_fields: BTreeMap::new(),
        });
        raw.members.push(component);

        for (field, value) in &component.fields {
            let Some(name) = field.strip_prefix(flavor.map_field_prefix()) else {
                continue;
            };
            if name.is_empty() {
                diagnostics.warn(
                    DiagnosticKind::EmptyMapFieldName,
                    format!(
                        "The {} {id} has a {} with an empty name",
                        flavor.noun(),
                        flavor.map_field_prefix()
                    ),
                );
            }
            if let Some(first) = raw.map_fields.get(name) {
                return Err(Error::DuplicateMapField {
                    group: id,
                    name: name.to_string(),
                    first: first.clone(),
                    second: value.clone(),
                    component: component.reference.clone(),
                });
            }
            raw.map_fields.insert(name.to_string(), value.clone());
        }
        owner_group.insert(&component.reference, id);
    }

    let mut explicit: BTreeMap<&GroupIdentifier, ExplicitPins> = BTreeMap::new();
    for (id, raw) in &raw_groups {
        let pins = explicit_pins(id, raw, flavor, validation, &mut diagnostics)?;
        if !pins.is_empty() {
            explicit.insert(id, pins);
        }
    }

    let mut netlist = Netlist::new(flavor, Provenance::new([input.source.clone()], date));
    for (id, raw) in &raw_groups {
        let mut group = Group::new(id.clone());
        group.group_map_fields = raw.map_fields.clone();
        netlist.add_group(group)?;
    }

    let mut pin_owner: BTreeMap<GlobalPinIdentifier, &str> = BTreeMap::new();
    for component_net in &input.nets {
        let mut pins = BTreeSet::new();
        for node in &component_net.nodes {
            let Some(id) = owner_group.get(node.reference.as_str()) else {
                continue;
            };
            let name = match explicit.get(id) {
                Some(lookup) => {
                    match lookup.get(&(node.reference.clone(), node.pin.clone())) {
                        Some(name) => name.clone(),
                        // The group names its pins explicitly and this is not one of them.
                        None => continue,
                    }
                }
                None => {
                    let label = if node.pin_function.is_empty() {
                        &node.pin
                    } else {
                        &node.pin_function
                    };
                    PinName::parse_with(label, validation, &mut diagnostics)?
                }
            };

            let pin = GlobalPinIdentifier::new(id.clone(), name.clone());
            if let Some(first) = pin_owner.get(&pin) {
                if *first != node.reference {
                    return Err(Error::ConflictingPinOwner {
                        pin,
                        first: first.to_string(),
                        second: node.reference.clone(),
                    });
                }
            }
            pin_owner.insert(pin.clone(), &node.reference);
            if let Some(group) = netlist.groups.get_mut(id) {
                group.pins.insert(name, ());
            }
            pins.insert(pin);
        }

        if pins.is_empty() {
            continue;
        }
        let net = Net::new(pins)?;
        if netlist.nets.contains(&net) {
            // Two schematic nets collapsed onto the same group pins.
            let shared = net.iter().next().cloned();
            if let Some(pin) = shared {
                return Err(Error::PinInMultipleNets(pin));
            }
        }
        netlist.nets.insert(net);
    }
    netlist.validate()?;

    for group in netlist.groups.values().filter(|g| g.pins.is_empty()) {
        diagnostics.warn(
            DiagnosticKind::GroupWithoutPins,
            format!("The {} {} has no pins", flavor.noun(), group.id),
        );
    }

    Ok(WithDiagnostics::new(netlist, diagnostics))
}

fn warn_orphan_fields(component: &Component, flavor: Flavor, diagnostics: &mut Diagnostics) {
    let orphans: Vec<&str> = component
        .fields
        .keys()
        .filter(|f| {
            f.starts_with(flavor.pin_field_prefix()) || f.starts_with(flavor.map_field_prefix())
        })
        .map(String::as_str)
        .collect();
    if !orphans.is_empty() {
        diagnostics.warn(
            DiagnosticKind::OrphanGroupField,
            format!(
                "The component {} defines {} but not {}, so it is not part of a {}",
                component.reference,
                orphans.join(", "),
                flavor.type_field(),
                flavor.noun(),
            ),
        );
    }
}

fn explicit_pins(
    id: &GroupIdentifier,
    raw: &RawGroup,
    flavor: Flavor,
    validation: Validation,
    diagnostics: &mut Diagnostics,
) -> Result<ExplicitPins> {
    let mut pins = ExplicitPins::new();
    let mut declared_by: BTreeMap<PinName, &str> = BTreeMap::new();
    for component in &raw.members {
        for (field, value) in &component.fields {
            let Some(component_pin) = field.strip_prefix(flavor.pin_field_prefix()) else {
                continue;
            };
            let name = PinName::parse_with(value, validation, diagnostics)?;
            if let Some(first) = declared_by.get(&name) {
                return Err(Error::DuplicateExplicitPin {
                    group: id.clone(),
                    pin: name.to_string(),
                    first: first.to_string(),
                    second: component.reference.clone(),
                });
            }
            declared_by.insert(name.clone(), &component.reference);
            pins.insert(
                (component.reference.clone(), component_pin.to_string()),
                name,
            );
        }
    }
    Ok(pins)
}

/// Sheet paths must be unique, and every sheet below the root needs its
/// parent sheet. A missing parent means a sheet name contained `/`.
fn check_sheets(sheets: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for sheet in sheets {
        if !sheet.starts_with('/') || !sheet.ends_with('/') {
            return Err(Error::MalformedSheetPath(sheet.clone()));
        }
        if !seen.insert(sheet.as_str()) {
            return Err(Error::DuplicateSheetPath(sheet.clone()));
        }
    }
    for sheet in sheets.iter().filter(|s| s.as_str() != "/") {
        let trimmed = &sheet[..sheet.len() - 1];
        let parent = trimmed
            .rfind('/')
            .map(|cut| &sheet[..=cut])
            .unwrap_or("/");
        if !seen.contains(parent) {
            return Err(Error::MissingParentSheet {
                sheet: sheet.clone(),
                parent: parent.to_string(),
            });
        }
    }
    log::debug!("Sheets: {}", sheets.iter().join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{component::ComponentNet, component::Node, netlist::test_support::date};

    struct Builder(ComponentNetlist);

    impl Builder {
        fn new() -> Self {
            let mut netlist = ComponentNetlist::new(PathBuf::from("/proj/Board.kicad_sch"));
            netlist.sheets = vec!["/".into(), "/power/".into()];
            Self(netlist)
        }

        fn component(mut self, reference: &str, sheet: &str, fields: &[(&str, &str)]) -> Self {
            self.0
                .add_component(Component {
                    reference: reference.into(),
                    sheetpath: sheet.into(),
                    fields: fields
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                })
                .unwrap();
            self
        }

        /// Nodes as `(ref, pin, pinfunction)`.
        fn net(mut self, nodes: &[(&str, &str, &str)]) -> Self {
            self.0.nets.push(ComponentNet {
                name: format!("Net-{}", self.0.nets.len()),
                nodes: nodes
                    .iter()
                    .map(|(r, p, f)| Node {
                        reference: r.to_string(),
                        pin: p.to_string(),
                        pin_function: f.to_string(),
                    })
                    .collect(),
            });
            self
        }

        fn run(&self) -> Result<WithDiagnostics<Netlist>> {
            group_netlist(&self.0, NetlisterOptions::default(), date())
        }
    }

    fn net_strings(netlist: &Netlist) -> Vec<Vec<String>> {
        netlist
            .nets
            .iter()
            .map(|n| n.iter().map(|p| p.to_string()).collect())
            .collect()
    }

    #[test]
    fn fallback_names_pins_after_their_function() {
        let result = Builder::new()
            .component("U1", "/power/", &[("GroupType", "LDO")])
            .component("C1", "/power/", &[("GroupType", "LDO")])
            .component("J1", "/", &[("GroupType", "Conn")])
            .component("R1", "/", &[])
            .net(&[("U1", "1", "VIN"), ("J1", "1", ""), ("R1", "1", "")])
            .net(&[("U1", "2", "GND"), ("C1", "2", "GND")])
            .run();
        // C1 and U1 are different components claiming LDO/GND.
        assert!(matches!(result, Err(Error::ConflictingPinOwner { .. })));

        let netlist = Builder::new()
            .component("U1", "/power/", &[("GroupType", "LDO")])
            .component("J1", "/", &[("GroupType", "Conn")])
            .component("R1", "/", &[])
            .net(&[("U1", "1", "VIN"), ("J1", "1", ""), ("R1", "1", "")])
            .net(&[("U1", "2", "GND"), ("U1", "3", "GND"), ("J1", "2", "")])
            .run()
            .unwrap()
            .output;
        assert_eq!(
            netlist.group_names(),
            ["Board/Conn", "Board/power/LDO"]
        );
        assert_eq!(
            net_strings(&netlist),
            [
                vec!["Board/Conn/1", "Board/power/LDO/VIN"],
                vec!["Board/Conn/2", "Board/power/LDO/GND"],
            ]
        );
    }

    #[test]
    fn explicit_pins_exclude_the_rest() {
        let result = Builder::new()
            .component(
                "U1",
                "/",
                &[("GroupType", "MCU"), ("GroupPin5", "TX"), ("GroupMapFieldPart", "STM32")],
            )
            .component("J1", "/", &[("GroupType", "Conn")])
            .net(&[("U1", "5", "PA9"), ("J1", "1", "")])
            .net(&[("U1", "6", "PA10"), ("J1", "2", "")])
            .run()
            .unwrap();
        let netlist = result.output;
        let mcu = netlist.group(&"Board/MCU".parse().unwrap()).unwrap();
        assert_eq!(mcu.pins.keys().map(|p| p.as_str()).collect::<Vec<_>>(), ["TX"]);
        assert_eq!(mcu.group_map_fields["Part"], "STM32");
        assert_eq!(
            net_strings(&netlist),
            [vec!["Board/Conn/1", "Board/MCU/TX"], vec!["Board/Conn/2"]]
        );
    }

    #[test]
    fn duplicate_explicit_pin_is_fatal() {
        let result = Builder::new()
            .component("U1", "/", &[("GroupType", "MCU"), ("GroupPin5", "TX")])
            .component("U2", "/", &[("GroupType", "MCU"), ("GroupPin1", "TX")])
            .run();
        let err = result.unwrap_err();
        assert!(matches!(
            &err,
            Error::DuplicateExplicitPin { pin, first, second, .. }
                if pin == "TX" && first == "U1" && second == "U2"
        ));
        let message = err.to_string();
        assert!(message.contains("declared twice"), "{message}");
    }

    #[test]
    fn duplicate_map_field_is_fatal() {
        let result = Builder::new()
            .component("U1", "/", &[("GroupType", "MCU"), ("GroupMapFieldPart", "A")])
            .component("U2", "/", &[("GroupType", "MCU"), ("GroupMapFieldPart", "B")])
            .run();
        match result {
            Err(Error::DuplicateMapField {
                first,
                second,
                component,
                ..
            }) => {
                assert_eq!((first.as_str(), second.as_str()), ("A", "B"));
                assert_eq!(component, "U2");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn warnings_for_orphans_empty_names_and_pinless_groups() {
        let result = Builder::new()
            .component("U1", "/", &[("GroupPin1", "X")])
            .component("U2", "/", &[("GroupType", "Lonely"), ("GroupMapField", "v")])
            .run()
            .unwrap();
        let kinds: Vec<_> = result.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [
                DiagnosticKind::OrphanGroupField,
                DiagnosticKind::EmptyMapFieldName,
                DiagnosticKind::GroupWithoutPins,
            ]
        );
    }

    #[test]
    fn strict_and_lenient_identifiers() {
        let builder = Builder::new()
            .component("U1", "/", &[("GroupType", "Bad.Type")])
            .net(&[("U1", "1", "~{RST}")]);
        assert!(matches!(
            builder.run(),
            Err(Error::InvalidIdentifier { .. })
        ));

        let lenient = NetlisterOptions {
            validation: Validation::Lenient,
            ..Default::default()
        };
        let result = group_netlist(&builder.0, lenient, date()).unwrap();
        assert_eq!(result.output.group_names(), ["Board/Bad_Type"]);
        assert_eq!(
            result
                .diagnostics
                .of_kind(DiagnosticKind::SanitizedCharacter)
                .count(),
            4
        );
    }

    #[test]
    fn snippet_flavor_reads_snippet_fields() {
        let builder = Builder::new()
            .component("U1", "/", &[("SnippetType", "Sensor"), ("SnippetPin2", "SDA")])
            .net(&[("U1", "2", "")]);
        let options = NetlisterOptions {
            flavor: Flavor::Snippet,
            ..Default::default()
        };
        let netlist = group_netlist(&builder.0, options, date()).unwrap().output;
        assert_eq!(netlist.flavor, Flavor::Snippet);
        assert_eq!(net_strings(&netlist), [vec!["Board/Sensor/SDA"]]);
    }

    #[test]
    fn sheet_structure_is_checked() {
        assert!(check_sheets(&["/".into(), "/a/".into(), "/a/b/".into()]).is_ok());
        assert!(matches!(
            check_sheets(&["/".into(), "/a/".into(), "/a/".into()]),
            Err(Error::DuplicateSheetPath(_))
        ));
        assert!(matches!(
            check_sheets(&["/".into(), "/a/b/".into()]),
            Err(Error::MissingParentSheet { parent, .. }) if parent == "/a/"
        ));
    }
}
