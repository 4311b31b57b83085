//! Connectivity maps derived from a netlist.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use itertools::Itertools;

use crate::{
    Error, Flavor, GlobalPinIdentifier, GroupGlob, GroupIdentifier, Netlist, PinName, Provenance,
    Result,
    diagnostics::{DiagnosticKind, Diagnostics, WithDiagnostics},
    glob,
    netlist::{ConnectedGroup, NetlistGroup, RootMappedGroup},
};

/// Connectivity relative to one root group: every other group's pin names the
/// root pin it is wired to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToManyMap {
    pub flavor: Flavor,
    pub provenance: Provenance,
    pub root_group: NetlistGroup,
    pub groups: BTreeMap<GroupIdentifier, RootMappedGroup>,
}

/// Pin-to-pins connectivity with no distinguished root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToManyMap {
    pub flavor: Flavor,
    pub provenance: Provenance,
    pub groups: BTreeMap<GroupIdentifier, ConnectedGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMap {
    OneToMany(OneToManyMap),
    ManyToMany(ManyToManyMap),
}

impl GroupMap {
    pub fn flavor(&self) -> Flavor {
        match self {
            GroupMap::OneToMany(map) => map.flavor,
            GroupMap::ManyToMany(map) => map.flavor,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            GroupMap::OneToMany(map) => &map.provenance,
            GroupMap::ManyToMany(map) => &map.provenance,
        }
    }
}

/// Build the one-to-many map around `root`.
///
/// A net touching two or more root pins cannot be expressed as a fan-out: it
/// is left out of the map, its root pins are dropped from the root group and
/// a warning names them.
pub fn one_to_many(
    netlist: &Netlist,
    root: &GroupIdentifier,
    date: NaiveDateTime,
) -> Result<WithDiagnostics<OneToManyMap>> {
    netlist.validate()?;
    let mut root_group = netlist
        .group(root)
        .ok_or_else(|| Error::RootGroupNotFound {
            root: root.stringify(),
            known: netlist.group_names(),
            type_field: netlist.flavor.type_field(),
        })?
        .clone();

    let mut groups: BTreeMap<_, RootMappedGroup> = netlist
        .groups
        .iter()
        .filter(|(id, _)| *id != root)
        .map(|(id, group)| (id.clone(), group.map_pins(|_, _| None)))
        .collect();

    let mut diagnostics = Diagnostics::default();
    for net in &netlist.nets {
        let root_pins: Vec<&PinName> = net
            .iter()
            .filter(|p| &p.group == root)
            .map(|p| &p.pin)
            .collect();
        match root_pins.as_slice() {
            [] => {}
            [root_pin] => {
                for pin in net.iter().filter(|p| &p.group != root) {
                    if let Some(slot) = groups
                        .get_mut(&pin.group)
                        .and_then(|group| group.pins.get_mut(&pin.pin))
                    {
                        *slot = Some((*root_pin).clone());
                    }
                }
            }
            colliding => {
                diagnostics.warn(
                    DiagnosticKind::RootPinCollision,
                    format!(
                        "Pins {} of the root {} {} are connected together; their net is left out of the map",
                        colliding.iter().join(", "),
                        netlist.flavor.noun(),
                        root,
                    ),
                );
                for pin in colliding {
                    root_group.pins.remove(*pin);
                }
            }
        }
    }

    Ok(WithDiagnostics::new(
        OneToManyMap {
            flavor: netlist.flavor,
            provenance: netlist.provenance.derive(date),
            root_group,
            groups,
        },
        diagnostics,
    ))
}

/// Build the many-to-many map.
///
/// With a `subject` glob only matching groups are kept, and links between two
/// matching groups are hidden. Partner sets are then simplified with
/// [`simplify_pins`].
pub fn many_to_many(
    netlist: &Netlist,
    subject: Option<&GroupGlob>,
    simplify: &BTreeSet<PinName>,
    date: NaiveDateTime,
) -> Result<WithDiagnostics<ManyToManyMap>> {
    let connected = netlist.connect()?;
    let mut groups: BTreeMap<_, _> = connected
        .groups
        .into_iter()
        .filter(|(id, _)| glob::matches(subject, id, true))
        .collect();
    for group in groups.values_mut() {
        for partners in group.pins.values_mut() {
            partners.retain(|p| !glob::matches(subject, &p.group, false));
        }
    }

    let mut diagnostics = Diagnostics::default();
    simplify_pins(&mut groups, simplify, &mut diagnostics);

    Ok(WithDiagnostics::new(
        ManyToManyMap {
            flavor: netlist.flavor,
            provenance: netlist.provenance.derive(date),
            groups,
        },
        diagnostics,
    ))
}

/// Collapse partner sets that reach a pin whose name contains one of
/// `substrings` into a single pin of [`GroupIdentifier::simplified`].
///
/// Partners are tried in ascending order and substrings in ascending order;
/// the first hit wins.
pub fn simplify_pins(
    groups: &mut BTreeMap<GroupIdentifier, ConnectedGroup>,
    substrings: &BTreeSet<PinName>,
    diagnostics: &mut Diagnostics,
) {
    if substrings.is_empty() {
        return;
    }
    for group in groups.values_mut() {
        for partners in group.pins.values_mut() {
            let found = partners.iter().find_map(|partner| {
                substrings
                    .iter()
                    .find(|s| partner.pin.as_str().contains(s.as_str()))
                    .map(|s| (partner, s))
            });
            if let Some((partner, substring)) = found {
                diagnostics.warn(
                    DiagnosticKind::PinSimplified,
                    format!("Simplifying {partner} to {substring}"),
                );
                let replacement =
                    GlobalPinIdentifier::new(GroupIdentifier::simplified(), substring.clone());
                *partners = BTreeSet::from([replacement]);
            }
        }
    }
}
