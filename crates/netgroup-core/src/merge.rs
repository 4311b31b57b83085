//! Merging per-schematic netlists and joining them through connectors.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use itertools::Itertools;
use petgraph::unionfind::UnionFind;

use crate::{
    Error, GlobalPinIdentifier, GroupGlob, GroupIdentifier, Net, Netlist, PinName, Provenance,
    Result,
    diagnostics::{DiagnosticKind, Diagnostics, WithDiagnostics},
    netlist::NetlistGroup,
};

/// Decides which pins of two connected groups are wired together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PinMapping {
    /// Pins with the same name.
    #[default]
    Equal,
    /// Odd pin `n` on one side meets pin `n + 1` on the other, as on a
    /// board-to-board connector mated face to face. Pin names must be integers.
    EvenOdd,
}

impl PinMapping {
    /// Reject groups whose pins this mapping cannot interpret.
    pub fn check(self, group: &NetlistGroup) -> Result<()> {
        if self == PinMapping::EvenOdd {
            for pin in group.pins.keys() {
                numeric(group, pin)?;
            }
        }
        Ok(())
    }

    pub fn joins(self, a: &PinName, b: &PinName) -> bool {
        match self {
            PinMapping::Equal => a == b,
            PinMapping::EvenOdd => {
                let (Ok(a), Ok(b)) = (a.as_str().parse::<i128>(), b.as_str().parse::<i128>())
                else {
                    return false;
                };
                (is_odd(a) && a.checked_add(1) == Some(b))
                    || (is_odd(b) && b.checked_add(1) == Some(a))
            }
        }
    }
}

fn is_odd(n: i128) -> bool {
    n.rem_euclid(2) == 1
}

fn numeric(group: &NetlistGroup, pin: &PinName) -> Result<i128> {
    pin.as_str().parse().map_err(|_| Error::NonNumericPin {
        group: group.id.clone(),
        pin: pin.to_string(),
    })
}

/// Union of netlists that must not share sources, groups or nets.
pub fn merge_netlists(netlists: Vec<Netlist>, date: NaiveDateTime) -> Result<Netlist> {
    let mut netlists = netlists.into_iter();
    let first = netlists.next().ok_or(Error::NoNetlists)?;
    let mut merged = Netlist {
        flavor: first.flavor,
        provenance: Provenance::new(first.provenance.sources, date),
        groups: first.groups,
        nets: first.nets,
    };

    for next in netlists {
        if next.flavor != merged.flavor {
            return Err(Error::MixedFlavors {
                first: merged.flavor.noun(),
                second: next.flavor.noun(),
            });
        }
        for source in next.provenance.sources {
            if merged.provenance.sources.contains(&source) {
                return Err(Error::DuplicateAcrossSchematics {
                    what: "source",
                    key: source.display().to_string(),
                });
            }
            merged.provenance.sources.insert(source);
        }
        for (id, group) in next.groups {
            if merged.groups.contains_key(&id) {
                return Err(Error::DuplicateAcrossSchematics {
                    what: "group",
                    key: id.stringify(),
                });
            }
            merged.groups.insert(id, group);
        }
        for net in next.nets {
            if merged.nets.contains(&net) {
                return Err(Error::DuplicateAcrossSchematics {
                    what: "net",
                    key: net.iter().join(", "),
                });
            }
            merged.nets.insert(net);
        }
    }
    Ok(merged)
}

/// Join nets across the groups matched by each connector glob.
///
/// Two nets merge when a connect-set holds a pin of one and a pin of the
/// other on different groups and `mapping` joins the two pin names. Merging
/// is closed transitively over all connect-sets.
pub fn connect_netlist(
    mut netlist: Netlist,
    connectors: &[GroupGlob],
    mapping: PinMapping,
) -> Result<WithDiagnostics<Netlist>> {
    let mut diagnostics = Diagnostics::default();
    let mut connect_sets: Vec<Vec<GroupIdentifier>> = Vec::with_capacity(connectors.len());
    for glob in connectors {
        let members: Vec<&NetlistGroup> = netlist
            .groups
            .values()
            .filter(|group| glob.is_match(&group.id))
            .collect();
        if let Some((first, rest)) = members.split_first() {
            if let Some(other) = rest.iter().find(|g| !g.pins.keys().eq(first.pins.keys())) {
                return Err(Error::IncompatiblePinSets {
                    glob: glob.as_str().to_string(),
                    first: first.id.clone(),
                    second: other.id.clone(),
                });
            }
        }
        if members.len() < 2 {
            diagnostics.warn(
                DiagnosticKind::SparseConnectSet,
                format!(
                    "The connector glob {} matches fewer than two {}s: [{}]",
                    glob.as_str(),
                    netlist.flavor.noun(),
                    members.iter().map(|g| &g.id).join(", "),
                ),
            );
        }
        for member in &members {
            mapping.check(member)?;
        }
        log::debug!(
            "Connecting {}",
            members.iter().map(|g| &g.id).join(", ")
        );
        connect_sets.push(members.iter().map(|g| g.id.clone()).collect());
    }

    netlist.validate()?;
    let nets: Vec<Net> = std::mem::take(&mut netlist.nets).into_iter().collect();
    let owner: BTreeMap<&GlobalPinIdentifier, usize> = nets
        .iter()
        .enumerate()
        .flat_map(|(index, net)| net.iter().map(move |pin| (pin, index)))
        .collect();

    let mut components = UnionFind::<usize>::new(nets.len());
    for set in &connect_sets {
        for (a, b) in set.iter().tuple_combinations() {
            let (Some(group_a), Some(group_b)) = (netlist.groups.get(a), netlist.groups.get(b))
            else {
                continue;
            };
            for pin_a in group_a.pins.keys() {
                let Some(&net_a) = owner.get(&group_a.global_pin(pin_a)) else {
                    continue;
                };
                for pin_b in group_b.pins.keys().filter(|pin| mapping.joins(pin_a, pin)) {
                    if let Some(&net_b) = owner.get(&group_b.global_pin(pin_b)) {
                        components.union(net_a, net_b);
                    }
                }
            }
        }
    }

    let labels = components.into_labeling();
    let mut merged: BTreeMap<usize, BTreeSet<GlobalPinIdentifier>> = BTreeMap::new();
    for (index, net) in nets.iter().enumerate() {
        merged
            .entry(labels[index])
            .or_default()
            .extend(net.iter().cloned());
    }
    netlist.nets = merged
        .into_values()
        .map(Net::new)
        .collect::<Result<BTreeSet<_>>>()?;

    Ok(WithDiagnostics::new(netlist, diagnostics))
}
