use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    Error, Flavor, GlobalPinIdentifier, GroupGlob, GroupIdentifier, Netlist, PinName, Provenance,
    Result,
    diagnostics::{DiagnosticKind, Diagnostics},
    netlist::ConnectedGroup,
};

/// A netlist with connectivity folded into the groups: every pin maps to the
/// other pins on its net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectedNetlist {
    pub flavor: Flavor,
    pub provenance: Provenance,
    pub groups: BTreeMap<GroupIdentifier, ConnectedGroup>,
}

impl Netlist {
    /// Derive the connected view. Pins on no net get an empty partner set.
    pub fn connect(&self) -> Result<ConnectedNetlist> {
        let index = self.net_index()?;
        let groups: BTreeMap<_, _> = self
            .groups
            .iter()
            .map(|(id, group)| {
                let connected = group.map_pins(|name, _| {
                    let me = GlobalPinIdentifier::new(id.clone(), name.clone());
                    index
                        .get(&me)
                        .map(|net| {
                            net.iter()
                                .filter(|p| **p != me)
                                .cloned()
                                .collect::<BTreeSet<_>>()
                        })
                        .unwrap_or_default()
                });
                (id.clone(), connected)
            })
            .collect();
        Ok(ConnectedNetlist {
            flavor: self.flavor,
            provenance: self.provenance.clone(),
            groups,
        })
    }
}

impl ConnectedNetlist {
    pub fn group(&self, id: &GroupIdentifier) -> Option<&ConnectedGroup> {
        self.groups.get(id)
    }

    /// Groups matching `glob`, in canonical string order.
    pub fn glob_groups(&self, glob: &GroupGlob) -> Vec<&ConnectedGroup> {
        let mut groups: Vec<_> = self
            .groups
            .values()
            .filter(|group| glob.is_match(&group.id))
            .collect();
        groups.sort_by_cached_key(|group| group.id.stringify());
        groups
    }
}

impl ConnectedGroup {
    /// Every pin of the group with its partners narrowed to groups matching
    /// `glob`. Pins without a matching partner map to an empty list.
    pub fn pins_to_glob(&self, glob: &GroupGlob) -> BTreeMap<&PinName, Vec<&GlobalPinIdentifier>> {
        self.pins
            .iter()
            .map(|(name, partners)| {
                let matching = partners
                    .iter()
                    .filter(|p| glob.is_match(&p.group))
                    .collect();
                (name, matching)
            })
            .collect()
    }

    /// The one partner of `pin` in a group matching `glob`.
    ///
    /// When several partners qualify the smallest identifier wins and a
    /// warning names all of them.
    pub fn single_pin_to_glob(
        &self,
        pin: &PinName,
        glob: &GroupGlob,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<&GlobalPinIdentifier>> {
        let partners = self
            .pins
            .get(pin)
            .ok_or_else(|| Error::UnknownPin(self.global_pin(pin)))?;
        let candidates: BTreeSet<&GlobalPinIdentifier> = partners
            .iter()
            .filter(|p| glob.is_match(&p.group))
            .collect();
        if candidates.len() > 1 {
            diagnostics.warn(
                DiagnosticKind::AmbiguousPin,
                format!(
                    "The pins {} on {} are connected together; only {} is used for {}",
                    candidates.iter().join(", "),
                    glob.as_str(),
                    candidates.iter().next().map(|p| p.to_string()).unwrap_or_default(),
                    self.global_pin(pin),
                ),
            );
        }
        Ok(candidates.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::test_support::*;

    fn sample() -> Netlist {
        netlist(
            &[
                ("S/mcu/MCU", &["TX", "RX", "NC"]),
                ("S/conn/Header", &["1", "2"]),
                ("S/dbg/Probe", &["T"]),
            ],
            &[
                &[("S/mcu/MCU", "TX"), ("S/conn/Header", "1"), ("S/dbg/Probe", "T")],
                &[("S/mcu/MCU", "RX"), ("S/conn/Header", "2")],
            ],
        )
    }

    #[test]
    fn partners_exclude_self_and_unconnected_pins_are_empty() {
        let connected = sample().connect().unwrap();
        let mcu = connected.group(&gid("S/mcu/MCU")).unwrap();
        assert_eq!(
            mcu.pins[&PinName::new("TX").unwrap()],
            BTreeSet::from([pin("S/conn/Header", "1"), pin("S/dbg/Probe", "T")])
        );
        assert!(mcu.pins[&PinName::new("NC").unwrap()].is_empty());
    }

    #[test]
    fn connectivity_is_symmetric() {
        let connected = sample().connect().unwrap();
        for group in connected.groups.values() {
            for (name, partners) in &group.pins {
                let me = group.global_pin(name);
                for partner in partners {
                    let back = &connected.groups[&partner.group].pins[&partner.pin];
                    assert!(back.contains(&me), "{partner} does not see {me}");
                }
            }
        }
    }

    #[test]
    fn connect_checks_the_partition() {
        let broken = netlist(
            &[("S/A", &["1"]), ("S/B", &["1"])],
            &[&[("S/A", "1")], &[("S/A", "1"), ("S/B", "1")]],
        );
        assert!(matches!(
            broken.connect(),
            Err(Error::PinInMultipleNets(_))
        ));
    }

    #[test]
    fn pins_to_glob_filters_partners() {
        let connected = sample().connect().unwrap();
        let mcu = connected.group(&gid("S/mcu/MCU")).unwrap();
        let glob = GroupGlob::compile("S/conn/*").unwrap();
        let filtered = mcu.pins_to_glob(&glob);
        assert_eq!(filtered.len(), 3);
        assert_eq!(
            filtered[&PinName::new("TX").unwrap()],
            [&pin("S/conn/Header", "1")]
        );
        assert!(filtered[&PinName::new("NC").unwrap()].is_empty());
    }

    #[test]
    fn single_pin_prefers_smallest_candidate_and_warns() {
        let connected = sample().connect().unwrap();
        let mcu = connected.group(&gid("S/mcu/MCU")).unwrap();
        let tx = PinName::new("TX").unwrap();
        let mut diagnostics = Diagnostics::default();

        let everything = GroupGlob::compile("**").unwrap();
        let chosen = mcu
            .single_pin_to_glob(&tx, &everything, &mut diagnostics)
            .unwrap();
        assert_eq!(chosen, Some(&pin("S/conn/Header", "1")));
        assert_eq!(diagnostics.of_kind(DiagnosticKind::AmbiguousPin).count(), 1);

        let nothing = GroupGlob::compile("Other/**").unwrap();
        let mut quiet = Diagnostics::default();
        assert_eq!(
            mcu.single_pin_to_glob(&tx, &nothing, &mut quiet).unwrap(),
            None
        );
        assert!(quiet.is_empty());

        let unknown = PinName::new("VCC").unwrap();
        assert!(
            mcu.single_pin_to_glob(&unknown, &everything, &mut quiet)
                .is_err()
        );
    }

    #[test]
    fn glob_groups_sorts_by_canonical_string() {
        let connected = sample().connect().unwrap();
        let all = GroupGlob::compile("S/**").unwrap();
        let names: Vec<_> = connected
            .glob_groups(&all)
            .iter()
            .map(|g| g.id.stringify())
            .collect();
        assert_eq!(names, ["S/conn/Header", "S/dbg/Probe", "S/mcu/MCU"]);
    }
}
