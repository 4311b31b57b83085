use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::{Error, GlobalPinIdentifier, GroupIdentifier, PinName, Result};

/// Which vocabulary a document uses. Both describe the same model; the
/// flavor only changes field prefixes and XML tag names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    #[default]
    Group,
    Snippet,
}

impl Flavor {
    /// Component field naming the group a component belongs to.
    pub fn type_field(self) -> &'static str {
        match self {
            Flavor::Group => "GroupType",
            Flavor::Snippet => "SnippetType",
        }
    }

    /// Prefix of component fields that name explicit group pins.
    pub fn pin_field_prefix(self) -> &'static str {
        match self {
            Flavor::Group => "GroupPin",
            Flavor::Snippet => "SnippetPin",
        }
    }

    /// Prefix of component fields copied into `group_map_fields`.
    pub fn map_field_prefix(self) -> &'static str {
        match self {
            Flavor::Group => "GroupMapField",
            Flavor::Snippet => "SnippetMapField",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Flavor::Group => "group",
            Flavor::Snippet => "snippet",
        }
    }
}

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub sources: BTreeSet<PathBuf>,
    pub date: NaiveDateTime,
    pub tool: String,
}

impl Provenance {
    pub fn new(sources: impl IntoIterator<Item = PathBuf>, date: NaiveDateTime) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            date,
            tool: crate::TOOL_NAME.to_string(),
        }
    }

    /// A fresh provenance for a document derived from `self`.
    pub fn derive(&self, date: NaiveDateTime) -> Self {
        Self::new(self.sources.iter().cloned(), date)
    }
}

/// ISO-8601 without offset; the fractional part is written only when the
/// timestamp has one, and only to microsecond precision.
pub fn format_date(date: &NaiveDateTime) -> String {
    let micros = date.nanosecond() / 1_000;
    if micros == 0 {
        date.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        format!("{}.{micros:06}", date.format("%Y-%m-%dT%H:%M:%S"))
    }
}

/// A group of one of the three shapes used by netlists and maps:
///
/// * `Group<()>`: a netlist group, pins are only declared.
/// * `Group<Option<PinName>>`: a one-to-many group, pins map to the root pin
///   they are tied to.
/// * `Group<BTreeSet<GlobalPinIdentifier>>`: a connected or many-to-many group,
///   pins map to the pins they share a net with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group<P> {
    #[serde(flatten)]
    pub id: GroupIdentifier,
    pub group_map_fields: BTreeMap<String, String>,
    pub pins: BTreeMap<PinName, P>,
}

pub type NetlistGroup = Group<()>;
pub type RootMappedGroup = Group<Option<PinName>>;
pub type ConnectedGroup = Group<BTreeSet<GlobalPinIdentifier>>;

impl<P> Group<P> {
    pub fn new(id: GroupIdentifier) -> Self {
        Self {
            id,
            group_map_fields: BTreeMap::new(),
            pins: BTreeMap::new(),
        }
    }

    pub fn add_pin(&mut self, pin: PinName, value: P) -> Result<()> {
        if self.pins.contains_key(&pin) {
            return Err(Error::DuplicatePinName {
                group: self.id.clone(),
                pin: pin.to_string(),
            });
        }
        self.pins.insert(pin, value);
        Ok(())
    }

    pub fn global_pin(&self, pin: &PinName) -> GlobalPinIdentifier {
        GlobalPinIdentifier::new(self.id.clone(), pin.clone())
    }

    /// Same identity and fields, pins re-valued by `f`.
    pub fn map_pins<Q>(&self, mut f: impl FnMut(&PinName, &P) -> Q) -> Group<Q> {
        Group {
            id: self.id.clone(),
            group_map_fields: self.group_map_fields.clone(),
            pins: self
                .pins
                .iter()
                .map(|(name, value)| (name.clone(), f(name, value)))
                .collect(),
        }
    }
}

/// Pins that are electrically the same node. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Net(BTreeSet<GlobalPinIdentifier>);

impl Net {
    pub fn new(pins: impl IntoIterator<Item = GlobalPinIdentifier>) -> Result<Self> {
        let pins: BTreeSet<_> = pins.into_iter().collect();
        if pins.is_empty() {
            return Err(Error::EmptyNet);
        }
        Ok(Self(pins))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobalPinIdentifier> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Net {
    type Item = &'a GlobalPinIdentifier;
    type IntoIter = std::collections::btree_set::Iter<'a, GlobalPinIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Groups and the nets between their pins.
///
/// Nets partition the pins they mention: a pin is in at most one net. Call
/// [`Netlist::validate`] after building a netlist by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Netlist {
    pub flavor: Flavor,
    pub provenance: Provenance,
    pub groups: BTreeMap<GroupIdentifier, NetlistGroup>,
    pub nets: BTreeSet<Net>,
}

impl Netlist {
    pub fn new(flavor: Flavor, provenance: Provenance) -> Self {
        Self {
            flavor,
            provenance,
            groups: BTreeMap::new(),
            nets: BTreeSet::new(),
        }
    }

    pub fn add_group(&mut self, group: NetlistGroup) -> Result<()> {
        if self.groups.contains_key(&group.id) {
            return Err(Error::DuplicateGroup(group.id));
        }
        self.groups.insert(group.id.clone(), group);
        Ok(())
    }

    pub fn group(&self, id: &GroupIdentifier) -> Option<&NetlistGroup> {
        self.groups.get(id)
    }

    /// Known group identifiers in canonical string order.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.groups.keys().map(|id| id.stringify()).collect();
        names.sort();
        names
    }

    pub fn has_pin(&self, pin: &GlobalPinIdentifier) -> bool {
        self.groups
            .get(&pin.group)
            .is_some_and(|group| group.pins.contains_key(&pin.pin))
    }

    /// Map every pin that is on a net to that net, checking that nets only
    /// mention declared pins and never share one.
    pub fn net_index(&self) -> Result<BTreeMap<&GlobalPinIdentifier, &Net>> {
        let mut index = BTreeMap::new();
        for net in &self.nets {
            for pin in net {
                if !self.has_pin(pin) {
                    return Err(Error::UnknownPin(pin.clone()));
                }
                if index.insert(pin, net).is_some() {
                    return Err(Error::PinInMultipleNets(pin.clone()));
                }
            }
        }
        Ok(index)
    }

    pub fn validate(&self) -> Result<()> {
        self.net_index().map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use super::*;

    pub fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    pub fn gid(s: &str) -> GroupIdentifier {
        s.parse().unwrap()
    }

    pub fn pin(group: &str, pin: &str) -> GlobalPinIdentifier {
        GlobalPinIdentifier::new(gid(group), PinName::new(pin).unwrap())
    }

    /// Build a netlist from `(group, pins)` and nets of `"group/..:pin"` refs.
    pub fn netlist(groups: &[(&str, &[&str])], nets: &[&[(&str, &str)]]) -> Netlist {
        let mut netlist = Netlist::new(
            Flavor::Group,
            Provenance::new([PathBuf::from("test.kicad_sch")], date()),
        );
        for (id, pins) in groups {
            let mut group = Group::new(gid(id));
            for p in *pins {
                group.add_pin(PinName::new(p).unwrap(), ()).unwrap();
            }
            netlist.add_group(group).unwrap();
        }
        for net in nets {
            netlist
                .nets
                .insert(Net::new(net.iter().map(|(g, p)| pin(g, p))).unwrap());
        }
        netlist
    }
}
