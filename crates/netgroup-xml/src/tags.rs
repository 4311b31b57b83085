use netgroup_core::Flavor;

pub(crate) const HEADER: &str = "netlist";
pub(crate) const SOURCES: &str = "sources";
pub(crate) const SOURCE: &str = "source";
pub(crate) const DATE: &str = "date";
pub(crate) const TOOL: &str = "tool";
pub(crate) const PINS: &str = "pins";
pub(crate) const PIN: &str = "pin";
pub(crate) const OTHER_PIN: &str = "otherPin";
pub(crate) const NETS: &str = "nets";
pub(crate) const NET: &str = "net";
pub(crate) const NODE: &str = "node";

/// Tag names that differ between the group and snippet vocabularies.
pub(crate) struct Tags {
    pub netlist: &'static str,
    pub map: &'static str,
    pub groups: &'static str,
    pub group: &'static str,
    pub map_fields: &'static str,
    pub map_field: &'static str,
    pub root_group: &'static str,
    pub root_group_pin: &'static str,
}

const GROUP_TAGS: Tags = Tags {
    netlist: "groupNetlist",
    map: "groupMap",
    groups: "groups",
    group: "group",
    map_fields: "groupMapFields",
    map_field: "groupMapField",
    root_group: "rootGroup",
    root_group_pin: "rootGroupPin",
};

const SNIPPET_TAGS: Tags = Tags {
    netlist: "snippetNetlist",
    map: "snippetMap",
    groups: "snippets",
    group: "snippet",
    map_fields: "snippetMapFields",
    map_field: "snippetMapField",
    root_group: "rootSnippet",
    root_group_pin: "rootSnippetPin",
};

pub(crate) fn tags(flavor: Flavor) -> &'static Tags {
    match flavor {
        Flavor::Group => &GROUP_TAGS,
        Flavor::Snippet => &SNIPPET_TAGS,
    }
}

pub(crate) fn netlist_flavor(root: &str) -> Option<Flavor> {
    [Flavor::Group, Flavor::Snippet]
        .into_iter()
        .find(|f| tags(*f).netlist == root)
}

pub(crate) fn map_flavor(root: &str) -> Option<Flavor> {
    [Flavor::Group, Flavor::Snippet]
        .into_iter()
        .find(|f| tags(*f).map == root)
}
