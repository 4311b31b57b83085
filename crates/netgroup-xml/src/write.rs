use std::{borrow::Cow, collections::BTreeSet, io::Cursor};

use netgroup_core::{
    GlobalPinIdentifier, Group, GroupIdentifier, GroupMap, Net, Netlist, PinName, Provenance,
    netlist::format_date,
};
use quick_xml::{
    Writer,
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event, attributes::Attribute},
    name::QName,
};

use crate::{
    Result, XML_WARNING,
    tags::{self, Tags},
};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Characters a reader normalises away unless they are written as
/// character references.
const TEXT_NORMALISED: &[char] = &['\r'];
const ATTRIBUTE_NORMALISED: &[char] = &['\r', '\n', '\t'];

/// Canonical bytes of a group netlist.
pub fn netlist_to_xml(netlist: &Netlist) -> Result<Vec<u8>> {
    let tags = tags::tags(netlist.flavor);
    let mut writer = open_document(tags.netlist, &netlist.provenance)?;
    write_groups(&mut writer, tags, netlist.groups.values())?;
    write_nets(&mut writer, &netlist.nets)?;
    close_document(writer, tags.netlist)
}

/// Canonical bytes of a one-to-many or many-to-many map.
pub fn map_to_xml(map: &GroupMap) -> Result<Vec<u8>> {
    let tags = tags::tags(map.flavor());
    let mut writer = open_document(tags.map, map.provenance())?;
    match map {
        GroupMap::OneToMany(map) => {
            write_group(&mut writer, tags, tags.root_group, &map.root_group)?;
            write_groups(&mut writer, tags, map.groups.values())?;
        }
        GroupMap::ManyToMany(map) => write_groups(&mut writer, tags, map.groups.values())?,
    }
    close_document(writer, tags.map)
}

/// How the value attached to each pin is written.
trait PinPayload {
    fn write_pin(&self, writer: &mut XmlWriter, tags: &Tags, pin: BytesStart<'_>) -> Result<()>;
}

impl PinPayload for () {
    fn write_pin(&self, writer: &mut XmlWriter, _: &Tags, pin: BytesStart<'_>) -> Result<()> {
        writer.write_event(Event::Empty(pin))?;
        Ok(())
    }
}

impl PinPayload for Option<PinName> {
    fn write_pin(&self, writer: &mut XmlWriter, tags: &Tags, mut pin: BytesStart<'_>) -> Result<()> {
        if let Some(root_pin) = self {
            pin.push_attribute(attribute(tags.root_group_pin, root_pin.as_str()));
        }
        writer.write_event(Event::Empty(pin))?;
        Ok(())
    }
}

impl PinPayload for BTreeSet<GlobalPinIdentifier> {
    fn write_pin(&self, writer: &mut XmlWriter, _: &Tags, pin: BytesStart<'_>) -> Result<()> {
        if self.is_empty() {
            writer.write_event(Event::Empty(pin))?;
            return Ok(());
        }
        writer.write_event(Event::Start(pin))?;
        for other in self {
            writer.write_event(Event::Empty(pin_ref(tags::OTHER_PIN, other)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(tags::PIN)))?;
        Ok(())
    }
}

fn open_document(root: &str, provenance: &Provenance) -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(root)))?;
    writer.write_event(Event::Comment(BytesText::from_escaped(XML_WARNING)))?;

    writer.write_event(Event::Start(BytesStart::new(tags::HEADER)))?;
    if provenance.sources.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tags::SOURCES)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(tags::SOURCES)))?;
        for source in &provenance.sources {
            text_element(
                &mut writer,
                BytesStart::new(tags::SOURCE),
                &source.to_string_lossy(),
            )?;
        }
        writer.write_event(Event::End(BytesEnd::new(tags::SOURCES)))?;
    }
    text_element(
        &mut writer,
        BytesStart::new(tags::DATE),
        &format_date(&provenance.date),
    )?;
    text_element(&mut writer, BytesStart::new(tags::TOOL), &provenance.tool)?;
    writer.write_event(Event::End(BytesEnd::new(tags::HEADER)))?;
    Ok(writer)
}

fn close_document(mut writer: XmlWriter, root: &str) -> Result<Vec<u8>> {
    writer.write_event(Event::End(BytesEnd::new(root)))?;
    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn text_element(writer: &mut XmlWriter, start: BytesStart<'_>, text: &str) -> Result<()> {
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape_with(
        text,
        TEXT_NORMALISED,
    ))))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

/// XML-escape `raw`, writing each of `normalised` as a character reference.
fn escape_with<'a>(raw: &'a str, normalised: &[char]) -> Cow<'a, str> {
    let escaped = escape(raw);
    if !escaped.contains(normalised) {
        return escaped;
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        if normalised.contains(&c) {
            out.push_str(&format!("&#x{:X};", u32::from(c)));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn attribute<'a>(key: &'a str, value: &'a str) -> Attribute<'a> {
    let value = match escape_with(value, ATTRIBUTE_NORMALISED) {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    };
    Attribute {
        key: QName(key.as_bytes()),
        value,
    }
}

fn with_id<'a>(mut start: BytesStart<'a>, id: &GroupIdentifier) -> BytesStart<'a> {
    start.push_attribute(attribute("schematic", id.schematic.as_str()));
    start.push_attribute(attribute("path", id.path.as_str()));
    start.push_attribute(attribute("type", id.group_type.as_str()));
    start
}

fn pin_ref<'a>(tag: &'a str, pin: &GlobalPinIdentifier) -> BytesStart<'a> {
    let mut start = with_id(BytesStart::new(tag), &pin.group);
    start.push_attribute(attribute("pin", pin.pin.as_str()));
    start
}

fn write_groups<'a, P: PinPayload + 'a>(
    writer: &mut XmlWriter,
    tags: &Tags,
    groups: impl Iterator<Item = &'a Group<P>>,
) -> Result<()> {
    let mut groups: Vec<_> = groups.collect();
    if groups.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tags.groups)))?;
        return Ok(());
    }
    groups.sort_by_cached_key(|group| group.id.stringify());
    writer.write_event(Event::Start(BytesStart::new(tags.groups)))?;
    for group in groups {
        write_group(writer, tags, tags.group, group)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tags.groups)))?;
    Ok(())
}

fn write_group<P: PinPayload>(
    writer: &mut XmlWriter,
    tags: &Tags,
    tag: &str,
    group: &Group<P>,
) -> Result<()> {
    writer.write_event(Event::Start(with_id(BytesStart::new(tag), &group.id)))?;

    if group.group_map_fields.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tags.map_fields)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(tags.map_fields)))?;
        for (name, value) in &group.group_map_fields {
            let mut field = BytesStart::new(tags.map_field);
            field.push_attribute(attribute("name", name.as_str()));
            text_element(writer, field, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new(tags.map_fields)))?;
    }

    if group.pins.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tags::PINS)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(tags::PINS)))?;
        for (name, payload) in &group.pins {
            let mut pin = BytesStart::new(tags::PIN);
            pin.push_attribute(attribute("name", name.as_str()));
            payload.write_pin(writer, tags, pin)?;
        }
        writer.write_event(Event::End(BytesEnd::new(tags::PINS)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_net<W: std::io::Write>(writer: &mut Writer<W>, net: &Net) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tags::NET)))?;
    for pin in net {
        writer.write_event(Event::Empty(pin_ref(tags::NODE, pin)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(tags::NET)))?;
    Ok(())
}

/// Nets are ordered by their own unindented serialisation.
fn write_nets(writer: &mut XmlWriter, nets: &BTreeSet<Net>) -> Result<()> {
    if nets.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tags::NETS)))?;
        return Ok(());
    }
    let mut keyed = nets
        .iter()
        .map(|net| -> Result<(Vec<u8>, &Net)> {
            let mut compact = Writer::new(Vec::new());
            write_net(&mut compact, net)?;
            Ok((compact.into_inner(), net))
        })
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    writer.write_event(Event::Start(BytesStart::new(tags::NETS)))?;
    for (_, net) in keyed {
        write_net(writer, net)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tags::NETS)))?;
    Ok(())
}
