use std::{collections::BTreeSet, fs};

use chrono::{NaiveDate, NaiveDateTime};
use netgroup_core::{
    Flavor, GlobalPinIdentifier, Group, GroupGlob, GroupIdentifier, GroupMap, Net, Netlist,
    PinName, Provenance,
    diagnostics::DiagnosticKind,
    map::many_to_many,
};
use netgroup_export::{
    ExportError, codegen,
    csv::{map_to_csv, netlist_to_csv},
};
use tempfile::TempDir;

fn date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 17)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn gid(s: &str) -> GroupIdentifier {
    s.parse().unwrap()
}

fn pin(group: &str, pin: &str) -> GlobalPinIdentifier {
    GlobalPinIdentifier::new(gid(group), PinName::new(pin).unwrap())
}

/// A header wired to an MCU and an LDO, sharing ground.
fn board() -> Netlist {
    let mut netlist = Netlist::new(
        Flavor::Group,
        Provenance {
            sources: ["main.kicad_sch".into()].into_iter().collect(),
            date: date(),
            tool: "netgroup test".to_string(),
        },
    );
    let groups: [(&str, &[&str]); 3] = [
        ("main/conn/Header", &["1", "2", "3"]),
        ("main/mcu/MCU", &["GND", "TX", "RX"]),
        ("main/power/LDO", &["GND", "VOUT"]),
    ];
    for (id, pins) in groups {
        let mut group = Group::new(gid(id));
        for name in pins {
            group.add_pin(PinName::new(name).unwrap(), ()).unwrap();
        }
        netlist.add_group(group).unwrap();
    }
    let nets: [&[(&str, &str)]; 3] = [
        &[("main/conn/Header", "1"), ("main/mcu/MCU", "TX")],
        &[
            ("main/conn/Header", "2"),
            ("main/mcu/MCU", "GND"),
            ("main/power/LDO", "GND"),
        ],
        &[("main/conn/Header", "3"), ("main/power/LDO", "VOUT")],
    ];
    for net in nets {
        netlist
            .nets
            .insert(Net::new(net.iter().map(|(g, p)| pin(g, p))).unwrap());
    }
    netlist.validate().unwrap();
    netlist
}

#[test]
fn netlist_csv_lists_every_pin() {
    let csv = netlist_to_csv(&board(), None, &BTreeSet::new(), date()).unwrap();
    assert!(csv.diagnostics.is_empty());
    insta::assert_snapshot!(csv.output, @r"
    schematic,group_path,group_type,pin_name,other_pins
    main,/conn/,Header,1,main/mcu/MCU/TX
    main,/conn/,Header,2,main/mcu/MCU/GND|main/power/LDO/GND
    main,/conn/,Header,3,main/power/LDO/VOUT
    main,/mcu/,MCU,GND,main/conn/Header/2|main/power/LDO/GND
    main,/mcu/,MCU,RX,
    main,/mcu/,MCU,TX,main/conn/Header/1
    main,/power/,LDO,GND,main/conn/Header/2|main/mcu/MCU/GND
    main,/power/,LDO,VOUT,main/conn/Header/3
    ");
}

#[test]
fn netlist_csv_focuses_and_simplifies() {
    let subject = GroupGlob::compile("main/conn/*").unwrap();
    let simplify = BTreeSet::from([PinName::new("GND").unwrap()]);
    let csv = netlist_to_csv(&board(), Some(&subject), &simplify, date()).unwrap();
    assert_eq!(
        csv.diagnostics
            .of_kind(DiagnosticKind::PinSimplified)
            .count(),
        1
    );
    insta::assert_snapshot!(csv.output, @r"
    schematic,group_path,group_type,pin_name,other_pins
    main,/conn/,Header,1,main/mcu/MCU/TX
    main,/conn/,Header,2,This_was/Simplified/Away/GND
    main,/conn/,Header,3,main/power/LDO/VOUT
    ");
}

#[test]
fn map_csv_matches_netlist_csv() {
    let map = many_to_many(&board(), None, &BTreeSet::new(), date())
        .unwrap()
        .output;
    let direct = netlist_to_csv(&board(), None, &BTreeSet::new(), date())
        .unwrap()
        .output;
    assert_eq!(map_to_csv(&GroupMap::ManyToMany(map)).unwrap(), direct);
}

fn write_templates(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in files {
        fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}

#[test]
fn template_uses_helpers_and_includes() {
    let dir = write_templates(&[
        (
            "main.j2",
            r#"// {{ netlist.tool }}
{% for group in glob_groups("main/*/*") %}
{{ stringify_id(group) }} in {{ get_parent_path(group.path) }} as {{ camel_case(group.type) }}
{% endfor %}
{% set header = glob_groups("main/conn/*")[0] %}
{% for pin in header.pins %}
{% set mcu = single_pin_to_glob(header, pin, "main/mcu/*") %}
{{ pin }} -> {{ "-" if mcu is none else mcu.pin }}
{% endfor %}
{% include "footer.j2" %}
"#,
        ),
        ("footer.j2", "// end {{ pascal_case(\"group netlist\") }}\n"),
    ]);

    let rendered = codegen::render(&board(), &dir.path().join("main.j2"), None).unwrap();
    assert!(rendered.diagnostics.is_empty());
    insta::assert_snapshot!(rendered.output, @r"
    // netgroup test
    main/conn/Header in / as header
    main/mcu/MCU in / as mcu
    main/power/LDO in / as ldo
    1 -> TX
    2 -> GND
    3 -> -
    // end GroupNetlist
    ");
}

#[test]
fn ambiguous_pin_lookup_warns() {
    let dir = write_templates(&[(
        "pick.j2",
        r#"{{ single_pin_to_glob(glob_groups("main/conn/*")[0], "2", "main/*/*").pin }}"#,
    )]);
    let rendered = codegen::render(&board(), &dir.path().join("pick.j2"), None).unwrap();
    assert_eq!(rendered.output, "GND");
    assert_eq!(
        rendered
            .diagnostics
            .of_kind(DiagnosticKind::AmbiguousPin)
            .count(),
        1
    );
}

#[test]
fn pins_to_glob_lists_partners_per_pin() {
    let dir = write_templates(&[(
        "pins.j2",
        r#"{% for pin, partners in pins_to_glob(glob_groups("main/mcu/*")[0], "main/power/*")|items %}
{{ pin }}={{ partners|length }}
{% endfor %}"#,
    )]);
    let rendered = codegen::render(&board(), &dir.path().join("pins.j2"), None).unwrap();
    assert_eq!(rendered.output, "GND=1\nRX=0\nTX=0\n");
}

#[test]
fn undefined_values_are_errors() {
    let dir = write_templates(&[("bad.j2", "{{ no_such_thing }}")]);
    assert!(matches!(
        codegen::render(&board(), &dir.path().join("bad.j2"), None),
        Err(ExportError::Template(_))
    ));
}

#[test]
fn template_must_be_inside_template_dir() {
    let templates = write_templates(&[("main.j2", "")]);
    let elsewhere = TempDir::new().unwrap();
    assert!(matches!(
        codegen::render(
            &board(),
            &templates.path().join("main.j2"),
            Some(elsewhere.path())
        ),
        Err(ExportError::TemplateOutsideDir { .. })
    ));
}

#[test]
fn helper_errors_abort_rendering() {
    let dir = write_templates(&[("root.j2", r#"{{ get_parent_path("/") }}"#)]);
    assert!(matches!(
        codegen::render(&board(), &dir.path().join("root.j2"), None),
        Err(ExportError::Template(_))
    ));
}
