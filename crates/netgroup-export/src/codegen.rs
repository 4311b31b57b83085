//! Source generation from a group netlist through user-supplied templates.
//!
//! Templates see the connected netlist as `netlist` and can query it with
//! these functions:
//!
//! * `glob_groups(glob)`: groups matching `glob`, ordered by their
//!   identifier string.
//! * `stringify_id(group)`: the identifier string of a group or pin.
//! * `get_parent_path(path)`: the group path one level up.
//! * `pascal_case(s)` and `camel_case(s)`.
//! * `pins_to_glob(group, glob)`: for each pin of `group`, its partners in
//!   groups matching `glob`.
//! * `single_pin_to_glob(group, pin, glob)`: the one partner of `pin` in
//!   groups matching `glob`, or `none`.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, Value, context};
use netgroup_core::{
    ConnectedNetlist, GroupGlob, GroupIdentifier, GroupPath, Netlist, PinName, Provenance,
    diagnostics::{Diagnostics, WithDiagnostics},
    netlist::{ConnectedGroup, format_date},
};
use serde::Serialize;

use crate::{ExportError, Result};

/// What templates see as `netlist`.
#[derive(Serialize)]
struct NetlistView<'a> {
    flavor: &'static str,
    sources: Vec<String>,
    date: String,
    tool: &'a str,
    /// Ordered by identifier string.
    groups: Vec<&'a ConnectedGroup>,
}

impl<'a> NetlistView<'a> {
    fn new(netlist: &'a ConnectedNetlist) -> Self {
        let Provenance {
            sources,
            date,
            tool,
        } = &netlist.provenance;
        let mut groups: Vec<_> = netlist.groups.values().collect();
        groups.sort_by_cached_key(|g| g.id.stringify());
        Self {
            flavor: netlist.flavor.noun(),
            sources: sources
                .iter()
                .map(|s| s.to_string_lossy().into_owned())
                .collect(),
            date: format_date(date),
            tool,
            groups,
        }
    }
}

/// Render `template` against `netlist`.
///
/// Includes and imports resolve relative to `template_dir`, which defaults to
/// the directory of `template` and must contain it.
pub fn render(
    netlist: &Netlist,
    template: &Path,
    template_dir: Option<&Path>,
) -> Result<WithDiagnostics<String>> {
    let dir = match template_dir {
        Some(dir) => dir,
        None => template.parent().unwrap_or(Path::new("")),
    };
    let name = template
        .strip_prefix(dir)
        .map_err(|_| ExportError::TemplateOutsideDir {
            template: template.to_path_buf(),
            dir: dir.to_path_buf(),
        })?
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let connected = Arc::new(netlist.connect()?);
    let diagnostics = Arc::new(Mutex::new(Diagnostics::default()));

    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(dir));
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    register_helpers(&mut env, &connected, &diagnostics);

    log::debug!("Rendering {name} from {}", dir.display());
    let output = env.get_template(&name)?.render(context! {
        netlist => Value::from_serialize(NetlistView::new(&connected)),
    })?;

    let diagnostics = diagnostics
        .lock()
        .map(|mut d| std::mem::take(&mut *d))
        .unwrap_or_default();
    Ok(WithDiagnostics::new(output, diagnostics))
}

fn register_helpers(
    env: &mut Environment<'_>,
    netlist: &Arc<ConnectedNetlist>,
    diagnostics: &Arc<Mutex<Diagnostics>>,
) {
    env.add_function("stringify_id", |id: Value| -> std::result::Result<String, Error> {
        Ok(group_id(&id)?.stringify())
    });
    env.add_function("get_parent_path", |path: String| -> std::result::Result<String, Error> {
        let parent = GroupPath::new(&path)
            .and_then(|p| p.parent())
            .map_err(invalid)?;
        Ok(parent.as_str().to_string())
    });
    env.add_function("pascal_case", |s: String| pascal_case(&s));
    env.add_function("camel_case", |s: String| camel_case(&s));

    let glob_netlist = Arc::clone(netlist);
    env.add_function("glob_groups", move |glob: String| -> std::result::Result<Value, Error> {
        let glob = GroupGlob::compile(&glob).map_err(invalid)?;
        Ok(Value::from_serialize(glob_netlist.glob_groups(&glob)))
    });

    let pins_netlist = Arc::clone(netlist);
    env.add_function(
        "pins_to_glob",
        move |group: Value, glob: String| -> std::result::Result<Value, Error> {
            let group = lookup(&pins_netlist, &group)?;
            let glob = GroupGlob::compile(&glob).map_err(invalid)?;
            Ok(Value::from_serialize(group.pins_to_glob(&glob)))
        },
    );

    let single_netlist = Arc::clone(netlist);
    let sink = Arc::clone(diagnostics);
    env.add_function(
        "single_pin_to_glob",
        move |group: Value, pin: String, glob: String| -> std::result::Result<Value, Error> {
            let group = lookup(&single_netlist, &group)?;
            let pin = PinName::new(&pin).map_err(invalid)?;
            let glob = GroupGlob::compile(&glob).map_err(invalid)?;
            let mut sink = sink.lock().map_err(|_| {
                Error::new(ErrorKind::InvalidOperation, "diagnostics lock poisoned")
            })?;
            let partner = group
                .single_pin_to_glob(&pin, &glob, &mut sink)
                .map_err(invalid)?;
            Ok(partner.map_or_else(|| Value::from(()), Value::from_serialize))
        },
    );
}

fn invalid(err: netgroup_core::Error) -> Error {
    Error::new(ErrorKind::InvalidOperation, err.to_string())
}

/// Read a group identifier back from a group or pin object handed to a
/// template.
fn group_id(value: &Value) -> std::result::Result<GroupIdentifier, Error> {
    let part = |name: &str| -> std::result::Result<String, Error> {
        let attr = value.get_attr(name)?;
        attr.as_str().map(str::to_string).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("expected a group or pin, got {value}"),
            )
        })
    };
    GroupIdentifier::from_parts(&part("schematic")?, &part("path")?, &part("type")?)
        .map_err(invalid)
}

fn lookup<'a>(
    netlist: &'a ConnectedNetlist,
    value: &Value,
) -> std::result::Result<&'a ConnectedGroup, Error> {
    let id = group_id(value)?;
    netlist.group(&id).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("no group {id} in the netlist"),
        )
    })
}

/// `"usb-c connector"` becomes `"UsbCConnector"`.
pub fn pascal_case(s: &str) -> String {
    change_case(s, true)
}

/// `"usb-c connector"` becomes `"usbCConnector"`.
pub fn camel_case(s: &str) -> String {
    change_case(s, false)
}

fn change_case(s: &str, first_upper: bool) -> String {
    let mut out = String::with_capacity(s.len());
    let mut next_upper = first_upper;
    for c in s.chars().flat_map(char::to_lowercase) {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            next_upper = true;
            continue;
        }
        if next_upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        next_upper = false;
    }
    out
}
