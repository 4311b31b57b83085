//! Validated identifier types.
//!
//! Schematic names, group types and pin names share one alphabet:
//! `[A-Za-z0-9_+\- ]`. Paths are `/`-delimited sequences of such segments
//! that start and end with `/`. Because `/` can never appear inside a name,
//! concatenating `schematic + path + type` is an unambiguous canonical form.

use std::{borrow::Borrow, fmt::Display, str::FromStr};

use serde::Serialize;

use crate::{
    Error, Result,
    diagnostics::{DiagnosticKind, Diagnostics},
};

/// How to treat characters outside the identifier alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validation {
    /// Reject the identifier.
    #[default]
    Strict,
    /// Replace each offending character with `_` and record a warning.
    Lenient,
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | ' ')
}

fn validate_name(
    kind: &'static str,
    raw: &str,
    validation: Validation,
    diagnostics: &mut Diagnostics,
) -> Result<String> {
    if raw.is_empty() {
        return Err(Error::EmptyIdentifier { kind });
    }
    match validation {
        Validation::Strict => match raw.chars().find(|c| !is_allowed(*c)) {
            Some(character) => Err(Error::InvalidIdentifier {
                kind,
                value: raw.to_string(),
                character,
            }),
            None => Ok(raw.to_string()),
        },
        Validation::Lenient => Ok(raw
            .chars()
            .map(|c| {
                if is_allowed(c) {
                    c
                } else {
                    diagnostics.warn(
                        DiagnosticKind::SanitizedCharacter,
                        format!("Replaced {c:?} with '_' in {kind} {raw:?}"),
                    );
                    '_'
                }
            })
            .collect()),
    }
}

macro_rules! restricted_name {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn new(raw: impl AsRef<str>) -> Result<Self> {
                Self::parse_with(raw.as_ref(), Validation::Strict, &mut Diagnostics::default())
            }

            pub fn parse_with(
                raw: &str,
                validation: Validation,
                diagnostics: &mut Diagnostics,
            ) -> Result<Self> {
                validate_name(Self::KIND, raw, validation, diagnostics).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

restricted_name!(
    /// Name of the schematic a group was drawn in.
    Schematic,
    "schematic"
);
restricted_name!(GroupType, "group type");
restricted_name!(PinName, "pin name");

/// Hierarchical sheet path: `/` for the root sheet, `/a/b/` below it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupPath(String);

impl GroupPath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        Self::parse_with(raw.as_ref(), Validation::Strict, &mut Diagnostics::default())
    }

    pub fn parse_with(
        raw: &str,
        validation: Validation,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let invalid = |reason| Error::InvalidPath {
            path: raw.to_string(),
            reason,
        };
        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if !raw.ends_with('/') {
            return Err(invalid("must end with '/'"));
        }
        if raw == "/" {
            return Ok(Self::root());
        }

        let mut path = String::with_capacity(raw.len());
        path.push('/');
        for segment in raw[1..raw.len() - 1].split('/') {
            if segment.is_empty() {
                return Err(invalid("contains an empty segment"));
            }
            path.push_str(&validate_name(
                "path segment",
                segment,
                validation,
                diagnostics,
            )?);
            path.push('/');
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// One level up: `/a/b/` becomes `/a/`.
    pub fn parent(&self) -> Result<GroupPath> {
        if self.is_root() {
            return Err(Error::InvalidPath {
                path: self.0.clone(),
                reason: "the root path has no parent",
            });
        }
        let trimmed = &self.0[..self.0.len() - 1];
        // Non-root paths always contain the leading slash.
        let cut = trimmed.rfind('/').unwrap_or(0);
        Ok(Self(self.0[..=cut].to_string()))
    }
}

impl Display for GroupPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Globally unique key of a group.
///
/// Ordering is by `(schematic, path, type)`; serialised output orders groups
/// by [`GroupIdentifier::stringify`] instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupIdentifier {
    pub schematic: Schematic,
    pub path: GroupPath,
    #[serde(rename = "type")]
    pub group_type: GroupType,
}

impl GroupIdentifier {
    pub fn new(schematic: Schematic, path: GroupPath, group_type: GroupType) -> Self {
        Self {
            schematic,
            path,
            group_type,
        }
    }

    /// Parse the three parts separately, as found in XML attributes.
    pub fn from_parts(schematic: &str, path: &str, group_type: &str) -> Result<Self> {
        Ok(Self::new(
            Schematic::new(schematic)?,
            GroupPath::new(path)?,
            GroupType::new(group_type)?,
        ))
    }

    /// Reserved identifier standing in for every partner collapsed by pin
    /// simplification.
    pub fn simplified() -> Self {
        Self {
            schematic: Schematic("This_was".to_string()),
            path: GroupPath("/Simplified/".to_string()),
            group_type: GroupType("Away".to_string()),
        }
    }

    /// Canonical string form: the three parts concatenated verbatim.
    pub fn stringify(&self) -> String {
        format!("{}{}{}", self.schematic, self.path, self.group_type)
    }
}

impl Display for GroupIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.schematic, self.path, self.group_type)
    }
}

impl FromStr for GroupIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::MalformedGroupIdentifier(s.to_string());
        let first = s.find('/').ok_or_else(malformed)?;
        let last = s.rfind('/').ok_or_else(malformed)?;
        Self::from_parts(&s[..first], &s[first..=last], &s[last + 1..])
    }
}

/// Globally unique key of a pin: its group plus the pin name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GlobalPinIdentifier {
    #[serde(flatten)]
    pub group: GroupIdentifier,
    pub pin: PinName,
}

impl GlobalPinIdentifier {
    pub fn new(group: GroupIdentifier, pin: PinName) -> Self {
        Self { group, pin }
    }
}

impl Display for GlobalPinIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_names_reject_foreign_characters() {
        assert!(PinName::new("VIN+").is_ok());
        assert!(PinName::new("GPIO 1_a-b").is_ok());
        assert!(matches!(
            PinName::new("A.B"),
            Err(Error::InvalidIdentifier { character: '.', .. })
        ));
        assert!(matches!(
            Schematic::new(""),
            Err(Error::EmptyIdentifier { .. })
        ));
    }

    #[test]
    fn lenient_names_replace_every_bad_character() {
        let mut diagnostics = Diagnostics::default();
        let pin = PinName::parse_with("~{RST}", Validation::Lenient, &mut diagnostics).unwrap();
        assert_eq!(pin.as_str(), "__RST_");
        assert_eq!(diagnostics.len(), 3);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::SanitizedCharacter)
        );
    }

    #[test]
    fn paths_must_be_slash_delimited() {
        assert!(GroupPath::new("/").unwrap().is_root());
        assert_eq!(
            GroupPath::new("/power/ldo/").unwrap().segments().collect::<Vec<_>>(),
            ["power", "ldo"]
        );
        for bad in ["", "power/", "/power", "/a//b/", "/a.b/"] {
            assert!(GroupPath::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parent_steps_one_level_up() {
        let path = GroupPath::new("/a/b/").unwrap();
        assert_eq!(path.parent().unwrap().as_str(), "/a/");
        assert_eq!(path.parent().unwrap().parent().unwrap().as_str(), "/");
        assert!(matches!(
            GroupPath::root().parent(),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn stringify_round_trips_through_from_str() {
        let id = GroupIdentifier::from_parts("Main", "/power/", "LDO").unwrap();
        assert_eq!(id.stringify(), "Main/power/LDO");
        assert_eq!(id.stringify().parse::<GroupIdentifier>().unwrap(), id);

        let top = "Main/Connector".parse::<GroupIdentifier>().unwrap();
        assert!(top.path.is_root());
        assert_eq!(top.group_type.as_str(), "Connector");

        assert!("NoSlash".parse::<GroupIdentifier>().is_err());
        assert!("Main/power/".parse::<GroupIdentifier>().is_err());
    }

    #[test]
    fn global_pins_order_by_group_then_pin() {
        let a = GroupIdentifier::from_parts("A", "/", "T").unwrap();
        let b = GroupIdentifier::from_parts("B", "/", "T").unwrap();
        let a2 = GlobalPinIdentifier::new(a.clone(), PinName::new("2").unwrap());
        let a10 = GlobalPinIdentifier::new(a, PinName::new("10").unwrap());
        let b1 = GlobalPinIdentifier::new(b, PinName::new("1").unwrap());
        assert!(a10 < a2);
        assert!(a2 < b1);
        assert_eq!(a2.to_string(), "A/T/2");
    }
}
