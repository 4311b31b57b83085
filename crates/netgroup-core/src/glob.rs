use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::{Error, GroupIdentifier, Result};

/// A compiled, comma-separated glob expression over canonical group
/// identifiers (`<schematic><path><type>`).
///
/// `*` and `?` stay within one path segment, `**` spans any number of
/// segments, `[...]` is a character class. Segments starting with `.` get no
/// special treatment.
#[derive(Debug, Clone)]
pub struct GroupGlob {
    source: String,
    set: GlobSet,
}

impl GroupGlob {
    pub fn compile(expression: &str) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in expression.split(',').filter(|p| !p.is_empty()) {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| Error::InvalidGlob {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| Error::InvalidGlob {
            pattern: expression.to_string(),
            source,
        })?;
        Ok(Self {
            source: expression.to_string(),
            set,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, id: &GroupIdentifier) -> bool {
        self.set.is_match(id.stringify())
    }
}

/// Filter predicate used throughout the engine: with no glob the answer is
/// `default_when_none`, otherwise whether `id` matches.
pub fn matches(glob: Option<&GroupGlob>, id: &GroupIdentifier, default_when_none: bool) -> bool {
    match glob {
        Some(glob) => glob.is_match(id),
        None => default_when_none,
    }
}
