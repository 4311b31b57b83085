use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
};

use serde::Serialize;

/// What a recoverable condition was about. Fatal conditions are `Err` values
/// and never show up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SanitizedCharacter,
    AmbiguousPin,
    PinSimplified,
    SparseConnectSet,
    RootPinCollision,
    StringifyDiverged,
    GroupWithoutPins,
    EmptyMapFieldName,
    OrphanGroupField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub body: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.body)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Deref for Diagnostics {
    type Target = Vec<Diagnostic>;
    fn deref(&self) -> &Self::Target {
        &self.diagnostics
    }
}

impl DerefMut for Diagnostics {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.diagnostics
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Diagnostics { diagnostics }
    }
}

impl Diagnostics {
    /// Record a warning and mirror it to the log.
    pub fn warn(&mut self, kind: DiagnosticKind, body: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, body);
        log::debug!("{:?}: {}", diagnostic.kind, diagnostic.body);
        self.diagnostics.push(diagnostic);
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

/// A result together with the warnings produced while computing it.
#[derive(Debug, Clone)]
pub struct WithDiagnostics<T> {
    pub diagnostics: Diagnostics,
    pub output: T,
}

impl<T> WithDiagnostics<T> {
    pub fn new(output: T, diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            output,
        }
    }

    /// Move the diagnostics into `sink` and return the output.
    pub fn unpack_into(self, sink: &mut Diagnostics) -> T {
        sink.extend(self.diagnostics);
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_into_appends_in_order() {
        let mut sink = Diagnostics::default();
        sink.warn(DiagnosticKind::AmbiguousPin, "first");

        let mut inner = Diagnostics::default();
        inner.warn(DiagnosticKind::PinSimplified, "second");
        let value = WithDiagnostics::new(7, inner).unpack_into(&mut sink);

        assert_eq!(value, 7);
        let bodies: Vec<_> = sink.iter().map(|d| d.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
        assert_eq!(sink.of_kind(DiagnosticKind::PinSimplified).count(), 1);
    }
}
