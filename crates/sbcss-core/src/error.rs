use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub const fn dummy() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 && self.column == 0 {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Errors that abort a parse or a whole generation pass.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{span}: {message}")]
    Parse { message: String, span: Span },

    #[error("Cyclic import detected: {}", chain.join(" -> "))]
    CyclicImport { chain: Vec<String> },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::Parse {
            message: message.into(),
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A type, class or pseudo-element name that the target unit does not declare.
    UnresolvedImportSymbol,
    /// An extends or instantiation whose import path the resolver cannot supply.
    UnresolvedImportPath,
    /// A special declaration with an unusable value or in an unusable place.
    MalformedDeclaration,
    /// A selector the selector parser rejected; the rule keeps its raw text.
    MalformedSelector,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnresolvedImportSymbol => "unresolved import symbol",
            Self::UnresolvedImportPath => "unresolved import path",
            Self::MalformedDeclaration => "malformed declaration",
            Self::MalformedSelector => "malformed selector",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem. Generation still completes with best-effort output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Namespace of the unit the problem was found in.
    pub namespace: String,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        namespace: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.namespace.is_empty() {
            "<anonymous>"
        } else {
            &self.namespace
        };
        write!(f, "{} ({}): {}: {}", unit, self.span, self.kind, self.message)
    }
}
