//! Error and diagnostic types for SBGN-ML reading and writing.
//!
//! Fatal problems are returned as [`Error`]. Problems that only affect a
//! single element (an unknown `class` value, a layout kind that cannot be
//! expressed in the target dialect) are collected as [`Diagnostic`]s and
//! returned next to the result.

use std::{fmt, io};

use log::warn;
use thiserror::Error;

use crate::element::UniqueId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed document: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("element `{element}` references unknown id `{reference}`")]
    UnresolvedReference { element: String, reference: String },

    #[error("reference cycle while building `{0}`")]
    ReferenceCycle(String),

    #[error("element `{id}` belongs to a finalized map and cannot be modified")]
    ImmutableElement { id: UniqueId },

    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    pub(crate) fn unresolved(element: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            element: element.into(),
            reference: reference.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A glyph or arc `class` attribute not known for the map's dialect.
    UnknownClassValue,
    /// A layout element kind with no SBGN-ML class in the target dialect.
    UnwritableLayoutType,
    /// A required attribute was absent and a default was used.
    MissingAttribute,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownClassValue => "unknown class value",
            Self::UnwritableLayoutType => "unwritable layout type",
            Self::MissingAttribute => "missing attribute",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem attached to one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub element: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, element: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            element: element.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(f, "{} ({element}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Accumulates diagnostics and logs each one as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(kind = diagnostic.kind.to_string(), element:? = diagnostic.element; "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn record(&mut self, kind: DiagnosticKind, element: Option<&str>, message: impl Into<String>) {
        self.push(Diagnostic::new(kind, element, message));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
