// Copyright 2018-2024 the Deno authors. MIT license.

use serde::ser::SerializeStruct;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

use crate::graph::PositionRange;
use crate::module_specifier::ModuleSpecifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticSeverity {
  Warning,
  Error,
}

/// A diagnostic attached to a single `new URL(...)` call-site. None of these
/// abort the parse pass; at most the call-site is left unhandled.
#[derive(Debug, Clone, PartialEq, Eq, Error, deno_error::JsError)]
pub enum UrlDiagnostic {
  /// A magic comment inside the call-site could not be parsed.
  #[class(syntax)]
  #[error(
    "Compilation error while processing magic comment(-s): /*{comment}*/: {message}"
  )]
  CommentCompilation {
    comment: String,
    message: String,
    range: PositionRange,
  },
  /// A recognized directive carried a value of the wrong type.
  #[class(type)]
  #[error("{message}")]
  UnsupportedFeature {
    message: String,
    range: PositionRange,
  },
  /// A constant request could not be resolved against the module location.
  #[class(uri)]
  #[error("Invalid URL \"{request}\": {source}")]
  InvalidUrl {
    request: String,
    #[source]
    source: url::ParseError,
    range: PositionRange,
  },
}

impl UrlDiagnostic {
  pub fn severity(&self) -> DiagnosticSeverity {
    match self {
      Self::CommentCompilation { .. } | Self::UnsupportedFeature { .. } => {
        DiagnosticSeverity::Warning
      }
      Self::InvalidUrl { .. } => DiagnosticSeverity::Error,
    }
  }

  /// Return a reference to the range that the diagnostic applies to.
  pub fn range(&self) -> &PositionRange {
    match self {
      Self::CommentCompilation { range, .. }
      | Self::UnsupportedFeature { range, .. }
      | Self::InvalidUrl { range, .. } => range,
    }
  }

  /// Converts the diagnostic into a string along with the location it
  /// applies to.
  pub fn to_string_with_range(&self, specifier: &ModuleSpecifier) -> String {
    format!("{}\n    at {}:{}", self, specifier, self.range())
  }
}

impl Serialize for UrlDiagnostic {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut state = serializer.serialize_struct("UrlDiagnostic", 3)?;
    state.serialize_field("severity", &self.severity())?;
    state.serialize_field("message", &self.to_string())?;
    state.serialize_field("range", self.range())?;
    state.end()
  }
}
