// Copyright 2018-2024 the Deno authors. MIT license.

use std::cmp::Ordering;
use std::fmt;

use deno_ast::SourcePos;
use deno_ast::SourceRange;
use deno_ast::SourceTextInfo;
use serde::Deserialize;
use serde::Serialize;

use crate::dependency::ConstDependency;
use crate::dependency::Dependency;
use crate::diagnostics::DiagnosticSeverity;
use crate::diagnostics::UrlDiagnostic;
use crate::module_specifier::ModuleSpecifier;

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
  /// The 0-indexed line index.
  pub line: usize,
  /// The 0-indexed character index.
  pub character: usize,
}

impl PartialOrd for Position {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Position {
  fn cmp(&self, other: &Self) -> Ordering {
    match self.line.cmp(&other.line) {
      Ordering::Equal => self.character.cmp(&other.character),
      Ordering::Greater => Ordering::Greater,
      Ordering::Less => Ordering::Less,
    }
  }
}

impl Position {
  pub fn zeroed() -> Self {
    Self {
      line: 0,
      character: 0,
    }
  }

  pub fn from_source_pos(pos: SourcePos, text_info: &SourceTextInfo) -> Self {
    let line_and_column_index = text_info.line_and_column_index(pos);
    Self {
      line: line_and_column_index.line_index,
      character: line_and_column_index.column_index,
    }
  }
}

/// Line and column span of a node, used when reporting diagnostics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionRange {
  #[serde(default = "Position::zeroed")]
  pub start: Position,
  #[serde(default = "Position::zeroed")]
  pub end: Position,
}

impl PositionRange {
  pub fn from_source_range(
    range: SourceRange,
    text_info: &SourceTextInfo,
  ) -> Self {
    Self {
      start: Position::from_source_pos(range.start, text_info),
      end: Position::from_source_pos(range.end, text_info),
    }
  }
}

impl fmt::Display for PositionRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.start.line + 1, self.start.character + 1)
  }
}

/// Byte offsets into the module's source text. This is the span a code
/// generator rewrites, so it survives serialization unchanged.
#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct ByteRange {
  pub start: usize,
  pub end: usize,
}

impl ByteRange {
  pub fn new(start: usize, end: usize) -> Self {
    Self { start, end }
  }

  pub fn from_source_range(
    range: SourceRange,
    text_info: &SourceTextInfo,
  ) -> Self {
    range.as_byte_range(text_info.range().start).into()
  }

  /// Span starting at the start of `self` and ending at the end of `other`.
  pub fn join(&self, other: &ByteRange) -> ByteRange {
    ByteRange {
      start: self.start,
      end: other.end,
    }
  }

  pub fn contains(&self, other: &ByteRange) -> bool {
    other.start >= self.start && other.end <= self.end
  }

  pub fn len(&self) -> usize {
    self.end - self.start
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }
}

impl From<std::ops::Range<usize>> for ByteRange {
  fn from(range: std::ops::Range<usize>) -> Self {
    Self {
      start: range.start,
      end: range.end,
    }
  }
}

/// The mutation surface of the module currently being parsed.
///
/// Implementations are only ever touched by the parse pass that owns the
/// module, so no synchronization is required.
pub trait CurrentModule {
  fn specifier(&self) -> &ModuleSpecifier;
  fn add_dependency(&mut self, dependency: Dependency);
  fn add_presentational_dependency(&mut self, dependency: ConstDependency);
  fn add_warning(&mut self, warning: UrlDiagnostic);
  fn add_error(&mut self, error: UrlDiagnostic);
}

/// Everything a single parse pass recorded for a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUrlInfo {
  pub specifier: ModuleSpecifier,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<Dependency>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub presentational_dependencies: Vec<ConstDependency>,
  /// Byte ranges of `new URL(...)` expressions that can be dropped when
  /// their value is unused.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub pure_expressions: Vec<ByteRange>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<UrlDiagnostic>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub errors: Vec<UrlDiagnostic>,
}

impl ModuleUrlInfo {
  pub fn new(specifier: ModuleSpecifier) -> Self {
    Self {
      specifier,
      dependencies: Vec::new(),
      presentational_dependencies: Vec::new(),
      pure_expressions: Vec::new(),
      warnings: Vec::new(),
      errors: Vec::new(),
    }
  }

  pub fn diagnostics(&self) -> impl Iterator<Item = &UrlDiagnostic> {
    self.warnings.iter().chain(self.errors.iter())
  }
}

impl CurrentModule for ModuleUrlInfo {
  fn specifier(&self) -> &ModuleSpecifier {
    &self.specifier
  }

  fn add_dependency(&mut self, dependency: Dependency) {
    self.dependencies.push(dependency);
  }

  fn add_presentational_dependency(&mut self, dependency: ConstDependency) {
    self.presentational_dependencies.push(dependency);
  }

  fn add_warning(&mut self, warning: UrlDiagnostic) {
    debug_assert_eq!(warning.severity(), DiagnosticSeverity::Warning);
    self.warnings.push(warning);
  }

  fn add_error(&mut self, error: UrlDiagnostic) {
    self.errors.push(error);
  }
}
