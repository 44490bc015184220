// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::context::ContextDependencyOptions;
use crate::graph::ByteRange;
use crate::graph::PositionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyCategory {
  Url,
  Unknown,
}

impl DependencyCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      DependencyCategory::Url => "url",
      DependencyCategory::Unknown => "unknown",
    }
  }
}

impl fmt::Display for DependencyCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What the host needs to know about a record to pick a factory and a
/// template for it.
pub trait DescribeDependency {
  /// Human readable type, used in stats and diagnostics.
  fn dependency_type(&self) -> &'static str;
  fn category(&self) -> DependencyCategory;
}

/// Which exports keep the value of the expression alive.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsedByExports {
  /// Always considered used.
  #[default]
  Unknown,
  /// Only used when this top level binding is used.
  TopLevelSymbol(String),
}

/// A `new URL("./asset.png", import.meta.url)` reference resolved at build
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticUrlDependency {
  /// The request resolved against the module's specifier.
  pub request: String,
  /// Span from the start of the first argument to the end of the second.
  pub range_of_request_args: ByteRange,
  /// Span of the whole `new URL(...)` expression.
  pub range: ByteRange,
  /// Emit the reference relative to the base URI.
  pub relative: bool,
  pub used_by_exports: UsedByExports,
  pub loc: PositionRange,
}

impl DescribeDependency for StaticUrlDependency {
  fn dependency_type(&self) -> &'static str {
    "new URL()"
  }

  fn category(&self) -> DependencyCategory {
    DependencyCategory::Url
  }
}

/// Fields shared by every context dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDependency {
  pub options: ContextDependencyOptions,
  pub range: ByteRange,
  /// Failing to resolve the context is not an error.
  pub optional: bool,
  pub loc: PositionRange,
}

/// A `new URL(dynamic, import.meta.url)` reference to any of the files
/// matching a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlContextDependency {
  /// Span of both constructor arguments, replaced by code generation.
  pub value_range: ByteRange,
  #[serde(flatten)]
  pub base: ContextDependency,
}

impl DescribeDependency for UrlContextDependency {
  fn dependency_type(&self) -> &'static str {
    "new URL() context"
  }

  fn category(&self) -> DependencyCategory {
    DependencyCategory::Url
  }
}

/// Runtime values code generation may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeGlobal {
  /// The base URI of the running bundle.
  BaseUri,
}

impl RuntimeGlobal {
  pub fn as_str(&self) -> &'static str {
    match self {
      RuntimeGlobal::BaseUri => "__webpack_require__.b",
    }
  }
}

impl fmt::Display for RuntimeGlobal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Replaces a span of the source with a fixed expression. Presentational
/// only, it never adds a module to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstDependency {
  pub expression: String,
  pub range: ByteRange,
  pub runtime_requirements: Vec<RuntimeGlobal>,
  pub loc: PositionRange,
}

impl ConstDependency {
  pub fn runtime_global(
    global: RuntimeGlobal,
    range: ByteRange,
    loc: PositionRange,
  ) -> Self {
    Self {
      expression: global.as_str().to_string(),
      range,
      runtime_requirements: vec![global],
      loc,
    }
  }
}

impl DescribeDependency for ConstDependency {
  fn dependency_type(&self) -> &'static str {
    "const"
  }

  fn category(&self) -> DependencyCategory {
    DependencyCategory::Unknown
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Dependency {
  Url(StaticUrlDependency),
  Context(UrlContextDependency),
}

impl Dependency {
  pub fn as_url(&self) -> Option<&StaticUrlDependency> {
    match self {
      Dependency::Url(dep) => Some(dep),
      Dependency::Context(_) => None,
    }
  }

  pub fn as_context(&self) -> Option<&UrlContextDependency> {
    match self {
      Dependency::Url(_) => None,
      Dependency::Context(dep) => Some(dep),
    }
  }

  pub fn range(&self) -> ByteRange {
    match self {
      Dependency::Url(dep) => dep.range,
      Dependency::Context(dep) => dep.base.range,
    }
  }
}

impl DescribeDependency for Dependency {
  fn dependency_type(&self) -> &'static str {
    match self {
      Dependency::Url(dep) => dep.dependency_type(),
      Dependency::Context(dep) => dep.dependency_type(),
    }
  }

  fn category(&self) -> DependencyCategory {
    match self {
      Dependency::Url(dep) => dep.category(),
      Dependency::Context(dep) => dep.category(),
    }
  }
}
