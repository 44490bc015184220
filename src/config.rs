// Copyright 2018-2024 the Deno authors. MIT license.

use serde::Deserialize;
use serde::Serialize;

use crate::context::JsRegExp;

#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
  Debug,
  #[default]
  Info,
  Warn,
  Error,
}

impl LogLevel {
  pub fn as_log_level(&self) -> log::Level {
    match self {
      LogLevel::Debug => log::Level::Debug,
      LogLevel::Info => log::Level::Info,
      LogLevel::Warn => log::Level::Warn,
      LogLevel::Error => log::Level::Error,
    }
  }
}

/// Options accepted by the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PluginOptions {
  /// When `false`, nothing is registered on the pipeline.
  pub enabled: bool,
  /// Opt-in handling of constant requests, the `webpackIgnore` directive
  /// and the purity classifier. Without it only dynamic requests are handled.
  pub enable_static_url: bool,
  pub enable_logging: bool,
  pub log_level: LogLevel,
}

impl Default for PluginOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      enable_static_url: false,
      enable_logging: false,
      log_level: LogLevel::Info,
    }
  }
}

/// How a statically resolved URL is emitted relative to the base URI.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlOption {
  #[default]
  Absolute,
  Relative,
}

/// The subset of the host's JavaScript parser options read while
/// classifying call-sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserOptions {
  pub url: UrlOption,
  /// Pattern substituted for each unknown part of a dynamic request.
  pub wrapped_context_reg_exp: JsRegExp,
  pub wrapped_context_recursive: bool,
}

impl Default for ParserOptions {
  fn default() -> Self {
    Self {
      url: UrlOption::Absolute,
      wrapped_context_reg_exp: JsRegExp::new(".*", ""),
      wrapped_context_recursive: true,
    }
  }
}

impl ParserOptions {
  pub fn is_relative_url(&self) -> bool {
    self.url == UrlOption::Relative
  }
}

/// Module types the parser setup is installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
  #[serde(rename = "javascript/auto")]
  JavascriptAuto,
  #[serde(rename = "javascript/esm")]
  JavascriptEsm,
  #[serde(rename = "javascript/dynamic")]
  JavascriptDynamic,
}

impl ModuleType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ModuleType::JavascriptAuto => "javascript/auto",
      ModuleType::JavascriptEsm => "javascript/esm",
      ModuleType::JavascriptDynamic => "javascript/dynamic",
    }
  }
}
