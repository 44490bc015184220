// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt::Arguments;

use crate::config::LogLevel;
use crate::config::PluginOptions;
use crate::plugin::PLUGIN_NAME;

const LOG_TARGET: &str = "dynamic_url";

/// Forwards plugin messages to the `log` facade when logging is enabled
/// in the plugin options and the message meets the configured level.
#[derive(Debug, Clone, Copy)]
pub struct PluginLogger {
  enabled: bool,
  level: LogLevel,
}

impl PluginLogger {
  pub fn new(options: &PluginOptions) -> Self {
    Self {
      enabled: options.enable_logging,
      level: options.log_level,
    }
  }

  pub fn is_enabled(&self, level: LogLevel) -> bool {
    self.enabled && level >= self.level
  }

  pub fn debug(&self, args: Arguments) {
    self.log(LogLevel::Debug, args);
  }

  pub fn info(&self, args: Arguments) {
    self.log(LogLevel::Info, args);
  }

  pub fn warn(&self, args: Arguments) {
    self.log(LogLevel::Warn, args);
  }

  pub fn error(&self, args: Arguments) {
    self.log(LogLevel::Error, args);
  }

  fn log(&self, level: LogLevel, args: Arguments) {
    if self.is_enabled(level) {
      log::log!(
        target: LOG_TARGET,
        level.as_log_level(),
        "[{}] {}",
        PLUGIN_NAME,
        args
      );
    }
  }
}
