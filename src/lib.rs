// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

mod analyzer;
mod ast;
mod comments;
mod config;
mod context;
mod dependency;
mod diagnostics;
mod directives;
mod evaluate;
mod graph;
mod logger;
mod meta_url;
mod module_specifier;
mod plugin;
mod scope;
pub mod serialization;

use std::sync::Arc;

pub use analyzer::analyze_parsed_source;
pub use analyzer::analyze_parsed_source_with;
pub use ast::DefaultEsParser;
pub use ast::EsParser;
pub use ast::ParseOptions;
pub use comments::CommentError;
pub use comments::CommentIndex;
pub use comments::CommentOptions;
pub use comments::DirectiveValue;
pub use config::LogLevel;
pub use config::ModuleType;
pub use config::ParserOptions;
pub use config::PluginOptions;
pub use config::UrlOption;
pub use context::ContextCreateOptions;
pub use context::ContextDependencyFactory;
pub use context::ContextDependencyOptions;
pub use context::ContextMode;
pub use context::DefaultContextDependencyFactory;
pub use context::JsRegExp;
pub use deno_ast::MediaType;
pub use deno_ast::ParseDiagnostic;
pub use dependency::ConstDependency;
pub use dependency::ContextDependency;
pub use dependency::Dependency;
pub use dependency::DependencyCategory;
pub use dependency::DescribeDependency;
pub use dependency::RuntimeGlobal;
pub use dependency::StaticUrlDependency;
pub use dependency::UrlContextDependency;
pub use dependency::UsedByExports;
pub use diagnostics::DiagnosticSeverity;
pub use diagnostics::UrlDiagnostic;
pub use directives::DirectiveError;
pub use directives::UrlDirectives;
pub use evaluate::CallSiteId;
pub use evaluate::DefaultExpressionEvaluator;
pub use evaluate::EvaluatedArgument;
pub use evaluate::EvaluationCache;
pub use evaluate::ExpressionEvaluator;
pub use graph::ByteRange;
pub use graph::CurrentModule;
pub use graph::ModuleUrlInfo;
pub use graph::Position;
pub use graph::PositionRange;
pub use logger::PluginLogger;
pub use meta_url::is_meta_url;
pub use module_specifier::resolve_url;
pub use module_specifier::ModuleSpecifier;
pub use plugin::CallSite;
pub use plugin::CompilationHooks;
pub use plugin::DependencyKind;
pub use plugin::DependencyRegistry;
pub use plugin::DependencyTemplate;
pub use plugin::DynamicUrlPlugin;
pub use plugin::EvaluatedUrl;
pub use plugin::HookResult;
pub use plugin::ModuleFactory;
pub use plugin::ParserHooks;
pub use plugin::ParserRegistry;
pub use plugin::ParserSetup;
pub use plugin::ParserState;
pub use plugin::UrlParserPlugin;
pub use plugin::PLUGIN_NAME;
pub use scope::FreeInfo;
pub use scope::ParserScope;
pub use scope::ScopeTracker;

pub struct AnalyzeOptions<'a> {
  pub specifier: &'a ModuleSpecifier,
  pub source: Arc<str>,
  pub media_type: MediaType,
  pub module_type: ModuleType,
  pub plugin_options: &'a PluginOptions,
  pub parser_options: &'a ParserOptions,
  /// Defaults to [`DefaultEsParser`].
  pub parser: Option<&'a dyn EsParser>,
}

/// Registers the plugin on a fresh pipeline and analyzes a single module
/// with it.
///
/// Returns `None` when the plugin is disabled or not installed for the
/// module type, in which case the source isn't parsed at all.
pub fn analyze_module(
  options: AnalyzeOptions,
) -> Result<Option<ModuleUrlInfo>, ParseDiagnostic> {
  let plugin = DynamicUrlPlugin::new(options.plugin_options.clone());
  let mut compilation = DependencyRegistry::default();
  let mut parsers = ParserRegistry::default();
  if !plugin.register_on(&mut compilation, &mut parsers) {
    return Ok(None);
  }
  let Some(parser_plugin) =
    parsers.parser_for(options.module_type, options.parser_options)
  else {
    return Ok(None);
  };

  let default_parser = DefaultEsParser;
  let parser = options.parser.unwrap_or(&default_parser);
  let parsed_source = parser.parse_program(ParseOptions {
    specifier: options.specifier,
    source: options.source,
    media_type: options.media_type,
    scope_analysis: false,
  })?;
  Ok(Some(analyze_parsed_source(&parser_plugin, &parsed_source)))
}
