// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::NewExpr;
use deno_ast::SourceRangedForSpanned;
use deno_ast::SourceTextInfo;
use indexmap::IndexMap;
use serde::Serialize;

use crate::comments::CommentIndex;
use crate::config::ModuleType;
use crate::config::ParserOptions;
use crate::config::PluginOptions;
use crate::context::ContextCreateOptions;
use crate::context::ContextDependencyFactory;
use crate::context::ContextMode;
use crate::dependency::ConstDependency;
use crate::dependency::ContextDependency;
use crate::dependency::Dependency;
use crate::dependency::DependencyCategory;
use crate::dependency::RuntimeGlobal;
use crate::dependency::StaticUrlDependency;
use crate::dependency::UrlContextDependency;
use crate::dependency::UsedByExports;
use crate::diagnostics::UrlDiagnostic;
use crate::directives::UrlDirectives;
use crate::directives::WEBPACK_EXCLUDE;
use crate::directives::WEBPACK_IGNORE;
use crate::directives::WEBPACK_INCLUDE;
use crate::evaluate::CallSiteId;
use crate::evaluate::EvaluatedArgument;
use crate::evaluate::EvaluationCache;
use crate::evaluate::ExpressionEvaluator;
use crate::graph::ByteRange;
use crate::graph::CurrentModule;
use crate::graph::PositionRange;
use crate::logger::PluginLogger;
use crate::module_specifier::resolve_url;
use crate::scope::ParserScope;

pub const PLUGIN_NAME: &str = "DynamicUrlPlugin";
const TYPE_PREFIX: &str = "new URL with import.meta.url";

/// Dependency kinds this plugin asks the pipeline to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
  UrlContext,
}

/// How code generation rewrites a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyTemplate {
  /// Replaces the value range with a call into the context module.
  ContextAsRequireCall,
}

/// Which factory turns a dependency into a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleFactory {
  Context,
}

/// Compilation level registration points.
pub trait CompilationHooks {
  fn set_dependency_template(
    &mut self,
    kind: DependencyKind,
    template: DependencyTemplate,
  );
  fn set_dependency_factory(
    &mut self,
    kind: DependencyKind,
    factory: ModuleFactory,
  );
}

/// Per module type parser registration points.
pub trait ParserHooks {
  fn tap(&mut self, module_type: ModuleType, setup: ParserSetup);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyRegistry {
  pub templates: IndexMap<DependencyKind, DependencyTemplate>,
  pub factories: IndexMap<DependencyKind, ModuleFactory>,
}

impl CompilationHooks for DependencyRegistry {
  fn set_dependency_template(
    &mut self,
    kind: DependencyKind,
    template: DependencyTemplate,
  ) {
    self.templates.insert(kind, template);
  }

  fn set_dependency_factory(
    &mut self,
    kind: DependencyKind,
    factory: ModuleFactory,
  ) {
    self.factories.insert(kind, factory);
  }
}

#[derive(Debug, Default, Clone)]
pub struct ParserRegistry {
  setups: IndexMap<ModuleType, ParserSetup>,
}

impl ParserRegistry {
  pub fn module_types(&self) -> impl Iterator<Item = ModuleType> + '_ {
    self.setups.keys().copied()
  }

  /// Creates the parser plugin for a module, or `None` when nothing was
  /// registered for its module type.
  pub fn parser_for(
    &self,
    module_type: ModuleType,
    parser_options: &ParserOptions,
  ) -> Option<UrlParserPlugin> {
    self
      .setups
      .get(&module_type)
      .map(|setup| setup.setup(parser_options))
  }
}

impl ParserHooks for ParserRegistry {
  fn tap(&mut self, module_type: ModuleType, setup: ParserSetup) {
    self.setups.insert(module_type, setup);
  }
}

/// Entry point that wires the plugin into a pipeline.
#[derive(Debug, Clone)]
pub struct DynamicUrlPlugin {
  options: PluginOptions,
  logger: PluginLogger,
}

impl DynamicUrlPlugin {
  pub fn new(options: PluginOptions) -> Self {
    let logger = PluginLogger::new(&options);
    Self { options, logger }
  }

  pub fn options(&self) -> &PluginOptions {
    &self.options
  }

  /// Registers the context dependency and the parser setup for
  /// `javascript/auto` and `javascript/esm`. Returns `false` without
  /// registering anything when the plugin is disabled.
  pub fn register_on(
    &self,
    compilation: &mut dyn CompilationHooks,
    parsers: &mut dyn ParserHooks,
  ) -> bool {
    if !self.options.enabled {
      self
        .logger
        .info(format_args!("Plugin is disabled, skipping application"));
      return false;
    }

    self.logger.info(format_args!(
      "Starting to apply plugin (enableStaticUrl: {}, enableLogging: {}, logLevel: {:?})",
      self.options.enable_static_url,
      self.options.enable_logging,
      self.options.log_level,
    ));

    compilation.set_dependency_template(
      DependencyKind::UrlContext,
      DependencyTemplate::ContextAsRequireCall,
    );
    self
      .logger
      .debug(format_args!("Registered UrlContextDependency template"));
    compilation
      .set_dependency_factory(DependencyKind::UrlContext, ModuleFactory::Context);
    self
      .logger
      .debug(format_args!("Registered UrlContextDependency factory"));

    for module_type in [ModuleType::JavascriptAuto, ModuleType::JavascriptEsm] {
      parsers.tap(
        module_type,
        ParserSetup {
          options: self.options.clone(),
          logger: self.logger,
        },
      );
    }
    true
  }
}

/// The callback installed per module type. Builds the parser plugin once
/// the parser options of a module are known.
#[derive(Debug, Clone)]
pub struct ParserSetup {
  options: PluginOptions,
  logger: PluginLogger,
}

impl ParserSetup {
  pub fn setup(&self, parser_options: &ParserOptions) -> UrlParserPlugin {
    self
      .logger
      .debug(format_args!("Setting up parser ({:?})", parser_options));
    UrlParserPlugin {
      options: self.options.clone(),
      parser_options: parser_options.clone(),
      logger: self.logger,
    }
  }
}

/// A `new URL(...)` expression being visited.
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
  pub expr: &'a NewExpr,
  pub id: CallSiteId,
  pub range: ByteRange,
  pub argument1_range: Option<ByteRange>,
  pub argument2_range: Option<ByteRange>,
  pub loc: PositionRange,
  pub in_try: bool,
}

impl<'a> CallSite<'a> {
  pub fn new(
    expr: &'a NewExpr,
    text_info: &SourceTextInfo,
    in_try: bool,
  ) -> Self {
    let source_range = expr.range();
    let range = ByteRange::from_source_range(source_range, text_info);
    let argument_range = |index: usize| {
      expr
        .args
        .as_ref()
        .and_then(|args| args.get(index))
        .map(|arg| ByteRange::from_source_range(arg.expr.range(), text_info))
    };
    Self {
      expr,
      id: CallSiteId::new(range),
      range,
      argument1_range: argument_range(0),
      argument2_range: argument_range(1),
      loc: PositionRange::from_source_range(source_range, text_info),
      in_try,
    }
  }

  /// From the start of the first argument to the end of the second.
  pub fn arguments_range(&self) -> Option<ByteRange> {
    Some(self.argument1_range?.join(&self.argument2_range?))
  }

  fn argument1(&self) -> Option<&'a Expr> {
    self
      .expr
      .args
      .as_ref()
      .and_then(|args| args.first())
      .map(|arg| &*arg.expr)
  }
}

/// What the host parser sees of the module being parsed.
pub struct ParserState<'a> {
  pub text_info: &'a SourceTextInfo,
  pub comments: &'a CommentIndex,
  pub evaluator: &'a dyn ExpressionEvaluator,
  pub context_factory: &'a dyn ContextDependencyFactory,
  pub scope: &'a dyn ParserScope,
  pub module: &'a mut dyn CurrentModule,
  pub cache: &'a mut EvaluationCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
  /// The call-site was taken care of and shouldn't be walked further.
  Handled,
  /// Default handling applies.
  Unhandled,
}

/// A `new URL("./a.png", import.meta.url)` evaluated to the URL it
/// resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedUrl {
  pub value: String,
  pub range: ByteRange,
}

/// The hooks installed on the parser of one module.
#[derive(Debug, Clone)]
pub struct UrlParserPlugin {
  options: PluginOptions,
  parser_options: ParserOptions,
  logger: PluginLogger,
}

impl UrlParserPlugin {
  pub fn new(options: PluginOptions, parser_options: ParserOptions) -> Self {
    let logger = PluginLogger::new(&options);
    Self {
      options,
      parser_options,
      logger,
    }
  }

  pub fn options(&self) -> &PluginOptions {
    &self.options
  }

  pub fn parser_options(&self) -> &ParserOptions {
    &self.parser_options
  }

  pub(crate) fn logger(&self) -> &PluginLogger {
    &self.logger
  }

  /// Classifies a `new URL(...)` call-site and records the dependency it
  /// creates on the current module.
  pub fn on_new_url(
    &self,
    state: &mut ParserState,
    call: &CallSite,
  ) -> HookResult {
    let Some(evaluated) =
      state.cache.evaluate(call.id, call.expr, state.evaluator)
    else {
      return HookResult::Unhandled;
    };

    let comment_options = state.comments.parse_comment_options(call.range);
    for err in &comment_options.errors {
      state.module.add_warning(UrlDiagnostic::CommentCompilation {
        comment: err.comment.clone(),
        message: err.message.clone(),
        range: err.range.clone(),
      });
    }
    let directives = UrlDirectives::from_options(&comment_options);

    if self.options.enable_static_url {
      self.report_directive_errors(state, call, &directives, &[WEBPACK_IGNORE]);
      if directives.ignore == Some(true) {
        if let Some(range) = call.argument2_range {
          state.module.add_presentational_dependency(
            ConstDependency::runtime_global(
              RuntimeGlobal::BaseUri,
              range,
              call.loc.clone(),
            ),
          );
          self.logger.debug(format_args!(
            "Ignoring new URL() at {}",
            call.loc
          ));
          return HookResult::Handled;
        }
      }
    }

    // an empty request never refers to an asset
    match &evaluated {
      EvaluatedArgument::ConstantString(request) if !request.is_empty() => {
        self.handle_static(state, call, request)
      }
      _ => self.handle_dynamic(state, call, &directives, &evaluated),
    }
  }

  fn handle_static(
    &self,
    state: &mut ParserState,
    call: &CallSite,
    request: &str,
  ) -> HookResult {
    self
      .logger
      .debug(format_args!("Detected static URL request {:?}", request));
    if !self.options.enable_static_url {
      return HookResult::Unhandled;
    }
    let Some(range_of_request_args) = call.arguments_range() else {
      return HookResult::Unhandled;
    };

    let resolved = match resolve_url(request, state.module.specifier()) {
      Ok(resolved) => resolved,
      Err(err) => {
        self.logger.error(format_args!(
          "Failed to resolve static URL {:?}: {}",
          request, err
        ));
        state.module.add_error(UrlDiagnostic::InvalidUrl {
          request: request.to_string(),
          source: err,
          range: call.loc.clone(),
        });
        return HookResult::Unhandled;
      }
    };

    let used_by_exports = match state.scope.top_level_symbol() {
      Some(symbol) => UsedByExports::TopLevelSymbol(symbol.to_string()),
      None => UsedByExports::Unknown,
    };
    state
      .module
      .add_dependency(Dependency::Url(StaticUrlDependency {
        request: resolved.to_string(),
        range_of_request_args,
        range: call.range,
        relative: self.parser_options.is_relative_url(),
        used_by_exports,
        loc: call.loc.clone(),
      }));
    HookResult::Handled
  }

  fn handle_dynamic(
    &self,
    state: &mut ParserState,
    call: &CallSite,
    directives: &UrlDirectives,
    evaluated: &EvaluatedArgument,
  ) -> HookResult {
    self.report_directive_errors(
      state,
      call,
      directives,
      &[WEBPACK_INCLUDE, WEBPACK_EXCLUDE],
    );
    let (Some(expr), Some(value_range)) =
      (call.argument1(), call.arguments_range())
    else {
      return HookResult::Unhandled;
    };

    let Some(options) = state.context_factory.create(
      expr,
      evaluated,
      ContextCreateOptions {
        include: directives.include.clone(),
        exclude: directives.exclude.clone(),
        mode: ContextMode::Sync,
        type_prefix: TYPE_PREFIX.to_string(),
        category: DependencyCategory::Url,
      },
    ) else {
      self.logger.debug(format_args!(
        "No context could be derived for new URL() at {}",
        call.loc
      ));
      return HookResult::Unhandled;
    };

    self.logger.debug(format_args!(
      "Created context dependency for {:?} ({})",
      options.request,
      options
        .reg_exp
        .as_ref()
        .map(|reg_exp| reg_exp.to_string())
        .unwrap_or_default(),
    ));
    state
      .module
      .add_dependency(Dependency::Context(UrlContextDependency {
        value_range,
        base: ContextDependency {
          options,
          range: call.range,
          optional: call.in_try,
          loc: call.loc.clone(),
        },
      }));
    HookResult::Handled
  }

  fn report_directive_errors(
    &self,
    state: &mut ParserState,
    call: &CallSite,
    directives: &UrlDirectives,
    names: &[&str],
  ) {
    for (name, err) in &directives.errors {
      if names.contains(name) {
        self.logger.warn(format_args!("{} at {}", err, call.loc));
        state.module.add_warning(UrlDiagnostic::UnsupportedFeature {
          message: err.to_string(),
          range: call.loc.clone(),
        });
      }
    }
  }

  /// Evaluates the whole expression to the URL it resolves to.
  pub fn evaluate_new_url(
    &self,
    state: &mut ParserState,
    call: &CallSite,
  ) -> Option<EvaluatedUrl> {
    if !self.options.enable_static_url {
      return None;
    }
    let evaluated = state.cache.evaluate(call.id, call.expr, state.evaluator);
    let Some(request) = evaluated
      .as_ref()
      .and_then(|e| e.as_string())
      .filter(|request| !request.is_empty())
    else {
      self
        .logger
        .debug(format_args!("Unable to get static URL request string"));
      return None;
    };
    match resolve_url(request, state.module.specifier()) {
      Ok(resolved) => {
        self.logger.debug(format_args!(
          "Successfully resolved static URL {:?} to {}",
          request, resolved
        ));
        Some(EvaluatedUrl {
          value: resolved.to_string(),
          range: call.range,
        })
      }
      Err(err) => {
        self.logger.error(format_args!(
          "Failed to resolve static URL {:?}: {}",
          request, err
        ));
        None
      }
    }
  }

  /// `Some(true)` when the call-site can be dropped if its value is unused,
  /// `None` when there's no opinion.
  pub fn is_pure(
    &self,
    state: &mut ParserState,
    call: &CallSite,
  ) -> Option<bool> {
    if !self.options.enable_static_url {
      return None;
    }
    let Expr::Ident(callee) = &*call.expr.callee else {
      return None;
    };
    let info = state.scope.free_info_from_variable(&callee.sym)?;
    if info.name != "URL" {
      return None;
    }
    match state.cache.evaluate(call.id, call.expr, state.evaluator)? {
      EvaluatedArgument::ConstantString(request) if !request.is_empty() => {
        Some(true)
      }
      _ => None,
    }
  }
}
