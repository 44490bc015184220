// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::ArrowExpr;
use deno_ast::swc::ast::BlockStmt;
use deno_ast::swc::ast::BlockStmtOrExpr;
use deno_ast::swc::ast::CatchClause;
use deno_ast::swc::ast::ClassDecl;
use deno_ast::swc::ast::Constructor;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::FnDecl;
use deno_ast::swc::ast::FnExpr;
use deno_ast::swc::ast::ForHead;
use deno_ast::swc::ast::ForInStmt;
use deno_ast::swc::ast::ForOfStmt;
use deno_ast::swc::ast::ForStmt;
use deno_ast::swc::ast::Function;
use deno_ast::swc::ast::GetterProp;
use deno_ast::swc::ast::Module;
use deno_ast::swc::ast::NewExpr;
use deno_ast::swc::ast::ParamOrTsParamProp;
use deno_ast::swc::ast::Pat;
use deno_ast::swc::ast::Script;
use deno_ast::swc::ast::SetterProp;
use deno_ast::swc::ast::TryStmt;
use deno_ast::swc::ast::VarDecl;
use deno_ast::swc::ast::VarDeclKind;
use deno_ast::swc::ast::VarDeclOrExpr;
use deno_ast::swc::ast::VarDeclarator;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitWith;
use deno_ast::ParsedSource;
use deno_ast::ProgramRef;
use deno_ast::SourceTextInfo;

use crate::comments::CommentIndex;
use crate::context::ContextDependencyFactory;
use crate::context::DefaultContextDependencyFactory;
use crate::evaluate::DefaultExpressionEvaluator;
use crate::evaluate::EvaluationCache;
use crate::evaluate::ExpressionEvaluator;
use crate::graph::ModuleUrlInfo;
use crate::plugin::CallSite;
use crate::plugin::HookResult;
use crate::plugin::ParserState;
use crate::plugin::UrlParserPlugin;
use crate::scope::ParserScope;
use crate::scope::ScopeTracker;

/// Walks a parsed module and runs the parser plugin on every
/// `new URL(...)` expression whose callee is the global `URL`.
pub fn analyze_parsed_source(
  plugin: &UrlParserPlugin,
  parsed_source: &ParsedSource,
) -> ModuleUrlInfo {
  let context_factory =
    DefaultContextDependencyFactory::new(plugin.parser_options());
  analyze_parsed_source_with(
    plugin,
    parsed_source,
    &DefaultExpressionEvaluator,
    &context_factory,
  )
}

/// Like [`analyze_parsed_source`], with the host supplying expression
/// evaluation and context dependency creation.
pub fn analyze_parsed_source_with(
  plugin: &UrlParserPlugin,
  parsed_source: &ParsedSource,
  evaluator: &dyn ExpressionEvaluator,
  context_factory: &dyn ContextDependencyFactory,
) -> ModuleUrlInfo {
  let text_info = parsed_source.text_info_lazy();
  let mut analyzer = UrlAnalyzer {
    plugin,
    text_info,
    comments: CommentIndex::new(parsed_source.comments(), text_info),
    evaluator,
    context_factory,
    scope: ScopeTracker::default(),
    cache: EvaluationCache::default(),
    module: ModuleUrlInfo::new(parsed_source.specifier().clone()),
  };
  match parsed_source.program_ref() {
    ProgramRef::Module(module) => module.visit_with(&mut analyzer),
    ProgramRef::Script(script) => script.visit_with(&mut analyzer),
  }
  plugin.logger().debug(format_args!(
    "Analyzed {} ({} dependencies, {} evaluated call-sites)",
    analyzer.module.specifier,
    analyzer.module.dependencies.len(),
    analyzer.cache.len(),
  ));
  analyzer.module
}

struct UrlAnalyzer<'a> {
  plugin: &'a UrlParserPlugin,
  text_info: &'a SourceTextInfo,
  comments: CommentIndex,
  evaluator: &'a dyn ExpressionEvaluator,
  context_factory: &'a dyn ContextDependencyFactory,
  scope: ScopeTracker,
  cache: EvaluationCache,
  module: ModuleUrlInfo,
}

impl UrlAnalyzer<'_> {
  fn declare_lexical_var(&mut self, var: &VarDecl) {
    if var.kind != VarDeclKind::Var {
      for decl in &var.decls {
        self.scope.declare_pat(&decl.name);
      }
    }
  }

  fn with_top_level_symbol(
    &mut self,
    symbol: Option<String>,
    action: impl FnOnce(&mut Self),
  ) {
    if self.scope.is_top_level() {
      let previous = self.scope.set_top_level_symbol(symbol);
      action(self);
      self.scope.set_top_level_symbol(previous);
    } else {
      action(self);
    }
  }

  fn is_global_url(&self, expr: &NewExpr) -> bool {
    match &*expr.callee {
      Expr::Ident(ident) => self
        .scope
        .free_info_from_variable(&ident.sym)
        .map(|info| info.name == "URL")
        .unwrap_or(false),
      _ => false,
    }
  }

  fn on_new_url(&mut self, expr: &NewExpr) -> HookResult {
    let call = CallSite::new(expr, self.text_info, self.scope.in_try());
    let mut state = ParserState {
      text_info: self.text_info,
      comments: &self.comments,
      evaluator: self.evaluator,
      context_factory: self.context_factory,
      scope: &self.scope,
      module: &mut self.module,
      cache: &mut self.cache,
    };
    let is_pure = self.plugin.is_pure(&mut state, &call);
    let result = self.plugin.on_new_url(&mut state, &call);
    if is_pure == Some(true) {
      self.module.pure_expressions.push(call.range);
    }
    result
  }
}

impl Visit for UrlAnalyzer<'_> {
  fn visit_module(&mut self, module: &Module) {
    self.scope.declare_hoisted_module_items(&module.body);
    self.scope.declare_hoisted_vars(module);
    module.visit_children_with(self);
  }

  fn visit_script(&mut self, script: &Script) {
    self.scope.declare_hoisted_stmts(&script.body);
    self.scope.declare_hoisted_vars(script);
    script.visit_children_with(self);
  }

  fn visit_function(&mut self, function: &Function) {
    self.scope.enter_function_scope();
    for param in &function.params {
      self.scope.declare_pat(&param.pat);
    }
    if let Some(body) = &function.body {
      self.scope.declare_hoisted_vars(body);
    }
    function.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_constructor(&mut self, constructor: &Constructor) {
    self.scope.enter_function_scope();
    for param in &constructor.params {
      if let ParamOrTsParamProp::Param(param) = param {
        self.scope.declare_pat(&param.pat);
      }
    }
    if let Some(body) = &constructor.body {
      self.scope.declare_hoisted_vars(body);
    }
    constructor.visit_children_with(self);
    self.scope.exit_scope();
  }

  // accessors in object literals have a body but no `Function` node
  fn visit_getter_prop(&mut self, prop: &GetterProp) {
    self.scope.enter_function_scope();
    if let Some(body) = &prop.body {
      self.scope.declare_hoisted_vars(body);
    }
    prop.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_setter_prop(&mut self, prop: &SetterProp) {
    self.scope.enter_function_scope();
    self.scope.declare_pat(&prop.param);
    if let Some(body) = &prop.body {
      self.scope.declare_hoisted_vars(body);
    }
    prop.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_fn_expr(&mut self, expr: &FnExpr) {
    // the name of a function expression is only bound inside of it
    self.scope.enter_function_scope();
    if let Some(ident) = &expr.ident {
      self.scope.declare(ident.sym.to_string());
    }
    expr.function.visit_with(self);
    self.scope.exit_scope();
  }

  fn visit_arrow_expr(&mut self, expr: &ArrowExpr) {
    self.scope.enter_function_scope();
    for param in &expr.params {
      self.scope.declare_pat(param);
    }
    if let BlockStmtOrExpr::BlockStmt(body) = &*expr.body {
      self.scope.declare_hoisted_vars(body);
    }
    expr.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_block_stmt(&mut self, block: &BlockStmt) {
    self.scope.enter_block_scope();
    self.scope.declare_hoisted_stmts(&block.stmts);
    block.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_try_stmt(&mut self, stmt: &TryStmt) {
    let previous = self.scope.set_in_try(true);
    stmt.block.visit_with(self);
    self.scope.set_in_try(previous);
    if let Some(handler) = &stmt.handler {
      handler.visit_with(self);
    }
    if let Some(finalizer) = &stmt.finalizer {
      finalizer.visit_with(self);
    }
  }

  fn visit_catch_clause(&mut self, clause: &CatchClause) {
    self.scope.enter_block_scope();
    if let Some(param) = &clause.param {
      self.scope.declare_pat(param);
    }
    clause.body.visit_with(self);
    self.scope.exit_scope();
  }

  fn visit_for_stmt(&mut self, stmt: &ForStmt) {
    self.scope.enter_block_scope();
    if let Some(VarDeclOrExpr::VarDecl(var)) = &stmt.init {
      self.declare_lexical_var(var);
    }
    stmt.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
    self.scope.enter_block_scope();
    if let ForHead::VarDecl(var) = &stmt.left {
      self.declare_lexical_var(var);
    }
    stmt.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
    self.scope.enter_block_scope();
    if let ForHead::VarDecl(var) = &stmt.left {
      self.declare_lexical_var(var);
    }
    stmt.visit_children_with(self);
    self.scope.exit_scope();
  }

  fn visit_var_declarator(&mut self, decl: &VarDeclarator) {
    let symbol = match &decl.name {
      Pat::Ident(binding) => Some(binding.id.sym.to_string()),
      _ => None,
    };
    self.with_top_level_symbol(symbol, |analyzer| {
      decl.visit_children_with(analyzer)
    });
  }

  fn visit_fn_decl(&mut self, decl: &FnDecl) {
    let symbol = Some(decl.ident.sym.to_string());
    self.with_top_level_symbol(symbol, |analyzer| {
      decl.visit_children_with(analyzer)
    });
  }

  fn visit_class_decl(&mut self, decl: &ClassDecl) {
    let symbol = Some(decl.ident.sym.to_string());
    self.with_top_level_symbol(symbol, |analyzer| {
      decl.visit_children_with(analyzer)
    });
  }

  fn visit_new_expr(&mut self, expr: &NewExpr) {
    if self.is_global_url(expr) && self.on_new_url(expr) == HookResult::Handled
    {
      return;
    }
    expr.visit_children_with(self);
  }
}
