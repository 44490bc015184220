// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashSet;

use deno_ast::swc::ast::ArrowExpr;
use deno_ast::swc::ast::Class;
use deno_ast::swc::ast::Decl;
use deno_ast::swc::ast::DefaultDecl;
use deno_ast::swc::ast::Function;
use deno_ast::swc::ast::Ident;
use deno_ast::swc::ast::ImportSpecifier;
use deno_ast::swc::ast::ModuleDecl;
use deno_ast::swc::ast::ModuleItem;
use deno_ast::swc::ast::Pat;
use deno_ast::swc::ast::Stmt;
use deno_ast::swc::ast::VarDecl;
use deno_ast::swc::ast::VarDeclKind;
use deno_ast::swc::utils::find_pat_ids;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitWith;

/// A variable that isn't bound by any enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeInfo {
  pub name: String,
}

/// The parser's view of the scope a call-site is evaluated in.
pub trait ParserScope {
  /// Whether the current position is inside the block of a `try`
  /// statement of the current function.
  fn in_try(&self) -> bool;
  /// `None` when `name` is declared in an enclosing scope.
  fn free_info_from_variable(&self, name: &str) -> Option<FreeInfo>;
  /// The top level binding whose declaration contains the current position.
  fn top_level_symbol(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
  Function,
  Block,
}

#[derive(Debug)]
struct Scope {
  kind: ScopeKind,
  declarations: HashSet<String>,
  in_try: bool,
}

/// Tracks lexical scopes while walking a module.
///
/// The first scope is the module scope and is never exited.
#[derive(Debug)]
pub struct ScopeTracker {
  scopes: Vec<Scope>,
  top_level_symbol: Option<String>,
}

impl Default for ScopeTracker {
  fn default() -> Self {
    Self {
      scopes: vec![Scope {
        kind: ScopeKind::Function,
        declarations: HashSet::new(),
        in_try: false,
      }],
      top_level_symbol: None,
    }
  }
}

impl ScopeTracker {
  pub fn is_top_level(&self) -> bool {
    self.scopes.len() == 1
  }

  /// Function scopes start outside of any `try` block.
  pub fn enter_function_scope(&mut self) {
    self.scopes.push(Scope {
      kind: ScopeKind::Function,
      declarations: HashSet::new(),
      in_try: false,
    });
  }

  pub fn enter_block_scope(&mut self) {
    let in_try = self.in_try();
    self.scopes.push(Scope {
      kind: ScopeKind::Block,
      declarations: HashSet::new(),
      in_try,
    });
  }

  pub fn exit_scope(&mut self) {
    if self.scopes.len() > 1 {
      self.scopes.pop();
    }
  }

  /// Sets whether the current scope is in a `try` block, returning the
  /// previous state so it can be restored.
  pub fn set_in_try(&mut self, in_try: bool) -> bool {
    match self.scopes.last_mut() {
      Some(scope) => std::mem::replace(&mut scope.in_try, in_try),
      None => false,
    }
  }

  /// Declares a binding in the innermost scope.
  pub fn declare(&mut self, name: impl Into<String>) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.declarations.insert(name.into());
    }
  }

  /// Declares a `var` binding in the nearest function scope.
  pub fn declare_var(&mut self, name: impl Into<String>) {
    if let Some(scope) = self
      .scopes
      .iter_mut()
      .rev()
      .find(|scope| scope.kind == ScopeKind::Function)
    {
      scope.declarations.insert(name.into());
    }
  }

  pub fn declare_pat(&mut self, pat: &Pat) {
    for ident in find_pat_ids::<_, Ident>(pat) {
      self.declare(ident.sym.to_string());
    }
  }

  /// Declares everything a statement list hoists into its own scope.
  pub fn declare_hoisted_stmts(&mut self, stmts: &[Stmt]) {
    for stmt in stmts {
      if let Stmt::Decl(decl) = stmt {
        self.declare_lexical_decl(decl);
      }
    }
  }

  /// Declares everything a module body hoists into the module scope.
  pub fn declare_hoisted_module_items(&mut self, items: &[ModuleItem]) {
    for item in items {
      match item {
        ModuleItem::Stmt(Stmt::Decl(decl)) => self.declare_lexical_decl(decl),
        ModuleItem::Stmt(_) => {}
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
          for specifier in &import.specifiers {
            let local = match specifier {
              ImportSpecifier::Named(named) => &named.local,
              ImportSpecifier::Default(default) => &default.local,
              ImportSpecifier::Namespace(namespace) => &namespace.local,
            };
            self.declare(local.sym.to_string());
          }
        }
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
          self.declare_lexical_decl(&export.decl);
        }
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
          let ident = match &export.decl {
            DefaultDecl::Class(class) => class.ident.as_ref(),
            DefaultDecl::Fn(func) => func.ident.as_ref(),
            DefaultDecl::TsInterfaceDecl(_) => None,
          };
          if let Some(ident) = ident {
            self.declare(ident.sym.to_string());
          }
        }
        ModuleItem::ModuleDecl(_) => {}
      }
    }
  }

  /// Declares the `var` bindings found anywhere in `node`, without
  /// looking into nested functions.
  pub fn declare_hoisted_vars<N: VisitWith<VarCollector>>(&mut self, node: &N) {
    let mut collector = VarCollector::default();
    node.visit_with(&mut collector);
    for name in collector.names {
      self.declare_var(name);
    }
  }

  /// Sets the top level symbol, returning the previous one.
  pub fn set_top_level_symbol(
    &mut self,
    symbol: Option<String>,
  ) -> Option<String> {
    std::mem::replace(&mut self.top_level_symbol, symbol)
  }

  fn declare_lexical_decl(&mut self, decl: &Decl) {
    match decl {
      Decl::Class(class) => self.declare(class.ident.sym.to_string()),
      Decl::Fn(func) => self.declare(func.ident.sym.to_string()),
      Decl::Var(var) if var.kind != VarDeclKind::Var => {
        for decl in &var.decls {
          self.declare_pat(&decl.name);
        }
      }
      Decl::TsEnum(ts_enum) => self.declare(ts_enum.id.sym.to_string()),
      Decl::TsModule(_)
      | Decl::TsInterface(_)
      | Decl::TsTypeAlias(_)
      | Decl::Using(_)
      | Decl::Var(_) => {}
    }
  }
}

impl ParserScope for ScopeTracker {
  fn in_try(&self) -> bool {
    self.scopes.last().map(|scope| scope.in_try).unwrap_or(false)
  }

  fn free_info_from_variable(&self, name: &str) -> Option<FreeInfo> {
    if self
      .scopes
      .iter()
      .any(|scope| scope.declarations.contains(name))
    {
      return None;
    }
    Some(FreeInfo {
      name: name.to_string(),
    })
  }

  fn top_level_symbol(&self) -> Option<&str> {
    self.top_level_symbol.as_deref()
  }
}

/// Collects `var` declared names, stopping at function boundaries.
#[derive(Debug, Default)]
pub struct VarCollector {
  names: Vec<String>,
}

impl Visit for VarCollector {
  fn visit_var_decl(&mut self, var: &VarDecl) {
    if var.kind == VarDeclKind::Var {
      for decl in &var.decls {
        for ident in find_pat_ids::<_, Ident>(&decl.name) {
          self.names.push(ident.sym.to_string());
        }
      }
    }
    var.visit_children_with(self);
  }

  fn visit_function(&mut self, _: &Function) {}

  fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}

  fn visit_class(&mut self, _: &Class) {}
}
