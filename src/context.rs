// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;

use deno_ast::swc::ast::BinaryOp;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::Lit;
use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::config::ParserOptions;
use crate::dependency::DependencyCategory;
use crate::evaluate::unwrap_type_expr;
use crate::evaluate::EvaluatedArgument;

/// A JavaScript regular expression as written in source (`/source/flags`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsRegExp {
  pub source: String,
  pub flags: String,
}

impl JsRegExp {
  pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      flags: flags.into(),
    }
  }

  /// Compiles the expression, honoring the `i`, `m` and `s` flags. Other
  /// flags have no effect on matching a single request.
  pub fn to_regex(&self) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&self.source)
      .case_insensitive(self.flags.contains('i'))
      .multi_line(self.flags.contains('m'))
      .dot_matches_new_line(self.flags.contains('s'))
      .build()
  }

  /// Returns `false` for expressions the regex engine can't compile.
  pub fn is_match(&self, text: &str) -> bool {
    match self.to_regex() {
      Ok(re) => re.is_match(text),
      Err(err) => {
        log::debug!("Could not compile {}: {:#}", self, err);
        false
      }
    }
  }
}

impl fmt::Display for JsRegExp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}/{}", self.source, self.flags)
  }
}

/// How the host should load the modules of a context. URL references
/// always resolve synchronously.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextMode {
  #[default]
  Sync,
}

/// Pattern-bearing options of a context dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDependencyOptions {
  /// Directory the pattern is enumerated from, relative to the module.
  pub request: String,
  pub recursive: bool,
  pub reg_exp: Option<JsRegExp>,
  pub include: Option<JsRegExp>,
  pub exclude: Option<JsRegExp>,
  pub mode: ContextMode,
  pub category: DependencyCategory,
  pub type_prefix: String,
}

impl ContextDependencyOptions {
  /// Whether a request found while enumerating the context directory
  /// (ex. `./logo.png`) belongs to this dependency.
  pub fn matches(&self, request: &str) -> bool {
    if let Some(reg_exp) = &self.reg_exp {
      if !reg_exp.is_match(request) {
        return false;
      }
    }
    if let Some(include) = &self.include {
      if !include.is_match(request) {
        return false;
      }
    }
    if let Some(exclude) = &self.exclude {
      if exclude.is_match(request) {
        return false;
      }
    }
    true
  }
}

/// The fixed metadata and validated filters passed alongside the expression
/// when asking for a context dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCreateOptions {
  pub include: Option<JsRegExp>,
  pub exclude: Option<JsRegExp>,
  pub mode: ContextMode,
  pub type_prefix: String,
  pub category: DependencyCategory,
}

/// Turns a non-constant request expression into pattern-bearing options.
pub trait ContextDependencyFactory {
  /// Returns `None` when the expression gives no hint for enumeration.
  fn create(
    &self,
    expr: &Expr,
    evaluated: &EvaluatedArgument,
    options: ContextCreateOptions,
  ) -> Option<ContextDependencyOptions>;
}

#[derive(Debug, Clone)]
pub struct DefaultContextDependencyFactory {
  wrapped_context_reg_exp: JsRegExp,
  wrapped_context_recursive: bool,
}

impl Default for DefaultContextDependencyFactory {
  fn default() -> Self {
    Self::new(&ParserOptions::default())
  }
}

impl DefaultContextDependencyFactory {
  pub fn new(parser_options: &ParserOptions) -> Self {
    Self {
      wrapped_context_reg_exp: parser_options.wrapped_context_reg_exp.clone(),
      wrapped_context_recursive: parser_options.wrapped_context_recursive,
    }
  }
}

impl ContextDependencyFactory for DefaultContextDependencyFactory {
  fn create(
    &self,
    expr: &Expr,
    evaluated: &EvaluatedArgument,
    options: ContextCreateOptions,
  ) -> Option<ContextDependencyOptions> {
    let parts = match evaluated {
      EvaluatedArgument::ConstantString(value) => {
        vec![RequestPart::Literal(value.clone())]
      }
      EvaluatedArgument::Unknown => request_parts(expr),
    };
    if !parts
      .iter()
      .any(|p| matches!(p, RequestPart::Literal(text) if !text.is_empty()))
    {
      return None;
    }

    let mut middle = parts.as_slice();
    let mut prefix = "";
    let mut postfix = "";
    if let [RequestPart::Literal(text), rest @ ..] = middle {
      prefix = text.as_str();
      middle = rest;
    }
    if let [rest @ .., RequestPart::Literal(text)] = middle {
      postfix = text.as_str();
      middle = rest;
    }

    let (context, prefix) = split_context_from_prefix(prefix);
    let mut source = format!("^{}", regex::escape(&prefix));
    for part in middle {
      match part {
        RequestPart::Literal(text) => source.push_str(&regex::escape(text)),
        RequestPart::Expr => {
          source.push_str(&self.wrapped_context_reg_exp.source)
        }
      }
    }
    source.push_str(&regex::escape(postfix));
    source.push('$');

    Some(ContextDependencyOptions {
      request: context,
      recursive: self.wrapped_context_recursive,
      reg_exp: Some(JsRegExp::new(
        source,
        self.wrapped_context_reg_exp.flags.clone(),
      )),
      include: options.include,
      exclude: options.exclude,
      mode: options.mode,
      category: options.category,
      type_prefix: options.type_prefix,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestPart {
  Literal(String),
  /// A part that could not be analyzed.
  Expr,
}

/// Flattens string concatenation and template literals into literal and
/// unknown parts, merging adjacent parts of the same kind.
fn request_parts(expr: &Expr) -> Vec<RequestPart> {
  fn collect(expr: &Expr, parts: &mut Vec<RequestPart>) {
    match unwrap_type_expr(expr) {
      Expr::Paren(paren) => collect(&paren.expr, parts),
      Expr::Lit(Lit::Str(str_)) => {
        push(parts, RequestPart::Literal(str_.value.to_string()))
      }
      Expr::Tpl(tpl) => {
        for (i, quasi) in tpl.quasis.iter().enumerate() {
          match &quasi.cooked {
            Some(cooked) => {
              push(parts, RequestPart::Literal(cooked.to_string()))
            }
            // invalid escape sequence in a tagged template
            None => push(parts, RequestPart::Expr),
          }
          if let Some(expr) = tpl.exprs.get(i) {
            collect(expr, parts);
          }
        }
      }
      Expr::Bin(bin) if bin.op == BinaryOp::Add => {
        collect(&bin.left, parts);
        collect(&bin.right, parts);
      }
      _ => push(parts, RequestPart::Expr),
    }
  }

  fn push(parts: &mut Vec<RequestPart>, part: RequestPart) {
    match part {
      RequestPart::Literal(text) => {
        if text.is_empty() {
          return;
        }
        if let Some(RequestPart::Literal(last)) = parts.last_mut() {
          last.push_str(&text);
        } else {
          parts.push(RequestPart::Literal(text));
        }
      }
      RequestPart::Expr => {
        if parts.last() != Some(&RequestPart::Expr) {
          parts.push(RequestPart::Expr);
        }
      }
    }
  }

  let mut parts = Vec::new();
  collect(expr, &mut parts);
  parts
}

/// Splits `./images/icon-` into the `./images` directory and the `./icon-`
/// prefix of the files within it.
fn split_context_from_prefix(prefix: &str) -> (String, String) {
  match prefix.rfind('/') {
    Some(index) => (
      prefix[..index].to_string(),
      format!(".{}", &prefix[index..]),
    ),
    None => (".".to_string(), prefix.to_string()),
  }
}
