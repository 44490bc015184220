// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;
use std::sync::Arc;

use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::Lit;
use deno_ast::swc::ast::Prop;
use deno_ast::swc::ast::PropName;
use deno_ast::swc::ast::PropOrSpread;
use deno_ast::swc::ast::Stmt;
use deno_ast::swc::ast::UnaryOp;
use deno_ast::MediaType;
use deno_ast::ModuleSpecifier;
use deno_ast::MultiThreadedComments;
use deno_ast::ParseParams;
use deno_ast::ProgramRef;
use deno_ast::SourceRangedForSpanned;
use deno_ast::SourceTextInfo;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::context::JsRegExp;
use crate::evaluate::number_to_string;
use crate::graph::ByteRange;
use crate::graph::PositionRange;

/// Matches comments that carry directives (ex. `webpackIgnore: true`).
static MAGIC_COMMENT_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(^|\W)webpack[A-Z]+[A-Za-z]+:").unwrap());

/// A value written in a directive comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum DirectiveValue {
  Bool(bool),
  Number(f64),
  String(String),
  Null,
  Undefined,
  RegExp(JsRegExp),
  Array(Vec<DirectiveValue>),
}

impl fmt::Display for DirectiveValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DirectiveValue::Bool(value) => write!(f, "{}", value),
      DirectiveValue::Number(value) => {
        write!(f, "{}", number_to_string(*value))
      }
      DirectiveValue::String(value) => write!(f, "{}", value),
      DirectiveValue::Null => write!(f, "null"),
      DirectiveValue::Undefined => write!(f, "undefined"),
      DirectiveValue::RegExp(reg_exp) => write!(f, "{}", reg_exp),
      DirectiveValue::Array(values) => {
        for (i, value) in values.iter().enumerate() {
          if i > 0 {
            write!(f, ",")?;
          }
          // holes and nullish values print as empty in arrays
          if !matches!(value, DirectiveValue::Null | DirectiveValue::Undefined)
          {
            write!(f, "{}", value)?;
          }
        }
        Ok(())
      }
    }
  }
}

/// A directive comment that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentError {
  /// The text of the comment, without the comment delimiters.
  pub comment: String,
  pub message: String,
  pub range: PositionRange,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommentOptions {
  pub options: IndexMap<String, DirectiveValue>,
  pub errors: Vec<CommentError>,
}

#[derive(Debug, Clone)]
struct IndexedComment {
  byte_range: ByteRange,
  range: PositionRange,
  text: String,
}

/// Block and line comments of a module, sorted by position, for looking up
/// the directives written inside a call-site.
#[derive(Debug, Default, Clone)]
pub struct CommentIndex {
  comments: Vec<IndexedComment>,
}

impl CommentIndex {
  pub fn new(
    comments: &MultiThreadedComments,
    text_info: &SourceTextInfo,
  ) -> Self {
    let mut comments = comments
      .iter_unstable()
      .map(|comment| {
        let source_range = comment.range();
        IndexedComment {
          byte_range: ByteRange::from_source_range(source_range, text_info),
          range: PositionRange::from_source_range(source_range, text_info),
          text: comment.text.to_string(),
        }
      })
      .collect::<Vec<_>>();
    comments.sort_by_key(|c| (c.byte_range.start, c.byte_range.end));
    Self { comments }
  }

  /// Collects the directive options of every magic comment that lies
  /// within `range`. A comment that fails to compile contributes no
  /// options and is reported in `errors`.
  pub fn parse_comment_options(&self, range: ByteRange) -> CommentOptions {
    let mut result = CommentOptions::default();
    let start = self
      .comments
      .partition_point(|c| c.byte_range.start < range.start);
    for comment in &self.comments[start..] {
      if comment.byte_range.start >= range.end {
        break;
      }
      if !range.contains(&comment.byte_range)
        || !MAGIC_COMMENT_RE.is_match(&comment.text)
      {
        continue;
      }
      match parse_directive_object(&comment.text) {
        Ok(options) => result.options.extend(options),
        Err(message) => result.errors.push(CommentError {
          comment: comment.text.clone(),
          message,
          range: comment.range.clone(),
        }),
      }
    }
    result
  }
}

/// Evaluates the comment text as the body of an object literal.
fn parse_directive_object(
  text: &str,
) -> Result<Vec<(String, DirectiveValue)>, String> {
  let parsed_source = deno_ast::parse_program(ParseParams {
    specifier: ModuleSpecifier::parse("file:///magic-comment.js")
      .map_err(|err| err.to_string())?,
    text: Arc::from(format!("({{{}\n}})", text)),
    media_type: MediaType::JavaScript,
    capture_tokens: false,
    scope_analysis: false,
    maybe_syntax: None,
  })
  .map_err(|diagnostic| diagnostic.kind.msg().to_string())?;
  if let Some(diagnostic) = parsed_source.diagnostics().first() {
    return Err(diagnostic.kind.msg().to_string());
  }

  let stmt = match parsed_source.program_ref() {
    ProgramRef::Module(module) => match module.body.as_slice() {
      [item] => item.as_stmt(),
      _ => None,
    },
    ProgramRef::Script(script) => match script.body.as_slice() {
      [stmt] => Some(stmt),
      _ => None,
    },
  };
  let object = match stmt {
    Some(Stmt::Expr(expr_stmt)) => match &*expr_stmt.expr {
      Expr::Paren(paren) => match &*paren.expr {
        Expr::Object(object) => object,
        _ => return Err("Unexpected token".to_string()),
      },
      _ => return Err("Unexpected token".to_string()),
    },
    _ => return Err("Unexpected token".to_string()),
  };

  let mut options = Vec::with_capacity(object.props.len());
  for prop in &object.props {
    let PropOrSpread::Prop(prop) = prop else {
      return Err("Spread is not supported in magic comments".to_string());
    };
    match &**prop {
      Prop::KeyValue(key_value) => {
        let key = prop_name_text(&key_value.key)?;
        let value = directive_value(&key_value.value)?;
        options.push((key, value));
      }
      Prop::Shorthand(ident) => {
        return Err(format!("{} is not defined", ident.sym));
      }
      _ => {
        return Err("Only values are supported in magic comments".to_string())
      }
    }
  }
  Ok(options)
}

fn prop_name_text(name: &PropName) -> Result<String, String> {
  match name {
    PropName::Ident(ident) => Ok(ident.sym.to_string()),
    PropName::Str(str_) => Ok(str_.value.to_string()),
    PropName::Num(num) => Ok(DirectiveValue::Number(num.value).to_string()),
    PropName::Computed(_) | PropName::BigInt(_) => {
      Err("Computed keys are not supported in magic comments".to_string())
    }
  }
}

fn directive_value(expr: &Expr) -> Result<DirectiveValue, String> {
  match expr {
    Expr::Lit(Lit::Bool(value)) => Ok(DirectiveValue::Bool(value.value)),
    Expr::Lit(Lit::Num(num)) => Ok(DirectiveValue::Number(num.value)),
    Expr::Lit(Lit::Str(str_)) => {
      Ok(DirectiveValue::String(str_.value.to_string()))
    }
    Expr::Lit(Lit::Null(_)) => Ok(DirectiveValue::Null),
    Expr::Lit(Lit::Regex(regex)) => Ok(DirectiveValue::RegExp(JsRegExp::new(
      regex.exp.to_string(),
      regex.flags.to_string(),
    ))),
    Expr::Ident(ident) if &*ident.sym == "undefined" => {
      Ok(DirectiveValue::Undefined)
    }
    Expr::Unary(unary) if unary.op == UnaryOp::Minus => {
      match directive_value(&unary.arg)? {
        DirectiveValue::Number(value) => Ok(DirectiveValue::Number(-value)),
        _ => Err("Only numbers can be negated in magic comments".to_string()),
      }
    }
    Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
      let text = tpl
        .quasis
        .iter()
        .filter_map(|quasi| quasi.cooked.as_ref())
        .map(|cooked| cooked.to_string())
        .collect::<String>();
      Ok(DirectiveValue::String(text))
    }
    Expr::Paren(paren) => directive_value(&paren.expr),
    Expr::Array(array) => array
      .elems
      .iter()
      .map(|elem| match elem {
        Some(elem) if elem.spread.is_none() => directive_value(&elem.expr),
        Some(_) => Err("Spread is not supported in magic comments".to_string()),
        None => Ok(DirectiveValue::Undefined),
      })
      .collect::<Result<Vec<_>, _>>()
      .map(DirectiveValue::Array),
    Expr::Ident(ident) => Err(format!("{} is not defined", ident.sym)),
    _ => Err("Only literal values are supported in magic comments".to_string()),
  }
}
