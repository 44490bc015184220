// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;

use deno_ast::swc::ast::BinaryOp;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::Lit;
use deno_ast::swc::ast::NewExpr;
use serde::Deserialize;
use serde::Serialize;

use crate::graph::ByteRange;
use crate::meta_url::is_meta_url;

/// The result of evaluating the first argument of `new URL(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum EvaluatedArgument {
  /// Not a compile time constant.
  Unknown,
  ConstantString(String),
}

impl EvaluatedArgument {
  pub fn as_string(&self) -> Option<&str> {
    match self {
      EvaluatedArgument::ConstantString(value) => Some(value),
      EvaluatedArgument::Unknown => None,
    }
  }
}

/// Reduces an expression to a constant when possible.
pub trait ExpressionEvaluator {
  fn evaluate_expression(&self, expr: &Expr) -> EvaluatedArgument;
}

/// Folds string, number and template literals and `+` concatenations of
/// them. Everything else is unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExpressionEvaluator;

impl ExpressionEvaluator for DefaultExpressionEvaluator {
  fn evaluate_expression(&self, expr: &Expr) -> EvaluatedArgument {
    match evaluate_to_string(expr) {
      Some(value) => EvaluatedArgument::ConstantString(value),
      None => EvaluatedArgument::Unknown,
    }
  }
}

fn evaluate_to_string(expr: &Expr) -> Option<String> {
  match unwrap_type_expr(expr) {
    Expr::Lit(Lit::Str(str_)) => Some(str_.value.to_string()),
    Expr::Lit(Lit::Num(num)) => Some(number_to_string(num.value)),
    Expr::Paren(paren) => evaluate_to_string(&paren.expr),
    Expr::Tpl(tpl) => {
      let mut text = String::new();
      for (i, quasi) in tpl.quasis.iter().enumerate() {
        text.push_str(&quasi.cooked.as_ref()?.to_string());
        if let Some(expr) = tpl.exprs.get(i) {
          text.push_str(&evaluate_to_string(expr)?);
        }
      }
      Some(text)
    }
    Expr::Bin(bin) if bin.op == BinaryOp::Add => {
      // `1 + 2 + "a"` is "3a", so only fold when a string is involved
      if !is_string_like(&bin.left) && !is_string_like(&bin.right) {
        return None;
      }
      let left = evaluate_to_string(&bin.left)?;
      let right = evaluate_to_string(&bin.right)?;
      Some(left + right.as_str())
    }
    _ => None,
  }
}

fn is_string_like(expr: &Expr) -> bool {
  match unwrap_type_expr(expr) {
    Expr::Lit(Lit::Str(_)) | Expr::Tpl(_) => true,
    Expr::Paren(paren) => is_string_like(&paren.expr),
    Expr::Bin(bin) if bin.op == BinaryOp::Add => {
      is_string_like(&bin.left) || is_string_like(&bin.right)
    }
    _ => false,
  }
}

/// Looks through TypeScript wrappers that don't change the runtime value
/// (ex. `"./a.wasm" as string` or `path!`).
pub(crate) fn unwrap_type_expr(expr: &Expr) -> &Expr {
  match expr {
    Expr::TsAs(as_expr) => unwrap_type_expr(&as_expr.expr),
    Expr::TsSatisfies(satisfies) => unwrap_type_expr(&satisfies.expr),
    Expr::TsNonNull(non_null) => unwrap_type_expr(&non_null.expr),
    Expr::TsConstAssertion(assertion) => unwrap_type_expr(&assertion.expr),
    Expr::TsTypeAssertion(assertion) => unwrap_type_expr(&assertion.expr),
    _ => expr,
  }
}

/// Formats a number the way JavaScript's `Number.prototype.toString` does.
pub(crate) fn number_to_string(value: f64) -> String {
  if value.is_nan() {
    return "NaN".to_string();
  }
  if value.is_infinite() {
    return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
  }
  if value == 0.0 {
    // includes -0
    return "0".to_string();
  }
  let abs = value.abs();
  if (1e-6..1e21).contains(&abs) {
    // shortest round-trip digits, never in exponent form
    return value.to_string();
  }
  let text = format!("{:e}", value);
  match text.split_once('e') {
    Some((mantissa, exponent)) if !exponent.starts_with('-') => {
      format!("{}e+{}", mantissa, exponent)
    }
    _ => text,
  }
}

/// Identifies a call-site within a single parse pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteId(ByteRange);

impl CallSiteId {
  pub fn new(range: ByteRange) -> Self {
    Self(range)
  }
}

/// Memoizes the evaluation of `new URL(arg, import.meta.url)` call-sites.
///
/// Owned by a single parse pass and dropped with it, since ids are only
/// unique within one module's source.
#[derive(Debug, Default)]
pub struct EvaluationCache {
  entries: HashMap<CallSiteId, Option<EvaluatedArgument>>,
}

impl EvaluationCache {
  /// Returns `None` when the call-site isn't shaped like
  /// `new URL(arg, import.meta.url)`, otherwise the evaluated first argument.
  pub fn evaluate(
    &mut self,
    id: CallSiteId,
    expr: &NewExpr,
    evaluator: &dyn ExpressionEvaluator,
  ) -> Option<EvaluatedArgument> {
    self
      .entries
      .entry(id)
      .or_insert_with(|| evaluate_new_url_argument(expr, evaluator))
      .clone()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

fn evaluate_new_url_argument(
  expr: &NewExpr,
  evaluator: &dyn ExpressionEvaluator,
) -> Option<EvaluatedArgument> {
  let [arg1, arg2] = expr.args.as_deref()? else {
    return None;
  };
  if arg1.spread.is_some()
    || arg2.spread.is_some()
    || !matches!(&*arg2.expr, Expr::Member(_))
    || !is_meta_url(&arg2.expr)
  {
    return None;
  }
  Some(evaluator.evaluate_expression(&arg1.expr))
}
