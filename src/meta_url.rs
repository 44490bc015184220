// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::MemberProp;
use deno_ast::swc::ast::MetaPropKind;

/// A member expression split into the object it starts from and the
/// statically named properties accessed on it (ex. `a.b.c` is `a` with
/// `["b", "c"]`). Extraction stops at the first computed or private access,
/// which then becomes part of the object.
pub struct MemberExpressionChain<'a> {
  pub object: &'a Expr,
  pub members: Vec<&'a str>,
}

pub fn extract_member_expression_chain(expr: &Expr) -> MemberExpressionChain {
  let mut members = Vec::new();
  let mut object = expr;
  while let Expr::Member(member) = object {
    match &member.prop {
      MemberProp::Ident(ident) => {
        members.push(&*ident.sym);
        object = &member.obj;
      }
      MemberProp::Computed(_) | MemberProp::PrivateName(_) => break,
    }
  }
  members.reverse();
  MemberExpressionChain { object, members }
}

/// Whether the expression is exactly `import.meta.url`.
pub fn is_meta_url(expr: &Expr) -> bool {
  let chain = extract_member_expression_chain(expr);
  chain.members == ["url"]
    && matches!(
      chain.object,
      Expr::MetaProp(meta) if meta.kind == MetaPropKind::ImportMeta
    )
}
