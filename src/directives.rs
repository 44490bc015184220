// Copyright 2018-2024 the Deno authors. MIT license.

use thiserror::Error;

use crate::comments::CommentOptions;
use crate::comments::DirectiveValue;
use crate::context::JsRegExp;

pub const WEBPACK_IGNORE: &str = "webpackIgnore";
pub const WEBPACK_INCLUDE: &str = "webpackInclude";
pub const WEBPACK_EXCLUDE: &str = "webpackExclude";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectiveError {
  #[error("`{name}` expected a boolean, but received: {value}.")]
  ExpectedBoolean {
    name: &'static str,
    value: DirectiveValue,
  },
  #[error("`{name}` expected a regular expression, but received: {value}.")]
  ExpectedRegExp {
    name: &'static str,
    value: DirectiveValue,
  },
}

/// The directives that validated, with the name of every rejected one
/// alongside the reason.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UrlDirectives {
  pub ignore: Option<bool>,
  pub include: Option<JsRegExp>,
  pub exclude: Option<JsRegExp>,
  pub errors: Vec<(&'static str, DirectiveError)>,
}

impl UrlDirectives {
  pub fn from_options(options: &CommentOptions) -> Self {
    let mut directives = UrlDirectives::default();
    directives.ignore =
      directives.accept(WEBPACK_IGNORE, options, validate_ignore);
    directives.include =
      directives.accept(WEBPACK_INCLUDE, options, validate_reg_exp);
    directives.exclude =
      directives.accept(WEBPACK_EXCLUDE, options, validate_reg_exp);
    directives
  }

  fn accept<T>(
    &mut self,
    name: &'static str,
    options: &CommentOptions,
    validate: impl FnOnce(
      &'static str,
      &DirectiveValue,
    ) -> Result<Option<T>, DirectiveError>,
  ) -> Option<T> {
    let value = options.options.get(name)?;
    match validate(name, value) {
      Ok(value) => value,
      Err(err) => {
        self.errors.push((name, err));
        None
      }
    }
  }
}

/// `undefined` means the directive is absent.
fn validate_ignore(
  name: &'static str,
  value: &DirectiveValue,
) -> Result<Option<bool>, DirectiveError> {
  match value {
    DirectiveValue::Undefined => Ok(None),
    DirectiveValue::Bool(value) => Ok(Some(*value)),
    _ => Err(DirectiveError::ExpectedBoolean {
      name,
      value: value.clone(),
    }),
  }
}

fn validate_reg_exp(
  name: &'static str,
  value: &DirectiveValue,
) -> Result<Option<JsRegExp>, DirectiveError> {
  match value {
    DirectiveValue::Undefined => Ok(None),
    DirectiveValue::RegExp(reg_exp) => Ok(Some(reg_exp.clone())),
    _ => Err(DirectiveError::ExpectedRegExp {
      name,
      value: value.clone(),
    }),
  }
}
