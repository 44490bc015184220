// Copyright 2018-2024 the Deno authors. MIT license.

pub type ModuleSpecifier = url::Url;

/// Resolves a `new URL(request, import.meta.url)` request against the
/// location of the module containing it, following the WHATWG URL parser
/// (relative references, dot segments, query and fragment are kept).
pub fn resolve_url(
  request: &str,
  referrer: &ModuleSpecifier,
) -> Result<ModuleSpecifier, url::ParseError> {
  referrer.join(request)
}
