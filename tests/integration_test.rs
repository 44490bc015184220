// Copyright 2018-2024 the Deno authors. MIT license.

use std::cell::Cell;

use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::ModuleItem;
use deno_ast::swc::ast::NewExpr;
use deno_ast::swc::ast::Stmt;
use deno_ast::ParsedSource;
use deno_ast::ProgramRef;
use dynamic_url::analyze_module;
use dynamic_url::analyze_parsed_source_with;
use dynamic_url::serialization::ObjectReader;
use dynamic_url::serialization::ObjectWriter;
use dynamic_url::serialization::SerializableDependency;
use dynamic_url::AnalyzeOptions;
use dynamic_url::ByteRange;
use dynamic_url::CallSite;
use dynamic_url::CommentIndex;
use dynamic_url::CompilationHooks;
use dynamic_url::ContextMode;
use dynamic_url::DefaultContextDependencyFactory;
use dynamic_url::DefaultEsParser;
use dynamic_url::DefaultExpressionEvaluator;
use dynamic_url::Dependency;
use dynamic_url::DependencyCategory;
use dynamic_url::DependencyKind;
use dynamic_url::DependencyTemplate;
use dynamic_url::DescribeDependency;
use dynamic_url::DiagnosticSeverity;
use dynamic_url::DynamicUrlPlugin;
use dynamic_url::EsParser;
use dynamic_url::EvaluatedArgument;
use dynamic_url::EvaluatedUrl;
use dynamic_url::EvaluationCache;
use dynamic_url::ExpressionEvaluator;
use dynamic_url::JsRegExp;
use dynamic_url::LogLevel;
use dynamic_url::MediaType;
use dynamic_url::ModuleFactory;
use dynamic_url::ModuleSpecifier;
use dynamic_url::ModuleType;
use dynamic_url::ModuleUrlInfo;
use dynamic_url::ParseOptions;
use dynamic_url::ParserHooks;
use dynamic_url::ParserOptions;
use dynamic_url::ParserSetup;
use dynamic_url::ParserState;
use dynamic_url::PluginOptions;
use dynamic_url::ScopeTracker;
use dynamic_url::UrlContextDependency;
use dynamic_url::UrlDiagnostic;
use dynamic_url::UrlOption;
use dynamic_url::UrlParserPlugin;
use dynamic_url::UsedByExports;
use pretty_assertions::assert_eq;
use serde_json::json;

const SPECIFIER: &str = "file:///project/src/main.js";

fn specifier() -> ModuleSpecifier {
  ModuleSpecifier::parse(SPECIFIER).unwrap()
}

fn static_options() -> PluginOptions {
  PluginOptions {
    enable_static_url: true,
    ..Default::default()
  }
}

fn analyze_with(
  source: &str,
  plugin_options: &PluginOptions,
  parser_options: &ParserOptions,
) -> ModuleUrlInfo {
  let specifier = specifier();
  analyze_module(AnalyzeOptions {
    specifier: &specifier,
    source: source.into(),
    media_type: MediaType::JavaScript,
    module_type: ModuleType::JavascriptEsm,
    plugin_options,
    parser_options,
    parser: None,
  })
  .unwrap()
  .unwrap()
}

fn analyze(source: &str) -> ModuleUrlInfo {
  analyze_with(source, &static_options(), &ParserOptions::default())
}

fn parse(source: &str) -> ParsedSource {
  DefaultEsParser
    .parse_program(ParseOptions {
      specifier: &specifier(),
      source: source.into(),
      media_type: MediaType::JavaScript,
      scope_analysis: false,
    })
    .unwrap()
}

fn first_new_expr(parsed_source: &ParsedSource) -> &NewExpr {
  let ProgramRef::Module(module) = parsed_source.program_ref() else {
    unreachable!();
  };
  match &module.body[0] {
    ModuleItem::Stmt(Stmt::Expr(stmt)) => match &*stmt.expr {
      Expr::New(expr) => expr,
      _ => unreachable!(),
    },
    _ => unreachable!(),
  }
}

fn context_dependencies(info: &ModuleUrlInfo) -> Vec<&UrlContextDependency> {
  info
    .dependencies
    .iter()
    .filter_map(|dep| dep.as_context())
    .collect()
}

#[test]
fn test_shape_mismatch_is_ignored() {
  let sources = [
    r#"new URL("./a.png");"#,
    r#"new URL("./a.png", import.meta.url, "extra");"#,
    r#"new URL("./a.png", import.meta.url.href);"#,
    r#"new URL("./a.png", import.meta.dirname);"#,
    r#"new URL("./a.png", import.meta["url"]);"#,
    r#"new URL(...parts, import.meta.url);"#,
    r#"new URL(`./img/${name}.png`, location.href);"#,
    r#"new URL(/* webpackIgnore: tru e */ "./a.png", document.baseURI);"#,
  ];
  for source in sources {
    let info = analyze(source);
    assert!(info.dependencies.is_empty(), "{}", source);
    assert!(info.presentational_dependencies.is_empty(), "{}", source);
    assert_eq!(info.diagnostics().count(), 0, "{}", source);
    assert!(info.pure_expressions.is_empty(), "{}", source);
  }
}

#[test]
fn test_empty_request() {
  let sources = [
    r#"new URL("", import.meta.url);"#,
    r#"new URL("" + ``, import.meta.url);"#,
    r#"new URL(/* webpackInclude: /a/ */ "", import.meta.url);"#,
  ];
  for source in sources {
    let info = analyze(source);
    assert!(info.dependencies.is_empty(), "{}", source);
    assert!(info.pure_expressions.is_empty(), "{}", source);
  }
}

#[test]
fn test_static_url() {
  let source = r#"const logo = new URL("./img/logo.png", import.meta.url);"#;
  let info = analyze_with(
    source,
    &static_options(),
    &ParserOptions {
      url: UrlOption::Relative,
      ..Default::default()
    },
  );
  assert_eq!(info.dependencies.len(), 1);
  let dep = info.dependencies[0].as_url().unwrap();
  assert_eq!(dep.request, "file:///project/src/img/logo.png");
  assert!(dep.relative);
  assert_eq!(dep.range, ByteRange::new(13, 55));
  assert_eq!(dep.range_of_request_args, ByteRange::new(21, 54));
  assert_eq!(
    dep.used_by_exports,
    UsedByExports::TopLevelSymbol("logo".to_string())
  );
  assert_eq!(dep.loc.to_string(), "1:14");
  assert_eq!(info.dependencies[0].dependency_type(), "new URL()");
  assert_eq!(info.pure_expressions, vec![ByteRange::new(13, 55)]);

  let info = analyze(source);
  assert!(!info.dependencies[0].as_url().unwrap().relative);
}

#[test]
fn test_static_url_json() {
  let info = analyze(r#"new URL("../assets/font.woff2?v=1", import.meta.url);"#);
  assert_eq!(
    serde_json::to_value(&info).unwrap(),
    json!({
      "specifier": SPECIFIER,
      "dependencies": [{
        "kind": "url",
        "request": "file:///project/assets/font.woff2?v=1",
        "rangeOfRequestArgs": { "start": 8, "end": 51 },
        "range": { "start": 0, "end": 52 },
        "relative": false,
        "usedByExports": "unknown",
        "loc": {
          "start": { "line": 0, "character": 0 },
          "end": { "line": 0, "character": 52 },
        },
      }],
      "pureExpressions": [{ "start": 0, "end": 52 }],
    })
  );
}

#[test]
fn test_static_url_disabled() {
  let options = PluginOptions::default();
  let info = analyze_with(
    r#"
new URL("./a.png", import.meta.url);
new URL(/* webpackIgnore: true */ "./b.png", import.meta.url);
new URL(`./img/${name}.png`, import.meta.url);
"#,
    &options,
    &ParserOptions::default(),
  );
  assert_eq!(info.dependencies.len(), 1);
  assert!(info.dependencies[0].as_context().is_some());
  assert!(info.presentational_dependencies.is_empty());
  assert!(info.pure_expressions.is_empty());
  assert_eq!(info.diagnostics().count(), 0);
}

#[test]
fn test_invalid_static_url() {
  let info = analyze(r#"new URL("http://[::1", import.meta.url);"#);
  assert!(info.dependencies.is_empty());
  assert!(info.warnings.is_empty());
  assert_eq!(info.errors.len(), 1);
  let error = &info.errors[0];
  assert_eq!(error.severity(), DiagnosticSeverity::Error);
  assert_eq!(
    error.to_string_with_range(&specifier()),
    "Invalid URL \"http://[::1\": invalid IPv6 address\n    at file:///project/src/main.js:1:1"
  );
}

#[test]
fn test_webpack_ignore() {
  let info =
    analyze(r#"new URL(/* webpackIgnore: true */ "./a.png", import.meta.url);"#);
  assert!(info.dependencies.is_empty());
  assert!(info.warnings.is_empty());
  assert_eq!(info.presentational_dependencies.len(), 1);
  let dep = &info.presentational_dependencies[0];
  assert_eq!(dep.expression, "__webpack_require__.b");
  assert_eq!(dep.range, ByteRange::new(45, 60));
  assert_eq!(dep.dependency_type(), "const");

  let info = analyze(
    r#"new URL(/* webpackIgnore: false */ "./a.png", import.meta.url);"#,
  );
  assert_eq!(info.dependencies.len(), 1);
  assert!(info.presentational_dependencies.is_empty());

  // ignored dynamic requests are not turned into contexts either
  let info = analyze(
    r#"new URL(/* webpackIgnore: true */ `./img/${name}.png`, import.meta.url);"#,
  );
  assert!(info.dependencies.is_empty());
  assert_eq!(info.presentational_dependencies.len(), 1);
}

#[test]
fn test_webpack_ignore_not_boolean() {
  let info = analyze(
    r#"new URL(/* webpackIgnore: "yes" */ "./a.png", import.meta.url);"#,
  );
  assert!(info.presentational_dependencies.is_empty());
  assert_eq!(info.warnings.len(), 1);
  assert_eq!(
    info.warnings[0].to_string(),
    "`webpackIgnore` expected a boolean, but received: yes."
  );
  assert!(matches!(
    info.warnings[0],
    UrlDiagnostic::UnsupportedFeature { .. }
  ));
  assert_eq!(info.dependencies.len(), 1);
  assert_eq!(
    info.dependencies[0].as_url().unwrap().request,
    "file:///project/src/a.png"
  );
}

#[test]
fn test_dynamic_context() {
  let source = r#"const icon = new URL(/* webpackInclude: /\.png$/ */ /* webpackExclude: "x" */ `./img/${name}.png`, import.meta.url);"#;
  let info = analyze(source);
  assert_eq!(info.warnings.len(), 1);
  assert_eq!(
    info.warnings[0].to_string(),
    "`webpackExclude` expected a regular expression, but received: x."
  );
  let deps = context_dependencies(&info);
  assert_eq!(deps.len(), 1);
  let dep = deps[0];
  let arg1_start = source.find('`').unwrap();
  let arg2_end = source.find("import.meta.url").unwrap() + 15;
  assert_eq!(dep.value_range, ByteRange::new(arg1_start, arg2_end));
  assert_eq!(dep.base.range, ByteRange::new(13, source.len() - 1));
  assert!(!dep.base.optional);

  let options = &dep.base.options;
  assert_eq!(options.request, "./img");
  assert!(options.recursive);
  assert_eq!(options.reg_exp, Some(JsRegExp::new(r"^\./.*\.png$", "")));
  assert_eq!(options.include, Some(JsRegExp::new(r"\.png$", "")));
  assert_eq!(options.exclude, None);
  assert_eq!(options.mode, ContextMode::Sync);
  assert_eq!(options.category, DependencyCategory::Url);
  assert_eq!(options.type_prefix, "new URL with import.meta.url");
  assert!(options.matches("./icons/a.png"));
  assert!(!options.matches("./icons/a.svg"));
  assert_eq!(info.dependencies[0].dependency_type(), "new URL() context");
  assert!(info.pure_expressions.is_empty());
}

#[test]
fn test_malformed_comment() {
  let info = analyze(
    r#"new URL(/* webpackInclude: /\.png$/, webpackMode: lazy */ `./img/${name}`, import.meta.url);"#,
  );
  assert_eq!(info.warnings.len(), 1);
  let warning = &info.warnings[0];
  assert_eq!(warning.severity(), DiagnosticSeverity::Warning);
  match warning {
    UrlDiagnostic::CommentCompilation { message, .. } => {
      assert_eq!(message, "lazy is not defined");
    }
    _ => unreachable!(),
  }
  let deps = context_dependencies(&info);
  assert_eq!(deps.len(), 1);
  assert_eq!(deps[0].base.options.include, None);
}

#[test]
fn test_optional_in_try() {
  let info = analyze(
    r#"
try {
  new URL(`./locales/${lang}.json`, import.meta.url);
} catch (err) {
  console.error(err);
}
new URL(`./locales/${lang}.json`, import.meta.url);
"#,
  );
  let optional = context_dependencies(&info)
    .iter()
    .map(|dep| dep.base.optional)
    .collect::<Vec<_>>();
  assert_eq!(optional, vec![true, false]);
}

#[test]
fn test_no_pattern_derivable() {
  let info = analyze(
    r#"
new URL(name, import.meta.url);
new URL(`${dir}${name}`, import.meta.url);
"#,
  );
  assert!(info.dependencies.is_empty());
  assert_eq!(info.diagnostics().count(), 0);
}

#[test]
fn test_evaluation_cache() {
  struct CountingEvaluator {
    calls: Cell<usize>,
  }

  impl ExpressionEvaluator for CountingEvaluator {
    fn evaluate_expression(&self, expr: &Expr) -> EvaluatedArgument {
      self.calls.set(self.calls.get() + 1);
      DefaultExpressionEvaluator.evaluate_expression(expr)
    }
  }

  let parsed_source = parse(
    r#"
const a = new URL("./a.png", import.meta.url);
const b = new URL(`./img/${name}.png`, import.meta.url);
const c = new URL("./c.png", "https://example.com");
"#,
  );
  let parser_options = ParserOptions::default();
  let plugin = UrlParserPlugin::new(static_options(), parser_options.clone());
  let evaluator = CountingEvaluator {
    calls: Cell::new(0),
  };
  let info = analyze_parsed_source_with(
    &plugin,
    &parsed_source,
    &evaluator,
    &DefaultContextDependencyFactory::new(&parser_options),
  );
  assert_eq!(info.dependencies.len(), 2);
  assert_eq!(info.pure_expressions.len(), 1);
  // the purity check and the dependency construction share one evaluation
  assert_eq!(evaluator.calls.get(), 2);
}

#[test]
fn test_is_pure() {
  let cases = [
    (r#"new URL("./a.png", import.meta.url);"#, 1),
    (r#"new URL(name, import.meta.url);"#, 0),
    (r#"new MyURL("./a.png", import.meta.url);"#, 0),
    (r#"import { URL } from "./url.js"; new URL("./a.png", import.meta.url);"#, 0),
    (r#"function f(URL) { new URL("./a.png", import.meta.url); }"#, 0),
    (r#"new URL("", import.meta.url);"#, 0),
  ];
  for (source, expected) in cases {
    let info = analyze(source);
    assert_eq!(info.pure_expressions.len(), expected, "{}", source);
  }
}

#[test]
fn test_parser_plugin_hooks() {
  let plugin = UrlParserPlugin::new(static_options(), ParserOptions::default());
  let check_in = |source: &str, scope: &ScopeTracker| {
    let parsed_source = parse(source);
    let text_info = parsed_source.text_info_lazy();
    let comments = CommentIndex::new(parsed_source.comments(), text_info);
    let mut module = ModuleUrlInfo::new(specifier());
    let mut cache = EvaluationCache::default();
    let context_factory = DefaultContextDependencyFactory::default();
    let mut state = ParserState {
      text_info,
      comments: &comments,
      evaluator: &DefaultExpressionEvaluator,
      context_factory: &context_factory,
      scope,
      module: &mut module,
      cache: &mut cache,
    };
    let call = CallSite::new(first_new_expr(&parsed_source), text_info, false);
    let is_pure = plugin.is_pure(&mut state, &call);
    let evaluated = plugin.evaluate_new_url(&mut state, &call);
    assert_eq!(cache.len(), 1);
    (is_pure, evaluated)
  };
  let check = |source: &str| check_in(source, &ScopeTracker::default());

  assert_eq!(
    check(r#"new URL("./a.png?x#y", import.meta.url);"#),
    (
      Some(true),
      Some(EvaluatedUrl {
        value: "file:///project/src/a.png?x#y".to_string(),
        range: ByteRange::new(0, 39),
      })
    )
  );
  assert_eq!(check(r#"new URL(name, import.meta.url);"#), (None, None));
  assert_eq!(
    check(r#"new URL("http://[::1", import.meta.url);"#),
    (Some(true), None)
  );
  assert_eq!(
    check(r#"new URL("./a.png", document.baseURI);"#),
    (None, None)
  );
  assert_eq!(check(r#"new URL("", import.meta.url);"#), (None, None));

  // only the free `URL` global is pure
  let mut shadowed = ScopeTracker::default();
  shadowed.declare("URL");
  let (is_pure, _) =
    check_in(r#"new URL("./a.png", import.meta.url);"#, &shadowed);
  assert_eq!(is_pure, None);
  let (is_pure, _) = check(r#"new MyURL("./a.png", import.meta.url);"#);
  assert_eq!(is_pure, None);
}

#[test]
fn test_serialization_round_trip() {
  let info = analyze(
    r#"
try {
  new URL(/* webpackInclude: /\.json$/i */ "./locales/" + lang, import.meta.url);
} finally {}
"#,
  );
  let deps = context_dependencies(&info);
  assert_eq!(deps.len(), 1);
  let dep = deps[0];
  assert!(dep.base.optional);

  let mut writer = ObjectWriter::new();
  dep.serialize(&mut writer).unwrap();
  info.dependencies[0].serialize(&mut writer).unwrap();
  let bytes = writer.into_bytes();

  let mut reader = ObjectReader::new(&bytes);
  let restored = UrlContextDependency::deserialize(&mut reader).unwrap();
  assert_eq!(restored.value_range, dep.value_range);
  assert_eq!(restored.base, dep.base);
  let restored = Dependency::deserialize(&mut reader).unwrap();
  assert_eq!(restored, info.dependencies[0]);
  assert!(reader.is_empty());
}

#[derive(Default)]
struct FakeCompilation {
  events: Vec<String>,
}

impl CompilationHooks for FakeCompilation {
  fn set_dependency_template(
    &mut self,
    kind: DependencyKind,
    template: DependencyTemplate,
  ) {
    self
      .events
      .push(format!("template {:?} {:?}", kind, template));
  }

  fn set_dependency_factory(
    &mut self,
    kind: DependencyKind,
    factory: ModuleFactory,
  ) {
    self.events.push(format!("factory {:?} {:?}", kind, factory));
  }
}

#[derive(Default)]
struct FakeParsers {
  setups: Vec<(ModuleType, ParserSetup)>,
}

impl ParserHooks for FakeParsers {
  fn tap(&mut self, module_type: ModuleType, setup: ParserSetup) {
    self.setups.push((module_type, setup));
  }
}

#[test]
fn test_register_on_fake_pipeline() {
  let _ = env_logger::builder().is_test(true).try_init();
  let plugin = DynamicUrlPlugin::new(PluginOptions {
    enable_static_url: true,
    enable_logging: true,
    log_level: LogLevel::Debug,
    ..Default::default()
  });
  let mut compilation = FakeCompilation::default();
  let mut parsers = FakeParsers::default();
  assert!(plugin.register_on(&mut compilation, &mut parsers));
  assert_eq!(
    compilation.events,
    vec![
      "template UrlContext ContextAsRequireCall",
      "factory UrlContext Context",
    ]
  );
  let module_types = parsers
    .setups
    .iter()
    .map(|(module_type, _)| module_type.as_str())
    .collect::<Vec<_>>();
  assert_eq!(module_types, vec!["javascript/auto", "javascript/esm"]);

  let (_, setup) = &parsers.setups[1];
  let parser_plugin = setup.setup(&ParserOptions::default());
  let info = dynamic_url::analyze_parsed_source(
    &parser_plugin,
    &parse(r#"new URL("./a.png", import.meta.url);"#),
  );
  assert_eq!(info.dependencies.len(), 1);
}

#[test]
fn test_plugin_disabled() {
  let specifier = specifier();
  let options = PluginOptions {
    enabled: false,
    ..static_options()
  };
  let result = analyze_module(AnalyzeOptions {
    specifier: &specifier,
    source: r#"new URL("./a.png", import.meta.url);"#.into(),
    media_type: MediaType::JavaScript,
    module_type: ModuleType::JavascriptEsm,
    plugin_options: &options,
    parser_options: &ParserOptions::default(),
    parser: None,
  })
  .unwrap();
  assert_eq!(result, None);
}

#[test]
fn test_unregistered_module_type() {
  let specifier = specifier();
  let result = analyze_module(AnalyzeOptions {
    specifier: &specifier,
    // not parsed, so a syntax error doesn't surface
    source: "new URL(".into(),
    media_type: MediaType::JavaScript,
    module_type: ModuleType::JavascriptDynamic,
    plugin_options: &static_options(),
    parser_options: &ParserOptions::default(),
    parser: None,
  })
  .unwrap();
  assert_eq!(result, None);
}

#[test]
fn test_parse_error() {
  let specifier = specifier();
  let result = analyze_module(AnalyzeOptions {
    specifier: &specifier,
    source: "new URL(".into(),
    media_type: MediaType::JavaScript,
    module_type: ModuleType::JavascriptAuto,
    plugin_options: &static_options(),
    parser_options: &ParserOptions::default(),
    parser: None,
  });
  assert!(result.is_err());
}

#[test]
fn test_typescript_module() {
  let specifier = ModuleSpecifier::parse("file:///project/src/worker.ts")
    .unwrap();
  let info = analyze_module(AnalyzeOptions {
    specifier: &specifier,
    source: r#"
export function load(): URL {
  return new URL("./module.wasm" as string, import.meta.url);
}
export const worker: URL = new URL("./worker.ts", import.meta.url);
export function icon(name?: string) {
  return new URL(`./icons/${name!}.svg` satisfies string, import.meta.url);
}
"#
    .into(),
    media_type: MediaType::TypeScript,
    module_type: ModuleType::JavascriptAuto,
    plugin_options: &static_options(),
    parser_options: &ParserOptions::default(),
    parser: None,
  })
  .unwrap()
  .unwrap();
  let requests = info
    .dependencies
    .iter()
    .filter_map(|dep| dep.as_url())
    .map(|dep| (dep.request.as_str(), dep.used_by_exports.clone()))
    .collect::<Vec<_>>();
  assert_eq!(
    requests,
    vec![
      (
        "file:///project/src/module.wasm",
        UsedByExports::TopLevelSymbol("load".to_string())
      ),
      (
        "file:///project/src/worker.ts",
        UsedByExports::TopLevelSymbol("worker".to_string())
      ),
    ]
  );
  let contexts = info
    .dependencies
    .iter()
    .filter_map(|dep| dep.as_context())
    .map(|dep| dep.base.options.request.as_str())
    .collect::<Vec<_>>();
  assert_eq!(contexts, vec!["./icons"]);
}
