//! Import-inlining render pass.
//!
//! Stands in for the compiler's evaluate/render stage as far as imports are
//! concerned: statements are re-emitted with their indentation and every
//! import node is replaced by the rendered content of its target file(s).
//! An [`ImportOverride`] is consulted at each import before native lookup.
//! With `resolve_url` set, `url()` references in every emitted line are
//! rewritten relative to the entry file.

use rustc_hash::FxHashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::UrlResolveConfig;
use crate::evaluator::{ImportDecision, ImportOverride, ImportSite};
use crate::lookup::NativeLookup;
use crate::path::is_external_url;
use crate::runtime::{self, Runtime, RuntimeError};
use crate::syntax::{
    ExprEvaluator, ImportKind, ImportNode, ImportParser, Node, ParseError, Scope, SourcePosition,
    StylesheetParser, Value,
};
use crate::url::UrlRewriter;

#[cfg(not(target_family = "wasm"))]
type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RenderError>> + Send + 'a>>;
#[cfg(target_family = "wasm")]
type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RenderError>> + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(
        "{}:{position}: failed to locate {} file '{specifier}'{}",
        .file.display(),
        .kind.keyword(),
        bundler_detail(.detail)
    )]
    ImportNotFound {
        kind: ImportKind,
        specifier: String,
        file: PathBuf,
        position: SourcePosition,
        /// Why the bundler resolver had no answer, when it was asked.
        detail: Option<String>,
    },

    #[error(
        "{}:{position}: import loop has been found: '{specifier}' resolves to '{}'",
        .file.display(),
        .target.display()
    )]
    ImportLoop {
        specifier: String,
        file: PathBuf,
        position: SourcePosition,
        target: PathBuf,
    },

    #[error("{}:{position}: import path is empty", .file.display())]
    EmptyImport {
        file: PathBuf,
        position: SourcePosition,
    },

    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to parse '{}': {source}", .file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: ParseError,
    },
}

fn bundler_detail(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(" (bundler resolver: {})", detail),
        None => String::new(),
    }
}

impl RenderError {
    /// Owning file and position, when the error points into a stylesheet.
    pub fn location(&self) -> Option<(&Path, SourcePosition)> {
        match self {
            RenderError::ImportNotFound { file, position, .. }
            | RenderError::ImportLoop { file, position, .. }
            | RenderError::EmptyImport { file, position } => Some((file, *position)),
            RenderError::Parse { file, source } => {
                Some((file, SourcePosition::new(source.line, source.column)))
            }
            RenderError::Read { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Native lookup search directories.
    pub paths: Vec<PathBuf>,
    /// Inline `.css` imports instead of leaving them literal.
    pub include_css: bool,
    /// Rewrite `url()` references; `None` leaves them as written.
    pub resolve_url: Option<UrlResolveConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub code: String,
    /// Files inlined during the render, in first-use order.
    pub imports: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Renderer {
    runtime: Arc<dyn Runtime>,
    parser: Arc<dyn StylesheetParser>,
    options: RenderOptions,
    import_override: Option<Arc<dyn ImportOverride>>,
}

#[derive(Default)]
struct RenderState {
    lines: Vec<String>,
    imports: Vec<PathBuf>,
    seen_imports: FxHashSet<PathBuf>,
    stack: Vec<PathBuf>,
    urls: Option<UrlRewriter>,
}

impl Renderer {
    pub fn new(runtime: Arc<dyn Runtime>, options: RenderOptions) -> Self {
        Self {
            runtime,
            parser: Arc::new(ImportParser::new()),
            options,
            import_override: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn StylesheetParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_override(mut self, import_override: Arc<dyn ImportOverride>) -> Self {
        self.import_override = Some(import_override);
        self
    }

    pub async fn render(&self, filename: &Path, source: &str) -> Result<RenderOutput, RenderError> {
        let mut state = RenderState {
            urls: self.options.resolve_url.as_ref().map(|config| {
                UrlRewriter::new(self.runtime.clone(), filename, config, &self.options.paths)
            }),
            ..Default::default()
        };
        self.render_file(&mut state, filename.to_path_buf(), source.to_string(), 0)
            .await?;

        let mut code = state.lines.join("\n");
        if !code.is_empty() {
            code.push('\n');
        }

        debug!(
            file = %filename.display(),
            imports = state.imports.len(),
            "Rendered stylesheet"
        );
        Ok(RenderOutput {
            code,
            imports: state.imports,
        })
    }

    fn render_file<'a>(
        &'a self,
        state: &'a mut RenderState,
        file: PathBuf,
        source: String,
        base: usize,
    ) -> RenderFuture<'a> {
        Box::pin(async move {
            let sheet = self
                .parser
                .parse(&source, &file)
                .map_err(|source| RenderError::Parse {
                    file: file.clone(),
                    source,
                })?;

            state.stack.push(file.clone());
            let mut scope = Scope::new();
            self.render_nodes(state, &file, &sheet.nodes, base, &mut scope)
                .await?;
            state.stack.pop();
            Ok(())
        })
    }

    fn render_nodes<'a>(
        &'a self,
        state: &'a mut RenderState,
        file: &'a Path,
        nodes: &'a [Node],
        base: usize,
        scope: &'a mut Scope,
    ) -> RenderFuture<'a> {
        Box::pin(async move {
            for node in nodes {
                match node {
                    Node::Statement(statement) => {
                        emit_source(state, base + statement.indent, file, &statement.text);
                    }
                    Node::Assignment(assignment) => {
                        let value = ExprEvaluator.eval(&assignment.value, scope);
                        scope.define(assignment.name.clone(), value);
                        emit_source(state, base + assignment.indent, file, &assignment.text);
                    }
                    Node::Block(block) => {
                        emit_source(state, base + block.indent, file, &block.header);
                        scope.push();
                        self.render_nodes(state, file, &block.nodes, base, scope)
                            .await?;
                        scope.pop();
                    }
                    Node::Import(import) => {
                        self.render_import(state, file, import, base, scope).await?;
                    }
                }
            }
            Ok(())
        })
    }

    async fn render_import(
        &self,
        state: &mut RenderState,
        file: &Path,
        import: &ImportNode,
        base: usize,
        scope: &Scope,
    ) -> Result<(), RenderError> {
        let indent = base + import.indent;
        let keyword = import.kind.keyword();
        let empty = || RenderError::EmptyImport {
            file: file.to_path_buf(),
            position: import.position,
        };

        let value = import
            .first_path()
            .map(|expr| ExprEvaluator.eval(expr, scope))
            .ok_or_else(empty)?;

        let specifier = match value {
            Value::Url(url) => {
                emit(state, indent, &format!("{} url(\"{}\")", keyword, url));
                return Ok(());
            }
            Value::Str(s) if s.is_empty() => return Err(empty()),
            Value::Str(s) => s,
        };

        let is_css = specifier.to_ascii_lowercase().ends_with(".css");
        if is_external_url(&specifier) || (is_css && !self.options.include_css) {
            emit(state, indent, &format!("{} \"{}\"", keyword, specifier));
            return Ok(());
        }

        let decision = match &self.import_override {
            Some(import_override) => import_override.resolve_import(ImportSite {
                file,
                position: import.position,
                specifier: &specifier,
            }),
            None => ImportDecision::defer(),
        };

        let targets = match decision {
            ImportDecision::Substitute(paths) => {
                trace!(specifier = %specifier, count = paths.len(), "Import substituted");
                paths
            }
            ImportDecision::Defer { detail } => {
                let lookup = NativeLookup::new(self.runtime.as_ref(), &self.options.paths);
                match lookup.resolve(&specifier, file).await {
                    Some(found) => found,
                    None => {
                        return Err(RenderError::ImportNotFound {
                            kind: import.kind,
                            specifier,
                            file: file.to_path_buf(),
                            position: import.position,
                            detail,
                        });
                    }
                }
            }
        };

        for target in targets {
            if state.stack.contains(&target) {
                return Err(RenderError::ImportLoop {
                    specifier,
                    file: file.to_path_buf(),
                    position: import.position,
                    target,
                });
            }

            let first_use = state.seen_imports.insert(target.clone());
            if import.kind == ImportKind::Require && !first_use {
                continue;
            }
            if first_use {
                state.imports.push(target.clone());
            }

            let source = runtime::read_to_string(self.runtime.as_ref(), &target)
                .await
                .map_err(|source| RenderError::Read {
                    path: target.clone(),
                    source,
                })?;
            self.render_file(state, target, source, indent).await?;
        }

        Ok(())
    }
}

fn emit(state: &mut RenderState, indent: usize, text: &str) {
    state.lines.push(format!("{}{}", " ".repeat(indent), text));
}

/// Emit a line written in `file`, rewriting its `url()` references.
fn emit_source(state: &mut RenderState, indent: usize, file: &Path, text: &str) {
    let text = match &state.urls {
        Some(urls) => urls.rewrite(text, file).into_owned(),
        None => text.to_string(),
    };
    emit(state, indent, &text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryRuntime;

    fn renderer(runtime: &MemoryRuntime) -> Renderer {
        Renderer::new(Arc::new(runtime.clone()), RenderOptions::default())
    }

    #[tokio::test]
    async fn test_inlines_nested_imports_with_indentation() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/child.styl", "a\n  color red\n");

        let output = renderer(&runtime)
            .render(Path::new("/p/main.styl"), ".theme\n  @import 'child'\nb\n  margin 0\n")
            .await
            .unwrap();

        assert_eq!(output.code, ".theme\n  a\n    color red\nb\n  margin 0\n");
        assert_eq!(output.imports, vec![PathBuf::from("/p/child.styl")]);
    }

    #[tokio::test]
    async fn test_require_imports_once() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/vars.styl", "$c = red\n");

        let output = renderer(&runtime)
            .render(
                Path::new("/p/main.styl"),
                "@require 'vars'\n@require 'vars'\n@import 'vars'\n",
            )
            .await
            .unwrap();

        assert_eq!(output.code, "$c = red\n$c = red\n");
    }

    #[tokio::test]
    async fn test_literal_imports() {
        let runtime = MemoryRuntime::new("/p");
        let output = renderer(&runtime)
            .render(
                Path::new("/p/main.styl"),
                "@import 'reset.css'\n@import 'https://x.test/a.css'\n@import url(b.css)\n",
            )
            .await
            .unwrap();

        assert_eq!(
            output.code,
            "@import \"reset.css\"\n@import \"https://x.test/a.css\"\n@import url(\"b.css\")\n"
        );
        assert!(output.imports.is_empty());
    }

    #[tokio::test]
    async fn test_include_css() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/reset.css", "html\n  margin 0\n");
        let renderer = Renderer::new(
            Arc::new(runtime.clone()),
            RenderOptions {
                include_css: true,
                ..Default::default()
            },
        );

        let output = renderer
            .render(Path::new("/p/main.styl"), "@import 'reset.css'\n")
            .await
            .unwrap();
        assert_eq!(output.code, "html\n  margin 0\n");
    }

    #[tokio::test]
    async fn test_missing_import_error() {
        let runtime = MemoryRuntime::new("/p");
        let err = renderer(&runtime)
            .render(Path::new("/p/main.styl"), "a\n  @import 'nope'\n")
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            RenderError::ImportNotFound { specifier, position, detail: None, .. }
                if specifier == "nope" && *position == SourcePosition::new(2, 3)
        ));
        assert!(err.to_string().contains("failed to locate @import file 'nope'"));
    }

    #[tokio::test]
    async fn test_import_loop() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/a.styl", "@import 'b'\n");
        runtime.add_file("/p/b.styl", "@import 'a'\n");

        let err = renderer(&runtime)
            .render(Path::new("/p/a.styl"), "@import 'b'\n")
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::ImportLoop { ref target, .. } if target == Path::new("/p/a.styl")));
    }

    #[tokio::test]
    async fn test_variables_in_import_paths() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/themes/dark.styl", "body\n  background black\n");

        let output = renderer(&runtime)
            .render(
                Path::new("/p/main.styl"),
                "$theme = 'dark'\n@import 'themes/' + $theme\n",
            )
            .await
            .unwrap();
        assert_eq!(output.code, "$theme = 'dark'\nbody\n  background black\n");
    }

    #[tokio::test]
    async fn test_urls_in_imported_files_follow_the_entry() {
        let runtime = MemoryRuntime::new("/p");
        runtime.add_file("/p/sub/x.styl", ".x\n  background url(img/a.png)\n");
        runtime.add_file("/p/sub/img/a.png", "");
        runtime.add_file("/p/img/b.png", "");
        let rewriting = Renderer::new(
            Arc::new(runtime.clone()),
            RenderOptions {
                resolve_url: Some(UrlResolveConfig::default()),
                ..Default::default()
            },
        );

        let output = rewriting
            .render(
                Path::new("/p/main.styl"),
                "@import 'sub/x'\n.main\n  background url(img/b.png)\n",
            )
            .await
            .unwrap();

        assert_eq!(
            output.code,
            ".x\n  background url(\"sub/img/a.png\")\n.main\n  background url(\"img/b.png\")\n"
        );

        let untouched = renderer(&runtime)
            .render(Path::new("/p/main.styl"), "@import 'sub/x'\n")
            .await
            .unwrap();
        assert_eq!(untouched.code, ".x\n  background url(img/a.png)\n");
    }
}
