//! Import discovery over a parsed stylesheet.

use tracing::trace;

use crate::path::is_external_url;
use crate::syntax::{
    ExprEvaluator, ImportKind, Node, Scope, SourcePosition, Stylesheet, Value,
};

/// One import statement found in a file, with its evaluated specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImport {
    pub specifier: String,
    pub position: SourcePosition,
    pub kind: ImportKind,
}

/// Collects import specifiers in document order.
///
/// Path expressions are folded through [`ExprEvaluator`] using the
/// assignments seen so far in the file. `url()` references, empty paths,
/// fragments and URLs with a scheme are skipped. Absolute paths are kept.
#[derive(Debug, Default)]
pub struct ImportVisitor {
    evaluator: ExprEvaluator,
    scope: Scope,
    imports: Vec<DiscoveredImport>,
}

impl ImportVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit(mut self, sheet: &Stylesheet) -> Vec<DiscoveredImport> {
        self.visit_nodes(&sheet.nodes);
        trace!(
            file = %sheet.filename.display(),
            count = self.imports.len(),
            "Collected imports"
        );
        self.imports
    }

    fn visit_nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Assignment(assignment) => {
                    let value = self.evaluator.eval(&assignment.value, &self.scope);
                    self.scope.define(assignment.name.clone(), value);
                }
                Node::Block(block) => {
                    self.scope.push();
                    self.visit_nodes(&block.nodes);
                    self.scope.pop();
                }
                Node::Import(import) => {
                    let Some(expr) = import.first_path() else {
                        continue;
                    };
                    let specifier = match self.evaluator.eval(expr, &self.scope) {
                        Value::Str(s) => s,
                        Value::Url(_) => continue,
                    };
                    if specifier.is_empty() || is_external_url(&specifier) {
                        continue;
                    }
                    self.imports.push(DiscoveredImport {
                        specifier,
                        position: import.position,
                        kind: import.kind,
                    });
                }
                Node::Statement(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{ImportParser, StylesheetParser};
    use std::path::Path;

    fn discover(source: &str) -> Vec<DiscoveredImport> {
        let sheet = ImportParser
            .parse(source, Path::new("/project/main.styl"))
            .unwrap();
        ImportVisitor::new().visit(&sheet)
    }

    #[test]
    fn test_collects_in_document_order() {
        let found = discover("@import 'a'\n.x\n  @require 'b'\n@import 'c', 'd'\n");
        let specs: Vec<_> = found.iter().map(|i| i.specifier.as_str()).collect();

        assert_eq!(specs, vec!["a", "b", "c"]);
        assert_eq!(found[1].kind, ImportKind::Require);
        assert_eq!(found[1].position, SourcePosition::new(3, 3));
    }

    #[test]
    fn test_skips_urls_and_empty_keeps_absolute() {
        let found = discover(
            "@import url(a.css)\n@import '#frag'\n@import '/abs.css'\n@import 'https://x.test/a.css'\n@import ''\n@import 'kept'\n",
        );
        let specifiers: Vec<&str> = found.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["/abs.css", "kept"]);
    }

    #[test]
    fn test_evaluates_constant_expressions() {
        let found = discover("$dir = 'partials'\n@import $dir + '/buttons'\n@import nib\n");
        assert_eq!(found[0].specifier, "partials/buttons");
        assert_eq!(found[1].specifier, "nib");
    }

    #[test]
    fn test_block_scoped_variables() {
        let found = discover(".a\n  $f = 'inner'\n  @import $f\n@import $f\n");
        assert_eq!(found[0].specifier, "inner");
        assert_eq!(found[1].specifier, "$f");
    }
}
