//! Stylesheet syntax tree consumed by the resolution layer.
//!
//! Only the shape the import machinery needs is modelled: import statements
//! with their path expressions, variable assignments (so constant path
//! expressions can be folded) and indentation blocks. Everything else is an
//! opaque statement that the renderer re-emits verbatim.

mod expr;
mod parser;

pub use expr::{ExprEvaluator, Scope, Value};
pub use parser::{ImportParser, ParseError, StylesheetParser};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 1-based location of an import keyword in its owning file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A parsed stylesheet file.
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub filename: PathBuf,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Statement(Statement),
    Assignment(Assignment),
    Import(ImportNode),
    Block(Block),
}

impl Node {
    /// Indentation column (0-based) of the node's first line.
    pub fn indent(&self) -> usize {
        match self {
            Node::Statement(s) => s.indent,
            Node::Assignment(a) => a.indent,
            Node::Import(i) => i.indent,
            Node::Block(b) => b.indent,
        }
    }
}

/// Any line the resolution layer does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub line: u32,
    pub indent: usize,
}

/// `name = expression`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Expr,
    pub text: String,
    pub line: u32,
    pub indent: usize,
}

/// A header line with more-indented children.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: String,
    pub line: u32,
    pub indent: usize,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `@import`: inlined every time it appears
    Import,
    /// `@require`: inlined at most once per render
    Require,
}

impl ImportKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ImportKind::Import => "@import",
            ImportKind::Require => "@require",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub kind: ImportKind,
    /// Comma separated path expressions; only the first one is imported.
    pub path: Vec<Expr>,
    pub position: SourcePosition,
    pub indent: usize,
}

impl ImportNode {
    pub fn first_path(&self) -> Option<&Expr> {
        self.path.first()
    }
}

/// Path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Quoted string literal
    Str(String),
    /// Bare word or variable reference
    Ident(String),
    /// `url(...)`, raw inner text with surrounding quotes removed
    Url(String),
    /// `left + right`
    Concat(Box<Expr>, Box<Expr>),
}
