//! Line-oriented parser for the indentation syntax.
//!
//! The parser understands just enough of the language to find imports:
//! indentation blocks, `@import`/`@require` statements (keyword and
//! function form), `name = expr` assignments and comments. Anything else is
//! kept as an opaque statement.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;
use std::path::Path;

use super::{
    Assignment, Block, Expr, ImportKind, ImportNode, Node, SourcePosition, Statement, Stylesheet,
};

static ASSIGNMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([$A-Za-z_-][$\w-]*)\s*=\s*").expect("assignment pattern is valid")
});

/// Parser seam used by the walker and the renderer.
///
/// Hosts with a full compiler front end can plug it in here; the default is
/// [`ImportParser`].
pub trait StylesheetParser: Send + Sync + Debug {
    fn parse(&self, source: &str, filename: &Path) -> Result<Stylesheet, ParseError>;
}

/// Malformed source syntax, located by 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImportParser;

impl ImportParser {
    pub fn new() -> Self {
        Self
    }
}

impl StylesheetParser for ImportParser {
    fn parse(&self, source: &str, filename: &Path) -> Result<Stylesheet, ParseError> {
        let stripped = strip_comments(source);
        let lines: Vec<Line> = stripped
            .lines()
            .enumerate()
            .filter_map(|(idx, raw)| Line::new(idx, raw))
            .collect();

        let mut cursor = 0;
        let nodes = build_nodes(&lines, &mut cursor, 0)?;

        Ok(Stylesheet {
            filename: filename.to_path_buf(),
            nodes,
        })
    }
}

struct Line {
    number: u32,
    indent: usize,
    content: String,
}

impl Line {
    fn new(idx: usize, raw: &str) -> Option<Self> {
        let trimmed = raw.trim_end();
        let content = trimmed.trim_start();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            number: idx as u32 + 1,
            indent: trimmed.chars().count() - content.chars().count(),
            content: content.to_string(),
        })
    }
}

fn build_nodes(lines: &[Line], cursor: &mut usize, min_indent: usize) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();

    while let Some(line) = lines.get(*cursor) {
        if line.indent < min_indent {
            break;
        }
        *cursor += 1;

        if let Some(import) = parse_import(line)? {
            // Lines indented under an import are still siblings.
            nodes.push(Node::Import(import));
            continue;
        }

        match lines.get(*cursor) {
            Some(next) if next.indent > line.indent => {
                let children = build_nodes(lines, cursor, next.indent)?;
                nodes.push(Node::Block(Block {
                    header: line.content.clone(),
                    line: line.number,
                    indent: line.indent,
                    nodes: children,
                }));
            }
            _ => nodes.push(classify(line)),
        }
    }

    Ok(nodes)
}

fn import_keyword(content: &str) -> Option<ImportKind> {
    let kind = if content.starts_with("@import") {
        ImportKind::Import
    } else if content.starts_with("@require") {
        ImportKind::Require
    } else {
        return None;
    };

    match content[kind.keyword().len()..].chars().next() {
        None => Some(kind),
        Some(c) if c.is_whitespace() || matches!(c, '(' | '"' | '\'') => Some(kind),
        Some(_) => None,
    }
}

fn parse_import(line: &Line) -> Result<Option<ImportNode>, ParseError> {
    let Some(kind) = import_keyword(&line.content) else {
        return Ok(None);
    };

    let position = SourcePosition::new(line.number, line.indent as u32 + 1);
    let chars: Vec<char> = line.content.chars().collect();
    let mut end = chars.len();
    while end > 0 && (chars[end - 1] == ';' || chars[end - 1].is_whitespace()) {
        end -= 1;
    }

    let mut cursor = ExprCursor {
        chars: &chars,
        pos: kind.keyword().chars().count(),
        end,
        line: line.number,
        indent: line.indent,
    };
    cursor.skip_ws();
    if cursor.at_end() {
        return Err(ParseError::new(
            position.line,
            position.column,
            format!("{} is missing a path", kind.keyword()),
        ));
    }

    let path = cursor.parse_list()?;
    Ok(Some(ImportNode {
        kind,
        path,
        position,
        indent: line.indent,
    }))
}

fn classify(line: &Line) -> Node {
    if let Some(caps) = ASSIGNMENT_RE.captures(&line.content) {
        let matched = caps.get(0).map_or(0, |m| m.end());
        let rest = &line.content[matched..];
        if !rest.is_empty() && !rest.starts_with('=') {
            let chars: Vec<char> = line.content.chars().collect();
            let mut end = chars.len();
            while end > 0 && (chars[end - 1] == ';' || chars[end - 1].is_whitespace()) {
                end -= 1;
            }
            let mut cursor = ExprCursor {
                chars: &chars,
                pos: line.content[..matched].chars().count(),
                end,
                line: line.number,
                indent: line.indent,
            };
            // Non-path values such as `10px 20px` stay opaque.
            if let Ok(value) = cursor.parse_single() {
                return Node::Assignment(Assignment {
                    name: caps[1].to_string(),
                    value,
                    text: line.content.clone(),
                    line: line.number,
                    indent: line.indent,
                });
            }
        }
    }

    Node::Statement(Statement {
        text: line.content.clone(),
        line: line.number,
        indent: line.indent,
    })
}

struct ExprCursor<'a> {
    chars: &'a [char],
    pos: usize,
    end: usize,
    line: u32,
    indent: usize,
}

impl ExprCursor<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn peek(&self) -> Option<char> {
        if self.at_end() {
            None
        } else {
            Some(self.chars[self.pos])
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, at: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, (self.indent + at) as u32 + 1, message)
    }

    fn parse_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            items.push(self.parse_concat()?);
            self.skip_ws();
            match self.peek() {
                None => return Ok(items),
                Some(',') => self.pos += 1,
                Some(c) => return Err(self.error(self.pos, format!("unexpected '{}'", c))),
            }
        }
    }

    fn parse_single(&mut self) -> Result<Expr, ParseError> {
        self.skip_ws();
        let expr = self.parse_concat()?;
        self.skip_ws();
        match self.peek() {
            None => Ok(expr),
            Some(c) => Err(self.error(self.pos, format!("unexpected '{}'", c))),
        }
    }

    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_ws();
            if self.peek() != Some('+') {
                return Ok(left);
            }
            self.pos += 1;
            self.skip_ws();
            let right = self.parse_term()?;
            left = Expr::Concat(Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            None => Err(self.error(self.pos, "expected a path expression")),
            Some('"') | Some('\'') => self.parse_string().map(Expr::Str),
            Some('(') => {
                let open = self.pos;
                self.pos += 1;
                self.skip_ws();
                let inner = self.parse_concat()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(self.error(open, "unbalanced parentheses"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(_) if self.starts_with_url() => self.parse_url(),
            Some(_) => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || matches!(c, ',' | '+' | '(' | ')' | '"' | '\'') {
                        break;
                    }
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.error(start, "expected a path expression"));
                }
                Ok(Expr::Ident(self.chars[start..self.pos].iter().collect()))
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let quote = self.chars[start];
        self.pos += 1;

        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        value.push(escaped);
                        self.pos += 1;
                    }
                }
                c if c == quote => return Ok(value),
                c => value.push(c),
            }
        }

        Err(self.error(start, "unterminated string"))
    }

    fn starts_with_url(&self) -> bool {
        let rest: String = self.chars[self.pos..self.end.min(self.pos + 4)].iter().collect();
        rest.eq_ignore_ascii_case("url(")
    }

    fn parse_url(&mut self) -> Result<Expr, ParseError> {
        let open = self.pos;
        self.pos += 4;
        self.skip_ws();

        let inner = if matches!(self.peek(), Some('"') | Some('\'')) {
            self.parse_string()?
        } else {
            let start = self.pos;
            while self.peek().is_some_and(|c| c != ')') {
                self.pos += 1;
            }
            self.chars[start..self.pos].iter().collect::<String>().trim().to_string()
        };

        self.skip_ws();
        if self.peek() != Some(')') {
            return Err(self.error(open, "unbalanced parentheses"));
        }
        self.pos += 1;
        Ok(Expr::Url(inner))
    }
}

/// Blank out `/* */` and `//` comments, keeping line structure intact.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next_if(|&next| next != '\n') {
                    out.push(next);
                }
            } else if c == q || c == '\n' {
                quote = None;
                if c == '\n' {
                    depth = 0;
                }
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '(' => {
                depth += 1;
                out.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            '\n' => {
                depth = 0;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                let mut prev = '\0';
                for next in chars.by_ref() {
                    out.push(if next == '\n' { '\n' } else { ' ' });
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            // `//` inside url(...) is part of the URL
            '/' if depth == 0 && chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}
