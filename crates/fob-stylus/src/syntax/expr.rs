//! Constant folding for import path expressions.

use rustc_hash::FxHashMap;

use super::Expr;

/// Result of folding a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    /// `url(...)` reference, handled by the compiler and never resolved
    Url(String),
}

impl Value {
    /// The literal string, if this is not a `url()` reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Url(_) => None,
        }
    }
}

/// Variable bindings visible while walking one file, innermost block last.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<FxHashMap<String, Value>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

/// Folds string concatenation and variable references into a literal.
///
/// Unbound identifiers evaluate to their own name, the way bare words do in
/// the stylesheet language.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    pub fn eval(&self, expr: &Expr, scope: &Scope) -> Value {
        match expr {
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Url(u) => Value::Url(u.clone()),
            Expr::Ident(name) => scope
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| Value::Str(name.clone())),
            Expr::Concat(left, right) => {
                match (self.eval(left, scope), self.eval(right, scope)) {
                    (Value::Str(l), Value::Str(r)) => Value::Str(l + &r),
                    (Value::Url(u), _) | (_, Value::Url(u)) => Value::Url(u),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(l: Expr, r: Expr) -> Expr {
        Expr::Concat(Box::new(l), Box::new(r))
    }

    #[test]
    fn test_concat_and_lookup() {
        let mut scope = Scope::new();
        scope.define("$dir", Value::Str("partials/".into()));

        let expr = concat(Expr::Ident("$dir".into()), Expr::Str("buttons".into()));
        assert_eq!(
            ExprEvaluator.eval(&expr, &scope),
            Value::Str("partials/buttons".into())
        );
    }

    #[test]
    fn test_unbound_ident_is_bare_word() {
        let scope = Scope::new();
        assert_eq!(
            ExprEvaluator.eval(&Expr::Ident("nib".into()), &scope),
            Value::Str("nib".into())
        );
    }

    #[test]
    fn test_inner_frame_shadows_and_pops() {
        let mut scope = Scope::new();
        scope.define("theme", Value::Str("light".into()));
        scope.push();
        scope.define("theme", Value::Str("dark".into()));
        assert_eq!(scope.lookup("theme"), Some(&Value::Str("dark".into())));
        scope.pop();
        assert_eq!(scope.lookup("theme"), Some(&Value::Str("light".into())));
    }

    #[test]
    fn test_url_wins_concat() {
        let scope = Scope::new();
        let expr = concat(Expr::Url("a.css".into()), Expr::Str("?v=1".into()));
        assert_eq!(ExprEvaluator.eval(&expr, &scope), Value::Url("a.css".into()));
    }
}
