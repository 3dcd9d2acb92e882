//! Guard evaluator: restricted boolean expressions over whitelisted names
//!
//! Guards gate whether an action executes. The grammar is deliberately
//! small — boolean or/and/not, a single comparison level, additive and
//! multiplicative arithmetic, parentheses, literals, and identifiers
//! resolved against an explicit variable whitelist. Nothing here ever
//! evaluates host-language code; that is a safety requirement, not an
//! optimization.
//!
//! A guard must evaluate to a boolean. Any lexing, parsing, lookup, or
//! typing failure is a `GuardError`; the engine surfaces it as a warning
//! and skips the guarded action.

use std::collections::HashMap;

/// Errors raised while evaluating a guard expression
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Guard parse error at column {col}: {message}")]
    Parse { col: usize, message: String },

    #[error("Unknown guard variable: '{0}'")]
    UnknownVariable(String),

    #[error("Guard type mismatch: {0}")]
    TypeMismatch(String),
}

type GuardResult<T> = Result<T, GuardError>;

/// A value a guard expression can produce or a variable can hold
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GuardValue {
    Bool(bool),
    Number(f64),
}

impl From<bool> for GuardValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for GuardValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl std::fmt::Display for GuardValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// The whitelisted variables a guard may read
#[derive(Clone, Debug, Default)]
pub struct GuardContext {
    variables: HashMap<String, GuardValue>,
}

impl GuardContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<GuardValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<GuardValue> {
        self.variables.get(name).copied()
    }
}

/// Evaluate a guard expression against a context.
///
/// Returns `Ok(bool)` only when the expression parses and produces a
/// boolean; everything else is a `GuardError`.
pub fn evaluate_guard(expr: &str, context: &GuardContext) -> GuardResult<bool> {
    let tokens = Lexer::new(expr).tokenize()?;
    let ast = Parser::new(tokens).parse()?;
    match eval(&ast, context)? {
        GuardValue::Bool(b) => Ok(b),
        GuardValue::Number(n) => Err(GuardError::TypeMismatch(format!(
            "guard must evaluate to a boolean, got number {}",
            n
        ))),
    }
}

// ── Lexer ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    True,
    False,
    Or,
    And,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    OpenParen,
    CloseParen,
    Eof,
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    col: usize,
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn tokenize(&mut self) -> GuardResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            while self.pos < self.input.len() && self.input[self.pos].is_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.input.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    col: self.pos + 1,
                });
                break;
            }
            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> GuardResult<Token> {
        let col = self.pos + 1;
        let ch = self.input[self.pos];

        let kind = match ch {
            '(' => {
                self.pos += 1;
                TokenKind::OpenParen
            }
            ')' => {
                self.pos += 1;
                TokenKind::CloseParen
            }
            '+' => {
                self.pos += 1;
                TokenKind::Plus
            }
            '-' => {
                self.pos += 1;
                TokenKind::Minus
            }
            '*' => {
                self.pos += 1;
                TokenKind::Star
            }
            '/' => {
                self.pos += 1;
                TokenKind::Slash
            }
            '=' if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                TokenKind::Eq
            }
            '!' if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                TokenKind::Ne
            }
            '!' => {
                self.pos += 1;
                TokenKind::Not
            }
            '<' if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                TokenKind::Le
            }
            '<' => {
                self.pos += 1;
                TokenKind::Lt
            }
            '>' if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                TokenKind::Ge
            }
            '>' => {
                self.pos += 1;
                TokenKind::Gt
            }
            '&' if self.peek_at(1) == Some('&') => {
                self.pos += 2;
                TokenKind::And
            }
            '|' if self.peek_at(1) == Some('|') => {
                self.pos += 2;
                TokenKind::Or
            }
            c if c.is_ascii_digit() => return self.read_number(col),
            c if c.is_ascii_alphabetic() || c == '_' => return Ok(self.read_word(col)),
            other => {
                return Err(GuardError::Parse {
                    col,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };

        Ok(Token { kind, col })
    }

    fn read_number(&mut self, col: usize) -> GuardResult<Token> {
        let mut text = String::new();
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == '.')
        {
            text.push(self.input[self.pos]);
            self.pos += 1;
        }
        let value = text.parse::<f64>().map_err(|_| GuardError::Parse {
            col,
            message: format!("invalid number '{}'", text),
        })?;
        Ok(Token {
            kind: TokenKind::Number(value),
            col,
        })
    }

    /// Identifiers allow dots so whitelisted names like `pose.x` read
    /// naturally. Word operators map onto their symbolic forms.
    fn read_word(&mut self, col: usize) -> Token {
        let mut text = String::new();
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_alphanumeric()
                || self.input[self.pos] == '_'
                || self.input[self.pos] == '.')
        {
            text.push(self.input[self.pos]);
            self.pos += 1;
        }

        let kind = match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => TokenKind::Ident(text),
        };

        Token { kind, col }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

// ── Parser ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Bool(bool),
    Number(f64),
    Var(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> GuardResult<Expr> {
        let expr = self.parse_or()?;
        match self.current().kind {
            TokenKind::Eof => Ok(expr),
            _ => Err(self.error("unexpected trailing input")),
        }
    }

    fn parse_or(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.current().kind == TokenKind::Or {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.current().kind == TokenKind::And {
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    /// A single, non-associative comparison level: `a < b < c` is a
    /// parse error rather than a surprise.
    fn parse_comparison(&mut self) -> GuardResult<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.current().kind {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_additive()?;
        Ok(binary(op, lhs, rhs))
    }

    fn parse_additive(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> GuardResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> GuardResult<Expr> {
        match self.current().kind {
            TokenKind::Not => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            TokenKind::Minus => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> GuardResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            TokenKind::True => {
                self.pos += 1;
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.pos += 1;
                Ok(Expr::Bool(false))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                Ok(Expr::Var(name))
            }
            TokenKind::OpenParen => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.current().kind {
                    TokenKind::CloseParen => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(self.error("expected ')'")),
                }
            }
            _ => Err(self.error("expected a value, variable, or '('")),
        }
    }

    fn current(&self) -> &Token {
        // The token stream always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn error(&self, message: &str) -> GuardError {
        GuardError::Parse {
            col: self.current().col,
            message: message.into(),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// ── Evaluation ───────────────────────────────────────────────────────

fn eval(expr: &Expr, context: &GuardContext) -> GuardResult<GuardValue> {
    match expr {
        Expr::Bool(b) => Ok(GuardValue::Bool(*b)),
        Expr::Number(n) => Ok(GuardValue::Number(*n)),
        Expr::Var(name) => context
            .get(name)
            .ok_or_else(|| GuardError::UnknownVariable(name.clone())),
        Expr::Not(inner) => match eval(inner, context)? {
            GuardValue::Bool(b) => Ok(GuardValue::Bool(!b)),
            other => Err(GuardError::TypeMismatch(format!(
                "'not' needs a boolean, got {}",
                other
            ))),
        },
        Expr::Neg(inner) => match eval(inner, context)? {
            GuardValue::Number(n) => Ok(GuardValue::Number(-n)),
            other => Err(GuardError::TypeMismatch(format!(
                "unary minus needs a number, got {}",
                other
            ))),
        },
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, context),
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    context: &GuardContext,
) -> GuardResult<GuardValue> {
    // Short-circuit the boolean connectives
    if matches!(op, BinaryOp::Or | BinaryOp::And) {
        let left = as_bool(eval(lhs, context)?, "boolean connective")?;
        return match (op, left) {
            (BinaryOp::Or, true) => Ok(GuardValue::Bool(true)),
            (BinaryOp::And, false) => Ok(GuardValue::Bool(false)),
            _ => {
                let right = as_bool(eval(rhs, context)?, "boolean connective")?;
                Ok(GuardValue::Bool(right))
            }
        };
    }

    let left = eval(lhs, context)?;
    let right = eval(rhs, context)?;

    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (left, right) {
                (GuardValue::Bool(a), GuardValue::Bool(b)) => a == b,
                (GuardValue::Number(a), GuardValue::Number(b)) => a == b,
                (a, b) => {
                    return Err(GuardError::TypeMismatch(format!(
                        "cannot compare {} with {}",
                        a, b
                    )))
                }
            };
            Ok(GuardValue::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let a = as_number(left, "ordering comparison")?;
            let b = as_number(right, "ordering comparison")?;
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            };
            Ok(GuardValue::Bool(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let a = as_number(left, "arithmetic")?;
            let b = as_number(right, "arithmetic")?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            };
            Ok(GuardValue::Number(result))
        }
        BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
    }
}

fn as_bool(value: GuardValue, what: &str) -> GuardResult<bool> {
    match value {
        GuardValue::Bool(b) => Ok(b),
        other => Err(GuardError::TypeMismatch(format!(
            "{} needs booleans, got {}",
            what, other
        ))),
    }
}

fn as_number(value: GuardValue, what: &str) -> GuardResult<f64> {
    match value {
        GuardValue::Number(n) => Ok(n),
        other => Err(GuardError::TypeMismatch(format!(
            "{} needs numbers, got {}",
            what, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> GuardContext {
        GuardContext::new()
            .with_variable("pose.x", 1.5)
            .with_variable("pose.y", -0.5)
            .with_variable("pose.heading", 0.0)
            .with_variable("running", true)
            .with_variable("battery", 0.8)
    }

    #[test]
    fn test_literals() {
        assert!(evaluate_guard("true", &ctx()).unwrap());
        assert!(!evaluate_guard("false", &ctx()).unwrap());
    }

    #[test]
    fn test_comparisons() {
        assert!(evaluate_guard("pose.x > 1.0", &ctx()).unwrap());
        assert!(evaluate_guard("pose.y <= 0", &ctx()).unwrap());
        assert!(!evaluate_guard("battery >= 0.9", &ctx()).unwrap());
        assert!(evaluate_guard("pose.heading == 0", &ctx()).unwrap());
        assert!(evaluate_guard("pose.x != 2", &ctx()).unwrap());
    }

    #[test]
    fn test_boolean_connectives() {
        assert!(evaluate_guard("running and battery > 0.5", &ctx()).unwrap());
        assert!(evaluate_guard("running && battery > 0.5", &ctx()).unwrap());
        assert!(evaluate_guard("false or running", &ctx()).unwrap());
        assert!(evaluate_guard("not false", &ctx()).unwrap());
        assert!(!evaluate_guard("!running", &ctx()).unwrap());
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert!(evaluate_guard("pose.x * 2 == 3", &ctx()).unwrap());
        assert!(evaluate_guard("1 + 2 * 3 == 7", &ctx()).unwrap());
        assert!(evaluate_guard("(1 + 2) * 3 == 9", &ctx()).unwrap());
        assert!(evaluate_guard("-pose.y == 0.5", &ctx()).unwrap());
        assert!(evaluate_guard("battery - 0.8 < 0.0001", &ctx()).unwrap());
    }

    #[test]
    fn test_short_circuit_skips_rhs_errors() {
        // The unknown variable on the right is never evaluated
        assert!(evaluate_guard("running or nonexistent", &ctx()).unwrap());
        assert!(!evaluate_guard("false and nonexistent", &ctx()).unwrap());
    }

    #[test]
    fn test_unknown_variable() {
        let result = evaluate_guard("doom > 1", &ctx());
        assert!(matches!(result, Err(GuardError::UnknownVariable(name)) if name == "doom"));
    }

    #[test]
    fn test_numeric_top_level_rejected() {
        assert!(matches!(
            evaluate_guard("pose.x + 1", &ctx()),
            Err(GuardError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_type_mismatches() {
        assert!(evaluate_guard("running > 1", &ctx()).is_err());
        assert!(evaluate_guard("running == 1", &ctx()).is_err());
        assert!(evaluate_guard("not battery", &ctx()).is_err());
    }

    #[test]
    fn test_host_language_syntax_rejected() {
        // Shapes the old eval()-based design would have executed
        assert!(evaluate_guard("__import__('os')", &ctx()).is_err());
        assert!(evaluate_guard("open(\"/etc/passwd\")", &ctx()).is_err());
        assert!(evaluate_guard("pose.x; 1 == 1", &ctx()).is_err());
        assert!(evaluate_guard("lambda: 1", &ctx()).is_err());
    }

    #[test]
    fn test_chained_comparison_rejected() {
        assert!(matches!(
            evaluate_guard("0 < pose.x < 2", &ctx()),
            Err(GuardError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(evaluate_guard("", &ctx()).is_err());
        assert!(evaluate_guard("&&", &ctx()).is_err());
        assert!(evaluate_guard("(running", &ctx()).is_err());
    }

    #[test]
    fn test_division() {
        assert!(evaluate_guard("3 / 2 == 1.5", &ctx()).unwrap());
    }
}
