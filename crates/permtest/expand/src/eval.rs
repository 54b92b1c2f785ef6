//! Minimal expression evaluator for parameter values.
//!
//! Supports C-style integer/boolean expressions over names that are
//! already bound: literals, `true`/`false`, unary `- + ! ~`, the usual
//! binary operators with C precedence, and `cond ? a : b`. A top-level
//! `[a, b, ...]` yields a sequence of candidates.

use permtest_types::{Assignment, ParamValue};

use crate::error::{EvalError, EvalResult};

/// Evaluate `src` against the names bound in `env`.
///
/// The result is an `Int`, a `Bool`, or (for a bracketed list) a `List`
/// of those.
pub fn evaluate(src: &str, env: &Assignment) -> EvalResult<ParamValue> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let item = parser.item()?;
    if let Some(tok) = parser.peek() {
        return Err(EvalError::UnexpectedToken(tok.to_string()));
    }
    item.eval(env)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(i64),
    Ident(String),
    Op(&'static str),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{v}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Op(op) => write!(f, "{op}"),
        }
    }
}

// Longest operators first so that `<<` is not lexed as `<` `<`.
const OPERATORS: &[&str] = &[
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "&", "|",
    "^", "~", "!", "?", ":", "(", ")", "[", "]", ",",
];

fn lex(src: &str) -> EvalResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
                i += 1;
            }
            tokens.push(Token::Int(parse_int(&src[start..i])?));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            tokens.push(Token::Ident(src[start..i].to_string()));
        } else {
            let op = OPERATORS
                .iter()
                .find(|op| src[i..].starts_with(**op))
                .ok_or_else(|| {
                    let ch = src[i..].chars().next().unwrap_or(c);
                    EvalError::UnexpectedChar(ch, i)
                })?;
            tokens.push(Token::Op(op));
            i += op.len();
        }
    }

    Ok(tokens)
}

fn parse_int(text: &str) -> EvalResult<i64> {
    let invalid = || EvalError::InvalidLiteral(text.to_string());
    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).map_err(|_| invalid())
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).map_err(|_| invalid())
    } else {
        lower.parse().map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Int(i64),
    Bool(bool),
}

impl Scalar {
    fn int(self) -> i64 {
        match self {
            Scalar::Int(v) => v,
            Scalar::Bool(b) => i64::from(b),
        }
    }

    fn truthy(self) -> bool {
        match self {
            Scalar::Int(v) => v != 0,
            Scalar::Bool(b) => b,
        }
    }
}

impl From<Scalar> for ParamValue {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Int(v) => ParamValue::Int(v),
            Scalar::Bool(b) => ParamValue::Bool(b),
        }
    }
}

#[derive(Debug, Clone)]
enum Item {
    Expr(Expr),
    List(Vec<Item>),
}

impl Item {
    fn eval(&self, env: &Assignment) -> EvalResult<ParamValue> {
        match self {
            Item::Expr(expr) => expr.eval(env).map(ParamValue::from),
            Item::List(items) => items
                .iter()
                .map(|item| item.eval(env))
                .collect::<EvalResult<Vec<_>>>()
                .map(ParamValue::List),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Lit(Scalar),
    Name(String),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, env: &Assignment) -> EvalResult<Scalar> {
        match self {
            Expr::Lit(s) => Ok(*s),
            Expr::Name(name) => match env.get(name) {
                Some(ParamValue::Int(v)) => Ok(Scalar::Int(*v)),
                Some(ParamValue::Bool(b)) => Ok(Scalar::Bool(*b)),
                Some(_) => Err(EvalError::NotScalar(name.clone())),
                None => Err(EvalError::Unbound(name.clone())),
            },
            Expr::Unary(op, operand) => {
                let v = operand.eval(env)?;
                match *op {
                    "-" => v.int().checked_neg().map(Scalar::Int).ok_or(EvalError::Overflow),
                    "+" => Ok(Scalar::Int(v.int())),
                    "~" => Ok(Scalar::Int(!v.int())),
                    "!" => Ok(Scalar::Bool(!v.truthy())),
                    other => Err(EvalError::UnexpectedToken(other.to_string())),
                }
            }
            Expr::Binary("&&", lhs, rhs) => {
                Ok(Scalar::Bool(lhs.eval(env)?.truthy() && rhs.eval(env)?.truthy()))
            }
            Expr::Binary("||", lhs, rhs) => {
                Ok(Scalar::Bool(lhs.eval(env)?.truthy() || rhs.eval(env)?.truthy()))
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(env)?.int();
                let b = rhs.eval(env)?.int();
                binary(op, a, b)
            }
            Expr::Cond(cond, then, otherwise) => {
                if cond.eval(env)?.truthy() {
                    then.eval(env)
                } else {
                    otherwise.eval(env)
                }
            }
        }
    }
}

fn binary(op: &str, a: i64, b: i64) -> EvalResult<Scalar> {
    let int = |v: Option<i64>| v.map(Scalar::Int).ok_or(EvalError::Overflow);
    let shift = |b: i64| u32::try_from(b).ok().filter(|s| *s < 64).ok_or(EvalError::Overflow);
    match op {
        "+" => int(a.checked_add(b)),
        "-" => int(a.checked_sub(b)),
        "*" => int(a.checked_mul(b)),
        "/" if b == 0 => Err(EvalError::DivisionByZero),
        "/" => int(a.checked_div(b)),
        "%" if b == 0 => Err(EvalError::DivisionByZero),
        "%" => int(a.checked_rem(b)),
        "<<" => int(a.checked_shl(shift(b)?)),
        ">>" => int(a.checked_shr(shift(b)?)),
        "&" => Ok(Scalar::Int(a & b)),
        "|" => Ok(Scalar::Int(a | b)),
        "^" => Ok(Scalar::Int(a ^ b)),
        "==" => Ok(Scalar::Bool(a == b)),
        "!=" => Ok(Scalar::Bool(a != b)),
        "<" => Ok(Scalar::Bool(a < b)),
        "<=" => Ok(Scalar::Bool(a <= b)),
        ">" => Ok(Scalar::Bool(a > b)),
        ">=" => Ok(Scalar::Bool(a >= b)),
        other => Err(EvalError::UnexpectedToken(other.to_string())),
    }
}

/// Binary operators by precedence level, loosest first.
const LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", "<=", ">", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> EvalResult<Token> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(EvalError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> EvalResult<()> {
        match self.next()? {
            Token::Op(o) if o == op => Ok(()),
            other => Err(EvalError::UnexpectedToken(other.to_string())),
        }
    }

    fn item(&mut self) -> EvalResult<Item> {
        if !self.eat("[") {
            return self.conditional().map(Item::Expr);
        }
        let mut items = Vec::new();
        if self.eat("]") {
            return Ok(Item::List(items));
        }
        loop {
            items.push(self.item()?);
            if self.eat("]") {
                return Ok(Item::List(items));
            }
            self.expect(",")?;
        }
    }

    fn conditional(&mut self) -> EvalResult<Expr> {
        let cond = self.binary(0)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.conditional()?;
        self.expect(":")?;
        let otherwise = self.conditional()?;
        Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn binary(&mut self, level: usize) -> EvalResult<Expr> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self.peek_op(ops) {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn peek_op(&self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(o)) => ops.iter().copied().find(|op| op == o),
            _ => None,
        }
    }

    fn unary(&mut self) -> EvalResult<Expr> {
        if let Some(op) = self.peek_op(&["-", "+", "!", "~"]) {
            self.pos += 1;
            return Ok(Expr::Unary(op, Box::new(self.unary()?)));
        }
        match self.next()? {
            Token::Int(v) => Ok(Expr::Lit(Scalar::Int(v))),
            Token::Ident(name) if name == "true" => Ok(Expr::Lit(Scalar::Bool(true))),
            Token::Ident(name) if name == "false" => Ok(Expr::Lit(Scalar::Bool(false))),
            Token::Ident(name) => Ok(Expr::Name(name)),
            Token::Op("(") => {
                let inner = self.conditional()?;
                self.expect(")")?;
                Ok(inner)
            }
            other => Err(EvalError::UnexpectedToken(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, ParamValue)]) -> Assignment {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn eval(src: &str) -> EvalResult<ParamValue> {
        evaluate(src, &Assignment::new())
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42"), Ok(ParamValue::Int(42)));
        assert_eq!(eval("0x200"), Ok(ParamValue::Int(512)));
        assert_eq!(eval("0b101"), Ok(ParamValue::Int(5)));
        assert_eq!(eval("true"), Ok(ParamValue::Bool(true)));
        assert!(matches!(eval("12abc"), Err(EvalError::InvalidLiteral(_))));
    }

    #[test]
    fn precedence_follows_c() {
        assert_eq!(eval("1 + 2 * 3"), Ok(ParamValue::Int(7)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(ParamValue::Int(9)));
        assert_eq!(eval("1 << 4 + 1"), Ok(ParamValue::Int(32)));
        assert_eq!(eval("6 & 3 == 3"), Ok(ParamValue::Int(0)));
        assert_eq!(eval("-7 / 2"), Ok(ParamValue::Int(-3)));
        assert_eq!(eval("1 < 2 && 3 > 4 || 1"), Ok(ParamValue::Bool(true)));
    }

    #[test]
    fn conditional_with_bound_names() {
        let env = env(&[("LFS_PROG_SIZE", ParamValue::Int(16))]);
        let v = evaluate("(64 % LFS_PROG_SIZE == 0 ? 64 : LFS_PROG_SIZE)", &env);
        assert_eq!(v, Ok(ParamValue::Int(64)));

        let env = self::env(&[("LFS_PROG_SIZE", ParamValue::Int(48))]);
        let v = evaluate("(64 % LFS_PROG_SIZE == 0 ? 64 : LFS_PROG_SIZE)", &env);
        assert_eq!(v, Ok(ParamValue::Int(48)));
    }

    #[test]
    fn untaken_branch_is_not_evaluated() {
        assert_eq!(eval("1 ? 2 : 1 / 0"), Ok(ParamValue::Int(2)));
        assert_eq!(eval("0 && 1 / 0"), Ok(ParamValue::Bool(false)));
    }

    #[test]
    fn names_must_be_bound_scalars() {
        assert_eq!(eval("LFS_READ_SIZE"), Err(EvalError::Unbound("LFS_READ_SIZE".into())));
        let env = env(&[
            ("RAW", ParamValue::Str("FOO".into())),
            ("SEQ", ParamValue::from(vec![1, 2])),
        ]);
        assert_eq!(evaluate("RAW + 1", &env), Err(EvalError::NotScalar("RAW".into())));
        assert_eq!(evaluate("SEQ", &env), Err(EvalError::NotScalar("SEQ".into())));
    }

    #[test]
    fn arithmetic_faults() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("5 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(eval("1 << 64"), Err(EvalError::Overflow));
    }

    #[test]
    fn lists_of_candidates() {
        assert_eq!(eval("[1, 2, 1 + 2]"), Ok(ParamValue::from(vec![1, 2, 3])));
        assert_eq!(eval("[]"), Ok(ParamValue::List(vec![])));
        assert_eq!(
            eval("[[1], true]"),
            Ok(ParamValue::List(vec![
                ParamValue::from(vec![1]),
                ParamValue::Bool(true)
            ]))
        );
    }

    #[test]
    fn malformed_input() {
        assert!(matches!(eval("1 +"), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(eval("1 2"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(eval("\"text\""), Err(EvalError::UnexpectedChar('"', 0))));
        assert!(matches!(eval("[1, 2"), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(eval(""), Err(EvalError::UnexpectedEnd)));
    }
}
