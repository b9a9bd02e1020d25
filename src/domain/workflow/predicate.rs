//! Predicate language for condition branches and trigger filters
//!
//! A small expression language compiled once and evaluated per execution:
//!
//! ```text
//! event.value > 100 && event.itemCategory in ['shoes', 'bags']
//! not ({{workflow.promoCode.code}} == null) || event.name startsWith 'checkout'
//! ```
//!
//! Only literals, data paths, comparisons and boolean connectives exist, so a
//! predicate can never run arbitrary code.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

use super::resolver::{DataResolver, DataSource, value_to_string};

/// Errors raised while compiling or evaluating a predicate
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredicateError {
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl PredicateError {
    fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }
}

/// Comparison operators shared by predicates and trigger filters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    #[serde(alias = "equals")]
    Eq,

    #[serde(alias = "not_equals")]
    Ne,

    #[serde(alias = "greater_than")]
    Gt,

    #[serde(alias = "greater_than_or_equal")]
    Gte,

    #[serde(alias = "less_than")]
    Lt,

    #[serde(alias = "less_than_or_equal")]
    Lte,

    Contains,

    StartsWith,

    EndsWith,

    In,

    IsEmpty,

    IsNotEmpty,
}

impl ConditionOperator {
    /// Apply the operator to two resolved values.
    ///
    /// Ordering operators coerce numeric strings; comparing values that have
    /// no common ordering is an error rather than `false`.
    pub fn evaluate(&self, left: &Value, right: &Value) -> Result<bool, PredicateError> {
        match self {
            Self::Eq => Ok(loose_eq(left, right)),
            Self::Ne => Ok(!loose_eq(left, right)),
            Self::Gt => Ok(ordering(left, right)? == Ordering::Greater),
            Self::Gte => Ok(ordering(left, right)? != Ordering::Less),
            Self::Lt => Ok(ordering(left, right)? == Ordering::Less),
            Self::Lte => Ok(ordering(left, right)? != Ordering::Greater),
            Self::Contains => contains(left, right),
            Self::In => contains(right, left),
            Self::StartsWith => affix(left, right, |s, p| s.starts_with(p)),
            Self::EndsWith => affix(left, right, |s, p| s.ends_with(p)),
            Self::IsEmpty => Ok(!is_truthy(left) && !matches!(left, Value::Bool(_) | Value::Number(_))),
            Self::IsNotEmpty => Ok(is_truthy(left) || matches!(left, Value::Bool(_) | Value::Number(_))),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::In => "in",
            Self::IsEmpty => "isEmpty",
            Self::IsNotEmpty => "isNotEmpty",
        }
    }
}

/// Truthiness: null, false, 0, "", [] and {} are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_number(left), as_number(right)), (Some(a), Some(b)) if a == b)
        }
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Result<Ordering, PredicateError> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a
            .partial_cmp(&b)
            .ok_or_else(|| PredicateError::evaluation("cannot order NaN"));
    }

    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(PredicateError::evaluation(format!(
            "cannot order {} and {}",
            type_name(left),
            type_name(right)
        ))),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, PredicateError> {
    match (haystack, needle) {
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::String(s), Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            Ok(s.contains(&value_to_string(needle)))
        }
        (Value::Array(items), _) => Ok(items.iter().any(|item| loose_eq(item, needle))),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(PredicateError::evaluation(format!(
            "{} cannot contain {}",
            type_name(haystack),
            type_name(needle)
        ))),
    }
}

fn affix<F>(subject: &Value, affix: &Value, check: F) -> Result<bool, PredicateError>
where
    F: Fn(&str, &str) -> bool,
{
    match (subject, affix) {
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::String(s), Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            Ok(check(s, &value_to_string(affix)))
        }
        _ => Err(PredicateError::evaluation(format!(
            "prefix/suffix test needs a string, got {}",
            type_name(subject)
        ))),
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, ConditionOperator, Box<Expr>),
}

impl Expr {
    fn evaluate(&self, resolver: &DataResolver<'_>) -> Result<Value, PredicateError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Path(path) => Ok(resolver.lookup(path)),
            Self::List(items) => items
                .iter()
                .map(|item| item.evaluate(resolver))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Self::Not(inner) => Ok(Value::Bool(!is_truthy(&inner.evaluate(resolver)?))),
            Self::And(left, right) => {
                if !is_truthy(&left.evaluate(resolver)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&right.evaluate(resolver)?)))
            }
            Self::Or(left, right) => {
                if is_truthy(&left.evaluate(resolver)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&right.evaluate(resolver)?)))
            }
            Self::Compare(left, op, right) => {
                let left = left.evaluate(resolver)?;
                let right = right.evaluate(resolver)?;
                op.evaluate(&left, &right).map(Value::Bool)
            }
        }
    }

    fn collect_paths<'e>(&'e self, out: &mut Vec<&'e str>) {
        match self {
            Self::Literal(_) => {}
            Self::Path(path) => out.push(path),
            Self::List(items) => items.iter().for_each(|item| item.collect_paths(out)),
            Self::Not(inner) => inner.collect_paths(out),
            Self::And(left, right) | Self::Or(left, right) | Self::Compare(left, _, right) => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
        }
    }
}

/// A compiled predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    pub fn compile(source: &str) -> Result<Self, PredicateError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(PredicateError::parse(0, "empty predicate"));
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.chars().count(),
        };
        let expr = parser.parse_or()?;
        if let Some((position, token)) = parser.tokens.get(parser.pos) {
            return Err(PredicateError::parse(
                *position,
                format!("unexpected {}", token),
            ));
        }

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate to a boolean using the truthiness rules
    pub fn evaluate(&self, resolver: &DataResolver<'_>) -> Result<bool, PredicateError> {
        self.expr.evaluate(resolver).map(|value| is_truthy(&value))
    }

    /// Data paths the predicate reads
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.expr.collect_paths(&mut out);
        out
    }
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Op(ConditionOperator),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    OpenBraces,
    CloseBraces,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {}", n),
            Self::Str(s) => write!(f, "string '{}'", s),
            Self::Ident(s) => write!(f, "identifier '{}'", s),
            Self::True => write!(f, "'true'"),
            Self::False => write!(f, "'false'"),
            Self::Null => write!(f, "'null'"),
            Self::And => write!(f, "'&&'"),
            Self::Or => write!(f, "'||'"),
            Self::Not => write!(f, "'!'"),
            Self::Op(op) => write!(f, "'{}'", op.symbol()),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::Comma => write!(f, "','"),
            Self::OpenBraces => write!(f, "'{{{{'"),
            Self::CloseBraces => write!(f, "'}}}}'"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, PredicateError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match (c, next) {
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('{', Some('{')) => (Token::OpenBraces, 2),
            ('}', Some('}')) => (Token::CloseBraces, 2),
            ('=', Some('=')) => (Token::Op(ConditionOperator::Eq), 2),
            ('=', _) => (Token::Op(ConditionOperator::Eq), 1),
            ('!', Some('=')) => (Token::Op(ConditionOperator::Ne), 2),
            ('!', _) => (Token::Not, 1),
            ('>', Some('=')) => (Token::Op(ConditionOperator::Gte), 2),
            ('>', _) => (Token::Op(ConditionOperator::Gt), 1),
            ('<', Some('=')) => (Token::Op(ConditionOperator::Lte), 2),
            ('<', _) => (Token::Op(ConditionOperator::Lt), 1),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('\'' | '"', _) => {
                let (text, consumed) = read_string(&chars, i)?;
                (Token::Str(text), consumed)
            }
            (c, _) if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let (number, consumed) = read_number(&chars, i)?;
                (Token::Number(number), consumed)
            }
            (c, _) if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|ch| ch.is_alphanumeric() || **ch == '_' || **ch == '.')
                    .count();
                let word: String = chars[i..i + len].iter().collect();
                (keyword_or_ident(word), len)
            }
            _ => {
                return Err(PredicateError::parse(
                    start,
                    format!("unexpected character '{}'", c),
                ));
            }
        };

        tokens.push((start, token));
        i += width;
    }

    Ok(tokens)
}

fn keyword_or_ident(word: String) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        "contains" => Token::Op(ConditionOperator::Contains),
        "startswith" => Token::Op(ConditionOperator::StartsWith),
        "endswith" => Token::Op(ConditionOperator::EndsWith),
        "in" => Token::Op(ConditionOperator::In),
        _ => Token::Ident(word),
    }
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), PredicateError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1 - start)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    Err(PredicateError::parse(start, "unterminated string literal"))
}

fn read_number(chars: &[char], start: usize) -> Result<(Number, usize), PredicateError> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }

    let text: String = chars[start..i].iter().collect();
    let number = if text.contains('.') {
        text.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(Number::from)
    };

    number
        .map(|n| (n, i - start))
        .ok_or_else(|| PredicateError::parse(start, format!("invalid number '{}'", text)))
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(position, _)| *position)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, token)| token.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), PredicateError> {
        let position = self.position();
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(PredicateError::parse(
                position,
                format!("expected {}, found {}", expected, token),
            )),
            None => Err(PredicateError::parse(
                position,
                format!("expected {}, found end of expression", expected),
            )),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, PredicateError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, PredicateError> {
        let left = self.parse_operand()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_operand()?;
            return Ok(Expr::Compare(Box::new(left), op, Box::new(right)));
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Expr, PredicateError> {
        let position = self.position();
        let Some(token) = self.advance() else {
            return Err(PredicateError::parse(position, "unexpected end of expression"));
        };

        match token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(path) => parse_path(position, path),
            Token::OpenBraces => {
                let inner = self.position();
                let path = match self.advance() {
                    Some(Token::Ident(path)) => parse_path(inner, path)?,
                    _ => return Err(PredicateError::parse(inner, "expected a data path inside {{ }}")),
                };
                self.expect(Token::CloseBraces)?;
                Ok(path)
            }
            Token::LParen => {
                let expr = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.advance();
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.parse_operand()?);
                    match self.peek() {
                        Some(Token::Comma) => {
                            self.advance();
                        }
                        _ => break,
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Expr::List(items))
            }
            other => Err(PredicateError::parse(position, format!("unexpected {}", other))),
        }
    }
}

fn parse_path(position: usize, path: String) -> Result<Expr, PredicateError> {
    let source = path.split('.').next().unwrap_or_default();
    if DataSource::parse(source).is_none() {
        return Err(PredicateError::parse(
            position,
            format!(
                "unknown data source '{}' (expected event, execution, workflow or context)",
                source
            ),
        ));
    }
    if path.split('.').any(str::is_empty) {
        return Err(PredicateError::parse(
            position,
            format!("malformed path '{}'", path),
        ));
    }
    Ok(Expr::Path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::context::ExecutionContext;
    use serde_json::json;

    fn eval(source: &str, event: Value) -> Result<bool, PredicateError> {
        let mut ctx = ExecutionContext::new(event);
        ctx.set("promoCode", json!({"code": "SAVE10", "discountValue": 10}));
        let resolver = DataResolver::new(&ctx);
        Predicate::compile(source)?.evaluate(&resolver)
    }

    #[test]
    fn test_numeric_comparison() {
        assert!(eval("event.value > 100", json!({"value": 150})).unwrap());
        assert!(!eval("event.value > 100", json!({"value": 50})).unwrap());
        assert!(eval("event.value >= 150", json!({"value": 150})).unwrap());
        assert!(eval("event.value <= -1.5", json!({"value": -2})).unwrap());
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        assert!(eval("event.value > 100", json!({"value": "150"})).unwrap());
        assert!(eval("event.value == 150", json!({"value": "150"})).unwrap());
    }

    #[test]
    fn test_string_operators() {
        let event = json!({"name": "checkout_started", "itemCategory": "shoes"});

        assert!(eval("event.name startsWith 'checkout'", event.clone()).unwrap());
        assert!(eval("event.name endsWith \"started\"", event.clone()).unwrap());
        assert!(eval("event.name contains 'out_st'", event.clone()).unwrap());
        assert!(eval("event.itemCategory in ['shoes', 'bags']", event.clone()).unwrap());
        assert!(!eval("event.itemCategory in ['hats']", event).unwrap());
    }

    #[test]
    fn test_boolean_connectives_and_precedence() {
        let event = json!({"value": 150, "category": "ecommerce"});

        assert!(eval("event.value > 100 && event.category == 'ecommerce'", event.clone()).unwrap());
        assert!(eval("event.value < 100 or event.category == 'ecommerce'", event.clone()).unwrap());
        assert!(!eval("not (event.value > 100)", event.clone()).unwrap());
        // && binds tighter than ||
        assert!(eval("event.value < 0 && false || true", event).unwrap());
    }

    #[test]
    fn test_braced_paths_and_context_variables() {
        assert!(eval("{{workflow.promoCode.code}} == 'SAVE10'", json!({})).unwrap());
        assert!(eval("context.promoCode.discountValue == 10", json!({})).unwrap());
    }

    #[test]
    fn test_bare_path_truthiness() {
        assert!(eval("event.userId", json!({"userId": "u-1"})).unwrap());
        assert!(!eval("event.userId", json!({})).unwrap());
        assert!(!eval("event.items", json!({"items": []})).unwrap());
        assert!(!eval("!event.flag", json!({"flag": true})).unwrap());
    }

    #[test]
    fn test_missing_field_equals_null() {
        assert!(eval("event.missing == null", json!({})).unwrap());
        assert!(!eval("event.missing == 'x'", json!({})).unwrap());
    }

    #[test]
    fn test_incompatible_ordering_is_evaluation_error() {
        let err = eval("event.missing > 100", json!({})).unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation(_)));

        let err = eval("event.tags > 'a'", json!({"tags": ["a"]})).unwrap_err();
        assert!(err.to_string().contains("cannot order array and string"));
    }

    #[test]
    fn test_short_circuit_skips_failing_right_side() {
        assert!(!eval("false && event.missing > 1", json!({})).unwrap());
        assert!(eval("true || event.missing > 1", json!({})).unwrap());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Predicate::compile(""),
            Err(PredicateError::Parse { .. })
        ));
        assert!(Predicate::compile("event.value >").is_err());
        assert!(Predicate::compile("(event.value > 1").is_err());
        assert!(Predicate::compile("'unterminated").is_err());
        assert!(Predicate::compile("event.value > 1 2").is_err());
        assert!(Predicate::compile("event.value # 1").is_err());
    }

    #[test]
    fn test_unknown_source_rejected_at_compile_time() {
        let err = Predicate::compile("user.age > 18").unwrap_err();
        assert!(err.to_string().contains("unknown data source 'user'"));
        assert!(Predicate::compile("event..value == 1").is_err());
    }

    #[test]
    fn test_paths_are_reported() {
        let predicate =
            Predicate::compile("event.value > 100 && {{workflow.promoCode.code}} != null").unwrap();
        assert_eq!(predicate.paths(), vec!["event.value", "workflow.promoCode.code"]);
        assert_eq!(predicate.to_string(), "event.value > 100 && {{workflow.promoCode.code}} != null");
    }

    #[test]
    fn test_operator_evaluate_directly() {
        assert!(ConditionOperator::Eq.evaluate(&json!("a"), &json!("a")).unwrap());
        assert!(ConditionOperator::IsEmpty.evaluate(&json!(""), &Value::Null).unwrap());
        assert!(ConditionOperator::IsNotEmpty.evaluate(&json!(0), &Value::Null).unwrap());
        assert!(ConditionOperator::Contains.evaluate(&json!({"k": 1}), &json!("k")).unwrap());
        assert!(ConditionOperator::Contains.evaluate(&json!(5), &json!(5)).is_err());
    }

    #[test]
    fn test_operator_serde_aliases() {
        let op: ConditionOperator = serde_json::from_value(json!("equals")).unwrap();
        assert_eq!(op, ConditionOperator::Eq);
        let op: ConditionOperator = serde_json::from_value(json!("starts_with")).unwrap();
        assert_eq!(op, ConditionOperator::StartsWith);
    }
}
