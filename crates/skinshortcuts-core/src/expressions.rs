//! `$MATH` and `$IF` expression evaluation.
//!
//! `$MATH[...]` holds arithmetic over numeric literals and property
//! variables: `$MATH[id * 100 + 5000]`, `$MATH[(mainmenuid * 1000) + 600]`.
//! `$IF[...]` selects a value by condition:
//! `$IF[cond THEN val1 ELIF cond2 THEN val2 ELSE val3]`.
//!
//! `$MATH` is fail-soft: any syntax error or zero divisor yields the
//! original expression text unchanged, never an error. Callers rely on
//! this to pass malformed-looking values through untouched.

use std::fmt;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::conditions::evaluate_condition;
use crate::model::PropertyMap;

lazy_static! {
    static ref MATH_PATTERN: Regex = Regex::new(r"\$MATH\[([^\]]+)\]").unwrap();
    static ref IF_PATTERN: Regex = Regex::new(r"\$IF\[([^\]]+)\]").unwrap();
    static ref THEN_KEYWORD: Regex = Regex::new(r"(?i)\bTHEN\b").unwrap();
    static ref ELIF_KEYWORD: Regex = Regex::new(r"(?i)\bELIF\b").unwrap();
    static ref ELSE_KEYWORD: Regex = Regex::new(r"(?i)\bELSE\b").unwrap();
}

/// Internal math parse failures. These never leave the module: the public
/// contract degrades to returning the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MathError {
    /// A character no grammar rule accepts
    UnexpectedCharacter(char),
    /// Input ended where an operand was required
    UnexpectedEnd,
    /// Unterminated parenthesized expression
    MissingClosingParen,
    /// Zero divisor in `/` or `//`
    DivisionByZero,
    /// Zero divisor in `%`
    ModuloByZero,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::UnexpectedCharacter(ch) => write!(f, "unexpected character '{}'", ch),
            MathError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            MathError::MissingClosingParen => write!(f, "missing closing parenthesis"),
            MathError::DivisionByZero => write!(f, "division by zero"),
            MathError::ModuloByZero => write!(f, "modulo by zero"),
        }
    }
}

impl std::error::Error for MathError {}

/// Recursive-descent arithmetic parser.
///
/// Precedence: unary sign > `*` `/` `//` `%` > `+` `-`, left-associative,
/// parentheses override. Variables resolve against the property map;
/// missing or non-numeric values read as 0.
struct MathParser<'a> {
    chars: Vec<char>,
    pos: usize,
    variables: &'a PropertyMap,
}

impl<'a> MathParser<'a> {
    fn new(expr: &str, variables: &'a PropertyMap) -> Self {
        MathParser {
            chars: expr.chars().collect(),
            pos: 0,
            variables,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Addition and subtraction (lowest precedence).
    fn parse_expression(&mut self) -> Result<f64, MathError> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    left += self.parse_term()?;
                }
                Some('-') => {
                    self.pos += 1;
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    /// Multiplication, division, floor division, modulo.
    fn parse_term(&mut self) -> Result<f64, MathError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            // Floor division before plain division: "//" is one operator
            if self.peek() == Some('/') && self.chars.get(self.pos + 1) == Some(&'/') {
                self.pos += 2;
                let right = self.parse_unary()?;
                left = floor_div(left, right)?;
                continue;
            }
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    left *= self.parse_unary()?;
                }
                Some('/') => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(MathError::DivisionByZero);
                    }
                    left /= right;
                }
                Some('%') => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(MathError::ModuloByZero);
                    }
                    left = floor_mod(left, right);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<f64, MathError> {
        self.skip_whitespace();
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.parse_unary()?)
            }
            Some('+') => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    /// Numbers, variables and parenthesized expressions.
    fn parse_primary(&mut self) -> Result<f64, MathError> {
        self.skip_whitespace();
        let Some(ch) = self.peek() else {
            return Err(MathError::UnexpectedEnd);
        };

        if ch == '(' {
            self.pos += 1;
            let result = self.parse_expression()?;
            self.skip_whitespace();
            if self.peek() != Some(')') {
                return Err(MathError::MissingClosingParen);
            }
            self.pos += 1;
            return Ok(result);
        }

        if ch.is_ascii_digit() || ch == '.' {
            return self.parse_number();
        }

        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.parse_variable());
        }

        Err(MathError::UnexpectedCharacter(ch))
    }

    fn parse_number(&mut self) -> Result<f64, MathError> {
        let start = self.pos;
        let mut has_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.pos += 1;
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| MathError::UnexpectedEnd)
    }

    fn parse_variable(&mut self) -> f64 {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match self.variables.get(&name) {
            Some(value) => value.trim().parse::<f64>().unwrap_or(0.0),
            None => 0.0,
        }
    }
}

/// Floored division after truncating both operands to integers; the
/// quotient rounds toward negative infinity.
fn floor_div(left: f64, right: f64) -> Result<f64, MathError> {
    let left = left.trunc();
    let right = right.trunc();
    if right == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    Ok((left / right).floor())
}

/// Floored modulo: the result takes the divisor's sign.
fn floor_mod(left: f64, right: f64) -> f64 {
    let rem = left % right;
    if rem != 0.0 && (rem < 0.0) != (right < 0.0) {
        rem + right
    } else {
        rem
    }
}

/// Whole numbers render without a fractional part; everything else uses
/// shortest round-trip formatting.
fn render_number(result: f64) -> String {
    if result.is_finite() && result.fract() == 0.0 {
        if result == 0.0 {
            "0".to_string()
        } else {
            format!("{:.0}", result)
        }
    } else {
        format!("{}", result)
    }
}

/// Evaluate a `$MATH` expression body.
///
/// Returns the computed result as a string, or the original expression
/// verbatim on any failure.
pub fn evaluate_math(expr: &str, properties: &PropertyMap) -> String {
    let mut parser = MathParser::new(expr.trim(), properties);
    let evaluated = parser.parse_expression().and_then(|result| {
        parser.skip_whitespace();
        match parser.peek() {
            Some(ch) => Err(MathError::UnexpectedCharacter(ch)),
            None => Ok(result),
        }
    });
    match evaluated {
        Ok(result) => render_number(result),
        Err(err) => {
            tracing::debug!(expression = expr, %err, "math expression left unevaluated");
            expr.to_string()
        }
    }
}

/// Evaluate a `$IF` expression body.
///
/// `cond THEN value [ELIF cond THEN value]... [ELSE value]` - keywords are
/// case-insensitive whole words; the first condition that holds selects its
/// value; otherwise the `ELSE` value, or empty when there is none.
pub fn evaluate_if(expr: &str, properties: &PropertyMap) -> String {
    let mut clauses: Vec<(String, String)> = Vec::new();
    let mut else_value: Option<String> = None;

    let mut remaining = expr.trim().to_string();
    loop {
        let current = remaining.trim().to_string();
        if current.is_empty() {
            break;
        }

        let Some(then_match) = THEN_KEYWORD.find(&current) else {
            // No more THEN: the remainder is the else value when at least
            // one clause was parsed
            if !clauses.is_empty() {
                else_value = Some(current);
            }
            break;
        };

        let condition = current[..then_match.start()].trim().to_string();
        let after_then = current[then_match.end()..].trim().to_string();

        let elif_match = ELIF_KEYWORD.find(&after_then);
        let else_match = ELSE_KEYWORD.find(&after_then);

        enum Next {
            Elif(usize),
            Else(usize),
            End,
        }
        let (end_pos, next) = match (&elif_match, &else_match) {
            (Some(elif), Some(els)) if elif.start() < els.start() => {
                (elif.start(), Next::Elif(elif.end()))
            }
            (Some(elif), None) => (elif.start(), Next::Elif(elif.end())),
            (_, Some(els)) => (els.start(), Next::Else(els.end())),
            (None, None) => (after_then.len(), Next::End),
        };

        let value = after_then[..end_pos].trim().to_string();
        clauses.push((condition, value));

        match next {
            Next::Elif(end) => remaining = after_then[end..].to_string(),
            Next::Else(end) => {
                else_value = Some(after_then[end..].trim().to_string());
                break;
            }
            Next::End => break,
        }
    }

    for (condition, value) in &clauses {
        if evaluate_condition(condition, properties) {
            return value.clone();
        }
    }
    else_value.unwrap_or_default()
}

/// Replace every `$MATH[...]` occurrence in `text` with its evaluation.
pub fn process_math_expressions(text: &str, properties: &PropertyMap) -> String {
    MATH_PATTERN
        .replace_all(text, |caps: &Captures| evaluate_math(&caps[1], properties))
        .into_owned()
}

/// Replace every `$IF[...]` occurrence in `text` with its evaluation.
pub fn process_if_expressions(text: &str, properties: &PropertyMap) -> String {
    IF_PATTERN
        .replace_all(text, |caps: &Captures| evaluate_if(&caps[1], properties))
        .into_owned()
}
