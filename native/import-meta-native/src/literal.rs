//! Literal value model.
//!
//! The closed set of values that can be inlined as source text, plus the
//! wider [`Value`] produced by bindings and resolvers. Only values passing
//! [`is_literal`] may be serialized; [`serialize`] re-checks and fails with
//! [`LiteralError::InvalidLiteral`] instead of emitting broken source.

use num_bigint::BigInt;
use oxc_ast::ast::Expression;
use oxc_span::Span;
use oxc_syntax::operator::UnaryOperator;

use crate::error::LiteralError;

const REGEX_FLAGS: &str = "dgimsuvy";

/// A regular expression literal, kept in source form (`pattern` is what
/// `RegExp#source` would return).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpLiteral {
    pub pattern: String,
    pub flags: String,
}

impl RegExpLiteral {
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Flags must be a duplicate-free subset of `dgimsuvy`, and `u`/`v` are exclusive.
    pub fn has_valid_flags(&self) -> bool {
        let mut seen = String::with_capacity(self.flags.len());
        for flag in self.flags.chars() {
            if !REGEX_FLAGS.contains(flag) || seen.contains(flag) {
                return false;
            }
            seen.push(flag);
        }
        !(seen.contains('u') && seen.contains('v'))
    }

    fn to_source(&self) -> String {
        format!("/{}/{}", escape_regex_source(&self.pattern), self.flags)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(BigInt),
    RegExp(RegExpLiteral),
}

impl LiteralValue {
    /// Rejects the values the enum can hold but source text cannot express.
    pub fn is_valid(&self) -> bool {
        match self {
            LiteralValue::Number(n) => n.is_finite(),
            LiteralValue::RegExp(re) => re.has_valid_flags(),
            _ => true,
        }
    }

    pub fn to_source(&self) -> Result<String, LiteralError> {
        if !self.is_valid() {
            return Err(LiteralError::InvalidLiteral(self.type_name().to_string()));
        }
        Ok(match self {
            LiteralValue::Null => "null".to_string(),
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Number(n) => format_number(*n),
            LiteralValue::String(s) => serde_json::to_string(s)
                .map_err(|e| LiteralError::InvalidLiteral(e.to_string()))?,
            LiteralValue::BigInt(b) => format!("{}n", b),
            LiteralValue::RegExp(re) => re.to_source(),
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralValue::Null => "null",
            LiteralValue::Bool(_) => "boolean",
            LiteralValue::Number(n) if n.is_nan() => "NaN",
            LiteralValue::Number(n) if n.is_infinite() => "Infinity",
            LiteralValue::Number(_) => "number",
            LiteralValue::String(_) => "string",
            LiteralValue::BigInt(_) => "bigint",
            LiteralValue::RegExp(re) if !re.has_valid_flags() => "RegExp with invalid flags",
            LiteralValue::RegExp(_) => "RegExp",
        }
    }
}

/// What a binding holds or a resolver returns. Only `Literal` can be inlined.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(LiteralValue),
    List(Vec<LiteralValue>),
    Undefined,
}

impl Value {
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Value::Literal(lit) if lit.is_valid() => Some(lit),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Literal(lit) => lit.type_name(),
            Value::List(_) => "array",
            Value::Undefined => "undefined",
        }
    }
}

pub fn is_literal(value: &Value) -> bool {
    value.as_literal().is_some()
}

pub fn serialize(value: &Value) -> Result<String, LiteralError> {
    match value {
        Value::Literal(lit) => lit.to_source(),
        other => Err(LiteralError::InvalidLiteral(other.type_name().to_string())),
    }
}

macro_rules! impl_from_for_literal {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for LiteralValue {
                fn from(value: $ty) -> Self {
                    LiteralValue::$variant(value.into())
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Literal(LiteralValue::from(value))
                }
            }
        )*
    };
}

impl_from_for_literal! {
    bool => Bool,
    f64 => Number,
    i32 => Number,
    u32 => Number,
    &str => String,
    String => String,
    BigInt => BigInt,
    RegExpLiteral => RegExp,
}

impl From<LiteralValue> for Value {
    fn from(value: LiteralValue) -> Self {
        Value::Literal(value)
    }
}

impl From<Vec<LiteralValue>> for Value {
    fn from(values: Vec<LiteralValue>) -> Self {
        Value::List(values)
    }
}

/// Mirrors `Number#toString` closely enough that every output is a valid,
/// exactly round-tripping numeric literal.
fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

fn escape_regex_source(pattern: &str) -> String {
    if pattern.is_empty() {
        return "(?:)".to_string();
    }

    let mut out = String::with_capacity(pattern.len() + 2);
    let mut in_class = false;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                match chars.next() {
                    Some('\n') => out.push('n'),
                    Some('\r') => out.push('r'),
                    Some('\u{2028}') => out.push_str("u2028"),
                    Some('\u{2029}') => out.push_str("u2029"),
                    Some(next) => out.push(next),
                    None => out.push('\\'),
                }
            }
            '[' => {
                in_class = true;
                out.push(c);
            }
            ']' => {
                in_class = false;
                out.push(c);
            }
            '/' if !in_class => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }

    out
}

/// Reads a literal-syntax expression back into a [`LiteralValue`].
///
/// Bigint and regex values are recovered from their source text so the
/// result does not depend on how the parser stores them.
pub(crate) fn literal_from_expression(expr: &Expression<'_>, source: &str) -> Option<LiteralValue> {
    match expr.without_parentheses() {
        Expression::NullLiteral(_) => Some(LiteralValue::Null),
        Expression::BooleanLiteral(lit) => Some(LiteralValue::Bool(lit.value)),
        Expression::NumericLiteral(lit) => Some(LiteralValue::Number(lit.value)),
        Expression::StringLiteral(lit) => Some(LiteralValue::String(lit.value.to_string())),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => tpl
            .quasis
            .first()
            .and_then(|quasi| quasi.value.cooked.as_ref())
            .map(|cooked| LiteralValue::String(cooked.to_string())),
        Expression::BigIntLiteral(lit) => {
            parse_bigint_literal(span_text(source, lit.span)?).map(LiteralValue::BigInt)
        }
        Expression::RegExpLiteral(lit) => {
            parse_regex_literal(span_text(source, lit.span)?).map(LiteralValue::RegExp)
        }
        Expression::UnaryExpression(unary) if unary.operator == UnaryOperator::UnaryNegation => {
            match literal_from_expression(&unary.argument, source)? {
                LiteralValue::Number(n) => Some(LiteralValue::Number(-n)),
                LiteralValue::BigInt(b) => Some(LiteralValue::BigInt(-b)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn span_text(source: &str, span: Span) -> Option<&str> {
    source.get(span.start as usize..span.end as usize)
}

fn parse_bigint_literal(raw: &str) -> Option<BigInt> {
    let digits = raw.strip_suffix('n')?.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let (body, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest.to_string(), 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest.to_string(), 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest.to_string(), 2)
    } else {
        (lower, 10)
    };
    BigInt::parse_bytes(body.as_bytes(), radix)
}

fn parse_regex_literal(raw: &str) -> Option<RegExpLiteral> {
    let body = raw.strip_prefix('/')?;
    let close = body.rfind('/')?;
    Some(RegExpLiteral::new(&body[..close], &body[close + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn reparse(text: &str) -> Option<LiteralValue> {
        let allocator = Allocator::default();
        let expr = Parser::new(&allocator, text, SourceType::default().with_module(true))
            .parse_expression()
            .ok()?;
        literal_from_expression(&expr, text)
    }

    #[test]
    fn test_serialize_primitives() {
        assert_eq!(serialize(&Value::Literal(LiteralValue::Null)).unwrap(), "null");
        assert_eq!(serialize(&true.into()).unwrap(), "true");
        assert_eq!(serialize(&LiteralValue::Number(42.0).into()).unwrap(), "42");
        assert_eq!(serialize(&1.5.into()).unwrap(), "1.5");
        assert_eq!(serialize(&(-0.0).into()).unwrap(), "0");
        assert_eq!(serialize(&"hi \"there\"".into()).unwrap(), r#""hi \"there\"""#);
        assert_eq!(
            serialize(&BigInt::from(12345678901234567890u64).into()).unwrap(),
            "12345678901234567890n"
        );
    }

    #[test]
    fn test_serialize_regex() {
        let re = RegExpLiteral::new("a/b[/]", "gi");
        assert_eq!(serialize(&re.into()).unwrap(), r"/a\/b[/]/gi");
        assert_eq!(serialize(&RegExpLiteral::new("", "").into()).unwrap(), "/(?:)/");
        assert_eq!(serialize(&RegExpLiteral::new(r"x\/y", "").into()).unwrap(), r"/x\/y/");
    }

    #[test]
    fn test_serialize_regex_escaped_line_separators() {
        let re = RegExpLiteral::new("a\\\u{2028}b\\\u{2029}", "");
        let text = serialize(&re.into()).unwrap();
        assert_eq!(text, r"/a\u2028b\u2029/");
        assert!(!text.contains('\u{2028}') && !text.contains('\u{2029}'));
    }

    #[test]
    fn test_non_literals_rejected() {
        assert!(!is_literal(&f64::NAN.into()));
        assert!(!is_literal(&f64::INFINITY.into()));
        assert!(!is_literal(&Value::Undefined));
        assert!(!is_literal(&Value::List(vec![LiteralValue::Null])));
        assert!(!is_literal(&RegExpLiteral::new("a", "gg").into()));
        assert!(!is_literal(&RegExpLiteral::new("a", "uv").into()));

        assert_eq!(
            serialize(&f64::NAN.into()),
            Err(LiteralError::InvalidLiteral("NaN".to_string()))
        );
        assert_eq!(
            serialize(&Value::List(vec![])),
            Err(LiteralError::InvalidLiteral("array".to_string()))
        );
    }

    #[test]
    fn test_large_and_small_numbers() {
        assert_eq!(format_number(1e21), "1e21");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_round_trip() {
        let values: Vec<LiteralValue> = vec![
            LiteralValue::Null,
            LiteralValue::Bool(true),
            LiteralValue::Bool(false),
            LiteralValue::Number(0.0),
            LiteralValue::Number(9007199254740991.0),
            LiteralValue::Number(-17.25),
            LiteralValue::Number(1e300),
            LiteralValue::Number(3e-9),
            LiteralValue::String(String::new()),
            LiteralValue::String("line\nbreak\t\"quoted\" \\ ü 🚀".to_string()),
            LiteralValue::BigInt(BigInt::from(0)),
            LiteralValue::BigInt("-98765432109876543210987654321".parse().unwrap()),
            LiteralValue::RegExp(RegExpLiteral::new(r"^\d+(?:\.\d+)?$", "gu")),
            LiteralValue::RegExp(RegExpLiteral::new(r"[a-z/]+\/x", "")),
        ];

        for value in values {
            let text = value.to_source().unwrap();
            assert_eq!(reparse(&text), Some(value.clone()), "round trip of {}", text);
        }
    }

    #[test]
    fn test_bigint_prefixes() {
        assert_eq!(parse_bigint_literal("0xFFn"), Some(BigInt::from(255)));
        assert_eq!(parse_bigint_literal("0b101n"), Some(BigInt::from(5)));
        assert_eq!(parse_bigint_literal("0o17n"), Some(BigInt::from(15)));
        assert_eq!(parse_bigint_literal("1_000n"), Some(BigInt::from(1000)));
        assert_eq!(parse_bigint_literal("12"), None);
    }
}
