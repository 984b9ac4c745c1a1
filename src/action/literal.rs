use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{PhoneAgentError, PhoneAgentResult};

/// A typed argument value inside a `do(...)` expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    IntList(Vec<i64>),
    Str(String),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float(f) => Some(*f),
            Literal::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            Literal::IntList(v) => Some(v),
            _ => None,
        }
    }
}

/// Renders the literal back into the textual form `parse_literal` accepts.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "\"{s}\""),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            // `{:?}` keeps a trailing `.0` so the token does not re-parse as an integer.
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::IntList(v) => {
                let items: Vec<String> = v.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", items.join(","))
            }
        }
    }
}

/// Parses one argument value token.
///
/// Rules are tried in a fixed order and the first match governs: quoted
/// string, `true`/`false`, `[int,...]`, integer, finite float. String contents are
/// returned verbatim; escape sequences are not processed.
pub fn parse_literal(token: &str) -> PhoneAgentResult<Literal> {
    let s = token.trim();
    tracing::trace!(token = %s, "parsing literal");

    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        return Ok(Literal::Str(s[1..s.len() - 1].to_string()));
    }

    match s {
        "true" => return Ok(Literal::Bool(true)),
        "false" => return Ok(Literal::Bool(false)),
        _ => {}
    }

    if let Some(inner) = s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        return parse_int_list(inner).map(Literal::IntList);
    }

    if let Ok(i) = s.parse::<i64>() {
        return Ok(Literal::Int(i));
    }

    // `nan` and `inf` parse as f64 but are not decimal numbers.
    if let Ok(x) = s.parse::<f64>() {
        if x.is_finite() {
            return Ok(Literal::Float(x));
        }
    }

    Err(PhoneAgentError::Literal(s.to_string()))
}

fn parse_int_list(inner: &str) -> PhoneAgentResult<Vec<i64>> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|piece| {
            piece.trim().parse::<i64>().map_err(|_| {
                PhoneAgentError::Literal(format!("invalid int in array: {}", piece.trim()))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_string_is_verbatim() {
        assert_eq!(parse_literal(r#""Settings""#).unwrap(), Literal::Str("Settings".into()));
        assert_eq!(parse_literal(r#""""#).unwrap(), Literal::Str(String::new()));
        assert_eq!(
            parse_literal(r#""say \"hi\"""#).unwrap(),
            Literal::Str(r#"say \"hi\""#.into())
        );
    }

    #[test]
    fn test_quoted_numbers_stay_strings() {
        assert_eq!(parse_literal(r#""42""#).unwrap(), Literal::Str("42".into()));
        assert_eq!(parse_literal(r#""true""#).unwrap(), Literal::Str("true".into()));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(parse_literal("true").unwrap(), Literal::Bool(true));
        assert_eq!(parse_literal("false").unwrap(), Literal::Bool(false));
        assert!(parse_literal("True").is_err());
    }

    #[test]
    fn test_int_list() {
        assert_eq!(parse_literal("[1,2,3]").unwrap(), Literal::IntList(vec![1, 2, 3]));
        assert_eq!(parse_literal("[ 10 , -20 ]").unwrap(), Literal::IntList(vec![10, -20]));
        assert_eq!(parse_literal("[]").unwrap(), Literal::IntList(vec![]));
        assert_eq!(parse_literal("[  ]").unwrap(), Literal::IntList(vec![]));
    }

    #[test]
    fn test_int_list_rejects_bad_piece() {
        let err = parse_literal("[1,x,3]").unwrap_err();
        assert!(matches!(err, PhoneAgentError::Literal(ref m) if m.contains('x')));
        assert!(parse_literal("[1,2,]").is_err());
        assert!(parse_literal("[1.5]").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_literal("500").unwrap(), Literal::Int(500));
        assert_eq!(parse_literal("-7").unwrap(), Literal::Int(-7));
        assert_eq!(parse_literal(" 12 ").unwrap(), Literal::Int(12));
        assert_eq!(parse_literal("0.5").unwrap(), Literal::Float(0.5));
        assert_eq!(parse_literal("1e3").unwrap(), Literal::Float(1000.0));
    }

    #[test]
    fn test_unsupported() {
        for token in ["hello", "\"", "\"open", "[1,2", "", "{}", "nan", "NaN", "inf", "-infinity"] {
            let err = parse_literal(token).unwrap_err();
            assert!(matches!(err, PhoneAgentError::Literal(_)), "token {token:?}");
        }
    }

    #[test]
    fn test_display_reparses() {
        for lit in [
            Literal::Str("Wi-Fi".into()),
            Literal::Bool(false),
            Literal::Int(-3),
            Literal::Float(2.0),
            Literal::Float(0.25),
            Literal::IntList(vec![100, 200]),
            Literal::IntList(vec![]),
        ] {
            assert_eq!(parse_literal(&lit.to_string()).unwrap(), lit);
        }
    }
}
