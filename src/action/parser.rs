use std::sync::OnceLock;

use regex::Regex;

use crate::action::literal::parse_literal;
use crate::action::types::{Action, ActionKind, METADATA_KEY};
use crate::errors::{PhoneAgentError, PhoneAgentResult};
use crate::llm::segmenter::split_legacy_tags;

const ARG_SEPARATOR: &str = ", ";

/// Parses the action part of a model response into a typed `Action`.
///
/// Accepts `do(key=value, ...)`, `finish(message="...")` and the legacy
/// `<answer>...</answer>` wrapping around either of them. Any failure rejects
/// the whole expression; no partially filled `Action` is returned.
pub fn parse_action(raw: &str) -> PhoneAgentResult<Action> {
    tracing::debug!(raw = %raw, "parsing action");
    let expr = raw.trim();

    match parse_call(expr) {
        Some(result) => result,
        None => {
            if let Some((_, inner)) = split_legacy_tags(expr) {
                tracing::debug!(inner = %inner, "action wrapped in legacy answer tags");
                if let Some(result) = parse_call(inner.trim()) {
                    return result;
                }
            }
            tracing::warn!(raw = %expr, "no recognizable action expression");
            Err(PhoneAgentError::UnknownAction(expr.to_string()))
        }
    }
}

/// Returns `None` when `expr` starts with neither call form.
fn parse_call(expr: &str) -> Option<PhoneAgentResult<Action>> {
    if expr.starts_with("do(") {
        let result = parse_do_call(expr);
        if let Err(e) = &result {
            tracing::error!(raw = %expr, error = %e, "failed to parse do() action");
        }
        return Some(result);
    }

    if expr.starts_with("finish") {
        return Some(parse_finish_message(expr).map(Action::finish));
    }

    None
}

fn parse_do_call(expr: &str) -> PhoneAgentResult<Action> {
    let body = expr
        .strip_prefix("do(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| PhoneAgentError::Syntax(expr.to_string()))?;

    let mut action = Action::new(ActionKind::Do);
    if body.trim().is_empty() {
        return Ok(action);
    }

    for token in split_arguments(body) {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| PhoneAgentError::Argument(token.to_string()))?;
        let key = key.trim();
        if key == METADATA_KEY {
            return Err(PhoneAgentError::Argument(format!("reserved key: {token}")));
        }

        let value = parse_literal(value.trim()).map_err(|e| match e {
            PhoneAgentError::Literal(detail) => {
                PhoneAgentError::Literal(format!("{key}: {detail}"))
            }
            other => other,
        })?;
        action.insert(key, value);
    }

    Ok(action)
}

fn message_regex() -> &'static Regex {
    static MESSAGE_RE: OnceLock<Regex> = OnceLock::new();
    MESSAGE_RE.get_or_init(|| {
        Regex::new(r#"message="((?:\\.|[^"])*)""#).expect("message pattern is valid")
    })
}

/// Extracts the text between `message="` and the next quote not preceded by a
/// backslash. The text is returned as written; `\"` is not unescaped.
fn parse_finish_message(expr: &str) -> PhoneAgentResult<String> {
    message_regex()
        .captures(expr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| PhoneAgentError::Syntax(format!("message not found: {expr}")))
}

/// Splits a `do(...)` body into `key=value` tokens at top-level `", "`.
///
/// A value opening with `"` runs to its closing quote (see `string_end`) and a
/// value opening with `[` runs to the first `]`; separators inside either are
/// kept in the value. Every body that a plain split on `", "` turns into valid
/// tokens splits the same way.
fn split_arguments(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        // Key: up to the first `=` or separator.
        while i < bytes.len() && bytes[i] != b'=' && !at_separator(bytes, i) {
            i += 1;
        }

        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(b'"') => i = string_end(body, i + 1),
                Some(b'[') => {
                    i = body[i..].find(']').map(|off| i + off + 1).unwrap_or(bytes.len());
                }
                _ => {}
            }
            while i < bytes.len() && !at_separator(bytes, i) {
                i += 1;
            }
        }

        tokens.push(&body[start..i]);
        if i < bytes.len() {
            i += ARG_SEPARATOR.len();
            start = i;
            if i == bytes.len() {
                // Trailing separator leaves an empty final token.
                tokens.push("");
            }
        }
    }

    tokens
}

fn at_separator(bytes: &[u8], i: usize) -> bool {
    bytes[i..].starts_with(ARG_SEPARATOR.as_bytes())
}

/// Index just past the closing quote of a string value starting at `from`.
///
/// Prefers a quote followed by the end of the body or by a separator and a
/// `key=` segment; otherwise takes the first quote followed by any separator,
/// and failing that runs to the end of the body.
fn string_end(body: &str, from: usize) -> usize {
    let mut fallback = None;
    let mut search = from;
    while let Some(off) = body[search..].find('"') {
        let quote = search + off;
        let rest = body[quote + 1..].trim_start();
        if rest.is_empty() {
            return quote + 1;
        }
        if let Some(next) = rest.strip_prefix(ARG_SEPARATOR) {
            let segment = next.split(ARG_SEPARATOR).next().unwrap_or_default();
            if segment.contains('=') {
                return quote + 1;
            }
            fallback.get_or_insert(quote + 1);
        }
        search = quote + 1;
    }
    fallback.unwrap_or(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::literal::Literal;

    fn kv(action: &Action) -> Vec<(String, Literal)> {
        action.args().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_do_with_all_literal_kinds() {
        let action = parse_action(r#"do(action="click", x=1, y=2, ok=true, pts=[1,2,3])"#).unwrap();
        assert_eq!(action.kind(), ActionKind::Do);
        assert_eq!(action.get("_metadata"), Some(Literal::Str("do".into())));
        assert_eq!(
            kv(&action),
            vec![
                ("action".to_string(), Literal::Str("click".into())),
                ("x".to_string(), Literal::Int(1)),
                ("y".to_string(), Literal::Int(2)),
                ("ok".to_string(), Literal::Bool(true)),
                ("pts".to_string(), Literal::IntList(vec![1, 2, 3])),
            ]
        );
    }

    #[test]
    fn test_do_empty_arguments() {
        let action = parse_action("do()").unwrap();
        assert_eq!(action.kind(), ActionKind::Do);
        assert!(action.is_empty());
        assert!(parse_action("do(   )").unwrap().is_empty());
    }

    #[test]
    fn test_do_missing_paren_is_syntax_error() {
        let err = parse_action(r#"do(action="x""#).unwrap_err();
        assert!(matches!(err, PhoneAgentError::Syntax(ref s) if s == r#"do(action="x""#));
    }

    #[test]
    fn test_do_token_without_equals() {
        let err = parse_action(r#"do(action="Tap", 500)"#).unwrap_err();
        assert!(matches!(err, PhoneAgentError::Argument(ref s) if s == "500"));
    }

    #[test]
    fn test_do_bad_literal_fails_whole_parse() {
        let err = parse_action(r#"do(action="Tap", element=center)"#).unwrap_err();
        assert!(matches!(err, PhoneAgentError::Literal(ref s) if s.contains("element")));
    }

    #[test]
    fn test_do_reserved_key_rejected() {
        let err = parse_action(r#"do(_metadata="finish")"#).unwrap_err();
        assert!(matches!(err, PhoneAgentError::Argument(_)));
    }

    #[test]
    fn test_do_trims_surrounding_whitespace() {
        let action = parse_action("  do(action=\"Back\")\n").unwrap();
        assert_eq!(action.action_name(), Some("Back"));
    }

    #[test]
    fn test_typical_phone_actions() {
        let tap = parse_action(r#"do(action="Tap", element=[500,300])"#).unwrap();
        assert_eq!(tap.action_name(), Some("Tap"));
        assert_eq!(tap.arg("element").and_then(Literal::as_int_list), Some(&[500, 300][..]));

        let swipe =
            parse_action(r#"do(action="Swipe", start=[100,800], end=[100,200])"#).unwrap();
        assert_eq!(swipe.len(), 3);

        let typed = parse_action(r#"do(action="Type", text="hello world")"#).unwrap();
        assert_eq!(typed.arg("text").and_then(Literal::as_str), Some("hello world"));

        let wait = parse_action(r#"do(action="Wait", duration="2 seconds")"#).unwrap();
        assert_eq!(wait.arg("duration").and_then(Literal::as_str), Some("2 seconds"));
    }

    #[test]
    fn test_separator_inside_string_value() {
        let action = parse_action(r#"do(action="Type", text="Hi, Bob")"#).unwrap();
        assert_eq!(action.arg("text").and_then(Literal::as_str), Some("Hi, Bob"));

        let action = parse_action(r#"do(action="Type", text="a, b=c", n=1)"#).unwrap();
        assert_eq!(action.arg("text").and_then(Literal::as_str), Some("a, b=c"));
        assert_eq!(action.arg("n"), Some(&Literal::Int(1)));
    }

    #[test]
    fn test_non_ascii_values() {
        let action = parse_action(r#"do(action="Type", text="你好, 世界")"#).unwrap();
        assert_eq!(action.arg("text").and_then(Literal::as_str), Some("你好, 世界"));

        let err = parse_action("do(action=点击, x=1)").unwrap_err();
        assert!(matches!(err, PhoneAgentError::Literal(ref s) if s.contains("点击")));
    }

    #[test]
    fn test_separator_inside_brackets() {
        let action = parse_action(r#"do(action="Tap", element=[500, 300])"#).unwrap();
        assert_eq!(action.arg("element"), Some(&Literal::IntList(vec![500, 300])));
    }

    #[test]
    fn test_unescaped_inner_quotes_match_plain_split() {
        let action = parse_action(r#"do(text="a "b", c="d")"#).unwrap();
        assert_eq!(action.arg("text").and_then(Literal::as_str), Some(r#"a "b"#));
        assert_eq!(action.arg("c").and_then(Literal::as_str), Some("d"));
    }

    #[test]
    fn test_trailing_separator_is_argument_error() {
        let err = parse_action(r#"do(action="Back", )"#).unwrap_err();
        assert!(matches!(err, PhoneAgentError::Argument(_)));
    }

    #[test]
    fn test_finish() {
        let action = parse_action(r#"finish(message="done")"#).unwrap();
        assert_eq!(action.kind(), ActionKind::Finish);
        assert_eq!(action.get("_metadata"), Some(Literal::Str("finish".into())));
        assert_eq!(action.message(), Some("done"));
        assert_eq!(action.len(), 1);
    }

    #[test]
    fn test_finish_keeps_escaped_quotes_verbatim() {
        let action = parse_action(r#"finish(message="said \"ok\", then left")"#).unwrap();
        assert_eq!(action.message(), Some(r#"said \"ok\", then left"#));
    }

    #[test]
    fn test_finish_without_message() {
        let err = parse_action("finish()").unwrap_err();
        assert!(matches!(err, PhoneAgentError::Syntax(_)));
    }

    #[test]
    fn test_legacy_answer_tags() {
        let action =
            parse_action(r#"<think>open it</think><answer>do(action="Launch", app="Settings")</answer>"#)
                .unwrap();
        assert_eq!(action.action_name(), Some("Launch"));

        let action = parse_action(r#"<answer>finish(message="ok")</answer>"#).unwrap();
        assert_eq!(action.message(), Some("ok"));
    }

    #[test]
    fn test_legacy_answer_without_call() {
        let err = parse_action("<answer>tap the button</answer>").unwrap_err();
        assert!(matches!(err, PhoneAgentError::UnknownAction(_)));
    }

    #[test]
    fn test_unknown_action() {
        for raw in ["", "tap(500, 300)", "no markers here", "Do(action=\"x\")"] {
            let err = parse_action(raw).unwrap_err();
            assert!(matches!(err, PhoneAgentError::UnknownAction(_)), "raw {raw:?}");
            assert!(err.is_parse_error());
        }
    }

    #[test]
    fn test_split_arguments_matches_plain_split_on_valid_bodies() {
        let bodies = [
            r#"action="Tap", element=[500,300]"#,
            r#"action="Type", text="hello""#,
            r#"a=1, b=2.5, c=false, d=[]"#,
            r#"text="a "b", c="d""#,
            r#"k = "v" , j=1"#,
        ];
        for body in bodies {
            let plain: Vec<&str> = body.split(ARG_SEPARATOR).collect();
            assert_eq!(split_arguments(body), plain, "body {body:?}");
        }
    }

    #[test]
    fn test_non_finite_float_rejected() {
        for expr in [
            r#"do(action="Wait", duration=nan)"#,
            r#"do(action="Wait", duration=inf)"#,
        ] {
            let err = parse_action(expr).unwrap_err();
            assert!(matches!(err, PhoneAgentError::Literal(ref s) if s.contains("duration")));
        }
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let exprs = [
            r#"do(action="click", x=1, y=2, ok=true, pts=[1,2,3])"#,
            r#"do(action="Swipe", start=[10,20], end=[30,40])"#,
            r#"do(action="Wait", duration=0.5)"#,
            r#"do(action="Type", text="")"#,
            r#"do(action="Long Press", element=[-1,0], hold=false)"#,
            r#"do(action="Note", message="x=y")"#,
            "do()",
        ];
        for expr in exprs {
            let first = parse_action(expr).unwrap();
            let second = parse_action(&first.to_expression()).unwrap();
            assert_eq!(first, second, "expr {expr:?}");
        }
    }
}
