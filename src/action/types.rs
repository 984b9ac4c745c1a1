use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::action::literal::Literal;

/// Reserved key under which the action kind is exposed.
pub const METADATA_KEY: &str = "_metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Do,
    Finish,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Do => "do",
            ActionKind::Finish => "finish",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed action expression: its kind plus named, typed arguments.
///
/// Arguments keep the order they were written in; keys are unique and a
/// repeated key overwrites the earlier value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionKind,
    args: Vec<(String, Literal)>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
        }
    }

    pub fn finish(message: impl Into<String>) -> Self {
        let mut action = Self::new(ActionKind::Finish);
        action.insert("message", Literal::Str(message.into()));
        action
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Literal) {
        let key = key.into();
        match self.args.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.args.push((key, value)),
        }
    }

    /// Looks up an argument. `_metadata` resolves to the kind string.
    pub fn get(&self, key: &str) -> Option<Literal> {
        if key == METADATA_KEY {
            return Some(Literal::Str(self.kind.as_str().to_string()));
        }
        self.arg(key).cloned()
    }

    pub fn arg(&self, key: &str) -> Option<&Literal> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn args(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// The device interaction named by a `do(action="...")` call.
    pub fn action_name(&self) -> Option<&str> {
        match self.kind {
            ActionKind::Do => self.arg("action").and_then(Literal::as_str),
            ActionKind::Finish => None,
        }
    }

    /// The closing message of a `finish(...)` call.
    pub fn message(&self) -> Option<&str> {
        self.arg("message").and_then(Literal::as_str)
    }

    /// Renders the action back into the expression syntax the parser accepts.
    pub fn to_expression(&self) -> String {
        match self.kind {
            ActionKind::Finish => {
                format!("finish(message=\"{}\")", self.message().unwrap_or_default())
            }
            ActionKind::Do => {
                let body: Vec<String> =
                    self.args.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("do({})", body.join(", "))
            }
        }
    }
}

/// Serializes as a flat map: `{"_metadata": "do", "action": "Tap", ...}`.
impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.args.len() + 1))?;
        map.serialize_entry(METADATA_KEY, self.kind.as_str())?;
        for (k, v) in &self.args {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Outcome reported by whatever executes an `Action` on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub should_finish: bool,
    /// Empty when the executor has nothing to report.
    pub message: String,
    pub requires_confirmation: bool,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            should_finish: false,
            message: String::new(),
            requires_confirmation: false,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            should_finish: false,
            message: message.into(),
            requires_confirmation: false,
        }
    }

    pub fn finished(message: impl Into<String>) -> Self {
        Self {
            success: true,
            should_finish: true,
            message: message.into(),
            requires_confirmation: false,
        }
    }

    pub fn needs_confirmation(message: impl Into<String>) -> Self {
        Self {
            success: true,
            should_finish: false,
            message: message.into(),
            requires_confirmation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_lookup() {
        let action = Action::finish("done");
        assert_eq!(action.get(METADATA_KEY), Some(Literal::Str("finish".into())));
        assert_eq!(action.message(), Some("done"));
        assert_eq!(action.action_name(), None);
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut action = Action::new(ActionKind::Do);
        action.insert("action", Literal::Str("Tap".into()));
        action.insert("element", Literal::IntList(vec![1, 2]));
        action.insert("action", Literal::Str("Swipe".into()));

        let keys: Vec<&str> = action.args().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["action", "element"]);
        assert_eq!(action.action_name(), Some("Swipe"));
    }

    #[test]
    fn test_serialize_flat_map() {
        let mut action = Action::new(ActionKind::Do);
        action.insert("action", Literal::Str("Tap".into()));
        action.insert("element", Literal::IntList(vec![500, 300]));

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"_metadata": "do", "action": "Tap", "element": [500, 300]})
        );
    }

    #[test]
    fn test_to_expression() {
        let mut action = Action::new(ActionKind::Do);
        assert_eq!(action.to_expression(), "do()");
        action.insert("action", Literal::Str("Wait".into()));
        action.insert("duration", Literal::Float(1.5));
        assert_eq!(action.to_expression(), r#"do(action="Wait", duration=1.5)"#);
        assert_eq!(Action::finish("ok").to_expression(), r#"finish(message="ok")"#);
    }

    #[test]
    fn test_action_result_constructors() {
        let ok = ActionResult::ok();
        assert!(ok.success && !ok.should_finish && !ok.requires_confirmation);
        assert_eq!(ok.message, "");

        let done = ActionResult::finished("all set");
        assert!(done.success && done.should_finish);
        assert_eq!(done.message, "all set");

        let failed = ActionResult::failed("app not found");
        assert!(!failed.success && !failed.should_finish);
        assert_eq!(failed.message, "app not found");

        let confirm = ActionResult::needs_confirmation("pay 5 yuan?");
        assert!(confirm.requires_confirmation);
        assert_eq!(confirm.message, "pay 5 yuan?");

        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["message"], "");
    }
}
