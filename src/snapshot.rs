use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Identifier of a remote session. The backend sends either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionId {
    Number(i64),
    Text(String),
}

impl SessionId {
    /// Parse user input (IPC, sidebar attribute). Only the canonical decimal
    /// form becomes a number, so `"007"` stays text and can still be found.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => SessionId::Number(n),
            _ => SessionId::Text(raw.to_string()),
        }
    }

    /// Read a `sessionId` member. Integers stay numeric; any other scalar is
    /// kept as its text. Containers and null yield no id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => SessionId::Number(i),
                None => SessionId::Text(n.to_string()),
            }),
            Value::String(s) => Some(SessionId::Text(s.clone())),
            Value::Bool(b) => Some(SessionId::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Lookup key shared by both representations: `7` and `"7"` collide,
    /// `"007"` does not.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Equality that tolerates number/string mismatches.
    pub fn matches(&self, other: &SessionId) -> bool {
        self == other || self.key() == other.key()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::Number(n) => write!(f, "{n}"),
            SessionId::Text(s) => f.write_str(s),
        }
    }
}

/// One element of the backend's session array, as of one fetch.
///
/// Every member is decoded on its own: a member of the wrong type reads as
/// absent and leaves its siblings intact.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    #[serde(deserialize_with = "session_id_member")]
    pub session_id: Option<SessionId>,
    #[serde(deserialize_with = "text_member")]
    pub api_key: Option<String>,
    #[serde(deserialize_with = "text_member")]
    pub session_name: Option<String>,
    pub issued_at: Option<Value>,
    #[serde(deserialize_with = "lenient_member")]
    pub last_request: Option<LastRequest>,
    /// Older clients report skills at the top level instead of under `lastRequest.data`.
    pub skill_list: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LastRequest {
    pub at: Option<Value>,
    pub timestamp: Option<Value>,
    #[serde(deserialize_with = "lenient_member")]
    pub data: Option<RequestData>,
}

/// Nested telemetry. Kept as raw JSON so a malformed member only breaks the panel
/// that renders it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestData {
    pub location: Option<Value>,
    pub inventory: Option<Value>,
    pub bank: Option<Value>,
    pub skill_list: Option<Value>,
}

fn lenient_member<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value)
        .map_err(|e| tracing::debug!("ignoring malformed session member: {e}"))
        .ok())
}

fn text_member<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn session_id_member<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SessionId>, D::Error> {
    Ok(SessionId::from_json(&Value::deserialize(deserializer)?))
}

/// A game-world tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
    pub plane: f64,
}

impl SessionSnapshot {
    /// Decode one array element; anything that isn't a snapshot object becomes an
    /// empty snapshot so the sidebar still shows a row for it.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            tracing::warn!("session entry is not an object");
            return SessionSnapshot::default();
        }
        match serde_json::from_value(value) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("undecodable session entry: {e}");
                SessionSnapshot::default()
            }
        }
    }

    pub fn data(&self) -> Option<&RequestData> {
        self.last_request.as_ref().and_then(|r| r.data.as_ref())
    }

    /// Non-empty `apiKey`, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// `lastRequest.at`, falling back to `lastRequest.timestamp`.
    pub fn last_activity(&self) -> Option<&Value> {
        let req = self.last_request.as_ref()?;
        req.at
            .as_ref()
            .filter(|v| !v.is_null())
            .or(req.timestamp.as_ref().filter(|v| !v.is_null()))
    }

    /// The reported location when `posX`/`posY` are JSON numbers; `posZ` defaults to 0.
    pub fn location(&self) -> Option<WorldPoint> {
        let loc = self.data()?.location.as_ref()?;
        let x = loc.get("posX").filter(|v| v.is_number())?.as_f64()?;
        let y = loc.get("posY").filter(|v| v.is_number())?.as_f64()?;
        let plane = loc.get("posZ").and_then(Value::as_f64).unwrap_or(0.0);
        Some(WorldPoint { x, y, plane })
    }
}

/// Render a scalar JSON value the way it would read in a label (strings unquoted).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_decode() {
        let a = SessionSnapshot::from_value(json!({"sessionId": 42}));
        let b = SessionSnapshot::from_value(json!({"sessionId": "abc"}));
        assert_eq!(a.session_id, Some(SessionId::Number(42)));
        assert_eq!(b.session_id, Some(SessionId::Text("abc".into())));
    }

    #[test]
    fn id_number_and_text_forms_match() {
        let n = SessionId::Number(7);
        let s = SessionId::Text("7".into());
        assert!(n.matches(&s));
        assert!(s.matches(&n));
        assert!(!SessionId::Text("x7".into()).matches(&n));
    }

    #[test]
    fn parse_keeps_non_canonical_text() {
        assert_eq!(SessionId::parse("12"), SessionId::Number(12));
        assert_eq!(SessionId::parse("abc"), SessionId::Text("abc".into()));
        assert_eq!(SessionId::parse("007"), SessionId::Text("007".into()));
        assert_eq!(SessionId::parse("+5"), SessionId::Text("+5".into()));
        assert!(!SessionId::parse("007").matches(&SessionId::Number(7)));
        assert!(SessionId::parse("007").matches(&SessionId::Text("007".into())));
    }

    #[test]
    fn wrongly_typed_members_leave_siblings_intact() {
        let s = SessionSnapshot::from_value(json!({
            "sessionId": 2,
            "sessionName": 42,
            "apiKey": "k2",
            "lastRequest": {"data": {"location": {"posX": 3200, "posY": 3201}}}
        }));
        assert_eq!(s.session_id, Some(SessionId::Number(2)));
        assert_eq!(s.session_name.as_deref(), Some("42"));
        assert_eq!(s.api_key(), Some("k2"));
        assert!(s.location().is_some());

        let odd = SessionSnapshot::from_value(json!({
            "sessionId": 1.5,
            "apiKey": {"nested": true},
            "issuedAt": "yesterday",
            "lastRequest": {"at": "now", "data": "not an object"}
        }));
        assert_eq!(odd.session_id, Some(SessionId::Text("1.5".into())));
        assert_eq!(odd.api_key(), None);
        assert!(odd.issued_at.is_some());
        assert!(odd.data().is_none());
        assert_eq!(odd.last_activity().map(value_text).as_deref(), Some("now"));

        let no_request = SessionSnapshot::from_value(json!({"sessionId": true, "lastRequest": 3}));
        assert_eq!(no_request.session_id, Some(SessionId::Text("true".into())));
        assert!(no_request.last_request.is_none());
    }

    #[test]
    fn location_requires_numbers() {
        let ok = SessionSnapshot::from_value(json!({
            "lastRequest": {"data": {"location": {"posX": 3200, "posY": 3201}}}
        }));
        assert_eq!(
            ok.location(),
            Some(WorldPoint { x: 3200.0, y: 3201.0, plane: 0.0 })
        );

        let stringly = SessionSnapshot::from_value(json!({
            "lastRequest": {"data": {"location": {"posX": "3200", "posY": 3201}}}
        }));
        assert_eq!(stringly.location(), None);

        let missing = SessionSnapshot::from_value(json!({"lastRequest": {"data": {}}}));
        assert_eq!(missing.location(), None);
    }

    #[test]
    fn non_object_entry_becomes_empty_snapshot() {
        let s = SessionSnapshot::from_value(json!("garbage"));
        assert!(s.session_id.is_none());
        assert!(s.last_request.is_none());
    }

    #[test]
    fn last_activity_falls_back_to_timestamp() {
        let s = SessionSnapshot::from_value(json!({
            "lastRequest": {"timestamp": "2024-01-01T00:00:00Z", "data": {}}
        }));
        assert_eq!(
            s.last_activity().map(value_text).as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let s = SessionSnapshot::from_value(json!({"apiKey": ""}));
        assert_eq!(s.api_key(), None);
    }
}
