use std::collections::HashMap;
use std::sync::Arc;

use crate::snapshot::{SessionId, SessionSnapshot};

/// A snapshot paired with its resolved (possibly synthesized) id.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub snapshot: Arc<SessionSnapshot>,
}

/// The sessions of the most recent successful fetch, in arrival order.
///
/// Replaced wholesale on every fetch; nothing is merged across fetches.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: Vec<Session>,
    /// Keyed by [`SessionId::key`], so `7` and `"7"` are one session.
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn from_snapshots(snapshots: Vec<SessionSnapshot>) -> Self {
        let mut sessions = Vec::with_capacity(snapshots.len());
        let mut index = HashMap::new();
        for (position, snapshot) in snapshots.into_iter().enumerate() {
            let id = resolve_id(&snapshot, position);
            // Later duplicates win the index; every entry keeps its row.
            index.insert(id.key(), sessions.len());
            sessions.push(Session {
                id,
                snapshot: Arc::new(snapshot),
            });
        }
        Self { sessions, index }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Most recent snapshot for `id`, tolerating number/string mismatches.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        let idx = self.index.get(&id.key())?;
        self.sessions.get(*idx)
    }
}

/// `sessionId`, else `apiKey`, else `sessionName`, else `session-<n>` (1-based position).
pub fn resolve_id(snapshot: &SessionSnapshot, position: usize) -> SessionId {
    if let Some(id) = &snapshot.session_id {
        return id.clone();
    }
    if let Some(key) = snapshot.api_key() {
        return SessionId::Text(key.to_string());
    }
    if let Some(name) = snapshot.session_name.as_deref().filter(|n| !n.is_empty()) {
        return SessionId::Text(name.to_string());
    }
    SessionId::Text(format!("session-{}", position + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(v: serde_json::Value) -> SessionSnapshot {
        SessionSnapshot::from_value(v)
    }

    #[test]
    fn ids_are_synthesized_in_order_of_preference() {
        let reg = Registry::from_snapshots(vec![
            snap(json!({"sessionId": 0, "apiKey": "k0"})),
            snap(json!({"apiKey": "k1"})),
            snap(json!({"sessionName": "named"})),
            snap(json!({})),
        ]);
        let ids: Vec<String> = reg.sessions().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["0", "k1", "named", "session-4"]);
    }

    #[test]
    fn duplicate_ids_keep_rows_and_latest_wins_lookup() {
        let reg = Registry::from_snapshots(vec![
            snap(json!({"sessionId": 1, "apiKey": "old"})),
            snap(json!({"sessionId": 1, "apiKey": "new"})),
        ]);
        assert_eq!(reg.len(), 2);
        let found = reg.get(&SessionId::Number(1)).unwrap();
        assert_eq!(found.snapshot.api_key(), Some("new"));
    }

    #[test]
    fn lookup_tolerates_string_form() {
        let reg = Registry::from_snapshots(vec![snap(json!({"sessionId": 5}))]);
        assert!(reg.get(&SessionId::Text("5".into())).is_some());
        assert!(reg.get(&SessionId::Text("6".into())).is_none());
    }
}
