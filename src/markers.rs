use std::collections::HashMap;
use std::sync::Arc;

use crate::popup::PopupShell;
use crate::registry::Session;
use crate::sidebar::Sidebar;
use crate::snapshot::{SessionId, SessionSnapshot, WorldPoint};
use crate::sync::{Effect, FocusProvider};

/// A session plotted on the map.
#[derive(Debug)]
pub struct Marker {
    pub session_id: SessionId,
    pub world: WorldPoint,
    pub snapshot: Arc<SessionSnapshot>,
    pub popup: PopupShell,
}

/// All markers currently on the map, back to front.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
    index: HashMap<String, usize>,
}

impl MarkerLayer {
    /// Drop every marker and plot one per located session, in order.
    /// Returns how many markers exist afterwards.
    pub fn rebuild(&mut self, sessions: &[Session]) -> usize {
        self.clear();
        for session in sessions {
            let Some(world) = session.snapshot.location() else {
                tracing::debug!("session {} has no usable location", session.id);
                continue;
            };
            let marker = Marker {
                session_id: session.id.clone(),
                world,
                snapshot: Arc::clone(&session.snapshot),
                popup: PopupShell::new(session.id.clone()),
            };
            // A repeated id (`1` and `"1"` included) replaces the earlier
            // marker and moves it to the front.
            let key = session.id.key();
            if let Some(old) = self.index.remove(&key) {
                self.markers.remove(old);
                self.reindex();
            }
            self.index.insert(key, self.markers.len());
            self.markers.push(marker);
        }
        tracing::debug!("plotted {} marker(s)", self.markers.len());
        self.markers.len()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.index.clear();
    }

    fn reindex(&mut self) {
        self.index = self
            .markers
            .iter()
            .enumerate()
            .map(|(i, m)| (m.session_id.key(), i))
            .collect();
    }

    fn position(&self, id: &SessionId) -> Option<usize> {
        self.index.get(&id.key()).copied()
    }

    pub fn find(&self, id: &SessionId) -> Option<&Marker> {
        self.position(id).and_then(|i| self.markers.get(i))
    }

    pub fn find_mut(&mut self, id: &SessionId) -> Option<&mut Marker> {
        self.position(id).and_then(|i| self.markers.get_mut(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// A marker was pressed.
    ///
    /// The sidebar is always revealed. Focus then goes to the first of: the
    /// focus provider, the matching sidebar row, or the marker's own popup.
    pub fn click(
        &self,
        id: &SessionId,
        sidebar: &mut Sidebar,
        focus: Option<&mut dyn FocusProvider>,
    ) -> Vec<Effect> {
        let mut effects = vec![Effect::ShowSidebar];
        let Some(marker) = self.find(id) else {
            return effects;
        };
        let id = marker.session_id.clone();
        if let Some(provider) = focus {
            effects.extend(provider.focus(&id, Some(self), sidebar));
        } else if sidebar.has_row(&id) {
            effects.push(Effect::ActivateRow(id));
        } else {
            effects.push(Effect::OpenPopup(id));
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::sync::SelectionSync;
    use serde_json::json;

    fn registry(values: Vec<serde_json::Value>) -> Registry {
        Registry::from_snapshots(values.into_iter().map(SessionSnapshot::from_value).collect())
    }

    fn located(id: serde_json::Value, x: i64) -> serde_json::Value {
        json!({"sessionId": id, "lastRequest": {"data": {"location": {"posX": x, "posY": 3200, "posZ": 1}}}})
    }

    #[test]
    fn one_marker_per_located_session() {
        let reg = registry(vec![
            located(json!(1), 3100),
            json!({"sessionId": 2}),
            located(json!("three"), 3300),
            json!({"sessionId": 4, "lastRequest": {"data": {"location": {"posX": "bad", "posY": 1}}}}),
        ]);
        let mut layer = MarkerLayer::default();
        assert_eq!(layer.rebuild(reg.sessions()), 2);
        assert!(layer.find(&SessionId::Number(1)).is_some());
        assert!(layer.find(&SessionId::Text("1".into())).is_some());
        assert!(layer.find(&SessionId::Number(2)).is_none());
        assert_eq!(layer.find(&SessionId::Text("three".into())).unwrap().world.plane, 1.0);
    }

    #[test]
    fn rebuild_with_empty_list_clears_map_and_sidebar() {
        let mut layer = MarkerLayer::default();
        let mut sidebar = Sidebar::default();
        let reg = registry(vec![located(json!(1), 3100), located(json!(2), 3101)]);
        layer.rebuild(reg.sessions());
        sidebar.render(&reg);
        assert_eq!(layer.len(), 2);

        let empty = registry(vec![]);
        assert_eq!(layer.rebuild(empty.sessions()), 0);
        sidebar.render(&empty);
        assert!(layer.is_empty());
        assert!(sidebar.rows().is_empty());
    }

    #[test]
    fn duplicate_ids_leave_one_marker_in_front() {
        let reg = registry(vec![
            located(json!(1), 3100),
            located(json!(2), 3150),
            located(json!(1), 3200),
        ]);
        let mut layer = MarkerLayer::default();
        assert_eq!(layer.rebuild(reg.sessions()), 2);
        let order: Vec<String> = layer.iter().map(|m| m.session_id.to_string()).collect();
        assert_eq!(order, vec!["2", "1"]);
        assert_eq!(layer.find(&SessionId::Number(1)).unwrap().world.x, 3200.0);
        assert_eq!(layer.find(&SessionId::Number(2)).unwrap().world.x, 3150.0);
    }

    #[test]
    fn number_and_string_forms_of_one_id_share_a_marker() {
        let reg = registry(vec![located(json!(1), 3100), located(json!("1"), 3200)]);
        let mut layer = MarkerLayer::default();
        assert_eq!(layer.rebuild(reg.sessions()), 1);
        assert_eq!(layer.find(&SessionId::Number(1)).unwrap().world.x, 3200.0);
    }

    #[test]
    fn padded_text_id_is_reachable_from_control_input() {
        let reg = registry(vec![located(json!("007"), 3100), located(json!(7), 3200)]);
        let mut layer = MarkerLayer::default();
        assert_eq!(layer.rebuild(reg.sessions()), 2);
        assert_eq!(layer.find(&SessionId::parse("007")).unwrap().world.x, 3100.0);
        assert_eq!(layer.find(&SessionId::parse("7")).unwrap().world.x, 3200.0);
    }

    #[test]
    fn located_session_with_odd_sibling_members_still_gets_a_marker() {
        let reg = registry(vec![json!({
            "sessionId": 2,
            "sessionName": 42,
            "apiKey": "k2",
            "lastRequest": {"data": {"location": {"posX": 3200, "posY": 3201}}}
        })]);
        let mut layer = MarkerLayer::default();
        assert_eq!(layer.rebuild(reg.sessions()), 1);
        let marker = layer.find(&SessionId::Number(2)).unwrap();
        assert_eq!(marker.snapshot.api_key(), Some("k2"));
    }

    #[test]
    fn click_delegates_to_focus_provider() {
        let reg = registry(vec![located(json!(1), 3100)]);
        let mut layer = MarkerLayer::default();
        layer.rebuild(reg.sessions());
        let mut sidebar = Sidebar::default();
        sidebar.render(&reg);
        let mut sync = SelectionSync::default();
        let provider: &mut dyn FocusProvider = &mut sync;
        let effects = layer.click(&SessionId::Number(1), &mut sidebar, Some(provider));
        assert_eq!(effects[0], Effect::ShowSidebar);
        assert!(effects.contains(&Effect::OpenPopup(SessionId::Number(1))));
        assert_eq!(sync.focused(), Some(&SessionId::Number(1)));
    }

    #[test]
    fn click_without_provider_prefers_row_then_popup() {
        let reg = registry(vec![located(json!(1), 3100)]);
        let mut layer = MarkerLayer::default();
        layer.rebuild(reg.sessions());

        let mut sidebar = Sidebar::default();
        sidebar.render(&reg);
        assert_eq!(
            layer.click(&SessionId::Number(1), &mut sidebar, None),
            vec![Effect::ShowSidebar, Effect::ActivateRow(SessionId::Number(1))]
        );

        let mut bare = Sidebar::default();
        assert_eq!(
            layer.click(&SessionId::Number(1), &mut bare, None),
            vec![Effect::ShowSidebar, Effect::OpenPopup(SessionId::Number(1))]
        );
    }
}
