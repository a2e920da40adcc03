//! Keeps the map and the sidebar pointing at the same session.
//!
//! Components never call into each other's state. They return [`Effect`]s and
//! the app executes them in order.

use std::time::Duration;

use crate::markers::MarkerLayer;
use crate::sidebar::Sidebar;
use crate::snapshot::{SessionId, WorldPoint};

/// Time for the map to finish panning before the popup is filled in again.
pub const SETTLE_DELAY: Duration = Duration::from_millis(60);

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowSidebar,
    PanTo(WorldPoint),
    OpenPopup(SessionId),
    /// Close the popup unless it belongs to this session.
    ClosePopupExcept(SessionId),
    RepopulateAfter(SessionId, Duration),
    /// Behave as if the sidebar row had been pressed.
    ActivateRow(SessionId),
    Fetch,
}

/// Something that can bring a session into focus.
pub trait FocusProvider {
    fn focus(
        &mut self,
        id: &SessionId,
        markers: Option<&MarkerLayer>,
        sidebar: &mut Sidebar,
    ) -> Vec<Effect>;
}

#[derive(Debug, Default)]
pub struct SelectionSync {
    focused: Option<SessionId>,
}

impl SelectionSync {
    pub fn focused(&self) -> Option<&SessionId> {
        self.focused.as_ref()
    }

    pub fn clear(&mut self) {
        self.focused = None;
    }

    /// A sidebar row was pressed.
    pub fn on_row_selected(
        &mut self,
        id: &SessionId,
        markers: Option<&MarkerLayer>,
        sidebar: &mut Sidebar,
    ) -> Vec<Effect> {
        sidebar.select(id);
        self.focus(id, markers, sidebar)
    }
}

impl FocusProvider for SelectionSync {
    fn focus(
        &mut self,
        id: &SessionId,
        markers: Option<&MarkerLayer>,
        sidebar: &mut Sidebar,
    ) -> Vec<Effect> {
        sidebar.select(id);
        match markers.and_then(|m| m.find(id)) {
            Some(marker) => {
                let id = marker.session_id.clone();
                self.focused = Some(id.clone());
                vec![
                    Effect::PanTo(marker.world),
                    Effect::OpenPopup(id.clone()),
                    Effect::RepopulateAfter(id, SETTLE_DELAY),
                ]
            }
            None => {
                tracing::debug!("no marker for session {id}; refreshing");
                self.focused = None;
                vec![Effect::ClosePopupExcept(id.clone()), Effect::Fetch]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::snapshot::SessionSnapshot;
    use serde_json::json;

    fn located(id: i64, x: i64) -> serde_json::Value {
        json!({"sessionId": id, "lastRequest": {"data": {"location": {"posX": x, "posY": 3200}}}})
    }

    fn setup(values: Vec<serde_json::Value>) -> (MarkerLayer, Sidebar) {
        let reg = Registry::from_snapshots(
            values.into_iter().map(SessionSnapshot::from_value).collect(),
        );
        let mut markers = MarkerLayer::default();
        markers.rebuild(reg.sessions());
        let mut sidebar = Sidebar::default();
        sidebar.render(&reg);
        (markers, sidebar)
    }

    #[test]
    fn focus_found_pans_opens_and_repopulates() {
        let (markers, mut sidebar) = setup(vec![located(1, 3100)]);
        let mut sync = SelectionSync::default();
        let effects = sync.focus(&SessionId::Text("1".into()), Some(&markers), &mut sidebar);
        assert_eq!(
            effects,
            vec![
                Effect::PanTo(WorldPoint {
                    x: 3100.0,
                    y: 3200.0,
                    plane: 0.0
                }),
                Effect::OpenPopup(SessionId::Number(1)),
                Effect::RepopulateAfter(SessionId::Number(1), SETTLE_DELAY),
            ]
        );
        assert_eq!(sync.focused(), Some(&SessionId::Number(1)));
        assert!(sidebar.rows().iter().any(|r| sidebar.is_active(r)));
    }

    #[test]
    fn row_select_without_marker_fetches_exactly_once() {
        // Session 2 has no location, so it has a row but no marker.
        let (markers, mut sidebar) = setup(vec![located(1, 3100), json!({"sessionId": 2})]);
        let mut sync = SelectionSync::default();
        let effects = sync.on_row_selected(&SessionId::Number(2), Some(&markers), &mut sidebar);
        let fetches = effects.iter().filter(|e| **e == Effect::Fetch).count();
        assert_eq!(fetches, 1);
        assert!(!effects.iter().any(|e| matches!(e, Effect::OpenPopup(_))));
        assert!(sidebar.is_active(&sidebar.rows()[1]));
        assert_eq!(sync.focused(), None);
    }

    #[test]
    fn focus_before_markers_mount_fetches() {
        let (_, mut sidebar) = setup(vec![located(1, 3100)]);
        let mut sync = SelectionSync::default();
        let effects = sync.focus(&SessionId::Number(1), None, &mut sidebar);
        assert_eq!(
            effects,
            vec![Effect::ClosePopupExcept(SessionId::Number(1)), Effect::Fetch]
        );
    }
}
