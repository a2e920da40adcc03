use crate::registry::Registry;
use crate::snapshot::SessionId;
use crate::util::format_timestamp;

#[derive(Debug, Clone, PartialEq)]
pub struct SidebarRow {
    pub id: SessionId,
    pub label: String,
    pub meta: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SidebarStatus {
    /// Nothing fetched yet.
    Idle,
    Rows,
    Empty,
    Error(String),
}

/// The session list beside the map.
#[derive(Debug)]
pub struct Sidebar {
    rows: Vec<SidebarRow>,
    active: Option<SessionId>,
    visible: bool,
    status: SidebarStatus,
    pub loading: bool,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            active: None,
            visible: false,
            status: SidebarStatus::Idle,
            loading: false,
        }
    }
}

impl Sidebar {
    /// Replace all rows with one per registry entry, in fetch order.
    pub fn render(&mut self, registry: &Registry) {
        self.rows = registry
            .sessions()
            .iter()
            .map(|s| {
                let label = s.snapshot.api_key().unwrap_or("(unknown)").to_string();
                let mut meta = s.id.to_string();
                if let Some(issued) = s.snapshot.issued_at.as_ref().filter(|v| !v.is_null()) {
                    meta.push_str(" • issued ");
                    meta.push_str(&format_timestamp(issued));
                }
                SidebarRow {
                    id: s.id.clone(),
                    label,
                    meta,
                }
            })
            .collect();
        self.status = if self.rows.is_empty() {
            SidebarStatus::Empty
        } else {
            SidebarStatus::Rows
        };
        if let Some(active) = self.active.take() {
            // Keep the highlight if the session survived the refresh.
            self.active = self.row(&active).map(|r| r.id.clone());
        }
    }

    pub fn render_error(&mut self, message: &str) {
        self.rows.clear();
        self.active = None;
        self.status = SidebarStatus::Error(format!("Error loading sessions: {message}"));
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.active = None;
        self.status = SidebarStatus::Idle;
    }

    /// Highlight the row for `id` and drop any previous highlight.
    /// Returns false when no such row exists.
    pub fn select(&mut self, id: &SessionId) -> bool {
        self.active = self.row(id).map(|r| r.id.clone());
        self.active.is_some()
    }

    pub fn has_row(&self, id: &SessionId) -> bool {
        self.row(id).is_some()
    }

    fn row(&self, id: &SessionId) -> Option<&SidebarRow> {
        self.rows
            .iter()
            .find(|r| r.id == *id)
            .or_else(|| self.rows.iter().find(|r| r.id.matches(id)))
    }

    pub fn is_active(&self, row: &SidebarRow) -> bool {
        self.active.as_ref() == Some(&row.id)
    }

    pub fn rows(&self) -> &[SidebarRow] {
        &self.rows
    }

    pub fn status(&self) -> &SidebarStatus {
        &self.status
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Index range of at most `max_rows` rows that keeps the active row in view,
    /// centred where possible.
    pub fn visible_window(&self, max_rows: usize) -> std::ops::Range<usize> {
        let len = self.rows.len();
        if len <= max_rows {
            return 0..len;
        }
        let active = self
            .active
            .as_ref()
            .and_then(|id| self.rows.iter().position(|r| r.id == *id));
        let start = match active {
            Some(idx) => idx
                .saturating_sub(max_rows / 2)
                .min(len - max_rows),
            None => 0,
        };
        start..start + max_rows
    }
}
