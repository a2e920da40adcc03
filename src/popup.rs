//! Per-marker popup content: four rendered panels, tab bindings, and the icon
//! jobs that fill them in.

use std::collections::BTreeMap;

use crate::icons::{resolve_chain, IconOutcome, IconResolver, IconSlot, IconSource};
use crate::panels::{render_guarded, PanelBody, PanelKind};
use crate::snapshot::{SessionId, SessionSnapshot};

/// Where an icon lives inside a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconKey {
    pub panel: PanelKind,
    pub cell: usize,
}

/// One pending icon chain, runnable off the UI thread.
#[derive(Debug, Clone)]
pub struct IconJob {
    pub session_id: SessionId,
    pub generation: u64,
    pub key: IconKey,
    pub candidates: Vec<String>,
    pub badge: String,
}

impl IconJob {
    pub fn run(self, source: &dyn IconSource) -> IconUpdate {
        let outcome = resolve_chain(&self.candidates, &self.badge, source);
        IconUpdate {
            session_id: self.session_id,
            generation: self.generation,
            key: self.key,
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IconUpdate {
    pub session_id: SessionId,
    pub generation: u64,
    pub key: IconKey,
    pub outcome: IconOutcome,
}

/// What a tab press selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabBinding {
    pub session_id: SessionId,
    pub panel: PanelKind,
}

#[derive(Debug)]
pub struct PopupShell {
    session_id: SessionId,
    panels: [PanelBody; 4],
    visible: PanelKind,
    tabs: BTreeMap<PanelKind, TabBinding>,
    generation: u64,
}

impl PopupShell {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            panels: [
                PanelBody::Blank,
                PanelBody::Blank,
                PanelBody::Blank,
                PanelBody::Blank,
            ],
            visible: PanelKind::Overview,
            tabs: BTreeMap::new(),
            generation: 0,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn visible(&self) -> PanelKind {
        self.visible
    }

    pub fn panel(&self, kind: PanelKind) -> &PanelBody {
        &self.panels[kind.index()]
    }

    pub fn tabs(&self) -> impl Iterator<Item = &TabBinding> {
        self.tabs.values()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-render every panel from `snapshot` and show the overview.
    ///
    /// Returns the icon chains to run; results from earlier populates are
    /// rejected by [`apply_icon`](Self::apply_icon).
    pub fn populate(&mut self, snapshot: &SessionSnapshot, icons: &IconResolver) -> Vec<IconJob> {
        self.generation += 1;
        for kind in PanelKind::ALL {
            self.panels[kind.index()] = render_guarded(kind, snapshot, icons);
            self.tabs.insert(
                kind,
                TabBinding {
                    session_id: self.session_id.clone(),
                    panel: kind,
                },
            );
        }
        self.visible = PanelKind::Overview;
        self.pending_jobs()
    }

    pub fn select_tab(&mut self, kind: PanelKind) {
        if self.tabs.contains_key(&kind) {
            self.visible = kind;
        }
    }

    /// Store a resolved icon. Returns false for stale or misaddressed updates.
    pub fn apply_icon(&mut self, update: IconUpdate) -> bool {
        if update.generation != self.generation || !update.session_id.matches(&self.session_id) {
            return false;
        }
        match slot_mut(&mut self.panels[update.key.panel.index()], update.key.cell) {
            Some(slot) => {
                slot.apply(update.outcome);
                true
            }
            None => false,
        }
    }

    fn pending_jobs(&self) -> Vec<IconJob> {
        let mut jobs = Vec::new();
        for kind in PanelKind::ALL {
            for (cell, slot) in slots(&self.panels[kind.index()]).enumerate() {
                if slot.is_settled() {
                    continue;
                }
                jobs.push(IconJob {
                    session_id: self.session_id.clone(),
                    generation: self.generation,
                    key: IconKey { panel: kind, cell },
                    candidates: slot.candidates.clone(),
                    badge: slot.badge.clone(),
                });
            }
        }
        jobs
    }
}

fn slots(body: &PanelBody) -> Box<dyn Iterator<Item = &IconSlot> + '_> {
    match body {
        PanelBody::Items { cells, .. } => Box::new(cells.iter().map(|c| &c.icon)),
        PanelBody::Skills { cells, .. } => Box::new(cells.iter().map(|c| &c.icon)),
        _ => Box::new(std::iter::empty()),
    }
}

fn slot_mut(body: &mut PanelBody, cell: usize) -> Option<&mut IconSlot> {
    match body {
        PanelBody::Items { cells, .. } => cells.get_mut(cell).map(|c| &mut c.icon),
        PanelBody::Skills { cells, .. } => cells.get_mut(cell).map(|c| &mut c.icon),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IconConfig;
    use crate::icons::{IconImage, IconState};
    use serde_json::json;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot::from_value(json!({
            "sessionId": 3,
            "apiKey": "k",
            "lastRequest": {"data": {
                "inventory": {"items": [{"itemId": 995, "amount": 5}]},
                "skillList": {"skills": {"Attack": 10, "Weird Skill": 2}}
            }}
        }))
    }

    fn icons() -> IconResolver {
        IconResolver::new(&IconConfig::default())
    }

    #[test]
    fn fresh_shell_is_blank() {
        let shell = PopupShell::new(SessionId::Number(3));
        assert!(matches!(shell.panel(PanelKind::Bank), PanelBody::Blank));
        assert_eq!(shell.tabs().count(), 0);
    }

    #[test]
    fn populate_renders_and_resets_to_overview() {
        let mut shell = PopupShell::new(SessionId::Number(3));
        shell.populate(&snapshot(), &icons());
        shell.select_tab(PanelKind::Skills);
        assert_eq!(shell.visible(), PanelKind::Skills);
        shell.populate(&snapshot(), &icons());
        assert_eq!(shell.visible(), PanelKind::Overview);
        assert!(matches!(shell.panel(PanelKind::Bank), PanelBody::Empty(_)));
    }

    #[test]
    fn repeated_populate_keeps_one_binding_per_tab() {
        let mut shell = PopupShell::new(SessionId::Number(3));
        for _ in 0..5 {
            shell.populate(&snapshot(), &icons());
        }
        let panels: Vec<PanelKind> = shell.tabs().map(|t| t.panel).collect();
        assert_eq!(panels, PanelKind::ALL.to_vec());
    }

    #[test]
    fn select_tab_before_populate_is_ignored() {
        let mut shell = PopupShell::new(SessionId::Number(3));
        shell.select_tab(PanelKind::Bank);
        assert_eq!(shell.visible(), PanelKind::Overview);
    }

    #[test]
    fn jobs_skip_badge_only_icons() {
        let mut shell = PopupShell::new(SessionId::Number(3));
        let jobs = shell.populate(&snapshot(), &icons());
        // item 995 and Attack; "Weird Skill" has no source.
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.generation == shell.generation()));
    }

    #[test]
    fn stale_icon_results_are_dropped() {
        let mut shell = PopupShell::new(SessionId::Number(3));
        let old = shell.populate(&snapshot(), &icons());
        let fresh = shell.populate(&snapshot(), &icons());
        let loaded = IconOutcome::Loaded(IconImage {
            width: 1,
            height: 1,
            rgba: vec![0; 4],
        });
        let stale = IconUpdate {
            session_id: old[0].session_id.clone(),
            generation: old[0].generation,
            key: old[0].key,
            outcome: loaded.clone(),
        };
        assert!(!shell.apply_icon(stale));

        let current = IconUpdate {
            session_id: SessionId::Text("3".into()),
            generation: fresh[0].generation,
            key: fresh[0].key,
            outcome: loaded,
        };
        assert!(shell.apply_icon(current));
        let PanelBody::Items { cells, .. } = shell.panel(PanelKind::Inventory) else {
            panic!("expected items");
        };
        assert!(matches!(cells[0].icon.state, IconState::Loaded(_)));
    }
}
