//! Content of the four popup tabs, built from one snapshot.
//!
//! Rendering is a pure function of (panel kind, snapshot). Nested telemetry is
//! decoded here, so a malformed member fails only its own panel.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::Value;

use crate::icons::{IconPurpose, IconResolver, IconSlot};
use crate::snapshot::{value_text, SessionSnapshot};
use crate::util::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PanelKind {
    Overview,
    Inventory,
    Bank,
    Skills,
}

impl PanelKind {
    pub const ALL: [PanelKind; 4] = [
        PanelKind::Overview,
        PanelKind::Inventory,
        PanelKind::Bank,
        PanelKind::Skills,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PanelKind::Overview => "Overview",
            PanelKind::Inventory => "Inventory",
            PanelKind::Bank => "Bank",
            PanelKind::Skills => "Skills",
        }
    }

    pub fn index(self) -> usize {
        match self {
            PanelKind::Overview => 0,
            PanelKind::Inventory => 1,
            PanelKind::Bank => 2,
            PanelKind::Skills => 3,
        }
    }

    fn error_text(self) -> &'static str {
        match self {
            PanelKind::Overview => "Error showing overview",
            PanelKind::Inventory => "Error showing inventory",
            PanelKind::Bank => "Error showing bank",
            PanelKind::Skills => "Error showing skills",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("malformed {panel} data: {source}")]
    Shape {
        panel: &'static str,
        source: serde_json::Error,
    },
    #[error("total skill level out of range")]
    LevelOverflow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub title: String,
    pub issued: Option<String>,
    pub last: Option<String>,
    /// x, y, z as reported.
    pub location: Option<[String; 3]>,
}

#[derive(Debug, Clone)]
pub struct ItemCell {
    pub item_id: String,
    /// Only set when the stack holds more than one.
    pub quantity: Option<String>,
    pub icon: IconSlot,
}

#[derive(Debug, Clone)]
pub struct SkillCell {
    pub name: String,
    pub level: i64,
    pub icon: IconSlot,
}

#[derive(Debug, Clone)]
pub enum PanelBody {
    /// Not rendered yet.
    Blank,
    Overview(Overview),
    Items { cells: Vec<ItemCell>, scroll: bool },
    Skills { cells: Vec<SkillCell>, total_level: i64 },
    /// Muted placeholder for absent data.
    Empty(&'static str),
    /// Panel-scoped render failure.
    Failed(&'static str),
}

#[derive(Debug, Deserialize)]
struct ItemContainer {
    #[serde(default)]
    items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    item_id: Value,
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    slot: Value,
}

/// Render one panel, substituting an error placeholder if it fails.
pub fn render_guarded(
    kind: PanelKind,
    snapshot: &SessionSnapshot,
    icons: &IconResolver,
) -> PanelBody {
    match render(kind, snapshot, icons) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("{} panel failed: {e}", kind.label());
            PanelBody::Failed(kind.error_text())
        }
    }
}

pub fn render(
    kind: PanelKind,
    snapshot: &SessionSnapshot,
    icons: &IconResolver,
) -> Result<PanelBody, RenderError> {
    match kind {
        PanelKind::Overview => Ok(PanelBody::Overview(overview(snapshot))),
        PanelKind::Inventory => {
            let container = snapshot.data().and_then(|d| d.inventory.as_ref());
            let items = decode_items(container, "inventory")?;
            if items.is_empty() {
                return Ok(PanelBody::Empty("No inventory items"));
            }
            Ok(PanelBody::Items {
                cells: items.iter().map(|it| item_cell(it, icons)).collect(),
                scroll: false,
            })
        }
        PanelKind::Bank => {
            let container = snapshot.data().and_then(|d| d.bank.as_ref());
            let mut items = decode_items(container, "bank")?;
            if items.is_empty() {
                return Ok(PanelBody::Empty("No bank items"));
            }
            // Stable: equal slots keep arrival order.
            items.sort_by(|a, b| slot_of(&a.slot).total_cmp(&slot_of(&b.slot)));
            Ok(PanelBody::Items {
                cells: items.iter().map(|it| item_cell(it, icons)).collect(),
                scroll: true,
            })
        }
        PanelKind::Skills => {
            let levels = decode_skills(snapshot)?;
            if levels.is_empty() {
                return Ok(PanelBody::Empty("No skill data"));
            }
            let mut ranked: Vec<(String, i64)> = levels
                .into_iter()
                .map(|(name, v)| (name, level_of(&v)))
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let total_level = ranked
                .iter()
                .try_fold(0i64, |total, (_, lvl)| total.checked_add(*lvl))
                .ok_or(RenderError::LevelOverflow)?;
            let cells = ranked
                .into_iter()
                .map(|(name, level)| SkillCell {
                    icon: icons.resolve(&name, IconPurpose::Skill),
                    name,
                    level,
                })
                .collect();
            Ok(PanelBody::Skills { cells, total_level })
        }
    }
}

fn overview(snapshot: &SessionSnapshot) -> Overview {
    let title = snapshot
        .api_key()
        .map(str::to_string)
        .or_else(|| snapshot.session_id.as_ref().map(|id| id.to_string()))
        .unwrap_or_else(|| "session".to_string());
    let issued = snapshot
        .issued_at
        .as_ref()
        .filter(|v| !v.is_null())
        .map(value_text);
    let last = snapshot
        .data()
        .map(|_| snapshot.last_activity().map(value_text).unwrap_or_default());
    let location = snapshot
        .data()
        .and_then(|d| d.location.as_ref())
        .filter(|v| !v.is_null())
        .map(|loc| {
            let z = loc.get("posZ").filter(|v| !v.is_null());
            [
                loc.get("posX").map(value_text).unwrap_or_default(),
                loc.get("posY").map(value_text).unwrap_or_default(),
                z.map(value_text).unwrap_or_else(|| "0".to_string()),
            ]
        });
    Overview {
        title,
        issued,
        last,
        location,
    }
}

fn decode_items(container: Option<&Value>, panel: &'static str) -> Result<Vec<RawItem>, RenderError> {
    let Some(container) = container.filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };
    let parsed: ItemContainer = serde_json::from_value(container.clone())
        .map_err(|source| RenderError::Shape { panel, source })?;
    Ok(parsed.items.unwrap_or_default())
}

fn decode_skills(snapshot: &SessionSnapshot) -> Result<BTreeMap<String, Value>, RenderError> {
    fn skills(list: Option<&Value>) -> Option<&Value> {
        list.and_then(|l| l.get("skills")).filter(|v| !v.is_null())
    }
    let found = skills(snapshot.data().and_then(|d| d.skill_list.as_ref()))
        .or_else(|| skills(snapshot.skill_list.as_ref()));
    match found {
        Some(v) => serde_json::from_value(v.clone()).map_err(|source| RenderError::Shape {
            panel: "skills",
            source,
        }),
        None => Ok(BTreeMap::new()),
    }
}

fn item_cell(item: &RawItem, icons: &IconResolver) -> ItemCell {
    let item_id = value_text(&item.item_id);
    let quantity = item
        .amount
        .as_f64()
        .filter(|amount| *amount > 1.0)
        .map(|_| value_text(&item.amount));
    ItemCell {
        icon: icons.resolve(&item_id, IconPurpose::Item),
        item_id,
        quantity,
    }
}

fn slot_of(slot: &Value) -> f64 {
    let n = match slot {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.filter(|n: &f64| n.is_finite()).unwrap_or(0.0)
}

fn level_of(level: &Value) -> i64 {
    match level {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

impl PanelBody {
    /// HTML fragment for this panel. Every interpolated value is escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        match self {
            PanelBody::Blank => {}
            PanelBody::Overview(o) => {
                let _ = write!(out, "<div class=\"session-title\">{}</div>", escape_html(&o.title));
                if let Some(issued) = &o.issued {
                    let _ = write!(out, "<div>Issued: {}</div>", escape_html(issued));
                }
                if let Some(last) = &o.last {
                    let _ = write!(out, "<div>Last: {}</div>", escape_html(last));
                }
                if let Some([x, y, z]) = &o.location {
                    let _ = write!(
                        out,
                        "<div>Location: x={} y={} z={}</div>",
                        escape_html(x),
                        escape_html(y),
                        escape_html(z)
                    );
                }
            }
            PanelBody::Items { cells, scroll } => {
                let class = if *scroll { "items-grid bank-grid" } else { "items-grid" };
                let _ = write!(out, "<div class=\"{class}\">");
                for cell in cells {
                    out.push_str("<div class=\"item-box\"><div class=\"item-icon\">");
                    out.push_str(&icon_html(&cell.icon, &cell.item_id));
                    out.push_str("</div>");
                    if let Some(q) = &cell.quantity {
                        let _ = write!(out, "<div class=\"item-qty\">{}</div>", escape_html(q));
                    }
                    out.push_str("</div>");
                }
                out.push_str("</div>");
            }
            PanelBody::Skills { cells, total_level } => {
                out.push_str("<div class=\"skills-grid\">");
                for cell in cells {
                    let _ = write!(
                        out,
                        "<div class=\"skill-box\"><div class=\"skill-icon\">{}</div>\
                         <div class=\"skill-meta\"><div class=\"skill-name\">{}</div>\
                         <div class=\"skill-level\">{}</div></div></div>",
                        icon_html(&cell.icon, &cell.name),
                        escape_html(&cell.name),
                        cell.level
                    );
                }
                let _ = write!(
                    out,
                    "</div><div class=\"skills-total\">Total level: {total_level}</div>"
                );
            }
            PanelBody::Empty(msg) => {
                let _ = write!(out, "<div class=\"text-muted\">{}</div>", escape_html(msg));
            }
            PanelBody::Failed(msg) => {
                let _ = write!(out, "<div class=\"text-danger\">{}</div>", escape_html(msg));
            }
        }
        out
    }
}

fn icon_html(icon: &IconSlot, alt: &str) -> String {
    match icon.candidates.first() {
        Some(src) if !matches!(icon.state, crate::icons::IconState::Fallback) => format!(
            "<img src=\"{}\" alt=\"{}\">",
            escape_html(src),
            escape_html(alt)
        ),
        _ => escape_html(&icon.badge),
    }
}
