//! Icon lookup with an ordered list of candidate sources and a text badge as the
//! last resort.

use std::time::Duration;

use iced::widget::image::Handle;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client;

use crate::config::IconConfig;

/// Same unreserved set as JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const ICON_TIMEOUT: Duration = Duration::from_secs(8);

/// Skills with a known wiki icon (`<Name>_icon.png`).
const SKILL_ICONS: [&str; 24] = [
    "Attack",
    "Strength",
    "Defence",
    "Ranged",
    "Prayer",
    "Magic",
    "Runecraft",
    "Construction",
    "Hitpoints",
    "Agility",
    "Herblore",
    "Thieving",
    "Crafting",
    "Fletching",
    "Slayer",
    "Hunter",
    "Mining",
    "Smithing",
    "Fishing",
    "Cooking",
    "Firemaking",
    "Woodcutting",
    "Farming",
    "Sailing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconPurpose {
    Item,
    Skill,
}

#[derive(Debug, thiserror::Error)]
pub enum IconError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("undecodable image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoded RGBA pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum IconState {
    Pending,
    Loaded(Handle),
    Fallback,
}

/// One icon in a rendered panel: where to look, and what to show meanwhile.
#[derive(Debug, Clone)]
pub struct IconSlot {
    pub candidates: Vec<String>,
    pub badge: String,
    pub state: IconState,
}

impl IconSlot {
    pub fn is_settled(&self) -> bool {
        !matches!(self.state, IconState::Pending)
    }

    pub fn apply(&mut self, outcome: IconOutcome) {
        self.state = match outcome {
            IconOutcome::Loaded(img) => {
                IconState::Loaded(Handle::from_rgba(img.width, img.height, img.rgba))
            }
            IconOutcome::Fallback(_) => IconState::Fallback,
        };
    }
}

/// Result of walking a candidate list.
#[derive(Debug, Clone)]
pub enum IconOutcome {
    Loaded(IconImage),
    Fallback(String),
}

/// Something that can fetch and decode an icon URL.
pub trait IconSource {
    fn load(&self, url: &str) -> Result<IconImage, IconError>;
}

pub struct HttpIconSource {
    client: Client,
}

impl HttpIconSource {
    pub fn new() -> Result<Self, IconError> {
        let client = Client::builder().timeout(ICON_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl IconSource for HttpIconSource {
    fn load(&self, url: &str) -> Result<IconImage, IconError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(IconError::Status(status.as_u16()));
        }
        let bytes = response.bytes()?;
        let decoded = image::load_from_memory(&bytes)?.to_rgba8();
        Ok(IconImage {
            width: decoded.width(),
            height: decoded.height(),
            rgba: decoded.into_raw(),
        })
    }
}

/// Try each candidate once, in order. The first decodable image wins; exhaustion
/// yields the badge.
pub fn resolve_chain(candidates: &[String], badge: &str, source: &dyn IconSource) -> IconOutcome {
    for url in candidates {
        match source.load(url) {
            Ok(img) => return IconOutcome::Loaded(img),
            Err(e) => tracing::warn!("icon load failed for {url}: {e}"),
        }
    }
    if !candidates.is_empty() {
        tracing::warn!("icon not found for {badge}");
    }
    IconOutcome::Fallback(badge.to_string())
}

/// Builds candidate lists from the configured templates.
#[derive(Debug, Clone)]
pub struct IconResolver {
    item_sources: Vec<String>,
    skill_base: String,
}

impl IconResolver {
    pub fn new(config: &IconConfig) -> Self {
        Self {
            item_sources: config.item_sources.clone(),
            skill_base: config.skill_base.clone(),
        }
    }

    pub fn resolve(&self, id: &str, purpose: IconPurpose) -> IconSlot {
        let (candidates, badge) = match purpose {
            IconPurpose::Item => {
                let encoded = utf8_percent_encode(id, COMPONENT).to_string();
                let candidates = self
                    .item_sources
                    .iter()
                    .map(|t| t.replace("{id}", &encoded))
                    .collect();
                (candidates, id.to_string())
            }
            IconPurpose::Skill => {
                let candidates = if SKILL_ICONS.contains(&id) {
                    let file = format!("{id}_icon.png");
                    vec![format!(
                        "{}{}",
                        self.skill_base,
                        utf8_percent_encode(&file, COMPONENT)
                    )]
                } else {
                    Vec::new()
                };
                (candidates, initials(id))
            }
        };
        let state = if candidates.is_empty() {
            IconState::Fallback
        } else {
            IconState::Pending
        };
        IconSlot {
            candidates,
            badge,
            state,
        }
    }
}

/// Up to two uppercase initials: "Attack" -> "A", "Dungeon Keeping" -> "DK".
pub fn initials(name: &str) -> String {
    let out: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if out.is_empty() {
        "?".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeSource {
        ok_url: Option<String>,
        attempts: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn failing() -> Self {
            Self {
                ok_url: None,
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl IconSource for FakeSource {
        fn load(&self, url: &str) -> Result<IconImage, IconError> {
            self.attempts.borrow_mut().push(url.to_string());
            if self.ok_url.as_deref() == Some(url) {
                Ok(IconImage {
                    width: 1,
                    height: 1,
                    rgba: vec![0, 0, 0, 255],
                })
            } else {
                Err(IconError::Status(404))
            }
        }
    }

    fn resolver() -> IconResolver {
        IconResolver::new(&IconConfig::default())
    }

    #[test]
    fn item_candidates_follow_templates() {
        let slot = resolver().resolve("995", IconPurpose::Item);
        assert_eq!(slot.candidates.len(), 3);
        assert!(slot.candidates[0].ends_with("/items-icons/995.png"));
        assert!(slot.candidates[0].contains("osrsreboxed"));
        assert_eq!(slot.badge, "995");
        assert!(!slot.is_settled());
    }

    #[test]
    fn item_id_is_percent_encoded() {
        let slot = resolver().resolve("a b/c", IconPurpose::Item);
        assert!(slot.candidates[0].ends_with("/a%20b%2Fc.png"));
    }

    #[test]
    fn three_failures_fall_back_without_more_attempts() {
        let slot = resolver().resolve("4151", IconPurpose::Item);
        let source = FakeSource::failing();
        let outcome = resolve_chain(&slot.candidates, &slot.badge, &source);
        assert!(matches!(outcome, IconOutcome::Fallback(ref b) if b == "4151"));
        assert_eq!(*source.attempts.borrow(), slot.candidates);
    }

    #[test]
    fn first_success_stops_the_chain() {
        let slot = resolver().resolve("4151", IconPurpose::Item);
        let source = FakeSource {
            ok_url: Some(slot.candidates[1].clone()),
            attempts: RefCell::new(Vec::new()),
        };
        let outcome = resolve_chain(&slot.candidates, &slot.badge, &source);
        assert!(matches!(outcome, IconOutcome::Loaded(_)));
        assert_eq!(source.attempts.borrow().len(), 2);
    }

    #[test]
    fn known_skill_gets_wiki_icon() {
        let slot = resolver().resolve("Mining", IconPurpose::Skill);
        assert_eq!(
            slot.candidates,
            vec!["https://oldschool.runescape.wiki/images/Mining_icon.png".to_string()]
        );
        assert_eq!(slot.badge, "M");
    }

    #[test]
    fn unknown_skill_is_badge_only() {
        let slot = resolver().resolve("dungeon keeping", IconPurpose::Skill);
        assert!(slot.candidates.is_empty());
        assert!(slot.is_settled());
        assert_eq!(slot.badge, "DK");
        let source = FakeSource::failing();
        resolve_chain(&slot.candidates, &slot.badge, &source);
        assert!(source.attempts.borrow().is_empty());
    }

    #[test]
    fn initials_edge_cases() {
        assert_eq!(initials("Attack"), "A");
        assert_eq!(initials("one two three"), "OT");
        assert_eq!(initials("   "), "?");
    }
}
