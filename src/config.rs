use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_ITEM_SOURCES: [&str; 3] = [
    "https://raw.githubusercontent.com/0xNeffarion/osrsreboxed-db/master/docs/items-icons/{id}.png",
    "https://www.osrsbox.com/osrsbox-db/items-icons/{id}.png",
    "https://raw.githubusercontent.com/osrsbox/osrsbox-db/master/items-icons/{id}.png",
];

pub const DEFAULT_SKILL_ICON_BASE: &str = "https://oldschool.runescape.wiki/images/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of `~/.config/session-map/config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Backend base URL; fetching is impossible without it.
    pub api_host: Option<String>,
    /// Layer-shell output to open surfaces on.
    pub screen: Option<String>,
    pub icons: IconConfig,
    pub map: MapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    /// URL templates tried in order; `{id}` is replaced by the encoded item id.
    pub item_sources: Vec<String>,
    pub skill_base: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_px: f32,
    pub center: [f64; 2],
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_host: None,
            screen: None,
            icons: IconConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            item_sources: DEFAULT_ITEM_SOURCES.iter().map(|s| s.to_string()).collect(),
            skill_base: DEFAULT_SKILL_ICON_BASE.to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_px: 4.0,
            center: [3222.0, 3218.0],
        }
    }
}

impl DashboardConfig {
    /// Load from `path`. A missing file yields defaults; a broken one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the user config and apply `SESSION_MAP_HOST` / `SESSION_MAP_SCREEN`.
    pub fn load() -> Self {
        let path = config_file_path();
        let mut config = match Self::load_from(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                Self::default()
            }
        };
        config.apply_overrides(
            std::env::var("SESSION_MAP_HOST").ok(),
            std::env::var("SESSION_MAP_SCREEN").ok(),
        );
        config
    }

    fn apply_overrides(&mut self, host: Option<String>, screen: Option<String>) {
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            self.api_host = Some(host);
        }
        if let Some(screen) = screen.filter(|s| !s.is_empty()) {
            self.screen = Some(screen);
        }
    }

    /// The configured host without trailing slashes, if non-empty.
    pub fn host(&self) -> Option<&str> {
        self.api_host
            .as_deref()
            .map(|h| h.trim().trim_end_matches('/'))
            .filter(|h| !h.is_empty())
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("session-map")
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Stored bearer credential (`~/.config/session-map/token`).
#[derive(Debug, Clone)]
pub struct Credentials {
    path: PathBuf,
}

impl Credentials {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn user() -> Self {
        Self::new(config_dir().join("token"))
    }

    /// The token, if one is stored and non-blank.
    pub fn token(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Forget the stored token. Already-absent counts as success.
    pub fn clear(&self) -> Result<(), ConfigError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DashboardConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert!(cfg.api_host.is_none());
        assert_eq!(cfg.icons.item_sources.len(), 3);
        assert_eq!(cfg.map.tile_px, 4.0);
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_host = \"https://backend.example/\"\n[map]\ntile_px = 2.5\n",
        )
        .unwrap();
        let cfg = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(cfg.host(), Some("https://backend.example"));
        assert_eq!(cfg.map.tile_px, 2.5);
        assert_eq!(cfg.map.center, MapConfig::default().center);
        assert_eq!(cfg.icons.skill_base, DEFAULT_SKILL_ICON_BASE);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_host = [").unwrap();
        assert!(matches!(
            DashboardConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_win_but_blank_is_ignored() {
        let mut cfg = DashboardConfig::default();
        cfg.api_host = Some("https://file".into());
        cfg.apply_overrides(Some(String::new()), Some("DP-1".into()));
        assert_eq!(cfg.host(), Some("https://file"));
        assert_eq!(cfg.screen.as_deref(), Some("DP-1"));
        cfg.apply_overrides(Some("https://env".into()), None);
        assert_eq!(cfg.host(), Some("https://env"));
    }

    #[test]
    fn blank_host_counts_as_unconfigured() {
        let mut cfg = DashboardConfig::default();
        cfg.api_host = Some("  ".into());
        assert_eq!(cfg.host(), None);
    }

    #[test]
    fn credentials_read_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let creds = Credentials::new(dir.path().join("token"));
        assert_eq!(creds.token(), None);
        std::fs::write(dir.path().join("token"), "abc.def\n").unwrap();
        assert_eq!(creds.token().as_deref(), Some("abc.def"));
        creds.clear().unwrap();
        assert_eq!(creds.token(), None);
        creds.clear().unwrap();
    }
}
