use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow};
use buddy_model::{RuleLimits, SmartRule};
use serde::{Deserialize, Serialize};

/// Environment variable naming a TOML or JSON config file.
pub const CONFIG_PATH_ENV: &str = "PLAYLIST_BUDDY_CONFIG_PATH";
/// Environment variable holding the whole config as inline JSON.
pub const CONFIG_JSON_ENV: &str = "PLAYLIST_BUDDY_CONFIG_JSON";

/// Source that produced the engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Catalog browsing limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Upper bound (ms) for one catalog listing call. A slow server turns
    /// into a `Timeout` error instead of a hung tree.
    pub request_timeout_ms: u64,
    /// How many shows or seasons are expanded at once during an eager
    /// library walk.
    pub expand_concurrency: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 15_000,
            expand_concurrency: 4,
        }
    }
}

impl CatalogSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Never zero, so a misconfigured walk still makes progress.
    pub fn concurrency(&self) -> usize {
        self.expand_concurrency.max(1)
    }
}

/// Smart rule resolution defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Upper bound (ms) for one full smart refresh: snapshot, watch state
    /// and resolution.
    pub resolve_timeout_ms: u64,
    /// Item cap applied to newly created rules.
    pub default_max_items: usize,
    /// Runtime cap (minutes) applied to newly created rules.
    pub default_runtime_cap_minutes: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 60_000,
            default_max_items: 100,
            default_runtime_cap_minutes: 120,
        }
    }
}

impl ResolverSettings {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// A rule with the configured default caps and everything else unset.
    pub fn new_rule(&self) -> SmartRule {
        SmartRule {
            limits: RuleLimits {
                max_items: Some(self.default_max_items),
                runtime_cap_ms: Some(
                    self.default_runtime_cap_minutes.saturating_mul(60_000),
                ),
                per_show_cap: None,
            },
            ..SmartRule::default()
        }
    }
}

/// Remote playlist write limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Upper bound (ms) for each playlist server call.
    pub request_timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
        }
    }
}

impl SyncSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Top-level engine settings. Server credentials are not part of this and
/// stay with whatever wires up the remote clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuddyConfig {
    pub catalog: CatalogSettings,
    pub resolver: ResolverSettings,
    pub sync: SyncSettings,
}

impl BuddyConfig {
    /// Load configuration overrides using environment variables.
    /// Evaluation order:
    /// 1) `$PLAYLIST_BUDDY_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$PLAYLIST_BUDDY_CONFIG_JSON` (inline JSON),
    /// 3) a default file in the working directory,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        if let Ok(path_str) = env::var(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid config {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!("invalid config {}: {}", path.display(), err)
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid config json: {err}"))
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "playlist_buddy.toml",
            "playlist_buddy.json",
            "config/playlist_buddy.toml",
            "config/playlist_buddy.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }
}
