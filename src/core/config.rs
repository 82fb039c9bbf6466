use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// HarvestConfig — file-based config loader (tidescout.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Harvest tuning knobs (mirrors the `harvest` key in tidescout.json).
///
/// Resolution order everywhere: JSON field → `TIDESCOUT_*` env var → default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct HarvestFileConfig {
    /// Target comment cap in bounded mode. Default: 100.
    pub max_comments: Option<usize>,
    /// Settle pause after each scroll, in milliseconds. Default: 1500.
    pub scroll_pause_ms: Option<u64>,
    /// Unbounded mode: keep scrolling until growth stalls for `max_idle_secs`.
    pub unlimited: Option<bool>,
    /// Idle timeout for unbounded mode, in seconds. Default: 20.
    pub max_idle_secs: Option<u64>,
    /// Expand and capture nested replies. Default: true.
    pub include_replies: Option<bool>,
    /// Drop records whose author never rendered. Default: true.
    pub skip_unknown_author: Option<bool>,
}

/// Top-level config loaded from `tidescout.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct FileConfig {
    #[serde(default)]
    pub harvest: HarvestFileConfig,
}

/// Load `tidescout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `TIDESCOUT_CONFIG` env var path
/// 2. `./tidescout.json` (process cwd)
/// 3. `../tidescout.json` (repo root when running from a subdir)
///
/// Missing file → defaults (env-var fallbacks still apply).
/// Parse error → log a warning, return defaults.
pub fn load_file_config() -> FileConfig {
    let mut candidates = vec![
        PathBuf::from("tidescout.json"),
        PathBuf::from("../tidescout.json"),
    ];
    if let Ok(env_path) = std::env::var("TIDESCOUT_CONFIG") {
        candidates.insert(0, PathBuf::from(env_path));
    }

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<FileConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("tidescout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "tidescout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return FileConfig::default();
                }
            },
            Err(_) => continue, // not found at this path — try next
        }
    }

    FileConfig::default()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let v = std::env::var(key).ok()?;
    let v = v.trim().to_ascii_lowercase();
    if v.is_empty() {
        return None;
    }
    Some(matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

/// Fully resolved harvest configuration consumed by the loader, the
/// extractor, and the runner.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub max_comments: usize,
    pub scroll_pause: Duration,
    pub unlimited: bool,
    pub max_idle: Duration,
    pub include_replies: bool,
    pub skip_unknown_author: bool,
    /// Consecutive no-growth rounds tolerated before giving up.
    pub max_attempts: u32,
    /// "View replies" affordances opened per loading round.
    pub reply_batch_per_round: usize,
    /// Settle delay after expanding a reply thread.
    pub reply_settle: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_comments: 100,
            scroll_pause: Duration::from_millis(1500),
            unlimited: false,
            max_idle: Duration::from_secs(20),
            include_replies: true,
            skip_unknown_author: true,
            max_attempts: 20,
            reply_batch_per_round: 5,
            reply_settle: Duration::from_secs(1),
        }
    }
}

impl HarvestConfig {
    /// Resolve from a parsed config file plus `TIDESCOUT_*` env overrides.
    pub fn resolve(file: &HarvestFileConfig) -> Self {
        let d = Self::default();
        Self {
            max_comments: file
                .max_comments
                .or_else(|| env_u64("TIDESCOUT_MAX_COMMENTS").map(|v| v as usize))
                .unwrap_or(d.max_comments),
            scroll_pause: file
                .scroll_pause_ms
                .or_else(|| env_u64("TIDESCOUT_SCROLL_PAUSE_MS"))
                .map(Duration::from_millis)
                .unwrap_or(d.scroll_pause),
            unlimited: file
                .unlimited
                .or_else(|| env_bool("TIDESCOUT_UNLIMITED"))
                .unwrap_or(d.unlimited),
            max_idle: file
                .max_idle_secs
                .or_else(|| env_u64("TIDESCOUT_MAX_IDLE_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(d.max_idle),
            include_replies: file
                .include_replies
                .or_else(|| env_bool("TIDESCOUT_INCLUDE_REPLIES"))
                .unwrap_or(d.include_replies),
            skip_unknown_author: file
                .skip_unknown_author
                .or_else(|| env_bool("TIDESCOUT_SKIP_UNKNOWN"))
                .unwrap_or(d.skip_unknown_author),
            ..d
        }
    }
}

// ---------------------------------------------------------------------------

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_DATA_DIR: &str = "TIDESCOUT_DATA_DIR";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see `browser::find_chrome_executable`).
/// This only returns a value when `CHROME_EXECUTABLE` points at an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}

/// Root directory for harvest output and the avatar cache.
///
/// `TIDESCOUT_DATA_DIR` → `~/.tidescout` → `./.tidescout` as a last resort.
pub fn data_dir() -> PathBuf {
    if let Ok(v) = std::env::var(ENV_DATA_DIR) {
        let v = v.trim();
        if !v.is_empty() {
            return PathBuf::from(v);
        }
    }
    dirs::home_dir()
        .map(|h| h.join(".tidescout"))
        .unwrap_or_else(|| PathBuf::from(".tidescout"))
}

/// Avatar image cache directory under the data dir.
pub fn avatar_cache_dir() -> PathBuf {
    data_dir().join("avatars")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stopping_rule() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.max_attempts, 20);
        assert_eq!(cfg.max_idle, Duration::from_secs(20));
        assert_eq!(cfg.reply_batch_per_round, 5);
    }

    #[test]
    fn file_values_win_over_defaults() {
        let file = HarvestFileConfig {
            max_comments: Some(250),
            scroll_pause_ms: Some(500),
            unlimited: Some(true),
            ..Default::default()
        };
        let cfg = HarvestConfig::resolve(&file);
        assert_eq!(cfg.max_comments, 250);
        assert_eq!(cfg.scroll_pause, Duration::from_millis(500));
        assert!(cfg.unlimited);
        assert!(cfg.include_replies);
    }

    #[test]
    fn parses_full_config_file() {
        let raw = r#"{"harvest":{"max_comments":40,"include_replies":false}}"#;
        let file: FileConfig = serde_json::from_str(raw).unwrap();
        let cfg = HarvestConfig::resolve(&file.harvest);
        assert_eq!(cfg.max_comments, 40);
        assert!(!cfg.include_replies);
    }
}
