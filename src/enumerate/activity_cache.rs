use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::logging::log_best_effort;
use crate::slack::{ActivitySample, Channel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const CACHE_FILE_NAME: &str = "activity-cache.json";

/// One generation of cached per-channel activity. Fully replaced on each
/// successful enumeration, never merged across generations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityCache {
    #[serde(default)]
    pub captured_at: i64,
    #[serde(default)]
    pub activity: BTreeMap<String, ActivitySample>,
}

pub fn cache_path(state_root: &Path) -> PathBuf {
    state_root.join(CACHE_FILE_NAME)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Fail-soft load: any IO or parse problem, and any cache older than `ttl`,
/// yields an empty cache. The cache is a performance optimization only.
pub fn load_cache(state_root: &Path, ttl_hours: u64) -> ActivityCache {
    let path = cache_path(state_root);
    if !path.exists() {
        return ActivityCache::default();
    }
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            log_best_effort(
                state_root,
                &format!("activity cache read failed at {}: {err}", path.display()),
            );
            return ActivityCache::default();
        }
    };
    let cache: ActivityCache = match serde_json::from_str(&raw) {
        Ok(cache) => cache,
        Err(err) => {
            log_best_effort(
                state_root,
                &format!("activity cache parse failed at {}: {err}", path.display()),
            );
            return ActivityCache::default();
        }
    };
    let age_secs = now_secs().saturating_sub(cache.captured_at);
    if age_secs < 0 || age_secs as u64 > ttl_hours * 3600 {
        log_best_effort(state_root, "activity cache expired; starting empty");
        return ActivityCache::default();
    }
    cache
}

/// Overwrites the cache with `{id -> last_activity}` extracted from the given
/// channels. Failure is logged, never propagated.
pub fn save_cache(state_root: &Path, channels: &[Channel]) {
    let mut cache = ActivityCache {
        captured_at: now_secs(),
        activity: BTreeMap::new(),
    };
    for channel in channels {
        if let Some(sample) = &channel.last_activity {
            cache.activity.insert(channel.id.clone(), sample.clone());
        }
    }
    let path = cache_path(state_root);
    let body = match serde_json::to_vec_pretty(&cache) {
        Ok(body) => body,
        Err(err) => {
            log_best_effort(state_root, &format!("activity cache encode failed: {err}"));
            return;
        }
    };
    if let Err(err) = atomic_write_file(&path, &body) {
        log_best_effort(
            state_root,
            &format!("activity cache write failed at {}: {err}", path.display()),
        );
    }
}

/// Fills `last_activity` for channels present in the cache and returns how
/// many were filled; the rest are left for a fresh fetch.
pub fn apply_cache(channels: &mut [Channel], cache: &ActivityCache) -> usize {
    let mut applied = 0usize;
    for channel in channels.iter_mut() {
        if channel.last_activity.is_some() {
            continue;
        }
        if let Some(sample) = cache.activity.get(&channel.id) {
            channel.last_activity = Some(sample.clone());
            applied += 1;
        }
    }
    applied
}
