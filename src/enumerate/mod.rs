use crate::config::Settings;
use crate::shared::logging::log_best_effort;
use crate::slack::{Channel, SlackApiClient, SlackError};
use std::path::Path;
use std::thread;
use std::time::Duration;

pub mod activity_cache;

pub use activity_cache::{apply_cache, cache_path, load_cache, save_cache, ActivityCache};

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerateOptions {
    pub use_cache: bool,
    pub force_refresh: bool,
    pub dry_run: bool,
}

/// Full live channel set, enriched with last-activity data from the cache or
/// fresh history probes. Pagination failures abort; per-channel activity
/// failures are logged and leave `last_activity` unset.
pub fn enumerate_channels(
    client: &SlackApiClient,
    settings: &Settings,
    state_root: &Path,
    opts: EnumerateOptions,
) -> Result<Vec<Channel>, SlackError> {
    let listing = client.list_channels(
        settings.page_size,
        Duration::from_millis(settings.page_pause_ms),
    )?;
    if listing.dropped > 0 {
        log_best_effort(
            state_root,
            &format!(
                "dropped {} malformed channel records during enumeration",
                listing.dropped
            ),
        );
    }
    let mut channels = listing.channels;

    if opts.use_cache && !opts.force_refresh {
        let cache = load_cache(state_root, settings.cache_ttl_hours);
        let applied = apply_cache(&mut channels, &cache);
        if applied > 0 {
            log_best_effort(
                state_root,
                &format!("activity cache supplied {applied} of {} channels", channels.len()),
            );
        }
    }

    fetch_missing_activity(client, settings, state_root, &mut channels);

    // Dry runs must not mutate any persisted state.
    if !opts.dry_run {
        save_cache(state_root, &channels);
    }
    Ok(channels)
}

/// Bounded fan-out: one batch of history probes in flight at a time, with a
/// pause between batches to respect rate limits.
fn fetch_missing_activity(
    client: &SlackApiClient,
    settings: &Settings,
    state_root: &Path,
    channels: &mut [Channel],
) {
    let pending: Vec<usize> = channels
        .iter()
        .enumerate()
        .filter(|(_, channel)| channel.last_activity.is_none())
        .map(|(idx, _)| idx)
        .collect();
    if pending.is_empty() {
        return;
    }

    let pause = Duration::from_millis(settings.activity_batch_pause_ms);
    let batches: Vec<&[usize]> = pending.chunks(settings.activity_batch_size.max(1)).collect();
    let batch_count = batches.len();
    for (batch_no, batch) in batches.into_iter().enumerate() {
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|&idx| {
                    let id = channels[idx].id.clone();
                    (idx, scope.spawn(move || client.latest_activity(&id)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(idx, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(SlackError::ApiRequest(
                            "activity fetch thread panicked".to_string(),
                        ))
                    });
                    (idx, result)
                })
                .collect()
        });

        for (idx, result) in results {
            match result {
                Ok(sample) => channels[idx].last_activity = sample,
                Err(err) => log_best_effort(
                    state_root,
                    &format!(
                        "activity fetch failed for {} ({}): {err}",
                        channels[idx].name, channels[idx].id
                    ),
                ),
            }
        }

        if batch_no + 1 < batch_count {
            thread::sleep(pause);
        }
    }
}
