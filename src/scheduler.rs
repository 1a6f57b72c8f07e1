//! C5's periodic driver. The distilled source schedules `sweep_pending_tx`
//! via Celery beat every 60 seconds with `autoretry_for`, exponential
//! backoff, jitter, and a cap of 5 retries; there is no broker here, so this
//! is the same contract read onto a plain `tokio::time::interval` loop
//! spawned once from `main`.

use std::time::Duration;

use rand::Rng;

use crate::config::Config;
use crate::errors::CreditError;
use crate::store::LedgerStore;

const MAX_ATTEMPTS: u32 = 5;

/// Runs forever. Intended to be `tokio::spawn`ed once at startup and never
/// awaited; a single failed tick retries internally and the loop always
/// resumes on the regular interval regardless of outcome.
pub async fn run(store: LedgerStore, config: Config) {
    let mut ticker = tokio::time::interval(config.sweep_interval());
    // `interval` fires immediately on the first tick; that's fine, it just
    // means the sweeper does its first pass right at startup.

    loop {
        ticker.tick().await;
        sweep_with_retry(&store, &config).await;
    }
}

async fn sweep_with_retry(store: &LedgerStore, config: &Config) {
    let mut attempt = 0_u32;

    loop {
        attempt += 1;
        let result = store
            .sweep_stale(
                chrono::Utc::now(),
                config.reservation_ttl(),
                config.sweep_chunk_size,
                config.sweep_tick_budget(),
            )
            .await;

        match result {
            Ok(reversed) => {
                if reversed > 0 {
                    tracing::info!(reversed, attempt, "sweep reversed stale reservations");
                }
                return;
            }
            Err(CreditError::TransientStorage(detail)) if attempt < MAX_ATTEMPTS => {
                let delay = backoff_with_jitter(attempt);
                tracing::warn!(
                    attempt,
                    error = %detail,
                    delay_ms = delay.as_millis() as u64,
                    "sweep tick failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                tracing::error!(attempt, error = %err, "sweep tick abandoned for this interval");
                return;
            }
        }
    }
}

/// Exponential backoff (1s * 2^(attempt-1)) plus up to 50% jitter, the same
/// shape as Celery's `retry_backoff=True, retry_jitter=True`.
fn backoff_with_jitter(attempt: u32) -> Duration {
    let base_secs = 2_u64.saturating_pow(attempt.saturating_sub(1));
    let base = Duration::from_secs(base_secs.min(30));
    let jitter_ms = rand::thread_rng().gen_range(0..=(base.as_millis() as u64 / 2).max(1));
    base + Duration::from_millis(jitter_ms)
}
