use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::reverse::reverse_in_tx;
use crate::errors::CreditResult;
use crate::store::LedgerStore;

impl LedgerStore {
    /// C5 — reverse PENDING reservations older than `ttl`, in chunks, using
    /// `FOR UPDATE SKIP LOCKED` so this can run concurrently with live
    /// traffic and with another sweep tick.
    ///
    /// `now` is threaded in explicitly (rather than read from the wall clock
    /// inside the loop) so tests can pin the cutoff precisely; `created_at ==
    /// cutoff` is deliberately NOT stale (strict `<`). `tick_budget` bounds
    /// total wall-clock time for one call: a tick that keeps finding full
    /// batches stops making further progress once the budget is spent,
    /// leaving the remainder for the next scheduled tick.
    pub async fn sweep_stale(
        &self,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
        chunk_size: i64,
        tick_budget: Duration,
    ) -> CreditResult<i64> {
        let cutoff = now - ttl;
        let started = Instant::now();
        let mut total = 0_i64;

        loop {
            if started.elapsed() >= tick_budget {
                tracing::warn!(total, "sweep tick budget exhausted, deferring remainder");
                break;
            }

            let mut tx = self.pool().begin().await?;

            let batch: Vec<i64> = sqlx::query_scalar(
                r#"
                SELECT id
                FROM credit_transactions
                WHERE tx_status = 'PENDING' AND created_at < $1
                ORDER BY id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
                "#,
            )
            .bind(cutoff)
            .bind(chunk_size)
            .fetch_all(&mut *tx)
            .await?;

            if batch.is_empty() {
                tx.commit().await?;
                break;
            }

            for tx_id in &batch {
                reverse_in_tx(&mut tx, *tx_id, "expired").await?;
            }

            tx.commit().await?;
            total += batch.len() as i64;
        }

        tracing::info!(total, "sweep tick done");
        Ok(total)
    }
}
