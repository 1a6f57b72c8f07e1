use crate::errors::CreditResult;
use crate::models::{CreditTransaction, TxStatus};
use crate::store::LedgerStore;

impl LedgerStore {
    /// C3 — transition a reservation PENDING -> COMMITTED.
    ///
    /// No balance mutation happens here; the hold was already taken at
    /// reserve time. Locking the row before checking status makes
    /// double-commit and commit-after-reverse both safe no-ops.
    pub async fn commit(&self, tx_id: i64) -> CreditResult<CreditTransaction> {
        let mut tx = self.pool().begin().await?;

        let current = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
            FROM credit_transactions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(tx_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(crate::errors::CreditError::NotFound("reservation"))?;

        if !current.is_pending() {
            tx.commit().await?;
            return Ok(current);
        }

        let committed = sqlx::query_as::<_, CreditTransaction>(
            r#"
            UPDATE credit_transactions
            SET tx_status = $1
            WHERE id = $2
            RETURNING id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
            "#,
        )
        .bind(TxStatus::Committed)
        .bind(tx_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(tx_id, wallet_id = committed.wallet_id, "reservation committed");
        Ok(committed)
    }
}
