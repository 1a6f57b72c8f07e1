use sqlx::{Postgres, Transaction};

use crate::errors::{CreditError, CreditResult};
use crate::models::{CreditTransaction, TxStatus, TxType};
use crate::store::LedgerStore;

impl LedgerStore {
    /// C4 — transition a reservation PENDING -> REVERSED, restoring the hold
    /// and emitting a matching REFUND row.
    pub async fn reverse(&self, tx_id: i64, reason: &str) -> CreditResult<CreditTransaction> {
        let mut tx = self.pool().begin().await?;
        let reversed = reverse_in_tx(&mut tx, tx_id, reason).await?;
        tx.commit().await?;
        Ok(reversed)
    }
}

/// The guts of C4, factored out so C5 (sweep) can reverse many rows inside
/// one outer transaction without re-entering `LedgerStore::reverse` and
/// opening a transaction per row.
pub(crate) async fn reverse_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    tx_id: i64,
    reason: &str,
) -> CreditResult<CreditTransaction> {
    let current = sqlx::query_as::<_, CreditTransaction>(
        r#"
        SELECT id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
        FROM credit_transactions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(tx_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(CreditError::NotFound("reservation"))?;

    if !current.is_pending() {
        return Ok(current);
    }

    let reversed = sqlx::query_as::<_, CreditTransaction>(
        r#"
        UPDATE credit_transactions
        SET tx_status = $1, note = $2
        WHERE id = $3
        RETURNING id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
        "#,
    )
    .bind(TxStatus::Reversed)
    .bind(reason)
    .bind(tx_id)
    .fetch_one(&mut **tx)
    .await?;

    let refund_amount = reversed.delta.abs();
    sqlx::query("UPDATE wallets SET balance = balance + $1, updated_at = now() WHERE id = $2")
        .bind(refund_amount)
        .bind(reversed.wallet_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO credit_transactions
            (wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at)
        VALUES ($1, $2, $3, $4, NULL, NULL, $5, now())
        "#,
    )
    .bind(reversed.wallet_id)
    .bind(refund_amount)
    .bind(TxType::Refund)
    .bind(TxStatus::Committed)
    .bind(format!("refund of tx {}: {}", reversed.id, reason))
    .execute(&mut **tx)
    .await?;

    tracing::info!(
        tx_id = reversed.id,
        wallet_id = reversed.wallet_id,
        reason,
        "reservation reversed"
    );
    Ok(reversed)
}
