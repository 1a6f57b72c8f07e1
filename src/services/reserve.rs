use chrono::Utc;

use crate::errors::{CreditError, CreditResult};
use crate::models::{CreditTransaction, TxStatus, TxType};
use crate::store::LedgerStore;

const MAX_IDEMPOTENCY_KEY_LEN: usize = 64;

impl LedgerStore {
    /// C2 — reserve `amount` credits against `wallet_id`.
    ///
    /// Insert-first: the ledger row is written before the balance is
    /// touched, so a client-supplied `idempotency_key` lets the database's
    /// partial unique index arbitrate races instead of application locking.
    /// Of N concurrent callers sharing a key, exactly one inserts and debits;
    /// the rest observe the existing row and return it unchanged.
    pub async fn reserve(
        &self,
        wallet_id: i64,
        amount: i64,
        idempotency_key: Option<&str>,
        request_id: Option<&str>,
        note: &str,
    ) -> CreditResult<CreditTransaction> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount);
        }
        if let Some(key) = idempotency_key {
            if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
                return Err(CreditError::InvalidAmount);
            }
        }

        let mut tx = self.pool().begin().await?;
        let now = Utc::now();

        let (reservation, created) = match idempotency_key {
            Some(key) => {
                let inserted = sqlx::query_as::<_, CreditTransaction>(
                    r#"
                    INSERT INTO credit_transactions
                        (wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (wallet_id, idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING
                    RETURNING id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
                    "#,
                )
                .bind(wallet_id)
                .bind(-amount)
                .bind(TxType::Debit)
                .bind(TxStatus::Pending)
                .bind(key)
                .bind(request_id)
                .bind(note)
                .bind(now)
                .fetch_optional(&mut *tx)
                .await?;

                match inserted {
                    Some(row) => (row, true),
                    None => {
                        // Someone else's insert won the race; return their row.
                        let existing = sqlx::query_as::<_, CreditTransaction>(
                            r#"
                            SELECT id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
                            FROM credit_transactions
                            WHERE wallet_id = $1 AND idempotency_key = $2
                            "#,
                        )
                        .bind(wallet_id)
                        .bind(key)
                        .fetch_one(&mut *tx)
                        .await?;
                        (existing, false)
                    }
                }
            }
            None => {
                let row = sqlx::query_as::<_, CreditTransaction>(
                    r#"
                    INSERT INTO credit_transactions
                        (wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at)
                    VALUES ($1, $2, $3, $4, NULL, $5, $6, $7)
                    RETURNING id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
                    "#,
                )
                .bind(wallet_id)
                .bind(-amount)
                .bind(TxType::Debit)
                .bind(TxStatus::Pending)
                .bind(request_id)
                .bind(note)
                .fetch_one(&mut *tx)
                .await?;
                (row, true)
            }
        };

        if !created {
            // Idempotent hit: no second debit, nothing left to do.
            tx.commit().await?;
            return Ok(reservation);
        }

        let decremented = sqlx::query(
            "UPDATE wallets SET balance = balance - $1, updated_at = now() WHERE id = $2 AND balance >= $1",
        )
        .bind(amount)
        .bind(wallet_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if decremented == 0 {
            // Transaction drops here without committing: both the insert and
            // the (no-op) decrement attempt roll back together.
            return Err(CreditError::InsufficientCredits);
        }

        tx.commit().await?;

        tracing::info!(
            wallet_id,
            tx_id = reservation.id,
            amount,
            idempotency_key = idempotency_key.unwrap_or(""),
            "reservation created"
        );
        Ok(reservation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// `connect_lazy` builds a `PgPool` without touching the network; the
    /// amount/key validation below returns before `reserve` ever calls
    /// `self.pool().begin()`, so these tests need no live Postgres.
    fn lazy_store() -> LedgerStore {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool construction never touches the network");
        LedgerStore::new(pool)
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts_without_touching_storage() {
        let store = lazy_store();
        assert!(matches!(
            store.reserve(1, 0, None, None, "x").await,
            Err(CreditError::InvalidAmount)
        ));
        assert!(matches!(
            store.reserve(1, -5, None, None, "x").await,
            Err(CreditError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn rejects_overlong_idempotency_keys_without_touching_storage() {
        let store = lazy_store();
        let long_key = "a".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1);
        assert!(matches!(
            store.reserve(1, 10, Some(&long_key), None, "x").await,
            Err(CreditError::InvalidAmount)
        ));
    }
}
