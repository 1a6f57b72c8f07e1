use chrono::Utc;
use sqlx::PgPool;

use crate::errors::{CreditError, CreditResult};
use crate::models::{CreditTransaction, TxStatus, TxType, Wallet};

/// C1 — the ledger store. Every other service (C2-C5) is an `impl LedgerStore`
/// block in `crate::services`; nothing outside this module touches SQL.
///
/// Cloning is cheap: `PgPool` is an `Arc`-backed connection pool handle.
#[derive(Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a wallet at a zero balance.
    pub async fn create_wallet(&self, name: &str) -> CreditResult<Wallet> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (name, balance, updated_at)
            VALUES ($1, 0, now())
            RETURNING id, name, balance, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(wallet_id = wallet.id, name = %wallet.name, "wallet created");
        Ok(wallet)
    }

    pub async fn find_wallet_by_id(&self, wallet_id: i64) -> CreditResult<Wallet> {
        sqlx::query_as::<_, Wallet>(
            "SELECT id, name, balance, updated_at FROM wallets WHERE id = $1",
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CreditError::NotFound("wallet"))
    }

    pub async fn find_wallet_by_name(&self, name: &str) -> CreditResult<Wallet> {
        sqlx::query_as::<_, Wallet>(
            "SELECT id, name, balance, updated_at FROM wallets WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CreditError::NotFound("wallet"))
    }

    /// Administrative credit (C0). Not part of the reserve/commit/reverse
    /// lattice: the CREDIT row is born COMMITTED.
    pub async fn top_up(&self, wallet_id: i64, amount: i64, note: &str) -> CreditResult<(Wallet, CreditTransaction)> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount);
        }

        let mut tx = self.pool.begin().await?;

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            UPDATE wallets SET balance = balance + $1, updated_at = now()
            WHERE id = $2
            RETURNING id, name, balance, updated_at
            "#,
        )
        .bind(amount)
        .bind(wallet_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CreditError::NotFound("wallet"))?;

        let now = Utc::now();
        let credit = sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions
                (wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at)
            VALUES ($1, $2, $3, $4, NULL, NULL, $5, $6)
            RETURNING id, wallet_id, delta, tx_type, tx_status, idempotency_key, request_id, note, created_at
            "#,
        )
        .bind(wallet_id)
        .bind(amount)
        .bind(TxType::Credit)
        .bind(TxStatus::Committed)
        .bind(note)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(wallet_id, amount, "wallet topped up");
        Ok((wallet, credit))
    }
}
