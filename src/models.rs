use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A per-customer credit balance.
///
/// `balance` is a non-negative integer count of credits — this system meters
/// discrete API calls, not money, so there is no `Decimal` here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub name: String,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// A single ledger row. Append-first: only `tx_status` and `note` ever change,
/// and only on the PENDING -> {COMMITTED, REVERSED} edge.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub delta: i64,
    pub tx_type: TxType,
    pub tx_status: TxStatus,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    pub fn is_pending(&self) -> bool {
        matches!(self.tx_status, TxStatus::Pending)
    }
}

/// What kind of ledger entry this is. Set at insert, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxType {
    Debit,
    Credit,
    Refund,
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxType::Debit => write!(f, "DEBIT"),
            TxType::Credit => write!(f, "CREDIT"),
            TxType::Refund => write!(f, "REFUND"),
        }
    }
}

/// Where a ledger entry sits in the PENDING -> {COMMITTED, REVERSED} lattice.
/// Only DEBIT rows are ever PENDING; CREDIT and REFUND rows are born COMMITTED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Committed,
    Reversed,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "PENDING"),
            TxStatus::Committed => write!(f, "COMMITTED"),
            TxStatus::Reversed => write!(f, "REVERSED"),
        }
    }
}

/// Ambient: maps an `X-API-Key` header value to a wallet. Owned by the auth
/// layer, not by the ledger core — it carries none of the reservation logic.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub wallet_id: i64,
    pub key: String,
    pub is_active: bool,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

// === API request/response DTOs ===

#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateWalletResponse {
    pub wallet: WalletResponse,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: i64,
    pub name: String,
    pub balance: i64,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            name: wallet.name,
            balance: wallet.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub wallet_id: i64,
    pub delta: i64,
    pub tx_type: TxType,
    pub tx_status: TxStatus,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransaction> for TransactionResponse {
    fn from(tx: CreditTransaction) -> Self {
        Self {
            id: tx.id,
            wallet_id: tx.wallet_id,
            delta: tx.delta,
            tx_type: tx.tx_type,
            tx_status: tx.tx_status,
            created_at: tx.created_at,
        }
    }
}

/// Generic envelope, matching the shape the teacher repo wraps every
/// response in.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}
