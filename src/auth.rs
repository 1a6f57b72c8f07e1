//! Ambient auth layer — not part of the metered core. Resolves the `X-API-Key`
//! header to a `Wallet` and stashes it in the request's typed extensions map,
//! mirroring the teacher's `request.wallet` middleware but without reaching
//! for a dynamic attribute: the charge middleware (`crate::charge`) reads the
//! `Wallet` back by type.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::HeaderMap,
    middleware::Next,
    response::Response,
};
use rand::RngCore;
use sqlx::PgPool;

use crate::models::{ApiKey, Wallet};
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Generate a fresh 64-hex-character key, the same shape as the teacher's
/// `ApiKey::generate` (`secrets.token_hex(32)` in the distilled source).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub async fn create_api_key(pool: &PgPool, wallet_id: i64, label: &str) -> Result<ApiKey, sqlx::Error> {
    let key = generate_api_key();
    sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (wallet_id, key, is_active, label, created_at)
        VALUES ($1, $2, TRUE, $3, now())
        RETURNING id, wallet_id, key, is_active, label, created_at
        "#,
    )
    .bind(wallet_id)
    .bind(&key)
    .bind(label)
    .fetch_one(pool)
    .await
}

async fn resolve_wallet(pool: &PgPool, headers: &HeaderMap) -> Option<Wallet> {
    let key = headers.get(API_KEY_HEADER)?.to_str().ok()?;
    if key.is_empty() {
        return None;
    }

    sqlx::query_as::<_, Wallet>(
        r#"
        SELECT w.id, w.name, w.balance, w.updated_at
        FROM wallets w
        JOIN api_keys k ON k.wallet_id = w.id
        WHERE k.key = $1 AND k.is_active
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
}

/// Middleware: attach `Option<Wallet>` to the request's extensions. Deliberately
/// never returns 401 itself — that is the charge wrapper's job (spec §4.6),
/// since unauthenticated access to unmetered routes (e.g. `/health`) is fine.
pub async fn attach_wallet(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let wallet = resolve_wallet(state.store.pool(), req.headers()).await;
    req.extensions_mut().insert(wallet);
    next.run(req).await
}
