//! C6 — binds a reservation to a request's lifecycle. This is the Rust
//! reading of the distilled source's `charge_one_credit` decorator: an axum
//! middleware that reserves before the inner handler runs and guarantees
//! exactly one of commit/reverse runs before the response leaves, on every
//! exit path (2xx/3xx, other status, panic, or the request future being
//! dropped outright).

use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use futures::FutureExt;
use serde_json::json;
use uuid::Uuid;

use crate::errors::CreditError;
use crate::models::Wallet;
use crate::state::AppState;
use crate::store::LedgerStore;

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Scoped acquisition of a reservation. Exactly one of `commit`/`reverse`
/// must be called before this is dropped; `Drop` reverses as a best-effort
/// fallback for the one exit path neither can observe — the request future
/// getting dropped without completing (client disconnect, shutdown). That
/// fallback races the process exiting too, which is why the sweeper (C5)
/// remains the authoritative recovery path for abandoned reservations.
struct ChargeGuard {
    store: LedgerStore,
    tx_id: i64,
    resolved: bool,
}

impl ChargeGuard {
    fn new(store: LedgerStore, tx_id: i64) -> Self {
        Self {
            store,
            tx_id,
            resolved: false,
        }
    }

    async fn commit(mut self) {
        self.resolved = true;
        if let Err(err) = self.store.commit(self.tx_id).await {
            tracing::error!(tx_id = self.tx_id, error = %err, "failed to commit reservation");
        }
    }

    async fn reverse(mut self, reason: &str) {
        self.resolved = true;
        if let Err(err) = self.store.reverse(self.tx_id, reason).await {
            tracing::error!(tx_id = self.tx_id, error = %err, "failed to reverse reservation");
        }
    }
}

impl Drop for ChargeGuard {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let store = self.store.clone();
        let tx_id = self.tx_id;
        tokio::spawn(async move {
            if let Err(err) = store.reverse(tx_id, "dropped").await {
                tracing::error!(tx_id, error = %err, "failed to reverse abandoned reservation");
            }
        });
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "API key required" })),
    )
        .into_response()
}

/// Middleware that charges one credit for the route it wraps. Apply with
/// `axum::middleware::from_fn_with_state` as a `route_layer` on the specific
/// routes that should be metered — unlike `auth::attach_wallet`, this is not
/// meant to run globally.
pub async fn charge_one_credit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let wallet = req
        .extensions()
        .get::<Option<Wallet>>()
        .cloned()
        .flatten();

    let wallet = match wallet {
        Some(wallet) => wallet,
        None => return unauthorized(),
    };

    let idempotency_key = req
        .headers()
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request_id = Uuid::new_v4().to_string();

    let reservation = match state
        .store
        .reserve(
            wallet.id,
            1,
            idempotency_key.as_deref(),
            Some(&request_id),
            "api-request",
        )
        .await
    {
        Ok(reservation) => reservation,
        Err(CreditError::InsufficientCredits) => return CreditError::InsufficientCredits.into_response(),
        Err(err) => return err.into_response(),
    };

    let guard = ChargeGuard::new(state.store.clone(), reservation.id);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() || status.is_redirection() {
                guard.commit().await;
            } else {
                guard.reverse(&format!("http {}", status.as_u16())).await;
            }
            response
        }
        Err(panic) => {
            guard.reverse("exception").await;
            std::panic::resume_unwind(panic);
        }
    }
}
