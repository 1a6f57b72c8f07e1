use crate::store::LedgerStore;

/// Shared application state, the same shape as the teacher's `AppState`:
/// one cheaply-`Clone`able handle per axum worker.
#[derive(Clone)]
pub struct AppState {
    pub store: LedgerStore,
}
