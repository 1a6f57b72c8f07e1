//! The reservation protocol, split one module per state transition the way
//! the distilled Python source organizes `credits/services/`: `reserve`
//! (C2), `commit` (C3), `reverse` (C4), `sweep` (C5). Each module is an
//! `impl LedgerStore` block — there is no separate service type, since all of
//! them share the same pool and none hold state beyond it.

mod commit;
mod reserve;
mod reverse;
mod sweep;
