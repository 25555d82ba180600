//! Table repositories.
//!
//! Every function takes the caller's [`SessionContext`]; reads are narrowed
//! to the caller's site and an unassigned non-admin gets no rows without a
//! request being made.

pub mod connection;
pub mod delivery;
pub mod profile;
pub mod query;
pub mod visitor;
pub mod work;

pub use query::Query;

use crate::error::{AppError, Result};
use crate::session::SessionContext;

/// Projection narrowed to the caller's site, or `None` when access is denied.
pub(crate) fn scoped_read(ctx: &SessionContext, columns: &str) -> Option<Query> {
    let scope = ctx.scope();
    if scope.is_denied() {
        tracing::debug!("No site assigned to {}, skipping query", ctx.user_id());
        return None;
    }
    Some(Query::select(columns).site(scope.site_filter()))
}

/// Like [`scoped_read`] for writes: denial is an error.
pub(crate) fn scoped_write(ctx: &SessionContext, columns: &str) -> Result<Query> {
    scoped_read(ctx, columns).ok_or_else(|| AppError::forbidden("usuário sem obra atribuída"))
}
