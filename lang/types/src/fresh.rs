use std::sync::atomic::{AtomicU64, Ordering};

use shapecheck_ast::Ident;

static NEXT_FRESH_ID: AtomicU64 = AtomicU64::new(0);

/// Produces a name never handed out before in this process.
///
/// Every generalization and instantiation step draws from this source, which
/// is what keeps free variable names globally unique for the lifetime of a
/// checking session.
pub fn fresh_name() -> Ident {
    Ident::from(format!("?{}", NEXT_FRESH_ID.fetch_add(1, Ordering::Relaxed)))
}
