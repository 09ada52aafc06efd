//! # Tenant Scope → SQL
//!
//! Turns an [`AccessScope`] into a WHERE fragment for any [`EntityKind`].
//!
//! ```text
//! StockLevel (alias t)        → (SELECT s1.store_id FROM branches s1 WHERE s1.id = t.branch_id)
//! ProductAttribute (alias t)  → (SELECT (SELECT s2.store_id FROM products s2
//!                                        WHERE s2.id = s1.product_id)
//!                                FROM product_variants s1 WHERE s1.id = t.variant_id)
//! ```
//!
//! Every identifier comes from `EntityKind`'s static tables; only the store
//! id is bound.

use sqlx::{QueryBuilder, Sqlite};
use vendorya_core::access::StoreResolution;
use vendorya_core::{AccessScope, EntityKind};

/// SQL expression yielding the owning store id of row `alias`.
pub fn store_expr(kind: EntityKind, alias: &str) -> String {
    store_expr_at(kind, alias, 1)
}

fn store_expr_at(kind: EntityKind, alias: &str, depth: usize) -> String {
    match kind.resolution() {
        StoreResolution::Own => format!("{}.id", alias),
        StoreResolution::Direct => format!("{}.store_id", alias),
        StoreResolution::Via { column, parent } => {
            let inner = format!("s{}", depth);
            format!(
                "(SELECT {} FROM {} {} WHERE {}.id = {}.{})",
                store_expr_at(parent, &inner, depth + 1),
                parent.table(),
                inner,
                inner,
                alias,
                column
            )
        }
    }
}

/// Appends ` AND ...` predicates for `scope` to a query that already has a
/// WHERE clause.
///
/// `hide_deleted` is separate from the scope so restore can reach rows
/// that are currently soft-deleted.
pub fn push_scope(
    qb: &mut QueryBuilder<'_, Sqlite>,
    kind: EntityKind,
    alias: &str,
    scope: &AccessScope,
    hide_deleted: bool,
) {
    match scope {
        AccessScope::Unrestricted { .. } => {}
        AccessScope::Store { store_id } => {
            qb.push(" AND ");
            qb.push(store_expr(kind, alias));
            qb.push(" = ");
            qb.push_bind(store_id.clone());
        }
        AccessScope::Nothing => {
            qb.push(" AND 0");
        }
    }

    if hide_deleted && kind.is_soft_deletable() {
        qb.push(format!(" AND {}.is_deleted = 0", alias));
    }
}
