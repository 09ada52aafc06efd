//! # Access Policy
//!
//! One policy function decides, for every (principal, entity, operation),
//! whether the call is allowed and which rows it may touch.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authorize(principal, EntityKind::ProductVariant, Operation::View)      │
//! │       │                                                                 │
//! │       ├── role lacks permission?        → Err(PermissionDenied)         │
//! │       ├── SUPERUSER                     → Unrestricted { deleted? }     │
//! │       ├── staff with store S            → Store { S }                   │
//! │       └── staff without a store         → Nothing (empty results)       │
//! │                                                                         │
//! │  vendorya-db turns the scope into a SQL predicate by walking the        │
//! │  entity's StoreResolution chain:                                        │
//! │                                                                         │
//! │    ProductAttribute ─variant_id─► ProductVariant ─product_id─► Product  │
//! │                                                      └── store_id = S   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::tenant::{Role, User};

// =============================================================================
// Principal
// =============================================================================

/// The acting user of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub store_id: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, store_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            store_id,
        }
    }

    #[inline]
    pub fn is_superuser(&self) -> bool {
        self.role == Role::Superuser
    }

    /// Fails unless the principal may address `store_id`.
    pub fn ensure_store(&self, store_id: &str) -> CoreResult<()> {
        if self.is_superuser() || self.store_id.as_deref() == Some(store_id) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied(format!(
                "store {} is outside your tenant",
                store_id
            )))
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal::new(user.id.clone(), user.role, user.store_id.clone())
    }
}

// =============================================================================
// Entity Kinds
// =============================================================================

/// Every tenant-scoped table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Store,
    Address,
    Branch,
    User,
    Customer,
    Tax,
    Supplier,
    Category,
    AttributeDefinition,
    Product,
    ProductVariant,
    ProductAttribute,
    BundleItem,
    StockLevel,
    StockAdjustment,
    SalesInvoice,
    SalesInvoiceItem,
    PaymentMethod,
    Payment,
    RefundInvoice,
    RefundItem,
    PurchaseInvoice,
    PurchaseInvoiceItem,
    Expense,
    WorkShift,
    ActivityLog,
}

/// How a row of an entity finds its owning store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreResolution {
    /// The row is the store (`id`).
    Own,
    /// `store_id` column on the row.
    Direct,
    /// Follow `column` to a parent entity and resolve from there.
    Via {
        column: &'static str,
        parent: EntityKind,
    },
}

impl EntityKind {
    pub const fn table(&self) -> &'static str {
        match self {
            EntityKind::Store => "stores",
            EntityKind::Address => "addresses",
            EntityKind::Branch => "branches",
            EntityKind::User => "users",
            EntityKind::Customer => "customers",
            EntityKind::Tax => "taxes",
            EntityKind::Supplier => "suppliers",
            EntityKind::Category => "categories",
            EntityKind::AttributeDefinition => "attribute_definitions",
            EntityKind::Product => "products",
            EntityKind::ProductVariant => "product_variants",
            EntityKind::ProductAttribute => "product_attributes",
            EntityKind::BundleItem => "bundle_items",
            EntityKind::StockLevel => "stock_levels",
            EntityKind::StockAdjustment => "stock_adjustments",
            EntityKind::SalesInvoice => "sales_invoices",
            EntityKind::SalesInvoiceItem => "sales_invoice_items",
            EntityKind::PaymentMethod => "payment_methods",
            EntityKind::Payment => "payments",
            EntityKind::RefundInvoice => "refund_invoices",
            EntityKind::RefundItem => "refund_items",
            EntityKind::PurchaseInvoice => "purchase_invoices",
            EntityKind::PurchaseInvoiceItem => "purchase_invoice_items",
            EntityKind::Expense => "expenses",
            EntityKind::WorkShift => "work_shifts",
            EntityKind::ActivityLog => "activity_logs",
        }
    }

    pub const fn resolution(&self) -> StoreResolution {
        use EntityKind::*;
        match self {
            Store => StoreResolution::Own,
            ProductVariant => StoreResolution::Via {
                column: "product_id",
                parent: Product,
            },
            ProductAttribute => StoreResolution::Via {
                column: "variant_id",
                parent: ProductVariant,
            },
            BundleItem => StoreResolution::Via {
                column: "bundle_id",
                parent: Product,
            },
            StockLevel | StockAdjustment => StoreResolution::Via {
                column: "branch_id",
                parent: Branch,
            },
            SalesInvoiceItem | Payment => StoreResolution::Via {
                column: "invoice_id",
                parent: SalesInvoice,
            },
            RefundItem => StoreResolution::Via {
                column: "refund_id",
                parent: RefundInvoice,
            },
            PurchaseInvoiceItem => StoreResolution::Via {
                column: "purchase_id",
                parent: PurchaseInvoice,
            },
            _ => StoreResolution::Direct,
        }
    }

    /// Entities carrying `is_deleted` / `deleted_at`.
    pub const fn is_soft_deletable(&self) -> bool {
        matches!(
            self,
            EntityKind::Store
                | EntityKind::Address
                | EntityKind::Customer
                | EntityKind::Tax
                | EntityKind::Supplier
                | EntityKind::Category
                | EntityKind::AttributeDefinition
                | EntityKind::Product
                | EntityKind::ProductVariant
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Operations & Permission Matrix
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    View,
    Add,
    Change,
    Delete,
}

/// Role → (entity, operation) table. Each role includes the one below it.
pub fn permits(role: Role, kind: EntityKind, op: Operation) -> bool {
    match role {
        Role::Superuser => true,
        Role::Owner => owner_permits(kind, op),
        Role::Manager => manager_permits(kind, op),
        Role::Cashier => cashier_permits(kind, op),
    }
}

fn cashier_permits(kind: EntityKind, op: Operation) -> bool {
    use EntityKind::*;
    use Operation::*;
    match kind {
        SalesInvoice | Customer | WorkShift => matches!(op, View | Add | Change),
        SalesInvoiceItem | Payment | RefundInvoice | RefundItem => matches!(op, View | Add),
        Product | ProductVariant | ProductAttribute | BundleItem | StockLevel | PaymentMethod => {
            op == View
        }
        _ => false,
    }
}

fn manager_permits(kind: EntityKind, op: Operation) -> bool {
    use EntityKind::*;
    use Operation::*;
    if cashier_permits(kind, op) {
        return true;
    }
    match kind {
        Product | ProductVariant | ProductAttribute | BundleItem | Supplier | Category
        | PurchaseInvoice | PurchaseInvoiceItem => matches!(op, View | Add | Change),
        StockAdjustment | Expense => matches!(op, View | Add),
        User | Tax | AttributeDefinition | Branch => op == View,
        _ => false,
    }
}

fn owner_permits(kind: EntityKind, op: Operation) -> bool {
    use EntityKind::*;
    use Operation::*;
    if manager_permits(kind, op) {
        return true;
    }
    match kind {
        Store => matches!(op, View | Change),
        Branch | Address | User | Tax | AttributeDefinition | PaymentMethod => true,
        ActivityLog => op == View,
        _ => op == Delete && kind.is_soft_deletable(),
    }
}

// =============================================================================
// Access Scope
// =============================================================================

/// Which rows a permitted call may see or touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Superuser: no tenant filter.
    Unrestricted { include_deleted: bool },
    /// Rows whose resolved store is `store_id`, soft-deleted rows hidden.
    Store { store_id: String },
    /// Staff without a store. Every query yields nothing.
    Nothing,
}

impl AccessScope {
    /// Superusers may opt into seeing soft-deleted rows. No effect otherwise.
    pub fn including_deleted(self) -> Self {
        match self {
            AccessScope::Unrestricted { .. } => AccessScope::Unrestricted {
                include_deleted: true,
            },
            other => other,
        }
    }

    pub fn hides_deleted(&self) -> bool {
        !matches!(
            self,
            AccessScope::Unrestricted {
                include_deleted: true
            }
        )
    }

    pub fn allows_store(&self, store_id: &str) -> bool {
        match self {
            AccessScope::Unrestricted { .. } => true,
            AccessScope::Store { store_id: own } => own == store_id,
            AccessScope::Nothing => false,
        }
    }
}

/// The single policy function.
pub fn authorize(principal: &Principal, kind: EntityKind, op: Operation) -> CoreResult<AccessScope> {
    if !permits(principal.role, kind, op) {
        return Err(CoreError::PermissionDenied(format!(
            "{:?} may not {:?} {}",
            principal.role, op, kind
        )));
    }

    Ok(match (&principal.role, &principal.store_id) {
        (Role::Superuser, _) => AccessScope::Unrestricted {
            include_deleted: false,
        },
        (_, Some(store_id)) => AccessScope::Store {
            store_id: store_id.clone(),
        },
        (_, None) => AccessScope::Nothing,
    })
}

/// Store to stamp on a new row.
///
/// Staff always write into their own store whatever the client sent.
/// Superusers must name one.
pub fn assign_store(principal: &Principal, requested: Option<&str>) -> CoreResult<String> {
    if principal.is_superuser() {
        return requested.map(str::to_string).ok_or_else(|| {
            ValidationError::Required {
                field: "store_id".to_string(),
            }
            .into()
        });
    }
    principal
        .store_id
        .clone()
        .ok_or_else(|| CoreError::PermissionDenied("user is not attached to a store".to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(role: Role, store: Option<&str>) -> Principal {
        Principal::new("u1", role, store.map(str::to_string))
    }

    #[test]
    fn test_cashier_can_sell_but_not_manage_catalog() {
        let p = staff(Role::Cashier, Some("s1"));
        assert!(authorize(&p, EntityKind::SalesInvoice, Operation::Add).is_ok());
        assert!(authorize(&p, EntityKind::ProductVariant, Operation::View).is_ok());
        assert!(matches!(
            authorize(&p, EntityKind::Product, Operation::Add),
            Err(CoreError::PermissionDenied(_))
        ));
        assert!(authorize(&p, EntityKind::StockAdjustment, Operation::Add).is_err());
    }

    #[test]
    fn test_roles_are_cumulative() {
        assert!(permits(Role::Manager, EntityKind::WorkShift, Operation::Add));
        assert!(permits(Role::Manager, EntityKind::PurchaseInvoice, Operation::Change));
        assert!(!permits(Role::Manager, EntityKind::Tax, Operation::Add));
        assert!(permits(Role::Owner, EntityKind::Tax, Operation::Add));
        assert!(permits(Role::Owner, EntityKind::Product, Operation::Delete));
        assert!(!permits(Role::Owner, EntityKind::ActivityLog, Operation::Delete));
        assert!(permits(Role::Superuser, EntityKind::ActivityLog, Operation::Delete));
    }

    #[test]
    fn test_scope_by_principal() {
        let scope = authorize(&staff(Role::Owner, Some("s1")), EntityKind::Product, Operation::View).unwrap();
        assert_eq!(scope, AccessScope::Store { store_id: "s1".into() });
        assert!(scope.allows_store("s1"));
        assert!(!scope.allows_store("s2"));

        let scope = authorize(&staff(Role::Owner, None), EntityKind::Product, Operation::View).unwrap();
        assert_eq!(scope, AccessScope::Nothing);
        assert!(!scope.allows_store("s1"));

        let scope = authorize(&staff(Role::Superuser, None), EntityKind::Product, Operation::View).unwrap();
        assert!(scope.hides_deleted());
        assert!(!scope.including_deleted().hides_deleted());
    }

    #[test]
    fn test_staff_cannot_opt_into_deleted_rows() {
        let scope = AccessScope::Store { store_id: "s1".into() }.including_deleted();
        assert!(scope.hides_deleted());
    }

    #[test]
    fn test_assign_store_overrides_client_value() {
        let cashier = staff(Role::Cashier, Some("s1"));
        assert_eq!(assign_store(&cashier, Some("s2")).unwrap(), "s1");

        let root = staff(Role::Superuser, None);
        assert_eq!(assign_store(&root, Some("s2")).unwrap(), "s2");
        assert!(assign_store(&root, None).is_err());

        let orphan = staff(Role::Manager, None);
        assert!(assign_store(&orphan, Some("s2")).is_err());
    }

    #[test]
    fn test_ensure_store() {
        assert!(staff(Role::Cashier, Some("s1")).ensure_store("s1").is_ok());
        assert!(staff(Role::Cashier, Some("s1")).ensure_store("s2").is_err());
        assert!(staff(Role::Superuser, None).ensure_store("s2").is_ok());
    }

    #[test]
    fn test_resolution_chains_end_at_a_store_column() {
        fn depth(kind: EntityKind) -> usize {
            match kind.resolution() {
                StoreResolution::Own | StoreResolution::Direct => 0,
                StoreResolution::Via { parent, .. } => 1 + depth(parent),
            }
        }
        assert_eq!(depth(EntityKind::Product), 0);
        assert_eq!(depth(EntityKind::ProductVariant), 1);
        assert_eq!(depth(EntityKind::ProductAttribute), 2);
        assert_eq!(depth(EntityKind::StockLevel), 1);
        assert_eq!(depth(EntityKind::Payment), 1);
    }
}
