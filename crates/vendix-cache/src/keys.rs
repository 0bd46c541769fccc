//! Namespaced cache key construction.
//!
//! Grounded on the original service's `CacheKeys` class: every key lives
//! under a dotted namespace (`products.get_all`, `admin.sales`, ...) so a
//! whole namespace can be invalidated with one prefix delete.

use vendix_core::model::Id;

/// Namespace invalidated whenever any product is created, updated, deleted,
/// or its stock changes.
pub const PRODUCTS_NS: &str = "products";
/// Namespace invalidated whenever a user's cart or addresses change.
pub const USER_NS: &str = "user";
/// Namespace invalidated whenever a sale is recorded or amended.
pub const ADMIN_SALES_NS: &str = "admin.sales";
/// Namespace invalidated whenever a cart's contents change.
pub const CART_NS: &str = "cart";
/// Namespace invalidated whenever an invoice is created, updated, or deleted.
pub const ADMIN_INVOICES_NS: &str = "admin.invoices";

/// Key for the full product catalog listing.
#[must_use]
pub fn products_all() -> String {
    format!("{PRODUCTS_NS}.get_all")
}

/// Key for a single product lookup.
#[must_use]
pub fn product_by_id(id: Id) -> String {
    format!("{PRODUCTS_NS}.get_by_id.{id}")
}

/// Key for a user's delivery addresses.
#[must_use]
pub fn user_addresses(user_id: Id) -> String {
    format!("{USER_NS}.{user_id}.addresses")
}

/// Key for a user's active cart total.
#[must_use]
pub fn cart_total(cart_id: Id) -> String {
    format!("{CART_NS}.{cart_id}.total")
}

/// Key for admin sales analytics over a date range, hashed into the key so
/// distinct ranges don't collide.
#[must_use]
pub fn admin_sales_analytics(range_key: &str) -> String {
    format!("{ADMIN_SALES_NS}.analytics.{range_key}")
}

/// Key for a user's sales summary.
#[must_use]
pub fn user_sales_summary(user_id: Id) -> String {
    format!("{ADMIN_SALES_NS}.user_summary.{user_id}")
}

/// Key for a user's invoices listing.
#[must_use]
pub fn user_invoices(user_id: Id) -> String {
    format!("{ADMIN_INVOICES_NS}.user.{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_keys_share_namespace_prefix() {
        assert!(products_all().starts_with(PRODUCTS_NS));
        assert!(product_by_id(7).starts_with(PRODUCTS_NS));
    }

    #[test]
    fn distinct_ids_produce_distinct_keys() {
        assert_ne!(product_by_id(1), product_by_id(2));
        assert_ne!(user_addresses(1), user_addresses(2));
    }
}
