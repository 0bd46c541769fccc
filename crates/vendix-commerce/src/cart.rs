//! Cart service (C7): per-user active-cart lifecycle, line-item mutations,
//! and stock validation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use vendix_auth::policy::require_owner_or_admin;
use vendix_cache::{keys, Cache, TypedCache};
use vendix_core::model::{Cart, CartStatus, Id, MAX_LINE_QUANTITY, Product};
use vendix_core::{ErrorKind, Principal, VendixError, VendixResult};
use vendix_repo::{CartRepository, ProductRepository, RepoError};

const CART_TOTAL_TTL: Duration = Duration::from_secs(120);

/// One line of a computed cart total, snapshotted against current prices.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineSummary {
    /// Referenced product.
    pub product_id: Id,
    /// Quantity in the cart.
    pub quantity: u32,
    /// Product's current unit price.
    pub unit_price: Decimal,
    /// `unit_price * quantity`.
    pub line_total: Decimal,
}

/// Result of [`CartService::compute_total`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CartTotal {
    /// Sum of every line's total.
    pub subtotal: Decimal,
    /// Sum of every line's quantity.
    pub item_count: u32,
    /// Number of distinct products.
    pub distinct_products: usize,
    /// Itemized lines.
    pub lines: Vec<LineSummary>,
}

/// Result of [`CartService::validate_for_checkout`].
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutValidation {
    /// Whether checkout may proceed.
    pub valid: bool,
    /// Fatal reasons checkout is blocked, if any.
    pub errors: Vec<String>,
    /// Non-fatal reasons worth surfacing to the caller.
    pub warnings: Vec<String>,
    /// Total as of this validation snapshot.
    pub total: CartTotal,
}

/// Per-user cart service.
#[derive(Debug)]
pub struct CartService<R, P, C: Cache> {
    carts: Arc<R>,
    products: Arc<P>,
    cache: TypedCache<C>,
}

impl<R: CartRepository, P: ProductRepository, C: Cache> CartService<R, P, C> {
    /// Construct a service over the given repositories and cache backend.
    pub fn new(carts: Arc<R>, products: Arc<P>, cache: C) -> Self {
        Self {
            carts,
            products,
            cache: TypedCache::new(cache),
        }
    }

    /// Return the user's active cart, creating one if none exists.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn get_or_create_active_cart(&self, user_id: Id) -> VendixResult<Cart> {
        if let Some(cart) = self
            .carts
            .find_active_for_user(user_id)
            .await
            .map_err(RepoError::into_vendix_error)?
        {
            return Ok(cart);
        }
        let now = Utc::now();
        self.carts
            .insert(Cart {
                id: 0,
                user_id,
                status: CartStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(RepoError::into_vendix_error)
    }

    async fn load_product(&self, product_id: Id) -> VendixResult<Product> {
        self.products
            .find_by_id(product_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::product_not_found(product_id))
    }

    /// Add `qty` units of `product_id` to `user_id`'s active cart, or
    /// increase the existing line's quantity.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`] if the product does not exist.
    /// - [`ErrorKind::Domain`] if the product lacks sufficient stock, or the
    ///   resulting quantity would exceed [`MAX_LINE_QUANTITY`].
    pub async fn add_line(&self, user_id: Id, product_id: Id, qty: u32) -> VendixResult<()> {
        let cart = self.get_or_create_active_cart(user_id).await?;
        let product = self.load_product(product_id).await?;

        let existing_qty = self
            .carts
            .list_lines(cart.id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .into_iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity);

        let new_qty = existing_qty + qty;
        if new_qty > MAX_LINE_QUANTITY {
            return Err(VendixError::new(
                ErrorKind::Domain,
                format!("quantity {new_qty} exceeds the per-line maximum of {MAX_LINE_QUANTITY}"),
            ));
        }
        if (product.stock as i64) < new_qty as i64 {
            return Err(VendixError::insufficient_stock(product_id, product.stock, new_qty as i64));
        }

        self.carts
            .upsert_line(cart.id, product_id, new_qty)
            .await
            .map_err(RepoError::into_vendix_error)?;
        self.cache.invalidate(&keys::cart_total(cart.id)).await;
        Ok(())
    }

    /// Set `product_id`'s line quantity to exactly `qty`; `qty == 0`
    /// deletes the line.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_line`].
    pub async fn update_line_qty(&self, user_id: Id, product_id: Id, qty: u32) -> VendixResult<()> {
        let cart = self.get_or_create_active_cart(user_id).await?;
        if qty == 0 {
            self.carts
                .remove_line(cart.id, product_id)
                .await
                .map_err(RepoError::into_vendix_error)?;
            self.cache.invalidate(&keys::cart_total(cart.id)).await;
            return Ok(());
        }

        let product = self.load_product(product_id).await?;
        if qty > MAX_LINE_QUANTITY {
            return Err(VendixError::new(
                ErrorKind::Domain,
                format!("quantity {qty} exceeds the per-line maximum of {MAX_LINE_QUANTITY}"),
            ));
        }
        if (product.stock as i64) < qty as i64 {
            return Err(VendixError::insufficient_stock(product_id, product.stock, qty as i64));
        }

        self.carts
            .upsert_line(cart.id, product_id, qty)
            .await
            .map_err(RepoError::into_vendix_error)?;
        self.cache.invalidate(&keys::cart_total(cart.id)).await;
        Ok(())
    }

    /// Remove `product_id`'s line from `user_id`'s active cart.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotFound`] if the line is absent.
    pub async fn remove_line(&self, user_id: Id, product_id: Id) -> VendixResult<()> {
        let cart = self.get_or_create_active_cart(user_id).await?;
        let lines = self.carts.list_lines(cart.id).await.map_err(RepoError::into_vendix_error)?;
        if !lines.iter().any(|l| l.product_id == product_id) {
            return Err(VendixError::new(
                ErrorKind::NotFound,
                format!("product {product_id} is not in the cart"),
            ));
        }
        self.carts
            .remove_line(cart.id, product_id)
            .await
            .map_err(RepoError::into_vendix_error)?;
        self.cache.invalidate(&keys::cart_total(cart.id)).await;
        Ok(())
    }

    /// Remove every line from `user_id`'s active cart.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn clear(&self, user_id: Id) -> VendixResult<()> {
        let cart = self.get_or_create_active_cart(user_id).await?;
        self.carts.clear_lines(cart.id).await.map_err(RepoError::into_vendix_error)?;
        self.cache.invalidate(&keys::cart_total(cart.id)).await;
        Ok(())
    }

    async fn compute_total_uncached(&self, cart_id: Id) -> VendixResult<CartTotal> {
        let lines = self.carts.list_lines(cart_id).await.map_err(RepoError::into_vendix_error)?;
        let mut summaries = Vec::with_capacity(lines.len());
        let mut subtotal = Decimal::ZERO;
        let mut item_count = 0u32;
        for line in &lines {
            let product = self.load_product(line.product_id).await?;
            let line_total = product.price * Decimal::from(line.quantity);
            subtotal += line_total;
            item_count += line.quantity;
            summaries.push(LineSummary {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
                line_total,
            });
        }
        Ok(CartTotal {
            subtotal,
            item_count,
            distinct_products: summaries.len(),
            lines: summaries,
        })
    }

    /// Snapshot the cart's total against current prices, cached for two
    /// minutes.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotFound`] if a line references a deleted product.
    pub async fn compute_total(&self, cart_id: Id) -> VendixResult<CartTotal> {
        let key = keys::cart_total(cart_id);
        if let Some(cached) = self.cache.get::<CartTotal>(&key).await {
            return Ok(cached);
        }
        let total = self.compute_total_uncached(cart_id).await?;
        self.cache.set(&key, &total, CART_TOTAL_TTL).await;
        Ok(total)
    }

    /// Transition a cart's status.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] unless `principal` owns the cart or is an
    ///   admin.
    /// - [`ErrorKind::NotFound`] if the cart does not exist.
    /// - [`ErrorKind::Domain`] if the transition is not permitted from the
    ///   cart's current status.
    pub async fn transition_status(
        &self,
        cart_id: Id,
        new_status: CartStatus,
        principal: &Principal,
    ) -> VendixResult<Cart> {
        let cart = self
            .carts
            .find_by_id(cart_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::cart_not_found(cart_id))?;
        require_owner_or_admin(principal, cart.user_id)?;

        if !cart.status.can_transition_to(new_status) {
            return Err(VendixError::new(
                ErrorKind::Domain,
                format!("cannot transition cart from {:?} to {:?}", cart.status, new_status),
            ));
        }

        self.carts
            .update_status(cart_id, new_status)
            .await
            .map_err(RepoError::into_vendix_error)
    }

    /// Validate a cart for checkout without committing anything.
    ///
    /// `valid` is true iff the cart is `Active`, non-empty, every
    /// referenced product still exists, and every line's stock suffices.
    /// A warning (not fatal) is emitted per line where
    /// `stock < 2 * requested`.
    ///
    /// # Errors
    ///
    /// Propagates repository failures encountered while computing the
    /// snapshot; business-rule violations are reported in the returned
    /// [`CheckoutValidation`], not as an `Err`.
    pub async fn validate_for_checkout(&self, cart_id: Id) -> VendixResult<CheckoutValidation> {
        let cart = self
            .carts
            .find_by_id(cart_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::cart_not_found(cart_id))?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if cart.status != CartStatus::Active {
            errors.push(format!("cart is not active (status: {:?})", cart.status));
        }

        let lines = self.carts.list_lines(cart_id).await.map_err(RepoError::into_vendix_error)?;
        if lines.is_empty() {
            errors.push("cart is empty".to_string());
        }

        let mut summaries = Vec::with_capacity(lines.len());
        let mut subtotal = Decimal::ZERO;
        let mut item_count = 0u32;
        for line in &lines {
            match self
                .products
                .find_by_id(line.product_id)
                .await
                .map_err(RepoError::into_vendix_error)?
            {
                None => errors.push(format!("product {} no longer exists", line.product_id)),
                Some(product) => {
                    if (product.stock as i64) < line.quantity as i64 {
                        errors.push(format!(
                            "insufficient stock for product {}: available {}, requested {}",
                            product.id, product.stock, line.quantity
                        ));
                    } else if (product.stock as i64) < 2 * line.quantity as i64 {
                        warnings.push(format!(
                            "stock for product {} is low relative to the requested quantity",
                            product.id
                        ));
                    }
                    let line_total = product.price * Decimal::from(line.quantity);
                    subtotal += line_total;
                    item_count += line.quantity;
                    summaries.push(LineSummary {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: product.price,
                        line_total,
                    });
                }
            }
        }

        Ok(CheckoutValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
            total: CartTotal {
                subtotal,
                item_count,
                distinct_products: summaries.len(),
                lines: summaries,
            },
        })
    }

    /// Transition every `Active` cart last updated before `older_than` to
    /// `Abandoned`, returning the count affected.
    ///
    /// Supplements the distilled spec: the original service stubs this
    /// sweep as a TODO placeholder returning 0.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn abandon_stale_carts(&self, older_than: DateTime<Utc>) -> VendixResult<u64> {
        let stale = self
            .carts
            .list_stale(CartStatus::Active, older_than)
            .await
            .map_err(RepoError::into_vendix_error)?;
        let mut count = 0u64;
        for cart in stale {
            self.carts
                .update_status(cart.id, CartStatus::Abandoned)
                .await
                .map_err(RepoError::into_vendix_error)?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendix_cache::memory::InMemoryCache;
    use vendix_core::model::Role;
    use vendix_repo::InMemoryStore;

    async fn product(store: &InMemoryStore, name: &str, price: &str, stock: i64) -> Product {
        let now = Utc::now();
        ProductRepository::insert(
            store,
            Product {
                id: 0,
                name: name.into(),
                description: None,
                price: price.parse().unwrap(),
                stock,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap()
    }

    fn owner(user_id: Id) -> Principal {
        Principal {
            user_id,
            role: Role::Customer,
            jti: "t".into(),
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn add_line_rejects_insufficient_stock() {
        let store = Arc::new(InMemoryStore::new());
        let widget = product(&store, "Widget", "9.99", 1).await;
        let service = CartService::new(store.clone(), store.clone(), InMemoryCache::new());

        let err = service.add_line(1, widget.id, 2).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Domain);
    }

    #[tokio::test]
    async fn add_line_twice_accumulates_quantity() {
        let store = Arc::new(InMemoryStore::new());
        let widget = product(&store, "Widget", "9.99", 10).await;
        let service = CartService::new(store.clone(), store.clone(), InMemoryCache::new());

        service.add_line(1, widget.id, 2).await.unwrap();
        service.add_line(1, widget.id, 3).await.unwrap();

        let cart = service.get_or_create_active_cart(1).await.unwrap();
        let total = service.compute_total(cart.id).await.unwrap();
        assert_eq!(total.item_count, 5);
        assert_eq!(total.distinct_products, 1);
    }

    #[tokio::test]
    async fn validate_for_checkout_reports_low_stock_warning() {
        let store = Arc::new(InMemoryStore::new());
        let widget = product(&store, "Widget", "9.99", 3).await;
        let service = CartService::new(store.clone(), store.clone(), InMemoryCache::new());

        service.add_line(1, widget.id, 2).await.unwrap();
        let cart = service.get_or_create_active_cart(1).await.unwrap();
        let validation = service.validate_for_checkout(cart.id).await.unwrap();

        assert!(validation.valid);
        assert_eq!(validation.warnings.len(), 1);
    }

    #[tokio::test]
    async fn empty_cart_fails_checkout_validation() {
        let store = Arc::new(InMemoryStore::new());
        let service = CartService::new(store.clone(), store.clone(), InMemoryCache::new());
        let cart = service.get_or_create_active_cart(1).await.unwrap();
        let validation = service.validate_for_checkout(cart.id).await.unwrap();
        assert!(!validation.valid);
    }

    #[tokio::test]
    async fn transition_rejects_invalid_move() {
        let store = Arc::new(InMemoryStore::new());
        let service = CartService::new(store.clone(), store.clone(), InMemoryCache::new());
        let cart = service.get_or_create_active_cart(1).await.unwrap();

        service
            .transition_status(cart.id, CartStatus::Abandoned, &owner(1))
            .await
            .unwrap();

        let err = service
            .transition_status(cart.id, CartStatus::Converted, &owner(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Domain);
    }

    #[tokio::test]
    async fn abandon_stale_carts_sweeps_old_active_carts() {
        let store = Arc::new(InMemoryStore::new());
        let service = CartService::new(store.clone(), store.clone(), InMemoryCache::new());
        let cart = service.get_or_create_active_cart(1).await.unwrap();

        let affected = service.abandon_stale_carts(Utc::now() + chrono::Duration::seconds(1)).await.unwrap();
        assert_eq!(affected, 1);

        let reloaded = CartRepository::find_by_id(store.as_ref(), cart.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, CartStatus::Abandoned);
    }
}
