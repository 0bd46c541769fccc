//! Checkout / sale service (C8): atomic conversion of a cart into a sale.
//!
//! Payment processing itself is a non-goal (no gateway integration); this
//! service only produces the sale record a gateway integration would be
//! triggered by.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use vendix_cache::{keys, Cache, TypedCache};
use vendix_core::model::{CartStatus, Id, Sale, SaleLine};
use vendix_core::{ErrorKind, VendixError, VendixResult};
use vendix_repo::{CartRepository, DeliveryAddressRepository, ProductRepository, RepoError, SaleRepository, WithTransaction};

use crate::invoice::InvoiceService;

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    /// The recorded sale.
    pub sale: Sale,
    /// Warning surfaced when `issue_invoice` was requested but invoice
    /// creation failed. Checkout itself still succeeds.
    pub invoice_warning: Option<String>,
}

/// Checkout service. `S` must implement every repository trait the
/// transaction touches, matching the in-memory store's single-struct
/// design: the transaction lock that provides atomicity is per-store, so
/// every entity it protects must live behind the same store instance.
#[derive(Debug)]
pub struct CheckoutService<S, C: Cache> {
    store: Arc<S>,
    cache: TypedCache<C>,
}

impl<S, C> CheckoutService<S, C>
where
    S: CartRepository
        + ProductRepository
        + SaleRepository
        + DeliveryAddressRepository
        + WithTransaction
        + Send
        + Sync
        + 'static,
    C: Cache,
{
    /// Construct a service over the given store and cache backend.
    pub fn new(store: Arc<S>, cache: C) -> Self {
        Self {
            store,
            cache: TypedCache::new(cache),
        }
    }

    /// Convert `cart_id` into a sale on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] if the cart does not belong to `user_id`.
    /// - [`ErrorKind::NotFound`] if the cart or delivery address does not exist.
    /// - [`ErrorKind::Domain`] (`CartNotActive`) if the cart is not `Active`.
    /// - [`ErrorKind::Domain`] (aggregated `SaleError`) if checkout
    ///   validation fails for any reason (empty cart, missing product,
    ///   insufficient stock).
    pub async fn create_sale_from_cart(
        &self,
        user_id: Id,
        cart_id: Id,
        delivery_address_id: Id,
    ) -> VendixResult<CheckoutSummary> {
        let cart = CartRepository::find_by_id(self.store.as_ref(), cart_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::cart_not_found(cart_id))?;
        if cart.user_id != user_id {
            return Err(VendixError::forbidden("cart belongs to another user"));
        }
        if cart.status != CartStatus::Active {
            return Err(VendixError::new(ErrorKind::Domain, "cart is not active"));
        }

        let address = DeliveryAddressRepository::find_by_id(self.store.as_ref(), delivery_address_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::address_not_found(delivery_address_id))?;
        if address.user_id != user_id {
            return Err(VendixError::forbidden("delivery address belongs to another user"));
        }

        validate_cart_lines(self.store.as_ref(), cart_id).await?;

        let store = Arc::clone(&self.store);
        let sale = store
            .with_transaction(move |s| {
                Box::pin(async move { run_checkout_transaction(s, user_id, cart_id).await })
            })
            .await
            .map_err(RepoError::into_vendix_error)?;

        self.cache.invalidate_pattern(keys::PRODUCTS_NS).await;
        self.cache.invalidate(&keys::cart_total(cart_id)).await;
        self.cache.invalidate_pattern(keys::ADMIN_SALES_NS).await;

        Ok(CheckoutSummary {
            sale,
            invoice_warning: None,
        })
    }

    /// [`Self::create_sale_from_cart`], additionally issuing an invoice for
    /// the new sale. Invoice-creation failure is reported as a warning on
    /// the returned summary, never as a checkout failure.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_sale_from_cart`].
    pub async fn create_sale_with_invoice<I: vendix_repo::InvoiceRepository>(
        &self,
        user_id: Id,
        cart_id: Id,
        delivery_address_id: Id,
        invoices: &InvoiceService<I>,
    ) -> VendixResult<CheckoutSummary> {
        let mut summary = self.create_sale_from_cart(user_id, cart_id, delivery_address_id).await?;
        if let Err(err) = invoices.create_invoice_unchecked(summary.sale.id, delivery_address_id).await {
            tracing::warn!(sale_id = summary.sale.id, error = %err, "checkout succeeded but invoice creation failed");
            summary.invoice_warning = Some(err.message);
        }
        Ok(summary)
    }
}

/// Pre-transaction validation surfacing empty-cart and insufficient-stock
/// failures as `ErrorKind::Domain` via the shared error helpers. Checked
/// again inside the transaction itself (`run_checkout_transaction`) since
/// stock can still move between this call and the transaction acquiring its
/// lock; that in-transaction check is the one that matters for correctness,
/// this one is for a cleaner error on the common case.
async fn validate_cart_lines<S>(store: &S, cart_id: Id) -> VendixResult<()>
where
    S: CartRepository + ProductRepository,
{
    let lines = CartRepository::list_lines(store, cart_id)
        .await
        .map_err(RepoError::into_vendix_error)?;
    if lines.is_empty() {
        return Err(VendixError::sale_error(&["cart is empty".to_string()]));
    }

    let mut errors = Vec::new();
    for line in &lines {
        match ProductRepository::find_by_id(store, line.product_id)
            .await
            .map_err(RepoError::into_vendix_error)?
        {
            None => errors.push(format!("product {} no longer exists", line.product_id)),
            Some(product) if product.stock < line.quantity as i64 => {
                errors.push(VendixError::insufficient_stock(product.id, product.stock, line.quantity as i64).message);
            }
            Some(_) => {}
        }
    }
    if !errors.is_empty() {
        return Err(VendixError::sale_error(&errors));
    }
    Ok(())
}

async fn run_checkout_transaction<S>(store: &S, user_id: Id, cart_id: Id) -> Result<Sale, RepoError>
where
    S: CartRepository + ProductRepository + SaleRepository,
{
    let lines = CartRepository::list_lines(store, cart_id).await?;
    if lines.is_empty() {
        return Err(RepoError::Domain("cart is empty".into()));
    }

    let mut errors = Vec::new();
    let mut sale_lines = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    let mut decremented = Vec::with_capacity(lines.len());

    for line in &lines {
        let product = match ProductRepository::find_by_id(store, line.product_id).await? {
            Some(p) => p,
            None => {
                errors.push(format!("product {} no longer exists", line.product_id));
                continue;
            }
        };
        if product.stock < line.quantity as i64 {
            errors.push(format!(
                "insufficient stock for product {}: available {}, requested {}",
                product.id, product.stock, line.quantity
            ));
            continue;
        }
        total += product.price * Decimal::from(line.quantity);
        sale_lines.push(SaleLine {
            sale_id: 0,
            product_id: product.id,
            quantity: line.quantity,
            price: product.price,
        });
        decremented.push((product, line.quantity));
    }

    if !errors.is_empty() {
        return Err(RepoError::Domain(errors.join("; ")));
    }

    let now = Utc::now();
    let sale = SaleRepository::insert(
        store,
        Sale {
            id: 0,
            user_id,
            total,
            sale_date: now,
            created_at: now,
            updated_at: now,
        },
        sale_lines,
    )
    .await?;

    for (mut product, qty) in decremented {
        product.stock -= qty as i64;
        product.updated_at = now;
        ProductRepository::update(store, product).await?;
    }

    CartRepository::update_status(store, cart_id, CartStatus::Converted).await?;

    Ok(sale)
}
