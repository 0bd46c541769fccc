//! Repository contracts and the atomic-execution combinator.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use vendix_core::model::{
    Cart, CartLine, CartStatus, DeliveryAddress, Id, Invoice, Product, Sale, SaleLine, User,
};

use crate::error::RepoError;

/// User persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by id.
    async fn find_by_id(&self, id: Id) -> Result<Option<User>, RepoError>;
    /// Look up a user by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Insert a new user, assigning it an id.
    ///
    /// Returns [`RepoError::Constraint`] if the email is already in use.
    async fn insert(&self, user: User) -> Result<User, RepoError>;
    /// Persist changes to an existing user.
    async fn update(&self, user: User) -> Result<User, RepoError>;
}

/// Delivery address persistence.
#[async_trait]
pub trait DeliveryAddressRepository: Send + Sync {
    /// Look up an address by id.
    async fn find_by_id(&self, id: Id) -> Result<Option<DeliveryAddress>, RepoError>;
    /// List every address owned by `user_id`.
    async fn list_for_user(&self, user_id: Id) -> Result<Vec<DeliveryAddress>, RepoError>;
    /// Insert a new address, assigning it an id.
    async fn insert(&self, address: DeliveryAddress) -> Result<DeliveryAddress, RepoError>;
    /// Persist changes to an existing address.
    async fn update(&self, address: DeliveryAddress) -> Result<DeliveryAddress, RepoError>;
    /// Delete an address by id.
    async fn delete(&self, id: Id) -> Result<(), RepoError>;
}

/// Product catalog persistence.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Look up a product by id.
    async fn find_by_id(&self, id: Id) -> Result<Option<Product>, RepoError>;
    /// Look up a product by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepoError>;
    /// List the full catalog.
    async fn list_all(&self) -> Result<Vec<Product>, RepoError>;
    /// Insert a new product, assigning it an id.
    ///
    /// Returns [`RepoError::Constraint`] if the name is already in use.
    async fn insert(&self, product: Product) -> Result<Product, RepoError>;
    /// Persist changes to an existing product.
    async fn update(&self, product: Product) -> Result<Product, RepoError>;
    /// Delete a product by id.
    async fn delete(&self, id: Id) -> Result<(), RepoError>;
}

/// Cart and cart-line persistence.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Look up a cart by id.
    async fn find_by_id(&self, id: Id) -> Result<Option<Cart>, RepoError>;
    /// Look up the user's currently active cart, if any. At most one
    /// exists per user.
    async fn find_active_for_user(&self, user_id: Id) -> Result<Option<Cart>, RepoError>;
    /// Insert a new cart, assigning it an id.
    async fn insert(&self, cart: Cart) -> Result<Cart, RepoError>;
    /// Transition a cart's status. The caller has already checked
    /// [`CartStatus::can_transition_to`].
    async fn update_status(&self, id: Id, status: CartStatus) -> Result<Cart, RepoError>;
    /// List every line item in a cart.
    async fn list_lines(&self, cart_id: Id) -> Result<Vec<CartLine>, RepoError>;
    /// Insert or update the line for `product_id` within `cart_id`,
    /// setting its quantity to exactly `quantity`.
    async fn upsert_line(&self, cart_id: Id, product_id: Id, quantity: u32) -> Result<CartLine, RepoError>;
    /// Remove the line for `product_id` within `cart_id`, if present.
    async fn remove_line(&self, cart_id: Id, product_id: Id) -> Result<(), RepoError>;
    /// Remove every line from `cart_id`.
    async fn clear_lines(&self, cart_id: Id) -> Result<(), RepoError>;
    /// List every cart in `status` last updated before `cutoff`.
    async fn list_stale(
        &self,
        status: CartStatus,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Cart>, RepoError>;
}

/// Sale persistence.
#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Look up a sale by id.
    async fn find_by_id(&self, id: Id) -> Result<Option<Sale>, RepoError>;
    /// List every sale line belonging to a sale.
    async fn list_lines(&self, sale_id: Id) -> Result<Vec<SaleLine>, RepoError>;
    /// Insert a sale together with its line items, assigning the sale an
    /// id. Intended to be called from within a [`WithTransaction`] scope.
    async fn insert(&self, sale: Sale, lines: Vec<SaleLine>) -> Result<Sale, RepoError>;
    /// List every sale belonging to `user_id`, most recent first.
    async fn list_for_user(&self, user_id: Id) -> Result<Vec<Sale>, RepoError>;
    /// List every sale in the optional `[from, to]` date range, most
    /// recent first.
    async fn list_all(
        &self,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<Sale>, RepoError>;
}

/// Invoice persistence.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Look up an invoice by id.
    async fn find_by_id(&self, id: Id) -> Result<Option<Invoice>, RepoError>;
    /// Insert a new invoice, assigning it an id.
    async fn insert(&self, invoice: Invoice) -> Result<Invoice, RepoError>;
    /// Persist changes to an existing invoice.
    async fn update(&self, invoice: Invoice) -> Result<Invoice, RepoError>;
    /// Delete an invoice by id.
    async fn delete(&self, id: Id) -> Result<(), RepoError>;
    /// List every invoice referencing any sale owned by `user_id`.
    async fn list_for_user(&self, user_id: Id) -> Result<Vec<Invoice>, RepoError>;
}

/// A boxed, `Send` future, used by [`WithTransaction`] since a generic
/// trait method can't return `impl Future` across an object-safe boundary.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Single-statement atomicity for multi-entity mutation (checkout being
/// the motivating case: stock re-read, sale insert, stock decrement, and
/// cart-status transition all happen inside one `with_transaction` call).
///
/// This is deliberately not `#[async_trait]`: a generic method with a
/// generic closure parameter isn't expressible through that macro, so the
/// signature is written out by hand in terms of [`BoxFuture`].
pub trait WithTransaction: Send + Sync {
    /// Run `f` with exclusive access to the store, committing its result
    /// or rolling back if `f` returns an error or its future is dropped
    /// before completion.
    fn with_transaction<'a, F, T>(&'a self, f: F) -> BoxFuture<'a, Result<T, RepoError>>
    where
        F: FnOnce(&'a Self) -> BoxFuture<'a, Result<T, RepoError>> + Send + 'a,
        T: Send + 'a,
        Self: Sized;
}
