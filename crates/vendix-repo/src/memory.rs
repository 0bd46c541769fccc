//! In-memory reference implementation of every repository trait.
//!
//! `with_transaction` serializes every multi-step mutation through a single
//! [`tokio::sync::Mutex`], the async analogue of taking a serializable
//! transaction against a real database: at most one transaction makes
//! progress at a time, so two concurrent checkouts racing for the last
//! unit of a product cannot both observe sufficient stock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use vendix_core::model::{
    Cart, CartLine, CartStatus, DeliveryAddress, Id, Invoice, Product, Sale, SaleLine, User,
};

use crate::error::RepoError;
use crate::traits::{
    BoxFuture, CartRepository, DeliveryAddressRepository, InvoiceRepository, ProductRepository,
    SaleRepository, UserRepository, WithTransaction,
};

/// In-memory, single-process store implementing every repository trait.
#[derive(Debug)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Id, User>>,
    addresses: RwLock<HashMap<Id, DeliveryAddress>>,
    products: RwLock<HashMap<Id, Product>>,
    carts: RwLock<HashMap<Id, Cart>>,
    cart_lines: RwLock<HashMap<Id, Vec<CartLine>>>,
    sales: RwLock<HashMap<Id, Sale>>,
    sale_lines: RwLock<HashMap<Id, Vec<SaleLine>>>,
    invoices: RwLock<HashMap<Id, Invoice>>,
    next_id: AtomicU64,
    transaction_lock: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            addresses: RwLock::new(HashMap::new()),
            products: RwLock::new(HashMap::new()),
            carts: RwLock::new(HashMap::new()),
            cart_lines: RwLock::new(HashMap::new()),
            sales: RwLock::new(HashMap::new()),
            sale_lines: RwLock::new(HashMap::new()),
            invoices: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            transaction_lock: Mutex::new(()),
        }
    }
}

impl InMemoryStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> Id {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let needle = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn insert(&self, mut user: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        let needle = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == needle) {
            return Err(RepoError::Constraint(format!("email '{}' already in use", user.email)));
        }
        user.id = self.allocate_id();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepoError::NotFound(format!("user {}", user.id)));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait::async_trait]
impl DeliveryAddressRepository for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<DeliveryAddress>, RepoError> {
        Ok(self.addresses.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Id) -> Result<Vec<DeliveryAddress>, RepoError> {
        Ok(self
            .addresses
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, mut address: DeliveryAddress) -> Result<DeliveryAddress, RepoError> {
        address.id = self.allocate_id();
        self.addresses.write().await.insert(address.id, address.clone());
        Ok(address)
    }

    async fn update(&self, address: DeliveryAddress) -> Result<DeliveryAddress, RepoError> {
        let mut addresses = self.addresses.write().await;
        if !addresses.contains_key(&address.id) {
            return Err(RepoError::NotFound(format!("delivery address {}", address.id)));
        }
        addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        self.addresses
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(format!("delivery address {id}")))
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Product>, RepoError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepoError> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepoError> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn insert(&self, mut product: Product) -> Result<Product, RepoError> {
        let mut products = self.products.write().await;
        if products.values().any(|p| p.name.eq_ignore_ascii_case(&product.name)) {
            return Err(RepoError::Constraint(format!(
                "product name '{}' already in use",
                product.name
            )));
        }
        product.id = self.allocate_id();
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, product: Product) -> Result<Product, RepoError> {
        let mut products = self.products.write().await;
        if !products.contains_key(&product.id) {
            return Err(RepoError::NotFound(format!("product {}", product.id)));
        }
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        self.products
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(format!("product {id}")))
    }
}

#[async_trait::async_trait]
impl CartRepository for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Cart>, RepoError> {
        Ok(self.carts.read().await.get(&id).cloned())
    }

    async fn find_active_for_user(&self, user_id: Id) -> Result<Option<Cart>, RepoError> {
        Ok(self
            .carts
            .read()
            .await
            .values()
            .find(|c| c.user_id == user_id && c.status == CartStatus::Active)
            .cloned())
    }

    async fn insert(&self, mut cart: Cart) -> Result<Cart, RepoError> {
        cart.id = self.allocate_id();
        self.carts.write().await.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn update_status(&self, id: Id, status: CartStatus) -> Result<Cart, RepoError> {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(&id).ok_or_else(|| RepoError::NotFound(format!("cart {id}")))?;
        cart.status = status;
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn list_lines(&self, cart_id: Id) -> Result<Vec<CartLine>, RepoError> {
        Ok(self.cart_lines.read().await.get(&cart_id).cloned().unwrap_or_default())
    }

    async fn upsert_line(&self, cart_id: Id, product_id: Id, quantity: u32) -> Result<CartLine, RepoError> {
        let mut lines = self.cart_lines.write().await;
        let cart_lines = lines.entry(cart_id).or_default();
        let line = if let Some(existing) = cart_lines.iter_mut().find(|l| l.product_id == product_id) {
            existing.quantity = quantity;
            existing.updated_at = Utc::now();
            existing.clone()
        } else {
            let new_line = CartLine {
                cart_id,
                product_id,
                quantity,
                updated_at: Utc::now(),
            };
            cart_lines.push(new_line.clone());
            new_line
        };
        Ok(line)
    }

    async fn remove_line(&self, cart_id: Id, product_id: Id) -> Result<(), RepoError> {
        if let Some(cart_lines) = self.cart_lines.write().await.get_mut(&cart_id) {
            cart_lines.retain(|l| l.product_id != product_id);
        }
        Ok(())
    }

    async fn clear_lines(&self, cart_id: Id) -> Result<(), RepoError> {
        self.cart_lines.write().await.remove(&cart_id);
        Ok(())
    }

    async fn list_stale(&self, status: CartStatus, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, RepoError> {
        Ok(self
            .carts
            .read()
            .await
            .values()
            .filter(|c| c.status == status && c.updated_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl SaleRepository for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Sale>, RepoError> {
        Ok(self.sales.read().await.get(&id).cloned())
    }

    async fn list_lines(&self, sale_id: Id) -> Result<Vec<SaleLine>, RepoError> {
        Ok(self.sale_lines.read().await.get(&sale_id).cloned().unwrap_or_default())
    }

    async fn insert(&self, mut sale: Sale, mut lines: Vec<SaleLine>) -> Result<Sale, RepoError> {
        sale.id = self.allocate_id();
        for line in &mut lines {
            line.sale_id = sale.id;
        }
        self.sales.write().await.insert(sale.id, sale.clone());
        self.sale_lines.write().await.insert(sale.id, lines);
        Ok(sale)
    }

    async fn list_for_user(&self, user_id: Id) -> Result<Vec<Sale>, RepoError> {
        let mut sales: Vec<Sale> = self
            .sales
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date));
        Ok(sales)
    }

    async fn list_all(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sale>, RepoError> {
        let mut sales: Vec<Sale> = self
            .sales
            .read()
            .await
            .values()
            .filter(|s| from.map_or(true, |f| s.sale_date >= f) && to.map_or(true, |t| s.sale_date <= t))
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date));
        Ok(sales)
    }
}

#[async_trait::async_trait]
impl InvoiceRepository for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Invoice>, RepoError> {
        Ok(self.invoices.read().await.get(&id).cloned())
    }

    async fn insert(&self, mut invoice: Invoice) -> Result<Invoice, RepoError> {
        invoice.id = self.allocate_id();
        self.invoices.write().await.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn update(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        let mut invoices = self.invoices.write().await;
        if !invoices.contains_key(&invoice.id) {
            return Err(RepoError::NotFound(format!("invoice {}", invoice.id)));
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        self.invoices
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(format!("invoice {id}")))
    }

    async fn list_for_user(&self, user_id: Id) -> Result<Vec<Invoice>, RepoError> {
        let sales = self.sales.read().await;
        let owned_sale_ids: std::collections::HashSet<Id> = sales
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect();
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .filter(|inv| owned_sale_ids.contains(&inv.sale_id))
            .cloned()
            .collect())
    }
}

impl WithTransaction for InMemoryStore {
    fn with_transaction<'a, F, T>(&'a self, f: F) -> BoxFuture<'a, Result<T, RepoError>>
    where
        F: FnOnce(&'a Self) -> BoxFuture<'a, Result<T, RepoError>> + Send + 'a,
        T: Send + 'a,
    {
        Box::pin(async move {
            let _guard = self.transaction_lock.lock().await;
            f(self).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendix_core::model::Role;

    fn new_user(email: &str) -> User {
        User {
            id: 0,
            email: email.to_string(),
            password_hash: "hash".into(),
            name: "Test User".into(),
            phone: None,
            role: Role::Customer,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        UserRepository::insert(&store, new_user("a@x.com")).await.unwrap();
        let err = UserRepository::insert(&store, new_user("A@X.COM")).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn transaction_serializes_concurrent_callers() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let product = ProductRepository::insert(
            store.as_ref(),
            Product {
                id: 0,
                name: "Widget".into(),
                description: None,
                price: rust_decimal::Decimal::new(999, 2),
                stock: 1,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let product_id = product.id;
            handles.push(tokio::spawn(async move {
                store
                    .with_transaction(move |s| {
                        Box::pin(async move {
                            let current = ProductRepository::find_by_id(s, product_id)
                                .await?
                                .ok_or_else(|| RepoError::NotFound("product".into()))?;
                            if current.stock < 1 {
                                return Err(RepoError::Other("out of stock".into()));
                            }
                            let mut updated = current;
                            updated.stock -= 1;
                            ProductRepository::update(s, updated).await
                        })
                    })
                    .await
            }));
        }

        let results = futures_join_all(handles).await;
        let successes = results.into_iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
        assert_eq!(successes, 1, "only one racer should have decremented the single unit of stock");
    }

    async fn futures_join_all<T>(
        handles: Vec<tokio::task::JoinHandle<T>>,
    ) -> Vec<Result<T, tokio::task::JoinError>> {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await);
        }
        results
    }
}
