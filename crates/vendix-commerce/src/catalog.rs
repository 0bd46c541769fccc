//! Product catalog service (C6): CRUD with cache-through reads and
//! invalidation on writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use vendix_auth::policy::require_admin;
use vendix_cache::{keys, Cache, TypedCache};
use vendix_core::model::{Id, Product};
use vendix_core::{ErrorKind, Principal, VendixError, VendixResult};
use vendix_repo::{ProductRepository, RepoError};

const GET_BY_ID_TTL: Duration = Duration::from_secs(3600);
const GET_ALL_TTL: Duration = Duration::from_secs(1800);

/// Fields accepted when creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Globally unique name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Non-negative unit price.
    pub price: Decimal,
    /// Non-negative starting stock.
    pub stock: i64,
}

/// Patch applied by [`CatalogService::update_product`]. `None` fields are
/// left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    /// New name.
    pub name: Option<String>,
    /// New description. `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New price.
    pub price: Option<Decimal>,
    /// New stock level.
    pub stock: Option<i64>,
}

/// Product catalog service.
#[derive(Debug)]
pub struct CatalogService<P, C: Cache> {
    products: Arc<P>,
    cache: TypedCache<C>,
}

impl<P: ProductRepository, C: Cache> CatalogService<P, C> {
    /// Construct a service over the given product repository and cache
    /// backend.
    pub fn new(products: Arc<P>, cache: C) -> Self {
        Self {
            products,
            cache: TypedCache::new(cache),
        }
    }

    /// Create a new product.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] unless `principal` is an admin.
    /// - [`ErrorKind::Conflict`] if the name is already in use.
    pub async fn create_product(&self, new: NewProduct, principal: &Principal) -> VendixResult<Product> {
        require_admin(principal)?;
        if new.price.is_sign_negative() {
            return Err(VendixError::validation("price must be non-negative"));
        }
        if new.stock < 0 {
            return Err(VendixError::validation("stock must be non-negative"));
        }

        let now = Utc::now();
        let name = new.name.clone();
        let product = Product {
            id: 0,
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            created_at: now,
            updated_at: now,
        };

        let created = self.products.insert(product).await.map_err(|e| match e {
            RepoError::Constraint(_) => VendixError::product_name_in_use(&name),
            other => other.into_vendix_error(),
        })?;

        self.cache.invalidate_pattern(keys::PRODUCTS_NS).await;
        Ok(created)
    }

    /// Fetch a product by id, cached for one hour.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotFound`] if no such product exists.
    pub async fn get_by_id(&self, id: Id) -> VendixResult<Product> {
        let key = keys::product_by_id(id);
        let products = Arc::clone(&self.products);
        self.cache
            .get_or_populate(&key, GET_BY_ID_TTL, || async move {
                products
                    .find_by_id(id)
                    .await
                    .map_err(RepoError::into_vendix_error)?
                    .ok_or_else(|| VendixError::product_not_found(id))
            })
            .await
    }

    /// List the full catalog, cached for 30 minutes.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn get_all(&self) -> VendixResult<Vec<Product>> {
        let key = keys::products_all();
        let products = Arc::clone(&self.products);
        self.cache
            .get_or_populate(&key, GET_ALL_TTL, || async move {
                products.list_all().await.map_err(RepoError::into_vendix_error)
            })
            .await
    }

    /// Apply `patch` to an existing product.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] unless `principal` is an admin.
    /// - [`ErrorKind::NotFound`] if no such product exists.
    /// - [`ErrorKind::Conflict`] if renaming collides with another product.
    pub async fn update_product(&self, id: Id, patch: ProductPatch, principal: &Principal) -> VendixResult<Product> {
        require_admin(principal)?;
        let mut product = self
            .products
            .find_by_id(id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::product_not_found(id))?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(price) = patch.price {
            if price.is_sign_negative() {
                return Err(VendixError::validation("price must be non-negative"));
            }
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            if stock < 0 {
                return Err(VendixError::validation("stock must be non-negative"));
            }
            product.stock = stock;
        }
        product.updated_at = Utc::now();

        let name_for_conflict = product.name.clone();
        let updated = self.products.update(product).await.map_err(|e| match e {
            RepoError::Constraint(_) => VendixError::product_name_in_use(&name_for_conflict),
            other => other.into_vendix_error(),
        })?;

        self.cache.invalidate(&keys::product_by_id(id)).await;
        self.cache.invalidate_pattern(keys::PRODUCTS_NS).await;
        Ok(updated)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] unless `principal` is an admin.
    /// - [`ErrorKind::NotFound`] if no such product exists.
    pub async fn delete_product(&self, id: Id, principal: &Principal) -> VendixResult<()> {
        require_admin(principal)?;
        self.products.delete(id).await.map_err(|e| match e {
            RepoError::NotFound(_) => VendixError::product_not_found(id),
            other => other.into_vendix_error(),
        })?;

        self.cache.invalidate(&keys::product_by_id(id)).await;
        self.cache.invalidate_pattern(keys::PRODUCTS_NS).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendix_cache::memory::InMemoryCache;
    use vendix_core::model::Role;
    use vendix_repo::InMemoryStore;

    fn service() -> CatalogService<InMemoryStore, InMemoryCache> {
        CatalogService::new(Arc::new(InMemoryStore::new()), InMemoryCache::new())
    }

    fn admin() -> Principal {
        Principal {
            user_id: 1,
            role: Role::Admin,
            jti: "t".into(),
            expires_at: 0,
        }
    }

    fn customer() -> Principal {
        Principal {
            user_id: 2,
            role: Role::Customer,
            jti: "t".into(),
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn non_admin_cannot_create_product() {
        let service = service();
        let err = service
            .create_product(
                NewProduct {
                    name: "Widget".into(),
                    description: None,
                    price: Decimal::new(999, 2),
                    stock: 10,
                },
                &customer(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips_through_cache() {
        let service = service();
        let created = service
            .create_product(
                NewProduct {
                    name: "Widget".into(),
                    description: Some("a widget".into()),
                    price: Decimal::new(999, 2),
                    stock: 10,
                },
                &admin(),
            )
            .await
            .unwrap();

        let fetched = service.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_invalidates_stale_cached_read() {
        let service = service();
        let created = service
            .create_product(
                NewProduct {
                    name: "Widget".into(),
                    description: None,
                    price: Decimal::new(999, 2),
                    stock: 10,
                },
                &admin(),
            )
            .await
            .unwrap();

        let _ = service.get_by_id(created.id).await.unwrap();

        service
            .update_product(
                created.id,
                ProductPatch {
                    price: Some(Decimal::new(1299, 2)),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();

        let refetched = service.get_by_id(created.id).await.unwrap();
        assert_eq!(refetched.price, Decimal::new(1299, 2));
    }

    #[tokio::test]
    async fn duplicate_product_name_is_rejected() {
        let service = service();
        service
            .create_product(
                NewProduct {
                    name: "Widget".into(),
                    description: None,
                    price: Decimal::ONE,
                    stock: 1,
                },
                &admin(),
            )
            .await
            .unwrap();

        let err = service
            .create_product(
                NewProduct {
                    name: "widget".into(),
                    description: None,
                    price: Decimal::ONE,
                    stock: 1,
                },
                &admin(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }
}
