//! End-to-end commerce scenarios exercising the in-memory repository stack
//! top to bottom: admin catalog management, cart assembly, checkout, and
//! invoicing, all as a single customer journey would hit them.

use std::sync::Arc;

use rust_decimal::Decimal;

use vendix_cache::memory::InMemoryCache;
use vendix_commerce::analytics::AnalyticsService;
use vendix_commerce::cart::CartService;
use vendix_commerce::catalog::{CatalogService, NewProduct, ProductPatch};
use vendix_commerce::checkout::CheckoutService;
use vendix_commerce::invoice::InvoiceService;
use vendix_commerce::users::{RegisterRequest, UserService};
use vendix_core::model::Role;
use vendix_core::{ErrorKind, Principal};
use vendix_repo::InMemoryStore;

fn principal_for(role: Role, user_id: u64) -> Principal {
    Principal {
        user_id,
        role,
        jti: "t".into(),
        expires_at: 0,
    }
}

#[tokio::test]
async fn admin_creates_product_customer_checks_out_and_receives_invoice() {
    let store = Arc::new(InMemoryStore::new());
    let users = UserService::new(store.clone(), store.clone());
    let catalog = CatalogService::new(store.clone(), InMemoryCache::new());
    let carts = CartService::new(store.clone(), store.clone(), InMemoryCache::new());
    let checkout = CheckoutService::new(store.clone(), InMemoryCache::new());
    let invoices = InvoiceService::new(store.clone());

    let admin = users
        .register(
            RegisterRequest {
                email: "admin@vendix.test".into(),
                password: "admin-password".into(),
                name: "Admin".into(),
                phone: None,
                role: Role::Admin,
            },
            None,
        )
        .await
        .unwrap();
    let admin_principal = principal_for(Role::Admin, admin.id);

    let customer = users
        .register(
            RegisterRequest {
                email: "customer@vendix.test".into(),
                password: "customer-password".into(),
                name: "Customer".into(),
                phone: None,
                role: Role::Customer,
            },
            None,
        )
        .await
        .unwrap();
    let customer_principal = principal_for(Role::Customer, customer.id);

    let product = catalog
        .create_product(
            NewProduct {
                name: "Keyboard".into(),
                description: Some("Mechanical".into()),
                price: Decimal::new(7999, 2),
                stock: 5,
            },
            &admin_principal,
        )
        .await
        .unwrap();

    let address = users
        .add_address(
            customer.id,
            "1 Test St".into(),
            "Testville".into(),
            "00000".into(),
            "US".into(),
            &customer_principal,
        )
        .await
        .unwrap();

    carts.add_line(customer.id, product.id, 2).await.unwrap();
    let cart = carts.get_or_create_active_cart(customer.id).await.unwrap();

    let validation = carts.validate_for_checkout(cart.id).await.unwrap();
    assert!(validation.valid);

    let summary = checkout
        .create_sale_with_invoice(customer.id, cart.id, address.id, &invoices)
        .await
        .unwrap();
    assert_eq!(summary.sale.total, Decimal::new(15998, 2));
    assert!(summary.invoice_warning.is_none());

    let refreshed_product = catalog.get_by_id(product.id).await.unwrap();
    assert_eq!(refreshed_product.stock, 3);

    let analytics = AnalyticsService::new(store.clone(), InMemoryCache::new());
    let report = analytics.sales_report(None, None, &admin_principal).await.unwrap();
    assert_eq!(report.total_sales, 1);
    assert_eq!(report.total_revenue, Decimal::new(15998, 2));
}

#[tokio::test]
async fn checkout_rejects_insufficient_stock_without_mutating_anything() {
    let store = Arc::new(InMemoryStore::new());
    let catalog = CatalogService::new(store.clone(), InMemoryCache::new());
    let carts = CartService::new(store.clone(), store.clone(), InMemoryCache::new());
    let checkout = CheckoutService::new(store.clone(), InMemoryCache::new());
    let users = UserService::new(store.clone(), store.clone());

    let admin_principal = principal_for(Role::Admin, 1);
    let product = catalog
        .create_product(
            NewProduct {
                name: "Rare Widget".into(),
                description: None,
                price: Decimal::ONE,
                stock: 1,
            },
            &admin_principal,
        )
        .await
        .unwrap();

    let customer_principal = principal_for(Role::Customer, 2);
    let address = users
        .add_address(
            2,
            "1 Test St".into(),
            "Testville".into(),
            "00000".into(),
            "US".into(),
            &customer_principal,
        )
        .await
        .unwrap();

    carts.add_line(2, product.id, 1).await.unwrap();
    let cart = carts.get_or_create_active_cart(2).await.unwrap();

    // A second customer's cart also wants the last unit — cart-level
    // admission already forbids this since `add_line` checks stock, so we
    // simulate the race by draining stock out from under the first cart
    // via a direct admin update between validation and checkout.
    catalog
        .update_product(
            product.id,
            ProductPatch {
                stock: Some(0),
                ..Default::default()
            },
            &admin_principal,
        )
        .await
        .unwrap();

    let err = checkout.create_sale_from_cart(2, cart.id, address.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Domain);

    let cart_after = carts.get_or_create_active_cart(2).await.unwrap();
    assert_eq!(cart_after.id, cart.id);
    assert_eq!(cart_after.status, vendix_core::model::CartStatus::Active);
}
