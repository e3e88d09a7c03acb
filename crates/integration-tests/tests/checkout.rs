//! Cart and checkout integration tests: totals, atomicity, stock
//! serialization under concurrency.
//!
//! Gated on `TEST_DATABASE_URL`; each test returns early when unset.

use rust_decimal::Decimal;
use uuid::Uuid;

use vendora_core::{ProductId, StoreId, VariantId};
use vendora_integration_tests::{TestDb, product_input, variant_input};
use vendora_storefront::db::OrderRepository;
use vendora_storefront::services::{
    CartError, CartService, CatalogService, CheckoutError, CheckoutService,
};
use vendora_storefront::storage::LocalObjectStore;

/// Seed one product with a single variant and return its ids.
async fn seed_variant(
    db: &TestDb,
    store_id: StoreId,
    price: Decimal,
    stock: i32,
) -> (ProductId, VariantId) {
    let category_id = db.create_category(store_id, "shirts").await;
    let color = db.create_attribute(category_id, "color", true).await;

    let dir = std::env::temp_dir().join(format!("vendora-it-{}", Uuid::new_v4()));
    let media = LocalObjectStore::new(dir, "/media");

    let write = CatalogService::new(&db.pool, &media)
        .create_product(
            store_id,
            &product_input(
                category_id,
                "Tee",
                "Acme",
                variant_input("TEE-R", price, stock, &[(color, "red")]),
            ),
            None,
        )
        .await
        .expect("seed product");

    (write.product.id, write.variant.id)
}

#[tokio::test]
async fn checkout_converts_cart_to_completed_order() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let (product_id, variant_id) =
        seed_variant(&db, store_id, Decimal::new(1999, 2), 10).await;

    let customer_id = db.create_customer(store_id).await;
    let session_id = db.create_session(store_id, Some(customer_id)).await;

    CartService::new(&db.pool)
        .add_item(store_id, session_id, variant_id, 3)
        .await
        .expect("add item");

    let order_id = CheckoutService::new(&db.pool)
        .checkout(store_id, session_id, "card")
        .await
        .expect("checkout");

    let repo = OrderRepository::new(&db.pool);
    let order = repo
        .get(store_id, order_id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(order.status, "completed");
    assert_eq!(order.total, Decimal::new(5997, 2));

    let items = repo.list_items(order_id).await.expect("items");
    assert_eq!(items.len(), 1);
    let line = items.first().expect("line");
    assert_eq!(line.quantity, 3);
    assert_eq!(line.unit_price, Decimal::new(1999, 2));
    assert_eq!(line.subtotal, Decimal::new(5997, 2));

    let payments = repo.list_payments(order_id).await.expect("payments");
    assert_eq!(payments.len(), 1);
    let payment = payments.first().expect("payment");
    assert_eq!(payment.status, "captured");
    assert_eq!(payment.amount, order.total);
    assert!(payment.transaction_ref.starts_with("TXN-"));

    // Stock deducted on both the variant and the product aggregate.
    assert_eq!(db.variant_stock(variant_id).await, 7);
    let product_stock =
        sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM product WHERE id = $1")
            .bind(product_id)
            .fetch_one(&db.pool)
            .await
            .expect("product stock");
    assert_eq!(product_stock, 7);

    // Cart emptied.
    assert_eq!(db.cart_item_count(store_id, session_id).await, 0);
}

#[tokio::test]
async fn cart_price_snapshot_survives_later_price_changes() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let (_, variant_id) = seed_variant(&db, store_id, Decimal::new(1000, 2), 10).await;

    let customer_id = db.create_customer(store_id).await;
    let session_id = db.create_session(store_id, Some(customer_id)).await;

    CartService::new(&db.pool)
        .add_item(store_id, session_id, variant_id, 2)
        .await
        .expect("add item");

    sqlx::query("UPDATE product_variant SET price = $1 WHERE id = $2")
        .bind(Decimal::new(9999, 2))
        .bind(variant_id)
        .execute(&db.pool)
        .await
        .expect("reprice");

    let order_id = CheckoutService::new(&db.pool)
        .checkout(store_id, session_id, "card")
        .await
        .expect("checkout");

    let order = OrderRepository::new(&db.pool)
        .get(store_id, order_id)
        .await
        .expect("get order")
        .expect("order exists");
    // Total uses the unit price captured at add time.
    assert_eq!(order.total, Decimal::new(2000, 2));
}

#[tokio::test]
async fn re_adding_a_variant_accumulates_quantity() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let (_, variant_id) = seed_variant(&db, store_id, Decimal::new(500, 2), 10).await;

    let customer_id = db.create_customer(store_id).await;
    let session_id = db.create_session(store_id, Some(customer_id)).await;

    let service = CartService::new(&db.pool);
    service
        .add_item(store_id, session_id, variant_id, 2)
        .await
        .expect("first add");
    service
        .add_item(store_id, session_id, variant_id, 3)
        .await
        .expect("second add");

    let cart = service.get_cart(store_id, session_id).await.expect("view");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items.first().expect("line").quantity, 5);
    assert_eq!(cart.total, Decimal::new(2500, 2));
}

#[tokio::test]
async fn anonymous_sessions_cannot_check_out() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let (_, variant_id) = seed_variant(&db, store_id, Decimal::new(500, 2), 10).await;

    let session_id = db.create_session(store_id, None).await;

    // Anonymous sessions may carry a cart...
    CartService::new(&db.pool)
        .add_item(store_id, session_id, variant_id, 1)
        .await
        .expect("anonymous add");

    // ...but checkout requires a customer.
    let err = CheckoutService::new(&db.pool)
        .checkout(store_id, session_id, "card")
        .await
        .expect_err("must reject");
    assert!(matches!(err, CheckoutError::InvalidSession));

    // Nothing was deducted or cleared.
    assert_eq!(db.variant_stock(variant_id).await, 10);
    assert_eq!(db.cart_item_count(store_id, session_id).await, 1);
}

#[tokio::test]
async fn checkout_without_a_cart_is_rejected() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let customer_id = db.create_customer(store_id).await;
    let session_id = db.create_session(store_id, Some(customer_id)).await;

    let err = CheckoutService::new(&db.pool)
        .checkout(store_id, session_id, "card")
        .await
        .expect_err("no cart");
    assert!(matches!(err, CheckoutError::CartNotFound));
}

#[tokio::test]
async fn checkout_with_an_emptied_cart_is_rejected() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let (_, variant_id) = seed_variant(&db, store_id, Decimal::new(1000, 2), 10).await;

    let customer_id = db.create_customer(store_id).await;
    let session_id = db.create_session(store_id, Some(customer_id)).await;

    CartService::new(&db.pool)
        .add_item(store_id, session_id, variant_id, 1)
        .await
        .expect("add item");
    CheckoutService::new(&db.pool)
        .checkout(store_id, session_id, "card")
        .await
        .expect("first checkout");

    // The cart row survives checkout with its items cleared; a repeat
    // submission must not place a second order.
    let err = CheckoutService::new(&db.pool)
        .checkout(store_id, session_id, "card")
        .await
        .expect_err("cart is empty");
    assert!(matches!(err, CheckoutError::CartEmpty));
    assert_eq!(db.variant_stock(variant_id).await, 9);
}

#[tokio::test]
async fn cart_add_rejects_unknown_variant_and_bad_quantity() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let customer_id = db.create_customer(store_id).await;
    let session_id = db.create_session(store_id, Some(customer_id)).await;

    let service = CartService::new(&db.pool);

    let err = service
        .add_item(store_id, session_id, VariantId::new(999_999), 1)
        .await
        .expect_err("unknown variant");
    assert!(matches!(err, CartError::VariantNotFound));

    let err = service
        .add_item(store_id, session_id, VariantId::new(1), 0)
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, CartError::InvalidQuantity));
}

#[tokio::test]
async fn concurrent_checkouts_serialize_on_stock() {
    let Some(db) = TestDb::connect().await else { return };
    let store_id = db.create_store().await;
    let (_, variant_id) = seed_variant(&db, store_id, Decimal::new(1000, 2), 5).await;

    // Two customers both want all five units.
    let mut sessions = Vec::new();
    for _ in 0..2 {
        let customer_id = db.create_customer(store_id).await;
        let session_id = db.create_session(store_id, Some(customer_id)).await;
        CartService::new(&db.pool)
            .add_item(store_id, session_id, variant_id, 5)
            .await
            .expect("add");
        sessions.push(session_id);
    }

    let service_a = CheckoutService::new(&db.pool);
    let service_b = CheckoutService::new(&db.pool);
    let a = service_a.checkout(store_id, sessions[0], "card");
    let b = service_b.checkout(store_id, sessions[1], "card");
    let (a, b) = tokio::join!(a, b);

    // Row locks guarantee exactly one order; the loser sees OutOfStock.
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "a: {a:?}, b: {b:?}");
    let failure = if a.is_err() { a } else { b };
    assert!(matches!(failure, Err(CheckoutError::OutOfStock(v)) if v == variant_id));

    // Stock never goes negative.
    assert_eq!(db.variant_stock(variant_id).await, 0);
}
