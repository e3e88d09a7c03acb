//! Integration test harness for Vendora.
//!
//! Tests run against a live `PostgreSQL` and are gated on
//! `TEST_DATABASE_URL`: when the variable is unset every test returns early
//! and reports success, so the suite is safe to run without a provisioned
//! database.
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://localhost/vendora_test cargo test -p vendora-integration-tests
//! ```
//!
//! Each test creates its own store, so tests sharing one database don't
//! interfere with each other.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use vendora_core::{AttributeId, CategoryId, CustomerId, StoreId, VariantId};
use vendora_storefront::models::catalog::{AttributePair, CreateProductInput, VariantInput};

/// A live test database with migrations applied.
pub struct TestDb {
    pub pool: PgPool,
}

impl TestDb {
    /// Connect to `TEST_DATABASE_URL` and apply migrations.
    ///
    /// Returns `None` when the variable is unset, which callers treat as
    /// "skip this test".
    ///
    /// # Panics
    ///
    /// Panics if the database is unreachable or migrations fail: a set
    /// `TEST_DATABASE_URL` pointing at a broken database is an error, not a
    /// skip.
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;

        let pool = PgPool::connect(&url)
            .await
            .expect("TEST_DATABASE_URL set but unreachable");
        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .expect("migrations failed");

        Some(Self { pool })
    }

    /// Create an isolated store for one test.
    pub async fn create_store(&self) -> StoreId {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO store (name) VALUES ($1) RETURNING id",
        )
        .bind(format!("test-store-{}", Uuid::new_v4()))
        .fetch_one(&self.pool)
        .await
        .expect("insert store");

        StoreId::new(id)
    }

    /// Create a category under a store.
    pub async fn create_category(&self, store_id: StoreId, name: &str) -> CategoryId {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO category (store_id, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(store_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .expect("insert category");

        CategoryId::new(id)
    }

    /// Declare an attribute on a category's schema.
    pub async fn create_attribute(
        &self,
        category_id: CategoryId,
        name: &str,
        is_required: bool,
    ) -> AttributeId {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO attribute (category_id, name, is_required)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(category_id)
        .bind(name)
        .bind(is_required)
        .fetch_one(&self.pool)
        .await
        .expect("insert attribute");

        AttributeId::new(id)
    }

    /// Create a customer in a store.
    pub async fn create_customer(&self, store_id: StoreId) -> CustomerId {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO customer (store_id, email) VALUES ($1, $2) RETURNING id",
        )
        .bind(store_id)
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .fetch_one(&self.pool)
        .await
        .expect("insert customer");

        CustomerId::new(id)
    }

    /// Create a shopping session, optionally bound to a customer.
    pub async fn create_session(
        &self,
        store_id: StoreId,
        customer_id: Option<CustomerId>,
    ) -> Uuid {
        let session_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO customer_session (id, store_id, customer_id) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(store_id)
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .expect("insert session");

        session_id
    }

    /// Current stock on a variant row.
    pub async fn variant_stock(&self, variant_id: VariantId) -> i32 {
        sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM product_variant WHERE id = $1")
            .bind(variant_id)
            .fetch_one(&self.pool)
            .await
            .expect("variant stock")
    }

    /// Number of cart items in a session's cart.
    pub async fn cart_item_count(&self, store_id: StoreId, session_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cart_item ci
             JOIN cart c ON c.id = ci.cart_id
             WHERE c.store_id = $1 AND c.session_id = $2",
        )
        .bind(store_id)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .expect("cart item count")
    }
}

/// Build a variant submission payload.
#[must_use]
pub fn variant_input(
    sku: &str,
    price: Decimal,
    stock: i32,
    attributes: &[(AttributeId, &str)],
) -> VariantInput {
    VariantInput {
        sku: sku.to_owned(),
        price,
        stock,
        attributes: attributes
            .iter()
            .map(|(attribute_id, value)| AttributePair {
                attribute_id: *attribute_id,
                value: (*value).to_owned(),
            })
            .collect(),
    }
}

/// Build a product creation payload.
#[must_use]
pub fn product_input(
    category_id: CategoryId,
    name: &str,
    brand: &str,
    variant: VariantInput,
) -> CreateProductInput {
    CreateProductInput {
        category_id,
        name: name.to_owned(),
        slug: None,
        description: None,
        brand: brand.to_owned(),
        variant,
    }
}
