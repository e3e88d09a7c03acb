//! Dynamic, injection-safe assembly of the product listing query.
//!
//! The listing endpoint accepts an open-ended set of facet filters
//! (category, price range, brand, arbitrary named attributes). Everything is
//! folded into one parameterized SELECT: fragments and bound values are
//! collected in lock-step by [`ListingQuery::build`], so placeholder numbers
//! and argument positions cannot diverge. No value is ever interpolated into
//! the SQL text.
//!
//! Multi-value semantics: several values for the *same* attribute name
//! become one join constrained with `value = ANY($n)` (OR over values);
//! distinct attribute names each add their own join (AND across names).

use rust_decimal::Decimal;
use sqlx::PgPool;

use vendora_core::{AttributeId, CategoryId, StoreId};

use super::RepositoryError;
use crate::models::catalog::ProductListing;

/// Default page when the caller supplies none or garbage.
pub const DEFAULT_PAGE: i64 = 1;
/// Default page size.
pub const DEFAULT_LIMIT: i64 = 20;
/// Hard ceiling on page size; out-of-range values fall back to the default.
pub const MAX_LIMIT: i64 = 200;

/// Number of parameters in the fixed base query (store id, limit, offset).
const FIXED_PARAMS: usize = 3;

/// One resolved facet filter: attribute id plus the requested values.
#[derive(Debug, Clone)]
pub struct AttributeFilter {
    pub attribute_id: AttributeId,
    pub values: Vec<String>,
}

/// Listing filter set, already resolved (attribute names mapped to ids).
#[derive(Debug, Clone, Default)]
pub struct ListingFilters {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    pub attributes: Vec<AttributeFilter>,
}

/// A bound value in the assembled statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingArg {
    BigInt(i64),
    Text(String),
    TextArray(Vec<String>),
    Price(Decimal),
}

/// An assembled listing statement: SQL text plus positionally matched args.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    sql: String,
    args: Vec<ListingArg>,
}

impl ListingQuery {
    /// Assemble the listing statement for one store and filter set.
    ///
    /// Fragments are appended in a stable order: attribute joins first, then
    /// category, price-range, and brand predicates. One running placeholder
    /// counter starts after the three fixed parameters.
    #[must_use]
    pub fn build(store_id: StoreId, filters: &ListingFilters) -> Self {
        let page = normalize_page(filters.page);
        let limit = normalize_limit(filters.limit);
        let offset = (page - 1) * limit;

        let mut args = vec![
            ListingArg::BigInt(store_id.as_i64()),
            ListingArg::BigInt(limit),
            ListingArg::BigInt(offset),
        ];
        let mut joins = String::new();
        let mut predicates = String::new();
        let mut placeholder = FIXED_PARAMS + 1;

        for (i, filter) in filters.attributes.iter().enumerate() {
            let alias = format!("va{i}");
            joins.push_str(&format!(
                "\nJOIN variant_attribute {alias}\n  ON {alias}.product_id = p.id\n \
                 AND {alias}.attribute_id = ${placeholder}\n \
                 AND {alias}.value = ANY(${next})",
                next = placeholder + 1,
            ));
            args.push(ListingArg::BigInt(filter.attribute_id.as_i64()));
            args.push(ListingArg::TextArray(filter.values.clone()));
            placeholder += 2;
        }

        if let Some(category_id) = filters.category_id {
            predicates.push_str(&format!(" AND p.category_id = ${placeholder}"));
            args.push(ListingArg::BigInt(category_id.as_i64()));
            placeholder += 1;
        }

        match (filters.min_price, filters.max_price) {
            (Some(min), Some(max)) => {
                predicates.push_str(&format!(
                    " AND (dv.price >= ${placeholder} AND dv.price <= ${next})",
                    next = placeholder + 1,
                ));
                args.push(ListingArg::Price(min));
                args.push(ListingArg::Price(max));
                placeholder += 2;
            }
            (Some(min), None) => {
                predicates.push_str(&format!(" AND dv.price >= ${placeholder}"));
                args.push(ListingArg::Price(min));
                placeholder += 1;
            }
            (None, Some(max)) => {
                predicates.push_str(&format!(" AND dv.price <= ${placeholder}"));
                args.push(ListingArg::Price(max));
                placeholder += 1;
            }
            (None, None) => {}
        }

        if let Some(brand) = filters.brand.as_ref().filter(|b| !b.is_empty()) {
            predicates.push_str(&format!(" AND p.brand = ${placeholder}"));
            args.push(ListingArg::Text(brand.clone()));
        }

        let sql = format!(
            "SELECT p.id AS product_id, p.name, p.slug, p.brand, p.description,\n       \
             p.category_id, p.stock_quantity AS total_stock,\n       \
             dv.stock_quantity AS variant_stock, dv.price,\n       \
             dv.primary_image_url AS image_url,\n       \
             (p.stock_quantity > 0) AS in_stock\n\
             FROM product p\n\
             LEFT JOIN product_variant dv ON dv.id = p.default_variant_id\
             {joins}\n\
             WHERE p.store_id = $1{predicates}\n\
             ORDER BY p.id\n\
             LIMIT $2 OFFSET $3"
        );

        Self { sql, args }
    }

    /// The assembled SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The positionally matched argument list.
    #[must_use]
    pub fn args(&self) -> &[ListingArg] {
        &self.args
    }

    /// Execute read-only against the pool.
    ///
    /// Zero matching rows is an empty Vec, never an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if execution fails.
    pub async fn fetch(&self, pool: &PgPool) -> Result<Vec<ProductListing>, RepositoryError> {
        let mut query = sqlx::query_as::<_, ProductListing>(&self.sql);
        for arg in &self.args {
            query = match arg {
                ListingArg::BigInt(v) => query.bind(*v),
                ListingArg::Text(v) => query.bind(v.clone()),
                ListingArg::TextArray(v) => query.bind(v.clone()),
                ListingArg::Price(v) => query.bind(*v),
            };
        }

        Ok(query.fetch_all(pool).await?)
    }
}

/// Pages below 1 (or absent) fall back to the default.
fn normalize_page(page: Option<i64>) -> i64 {
    match page {
        Some(p) if p >= 1 => p,
        _ => DEFAULT_PAGE,
    }
}

/// Limits outside `1..=200` (or absent) fall back to the default.
fn normalize_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if (1..=MAX_LIMIT).contains(&l) => l,
        _ => DEFAULT_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(id: i64, values: &[&str]) -> AttributeFilter {
        AttributeFilter {
            attribute_id: AttributeId::new(id),
            values: values.iter().map(|v| (*v).to_owned()).collect(),
        }
    }

    /// Highest `$n` placeholder appearing in the SQL.
    fn max_placeholder(sql: &str) -> usize {
        let mut max = 0;
        let bytes = sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start {
                    let n: usize = sql[start..end].parse().expect("digits");
                    max = max.max(n);
                }
                i = end;
            } else {
                i += 1;
            }
        }
        max
    }

    #[test]
    fn no_filters_binds_only_fixed_params() {
        let query = ListingQuery::build(StoreId::new(1), &ListingFilters::default());
        assert_eq!(query.args().len(), 3);
        assert_eq!(max_placeholder(query.sql()), 3);
        assert!(!query.sql().contains("JOIN variant_attribute"));
    }

    #[test]
    fn full_filter_set_parameter_arithmetic() {
        // 3 fixed + 2*N attributes + 1 category + 2 price + 1 brand.
        let filters = ListingFilters {
            category_id: Some(CategoryId::new(5)),
            min_price: Some(Decimal::new(1000, 2)),
            max_price: Some(Decimal::new(5000, 2)),
            brand: Some("Acme".to_owned()),
            attributes: vec![attr(1, &["red"]), attr(2, &["L"])],
            ..Default::default()
        };
        let query = ListingQuery::build(StoreId::new(1), &filters);

        assert_eq!(query.args().len(), 3 + 2 * 2 + 1 + 2 + 1);
        // Placeholders strictly increasing and matching argument positions.
        assert_eq!(max_placeholder(query.sql()), query.args().len());
        for n in 1..=query.args().len() {
            assert!(
                query.sql().contains(&format!("${n}")),
                "placeholder ${n} missing"
            );
        }
    }

    #[test]
    fn joins_precede_predicates() {
        let filters = ListingFilters {
            brand: Some("Acme".to_owned()),
            attributes: vec![attr(1, &["red"])],
            ..Default::default()
        };
        let query = ListingQuery::build(StoreId::new(1), &filters);
        let join_pos = query.sql().find("JOIN variant_attribute va0").expect("join");
        let where_pos = query.sql().find("WHERE p.store_id").expect("where");
        assert!(join_pos < where_pos);
    }

    #[test]
    fn multi_value_attribute_is_one_any_join() {
        // Two values for "color" must not degenerate to an impossible
        // AND of two joins; they share one join with an array bind.
        let filters = ListingFilters {
            attributes: vec![attr(7, &["red", "blue"])],
            ..Default::default()
        };
        let query = ListingQuery::build(StoreId::new(1), &filters);

        assert_eq!(query.sql().matches("JOIN variant_attribute").count(), 1);
        assert!(query.sql().contains("= ANY($5)"));
        assert_eq!(
            query.args().get(4),
            Some(&ListingArg::TextArray(vec![
                "red".to_owned(),
                "blue".to_owned()
            ]))
        );
    }

    #[test]
    fn limit_clamping() {
        for (input, expected) in [
            (Some(0), DEFAULT_LIMIT),
            (Some(-5), DEFAULT_LIMIT),
            (Some(500), DEFAULT_LIMIT),
            (Some(150), 150),
            (None, DEFAULT_LIMIT),
        ] {
            assert_eq!(normalize_limit(input), expected, "limit {input:?}");
        }
    }

    #[test]
    fn page_and_offset() {
        let filters = ListingFilters {
            page: Some(3),
            limit: Some(50),
            ..Default::default()
        };
        let query = ListingQuery::build(StoreId::new(9), &filters);
        assert_eq!(
            query.args(),
            &[
                ListingArg::BigInt(9),
                ListingArg::BigInt(50),
                ListingArg::BigInt(100),
            ]
        );
    }

    #[test]
    fn negative_page_falls_back() {
        let filters = ListingFilters {
            page: Some(-2),
            ..Default::default()
        };
        let query = ListingQuery::build(StoreId::new(1), &filters);
        // offset = (1 - 1) * 20
        assert_eq!(query.args().get(2), Some(&ListingArg::BigInt(0)));
    }

    #[test]
    fn empty_brand_is_ignored() {
        let filters = ListingFilters {
            brand: Some(String::new()),
            ..Default::default()
        };
        let query = ListingQuery::build(StoreId::new(1), &filters);
        assert_eq!(query.args().len(), 3);
    }
}
