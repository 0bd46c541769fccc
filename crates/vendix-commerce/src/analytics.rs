//! Sales analytics (C11): admin-only aggregate reporting over the sale
//! table, cached and treated as eventually consistent — no transactional
//! read is taken against sales while computing a report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use vendix_auth::policy::require_admin;
use vendix_auth::policy::require_owner_or_admin;
use vendix_cache::{keys, Cache, TypedCache};
use vendix_core::model::Id;
use vendix_core::{Principal, VendixResult};
use vendix_repo::{RepoError, SaleRepository};

const ANALYTICS_TTL: Duration = Duration::from_secs(600);

/// One day's rollup within [`SalesAnalytics::daily`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DailyRollup {
    /// Calendar date (UTC).
    pub date: NaiveDate,
    /// Number of sales recorded that day.
    pub count: u64,
    /// Revenue recorded that day.
    pub revenue: Decimal,
}

/// One entry within [`SalesAnalytics::top_customers`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CustomerSpend {
    /// Customer's user id.
    pub user_id: Id,
    /// Total spend over the reporting range.
    pub total_spend: Decimal,
    /// Number of sales over the reporting range.
    pub sale_count: u64,
}

/// Admin-facing sales report over an optional date range.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SalesAnalytics {
    /// Number of sales in range.
    pub total_sales: u64,
    /// Summed revenue in range.
    pub total_revenue: Decimal,
    /// `total_revenue / total_sales`, or zero if there were none.
    pub average_order_value: Decimal,
    /// Number of distinct customers who purchased in range.
    pub distinct_customers: u64,
    /// Per-day rollup, ascending by date.
    pub daily: Vec<DailyRollup>,
    /// Top ten customers by total spend, descending.
    pub top_customers: Vec<CustomerSpend>,
}

/// Per-customer summary, the admin report's single-user analogue.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserSalesSummary {
    /// Number of sales placed by this user.
    pub total_sales: u64,
    /// Total amount spent by this user.
    pub total_spent: Decimal,
    /// `total_spent / total_sales`, or zero if there were none.
    pub average_order_value: Decimal,
}

/// Sales analytics service.
#[derive(Debug)]
pub struct AnalyticsService<S, C: Cache> {
    sales: Arc<S>,
    cache: TypedCache<C>,
}

impl<S: SaleRepository, C: Cache> AnalyticsService<S, C> {
    /// Construct a service over the given sale repository and cache backend.
    pub fn new(sales: Arc<S>, cache: C) -> Self {
        Self {
            sales,
            cache: TypedCache::new(cache),
        }
    }

    /// Compute the admin-wide sales report over `[from, to]`, cached for
    /// ten minutes per distinct range.
    ///
    /// # Errors
    ///
    /// [`vendix_core::ErrorKind::Forbidden`] unless `principal` is an admin.
    pub async fn sales_report(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        principal: &Principal,
    ) -> VendixResult<SalesAnalytics> {
        require_admin(principal)?;
        let range_key = format!("{}:{}", from.map_or(String::new(), |d| d.to_rfc3339()), to.map_or(String::new(), |d| d.to_rfc3339()));
        let key = keys::admin_sales_analytics(&range_key);
        let sales = Arc::clone(&self.sales);
        self.cache
            .get_or_populate(&key, ANALYTICS_TTL, move || async move {
                let rows = sales.list_all(from, to).await.map_err(RepoError::into_vendix_error)?;
                Ok(build_report(&rows))
            })
            .await
    }

    /// Per-customer summary of their own purchase history.
    ///
    /// # Errors
    ///
    /// [`vendix_core::ErrorKind::Forbidden`] unless `principal` owns
    /// `user_id` or is an admin.
    pub async fn user_summary(&self, user_id: Id, principal: &Principal) -> VendixResult<UserSalesSummary> {
        require_owner_or_admin(principal, user_id)?;
        let key = keys::user_sales_summary(user_id);
        let sales = Arc::clone(&self.sales);
        self.cache
            .get_or_populate(&key, ANALYTICS_TTL, move || async move {
                let rows = sales.list_for_user(user_id).await.map_err(RepoError::into_vendix_error)?;
                let total_sales = rows.len() as u64;
                let total_spent: Decimal = rows.iter().map(|s| s.total).sum();
                let average_order_value = if total_sales == 0 {
                    Decimal::ZERO
                } else {
                    total_spent / Decimal::from(total_sales)
                };
                Ok(UserSalesSummary {
                    total_sales,
                    total_spent,
                    average_order_value,
                })
            })
            .await
    }
}

fn build_report(rows: &[vendix_core::model::Sale]) -> SalesAnalytics {
    let total_sales = rows.len() as u64;
    let total_revenue: Decimal = rows.iter().map(|s| s.total).sum();
    let average_order_value = if total_sales == 0 {
        Decimal::ZERO
    } else {
        total_revenue / Decimal::from(total_sales)
    };

    let mut by_day: HashMap<NaiveDate, (u64, Decimal)> = HashMap::new();
    let mut by_customer: HashMap<Id, (u64, Decimal)> = HashMap::new();
    for sale in rows {
        let day = sale.sale_date.date_naive();
        let entry = by_day.entry(day).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += sale.total;

        let customer = by_customer.entry(sale.user_id).or_insert((0, Decimal::ZERO));
        customer.0 += 1;
        customer.1 += sale.total;
    }

    let mut daily: Vec<DailyRollup> = by_day
        .into_iter()
        .map(|(date, (count, revenue))| DailyRollup { date, count, revenue })
        .collect();
    daily.sort_by_key(|d| d.date);

    let mut top_customers: Vec<CustomerSpend> = by_customer
        .into_iter()
        .map(|(user_id, (sale_count, total_spend))| CustomerSpend {
            user_id,
            total_spend,
            sale_count,
        })
        .collect();
    top_customers.sort_by(|a, b| b.total_spend.cmp(&a.total_spend));
    top_customers.truncate(10);

    SalesAnalytics {
        total_sales,
        total_revenue,
        average_order_value,
        distinct_customers: by_customer_count(rows),
        daily,
        top_customers,
    }
}

fn by_customer_count(rows: &[vendix_core::model::Sale]) -> u64 {
    let mut seen = std::collections::HashSet::new();
    for sale in rows {
        seen.insert(sale.user_id);
    }
    seen.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendix_cache::memory::InMemoryCache;
    use vendix_core::model::{Role, Sale};
    use vendix_repo::InMemoryStore;

    fn admin() -> Principal {
        Principal {
            user_id: 1,
            role: Role::Admin,
            jti: "t".into(),
            expires_at: 0,
        }
    }

    fn customer(user_id: Id) -> Principal {
        Principal {
            user_id,
            role: Role::Customer,
            jti: "t".into(),
            expires_at: 0,
        }
    }

    async fn seed(store: &InMemoryStore) {
        let now = Utc::now();
        for (user_id, total) in [(1u64, "10.00"), (1u64, "5.00"), (2u64, "20.00")] {
            SaleRepository::insert(
                store,
                Sale {
                    id: 0,
                    user_id,
                    total: total.parse().unwrap(),
                    sale_date: now,
                    created_at: now,
                    updated_at: now,
                },
                Vec::new(),
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn non_admin_cannot_view_sales_report() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store).await;
        let service = AnalyticsService::new(store, InMemoryCache::new());
        let err = service.sales_report(None, None, &customer(1)).await.unwrap_err();
        assert_eq!(err.kind, vendix_core::ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn sales_report_aggregates_correctly() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store).await;
        let service = AnalyticsService::new(store, InMemoryCache::new());
        let report = service.sales_report(None, None, &admin()).await.unwrap();

        assert_eq!(report.total_sales, 3);
        assert_eq!(report.total_revenue, Decimal::new(3500, 2));
        assert_eq!(report.distinct_customers, 2);
        assert_eq!(report.top_customers[0].user_id, 2);
        assert_eq!(report.top_customers[0].total_spend, Decimal::new(2000, 2));
    }

    #[tokio::test]
    async fn user_summary_scoped_to_owner() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store).await;
        let service = AnalyticsService::new(store, InMemoryCache::new());

        let summary = service.user_summary(1, &customer(1)).await.unwrap();
        assert_eq!(summary.total_sales, 2);
        assert_eq!(summary.total_spent, Decimal::new(1500, 2));

        let err = service.user_summary(1, &customer(2)).await.unwrap_err();
        assert_eq!(err.kind, vendix_core::ErrorKind::Forbidden);
    }
}
