use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::services::ServiceError;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 365;
pub const LOW_STOCK_THRESHOLD: i32 = 5;
const TOP_PRODUCTS: i64 = 5;

pub fn resolve_window(days: Option<i64>) -> Result<i64, ServiceError> {
    let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(ServiceError::validation(
            "days",
            format!("must be between 1 and {}", MAX_WINDOW_DAYS),
        ));
    }
    Ok(days)
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DailySales {
    pub day: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTotals {
    pub count: i64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
}

impl OrderTotals {
    fn new(count: i64, revenue: Decimal) -> Self {
        Self {
            count,
            revenue,
            average_order_value: average(revenue, count),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub days: i64,
    pub since: DateTime<Utc>,
    pub total_users: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub products_by_status: BTreeMap<String, i64>,
    pub products_by_approval: BTreeMap<String, i64>,
    pub orders: OrderTotals,
    pub orders_by_status: BTreeMap<String, i64>,
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
    pub pending_applications: i64,
    pub new_feedback: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerAnalytics {
    pub days: i64,
    pub since: DateTime<Utc>,
    pub revenue: Decimal,
    pub orders: i64,
    pub units_sold: i64,
    pub average_order_value: Decimal,
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
    pub low_stock: Vec<LowStockProduct>,
}

fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(2)
    }
}

fn counts(rows: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    rows.into_iter().collect()
}

/// One entry per day from `since` to `until` inclusive, zero where nothing sold
fn fill_days(since: NaiveDate, until: NaiveDate, rows: Vec<DailySales>) -> Vec<DailySales> {
    let mut by_day: BTreeMap<NaiveDate, DailySales> = rows.into_iter().map(|r| (r.day, r)).collect();
    since
        .iter_days()
        .take_while(|day| *day <= until)
        .map(|day| {
            by_day.remove(&day).unwrap_or(DailySales {
                day,
                orders: 0,
                revenue: Decimal::ZERO,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Champions,
    Loyal,
    PotentialLoyalist,
    NewCustomer,
    AtRisk,
    CantLose,
    Hibernating,
    Lost,
    Others,
}

impl Segment {
    pub const ALL: [Segment; 9] = [
        Segment::Champions,
        Segment::Loyal,
        Segment::PotentialLoyalist,
        Segment::NewCustomer,
        Segment::AtRisk,
        Segment::CantLose,
        Segment::Hibernating,
        Segment::Lost,
        Segment::Others,
    ];

    /// Rules are checked top to bottom; the first match wins.
    pub fn classify(recency: u8, frequency: u8, monetary: u8) -> Segment {
        let (r, f, m) = (recency, frequency, monetary);
        if r >= 4 && f >= 4 && m >= 4 {
            Segment::Champions
        } else if r >= 3 && f >= 4 {
            Segment::Loyal
        } else if r >= 4 && f == 1 {
            Segment::NewCustomer
        } else if r >= 3 && f >= 2 {
            Segment::PotentialLoyalist
        } else if r <= 2 && f >= 4 {
            Segment::CantLose
        } else if r <= 2 && f >= 2 {
            Segment::AtRisk
        } else if r == 2 && f == 1 {
            Segment::Hibernating
        } else if r == 1 && f == 1 {
            Segment::Lost
        } else {
            Segment::Others
        }
    }
}

/// Scores 1..=5 by quintile of rank. Tied values share the score of the
/// first position they occupy, so a long tail of equal values scores low.
pub fn quintile_scores<T: PartialOrd>(values: &[T], higher_is_better: bool) -> Vec<u8> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let ord = values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal);
        if higher_is_better {
            ord
        } else {
            ord.reverse()
        }
    });

    let mut scores = vec![0u8; n];
    let mut group_start = 0;
    for (pos, &idx) in order.iter().enumerate() {
        if pos > 0 && values[order[pos - 1]] != values[idx] {
            group_start = pos;
        }
        scores[idx] = (1 + group_start * 5 / n) as u8;
    }
    scores
}

#[derive(Debug, Clone, FromRow)]
pub struct CustomerActivity {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub last_order_at: DateTime<Utc>,
    pub frequency: i64,
    pub monetary: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerRfm {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub last_order_at: DateTime<Utc>,
    pub recency_days: i64,
    pub frequency: i64,
    pub monetary: Decimal,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub segment: Segment,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: i64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSegmentation {
    pub generated_at: DateTime<Utc>,
    pub total_customers: usize,
    pub segments: Vec<SegmentSummary>,
    pub customers: Vec<CustomerRfm>,
}

pub fn segment_customers(activity: Vec<CustomerActivity>, now: DateTime<Utc>) -> CustomerSegmentation {
    let recency: Vec<i64> = activity
        .iter()
        .map(|c| (now - c.last_order_at).num_days().max(0))
        .collect();
    let frequency: Vec<i64> = activity.iter().map(|c| c.frequency).collect();
    let monetary: Vec<Decimal> = activity.iter().map(|c| c.monetary).collect();

    let r_scores = quintile_scores(&recency, false);
    let f_scores = quintile_scores(&frequency, true);
    let m_scores = quintile_scores(&monetary, true);

    let mut customers: Vec<CustomerRfm> = activity
        .into_iter()
        .enumerate()
        .map(|(i, c)| CustomerRfm {
            customer_id: c.customer_id,
            name: c.name,
            email: c.email,
            last_order_at: c.last_order_at,
            recency_days: recency[i],
            frequency: c.frequency,
            monetary: c.monetary,
            recency_score: r_scores[i],
            frequency_score: f_scores[i],
            monetary_score: m_scores[i],
            segment: Segment::classify(r_scores[i], f_scores[i], m_scores[i]),
        })
        .collect();
    customers.sort_by(|a, b| a.segment.cmp(&b.segment).then(b.monetary.cmp(&a.monetary)));

    let segments = Segment::ALL
        .iter()
        .map(|&segment| {
            let (count, orders, revenue) = customers
                .iter()
                .filter(|c| c.segment == segment)
                .fold((0_i64, 0_i64, Decimal::ZERO), |(n, o, r), c| (n + 1, o + c.frequency, r + c.monetary));
            SegmentSummary {
                segment,
                customers: count,
                revenue,
                average_order_value: average(revenue, orders),
            }
        })
        .collect();

    CustomerSegmentation {
        generated_at: now,
        total_customers: customers.len(),
        segments,
        customers,
    }
}

pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self, days: Option<i64>) -> Result<Dashboard, ServiceError> {
        let days = resolve_window(days)?;
        let now = Utc::now();
        let since = now - Duration::days(days - 1);
        let since = since.date_naive().and_hms_opt(0, 0, 0).map(|t| t.and_utc()).unwrap_or(since);
        let pool = &self.pool;

        let (users, products_by_status, products_by_approval, totals, orders_by_status, daily, top, pending, fresh) = futures::try_join!(
            sqlx::query_as::<_, (String, i64)>("SELECT role, COUNT(*) FROM users GROUP BY role").fetch_all(pool),
            sqlx::query_as::<_, (String, i64)>("SELECT status, COUNT(*) FROM products GROUP BY status").fetch_all(pool),
            sqlx::query_as::<_, (String, i64)>("SELECT approval_status, COUNT(*) FROM products GROUP BY approval_status")
                .fetch_all(pool),
            sqlx::query_as::<_, (i64, Decimal)>(
                "SELECT COUNT(*), COALESCE(SUM(total_amount), 0)
                 FROM orders WHERE status <> 'cancelled' AND created_at >= $1",
            )
            .bind(since)
            .fetch_one(pool),
            sqlx::query_as::<_, (String, i64)>(
                "SELECT status, COUNT(*) FROM orders WHERE created_at >= $1 GROUP BY status",
            )
            .bind(since)
            .fetch_all(pool),
            sqlx::query_as::<_, DailySales>(
                "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS orders,
                        COALESCE(SUM(total_amount), 0) AS revenue
                 FROM orders WHERE status <> 'cancelled' AND created_at >= $1
                 GROUP BY 1 ORDER BY 1",
            )
            .bind(since)
            .fetch_all(pool),
            sqlx::query_as::<_, TopProduct>(
                "SELECT oi.product_id, MAX(oi.product_name) AS name,
                        COALESCE(SUM(oi.quantity), 0)::bigint AS units_sold,
                        COALESCE(SUM(oi.subtotal), 0) AS revenue
                 FROM order_items oi JOIN orders o ON o.id = oi.order_id
                 WHERE o.status <> 'cancelled' AND o.created_at >= $1
                 GROUP BY oi.product_id
                 ORDER BY revenue DESC, units_sold DESC
                 LIMIT $2",
            )
            .bind(since)
            .bind(TOP_PRODUCTS)
            .fetch_all(pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM seller_applications WHERE status = 'pending'")
                .fetch_one(pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer_feedback WHERE status = 'new'").fetch_one(pool),
        )?;

        let users_by_role = counts(users);
        Ok(Dashboard {
            days,
            since,
            total_users: users_by_role.values().sum(),
            users_by_role,
            products_by_status: counts(products_by_status),
            products_by_approval: counts(products_by_approval),
            orders: OrderTotals::new(totals.0, totals.1),
            orders_by_status: counts(orders_by_status),
            daily_sales: fill_days(since.date_naive(), now.date_naive(), daily),
            top_products: top,
            pending_applications: pending,
            new_feedback: fresh,
        })
    }

    pub async fn customer_segments(&self) -> Result<CustomerSegmentation, ServiceError> {
        let activity = sqlx::query_as::<_, CustomerActivity>(
            "SELECT u.id AS customer_id, u.name, u.email,
                    MAX(o.created_at) AS last_order_at,
                    COUNT(o.id) AS frequency,
                    SUM(o.total_amount) AS monetary
             FROM users u
             JOIN orders o ON o.customer_id = u.id
             WHERE o.status <> 'cancelled'
             GROUP BY u.id, u.name, u.email",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(segment_customers(activity, Utc::now()))
    }

    pub async fn seller(&self, seller_id: Uuid, days: Option<i64>) -> Result<SellerAnalytics, ServiceError> {
        let days = resolve_window(days)?;
        let now = Utc::now();
        let since = now - Duration::days(days - 1);
        let since = since.date_naive().and_hms_opt(0, 0, 0).map(|t| t.and_utc()).unwrap_or(since);
        let pool = &self.pool;

        let (totals, daily, top, low_stock) = futures::try_join!(
            sqlx::query_as::<_, (i64, i64, Decimal)>(
                "SELECT COUNT(DISTINCT oi.order_id), COALESCE(SUM(oi.quantity), 0)::bigint,
                        COALESCE(SUM(oi.subtotal), 0)
                 FROM order_items oi JOIN orders o ON o.id = oi.order_id
                 WHERE oi.seller_id = $1 AND o.status <> 'cancelled' AND o.created_at >= $2",
            )
            .bind(seller_id)
            .bind(since)
            .fetch_one(pool),
            sqlx::query_as::<_, DailySales>(
                "SELECT (o.created_at AT TIME ZONE 'UTC')::date AS day, COUNT(DISTINCT o.id) AS orders,
                        COALESCE(SUM(oi.subtotal), 0) AS revenue
                 FROM order_items oi JOIN orders o ON o.id = oi.order_id
                 WHERE oi.seller_id = $1 AND o.status <> 'cancelled' AND o.created_at >= $2
                 GROUP BY 1 ORDER BY 1",
            )
            .bind(seller_id)
            .bind(since)
            .fetch_all(pool),
            sqlx::query_as::<_, TopProduct>(
                "SELECT oi.product_id, MAX(oi.product_name) AS name,
                        COALESCE(SUM(oi.quantity), 0)::bigint AS units_sold,
                        COALESCE(SUM(oi.subtotal), 0) AS revenue
                 FROM order_items oi JOIN orders o ON o.id = oi.order_id
                 WHERE oi.seller_id = $1 AND o.status <> 'cancelled' AND o.created_at >= $2
                 GROUP BY oi.product_id
                 ORDER BY revenue DESC, units_sold DESC
                 LIMIT $3",
            )
            .bind(seller_id)
            .bind(since)
            .bind(TOP_PRODUCTS)
            .fetch_all(pool),
            sqlx::query_as::<_, LowStockProduct>(
                "SELECT id, name, stock, status FROM products
                 WHERE seller_id = $1 AND stock <= $2
                 ORDER BY stock, name",
            )
            .bind(seller_id)
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_all(pool),
        )?;

        let (orders, units_sold, revenue) = totals;
        Ok(SellerAnalytics {
            days,
            since,
            revenue,
            orders,
            units_sold,
            average_order_value: average(revenue, orders),
            daily_sales: fill_days(since.date_naive(), now.date_naive(), daily),
            top_products: top,
            low_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn window_bounds() {
        assert_eq!(resolve_window(None).unwrap(), 30);
        assert_eq!(resolve_window(Some(365)).unwrap(), 365);
        assert!(resolve_window(Some(0)).is_err());
        assert!(resolve_window(Some(366)).is_err());
    }

    #[test]
    fn quintiles_of_distinct_values() {
        let scores = quintile_scores(&[50, 10, 40, 20, 30], true);
        assert_eq!(scores, vec![5, 1, 4, 2, 3]);

        let recency = quintile_scores(&[1, 90, 30, 7, 365], false);
        assert_eq!(recency, vec![5, 2, 3, 4, 1]);
    }

    #[test]
    fn tied_values_share_the_low_score() {
        let frequency = [1, 1, 1, 1, 1, 1, 1, 2, 3, 8];
        let scores = quintile_scores(&frequency, true);
        assert!(scores[..7].iter().all(|s| *s == 1));
        assert_eq!(scores[7], 4);
        assert_eq!(scores[9], 5);
        assert!(quintile_scores::<i64>(&[], true).is_empty());
    }

    #[test]
    fn segment_rules() {
        assert_eq!(Segment::classify(5, 5, 5), Segment::Champions);
        assert_eq!(Segment::classify(3, 4, 2), Segment::Loyal);
        assert_eq!(Segment::classify(5, 1, 1), Segment::NewCustomer);
        assert_eq!(Segment::classify(4, 2, 3), Segment::PotentialLoyalist);
        assert_eq!(Segment::classify(1, 5, 5), Segment::CantLose);
        assert_eq!(Segment::classify(2, 3, 3), Segment::AtRisk);
        assert_eq!(Segment::classify(2, 1, 1), Segment::Hibernating);
        assert_eq!(Segment::classify(1, 1, 4), Segment::Lost);
        assert_eq!(Segment::classify(3, 1, 2), Segment::Others);
    }

    #[test]
    fn segmentation_summarises_every_segment() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let activity: Vec<CustomerActivity> = (0..10)
            .map(|i| CustomerActivity {
                customer_id: Uuid::new_v4(),
                name: format!("Customer {}", i),
                email: format!("c{}@example.com", i),
                last_order_at: now - Duration::days(i * 20),
                frequency: 10 - i,
                monetary: Decimal::from(1000 - i * 90),
            })
            .collect();

        let result = segment_customers(activity, now);
        assert_eq!(result.total_customers, 10);
        assert_eq!(result.segments.len(), Segment::ALL.len());

        let best = result.customers.iter().find(|c| c.name == "Customer 0").unwrap();
        assert_eq!(best.segment, Segment::Champions);
        assert_eq!((best.recency_score, best.frequency_score, best.monetary_score), (5, 5, 5));

        let worst = result.customers.iter().find(|c| c.name == "Customer 9").unwrap();
        assert_eq!(worst.recency_days, 180);
        assert_eq!(worst.segment, Segment::Lost);

        let counted: i64 = result.segments.iter().map(|s| s.customers).sum();
        assert_eq!(counted, 10);

        let mid = result.customers.iter().find(|c| c.name == "Customer 4").unwrap();
        assert_eq!(mid.segment, Segment::PotentialLoyalist);

        let champions = &result.segments[0];
        assert_eq!(champions.segment, Segment::Champions);
        // Customers 0 to 3: 3460 over 34 orders
        assert_eq!(champions.customers, 4);
        assert_eq!(champions.revenue, dec("3460"));
        assert_eq!(champions.average_order_value, dec("101.76"));
    }

    #[test]
    fn missing_days_are_zero_filled() {
        let since = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let rows = vec![DailySales {
            day: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            orders: 2,
            revenue: dec("40.00"),
        }];

        let filled = fill_days(since, until, rows);
        assert_eq!(filled.len(), 4);
        assert_eq!(filled[0].orders, 0);
        assert_eq!(filled[2].revenue, dec("40.00"));
        assert_eq!(filled[3].day, until);
    }

    #[test]
    fn average_handles_zero_orders() {
        assert_eq!(average(dec("10"), 0), Decimal::ZERO);
        assert_eq!(average(dec("10"), 3), dec("3.33"));
    }
}
