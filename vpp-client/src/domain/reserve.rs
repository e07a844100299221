use time::Date;

/// Hourly operating-reserve bids and prices for the SR and SUP products.
///
/// Natural key is `(tran_date, tran_hour)`; a full trading day has 24 rows.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReserveRecord {
    pub tran_date: Date,
    pub tran_hour: i32,
    pub sr_bid: f64,
    pub sr_bid_qse: f64,
    pub sr_bid_nontrade: f64,
    pub sr_price: f64,
    pub sr_perf_price_1: f64,
    pub sr_perf_price_2: f64,
    pub sr_perf_price_3: f64,
    pub sup_bid: f64,
    pub sup_bid_qse: f64,
    pub sup_bid_nontrade: f64,
    pub sup_price: f64,
}

impl ReserveRecord {
    pub fn zeroed(tran_date: Date, tran_hour: i32) -> Self {
        Self {
            tran_date,
            tran_hour,
            sr_bid: 0.0,
            sr_bid_qse: 0.0,
            sr_bid_nontrade: 0.0,
            sr_price: 0.0,
            sr_perf_price_1: 0.0,
            sr_perf_price_2: 0.0,
            sr_perf_price_3: 0.0,
            sup_bid: 0.0,
            sup_bid_qse: 0.0,
            sup_bid_nontrade: 0.0,
            sup_price: 0.0,
        }
    }
}
