use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One raw row before normalization: a spreadsheet row keyed by header, or a
/// marketplace order payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub source: String,
    pub sheet: String,
    pub data: HashMap<String, serde_json::Value>,
}

/// A row of the `sales` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub order_date: NaiveDate,
    pub marketplace: String,
    pub sheet: String,
    pub sku: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub sale: f64,
    pub purchase_cost: f64,
    pub commission: f64,
}

impl SaleRecord {
    pub fn gross_margin(&self) -> f64 {
        self.sale - self.purchase_cost - self.commission
    }
}

/// Canonical order line produced by every marketplace adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: String,
    /// Position of the line inside its order, starting at 0.
    pub line_index: usize,
    pub order_date: NaiveDate,
    pub order_status: String,
    pub sale_price: f64,
    pub taxes: f64,
    pub commission: f64,
    pub shipping: f64,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
}

impl OrderLine {
    pub const SHEET_PREFIX: &'static str = "api:";

    /// `api:<order>` for the first line, `api:<order>#<n>` for the n-th one, so
    /// lines sharing an order, date and sku stay distinct in the store.
    pub fn sheet(&self) -> String {
        match self.line_index {
            0 => format!("{}{}", Self::SHEET_PREFIX, self.order_id),
            index => format!("{}{}#{}", Self::SHEET_PREFIX, self.order_id, index + 1),
        }
    }

    pub fn into_sale_record(self, marketplace: &str) -> SaleRecord {
        SaleRecord {
            order_date: self.order_date,
            marketplace: marketplace.to_string(),
            sheet: self.sheet(),
            sku: self.sku,
            product_name: (!self.product_name.is_empty()).then_some(self.product_name),
            quantity: self.quantity,
            sale: self.sale_price,
            purchase_cost: 0.0,
            commission: self.commission,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub records: Vec<SaleRecord>,
    pub skipped: usize,
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// `YYYY-MM-DDT00:00:00Z` of the first day, as partner APIs expect.
    pub fn start_timestamp(&self) -> String {
        format!("{}T00:00:00Z", self.start.format("%Y-%m-%d"))
    }

    /// `YYYY-MM-DDT23:59:59Z` of the last day.
    pub fn end_timestamp(&self) -> String {
        format!("{}T23:59:59Z", self.end.format("%Y-%m-%d"))
    }
}

/// Row selection shared by the store, reports and the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesFilter {
    /// Empty means every marketplace.
    pub marketplaces: Vec<String>,
    pub range: Option<DateRange>,
}

impl SalesFilter {
    pub fn matches(&self, record: &SaleRecord) -> bool {
        let market_ok =
            self.marketplaces.is_empty() || self.marketplaces.iter().any(|m| *m == record.marketplace);
        let date_ok = self.range.map_or(true, |r| r.contains(record.order_date));
        market_ok && date_ok
    }
}
