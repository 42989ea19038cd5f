//! Group-by aggregations behind the dashboard and the `report` command.

pub mod periods;

use crate::domain::model::SaleRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_TOP_N: usize = 10;
pub const MIN_TOP_N: usize = 5;
pub const MAX_TOP_N: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub revenue: f64,
    pub costs: f64,
    pub gross_margin: f64,
    pub margin_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketplaceSummary {
    pub marketplace: String,
    pub sales: f64,
    pub purchase_cost: f64,
    pub commission: f64,
    pub gross_margin: f64,
}

/// Sales per day with one series per marketplace; absent cells are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyTrend {
    pub marketplaces: Vec<String>,
    pub days: Vec<NaiveDate>,
    /// `series[i][j]`: sales of `marketplaces[i]` on `days[j]`.
    pub series: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProduct {
    pub rank: usize,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub sales: f64,
    pub purchase_cost: f64,
    pub commission: f64,
    pub margin: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn compute_kpis(rows: &[SaleRecord]) -> Kpis {
    let revenue: f64 = rows.iter().map(|r| r.sale).sum();
    let costs: f64 = rows.iter().map(|r| r.purchase_cost + r.commission).sum();
    let gross_margin = round2(rows.iter().map(SaleRecord::gross_margin).sum());
    let margin_percent = if revenue != 0.0 {
        gross_margin / revenue * 100.0
    } else {
        0.0
    };
    Kpis {
        revenue,
        costs,
        gross_margin,
        margin_percent,
    }
}

pub fn marketplace_summary(rows: &[SaleRecord]) -> Vec<MarketplaceSummary> {
    let mut groups: BTreeMap<&str, MarketplaceSummary> = BTreeMap::new();
    for row in rows {
        let entry = groups
            .entry(row.marketplace.as_str())
            .or_insert_with(|| MarketplaceSummary {
                marketplace: row.marketplace.clone(),
                sales: 0.0,
                purchase_cost: 0.0,
                commission: 0.0,
                gross_margin: 0.0,
            });
        entry.sales += row.sale;
        entry.purchase_cost += row.purchase_cost;
        entry.commission += row.commission;
        entry.gross_margin += row.gross_margin();
    }
    groups.into_values().collect()
}

pub fn daily_trend(rows: &[SaleRecord]) -> DailyTrend {
    let marketplaces: Vec<String> = rows
        .iter()
        .map(|r| r.marketplace.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let days: Vec<NaiveDate> = rows
        .iter()
        .map(|r| r.order_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let market_index: HashMap<&str, usize> = marketplaces
        .iter()
        .enumerate()
        .map(|(i, m)| (m.as_str(), i))
        .collect();
    let day_index: HashMap<NaiveDate, usize> =
        days.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut series = vec![vec![0.0; days.len()]; marketplaces.len()];
    for row in rows {
        let m = market_index[row.marketplace.as_str()];
        let d = day_index[&row.order_date];
        series[m][d] += row.sale;
    }

    DailyTrend {
        marketplaces,
        days,
        series,
    }
}

pub fn clamp_top_n(n: usize) -> usize {
    n.clamp(MIN_TOP_N, MAX_TOP_N)
}

/// Best sellers by quantity, optionally within one marketplace.
pub fn top_products(rows: &[SaleRecord], marketplace: Option<&str>, n: usize) -> Vec<TopProduct> {
    let mut groups: HashMap<(&str, &str), TopProduct> = HashMap::new();
    for row in rows
        .iter()
        .filter(|r| marketplace.map_or(true, |m| r.marketplace == m))
    {
        let name = row.product_name.as_deref().unwrap_or("");
        let entry = groups
            .entry((row.sku.as_str(), name))
            .or_insert_with(|| TopProduct {
                rank: 0,
                sku: row.sku.clone(),
                product_name: name.to_string(),
                quantity: 0,
                sales: 0.0,
                purchase_cost: 0.0,
                commission: 0.0,
                margin: 0.0,
            });
        entry.quantity += row.quantity;
        entry.sales += row.sale;
        entry.purchase_cost += row.purchase_cost;
        entry.commission += row.commission;
    }

    let mut products: Vec<TopProduct> = groups.into_values().collect();
    products.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.sales.partial_cmp(&a.sales).unwrap_or(Ordering::Equal))
            .then_with(|| a.sku.cmp(&b.sku))
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    products.truncate(clamp_top_n(n));
    for (i, product) in products.iter_mut().enumerate() {
        product.rank = i + 1;
        product.margin = product.sales - product.purchase_cost - product.commission;
    }
    products
}

/// Everything the dashboard shows for one filter.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub rows: usize,
    pub kpis: Kpis,
    pub summary: Vec<MarketplaceSummary>,
    pub trend: DailyTrend,
    pub top_products: Vec<TopProduct>,
}

impl Report {
    pub fn build(rows: &[SaleRecord], top_marketplace: Option<&str>, top_n: usize) -> Self {
        Self {
            rows: rows.len(),
            kpis: compute_kpis(rows),
            summary: marketplace_summary(rows),
            trend: daily_trend(rows),
            top_products: top_products(rows, top_marketplace, top_n),
        }
    }
}
